//! Failure taxonomy shared by every core component. Lower layers return these
//! values and the controller is the only place that turns them into
//! notifications for the user.

use thiserror::Error;

/// Errors produced while opening, inspecting, reading, or writing a database.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Opening, verifying, or using the active connection failed.
    #[error("{message}")]
    Connection {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// Introspection against a missing or unreadable table.
    #[error("{message}")]
    Schema {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// A bounded SELECT failed.
    #[error("{message}")]
    Query {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// INSERT, UPDATE, or DELETE failed or was rejected before execution.
    #[error("{message}")]
    Write {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },
}

impl BrowserError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            source: None,
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            source: None,
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
            source: None,
        }
    }

    /// Attach the SQLite error that caused this failure.
    pub fn with_source(self, err: rusqlite::Error) -> Self {
        match self {
            Self::Connection { message, .. } => Self::Connection {
                message,
                source: Some(err),
            },
            Self::Schema { message, .. } => Self::Schema {
                message,
                source: Some(err),
            },
            Self::Query { message, .. } => Self::Query {
                message,
                source: Some(err),
            },
            Self::Write { message, .. } => Self::Write {
                message,
                source: Some(err),
            },
        }
    }

    /// Short label used as the notification title.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "Connection error",
            Self::Schema { .. } => "Schema error",
            Self::Query { .. } => "Query error",
            Self::Write { .. } => "Write error",
        }
    }

    /// Message followed by the SQLite cause, if any.
    pub fn detail(&self) -> String {
        let (message, source) = match self {
            Self::Connection { message, source }
            | Self::Schema { message, source }
            | Self::Query { message, source }
            | Self::Write { message, source } => (message, source),
        };
        match source {
            Some(err) => format!("{message}: {err}"),
            None => message.clone(),
        }
    }
}

/// Convenience alias for results carrying a [`BrowserError`].
pub type Result<T> = std::result::Result<T, BrowserError>;

#[cfg(test)]
mod tests {
    use super::BrowserError;

    #[test]
    fn detail_includes_sqlite_cause() {
        let err = BrowserError::write("failed to insert into `users`")
            .with_source(rusqlite::Error::InvalidQuery);
        assert_eq!(err.kind(), "Write error");
        assert!(err.detail().starts_with("failed to insert into `users`: "));
        assert_eq!(err.to_string(), "failed to insert into `users`");
    }

    #[test]
    fn detail_without_cause_is_the_message() {
        let err = BrowserError::connection("no database is open");
        assert_eq!(err.kind(), "Connection error");
        assert_eq!(err.detail(), "no database is open");
    }
}
