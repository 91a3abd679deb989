//! Live search over the rows currently on screen. Rows are never removed: each
//! one is tagged as a match or not, and the front-end highlights or dims it.

use crate::models::RowSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    Match,
    NoMatch,
}

/// Per-row tags, keyed by the row's position in the [`RowSet`] it was computed
/// from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    states: Vec<MatchState>,
}

impl Classification {
    pub fn get(&self, index: usize) -> Option<MatchState> {
        self.states.get(index).copied()
    }

    pub fn is_match(&self, index: usize) -> bool {
        self.get(index) == Some(MatchState::Match)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn match_count(&self) -> usize {
        self.states
            .iter()
            .filter(|state| **state == MatchState::Match)
            .count()
    }

    /// Position of the first matching row at or after `start`, wrapping around.
    pub fn next_match(&self, start: usize) -> Option<usize> {
        let len = self.states.len();
        (0..len)
            .map(|offset| (start + offset) % len)
            .find(|index| self.is_match(*index))
    }
}

/// Tag every row: a row matches when the lowercased term occurs in the
/// lowercased text of any of its values. An empty term matches everything.
pub fn classify(rows: &RowSet, term: &str) -> Classification {
    let needle = term.to_lowercase();
    let states = rows
        .rows
        .iter()
        .map(|row| {
            let hit = needle.is_empty()
                || row
                    .values
                    .iter()
                    .any(|value| value.to_string().to_lowercase().contains(&needle));
            if hit {
                MatchState::Match
            } else {
                MatchState::NoMatch
            }
        })
        .collect();
    Classification { states }
}

#[cfg(test)]
mod tests {
    use super::{classify, MatchState};
    use crate::models::{CellValue, Row, RowIdentity, RowSet};

    fn people() -> RowSet {
        let row = |id: i64, name: &str| Row {
            identity: Some(RowIdentity(id)),
            values: vec![CellValue::Integer(id), CellValue::Text(name.to_string())],
        };
        RowSet {
            table: "users".into(),
            rows: vec![row(1, "Ann"), row(2, "Bob"), row(3, "JOANNA")],
            truncated: false,
        }
    }

    #[test]
    fn empty_term_matches_every_row() {
        let result = classify(&people(), "");
        assert_eq!(result.len(), 3);
        assert_eq!(result.match_count(), 3);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let result = classify(&people(), "aN");
        assert_eq!(result.get(0), Some(MatchState::Match));
        assert_eq!(result.get(1), Some(MatchState::NoMatch));
        assert_eq!(result.get(2), Some(MatchState::Match));
    }

    #[test]
    fn numbers_and_nulls_match_their_text() {
        let rows = RowSet {
            table: "t".into(),
            rows: vec![
                Row {
                    identity: None,
                    values: vec![CellValue::Real(3.25), CellValue::Null],
                },
                Row {
                    identity: None,
                    values: vec![CellValue::Integer(7), CellValue::Text("x".into())],
                },
            ],
            truncated: false,
        };
        assert!(classify(&rows, ".25").is_match(0));
        assert!(classify(&rows, "null").is_match(0));
        assert!(!classify(&rows, "null").is_match(1));
    }

    #[test]
    fn empty_rowset_yields_empty_classification() {
        let result = classify(&RowSet::default(), "anything");
        assert!(result.is_empty());
        assert_eq!(result.next_match(0), None);
    }

    #[test]
    fn next_match_wraps_around() {
        let result = classify(&people(), "ann");
        assert_eq!(result.next_match(1), Some(2));
        assert_eq!(result.next_match(3 % 3), Some(0));
        assert_eq!(classify(&people(), "zzz").next_match(0), None);
    }
}
