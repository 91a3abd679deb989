use crate::models::{ColumnDescriptor, RowSet};

/// Widest a grid column is allowed to grow, in terminal cells.
const MAX_COLUMN_WIDTH: usize = 32;
/// Narrowest a grid column is allowed to shrink.
const MIN_COLUMN_WIDTH: usize = 4;

/// Which pane receives navigation keys.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub(crate) enum Focus {
    #[default]
    Tables,
    Rows,
}

/// Cursor positions for the table list and the row grid. The row cursor is the
/// presentation side of "the selected row" handed to edit and delete.
#[derive(Default, Debug)]
pub(crate) struct BrowserView {
    pub(crate) focus: Focus,
    pub(crate) table_cursor: usize,
    pub(crate) row_cursor: Option<usize>,
}

impl BrowserView {
    /// Forget every cursor, e.g. after a different database was opened.
    pub(crate) fn reset(&mut self, table_count: usize, row_count: usize) {
        self.table_cursor = 0;
        self.row_cursor = (row_count > 0).then_some(0);
        self.focus = if table_count > 0 && row_count > 0 {
            Focus::Rows
        } else {
            Focus::Tables
        };
    }

    pub(crate) fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tables => Focus::Rows,
            Focus::Rows => Focus::Tables,
        };
    }

    /// Move the cursor of the focused pane by `offset`, clamped to `len`.
    pub(crate) fn move_selection(&mut self, offset: isize, len: usize) {
        if len == 0 {
            return;
        }
        let current = match self.focus {
            Focus::Tables => self.table_cursor,
            Focus::Rows => self.row_cursor.unwrap_or(0),
        };
        let next = current
            .saturating_add_signed(offset)
            .min(len.saturating_sub(1));
        self.set_cursor(next);
    }

    pub(crate) fn select_first(&mut self, len: usize) {
        if len > 0 {
            self.set_cursor(0);
        }
    }

    pub(crate) fn select_last(&mut self, len: usize) {
        if len > 0 {
            self.set_cursor(len - 1);
        }
    }

    /// Keep the row cursor inside a freshly loaded row set.
    pub(crate) fn clamp_rows(&mut self, len: usize) {
        self.row_cursor = match (self.row_cursor, len) {
            (_, 0) => None,
            (None, _) => Some(0),
            (Some(index), len) => Some(index.min(len - 1)),
        };
    }

    fn set_cursor(&mut self, index: usize) {
        match self.focus {
            Focus::Tables => self.table_cursor = index,
            Focus::Rows => self.row_cursor = Some(index),
        }
    }
}

/// Grid column widths sized to the header and the loaded values.
pub(crate) fn column_widths(columns: &[ColumnDescriptor], rows: &RowSet) -> Vec<u16> {
    columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let widest_value = rows
                .rows
                .iter()
                .filter_map(|row| row.values.get(index))
                .map(|value| value.to_string().chars().count())
                .max()
                .unwrap_or(0);
            let width = widest_value
                .max(column.name.chars().count())
                .clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
            u16::try_from(width).unwrap_or(u16::MAX)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{column_widths, BrowserView, Focus};
    use crate::models::{CellValue, ColumnDescriptor, Row, RowSet};

    #[test]
    fn row_cursor_clamps_to_loaded_rows() {
        let mut view = BrowserView::default();
        view.reset(1, 3);
        assert_eq!(view.focus, Focus::Rows);
        view.move_selection(10, 3);
        assert_eq!(view.row_cursor, Some(2));
        view.clamp_rows(1);
        assert_eq!(view.row_cursor, Some(0));
        view.clamp_rows(0);
        assert_eq!(view.row_cursor, None);
    }

    #[test]
    fn table_cursor_moves_when_tables_focused() {
        let mut view = BrowserView::default();
        view.move_selection(1, 3);
        view.move_selection(-5, 3);
        assert_eq!(view.table_cursor, 0);
        view.select_last(3);
        assert_eq!(view.table_cursor, 2);
        assert_eq!(view.row_cursor, None);
    }

    #[test]
    fn widths_fit_header_and_values_within_bounds() {
        let column = |name: &str| ColumnDescriptor {
            name: name.to_string(),
            ordinal: 0,
            declared_type: String::new(),
            not_null: false,
            default_value: None,
            primary_key: 0,
            generated: false,
        };
        let rows = RowSet {
            table: "t".into(),
            rows: vec![Row {
                identity: None,
                values: vec![
                    CellValue::Integer(1),
                    CellValue::Text("a fairly long piece of text that keeps going".into()),
                ],
            }],
            truncated: false,
        };
        let widths = column_widths(&[column("id"), column("body")], &rows);
        assert_eq!(widths, vec![4, 32]);
    }
}
