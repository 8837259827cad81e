use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::events::EntityKind;
use crate::manager::DeleteReport;
use crate::table::{FieldDef, InputKind};

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Capitalized singular name, for dialog titles.
pub(crate) fn noun(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Book => "Book",
        EntityKind::Category => "Category",
        EntityKind::Author => "Author",
    }
}

/// Column width for a table field. Ids and counts stay narrow, the rest share
/// whatever space is left.
pub(crate) fn column_constraint(field: &FieldDef) -> Constraint {
    match (field.label, field.input) {
        ("Id", _) => Constraint::Length(5),
        ("Books", _) => Constraint::Length(6),
        (_, InputKind::Date) => Constraint::Length(12),
        (_, InputKind::Fixed) => Constraint::Length(15),
        _ => Constraint::Fill(1),
    }
}

/// Footer text for a finished batch delete. The flag is `true` when at least
/// one row could not be removed.
pub(crate) fn delete_summary(kind: EntityKind, report: &DeleteReport) -> (String, bool) {
    let deleted = report.deleted.len();
    let noun = if deleted == 1 {
        kind.to_string()
    } else {
        kind.title().to_lowercase()
    };

    match report.failed.as_slice() {
        [] => (format!("Deleted {deleted} {noun}."), false),
        [only] => (
            format!("Deleted {deleted} {noun}; \"{}\" was kept: {}", only.key.label, only.error),
            true,
        ),
        failed => {
            let kept: Vec<&str> = failed.iter().map(|f| f.key.label.as_str()).collect();
            (
                format!(
                    "Deleted {deleted} {noun}; {} kept ({}). {}",
                    failed.len(),
                    kept.join(", "),
                    failed[0].error
                ),
                true,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;
    use crate::manager::{ActionError, DeleteFailure};
    use crate::models::DisplayKey;

    fn in_use(label: &str, id: i64, row: usize) -> DeleteFailure {
        DeleteFailure {
            row,
            key: DisplayKey::new(label, id),
            error: ActionError::Store {
                action: "delete",
                entity: EntityKind::Category,
                source: StoreError::InUse {
                    entity: "category",
                    id,
                },
            },
        }
    }

    #[test]
    fn summary_reports_clean_batches() {
        let report = DeleteReport {
            deleted: vec![DisplayKey::new("Poetry", 3)],
            failed: Vec::new(),
        };
        assert_eq!(
            delete_summary(EntityKind::Category, &report),
            ("Deleted 1 category.".to_string(), false)
        );
    }

    #[test]
    fn summary_names_kept_rows() {
        let report = DeleteReport {
            deleted: vec![DisplayKey::new("Poetry", 3), DisplayKey::new("Drama", 4)],
            failed: vec![in_use("Fantasy", 1, 0), in_use("History", 2, 1)],
        };
        let (text, failed) = delete_summary(EntityKind::Category, &report);
        assert!(failed);
        assert!(text.starts_with("Deleted 2 categories; 2 kept (Fantasy, History)."));
    }
}
