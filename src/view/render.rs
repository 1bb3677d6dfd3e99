//! Builds list rows and record panels from query results.
//!
//! Rendering is a pure function of the records, the display root and the
//! view settings; `ViewState` swaps the result in wholesale.

use std::collections::HashSet;
use std::time::Instant;

use crate::config::ViewConfig;
use crate::record::{Field, NodeId, Record};

use super::form::EditableForm;

const ELLIPSIS: &str = "...";

/// List table columns, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Node,
    Category,
    Name,
    Phone,
    Cell,
    Description,
    Location,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Node,
        Column::Category,
        Column::Name,
        Column::Phone,
        Column::Cell,
        Column::Description,
        Column::Location,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Column::Node => "Node",
            Column::Category => "Category",
            Column::Name => "Name",
            Column::Phone => "Phone",
            Column::Cell => "Cell",
            Column::Description => "Description",
            Column::Location => "Location",
        }
    }

    fn field(self) -> Field {
        match self {
            Column::Node => Field::NodeId,
            Column::Category => Field::Category,
            Column::Name => Field::ContactName,
            Column::Phone => Field::Phone,
            Column::Cell => Field::Cell,
            Column::Description => Field::Description,
            Column::Location => Field::FilePath,
        }
    }
}

/// One table cell: possibly truncated text plus the full value as title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCell {
    pub text: String,
    pub title: String,
}

/// Status marker shown in a row's last column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMarker {
    Pristine,
    Edited,
    Saved,
    Removing,
}

impl RowMarker {
    pub fn label(self) -> &'static str {
        match self {
            RowMarker::Pristine => "",
            RowMarker::Edited => "Edited",
            RowMarker::Saved => "Saved",
            RowMarker::Removing => "Removing",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListRow {
    pub node_id: NodeId,
    pub cells: Vec<RowCell>,
    /// Set after the record's first successful save in this view.
    pub saved: bool,
    /// When set, the row is fading out and goes away at this instant.
    pub removing_at: Option<Instant>,
}

impl ListRow {
    pub fn cell(&self, column: Column) -> &RowCell {
        let index = Column::ALL
            .iter()
            .position(|c| *c == column)
            .unwrap_or_default();
        &self.cells[index]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelField {
    pub field: Field,
    pub label: &'static str,
    pub read_only: bool,
    pub multiline: bool,
}

/// Sub-tab and field layout of one record's edit panel.
#[derive(Debug, Clone)]
pub struct RecordPanel {
    pub node_id: NodeId,
    /// Sub-tab button text
    pub label: String,
    pub fields: Vec<PanelField>,
}

/// Output of a full rebuild.
#[derive(Debug, Default)]
pub struct Rendered {
    pub rows: Vec<ListRow>,
    pub panels: Vec<RecordPanel>,
    pub forms: Vec<EditableForm>,
    /// Identifiers dropped because they appeared more than once
    pub duplicates: Vec<NodeId>,
}

pub fn render_records(records: &[Record], root_path: &str, settings: &ViewConfig) -> Rendered {
    let mut rendered = Rendered::default();
    let mut seen: HashSet<&NodeId> = HashSet::new();

    for record in records {
        if !seen.insert(&record.node_id) {
            tracing::warn!(node_id = %record.node_id, "duplicate record in query response, skipped");
            rendered.duplicates.push(record.node_id.clone());
            continue;
        }
        let ordinal = rendered.panels.len() + 1;
        rendered.rows.push(build_row(record, root_path, settings));
        rendered.panels.push(build_panel(record, ordinal));
        rendered.forms.push(EditableForm::from_record(record));
    }

    rendered
}

pub fn build_row(record: &Record, root_path: &str, settings: &ViewConfig) -> ListRow {
    let cells = Column::ALL
        .iter()
        .map(|column| {
            let raw = record.value(column.field());
            match column {
                Column::Description => RowCell {
                    text: truncate(raw, settings.description_width),
                    title: raw.to_string(),
                },
                Column::Location => {
                    let subpath = strip_root(raw, root_path);
                    RowCell {
                        text: truncate(subpath, settings.path_width),
                        title: subpath.to_string(),
                    }
                }
                _ => RowCell {
                    text: raw.to_string(),
                    title: raw.to_string(),
                },
            }
        })
        .collect();

    ListRow {
        node_id: record.node_id.clone(),
        cells,
        saved: false,
        removing_at: None,
    }
}

/// `ordinal` is 1-based and only used for unnamed records.
pub fn build_panel(record: &Record, ordinal: usize) -> RecordPanel {
    let name = record.value(Field::ContactName);
    let label = if name.is_empty() {
        format!("Record {}", ordinal)
    } else {
        name.to_string()
    };

    let fields = Field::PANEL_ORDER
        .iter()
        .map(|field| PanelField {
            field: *field,
            label: field.label(),
            read_only: field.is_read_only(),
            multiline: field.is_multiline(),
        })
        .collect();

    RecordPanel {
        node_id: record.node_id.clone(),
        label,
        fields,
    }
}

/// Cut `value` to `max_chars` characters and append `...` when it was longer.
pub fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{}", &value[..byte_index], ELLIPSIS),
        None => value.to_string(),
    }
}

/// Drop `root` from the front of `path` when it matches case-insensitively.
pub fn strip_root<'a>(path: &'a str, root: &str) -> &'a str {
    if root.is_empty() {
        return path;
    }

    let mut path_chars = path.char_indices();
    for root_char in root.chars() {
        match path_chars.next() {
            Some((_, path_char)) if chars_match(path_char, root_char) => {}
            _ => return path,
        }
    }

    match path_chars.next() {
        Some((byte_index, _)) => &path[byte_index..],
        None => "",
    }
}

fn chars_match(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ViewConfig {
        ViewConfig::default()
    }

    fn record(id: &str, name: &str) -> Record {
        Record::new(id, format!("C:\\Users\\termi\\Dropbox\\{}.pdf", id))
            .with_value(Field::ContactName, name)
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 47), "short");
        let exact = "a".repeat(47);
        assert_eq!(truncate(&exact, 47), exact);
        let long = "b".repeat(48);
        assert_eq!(truncate(&long, 47), format!("{}...", "b".repeat(47)));
    }

    #[test]
    fn test_truncate_counts_characters() {
        let text = "ÉÉÉÉÉ";
        assert_eq!(truncate(text, 3), "ÉÉÉ...");
    }

    #[test]
    fn test_strip_root_case_insensitive() {
        let path = "C:\\Users\\termi\\Dropbox\\cards\\a.pdf";
        assert_eq!(strip_root(path, "c:\\users\\TERMI\\dropbox\\"), "cards\\a.pdf");
        assert_eq!(strip_root(path, "D:\\"), path);
        assert_eq!(strip_root(path, ""), path);
        assert_eq!(strip_root("C:\\x", "C:\\x"), "");
        assert_eq!(strip_root("C:\\", "C:\\longer"), "C:\\");
    }

    #[test]
    fn test_row_columns_and_truncation() {
        let description = "d".repeat(60);
        let deep = format!("C:\\Users\\termi\\Dropbox\\{}\\file.pdf", "x".repeat(100));
        let mut rec = record("n1", "Nadine").with_value(Field::Description, description.clone());
        rec.file_path = deep.clone();

        let row = build_row(&rec, "C:\\Users\\termi\\Dropbox\\", &settings());
        assert_eq!(row.cells.len(), Column::ALL.len());
        assert_eq!(row.cell(Column::Node).text, "n1");
        assert_eq!(row.cell(Column::Name).text, "Nadine");
        assert_eq!(row.cell(Column::Description).text.chars().count(), 50);
        assert_eq!(row.cell(Column::Description).title, description);

        let location = row.cell(Column::Location);
        assert!(location.text.ends_with("..."));
        assert_eq!(location.text.chars().count(), 90);
        assert!(location.title.starts_with("xxx"));
        assert!(!location.title.contains("Dropbox"));
    }

    #[test]
    fn test_panel_layout() {
        let panel = build_panel(&record("n1", ""), 3);
        assert_eq!(panel.label, "Record 3");
        let labels: Vec<_> = panel.fields.iter().map(|f| f.label).collect();
        assert_eq!(
            labels,
            vec![
                "Node ID",
                "Category",
                "Company",
                "Contact Name",
                "Phone",
                "Cell",
                "Email",
                "Description",
                "Context Note",
                "Location"
            ]
        );
        let read_only: Vec<_> = panel
            .fields
            .iter()
            .filter(|f| f.read_only)
            .map(|f| f.field)
            .collect();
        assert_eq!(read_only, vec![Field::NodeId, Field::FilePath]);

        let named = build_panel(&record("n2", "Nadine Byers"), 1);
        assert_eq!(named.label, "Nadine Byers");
    }

    #[test]
    fn test_render_skips_duplicates() {
        let records = vec![record("a", "A"), record("b", "B"), record("a", "again")];
        let rendered = render_records(&records, "", &settings());
        assert_eq!(rendered.rows.len(), 2);
        assert_eq!(rendered.panels.len(), 2);
        assert_eq!(rendered.forms.len(), 2);
        assert_eq!(rendered.duplicates, vec![NodeId::from("a")]);
        assert_eq!(rendered.panels[0].label, "A");
    }
}
