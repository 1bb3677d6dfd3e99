use crate::record::{Field, FieldValues, NodeId, Record};

/// A request in flight for a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Busy {
    Saving,
    Deleting,
}

/// Externally visible state of a record form.
///
/// `Clean -> Dirty -> Saving -> Clean` on success, `Saving -> Dirty` on
/// failure; `Clean|Dirty -> Deleting -> (removed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    Clean,
    Dirty,
    Saving,
    Deleting,
}

/// Enabled state of a form's buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormControls {
    pub save_enabled: bool,
    pub reset_enabled: bool,
}

impl FormControls {
    pub fn for_status(status: FormStatus) -> Self {
        let enabled = status == FormStatus::Dirty;
        Self {
            save_enabled: enabled,
            reset_enabled: enabled,
        }
    }
}

/// Baseline and current values of one record panel.
#[derive(Debug, Clone)]
pub struct EditableForm {
    node_id: NodeId,
    file_path: String,
    baseline: FieldValues,
    current: FieldValues,
    pub(crate) busy: Option<Busy>,
}

impl EditableForm {
    pub fn from_record(record: &Record) -> Self {
        Self {
            node_id: record.node_id.clone(),
            file_path: record.file_path.clone(),
            baseline: record.values.clone(),
            current: record.values.clone(),
            busy: None,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn baseline(&self) -> &FieldValues {
        &self.baseline
    }

    pub fn current(&self) -> &FieldValues {
        &self.current
    }

    pub fn busy(&self) -> Option<Busy> {
        self.busy
    }

    /// Current value of any panel field, read-only ones included.
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::NodeId => self.node_id.as_str(),
            Field::FilePath => &self.file_path,
            other => self.current.get(other).unwrap_or_default(),
        }
    }

    pub fn reviewed(&self) -> bool {
        self.current.reviewed
    }

    /// Apply field input. Returns false for read-only fields.
    pub fn input(&mut self, field: Field, value: impl Into<String>) -> bool {
        self.current.set(field, value)
    }

    pub fn set_reviewed(&mut self, reviewed: bool) {
        self.current.reviewed = reviewed;
    }

    /// Restore every field, the reviewed flag included, to the baseline.
    pub fn reset(&mut self) {
        self.current = self.baseline.clone();
    }

    /// Adopt `saved` as the new baseline after a successful save.
    pub fn commit_baseline(&mut self, saved: FieldValues) {
        self.baseline = saved;
    }

    pub fn differs_from_baseline(&self) -> bool {
        self.current != self.baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> EditableForm {
        let record = Record::new("busCard-1", "C:\\cards\\one.pdf")
            .with_value(Field::ContactName, "Nadine Byers")
            .with_value(Field::Phone, "780-609-0660");
        EditableForm::from_record(&record)
    }

    #[test]
    fn test_input_and_reset() {
        let mut form = form();
        assert!(form.input(Field::Phone, "555-0000"));
        assert!(form.input(Field::Email, "n@example.com"));
        form.set_reviewed(true);
        assert!(form.differs_from_baseline());

        form.reset();
        assert_eq!(form.current(), form.baseline());
        assert_eq!(form.value(Field::Phone), "780-609-0660");
        assert!(!form.reviewed());
    }

    #[test]
    fn test_read_only_fields_refuse_input() {
        let mut form = form();
        assert!(!form.input(Field::NodeId, "other"));
        assert!(!form.input(Field::FilePath, "/elsewhere"));
        assert_eq!(form.value(Field::NodeId), "busCard-1");
        assert_eq!(form.value(Field::FilePath), "C:\\cards\\one.pdf");
    }

    #[test]
    fn test_commit_baseline_survives_reset() {
        let mut form = form();
        form.input(Field::Phone, "555-0000");
        let saved = form.current().clone();
        form.commit_baseline(saved);
        form.reset();
        assert_eq!(form.value(Field::Phone), "555-0000");
    }

    #[test]
    fn test_controls_follow_status() {
        let dirty = FormControls::for_status(FormStatus::Dirty);
        assert!(dirty.save_enabled && dirty.reset_enabled);
        for status in [FormStatus::Clean, FormStatus::Saving, FormStatus::Deleting] {
            let controls = FormControls::for_status(status);
            assert!(!controls.save_enabled && !controls.reset_enabled);
        }
    }
}
