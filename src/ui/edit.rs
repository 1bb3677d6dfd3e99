use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use fnreview::record::{Field, NodeId};

/// The record field an inline edit writes back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub node_id: NodeId,
    pub field: Field,
}

impl FieldRef {
    pub fn new(node_id: NodeId, field: Field) -> Self {
        Self { node_id, field }
    }
}

#[derive(Default)]
pub struct InlineEditor {
    pub active: bool,
    target: Option<FieldRef>,
    original: String,
    input: Input,
}

impl InlineEditor {
    pub fn start(&mut self, current: &str, target: FieldRef) {
        self.active = true;
        self.target = Some(target);
        self.original = current.to_string();
        self.input = Input::new(current.to_string());
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.target = None;
        self.original.clear();
        self.input.reset();
    }

    pub fn target(&self) -> Option<&FieldRef> {
        self.target.as_ref()
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    /// True when the buffer differs from the value the edit started with.
    pub fn changed(&self) -> bool {
        self.input.value() != self.original
    }

    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        self.input.handle_event(&Event::Key(key)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn test_editor_tracks_changes() {
        let mut editor = InlineEditor::default();
        editor.start("555", FieldRef::new(NodeId::from("n1"), Field::Phone));
        assert!(editor.active);
        assert!(!editor.changed());

        editor.handle_key_event(KeyEvent::new(KeyCode::Char('1'), KeyModifiers::NONE));
        assert_eq!(editor.value(), "5551");
        assert!(editor.changed());
        assert_eq!(editor.target().unwrap().field, Field::Phone);

        editor.cancel();
        assert!(!editor.active);
        assert!(editor.target().is_none());
    }
}
