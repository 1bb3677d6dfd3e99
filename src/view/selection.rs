use std::collections::HashSet;

use crate::record::NodeId;

use super::dirty::DirtyTracker;
use super::render::ListRow;

/// Actions offered by the bulk action picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    /// Save every selected record with unsaved edits
    Commit,
    /// Move files (not wired to the backend yet)
    Move,
    /// Export to CSV (not wired to the backend yet)
    Export,
}

impl BulkAction {
    pub const ALL: [BulkAction; 3] = [BulkAction::Commit, BulkAction::Move, BulkAction::Export];

    pub fn title(self) -> &'static str {
        match self {
            BulkAction::Commit => "commit",
            BulkAction::Move => "move",
            BulkAction::Export => "export",
        }
    }

    /// Picker order: none, commit, move, export, none.
    pub fn cycle(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(BulkAction::Commit),
            Some(BulkAction::Commit) => Some(BulkAction::Move),
            Some(BulkAction::Move) => Some(BulkAction::Export),
            Some(BulkAction::Export) => None,
        }
    }
}

/// Derived state of the bulk controls above the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkControls {
    pub selected: usize,
    pub dirty_selected: usize,
    pub select_all_checked: bool,
    pub execute_enabled: bool,
    pub delete_enabled: bool,
    pub action: Option<BulkAction>,
}

impl BulkControls {
    /// `"2 selected (1 edited)"`, `"3 selected"`, `"0 selected"`.
    pub fn label(&self) -> String {
        if self.dirty_selected > 0 {
            format!("{} selected ({} edited)", self.selected, self.dirty_selected)
        } else {
            format!("{} selected", self.selected)
        }
    }
}

/// Checkbox selection plus the chosen bulk action.
#[derive(Debug, Default, Clone)]
pub struct BulkSelection {
    selected: HashSet<NodeId>,
    action: Option<BulkAction>,
}

impl BulkSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, id: &NodeId) -> bool {
        self.selected.contains(id)
    }

    pub fn set(&mut self, id: NodeId, checked: bool) {
        if checked {
            self.selected.insert(id);
        } else {
            self.selected.remove(&id);
        }
    }

    /// Returns the new checked state.
    pub fn toggle(&mut self, id: &NodeId) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    /// Make every live row match the select-all checkbox. Rows fading out
    /// after a delete are never selected.
    pub fn select_all(&mut self, rows: &[ListRow], checked: bool) {
        if checked {
            self.selected = live_rows(rows).map(|row| row.node_id.clone()).collect();
        } else {
            self.selected.clear();
        }
    }

    pub fn action(&self) -> Option<BulkAction> {
        self.action
    }

    pub fn choose_action(&mut self, action: Option<BulkAction>) {
        self.action = action;
    }

    pub fn remove(&mut self, id: &NodeId) {
        self.selected.remove(id);
    }

    /// Drop selected ids that no longer have a row.
    pub fn retain_rows(&mut self, rows: &[ListRow]) {
        let present: HashSet<&NodeId> = rows.iter().map(|row| &row.node_id).collect();
        self.selected.retain(|id| present.contains(id));
    }

    /// Unchecks every row and clears the action picker.
    pub fn reset(&mut self) {
        self.selected.clear();
        self.action = None;
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids of live rows, in list order.
    pub fn selected_in_order(&self, rows: &[ListRow]) -> Vec<NodeId> {
        live_rows(rows)
            .filter(|row| self.selected.contains(&row.node_id))
            .map(|row| row.node_id.clone())
            .collect()
    }

    pub fn controls(&self, rows: &[ListRow], tracker: &DirtyTracker) -> BulkControls {
        let selected = self.selected_in_order(rows);
        let dirty_selected = selected.iter().filter(|id| tracker.is_dirty(id)).count();
        let count = selected.len();
        let live = live_rows(rows).count();
        BulkControls {
            selected: count,
            dirty_selected,
            select_all_checked: live > 0 && count == live,
            execute_enabled: self.action.is_some() && count > 0,
            delete_enabled: count > 0,
            action: self.action,
        }
    }
}

fn live_rows(rows: &[ListRow]) -> impl Iterator<Item = &ListRow> {
    rows.iter().filter(|row| row.removing_at.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::record::Record;
    use crate::view::render::build_row;

    fn rows(ids: &[&str]) -> Vec<ListRow> {
        ids.iter()
            .map(|id| build_row(&Record::new(*id, ""), "", &ViewConfig::default()))
            .collect()
    }

    #[test]
    fn test_select_all_then_uncheck_one() {
        let rows = rows(&["a", "b", "c"]);
        let mut tracker = DirtyTracker::new();
        for row in &rows {
            tracker.track(row.node_id.clone());
        }
        let mut selection = BulkSelection::new();

        selection.select_all(&rows, true);
        assert!(selection.controls(&rows, &tracker).select_all_checked);

        selection.toggle(&NodeId::from("b"));
        let controls = selection.controls(&rows, &tracker);
        assert_eq!(controls.label(), "2 selected");
        assert!(!controls.select_all_checked);

        tracker.mark_dirty(&NodeId::from("c"));
        let controls = selection.controls(&rows, &tracker);
        assert_eq!(controls.label(), "2 selected (1 edited)");
    }

    #[test]
    fn test_enabled_state() {
        let rows = rows(&["a", "b"]);
        let tracker = DirtyTracker::new();
        let mut selection = BulkSelection::new();

        let controls = selection.controls(&rows, &tracker);
        assert_eq!(controls.label(), "0 selected");
        assert!(!controls.delete_enabled);
        assert!(!controls.execute_enabled);

        selection.choose_action(Some(BulkAction::Export));
        assert!(!selection.controls(&rows, &tracker).execute_enabled);

        selection.set(NodeId::from("a"), true);
        let controls = selection.controls(&rows, &tracker);
        assert!(controls.execute_enabled);
        assert!(controls.delete_enabled);

        selection.choose_action(None);
        let controls = selection.controls(&rows, &tracker);
        assert!(!controls.execute_enabled);
        assert!(controls.delete_enabled);
    }

    #[test]
    fn test_retain_and_order() {
        let all = rows(&["a", "b", "c"]);
        let mut selection = BulkSelection::new();
        selection.set(NodeId::from("c"), true);
        selection.set(NodeId::from("a"), true);
        assert_eq!(
            selection.selected_in_order(&all),
            vec![NodeId::from("a"), NodeId::from("c")]
        );

        let remaining = rows(&["b", "c"]);
        selection.retain_rows(&remaining);
        assert_eq!(selection.len(), 1);
        assert!(selection.is_selected(&NodeId::from("c")));
    }

    #[test]
    fn test_fading_rows_are_not_selectable() {
        let mut all = rows(&["a", "b", "c"]);
        all[0].removing_at = Some(std::time::Instant::now());
        let tracker = DirtyTracker::new();
        let mut selection = BulkSelection::new();

        selection.select_all(&all, true);
        assert!(!selection.is_selected(&NodeId::from("a")));
        let controls = selection.controls(&all, &tracker);
        assert_eq!(controls.label(), "2 selected");
        assert!(controls.select_all_checked);

        selection.set(NodeId::from("a"), true);
        assert_eq!(
            selection.selected_in_order(&all),
            vec![NodeId::from("b"), NodeId::from("c")]
        );
    }

    #[test]
    fn test_action_cycle() {
        let mut action = None;
        let mut seen = Vec::new();
        for _ in 0..4 {
            action = BulkAction::cycle(action);
            seen.push(action);
        }
        assert_eq!(
            seen,
            vec![
                Some(BulkAction::Commit),
                Some(BulkAction::Move),
                Some(BulkAction::Export),
                None
            ]
        );
    }
}
