use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;

use crate::config::ViewConfig;
use crate::record::{Field, NodeId, Record};

use super::dirty::DirtyTracker;
use super::form::{Busy, EditableForm, FormControls, FormStatus};
use super::notice::Notices;
use super::render::{self, ListRow, RecordPanel, RowMarker};
use super::selection::{BulkAction, BulkControls, BulkSelection};
use super::tabs::{Tab, TabRequest};

/// Everything the review screen shows, keyed by record identifier.
///
/// Rows, panels, forms and tracker entries are created together by
/// `replace_records` and removed together by `sweep_removed`.
#[derive(Debug)]
pub struct ViewState {
    pub(super) settings: ViewConfig,
    pub(super) root_path: String,
    pub(super) debug_info: Option<Value>,
    pub(super) active_tab: Tab,
    pub(super) results_revealed: bool,
    pub(super) rows: Vec<ListRow>,
    pub(super) panels: Vec<RecordPanel>,
    pub(super) forms: HashMap<NodeId, EditableForm>,
    pub(super) active_panel: Option<NodeId>,
    pub(super) tracker: DirtyTracker,
    pub(super) selection: BulkSelection,
    pub(super) notices: Notices,
}

impl ViewState {
    pub fn new(settings: ViewConfig) -> Self {
        let root_path = settings.root_path.clone();
        Self {
            settings,
            root_path,
            debug_info: None,
            active_tab: Tab::Query,
            results_revealed: false,
            rows: Vec::new(),
            panels: Vec::new(),
            forms: HashMap::new(),
            active_panel: None,
            tracker: DirtyTracker::new(),
            selection: BulkSelection::new(),
            notices: Notices::default(),
        }
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    pub fn settings(&self) -> &ViewConfig {
        &self.settings
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn debug_info(&self) -> Option<&Value> {
        self.debug_info.as_ref()
    }

    pub fn rows(&self) -> &[ListRow] {
        &self.rows
    }

    pub fn panels(&self) -> &[RecordPanel] {
        &self.panels
    }

    pub fn form(&self, id: &NodeId) -> Option<&EditableForm> {
        self.forms.get(id)
    }

    pub fn tracker(&self) -> &DirtyTracker {
        &self.tracker
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut Notices {
        &mut self.notices
    }

    pub fn any_dirty(&self) -> bool {
        self.tracker.any_dirty()
    }

    pub fn is_dirty(&self, id: &NodeId) -> bool {
        self.tracker.is_dirty(id)
    }

    pub fn form_status(&self, id: &NodeId) -> Option<FormStatus> {
        let form = self.forms.get(id)?;
        let status = match form.busy() {
            Some(Busy::Saving) => FormStatus::Saving,
            Some(Busy::Deleting) => FormStatus::Deleting,
            None if self.tracker.is_dirty(id) => FormStatus::Dirty,
            None => FormStatus::Clean,
        };
        Some(status)
    }

    pub fn form_controls(&self, id: &NodeId) -> Option<FormControls> {
        self.form_status(id).map(FormControls::for_status)
    }

    pub fn row(&self, id: &NodeId) -> Option<&ListRow> {
        self.rows.iter().find(|row| &row.node_id == id)
    }

    pub(super) fn row_mut(&mut self, id: &NodeId) -> Option<&mut ListRow> {
        self.rows.iter_mut().find(|row| &row.node_id == id)
    }

    pub fn row_marker(&self, id: &NodeId) -> Option<RowMarker> {
        let row = self.row(id)?;
        let marker = if row.removing_at.is_some() {
            RowMarker::Removing
        } else if self.tracker.is_dirty(id) {
            RowMarker::Edited
        } else if row.saved {
            RowMarker::Saved
        } else {
            RowMarker::Pristine
        };
        Some(marker)
    }

    /// Row-level "reviewed" flag, mirrored from the form checkbox.
    pub fn row_reviewed(&self, id: &NodeId) -> bool {
        self.forms.get(id).map(|f| f.reviewed()).unwrap_or(false)
    }

    pub fn is_selected(&self, id: &NodeId) -> bool {
        self.selection.is_selected(id)
    }

    pub fn bulk_controls(&self) -> BulkControls {
        self.selection.controls(&self.rows, &self.tracker)
    }

    // -------------------------------------------------------------------------
    // Rebuild
    // -------------------------------------------------------------------------

    /// Tear down every row, panel, form, tracker entry and selection, then
    /// render `records` under `root_path`. Returns the number of rows shown.
    pub fn replace_records(&mut self, records: &[Record], root_path: &str) -> usize {
        self.rows.clear();
        self.panels.clear();
        self.forms.clear();
        self.tracker.clear();
        self.selection.reset();
        self.active_panel = None;

        let rendered = render::render_records(records, root_path, &self.settings);
        if !rendered.duplicates.is_empty() {
            self.notices.info(format!(
                "Skipped {} duplicate record(s)",
                rendered.duplicates.len()
            ));
        }

        for form in rendered.forms {
            self.tracker.track(form.node_id().clone());
            self.forms.insert(form.node_id().clone(), form);
        }
        self.rows = rendered.rows;
        self.panels = rendered.panels;
        self.active_panel = self.panels.first().map(|panel| panel.node_id.clone());
        self.root_path = root_path.to_string();

        self.results_revealed = true;
        self.active_tab = Tab::List;
        self.rows.len()
    }

    // -------------------------------------------------------------------------
    // Form editing
    // -------------------------------------------------------------------------

    /// Field input event. Marks the form dirty; read-only fields, unknown
    /// records and forms with a request in flight refuse input.
    pub fn input(&mut self, id: &NodeId, field: Field, value: impl Into<String>) -> bool {
        let Some(form) = self.forms.get_mut(id) else {
            return false;
        };
        if form.busy().is_some() || !form.input(field, value) {
            return false;
        }
        tracing::debug!(node_id = %id, field = field.wire_key(), "field edited");
        self.tracker.mark_dirty(id);
        true
    }

    /// Reviewed checkbox. Never changes dirty state.
    pub fn set_reviewed(&mut self, id: &NodeId, reviewed: bool) -> bool {
        match self.forms.get_mut(id) {
            Some(form) if form.busy().is_none() => {
                form.set_reviewed(reviewed);
                true
            }
            _ => false,
        }
    }

    pub fn toggle_reviewed(&mut self, id: &NodeId) -> bool {
        let reviewed = self.row_reviewed(id);
        self.set_reviewed(id, !reviewed)
    }

    /// Restore baseline values and mark the form clean.
    pub fn reset(&mut self, id: &NodeId) -> bool {
        match self.forms.get_mut(id) {
            Some(form) if form.busy().is_none() => {
                form.reset();
                self.tracker.mark_clean(id);
                true
            }
            _ => false,
        }
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Whether `id` has a row that is not fading out.
    fn is_live(&self, id: &NodeId) -> bool {
        self.row(id).is_some_and(|row| row.removing_at.is_none())
    }

    pub fn set_checked(&mut self, id: &NodeId, checked: bool) -> bool {
        if !self.is_live(id) {
            return false;
        }
        self.selection.set(id.clone(), checked);
        true
    }

    pub fn toggle_checked(&mut self, id: &NodeId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        self.selection.toggle(id)
    }

    pub fn select_all(&mut self, checked: bool) {
        self.selection.select_all(&self.rows, checked);
    }

    pub fn choose_action(&mut self, action: Option<BulkAction>) {
        self.selection.choose_action(action);
    }

    pub fn cycle_action(&mut self) -> Option<BulkAction> {
        let next = BulkAction::cycle(self.selection.action());
        self.selection.choose_action(next);
        next
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn is_tab_visible(&self, tab: Tab) -> bool {
        !tab.needs_results() || self.results_revealed
    }

    pub fn visible_tabs(&self) -> Vec<Tab> {
        Tab::ALL
            .iter()
            .copied()
            .filter(|tab| self.is_tab_visible(*tab))
            .collect()
    }

    /// Switch tabs, asking for confirmation when going back to the query
    /// form with unsaved edits. Evaluated on every attempt.
    pub fn request_tab(&mut self, tab: Tab) -> TabRequest {
        if tab == self.active_tab {
            return TabRequest::Unchanged;
        }
        if !self.is_tab_visible(tab) {
            return TabRequest::Hidden;
        }
        if tab == Tab::Query && self.tracker.any_dirty() {
            return TabRequest::NeedsConfirmation;
        }
        self.active_tab = tab;
        TabRequest::Switched
    }

    /// Switch without the unsaved-changes guard.
    pub fn force_tab(&mut self, tab: Tab) -> TabRequest {
        if !self.is_tab_visible(tab) {
            return TabRequest::Hidden;
        }
        if tab == self.active_tab {
            return TabRequest::Unchanged;
        }
        self.active_tab = tab;
        TabRequest::Switched
    }

    pub fn active_panel(&self) -> Option<&RecordPanel> {
        let id = self.active_panel.as_ref()?;
        self.panels.iter().find(|panel| &panel.node_id == id)
    }

    pub fn active_panel_index(&self) -> Option<usize> {
        let id = self.active_panel.as_ref()?;
        self.panels.iter().position(|panel| &panel.node_id == id)
    }

    pub fn activate_panel(&mut self, id: &NodeId) -> bool {
        if self.panels.iter().any(|panel| &panel.node_id == id) {
            self.active_panel = Some(id.clone());
            true
        } else {
            false
        }
    }

    pub fn next_panel(&mut self) {
        self.shift_panel(1);
    }

    pub fn prev_panel(&mut self) {
        self.shift_panel(-1);
    }

    fn shift_panel(&mut self, delta: isize) {
        if self.panels.is_empty() {
            return;
        }
        let len = self.panels.len() as isize;
        let current = self.active_panel_index().unwrap_or(0) as isize;
        let index = (current + delta).clamp(0, len - 1) as usize;
        self.active_panel = Some(self.panels[index].node_id.clone());
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Latest instant at which a fading row is due for removal.
    pub fn removal_deadline(&self) -> Option<Instant> {
        self.rows.iter().filter_map(|row| row.removing_at).max()
    }

    /// Remove every faded row whose delay has elapsed, together with its
    /// panel, form, tracker entry and selection entry.
    pub fn sweep_removed(&mut self, now: Instant) -> Vec<NodeId> {
        let due: Vec<NodeId> = self
            .rows
            .iter()
            .filter(|row| matches!(row.removing_at, Some(at) if at <= now))
            .map(|row| row.node_id.clone())
            .collect();
        if due.is_empty() {
            return due;
        }

        let old_index = self.active_panel_index();
        for id in &due {
            self.rows.retain(|row| &row.node_id != id);
            self.panels.retain(|panel| &panel.node_id != id);
            self.forms.remove(id);
            self.tracker.remove(id);
            self.selection.remove(id);
        }
        self.selection.retain_rows(&self.rows);

        let active_gone = self
            .active_panel
            .as_ref()
            .map(|id| due.contains(id))
            .unwrap_or(false);
        if active_gone {
            self.active_panel = old_index
                .map(|index| index.min(self.panels.len().saturating_sub(1)))
                .and_then(|index| self.panels.get(index))
                .map(|panel| panel.node_id.clone());
        }

        tracing::debug!(count = due.len(), "removed faded rows");
        due
    }
}
