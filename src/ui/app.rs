use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::runtime::Runtime;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use fnreview::config::{Config, UiColors};
use fnreview::query::QueryCriteria;
use fnreview::record::{Field, NodeId};
use fnreview::remote::HttpBackend;
use fnreview::view::{
    ActionOutcome, DeleteOutcome, QueryOutcome, RecordPanel, SaveOutcome, Tab, TabRequest,
    ViewState,
};

use super::draw;
use super::edit::{FieldRef, InlineEditor};

/// Which search form input has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFocus {
    Path,
    Filter,
}

#[derive(Debug, Clone)]
pub struct ConfirmModal {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

/// Action to perform when confirm modal is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    /// Delete the checked rows
    DeleteSelected,
    /// Go back to the search form, keeping unsaved edits in memory
    ShowQuery,
    /// Run the search again, discarding unsaved edits
    Requery,
    /// Leave the application with unsaved edits
    Quit,
}

pub struct App<'a> {
    config: &'a Config,
    backend: HttpBackend,
    runtime: Runtime,
    pub view: ViewState,
    pub path_input: Input,
    pub filter_input: Input,
    pub query_focus: QueryFocus,
    /// Highlighted list row
    pub list_cursor: usize,
    /// Highlighted field of the active record panel
    pub field_cursor: usize,
    pub editor: InlineEditor,
    pub confirm_modal: Option<ConfirmModal>,
}

impl<'a> App<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        let backend = HttpBackend::new(&config.backend)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let mut view = ViewState::new(config.view.clone());
        for warning in &config.warnings {
            view.notices_mut().info(warning.clone());
        }

        Ok(Self {
            config,
            backend,
            runtime,
            view,
            path_input: Input::new(config.view.root_path.clone()),
            filter_input: Input::default(),
            query_focus: QueryFocus::Path,
            list_cursor: 0,
            field_cursor: 0,
            editor: InlineEditor::default(),
            confirm_modal: None,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }

            if !self.view.sweep_removed(Instant::now()).is_empty() {
                self.clamp_cursors();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        // Ctrl+C always quits (hardcoded for safety)
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Ok(true);
        }

        if self.confirm_modal.is_some() {
            return self.handle_confirm_modal_key(key);
        }

        if self.editor.active {
            self.handle_editor_key(key);
            return Ok(false);
        }

        match self.view.active_tab() {
            Tab::Query => self.handle_query_key(key),
            Tab::List => self.handle_list_key(key),
            Tab::Update => self.handle_update_key(key),
        }
    }

    // -------------------------------------------------------------------------
    // Shared navigation
    // -------------------------------------------------------------------------

    /// Tab switching and quit, shared by the list and update contexts.
    /// Returns `Some(quit)` when the key was consumed.
    fn handle_global_key(&mut self, key: &KeyEvent) -> Option<bool> {
        let config = self.config;
        let keys = &config.keys;

        if self.key_matches_any(key, &keys.quit) {
            return Some(self.request_quit());
        }
        if self.key_matches_any(key, &keys.tab_next) {
            self.step_tab(true);
            return Some(false);
        }
        if self.key_matches_any(key, &keys.tab_prev) {
            self.step_tab(false);
            return Some(false);
        }
        if let KeyCode::Char(digit) = key.code {
            if let Some(tab) = Tab::from_digit(digit) {
                self.switch_tab(tab);
                return Some(false);
            }
        }
        None
    }

    fn step_tab(&mut self, forward: bool) {
        let visible = self.view.visible_tabs();
        let mut tab = self.view.active_tab();
        loop {
            tab = if forward { tab.next() } else { tab.prev() };
            if visible.contains(&tab) {
                break;
            }
        }
        self.switch_tab(tab);
    }

    fn switch_tab(&mut self, tab: Tab) {
        match self.view.request_tab(tab) {
            TabRequest::Switched => self.field_cursor = 0,
            TabRequest::NeedsConfirmation => {
                self.confirm_modal = Some(ConfirmModal {
                    title: "UNSAVED CHANGES".to_string(),
                    message: format!(
                        "{} record(s) have unsaved edits. Go back to the search form?",
                        self.view.tracker().dirty_count()
                    ),
                    action: ConfirmAction::ShowQuery,
                });
            }
            TabRequest::Hidden => self.set_status("Run a query first"),
            TabRequest::Unchanged => {}
        }
    }

    fn request_quit(&mut self) -> bool {
        if !self.view.any_dirty() {
            return true;
        }
        self.confirm_modal = Some(ConfirmModal {
            title: "QUIT".to_string(),
            message: format!(
                "Unsaved edits on {}. Quit anyway?",
                dirty_summary(&self.view.tracker().dirty_ids())
            ),
            action: ConfirmAction::Quit,
        });
        false
    }

    // -------------------------------------------------------------------------
    // Query tab
    // -------------------------------------------------------------------------

    fn handle_query_key(&mut self, key: KeyEvent) -> Result<bool> {
        let config = self.config;
        let keys = &config.keys;

        // Printable keys belong to the inputs here, so only Esc quits
        if matches!(key.code, KeyCode::Esc) {
            return Ok(self.request_quit());
        }
        if self.key_matches_any(&key, &keys.submit) {
            self.request_query();
            return Ok(false);
        }
        if self.key_matches_any(&key, &keys.tab_next) {
            self.step_tab(true);
            return Ok(false);
        }
        if self.key_matches_any(&key, &keys.tab_prev) {
            self.step_tab(false);
            return Ok(false);
        }

        match key.code {
            KeyCode::Up | KeyCode::Down => {
                self.query_focus = match self.query_focus {
                    QueryFocus::Path => QueryFocus::Filter,
                    QueryFocus::Filter => QueryFocus::Path,
                };
            }
            _ => {
                let input = match self.query_focus {
                    QueryFocus::Path => &mut self.path_input,
                    QueryFocus::Filter => &mut self.filter_input,
                };
                input.handle_event(&Event::Key(key));
            }
        }
        Ok(false)
    }

    fn request_query(&mut self) {
        if self.view.any_dirty() {
            self.confirm_modal = Some(ConfirmModal {
                title: "DISCARD EDITS".to_string(),
                message: format!(
                    "Searching again discards unsaved edits on {} record(s). Continue?",
                    self.view.tracker().dirty_count()
                ),
                action: ConfirmAction::Requery,
            });
            return;
        }
        self.run_query();
    }

    fn run_query(&mut self) {
        let criteria = QueryCriteria::new(self.path_input.value(), self.filter_input.value());
        let outcome = self
            .runtime
            .block_on(self.view.submit_query(&self.backend, &criteria));
        if let QueryOutcome::Loaded { .. } = outcome {
            self.list_cursor = 0;
            self.field_cursor = 0;
        }
    }

    // -------------------------------------------------------------------------
    // List tab
    // -------------------------------------------------------------------------

    fn handle_list_key(&mut self, key: KeyEvent) -> Result<bool> {
        if let Some(quit) = self.handle_global_key(&key) {
            return Ok(quit);
        }
        let config = self.config;
        let keys = &config.keys;

        if self.key_matches_any(&key, &keys.next) {
            self.move_list_cursor(1);
        } else if self.key_matches_any(&key, &keys.prev) {
            self.move_list_cursor(-1);
        } else if self.key_matches_any(&key, &keys.toggle) {
            if let Some(id) = self.cursor_row_id() {
                self.view.toggle_checked(&id);
            }
        } else if self.key_matches_any(&key, &keys.select_all) {
            let checked = !self.view.bulk_controls().select_all_checked;
            self.view.select_all(checked);
        } else if self.key_matches_any(&key, &keys.cycle_action) {
            let action = self.view.cycle_action();
            let title = action.map(|a| a.title()).unwrap_or("none");
            self.set_status(format!("Action: {}", title));
        } else if self.key_matches_any(&key, &keys.execute) {
            self.execute_action();
        } else if self.key_matches_any(&key, &keys.delete) {
            self.request_delete();
        } else if self.key_matches_any(&key, &keys.edit) {
            if let Some(id) = self.cursor_row_id() {
                self.view.activate_panel(&id);
                self.switch_tab(Tab::Update);
            }
        }
        Ok(false)
    }

    fn cursor_row_id(&self) -> Option<NodeId> {
        self.view
            .rows()
            .get(self.list_cursor)
            .map(|row| row.node_id.clone())
    }

    fn move_list_cursor(&mut self, delta: isize) {
        let len = self.view.rows().len();
        if len == 0 {
            self.list_cursor = 0;
            return;
        }
        let next = (self.list_cursor as isize + delta).clamp(0, len as isize - 1);
        self.list_cursor = next as usize;
    }

    fn execute_action(&mut self) {
        let outcome = self
            .runtime
            .block_on(self.view.execute_action(&self.backend));
        match outcome {
            ActionOutcome::Disabled => {
                self.set_status("Choose an action and select at least one row")
            }
            ActionOutcome::Committed(_) | ActionOutcome::Notified(..) => {}
        }
    }

    fn request_delete(&mut self) {
        let controls = self.view.bulk_controls();
        if !controls.delete_enabled {
            self.set_status("Nothing selected");
            return;
        }
        self.confirm_modal = Some(ConfirmModal {
            title: "DELETE".to_string(),
            message: format!("Delete {} selected record(s)?", controls.selected),
            action: ConfirmAction::DeleteSelected,
        });
    }

    fn delete_selected(&mut self) {
        let outcome = self
            .runtime
            .block_on(self.view.delete_selected(&self.backend));
        if let DeleteOutcome::Skipped = outcome {
            self.set_status("Nothing to delete");
        }
    }

    // -------------------------------------------------------------------------
    // Update tab
    // -------------------------------------------------------------------------

    fn handle_update_key(&mut self, key: KeyEvent) -> Result<bool> {
        if let Some(quit) = self.handle_global_key(&key) {
            return Ok(quit);
        }
        let config = self.config;
        let keys = &config.keys;

        if self.key_matches_any(&key, &keys.panel_next) {
            self.view.next_panel();
            self.field_cursor = 0;
        } else if self.key_matches_any(&key, &keys.panel_prev) {
            self.view.prev_panel();
            self.field_cursor = 0;
        } else if self.key_matches_any(&key, &keys.next) {
            self.move_field_cursor(1);
        } else if self.key_matches_any(&key, &keys.prev) {
            self.move_field_cursor(-1);
        } else if self.key_matches_any(&key, &keys.toggle) {
            if let Some(id) = self.active_panel().map(|p| p.node_id.clone()) {
                self.view.toggle_reviewed(&id);
            }
        } else if self.key_matches_any(&key, &keys.edit) {
            self.begin_edit();
        } else if self.key_matches_any(&key, &keys.save) {
            self.save_active();
        } else if self.key_matches_any(&key, &keys.reset) {
            if let Some(id) = self.active_panel().map(|p| p.node_id.clone()) {
                if self.view.is_dirty(&id) && self.view.reset(&id) {
                    self.set_status(format!("Reset {}", id));
                }
            }
        }
        Ok(false)
    }

    pub fn active_panel(&self) -> Option<&RecordPanel> {
        self.view.active_panel()
    }

    fn move_field_cursor(&mut self, delta: isize) {
        let Some(panel) = self.active_panel() else {
            return;
        };
        let len = panel.fields.len() as isize;
        if len == 0 {
            return;
        }
        let next = (self.field_cursor as isize + delta).clamp(0, len - 1);
        self.field_cursor = next as usize;
    }

    fn begin_edit(&mut self) {
        let Some(panel) = self.active_panel() else {
            return;
        };
        let Some(field) = panel.fields.get(self.field_cursor).cloned() else {
            return;
        };
        let node_id = panel.node_id.clone();
        if field.read_only {
            self.set_status(format!("{} is read-only", field.label));
            return;
        }
        let target = FieldRef::new(node_id, field.field);
        let current = self
            .view
            .form(&target.node_id)
            .map(|form| form.value(target.field).to_string())
            .unwrap_or_default();
        self.editor.start(&current, target);
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys;

        if matches!(key.code, KeyCode::Esc) {
            self.editor.cancel();
            self.set_status("Edit cancelled");
            return;
        }

        if self.key_matches_any(&key, &keys.submit) {
            if let Some(target) = self.editor.target().cloned() {
                if self.editor.changed() {
                    let value = self.editor.value().to_string();
                    self.view.input(&target.node_id, target.field, value);
                }
            }
            self.editor.cancel();
            return;
        }

        self.editor.handle_key_event(key);
    }

    fn save_active(&mut self) {
        let Some(id) = self.active_panel().map(|p| p.node_id.clone()) else {
            return;
        };
        let outcome = self.runtime.block_on(self.view.save(&self.backend, &id));
        if let SaveOutcome::Skipped = outcome {
            self.set_status("No unsaved edits");
        }
    }

    // -------------------------------------------------------------------------
    // Confirm modal
    // -------------------------------------------------------------------------

    fn handle_confirm_modal_key(&mut self, key: KeyEvent) -> Result<bool> {
        let Some(modal) = self.confirm_modal.take() else {
            return Ok(false);
        };
        let config = self.config;
        let keys = &config.keys;

        if self.key_matches_any(&key, &keys.cancel) {
            return Ok(false);
        }

        if self.key_matches_any(&key, &keys.confirm) {
            match modal.action {
                ConfirmAction::DeleteSelected => self.delete_selected(),
                ConfirmAction::ShowQuery => {
                    self.view.force_tab(Tab::Query);
                }
                ConfirmAction::Requery => self.run_query(),
                ConfirmAction::Quit => return Ok(true),
            }
            return Ok(false);
        }

        // Put the modal back if key wasn't handled
        self.confirm_modal = Some(modal);
        Ok(false)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn clamp_cursors(&mut self) {
        let rows = self.view.rows().len();
        if self.list_cursor >= rows {
            self.list_cursor = rows.saturating_sub(1);
        }
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.view.notices_mut().info(message);
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn is_editing(&self, field: Field) -> bool {
        self.editor.active
            && self
                .editor
                .target()
                .map(|target| target.field == field)
                .unwrap_or(false)
    }

    fn key_matches_any(&self, event: &KeyEvent, bindings: &[String]) -> bool {
        bindings.iter().any(|b| key_matches_single(event, b))
    }
}

/// Comma-separated ids for confirm prompts, cut after three.
fn dirty_summary(ids: &[NodeId]) -> String {
    let shown: Vec<String> = ids.iter().take(3).map(|id| id.to_string()).collect();
    match ids.len().saturating_sub(shown.len()) {
        0 => shown.join(", "),
        more => format!("{} and {} more", shown.join(", "), more),
    }
}

/// Check if the key event matches a single binding string
pub fn key_matches_single(event: &KeyEvent, binding: &str) -> bool {
    let trimmed = binding.trim();
    if trimmed.is_empty() {
        return false;
    }

    // Disallow Ctrl/Alt/Super modifiers (we don't support them)
    let disallowed = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
    if event.modifiers.intersects(disallowed) {
        return false;
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "enter" => matches!(event.code, KeyCode::Enter),
        "tab" => matches!(event.code, KeyCode::Tab),
        "backtab" | "shift+tab" => matches!(event.code, KeyCode::BackTab),
        "backspace" => matches!(event.code, KeyCode::Backspace),
        "esc" | "escape" => matches!(event.code, KeyCode::Esc),
        "space" => matches!(event.code, KeyCode::Char(' ')),
        "up" => matches!(event.code, KeyCode::Up),
        "down" => matches!(event.code, KeyCode::Down),
        "left" => matches!(event.code, KeyCode::Left),
        "right" => matches!(event.code, KeyCode::Right),
        "pageup" | "page_up" => matches!(event.code, KeyCode::PageUp),
        "pagedown" | "page_down" => matches!(event.code, KeyCode::PageDown),
        "home" => matches!(event.code, KeyCode::Home),
        "end" => matches!(event.code, KeyCode::End),
        // Single character - case-sensitive
        _ => {
            let mut chars = trimmed.chars();
            if let (Some(first), None) = (chars.next(), chars.next()) {
                matches!(event.code, KeyCode::Char(c) if c == first)
            } else {
                false
            }
        }
    }
}
