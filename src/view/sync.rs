//! Backend round trips for the review view.
//!
//! Every operation here awaits the backend while holding `&mut ViewState`,
//! then reconciles forms, rows and the dirty tracker from the reply.
//! Failures never leave local state half-applied: they are logged, pushed
//! to the notice queue and returned to the caller.

use std::time::Instant;

use crate::error::{Result, ReviewError};
use crate::query::QueryCriteria;
use crate::record::NodeId;
use crate::remote::Backend;

use super::form::Busy;
use super::selection::BulkAction;
use super::state::ViewState;

/// Result of submitting the search form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// View rebuilt with `count` rows; `duplicates` records were skipped
    Loaded { count: usize, duplicates: usize },
    /// Server answered but returned no usable records
    Empty,
    /// Transport or HTTP failure
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Failed(String),
    /// Form was clean, busy or unknown
    Skipped,
}

/// A record that could not be saved during a bulk commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub node_id: NodeId,
    pub message: String,
}

impl std::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.node_id, self.message)
    }
}

/// Result of a bulk commit
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommitReport {
    /// Records saved, in list order
    pub saved: Vec<NodeId>,
    /// Records whose save failed, in list order
    pub failed: Vec<SyncFailure>,
}

impl CommitReport {
    pub fn attempted(&self) -> usize {
        self.saved.len() + self.failed.len()
    }

    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            format!("Committed {} record(s)", self.saved.len())
        } else {
            format!(
                "Committed {} record(s), {} failed",
                self.saved.len(),
                self.failed.len()
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Committed(CommitReport),
    /// Action has no backend counterpart; a notice was shown for `n` records
    Notified(BulkAction, usize),
    /// No action chosen or nothing selected
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Rows are fading out and will be swept after the delay
    Removing(Vec<NodeId>),
    Failed(String),
    Skipped,
}

impl ViewState {
    /// Post the search form and, on success, rebuild the whole view.
    pub async fn submit_query<B: Backend>(
        &mut self,
        backend: &B,
        criteria: &QueryCriteria,
    ) -> QueryOutcome {
        let criteria = criteria.normalized();
        let filter = criteria.filter();
        if !filter.ignored.is_empty() {
            self.notices.info(format!(
                "Ignoring filter fragment(s) without ':': {}",
                filter.ignored.join(", ")
            ));
        }
        tracing::info!(path = %criteria.node_path, filter = %filter.describe(), "submitting query");

        let response = match backend.query(&criteria).await {
            Ok(response) => response,
            Err(err) if err.is_empty_result() => {
                tracing::warn!(error = %err, "query returned nothing to show");
                self.notices.info(format!("No records: {}", err));
                return QueryOutcome::Empty;
            }
            Err(err) => {
                tracing::error!(error = %err, "query failed");
                self.notices.error(format!("Query failed: {}", err));
                return QueryOutcome::Failed(err.to_string());
            }
        };

        let before = response.records.len();
        let count = self.replace_records(&response.records, &criteria.node_path);
        self.debug_info = Some(response.debug);
        let duplicates = before - count;

        tracing::info!(count, duplicates, "query loaded");
        self.notices.info(format!("Loaded {} record(s)", count));
        QueryOutcome::Loaded { count, duplicates }
    }

    /// Save one dirty form.
    pub async fn save<B: Backend>(&mut self, backend: &B, id: &NodeId) -> SaveOutcome {
        if !self.tracker.is_dirty(id) {
            return SaveOutcome::Skipped;
        }
        match self.forms.get(id) {
            Some(form) if form.busy().is_none() => {}
            _ => return SaveOutcome::Skipped,
        }

        match self.try_save(backend, id).await {
            Ok(()) => {
                tracing::info!(node_id = %id, "record saved");
                self.notices.info(format!("Saved {}", id));
                SaveOutcome::Saved
            }
            Err(err) => {
                tracing::error!(node_id = %id, error = %err, "save failed");
                self.notices.error(format!("Save failed for {}: {}", id, err));
                SaveOutcome::Failed(err.to_string())
            }
        }
    }

    async fn try_save<B: Backend>(&mut self, backend: &B, id: &NodeId) -> Result<()> {
        let form = self
            .forms
            .get_mut(id)
            .ok_or_else(|| ReviewError::UnknownRecord(id.clone()))?;
        if form.busy().is_some() {
            return Err(ReviewError::Busy(id.clone()));
        }
        let payload = form.current().clone();
        form.busy = Some(Busy::Saving);

        let result = backend
            .update(id, &payload)
            .await
            .and_then(|reply| reply.into_result("update"));

        let form = self
            .forms
            .get_mut(id)
            .ok_or_else(|| ReviewError::UnknownRecord(id.clone()))?;
        form.busy = None;
        result?;

        form.commit_baseline(payload);
        self.tracker.mark_clean(id);
        if let Some(row) = self.row_mut(id) {
            row.saved = true;
        }
        Ok(())
    }

    /// Save each dirty record of `ids` in list order, continuing past
    /// failures. Clean records, fading rows and busy forms are left alone.
    pub async fn commit<B: Backend>(&mut self, backend: &B, ids: &[NodeId]) -> CommitReport {
        let ordered: Vec<NodeId> = self
            .rows
            .iter()
            .filter(|row| row.removing_at.is_none())
            .map(|row| row.node_id.clone())
            .filter(|id| {
                ids.contains(id)
                    && self.tracker.is_dirty(id)
                    && self.forms.get(id).is_some_and(|form| form.busy().is_none())
            })
            .collect();

        let mut report = CommitReport::default();
        for id in ordered {
            match self.try_save(backend, &id).await {
                Ok(()) => report.saved.push(id),
                Err(err) => {
                    tracing::error!(node_id = %id, error = %err, "commit: save failed");
                    report.failed.push(SyncFailure {
                        node_id: id,
                        message: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(saved = report.saved.len(), failed = report.failed.len(), "commit finished");
        if report.failed.is_empty() {
            self.notices.info(report.summary());
        } else {
            let failed: Vec<String> = report.failed.iter().map(|f| f.to_string()).collect();
            self.notices
                .error(format!("{}: {}", report.summary(), failed.join("; ")));
        }
        report
    }

    /// Run the chosen bulk action on the selected rows, then reset the
    /// selection and the action picker.
    pub async fn execute_action<B: Backend>(&mut self, backend: &B) -> ActionOutcome {
        let controls = self.bulk_controls();
        let Some(action) = controls.action.filter(|_| controls.execute_enabled) else {
            return ActionOutcome::Disabled;
        };
        let selected = self.selection.selected_in_order(&self.rows);

        let outcome = match action {
            BulkAction::Commit => ActionOutcome::Committed(self.commit(backend, &selected).await),
            BulkAction::Move => {
                self.notices.info(format!(
                    "Would open file move dialog for {} records",
                    selected.len()
                ));
                ActionOutcome::Notified(action, selected.len())
            }
            BulkAction::Export => {
                self.notices
                    .info(format!("Would export {} records to CSV", selected.len()));
                ActionOutcome::Notified(action, selected.len())
            }
        };

        self.selection.reset();
        outcome
    }

    /// Delete every selected record in one request.
    pub async fn delete_selected<B: Backend>(&mut self, backend: &B) -> DeleteOutcome {
        let ids: Vec<NodeId> = self
            .selection
            .selected_in_order(&self.rows)
            .into_iter()
            .filter(|id| self.row(id).is_some_and(|row| row.removing_at.is_none()))
            .collect();
        if ids.is_empty() {
            return DeleteOutcome::Skipped;
        }

        self.set_busy(&ids, Some(Busy::Deleting));
        let result = backend
            .delete(&ids)
            .await
            .and_then(|reply| reply.into_result("delete"));

        match result {
            Ok(()) => {
                let at = Instant::now() + self.settings.fade_delay;
                for id in &ids {
                    if let Some(row) = self.row_mut(id) {
                        row.removing_at = Some(at);
                    }
                }
                self.selection.select_all(&[], false);
                tracing::info!(count = ids.len(), "records deleted");
                self.notices.info(format!("Deleted {} record(s)", ids.len()));
                DeleteOutcome::Removing(ids)
            }
            Err(err) => {
                self.set_busy(&ids, None);
                tracing::error!(count = ids.len(), error = %err, "delete failed");
                self.notices.error(format!("Delete failed: {}", err));
                DeleteOutcome::Failed(err.to_string())
            }
        }
    }

    /// Wait out the fade delay, then sweep the faded rows.
    pub async fn settle_removals(&mut self) -> Vec<NodeId> {
        if let Some(deadline) = self.removal_deadline() {
            tokio::time::sleep_until(deadline.into()).await;
        }
        self.sweep_removed(Instant::now())
    }

    fn set_busy(&mut self, ids: &[NodeId], busy: Option<Busy>) {
        for id in ids {
            if let Some(form) = self.forms.get_mut(id) {
                form.busy = busy;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::record::{Field, FieldValues, Record};
    use crate::remote::{QueryResponse, StatusReply};
    use serde_json::json;
    use std::cell::RefCell;

    /// Backend that records every call and rejects updates for listed ids.
    #[derive(Default)]
    struct Recorder {
        reject: Vec<&'static str>,
        updates: RefCell<Vec<NodeId>>,
    }

    impl Backend for Recorder {
        async fn query(&self, _criteria: &QueryCriteria) -> Result<QueryResponse> {
            Ok(QueryResponse {
                debug: json!({"debug_query": "MATCH"}),
                records: vec![
                    Record::new("a", "/root/a.pdf"),
                    Record::new("b", "/root/b.pdf"),
                    Record::new("c", "/root/c.pdf"),
                ],
            })
        }

        async fn update(&self, node_id: &NodeId, _fields: &FieldValues) -> Result<StatusReply> {
            self.updates.borrow_mut().push(node_id.clone());
            if self.reject.contains(&node_id.as_str()) {
                Ok(StatusReply::with_status("error"))
            } else {
                Ok(StatusReply::ok())
            }
        }

        async fn delete(&self, _node_ids: &[NodeId]) -> Result<StatusReply> {
            Ok(StatusReply::ok())
        }
    }

    #[tokio::test]
    async fn test_commit_follows_list_order() {
        let backend = Recorder {
            reject: vec!["b"],
            ..Default::default()
        };
        let mut view = ViewState::new(ViewConfig::default());
        view.submit_query(&backend, &QueryCriteria::new("/root/", "")).await;
        for id in ["c", "b", "a"] {
            view.input(&NodeId::from(id), Field::Phone, "1");
        }

        let ids = vec![NodeId::from("c"), NodeId::from("a"), NodeId::from("b")];
        let report = view.commit(&backend, &ids).await;

        assert_eq!(
            *backend.updates.borrow(),
            vec![NodeId::from("a"), NodeId::from("b"), NodeId::from("c")]
        );
        assert_eq!(report.saved, vec![NodeId::from("a"), NodeId::from("c")]);
        assert_eq!(report.failed.len(), 1);
        assert!(view.is_dirty(&NodeId::from("b")));
        assert_eq!(report.summary(), "Committed 2 record(s), 1 failed");
    }

    #[tokio::test]
    async fn test_commit_leaves_deleted_records_alone() {
        let backend = Recorder::default();
        let mut view = ViewState::new(ViewConfig::default());
        view.submit_query(&backend, &QueryCriteria::new("/root/", "")).await;
        let a = NodeId::from("a");
        let b = NodeId::from("b");
        view.input(&a, Field::Phone, "1");
        view.input(&b, Field::Phone, "2");
        view.set_checked(&a, true);
        assert!(matches!(view.delete_selected(&backend).await, DeleteOutcome::Removing(_)));

        let report = view.commit(&backend, &[a.clone(), b.clone()]).await;
        assert_eq!(report.saved, vec![b]);
        assert_eq!(*backend.updates.borrow(), vec![NodeId::from("b")]);
        assert_eq!(view.form(&a).and_then(|f| f.busy()), Some(Busy::Deleting));
    }

    #[tokio::test]
    async fn test_try_save_refuses_busy_form() {
        let backend = Recorder::default();
        let mut view = ViewState::new(ViewConfig::default());
        view.submit_query(&backend, &QueryCriteria::new("/root/", "")).await;
        let a = NodeId::from("a");
        view.input(&a, Field::Phone, "1");
        view.set_busy(&[a.clone()], Some(Busy::Deleting));

        let err = view.try_save(&backend, &a).await.unwrap_err();
        assert!(matches!(err, ReviewError::Busy(id) if id == a));
        assert!(backend.updates.borrow().is_empty());
        assert_eq!(view.form(&a).and_then(|f| f.busy()), Some(Busy::Deleting));
    }

    #[tokio::test]
    async fn test_save_clean_form_is_skipped() {
        let backend = Recorder::default();
        let mut view = ViewState::new(ViewConfig::default());
        view.submit_query(&backend, &QueryCriteria::new("/root/", "")).await;

        let outcome = view.save(&backend, &NodeId::from("a")).await;
        assert_eq!(outcome, SaveOutcome::Skipped);
        assert!(backend.updates.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_ignored_filter_fragment_is_reported() {
        let backend = Recorder::default();
        let mut view = ViewState::new(ViewConfig::default());
        view.submit_query(&backend, &QueryCriteria::new(" /root/ ", "company:acme, junk"))
            .await;
        assert!(view
            .notices()
            .iter()
            .any(|n| n.message.contains("junk")));
        assert_eq!(view.root_path(), "/root/");
    }
}
