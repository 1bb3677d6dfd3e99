//! View model of the review screen.
//!
//! `ViewState` owns rows, record panels, editable forms and the dirty
//! tracker; the terminal front end only reads it and forwards input.

pub mod dirty;
pub mod form;
pub mod notice;
pub mod render;
pub mod selection;
mod state;
mod sync;
pub mod tabs;

pub use dirty::DirtyTracker;
pub use form::{EditableForm, FormControls, FormStatus};
pub use notice::{Notice, NoticeLevel, Notices};
pub use render::{Column, ListRow, RecordPanel, RowMarker};
pub use selection::{BulkAction, BulkControls};
pub use state::ViewState;
pub use sync::{ActionOutcome, CommitReport, DeleteOutcome, QueryOutcome, SaveOutcome, SyncFailure};
pub use tabs::{Tab, TabRequest};
