//! Domain types for mapsync
//!
//! Pure data types describing the synchronized world: datasets, changeset
//! summaries, the persisted schema comment, and operation outcomes.
//! Nothing in this module performs I/O.

pub mod changes;
pub mod comment;
pub mod dataset;
pub mod errors;
pub mod newtypes;
pub mod outcome;

pub use changes::{
    ChangeOperation, ColumnChange, FileChange, PendingFiles, RowChange, ServerFile,
    TableChangeSummary,
};
pub use comment::SchemaComment;
pub use dataset::Dataset;
pub use errors::SyncError;
pub use newtypes::{ProjectPath, ProjectVersion};
pub use outcome::{InitSource, StatusReport, SyncOutcome};
