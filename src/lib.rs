//! Client library for submitting and tracking long-running BLAST and Pfam scan jobs.
//!
//! Wire a [`tracker::JobTracker`] per analysis kind with a [`backend::JobBackend`], an
//! [`identity::Identity`] and a [`notify::Notifier`], then drive it from views through
//! [`tracker::ViewBinding`].

pub mod analysis;
pub mod backend;
pub mod error;
pub mod identity;
pub mod model;
pub mod notify;
pub mod storage;
pub mod text_summary;
pub mod tracker;

pub use analysis::{AnalysisKind, Blast, PfamScan};
pub use error::{JobError, JobResult};
pub use model::{JobSnapshot, JobStatus, Notification, Severity, SubmitOutcome, TrackerConfig};
pub use tracker::{JobTracker, ViewBinding};
