//! Business logic services.
//!
//! Services orchestrate the store, scanner and version-control backend and
//! provide the high-level operations consumers call.

mod history;
mod resolver;
mod vault;

pub use history::{
    DiffReport, HistoryManager, HistoryQuery, RevertOutcome, RevisionView, VersionEntry,
};
pub use resolver::{CallSite, KeyResolver, PromptKey, Resolved};
pub use vault::PromptVault;
