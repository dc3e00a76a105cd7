pub mod inspection_service;
pub mod pull_service;
pub mod push_service;
pub mod sync_service;

pub use inspection_service::{FormEdit, InspectionService};
pub use pull_service::{
    LastPullWins, PreserveLocalEdits, PullConflictPolicy, PullService, PullSummary,
};
pub use push_service::{PushService, PushSummary};
pub use sync_service::{SyncService, SyncState, TriggerOutcome};
