pub mod category_key;
pub mod form_data;
pub mod inspection_id;
pub mod inspection_status;
pub mod record_source;
pub mod remote_event_id;
pub mod sync_status;

pub use category_key::CategoryKey;
pub use form_data::{FormData, render_scalar};
pub use inspection_id::InspectionId;
pub use inspection_status::InspectionStatus;
pub use record_source::RecordSource;
pub use remote_event_id::RemoteEventId;
pub use sync_status::SyncStatus;
