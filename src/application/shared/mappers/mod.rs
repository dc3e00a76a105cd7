pub mod event_payload;
pub mod field_catalog;
pub mod remote_record;

pub use event_payload::{TrackerProgram, build_event_payload, strip_note_prefix};
pub use field_catalog::{FieldCatalog, FieldMapping};
pub use remote_record::{RemoteInspection, map_remote_record};
