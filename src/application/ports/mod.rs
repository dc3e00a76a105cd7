pub mod inspection_store;
pub mod remote_tracker;
