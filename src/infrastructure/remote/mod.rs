mod bundle_report;
mod http_client;
mod retry;

pub use bundle_report::{error_from_response, parse_bundle_report, validation_error};
pub use http_client::TrackerHttpClient;
pub use retry::{RequestKind, RetryPolicy};
