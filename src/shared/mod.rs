pub mod change_signal;
pub mod config;
pub mod error;

pub use change_signal::{ChangeNotifier, ChangeSubscription};
pub use config::AppConfig;
pub use error::{AppError, Result};
