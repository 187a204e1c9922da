mod call;
mod config;
mod health;
mod metrics;
mod session;
mod stats;

pub use call::{ApiError, call_handler};
pub use config::config_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use session::{clear_session_handler, get_session_handler, put_session_handler};
pub use stats::stats_handler;
