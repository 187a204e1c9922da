//! Outbound call orchestration for the dispatch dashboard.
//!
//! [`Scheduler`] caps how many backend calls run at once, answers identical
//! calls from a short-lived cache (or joins them onto the one already in
//! flight) and spaces out repeated calls to the same endpoint. It drives any
//! [`Transport`]; [`HttpTransport`] is the one the sidecar binary uses.

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod session;
pub mod throttle;
pub mod transport;

pub use config::{ConfigUpdate, SchedulerConfig};
pub use error::{CallError, TransportError};
pub use models::{CallDescriptor, Method, Stats};
pub use scheduler::Scheduler;
pub use session::{LoginRedirect, Navigator, SessionStore};
pub use transport::{HttpTransport, Transport, TransportSettings};
