use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref SUBMISSIONS_TOTAL: Counter =
        register_counter!("dispatch_submissions_total", "Total number of submitted calls").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("dispatch_cache_hits_total", "Calls answered from cache").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("dispatch_cache_misses_total", "Calls that needed a new admission unit").unwrap();
    pub static ref COALESCED_TOTAL: Counter =
        register_counter!("dispatch_coalesced_total", "Calls joined onto an identical pending call").unwrap();
    pub static ref TRANSPORT_CALLS: Counter =
        register_counter!("dispatch_transport_calls_total", "Transport invocations").unwrap();
    pub static ref TRANSPORT_FAILURES: Counter =
        register_counter!("dispatch_transport_failures_total", "Failed transport invocations").unwrap();
    pub static ref TRANSPORT_LATENCY: Histogram = register_histogram!(
        "dispatch_transport_latency_seconds",
        "Transport latency in seconds"
    )
    .unwrap();
    pub static ref ACTIVE_CALLS: Gauge =
        register_gauge!("dispatch_active_calls", "Admitted calls not yet settled").unwrap();
    pub static ref QUEUED_CALLS: Gauge =
        register_gauge!("dispatch_queued_calls", "Calls waiting for a concurrency slot").unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("dispatch_cache_size", "Current number of items in cache").unwrap();
}
