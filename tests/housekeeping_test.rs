// Kept in its own test binary: it reads the process-wide cache size gauge.

use dispatch_gateway::metrics::CACHE_SIZE;
use dispatch_gateway::{CallDescriptor, Scheduler, SchedulerConfig, Transport, TransportError};
use serde_json::{Value, json};
use tokio::time::{Duration, sleep};

struct Echo;

impl Transport for Echo {
    async fn invoke(&self, descriptor: &CallDescriptor) -> Result<Value, TransportError> {
        Ok(json!({ "url": descriptor.url }))
    }
}

#[tokio::test(start_paused = true)]
async fn idle_scheduler_drops_expired_entries() {
    let scheduler = Scheduler::spawn(Echo, SchedulerConfig::default());

    let handles: Vec<_> = (0..500)
        .map(|i| tokio::spawn(scheduler.submit(CallDescriptor::get(format!("/routes/{i}")))))
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    sleep(Duration::from_secs(2)).await;
    assert_eq!(CACHE_SIZE.get(), 500.0);

    // nobody asks for stats while idle
    sleep(Duration::from_secs(60)).await;
    assert_eq!(CACHE_SIZE.get(), 0.0);

    scheduler.submit(CallDescriptor::get("/routes/1000")).await.unwrap();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(CACHE_SIZE.get(), 1.0);
}
