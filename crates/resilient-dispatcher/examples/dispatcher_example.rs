use futures::future::BoxFuture;
use resilient_dispatcher::{Dispatcher, Outcome, Policy, Transport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct FlakyEndpoint {
    calls: AtomicUsize,
    fail_first_n: usize,
}

impl Transport<String> for FlakyEndpoint {
    fn send(&self, payload: String) -> BoxFuture<'static, Outcome> {
        let count = self.calls.fetch_add(1, Ordering::SeqCst);
        let fail_first_n = self.fail_first_n;
        Box::pin(async move {
            println!("  sending {payload} (attempt {})", count + 1);
            if count < fail_first_n {
                Outcome::from(503)
            } else {
                Outcome::SUCCESS
            }
        })
    }
}

#[tokio::main]
async fn main() {
    println!("Resilient Dispatcher Example");
    println!("============================\n");

    println!("Example 1: backoff retry");
    let policy = Policy::builder()
        .max_attempts(5)
        .latency_budget(Duration::from_secs(5))
        .backoff(Duration::from_millis(50), 2.0)
        .name("orders-service")
        .on_backoff(|attempt, delay| {
            println!("  [BACKOFF] before attempt {attempt} waiting {delay:?}");
        })
        .on_success(|attempts| {
            println!("  [SUCCESS] after {attempts} attempts");
        })
        .build();

    let transports: Vec<Arc<dyn Transport<String>>> = vec![Arc::new(FlakyEndpoint {
        calls: AtomicUsize::new(0),
        fail_first_n: 2,
    })];
    let dispatcher = Dispatcher::new(policy, transports);
    let outcome = dispatcher.request("hello".to_string()).await.unwrap();
    println!("  result: {outcome}\n");

    println!("Example 2: hedging across two endpoints");
    let policy = Policy::builder()
        .max_attempts(1)
        .latency_budget(Duration::from_secs(5))
        .hedge(Duration::from_millis(20))
        .name("hedged-lookup")
        .on_hedge_fan_out(|siblings| {
            println!("  [HEDGE] fanning out to {siblings} sibling(s)");
        })
        .build();

    let transports: Vec<Arc<dyn Transport<String>>> = vec![
        Arc::new(FlakyEndpoint {
            calls: AtomicUsize::new(0),
            fail_first_n: 0,
        }),
        Arc::new(FlakyEndpoint {
            calls: AtomicUsize::new(0),
            fail_first_n: 0,
        }),
    ];
    let dispatcher = Dispatcher::new(policy, transports);
    let outcome = dispatcher.request("world".to_string()).await.unwrap();
    println!("  result: {outcome}\n");

    println!("Example 3: circuit breaker opening after repeated failures");
    let policy = Policy::builder()
        .max_attempts(1)
        .circuit_breaker(4, 0.5, Duration::from_millis(200))
        .name("flaky-backend")
        .build();

    let transports: Vec<Arc<dyn Transport<String>>> = vec![Arc::new(FlakyEndpoint {
        calls: AtomicUsize::new(0),
        fail_first_n: usize::MAX,
    })];
    let dispatcher = Dispatcher::new(policy, transports);
    for _ in 0..3 {
        let err = dispatcher.request("probe".to_string()).await.unwrap_err();
        println!("  attempt failed: {err}");
    }
}
