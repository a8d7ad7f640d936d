use futures::future::BoxFuture;
use resilient_dispatcher::{Dispatcher, Outcome, Policy, Transport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CountingEndpoint {
    calls: AtomicUsize,
    script: Vec<Outcome>,
}

impl CountingEndpoint {
    fn new(script: Vec<Outcome>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport<()> for CountingEndpoint {
    fn send(&self, _payload: ()) -> BoxFuture<'static, Outcome> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.script[index.min(self.script.len() - 1)];
        Box::pin(async move { outcome })
    }
}

struct AlwaysSlow(Duration, Outcome);
impl Transport<()> for AlwaysSlow {
    fn send(&self, _payload: ()) -> BoxFuture<'static, Outcome> {
        let (delay, outcome) = (self.0, self.1);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            outcome
        })
    }
}

#[tokio::test]
async fn single_endpoint_immediate_success() {
    let policy = Policy::builder().max_attempts(1).build();
    let endpoint = Arc::new(CountingEndpoint::new(vec![Outcome::SUCCESS]));
    let transports: Vec<Arc<dyn Transport<()>>> = vec![endpoint.clone()];
    let dispatcher = Dispatcher::new(policy, transports);

    let outcome = dispatcher.request(()).await.unwrap();
    assert_eq!(outcome, Outcome::SUCCESS);
    assert_eq!(endpoint.call_count(), 1);
}

#[tokio::test]
async fn max_attempts_exceeded_when_endpoint_never_succeeds() {
    let policy = Policy::builder().max_attempts(3).build();
    let endpoint = Arc::new(CountingEndpoint::new(vec![Outcome::from(500)]));
    let transports: Vec<Arc<dyn Transport<()>>> = vec![endpoint.clone()];
    let dispatcher = Dispatcher::new(policy, transports);

    let err = dispatcher.request(()).await.unwrap_err();
    assert!(err.is_max_attempts_exceeded());
    assert_eq!(endpoint.call_count(), 3);
}

#[tokio::test]
async fn latency_budget_exhausted_before_max_attempts() {
    let policy = Policy::builder()
        .max_attempts(10)
        .latency_budget(Duration::from_millis(20))
        .build();
    let transports: Vec<Arc<dyn Transport<()>>> =
        vec![Arc::new(AlwaysSlow(Duration::from_millis(100), Outcome::SUCCESS))];
    let dispatcher = Dispatcher::new(policy, transports);

    let err = dispatcher.request(()).await.unwrap_err();
    assert!(err.is_latency_budget_exhausted());
}

#[tokio::test]
async fn round_robin_three_endpoints_eventually_succeeds() {
    let policy = Policy::builder().max_attempts(3).build();
    let transports: Vec<Arc<dyn Transport<()>>> = vec![
        Arc::new(CountingEndpoint::new(vec![Outcome::from(500)])),
        Arc::new(CountingEndpoint::new(vec![Outcome::from(500)])),
        Arc::new(CountingEndpoint::new(vec![Outcome::SUCCESS])),
    ];
    let dispatcher = Dispatcher::new(policy, transports);

    let outcome = dispatcher.request(()).await.unwrap();
    assert_eq!(outcome, Outcome::SUCCESS);
}

#[tokio::test]
async fn backoff_waits_grow_exponentially() {
    let policy = Policy::builder()
        .max_attempts(4)
        .backoff(Duration::from_millis(10), 2.0)
        .build();
    let endpoint = Arc::new(CountingEndpoint::new(vec![
        Outcome::from(500),
        Outcome::from(500),
        Outcome::from(500),
        Outcome::SUCCESS,
    ]));
    let transports: Vec<Arc<dyn Transport<()>>> = vec![endpoint.clone()];
    let dispatcher = Dispatcher::new(policy, transports);

    let start = Instant::now();
    let outcome = dispatcher.request(()).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(outcome, Outcome::SUCCESS);
    // waits of 10ms, 20ms, 40ms before the 2nd, 3rd, 4th attempts: 70ms floor.
    assert!(elapsed >= Duration::from_millis(65), "elapsed was {elapsed:?}");
}

#[tokio::test]
async fn hedge_returns_whichever_endpoint_wins() {
    let policy = Policy::builder()
        .max_attempts(1)
        .latency_budget(Duration::from_secs(5))
        .hedge(Duration::from_millis(10))
        .build();
    let transports: Vec<Arc<dyn Transport<()>>> = vec![
        Arc::new(AlwaysSlow(Duration::from_millis(300), Outcome::SUCCESS)),
        Arc::new(AlwaysSlow(Duration::from_millis(5), Outcome::SUCCESS)),
    ];
    let dispatcher = Dispatcher::new(policy, transports);

    let start = Instant::now();
    let outcome = dispatcher.request(()).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(outcome, Outcome::SUCCESS);
    // the hedge delay (10ms) plus the fast sibling's own 5ms, well under the
    // slow primary's 300ms.
    assert!(elapsed < Duration::from_millis(200), "elapsed was {elapsed:?}");
}

#[tokio::test]
async fn circuit_breaker_rejects_once_best_endpoint_is_open() {
    let policy = Policy::builder()
        .max_attempts(1)
        .circuit_breaker(2, 0.5, Duration::from_secs(10))
        .build();
    let transports: Vec<Arc<dyn Transport<()>>> =
        vec![Arc::new(CountingEndpoint::new(vec![Outcome::from(500)]))];
    let dispatcher = Dispatcher::new(policy, transports);

    let first = dispatcher.request(()).await.unwrap_err();
    assert!(first.is_max_attempts_exceeded());

    let second = dispatcher.request(()).await.unwrap_err();
    assert!(second.is_circuit_breaker_open());
}

#[tokio::test]
async fn non_retryable_outcome_short_circuits_remaining_attempts() {
    let policy = Policy::builder()
        .max_attempts(5)
        .fast_error(404u16)
        .build();
    let endpoint = Arc::new(CountingEndpoint::new(vec![Outcome::from(404)]));
    let transports: Vec<Arc<dyn Transport<()>>> = vec![endpoint.clone()];
    let dispatcher = Dispatcher::new(policy, transports);

    let err = dispatcher.request(()).await.unwrap_err();
    assert!(err.is_non_retryable());
    assert_eq!(endpoint.call_count(), 1);
}
