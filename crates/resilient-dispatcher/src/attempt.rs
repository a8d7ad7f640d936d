use crate::outcome::Outcome;
use crate::transport::Transport;
use std::time::{Duration, Instant};

/// Runs a single timed attempt against a [`Transport`], the same way
/// `tower-resilience-timelimiter`'s `TimeLimiter::call` wraps an inner
/// service call in `tokio::time::timeout`.
pub struct AttemptRunner;

/// The result of one timed attempt.
#[derive(Debug, Clone, Copy)]
pub enum AttemptResult {
    /// The transport resolved within the deadline.
    Completed { outcome: Outcome, duration: Duration },
    /// The deadline elapsed before the transport resolved; the future was
    /// dropped.
    TimedOut { duration: Duration },
}

impl AttemptRunner {
    /// Issues `payload` against `transport` and waits up to `deadline` for a
    /// result. Cloning `payload` is the caller's responsibility since a
    /// timed-out attempt consumes its copy.
    pub async fn run<T, P>(transport: &T, payload: P, deadline: Duration) -> AttemptResult
    where
        T: Transport<P> + ?Sized,
        P: Send,
    {
        let start = Instant::now();
        match tokio::time::timeout(deadline, transport.send(payload)).await {
            Ok(outcome) => AttemptResult::Completed {
                outcome,
                duration: start.elapsed(),
            },
            Err(_) => AttemptResult::TimedOut {
                duration: start.elapsed(),
            },
        }
    }
}
