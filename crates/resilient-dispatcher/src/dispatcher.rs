use crate::error::{DispatchError, ExhaustedReason};
use crate::events::DispatchEvent;
use crate::outcome::Outcome;
use crate::policy::{ExtraPolicy, Policy};
use crate::selector::EndpointSelector;
use crate::transport::Transport;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

/// Result of one attempt cycle (one pass through backoff-wait + endpoint
/// selection + send, possibly with hedge fan-out), before the retry loop
/// decides whether to continue.
enum AttemptCycle {
    Outcome(Outcome),
    CircuitBreakerOpen,
}

/// Dispatches a logical request against one of several equivalent
/// endpoints, applying a [`Policy`]'s retry, backoff, hedging and
/// circuit-breaking rules.
///
/// All resilience state (attempts used, elapsed time) is local to a single
/// [`Dispatcher::request`] call; only [`EndpointHealth`](crate::EndpointHealth)
/// (when circuit breaking is configured) is shared across calls.
pub struct Dispatcher<P> {
    policy: Policy,
    transports: Vec<Arc<dyn Transport<P>>>,
    selector: EndpointSelector,
}

impl<P> Dispatcher<P>
where
    P: Clone + Send + 'static,
{
    /// Builds a dispatcher over `transports`, one per equivalent endpoint,
    /// in the order they should be cycled (for round-robin selection) or
    /// tracked (for circuit breaking).
    ///
    /// # Panics
    ///
    /// Panics if `transports` is empty.
    pub fn new(policy: Policy, transports: Vec<Arc<dyn Transport<P>>>) -> Self {
        assert!(!transports.is_empty(), "at least one transport is required");

        let selector = match &policy.extra {
            ExtraPolicy::CircuitBreaker {
                window_size,
                failure_threshold,
                recovery_timeout,
            } => EndpointSelector::health_ranked(
                transports.len(),
                *window_size,
                *failure_threshold,
                *recovery_timeout,
            ),
            _ => EndpointSelector::round_robin(),
        };

        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "dispatch_calls_total",
                "Number of Dispatcher::request calls, by result"
            );
            describe_counter!(
                "dispatch_attempts_total",
                "Number of individual transport attempts issued"
            );
            describe_histogram!(
                "dispatch_call_duration_seconds",
                "Wall-clock duration of Dispatcher::request calls"
            );
        }

        Self {
            policy,
            transports,
            selector,
        }
    }

    /// Issues `payload` against the configured transports under this
    /// dispatcher's policy, returning [`Outcome::SUCCESS`] or the reason
    /// the dispatch loop gave up.
    pub async fn request(&self, payload: P) -> Result<Outcome, DispatchError> {
        let call_start = Instant::now();
        let mut attempts_used = 0usize;
        let mut elapsed = Duration::ZERO;

        loop {
            if attempts_used >= self.policy.max_attempts {
                return Err(self.exhaust(attempts_used, ExhaustedReason::MaxAttemptsExceeded, call_start));
            }

            let remaining = self
                .policy
                .latency_budget
                .checked_sub(elapsed)
                .unwrap_or(Duration::ZERO);
            if remaining.is_zero() {
                return Err(self.exhaust(
                    attempts_used,
                    ExhaustedReason::LatencyBudgetExhausted,
                    call_start,
                ));
            }

            let attempt_start = Instant::now();
            let cycle = tokio::time::timeout(
                remaining,
                self.run_attempt_cycle(payload.clone(), attempts_used),
            )
            .await;

            let cycle = match cycle {
                Ok(cycle) => cycle,
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    warn!(dispatcher = %self.policy.name, attempt = attempts_used, "latency budget exhausted");
                    return Err(self.exhaust(
                        attempts_used,
                        ExhaustedReason::LatencyBudgetExhausted,
                        call_start,
                    ));
                }
            };

            match cycle {
                AttemptCycle::CircuitBreakerOpen => {
                    #[cfg(feature = "tracing")]
                    warn!(dispatcher = %self.policy.name, "circuit breaker open on best-ranked endpoint");
                    return Err(self.exhaust(
                        attempts_used,
                        ExhaustedReason::CircuitBreakerOpen,
                        call_start,
                    ));
                }
                AttemptCycle::Outcome(outcome) if outcome.is_success() => {
                    #[cfg(feature = "metrics")]
                    {
                        counter!("dispatch_calls_total", "dispatcher" => self.policy.name.clone(), "result" => "success").increment(1);
                        histogram!("dispatch_call_duration_seconds", "dispatcher" => self.policy.name.clone())
                            .record(call_start.elapsed().as_secs_f64());
                    }
                    #[cfg(feature = "tracing")]
                    if attempts_used > 0 {
                        info!(dispatcher = %self.policy.name, attempts = attempts_used + 1, "request succeeded after retries");
                    }

                    let event = DispatchEvent::Success {
                        pattern_name: self.policy.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempts_used + 1,
                    };
                    self.policy.event_listeners.emit(&event);

                    return Ok(outcome);
                }
                AttemptCycle::Outcome(outcome) => {
                    if self.policy.is_fast_error(outcome) {
                        #[cfg(feature = "tracing")]
                        debug!(dispatcher = %self.policy.name, outcome = outcome.code(), "non-retryable outcome observed");
                        return Err(self.exhaust(
                            attempts_used,
                            ExhaustedReason::NonRetryable,
                            call_start,
                        ));
                    }

                    elapsed += attempt_start.elapsed();
                    attempts_used += 1;

                    #[cfg(feature = "metrics")]
                    counter!("dispatch_attempts_total", "dispatcher" => self.policy.name.clone())
                        .increment(1);
                }
            }
        }
    }

    fn exhaust(&self, attempts_used: usize, reason: ExhaustedReason, call_start: Instant) -> DispatchError {
        #[cfg(feature = "metrics")]
        {
            let result = match reason {
                ExhaustedReason::MaxAttemptsExceeded => "max_attempts_exceeded",
                ExhaustedReason::LatencyBudgetExhausted => "latency_budget_exhausted",
                ExhaustedReason::NonRetryable => "non_retryable",
                ExhaustedReason::CircuitBreakerOpen => "circuit_breaker_open",
            };
            counter!("dispatch_calls_total", "dispatcher" => self.policy.name.clone(), "result" => result).increment(1);
            histogram!("dispatch_call_duration_seconds", "dispatcher" => self.policy.name.clone())
                .record(call_start.elapsed().as_secs_f64());
        }

        let event = DispatchEvent::Exhausted {
            pattern_name: self.policy.name.clone(),
            timestamp: Instant::now(),
            attempts: attempts_used,
            reason,
        };
        self.policy.event_listeners.emit(&event);

        DispatchError::Exhausted(reason)
    }

    /// Runs backoff wait (if configured and this isn't the first attempt),
    /// endpoint selection, and the send itself (including hedge fan-out
    /// where configured). Bounded by the *outer* timeout in
    /// [`request`](Self::request), not a timeout of its own.
    async fn run_attempt_cycle(&self, payload: P, attempt: usize) -> AttemptCycle {
        if let ExtraPolicy::Backoff {
            initial_delay,
            factor,
        } = &self.policy.extra
        {
            if attempt > 0 {
                let delay = Duration::from_secs_f64(
                    initial_delay.as_secs_f64() * factor.powi(attempt as i32 - 1),
                );

                #[cfg(feature = "tracing")]
                debug!(dispatcher = %self.policy.name, attempt, delay_ms = delay.as_millis(), "backing off before retry");

                let event = DispatchEvent::BackoffWait {
                    pattern_name: self.policy.name.clone(),
                    timestamp: Instant::now(),
                    attempt,
                    delay,
                };
                self.policy.event_listeners.emit(&event);

                tokio::time::sleep(delay).await;
            }
        }

        if let ExtraPolicy::Hedge { hedging_delay } = &self.policy.extra {
            return AttemptCycle::Outcome(self.run_hedged(payload, *hedging_delay, attempt).await);
        }

        let (endpoint_index, is_open) = self.selector.select(self.transports.len(), attempt).await;
        if is_open {
            return AttemptCycle::CircuitBreakerOpen;
        }

        let event = DispatchEvent::AttemptStarted {
            pattern_name: self.policy.name.clone(),
            timestamp: Instant::now(),
            endpoint_index,
            attempt,
        };
        self.policy.event_listeners.emit(&event);

        let transport = &self.transports[endpoint_index];
        let started = Instant::now();
        let outcome = transport.send(payload).await;

        if let Some(health) = self.selector.health_of(endpoint_index) {
            let before = health.state().await;
            health.record(outcome.is_success()).await;
            let after = health.state().await;
            if before != after {
                #[cfg(feature = "tracing")]
                info!(dispatcher = %self.policy.name, endpoint_index, ?before, ?after, "circuit state transition");

                let event = DispatchEvent::CircuitStateTransition {
                    pattern_name: self.policy.name.clone(),
                    timestamp: Instant::now(),
                    endpoint_index,
                    from_state: before,
                    to_state: after,
                };
                self.policy.event_listeners.emit(&event);
            }
        }

        let event = DispatchEvent::AttemptCompleted {
            pattern_name: self.policy.name.clone(),
            timestamp: Instant::now(),
            endpoint_index,
            attempt,
            outcome,
            duration: started.elapsed(),
        };
        self.policy.event_listeners.emit(&event);

        AttemptCycle::Outcome(outcome)
    }

    /// Issues the attempt against one round-robin-selected endpoint; if it
    /// hasn't resolved within `hedging_delay`, fans out to the remaining
    /// endpoints and returns whichever attempt resolves first, abandoning
    /// the rest.
    ///
    /// Grounded in `original_source`'s `HedgingMultiClient._make_request`:
    /// the main attempt is never cancelled by the hedging delay itself
    /// (only the overall latency budget timeout can cancel it), it simply
    /// gains siblings racing against it. Every handle is wrapped in
    /// [`AbortOnDrop`] so that if the outer latency-budget timeout in
    /// [`request`](Self::request) cancels this whole future mid-flight, the
    /// in-flight sibling tasks are aborted rather than left running as
    /// orphans (`spec.md` §5, "Resource release").
    async fn run_hedged(&self, payload: P, hedging_delay: Duration, attempt: usize) -> Outcome {
        let (main_index, _) = self.selector.select(self.transports.len(), attempt).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let main_handle = AbortOnDrop(self.spawn_attempt(main_index, payload.clone(), tx.clone()));

        tokio::select! {
            biased;
            Some(outcome) = rx.recv() => {
                return outcome;
            }
            _ = tokio::time::sleep(hedging_delay) => {}
        }

        let sibling_count = self.transports.len().saturating_sub(1);

        #[cfg(feature = "tracing")]
        debug!(dispatcher = %self.policy.name, sibling_count, "hedge delay elapsed, fanning out");

        let event = DispatchEvent::HedgeFanOut {
            pattern_name: self.policy.name.clone(),
            timestamp: Instant::now(),
            sibling_count,
        };
        self.policy.event_listeners.emit(&event);

        let mut handles = vec![main_handle];
        for index in 0..self.transports.len() {
            if index != main_index {
                handles.push(AbortOnDrop(self.spawn_attempt(index, payload.clone(), tx.clone())));
            }
        }
        drop(tx);

        // `handles` is dropped here regardless of how this function exits —
        // on the normal return below, or because the caller's outer timeout
        // dropped this future while still awaiting `rx.recv()`. Either way
        // every still-running sibling gets aborted.
        rx.recv().await.expect("at least one sibling was spawned")
    }

    fn spawn_attempt(
        &self,
        endpoint_index: usize,
        payload: P,
        tx: mpsc::UnboundedSender<Outcome>,
    ) -> tokio::task::JoinHandle<()> {
        let transport = Arc::clone(&self.transports[endpoint_index]);
        tokio::spawn(async move {
            let outcome = transport.send(payload).await;
            let _ = tx.send(outcome);
        })
    }
}

/// Aborts the wrapped task when dropped, so an abandoned hedge attempt
/// (outer latency budget elapsed, or a faster sibling already won) never
/// keeps running as an orphan.
struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
