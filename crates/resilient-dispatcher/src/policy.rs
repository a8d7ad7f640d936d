use crate::events::DispatchEvent;
use crate::outcome::Outcome;
use resilient_dispatcher_core::{EventListeners, FnListener};
use std::collections::HashSet;
use std::time::Duration;

/// The one resilience mechanism layered on top of the base retry loop.
///
/// This is a closed set (`spec.md` §9 Design Notes: "a tagged variant plus a
/// small strategy object per mode rather than inheritance chains"): exactly
/// one of these applies to a given [`Policy`].
#[derive(Debug, Clone)]
pub enum ExtraPolicy {
    /// No extra mechanism: plain sequential retries with no wait between
    /// attempts.
    None,
    /// Wait `initial_delay * factor^(n-1)` before the n-th retry (n >= 1).
    Backoff {
        initial_delay: Duration,
        factor: f64,
    },
    /// Fan out to every other endpoint if the primary attempt hasn't
    /// completed within `hedging_delay`.
    Hedge { hedging_delay: Duration },
    /// Rank endpoints by health and reject when even the best is open.
    CircuitBreaker {
        window_size: usize,
        failure_threshold: f64,
        recovery_timeout: Duration,
    },
}

/// Immutable resilience contract for one [`Dispatcher`](crate::Dispatcher)
/// instance, constructed once via [`Policy::builder`].
pub struct Policy {
    pub(crate) max_attempts: usize,
    pub(crate) latency_budget: Duration,
    pub(crate) fast_errors: HashSet<Outcome>,
    pub(crate) extra: ExtraPolicy,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<DispatchEvent>,
}

impl Policy {
    /// Starts building a new [`Policy`] with defaults: `max_attempts = 1`,
    /// `latency_budget = 1s`, no fast errors, `ExtraPolicy::None`.
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::new()
    }

    /// Returns `true` if `outcome` is classified as non-retryable.
    pub fn is_fast_error(&self, outcome: Outcome) -> bool {
        self.fast_errors.contains(&outcome)
    }
}

/// Builder for [`Policy`].
pub struct PolicyBuilder {
    max_attempts: usize,
    latency_budget: Duration,
    fast_errors: HashSet<Outcome>,
    extra: ExtraPolicy,
    name: String,
    event_listeners: EventListeners<DispatchEvent>,
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - `max_attempts`: 1 (no retries)
    /// - `latency_budget`: 1 second
    /// - `fast_errors`: empty
    /// - extra: `ExtraPolicy::None`
    /// - `name`: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            max_attempts: 1,
            latency_budget: Duration::from_secs(1),
            fast_errors: HashSet::new(),
            extra: ExtraPolicy::None,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the total number of attempts, including the first.
    ///
    /// # Panics
    ///
    /// Panics at [`build`](Self::build) if `max_attempts == 0`: the source
    /// this dispatcher is based on guards with `>=`, which would make
    /// "never attempt" legal, and `spec.md` §9 records that as unintended.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the total wall-time budget for one `request` call.
    pub fn latency_budget(mut self, budget: Duration) -> Self {
        self.latency_budget = budget;
        self
    }

    /// Adds one outcome to the non-retryable set.
    pub fn fast_error(mut self, outcome: impl Into<Outcome>) -> Self {
        self.fast_errors.insert(outcome.into());
        self
    }

    /// Adds every outcome in `outcomes` to the non-retryable set.
    pub fn fast_errors<I, O>(mut self, outcomes: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<Outcome>,
    {
        self.fast_errors.extend(outcomes.into_iter().map(Into::into));
        self
    }

    /// Applies exponential backoff: wait `initial_delay * factor^(n-1)`
    /// before the n-th retry (n >= 1).
    pub fn backoff(mut self, initial_delay: Duration, factor: f64) -> Self {
        self.extra = ExtraPolicy::Backoff {
            initial_delay,
            factor,
        };
        self
    }

    /// Applies request hedging: fan out to the other endpoints if the
    /// primary attempt hasn't completed within `hedging_delay`.
    pub fn hedge(mut self, hedging_delay: Duration) -> Self {
        self.extra = ExtraPolicy::Hedge { hedging_delay };
        self
    }

    /// Applies per-endpoint circuit breaking with the given sliding-window
    /// policy.
    pub fn circuit_breaker(
        mut self,
        window_size: usize,
        failure_threshold: f64,
        recovery_timeout: Duration,
    ) -> Self {
        self.extra = ExtraPolicy::CircuitBreaker {
            window_size,
            failure_threshold,
            recovery_timeout,
        };
        self
    }

    /// Gives this dispatcher a human-readable name for observability.
    ///
    /// Default: `<unnamed>`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a backoff wait is about to start.
    pub fn on_backoff<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let DispatchEvent::BackoffWait { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked when hedge siblings are fanned out.
    pub fn on_hedge_fan_out<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let DispatchEvent::HedgeFanOut { sibling_count, .. } = event {
                f(*sibling_count);
            }
        }));
        self
    }

    /// Registers a callback invoked when a `request` call succeeds.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let DispatchEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when a `request` call is exhausted.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, crate::ExhaustedReason) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let DispatchEvent::Exhausted {
                attempts, reason, ..
            } = event
            {
                f(*attempts, *reason);
            }
        }));
        self
    }

    /// Builds the immutable [`Policy`].
    ///
    /// # Panics
    ///
    /// Panics if `max_attempts == 0`, if `factor < 0.0` for a `Backoff`
    /// policy, or if `failure_threshold` is outside `[0.0, 1.0]` for a
    /// `CircuitBreaker` policy.
    pub fn build(self) -> Policy {
        assert!(self.max_attempts >= 1, "max_attempts must be >= 1");
        if let ExtraPolicy::Backoff { factor, .. } = &self.extra {
            assert!(*factor >= 0.0, "backoff factor must be >= 0.0");
        }
        if let ExtraPolicy::CircuitBreaker {
            failure_threshold,
            window_size,
            ..
        } = &self.extra
        {
            assert!(
                (0.0..=1.0).contains(failure_threshold),
                "failure_threshold must be in [0.0, 1.0]"
            );
            assert!(*window_size >= 1, "window_size must be >= 1");
        }

        Policy {
            max_attempts: self.max_attempts,
            latency_budget: self.latency_budget,
            fast_errors: self.fast_errors,
            extra: self.extra,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}
