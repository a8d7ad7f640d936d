use thiserror::Error;

/// Why a [`Dispatcher::request`](crate::Dispatcher::request) call gave up
/// without returning [`Outcome::SUCCESS`](crate::Outcome::SUCCESS).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustedReason {
    /// `attempts_used` reached `max_attempts` before a success.
    MaxAttemptsExceeded,
    /// The remaining latency budget hit zero, at attempt start, during a
    /// backoff wait, or during an attempt's per-attempt timeout.
    LatencyBudgetExhausted,
    /// An [`Outcome`](crate::Outcome) in the policy's `fast_errors` set was
    /// observed.
    NonRetryable,
    /// The best-ranked endpoint is currently open under the circuit
    /// breaker policy.
    CircuitBreakerOpen,
}

impl std::fmt::Display for ExhaustedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExhaustedReason::MaxAttemptsExceeded => "max attempts exceeded",
            ExhaustedReason::LatencyBudgetExhausted => "latency budget exhausted",
            ExhaustedReason::NonRetryable => "non-retryable error observed",
            ExhaustedReason::CircuitBreakerOpen => "circuit breaker open",
        };
        f.write_str(s)
    }
}

/// Error returned by [`Dispatcher::request`](crate::Dispatcher::request).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The dispatch loop was exhausted; see [`ExhaustedReason`] for why.
    #[error("dispatch exhausted: {0}")]
    Exhausted(ExhaustedReason),
}

impl DispatchError {
    /// Returns the exhaustion reason.
    pub fn reason(&self) -> ExhaustedReason {
        match self {
            DispatchError::Exhausted(reason) => *reason,
        }
    }

    /// Returns `true` if this is [`ExhaustedReason::MaxAttemptsExceeded`].
    pub fn is_max_attempts_exceeded(&self) -> bool {
        self.reason() == ExhaustedReason::MaxAttemptsExceeded
    }

    /// Returns `true` if this is [`ExhaustedReason::LatencyBudgetExhausted`].
    pub fn is_latency_budget_exhausted(&self) -> bool {
        self.reason() == ExhaustedReason::LatencyBudgetExhausted
    }

    /// Returns `true` if this is [`ExhaustedReason::NonRetryable`].
    pub fn is_non_retryable(&self) -> bool {
        self.reason() == ExhaustedReason::NonRetryable
    }

    /// Returns `true` if this is [`ExhaustedReason::CircuitBreakerOpen`].
    pub fn is_circuit_breaker_open(&self) -> bool {
        self.reason() == ExhaustedReason::CircuitBreakerOpen
    }
}
