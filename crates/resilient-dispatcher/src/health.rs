use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// The two-valued state of one endpoint's circuit, derived from
/// [`EndpointHealth::is_open`].
///
/// Unlike `tower-resilience-circuitbreaker`'s `Circuit`, there is no
/// half-open state here: the policy this dispatcher implements reopens the
/// window to ordinary traffic the instant `open_until` passes, rather than
/// admitting a limited trial of calls first (`spec.md` leaves half-open
/// probing out of scope for this core).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// The endpoint is eligible for selection.
    Closed,
    /// `now < open_until`; the endpoint must not be selected.
    Open,
}

#[derive(Debug)]
struct HealthState {
    history: VecDeque<bool>,
    open_until: Option<Instant>,
}

impl HealthState {
    fn new(window_size: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(window_size),
            open_until: None,
        }
    }

    fn failure_rate(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        let failures = self.history.iter().filter(|ok| !**ok).count();
        failures as f64 / self.history.len() as f64
    }

    fn is_open_at(&self, now: Instant) -> bool {
        self.open_until.is_some_and(|until| now < until)
    }
}

/// Per-endpoint sliding-window failure tracking and open/closed circuit
/// state, shared across every `request` call on a [`Dispatcher`](crate::Dispatcher).
///
/// Reads and writes are serialized through a `tokio::sync::Mutex`, the same
/// way `tower-resilience-circuitbreaker`'s `CircuitBreaker` wraps its
/// `Circuit` in `Arc<Mutex<Circuit>>` — the window mutation (push, maybe
/// evict, maybe open) is multi-step and must be observed atomically as a
/// unit.
pub struct EndpointHealth {
    state: Mutex<HealthState>,
    window_size: usize,
    failure_threshold: f64,
    recovery_timeout: Duration,
}

impl EndpointHealth {
    /// Creates a new tracker with an empty history.
    pub fn new(window_size: usize, failure_threshold: f64, recovery_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(HealthState::new(window_size)),
            window_size,
            failure_threshold,
            recovery_timeout,
        }
    }

    /// Appends one outcome to the sliding window, evicting the oldest entry
    /// once full. If the new entry is a failure and the post-append failure
    /// rate is at or above the threshold, opens the circuit for
    /// `recovery_timeout`. A success never moves `open_until` backward.
    pub async fn record(&self, success: bool) {
        let mut state = self.state.lock().await;

        if state.history.len() >= self.window_size {
            state.history.pop_front();
        }
        state.history.push_back(success);

        if !success && state.failure_rate() >= self.failure_threshold {
            state.open_until = Some(Instant::now() + self.recovery_timeout);
        }
    }

    /// Returns `true` if the circuit is currently open (`now < open_until`).
    pub async fn is_open(&self) -> bool {
        self.state.lock().await.is_open_at(Instant::now())
    }

    /// Returns the current failure rate (0.0 if the window is empty).
    pub async fn failure_rate(&self) -> f64 {
        self.state.lock().await.failure_rate()
    }

    /// Returns how much longer the circuit will remain open, or
    /// `Duration::ZERO` if it is already closed.
    pub async fn time_until_recovery(&self) -> Duration {
        let state = self.state.lock().await;
        let now = Instant::now();
        match state.open_until {
            Some(until) if until > now => until - now,
            _ => Duration::ZERO,
        }
    }

    /// Returns the two-valued [`CircuitState`] for event reporting.
    pub async fn state(&self) -> CircuitState {
        if self.is_open().await {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }

    /// A snapshot `(is_open, failure_rate, time_until_recovery)` taken
    /// under a single lock acquisition, for the health-ranked selector's
    /// sort key (`spec.md` §4.4).
    pub(crate) async fn ranking_key(&self) -> (bool, f64, Duration) {
        let state = self.state.lock().await;
        let now = Instant::now();
        let is_open = state.is_open_at(now);
        let time_until_recovery = match state.open_until {
            Some(until) if until > now => until - now,
            _ => Duration::ZERO,
        };
        (is_open, state.failure_rate(), time_until_recovery)
    }
}
