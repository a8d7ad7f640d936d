//! A resilient request dispatcher: issue one logical request against any of
//! several equivalent endpoints, under a configurable [`Policy`] of
//! retries, a latency budget, non-retryable error classification,
//! exponential backoff, request hedging, or per-endpoint circuit breaking.
//!
//! ```rust
//! use resilient_dispatcher::{Dispatcher, Outcome, Policy, Transport};
//! use futures::future::BoxFuture;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Endpoint;
//! impl Transport<&'static str> for Endpoint {
//!     fn send(&self, payload: &'static str) -> BoxFuture<'static, Outcome> {
//!         Box::pin(async move {
//!             println!("sending {payload}");
//!             Outcome::SUCCESS
//!         })
//!     }
//! }
//!
//! # async fn run() {
//! let policy = Policy::builder()
//!     .max_attempts(3)
//!     .latency_budget(Duration::from_secs(2))
//!     .backoff(Duration::from_millis(50), 2.0)
//!     .name("orders-service")
//!     .build();
//!
//! let transports: Vec<Arc<dyn Transport<&'static str>>> = vec![Arc::new(Endpoint)];
//! let dispatcher = Dispatcher::new(policy, transports);
//! let outcome = dispatcher.request("payload").await.unwrap();
//! assert!(outcome.is_success());
//! # }
//! ```

mod attempt;
mod dispatcher;
mod error;
mod events;
mod health;
mod outcome;
mod policy;
mod selector;
mod transport;

pub use attempt::{AttemptResult, AttemptRunner};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, ExhaustedReason};
pub use events::DispatchEvent;
pub use health::{CircuitState, EndpointHealth};
pub use outcome::Outcome;
pub use policy::{ExtraPolicy, Policy, PolicyBuilder};
pub use selector::EndpointSelector;
pub use transport::Transport;

pub use resilient_dispatcher_core::{EventListener, EventListeners, FnListener, ResilienceEvent};
