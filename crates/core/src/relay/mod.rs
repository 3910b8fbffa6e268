pub mod breaker;
pub mod engine;

pub use breaker::{BreakerStatus, CircuitBreaker};
pub use engine::{Relay, RelayError, RelayStats};
