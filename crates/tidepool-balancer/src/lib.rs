//! tidepool-balancer — per-request instance selection.
//!
//! The distributor maps an inbound request to one of the currently active
//! instances. It is called inline from request handlers, so every method
//! is synchronous and never touches I/O.
//!
//! # Strategies
//!
//! - **`round_robin`** — global monotonic counter modulo pool size
//! - **`least_connections`** — fewest active connections, claims one
//! - **`weighted_round_robin`** — cursor over cumulative weights
//! - **`ip_hash`** — stable hash of the client IP
//! - **`least_response_time`** — lowest mean of recent response times
//! - **`consistent_hash`** — stable hash of the canonical request key
//!
//! Each strategy is a `Balance` implementation looked up from the
//! `LoadBalancingStrategy` tag; the distributor itself never branches on
//! the algorithm.

pub mod distributor;
pub mod request;
pub mod strategy;

pub use distributor::{DistributorConfig, InstanceStats, LoadDistributor};
pub use request::LoadRequest;
pub use strategy::{strategy_for, Balance, SelectionState};
