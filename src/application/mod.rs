//! Application layer - session lifecycle orchestration.
//!
//! Components share a [`SessionGateway`], which owns the cache-aside read
//! path and the store-then-cache-then-index write ordering:
//!
//! - `SessionLifecycleManager` - create, end, touch, listing and statistics
//! - `ActivityTracker` - page views, clicks, searches, product views and
//!   caller-owned attribute bags
//! - `TokenBinding` - token pair storage and validation
//! - `ExpirationSweeper` - periodic idle-timeout enforcement
//! - `SessionService` - facade over all of the above

mod activity_tracker;
mod expiration_sweeper;
mod gateway;
mod lifecycle;
mod service;
mod token_binding;

pub use activity_tracker::ActivityTracker;
pub use expiration_sweeper::{ExpirationSweeper, ExpirationSweeperConfig, SweepReport};
pub use gateway::{SessionGateway, SessionPolicy};
pub use lifecycle::SessionLifecycleManager;
pub use service::SessionService;
pub use token_binding::TokenBinding;
