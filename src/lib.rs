//! Session Cache - cache-aside session store and lifecycle manager.
//!
//! Tracks short-lived browsing sessions for a multi-service web platform,
//! keeping a shared fast cache and a per-user index consistent with an
//! authoritative durable store, and expiring idle sessions in the
//! background.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
