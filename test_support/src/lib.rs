//! Shared helpers for stepglue's integration and behavioural tests.
//!
//! [`env_lock`] serialises environment mutation; [`units`] provides glue
//! units whose constructors register known steps and hooks.

pub mod env_lock;
pub mod units;

pub use env_lock::{EnvLock, ScopedEnv};
