//! Serialise environment mutations across tests.
//!
//! `std::env::set_var` and `remove_var` are `unsafe` in Rust 2024. Hold an
//! [`EnvLock`] while a [`ScopedEnv`] overrides `STEPGLUE_*` variables so
//! concurrently running tests never observe each other's values.
//!
//! ```rust,ignore
//! use test_support::{EnvLock, ScopedEnv};
//!
//! let lock = EnvLock::acquire();
//! let mut env = ScopedEnv::new(&lock);
//! env.set_glue_roots(&["app::steps", "app::hooks"]);
//! // Dropping `env` restores the previous values.
//! ```

use std::ffi::OsString;
use std::fmt;
use stepglue_env::{GLUE_ENV, GLUE_SEPARATOR};
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// RAII guard that holds the global environment lock.
pub struct EnvLock {
    _guard: MutexGuard<'static, ()>,
}

impl fmt::Debug for EnvLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvLock").finish_non_exhaustive()
    }
}

impl EnvLock {
    /// Acquire the global lock serialising environment mutations.
    pub fn acquire() -> Self {
        let guard = ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Self { _guard: guard }
    }
}

/// Overrides that are rolled back when dropped.
///
/// Borrowing the [`EnvLock`] ties every mutation to a held lock.
#[derive(Debug)]
pub struct ScopedEnv<'lock> {
    _lock: &'lock EnvLock,
    previous: Vec<(&'static str, Option<OsString>)>,
}

impl<'lock> ScopedEnv<'lock> {
    /// Start a scope under `lock`.
    pub const fn new(lock: &'lock EnvLock) -> Self {
        Self {
            _lock: lock,
            previous: Vec::new(),
        }
    }

    /// Set `name` to `value` for the rest of the scope.
    pub fn set(&mut self, name: &'static str, value: &str) {
        self.remember(name);
        // SAFETY: the borrowed `EnvLock` serialises environment mutation.
        unsafe { std::env::set_var(name, value) };
    }

    /// Point `STEPGLUE_GLUE` at `roots`, joined with the glue separator.
    pub fn set_glue_roots(&mut self, roots: &[&str]) {
        let joined = roots.join(&GLUE_SEPARATOR.to_string());
        self.set(GLUE_ENV, &joined);
    }

    /// Remove `name` for the rest of the scope.
    pub fn remove(&mut self, name: &'static str) {
        self.remember(name);
        // SAFETY: the borrowed `EnvLock` serialises environment mutation.
        unsafe { std::env::remove_var(name) };
    }

    fn remember(&mut self, name: &'static str) {
        if self.previous.iter().all(|(seen, _)| *seen != name) {
            self.previous.push((name, std::env::var_os(name)));
        }
    }
}

impl Drop for ScopedEnv<'_> {
    fn drop(&mut self) {
        for (name, value) in self.previous.drain(..).rev() {
            // SAFETY: the borrowed `EnvLock` is still held while restoring.
            unsafe {
                match value {
                    Some(previous) => std::env::set_var(name, previous),
                    None => std::env::remove_var(name),
                }
            }
        }
    }
}
