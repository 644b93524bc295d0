//! Thread-bound registration context.
//!
//! Glue unit constructors are invoked generically by the object factory and
//! have no parameter through which to receive the glue. While a world is
//! being built the backend binds a [`GlueRegistrar`] to the building thread;
//! the DSL functions reach it through [`current`].
//!
//! The binding is owned by a [`ContextGuard`]. Dropping the guard clears the
//! binding, so an early return, an error, or a panic in a constructor never
//! leaks a registrar into later work on a reused thread.

use crate::error::GlueError;
use crate::glue::GlueRegistrar;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

thread_local! {
    static ACTIVE: RefCell<Option<Arc<dyn GlueRegistrar>>> = const { RefCell::new(None) };
}

/// Bind `registrar` to the calling thread until the returned guard drops.
///
/// # Errors
///
/// Returns [`GlueError::ContextAlreadyActive`] when the thread is already
/// bound; at most one registrar may be active per thread.
pub fn activate(registrar: Arc<dyn GlueRegistrar>) -> Result<ContextGuard, GlueError> {
    ACTIVE.with(|slot| {
        let mut bound = slot.borrow_mut();
        if bound.is_some() {
            return Err(GlueError::ContextAlreadyActive);
        }
        *bound = Some(registrar);
        Ok(())
    })?;
    tracing::trace!("registration context activated");
    Ok(ContextGuard {
        _not_send: PhantomData,
    })
}

/// Registrar bound to the calling thread.
///
/// # Errors
///
/// Returns [`GlueError::InactiveContext`] when nothing is bound.
pub fn current() -> Result<Arc<dyn GlueRegistrar>, GlueError> {
    ACTIVE.with(|slot| slot.borrow().clone().ok_or(GlueError::InactiveContext))
}

/// Clear the binding for the calling thread.
///
/// Prefer dropping the [`ContextGuard`]; this exists for hosts that manage
/// the binding lifetime themselves.
pub fn deactivate() {
    let previous = ACTIVE.with(|slot| slot.borrow_mut().take());
    if previous.is_some() {
        tracing::trace!("registration context deactivated");
    }
}

/// Returns `true` when a registrar is bound to the calling thread.
#[must_use]
pub fn is_active() -> bool {
    ACTIVE.with(|slot| slot.borrow().is_some())
}

/// RAII handle for an active binding; dropping it deactivates the context.
///
/// The guard is tied to the thread that created it.
#[must_use = "dropping the guard immediately deactivates the context"]
pub struct ContextGuard {
    _not_send: PhantomData<*const ()>,
}

impl fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextGuard").finish_non_exhaustive()
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glue::{HookDefinition, StepDefinitionFactory};
    use anyhow::{Result, ensure};
    use rstest::rstest;

    #[derive(Debug, Default)]
    struct NullRegistrar;

    impl GlueRegistrar for NullRegistrar {
        fn add_step_definition(&self, _factory: StepDefinitionFactory) -> Result<(), GlueError> {
            Ok(())
        }

        fn add_hook(&self, _hook: HookDefinition) -> Result<(), GlueError> {
            Ok(())
        }
    }

    #[rstest]
    fn current_fails_without_binding() {
        assert!(matches!(current(), Err(GlueError::InactiveContext)));
        assert!(!is_active());
    }

    #[rstest]
    fn guard_binds_and_releases() -> Result<()> {
        {
            let _guard = activate(Arc::new(NullRegistrar))?;
            ensure!(is_active(), "context should be active inside the guard");
            ensure!(current().is_ok());
        }
        ensure!(!is_active(), "dropping the guard should deactivate");
        Ok(())
    }

    #[rstest]
    fn second_activation_is_rejected() -> Result<()> {
        let _guard = activate(Arc::new(NullRegistrar))?;
        let second = activate(Arc::new(NullRegistrar));
        ensure!(matches!(second, Err(GlueError::ContextAlreadyActive)));
        ensure!(is_active(), "rejected activation must keep the first binding");
        Ok(())
    }

    #[rstest]
    fn guard_releases_on_panic() {
        let outcome = std::panic::catch_unwind(|| {
            let _guard = activate(Arc::new(NullRegistrar)).ok();
            panic!("constructor blew up");
        });
        assert!(outcome.is_err());
        assert!(!is_active());
    }

    #[rstest]
    fn bindings_are_per_thread() -> Result<()> {
        let _guard = activate(Arc::new(NullRegistrar))?;
        let other = std::thread::spawn(is_active)
            .join()
            .map_err(|_| anyhow::anyhow!("thread panicked"))?;
        ensure!(!other, "other threads must not see this binding");
        Ok(())
    }
}
