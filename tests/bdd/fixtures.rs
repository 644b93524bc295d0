//! Scenario state shared between steps.
//!
//! The `scenarios!` macro does not hand the injected fixture to step
//! functions, so steps reach the world through a thread-local that is reset
//! whenever the running test (identified by thread name) changes.

#![allow(
    missing_docs,
    reason = "Generated fixture types cannot have doc comments attached"
)]

use rstest::fixture;
use rstest_bdd::Slot;
use std::cell::RefCell;
use std::sync::{Arc, Mutex, MutexGuard};
use stepglue::{ClosureBackend, GlueCollection, ScopedObjectFactory, UnitCatalog};

/// Backend over the `test_support` unit catalogue.
pub type TestBackend = ClosureBackend<ScopedObjectFactory, UnitCatalog>;

thread_local! {
    static WORLD: RefCell<Option<TestWorld>> = const { RefCell::new(None) };
    static CURRENT_SCENARIO: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// State for one scenario.
#[derive(Default)]
pub struct TestWorld {
    /// Backend under test.
    pub backend: RefCell<Option<TestBackend>>,
    /// Glue the backend registers into.
    pub glue: RefCell<Option<Arc<Mutex<GlueCollection>>>>,
    /// Error text from the last failed build.
    pub build_error: Slot<String>,
    /// Serial of the belly unit in the first world built.
    pub first_serial: Slot<usize>,
    /// Snippets produced by the last request.
    pub snippets: Slot<Vec<String>>,
}

impl TestWorld {
    /// Lock the scenario glue, if one was created.
    pub fn with_glue<R>(&self, f: impl FnOnce(&GlueCollection) -> R) -> Option<R> {
        let glue = self.glue.borrow();
        let shared = glue.as_ref()?;
        let guard: MutexGuard<'_, GlueCollection> =
            shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(f(&guard))
    }
}

fn current_scenario_name() -> Option<String> {
    std::thread::current().name().map(String::from)
}

fn scenario_changed() -> bool {
    let current = current_scenario_name();
    CURRENT_SCENARIO.with(|stored| match (&*stored.borrow(), &current) {
        (None, _) => true,
        (Some(prev), Some(curr)) => prev != curr,
        (Some(_), None) => false,
    })
}

/// Access the current scenario's world, creating a fresh one when a new
/// scenario starts on this thread.
pub fn with_world<R>(f: impl FnOnce(&TestWorld) -> R) -> R {
    if scenario_changed() {
        WORLD.with(|w| {
            w.borrow_mut().take();
            *w.borrow_mut() = Some(TestWorld::default());
        });
        CURRENT_SCENARIO.with(|stored| *stored.borrow_mut() = current_scenario_name());
    }
    WORLD.with(|w| {
        let mut slot = w.borrow_mut();
        let world = slot.get_or_insert_with(TestWorld::default);
        f(world)
    })
}

/// Fixture providing a fresh `TestWorld` for each scenario.
#[fixture]
pub fn world() -> TestWorld {
    TestWorld::default()
}

/// Strip surrounding double quotes from a captured step parameter.
#[must_use]
pub fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|stripped| stripped.strip_suffix('"'))
        .unwrap_or(s)
}
