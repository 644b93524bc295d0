//! Step definitions for loading glue and building worlds.

use crate::bdd::fixtures::{TestBackend, strip_quotes, with_world};
use anyhow::{Context, Result, bail, ensure};
use rstest_bdd_macros::{given, then, when};
use stepglue::{
    Backend, ClosureBackend, GlueCollection, GlueError, GluePath, HookPhase, ObjectFactoryExt,
    ScopedObjectFactory, context, dsl,
};
use test_support::units::{self, BellySteps};

fn parse_phase(raw: &str) -> Result<HookPhase> {
    Ok(match strip_quotes(raw) {
        "before" => HookPhase::BeforeScenario,
        "after" => HookPhase::AfterScenario,
        "before step" => HookPhase::BeforeStep,
        "after step" => HookPhase::AfterStep,
        other => bail!("unknown hook phase '{other}'"),
    })
}

fn new_backend() -> TestBackend {
    ClosureBackend::with_parts(ScopedObjectFactory::new(), units::catalog())
}

fn with_backend<R>(f: impl FnOnce(&mut TestBackend) -> R) -> Result<R> {
    with_world(|world| {
        let mut backend = world.backend.borrow_mut();
        let backend = backend.as_mut().context("no backend in this scenario")?;
        Ok(f(backend))
    })
}

fn build() -> Result<()> {
    let outcome = with_backend(Backend::build_world)?;
    with_world(|world| match outcome {
        Ok(()) => {
            world.build_error.clear();
            Ok(())
        }
        Err(err) => {
            world.build_error.set(format!("{err}: {}", source_text(&err)));
            Ok(())
        }
    })
}

fn source_text(err: &GlueError) -> String {
    std::error::Error::source(err)
        .map(ToString::to_string)
        .unwrap_or_default()
}

fn belly_serial() -> Result<Option<usize>> {
    with_backend(|backend| {
        backend
            .factory_mut()
            .instance::<BellySteps>()
            .ok()
            .map(BellySteps::serial)
    })
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a backend loaded with glue from {roots}")]
fn backend_loaded(roots: String) -> Result<()> {
    let paths: Vec<GluePath> = strip_quotes(&roots)
        .split(',')
        .map(GluePath::new)
        .collect();
    let glue = GlueCollection::shared();
    let mut backend = new_backend();
    backend.load_glue(glue.clone(), &paths);
    with_world(|world| {
        *world.backend.borrow_mut() = Some(backend);
        *world.glue.borrow_mut() = Some(glue);
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("a world is built")]
fn world_is_built() -> Result<()> {
    build()?;
    if let Some(serial) = belly_serial()? {
        with_world(|world| world.first_serial.set(serial));
    }
    Ok(())
}

#[when("the world is disposed and built again")]
fn world_is_rebuilt() -> Result<()> {
    with_backend(Backend::dispose_world)?;
    build()
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the world is built without errors")]
fn built_without_errors() -> Result<()> {
    with_world(|world| match world.build_error.get() {
        Some(err) => bail!("build failed: {err}"),
        None => Ok(()),
    })
}

#[then("building the world fails with {message}")]
fn build_failed_with(message: String) -> Result<()> {
    let expected = strip_quotes(&message);
    with_world(|world| {
        let err = world.build_error.get().context("build should have failed")?;
        ensure!(err.contains(expected), "expected '{expected}' in '{err}'");
        Ok(())
    })
}

#[then("the step definition count is {count}")]
fn step_definition_count(count: usize) -> Result<()> {
    let actual = with_world(|world| world.with_glue(|glue| glue.step_definitions().count()))
        .context("no glue in this scenario")?;
    ensure!(actual == count, "expected {count} step definitions, found {actual}");
    Ok(())
}

#[then("the {phase} hook count is {count}")]
fn hook_count(phase: String, count: usize) -> Result<()> {
    let phase = parse_phase(&phase)?;
    let actual = with_world(|world| world.with_glue(|glue| glue.hooks(phase).len()))
        .context("no glue in this scenario")?;
    ensure!(actual == count, "expected {count} {phase} hooks, found {actual}");
    Ok(())
}

#[then("the {phase} hook orders are {orders}")]
fn hook_orders(phase: String, orders: String) -> Result<()> {
    let phase = parse_phase(&phase)?;
    let expected: Vec<i32> = strip_quotes(&orders)
        .split(',')
        .map(|order| order.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .context("hook orders must be integers")?;
    let actual: Vec<i32> = with_world(|world| {
        world.with_glue(|glue| glue.hooks(phase).iter().map(|hook| hook.order()).collect())
    })
    .context("no glue in this scenario")?;
    ensure!(actual == expected, "expected {expected:?}, found {actual:?}");
    Ok(())
}

#[then("the glue is sealed")]
fn glue_is_sealed() -> Result<()> {
    let sealed = with_world(|world| world.with_glue(GlueCollection::is_sealed))
        .context("no glue in this scenario")?;
    ensure!(sealed, "glue should be sealed after a build");
    Ok(())
}

#[then("no registration context is active")]
fn no_context_active() -> Result<()> {
    ensure!(!context::is_active(), "registration context leaked");
    Ok(())
}

#[then("registering a step outside a world reports an inactive context")]
fn late_registration_rejected() -> Result<()> {
    let outcome = dsl::given("a step registered too late", || -> anyhow::Result<()> { Ok(()) });
    ensure!(
        matches!(outcome, Err(GlueError::InactiveContext)),
        "expected an inactive context, got {outcome:?}"
    );
    Ok(())
}

#[then("the belly unit is a fresh instance")]
fn belly_is_fresh() -> Result<()> {
    let first = with_world(|world| world.first_serial.get()).context("no first world recorded")?;
    let current = belly_serial()?.context("belly unit not built")?;
    ensure!(current != first, "expected a new instance, got serial {current} again");
    Ok(())
}
