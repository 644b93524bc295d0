//! Glue units with known registrations.
//!
//! Each unit lives under its own namespace below [`ROOT`], so tests pick
//! units by choosing roots. Every constructed instance takes a fresh serial
//! number, which lets tests tell instances from different worlds apart.

use anyhow::{bail, ensure};
use std::sync::atomic::{AtomicUsize, Ordering};
use stepglue::{GlueUnit, HookOptions, Scenario, UnitCatalog, UnitDescriptor, dsl};

/// Namespace containing every unit in this module.
pub const ROOT: &str = "test_support::units";
/// Namespace of [`BellySteps`].
pub const BELLY: &str = "test_support::units::belly";
/// Namespace of [`CleanupHooks`].
pub const CLEANUP: &str = "test_support::units::cleanup";
/// Namespace of [`OrderedHooks`].
pub const ORDERED: &str = "test_support::units::ordered";
/// Namespace of [`FailingUnit`].
pub const FAILING: &str = "test_support::units::failing";
/// Message returned by [`FailingUnit::construct`].
pub const FAILURE_MESSAGE: &str = "the belly refused to be built";
/// Expression registered by [`BellySteps`].
pub const BELLY_STEP: &str = "I have {int} cukes in my belly";

static SERIAL: AtomicUsize = AtomicUsize::new(0);

fn next_serial() -> usize {
    SERIAL.fetch_add(1, Ordering::SeqCst)
}

/// Registers one step definition and one before-scenario hook.
#[derive(Debug)]
pub struct BellySteps {
    serial: usize,
}

impl BellySteps {
    /// Serial number of this instance.
    #[must_use]
    pub const fn serial(&self) -> usize {
        self.serial
    }
}

impl GlueUnit for BellySteps {
    fn construct() -> anyhow::Result<Self> {
        dsl::given(BELLY_STEP, |count: i32| -> anyhow::Result<()> {
            ensure!(count >= 0, "cannot hold {count} cukes");
            Ok(())
        })?;
        dsl::before(|_: &Scenario| Ok(()))?;
        Ok(Self {
            serial: next_serial(),
        })
    }
}

/// Registers one after-scenario hook.
#[derive(Debug)]
pub struct CleanupHooks {
    serial: usize,
}

impl CleanupHooks {
    /// Serial number of this instance.
    #[must_use]
    pub const fn serial(&self) -> usize {
        self.serial
    }
}

impl GlueUnit for CleanupHooks {
    fn construct() -> anyhow::Result<Self> {
        dsl::after(|_: &Scenario| Ok(()))?;
        Ok(Self {
            serial: next_serial(),
        })
    }
}

/// Registers before-scenario hooks with orders 5, 1 and 3, in that order.
#[derive(Debug)]
pub struct OrderedHooks;

impl GlueUnit for OrderedHooks {
    fn construct() -> anyhow::Result<Self> {
        for order in [5, 1, 3] {
            dsl::before_with(HookOptions::new().with_order(order), |_: &Scenario| Ok(()))?;
        }
        Ok(Self)
    }
}

/// Constructor always fails with [`FAILURE_MESSAGE`].
#[derive(Debug)]
pub struct FailingUnit;

impl GlueUnit for FailingUnit {
    fn construct() -> anyhow::Result<Self> {
        bail!(FAILURE_MESSAGE)
    }
}

/// Descriptor for [`BellySteps`].
pub static BELLY_UNIT: UnitDescriptor = UnitDescriptor::concrete::<BellySteps>(BELLY);
/// Descriptor for [`CleanupHooks`].
pub static CLEANUP_UNIT: UnitDescriptor = UnitDescriptor::concrete::<CleanupHooks>(CLEANUP);
/// Descriptor for [`OrderedHooks`].
pub static ORDERED_UNIT: UnitDescriptor = UnitDescriptor::concrete::<OrderedHooks>(ORDERED);
/// Descriptor for [`FailingUnit`].
pub static FAILING_UNIT: UnitDescriptor = UnitDescriptor::concrete::<FailingUnit>(FAILING);

/// Catalogue of every unit in this module.
#[must_use]
pub fn catalog() -> UnitCatalog {
    UnitCatalog::new()
        .with(&BELLY_UNIT)
        .with(&CLEANUP_UNIT)
        .with(&ORDERED_UNIT)
        .with(&FAILING_UNIT)
}
