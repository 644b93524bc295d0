//! BDD test entry point using rstest-bdd.
//!
//! The `scenarios!` macro generates one test per scenario found under
//! `tests/features`; step definitions live in `bdd::steps`.

mod bdd;

pub use bdd::fixtures::*;

use rstest_bdd_macros::scenarios;

scenarios!("tests/features", fixtures = [world: TestWorld]);
