//! Step definition modules for BDD scenarios.
//!
//! Each module contains step definitions for one area. Steps are registered
//! via `#[given]`, `#[when]`, and `#[then]` attribute macros.
//!
//! ## File-wide lint suppressions
//!
//! The `rstest-bdd` macros generate wrapper code for each step function that
//! triggers Clippy lints the step functions themselves cannot address.
//!
//! - `shadow_reuse`: Steps rebind captured parameters after parsing them
//! - `unnecessary_wraps`: Macros require `Result` returns for all steps
//! - `needless_pass_by_value`: Step signatures take captured `String`s

#![expect(
    clippy::shadow_reuse,
    reason = "rstest-bdd steps rebind captured parameters after parsing"
)]
#![expect(
    clippy::unnecessary_wraps,
    reason = "rstest-bdd macros require Result returns for step functions"
)]
#![expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd step signatures prioritise ergonomics"
)]

mod lifecycle;
mod snippets;
