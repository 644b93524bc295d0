//! Closure-based step definition glue for BDD test runners.
//!
//! Users declare glue units: types whose constructors register step
//! definitions and hooks through the [`dsl`] functions. A host runner loads
//! the units under some namespace roots, then for every scenario builds a
//! world (constructing each unit while a registration context is bound to
//! the thread) and disposes it afterwards.
//!
//! ```
//! use stepglue::{Backend, ClosureBackend, GlueCollection, GluePath, GlueUnit, dsl};
//!
//! struct Belly;
//!
//! impl GlueUnit for Belly {
//!     fn construct() -> anyhow::Result<Self> {
//!         dsl::given("I have {int} cukes", |_count: i32| -> anyhow::Result<()> { Ok(()) })?;
//!         Ok(Self)
//!     }
//! }
//!
//! stepglue::glue_unit!(Belly);
//!
//! # fn main() -> anyhow::Result<()> {
//! let glue = GlueCollection::shared();
//! let mut backend = ClosureBackend::new();
//! backend.load_glue(glue.clone(), &[GluePath::new(module_path!())]);
//! backend.build_world()?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod context;
pub mod discovery;
pub mod dsl;
pub mod error;
pub mod expression;
pub mod factory;
pub mod glue;
pub mod snippet;
pub mod unit;

pub use backend::{Backend, BackendPhase, ClosureBackend};
pub use config::BackendConfig;
pub use discovery::{GluePath, InventoryFinder, UnitCatalog, UnitFinder, discover};
pub use dsl::{DataTable, FromStepArg, HookOptions, StepFn};
pub use error::{GlueError, Pending};
pub use expression::{ParameterType, StepExpression, TypeRegistry};
pub use factory::{ObjectFactory, ObjectFactoryExt, ScopedObjectFactory};
pub use glue::{
    DEFAULT_HOOK_ORDER, Glue, GlueCollection, GlueRegistrar, HookDefinition, HookPhase, Scenario,
    SharedGlue, StepDefinition,
};
pub use snippet::{
    ClosureSnippet, FunctionNameGenerator, FunctionSnippet, PickleStep, Snippet, SnippetGenerator,
    SnippetType, StepArgument,
};
pub use unit::{GlueUnit, UnitDescriptor, UnitKind};

#[doc(hidden)]
pub use inventory;
