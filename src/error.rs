//! Error types raised while discovering, constructing, and registering glue.
//!
//! Every variant carries a stable `miette` diagnostic code so hosts can match
//! on failures without parsing messages.

// The unused_assignments lint fires in some Rust versions due to
// thiserror/miette derive expansion. `#[expect]` would fail on versions where
// it does not fire, so the suppression stays an `#[allow]`.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use std::any::TypeId;
use thiserror::Error;

/// Boxed error produced by user-authored unit constructors.
pub type UnitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the glue backend and its collaborators.
#[derive(Debug, Error, Diagnostic)]
pub enum GlueError {
    /// A registration call was made while no registration context was bound.
    #[error("no active registration context on this thread")]
    #[diagnostic(
        code(stepglue::context::inactive),
        help("register steps and hooks from a glue unit constructor while a world is being built")
    )]
    InactiveContext,

    /// A second registration context was bound on a thread that already has one.
    #[error("a registration context is already active on this thread")]
    #[diagnostic(code(stepglue::context::already_active))]
    ContextAlreadyActive,

    /// An instance was requested outside a started factory scope.
    #[error("object factory has not been started")]
    #[diagnostic(code(stepglue::factory::not_started))]
    FactoryNotStarted,

    /// An instance was requested for a type never added to the factory.
    #[error("glue unit {type_id:?} was never added to the object factory")]
    #[diagnostic(code(stepglue::factory::unknown_unit))]
    UnknownUnit {
        /// Identifier of the requested type.
        type_id: TypeId,
    },

    /// An interface-only descriptor was asked for an instance.
    #[error("glue unit '{unit}' is interface-only and cannot be instantiated")]
    #[diagnostic(code(stepglue::factory::not_instantiable))]
    NotInstantiable {
        /// Type name of the descriptor.
        unit: &'static str,
    },

    /// A glue unit constructor returned an error.
    #[error("failed to construct glue unit '{unit}'")]
    #[diagnostic(code(stepglue::factory::construction))]
    Construction {
        /// Type name of the failing unit.
        unit: &'static str,
        /// Error returned by the unit constructor.
        #[source]
        source: UnitError,
    },

    /// `build_world` was called while a world is already built.
    #[error("a world is already built; dispose it before building another")]
    #[diagnostic(code(stepglue::backend::world_already_built))]
    WorldAlreadyBuilt,

    /// Glue was added after the registration window closed.
    #[error("glue is sealed; steps and hooks can only be added while a world is being built")]
    #[diagnostic(code(stepglue::glue::sealed))]
    GlueSealed,

    /// Two step definitions share the same expression.
    #[error("duplicate step definition '{expression}' at {second}; first defined at {first}")]
    #[diagnostic(code(stepglue::glue::duplicate_step))]
    DuplicateStepDefinition {
        /// Source text of the expression.
        expression: String,
        /// Location of the definition already registered.
        first: String,
        /// Location of the rejected definition.
        second: String,
    },

    /// An expression refers to a parameter type that is not registered.
    #[error("undefined parameter type '{{{name}}}' in expression '{expression}'")]
    #[diagnostic(code(stepglue::expression::undefined_parameter_type))]
    UndefinedParameterType {
        /// Source text of the expression.
        expression: String,
        /// Name of the missing parameter type.
        name: String,
    },

    /// An expression could not be parsed.
    #[error("malformed expression '{expression}': {reason}")]
    #[diagnostic(code(stepglue::expression::malformed))]
    MalformedExpression {
        /// Source text of the expression.
        expression: String,
        /// Description of the problem.
        reason: String,
    },

    /// The step body accepts a different number of arguments than the
    /// expression captures.
    #[error("expression '{expression}' captures {expected} argument(s) but the step body takes {actual}")]
    #[diagnostic(code(stepglue::expression::arity_mismatch))]
    ArityMismatch {
        /// Source text of the expression.
        expression: String,
        /// Number of parameters in the expression.
        expected: usize,
        /// Number of parameters accepted by the body.
        actual: usize,
    },

    /// A parameter type or compiled expression produced an invalid regex.
    #[error("invalid pattern '{pattern}'")]
    #[diagnostic(code(stepglue::expression::invalid_pattern))]
    InvalidPattern {
        /// Pattern that failed to compile.
        pattern: String,
        /// Error reported by the regex engine.
        #[source]
        source: regex::Error,
    },

    /// A parameter type name was registered twice.
    #[error("parameter type '{name}' is already defined")]
    #[diagnostic(code(stepglue::expression::duplicate_parameter_type))]
    DuplicateParameterType {
        /// Name of the parameter type.
        name: String,
    },
}

impl GlueError {
    /// Convert a constructor failure for the unit named `unit`.
    ///
    /// Registration errors raised through the DSL come back unchanged; any
    /// other error is wrapped in [`GlueError::Construction`].
    pub(crate) fn construction(unit: &'static str, source: anyhow::Error) -> Self {
        match source.downcast::<Self>() {
            Ok(registration) => registration,
            Err(other) => Self::Construction {
                unit,
                source: other.into(),
            },
        }
    }
}

/// Marker error returned by step bodies that are not implemented yet.
///
/// Generated snippets return it so hosts can report the step as pending
/// rather than failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error, Diagnostic)]
#[error("step is not implemented yet")]
#[diagnostic(code(stepglue::step::pending))]
pub struct Pending;
