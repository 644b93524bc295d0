//! Closure-based registration API for glue unit constructors.
//!
//! Every function here looks up the registrar bound to the calling thread,
//! so they only succeed while a world is being built. Called anywhere else
//! they return [`GlueError::InactiveContext`].
//!
//! Step bodies are closures with annotated parameter types and an explicit
//! `anyhow::Result<()>` return type; each parameter is converted from the
//! captured text with [`FromStepArg`].
//!
//! ```
//! use stepglue::{GlueUnit, HookOptions, dsl};
//!
//! struct Belly;
//!
//! impl GlueUnit for Belly {
//!     fn construct() -> anyhow::Result<Self> {
//!         dsl::given("I have {int} cukes in my belly", |count: i32| -> anyhow::Result<()> {
//!             anyhow::ensure!(count < 100, "too many cukes");
//!             Ok(())
//!         })?;
//!         dsl::before_with(HookOptions::new().with_order(1), |_scenario| Ok(()))?;
//!         Ok(Self)
//!     }
//! }
//! ```

use crate::context;
use crate::error::GlueError;
use crate::expression::{StepExpression, TypeRegistry};
use crate::glue::{
    DEFAULT_HOOK_ORDER, HookBody, HookDefinition, HookPhase, Scenario, StepBody, StepDefinition,
    StepDefinitionFactory,
};
use anyhow::{Context, ensure};
use std::panic::Location;
use std::sync::Arc;

/// Conversion from captured step text into a typed argument.
pub trait FromStepArg: Sized {
    /// Convert `raw` into `Self`.
    ///
    /// # Errors
    ///
    /// Returns an error when `raw` is not a valid representation.
    fn from_step_arg(raw: &str) -> anyhow::Result<Self>;
}

macro_rules! from_str_step_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromStepArg for $ty {
                fn from_step_arg(raw: &str) -> anyhow::Result<Self> {
                    raw.trim()
                        .parse::<$ty>()
                        .with_context(|| format!("cannot convert '{raw}' to {}", stringify!($ty)))
                }
            }
        )*
    };
}

from_str_step_arg!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
);

impl FromStepArg for String {
    fn from_step_arg(raw: &str) -> anyhow::Result<Self> {
        Ok(raw.to_owned())
    }
}

/// A step's data table, parsed from its pipe-delimited text form.
///
/// ```
/// use stepglue::dsl::{DataTable, FromStepArg};
///
/// let table = DataTable::from_step_arg("| name | count |\n| cuke | 3 |").unwrap();
/// assert_eq!(table.rows()[1], ["cuke", "3"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataTable {
    rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Build a table from rows of cells.
    #[must_use]
    pub const fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// All rows, header first.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Cell at `row`, `column`, if present.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }
}

impl FromStepArg for DataTable {
    fn from_step_arg(raw: &str) -> anyhow::Result<Self> {
        let mut rows = Vec::new();
        for (number, line) in raw.lines().map(str::trim).enumerate() {
            if line.is_empty() {
                continue;
            }
            let inner = line
                .strip_prefix('|')
                .and_then(|rest| rest.strip_suffix('|'))
                .with_context(|| format!("data table line {} is not delimited by '|'", number + 1))?;
            rows.push(inner.split('|').map(|cell| cell.trim().to_owned()).collect());
        }
        Ok(Self { rows })
    }
}

/// A closure usable as a step body, taking `Args` converted from captures.
///
/// Implemented for `Fn` closures of up to six [`FromStepArg`] parameters
/// returning `anyhow::Result<()>`.
pub trait StepFn<Args>: Send + Sync + 'static {
    /// Rust type names of the parameters, in order.
    fn parameter_types() -> Vec<&'static str>;

    /// Convert `args` and run the closure.
    ///
    /// # Errors
    ///
    /// Fails when the argument count differs, a conversion fails, or the
    /// closure itself fails.
    fn invoke(&self, args: &[String]) -> anyhow::Result<()>;
}

fn arg_at(args: &[String], index: usize) -> anyhow::Result<&str> {
    args.get(index)
        .map(String::as_str)
        .with_context(|| format!("missing step argument {index}"))
}

macro_rules! impl_step_fn {
    ($($idx:tt $arg:ident: $ty:ident),*) => {
        impl<Func, $($ty,)*> StepFn<($($ty,)*)> for Func
        where
            Func: Fn($($ty),*) -> anyhow::Result<()> + Send + Sync + 'static,
            $($ty: FromStepArg,)*
        {
            fn parameter_types() -> Vec<&'static str> {
                vec![$(std::any::type_name::<$ty>()),*]
            }

            fn invoke(&self, args: &[String]) -> anyhow::Result<()> {
                let expected = <Self as StepFn<($($ty,)*)>>::parameter_types().len();
                ensure!(
                    args.len() == expected,
                    "step expects {expected} argument(s) but received {}",
                    args.len()
                );
                $(let $arg = $ty::from_step_arg(arg_at(args, $idx)?)?;)*
                (self)($($arg),*)
            }
        }
    };
}

impl_step_fn!();
impl_step_fn!(0 a: A);
impl_step_fn!(0 a: A, 1 b: B);
impl_step_fn!(0 a: A, 1 b: B, 2 c: C);
impl_step_fn!(0 a: A, 1 b: B, 2 c: C, 3 d: D);
impl_step_fn!(0 a: A, 1 b: B, 2 c: C, 3 d: D, 4 e: E);
impl_step_fn!(0 a: A, 1 b: B, 2 c: C, 3 d: D, 4 e: E, 5 f: F);

/// Ordering and tag filter for a hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOptions {
    order: i32,
    tag_expression: Option<String>,
}

impl HookOptions {
    /// Default order, no tag filter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            order: DEFAULT_HOOK_ORDER,
            tag_expression: None,
        }
    }

    /// Set the execution order; lower values run first.
    #[must_use]
    pub const fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Restrict the hook to scenarios matching `tag_expression`.
    #[must_use]
    pub fn with_tags(mut self, tag_expression: impl Into<String>) -> Self {
        self.tag_expression = Some(tag_expression.into());
        self
    }
}

impl Default for HookOptions {
    fn default() -> Self {
        Self::new()
    }
}

fn location_of(caller: &Location<'_>) -> String {
    format!("{}:{}", caller.file(), caller.line())
}

fn register_step<Args, F>(
    expression: &str,
    body: F,
    caller: &Location<'_>,
) -> Result<(), GlueError>
where
    Args: 'static,
    F: StepFn<Args>,
{
    let registrar = context::current()?;
    let source = expression.to_owned();
    let location = location_of(caller);
    let factory: StepDefinitionFactory = Box::new(move |types: &TypeRegistry| {
        let compiled = StepExpression::compile(&source, types)?;
        let step_body: StepBody =
            Arc::new(move |args: &[String]| <F as StepFn<Args>>::invoke(&body, args));
        StepDefinition::new(
            compiled,
            <F as StepFn<Args>>::parameter_types(),
            step_body,
            location,
        )
    });
    registrar.add_step_definition(factory)
}

fn register_hook<F>(
    phase: HookPhase,
    options: HookOptions,
    body: F,
    caller: &Location<'_>,
) -> Result<(), GlueError>
where
    F: Fn(&Scenario) -> anyhow::Result<()> + Send + Sync + 'static,
{
    let registrar = context::current()?;
    let hook_body: HookBody = Arc::new(body);
    let hook = HookDefinition::new(phase, hook_body, location_of(caller))
        .with_order(options.order)
        .with_tag_expression(options.tag_expression);
    registrar.add_hook(hook)
}

macro_rules! step_keywords {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            ///
            /// # Errors
            ///
            /// Returns [`GlueError::InactiveContext`] outside world building,
            /// or the compile and registration errors of the expression.
            #[track_caller]
            pub fn $name<Args, F>(expression: &str, body: F) -> Result<(), GlueError>
            where
                Args: 'static,
                F: StepFn<Args>,
            {
                register_step(expression, body, Location::caller())
            }
        )*
    };
}

step_keywords!(
    /// Register a `Given` step.
    given,
    /// Register a `When` step.
    when,
    /// Register a `Then` step.
    then,
    /// Register an `And` step.
    and,
    /// Register a `But` step.
    but,
    /// Register a keyword-agnostic step.
    step,
);

macro_rules! hook_keywords {
    ($($(#[$meta:meta])* $name:ident, $with:ident => $phase:expr;)*) => {
        $(
            $(#[$meta])*
            ///
            /// # Errors
            ///
            /// Returns [`GlueError::InactiveContext`] outside world building.
            #[track_caller]
            pub fn $name<F>(body: F) -> Result<(), GlueError>
            where
                F: Fn(&Scenario) -> anyhow::Result<()> + Send + Sync + 'static,
            {
                register_hook($phase, HookOptions::new(), body, Location::caller())
            }

            $(#[$meta])*
            /// Ordering and tags come from `options`.
            ///
            /// # Errors
            ///
            /// Returns [`GlueError::InactiveContext`] outside world building.
            #[track_caller]
            pub fn $with<F>(options: HookOptions, body: F) -> Result<(), GlueError>
            where
                F: Fn(&Scenario) -> anyhow::Result<()> + Send + Sync + 'static,
            {
                register_hook($phase, options, body, Location::caller())
            }
        )*
    };
}

hook_keywords! {
    /// Register a hook run before each scenario.
    before, before_with => HookPhase::BeforeScenario;
    /// Register a hook run after each scenario.
    after, after_with => HookPhase::AfterScenario;
    /// Register a hook run before each step.
    before_step, before_step_with => HookPhase::BeforeStep;
    /// Register a hook run after each step.
    after_step, after_step_with => HookPhase::AfterStep;
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use rstest::rstest;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[rstest]
    fn closures_convert_their_arguments() -> Result<()> {
        let body = |count: i32, name: String| -> anyhow::Result<()> {
            ensure!(count == 3 && name == "cukes", "got {count} {name}");
            Ok(())
        };
        StepFn::<(i32, String)>::invoke(&body, &strings(&["3", "cukes"]))?;
        Ok(())
    }

    #[rstest]
    fn parameter_types_follow_the_signature() {
        fn body(_: u8, _: f64) -> anyhow::Result<()> {
            Ok(())
        }
        assert_eq!(
            <fn(u8, f64) -> anyhow::Result<()> as StepFn<(u8, f64)>>::parameter_types(),
            vec!["u8", "f64"]
        );
        assert!(StepFn::<(u8, f64)>::invoke(&body, &strings(&["1", "2.5"])).is_ok());
    }

    #[rstest]
    fn conversion_failures_are_reported() {
        let body = |_: i32| -> anyhow::Result<()> { Ok(()) };
        let err = StepFn::<(i32,)>::invoke(&body, &strings(&["many"]));
        assert!(err.is_err_and(|e| e.to_string().contains("cannot convert 'many' to i32")));
    }

    #[rstest]
    fn data_tables_parse_pipe_rows() -> Result<()> {
        let table = DataTable::from_step_arg("\n  | a | b |\n\n  | 1 |  2 |\n")?;
        ensure!(table.rows().len() == 2);
        ensure!(table.cell(1, 1) == Some("2"));
        ensure!(DataTable::from_step_arg("| open").is_err());
        Ok(())
    }

    #[rstest]
    fn argument_count_is_checked() {
        let body = || -> anyhow::Result<()> { Ok(()) };
        assert!(StepFn::<()>::invoke(&body, &strings(&["extra"])).is_err());
    }

    #[rstest]
    fn registration_outside_a_world_fails() {
        let outcome = given("I have {int} cukes", |_: i32| -> anyhow::Result<()> { Ok(()) });
        assert!(matches!(outcome, Err(GlueError::InactiveContext)));
        let hook = before(|_| Ok(()));
        assert!(matches!(hook, Err(GlueError::InactiveContext)));
    }

    #[rstest]
    fn hook_options_default_to_the_standard_order() {
        let options = HookOptions::default();
        assert_eq!(options.order, DEFAULT_HOOK_ORDER);
        assert!(options.tag_expression.is_none());
        let tagged = HookOptions::new().with_order(2).with_tags("@db");
        assert_eq!(tagged.order, 2);
        assert_eq!(tagged.tag_expression.as_deref(), Some("@db"));
    }
}
