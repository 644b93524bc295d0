//! Step definitions, hooks, and the registry they are collected into.
//!
//! [`Glue`] is the host-owned sink; [`GlueCollection`] is the in-memory
//! implementation shipped with the crate. Glue units never see either
//! directly: they call the DSL, which reaches a [`GlueRegistrar`] through the
//! thread-bound context, and the registrar forwards into the glue.

use crate::dsl::DataTable;
use crate::error::GlueError;
use crate::expression::{StepExpression, TypeRegistry};
use indexmap::IndexMap;
use std::any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Order given to hooks registered without an explicit one.
pub const DEFAULT_HOOK_ORDER: i32 = 10_000;

/// Callable body of a step definition, receiving the captured arguments.
pub type StepBody = Arc<dyn Fn(&[String]) -> anyhow::Result<()> + Send + Sync>;

/// Callable body of a hook.
pub type HookBody = Arc<dyn Fn(&Scenario) -> anyhow::Result<()> + Send + Sync>;

/// Deferred construction of a step definition against a type registry.
pub type StepDefinitionFactory =
    Box<dyn FnOnce(&TypeRegistry) -> Result<StepDefinition, GlueError>>;

/// Host-owned glue shared with the backend.
pub type SharedGlue = Arc<Mutex<dyn Glue + Send>>;

/// Snapshot of the scenario a hook runs for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scenario {
    name: String,
    tags: Vec<String>,
}

impl Scenario {
    /// Describe a scenario by name and tags.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Scenario name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scenario tags, including the leading `@`.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// A step expression bound to a body.
#[derive(Clone)]
pub struct StepDefinition {
    expression: StepExpression,
    parameter_types: Vec<&'static str>,
    body: StepBody,
    location: String,
    scenario_scoped: bool,
}

impl StepDefinition {
    /// Bind `expression` to `body`.
    ///
    /// `parameter_types` are the Rust types the body accepts, one per
    /// placeholder plus an optional trailing doc string or data table.
    ///
    /// # Errors
    ///
    /// Returns [`GlueError::ArityMismatch`] when the body accepts neither the
    /// number of arguments the expression captures nor one more of type
    /// `String` or [`DataTable`].
    pub fn new(
        expression: StepExpression,
        parameter_types: Vec<&'static str>,
        body: StepBody,
        location: impl Into<String>,
    ) -> Result<Self, GlueError> {
        let captured = expression.arity();
        let trailing_ok = parameter_types.len() == captured + 1
            && parameter_types
                .last()
                .is_some_and(|last| is_step_argument_type(last));
        if parameter_types.len() != captured && !trailing_ok {
            return Err(GlueError::ArityMismatch {
                expression: expression.source().to_owned(),
                expected: expression.arity(),
                actual: parameter_types.len(),
            });
        }
        Ok(Self {
            expression,
            parameter_types,
            body,
            location: location.into(),
            scenario_scoped: true,
        })
    }

    /// Mark whether the definition is dropped when the world is disposed.
    #[must_use]
    pub const fn with_scenario_scoped(mut self, scoped: bool) -> Self {
        self.scenario_scoped = scoped;
        self
    }

    /// Compiled expression.
    #[must_use]
    pub const fn expression(&self) -> &StepExpression {
        &self.expression
    }

    /// Rust types of the body's parameters.
    #[must_use]
    pub fn parameter_types(&self) -> &[&'static str] {
        &self.parameter_types
    }

    /// Source location of the registration call.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Whether the definition lives only for one world.
    #[must_use]
    pub const fn is_scenario_scoped(&self) -> bool {
        self.scenario_scoped
    }

    /// Run the body with arguments already captured by the host matcher.
    ///
    /// A doc string or data table, when the step has one, is passed as the
    /// last argument in its raw text form.
    ///
    /// # Errors
    ///
    /// Propagates argument conversion failures and errors from the body.
    pub fn execute(&self, args: &[String]) -> anyhow::Result<()> {
        (self.body)(args)
    }
}

/// Types that may receive a step's doc string or data table.
fn is_step_argument_type(type_name: &str) -> bool {
    type_name == any::type_name::<String>() || type_name == any::type_name::<DataTable>()
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("expression", &self.expression.source())
            .field("parameter_types", &self.parameter_types)
            .field("location", &self.location)
            .field("scenario_scoped", &self.scenario_scoped)
            .finish_non_exhaustive()
    }
}

/// Lifecycle phase a hook is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// Runs before each scenario.
    BeforeScenario,
    /// Runs after each scenario.
    AfterScenario,
    /// Runs before each step.
    BeforeStep,
    /// Runs after each step.
    AfterStep,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BeforeScenario => "before",
            Self::AfterScenario => "after",
            Self::BeforeStep => "before-step",
            Self::AfterStep => "after-step",
        };
        f.write_str(label)
    }
}

/// A hook body bound to a phase with an execution order.
#[derive(Clone)]
pub struct HookDefinition {
    phase: HookPhase,
    order: i32,
    tag_expression: Option<String>,
    body: HookBody,
    location: String,
    scenario_scoped: bool,
}

impl HookDefinition {
    /// Create a hook with the default order and no tag filter.
    #[must_use]
    pub fn new(phase: HookPhase, body: HookBody, location: impl Into<String>) -> Self {
        Self {
            phase,
            order: DEFAULT_HOOK_ORDER,
            tag_expression: None,
            body,
            location: location.into(),
            scenario_scoped: true,
        }
    }

    /// Set the execution order; lower values run first.
    #[must_use]
    pub const fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Restrict the hook to scenarios matching `tag_expression`.
    ///
    /// Evaluating the expression is left to the host.
    #[must_use]
    pub fn with_tag_expression(mut self, tag_expression: Option<String>) -> Self {
        self.tag_expression = tag_expression;
        self
    }

    /// Mark whether the hook is dropped when the world is disposed.
    #[must_use]
    pub const fn with_scenario_scoped(mut self, scoped: bool) -> Self {
        self.scenario_scoped = scoped;
        self
    }

    /// Phase the hook is bound to.
    #[must_use]
    pub const fn phase(&self) -> HookPhase {
        self.phase
    }

    /// Execution order.
    #[must_use]
    pub const fn order(&self) -> i32 {
        self.order
    }

    /// Tag expression restricting the hook, if any.
    #[must_use]
    pub fn tag_expression(&self) -> Option<&str> {
        self.tag_expression.as_deref()
    }

    /// Source location of the registration call.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Whether the hook lives only for one world.
    #[must_use]
    pub const fn is_scenario_scoped(&self) -> bool {
        self.scenario_scoped
    }

    /// Run the hook body for `scenario`.
    ///
    /// # Errors
    ///
    /// Propagates errors from the body.
    pub fn run(&self, scenario: &Scenario) -> anyhow::Result<()> {
        (self.body)(scenario)
    }
}

impl fmt::Debug for HookDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDefinition")
            .field("phase", &self.phase)
            .field("order", &self.order)
            .field("tag_expression", &self.tag_expression)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Sink for registered glue, owned by the host.
pub trait Glue {
    /// Add a step definition.
    ///
    /// # Errors
    ///
    /// Implementations may reject duplicates or late additions.
    fn add_step_definition(&mut self, step: StepDefinition) -> Result<(), GlueError>;

    /// Add a hook run before each scenario.
    ///
    /// # Errors
    ///
    /// Implementations may reject late additions.
    fn add_before_hook(&mut self, hook: HookDefinition) -> Result<(), GlueError>;

    /// Add a hook run after each scenario.
    ///
    /// # Errors
    ///
    /// Implementations may reject late additions.
    fn add_after_hook(&mut self, hook: HookDefinition) -> Result<(), GlueError>;

    /// Add a hook run before each step.
    ///
    /// # Errors
    ///
    /// Implementations may reject late additions.
    fn add_before_step_hook(&mut self, hook: HookDefinition) -> Result<(), GlueError>;

    /// Add a hook run after each step.
    ///
    /// # Errors
    ///
    /// Implementations may reject late additions.
    fn add_after_step_hook(&mut self, hook: HookDefinition) -> Result<(), GlueError>;

    /// Close the registration window for the current world.
    fn seal(&mut self) {}

    /// Drop glue registered for the world being disposed and reopen
    /// registration.
    fn remove_scenario_scoped(&mut self) {}
}

/// Receiver for registrations made through the thread-bound context.
pub trait GlueRegistrar {
    /// Compile a step definition and add it to the glue.
    ///
    /// # Errors
    ///
    /// Propagates compile errors from `factory` and rejections from the glue.
    fn add_step_definition(&self, factory: StepDefinitionFactory) -> Result<(), GlueError>;

    /// Add `hook` to the glue under its phase.
    ///
    /// # Errors
    ///
    /// Propagates rejections from the glue.
    fn add_hook(&self, hook: HookDefinition) -> Result<(), GlueError>;
}

/// Lock shared glue, recovering the guard if a previous holder panicked.
pub(crate) fn lock_glue(glue: &SharedGlue) -> MutexGuard<'_, dyn Glue + Send + 'static> {
    match glue.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// In-memory glue: step definitions keyed by expression and hooks per phase.
#[derive(Debug, Default)]
pub struct GlueCollection {
    steps: IndexMap<String, StepDefinition>,
    before: Vec<HookDefinition>,
    after: Vec<HookDefinition>,
    before_step: Vec<HookDefinition>,
    after_step: Vec<HookDefinition>,
    sealed: bool,
}

impl GlueCollection {
    /// Create an empty, open collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh collection for sharing with a backend.
    #[must_use]
    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Registered step definitions in registration order.
    pub fn step_definitions(&self) -> impl Iterator<Item = &StepDefinition> {
        self.steps.values()
    }

    /// Step definition registered for `expression`, if any.
    #[must_use]
    pub fn step_definition(&self, expression: &str) -> Option<&StepDefinition> {
        self.steps.get(expression)
    }

    /// Hooks for `phase`, lowest order first; ties keep registration order.
    #[must_use]
    pub fn hooks(&self, phase: HookPhase) -> Vec<&HookDefinition> {
        let mut hooks: Vec<&HookDefinition> = self.phase_hooks(phase).iter().collect();
        hooks.sort_by_key(|hook| hook.order());
        hooks
    }

    /// Returns `true` when the registration window is closed.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Returns `true` when no steps or hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
            && self.before.is_empty()
            && self.after.is_empty()
            && self.before_step.is_empty()
            && self.after_step.is_empty()
    }

    const fn phase_hooks(&self, phase: HookPhase) -> &Vec<HookDefinition> {
        match phase {
            HookPhase::BeforeScenario => &self.before,
            HookPhase::AfterScenario => &self.after,
            HookPhase::BeforeStep => &self.before_step,
            HookPhase::AfterStep => &self.after_step,
        }
    }

    fn push_hook(&mut self, phase: HookPhase, hook: HookDefinition) -> Result<(), GlueError> {
        self.ensure_open()?;
        let hooks = match phase {
            HookPhase::BeforeScenario => &mut self.before,
            HookPhase::AfterScenario => &mut self.after,
            HookPhase::BeforeStep => &mut self.before_step,
            HookPhase::AfterStep => &mut self.after_step,
        };
        hooks.push(hook);
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), GlueError> {
        if self.sealed {
            Err(GlueError::GlueSealed)
        } else {
            Ok(())
        }
    }
}

impl Glue for GlueCollection {
    fn add_step_definition(&mut self, step: StepDefinition) -> Result<(), GlueError> {
        self.ensure_open()?;
        let key = step.expression().source().to_owned();
        if let Some(existing) = self.steps.get(&key) {
            return Err(GlueError::DuplicateStepDefinition {
                expression: key,
                first: existing.location().to_owned(),
                second: step.location().to_owned(),
            });
        }
        self.steps.insert(key, step);
        Ok(())
    }

    fn add_before_hook(&mut self, hook: HookDefinition) -> Result<(), GlueError> {
        self.push_hook(HookPhase::BeforeScenario, hook)
    }

    fn add_after_hook(&mut self, hook: HookDefinition) -> Result<(), GlueError> {
        self.push_hook(HookPhase::AfterScenario, hook)
    }

    fn add_before_step_hook(&mut self, hook: HookDefinition) -> Result<(), GlueError> {
        self.push_hook(HookPhase::BeforeStep, hook)
    }

    fn add_after_step_hook(&mut self, hook: HookDefinition) -> Result<(), GlueError> {
        self.push_hook(HookPhase::AfterStep, hook)
    }

    fn seal(&mut self) {
        self.sealed = true;
    }

    fn remove_scenario_scoped(&mut self) {
        self.steps.retain(|_, step| !step.is_scenario_scoped());
        for hooks in [
            &mut self.before,
            &mut self.after,
            &mut self.before_step,
            &mut self.after_step,
        ] {
            hooks.retain(|hook| !hook.is_scenario_scoped());
        }
        self.sealed = false;
    }
}
