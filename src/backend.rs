//! Scope lifecycle: load glue, build a world, dispose it.
//!
//! [`ClosureBackend`] ties discovery, the object factory, and the
//! thread-bound registration context together. Building a world
//! instantiates every discovered unit while a registrar over the host glue is
//! bound to the calling thread, so the DSL calls in unit constructors land in
//! that glue.

use crate::config::BackendConfig;
use crate::context;
use crate::discovery::{GluePath, InventoryFinder, UnitFinder, discover};
use crate::error::GlueError;
use crate::expression::{ParameterType, TypeRegistry};
use crate::factory::{ObjectFactory, ScopedObjectFactory};
use crate::glue::{
    GlueRegistrar, HookDefinition, HookPhase, SharedGlue, StepDefinitionFactory, lock_glue,
};
use crate::snippet::{ClosureSnippet, FunctionNameGenerator, PickleStep, Snippet, SnippetGenerator};
use crate::unit::UnitDescriptor;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Lifecycle contract a test runner drives once per scenario.
pub trait Backend {
    /// Discover glue units under `roots` and remember `glue` as the target
    /// for registrations.
    ///
    /// Repeated calls add to the known units; none are ever forgotten. While
    /// a world is built the new units and glue target apply from the next
    /// world.
    fn load_glue(&mut self, glue: SharedGlue, roots: &[GluePath]);

    /// Instantiate every known unit for a new world.
    ///
    /// # Errors
    ///
    /// Returns [`GlueError::WorldAlreadyBuilt`] when the previous world was
    /// not disposed, or the first error raised while constructing a unit or
    /// registering its glue. A failed build stops the factory and drops the
    /// glue registered so far, so it can be retried directly.
    fn build_world(&mut self) -> Result<(), GlueError>;

    /// Release the current world's instances and scenario-scoped glue.
    fn dispose_world(&mut self);

    /// Snippets suggesting a definition for an unmatched `step`.
    fn snippets<'a>(
        &'a self,
        step: &PickleStep,
        keyword: &str,
        name_generator: &FunctionNameGenerator,
    ) -> Box<dyn Iterator<Item = String> + 'a>;
}

/// Where a backend is in the scope lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendPhase {
    /// No glue loaded yet.
    Idle,
    /// Glue loaded; no world built.
    Loaded,
    /// A world is built and its glue sealed.
    WorldBuilt,
}

/// Registrar bound to the thread while a world is being built.
struct BackendRegistrar {
    glue: SharedGlue,
    types: Arc<TypeRegistry>,
}

impl GlueRegistrar for BackendRegistrar {
    fn add_step_definition(&self, factory: StepDefinitionFactory) -> Result<(), GlueError> {
        let step = factory(&self.types)?;
        debug!(expression = step.expression().source(), "registering step definition");
        lock_glue(&self.glue).add_step_definition(step)
    }

    fn add_hook(&self, hook: HookDefinition) -> Result<(), GlueError> {
        debug!(phase = %hook.phase(), order = hook.order(), "registering hook");
        let mut glue = lock_glue(&self.glue);
        match hook.phase() {
            HookPhase::BeforeScenario => glue.add_before_hook(hook),
            HookPhase::AfterScenario => glue.add_after_hook(hook),
            HookPhase::BeforeStep => glue.add_before_step_hook(hook),
            HookPhase::AfterStep => glue.add_after_step_hook(hook),
        }
    }
}

/// Backend registering glue from closures declared in unit constructors.
pub struct ClosureBackend<F = ScopedObjectFactory, D = InventoryFinder> {
    factory: F,
    finder: D,
    units: Vec<&'static UnitDescriptor>,
    glue: Option<SharedGlue>,
    // Glue target handed over while a world is built; adopted on dispose.
    pending_glue: Option<SharedGlue>,
    types: Arc<TypeRegistry>,
    snippets: SnippetGenerator,
    names: FunctionNameGenerator,
    phase: BackendPhase,
}

impl ClosureBackend {
    /// Backend over link-time registered units with the default factory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(ScopedObjectFactory::new(), InventoryFinder)
    }

    /// Backend using the snippet naming style from `config`.
    ///
    /// Glue paths are not loaded here; pass `config.glue_paths()` to
    /// [`Backend::load_glue`] together with the host glue.
    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        let mut backend = Self::new();
        backend.names = FunctionNameGenerator::new(config.snippet_type());
        backend
    }
}

impl Default for ClosureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ObjectFactory, D: UnitFinder> ClosureBackend<F, D> {
    /// Backend over a custom factory and finder.
    #[must_use]
    pub fn with_parts(factory: F, finder: D) -> Self {
        let types = Arc::new(TypeRegistry::default());
        Self {
            factory,
            finder,
            units: Vec::new(),
            glue: None,
            pending_glue: None,
            snippets: SnippetGenerator::new(ClosureSnippet, Arc::clone(&types)),
            types,
            names: FunctionNameGenerator::default(),
            phase: BackendPhase::Idle,
        }
    }

    /// Render snippets with `snippet` instead of the closure style.
    #[must_use]
    pub fn with_snippet(mut self, snippet: impl Snippet + 'static) -> Self {
        self.snippets = SnippetGenerator::new(snippet, Arc::clone(&self.types));
        self
    }

    /// Add a custom parameter type for expressions and snippets.
    ///
    /// Expressions compiled in later worlds see the new type.
    ///
    /// # Errors
    ///
    /// Returns [`GlueError::DuplicateParameterType`] when the name is taken.
    pub fn define_parameter_type(&mut self, parameter_type: ParameterType) -> Result<(), GlueError> {
        Arc::make_mut(&mut self.types).define_parameter_type(parameter_type)?;
        self.snippets.set_registry(Arc::clone(&self.types));
        Ok(())
    }

    /// Parameter types in use.
    #[must_use]
    pub fn type_registry(&self) -> &TypeRegistry {
        &self.types
    }

    /// Function name generator for this backend's snippets.
    #[must_use]
    pub const fn name_generator(&self) -> &FunctionNameGenerator {
        &self.names
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> BackendPhase {
        self.phase
    }

    /// Units known to the backend, in discovery order.
    #[must_use]
    pub fn units(&self) -> &[&'static UnitDescriptor] {
        &self.units
    }

    /// The object factory.
    #[must_use]
    pub const fn factory(&self) -> &F {
        &self.factory
    }

    /// The object factory, mutably.
    pub const fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    fn instantiate_units(&mut self, glue: &SharedGlue) -> Result<(), GlueError> {
        let registrar: Arc<dyn GlueRegistrar> = Arc::new(BackendRegistrar {
            glue: Arc::clone(glue),
            types: Arc::clone(&self.types),
        });
        let _guard = context::activate(registrar)?;
        for unit in &self.units {
            self.factory.get_instance(unit.type_id())?;
        }
        Ok(())
    }
}

impl<F: ObjectFactory, D: UnitFinder> Backend for ClosureBackend<F, D> {
    fn load_glue(&mut self, glue: SharedGlue, roots: &[GluePath]) {
        let mut added = 0_usize;
        for unit in discover(&self.finder, roots) {
            if self.factory.add_class(unit) {
                self.units.push(unit);
                added += 1;
            }
        }
        info!(
            roots = roots.len(),
            added,
            total = self.units.len(),
            "loaded glue"
        );
        if self.phase == BackendPhase::WorldBuilt {
            self.pending_glue = Some(glue);
        } else {
            self.glue = Some(glue);
        }
        if self.phase == BackendPhase::Idle {
            self.phase = BackendPhase::Loaded;
        }
    }

    fn build_world(&mut self) -> Result<(), GlueError> {
        if self.phase == BackendPhase::WorldBuilt {
            return Err(GlueError::WorldAlreadyBuilt);
        }
        let span = tracing::debug_span!("build_world", units = self.units.len());
        let _entered = span.enter();
        self.factory.start();
        if let Some(glue) = self.glue.clone() {
            if let Err(err) = self.instantiate_units(&glue) {
                self.factory.stop();
                lock_glue(&glue).remove_scenario_scoped();
                return Err(err);
            }
            lock_glue(&glue).seal();
        }
        self.phase = BackendPhase::WorldBuilt;
        debug!("world built");
        Ok(())
    }

    fn dispose_world(&mut self) {
        self.factory.stop();
        if let Some(glue) = &self.glue {
            lock_glue(glue).remove_scenario_scoped();
        }
        if let Some(next) = self.pending_glue.take() {
            self.glue = Some(next);
        }
        self.phase = if self.glue.is_some() {
            BackendPhase::Loaded
        } else {
            BackendPhase::Idle
        };
        debug!("world disposed");
    }

    fn snippets<'a>(
        &'a self,
        step: &PickleStep,
        keyword: &str,
        name_generator: &FunctionNameGenerator,
    ) -> Box<dyn Iterator<Item = String> + 'a> {
        Box::new(self.snippets.snippets(step, keyword, name_generator))
    }
}

impl<F: fmt::Debug, D> fmt::Debug for ClosureBackend<F, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.units.iter().map(|unit| unit.type_name()).collect();
        f.debug_struct("ClosureBackend")
            .field("factory", &self.factory)
            .field("units", &names)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
