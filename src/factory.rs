//! Per-world instantiation of glue units.
//!
//! The factory holds an arena of unit instances keyed by [`TypeId`]. An
//! instance is built on first request within a world and reused for the rest
//! of it; `start` and `stop` clear the arena so nothing survives into the
//! next world.

use crate::error::GlueError;
use crate::unit::UnitDescriptor;
use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

/// Creates and owns glue unit instances for the current world.
pub trait ObjectFactory {
    /// Begin a world, discarding any cached instances.
    fn start(&mut self);

    /// End the world, releasing every cached instance.
    fn stop(&mut self);

    /// Make `unit` instantiable. Returns `false` when it was already known.
    fn add_class(&mut self, unit: &'static UnitDescriptor) -> bool;

    /// Instance of `type_id` for the current world, built on first request.
    ///
    /// # Errors
    ///
    /// Fails when the factory is not started, the type was never added, or
    /// the unit constructor fails.
    fn get_instance(&mut self, type_id: TypeId) -> Result<&(dyn Any + Send), GlueError>;
}

/// Typed access on top of [`ObjectFactory`].
pub trait ObjectFactoryExt: ObjectFactory {
    /// Instance of `T` for the current world.
    ///
    /// # Errors
    ///
    /// See [`ObjectFactory::get_instance`].
    fn instance<T: Any>(&mut self) -> Result<&T, GlueError> {
        let type_id = TypeId::of::<T>();
        self.get_instance(type_id)?
            .downcast_ref::<T>()
            .ok_or(GlueError::UnknownUnit { type_id })
    }
}

impl<F: ObjectFactory + ?Sized> ObjectFactoryExt for F {}

/// Default factory: one instance per unit type per world.
#[derive(Default)]
pub struct ScopedObjectFactory {
    classes: IndexMap<TypeId, &'static UnitDescriptor>,
    instances: HashMap<TypeId, Box<dyn Any + Send>>,
    started: bool,
}

impl ScopedObjectFactory {
    /// Create a stopped factory with no known units.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` between `start` and `stop`.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Number of instances built in the current world.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Number of units that can be instantiated.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

impl fmt::Debug for ScopedObjectFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.classes.values().map(|unit| unit.type_name()).collect();
        f.debug_struct("ScopedObjectFactory")
            .field("classes", &names)
            .field("instances", &self.instances.len())
            .field("started", &self.started)
            .finish()
    }
}

impl ObjectFactory for ScopedObjectFactory {
    fn start(&mut self) {
        self.instances.clear();
        self.started = true;
        tracing::debug!("object factory started");
    }

    fn stop(&mut self) {
        let released = self.instances.len();
        self.instances.clear();
        self.started = false;
        tracing::debug!(released, "object factory stopped");
    }

    fn add_class(&mut self, unit: &'static UnitDescriptor) -> bool {
        match self.classes.entry(unit.type_id()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(unit);
                true
            }
        }
    }

    fn get_instance(&mut self, type_id: TypeId) -> Result<&(dyn Any + Send), GlueError> {
        if !self.started {
            return Err(GlueError::FactoryNotStarted);
        }
        let unit = *self
            .classes
            .get(&type_id)
            .ok_or(GlueError::UnknownUnit { type_id })?;
        let instance = match self.instances.entry(type_id) {
            Entry::Occupied(cached) => cached.into_mut(),
            Entry::Vacant(slot) => {
                let ctor = unit.constructor().ok_or(GlueError::NotInstantiable {
                    unit: unit.type_name(),
                })?;
                tracing::debug!(unit = unit.type_name(), "constructing glue unit");
                let built = ctor().map_err(|err| {
                    tracing::error!(unit = unit.type_name(), error = %err, "glue unit constructor failed");
                    GlueError::construction(unit.type_name(), err)
                })?;
                slot.insert(built)
            }
        };
        Ok(&**instance)
    }
}
