//! Glue units: user types whose constructors register steps and hooks.
//!
//! A unit is described to discovery by a `'static` [`UnitDescriptor`]. The
//! [`glue_unit!`](crate::glue_unit) macro submits one to the process-wide
//! registry, tagged with the module path of the call site, so discovery can
//! filter units by namespace without runtime type introspection.
//!
//! # Examples
//!
//! ```
//! use stepglue::{GlueUnit, dsl};
//!
//! struct CucumberSteps;
//!
//! impl GlueUnit for CucumberSteps {
//!     fn construct() -> anyhow::Result<Self> {
//!         dsl::given("I have {int} cukes", |count: i32| -> anyhow::Result<()> {
//!             anyhow::ensure!(count >= 0, "negative cukes");
//!             Ok(())
//!         })?;
//!         Ok(Self)
//!     }
//! }
//!
//! stepglue::glue_unit!(CucumberSteps);
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;

/// A type whose construction registers glue through the active context.
///
/// Constructors run once per world while a registration context is bound to
/// the building thread; calls into [`crate::dsl`] made from `construct` land
/// in the host's glue.
pub trait GlueUnit: Any + Send + Sized {
    /// Build the unit, registering its steps and hooks as a side effect.
    ///
    /// # Errors
    ///
    /// Any error aborts the world being built and is reported to the host.
    fn construct() -> anyhow::Result<Self>;
}

/// Type-erased constructor stored in a descriptor.
pub type UnitConstructor = fn() -> anyhow::Result<Box<dyn Any + Send>>;

/// Whether a descriptor can be instantiated.
#[derive(Clone, Copy)]
pub enum UnitKind {
    /// A concrete unit with its constructor.
    Concrete(UnitConstructor),
    /// A marker for an interface-only type; discovery skips it.
    Interface,
}

/// Static description of a glue unit type.
pub struct UnitDescriptor {
    namespace: &'static str,
    type_name: fn() -> &'static str,
    type_id: fn() -> TypeId,
    kind: UnitKind,
}

impl UnitDescriptor {
    /// Describe the concrete unit `T` living in `namespace`.
    ///
    /// `namespace` is a `::`-separated module path such as
    /// `my_crate::steps`.
    #[must_use]
    pub const fn concrete<T: GlueUnit>(namespace: &'static str) -> Self {
        Self {
            namespace,
            type_name: type_name::<T>,
            type_id: TypeId::of::<T>,
            kind: UnitKind::Concrete(construct_boxed::<T>),
        }
    }

    /// Describe an interface-only type that shares the unit capability but
    /// has no constructor of its own.
    #[must_use]
    pub const fn interface<T: ?Sized + 'static>(namespace: &'static str) -> Self {
        Self {
            namespace,
            type_name: type_name::<T>,
            type_id: TypeId::of::<T>,
            kind: UnitKind::Interface,
        }
    }

    /// Module path the unit was declared in.
    #[must_use]
    pub const fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Fully qualified type name of the unit.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Identity of the unit type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Returns `true` for interface-only descriptors.
    #[must_use]
    pub const fn is_interface(&self) -> bool {
        matches!(self.kind, UnitKind::Interface)
    }

    /// Constructor for concrete units.
    #[must_use]
    pub const fn constructor(&self) -> Option<UnitConstructor> {
        match self.kind {
            UnitKind::Concrete(ctor) => Some(ctor),
            UnitKind::Interface => None,
        }
    }
}

impl fmt::Debug for UnitDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitDescriptor")
            .field("namespace", &self.namespace)
            .field("type_name", &self.type_name())
            .field("interface", &self.is_interface())
            .finish()
    }
}

fn construct_boxed<T: GlueUnit>() -> anyhow::Result<Box<dyn Any + Send>> {
    let unit = T::construct()?;
    Ok(Box::new(unit))
}

inventory::collect!(UnitDescriptor);

/// Register a [`GlueUnit`] with the process-wide unit registry.
///
/// The unit's namespace is the module path of the invocation site.
#[macro_export]
macro_rules! glue_unit {
    ($unit:ty) => {
        $crate::inventory::submit! {
            $crate::UnitDescriptor::concrete::<$unit>(::core::module_path!())
        }
    };
}
