//! Discovery of glue units under namespace roots.
//!
//! Roots are normalised into [`GluePath`]s and matched against the module
//! path each [`UnitDescriptor`] was declared in. Interface-only descriptors
//! are never returned, and a type listed under several roots is returned once.

use crate::unit::UnitDescriptor;
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;

/// Prefix accepted on glue paths, mirroring classpath-style locations.
const GLUE_SCHEME: &str = "glue:";

/// A normalised namespace root such as `my_crate::steps`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GluePath(String);

impl GluePath {
    /// Normalise `raw` into a `::`-separated module path.
    ///
    /// `my_crate/steps`, `glue:my_crate.steps` and `my_crate::steps` all
    /// produce the same root. An empty path matches every unit.
    ///
    /// # Examples
    ///
    /// ```
    /// use stepglue::GluePath;
    ///
    /// let path = GluePath::new("glue:my_crate/steps/");
    /// assert_eq!(path.as_str(), "my_crate::steps");
    /// ```
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        let without_scheme = trimmed.strip_prefix(GLUE_SCHEME).unwrap_or(trimmed);
        let segments: Vec<&str> = without_scheme
            .split(|c: char| c == '/' || c == '.' || c == ':')
            .filter(|segment| !segment.is_empty())
            .collect();
        Self(segments.join("::"))
    }

    /// The normalised path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when `namespace` lies under this root.
    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        if self.0.is_empty() {
            return true;
        }
        namespace
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    }
}

impl fmt::Display for GluePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GluePath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for GluePath {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

/// Source of unit descriptors for a namespace root.
pub trait UnitFinder {
    /// Return every descriptor, concrete or not, declared under `root`.
    fn descendants(&self, root: &GluePath) -> Vec<&'static UnitDescriptor>;
}

/// Finder over units submitted with [`glue_unit!`](crate::glue_unit).
#[derive(Debug, Default, Clone, Copy)]
pub struct InventoryFinder;

impl UnitFinder for InventoryFinder {
    fn descendants(&self, root: &GluePath) -> Vec<&'static UnitDescriptor> {
        inventory::iter::<UnitDescriptor>
            .into_iter()
            .filter(|unit| root.contains(unit.namespace()))
            .collect()
    }
}

/// Finder over an explicit list of descriptors.
///
/// Hosts that prefer a startup manifest over link-time registration, and
/// tests that need a fixed set of units, build one of these.
#[derive(Debug, Default, Clone)]
pub struct UnitCatalog {
    units: Vec<&'static UnitDescriptor>,
}

impl UnitCatalog {
    /// Create an empty catalogue.
    #[must_use]
    pub const fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Append `unit` to the catalogue.
    #[must_use]
    pub fn with(mut self, unit: &'static UnitDescriptor) -> Self {
        self.units.push(unit);
        self
    }
}

impl FromIterator<&'static UnitDescriptor> for UnitCatalog {
    fn from_iter<I: IntoIterator<Item = &'static UnitDescriptor>>(iter: I) -> Self {
        Self {
            units: iter.into_iter().collect(),
        }
    }
}

impl UnitFinder for UnitCatalog {
    fn descendants(&self, root: &GluePath) -> Vec<&'static UnitDescriptor> {
        self.units
            .iter()
            .copied()
            .filter(|unit| root.contains(unit.namespace()))
            .collect()
    }
}

/// Collect the concrete units declared under any of `roots`.
///
/// Results keep discovery order and are deduplicated by type. A root that
/// matches nothing contributes nothing.
pub fn discover<'a, F, I>(finder: &F, roots: I) -> Vec<&'static UnitDescriptor>
where
    F: UnitFinder + ?Sized,
    I: IntoIterator<Item = &'a GluePath>,
{
    let mut seen: HashSet<TypeId> = HashSet::new();
    let mut units = Vec::new();
    for root in roots {
        let found = finder.descendants(root);
        if found.is_empty() {
            tracing::warn!(root = %root, "no glue units found under root");
            continue;
        }
        for unit in found {
            if unit.is_interface() {
                tracing::debug!(unit = unit.type_name(), "skipping interface-only unit");
                continue;
            }
            if seen.insert(unit.type_id()) {
                tracing::debug!(unit = unit.type_name(), root = %root, "discovered glue unit");
                units.push(unit);
            }
        }
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::GlueUnit;
    use rstest::rstest;

    struct Alpha;
    struct Beta;

    impl GlueUnit for Alpha {
        fn construct() -> anyhow::Result<Self> {
            Ok(Self)
        }
    }

    impl GlueUnit for Beta {
        fn construct() -> anyhow::Result<Self> {
            Ok(Self)
        }
    }

    trait Abstract {}

    static ALPHA: UnitDescriptor = UnitDescriptor::concrete::<Alpha>("app::steps::alpha");
    static BETA: UnitDescriptor = UnitDescriptor::concrete::<Beta>("app::steps::beta");
    static ABSTRACT: UnitDescriptor =
        UnitDescriptor::interface::<dyn Abstract>("app::steps::alpha");

    fn catalog() -> UnitCatalog {
        [&ALPHA, &BETA, &ABSTRACT].into_iter().collect()
    }

    #[rstest]
    #[case("app::steps", "app::steps")]
    #[case("app/steps/", "app::steps")]
    #[case("glue:app.steps", "app::steps")]
    #[case("  ", "")]
    fn glue_paths_normalise(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(GluePath::new(raw).as_str(), expected);
    }

    #[rstest]
    #[case("app::steps", "app::steps::alpha", true)]
    #[case("app::steps", "app::steps", true)]
    #[case("app::step", "app::steps::alpha", false)]
    #[case("", "anything::at_all", true)]
    fn roots_match_whole_segments(
        #[case] root: &str,
        #[case] namespace: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(GluePath::new(root).contains(namespace), expected);
    }

    #[rstest]
    fn overlapping_roots_yield_each_unit_once() {
        let roots = [
            GluePath::new("app::steps"),
            GluePath::new("app::steps::alpha"),
            GluePath::new("app"),
        ];
        let units = discover(&catalog(), &roots);
        let names: Vec<_> = units.iter().map(|unit| unit.type_id()).collect();
        assert_eq!(names, vec![TypeId::of::<Alpha>(), TypeId::of::<Beta>()]);
    }

    #[rstest]
    fn unknown_root_contributes_nothing() {
        let roots = [GluePath::new("elsewhere")];
        assert!(discover(&catalog(), &roots).is_empty());
    }

    #[rstest]
    fn interface_units_are_skipped() {
        let roots = [GluePath::new("app::steps::alpha")];
        let units = discover(&catalog(), &roots);
        assert_eq!(units.len(), 1);
        assert!(units.iter().all(|unit| !unit.is_interface()));
    }
}
