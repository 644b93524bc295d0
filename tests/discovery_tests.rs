//! Link-time discovery through `glue_unit!`.

use anyhow::{Result, ensure};
use rstest::rstest;
use stepglue::{
    Backend, ClosureBackend, GlueCollection, GluePath, InventoryFinder, UnitFinder, discover,
};

mod steps {
    use stepglue::{GlueUnit, dsl};

    pub struct Kitchen;

    impl GlueUnit for Kitchen {
        fn construct() -> anyhow::Result<Self> {
            dsl::given("the kitchen has {int} knives", |_: u8| -> anyhow::Result<()> {
                Ok(())
            })?;
            Ok(Self)
        }
    }

    stepglue::glue_unit!(Kitchen);

    pub mod pantry {
        use stepglue::{GlueUnit, dsl};

        pub struct Pantry;

        impl GlueUnit for Pantry {
            fn construct() -> anyhow::Result<Self> {
                dsl::then("the pantry is stocked", || -> anyhow::Result<()> { Ok(()) })?;
                Ok(Self)
            }
        }

        stepglue::glue_unit!(Pantry);
    }
}

#[rstest]
#[case("discovery_tests::steps", 2)]
#[case("discovery_tests/steps/pantry", 1)]
#[case("glue:discovery_tests.steps.pantry", 1)]
#[case("discovery_tests::stepsx", 0)]
fn roots_select_units_by_module(#[case] root: &str, #[case] expected: usize) {
    let found = discover(&InventoryFinder, &[GluePath::new(root)]);
    assert_eq!(found.len(), expected);
}

#[rstest]
fn finder_reports_declaring_module() {
    let found = InventoryFinder.descendants(&GluePath::new("discovery_tests::steps::pantry"));
    assert_eq!(found.len(), 1);
    assert!(
        found
            .iter()
            .all(|unit| unit.namespace() == "discovery_tests::steps::pantry")
    );
}

#[rstest]
fn registered_units_build_a_world() -> Result<()> {
    let glue = GlueCollection::shared();
    let mut backend = ClosureBackend::new();
    backend.load_glue(glue.clone(), &[GluePath::new("discovery_tests::steps")]);
    backend.build_world()?;
    let collection = glue
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    ensure!(collection.step_definition("the kitchen has {int} knives").is_some());
    ensure!(collection.step_definition("the pantry is stocked").is_some());
    Ok(())
}
