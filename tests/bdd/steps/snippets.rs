//! Step definitions for snippet suggestions.

use crate::bdd::fixtures::{strip_quotes, with_world};
use anyhow::{Context, Result, ensure};
use rstest_bdd_macros::{given, then, when};
use stepglue::{Backend, ClosureBackend, FunctionNameGenerator, PickleStep, ScopedObjectFactory};
use test_support::units;

#[given("a backend with no glue")]
fn backend_without_glue() -> Result<()> {
    let backend = ClosureBackend::with_parts(ScopedObjectFactory::new(), units::catalog());
    with_world(|world| *world.backend.borrow_mut() = Some(backend));
    Ok(())
}

#[when("snippets are requested for the {keyword} step {text}")]
fn snippets_requested(keyword: String, text: String) -> Result<()> {
    let step = PickleStep::new(strip_quotes(&text));
    let keyword = strip_quotes(&keyword).to_owned();
    with_world(|world| {
        let backend = world.backend.borrow();
        let backend = backend.as_ref().context("no backend in this scenario")?;
        let snippets: Vec<String> = backend
            .snippets(&step, &keyword, &FunctionNameGenerator::default())
            .collect();
        world.snippets.set(snippets);
        Ok(())
    })
}

#[then("the snippet count is {count}")]
fn snippet_count(count: usize) -> Result<()> {
    let snippets = with_world(|world| world.snippets.get()).context("no snippets requested")?;
    ensure!(snippets.len() == count, "got {snippets:?}");
    Ok(())
}

#[then("the first snippet registers the expression {expression}")]
fn first_snippet_registers(expression: String) -> Result<()> {
    let expected = format!("(\"{}\"", strip_quotes(&expression));
    let snippets = with_world(|world| world.snippets.get()).context("no snippets requested")?;
    let first = snippets.first().context("no snippet produced")?;
    ensure!(first.contains(&expected), "expected '{expected}' in:\n{first}");
    Ok(())
}

#[then("the first snippet takes {parameters}")]
fn first_snippet_takes(parameters: String) -> Result<()> {
    let expected = format!("|{}|", strip_quotes(&parameters));
    let snippets = with_world(|world| world.snippets.get()).context("no snippets requested")?;
    let first = snippets.first().context("no snippet produced")?;
    ensure!(first.contains(&expected), "expected '{expected}' in:\n{first}");
    Ok(())
}
