//! Paste-able Rust skeletons for steps no definition matches.
//!
//! The generator scans the step text for values that snippet-enabled
//! parameter types recognise, turns each into a `{type}` placeholder, and
//! yields one snippet per combination of candidate types.

use crate::expression::{ParameterType, TypeRegistry};
use anyhow::bail;
use itertools::Itertools;
use regex::Regex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

const BODY_COMMENT: &str = "// Write code here that turns the phrase above into concrete actions";
const PENDING_BODY: &str = "Err(stepglue::Pending.into())";
const DOC_STRING_ARGUMENT: (&str, &str) = ("doc_string", "String");
const DATA_TABLE_ARGUMENT: (&str, &str) = ("data_table", "stepglue::dsl::DataTable");

/// Extra argument attached to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepArgument {
    /// Multi-line text block.
    DocString(String),
    /// Rows of cells.
    DataTable(Vec<Vec<String>>),
}

/// The step a host could not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickleStep {
    text: String,
    argument: Option<StepArgument>,
}

impl PickleStep {
    /// Step with plain text only.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            argument: None,
        }
    }

    /// Attach a doc string or data table.
    #[must_use]
    pub fn with_argument(mut self, argument: StepArgument) -> Self {
        self.argument = Some(argument);
        self
    }

    /// Step text without the keyword.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Doc string or data table, if any.
    #[must_use]
    pub const fn argument(&self) -> Option<&StepArgument> {
        self.argument.as_ref()
    }
}

/// Naming style for generated function names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SnippetType {
    /// `i_have_cukes`
    #[default]
    Underscore,
    /// `iHaveCukes`
    CamelCase,
}

impl FromStr for SnippetType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "underscore" => Ok(Self::Underscore),
            "camelcase" => Ok(Self::CamelCase),
            other => bail!("unknown snippet type '{other}'; expected 'underscore' or 'camelcase'"),
        }
    }
}

/// Derives function names from step expressions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionNameGenerator {
    style: SnippetType,
}

impl FunctionNameGenerator {
    /// Generator producing names in `style`.
    #[must_use]
    pub const fn new(style: SnippetType) -> Self {
        Self { style }
    }

    /// Naming style in use.
    #[must_use]
    pub const fn style(&self) -> SnippetType {
        self.style
    }

    /// Function name for `sentence`.
    ///
    /// Anything that is not alphanumeric separates words; leading digits are
    /// dropped so the result is a valid identifier.
    ///
    /// ```
    /// use stepglue::{FunctionNameGenerator, SnippetType};
    ///
    /// let camel = FunctionNameGenerator::new(SnippetType::CamelCase);
    /// assert_eq!(camel.generate("I have {int} cukes"), "iHaveIntCukes");
    /// ```
    #[must_use]
    pub fn generate(&self, sentence: &str) -> String {
        let trimmed = sentence.trim_start_matches(|c: char| !c.is_alphabetic() && c != '_');
        let words = trimmed
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase);
        let name = match self.style {
            SnippetType::Underscore => words.collect::<Vec<_>>().join("_"),
            SnippetType::CamelCase => words
                .enumerate()
                .map(|(index, word)| if index == 0 { word } else { capitalise(&word) })
                .collect(),
        };
        if name.is_empty() {
            "step".to_owned()
        } else {
            name
        }
    }
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// A named, typed snippet parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetArgument {
    name: String,
    rust_type: String,
}

impl SnippetArgument {
    /// Parameter named `name` of type `rust_type`.
    #[must_use]
    pub fn new(name: impl Into<String>, rust_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rust_type: rust_type.into(),
        }
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type of the parameter.
    #[must_use]
    pub fn rust_type(&self) -> &str {
        &self.rust_type
    }
}

/// Renders one generated expression as source text.
pub trait Snippet: Send + Sync {
    /// Render a snippet for `expression`.
    ///
    /// `keyword` is the DSL function to call, `function_name` a suggested
    /// identifier, `arguments` the typed parameters in order.
    fn render(
        &self,
        keyword: &str,
        expression: &str,
        function_name: &str,
        arguments: &[SnippetArgument],
    ) -> String;

    /// Escape `expression` for use inside a Rust string literal.
    fn escape_literal(&self, expression: &str) -> String {
        expression.replace('\\', "\\\\").replace('"', "\\\"")
    }
}

fn parameter_list(arguments: &[SnippetArgument]) -> String {
    arguments
        .iter()
        .map(|arg| format!("{}: {}", arg.name, arg.rust_type))
        .join(", ")
}

/// Registers the step with an inline closure.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosureSnippet;

impl Snippet for ClosureSnippet {
    fn render(
        &self,
        keyword: &str,
        expression: &str,
        _function_name: &str,
        arguments: &[SnippetArgument],
    ) -> String {
        format!(
            "dsl::{keyword}(\"{}\", |{}| -> anyhow::Result<()> {{\n    {BODY_COMMENT}\n    {PENDING_BODY}\n}})?;\n",
            self.escape_literal(expression),
            parameter_list(arguments)
        )
    }
}

/// Declares a named step function and registers it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionSnippet;

impl Snippet for FunctionSnippet {
    fn render(
        &self,
        keyword: &str,
        expression: &str,
        function_name: &str,
        arguments: &[SnippetArgument],
    ) -> String {
        format!(
            "fn {function_name}({}) -> anyhow::Result<()> {{\n    {BODY_COMMENT}\n    {PENDING_BODY}\n}}\n\ndsl::{keyword}(\"{}\", {function_name})?;\n",
            parameter_list(arguments),
            self.escape_literal(expression)
        )
    }
}

enum Segment<'r> {
    Text(String),
    Parameter(Vec<&'r ParameterType>),
}

/// Produces snippets from the snippet-enabled types of a registry.
pub struct SnippetGenerator {
    snippet: Box<dyn Snippet>,
    registry: Arc<TypeRegistry>,
}

impl std::fmt::Debug for SnippetGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnippetGenerator")
            .field("types", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl SnippetGenerator {
    /// Generator rendering with `snippet` over `registry`.
    #[must_use]
    pub fn new(snippet: impl Snippet + 'static, registry: Arc<TypeRegistry>) -> Self {
        Self {
            snippet: Box::new(snippet),
            registry,
        }
    }

    pub(crate) fn set_registry(&mut self, registry: Arc<TypeRegistry>) {
        self.registry = registry;
    }

    /// Snippets for `step`, one per combination of candidate parameter types.
    ///
    /// `keyword` is the Gherkin keyword the step was written with; it picks
    /// the DSL function in the output. The iterator is lazy and finite.
    pub fn snippets<'a>(
        &'a self,
        step: &PickleStep,
        keyword: &str,
        name_generator: &FunctionNameGenerator,
    ) -> impl Iterator<Item = String> + use<'a> {
        let segments = segment(step.text(), &self.registry);
        let choices: Vec<Vec<&'a ParameterType>> = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Parameter(types) => Some(types.clone()),
                Segment::Text(_) => None,
            })
            .collect();
        let combinations: Box<dyn Iterator<Item = Vec<&'a ParameterType>> + 'a> =
            if choices.is_empty() {
                Box::new(std::iter::once(Vec::new()))
            } else {
                Box::new(
                    choices
                        .into_iter()
                        .map(IntoIterator::into_iter)
                        .multi_cartesian_product(),
                )
            };
        let function = dsl_function(keyword);
        let trailing = step.argument().map(|argument| match argument {
            StepArgument::DocString(_) => DOC_STRING_ARGUMENT,
            StepArgument::DataTable(_) => DATA_TABLE_ARGUMENT,
        });
        let names = *name_generator;
        combinations.map(move |combination| {
            let (expression, mut arguments) = expression_for(&segments, &combination);
            if let Some((name, rust_type)) = trailing {
                arguments.push(SnippetArgument::new(name, rust_type));
            }
            let function_name = names.generate(&expression);
            self.snippet
                .render(function, &expression, &function_name, &arguments)
        })
    }
}

/// DSL function for a Gherkin keyword such as `"Given "` or `"* "`.
fn dsl_function(keyword: &str) -> &'static str {
    match keyword.trim().to_lowercase().as_str() {
        "given" => "given",
        "when" => "when",
        "then" => "then",
        "and" => "and",
        "but" => "but",
        _ => "step",
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '{' | '}' | '(' | ')' | '/') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn expression_for(
    segments: &[Segment<'_>],
    combination: &[&ParameterType],
) -> (String, Vec<SnippetArgument>) {
    let mut expression = String::new();
    let mut arguments = Vec::with_capacity(combination.len());
    let mut usage: HashMap<&str, usize> = HashMap::new();
    let mut picks = combination.iter();
    for segment in segments {
        match segment {
            Segment::Text(text) => expression.push_str(&escape_text(text)),
            Segment::Parameter(_) => {
                let Some(ty) = picks.next() else { continue };
                expression.push('{');
                expression.push_str(ty.name());
                expression.push('}');
                let count = usage.entry(ty.name()).or_insert(0);
                *count += 1;
                let base = argument_base(ty.name());
                let name = if *count == 1 {
                    base
                } else {
                    format!("{base}{count}")
                };
                arguments.push(SnippetArgument::new(name, ty.rust_type()));
            }
        }
    }
    (expression, arguments)
}

fn argument_base(type_name: &str) -> String {
    let name = FunctionNameGenerator::new(SnippetType::Underscore).generate(type_name);
    if name == "step" { "arg".to_owned() } else { name }
}

/// Split `text` into literal runs and parameter candidates.
///
/// At each position the earliest match wins; among matches at the same
/// start the longest span wins, and every type matching that exact span is
/// a candidate.
fn segment<'r>(text: &str, registry: &'r TypeRegistry) -> Vec<Segment<'r>> {
    let mut segments = Vec::new();
    let mut pos = 0;
    loop {
        let mut best: Option<(usize, usize)> = None;
        let mut candidates: Vec<&'r ParameterType> = Vec::new();
        for ty in registry.snippet_types() {
            let Some(span) = find_bounded(ty.matcher(), text, pos) else {
                continue;
            };
            match best {
                Some((start, end)) if span.0 > start || (span.0 == start && span.1 < end) => {}
                Some(current) if current == span => candidates.push(ty),
                _ => {
                    best = Some(span);
                    candidates.clear();
                    candidates.push(ty);
                }
            }
        }
        let Some((start, end)) = best else { break };
        if let Some(literal) = text.get(pos..start) {
            segments.push(Segment::Text(literal.to_owned()));
        }
        segments.push(Segment::Parameter(candidates));
        pos = end;
    }
    if let Some(rest) = text.get(pos..).filter(|rest| !rest.is_empty()) {
        segments.push(Segment::Text(rest.to_owned()));
    }
    segments
}

/// First non-empty match at or after `from` that is not embedded in a word.
fn find_bounded(matcher: &Regex, text: &str, from: usize) -> Option<(usize, usize)> {
    let mut at = from;
    while at <= text.len() {
        let found = matcher.find_at(text, at)?;
        let (start, end) = (found.start(), found.end());
        if end > start && word_boundary_before(text, start) && word_boundary_after(text, end) {
            return Some((start, end));
        }
        at = text
            .get(start..)
            .and_then(|rest| rest.chars().next())
            .map_or(text.len() + 1, |c| start + c.len_utf8());
    }
    None
}

fn word_boundary_before(text: &str, start: usize) -> bool {
    text.get(..start)
        .and_then(|head| head.chars().next_back())
        .is_none_or(|c| !c.is_alphanumeric())
}

fn word_boundary_after(text: &str, end: usize) -> bool {
    text.get(end..)
        .and_then(|tail| tail.chars().next())
        .is_none_or(|c| !c.is_alphanumeric())
}
