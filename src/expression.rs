//! Parameter types and step expression compilation.
//!
//! Step expressions are plain text with `{name}` placeholders, `(optional)`
//! text, and `\` escapes, in the style of Cucumber expressions. Compiling one
//! resolves every placeholder against a [`TypeRegistry`] and produces an
//! anchored regex the host matcher can use. Matching step text is left to
//! the host.

use crate::error::GlueError;
use indexmap::IndexMap;
use regex::Regex;
use std::fmt;

/// A named parameter type usable as `{name}` in step expressions.
#[derive(Debug, Clone)]
pub struct ParameterType {
    name: String,
    regexps: Vec<String>,
    rust_type: String,
    use_for_snippets: bool,
    matcher: Regex,
}

impl ParameterType {
    /// Create a parameter type matching any of `regexps`.
    ///
    /// `rust_type` is the argument type written into generated snippets.
    /// Regexps should use non-capturing groups so each placeholder maps to a
    /// single capture in compiled expressions.
    ///
    /// # Errors
    ///
    /// Returns [`GlueError::InvalidPattern`] when a regexp does not compile,
    /// and [`GlueError::MalformedExpression`] when `regexps` is empty.
    pub fn new<I, S>(
        name: impl Into<String>,
        regexps: I,
        rust_type: impl Into<String>,
    ) -> Result<Self, GlueError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let type_name = name.into();
        let patterns: Vec<String> = regexps.into_iter().map(Into::into).collect();
        if patterns.is_empty() {
            return Err(GlueError::MalformedExpression {
                expression: format!("{{{type_name}}}"),
                reason: "parameter type needs at least one regexp".to_owned(),
            });
        }
        let combined = alternation(&patterns);
        let matcher = Regex::new(&combined).map_err(|source| GlueError::InvalidPattern {
            pattern: combined.clone(),
            source,
        })?;
        Ok(Self {
            name: type_name,
            regexps: patterns,
            rust_type: rust_type.into(),
            use_for_snippets: true,
            matcher,
        })
    }

    /// Control whether snippet generation proposes this type.
    #[must_use]
    pub fn with_snippets(mut self, enabled: bool) -> Self {
        self.use_for_snippets = enabled;
        self
    }

    /// Name used inside `{}` placeholders.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source regexps.
    #[must_use]
    pub fn regexps(&self) -> &[String] {
        &self.regexps
    }

    /// Argument type written into snippets.
    #[must_use]
    pub fn rust_type(&self) -> &str {
        &self.rust_type
    }

    /// Whether snippet generation proposes this type.
    #[must_use]
    pub const fn use_for_snippets(&self) -> bool {
        self.use_for_snippets
    }

    /// Regex matching any of the type's regexps.
    #[must_use]
    pub const fn matcher(&self) -> &Regex {
        &self.matcher
    }
}

fn alternation(patterns: &[String]) -> String {
    patterns
        .iter()
        .map(|pattern| format!("(?:{pattern})"))
        .collect::<Vec<_>>()
        .join("|")
}

/// Built-in parameter types: name, regexps, Rust type, snippet use.
const BUILT_INS: &[(&str, &[&str], &str, bool)] = &[
    ("int", &[r"-?\d+"], "i32", true),
    ("float", &[r"-?\d*\.\d+"], "f32", true),
    ("word", &[r"[^\s]+"], "String", false),
    (
        "string",
        &[
            r#""(?:[^"\\]*(?:\\.[^"\\]*)*)""#,
            r"'(?:[^'\\]*(?:\\.[^'\\]*)*)'",
        ],
        "String",
        true,
    ),
    ("", &[r".*"], "String", false),
    ("byte", &[r"-?\d+"], "i8", false),
    ("short", &[r"-?\d+"], "i16", false),
    ("long", &[r"-?\d+"], "i64", false),
    ("double", &[r"-?\d*\.\d+"], "f64", false),
];

/// Registry of parameter types keyed by name, in registration order.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: IndexMap<String, ParameterType>,
}

impl TypeRegistry {
    /// Registry with no parameter types at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Register `parameter_type`.
    ///
    /// # Errors
    ///
    /// Returns [`GlueError::DuplicateParameterType`] when the name is taken.
    pub fn define_parameter_type(&mut self, parameter_type: ParameterType) -> Result<(), GlueError> {
        if self.types.contains_key(parameter_type.name()) {
            return Err(GlueError::DuplicateParameterType {
                name: parameter_type.name().to_owned(),
            });
        }
        self.types
            .insert(parameter_type.name().to_owned(), parameter_type);
        Ok(())
    }

    /// Look up a parameter type by name. The anonymous type is `""`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ParameterType> {
        self.types.get(name)
    }

    /// Parameter types proposed by snippet generation, in registration order.
    pub fn snippet_types(&self) -> impl Iterator<Item = &ParameterType> {
        self.types.values().filter(|ty| ty.use_for_snippets())
    }

    /// Number of registered parameter types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` when no parameter types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeRegistry {
    /// Registry holding the built-in parameter types.
    fn default() -> Self {
        let mut registry = Self::empty();
        for &(name, regexps, rust_type, snippets) in BUILT_INS {
            // Built-in patterns are static and known to compile.
            if let Ok(ty) = ParameterType::new(name, regexps.iter().copied(), rust_type) {
                registry
                    .types
                    .insert(name.to_owned(), ty.with_snippets(snippets));
            }
        }
        registry
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Optional(String),
    Parameter(String),
}

/// A step expression compiled against a [`TypeRegistry`].
#[derive(Debug, Clone)]
pub struct StepExpression {
    source: String,
    parameter_names: Vec<String>,
    regex: Regex,
}

impl StepExpression {
    /// Compile `source` against `registry`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stepglue::{StepExpression, TypeRegistry};
    ///
    /// let registry = TypeRegistry::default();
    /// let expr = StepExpression::compile("I have {int} cuke(s)", &registry)
    ///     .expect("compile");
    /// assert_eq!(expr.arity(), 1);
    /// assert!(expr.regex().is_match("I have 42 cukes"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`GlueError::MalformedExpression`] for unbalanced braces or
    /// parentheses, [`GlueError::UndefinedParameterType`] for unknown
    /// placeholders, and [`GlueError::InvalidPattern`] when the resulting
    /// regex does not compile.
    pub fn compile(source: &str, registry: &TypeRegistry) -> Result<Self, GlueError> {
        let tokens = tokenize(source)?;
        let mut pattern = String::from("^");
        let mut parameter_names = Vec::new();
        for token in &tokens {
            match token {
                Token::Text(text) => pattern.push_str(&regex::escape(text)),
                Token::Optional(text) => {
                    pattern.push_str("(?:");
                    pattern.push_str(&regex::escape(text));
                    pattern.push_str(")?");
                }
                Token::Parameter(name) => {
                    let ty = registry.lookup(name).ok_or_else(|| {
                        GlueError::UndefinedParameterType {
                            expression: source.to_owned(),
                            name: name.clone(),
                        }
                    })?;
                    pattern.push('(');
                    pattern.push_str(&alternation(ty.regexps()));
                    pattern.push(')');
                    parameter_names.push(name.clone());
                }
            }
        }
        pattern.push('$');
        let regex = Regex::new(&pattern).map_err(|err| GlueError::InvalidPattern {
            pattern: pattern.clone(),
            source: err,
        })?;
        Ok(Self {
            source: source.to_owned(),
            parameter_names,
            regex,
        })
    }

    /// Expression text as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parameter type names in placeholder order.
    #[must_use]
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    /// Number of placeholders.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameter_names.len()
    }

    /// Anchored regex with one capture group per placeholder.
    #[must_use]
    pub const fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl fmt::Display for StepExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, GlueError> {
    let malformed = |reason: &str| GlueError::MalformedExpression {
        expression: source.to_owned(),
        reason: reason.to_owned(),
    };
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut chars = source.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => text.push(chars.next().ok_or_else(|| malformed("dangling escape"))?),
            '{' => {
                let name = read_until(&mut chars, '}', '{')
                    .ok_or_else(|| malformed("unterminated parameter"))?;
                flush(&mut tokens, &mut text);
                tokens.push(Token::Parameter(name));
            }
            '(' => {
                let optional = read_until(&mut chars, ')', '(')
                    .ok_or_else(|| malformed("unterminated optional text"))?;
                if optional.contains('{') {
                    return Err(malformed("parameters cannot be optional"));
                }
                flush(&mut tokens, &mut text);
                tokens.push(Token::Optional(optional));
            }
            '}' => return Err(malformed("unmatched '}'")),
            ')' => return Err(malformed("unmatched ')'")),
            other => text.push(other),
        }
    }
    flush(&mut tokens, &mut text);
    Ok(tokens)
}

/// Read up to `close`, rejecting a nested `open`. Returns `None` when the
/// input ends first or nests.
fn read_until(chars: &mut std::str::Chars<'_>, close: char, open: char) -> Option<String> {
    let mut body = String::new();
    for ch in chars.by_ref() {
        if ch == close {
            return Some(body);
        }
        if ch == open {
            return None;
        }
        body.push(ch);
    }
    None
}

fn flush(tokens: &mut Vec<Token>, text: &mut String) {
    if !text.is_empty() {
        tokens.push(Token::Text(std::mem::take(text)));
    }
}
