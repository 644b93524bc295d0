//! Backend configuration: glue roots and snippet naming.

use crate::discovery::GluePath;
use crate::snippet::SnippetType;
use anyhow::{Context, bail, ensure};
use std::env;
use stepglue_env::{GLUE_ENV, GLUE_SEPARATOR, SNIPPETS_ENV};

/// Settings a host reads before loading glue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    glue_paths: Vec<GluePath>,
    snippet_type: SnippetType,
}

impl BackendConfig {
    /// Configuration with no glue roots and underscore snippet names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a glue root. Roots already present are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error when `raw` normalises to an empty path. Hosts wanting
    /// every registered unit pass the crate name as the root instead.
    pub fn with_glue_path(mut self, raw: &str) -> anyhow::Result<Self> {
        let path = GluePath::new(raw);
        ensure!(
            !path.as_str().is_empty(),
            "glue path '{raw}' does not name a module"
        );
        if !self.glue_paths.contains(&path) {
            self.glue_paths.push(path);
        }
        Ok(self)
    }

    /// Add several glue roots.
    ///
    /// # Errors
    ///
    /// Fails on the first root rejected by [`Self::with_glue_path`].
    pub fn with_glue_paths<I, S>(self, raws: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raws.into_iter()
            .try_fold(self, |config, raw| config.with_glue_path(raw.as_ref()))
    }

    /// Choose the naming style for generated function names.
    #[must_use]
    pub const fn with_snippet_type(mut self, snippet_type: SnippetType) -> Self {
        self.snippet_type = snippet_type;
        self
    }

    /// Configured glue roots, in the order given.
    #[must_use]
    pub fn glue_paths(&self) -> &[GluePath] {
        &self.glue_paths
    }

    /// Snippet naming style.
    #[must_use]
    pub const fn snippet_type(&self) -> SnippetType {
        self.snippet_type
    }

    /// Read configuration from `STEPGLUE_GLUE` and `STEPGLUE_SNIPPETS`.
    ///
    /// `STEPGLUE_GLUE` is a comma-separated root list; blank entries are
    /// skipped. Unset variables leave the defaults in place.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is not valid Unicode or the snippet
    /// style is unknown.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| match env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(err @ env::VarError::NotUnicode(_)) => {
                Err(err).with_context(|| format!("reading {name}"))
            }
        })
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures and rejects unknown snippet styles.
    pub fn from_lookup<L>(lookup: L) -> anyhow::Result<Self>
    where
        L: Fn(&str) -> anyhow::Result<Option<String>>,
    {
        let mut config = Self::new();
        if let Some(roots) = lookup(GLUE_ENV)? {
            let entries: Vec<&str> = roots
                .split(GLUE_SEPARATOR)
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .collect();
            config = config
                .with_glue_paths(entries)
                .with_context(|| format!("invalid {GLUE_ENV}"))?;
        }
        if let Some(style) = lookup(SNIPPETS_ENV)? {
            let Ok(snippet_type) = style.parse::<SnippetType>() else {
                bail!("invalid {SNIPPETS_ENV} value '{style}'; expected 'underscore' or 'camelcase'");
            };
            config.snippet_type = snippet_type;
        }
        tracing::debug!(
            roots = config.glue_paths.len(),
            snippet_type = ?config.snippet_type,
            "loaded backend configuration"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(
        vars: &[(&str, &str)],
    ) -> impl Fn(&str) -> anyhow::Result<Option<String>> + use<> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |name| Ok(map.get(name).cloned())
    }

    #[rstest]
    fn defaults_are_empty() {
        let config = BackendConfig::new();
        assert!(config.glue_paths().is_empty());
        assert_eq!(config.snippet_type(), SnippetType::Underscore);
    }

    #[rstest]
    #[case("")]
    #[case("  ")]
    #[case("glue:")]
    #[case("::/")]
    fn empty_roots_are_rejected(#[case] raw: &str) {
        assert!(BackendConfig::new().with_glue_path(raw).is_err());
    }

    #[rstest]
    fn equivalent_roots_are_kept_once() -> Result<()> {
        let config =
            BackendConfig::new().with_glue_paths(["app/steps", "glue:app.steps", "app::hooks"])?;
        let roots: Vec<_> = config.glue_paths().iter().map(GluePath::as_str).collect();
        anyhow::ensure!(roots == ["app::steps", "app::hooks"], "got {roots:?}");
        Ok(())
    }

    #[rstest]
    fn lookup_reads_roots_and_style() -> Result<()> {
        let config = BackendConfig::from_lookup(lookup_from(&[
            (GLUE_ENV, "app::steps, ,app::hooks"),
            (SNIPPETS_ENV, "camelcase"),
        ]))?;
        anyhow::ensure!(config.glue_paths().len() == 2);
        anyhow::ensure!(config.snippet_type() == SnippetType::CamelCase);
        Ok(())
    }

    #[rstest]
    fn unknown_snippet_styles_fail() {
        let err = BackendConfig::from_lookup(lookup_from(&[(SNIPPETS_ENV, "kebab")]));
        assert!(err.is_err_and(|e| e.to_string().contains(SNIPPETS_ENV)));
    }
}
