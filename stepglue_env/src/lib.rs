#![forbid(unsafe_code)]

//! Shared environment variable names used across stepglue crates (library,
//! tests, and helpers).

/// Environment variable listing glue namespace roots, separated by commas.
///
/// # Examples
///
/// ```
/// use stepglue_env::GLUE_ENV;
/// assert_eq!(GLUE_ENV, "STEPGLUE_GLUE");
/// ```
pub const GLUE_ENV: &str = "STEPGLUE_GLUE";

/// Environment variable selecting the snippet naming style.
///
/// Accepted values are `underscore` and `camelcase`.
pub const SNIPPETS_ENV: &str = "STEPGLUE_SNIPPETS";

/// Separator between roots in [`GLUE_ENV`].
pub const GLUE_SEPARATOR: char = ',';
