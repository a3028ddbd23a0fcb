/// Well-known names and defaults.
pub(crate) mod constants;

/// Error and result types.
pub(crate) mod error;
