//! Operand resolution.
//!
//! Operands are written `plugin` or `theme.plugin`. The unqualified form takes
//! the default theme of the source being parsed, which the caller supplies.

use geekcms_core::{IdentError, PluginRef};

/// Resolve operand text into a plugin reference
///
/// # Errors
///
/// Returns error if the text, its theme part or the default theme is not an
/// identifier
pub fn resolve(text: &str, default_theme: &str) -> Result<PluginRef, IdentError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(IdentError::Empty);
    }
    match text.split_once('.') {
        Some((theme, plugin)) => PluginRef::new(theme, plugin),
        None => PluginRef::new(default_theme, text),
    }
}

/// Resolve an operand that may be absent
///
/// A missing or empty operand becomes `sentinel`, which is `HEAD` for a
/// missing predecessor and `TAIL` for a missing successor.
///
/// # Errors
///
/// Returns error if present text is malformed
pub fn resolve_or(
    text: Option<&str>,
    sentinel: PluginRef,
    default_theme: &str,
) -> Result<PluginRef, IdentError> {
    match text.map(str::trim) {
        Some(text) if !text.is_empty() => resolve(text, default_theme),
        _ => Ok(sentinel),
    }
}
