//! Theme directories: locating relation sources and checking themes out.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Repository the themes are checked out from
pub const THEME_REPOSITORY: &str = "https://github.com/haoxun/GeekCMS-Themes/trunk/";

/// Relation file looked up in a theme directory
pub const SEQUENCE_FILE: &str = "sequence.txt";

/// Theme handling error
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    /// Theme name is blank
    #[error("theme name is empty")]
    EmptyName,

    /// Reading a theme file failed
    #[error("failed to read {path}: {source}")]
    Read {
        /// File being read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The checkout command could not be started
    #[error("failed to run svn: {0}")]
    Spawn(#[source] std::io::Error),

    /// The checkout command exited unsuccessfully
    #[error("svn checkout of {url} exited with {status}")]
    CheckoutFailed {
        /// Checked out URL
        url: String,
        /// Exit status
        status: std::process::ExitStatus,
    },
}

/// A planned theme checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    /// Remote URL
    pub url: String,
    /// Local directory
    pub target: PathBuf,
}

/// Plan the checkout of `theme` from `repository` into `into/theme`
///
/// Whitespace is removed from the theme name in the URL only.
///
/// # Errors
///
/// Returns error if the theme name is blank
pub fn checkout_plan(theme: &str, repository: &str, into: &Path) -> Result<Checkout, ThemeError> {
    let remote: String = theme.chars().filter(|c| !c.is_whitespace()).collect();
    if remote.is_empty() {
        return Err(ThemeError::EmptyName);
    }
    let mut url = repository.to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str(&remote);
    Ok(Checkout {
        url,
        target: into.join(theme),
    })
}

/// Run `svn checkout` for a plan
///
/// # Errors
///
/// Returns error if svn cannot be started or exits unsuccessfully
pub fn checkout(plan: &Checkout) -> Result<(), ThemeError> {
    tracing::info!(url = %plan.url, target = %plan.target.display(), "checking out theme");
    let status = Command::new("svn")
        .arg("checkout")
        .arg(&plan.url)
        .arg(&plan.target)
        .status()
        .map_err(ThemeError::Spawn)?;
    if !status.success() {
        return Err(ThemeError::CheckoutFailed {
            url: plan.url.clone(),
            status,
        });
    }
    Ok(())
}

/// Default theme of a directory: its final path component
#[must_use]
pub fn theme_name(dir: &Path) -> Option<String> {
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// Read the relation source of a theme directory
///
/// # Errors
///
/// Returns error if the file cannot be read
pub fn load_source(dir: &Path, file: &str) -> Result<String, ThemeError> {
    let path = dir.join(file);
    tracing::debug!(path = %path.display(), "loading relation source");
    std::fs::read_to_string(&path).map_err(|source| ThemeError::Read { path, source })
}
