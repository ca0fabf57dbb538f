//! Page shells: serve a rendered fragment either on its own or spliced into a
//! full page.
//!
//! A site built on htmx-style partial requests renders each view once. When
//! the request asked for a partial, the fragment goes out as-is; otherwise it
//! is spliced into the static shell page at a fixed element id.

use crate::error::SpliceError;
use crate::splice::{SpliceOptions, SpliceOutcome, Splicer};

/// Whether a response should be the bare fragment or the full page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Return the fragment unchanged.
    Partial,
    /// Splice the fragment into the shell.
    FullPage,
}

impl RenderMode {
    /// `Partial` when the client asked for a partial (e.g. sent `HX-Request`).
    pub fn from_partial_request(is_partial: bool) -> Self {
        if is_partial {
            RenderMode::Partial
        } else {
            RenderMode::FullPage
        }
    }
}

/// A shell document with a slot, identified by element id, that fragments
/// get spliced into.
#[derive(Debug, Clone)]
pub struct Layout {
    shell: String,
    target_id: String,
    splicer: Splicer,
}

impl Layout {
    pub fn new(shell: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            target_id: target_id.into(),
            splicer: Splicer::default(),
        }
    }

    pub fn with_options(mut self, options: SpliceOptions) -> Self {
        self.splicer = Splicer::new(options);
        self
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Render `fragment` for `mode`.
    ///
    /// In full-page mode a shell without the target element yields an empty
    /// string, same as [`crate::splice`].
    pub fn render(&self, fragment: &str, mode: RenderMode) -> Result<String, SpliceError> {
        match mode {
            RenderMode::Partial => Ok(fragment.to_owned()),
            RenderMode::FullPage => {
                let outcome = self
                    .splicer
                    .try_splice(&self.shell, &self.target_id, fragment)?;
                if outcome == SpliceOutcome::TargetNotFound {
                    warn!(target_id = %self.target_id, "layout shell has no element with this id");
                }
                Ok(outcome.into_html())
            }
        }
    }
}
