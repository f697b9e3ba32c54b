//! Layout usage errors
//!
//! These are reported per frame and never abort rendering; the tree is left
//! in a best-effort state.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// Constraints declared after the node's grid was resolved.
    #[error("grid of div '{node}' is locked; declare cols/rows before the first child")]
    GridLocked { node: String },

    /// `end` without a matching `start`.
    #[error("div end without a matching start")]
    UnbalancedEnd,

    /// Frame finished with divs still open.
    #[error("{0} div(s) left open at end of frame")]
    UnclosedDivs(usize),

    /// Dialog end without a matching dialog start.
    #[error("dialog end without a matching dialog start")]
    UnbalancedDialogEnd,

    /// Frame finished with dialogs still open for rendering.
    #[error("{0} dialog(s) left open at end of frame")]
    UnclosedDialogs(usize),

    /// Named dialog is not on the stack.
    #[error("dialog '{0}' is not open")]
    UnknownDialog(String),
}
