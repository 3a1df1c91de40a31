use thiserror::Error;

use crate::editor::{EditorError, ImportError};
use crate::parse::ParseError;
use crate::types::{BridgeError, CodecError, StructuralError};

/// Unified error type covering every layer of the crate.
///
/// Returned by convenience functions that chain several steps, like
/// [`export_node()`](crate::export_node) and
/// [`RuleEditor::export()`](crate::RuleEditor::export).
#[derive(Debug, Error)]
pub enum RulespecError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
