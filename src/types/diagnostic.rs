use std::fmt;

use serde::{Deserialize, Serialize};

use super::Severity;

/// Machine-readable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed DSL text.
    ParseError,
    /// A specification the exporter cannot render.
    CodecError,
    /// A node or specification the bridge cannot translate.
    BridgeError,
    /// Orphans, cycles, dangling references.
    StructuralError,
    /// A node whose own configuration is incomplete or invalid.
    InvalidNode,
    /// A group with no children.
    EmptyGroup,
    /// Specification or DSL regeneration for the tree failed.
    GenerationFailed,
    RoundTripNodeCount,
    RoundTripStructure,
    RoundTripMetadata,
    RoundTripLogic,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::CodecError => "CODEC_ERROR",
            ErrorCode::BridgeError => "BRIDGE_ERROR",
            ErrorCode::StructuralError => "STRUCTURAL_ERROR",
            ErrorCode::InvalidNode => "INVALID_NODE",
            ErrorCode::EmptyGroup => "EMPTY_GROUP",
            ErrorCode::GenerationFailed => "GENERATION_FAILED",
            ErrorCode::RoundTripNodeCount => "ROUND_TRIP_NODE_COUNT",
            ErrorCode::RoundTripStructure => "ROUND_TRIP_STRUCTURE",
            ErrorCode::RoundTripMetadata => "ROUND_TRIP_METADATA",
            ErrorCode::RoundTripLogic => "ROUND_TRIP_LOGIC",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 1-based line and column in DSL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A diagnostic produced by node checks, structural checks, DSL generation or
/// round-trip validation. Consumed by the UI layer; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub id: String,
    pub message: String,
    pub severity: Severity,
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl ValidationError {
    pub fn new(code: ErrorCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message: message.into(),
            severity,
            code,
            node_id: None,
            location: None,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, message)
    }

    #[must_use]
    pub fn on_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)?;
        if let Some(node) = &self.node_id {
            write!(f, " (node {node})")?;
        }
        if let Some(loc) = &self.location {
            write!(f, " at {loc}")?;
        }
        Ok(())
    }
}
