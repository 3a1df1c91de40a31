//! [`Specification`] to DSL text.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::parse::{is_identifier, MetaComment, META_MARKER};
use crate::types::{
    write_quoted, Argument, BoolOp, CodecError, NodeMetadata, SpecKind, Specification, Value,
    ValueType, MAX_NESTING_DEPTH,
};

/// Where metadata comments go relative to the expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommentPosition {
    /// All metadata comments on their own lines ahead of the expression.
    #[default]
    Before,
    /// All metadata comments on their own lines after the expression.
    After,
    /// Each comment right after the node it describes.
    Inline,
}

/// Formatting knobs for [`export`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOptions {
    /// Break multi-child groups over indented lines.
    pub pretty: bool,
    pub indent_width: usize,
    /// Emit `# @meta` comments for nodes that carry metadata.
    pub include_metadata: bool,
    pub comment_position: CommentPosition,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent_width: 2,
            include_metadata: true,
            comment_position: CommentPosition::Before,
        }
    }
}

impl ExportOptions {
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    #[must_use]
    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    #[must_use]
    pub fn with_comment_position(mut self, position: CommentPosition) -> Self {
        self.comment_position = position;
        self
    }
}

/// Render a specification as DSL text that [`parse`](crate::parse::parse)
/// reads back to the same structure.
///
/// # Errors
///
/// Returns [`CodecError`] for non-finite numbers, names that are not valid
/// identifiers, function names the DSL reserves and specifications nested
/// deeper than [`MAX_NESTING_DEPTH`].
pub fn export(spec: &Specification, options: &ExportOptions) -> Result<String, CodecError> {
    let depth = spec.depth();
    if depth > MAX_NESTING_DEPTH {
        return Err(CodecError::TooDeep {
            depth,
            limit: MAX_NESTING_DEPTH,
        });
    }
    let mut exporter = Exporter {
        options,
        out: String::new(),
        detached: Vec::new(),
        path: Vec::new(),
        depth: 0,
    };
    exporter.spec(spec)?;

    let Exporter { out, detached, .. } = exporter;
    let text = match options.comment_position {
        _ if detached.is_empty() => out,
        CommentPosition::Before => format!("{}\n{out}", detached.join("\n")),
        CommentPosition::After | CommentPosition::Inline => {
            format!("{out}\n{}", detached.join("\n"))
        }
    };
    trace!(len = text.len(), "exported dsl");
    Ok(text)
}

struct Exporter<'o> {
    options: &'o ExportOptions,
    out: String,
    /// Metadata comments that go above or below the whole expression.
    detached: Vec<String>,
    path: Vec<usize>,
    depth: usize,
}

impl Exporter<'_> {
    fn spec(&mut self, spec: &Specification) -> Result<(), CodecError> {
        match &spec.kind {
            SpecKind::Field(cond) => {
                self.leaf_field(&cond.field)?;
                self.out.push(' ');
                self.out.push_str(cond.operator.symbol());
                self.out.push(' ');
                match cond.value_type {
                    ValueType::FieldReference => {
                        let name = reference_name(&cond.value)?;
                        self.out.push_str("${");
                        self.out.push_str(name);
                        self.out.push('}');
                    }
                    ValueType::Literal => self.literal(&cond.value)?,
                }
            }
            SpecKind::Composite { operator, specs } => self.composite(*operator, specs)?,
            SpecKind::Conditional {
                conditional,
                target_field,
                condition,
            } => {
                self.open_call(conditional.call_name());
                self.call_field(target_field)?;
                self.out.push_str(", ");
                self.child(0, condition)?;
                self.out.push(')');
            }
            SpecKind::ForEach { array_field, item } => {
                self.open_call("forEach");
                self.call_field(array_field)?;
                self.out.push_str(", ");
                self.child(0, item)?;
                self.out.push(')');
            }
            SpecKind::UniqueBy { array_field, key } => {
                self.open_call("uniqueBy");
                self.call_field(array_field)?;
                self.out.push_str(", ");
                self.quoted(key);
                self.out.push(')');
            }
            SpecKind::Length {
                bound,
                array_field,
                length,
            } => {
                self.open_call(bound.call_name());
                self.call_field(array_field)?;
                self.out.push_str(&format!(", {length})"));
            }
            SpecKind::Optional { guard, field, spec } => {
                self.open_call(guard.call_name());
                self.call_field(field)?;
                self.out.push_str(", ");
                self.child(0, spec)?;
                self.out.push(')');
            }
            SpecKind::WithDefault {
                field,
                default,
                spec,
            } => {
                self.open_call("withDefault");
                self.call_field(field)?;
                self.out.push_str(", ");
                self.literal(default)?;
                self.out.push_str(", ");
                self.child(0, spec)?;
                self.out.push(')');
            }
            SpecKind::Function { name, args } => self.function(name, args)?,
            SpecKind::Contextual { template } => {
                self.open_call("contextual");
                self.quoted(template);
                self.out.push(')');
            }
            SpecKind::Cardinality {
                cardinality,
                count,
                specs,
            } => {
                self.open_call(cardinality.call_name());
                self.out.push_str(&format!("{count}, ["));
                for (i, child) in specs.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.child(i, child)?;
                }
                self.out.push_str("])");
            }
            SpecKind::Expression { expression } => {
                self.open_call("expression");
                self.quoted(expression);
                self.out.push(')');
            }
            SpecKind::Template {
                template_id,
                params,
            } => {
                self.open_call("template");
                self.quoted(template_id);
                for (name, value) in params {
                    if !is_identifier(name) {
                        return Err(CodecError::InvalidIdentifier {
                            name: name.clone(),
                            what: "template parameter",
                        });
                    }
                    self.out.push_str(", ");
                    self.out.push_str(name);
                    self.out.push_str(" = ");
                    self.literal(value)?;
                }
                self.out.push(')');
            }
            SpecKind::Custom { name, payload } => {
                self.open_call("custom");
                self.quoted(name);
                self.out.push_str(", ");
                self.quoted(&payload.to_string());
                self.out.push(')');
            }
        }

        if self.options.include_metadata {
            if let Some(meta) = &spec.metadata {
                self.metadata(meta)?;
            }
        }
        Ok(())
    }

    fn child(&mut self, index: usize, spec: &Specification) -> Result<(), CodecError> {
        self.path.push(index);
        let result = self.spec(spec);
        self.path.pop();
        result
    }

    fn composite(&mut self, op: BoolOp, specs: &[Specification]) -> Result<(), CodecError> {
        self.out.push('(');
        match specs {
            [] => self.out.push_str(op.keyword()),
            [only] => {
                self.out.push_str(op.keyword());
                self.out.push(' ');
                self.child(0, only)?;
            }
            _ if op == BoolOp::Not => {
                self.out.push_str("NOT ");
                for (i, child) in specs.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.child(i, child)?;
                }
            }
            _ => {
                if self.options.pretty {
                    self.depth += 1;
                    self.newline();
                }
                for (i, child) in specs.iter().enumerate() {
                    if i > 0 {
                        if self.options.pretty {
                            self.newline();
                        } else {
                            self.out.push(' ');
                        }
                        self.out.push_str(op.keyword());
                        self.out.push(' ');
                    }
                    self.child(i, child)?;
                }
                if self.options.pretty {
                    self.depth -= 1;
                    self.newline();
                }
            }
        }
        self.out.push(')');
        Ok(())
    }

    fn function(&mut self, name: &str, args: &[Argument]) -> Result<(), CodecError> {
        if !is_identifier(name) || crate::types::is_reserved_call(name) {
            return Err(CodecError::InvalidIdentifier {
                name: name.to_owned(),
                what: "function",
            });
        }
        self.open_call(name);
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            match arg.kind {
                ValueType::Literal => self.literal(&arg.value)?,
                ValueType::FieldReference => {
                    let field = reference_name(&arg.value)?;
                    // Bare `true`/`false`/`null` would read back as literals.
                    if matches!(field, "true" | "false" | "null") {
                        self.out.push_str("${");
                        self.out.push_str(field);
                        self.out.push('}');
                    } else {
                        self.out.push_str(field);
                    }
                }
            }
        }
        self.out.push(')');
        Ok(())
    }

    /// Leaf field position. Names that read as combinator keywords are
    /// wrapped in `${}`.
    fn leaf_field(&mut self, field: &str) -> Result<(), CodecError> {
        check_identifier(field, "field")?;
        if BoolOp::from_keyword(field).is_some() {
            self.out.push_str("${");
            self.out.push_str(field);
            self.out.push('}');
        } else {
            self.out.push_str(field);
        }
        Ok(())
    }

    fn call_field(&mut self, field: &str) -> Result<(), CodecError> {
        check_identifier(field, "field")?;
        self.out.push_str(field);
        Ok(())
    }

    fn open_call(&mut self, name: &str) {
        self.out.push_str(name);
        self.out.push('(');
    }

    fn literal(&mut self, value: &Value) -> Result<(), CodecError> {
        if let Value::Float(v) = value {
            if !value.is_renderable() {
                return Err(CodecError::NonFiniteNumber { value: *v });
            }
        }
        self.out.push_str(&value.to_string());
        Ok(())
    }

    fn quoted(&mut self, s: &str) {
        // Writing into a String cannot fail.
        let _ = write_quoted(&mut self.out, s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        let width = self.depth * self.options.indent_width;
        self.out.extend(std::iter::repeat(' ').take(width));
    }

    fn metadata(&mut self, meta: &NodeMetadata) -> Result<(), CodecError> {
        let record = MetaComment {
            path: self.path.clone(),
            metadata: meta.clone(),
        };
        let json = serde_json::to_string(&record).map_err(|e| CodecError::Metadata {
            reason: e.to_string(),
        })?;
        let comment = format!("# {META_MARKER} {json}");
        match self.options.comment_position {
            CommentPosition::Inline => {
                self.out.push(' ');
                self.out.push_str(&comment);
                self.newline();
            }
            CommentPosition::Before | CommentPosition::After => self.detached.push(comment),
        }
        Ok(())
    }
}

fn check_identifier(name: &str, what: &'static str) -> Result<(), CodecError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(CodecError::InvalidIdentifier {
            name: name.to_owned(),
            what,
        })
    }
}

fn reference_name(value: &Value) -> Result<&str, CodecError> {
    match value {
        Value::String(name) if is_identifier(name) => Ok(name),
        other => Err(CodecError::InvalidIdentifier {
            name: other.to_string(),
            what: "field reference",
        }),
    }
}
