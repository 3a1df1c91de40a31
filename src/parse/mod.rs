//! DSL text to [`Specification`].

mod comments;
mod error;
mod grammar;

use tracing::trace;

use crate::types::Specification;

pub use error::ParseError;

pub(crate) use comments::{MetaComment, META_MARKER};
pub(crate) use error::locate;
pub(crate) use grammar::is_identifier;

/// Parse DSL text into a [`Specification`].
///
/// Returns `Ok(None)` when the input holds nothing but whitespace and
/// comments. Metadata comments (`# @meta {...}`) are re-attached to the
/// specifications their paths address.
///
/// # Errors
///
/// Returns [`ParseError`] with the line and column of the first problem if
/// the input is not valid DSL syntax or a metadata comment is malformed.
pub fn parse(input: &str) -> Result<Option<Specification>, ParseError> {
    use winnow::Parser;
    let parsed = grammar::dsl.parse(grammar::input(input)).map_err(|e| {
        let offset = e.offset();
        let detail = e.inner().to_string();
        let message = if !detail.is_empty() {
            detail
        } else {
            match input[offset..].chars().next() {
                Some(c) => format!("unexpected '{c}'"),
                None => "unexpected end of input".to_owned(),
            }
        };
        ParseError::at_offset(input, offset, message)
    })?;

    let Some(mut spec) = parsed else {
        trace!("dsl input is empty");
        return Ok(None);
    };
    comments::apply_metadata(input, &mut spec)?;
    trace!(nodes = spec.count(), "parsed dsl");
    Ok(Some(spec))
}
