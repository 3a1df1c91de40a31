//! Line comments and the metadata records encoded in them.
//!
//! A metadata comment looks like `# @meta {"path":[0,1],"code":"AGE"}`. The
//! path addresses a specification by child indices from the root, so the
//! comment may sit anywhere in the text.

use serde::{Deserialize, Serialize};

use crate::types::{NodeMetadata, Specification};

use super::error::ParseError;

pub(crate) const META_MARKER: &str = "@meta";

/// A `#` comment found outside string literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Comment<'a> {
    /// Text after the `#`, up to the end of the line.
    pub(crate) text: &'a str,
    /// Byte offset of the `#`.
    pub(crate) offset: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MetaComment {
    pub(crate) path: Vec<usize>,
    #[serde(flatten)]
    pub(crate) metadata: NodeMetadata,
}

/// Find every line comment in `input`, skipping `#` characters inside string
/// literals.
pub(crate) fn scan_comments(input: &str) -> Vec<Comment<'_>> {
    // '#', '"' and '\\' are ASCII, so scanning bytes is safe for UTF-8 input.
    let bytes = input.as_bytes();
    let mut comments = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else if b == b'"' {
            in_string = true;
        } else if b == b'#' {
            let end = input[i..].find('\n').map_or(input.len(), |n| i + n);
            comments.push(Comment {
                text: &input[i + 1..end],
                offset: i,
            });
            i = end;
            continue;
        }
        i += 1;
    }
    comments
}

/// The JSON body of a metadata comment, if this comment is one.
pub(crate) fn meta_body<'a>(comment: &Comment<'a>) -> Option<&'a str> {
    comment
        .text
        .trim_start()
        .strip_prefix(META_MARKER)
        .map(str::trim)
}

/// Re-attach metadata comments to the specifications their paths address.
pub(crate) fn apply_metadata(input: &str, spec: &mut Specification) -> Result<(), ParseError> {
    for comment in scan_comments(input) {
        let Some(body) = meta_body(&comment) else {
            continue;
        };
        let meta: MetaComment = serde_json::from_str(body).map_err(|e| {
            ParseError::at_offset(input, comment.offset, format!("malformed metadata comment: {e}"))
        })?;
        let target = spec.descendant_mut(&meta.path).ok_or_else(|| {
            ParseError::at_offset(
                input,
                comment.offset,
                format!("metadata comment path {:?} does not address a node", meta.path),
            )
        })?;
        target.metadata = Some(meta.metadata);
    }
    Ok(())
}
