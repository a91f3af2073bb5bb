//! Anchor markers and the two structural operations they enable.
//!
//! Every anchored block is delimited by a `%% BEGIN <id>` / `%% END <id>` pair, and every
//! structural block carries exactly one `%% INSERT <id>` marker where children are spliced.
//! Missing or out-of-order markers signal store/document divergence and are surfaced as
//! errors, never silently patched.

use crate::{Error, Result};

pub const INSERT_MARKER_PREFIX: &str = "%% INSERT ";

pub fn anchor_begin(document_id: &str) -> String {
    format!("%% BEGIN {document_id}")
}

pub fn anchor_end(document_id: &str) -> String {
    format!("%% END {document_id}")
}

pub fn insertion_marker(document_id: &str) -> String {
    format!("{INSERT_MARKER_PREFIX}{document_id}")
}

/// Splices `block` in front of the parent's insertion marker line, preserving the marker
/// (and its indentation) and inserting exactly one blank-line separator if none precedes
/// it. Removal strips the same separator again, so an insert followed by a remove restores
/// the document byte for byte.
pub fn insert_before_marker(content: &str, parent_document_id: &str, block: &str) -> Result<String> {
    let marker = insertion_marker(parent_document_id);
    let idx = content
        .find(&marker)
        .ok_or_else(|| Error::InsertionMarkerNotFound {
            document_id: parent_document_id.to_string(),
        })?;

    // Split at the start of the marker's line so its indentation stays attached to it.
    let line_start = content[..idx].rfind('\n').map(|p| p + 1).unwrap_or(0);
    let (before, rest) = content.split_at(line_start);

    let spacer = if before.is_empty() || before.ends_with("\n\n") {
        ""
    } else {
        "\n"
    };

    Ok(format!("{before}{spacer}{block}\n{rest}"))
}

/// Removes the anchored region for `document_id`: the half-open range from its begin marker
/// through its end marker inclusive, plus one trailing newline if present, plus the
/// blank-line separator insertion added.
pub fn remove_anchored_block(content: &str, document_id: &str) -> Result<String> {
    let begin = anchor_begin(document_id);
    let end = anchor_end(document_id);

    let begin_idx = content.find(&begin);
    let end_idx = content.find(&end);

    let (begin_idx, end_idx) = match (begin_idx, end_idx) {
        (None, None) => {
            return Err(Error::BlockNotFound {
                document_id: document_id.to_string(),
            });
        }
        (Some(b), Some(e)) if b <= e => (b, e),
        _ => {
            return Err(Error::MarkersOutOfOrder {
                document_id: document_id.to_string(),
            });
        }
    };

    let after_end = end_idx + end.len();
    let mut remainder = &content[after_end..];
    if let Some(stripped) = remainder.strip_prefix("\r\n") {
        remainder = stripped;
    } else if let Some(stripped) = remainder.strip_prefix('\n') {
        remainder = stripped;
    }

    let mut head = &content[..begin_idx];
    if head.ends_with("\n\n") {
        head = &head[..head.len() - 1];
    }

    Ok(format!("{head}{remainder}"))
}
