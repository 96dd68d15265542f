//! Frontmatter extraction and metadata normalization.
//!
//! A spec document opens with a metadata block framed by `---` marker
//! lines, followed by free-form body text. This parser never fails: a
//! missing, unterminated, or unparseable block yields a defaulted
//! [`Metadata`] with the whole content as body, annotated with a
//! [`ParseIssue`]. Inside a well-formed block, comment lines and inline
//! `#` comments are stripped before the YAML parse (spec authors annotate
//! their metadata heavily), and values are extracted field by field so one
//! malformed value never poisons the rest.

use crate::error::ParseIssue;
use crate::metadata::{Metadata, Priority, SpecStatus};
use crate::spec_id::SpecLevel;
use serde::de::DeserializeOwned;
use serde_yaml::Mapping;
use std::collections::BTreeMap;

/// Marker line framing the metadata block.
const BLOCK_MARKER: &str = "---";

/// Result of parsing one raw document. Always usable; `issue` records any
/// recovery that happened along the way.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub metadata: Metadata,
    pub body: String,
    pub issue: Option<ParseIssue>,
}

/// Cheap content checksum gating "did anything change" decisions.
pub fn content_checksum(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Parse a raw document into normalized metadata plus body.
pub fn parse_document(content: &str) -> ParsedDocument {
    let (yaml, body) = match split_frontmatter(content) {
        Split::NoBlock => {
            return recovered(
                content,
                "document does not start with a metadata block".to_string(),
            );
        }
        Split::Unterminated => {
            return recovered(content, "metadata block is never terminated".to_string());
        }
        Split::Block { yaml, body } => (yaml, body),
    };

    let cleaned = strip_comments(yaml);
    if cleaned.trim().is_empty() {
        // An empty block is well-formed; required-field validation upstream
        // decides whether the document can register.
        return ParsedDocument {
            metadata: Metadata::default(),
            body: body.to_string(),
            issue: None,
        };
    }

    let mut map: Mapping = match serde_yaml::from_str(&cleaned) {
        Ok(map) => map,
        Err(e) => {
            return ParsedDocument {
                metadata: Metadata::default(),
                body: body.to_string(),
                issue: Some(ParseIssue::MissingOrMalformedMetadata(e.to_string())),
            };
        }
    };

    let metadata = Metadata {
        id: take_field(&mut map, "id"),
        title: take_field(&mut map, "title"),
        kind: take_field::<SpecLevel>(&mut map, "kind"),
        status: take_field::<SpecStatus>(&mut map, "status").unwrap_or_default(),
        priority: take_field::<Priority>(&mut map, "priority").unwrap_or_default(),
        created_at: take_field(&mut map, "created_at"),
        updated_at: take_field(&mut map, "updated_at"),
        parent: take_field(&mut map, "parent"),
        children: take_field(&mut map, "children").unwrap_or_default(),
        estimated_hours: take_field(&mut map, "estimated_hours"),
        actual_hours: take_field(&mut map, "actual_hours"),
        extra: preserve_extra(map),
    };

    ParsedDocument {
        metadata,
        body: body.to_string(),
        issue: None,
    }
}

fn recovered(body: &str, reason: String) -> ParsedDocument {
    ParsedDocument {
        metadata: Metadata::default(),
        body: body.to_string(),
        issue: Some(ParseIssue::MissingOrMalformedMetadata(reason)),
    }
}

enum Split<'a> {
    /// Document does not open with a marker line.
    NoBlock,
    /// Opening marker with no closing marker.
    Unterminated,
    Block { yaml: &'a str, body: &'a str },
}

/// Locate the `---` framed block at the top of the document.
fn split_frontmatter(content: &str) -> Split<'_> {
    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Split::NoBlock;
    };
    if first.trim_end() != BLOCK_MARKER {
        return Split::NoBlock;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == BLOCK_MARKER {
            let body_start = offset + line.len();
            return Split::Block {
                yaml: &content[yaml_start..offset],
                body: &content[body_start..],
            };
        }
        offset += line.len();
    }
    Split::Unterminated
}

/// Drop comment-only lines and trailing `# ...` comments (outside quotes).
fn strip_comments(yaml: &str) -> String {
    let mut out = String::with_capacity(yaml.len());
    for line in yaml.lines() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        out.push_str(strip_inline_comment(line));
        out.push('\n');
    }
    out
}

/// Truncate a line at the first unquoted `#` that begins a comment.
fn strip_inline_comment(line: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;
    let mut prev_is_space = true;
    for (i, c) in line.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if !in_single && !in_double && prev_is_space => {
                return line[..i].trim_end();
            }
            _ => {}
        }
        prev_is_space = c.is_whitespace();
    }
    line
}

/// Extract one known field. An absent key or a value of an unexpected shape
/// yields `None`; unexpected shapes are left in the map so they end up
/// preserved (uninterpreted) in `extra`.
fn take_field<T: DeserializeOwned>(map: &mut Mapping, key: &str) -> Option<T> {
    let value = map.get(key)?.clone();
    match serde_yaml::from_value::<T>(value) {
        Ok(parsed) => {
            map.remove(key);
            Some(parsed)
        }
        Err(_) => None,
    }
}

/// Keep whatever the schema did not consume, keyed by string. Non-string
/// keys are dropped; the format is scalars-at-the-top in practice.
fn preserve_extra(map: Mapping) -> BTreeMap<String, serde_yaml::Value> {
    map.into_iter()
        .filter_map(|(key, value)| key.as_str().map(|k| (k.to_string(), value)))
        .collect()
}
