//! Hierarchical spec identifiers.
//!
//! A spec id is a dash-joined sequence of typed segments, each a single
//! letter (`E`, `F`, `T`, `S`) followed by a zero-padded number, strictly
//! ordered epic → feature → task → subtask with no type skipped:
//! `E01`, `E01-F02`, `E01-F02-T01`, `E01-F02-T01-S03`.
//!
//! The id doubles as the document's position in the tree: the parent id is
//! the id with its last segment removed, and the level is the type of the
//! last segment. Malformed ids are rejected, never repaired.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Hierarchy level of a spec document, ordered root-first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SpecLevel {
    #[default]
    Epic,
    Feature,
    Task,
    Subtask,
}

impl SpecLevel {
    /// Segment letter for this level.
    pub fn letter(self) -> char {
        match self {
            SpecLevel::Epic => 'E',
            SpecLevel::Feature => 'F',
            SpecLevel::Task => 'T',
            SpecLevel::Subtask => 'S',
        }
    }

    /// Level for a segment letter, if recognized.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'E' => Some(SpecLevel::Epic),
            'F' => Some(SpecLevel::Feature),
            'T' => Some(SpecLevel::Task),
            'S' => Some(SpecLevel::Subtask),
            _ => None,
        }
    }

    /// Tree depth of this level (epic = 0, subtask = 3).
    pub fn depth(self) -> usize {
        self as usize
    }
}

impl Display for SpecLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SpecLevel::Epic => "epic",
            SpecLevel::Feature => "feature",
            SpecLevel::Task => "task",
            SpecLevel::Subtask => "subtask",
        };
        f.write_str(name)
    }
}

/// One typed segment of a spec id (`T01`).
///
/// The zero-pad width is preserved so an id renders back exactly as it was
/// written in the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub level: SpecLevel,
    pub number: u32,
    width: usize,
}

impl Segment {
    /// Parse a single segment (`E01`, `F123`). Rejects anything else.
    pub fn parse(text: &str) -> Result<Self, IdError> {
        let mut chars = text.chars();
        let Some(letter) = chars.next() else {
            return Err(IdError::EmptySegment);
        };
        let Some(level) = SpecLevel::from_letter(letter) else {
            return Err(IdError::UnknownLetter {
                segment: text.to_string(),
                letter,
            });
        };
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdError::BadNumber {
                segment: text.to_string(),
            });
        }
        let number = digits.parse::<u32>().map_err(|_| IdError::BadNumber {
            segment: text.to_string(),
        })?;
        Ok(Self {
            level,
            number,
            width: digits.len(),
        })
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{:0width$}",
            self.level.letter(),
            self.number,
            width = self.width
        )
    }
}

/// A validated hierarchical spec id.
///
/// Construction always goes through [`SpecId::parse`] or [`SpecId::join`],
/// so every value of this type satisfies the segment grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecId {
    segments: Vec<Segment>,
}

impl SpecId {
    /// Parse a full hierarchical id (`E01-F02-T01`).
    pub fn parse(id: &str) -> Result<Self, IdError> {
        if id.is_empty() {
            return Err(IdError::Empty);
        }
        let mut segments = Vec::new();
        for part in id.split('-') {
            let segment = Segment::parse(part)?;
            // Each segment must sit exactly one level below the previous one,
            // starting at epic. This rejects wrong order, duplicate types,
            // and gaps in the chain in one check.
            if segment.level.depth() != segments.len() {
                return Err(IdError::OutOfOrder {
                    id: id.to_string(),
                    segment: part.to_string(),
                });
            }
            segments.push(segment);
        }
        Ok(Self { segments })
    }

    /// Append a single local segment to an optional parent id.
    ///
    /// `join(None, "E01")` builds a root id; `join(Some(E01-F02), "T01")`
    /// builds `E01-F02-T01`. The segment's level must sit exactly one level
    /// below the parent.
    pub fn join(parent: Option<&SpecId>, local: &str) -> Result<Self, IdError> {
        let segment = Segment::parse(local)?;
        let expected_depth = parent.map_or(0, |p| p.depth() + 1);
        if segment.level.depth() != expected_depth {
            return Err(IdError::OutOfOrder {
                id: match parent {
                    Some(p) => format!("{p}-{local}"),
                    None => local.to_string(),
                },
                segment: local.to_string(),
            });
        }
        let mut segments = parent.map_or_else(Vec::new, |p| p.segments.clone());
        segments.push(segment);
        Ok(Self { segments })
    }

    /// Level of this id: the type of its last segment.
    pub fn level(&self) -> SpecLevel {
        // Invariant: segments is never empty.
        self.segments[self.segments.len() - 1].level
    }

    /// Tree depth (epic = 0, subtask = 3).
    pub fn depth(&self) -> usize {
        self.segments.len() - 1
    }

    /// Parent id with the last segment removed; `None` for an epic.
    pub fn parent(&self) -> Option<SpecId> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(SpecId {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The last segment rendered on its own (`T01`).
    pub fn local(&self) -> String {
        self.segments[self.segments.len() - 1].to_string()
    }

    /// The segments of this id, root-first.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl Display for SpecId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for SpecId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpecId::parse(s)
    }
}

/// Sibling ordering used for all deterministic tree output: segment letter
/// rank first, then numeric value ascending, lexical rendering as the final
/// tie-break (only reachable when two ids differ in zero-pad width).
impl Ord for SpecId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        for (a, b) in self.segments.iter().zip(other.segments.iter()) {
            let ord = (a.level, a.number).cmp(&(b.level, b.number));
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        self.segments
            .len()
            .cmp(&other.segments.len())
            .then_with(|| self.to_string().cmp(&other.to_string()))
    }
}

impl PartialOrd for SpecId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Why an id failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("empty identifier")]
    Empty,
    #[error("empty segment")]
    EmptySegment,
    #[error("unknown segment letter `{letter}` in `{segment}`")]
    UnknownLetter { segment: String, letter: char },
    #[error("segment `{segment}` has no valid number")]
    BadNumber { segment: String },
    #[error("segment `{segment}` is out of order in `{id}`")]
    OutOfOrder { id: String, segment: String },
}
