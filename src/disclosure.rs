//! Progressive disclosure of long message bodies
//!
//! Bodies longer than the configured limit are shown truncated with an
//! ellipsis until the reader expands them.

use crate::transcript::MessageId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use unicode_segmentation::UnicodeSegmentation;

/// Default visible length before a body is truncated
pub const DEFAULT_MAX_VISIBLE: usize = 300;

/// Marker appended to truncated bodies
pub const ELLIPSIS: &str = "...";

/// Unit used to measure body length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationUnit {
    /// Unicode scalar values
    #[default]
    Chars,
    /// Extended grapheme clusters (an emoji sequence counts once)
    Graphemes,
}

impl FromStr for TruncationUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chars" | "char" => Ok(Self::Chars),
            "graphemes" | "grapheme" => Ok(Self::Graphemes),
            other => Err(format!("unknown truncation unit '{other}'")),
        }
    }
}

/// Decides how much of a message body is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisclosurePolicy {
    max_visible: usize,
    unit: TruncationUnit,
}

impl Default for DisclosurePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VISIBLE, TruncationUnit::Chars)
    }
}

impl DisclosurePolicy {
    pub fn new(max_visible: usize, unit: TruncationUnit) -> Self {
        Self { max_visible, unit }
    }

    /// Length of `body` in this policy's unit
    pub fn measure(&self, body: &str) -> usize {
        match self.unit {
            TruncationUnit::Chars => body.chars().count(),
            TruncationUnit::Graphemes => body.graphemes(true).count(),
        }
    }

    pub fn is_truncated(&self, body: &str) -> bool {
        self.measure(body) > self.max_visible
    }

    /// Text to show for `body` given its expand state
    pub fn display_text(&self, body: &str, expanded: bool) -> String {
        if expanded || !self.is_truncated(body) {
            return body.to_string();
        }
        let cut = self.prefix_byte_len(body);
        let mut text = String::with_capacity(cut + ELLIPSIS.len());
        text.push_str(body.get(..cut).unwrap_or(body));
        text.push_str(ELLIPSIS);
        text
    }

    /// Byte offset just past the first `max_visible` units
    fn prefix_byte_len(&self, body: &str) -> usize {
        let boundary = match self.unit {
            TruncationUnit::Chars => body.char_indices().nth(self.max_visible).map(|(i, _)| i),
            TruncationUnit::Graphemes => body
                .grapheme_indices(true)
                .nth(self.max_visible)
                .map(|(i, _)| i),
        };
        boundary.unwrap_or(body.len())
    }
}

/// Per-message expand/collapse flags. Absent ids are collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisclosureState {
    expanded: HashMap<MessageId, bool>,
}

impl DisclosureState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: &MessageId) -> bool {
        self.expanded.get(id).copied().unwrap_or(false)
    }

    /// Flip the flag for `id` and return the new value
    pub fn toggle_expand(&mut self, id: &MessageId) -> bool {
        let entry = self.expanded.entry(id.clone()).or_insert(false);
        *entry = !*entry;
        *entry
    }

    /// Forget every flag; called when the transcript is reset
    pub fn clear(&mut self) {
        self.expanded.clear();
    }
}
