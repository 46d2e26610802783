//! Dialog text triage.
//!
//! The layout application words its modal dialogs freely, so classification
//! is a marker search plus a narrow look for a count next to known phrases.
//! Anything ambiguous stays ambiguous: an unparseable count is
//! [`LinkCount::Unknown`], never a guess.

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogKind {
    None,
    MissingLinks,
    MissingFonts,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkCount {
    Known(u32),
    Unknown,
}

impl fmt::Display for LinkCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkCount::Known(n) => write!(f, "{n}"),
            LinkCount::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogOutcome {
    pub kind: DialogKind,
    /// Only set for `MissingLinks`.
    pub count: Option<LinkCount>,
    pub raw_text: String,
}

const LINK_MARKERS: [&str; 3] = ["missing link", "links are missing", "link is missing"];
const FONT_MARKERS: [&str; 1] = ["missing font"];

pub fn classify(dialog_text: &str) -> DialogOutcome {
    let norm = normalize(dialog_text);

    let kind = if LINK_MARKERS.iter().any(|m| norm.contains(m)) {
        DialogKind::MissingLinks
    } else if FONT_MARKERS.iter().any(|m| norm.contains(m)) {
        DialogKind::MissingFonts
    } else {
        DialogKind::None
    };

    let count = match kind {
        DialogKind::MissingLinks => {
            Some(link_count(&norm).map_or(LinkCount::Unknown, LinkCount::Known))
        }
        _ => None,
    };

    DialogOutcome {
        kind,
        count,
        raw_text: dialog_text.to_string(),
    }
}

fn normalize(text: &str) -> String {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn bare(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}

fn integer(token: &str) -> Option<u32> {
    let t = bare(token);
    let signed = token.find(t).is_some_and(|at| token[..at].ends_with('-'));
    if signed || t.is_empty() || !t.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    t.parse().ok()
}

/// A count is the integer directly before or after a marker phrase:
/// "3 missing links", "contains 3 missing links", "2 links are missing",
/// "missing links: 4". The token after a marker only counts when the marker
/// does not end its sentence.
fn link_count(norm: &str) -> Option<u32> {
    let tokens: Vec<&str> = norm.split(' ').collect();
    let words: Vec<&str> = tokens.iter().map(|t| bare(t)).collect();

    for i in 0..words.len() {
        let Some(len) = marker_at(&words[i..]) else {
            continue;
        };
        let before = i
            .checked_sub(1)
            .map(|j| tokens[j])
            .filter(|t| !ends_sentence(t))
            .and_then(integer);
        let after = Some(tokens[i + len - 1])
            .filter(|t| !ends_sentence(t))
            .and_then(|_| tokens.get(i + len).copied())
            .and_then(integer);
        if let Some(n) = before.or(after) {
            return Some(n);
        }
    }
    None
}

/// Length in tokens of the link marker starting at `words[0]`, if any.
fn marker_at(words: &[&str]) -> Option<usize> {
    match words {
        ["missing", "link" | "links", ..] => Some(2),
        ["links", "are", "missing", ..] | ["link", "is", "missing", ..] => Some(3),
        _ => None,
    }
}

fn ends_sentence(token: &str) -> bool {
    token.ends_with(['.', '!', '?'])
}
