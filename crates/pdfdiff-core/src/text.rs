//! Page text: header/footer band selection, normalization, similarity,
//! and unified-diff rendering.
//!
//! Texts are compared as character sequences with
//! [`SequenceMatcher`]; diffs are rendered line by line.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::sequence::{OpTag, SequenceMatcher};

/// Characters that render as nothing and are dropped before comparison:
/// soft hyphen, byte-order mark, zero-width space, zero-width non-joiner,
/// zero-width joiner, word joiner.
pub const INVISIBLE_CHARS: [char; 6] = [
    '\u{00AD}', '\u{FEFF}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}',
];

/// Lines of context around each hunk of a unified diff.
pub const DIFF_CONTEXT_LINES: usize = 3;

/// A positioned run of text on a page, in page units with `y` growing
/// downward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Top edge of the block.
    pub top: f64,
    /// Bottom edge of the block.
    pub bottom: f64,
    /// Block text.
    pub text: String,
}

/// Text extracted from one page: positioned blocks plus the page's full
/// plain text, used when no block survives the band cut.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    /// Page height in the same units as the block coordinates.
    pub height: f64,
    /// Positioned text blocks in reading order.
    pub blocks: Vec<TextBlock>,
    /// Full page text.
    pub full: String,
}

impl PageText {
    /// Page text without position information. Band selection always
    /// falls back to `text`.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            height: 0.0,
            blocks: Vec::new(),
            full: text.into(),
        }
    }
}

/// Join the text of blocks lying at least partly inside the vertical band
/// `[header_ratio * height, (1 - footer_ratio) * height]`.
///
/// A block is cut when it ends at or above the top of the band or starts
/// at or below its bottom. Blank blocks are skipped. Surviving blocks are
/// joined with newlines; if none survive, the page's full text is
/// returned instead.
#[must_use]
pub fn select_band_text(page: &PageText, header_ratio: f64, footer_ratio: f64) -> String {
    let top_cut = header_ratio * page.height;
    let bottom_cut = (1.0 - footer_ratio) * page.height;

    let parts: Vec<&str> = page
        .blocks
        .iter()
        .filter(|b| !(b.bottom <= top_cut || b.top >= bottom_cut))
        .map(|b| b.text.as_str())
        .filter(|t| !t.trim().is_empty())
        .collect();

    if parts.is_empty() {
        page.full.clone()
    } else {
        parts.join("\n")
    }
}

/// Normalize page text for comparison.
///
/// Applies NFKC, removes [`INVISIBLE_CHARS`], unifies line endings,
/// collapses every whitespace run within a line to a single space
/// (trimming line ends), and trims the result.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let composed: String = text
        .nfkc()
        .filter(|c| !INVISIBLE_CHARS.contains(c))
        .collect();
    let unified = composed.replace("\r\n", "\n").replace('\r', "\n");

    let lines: Vec<String> = unified
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    lines.join("\n").trim().to_owned()
}

/// Character-level similarity ratio in `[0, 1]`.
///
/// Two empty strings are identical (`1.0`); exactly one empty string
/// shares nothing (`0.0`).
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let a: Vec<char> = a.chars().collect();
            let b: Vec<char> = b.chars().collect();
            SequenceMatcher::new(&a, &b).ratio()
        }
    }
}

/// Render a line-oriented unified diff of `a` against `b`.
///
/// Every output line ends with `\n`. Identical inputs produce an empty
/// string; otherwise the output starts with `--- from_label` /
/// `+++ to_label` headers followed by `@@` hunks with `context` lines of
/// context.
#[must_use]
pub fn unified_diff(a: &str, b: &str, from_label: &str, to_label: &str, context: usize) -> String {
    let a_lines: Vec<&str> = a.lines().collect();
    let b_lines: Vec<&str> = b.lines().collect();
    let matcher = SequenceMatcher::new(&a_lines, &b_lines);

    let mut out = String::new();
    for (n, group) in matcher.grouped_opcodes(context).iter().enumerate() {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        if n == 0 {
            let _ = writeln!(out, "--- {from_label}");
            let _ = writeln!(out, "+++ {to_label}");
        }
        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            format_range(first.a_start, last.a_end),
            format_range(first.b_start, last.b_end),
        );
        for op in group {
            let removed = &a_lines[op.a_start..op.a_end];
            let added = &b_lines[op.b_start..op.b_end];
            match op.tag {
                OpTag::Equal => push_lines(&mut out, ' ', removed),
                OpTag::Delete => push_lines(&mut out, '-', removed),
                OpTag::Insert => push_lines(&mut out, '+', added),
                OpTag::Replace => {
                    push_lines(&mut out, '-', removed);
                    push_lines(&mut out, '+', added);
                }
            }
        }
    }
    out
}

fn push_lines(out: &mut String, prefix: char, lines: &[&str]) {
    for line in lines {
        out.push(prefix);
        out.push_str(line);
        out.push('\n');
    }
}

/// Hunk range as `start,len` (1-based), `start` alone for one line, and
/// the line *before* the hunk for an empty range.
fn format_range(start: usize, stop: usize) -> String {
    let len = stop - start;
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{len}", start + 1),
    }
}
