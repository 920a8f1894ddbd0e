//! Longest-matching-block sequence comparison.
//!
//! [`SequenceMatcher`] finds, recursively, the longest contiguous run that
//! two sequences share, then matches the pieces to the left and right of
//! it the same way. The resulting matching blocks drive both the
//! similarity [`ratio`](SequenceMatcher::ratio) and the edit
//! [`opcodes`](SequenceMatcher::opcodes) behind a unified diff.
//!
//! Long second sequences get *auto-junk* treatment: once `b` has at least
//! 200 elements, any element occurring in more than `len(b) / 100 + 1`
//! positions is left out of the index, so it can never anchor a match by
//! itself. It can still extend a match found through other elements.
//! Without this, comparing pages of prose would anchor on spaces and
//! common letters and run quadratically.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Sequences shorter than this are indexed in full.
const AUTOJUNK_MIN_LEN: usize = 200;

/// A run `a[a_start..a_start + len] == b[b_start..b_start + len]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Match {
    /// Start of the run in `a`.
    pub a_start: usize,
    /// Start of the run in `b`.
    pub b_start: usize,
    /// Run length.
    pub len: usize,
}

/// Kind of an edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpTag {
    /// `a[a_range] == b[b_range]`.
    Equal,
    /// `a[a_range]` is replaced by `b[b_range]`.
    Replace,
    /// `a[a_range]` is removed; `b_range` is empty.
    Delete,
    /// `b[b_range]` is added; `a_range` is empty.
    Insert,
}

/// One edit operation turning a slice of `a` into a slice of `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode {
    /// What kind of edit this is.
    pub tag: OpTag,
    /// Start of the affected range in `a`.
    pub a_start: usize,
    /// End (exclusive) of the affected range in `a`.
    pub a_end: usize,
    /// Start of the affected range in `b`.
    pub b_start: usize,
    /// End (exclusive) of the affected range in `b`.
    pub b_end: usize,
}

impl Opcode {
    const fn new(tag: OpTag, a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> Self {
        Self {
            tag,
            a_start,
            a_end,
            b_start,
            b_end,
        }
    }
}

/// Compares two sequences by their longest matching blocks.
///
/// Built once per pair; the index over `b` and the matching blocks are
/// computed at construction.
#[derive(Debug, Clone)]
pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    blocks: Vec<Match>,
}

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    /// Match `a` against `b` with auto-junk enabled.
    #[must_use]
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        Self::with_autojunk(a, b, true)
    }

    /// Match `a` against `b`, choosing whether popular elements of a long
    /// `b` are dropped from the index.
    #[must_use]
    pub fn with_autojunk(a: &'a [T], b: &'a [T], autojunk: bool) -> Self {
        let index = BIndex::build(b, autojunk);
        let blocks = matching_blocks(a, b, &index);
        Self { a, b, blocks }
    }

    /// Non-adjacent matching blocks in increasing order, terminated by a
    /// zero-length sentinel at `(len(a), len(b))`.
    #[must_use]
    pub fn matching_blocks(&self) -> &[Match] {
        &self.blocks
    }

    /// Total number of matched elements.
    #[must_use]
    pub fn matched_len(&self) -> usize {
        self.blocks.iter().map(|m| m.len).sum()
    }

    /// Similarity in `[0, 1]`: `2 * matched / (len(a) + len(b))`, or `1.0`
    /// when both sequences are empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        2.0 * self.matched_len() as f64 / total as f64
    }

    /// Edit operations that turn `a` into `b`, covering both sequences
    /// end to end.
    #[must_use]
    pub fn opcodes(&self) -> Vec<Opcode> {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        for m in &self.blocks {
            let tag = match (i < m.a_start, j < m.b_start) {
                (true, true) => Some(OpTag::Replace),
                (true, false) => Some(OpTag::Delete),
                (false, true) => Some(OpTag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                out.push(Opcode::new(tag, i, m.a_start, j, m.b_start));
            }
            i = m.a_start + m.len;
            j = m.b_start + m.len;
            if m.len > 0 {
                out.push(Opcode::new(OpTag::Equal, m.a_start, i, m.b_start, j));
            }
        }
        out
    }

    /// Opcodes grouped into hunks with up to `context` equal elements
    /// around each change.
    ///
    /// Identical inputs produce no groups.
    #[must_use]
    pub fn grouped_opcodes(&self, context: usize) -> Vec<Vec<Opcode>> {
        let mut codes = self.opcodes();
        if codes.is_empty() {
            codes.push(Opcode::new(OpTag::Equal, 0, 1, 0, 1));
        }

        if let Some(first) = codes.first_mut().filter(|c| c.tag == OpTag::Equal) {
            first.a_start = first.a_start.max(first.a_end.saturating_sub(context));
            first.b_start = first.b_start.max(first.b_end.saturating_sub(context));
        }
        if let Some(last) = codes.last_mut().filter(|c| c.tag == OpTag::Equal) {
            last.a_end = last.a_end.min(last.a_start + context);
            last.b_end = last.b_end.min(last.b_start + context);
        }

        let mut groups = Vec::new();
        let mut group = Vec::new();
        for mut code in codes {
            if code.tag == OpTag::Equal && code.a_end - code.a_start > context * 2 {
                group.push(Opcode::new(
                    OpTag::Equal,
                    code.a_start,
                    code.a_end.min(code.a_start + context),
                    code.b_start,
                    code.b_end.min(code.b_start + context),
                ));
                groups.push(std::mem::take(&mut group));
                code.a_start = code.a_start.max(code.a_end.saturating_sub(context));
                code.b_start = code.b_start.max(code.b_end.saturating_sub(context));
            }
            group.push(code);
        }
        if !(group.is_empty() || (group.len() == 1 && group[0].tag == OpTag::Equal)) {
            groups.push(group);
        }
        groups
    }
}

/// Positions of each indexed element of `b`, ascending.
struct BIndex<'a, T> {
    positions: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Eq + Hash> BIndex<'a, T> {
    fn build(b: &'a [T], autojunk: bool) -> Self {
        let mut positions: HashMap<&'a T, Vec<usize>> = HashMap::new();
        for (j, elt) in b.iter().enumerate() {
            positions.entry(elt).or_default().push(j);
        }

        if autojunk && b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            let popular: HashSet<&'a T> = positions
                .iter()
                .filter(|(_, idx)| idx.len() > limit)
                .map(|(elt, _)| *elt)
                .collect();
            positions.retain(|elt, _| !popular.contains(elt));
        }

        Self { positions }
    }

    fn get(&self, elt: &T) -> &[usize] {
        self.positions.get(elt).map_or(&[], Vec::as_slice)
    }
}

/// Longest run of `a[alo..ahi]` matching `b[blo..bhi]`.
///
/// Among equally long runs, the one starting earliest in `a` wins, then
/// the one starting earliest in `b`. The run is anchored through indexed
/// elements and then widened over any equal neighbours, popular or not.
fn longest_match<T: Eq + Hash>(
    a: &[T],
    b: &[T],
    index: &BIndex<'_, T>,
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> Match {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);

    // run_ending_at[j] = length of the match ending at a[i - 1], b[j].
    let mut run_ending_at: HashMap<usize, usize> = HashMap::new();
    for (i, elt) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        for &j in index.get(elt) {
            if j < blo {
                continue;
            }
            if j >= bhi {
                break;
            }
            let k = j
                .checked_sub(1)
                .and_then(|prev| run_ending_at.get(&prev))
                .copied()
                .unwrap_or(0)
                + 1;
            next.insert(j, k);
            if k > best_len {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_len = k;
            }
        }
        run_ending_at = next;
    }

    while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
        best_i -= 1;
        best_j -= 1;
        best_len += 1;
    }
    while best_i + best_len < ahi
        && best_j + best_len < bhi
        && a[best_i + best_len] == b[best_j + best_len]
    {
        best_len += 1;
    }

    Match {
        a_start: best_i,
        b_start: best_j,
        len: best_len,
    }
}

/// All matching blocks, collapsed where adjacent, plus the sentinel.
fn matching_blocks<T: Eq + Hash>(a: &[T], b: &[T], index: &BIndex<'_, T>) -> Vec<Match> {
    let mut found = Vec::new();
    let mut queue = vec![((0, a.len()), (0, b.len()))];
    while let Some(((alo, ahi), (blo, bhi))) = queue.pop() {
        let m = longest_match(a, b, index, (alo, ahi), (blo, bhi));
        if m.len == 0 {
            continue;
        }
        found.push(m);
        if alo < m.a_start && blo < m.b_start {
            queue.push(((alo, m.a_start), (blo, m.b_start)));
        }
        let (a_end, b_end) = (m.a_start + m.len, m.b_start + m.len);
        if a_end < ahi && b_end < bhi {
            queue.push(((a_end, ahi), (b_end, bhi)));
        }
    }
    found.sort_unstable();

    let mut collapsed: Vec<Match> = Vec::with_capacity(found.len() + 1);
    for m in found {
        match collapsed.last_mut() {
            Some(prev)
                if prev.a_start + prev.len == m.a_start && prev.b_start + prev.len == m.b_start =>
            {
                prev.len += m.len;
            }
            _ => collapsed.push(m),
        }
    }
    collapsed.push(Match {
        a_start: a.len(),
        b_start: b.len(),
        len: 0,
    });
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn ratio(a: &str, b: &str) -> f64 {
        let (a, b) = (chars(a), chars(b));
        SequenceMatcher::new(&a, &b).ratio()
    }

    #[test]
    fn identical_ratio_is_one() {
        assert!((ratio("hello world", "hello world") - 1.0).abs() < f64::EPSILON);
        assert!((ratio("", "") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn disjoint_ratio_is_zero() {
        assert!(ratio("abc", "xyz").abs() < f64::EPSILON);
        assert!(ratio("", "xyz").abs() < f64::EPSILON);
    }

    #[test]
    fn known_ratios() {
        // Classic examples with well-known reference values.
        assert!((ratio("abcd", "bcde") - 0.75).abs() < 1e-12);
        let r = ratio(
            "private Thread currentThread;",
            "private volatile Thread currentThread;",
        );
        assert!((r - 0.865_671_641_791_044_8).abs() < 1e-12);
    }

    #[test]
    fn longest_match_prefers_earliest() {
        let (a, b) = (chars(" abcd"), chars("abcd abcd"));
        let m = SequenceMatcher::with_autojunk(&a, &b, false);
        assert_eq!(
            m.matching_blocks()[0],
            Match {
                a_start: 0,
                b_start: 4,
                len: 5
            }
        );
    }

    #[test]
    fn matching_blocks_end_with_sentinel() {
        let (a, b) = (chars("abxcd"), chars("abcd"));
        let m = SequenceMatcher::new(&a, &b);
        let blocks = m.matching_blocks();
        assert_eq!(
            blocks,
            &[
                Match { a_start: 0, b_start: 0, len: 2 },
                Match { a_start: 3, b_start: 2, len: 2 },
                Match { a_start: 5, b_start: 4, len: 0 },
            ]
        );
    }

    #[test]
    fn opcodes_cover_both_sequences() {
        let (a, b) = (chars("qabxcd"), chars("abycdf"));
        let ops = SequenceMatcher::new(&a, &b).opcodes();
        let tags: Vec<_> = ops.iter().map(|o| o.tag).collect();
        assert_eq!(
            tags,
            vec![
                OpTag::Delete,
                OpTag::Equal,
                OpTag::Replace,
                OpTag::Equal,
                OpTag::Insert
            ]
        );
        assert_eq!(ops[0], Opcode::new(OpTag::Delete, 0, 1, 0, 0));
        assert_eq!(ops[2], Opcode::new(OpTag::Replace, 3, 4, 2, 3));
        assert_eq!(ops[4], Opcode::new(OpTag::Insert, 6, 6, 5, 6));
    }

    #[test]
    fn grouped_opcodes_trim_context() {
        let a: Vec<u32> = (0..20).collect();
        let mut b = a.clone();
        b[10] = 99;
        let groups = SequenceMatcher::new(&a, &b).grouped_opcodes(3);
        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert_eq!(g.first().map(|o| (o.a_start, o.a_end)), Some((7, 10)));
        assert_eq!(g.last().map(|o| (o.a_start, o.a_end)), Some((11, 14)));
    }

    #[test]
    fn grouped_opcodes_split_distant_changes() {
        let a: Vec<u32> = (0..40).collect();
        let mut b = a.clone();
        b[5] = 100;
        b[30] = 101;
        let groups = SequenceMatcher::new(&a, &b).grouped_opcodes(3);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn identical_sequences_have_no_groups() {
        let a = chars("same");
        assert!(SequenceMatcher::new(&a, &a).grouped_opcodes(3).is_empty());
        let empty: Vec<char> = Vec::new();
        assert!(SequenceMatcher::new(&empty, &empty).grouped_opcodes(3).is_empty());
    }

    #[test]
    fn autojunk_only_applies_to_long_sequences() {
        // 'x' is popular in b (300 > 300 / 100 + 1) and cannot anchor a
        // match. Nothing else anchors one either, so nothing matches.
        let b = vec!['x'; 300];
        let a = vec!['z', 'x'];
        assert_eq!(SequenceMatcher::new(&a, &b).matched_len(), 0);
        assert_eq!(SequenceMatcher::with_autojunk(&a, &b, false).matched_len(), 1);

        let short_b = vec!['x'; 199];
        assert_eq!(SequenceMatcher::new(&a, &short_b).matched_len(), 1);
    }

    #[test]
    fn popular_elements_extend_matches() {
        // 'y' anchors the match, and the popular spaces around it in both
        // sequences are absorbed by extension.
        let mut b = vec![' '; 250];
        b[100] = 'y';
        let a = chars("  y  ");
        let m = SequenceMatcher::new(&a, &b);
        assert_eq!(m.matched_len(), 5);
    }
}
