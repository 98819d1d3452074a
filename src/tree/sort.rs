//! Sibling ordering
//!
//! Natural comparison of display labels and the two-phase search that finds where a new
//! sibling belongs among already ordered siblings.

use crate::tree::node::NodeData;
use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;

/// Sibling count above which binary narrowing runs before the linear scan.
pub const DEFAULT_SEARCH_THRESHOLD: usize = 44;

#[derive(Debug, PartialEq, Eq)]
enum Chunk {
    Digits(String),
    Text(String),
}

fn chunks(normalized: &str) -> Vec<Chunk> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    for ch in normalized.chars() {
        let is_digit = ch.is_ascii_digit();
        if !current.is_empty() && is_digit != in_digits {
            out.push(finish(std::mem::take(&mut current), in_digits));
        }
        in_digits = is_digit;
        current.push(ch);
    }
    if !current.is_empty() {
        out.push(finish(current, in_digits));
    }
    out
}

fn finish(chunk: String, digits: bool) -> Chunk {
    if digits {
        Chunk::Digits(chunk)
    } else {
        Chunk::Text(chunk.to_lowercase())
    }
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Natural, case-insensitive comparison: digit runs compare by value, so `table2` sorts
/// before `table10`. Labels equal under this comparison fall back to their NFC text.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a: String = a.nfc().collect();
    let b: String = b.nfc().collect();
    let left = chunks(&a);
    let right = chunks(&b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ordering = match (l, r) {
            (Chunk::Digits(x), Chunk::Digits(y)) => compare_digits(x, y),
            (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    left.len().cmp(&right.len()).then_with(|| a.cmp(&b))
}

/// Order two siblings. Types flagged `sort_by_id` (columns) keep their server ordinal order.
pub fn sibling_cmp(a: &NodeData, b: &NodeData, by_id: bool) -> Ordering {
    if by_id {
        a.id.numeric_cmp(&b.id)
    } else {
        natural_cmp(&a.label, &b.label)
    }
}

/// Index of the first sibling that sorts strictly after the new node, or `None` to append.
///
/// `sorts_after(i)` reports whether sibling `i` belongs after the new node; siblings must
/// already be ordered. With more than `threshold` siblings the window is first halved by
/// binary narrowing until it holds at most `threshold / 2` candidates, then scanned
/// linearly.
pub fn insertion_index<F>(len: usize, threshold: usize, mut sorts_after: F) -> Option<usize>
where
    F: FnMut(usize) -> bool,
{
    let mut low = 0;
    let mut high = len;

    if len > threshold {
        let window = (threshold / 2).max(1);
        while high - low > window {
            let mid = low + (high - low) / 2;
            if sorts_after(mid) {
                high = mid;
            } else {
                low = mid + 1;
            }
        }
    }

    (low..high).find(|&i| sorts_after(i)).or_else(|| {
        if high < len {
            Some(high)
        } else {
            None
        }
    })
}

/// Sort freshly loaded children the way incremental inserts would place them.
pub fn sort_children(children: &mut [NodeData], by_id: impl Fn(&str) -> bool) {
    children.sort_by(|a, b| {
        let numeric = a.node_type == b.node_type && by_id(&a.node_type);
        sibling_cmp(a, b, numeric)
    });
}
