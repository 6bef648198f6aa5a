//! Decision histories.
//!
//! A [`Path`] is a finite, ordered sequence of [`Decision`]s, oldest first.
//! Paths are the keys of the policy trie and the histories it is queried
//! with. Two construction modes exist:
//!
//! - *context-free*: the most recent decisions of an exploration, regardless
//!   of which stack frame made them;
//! - *context-preserving*: only the decisions made in the same activation as
//!   an anchor point, stopping at the first foreign-context decision.
//!
//! The host produces decisions in execution order (most recent last);
//! constructors walk that chain backward and emit chronological order. Order
//! matters: the trie distinguishes `(a, b)` from `(b, a)`.

use std::fmt;
use std::ops::Index;

use crate::decision::Decision;
use crate::types::ContextId;

/// An ordered sequence of decisions, indexed from 0 (oldest) to `len - 1`
/// (most recent). Immutable once used as a trie key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    decisions: Vec<Decision>,
}

impl Path {
    /// Creates an empty path.
    pub fn new() -> Self {
        Path { decisions: Vec::new() }
    }

    /// Creates a path from decisions already in chronological order.
    pub fn from_decisions(decisions: Vec<Decision>) -> Self {
        Path { decisions }
    }

    /// Builds a context-free history from a host decision chain.
    ///
    /// Takes the most recent `max_size` decisions (all of them when
    /// `max_size` is `None`) and emits them oldest first.
    pub fn context_free(history: &[Decision], max_size: Option<usize>) -> Self {
        let take = match max_size {
            Some(max) => history.len().min(max),
            None => history.len(),
        };
        Path {
            decisions: history[history.len() - take..].to_vec(),
        }
    }

    /// Builds a context-preserving history from a host decision chain.
    ///
    /// Walks backward from the most recent decision and stops at the first
    /// decision whose context differs from `anchor`, or once `max_size`
    /// decisions have been collected. The result is in chronological order.
    pub fn context_preserving(history: &[Decision], anchor: ContextId, max_size: Option<usize>) -> Self {
        let mut decisions = Vec::new();
        for decision in history.iter().rev() {
            if let Some(max) = max_size {
                if decisions.len() >= max {
                    break;
                }
            }
            if decision.context != anchor {
                break;
            }
            decisions.push(*decision);
        }
        decisions.reverse();
        Path { decisions }
    }

    /// Returns the longest contiguous sub-sequence ending at `from_idx - 1`
    /// whose decisions all share the context of `self[from_idx]`, bounded by
    /// `max_size`. Returns an empty path when `from_idx` is 0 or out of range.
    pub fn ctx_preserving_suffix(&self, from_idx: usize, max_size: Option<usize>) -> Path {
        if from_idx == 0 || from_idx >= self.decisions.len() {
            return Path::new();
        }
        let anchor = self.decisions[from_idx].context;
        Path::context_preserving(&self.decisions[..from_idx], anchor, max_size)
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Decision> {
        self.decisions.get(index)
    }

    /// The most recent decision, if any.
    pub fn last(&self) -> Option<&Decision> {
        self.decisions.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Decision> {
        self.decisions.iter()
    }

    pub fn as_slice(&self) -> &[Decision] {
        &self.decisions
    }
}

impl Index<usize> for Path {
    type Output = Decision;

    fn index(&self, index: usize) -> &Decision {
        &self.decisions[index]
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Decision;
    type IntoIter = std::slice::Iter<'a, Decision>;

    fn into_iter(self) -> Self::IntoIter {
        self.decisions.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, decision) in self.decisions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", decision)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BranchId;

    fn dec(branch: u64, choice: u32, context: u64) -> Decision {
        Decision::new(BranchId::new(branch), choice, ContextId::new(context))
    }

    #[test]
    fn test_context_free_keeps_order() {
        let history = [dec(1, 0, 1), dec(2, 1, 1), dec(3, 0, 2)];
        let path = Path::context_free(&history, None);
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], dec(1, 0, 1));
        assert_eq!(path[2], dec(3, 0, 2));
    }

    #[test]
    fn test_context_free_bounded() {
        let history = [dec(1, 0, 1), dec(2, 1, 1), dec(3, 0, 2)];
        let path = Path::context_free(&history, Some(2));
        assert_eq!(path.len(), 2);
        // The *most recent* two, chronological order.
        assert_eq!(path[0], dec(2, 1, 1));
        assert_eq!(path[1], dec(3, 0, 2));
    }

    #[test]
    fn test_context_preserving_stops_at_foreign_frame() {
        let history = [dec(1, 0, 1), dec(2, 1, 2), dec(3, 0, 2), dec(4, 1, 2)];
        let path = Path::context_preserving(&history, ContextId::new(2), None);
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], dec(2, 1, 2));
        assert_eq!(path[2], dec(4, 1, 2));
        // Every decision shares the anchor's context.
        assert!(path.iter().all(|d| d.context == ContextId::new(2)));
    }

    #[test]
    fn test_context_preserving_bounded() {
        let history = [dec(1, 0, 5), dec(2, 0, 5), dec(3, 0, 5)];
        let path = Path::context_preserving(&history, ContextId::new(5), Some(2));
        assert_eq!(path.len(), 2);
        assert_eq!(path[0], dec(2, 0, 5));
    }

    #[test]
    fn test_context_preserving_anchor_mismatch() {
        let history = [dec(1, 0, 1), dec(2, 0, 1)];
        let path = Path::context_preserving(&history, ContextId::new(9), None);
        assert!(path.is_empty());
    }

    #[test]
    fn test_ctx_preserving_suffix() {
        // Frame 1: b1, b2; frame 2: b3; frame 1 again is *not* contiguous.
        let path = Path::from_decisions(vec![dec(1, 0, 1), dec(2, 1, 1), dec(3, 0, 2), dec(4, 0, 2)]);

        // Anchor at index 3 (frame 2): only the contiguous frame-2 run before it.
        let suffix = path.ctx_preserving_suffix(3, None);
        assert_eq!(suffix.len(), 1);
        assert_eq!(suffix[0], dec(3, 0, 2));

        // Anchor at index 1 (frame 1): the frame-1 decision before it.
        let suffix = path.ctx_preserving_suffix(1, None);
        assert_eq!(suffix.len(), 1);
        assert_eq!(suffix[0], dec(1, 0, 1));

        // Anchor at index 0: nothing precedes it.
        assert!(path.ctx_preserving_suffix(0, None).is_empty());

        // Out of range: empty, not a panic.
        assert!(path.ctx_preserving_suffix(17, None).is_empty());
    }

    #[test]
    fn test_display() {
        let path = Path::from_decisions(vec![dec(1, 0, 1), dec(2, 1, 1)]);
        assert_eq!(path.to_string(), "(b1:0, b2:1)");
        assert_eq!(Path::new().to_string(), "()");
    }
}
