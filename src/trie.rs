//! The branch policy trie.
//!
//! A [`PolicyTrie`] maps decision histories to sets of recommended choices.
//! Keys are inserted in chronological order (oldest decision first), so the
//! trie encodes decision *prefixes*. Lookup, however, matches the *suffix* of
//! a live history against any root-to-terminal path by walking the terminal
//! upward through parent links. The asymmetry is intentional: the policy is
//! most predictive near the branch being decided, and the prefix portion of a
//! trace varies with input size while its suffix (local to the current
//! procedure) is stable.
//!
//! Nodes are arena-allocated and identified by integer indices; the parent
//! link is an index and the child map goes `Decision -> index`, so there are
//! no language-level cycles and the structure serializes trivially
//! (see the [`io`][crate::io] module).
//!
//! # Invariants
//!
//! - For every node `n != root` with parent `p`: `p.edges[n.label] == n`, and
//!   `end_index[n.label]` contains `n` iff `n` is a terminal.
//! - A node is a terminal iff its choice set is non-empty; a node may be both
//!   a terminal and have children.
//! - `choice_counts` tallies raw `put` calls, not distinct terminals.
//! - After [`TrieBuilder::build`] the trie is a pure value; no mutation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::decision::Decision;
use crate::path::Path;

/// Index of a node in the trie arena. The root is always index 0.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(0);

    pub(crate) fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    /// Arena index of the parent; `None` for the root.
    pub(crate) parent: Option<NodeId>,
    /// The decision labelling the edge from the parent into this node;
    /// `None` for the root.
    pub(crate) label: Option<Decision>,
    pub(crate) edges: HashMap<Decision, NodeId>,
    /// Recommended choices. Non-empty iff this node is a terminal.
    pub(crate) choices: BTreeSet<u32>,
}

impl Node {
    fn new(parent: Option<NodeId>, label: Option<Decision>) -> Self {
        Node {
            parent,
            label,
            edges: HashMap::new(),
            choices: BTreeSet::new(),
        }
    }
}

/// Builds a [`PolicyTrie`] from `(key, choice)` insertions.
#[derive(Debug)]
pub struct TrieBuilder {
    nodes: Vec<Node>,
    end_index: HashMap<Option<Decision>, Vec<NodeId>>,
    choice_counts: HashMap<u32, u64>,
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieBuilder {
    pub fn new() -> Self {
        TrieBuilder {
            nodes: vec![Node::new(None, None)],
            end_index: HashMap::new(),
            choice_counts: HashMap::new(),
        }
    }

    /// Inserts `choice` at the terminal reached by following `key` from the
    /// root, creating intermediate nodes as needed. Only the terminal
    /// receives the choice; intermediate nodes are pure structure.
    ///
    /// An empty key targets the root itself, which then becomes a terminal
    /// indexed under the `None` edge label.
    ///
    /// Repeated insertion of an identical `(key, choice)` pair leaves the
    /// trie structurally unchanged but still increments the choice counter:
    /// counts express frequency of recommendation, not set cardinality.
    pub fn put(&mut self, key: &Path, choice: u32) -> &mut Self {
        let mut current = NodeId::ROOT;
        for decision in key {
            current = match self.nodes[current.index()].edges.get(decision) {
                Some(&child) => child,
                None => {
                    let child = NodeId::new(self.nodes.len());
                    self.nodes.push(Node::new(Some(current), Some(*decision)));
                    self.nodes[current.index()].edges.insert(*decision, child);
                    child
                }
            };
        }

        self.nodes[current.index()].choices.insert(choice);

        let terminals = self.end_index.entry(key.last().copied()).or_default();
        if !terminals.contains(&current) {
            terminals.push(current);
        }

        *self.choice_counts.entry(choice).or_insert(0) += 1;
        self
    }

    /// Freezes the builder into an immutable trie.
    pub fn build(self) -> PolicyTrie {
        PolicyTrie {
            nodes: self.nodes,
            end_index: self.end_index,
            choice_counts: self.choice_counts,
        }
    }
}

/// An immutable branch policy: histories in, recommended choice sets out.
#[derive(Debug, Clone)]
pub struct PolicyTrie {
    pub(crate) nodes: Vec<Node>,
    pub(crate) end_index: HashMap<Option<Decision>, Vec<NodeId>>,
    pub(crate) choice_counts: HashMap<u32, u64>,
}

impl PolicyTrie {
    /// An empty policy (no recommendations anywhere).
    pub fn empty() -> Self {
        TrieBuilder::new().build()
    }

    /// Number of nodes in the arena, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of terminals (nodes with a non-empty choice set).
    pub fn terminal_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.choices.is_empty()).count()
    }

    /// How many times `choice` was inserted, over all `put` calls.
    pub fn count_for_choice(&self, choice: u32) -> u64 {
        self.choice_counts.get(&choice).copied().unwrap_or(0)
    }

    /// The central query: the union of choice sets over the terminals whose
    /// entire root-to-terminal key matches a suffix of `history`, restricted
    /// to the terminals of maximal key length.
    ///
    /// Candidate terminals are those whose incoming edge equals the last
    /// decision of `history` (the root terminal, under the `None` label, when
    /// the history is empty). Each candidate is walked upward through its
    /// parents, pairing each incoming edge with the corresponding decision
    /// from the end of `history`. A pair mismatch fails the candidate, and so
    /// does the history running out before the root is reached: short
    /// histories are a non-match, never an error.
    ///
    /// Returns the empty set when no candidate matches. Match length is
    /// measured in edges, so a single-decision match has length 1.
    pub fn choices_for_longest_suffix(&self, history: &Path) -> BTreeSet<u32> {
        let last = history.last().copied();
        let Some(terminals) = self.end_index.get(&last) else {
            return BTreeSet::new();
        };

        let mut max_len: Option<usize> = None;
        let mut matched: Vec<NodeId> = Vec::new();

        for &terminal in terminals {
            let Some(len) = self.suffix_match_length(terminal, history) else {
                continue;
            };
            match max_len {
                Some(best) if len < best => {}
                Some(best) if len == best => matched.push(terminal),
                _ => {
                    max_len = Some(len);
                    matched.clear();
                    matched.push(terminal);
                }
            }
        }

        let mut choices = BTreeSet::new();
        for terminal in matched {
            choices.extend(self.nodes[terminal.index()].choices.iter().copied());
        }
        choices
    }

    /// Walks from `terminal` up to the root, pairing edge labels with
    /// `history` from its end. Returns the matched edge count, or `None` if a
    /// pair differs or the history is exhausted first.
    fn suffix_match_length(&self, terminal: NodeId, history: &Path) -> Option<usize> {
        let mut current = terminal;
        let mut depth = 0;
        while let Some(label) = self.nodes[current.index()].label {
            if depth >= history.len() {
                return None;
            }
            if label != history[history.len() - 1 - depth] {
                return None;
            }
            depth += 1;
            // Labelled nodes always have a parent.
            current = self.nodes[current.index()].parent?;
        }
        Some(depth)
    }

    fn collect_paths(&self, node: NodeId, prefix: &mut Vec<Decision>, out: &mut Vec<String>) {
        let entry = &self.nodes[node.index()];
        if !entry.choices.is_empty() {
            let key = if prefix.is_empty() {
                "Empty".to_string()
            } else {
                prefix.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(",")
            };
            let choices = entry.choices.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(",");
            out.push(format!("{} --> {{{}}}", key, choices));
        }
        // Deterministic child order for a stable dump.
        let children: BTreeMap<String, (Decision, NodeId)> =
            entry.edges.iter().map(|(d, &id)| (d.to_string(), (*d, id))).collect();
        for (decision, child) in children.into_values() {
            prefix.push(decision);
            self.collect_paths(child, prefix, out);
            prefix.pop();
        }
    }
}

impl fmt::Display for PolicyTrie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        self.collect_paths(NodeId::ROOT, &mut Vec::new(), &mut lines);
        write!(f, "{}", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BranchId, ContextId};

    fn dec(branch: u64, choice: u32) -> Decision {
        Decision::new(BranchId::new(branch), choice, ContextId::new(0))
    }

    fn path(decisions: &[(u64, u32)]) -> Path {
        Path::from_decisions(decisions.iter().map(|&(b, c)| dec(b, c)).collect())
    }

    fn choices(values: &[u32]) -> BTreeSet<u32> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_put_reaches_terminal() {
        let mut builder = TrieBuilder::new();
        builder.put(&path(&[(1, 0), (2, 1)]), 7);
        let trie = builder.build();
        assert_eq!(trie.node_count(), 3);
        assert_eq!(trie.terminal_count(), 1);
        assert_eq!(trie.choices_for_longest_suffix(&path(&[(1, 0), (2, 1)])), choices(&[7]));
    }

    #[test]
    fn test_counts_are_raw_insertions() {
        let mut builder = TrieBuilder::new();
        builder.put(&path(&[(1, 0)]), 3);
        builder.put(&path(&[(1, 0)]), 3);
        builder.put(&path(&[(2, 1)]), 3);
        builder.put(&path(&[(2, 1)]), 5);
        let trie = builder.build();
        // Duplicate (key, choice) still counts.
        assert_eq!(trie.count_for_choice(3), 3);
        assert_eq!(trie.count_for_choice(5), 1);
        assert_eq!(trie.count_for_choice(42), 0);
        // Count conservation: sum over choices == number of puts.
        assert_eq!(trie.choice_counts.values().sum::<u64>(), 4);
    }

    #[test]
    fn test_lookup_matches_suffix() {
        let mut builder = TrieBuilder::new();
        builder.put(&path(&[(1, 0), (2, 1)]), 9);
        let trie = builder.build();
        // A longer history ending in the key still matches.
        let history = path(&[(5, 0), (7, 1), (1, 0), (2, 1)]);
        assert_eq!(trie.choices_for_longest_suffix(&history), choices(&[9]));
    }

    #[test]
    fn test_longest_match_dominates() {
        let mut builder = TrieBuilder::new();
        builder.put(&path(&[(2, 1)]), 1);
        builder.put(&path(&[(1, 0), (2, 1)]), 2);
        let trie = builder.build();
        // Both keys end the history; only the longer match's choices survive.
        let history = path(&[(1, 0), (2, 1)]);
        assert_eq!(trie.choices_for_longest_suffix(&history), choices(&[2]));
        // A history matching only the short key gets the short key's choices.
        let history = path(&[(9, 0), (2, 1)]);
        assert_eq!(trie.choices_for_longest_suffix(&history), choices(&[1]));
    }

    #[test]
    fn test_equal_length_ties_union() {
        // Two distinct sites with the same depth; a history ending in either
        // matches only that one, but a shared suffix merges recommendations.
        let mut builder = TrieBuilder::new();
        builder.put(&path(&[(2, 0)]), 1);
        builder.put(&path(&[(2, 0)]), 4);
        let trie = builder.build();
        assert_eq!(trie.choices_for_longest_suffix(&path(&[(2, 0)])), choices(&[1, 4]));
    }

    #[test]
    fn test_empty_key_targets_root() {
        let mut builder = TrieBuilder::new();
        builder.put(&Path::new(), 1);
        let trie = builder.build();
        assert_eq!(trie.node_count(), 1);
        assert_eq!(trie.terminal_count(), 1);
        // Empty history finds the root terminal.
        assert_eq!(trie.choices_for_longest_suffix(&Path::new()), choices(&[1]));
        // A non-empty history does not: its last decision is not indexed.
        assert!(trie.choices_for_longest_suffix(&path(&[(1, 0)])).is_empty());
    }

    #[test]
    fn test_empty_trie_answers_empty() {
        let trie = PolicyTrie::empty();
        assert!(trie.choices_for_longest_suffix(&Path::new()).is_empty());
        assert!(trie.choices_for_longest_suffix(&path(&[(1, 0)])).is_empty());
    }

    #[test]
    fn test_short_history_is_a_non_match() {
        let mut builder = TrieBuilder::new();
        builder.put(&path(&[(1, 0), (2, 0), (3, 0)]), 6);
        let trie = builder.build();
        // History ends in the terminal's edge but is shorter than the key:
        // the candidate fails without panicking.
        assert!(trie.choices_for_longest_suffix(&path(&[(3, 0)])).is_empty());
        assert!(trie.choices_for_longest_suffix(&path(&[(2, 0), (3, 0)])).is_empty());
        assert_eq!(
            trie.choices_for_longest_suffix(&path(&[(1, 0), (2, 0), (3, 0)])),
            choices(&[6])
        );
    }

    #[test]
    fn test_mismatch_fails_candidate() {
        let mut builder = TrieBuilder::new();
        builder.put(&path(&[(1, 0), (3, 0)]), 2);
        let trie = builder.build();
        // Same last decision, different predecessor.
        assert!(trie.choices_for_longest_suffix(&path(&[(1, 1), (3, 0)])).is_empty());
    }

    #[test]
    fn test_terminal_with_children() {
        let mut builder = TrieBuilder::new();
        builder.put(&path(&[(1, 0)]), 1);
        builder.put(&path(&[(1, 0), (2, 0)]), 2);
        let trie = builder.build();
        assert_eq!(trie.terminal_count(), 2);
        assert_eq!(trie.choices_for_longest_suffix(&path(&[(1, 0)])), choices(&[1]));
        assert_eq!(trie.choices_for_longest_suffix(&path(&[(1, 0), (2, 0)])), choices(&[2]));
    }

    #[test]
    fn test_display_dump() {
        let mut builder = TrieBuilder::new();
        builder.put(&Path::new(), 1);
        builder.put(&path(&[(1, 0), (2, 1)]), 3);
        let trie = builder.build();
        let dump = trie.to_string();
        assert!(dump.contains("Empty --> {1}"));
        assert!(dump.contains("b1:0,b2:1 --> {3}"));
    }
}
