//! Phase 1: policy generation.
//!
//! A [`PolicyGenerator`] rides along with an exhaustive exploration at a
//! single small input size. It never prunes; it watches terminal events for
//! the heaviest leaf, and afterwards compiles the decisions of that heaviest
//! path into a [`PolicyTrie`] keyed by context-preserving histories.

use log::debug;

use crate::host::{BranchEvent, ChoiceFilter, ExplorationObserver, TerminalEvent, WorstPath};
use crate::path::Path;
use crate::trie::{PolicyTrie, TrieBuilder};

/// Observer for the exhaustive exploration of phase 1.
#[derive(Debug)]
pub struct PolicyGenerator {
    /// Bound on the length of the per-decision history keys.
    max_history: Option<usize>,
    worst: Option<WorstPath>,
    paths_seen: usize,
}

impl PolicyGenerator {
    pub fn new(max_history: Option<usize>) -> Self {
        PolicyGenerator {
            max_history,
            worst: None,
            paths_seen: 0,
        }
    }

    /// The heaviest path observed so far.
    pub fn worst(&self) -> Option<&WorstPath> {
        self.worst.as_ref()
    }

    /// Compiles the policy from the heaviest path.
    ///
    /// For each decision `d` on that path, the key is the contiguous run of
    /// earlier decisions made in `d`'s own activation, bounded by the
    /// configured maximum, and the value is `d`'s choice. The first decision
    /// of an activation gets an empty key, which lands on the trie root.
    ///
    /// A branch-free exploration (no decisions at all) yields an empty trie.
    pub fn finish(self) -> PolicyTrie {
        let mut builder = TrieBuilder::new();
        if let Some(worst) = &self.worst {
            let path = Path::from_decisions(worst.decisions.clone());
            for index in 0..path.len() {
                let key = path.ctx_preserving_suffix(index, self.max_history);
                builder.put(&key, path[index].choice);
            }
            debug!(
                "policy compiled from {} decisions of the heaviest path (cost {})",
                path.len(),
                worst.cost
            );
        }
        builder.build()
    }
}

impl ExplorationObserver for PolicyGenerator {
    fn on_branch(&mut self, _event: &BranchEvent) -> ChoiceFilter {
        // Phase 1 is exhaustive.
        ChoiceFilter::ExploreAll
    }

    fn on_terminal(&mut self, event: &TerminalEvent) {
        self.paths_seen += 1;
        // Strict comparison: ties keep the earliest-discovered path.
        let heavier = match &self.worst {
            Some(worst) => event.cost > worst.cost,
            None => true,
        };
        if heavier {
            debug!("new heaviest path: cost {} after {} paths", event.cost, self.paths_seen);
            self.worst = Some(WorstPath {
                cost: event.cost,
                decisions: event.history.to_vec(),
            });
        }
    }
}
