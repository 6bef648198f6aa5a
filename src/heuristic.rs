//! Phase 2: policy-guided heuristic search.
//!
//! A [`HeuristicSearch`] rides along with one exploration per input size. At
//! every choice point it rebuilds the context-preserving local history,
//! consults the policy trie via longest-suffix lookup, and restricts the host
//! to the recommended choices. When the policy has no opinion it falls back
//! to a configured default. Across terminal events it tracks the single
//! worst-cost path, whose cost becomes `WC(n)`.
//!
//! Each input size gets a fresh search instance; nothing is shared across
//! explorations.

use log::{debug, trace};

use crate::host::{BranchEvent, ChoiceFilter, ExplorationObserver, TerminalEvent, WorstPath};
use crate::path::Path;
use crate::trie::PolicyTrie;

/// What to do at a branch the policy has never seen.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MissFallback {
    /// Explore every available choice. Expensive but safe.
    ExploreAll,
    /// Take the first available choice. The no-solver fallback.
    FirstChoice,
}

/// Observer for the policy-guided exploration of phase 2.
pub struct HeuristicSearch<'a> {
    policy: &'a PolicyTrie,
    fallback: MissFallback,
    /// Bound on the length of the local history used for lookup.
    max_history: Option<usize>,
    worst: Option<WorstPath>,
    hits: u64,
    misses: u64,
}

impl<'a> HeuristicSearch<'a> {
    pub fn new(policy: &'a PolicyTrie, fallback: MissFallback, max_history: Option<usize>) -> Self {
        HeuristicSearch {
            policy,
            fallback,
            max_history,
            worst: None,
            hits: 0,
            misses: 0,
        }
    }

    /// The worst path seen so far, if any terminal has been reached.
    pub fn worst(&self) -> Option<&WorstPath> {
        self.worst.as_ref()
    }

    pub fn into_worst(self) -> Option<WorstPath> {
        self.worst
    }

    /// `(policy hits, policy misses)` over all branch events.
    pub fn lookup_stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

impl ExplorationObserver for HeuristicSearch<'_> {
    fn on_branch(&mut self, event: &BranchEvent) -> ChoiceFilter {
        let history = Path::context_preserving(event.history, event.context, self.max_history);
        let recommended = self.policy.choices_for_longest_suffix(&history);

        if !recommended.is_empty() {
            self.hits += 1;
            trace!("{} at {}: policy recommends {:?}", event.branch, history, recommended);
            return ChoiceFilter::Restrict(recommended);
        }

        self.misses += 1;
        match self.fallback {
            MissFallback::ExploreAll => {
                trace!("{} at {}: policy miss, exploring all", event.branch, history);
                ChoiceFilter::ExploreAll
            }
            MissFallback::FirstChoice => match event.choices.first() {
                Some(&first) => {
                    trace!("{} at {}: policy miss, defaulting to {}", event.branch, history, first);
                    ChoiceFilter::Restrict([first].into_iter().collect())
                }
                None => ChoiceFilter::ExploreAll,
            },
        }
    }

    fn on_terminal(&mut self, event: &TerminalEvent) {
        let heavier = match &self.worst {
            Some(worst) => event.cost > worst.cost,
            None => true,
        };
        if heavier {
            debug!("new worst path: cost {}", event.cost);
            self.worst = Some(WorstPath {
                cost: event.cost,
                decisions: event.history.to_vec(),
            });
        }
    }
}
