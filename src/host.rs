//! The host-observer contract.
//!
//! The analysis does not explore programs itself; a host does. The host
//! drives exploration and synchronously delivers two kinds of events to an
//! attached observer:
//!
//! - a [`BranchEvent`] whenever a choice point is about to be resolved. The
//!   observer may restrict which of the available choices the host explores
//!   by returning a [`ChoiceFilter`];
//! - a [`TerminalEvent`] whenever a complete path ends, carrying the path's
//!   resource cost and its full decision history.
//!
//! Within one exploration, events arrive in host-dispatched order. Everything
//! is single-threaded and cooperative: observers only react to callbacks and
//! never suspend or cancel the host.

use std::collections::BTreeSet;
use std::fmt;

use crate::decision::Decision;
use crate::types::{BranchId, ContextId};

/// A choice point about to be resolved by the host.
#[derive(Debug)]
pub struct BranchEvent<'a> {
    /// The branch site being decided.
    pub branch: BranchId,
    /// The procedure activation the branch executes in.
    pub context: ContextId,
    /// The choices the host is prepared to explore, in host order.
    pub choices: &'a [u32],
    /// Every decision resolved so far on the current path, oldest first.
    pub history: &'a [Decision],
}

/// A completed execution path.
#[derive(Debug)]
pub struct TerminalEvent<'a> {
    /// The host-measured resource cost of the path.
    pub cost: u64,
    /// The full decision history of the path, oldest first.
    pub history: &'a [Decision],
}

/// An observer's answer to a [`BranchEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceFilter {
    /// Explore every available choice.
    ExploreAll,
    /// Explore exactly these choices; everything else is ignored.
    Restrict(BTreeSet<u32>),
}

impl ChoiceFilter {
    pub fn allows(&self, choice: u32) -> bool {
        match self {
            ChoiceFilter::ExploreAll => true,
            ChoiceFilter::Restrict(set) => set.contains(&choice),
        }
    }
}

/// The observer half of the contract. Implemented by the policy generator
/// (phase 1) and the heuristic search (phase 2).
pub trait ExplorationObserver {
    /// Called before the host resolves a choice point. The returned filter
    /// restricts which choices the host will explore.
    fn on_branch(&mut self, event: &BranchEvent) -> ChoiceFilter;

    /// Called when a complete path ends.
    fn on_terminal(&mut self, event: &TerminalEvent);
}

/// The heaviest path an observer has seen: its cost and decision sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorstPath {
    pub cost: u64,
    pub decisions: Vec<Decision>,
}

/// Counters a host reports for one completed exploration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplorationStats {
    /// Paths that reached a terminal event.
    pub paths_completed: usize,
    /// Paths abandoned because every choice at some branch was ignored.
    pub paths_pruned: usize,
    /// Branch events dispatched.
    pub branches_dispatched: usize,
}

/// An internal failure of the exploration host. Fatal for the running phase.
#[derive(Debug)]
pub struct HostError {
    message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        HostError { message: message.into() }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HostError {}

/// The host half of the contract: run one exploration at the given input
/// size, delivering events to `observer`, and report statistics.
pub trait Explorer {
    fn explore(
        &mut self,
        input_size: u32,
        observer: &mut dyn ExplorationObserver,
    ) -> Result<ExplorationStats, HostError>;
}
