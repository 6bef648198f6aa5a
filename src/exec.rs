//! A bounded concrete explorer.
//!
//! This module implements the [`Explorer`] contract over a small branching
//! program model. It enumerates execution paths depth-first, one choice
//! script at a time, re-running the program for each script the way a
//! backtracking engine revisits choice generators. It is a concrete
//! enumerator: there are no path constraints and no solver, which is exactly
//! what the analysis needs from a host.
//!
//! Used by the CLI's built-in targets and the end-to-end tests.

use std::collections::VecDeque;

use log::debug;

use crate::decision::Decision;
use crate::host::{BranchEvent, Explorer, ExplorationObserver, ExplorationStats, HostError, TerminalEvent};
use crate::types::{BranchId, ContextId};

/// One operation of the program model.
#[derive(Debug, Clone)]
pub enum Op {
    /// Consume this many units of resource.
    Cost(u64),
    /// Run operations in order.
    Seq(Vec<Op>),
    /// A branch site: the host picks one arm per path.
    Branch { site: BranchId, arms: Vec<Op> },
    /// Run the body in a fresh procedure activation.
    Call(Box<Op>),
}

impl Op {
    pub fn cost(weight: u64) -> Op {
        Op::Cost(weight)
    }

    pub fn seq(ops: Vec<Op>) -> Op {
        Op::Seq(ops)
    }

    pub fn branch(site: u64, arms: Vec<Op>) -> Op {
        Op::Branch {
            site: BranchId::new(site),
            arms,
        }
    }

    pub fn call(body: Op) -> Op {
        Op::Call(Box::new(body))
    }
}

/// Limits for one exploration.
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Maximum number of paths (completed or pruned) per exploration.
    pub max_paths: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        ExplorerConfig { max_paths: 100_000 }
    }
}

/// Depth-first path enumerator over a size-parameterized program.
pub struct BoundedExplorer {
    build: Box<dyn Fn(u32) -> Op>,
    config: ExplorerConfig,
}

impl BoundedExplorer {
    /// Creates an explorer over `build`, which produces the program shape
    /// for a given input size.
    pub fn new(build: impl Fn(u32) -> Op + 'static) -> Self {
        BoundedExplorer {
            build: Box::new(build),
            config: ExplorerConfig::default(),
        }
    }

    pub fn with_config(build: impl Fn(u32) -> Op + 'static, config: ExplorerConfig) -> Self {
        BoundedExplorer {
            build: Box::new(build),
            config,
        }
    }
}

/// Outcome of replaying one choice script.
enum RunStatus {
    /// The program ran to completion.
    Completed,
    /// Every choice at some branch was ignored; the path was abandoned.
    Pruned,
}

/// State of a single program run under one choice script.
struct Run<'a, 'o> {
    observer: &'o mut dyn ExplorationObserver,
    /// Choices replayed from a previous run, in branch order.
    script: &'a [u32],
    cursor: usize,
    /// Every choice taken this run, replayed and fresh alike.
    taken: Vec<u32>,
    decisions: Vec<Decision>,
    cost: u64,
    next_activation: u64,
    /// Scripts for the sibling choices discovered this run.
    alternatives: Vec<Vec<u32>>,
    branches_dispatched: usize,
}

impl Run<'_, '_> {
    fn exec(&mut self, op: &Op, context: ContextId) -> Result<RunStatus, HostError> {
        match op {
            Op::Cost(weight) => {
                self.cost += weight;
                Ok(RunStatus::Completed)
            }
            Op::Seq(ops) => {
                for op in ops {
                    if let RunStatus::Pruned = self.exec(op, context)? {
                        return Ok(RunStatus::Pruned);
                    }
                }
                Ok(RunStatus::Completed)
            }
            Op::Call(body) => {
                let activation = ContextId::new(self.next_activation);
                self.next_activation += 1;
                self.exec(body, activation)
            }
            Op::Branch { site, arms } => {
                let available: Vec<u32> = (0..arms.len() as u32).collect();
                let choice = if self.cursor < self.script.len() {
                    let choice = self.script[self.cursor];
                    self.cursor += 1;
                    choice
                } else {
                    // A branch beyond the script: consult the observer once,
                    // take the first allowed choice now and queue the rest.
                    self.branches_dispatched += 1;
                    let filter = self.observer.on_branch(&BranchEvent {
                        branch: *site,
                        context,
                        choices: &available,
                        history: &self.decisions,
                    });
                    let allowed: Vec<u32> = available.iter().copied().filter(|&c| filter.allows(c)).collect();
                    let Some(&first) = allowed.first() else {
                        return Ok(RunStatus::Pruned);
                    };
                    for &alternative in allowed[1..].iter().rev() {
                        let mut script = self.taken.clone();
                        script.push(alternative);
                        self.alternatives.push(script);
                    }
                    first
                };

                let arm = arms.get(choice as usize).ok_or_else(|| {
                    HostError::new(format!("branch {} has no arm {}", site, choice))
                })?;
                self.taken.push(choice);
                self.decisions.push(Decision::new(*site, choice, context));
                self.exec(arm, context)
            }
        }
    }
}

impl Explorer for BoundedExplorer {
    fn explore(
        &mut self,
        input_size: u32,
        observer: &mut dyn ExplorationObserver,
    ) -> Result<ExplorationStats, HostError> {
        let root = (self.build)(input_size);
        let mut stats = ExplorationStats::default();

        // Depth-first: newly discovered sibling scripts go on top.
        let mut worklist: Vec<Vec<u32>> = vec![Vec::new()];
        while let Some(script) = worklist.pop() {
            if stats.paths_completed + stats.paths_pruned >= self.config.max_paths {
                return Err(HostError::new(format!(
                    "path budget of {} exceeded at input size {}",
                    self.config.max_paths, input_size
                )));
            }

            let mut run = Run {
                observer: &mut *observer,
                script: &script,
                cursor: 0,
                taken: Vec::new(),
                decisions: Vec::new(),
                cost: 0,
                next_activation: 1,
                alternatives: Vec::new(),
                branches_dispatched: 0,
            };

            let status = run.exec(&root, ContextId::new(0))?;
            stats.branches_dispatched += run.branches_dispatched;
            match status {
                RunStatus::Completed => {
                    run.observer.on_terminal(&TerminalEvent {
                        cost: run.cost,
                        history: &run.decisions,
                    });
                    stats.paths_completed += 1;
                }
                RunStatus::Pruned => {
                    stats.paths_pruned += 1;
                }
            }

            let mut alternatives: VecDeque<Vec<u32>> = run.alternatives.into();
            while let Some(alternative) = alternatives.pop_front() {
                worklist.push(alternative);
            }
        }

        debug!(
            "explored input size {}: {} paths, {} pruned, {} branch events",
            input_size, stats.paths_completed, stats.paths_pruned, stats.branches_dispatched
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ChoiceFilter;
    use std::collections::BTreeSet;
    use test_log::test;

    /// Records every terminal; prunes nothing.
    #[derive(Default)]
    struct Collect {
        terminals: Vec<(u64, Vec<Decision>)>,
    }

    impl ExplorationObserver for Collect {
        fn on_branch(&mut self, _event: &BranchEvent) -> ChoiceFilter {
            ChoiceFilter::ExploreAll
        }

        fn on_terminal(&mut self, event: &TerminalEvent) {
            self.terminals.push((event.cost, event.history.to_vec()));
        }
    }

    #[test]
    fn test_straight_line_cost() {
        let mut explorer = BoundedExplorer::new(|n| Op::seq((0..n).map(|_| Op::cost(1)).collect()));
        let mut observer = Collect::default();
        let stats = explorer.explore(5, &mut observer).unwrap();
        assert_eq!(stats.paths_completed, 1);
        assert_eq!(stats.branches_dispatched, 0);
        assert_eq!(observer.terminals.len(), 1);
        assert_eq!(observer.terminals[0].0, 5);
        assert!(observer.terminals[0].1.is_empty());
    }

    #[test]
    fn test_two_branches_four_paths() {
        let mut explorer = BoundedExplorer::new(|_| {
            Op::seq(vec![
                Op::branch(1, vec![Op::cost(0), Op::cost(1)]),
                Op::branch(2, vec![Op::cost(0), Op::cost(10)]),
            ])
        });
        let mut observer = Collect::default();
        let stats = explorer.explore(0, &mut observer).unwrap();
        assert_eq!(stats.paths_completed, 4);
        let costs: BTreeSet<u64> = observer.terminals.iter().map(|(c, _)| *c).collect();
        assert_eq!(costs, [0, 1, 10, 11].into_iter().collect());
    }

    #[test]
    fn test_depth_first_order() {
        let mut explorer = BoundedExplorer::new(|_| {
            Op::seq(vec![
                Op::branch(1, vec![Op::cost(0), Op::cost(100)]),
                Op::branch(2, vec![Op::cost(0), Op::cost(10)]),
            ])
        });
        let mut observer = Collect::default();
        explorer.explore(0, &mut observer).unwrap();
        let costs: Vec<u64> = observer.terminals.iter().map(|(c, _)| *c).collect();
        // Choice 0 subtrees complete before choice 1 subtrees.
        assert_eq!(costs, vec![0, 10, 100, 110]);
    }

    #[test]
    fn test_calls_get_fresh_activations() {
        let proc = || Op::branch(7, vec![Op::cost(0), Op::cost(1)]);
        let mut explorer = BoundedExplorer::new(move |_| Op::seq(vec![Op::call(proc()), Op::call(proc())]));
        let mut observer = Collect::default();
        let stats = explorer.explore(0, &mut observer).unwrap();
        assert_eq!(stats.paths_completed, 4);
        for (_, decisions) in &observer.terminals {
            assert_eq!(decisions.len(), 2);
            // Same site, different frames.
            assert_eq!(decisions[0].branch, decisions[1].branch);
            assert_ne!(decisions[0].context, decisions[1].context);
        }
    }

    #[test]
    fn test_restriction_prunes_paths() {
        struct OnlyOne;
        impl ExplorationObserver for OnlyOne {
            fn on_branch(&mut self, _event: &BranchEvent) -> ChoiceFilter {
                ChoiceFilter::Restrict([1].into_iter().collect())
            }
            fn on_terminal(&mut self, _event: &TerminalEvent) {}
        }

        let mut explorer = BoundedExplorer::new(|_| {
            Op::seq(vec![
                Op::branch(1, vec![Op::cost(0), Op::cost(1)]),
                Op::branch(2, vec![Op::cost(0), Op::cost(10)]),
            ])
        });
        let stats = explorer.explore(0, &mut OnlyOne).unwrap();
        // One path survives: 1 then 1.
        assert_eq!(stats.paths_completed, 1);
        assert_eq!(stats.paths_pruned, 0);
        assert_eq!(stats.branches_dispatched, 2);
    }

    #[test]
    fn test_empty_restriction_abandons_path() {
        struct Nothing;
        impl ExplorationObserver for Nothing {
            fn on_branch(&mut self, _event: &BranchEvent) -> ChoiceFilter {
                ChoiceFilter::Restrict(BTreeSet::new())
            }
            fn on_terminal(&mut self, _event: &TerminalEvent) {
                panic!("no path should complete");
            }
        }

        let mut explorer = BoundedExplorer::new(|_| Op::branch(1, vec![Op::cost(0), Op::cost(1)]));
        let stats = explorer.explore(0, &mut Nothing).unwrap();
        assert_eq!(stats.paths_completed, 0);
        assert_eq!(stats.paths_pruned, 1);
    }

    #[test]
    fn test_path_budget_is_enforced() {
        let config = ExplorerConfig { max_paths: 3 };
        let mut explorer = BoundedExplorer::with_config(
            |_| {
                Op::seq(vec![
                    Op::branch(1, vec![Op::cost(0), Op::cost(1)]),
                    Op::branch(2, vec![Op::cost(0), Op::cost(1)]),
                ])
            },
            config,
        );
        let mut observer = Collect::default();
        assert!(explorer.explore(0, &mut observer).is_err());
    }
}
