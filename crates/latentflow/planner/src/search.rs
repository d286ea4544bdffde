use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A state space explored by [`SearchPlanner`].
///
/// `transition` takes the state by reference and returns a new one; the
/// input is never mutated.
pub trait SearchDomain {
    type State: Clone;
    type Action: Clone;
    type Goal;
    type Key: Eq + Hash;

    /// Visited-set key; equal keys are treated as the same state.
    fn key(&self, state: &Self::State) -> Self::Key;

    fn actions(&self, state: &Self::State, goal: &Self::Goal) -> Vec<Self::Action>;

    fn transition(&self, state: &Self::State, action: &Self::Action) -> Self::State;

    fn is_goal(&self, state: &Self::State, goal: &Self::Goal) -> bool;
}

/// Counters from the last search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub expanded: usize,
    pub visited: usize,
}

/// Breadth-first planner; the first path found is a shortest one.
pub struct SearchPlanner<D: SearchDomain> {
    domain: D,
    max_depth: usize,
}

impl<D: SearchDomain> SearchPlanner<D> {
    pub const DEFAULT_MAX_DEPTH: usize = 6;

    pub fn new(domain: D, max_depth: usize) -> Self {
        Self { domain, max_depth }
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn plan(&self, init: &D::State, goal: &D::Goal) -> Option<Vec<D::Action>> {
        self.plan_with_stats(init, goal).0
    }

    /// Like [`plan`](Self::plan), also reporting how much was explored.
    pub fn plan_with_stats(&self, init: &D::State, goal: &D::Goal) -> (Option<Vec<D::Action>>, SearchStats) {
        let mut stats = SearchStats::default();
        let mut seen: HashSet<D::Key> = HashSet::new();
        let mut queue: VecDeque<(D::State, Vec<D::Action>)> = VecDeque::new();

        seen.insert(self.domain.key(init));
        queue.push_back((init.clone(), Vec::new()));

        while let Some((state, path)) = queue.pop_front() {
            if self.domain.is_goal(&state, goal) {
                stats.visited = seen.len();
                debug!(depth = path.len(), expanded = stats.expanded, "Search reached goal");
                return (Some(path), stats);
            }
            if path.len() >= self.max_depth {
                continue;
            }

            stats.expanded += 1;
            for action in self.domain.actions(&state, goal) {
                let next = self.domain.transition(&state, &action);
                if !seen.insert(self.domain.key(&next)) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(action);
                queue.push_back((next, next_path));
            }
        }

        stats.visited = seen.len();
        debug!(max_depth = self.max_depth, expanded = stats.expanded, "Search exhausted");
        (None, stats)
    }
}
