//! Graph analyses on the underlying (parameter-independent) transition graph.
//!
//! Weights of a valid model never vanish identically, so the edge structure
//! is the same for every parameter value inside a well-defined region.

use std::collections::VecDeque;

use log::debug;

use crate::bitset::BitSet;
use crate::model::ParametricModel;
use crate::types::State;

/// Strongly connected components in reverse topological order.
///
/// A component is listed only after every component reachable from it, so
/// sinks come first.
pub fn sccs(model: &ParametricModel) -> Vec<Vec<State>> {
    let n = model.num_states();
    let succs: Vec<Vec<State>> = (0..n).map(|s| model.successors(s).into_iter().collect()).collect();

    let mut index = vec![usize::MAX; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<State> = Vec::new();
    let mut components = Vec::new();
    let mut next_index = 0;

    for root in 0..n {
        if index[root] != usize::MAX {
            continue;
        }
        // Explicit call stack of (state, next successor position).
        let mut call: Vec<(State, usize)> = vec![(root, 0)];
        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(&(v, pos)) = call.last() {
            if let Some(&w) = succs[v].get(pos) {
                if let Some(top) = call.last_mut() {
                    top.1 += 1;
                }
                if index[w] == usize::MAX {
                    index[w] = next_index;
                    lowlink[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    call.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            call.pop();
            if let Some(&(parent, _)) = call.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }
            if lowlink[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                component.sort_unstable();
                components.push(component);
            }
        }
    }
    debug!("found {} SCCs in {} states", components.len(), n);
    components
}

/// States whose SCC is a singleton.
pub fn trivial_states(num_states: usize, components: &[Vec<State>]) -> BitSet {
    BitSet::from_indices(
        num_states,
        components.iter().filter(|c| c.len() == 1).map(|c| c[0]),
    )
}

/// States ordered so that popping from the back yields sink components first.
pub fn topological_sequence(components: &[Vec<State>]) -> Vec<State> {
    components.iter().rev().flatten().copied().collect()
}

/// States that can reach `target` moving only through `through` states,
/// along edges of any action.
fn backward_reach(model: &ParametricModel, target: &BitSet, through: &BitSet) -> BitSet {
    let mut reached = target.clone();
    let mut queue: VecDeque<State> = target.iter().collect();
    while let Some(s) = queue.pop_front() {
        for &p in model.predecessors(s) {
            if through.contains(p) && reached.insert(p) {
                queue.push_back(p);
            }
        }
    }
    reached
}

/// States reaching `psi` along `phi` states with probability 0 under every scheduler.
pub fn prob0_all(model: &ParametricModel, phi: &BitSet, psi: &BitSet) -> BitSet {
    backward_reach(model, psi, phi).complement()
}

/// States reaching `psi` along `phi` states with probability 0 under some scheduler.
///
/// For a Markov chain this coincides with [`prob0_all`].
pub fn prob0_exists(model: &ParametricModel, phi: &BitSet, psi: &BitSet) -> BitSet {
    // Least fixed point of states forced into positive probability by every action.
    let mut forced = psi.clone();
    loop {
        let mut changed = false;
        for s in 0..model.num_states() {
            if forced.contains(s) || !phi.contains(s) {
                continue;
            }
            let every_action_hits = model
                .actions(s)
                .iter()
                .all(|a| a.iter().any(|t| forced.contains(t.target)));
            if every_action_hits {
                forced.insert(s);
                changed = true;
            }
        }
        if !changed {
            return forced.complement();
        }
    }
}

/// States reaching `psi` along `phi` states with probability 1 under some scheduler.
pub fn prob1_exists(model: &ParametricModel, phi: &BitSet, psi: &BitSet) -> BitSet {
    let mut candidates = prob0_all(model, phi, psi).complement();
    loop {
        let mut reached = psi.clone();
        reached.intersect_with(&candidates);
        loop {
            let mut changed = false;
            for s in 0..model.num_states() {
                if reached.contains(s) || !candidates.contains(s) || !phi.contains(s) {
                    continue;
                }
                let good_action = model.actions(s).iter().any(|a| {
                    a.iter().all(|t| candidates.contains(t.target)) && a.iter().any(|t| reached.contains(t.target))
                });
                if good_action {
                    reached.insert(s);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        if reached == candidates {
            return reached;
        }
        candidates = reached;
    }
}

/// States reaching `psi` along `phi` states with probability 1 under every scheduler.
///
/// For a Markov chain this is the usual probability-1 set.
pub fn prob1_all(model: &ParametricModel, phi: &BitSet, psi: &BitSet) -> BitSet {
    // States that some scheduler keeps below probability 1.
    let mut below_one = prob0_exists(model, phi, psi);
    let mut queue: VecDeque<State> = below_one.iter().collect();
    while let Some(s) = queue.pop_front() {
        for &p in model.predecessors(s) {
            if below_one.contains(p) || !phi.contains(p) || psi.contains(p) {
                continue;
            }
            below_one.insert(p);
            queue.push_back(p);
        }
    }
    below_one.complement()
}
