use log::trace;

use crate::model::ParametricModel;
use crate::order::Order;
use crate::types::{Comparison, State};

use super::ExtensionHooks;

/// Placement for reachability probabilities: a state lies between its
/// highest and lowest successor.
#[derive(Debug, Copy, Clone, Default)]
pub struct ReachabilityHooks;

impl ExtensionHooks for ReachabilityHooks {
    fn handle_one_successor(&self, order: &mut Order, state: State, successor: State) {
        if order.contains(state) {
            order.merge(state, successor);
        } else {
            order.add_to_node(state, order.node_of(successor));
        }
    }

    fn place_sorted(&self, order: &mut Order, state: State, sorted: &[State]) {
        place_between_extremes(order, state, sorted);
    }
}

/// Puts `state` between the first and last of `sorted`, or into their node if they are equal.
pub(super) fn place_between_extremes(order: &mut Order, state: State, sorted: &[State]) {
    let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
        return;
    };
    if order.compare(first, last) == Comparison::Same {
        if order.contains(state) {
            order.merge(state, first);
        } else {
            order.add_to_node(state, order.node_of(first));
        }
        return;
    }
    if !order.contains(first) {
        order.add_above(first, order.bottom());
    }
    if !order.contains(last) {
        ensure_below_top(order, last);
    }
    order.add_between_states(state, first, last);
}

/// Inserts an unplaced state below top, or above bottom if there is no top.
pub(super) fn ensure_below_top(order: &mut Order, state: State) {
    match order.top() {
        Some(top) => order.add_below(state, top),
        None => order.add_above(state, order.bottom()),
    }
}

/// Sorts the successors and places the state between the extremes.
pub(super) fn backward_reasoning(
    hooks: &dyn ExtensionHooks,
    order: &mut Order,
    state: State,
    successors: &[State],
) -> Result<(), (State, State)> {
    let sorted = order.sort_states(successors);
    if let Some(pair) = sorted.unresolved {
        return Err(pair);
    }
    trace!("backward reasoning places {} among {:?}", state, sorted.states);
    hooks.place_sorted(order, state, &sorted.states);
    Ok(())
}

/// Outcome of sorting a state together with its successors.
struct ForwardSort {
    sorted: Vec<State>,
    /// The first state that could not be sorted in.
    skipped: Option<State>,
}

/// Sorts `state` and its successors, tolerating one incomparable state.
///
/// Returns the pair if a second incomparable state shows up.
fn sort_for_forward(order: &mut Order, state: State, successors: &[State]) -> Result<ForwardSort, (State, State)> {
    let mut result = ForwardSort {
        sorted: Vec::with_capacity(successors.len() + 1),
        skipped: None,
    };
    for s in std::iter::once(state).chain(successors.iter().copied()) {
        let mut position = Some(result.sorted.len());
        for (i, &other) in result.sorted.iter().enumerate() {
            match order.compare(s, other) {
                Comparison::Above | Comparison::Same => {
                    position = Some(i);
                    break;
                }
                Comparison::Below => {}
                Comparison::Unknown => {
                    position = None;
                    break;
                }
            }
        }
        match (position, result.skipped) {
            (Some(i), _) => result.sorted.insert(i, s),
            (None, None) => result.skipped = Some(s),
            (None, Some(first)) => return Err((first, s)),
        }
    }
    Ok(result)
}

/// Compares a placed state with its successors directly.
///
/// The value of a state is a weighted mean of its successors, so if the state
/// is the highest (lowest) of the sorted ones, the one unsorted successor must
/// be at least (at most) the state.
pub(super) fn forward_reasoning(
    model: &ParametricModel,
    order: &mut Order,
    state: State,
    action: usize,
    successors: &[State],
) -> Result<(), (State, State)> {
    let ForwardSort { sorted, skipped } = sort_for_forward(order, state, successors)?;
    let Some(s1) = skipped else {
        return Ok(());
    };
    if !order.contains(s1) {
        order.add(s1);
    }
    let (first, last) = (sorted[0], sorted[sorted.len() - 1]);
    if first == state {
        trace!("{} is the highest successor of {}", s1, state);
        order.add_relation(s1, first);
        order.add_relation(s1, last);
        order.add_state_to_handle(s1);
        Ok(())
    } else if last == state {
        trace!("{} is the lowest successor of {}", s1, state);
        order.add_relation(first, s1);
        order.add_relation(last, s1);
        order.add_state_to_handle(s1);
        Ok(())
    } else {
        let weight = model.weight(state, action, s1);
        if weight.is_constant() {
            return Ok(());
        }
        match sorted.iter().find(|&&s| order.compare(s, s1) == Comparison::Unknown) {
            Some(&s) => Err((s, s1)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bitset::BitSet;
    use crate::model::ModelBuilder;

    #[test]
    fn test_place_between_extremes() {
        let mut order = Order::with_extremes(4, &[0], &[3]);
        ReachabilityHooks.place_sorted(&mut order, 1, &[0, 3]);
        assert_eq!(order.compare(0, 1), Comparison::Above);
        assert_eq!(order.compare(1, 3), Comparison::Above);

        ReachabilityHooks.place_sorted(&mut order, 2, &[1, 1]);
        assert_eq!(order.compare(1, 2), Comparison::Same);
    }

    #[test]
    fn test_one_successor_merges() {
        let mut order = Order::with_extremes(3, &[0], &[2]);
        order.add(1);
        ReachabilityHooks.handle_one_successor(&mut order, 1, 2);
        assert_eq!(order.compare(1, 2), Comparison::Same);
    }

    #[test]
    fn test_backward_reports_pair() {
        let mut order = Order::with_extremes(4, &[0], &[3]);
        order.add(1);
        order.add(2);
        assert_eq!(backward_reasoning(&ReachabilityHooks, &mut order, 3, &[1, 2]), Err((1, 2)));
    }

    /// 1 <-> 2 form an SCC; 1 also reaches the goal 0 and 2 the sink 3.
    fn cycle() -> ParametricModel {
        let mut b = ModelBuilder::new(4);
        b.add_action_str(0, &[(0, "1")]).unwrap();
        b.add_action_str(1, &[(0, "p"), (2, "1-p")]).unwrap();
        b.add_action_str(2, &[(1, "q"), (3, "1-q")]).unwrap();
        b.add_action_str(3, &[(3, "1")]).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_forward_places_unsorted_successor() {
        let model = cycle();
        let top = BitSet::from_indices(4, [0]);
        let bottom = BitSet::from_indices(4, [3]);
        let mut order = Order::new(4, Some(&top), &bottom, BitSet::from_indices(4, [0, 3]), Vec::new());
        order.add(1);
        // 2 is unplaced; 1 is below its other successor, the top
        assert_eq!(forward_reasoning(&model, &mut order, 1, 0, &[0, 2]), Ok(()));
        assert_eq!(order.compare(1, 2), Comparison::Above);

        // 2 lies below 1, its other successor is bottom
        assert_eq!(forward_reasoning(&model, &mut order, 2, 0, &[1, 3]), Ok(()));
    }

    #[test]
    fn test_forward_two_unknowns() {
        let mut b = ModelBuilder::new(5);
        b.add_action_str(0, &[(0, "1")]).unwrap();
        b.add_action_str(1, &[(2, "p"), (3, "1-p")]).unwrap();
        b.add_action_str(2, &[(1, "1/2"), (0, "1/2")]).unwrap();
        b.add_action_str(3, &[(1, "1/2"), (4, "1/2")]).unwrap();
        b.add_action_str(4, &[(4, "1")]).unwrap();
        let model = b.build().unwrap();
        let mut order = Order::with_extremes(5, &[0], &[4]);
        order.add(1);
        order.add(2);
        order.add(3);
        assert_eq!(forward_reasoning(&model, &mut order, 1, 0, &[2, 3]), Err((2, 3)));
    }
}
