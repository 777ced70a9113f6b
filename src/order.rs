//! The reachability order: a lattice over states ordered by their value.
//!
//! States proven to have the same value share a [`Node`]. Every node carries a
//! bit set `states_above`: bit `s` is set when state `s` is proven to have a
//! value at least as large as the node's. The bit sets form an approximate
//! transitive closure. [`Order::compare_fast`] only consults them directly;
//! [`Order::compare`] additionally searches through them breadth-first and
//! writes every relation it discovers back into the nodes on the way.
//!
//! Two sentinel nodes bound the lattice: `bottom` (value 0) is always present,
//! `top` (value 1) is absent for reward properties without infinite-reward states.
//!
//! # Examples
//!
//! ```
//! use reach_order::order::Order;
//! use reach_order::types::Comparison;
//!
//! // state 0 is the target, state 3 can never reach it
//! let mut order = Order::with_extremes(4, &[0], &[3]);
//! order.add(1);
//! order.add_between_states(2, 1, 3);
//! assert_eq!(order.compare(1, 2), Comparison::Above);
//! assert_eq!(order.compare(0, 2), Comparison::Above);
//! assert_eq!(order.compare(3, 2), Comparison::Below);
//! ```

use std::collections::{BTreeSet, VecDeque};

use log::{debug, trace, warn};

use crate::bitset::BitSet;
use crate::types::{Comparison, NodeId, State};

/// An equivalence class of states with the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    states: BTreeSet<State>,
    states_above: BitSet,
}

impl Node {
    fn new(num_states: usize) -> Self {
        Self {
            states: BTreeSet::new(),
            states_above: BitSet::new(num_states),
        }
    }

    /// Member states, in increasing order.
    pub fn states(&self) -> &BTreeSet<State> {
        &self.states
    }

    /// States proven to be at least as large as this node.
    pub fn states_above(&self) -> &BitSet {
        &self.states_above
    }

    /// The smallest member state, used to name the node.
    ///
    /// # Panics
    ///
    /// Panics if the node has no states. Nodes are created with their first
    /// state and merged nodes are removed, so this never happens inside an [`Order`].
    pub fn representative(&self) -> State {
        match self.states.first() {
            Some(&state) => state,
            None => panic!("Lattice node without states"),
        }
    }
}

/// Result of [`Order::sort_states`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedStates {
    /// States from highest to lowest; a prefix of the input if `unresolved` is set.
    pub states: Vec<State>,
    /// The first pair found incomparable: an already sorted state and the state being inserted.
    pub unresolved: Option<(State, State)>,
}

impl SortedStates {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_none()
    }

    pub fn highest(&self) -> Option<State> {
        self.states.first().copied()
    }

    pub fn lowest(&self) -> Option<State> {
        self.states.last().copied()
    }
}

/// The relation lattice of one branch of the analysis.
#[derive(Debug, Clone)]
pub struct Order {
    num_states: usize,
    nodes: Vec<Option<Node>>,
    state_to_node: Vec<Option<NodeId>>,
    top: Option<NodeId>,
    bottom: NodeId,
    added: usize,
    only_initial: bool,
    inconsistent: bool,

    sufficient: BitSet,
    done: BitSet,
    trivial: BitSet,
    requeued: BitSet,

    states_to_handle: Vec<State>,
    special_states: Vec<State>,
    states_sorted: Vec<State>,

    scheduler: Option<Vec<Option<usize>>>,
}

impl Order {
    /// Creates the initial order with the given top and bottom states.
    ///
    /// `trivial` marks states in singleton SCCs; `states_sorted` is the fallback
    /// sequence, consumed from the back.
    ///
    /// # Panics
    ///
    /// Panics if there are no bottom states.
    pub fn new(num_states: usize, top_states: Option<&BitSet>, bottom_states: &BitSet, trivial: BitSet, states_sorted: Vec<State>) -> Self {
        let mut bottom_members = bottom_states.iter();
        let Some(first_bottom) = bottom_members.next() else {
            panic!("Expecting order to contain at least one bottom state");
        };
        let mut order = Self {
            num_states,
            nodes: Vec::new(),
            state_to_node: vec![None; num_states],
            top: None,
            bottom: NodeId::new(0),
            added: 0,
            only_initial: true,
            inconsistent: false,
            sufficient: BitSet::new(num_states),
            done: BitSet::new(num_states),
            trivial,
            requeued: BitSet::new(num_states),
            states_to_handle: Vec::new(),
            special_states: Vec::new(),
            states_sorted,
            scheduler: None,
        };

        if let Some(top_states) = top_states {
            let mut members = top_states.iter();
            if let Some(first) = members.next() {
                let top = order.new_node(first);
                for s in members {
                    order.place(s, top);
                }
                order.top = Some(top);
            }
        }
        let bottom = order.new_node(first_bottom);
        order.bottom = bottom;
        for s in bottom_members {
            order.place(s, bottom);
        }
        if let Some(top) = order.top {
            let top_states: Vec<State> = order.node(top).states.iter().copied().collect();
            order.node_mut(bottom).states_above.extend(top_states);
        }
        for s in top_states.into_iter().flatten().chain(bottom_states.iter()) {
            order.sufficient.insert(s);
            order.done.insert(s);
        }
        debug!(
            "initial order: {} top state(s), {} bottom state(s) out of {}",
            top_states.map_or(0, |t| t.count_ones()),
            bottom_states.count_ones(),
            num_states
        );
        order
    }

    /// An order with the given sentinel states, every state trivial and no fallback sequence.
    pub fn with_extremes(num_states: usize, top_states: &[State], bottom_states: &[State]) -> Self {
        let top = BitSet::from_indices(num_states, top_states.iter().copied());
        let bottom = BitSet::from_indices(num_states, bottom_states.iter().copied());
        Order::new(num_states, Some(&top), &bottom, BitSet::full(num_states), Vec::new())
    }

    /// Creates a node holding the unmapped state `first`.
    fn new_node(&mut self, first: State) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Some(Node::new(self.num_states)));
        self.place(first, id);
        id
    }

    /// Maps an unmapped state into `node`.
    fn place(&mut self, state: State, node: NodeId) {
        assert!(state < self.num_states, "State {} out of range", state);
        debug_assert!(self.state_to_node[state].is_none());
        self.node_mut(node).states.insert(state);
        self.state_to_node[state] = Some(node);
        self.added += 1;
    }

    fn check_state(&self, state: State) {
        assert!(state < self.num_states, "State {} out of range for order over {} states", state, self.num_states);
    }

    // --- Accessors ---

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn top(&self) -> Option<NodeId> {
        self.top
    }

    pub fn bottom(&self) -> NodeId {
        self.bottom
    }

    /// The node with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the node was merged away.
    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.index()]
            .as_ref()
            .unwrap_or_else(|| panic!("Node {} no longer exists", id))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.index()]
            .as_mut()
            .unwrap_or_else(|| panic!("Node {} no longer exists", id))
    }

    /// The node of a state.
    ///
    /// # Panics
    ///
    /// Panics if the state is out of range or not yet in the order.
    pub fn node_of(&self, state: State) -> NodeId {
        self.check_state(state);
        self.state_to_node[state].unwrap_or_else(|| panic!("State {} is not in the order", state))
    }

    /// The node of a state, if it is in the order.
    pub fn try_node_of(&self, state: State) -> Option<NodeId> {
        self.check_state(state);
        self.state_to_node[state]
    }

    pub fn contains(&self, state: State) -> bool {
        state < self.num_states && self.state_to_node[state].is_some()
    }

    /// All live nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId::new(i), n)))
    }

    pub fn is_top_state(&self, state: State) -> bool {
        self.top.is_some() && self.contains(state) && self.state_to_node[state] == self.top
    }

    pub fn is_bottom_state(&self, state: State) -> bool {
        self.contains(state) && self.state_to_node[state] == Some(self.bottom)
    }

    pub fn number_of_added_states(&self) -> usize {
        self.added
    }

    pub fn number_of_sufficient_states(&self) -> usize {
        self.sufficient.count_ones()
    }

    /// True once every state is sufficient.
    pub fn is_done_building(&self) -> bool {
        self.sufficient.is_full()
    }

    /// True while only the sentinel states have been placed.
    pub fn is_only_initial(&self) -> bool {
        self.only_initial
    }

    /// True if a merge collapsed top and bottom.
    pub fn is_inconsistent(&self) -> bool {
        self.inconsistent
    }

    pub fn is_trivial(&self, state: State) -> bool {
        self.trivial.contains(state)
    }

    pub fn set_sufficient(&mut self, state: State) {
        self.sufficient.insert(state);
    }

    pub fn is_sufficient(&self, state: State) -> bool {
        self.sufficient.contains(state)
    }

    /// Marks a state as done.
    ///
    /// # Panics
    ///
    /// Panics if the state is not in the order or not sufficient.
    pub fn set_done(&mut self, state: State) {
        assert!(self.contains(state) && self.sufficient.contains(state), "State {} is not ready to be done", state);
        self.done.insert(state);
    }

    pub fn is_done(&self, state: State) -> bool {
        self.done.contains(state)
    }

    // --- Insertion ---

    /// Inserts an unmapped state between top and bottom (above bottom if there is no top).
    pub fn add(&mut self, state: State) {
        assert!(!self.contains(state), "Cannot add state {} that is already in the order", state);
        match self.top {
            Some(top) => self.add_between(state, top, self.bottom),
            None => self.add_above(state, self.bottom),
        }
    }

    /// Inserts `state` directly above `node`. Records the relation if the state is already mapped.
    pub fn add_above(&mut self, state: State, node: NodeId) {
        self.check_state(state);
        debug!("add {} above {}", state, node);
        match self.state_to_node[state] {
            None => {
                let new = self.new_node(state);
                if let Some(top) = self.top {
                    let top_states: Vec<State> = self.node(top).states.iter().copied().collect();
                    self.node_mut(new).states_above.extend(top_states);
                }
                self.node_mut(node).states_above.insert(state);
                self.only_initial = false;
            }
            Some(existing) => self.add_relation_nodes(existing, node),
        }
    }

    /// Inserts `state` directly below `node`. Records the relation if the state is already mapped.
    pub fn add_below(&mut self, state: State, node: NodeId) {
        self.check_state(state);
        debug!("add {} below {}", state, node);
        match self.state_to_node[state] {
            None => {
                let new = self.new_node(state);
                self.inherit_above(new, node);
                let bottom = self.bottom;
                self.node_mut(bottom).states_above.insert(state);
                self.only_initial = false;
            }
            Some(existing) => self.add_relation_nodes(node, existing),
        }
    }

    /// Inserts `state` between two nodes. Records both relations if the state is already mapped.
    ///
    /// # Panics
    ///
    /// Panics if `above == below`.
    pub fn add_between(&mut self, state: State, above: NodeId, below: NodeId) {
        self.check_state(state);
        assert_ne!(above, below, "Cannot add state {} between a node and itself", state);
        debug!("add {} between {} (above) and {} (below)", state, above, below);
        match self.state_to_node[state] {
            None => {
                let new = self.new_node(state);
                self.inherit_above(new, above);
                self.node_mut(below).states_above.insert(state);
                self.only_initial = false;
            }
            Some(existing) => {
                self.add_relation_nodes(above, existing);
                let existing = self.node_of(state);
                self.add_relation_nodes(existing, below);
            }
        }
    }

    /// [`add_between`][Order::add_between] with the nodes of two placed states.
    pub fn add_between_states(&mut self, state: State, above: State, below: State) {
        let (above, below) = (self.node_of(above), self.node_of(below));
        self.add_between(state, above, below);
    }

    /// Puts `state` into an existing node, merging if it is already mapped elsewhere.
    pub fn add_to_node(&mut self, state: State, node: NodeId) {
        self.check_state(state);
        debug!("add {} to {}", state, node);
        match self.state_to_node[state] {
            None => self.place(state, node),
            Some(existing) => {
                self.merge_nodes(existing, node);
            }
        }
    }

    /// `new` gets everything above `anchor`, plus `anchor` itself.
    fn inherit_above(&mut self, new: NodeId, anchor: NodeId) {
        let anchor_node = self.node(anchor);
        let mut inherited = anchor_node.states_above.clone();
        inherited.extend(anchor_node.states.iter().copied());
        self.node_mut(new).states_above = inherited;
    }

    /// Records that `above` is at least `below`. Both states must be placed.
    pub fn add_relation(&mut self, above: State, below: State) {
        let (a, b) = (self.node_of(above), self.node_of(below));
        self.add_relation_nodes(a, b);
    }

    /// Records that node `above` is at least node `below`; a closed cycle merges the two.
    pub fn add_relation_nodes(&mut self, above: NodeId, below: NodeId) {
        if above == below {
            return;
        }
        trace!("add relation {} >= {}", above, below);
        let mut inherited = self.node(above).states_above.clone();
        inherited.extend(self.node(above).states.iter().copied());
        self.node_mut(below).states_above.union_with(&inherited);

        if self.proves_above(below, above) {
            debug!("relation {} >= {} closes a cycle", above, below);
            self.merge_nodes(above, below);
        }
    }

    // --- Merging ---

    /// Merges the nodes of two placed states.
    pub fn merge(&mut self, state1: State, state2: State) -> NodeId {
        let (a, b) = (self.node_of(state1), self.node_of(state2));
        self.merge_nodes(a, b)
    }

    /// Merges two nodes and re-establishes antisymmetry over all node pairs.
    ///
    /// Returns the surviving node. Sentinels always survive; merging top with
    /// bottom marks the order as inconsistent.
    pub fn merge_nodes(&mut self, n1: NodeId, n2: NodeId) -> NodeId {
        if n1 == n2 {
            return n1;
        }
        let keep = self.merge_pair(n1, n2);
        let representative = self.node(keep).representative();
        self.rescan();
        // `keep` may have been absorbed by the rescan.
        self.node_of(representative)
    }

    fn is_sentinel(&self, node: NodeId) -> bool {
        Some(node) == self.top || node == self.bottom
    }

    fn merge_pair(&mut self, n1: NodeId, n2: NodeId) -> NodeId {
        let (keep, gone) = if self.is_sentinel(n2) && !self.is_sentinel(n1) { (n2, n1) } else { (n1, n2) };
        debug!("merge {} into {}", gone, keep);
        if self.is_sentinel(keep) && self.is_sentinel(gone) {
            warn!("merging top and bottom: order is inconsistent");
            self.inconsistent = true;
        }
        if Some(gone) == self.top {
            self.top = Some(keep);
        }
        if gone == self.bottom {
            self.bottom = keep;
        }

        let Some(gone_node) = self.nodes[gone.index()].take() else {
            panic!("Node {} no longer exists", gone);
        };
        let gone_states = BitSet::from_indices(self.num_states, gone_node.states.iter().copied());
        for &s in &gone_node.states {
            self.state_to_node[s] = Some(keep);
        }
        {
            let keep_node = self.node_mut(keep);
            keep_node.states_above.union_with(&gone_node.states_above);
            keep_node.states.extend(gone_node.states.iter().copied());
        }

        let keep_states: Vec<State> = self.node(keep).states.iter().copied().collect();
        let keep_set = BitSet::from_indices(self.num_states, keep_states.iter().copied());
        for node in self.nodes.iter_mut().flatten() {
            if node.states_above.intersects(&gone_states) || node.states_above.intersects(&keep_set) {
                node.states_above.union_with(&keep_set);
            }
        }
        self.node_mut(keep).states_above.difference_with(&keep_set);
        keep
    }

    /// Merges every pair of distinct nodes provably above each other, until none is left.
    fn rescan(&mut self) {
        loop {
            let ids: Vec<NodeId> = self.nodes().map(|(id, _)| id).collect();
            let mut found = None;
            'search: for (i, &a) in ids.iter().enumerate() {
                for &b in &ids[i + 1..] {
                    if self.proves_above(a, b) && self.proves_above(b, a) {
                        found = Some((a, b));
                        break 'search;
                    }
                }
            }
            match found {
                Some((a, b)) => {
                    self.merge_pair(a, b);
                }
                None => return,
            }
        }
    }

    // --- Comparison ---

    /// True if `node1` is proven at least `node2` through sentinels, direct bits or search.
    fn proves_above(&mut self, node1: NodeId, node2: NodeId) -> bool {
        Some(node1) == self.top || node2 == self.bottom || self.above_fast(node1, node2) || self.above(node1, node2)
    }

    /// Some state of `node1` is recorded above `node2`.
    fn above_fast(&self, node1: NodeId, node2: NodeId) -> bool {
        let above = &self.node(node2).states_above;
        self.node(node1).states.iter().any(|&s| above.contains(s))
    }

    /// Breadth-first search upwards from `node2` for a node below `node1`.
    ///
    /// On success every node on the path from `node2` learns `node1`'s states.
    fn above(&mut self, node1: NodeId, node2: NodeId) -> bool {
        let mut parent: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        let mut visited = vec![false; self.nodes.len()];
        visited[node2.index()] = true;
        visited[node1.index()] = true;
        let mut queue = VecDeque::new();
        for s in self.node(node2).states_above.iter() {
            if let Some(n) = self.state_to_node[s] {
                if !visited[n.index()] {
                    visited[n.index()] = true;
                    parent[n.index()] = Some(node2);
                    queue.push_back(n);
                }
            }
        }

        while let Some(current) = queue.pop_front() {
            if self.above_fast(node1, current) {
                let states: Vec<State> = self.node(node1).states.iter().copied().collect();
                let mut cursor = Some(current);
                while let Some(n) = cursor {
                    self.node_mut(n).states_above.extend(states.iter().copied());
                    cursor = parent[n.index()];
                }
                trace!("found {} above {} by search", node1, node2);
                return true;
            }
            for s in self.node(current).states_above.iter() {
                if let Some(n) = self.state_to_node[s] {
                    if !visited[n.index()] {
                        visited[n.index()] = true;
                        parent[n.index()] = Some(current);
                        queue.push_back(n);
                    }
                }
            }
        }
        false
    }

    fn compare_fast_nodes(&self, n1: Option<NodeId>, n2: Option<NodeId>, hypothesis: Comparison) -> Comparison {
        match (n1, n2) {
            (Some(a), Some(b)) => {
                if a == b {
                    return Comparison::Same;
                }
                let try_above = matches!(hypothesis, Comparison::Unknown | Comparison::Above);
                let try_below = matches!(hypothesis, Comparison::Unknown | Comparison::Below);
                if try_above && (Some(a) == self.top || b == self.bottom || self.above_fast(a, b)) {
                    return Comparison::Above;
                }
                if try_below && (Some(b) == self.top || a == self.bottom || self.above_fast(b, a)) {
                    return Comparison::Below;
                }
                Comparison::Unknown
            }
            _ => self.compare_with_sentinels(n1, n2),
        }
    }

    /// Comparison involving an unplaced state: only the sentinels are known.
    fn compare_with_sentinels(&self, n1: Option<NodeId>, n2: Option<NodeId>) -> Comparison {
        if (self.top.is_some() && n1 == self.top) || n2 == Some(self.bottom) {
            Comparison::Above
        } else if (self.top.is_some() && n2 == self.top) || n1 == Some(self.bottom) {
            Comparison::Below
        } else {
            Comparison::Unknown
        }
    }

    /// Compares two nodes, searching the lattice if the recorded bits are inconclusive.
    ///
    /// With a hypothesis of `Above` or `Below` only that direction is searched.
    pub fn compare_nodes(&mut self, n1: NodeId, n2: NodeId, hypothesis: Comparison) -> Comparison {
        let fast = self.compare_fast_nodes(Some(n1), Some(n2), hypothesis);
        if fast.is_known() {
            return fast;
        }
        if matches!(hypothesis, Comparison::Unknown | Comparison::Above) && self.above(n1, n2) {
            return Comparison::Above;
        }
        if matches!(hypothesis, Comparison::Unknown | Comparison::Below) && self.above(n2, n1) {
            return Comparison::Below;
        }
        Comparison::Unknown
    }

    /// O(1)-per-bit comparison from recorded relations only.
    pub fn compare_fast(&self, state1: State, state2: State) -> Comparison {
        let (n1, n2) = (self.try_node_of(state1), self.try_node_of(state2));
        self.compare_fast_nodes(n1, n2, Comparison::Unknown)
    }

    /// Compares the values of two states.
    ///
    /// Unplaced states are only comparable with the sentinels.
    pub fn compare(&mut self, state1: State, state2: State) -> Comparison {
        self.compare_with_hypothesis(state1, state2, Comparison::Unknown)
    }

    /// Like [`compare`][Order::compare], restricted to one direction unless `hypothesis` is `Unknown`.
    pub fn compare_with_hypothesis(&mut self, state1: State, state2: State, hypothesis: Comparison) -> Comparison {
        match (self.try_node_of(state1), self.try_node_of(state2)) {
            (Some(a), Some(b)) => self.compare_nodes(a, b, hypothesis),
            (n1, n2) => self.compare_with_sentinels(n1, n2),
        }
    }

    /// Sorts states from highest to lowest using known relations.
    ///
    /// Stops at the first pair that cannot be compared.
    pub fn sort_states(&mut self, states: &[State]) -> SortedStates {
        let mut sorted: Vec<State> = Vec::with_capacity(states.len());
        for &state in states {
            let mut position = sorted.len();
            for (i, &other) in sorted.iter().enumerate() {
                match self.compare(state, other) {
                    Comparison::Above | Comparison::Same => {
                        position = i;
                        break;
                    }
                    Comparison::Unknown => {
                        return SortedStates {
                            unresolved: Some((other, state)),
                            states: sorted,
                        };
                    }
                    Comparison::Below => {}
                }
            }
            sorted.insert(position, state);
        }
        SortedStates {
            states: sorted,
            unresolved: None,
        }
    }

    /// Whether all `states` are at least (first) or at most (second) `state`.
    pub fn all_above_below(&mut self, states: &[State], state: State) -> (bool, bool) {
        let mut all_above = true;
        let mut all_below = true;
        for &s in states {
            let cmp = self.compare(s, state);
            all_above &= matches!(cmp, Comparison::Above | Comparison::Same);
            all_below &= matches!(cmp, Comparison::Below | Comparison::Same);
        }
        (all_above, all_below)
    }

    // --- Work queues ---

    /// Schedules a state for re-examination unless it is already sufficient.
    pub fn add_state_to_handle(&mut self, state: State) {
        if !self.sufficient.contains(state) {
            trace!("state {} to handle", state);
            self.states_to_handle.push(state);
        }
    }

    /// Schedules a state with priority over every other queue.
    pub fn add_special_state_to_handle(&mut self, state: State) {
        trace!("special state {} to handle", state);
        self.special_states.push(state);
    }

    /// Puts a state back onto the fallback sequence.
    pub fn add_state_sorted(&mut self, state: State) {
        self.states_sorted.push(state);
    }

    /// Puts a state behind every other state waiting in the fallback sequence.
    pub fn requeue_sorted(&mut self, state: State) {
        self.states_sorted.insert(0, state);
    }

    /// Next state to examine and whether it comes from the fallback sequence.
    pub fn next_state(&mut self) -> Option<(State, bool)> {
        if let Some(state) = self.special_states.pop() {
            return Some((state, false));
        }
        while let Some(state) = self.states_to_handle.pop() {
            if !self.done.contains(state) {
                return Some((state, false));
            }
        }
        while let Some(state) = self.states_sorted.pop() {
            if !self.done.contains(state) {
                return Some((state, true));
            }
        }
        None
    }

    /// True if a special or general state is pending.
    pub fn exists_state_to_handle(&mut self) -> bool {
        if !self.special_states.is_empty() {
            return true;
        }
        while let Some(&s) = self.states_to_handle.last() {
            if self.contains(s) && self.sufficient.contains(s) {
                self.states_to_handle.pop();
            } else {
                break;
            }
        }
        !self.states_to_handle.is_empty()
    }

    /// Marks a state as re-queued; returns false if it already was.
    pub fn mark_requeued(&mut self, state: State) -> bool {
        self.requeued.insert(state)
    }

    // --- Scheduler ---

    pub fn set_action(&mut self, state: State, action: usize) {
        let n = self.num_states;
        self.scheduler.get_or_insert_with(|| vec![None; n])[state] = Some(action);
    }

    /// The chosen action of a state, 0 if none was chosen.
    pub fn action_at(&self, state: State) -> usize {
        self.scheduler
            .as_ref()
            .and_then(|s| s.get(state).copied().flatten())
            .unwrap_or(0)
    }

    pub fn is_action_set(&self, state: State) -> bool {
        self.scheduler
            .as_ref()
            .is_some_and(|s| s.get(state).copied().flatten().is_some())
    }
}
