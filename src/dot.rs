//! Order to DOT (Graphviz) conversion.
//!
//! Every live node of an [`Order`] becomes one DOT node named `n<s>`, where
//! `s` is the smallest member state. An edge `n_i -> n_j` means that the
//! states of `n_j` are directly above `n_i`.
//!
//! # DOT Format
//!
//! - **Top** is labeled `=)` and **bottom** `=(` (the bottom label is only used
//!   when the order has a top; reward orders label it like any other node)
//! - Single-state nodes are labeled `s<state>`, larger classes `[s<first>]`
//! - Edges that are implied by transitivity through another recorded
//!   relation are suppressed
//!
//! # Examples
//!
//! ```
//! use reach_order::order::Order;
//!
//! let mut order = Order::with_extremes(3, &[0], &[2]);
//! order.add(1);
//! let dot = order.to_dot().unwrap();
//! assert!(dot.starts_with("digraph model {"));
//! assert!(dot.contains("n2 -> n1;"));
//! ```

use std::collections::BTreeSet;

use crate::bitset::BitSet;
use crate::order::{Node, Order};
use crate::types::NodeId;

/// Configuration options for DOT output generation.
///
/// # Examples
///
/// ```
/// use reach_order::dot::DotConfig;
/// use reach_order::order::Order;
///
/// let order = Order::with_extremes(2, &[0], &[1]);
/// let config = DotConfig {
///     rank_dir: Some("BT"),
///     ..DotConfig::default()
/// };
/// let dot = order.to_dot_with_config(&config).unwrap();
/// assert!(dot.contains("rankdir=BT;"));
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for all nodes (default: none, Graphviz picks an ellipse)
    pub node_shape: Option<&'static str>,
    /// Graph direction such as `"BT"` (default: none)
    pub rank_dir: Option<&'static str>,
    /// Label of the top node (default: "=)")
    pub top_label: &'static str,
    /// Label of the bottom node (default: "=(")
    pub bottom_label: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: None,
            rank_dir: None,
            top_label: "=)",
            bottom_label: "=(",
        }
    }
}

impl Order {
    /// Converts the order to DOT (Graphviz) format with the default configuration.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the order to DOT format with a custom configuration.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        use std::fmt::Write as _;

        let mut dot = String::new();
        writeln!(dot, "digraph model {{")?;
        if let Some(dir) = config.rank_dir {
            writeln!(dot, "\trankdir={};", dir)?;
        }
        if let Some(shape) = config.node_shape {
            writeln!(dot, "\tnode [shape={}];", shape)?;
        }

        for (id, node) in self.nodes() {
            writeln!(dot, "\tn{} [ label = \"{}\" ];", node.representative(), self.dot_label(id, node, config))?;
        }

        for (_, node) in self.nodes() {
            let redundant = self.transitively_above(node);
            let mut seen: BTreeSet<NodeId> = BTreeSet::new();
            for state in node.states_above().iter() {
                let Some(target) = self.try_node_of(state) else {
                    continue;
                };
                if !seen.insert(target) || redundant.contains(state) {
                    continue;
                }
                writeln!(dot, "\tn{} -> n{};", node.representative(), self.node(target).representative())?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }

    fn dot_label(&self, id: NodeId, node: &Node, config: &DotConfig) -> String {
        if Some(id) == self.top() {
            config.top_label.to_string()
        } else if id == self.bottom() && self.top().is_some() {
            config.bottom_label.to_string()
        } else if node.states().len() > 1 {
            format!("[s{}]", node.representative())
        } else {
            format!("s{}", node.representative())
        }
    }

    /// States above `node` that are also above some other state above `node`.
    fn transitively_above(&self, node: &Node) -> BitSet {
        let mut redundant = BitSet::new(self.num_states());
        for state in node.states_above().iter() {
            if let Some(mid) = self.try_node_of(state) {
                let mut shared = node.states_above().clone();
                shared.intersect_with(self.node(mid).states_above());
                redundant.union_with(&shared);
            }
        }
        redundant
    }
}
