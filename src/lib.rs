//! # reach-order: reachability orders for parametric Markov models
//!
//! **`reach-order`** decides how the reachability probabilities (or expected
//! rewards) of the states of a parametric Markov chain or MDP relate to each
//! other over a whole region of parameter values, without instantiating the
//! parameters. The relations form a partial order over states, and a complete
//! order is enough to prove that the property value is monotone in a parameter.
//!
//! ## How it works
//!
//! - The [`Order`][crate::order::Order] records proven above/below/equal
//!   relations between states, with the goal states on top and the states
//!   that cannot reach the goal at the bottom.
//! - The [`OrderExtender`][crate::extender::OrderExtender] places states one
//!   at a time, comparing each with its successors. For MDPs it first picks
//!   the optimal action of every state.
//! - When two successors cannot be compared, the
//!   [`AssumptionMaker`][crate::assumption::AssumptionMaker] proposes `>`, `<`
//!   and `=`, and the [`AssumptionChecker`][crate::checker::AssumptionChecker]
//!   validates them against the order, numeric samples and a
//!   [`DecisionProcedure`][crate::smt::DecisionProcedure].
//! - [`analyze`][crate::analysis::analyze] explores one branch per undecided
//!   assumption and reports per-parameter monotonicity for each branch.
//!
//! ## Basic Usage
//!
//! ```rust
//! use reach_order::analysis::analyze;
//! use reach_order::bitset::BitSet;
//! use reach_order::config::AnalysisConfig;
//! use reach_order::model::ModelBuilder;
//! use reach_order::monotonicity::Monotonicity;
//! use reach_order::property::Property;
//! use reach_order::region::Region;
//! use reach_order::solver::default_solver;
//!
//! // 0 reaches the goal 1 with probability p, the sink 2 otherwise
//! let mut builder = ModelBuilder::new(3);
//! builder.add_action_str(0, &[(1, "p"), (2, "1-p")]).unwrap();
//! builder.add_action_str(1, &[(1, "1")]).unwrap();
//! builder.add_action_str(2, &[(2, "1")]).unwrap();
//! builder.initial(0);
//! let model = builder.build().unwrap();
//!
//! let property = Property::eventually(BitSet::from_indices(3, [1]));
//! let region = Region::parse("0.1<=p<=0.9").unwrap();
//! let config = AnalysisConfig::default();
//! let solver = default_solver(&config.solver);
//! let result = analyze(&model, &property, Some(&region), solver.as_ref(), &config).unwrap();
//!
//! assert_eq!(result.verdict("p"), Monotonicity::Incr);
//! ```
//!
//! ## Core Components
//!
//! - **[`order`]**: the relation lattice, and [`dot`] for its Graphviz export.
//! - **[`extender`]**, **[`assumption`]**, **[`checker`]**: order construction.
//! - **[`monotonicity`]**, **[`analysis`]**: verdicts and the driver.
//! - **[`polynomial`]**, **[`function`]**, **[`parse`]**, **[`region`]**: exact symbolic arithmetic.
//! - **[`smt`]**, **[`smtlib`]**: the decision-procedure boundary and its SMT-LIB2 rendering.
//! - **`z3_solver`** (feature `z3`, on by default): the z3-backed procedure the analysis uses.
//! - **[`interval`]**, **[`solver`]**: the interval branch-and-bound fallback.

pub mod analysis;
pub mod assumption;
pub mod bitset;
pub mod checker;
pub mod config;
pub mod dot;
pub mod encoding;
pub mod error;
pub mod extender;
pub mod function;
pub mod graph;
pub mod interval;
pub mod model;
pub mod monotonicity;
pub mod order;
pub mod parse;
pub mod polynomial;
pub mod property;
pub mod region;
pub mod sampling;
pub mod smt;
pub mod smtlib;
pub mod solver;
pub mod types;
#[cfg(feature = "z3")]
pub mod z3_solver;
