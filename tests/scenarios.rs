use num_rational::BigRational;
use test_log::test;

use reach_order::analysis::{analyze, AnalysisResult};
use reach_order::assumption::{Assumption, AssumptionStatus};
use reach_order::bitset::BitSet;
use reach_order::checker::AssumptionChecker;
use reach_order::config::AnalysisConfig;
use reach_order::model::{ModelBuilder, ParametricModel};
use reach_order::monotonicity::Monotonicity;
use reach_order::order::Order;
use reach_order::property::Property;
use reach_order::region::Region;
use reach_order::solver::default_solver;
use reach_order::types::Comparison;

fn run(model: &ParametricModel, property: &Property, region: &str, config: &AnalysisConfig) -> AnalysisResult {
    let region = Region::parse(region).unwrap();
    let solver = default_solver(&config.solver);
    analyze(model, property, Some(&region), solver.as_ref(), config).unwrap()
}

fn goal(num_states: usize, state: usize) -> Property {
    Property::eventually(BitSet::from_indices(num_states, [state]))
}

#[test]
fn test_single_parametric_state() {
    let mut b = ModelBuilder::new(3);
    b.add_action_str(0, &[(0, "1")]).unwrap();
    b.add_action_str(1, &[(0, "p"), (2, "1-p")]).unwrap();
    b.add_action_str(2, &[(2, "1")]).unwrap();
    b.initial(1);
    let model = b.build().unwrap();

    let result = run(&model, &goal(3, 0), "0.1<=p<=0.9", &AnalysisConfig::default());
    assert_eq!(result.branches.len(), 1);
    let branch = &result.branches[0];
    assert!(branch.is_complete());
    assert!(branch.assumptions.is_empty());

    let mut order = branch.order.clone();
    assert_eq!(order.compare(0, 1), Comparison::Above);
    assert_eq!(order.compare(1, 2), Comparison::Above);
    assert_eq!(order.compare(2, 0), Comparison::Below);
    assert_eq!(result.verdict("p"), Monotonicity::Incr);
}

/// 1 and 2 share their transition function; 3 mixes them.
fn twins() -> ParametricModel {
    let mut b = ModelBuilder::new(5);
    b.add_action_str(0, &[(0, "1")]).unwrap();
    b.add_action_str(1, &[(0, "p"), (4, "1-p")]).unwrap();
    b.add_action_str(2, &[(0, "p"), (4, "1-p")]).unwrap();
    b.add_action_str(3, &[(1, "1/2"), (2, "1/2")]).unwrap();
    b.add_action_str(4, &[(4, "1")]).unwrap();
    b.initial(3);
    b.build().unwrap()
}

#[test]
fn test_identical_states_are_equal() {
    let model = twins();
    let property = goal(5, 0);
    let region = Region::parse("0.1<=p<=0.9").unwrap();
    let config = AnalysisConfig::default();
    let solver = default_solver(&config.solver);
    let checker = AssumptionChecker::new(&model, &property, &region, solver.as_ref(), &config).unwrap();

    let mut order = Order::with_extremes(5, &[0], &[4]);
    order.add(1);
    order.add(2);
    assert_eq!(checker.validate(&mut order, &Assumption::equal(1, 2)), AssumptionStatus::Valid);
    assert_eq!(checker.validate(&mut order, &Assumption::greater(1, 2)), AssumptionStatus::Invalid);
    assert_eq!(checker.validate(&mut order, &Assumption::less(1, 2)), AssumptionStatus::Invalid);
}

#[test]
fn test_identical_states_merge_without_branching() {
    let model = twins();
    let result = run(&model, &goal(5, 0), "0.1<=p<=0.9", &AnalysisConfig::default());
    assert_eq!(result.branches.len(), 1);
    assert!(result.branches[0].is_complete());

    let mut order = result.branches[0].order.clone();
    assert_eq!(order.compare(1, 2), Comparison::Same);
    assert_eq!(order.compare(3, 1), Comparison::Same);
    assert_eq!(result.verdict("p"), Monotonicity::Incr);
}

#[test]
fn test_cycle_placed_by_forward_reasoning() {
    // 1 <-> 2 form an SCC between the goal 0 and the sink 3
    let mut b = ModelBuilder::new(4);
    b.add_action_str(0, &[(0, "1")]).unwrap();
    b.add_action_str(1, &[(0, "p"), (2, "1-p")]).unwrap();
    b.add_action_str(2, &[(1, "q"), (3, "1-q")]).unwrap();
    b.add_action_str(3, &[(3, "1")]).unwrap();
    b.initial(1);
    let model = b.build().unwrap();

    let result = run(&model, &goal(4, 0), "0.2<=p<=0.8, 0.2<=q<=0.8", &AnalysisConfig::default());
    assert_eq!(result.branches.len(), 1);
    let branch = &result.branches[0];
    assert!(branch.is_complete());
    assert!(branch.assumptions.is_empty());

    let mut order = branch.order.clone();
    assert_eq!(order.compare(1, 2), Comparison::Above);
    assert_eq!(order.compare(0, 1), Comparison::Above);
    assert_eq!(order.compare(2, 3), Comparison::Above);
    assert_eq!(result.verdict("p"), Monotonicity::Incr);
    assert_eq!(result.verdict("q"), Monotonicity::Incr);
}

/// State 1 chooses between reaching the goal 0 with `p` or with `1/2`.
fn choice() -> ParametricModel {
    let mut b = ModelBuilder::new(3);
    b.add_action_str(0, &[(0, "1")]).unwrap();
    b.add_action_str(1, &[(0, "p"), (2, "1-p")]).unwrap();
    b.add_action_str(1, &[(0, "1/2"), (2, "1/2")]).unwrap();
    b.add_action_str(2, &[(2, "1")]).unwrap();
    b.initial(1);
    b.build().unwrap()
}

#[test]
fn test_mdp_picks_dominating_action() {
    let model = choice();
    let config = AnalysisConfig::default();

    let max = run(&model, &goal(3, 0).maximize(), "0.6<=p<=0.9", &config);
    assert_eq!(max.branches.len(), 1);
    assert!(max.branches[0].is_complete());
    assert_eq!(max.branches[0].order.action_at(1), 0);
    assert_eq!(max.verdict("p"), Monotonicity::Incr);

    let min = run(&model, &goal(3, 0).minimize(), "0.6<=p<=0.9", &config);
    assert_eq!(min.branches[0].order.action_at(1), 1);
    assert!(min.verdict("p").is_monotone());
}

#[test]
fn test_mdp_without_dominating_action_uses_default() {
    let model = choice();
    let result = run(&model, &goal(3, 0).maximize(), "0.1<=p<=0.9", &AnalysisConfig::default());
    assert_eq!(result.branches.len(), 1);
    assert!(result.branches[0].is_complete());
    assert_eq!(result.branches[0].order.action_at(1), 0);
}

#[test]
fn test_decreasing_probability() {
    let mut b = ModelBuilder::new(3);
    b.add_action_str(0, &[(0, "1")]).unwrap();
    b.add_action_str(1, &[(0, "1-p"), (2, "p")]).unwrap();
    b.add_action_str(2, &[(2, "1")]).unwrap();
    b.initial(1);
    let model = b.build().unwrap();

    let result = run(&model, &goal(3, 0), "0.1<=p<=0.9", &AnalysisConfig::default());
    assert_eq!(result.verdict("p"), Monotonicity::Decr);
    assert!(result.to_string().starts_with("branch 0 (complete) []: "));
}

#[test]
fn test_expected_steps_decrease() {
    // 1 leaves to the target 0 with probability p, collecting one unit per step
    let mut b = ModelBuilder::new(2);
    b.add_action_str(0, &[(0, "1")]).unwrap();
    b.add_action_str(1, &[(0, "p"), (1, "1-p")]).unwrap();
    b.initial(1);
    let model = b.build().unwrap();
    let rewards = vec![BigRational::from_integer(0.into()), BigRational::from_integer(1.into())];
    let property = Property::expected_reward(BitSet::from_indices(2, [0]), rewards);

    let result = run(&model, &property, "0.1<=p<=0.9", &AnalysisConfig::default());
    assert_eq!(result.branches.len(), 1);
    assert!(result.branches[0].is_complete());
    let mut order = result.branches[0].order.clone();
    assert_eq!(order.compare(1, 0), Comparison::Above);
    assert_eq!(result.verdict("p"), Monotonicity::Decr);
}

/// The goal is reached with probability `p * (1 - p)`, which rises and falls.
fn hump() -> ParametricModel {
    let mut b = ModelBuilder::new(4);
    b.add_action_str(0, &[(0, "1")]).unwrap();
    b.add_action_str(1, &[(2, "p"), (3, "1-p")]).unwrap();
    b.add_action_str(2, &[(0, "1-p"), (3, "p")]).unwrap();
    b.add_action_str(3, &[(3, "1")]).unwrap();
    b.initial(1);
    b.build().unwrap()
}

#[test]
fn test_samples_refute_monotonicity() {
    let model = hump();
    let property = goal(4, 0);

    let derived = run(&model, &property, "0.1<=p<=0.9", &AnalysisConfig::default());
    assert!(derived.branches[0].is_complete());
    assert_eq!(derived.verdict("p"), Monotonicity::Unknown);

    let config = AnalysisConfig {
        number_of_samples: 5,
        ..AnalysisConfig::default()
    };
    let sampled = run(&model, &property, "0.1<=p<=0.9", &config);
    assert_eq!(sampled.verdict("p"), Monotonicity::Not);
    assert!(!sampled.verdict("p").is_monotone());
}

#[test]
fn test_dot_export_of_analyzed_order() {
    let mut b = ModelBuilder::new(3);
    b.add_action_str(0, &[(0, "1")]).unwrap();
    b.add_action_str(1, &[(0, "p"), (2, "1-p")]).unwrap();
    b.add_action_str(2, &[(2, "1")]).unwrap();
    b.initial(1);
    let model = b.build().unwrap();

    let result = run(&model, &goal(3, 0), "0.1<=p<=0.9", &AnalysisConfig::default());
    let dot = result.branches[0].order.to_dot().unwrap();
    assert!(dot.starts_with("digraph model {"));
    assert!(dot.trim_end().ends_with('}'));
    assert!(dot.contains("n0 [ label"));
    assert!(dot.contains("n1 [ label"));
    assert!(dot.contains("n2 [ label"));
    assert!(dot.contains("->"));
}
