//! Validation of assumptions.
//!
//! Checks run cheapest first: the relations already recorded in the order,
//! then numeric samples of the instantiated model, then a symbolic query over
//! the one-step equations of both states.

use std::collections::BTreeSet;

use log::{debug, trace};

use crate::assumption::{Assumption, AssumptionKind, AssumptionStatus};
use crate::config::AnalysisConfig;
use crate::encoding::Encoder;
use crate::error::Result;
use crate::model::ParametricModel;
use crate::order::Order;
use crate::property::Property;
use crate::region::Region;
use crate::sampling::Sampler;
use crate::smt::{DecisionProcedure, Relation};
use crate::types::{Comparison, State};

#[derive(Debug, Clone)]
pub struct AssumptionChecker<'a> {
    encoder: Encoder<'a>,
    /// State values at each sample point.
    samples: Vec<Vec<f64>>,
    precision: f64,
    trust_samples: bool,
}

impl<'a> AssumptionChecker<'a> {
    /// Creates a checker; evaluates `config.number_of_samples` diagonal samples of the region.
    pub fn new(
        model: &'a ParametricModel,
        property: &'a Property,
        region: &Region,
        solver: &'a dyn DecisionProcedure,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        let samples = if config.number_of_samples > 0 {
            Sampler::new(model, property, config.max_iterations, config.precision)?
                .parallel(config.parallel)
                .diagonal(region, config.number_of_samples)
        } else {
            Vec::new()
        };
        Ok(Self {
            encoder: Encoder::new(model, property, region, solver),
            samples,
            precision: config.precision,
            trust_samples: config.trust_samples,
        })
    }

    pub fn encoder(&self) -> &Encoder<'a> {
        &self.encoder
    }

    /// Decides the assumption, cheapest check first.
    pub fn validate(&self, order: &mut Order, assumption: &Assumption) -> AssumptionStatus {
        match self.validate_on_order(order, assumption) {
            Some(status) => status,
            None => self.validate_by_evaluation(order, assumption),
        }
    }

    /// Decides the assumption from the relations recorded in the order, if they settle it.
    pub fn validate_on_order(&self, order: &mut Order, assumption: &Assumption) -> Option<AssumptionStatus> {
        let comparison = order.compare(assumption.lhs, assumption.rhs);
        let status = match (assumption.kind, comparison) {
            (_, Comparison::Unknown) => return None,
            (AssumptionKind::Greater, Comparison::Above)
            | (AssumptionKind::Less, Comparison::Below)
            | (AssumptionKind::Equal, Comparison::Same) => AssumptionStatus::Valid,
            _ => AssumptionStatus::Invalid,
        };
        trace!("{} decided by the order: {}", assumption, status);
        Some(status)
    }

    /// Decides the assumption by sampling, then symbolically.
    pub fn validate_by_evaluation(&self, order: &mut Order, assumption: &Assumption) -> AssumptionStatus {
        match self.validate_on_samples(assumption) {
            Some(AssumptionStatus::Invalid) => return AssumptionStatus::Invalid,
            Some(AssumptionStatus::Valid) if self.trust_samples => return AssumptionStatus::Valid,
            _ => {}
        }
        self.validate_symbolically(order, assumption)
    }

    /// `Invalid` if some sample contradicts the assumption, `Valid` if all agree,
    /// `None` without samples.
    pub fn validate_on_samples(&self, assumption: &Assumption) -> Option<AssumptionStatus> {
        if self.samples.is_empty() {
            return None;
        }
        let (lhs, rhs) = (assumption.lhs, assumption.rhs);
        let contradicted = self.samples.iter().any(|values| {
            let (a, b) = (values[lhs], values[rhs]);
            match assumption.kind {
                AssumptionKind::Greater => a < b - self.precision,
                AssumptionKind::Less => a > b + self.precision,
                AssumptionKind::Equal => (a - b).abs() > self.precision,
            }
        });
        if contradicted {
            debug!("{} contradicted by samples", assumption);
            Some(AssumptionStatus::Invalid)
        } else {
            Some(AssumptionStatus::Valid)
        }
    }

    /// Compares the one-step equations of both states under the values the order allows.
    ///
    /// A state with several actions is only compared once its action is chosen.
    pub fn validate_symbolically(&self, order: &mut Order, assumption: &Assumption) -> AssumptionStatus {
        let (lhs, rhs) = (assumption.lhs, assumption.rhs);
        let model = self.encoder.model();
        if let Some(&open) = [lhs, rhs]
            .iter()
            .find(|&&s| model.num_actions(s) > 1 && !order.is_action_set(s))
        {
            debug!("{}: no action chosen for state {} yet", assumption, open);
            return AssumptionStatus::Unknown;
        }
        let (lhs_action, rhs_action) = (order.action_at(lhs), order.action_at(rhs));
        let mut states: BTreeSet<State> = model.action_successors(lhs, lhs_action);
        states.remove(&lhs);
        let mut rhs_successors = model.action_successors(rhs, rhs_action);
        rhs_successors.remove(&rhs);
        states.extend(rhs_successors);

        let Some(values) = self.encoder.encode(order, &states) else {
            return AssumptionStatus::Unknown;
        };
        let functions = (
            self.encoder.state_function(&values, lhs, lhs_action),
            self.encoder.state_function(&values, rhs, rhs_action),
        );
        let (Some(f_lhs), Some(f_rhs)) = functions else {
            return AssumptionStatus::Unknown;
        };
        let Some(diff) = self.encoder.difference(&f_lhs, &f_rhs) else {
            return AssumptionStatus::Unknown;
        };
        trace!("{}: difference {}", assumption, diff);

        let (holds, fails) = match assumption.kind {
            AssumptionKind::Greater => (Relation::Gt, Relation::Le),
            AssumptionKind::Less => (Relation::Lt, Relation::Ge),
            AssumptionKind::Equal => (Relation::Eq, Relation::Ne),
        };
        let status = if self.encoder.proves(&values, &diff, holds) {
            AssumptionStatus::Valid
        } else if self.encoder.proves(&values, &diff, fails) {
            AssumptionStatus::Invalid
        } else {
            AssumptionStatus::Unknown
        };
        debug!("{} checked symbolically: {}", assumption, status);
        status
    }
}
