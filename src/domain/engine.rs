//! Single decision entry point shared by live and simulation modes.

use crate::domain::allocation::{PortfolioConstructor, PortfolioTarget};
use crate::domain::config::EngineConfig;
use crate::domain::price_panel::PanelView;
use crate::domain::regime::{RegimeClassifier, RegimeDecision};
use chrono::NaiveDate;

/// Output of one evaluation date.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub date: NaiveDate,
    pub decision: RegimeDecision,
    pub target: PortfolioTarget,
}

#[derive(Debug, Clone)]
pub struct DecisionEngine {
    classifier: RegimeClassifier,
    constructor: PortfolioConstructor,
}

impl DecisionEngine {
    pub fn new(classifier: RegimeClassifier, constructor: PortfolioConstructor) -> Self {
        DecisionEngine {
            classifier,
            constructor,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        DecisionEngine::new(
            RegimeClassifier::new(config.regime.clone(), config.momentum.clone(), &config.universe),
            PortfolioConstructor::new(config.allocation.clone(), &config.universe),
        )
    }

    /// Classify and construct from the view's history only.
    pub fn evaluate(&self, view: &PanelView<'_>) -> Evaluation {
        let decision = self.classifier.classify(view);
        let target = self.constructor.construct(&decision, view);
        Evaluation {
            date: view.date(),
            decision,
            target,
        }
    }
}
