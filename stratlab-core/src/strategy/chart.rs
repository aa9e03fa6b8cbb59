//! Declarative chart description.
//!
//! A strategy registers areas during `on_started` and lists what each one
//! draws. Nothing flows back from a chart into the strategy.

use crate::domain::SubscriptionId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartElement {
    Candles { subscription: SubscriptionId },
    Indicator { subscription: SubscriptionId, name: String },
    OwnTrades,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartArea {
    pub name: String,
    pub elements: Vec<ChartElement>,
}

impl ChartArea {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
        }
    }

    /// Add an element unless the area already draws it.
    pub fn push(&mut self, element: ChartElement) {
        if !self.elements.contains(&element) {
            self.elements.push(element);
        }
    }

    pub fn draws_own_trades(&self) -> bool {
        self.elements.contains(&ChartElement::OwnTrades)
    }
}
