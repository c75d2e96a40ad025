use drain_schemas::{FlatProjection, TrailerStats};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashSet;

/// Accumulates trailer statistics over a detail stream in O(1) memory per
/// field except `unique_customers`, which is the exact set of distinct
/// customer ids seen and so grows with the master's actual customer
/// cardinality — a known scaling limit for masters with very high customer
/// counts, kept exact rather than approximated because the output contract
/// commits to an exact count.
#[derive(Debug, Default)]
pub struct Aggregator {
    total_records: u64,
    total_amount: Decimal,
    risk_score_sum: f64,
    risk_score_n: u64,
    unique_customers: HashSet<String>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, projection: &FlatProjection) {
        self.total_records += 1;
        self.total_amount += projection.amount;

        if let Some(score) = projection.risk_score {
            self.risk_score_sum += score;
            self.risk_score_n += 1;
        }

        if !projection.customer_id.is_empty() {
            self.unique_customers.insert(projection.customer_id.clone());
        }
    }

    pub fn finish(&self) -> TrailerStats {
        let average_risk_score = if self.risk_score_n == 0 {
            Decimal::ZERO
        } else {
            Decimal::try_from(self.risk_score_sum / self.risk_score_n as f64)
                .unwrap_or(Decimal::ZERO)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };

        TrailerStats {
            total_records: self.total_records,
            total_amount: self.total_amount,
            average_risk_score,
            unique_customers: self.unique_customers.len() as u64,
        }
    }
}
