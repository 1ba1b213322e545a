use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tavola_core::money;

use crate::lifecycle::OrderStatus;
use crate::repository::StatusTally;

/// Order counts per status and revenue from completed orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatistics {
    pub total_orders: u64,
    pub pending_orders: u64,
    pub in_progress_orders: u64,
    pub done_orders: u64,
    pub cancelled_orders: u64,
    /// Sum of `total_amount` over `done` orders
    pub total_revenue: Decimal,
}

impl OrderStatistics {
    pub fn from_tallies(tallies: &[StatusTally]) -> Self {
        let count_of = |status: OrderStatus| -> u64 {
            tallies.iter().filter(|t| t.status == status).map(|t| t.count).sum()
        };

        let revenue = money::sum_currency(
            tallies
                .iter()
                .filter(|t| t.status == OrderStatus::Done)
                .map(|t| t.total_amount),
        );

        Self {
            total_orders: tallies.iter().map(|t| t.count).sum(),
            pending_orders: count_of(OrderStatus::Pending),
            in_progress_orders: count_of(OrderStatus::InProgress),
            done_orders: count_of(OrderStatus::Done),
            cancelled_orders: count_of(OrderStatus::Cancelled),
            total_revenue: revenue,
        }
    }
}
