use crate::ticket::Ticket;
use crate::types::{Priority, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    #[serde(rename = "L1")]
    pub l1: usize,
    #[serde(rename = "L2")]
    pub l2: usize,
    #[serde(rename = "L3")]
    pub l3: usize,
}

impl TierCounts {
    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::L1 => self.l1,
            Tier::L2 => self.l2,
            Tier::L3 => self.l3,
        }
    }
}

/// Dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    pub total: usize,
    /// New, Attending or Escalated.
    pub open: usize,
    pub high_priority: usize,
    /// Past due and not Resolved.
    pub overdue: usize,
    pub by_tier: TierCounts,
}

impl TicketStats {
    pub fn collect(tickets: &[Ticket], now: DateTime<Utc>) -> Self {
        let mut stats = TicketStats {
            total: tickets.len(),
            ..Default::default()
        };
        for t in tickets {
            if t.status().is_open() {
                stats.open += 1;
            }
            if t.priority() == Priority::High {
                stats.high_priority += 1;
            }
            if t.is_frozen(now) {
                stats.overdue += 1;
            }
            match t.current_tier() {
                Tier::L1 => stats.by_tier.l1 += 1,
                Tier::L2 => stats.by_tier.l2 += 1,
                Tier::L3 => stats.by_tier.l3 += 1,
            }
        }
        stats
    }
}
