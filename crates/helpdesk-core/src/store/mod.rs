//! Ticket persistence.
//!
//! [`TicketStore`] is the collaborator every lifecycle change goes through.
//! [`FileStore`] keeps YAML manifests on disk and enforces the policy itself;
//! [`HttpStore`] forwards requests to a helpdesk server and reports its
//! refusals verbatim.

pub mod file;
pub mod http;
pub mod wire;

pub use file::FileStore;
pub use http::HttpStore;

use crate::error::Result;
use crate::stats::TicketStats;
use crate::ticket::{Actor, NewTicket, Ticket};
use crate::transition::Transition;
use crate::types::{Priority, TicketStatus, Tier};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TicketStore
// ---------------------------------------------------------------------------

pub trait TicketStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Ticket>;

    fn list(&self, query: &TicketQuery) -> Result<TicketPage>;

    fn create(&self, actor: &Actor, new: NewTicket) -> Result<Ticket>;

    /// Ask the store to perform `transition`. A refusal comes back as
    /// `TransitionRejected` carrying the store's own message.
    fn submit(&self, actor: &Actor, id: &str, transition: &Transition) -> Result<Ticket>;

    fn stats(&self) -> Result<TicketStats>;
}

impl<S: TicketStore + ?Sized> TicketStore for Box<S> {
    fn get(&self, id: &str) -> Result<Ticket> {
        (**self).get(id)
    }

    fn list(&self, query: &TicketQuery) -> Result<TicketPage> {
        (**self).list(query)
    }

    fn create(&self, actor: &Actor, new: NewTicket) -> Result<Ticket> {
        (**self).create(actor, new)
    }

    fn submit(&self, actor: &Actor, id: &str, transition: &Transition) -> Result<Ticket> {
        (**self).submit(actor, id, transition)
    }

    fn stats(&self) -> Result<TicketStats> {
        (**self).stats()
    }
}

// ---------------------------------------------------------------------------
// Query / paging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, alias = "level", skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl TicketQuery {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.status.is_none_or(|s| ticket.status() == s)
            && self.priority.is_none_or(|p| ticket.priority() == p)
            && self.tier.is_none_or(|t| ticket.current_tier() == t)
    }

    /// `(key, value)` pairs in the server's query-string vocabulary.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(s) = self.status {
            params.push(("status", s.to_string()));
        }
        if let Some(p) = self.priority {
            params.push(("priority", p.to_string()));
        }
        if let Some(t) = self.tier {
            params.push(("level", t.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub pagination: Pagination,
}

/// Filter, order newest first and cut one page out of `tickets`.
pub fn paginate(mut tickets: Vec<Ticket>, query: &TicketQuery, default_limit: u32) -> TicketPage {
    tickets.retain(|t| query.matches(t));
    tickets.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });

    let limit = query
        .limit
        .unwrap_or(default_limit)
        .clamp(1, crate::config::MAX_PAGE_SIZE);
    let total_items = tickets.len() as u64;
    let total_pages = total_items.div_ceil(u64::from(limit)) as u32;
    let current_page = query.page.unwrap_or(1).max(1);

    let start = (current_page as usize - 1).saturating_mul(limit as usize);
    let tickets = tickets
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .collect();

    TicketPage {
        tickets,
        pagination: Pagination {
            current_page,
            total_pages,
            total_items,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        },
    }
}
