//! Support-ticket lifecycle rules.
//!
//! [`policy::evaluate`] decides what an actor may do with a ticket right now;
//! [`transition::apply`] performs a permitted change; [`store`] persists
//! tickets on disk or behind a helpdesk server; [`session::TicketSession`]
//! drives one viewer's interaction with a single ticket.

pub mod config;
pub mod error;
pub mod io;
pub mod paths;
pub mod policy;
pub mod session;
pub mod stats;
pub mod store;
pub mod ticket;
pub mod transition;
pub mod types;

pub use error::{HelpdeskError, Result};
pub use policy::{evaluate, PolicyDecision};
pub use ticket::{Actor, NewTicket, Ticket};
pub use transition::Transition;
