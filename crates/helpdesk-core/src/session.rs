//! A viewer's working session on one ticket.
//!
//! The session owns the current snapshot and routes every change through the
//! store. At most one request is outstanding at a time; while it is, the
//! caller should render its controls disabled ([`TicketSession::is_busy`]).
//! The snapshot is only ever replaced with what the store returns.

use crate::error::{HelpdeskError, Result};
use crate::policy::{self, PolicyDecision};
use crate::store::TicketStore;
use crate::ticket::{Actor, Ticket};
use crate::transition::{self, Transition};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::debug;

pub struct TicketSession<S: TicketStore> {
    store: S,
    actor: Actor,
    snapshot: RwLock<Ticket>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, id: &str) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| HelpdeskError::TransitionInFlight(id.to_string()))?;
        Ok(InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: TicketStore> TicketSession<S> {
    pub fn new(store: S, actor: Actor, ticket: Ticket) -> Self {
        Self {
            store,
            actor,
            snapshot: RwLock::new(ticket),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Fetch `id` from the store and start a session on it.
    pub fn open(store: S, actor: Actor, id: &str) -> Result<Self> {
        let ticket = store.get(id)?;
        Ok(Self::new(store, actor, ticket))
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ticket(&self) -> Ticket {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn decision(&self, now: DateTime<Utc>) -> PolicyDecision {
        policy::evaluate(&self.actor, &self.ticket(), now)
    }

    fn replace(&self, ticket: Ticket) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = ticket;
    }

    /// Submit one transition.
    ///
    /// Refused locally with `IllegalTransition` when the current snapshot
    /// does not allow it. A `TransitionRejected` from the store is returned
    /// as is and never retried; the snapshot is left untouched on any error.
    pub fn request(&self, transition: &Transition, now: DateTime<Utc>) -> Result<Ticket> {
        let current = self.ticket();
        let _guard = InFlight::acquire(&self.in_flight, current.id())?;

        transition::authorize(&self.actor, &current, transition, now)?;

        let next = self.store.submit(&self.actor, current.id(), transition)?;
        debug!(ticket = %next.id(), %transition, "session snapshot replaced");
        self.replace(next.clone());
        Ok(next)
    }

    /// Refetch the snapshot, typically after an `IllegalTransition`.
    pub fn refresh(&self) -> Result<Ticket> {
        let id = self.ticket().id().to_string();
        let _guard = InFlight::acquire(&self.in_flight, &id)?;
        let fresh = self.store.get(&id)?;
        self.replace(fresh.clone());
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::TicketStats;
    use crate::store::{paginate, TicketPage, TicketQuery};
    use crate::ticket::NewTicket;
    use crate::types::{Category, Priority, Role, Severity, TicketStatus, Tier};
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Barrier, Mutex};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn ticket() -> Ticket {
        let new = NewTicket {
            title: "Monitor flickers".into(),
            description: "Second monitor flickers on dock".into(),
            category: Category::HardwareIssue,
            priority: Priority::Low,
            due_date: now() + Duration::days(2),
        };
        Ticket::open("TCK-5E55105E", new, &Actor::new("alice", Role::L1), now())
    }

    /// In-memory store applying the real rules, with optional hooks.
    #[derive(Default)]
    struct MemoryStore {
        tickets: Mutex<Vec<Ticket>>,
        submits: AtomicUsize,
        reject_with: Option<String>,
        gate: Option<(Barrier, Barrier)>,
    }

    impl MemoryStore {
        fn with(t: Ticket) -> Self {
            Self {
                tickets: Mutex::new(vec![t]),
                ..Default::default()
            }
        }

        fn put(&self, t: Ticket) {
            let mut all = self.tickets.lock().unwrap();
            all.retain(|x| x.id() != t.id());
            all.push(t);
        }
    }

    impl TicketStore for MemoryStore {
        fn get(&self, id: &str) -> Result<Ticket> {
            self.tickets
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.id() == id)
                .cloned()
                .ok_or_else(|| HelpdeskError::TicketNotFound(id.to_string()))
        }

        fn list(&self, query: &TicketQuery) -> Result<TicketPage> {
            Ok(paginate(self.tickets.lock().unwrap().clone(), query, 20))
        }

        fn create(&self, _actor: &Actor, _new: NewTicket) -> Result<Ticket> {
            unimplemented!()
        }

        fn submit(&self, actor: &Actor, id: &str, tr: &Transition) -> Result<Ticket> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            if let Some((entered, release)) = &self.gate {
                entered.wait();
                release.wait();
            }
            if let Some(msg) = &self.reject_with {
                return Err(HelpdeskError::TransitionRejected(msg.clone()));
            }
            let next = transition::apply(actor, &self.get(id)?, tr, now())?;
            self.put(next.clone());
            Ok(next)
        }

        fn stats(&self) -> Result<TicketStats> {
            Ok(TicketStats::collect(&self.tickets.lock().unwrap(), now()))
        }
    }

    #[test]
    fn successful_request_replaces_snapshot() {
        let session = TicketSession::new(
            MemoryStore::with(ticket()),
            Actor::new("alice", Role::L1),
            ticket(),
        );
        assert!(session.decision(now()).can_start_work);
        let next = session.request(&Transition::StartWork, now()).unwrap();
        assert_eq!(next.status(), TicketStatus::Attending);
        assert_eq!(session.ticket(), next);
        assert!(!session.is_busy());
        assert!(!session.decision(now()).can_start_work);
    }

    #[test]
    fn illegal_request_never_reaches_store() {
        let session = TicketSession::new(
            MemoryStore::with(ticket()),
            Actor::new("bo", Role::L2),
            ticket(),
        );
        let err = session
            .request(&Transition::SetSeverity(Severity::C1), now())
            .unwrap_err();
        assert!(err.needs_refresh());
        assert_eq!(session.store().submits.load(Ordering::SeqCst), 0);
        assert!(!session.is_busy());
    }

    #[test]
    fn rejection_is_verbatim_and_not_retried() {
        let store = MemoryStore {
            reject_with: Some("Ticket was reassigned".into()),
            ..MemoryStore::with(ticket())
        };
        let session = TicketSession::new(store, Actor::new("alice", Role::L1), ticket());
        let err = session.request(&Transition::StartWork, now()).unwrap_err();
        assert_eq!(err.user_message(), "Ticket was reassigned");
        assert_eq!(session.store().submits.load(Ordering::SeqCst), 1);
        assert_eq!(session.ticket(), ticket());
        assert!(!session.is_busy());
    }

    #[test]
    fn second_request_while_in_flight_is_refused() {
        let store = MemoryStore {
            gate: Some((Barrier::new(2), Barrier::new(2))),
            ..MemoryStore::with(ticket())
        };
        let session = TicketSession::new(store, Actor::new("alice", Role::L1), ticket());

        std::thread::scope(|s| {
            let first = s.spawn(|| session.request(&Transition::StartWork, now()));

            let (entered, release) = session.store().gate.as_ref().unwrap();
            entered.wait();
            assert!(session.is_busy());
            let err = session
                .request(
                    &Transition::Escalate {
                        reason: "double click".into(),
                    },
                    now(),
                )
                .unwrap_err();
            assert!(matches!(err, HelpdeskError::TransitionInFlight(_)));
            release.wait();

            let done = first.join().unwrap().unwrap();
            assert_eq!(done.status(), TicketStatus::Attending);
        });

        assert!(!session.is_busy());
        assert_eq!(session.store().submits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn refresh_picks_up_remote_changes() {
        let store = MemoryStore::with(ticket());
        let moved = transition::apply(
            &Actor::new("carol", Role::L1),
            &ticket(),
            &Transition::Escalate {
                reason: "vendor issue".into(),
            },
            now(),
        )
        .unwrap();
        store.put(moved);

        let session = TicketSession::new(store, Actor::new("alice", Role::L1), ticket());
        // Stale snapshot still says L1, so the request passes the local check
        // and the store refuses it.
        let err = session
            .request(
                &Transition::Escalate {
                    reason: "again".into(),
                },
                now(),
            )
            .unwrap_err();
        assert!(err.needs_refresh());

        let fresh = session.refresh().unwrap();
        assert_eq!(fresh.current_tier(), Tier::L2);
        assert!(!session.decision(now()).can_escalate);
    }

    #[test]
    fn open_fetches_from_store() {
        let session = TicketSession::open(
            MemoryStore::with(ticket()),
            Actor::new("alice", Role::L1),
            "TCK-5E55105E",
        )
        .unwrap();
        assert_eq!(session.ticket().id(), "TCK-5E55105E");
        assert!(matches!(
            TicketSession::open(MemoryStore::default(), Actor::new("a", Role::L1), "TCK-NOPE"),
            Err(HelpdeskError::TicketNotFound(_))
        ));
    }
}
