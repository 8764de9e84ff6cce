use crate::config::{Config, ListConfig};
use crate::error::{HelpdeskError, Result};
use crate::stats::TicketStats;
use crate::store::{paginate, TicketPage, TicketQuery, TicketStore};
use crate::ticket::{Actor, NewTicket, Ticket, TicketRecord};
use crate::transition::{self, Transition};
use crate::{io, paths};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// YAML manifests under `.helpdesk/tickets/<id>.yaml`.
///
/// Every write runs through [`transition::apply`] against the wall clock, so
/// this store enforces the lifecycle rules itself; a policy refusal becomes
/// `TransitionRejected`.
pub struct FileStore {
    root: PathBuf,
    page_size: u32,
    clock: fn() -> DateTime<Utc>,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            page_size: ListConfig::default().default_limit,
            clock: Utc::now,
            write_lock: Mutex::new(()),
        }
    }

    /// Open the store for an initialized workspace, taking the page size
    /// from its config.
    pub fn open(root: &Path) -> Result<Self> {
        let config = Config::load(root)?;
        Ok(Self::new(root).with_page_size(config.page_size()))
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Replace the wall clock; used to pin time in tests.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn load(&self, id: &str) -> Result<Ticket> {
        paths::validate_ticket_id(id)?;
        let path = paths::ticket_path(&self.root, id);
        if !path.exists() {
            return Err(HelpdeskError::TicketNotFound(id.to_string()));
        }
        read_ticket(&path)
    }

    fn write(&self, ticket: &Ticket) -> Result<()> {
        io::write_yaml(&paths::ticket_path(&self.root, ticket.id()), ticket)
    }

    /// Every readable ticket. Manifests that fail validation are skipped
    /// with a warning so one bad file does not hide the rest.
    pub fn load_all(&self) -> Result<Vec<Ticket>> {
        let dir = paths::tickets_dir(&self.root);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut tickets = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            match read_ticket(&path) {
                Ok(t) => tickets.push(t),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable ticket"),
            }
        }
        Ok(tickets)
    }
}

/// Parses the manifest loosely, then requires the fields a ticket cannot
/// exist without, so a hand-edited file reports which one is missing.
fn read_ticket(path: &Path) -> Result<Ticket> {
    let record: TicketRecord = io::read_yaml(path)?;
    Ticket::try_from(record)
}

impl TicketStore for FileStore {
    fn get(&self, id: &str) -> Result<Ticket> {
        self.load(id)
    }

    fn list(&self, query: &TicketQuery) -> Result<TicketPage> {
        Ok(paginate(self.load_all()?, query, self.page_size))
    }

    fn create(&self, actor: &Actor, new: NewTicket) -> Result<Ticket> {
        let _guard = self.lock();
        let id = paths::generate_ticket_id();
        if paths::ticket_path(&self.root, &id).exists() {
            return Err(HelpdeskError::TicketExists(id));
        }
        let ticket = transition::create(actor, &id, new, (self.clock)())?;
        self.write(&ticket)?;
        Ok(ticket)
    }

    fn submit(&self, actor: &Actor, id: &str, transition: &Transition) -> Result<Ticket> {
        let _guard = self.lock();
        let current = self.load(id)?;
        let next = match transition::apply(actor, &current, transition, (self.clock)()) {
            Ok(next) => next,
            Err(e @ HelpdeskError::IllegalTransition { .. }) => {
                return Err(HelpdeskError::TransitionRejected(e.to_string()))
            }
            Err(e) => return Err(e),
        };
        self.write(&next)?;
        Ok(next)
    }

    fn stats(&self) -> Result<TicketStats> {
        Ok(TicketStats::collect(&self.load_all()?, (self.clock)()))
    }
}
