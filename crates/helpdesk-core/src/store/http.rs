use crate::error::{HelpdeskError, Result};
use crate::stats::TicketStats;
use crate::store::wire::{
    Envelope, EscalateBody, NoteBody, PageRecord, ResolveBody, SeverityBody, StatusBody,
};
use crate::store::{TicketPage, TicketQuery, TicketStore};
use crate::ticket::{Actor, NewTicket, Ticket, TicketRecord};
use crate::transition::Transition;
use crate::types::TicketStatus;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Client for a remote helpdesk server.
///
/// The server owns the rules. Its refusals (403/409/422 with
/// `success: false`) come back as `TransitionRejected` carrying the server's
/// message untouched.
pub struct HttpStore {
    base_url: String,
    token: Option<String>,
    client: Client,
}

fn transport(e: impl std::fmt::Display) -> HelpdeskError {
    HelpdeskError::Transport(e.to_string())
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(HelpdeskError::Transport("server url is empty".to_string()));
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(transport)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn as_actor(&self, req: RequestBuilder, actor: &Actor) -> RequestBuilder {
        self.authed(req)
            .header(ACTOR_ID_HEADER, &actor.id)
            .header(ACTOR_ROLE_HEADER, actor.role.as_str())
    }

    /// Unwrap the response envelope, mapping failures to domain errors.
    fn read<T: DeserializeOwned>(&self, resp: Response, id: Option<&str>) -> Result<T> {
        let status = resp.status();
        let body = resp.text().map_err(transport)?;
        let envelope: Envelope<serde_json::Value> = match serde_json::from_str(&body) {
            Ok(env) => env,
            Err(_) if !status.is_success() => {
                return Err(HelpdeskError::Transport(format!("HTTP {status}: {body}")))
            }
            Err(e) => return Err(e.into()),
        };

        if status == StatusCode::NOT_FOUND {
            return Err(HelpdeskError::TicketNotFound(
                id.map(str::to_string).unwrap_or(envelope.message),
            ));
        }
        let refused = matches!(
            status,
            StatusCode::FORBIDDEN | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
        );
        if refused && !envelope.success {
            return Err(HelpdeskError::TransitionRejected(envelope.message));
        }
        if !status.is_success() || !envelope.success {
            return Err(HelpdeskError::Transport(format!(
                "HTTP {status}: {}",
                envelope.message
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| HelpdeskError::Transport("response carried no data".to_string()))?;
        Ok(serde_json::from_value(data)?)
    }

    fn read_ticket(&self, resp: Response, id: Option<&str>) -> Result<Ticket> {
        let record: TicketRecord = self.read(resp, id)?;
        Ticket::try_from(record)
    }

    fn send(&self, req: RequestBuilder) -> Result<Response> {
        req.send().map_err(transport)
    }
}

impl TicketStore for HttpStore {
    fn get(&self, id: &str) -> Result<Ticket> {
        let resp = self.send(self.authed(self.client.get(self.url(&format!("/tickets/{id}")))))?;
        self.read_ticket(resp, Some(id))
    }

    fn list(&self, query: &TicketQuery) -> Result<TicketPage> {
        let req = self
            .client
            .get(self.url("/tickets"))
            .query(&query.to_params());
        let resp = self.send(self.authed(req))?;
        let page: PageRecord = self.read(resp, None)?;
        TicketPage::try_from(page)
    }

    fn create(&self, actor: &Actor, new: NewTicket) -> Result<Ticket> {
        let req = self.as_actor(self.client.post(self.url("/tickets")), actor).json(&new);
        let resp = self.send(req)?;
        self.read_ticket(resp, None)
    }

    fn submit(&self, actor: &Actor, id: &str, transition: &Transition) -> Result<Ticket> {
        let base = format!("/tickets/{id}");
        let req = match transition {
            Transition::StartWork => self
                .client
                .patch(self.url(&format!("{base}/status")))
                .json(&StatusBody {
                    status: TicketStatus::Attending,
                }),
            Transition::Complete => self
                .client
                .patch(self.url(&format!("{base}/status")))
                .json(&StatusBody {
                    status: TicketStatus::Completed,
                }),
            Transition::UpdateStatus(status) => self
                .client
                .patch(self.url(&format!("{base}/status")))
                .json(&StatusBody { status: *status }),
            Transition::SetSeverity(sev) => self
                .client
                .patch(self.url(&format!("{base}/critical-value")))
                .json(&SeverityBody {
                    critical_value: *sev,
                }),
            Transition::Escalate { reason } => self
                .client
                .post(self.url(&format!("{base}/escalate")))
                .json(&EscalateBody {
                    to_level: None,
                    reason: reason.clone(),
                    notes: None,
                }),
            Transition::Close { resolution } => self
                .client
                .post(self.url(&format!("{base}/resolve")))
                .json(&ResolveBody {
                    resolution: resolution.clone(),
                }),
            Transition::AddNote { action, details } => self
                .client
                .post(self.url(&format!("{base}/action-log")))
                .json(&NoteBody {
                    action: action.clone(),
                    details: details.clone(),
                }),
        };
        let resp = self.send(self.as_actor(req, actor))?;
        self.read_ticket(resp, Some(id))
    }

    fn stats(&self) -> Result<TicketStats> {
        let resp = self.send(self.authed(self.client.get(self.url("/stats"))))?;
        self.read(resp, None)
    }
}
