use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agenda_core::{ShareLinkId, TutorId};
use agenda_events::Event;

use crate::token::TokenShare;

/// Event: ShareLinkGerado (a tutor issued a new share link).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLinkGerado {
    pub share_link_id: ShareLinkId,
    pub tutor_id: TutorId,
    pub token: TokenShare,
    pub expiracao: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShareLinkAcessado (someone presented the link's token).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLinkAcessado {
    pub share_link_id: ShareLinkId,
    pub tutor_id: TutorId,
    pub token: TokenShare,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum SharingEvent {
    ShareLinkGerado(ShareLinkGerado),
    ShareLinkAcessado(ShareLinkAcessado),
}

impl Event for SharingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SharingEvent::ShareLinkGerado(_) => "ShareLinkGerado",
            SharingEvent::ShareLinkAcessado(_) => "ShareLinkAcessado",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SharingEvent::ShareLinkGerado(e) => e.occurred_at,
            SharingEvent::ShareLinkAcessado(e) => e.occurred_at,
        }
    }
}
