use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use agenda_core::{AggregateRoot, Clock, DomainError, ExpectedVersion, ShareLinkId, TutorId};
use agenda_events::EventPublisher;
use agenda_sharing::{
    EscopoCompartilhamento, ShareLink, ShareLinkProps, ShareLinkSnapshot, SharingEvent,
    TipoRecursoCompartilhado, TokenShare,
};

use crate::config::AppConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::repository::ShareLinkRepository;
use crate::services::publicar;

const AGGREGATE_TYPE: &str = "ShareLink";

/// One scope entry; no identifiers means the whole resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemEscopo {
    pub tipo: TipoRecursoCompartilhado,
    #[serde(default)]
    pub identificadores: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GerarShareLinkInput {
    /// Generated when absent.
    #[serde(default)]
    pub share_link_id: Option<String>,
    pub tutor_id: String,
    /// Generated when absent.
    #[serde(default)]
    pub token: Option<String>,
    pub expiracao: DateTime<Utc>,
    pub escopo: Vec<ItemEscopo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GerarShareLinkOutput {
    pub share_link: ShareLinkSnapshot,
    pub eventos: Vec<SharingEvent>,
}

/// Use case: issue a new share link for a tutor.
pub struct GerarShareLink {
    links: Arc<dyn ShareLinkRepository>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    config: AppConfig,
}

impl GerarShareLink {
    pub fn new(
        links: Arc<dyn ShareLinkRepository>,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
        config: AppConfig,
    ) -> Self {
        Self {
            links,
            clock,
            publisher,
            config,
        }
    }

    #[tracing::instrument(skip(self, input), fields(tutor_id = %input.tutor_id))]
    pub fn execute(&self, input: GerarShareLinkInput) -> ServiceResult<GerarShareLinkOutput> {
        let id = match input.share_link_id.as_deref() {
            Some(raw) => ShareLinkId::parse(raw)?,
            None => ShareLinkId::generate(),
        };
        let tutor_id = TutorId::parse(&input.tutor_id)?;
        let token = match input.token.as_deref() {
            Some(raw) => TokenShare::parse(raw)?,
            None => TokenShare::gerar(),
        };
        if input.escopo.is_empty() {
            return Err(DomainError::validation("share link scope is required").into());
        }
        let escopo = montar_escopo(&input.escopo)?;

        let limite = self.clock.now_utc()
            + Duration::hours(i64::from(self.config.share_link_max_ttl_hours));
        if input.expiracao > limite {
            return Err(DomainError::validation(format!(
                "share link cannot outlive {} hours",
                self.config.share_link_max_ttl_hours
            ))
            .into());
        }

        let mut link = ShareLink::criar(
            ShareLinkProps {
                id,
                tutor_id,
                token,
                escopo,
                expiracao: input.expiracao,
                criado_em: None,
                revogado: None,
            },
            self.clock.as_ref(),
        )?;

        self.links.salvar(&link, ExpectedVersion::Exact(0))?;

        let eventos = link.pull_domain_events();
        publicar(self.publisher.as_ref(), AGGREGATE_TYPE, link.id().as_str(), &eventos)?;

        tracing::info!(share_link_id = %link.id(), expiracao = %link.expiracao(), "share link issued");
        Ok(GerarShareLinkOutput {
            share_link: link.snapshot(),
            eventos,
        })
    }
}

fn montar_escopo(itens: &[ItemEscopo]) -> ServiceResult<EscopoCompartilhamento> {
    let mut escopo = EscopoCompartilhamento::criar_vazio();
    for item in itens {
        escopo.incluir(item.tipo, item.identificadores.as_slice())?;
    }
    Ok(escopo)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcessarShareLinkInput {
    pub token: String,
    pub tipo: TipoRecursoCompartilhado,
    pub recurso_id: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcessarShareLinkOutput {
    pub share_link: ShareLinkSnapshot,
}

/// Use case: resolve a token presented by a third party.
///
/// The access is recorded and published before authorization is decided, so
/// attempts on expired or revoked links are audited too.
pub struct AcessarShareLink {
    links: Arc<dyn ShareLinkRepository>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
}

impl AcessarShareLink {
    pub fn new(
        links: Arc<dyn ShareLinkRepository>,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            links,
            clock,
            publisher,
        }
    }

    #[tracing::instrument(skip(self, input), fields(tipo = %input.tipo, request_id = ?input.request_id))]
    pub fn execute(&self, input: AcessarShareLinkInput) -> ServiceResult<AcessarShareLinkOutput> {
        let mut link = self
            .links
            .obter_por_token(&input.token)?
            .ok_or_else(ServiceError::not_found)?;

        let agora = self.clock.now_utc();
        link.registrar_acesso(self.clock.as_ref(), input.request_id.clone());
        self.links.registrar_acesso(link.token().as_str(), agora)?;

        let eventos = link.pull_domain_events();
        publicar(self.publisher.as_ref(), AGGREGATE_TYPE, link.id().as_str(), &eventos)?;

        if !link.autoriza(self.clock.as_ref(), input.tipo, input.recurso_id.as_deref()) {
            tracing::warn!(share_link_id = %link.id(), "share link access denied");
            return Err(DomainError::Unauthorized.into());
        }

        Ok(AcessarShareLinkOutput {
            share_link: link.snapshot(),
        })
    }
}

/// Use case: revoke a share link by token.
pub struct RevogarShareLink {
    links: Arc<dyn ShareLinkRepository>,
}

impl RevogarShareLink {
    pub fn new(links: Arc<dyn ShareLinkRepository>) -> Self {
        Self { links }
    }

    #[tracing::instrument(skip(self, token))]
    pub fn execute(&self, token: &str) -> ServiceResult<()> {
        let mut link = self
            .links
            .obter_por_token(token)?
            .ok_or_else(ServiceError::not_found)?;

        let expected = ExpectedVersion::Exact(link.version());
        link.revogar();
        self.links.salvar(&link, expected)?;
        tracing::info!(share_link_id = %link.id(), "share link revoked");
        Ok(())
    }
}
