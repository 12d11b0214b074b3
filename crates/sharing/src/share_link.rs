//! `ShareLink` aggregate: a revocable, expiring capability over a typed scope.
//!
//! Validity is always evaluated against a [`Clock`]; nothing here reads the
//! system time directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agenda_core::{AggregateRoot, Clock, DomainError, DomainResult, ShareLinkId, TutorId};
use agenda_events::DomainEvents;

use crate::escopo::{EscopoCompartilhamento, EscopoSnapshot, TipoRecursoCompartilhado};
use crate::events::{ShareLinkAcessado, ShareLinkGerado, SharingEvent};
use crate::token::TokenShare;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinkProps {
    pub id: ShareLinkId,
    pub tutor_id: TutorId,
    pub token: TokenShare,
    pub escopo: EscopoCompartilhamento,
    pub expiracao: DateTime<Utc>,
    /// Defaults to the clock's current instant on creation.
    pub criado_em: Option<DateTime<Utc>>,
    /// Defaults to `false`.
    pub revogado: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLinkSnapshot {
    pub id: ShareLinkId,
    pub tutor_id: TutorId,
    pub token: TokenShare,
    pub expiracao: String,
    pub revogado: bool,
    pub escopo: EscopoSnapshot,
    pub criado_em: String,
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    id: ShareLinkId,
    tutor_id: TutorId,
    token: TokenShare,
    escopo: EscopoCompartilhamento,
    expiracao: DateTime<Utc>,
    revogado: bool,
    criado_em: DateTime<Utc>,
    version: u64,
    events: DomainEvents<SharingEvent>,
}

impl ShareLink {
    /// Issue a new link. Expiry must lie in the future and the scope must not be empty.
    pub fn criar(props: ShareLinkProps, clock: &dyn Clock) -> DomainResult<Self> {
        let agora = clock.now_utc();

        if props.expiracao <= agora {
            return Err(DomainError::validation("share link must expire in the future"));
        }
        if props.escopo.esta_vazio() {
            return Err(DomainError::validation("share link requires a non-empty scope"));
        }

        let criado_em = props.criado_em.unwrap_or(agora);
        let mut link = Self::montar(props, criado_em);
        link.events.record(SharingEvent::ShareLinkGerado(ShareLinkGerado {
            share_link_id: link.id.clone(),
            tutor_id: link.tutor_id.clone(),
            token: link.token.clone(),
            expiracao: link.expiracao,
            occurred_at: agora,
        }));
        Ok(link)
    }

    /// Rebuild a stored link as-is: no expiry check, no events.
    pub fn restaurar(props: ShareLinkProps) -> DomainResult<Self> {
        let criado_em = props
            .criado_em
            .ok_or_else(|| DomainError::validation("stored share link requires criado_em"))?;
        Ok(Self::montar(props, criado_em))
    }

    fn montar(props: ShareLinkProps, criado_em: DateTime<Utc>) -> Self {
        Self {
            id: props.id,
            tutor_id: props.tutor_id,
            token: props.token,
            escopo: props.escopo,
            expiracao: props.expiracao,
            revogado: props.revogado.unwrap_or(false),
            criado_em,
            version: 0,
            events: DomainEvents::new(),
        }
    }

    pub fn from_snapshot(snapshot: &ShareLinkSnapshot) -> DomainResult<Self> {
        let mut link = Self::restaurar(ShareLinkProps {
            id: snapshot.id.clone(),
            tutor_id: snapshot.tutor_id.clone(),
            token: snapshot.token.clone(),
            escopo: EscopoCompartilhamento::from_snapshot(&snapshot.escopo)?,
            expiracao: agenda_core::parse_iso8601(&snapshot.expiracao)?,
            criado_em: Some(agenda_core::parse_iso8601(&snapshot.criado_em)?),
            revogado: Some(snapshot.revogado),
        })?;
        link.version = snapshot.version;
        Ok(link)
    }

    /// Extend the expiry. The new instant must be in the future and later than the current one.
    pub fn renovar(&mut self, nova_expiracao: DateTime<Utc>, clock: &dyn Clock) -> DomainResult<()> {
        if self.revogado {
            return Err(DomainError::invariant("cannot renew a revoked share link"));
        }
        if nova_expiracao <= clock.now_utc() {
            return Err(DomainError::validation("new expiry must be in the future"));
        }
        if nova_expiracao <= self.expiracao {
            return Err(DomainError::validation(
                "new expiry must be later than the current one",
            ));
        }

        self.expiracao = nova_expiracao;
        self.version += 1;
        Ok(())
    }

    /// Revoke permanently.
    pub fn revogar(&mut self) {
        if !self.revogado {
            self.revogado = true;
            self.version += 1;
        }
    }

    pub fn esta_valido(&self, clock: &dyn Clock) -> bool {
        !self.revogado && self.expiracao > clock.now_utc()
    }

    /// Record an access attempt. Always succeeds, even on an expired or revoked link.
    pub fn registrar_acesso(&mut self, clock: &dyn Clock, request_id: Option<String>) {
        self.events.record(SharingEvent::ShareLinkAcessado(ShareLinkAcessado {
            share_link_id: self.id.clone(),
            tutor_id: self.tutor_id.clone(),
            token: self.token.clone(),
            request_id,
            occurred_at: clock.now_utc(),
        }));
    }

    /// Widen the scope; see [`EscopoCompartilhamento::incluir`].
    pub fn inclui_no_escopo<S: AsRef<str>>(
        &mut self,
        tipo: TipoRecursoCompartilhado,
        ids: &[S],
    ) -> DomainResult<()> {
        let mut escopo = self.escopo.clone();
        escopo.incluir(tipo, ids)?;
        if escopo.esta_vazio() {
            return Err(DomainError::invariant("share link scope cannot be empty"));
        }

        self.escopo = escopo;
        self.version += 1;
        Ok(())
    }

    /// Whether the link is currently valid and its scope covers the requested resource.
    pub fn autoriza(
        &self,
        clock: &dyn Clock,
        tipo: TipoRecursoCompartilhado,
        id: Option<&str>,
    ) -> bool {
        self.esta_valido(clock) && self.escopo.abrange(tipo, id)
    }

    pub fn tutor_id(&self) -> &TutorId {
        &self.tutor_id
    }

    pub fn token(&self) -> &TokenShare {
        &self.token
    }

    pub fn escopo(&self) -> &EscopoCompartilhamento {
        &self.escopo
    }

    pub fn expiracao(&self) -> DateTime<Utc> {
        self.expiracao
    }

    pub fn revogado(&self) -> bool {
        self.revogado
    }

    pub fn criado_em(&self) -> DateTime<Utc> {
        self.criado_em
    }

    pub fn pull_domain_events(&mut self) -> Vec<SharingEvent> {
        self.events.pull()
    }

    pub fn snapshot(&self) -> ShareLinkSnapshot {
        ShareLinkSnapshot {
            id: self.id.clone(),
            tutor_id: self.tutor_id.clone(),
            token: self.token.clone(),
            expiracao: agenda_core::iso8601(self.expiracao),
            revogado: self.revogado,
            escopo: self.escopo.snapshot(),
            criado_em: agenda_core::iso8601(self.criado_em),
            version: self.version,
        }
    }
}

impl AggregateRoot for ShareLink {
    type Id = ShareLinkId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::FixedClock;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use TipoRecursoCompartilhado::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn token() -> TokenShare {
        TokenShare::parse("abcdefghijklmnopqrstuvwx-123").unwrap()
    }

    fn escopo_medicamentos() -> EscopoCompartilhamento {
        let mut escopo = EscopoCompartilhamento::criar_vazio();
        escopo.incluir::<&str>(Medicamento, &[]).unwrap();
        escopo
    }

    fn props(expiracao: DateTime<Utc>, escopo: EscopoCompartilhamento) -> ShareLinkProps {
        ShareLinkProps {
            id: ShareLinkId::parse("link-1").unwrap(),
            tutor_id: TutorId::parse("tutor-1").unwrap(),
            token: token(),
            escopo,
            expiracao,
            criado_em: None,
            revogado: None,
        }
    }

    fn link(clock: &FixedClock) -> ShareLink {
        ShareLink::criar(props(now() + Duration::hours(24), escopo_medicamentos()), clock).unwrap()
    }

    #[test]
    fn creation_emits_generated_event() {
        let clock = FixedClock::new(now());
        let mut link = link(&clock);

        assert_eq!(link.criado_em(), now());
        assert!(!link.revogado());
        assert!(link.esta_valido(&clock));

        let events = link.pull_domain_events();
        assert_eq!(
            events,
            vec![SharingEvent::ShareLinkGerado(ShareLinkGerado {
                share_link_id: ShareLinkId::parse("link-1").unwrap(),
                tutor_id: TutorId::parse("tutor-1").unwrap(),
                token: token(),
                expiracao: now() + Duration::hours(24),
                occurred_at: now(),
            })]
        );
        assert!(link.pull_domain_events().is_empty());
    }

    #[test]
    fn creation_rejects_past_expiry_and_empty_scope() {
        let clock = FixedClock::new(now());
        assert!(matches!(
            ShareLink::criar(props(now(), escopo_medicamentos()), &clock),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            ShareLink::criar(
                props(now() + Duration::hours(1), EscopoCompartilhamento::criar_vazio()),
                &clock
            ),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn expiry_scenario() {
        // Valid until the expiry instant itself, invalid from then on.
        let clock = FixedClock::new(now());
        let link = link(&clock);

        clock.set_now(now() + Duration::hours(24) - Duration::seconds(1));
        assert!(link.esta_valido(&clock));

        clock.set_now(now() + Duration::hours(24));
        assert!(!link.esta_valido(&clock));
    }

    #[test]
    fn renewal_rules() {
        let clock = FixedClock::new(now());
        let mut link = link(&clock);
        let atual = link.expiracao();

        assert!(matches!(link.renovar(atual, &clock), Err(DomainError::Validation(_))));
        assert!(link.renovar(now() - Duration::hours(1), &clock).is_err());

        link.renovar(atual + Duration::hours(1), &clock).unwrap();
        assert_eq!(link.expiracao(), atual + Duration::hours(1));
        assert_eq!(link.version(), 1);

        link.revogar();
        assert!(matches!(
            link.renovar(atual + Duration::hours(5), &clock),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn revocation_is_permanent() {
        let clock = FixedClock::new(now());
        let mut link = link(&clock);
        link.revogar();
        link.revogar();
        assert!(link.revogado());
        assert!(!link.esta_valido(&clock));
        assert_eq!(link.version(), 1);
    }

    #[test]
    fn access_is_recorded_even_when_invalid() {
        let clock = FixedClock::new(now());
        let mut link = link(&clock);
        link.pull_domain_events();
        link.revogar();

        link.registrar_acesso(&clock, Some("req-42".to_string()));

        match link.pull_domain_events().as_slice() {
            [SharingEvent::ShareLinkAcessado(e)] => {
                assert_eq!(e.request_id.as_deref(), Some("req-42"));
                assert_eq!(e.occurred_at, now());
            }
            other => panic!("expected one ShareLinkAcessado, got {other:?}"),
        }
    }

    #[test]
    fn scope_widening_and_authorization() {
        let clock = FixedClock::new(now());
        let mut link = link(&clock);

        assert!(link.autoriza(&clock, Medicamento, Some("m1")));
        assert!(!link.autoriza(&clock, Documento, Some("d1")));

        link.inclui_no_escopo(Documento, &["d1"]).unwrap();
        assert!(link.autoriza(&clock, Documento, Some("d1")));
        assert!(!link.autoriza(&clock, Documento, Some("d2")));

        assert!(link.inclui_no_escopo(Documento, &[" "]).is_err());
        assert!(!link.escopo().abrange(Documento, Some("d2")));

        clock.set_now(now() + Duration::days(2));
        assert!(!link.autoriza(&clock, Medicamento, Some("m1")));
    }

    #[test]
    fn restore_skips_validation_and_events() {
        let mut restored = ShareLink::restaurar(ShareLinkProps {
            criado_em: Some(now() - Duration::days(10)),
            revogado: Some(true),
            ..props(now() - Duration::days(1), escopo_medicamentos())
        })
        .unwrap();
        assert!(restored.revogado());
        assert!(ShareLink::restaurar(props(now(), escopo_medicamentos())).is_err());
        assert!(restored.pull_domain_events().is_empty());
    }

    #[test]
    fn snapshot_round_trip() {
        let clock = FixedClock::new(now());
        let mut link = link(&clock);
        link.inclui_no_escopo(Documento, &["d2", "d1"]).unwrap();

        let snapshot = link.snapshot();
        assert_eq!(snapshot.expiracao, "2024-03-02T12:00:00.000Z");
        assert_eq!(snapshot.criado_em, "2024-03-01T12:00:00.000Z");

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["escopo"]["medicamento"], "*");
        assert_eq!(json["escopo"]["documento"], serde_json::json!(["d1", "d2"]));

        let rebuilt = ShareLink::from_snapshot(&snapshot).unwrap();
        assert_eq!(rebuilt.snapshot(), snapshot);
    }

    proptest! {
        /// Property: renewal to an instant not after the current expiry always fails,
        /// whatever the current time.
        #[test]
        fn renewal_must_move_expiry_forward(
            back in 0i64..1_000_000,
            clock_shift in -1_000_000i64..1_000_000,
        ) {
            let clock = FixedClock::new(now());
            let mut link = link(&clock);
            let atual = link.expiracao();

            clock.set_now(now() + Duration::seconds(clock_shift));
            prop_assert!(link.renovar(atual - Duration::seconds(back), &clock).is_err());
            prop_assert_eq!(link.expiracao(), atual);
        }

        /// Property: creation with expiry at or before now always fails.
        #[test]
        fn creation_requires_future_expiry(back in 0i64..1_000_000) {
            let clock = FixedClock::new(now());
            let result = ShareLink::criar(
                props(now() - Duration::seconds(back), escopo_medicamentos()),
                &clock,
            );
            prop_assert!(result.is_err());
        }
    }
}
