//! Capability scope of a share link: which resource kinds (and which ids of each)
//! the bearer may see.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use agenda_core::{DomainError, DomainResult, ValueObject};

/// Kind of resource a share link can expose.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipoRecursoCompartilhado {
    Documento,
    Medicamento,
    Consulta,
    Historico,
}

impl TipoRecursoCompartilhado {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Documento => "documento",
            Self::Medicamento => "medicamento",
            Self::Consulta => "consulta",
            Self::Historico => "historico",
        }
    }
}

impl core::fmt::Display for TipoRecursoCompartilhado {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TipoRecursoCompartilhado {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "documento" => Ok(Self::Documento),
            "medicamento" => Ok(Self::Medicamento),
            "consulta" => Ok(Self::Consulta),
            "historico" => Ok(Self::Historico),
            other => Err(DomainError::validation(format!(
                "unknown shared resource type: {other}"
            ))),
        }
    }
}

/// Access rule for one resource kind.
///
/// Serialized as `"*"` for the wildcard, or as a sorted array of ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permissao {
    Wildcard,
    Ids(BTreeSet<String>),
}

impl Serialize for Permissao {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Permissao::Wildcard => serializer.serialize_str("*"),
            Permissao::Ids(ids) => ids.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Permissao {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Curinga(String),
            Ids(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Curinga(s) if s == "*" => Ok(Permissao::Wildcard),
            Raw::Curinga(s) => Err(serde::de::Error::custom(format!(
                "expected \"*\" or an id array, got {s:?}"
            ))),
            Raw::Ids(ids) => Ok(Permissao::Ids(ids.into_iter().collect())),
        }
    }
}

/// Persisted shape of a scope.
pub type EscopoSnapshot = BTreeMap<TipoRecursoCompartilhado, Permissao>;

/// Mutable scope map. `Clone` yields a fully independent copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscopoCompartilhamento {
    regras: BTreeMap<TipoRecursoCompartilhado, Permissao>,
}

impl ValueObject for EscopoCompartilhamento {}

impl EscopoCompartilhamento {
    pub fn criar_vazio() -> Self {
        Self::default()
    }

    /// Grant access to `ids` of `tipo`; an empty slice grants the whole kind.
    ///
    /// A wildcard is never narrowed: later explicit ids for the same kind are ignored.
    /// Any blank id rejects the whole call and leaves the scope untouched.
    pub fn incluir<S: AsRef<str>>(
        &mut self,
        tipo: TipoRecursoCompartilhado,
        ids: &[S],
    ) -> DomainResult<()> {
        if ids.is_empty() {
            self.regras.insert(tipo, Permissao::Wildcard);
            return Ok(());
        }

        let mut novos = match self.regras.get(&tipo) {
            Some(Permissao::Wildcard) => return Ok(()),
            Some(Permissao::Ids(atuais)) => atuais.clone(),
            None => BTreeSet::new(),
        };
        for id in ids {
            let valor = id.as_ref().trim();
            if valor.is_empty() {
                return Err(DomainError::validation("blank identifier in share scope"));
            }
            novos.insert(valor.to_string());
        }

        self.regras.insert(tipo, Permissao::Ids(novos));
        Ok(())
    }

    /// Grant the whole resource kind.
    pub fn incluir_tudo(&mut self, tipo: TipoRecursoCompartilhado) {
        self.regras.insert(tipo, Permissao::Wildcard);
    }

    /// Whether the scope grants `tipo` (and `id`, when the kind is restricted to ids).
    pub fn abrange(&self, tipo: TipoRecursoCompartilhado, id: Option<&str>) -> bool {
        match self.regras.get(&tipo) {
            None => false,
            Some(Permissao::Wildcard) => true,
            Some(Permissao::Ids(ids)) => id.is_some_and(|id| ids.contains(id)),
        }
    }

    pub fn esta_vazio(&self) -> bool {
        self.regras.is_empty()
    }

    pub fn permissao(&self, tipo: TipoRecursoCompartilhado) -> Option<&Permissao> {
        self.regras.get(&tipo)
    }

    pub fn snapshot(&self) -> EscopoSnapshot {
        self.regras.clone()
    }

    /// Rebuild a scope from its persisted shape; an empty id list is rejected
    /// instead of being widened to the wildcard.
    pub fn from_snapshot(snapshot: &EscopoSnapshot) -> DomainResult<Self> {
        let mut escopo = Self::criar_vazio();
        for (tipo, permissao) in snapshot {
            match permissao {
                Permissao::Wildcard => escopo.incluir_tudo(*tipo),
                Permissao::Ids(ids) if ids.is_empty() => {
                    return Err(DomainError::validation(format!(
                        "stored scope for {tipo} has no identifiers"
                    )));
                }
                Permissao::Ids(ids) => {
                    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                    escopo.incluir(*tipo, &ids)?;
                }
            }
        }
        Ok(escopo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use TipoRecursoCompartilhado::*;

    #[test]
    fn empty_ids_grant_the_whole_kind() {
        let mut escopo = EscopoCompartilhamento::criar_vazio();
        assert!(escopo.esta_vazio());

        escopo.incluir::<&str>(Medicamento, &[]).unwrap();

        assert!(!escopo.esta_vazio());
        assert!(escopo.abrange(Medicamento, None));
        assert!(escopo.abrange(Medicamento, Some("qualquer")));
        assert!(!escopo.abrange(Documento, None));
    }

    #[test]
    fn explicit_ids_only_cover_members() {
        let mut escopo = EscopoCompartilhamento::criar_vazio();
        escopo.incluir(Documento, &["d1", " d2 "]).unwrap();

        assert!(escopo.abrange(Documento, Some("d1")));
        assert!(escopo.abrange(Documento, Some("d2")));
        assert!(!escopo.abrange(Documento, Some("d3")));
        assert!(!escopo.abrange(Documento, None));
    }

    #[test]
    fn explicit_ids_accumulate() {
        let mut escopo = EscopoCompartilhamento::criar_vazio();
        escopo.incluir(Consulta, &["c1"]).unwrap();
        escopo.incluir(Consulta, &["c2"]).unwrap();
        assert!(escopo.abrange(Consulta, Some("c1")));
        assert!(escopo.abrange(Consulta, Some("c2")));
    }

    #[test]
    fn wildcard_is_never_narrowed() {
        let mut escopo = EscopoCompartilhamento::criar_vazio();
        escopo.incluir_tudo(Historico);
        escopo.incluir(Historico, &["h1"]).unwrap();

        assert_eq!(escopo.permissao(Historico), Some(&Permissao::Wildcard));
        assert!(escopo.abrange(Historico, Some("h2")));
    }

    #[test]
    fn ids_widen_to_wildcard() {
        let mut escopo = EscopoCompartilhamento::criar_vazio();
        escopo.incluir(Documento, &["d1"]).unwrap();
        escopo.incluir::<&str>(Documento, &[]).unwrap();
        assert!(escopo.abrange(Documento, Some("outro")));
    }

    #[test]
    fn blank_id_rejects_the_whole_call() {
        let mut escopo = EscopoCompartilhamento::criar_vazio();
        escopo.incluir(Documento, &["d1"]).unwrap();

        let err = escopo.incluir(Documento, &["d2", "  "]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(!escopo.abrange(Documento, Some("d2")));

        let mut vazio = EscopoCompartilhamento::criar_vazio();
        assert!(vazio.incluir(Consulta, &[""]).is_err());
        assert!(vazio.esta_vazio());
    }

    #[test]
    fn clones_are_independent() {
        let mut original = EscopoCompartilhamento::criar_vazio();
        original.incluir(Documento, &["d1"]).unwrap();

        let mut copia = original.clone();
        copia.incluir(Documento, &["d2"]).unwrap();
        copia.incluir_tudo(Consulta);

        assert!(!original.abrange(Documento, Some("d2")));
        assert!(!original.abrange(Consulta, None));
    }

    #[test]
    fn snapshot_renders_wildcard_and_sorted_ids() {
        let mut escopo = EscopoCompartilhamento::criar_vazio();
        escopo.incluir(Documento, &["d2", "d1"]).unwrap();
        escopo.incluir_tudo(Medicamento);

        let json = serde_json::to_value(escopo.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "documento": ["d1", "d2"], "medicamento": "*" })
        );

        let back: EscopoSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(EscopoCompartilhamento::from_snapshot(&back).unwrap(), escopo);
    }

    #[test]
    fn from_snapshot_rejects_empty_id_lists_and_bad_markers() {
        let mut snapshot = EscopoSnapshot::new();
        snapshot.insert(Documento, Permissao::Ids(BTreeSet::new()));
        assert!(EscopoCompartilhamento::from_snapshot(&snapshot).is_err());

        assert!(serde_json::from_str::<EscopoSnapshot>(r#"{"documento":"all"}"#).is_err());
        assert!(serde_json::from_str::<EscopoSnapshot>(r#"{"receita":"*"}"#).is_err());
    }

    #[test]
    fn resource_type_parses_lowercase_names() {
        for tipo in [Documento, Medicamento, Consulta, Historico] {
            assert_eq!(tipo.to_string().parse::<TipoRecursoCompartilhado>().unwrap(), tipo);
        }
        assert!("Receita".parse::<TipoRecursoCompartilhado>().is_err());
    }

    fn tipo_strategy() -> impl Strategy<Value = TipoRecursoCompartilhado> {
        prop_oneof![Just(Documento), Just(Medicamento), Just(Consulta), Just(Historico)]
    }

    proptest! {
        /// Property: a wildcard kind covers every id no matter what is included afterwards.
        #[test]
        fn wildcard_covers_everything(
            tipo in tipo_strategy(),
            later in proptest::collection::vec("[a-z0-9]{1,8}", 0..5),
            consulta in "[a-z0-9]{1,8}",
        ) {
            let mut escopo = EscopoCompartilhamento::criar_vazio();
            escopo.incluir_tudo(tipo);
            escopo.incluir(tipo, &later).unwrap();
            prop_assert!(escopo.abrange(tipo, Some(&consulta)));
            prop_assert!(escopo.abrange(tipo, None));
        }

        /// Property: an explicit set covers exactly its members.
        #[test]
        fn explicit_set_covers_exactly_members(
            tipo in tipo_strategy(),
            ids in proptest::collection::btree_set("[a-z]{1,6}", 1..6),
            consulta in "[0-9]{1,6}",
        ) {
            let mut escopo = EscopoCompartilhamento::criar_vazio();
            let ids: Vec<String> = ids.into_iter().collect();
            escopo.incluir(tipo, &ids).unwrap();
            for id in &ids {
                prop_assert!(escopo.abrange(tipo, Some(id)));
            }
            prop_assert!(!escopo.abrange(tipo, Some(&consulta)));
        }
    }
}
