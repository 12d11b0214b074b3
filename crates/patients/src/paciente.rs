//! `Paciente`: validated patient record owned by a tutor.

use serde::{Deserialize, Serialize};

use agenda_core::{AggregateRoot, DomainError, DomainResult, PacienteId, TutorId};

use crate::plano_saude::{PlanoSaude, PlanoSaudeSnapshot};

const TEXTO_CURTO_MAX: usize = 180;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacienteProps {
    pub id: PacienteId,
    pub tutor_id: TutorId,
    pub nome_completo: String,
    pub condicoes: Vec<String>,
    pub alergias: Vec<String>,
    pub plano_saude: Option<PlanoSaude>,
}

/// Profile fields editable after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerfilPaciente {
    pub nome_completo: String,
    pub condicoes: Vec<String>,
    pub alergias: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacienteSnapshot {
    pub id: PacienteId,
    pub tutor_id: TutorId,
    pub nome_completo: String,
    pub condicoes: Vec<String>,
    pub alergias: Vec<String>,
    pub plano_saude: Option<PlanoSaudeSnapshot>,
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paciente {
    id: PacienteId,
    tutor_id: TutorId,
    nome_completo: String,
    condicoes: Vec<String>,
    alergias: Vec<String>,
    plano_saude: Option<PlanoSaude>,
    version: u64,
}

impl Paciente {
    pub fn criar(props: PacienteProps) -> DomainResult<Self> {
        Ok(Self {
            id: props.id,
            tutor_id: props.tutor_id,
            nome_completo: nome_valido(&props.nome_completo)?,
            condicoes: textos_curtos(&props.condicoes)?,
            alergias: textos_curtos(&props.alergias)?,
            plano_saude: props.plano_saude,
            version: 0,
        })
    }

    pub fn from_snapshot(snapshot: &PacienteSnapshot) -> DomainResult<Self> {
        let plano_saude = snapshot
            .plano_saude
            .as_ref()
            .map(PlanoSaude::from_snapshot)
            .transpose()?;
        let mut paciente = Self::criar(PacienteProps {
            id: snapshot.id.clone(),
            tutor_id: snapshot.tutor_id.clone(),
            nome_completo: snapshot.nome_completo.clone(),
            condicoes: snapshot.condicoes.clone(),
            alergias: snapshot.alergias.clone(),
            plano_saude,
        })?;
        paciente.version = snapshot.version;
        Ok(paciente)
    }

    /// Replace the editable profile; all fields are validated before anything changes.
    pub fn atualizar_perfil(&mut self, perfil: PerfilPaciente) -> DomainResult<()> {
        let nome = nome_valido(&perfil.nome_completo)?;
        let condicoes = textos_curtos(&perfil.condicoes)?;
        let alergias = textos_curtos(&perfil.alergias)?;

        self.nome_completo = nome;
        self.condicoes = condicoes;
        self.alergias = alergias;
        self.version += 1;
        Ok(())
    }

    pub fn vincular_plano_saude(&mut self, plano: PlanoSaude) {
        self.plano_saude = Some(plano);
        self.version += 1;
    }

    pub fn tutor_id(&self) -> &TutorId {
        &self.tutor_id
    }

    pub fn nome_completo(&self) -> &str {
        &self.nome_completo
    }

    pub fn condicoes(&self) -> &[String] {
        &self.condicoes
    }

    pub fn alergias(&self) -> &[String] {
        &self.alergias
    }

    pub fn plano_saude(&self) -> Option<&PlanoSaude> {
        self.plano_saude.as_ref()
    }

    pub fn snapshot(&self) -> PacienteSnapshot {
        PacienteSnapshot {
            id: self.id.clone(),
            tutor_id: self.tutor_id.clone(),
            nome_completo: self.nome_completo.clone(),
            condicoes: self.condicoes.clone(),
            alergias: self.alergias.clone(),
            plano_saude: self.plano_saude.as_ref().map(PlanoSaude::snapshot),
            version: self.version,
        }
    }
}

impl AggregateRoot for Paciente {
    type Id = PacienteId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn nome_valido(raw: &str) -> DomainResult<String> {
    let nome = raw.trim();
    if nome.is_empty() {
        return Err(DomainError::validation("patient name cannot be empty"));
    }
    Ok(nome.to_string())
}

// Blank entries are dropped.
fn textos_curtos(itens: &[String]) -> DomainResult<Vec<String>> {
    itens
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| {
            if item.chars().count() > TEXTO_CURTO_MAX {
                Err(DomainError::validation(format!(
                    "text exceeds {TEXTO_CURTO_MAX} characters"
                )))
            } else {
                Ok(item.to_string())
            }
        })
        .collect()
}
