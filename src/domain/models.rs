use crate::cli::Role;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

#[derive(Serialize)]
pub struct JsonErr {
    pub ok: bool,
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// A document together with the id it is stored under.
#[derive(Debug, Clone, Serialize)]
pub struct Stored<T> {
    pub id: String,
    #[serde(flatten)]
    pub doc: T,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(default)]
    pub email: String,
    #[serde(rename = "posto", default)]
    pub rank: String,
    #[serde(rename = "nomeGuerra", default)]
    pub war_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
}

impl UserProfile {
    /// `"<rank> <war name>"` when both parts are present.
    pub fn officer_label(&self) -> Option<String> {
        let rank = self.rank.trim();
        let war_name = self.war_name.trim();
        if rank.is_empty() || war_name.is_empty() {
            return None;
        }
        Some(format!("{} {}", rank, war_name))
    }

    /// Rank and war name joined, accepting either one alone.
    pub fn rank_and_name(&self) -> Option<String> {
        let label = format!("{} {}", self.rank.trim(), self.war_name.trim())
            .trim()
            .to_string();
        (!label.is_empty()).then_some(label)
    }

    /// Whatever identifies the user best, down to the placeholder.
    pub fn display_label(&self) -> String {
        if let Some(label) = self.rank_and_name() {
            return label;
        }
        if !self.email.trim().is_empty() {
            return self.email.trim().to_string();
        }
        crate::domain::constants::PLACEHOLDER.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub email: String,
    pub salt: String,
    pub hash: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
}

/// Session file contents; the profile is the snapshot taken at sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    #[serde(rename = "Nome", default)]
    pub name: String,
    #[serde(rename = "Tipo", default)]
    pub kind: String,
    #[serde(rename = "Ativo", default = "default_true")]
    pub active: bool,
    #[serde(rename = "nomeLower", default)]
    pub name_lower: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoKind {
    Positivo,
    Negativo,
    Neutro,
}

impl FoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoKind::Positivo => "positivo",
            FoKind::Negativo => "negativo",
            FoKind::Neutro => "neutro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlStatus {
    NaoJulgado,
    JulgadoPendenteControle,
    EmControle,
}

impl ControlStatus {
    fn rank(&self) -> u8 {
        match self {
            ControlStatus::NaoJulgado => 0,
            ControlStatus::JulgadoPendenteControle => 1,
            ControlStatus::EmControle => 2,
        }
    }

    /// Status only ever moves forward.
    pub fn can_advance_to(&self, next: ControlStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlStatus::NaoJulgado => "NAO_JULGADO",
            ControlStatus::JulgadoPendenteControle => "JULGADO_PENDENTE_CONTROLE",
            ControlStatus::EmControle => "EM_CONTROLE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "tipo")]
    pub kind: FoKind,
    #[serde(rename = "descricao", default)]
    pub description: String,

    #[serde(rename = "candidateId", default)]
    pub candidate_id: String,
    #[serde(rename = "candidateNome", default)]
    pub candidate_name: String,
    #[serde(rename = "candidateNomeLower", default)]
    pub candidate_name_lower: String,
    #[serde(rename = "candidateTipo", default)]
    pub candidate_kind: String,

    #[serde(rename = "lancadoPor", default)]
    pub issued_by: String,
    #[serde(rename = "lancadoPorUid", default)]
    pub issued_by_uid: String,

    #[serde(rename = "punicao", default)]
    pub punishment: String,
    #[serde(rename = "jaJulgado", default)]
    pub judged: bool,
    #[serde(rename = "julgadoPor", default)]
    pub judged_by: String,
    #[serde(rename = "julgadoAt", default, skip_serializing_if = "Option::is_none")]
    pub judged_at: Option<i64>,

    #[serde(rename = "createdAt", default)]
    pub created_at: i64,

    #[serde(rename = "statusControle", default, skip_serializing_if = "Option::is_none")]
    pub control_status: Option<ControlStatus>,
    #[serde(rename = "entrouEmControle", default)]
    pub in_control: bool,
    #[serde(rename = "controleId", default, skip_serializing_if = "Option::is_none")]
    pub control_id: Option<String>,
    #[serde(
        rename = "controleFechadoAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub control_closed_at: Option<i64>,
    #[serde(
        rename = "controleFechadoPor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub control_closed_by: Option<String>,
}

impl Observation {
    /// The stored status when one was written, otherwise the status implied
    /// by the judged flag.
    pub fn effective_status(&self) -> ControlStatus {
        match self.control_status {
            Some(ControlStatus::NaoJulgado) if self.judged => {
                ControlStatus::JulgadoPendenteControle
            }
            Some(s) => s,
            None if self.judged => ControlStatus::JulgadoPendenteControle,
            None => ControlStatus::NaoJulgado,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlLine {
    #[serde(rename = "candidateNome")]
    pub candidate_name: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "lancadoPor")]
    pub issued_by: String,
    #[serde(rename = "punicao")]
    pub punishment: String,
    #[serde(rename = "julgadoPor")]
    pub judged_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    EmAndamento,
    #[default]
    Concluido,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::EmAndamento => "EM_ANDAMENTO",
            JobStatus::Concluido => "CONCLUIDO",
        }
    }
}

/// Progress of the observation flips that follow a control's creation.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClosingJob {
    pub status: JobStatus,
    #[serde(rename = "marcados", default)]
    pub marked: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisciplinaryControl {
    #[serde(rename = "controleId")]
    pub control_id: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "totalFos")]
    pub total_fos: usize,
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
    #[serde(rename = "linhas", default)]
    pub lines: Vec<ControlLine>,
    #[serde(rename = "foIds", default)]
    pub fo_ids: Vec<String>,
    #[serde(rename = "fechamento", default)]
    pub job: ClosingJob,
}

#[derive(Serialize, Clone, Debug)]
pub struct SessionInfo {
    pub uid: String,
    pub email: String,
    pub rank: String,
    pub war_name: String,
    pub role: Role,
}

#[derive(Serialize, Clone, Debug)]
pub struct CandidateItem {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub active: bool,
}

#[derive(Serialize, Debug)]
pub struct ImportReport {
    pub rows: usize,
    pub unique: usize,
    pub inserted: usize,
    pub batches: usize,
}

#[derive(Serialize, Debug)]
pub struct CloseReport {
    pub control_id: String,
    pub title: String,
    pub file_name: String,
    pub pdf_path: String,
    pub total_fos: usize,
    pub batches: usize,
    pub marked: usize,
}

#[derive(Serialize, Debug)]
pub struct ResumeReport {
    pub control_id: String,
    pub marked_now: usize,
    pub marked_total: usize,
    pub batches: usize,
}

#[derive(Serialize, Debug)]
pub struct ControlSummary {
    pub control_id: String,
    pub title: String,
    pub file_name: String,
    pub created_by: String,
    pub total_fos: usize,
    pub created_at: i64,
    pub job_status: JobStatus,
    pub marked: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CandidateTally {
    pub name: String,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IssuerTally {
    pub issued_by: String,
    pub negative: usize,
}

#[derive(Serialize, Debug)]
pub struct TieView<T: Serialize> {
    pub total: usize,
    pub index: usize,
    pub next_index: usize,
    pub prev_index: usize,
    pub current: Option<T>,
    pub tied: bool,
    pub items: Vec<T>,
}

#[derive(Serialize, Debug)]
pub struct StatsSummary {
    pub observations: usize,
    pub candidates: usize,
    pub most_sanctioned: Vec<CandidateTally>,
    pub top_issuers: Vec<IssuerTally>,
}

#[derive(Serialize, Debug)]
pub struct PdfReport {
    pub control_id: String,
    pub file_name: String,
    pub pdf_path: String,
    pub lines: usize,
}

/// One statistics panel plus the panels reached by `next`/`prev`.
#[derive(Serialize, Debug)]
pub struct StatPanel<T: Serialize> {
    pub view: &'static str,
    pub next: &'static str,
    pub prev: &'static str,
    pub data: T,
}
