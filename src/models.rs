use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Owning company. Every identity, project and work belongs to exactly one.
pub type TenantId = u64;

/// Identity record as supplied by the persistence layer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub tenant_id: TenantId,
}

/// Signed session claims. Opaque to everything but the session authority.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    #[serde(rename = "companyId")]
    pub tenant_id: TenantId,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Integer percentage, always within 0..=100.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(from = "i64", into = "u8")]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const FULL: Percent = Percent(100);

    pub fn new(value: i64) -> Self {
        Percent(value.clamp(0, 100) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl From<i64> for Percent {
    fn from(value: i64) -> Self {
        Percent::new(value)
    }
}

impl From<Percent> for u8 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Lifecycle phase shared by both status enums; display rules key off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

/// Common behaviour of `ProjectStatus` and `WorkStatus`.
pub trait Status: Copy + Eq + fmt::Debug + FromStr<Err = UnknownStatus> + 'static {
    /// Every variant in board order.
    const ALL: &'static [Self];
    /// Status assigned on create.
    const INITIAL: Self;

    fn phase(self) -> Phase;
    fn wire_name(self) -> &'static str;
    /// pt-BR label shown to users
    fn label(self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status {0:?}")]
pub struct UnknownStatus(pub String);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl Status for ProjectStatus {
    const ALL: &'static [Self] = &[
        ProjectStatus::Planning,
        ProjectStatus::InProgress,
        ProjectStatus::OnHold,
        ProjectStatus::Completed,
        ProjectStatus::Cancelled,
    ];
    const INITIAL: Self = ProjectStatus::Planning;

    fn phase(self) -> Phase {
        match self {
            ProjectStatus::Planning => Phase::Pending,
            ProjectStatus::InProgress => Phase::Active,
            ProjectStatus::OnHold => Phase::OnHold,
            ProjectStatus::Completed => Phase::Completed,
            ProjectStatus::Cancelled => Phase::Cancelled,
        }
    }

    fn wire_name(self) -> &'static str {
        match self {
            ProjectStatus::Planning => "PLANNING",
            ProjectStatus::InProgress => "IN_PROGRESS",
            ProjectStatus::OnHold => "ON_HOLD",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Cancelled => "CANCELLED",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ProjectStatus::Planning => "Planejamento",
            ProjectStatus::InProgress => "Em Andamento",
            ProjectStatus::OnHold => "Pausado",
            ProjectStatus::Completed => "Concluído",
            ProjectStatus::Cancelled => "Cancelado",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.wire_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkStatus {
    NotStarted,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl Status for WorkStatus {
    const ALL: &'static [Self] = &[
        WorkStatus::NotStarted,
        WorkStatus::InProgress,
        WorkStatus::OnHold,
        WorkStatus::Completed,
        WorkStatus::Cancelled,
    ];
    const INITIAL: Self = WorkStatus::NotStarted;

    fn phase(self) -> Phase {
        match self {
            WorkStatus::NotStarted => Phase::Pending,
            WorkStatus::InProgress => Phase::Active,
            WorkStatus::OnHold => Phase::OnHold,
            WorkStatus::Completed => Phase::Completed,
            WorkStatus::Cancelled => Phase::Cancelled,
        }
    }

    fn wire_name(self) -> &'static str {
        match self {
            WorkStatus::NotStarted => "NOT_STARTED",
            WorkStatus::InProgress => "IN_PROGRESS",
            WorkStatus::OnHold => "ON_HOLD",
            WorkStatus::Completed => "COMPLETED",
            WorkStatus::Cancelled => "CANCELLED",
        }
    }

    fn label(self) -> &'static str {
        match self {
            WorkStatus::NotStarted => "Não Iniciado",
            WorkStatus::InProgress => "Em Andamento",
            WorkStatus::OnHold => "Pausado",
            WorkStatus::Completed => "Concluído",
            WorkStatus::Cancelled => "Cancelado",
        }
    }
}

impl FromStr for WorkStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.wire_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Top-level construction initiative.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub actual_cost: Option<f64>,
    pub progress: Percent,
    pub manager: String,
    pub works_count: u32,
}

/// A task or phase (obra) inside a project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub location: String,
    pub status: WorkStatus,
    pub progress: Percent,
    pub planned_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub project_id: u64,
    /// Copy of the project's name at create time, kept for search
    pub project_name: String,
    pub assignee: String,
    pub quality_score: Option<Percent>,
    pub last_update: NaiveDate,
}

/// Form submission for a new project. Missing strings deserialize as blank so
/// that validation, not parsing, reports them.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    #[serde(default)]
    pub manager: String,
}

/// Form submission for a new work.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub planned_cost: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub project_id: Option<u64>,
    #[serde(default)]
    pub assignee: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Work,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::Work => "work",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
