//! Tenant-scoped portfolio: the project and work stores of one company,
//! loaded from and written back to an `EntityRepository`.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::collection::{EntityStore, LinkedWorkDraft};
use crate::error::StoreError;
use crate::models::{
    EntityKind, Phase, Project, ProjectDraft, Status, TenantId, Work, WorkDraft,
};
use crate::storage::EntityRepository;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: &'static str,
    pub label: &'static str,
    pub count: usize,
}

/// Dashboard figures for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_projects: usize,
    pub active_works: usize,
    pub total_budget: f64,
    pub total_actual_cost: f64,
    /// Mean of the works that have a quality score
    pub average_quality: Option<f64>,
    pub projects_by_status: Vec<StatusCount>,
    pub works_by_status: Vec<StatusCount>,
}

fn status_counts<S: Status>(counts: Vec<(S, usize)>) -> Vec<StatusCount> {
    counts
        .into_iter()
        .map(|(status, count)| StatusCount {
            status: status.wire_name(),
            label: status.label(),
            count,
        })
        .collect()
}

pub struct Portfolio<'r, R: EntityRepository> {
    repo: &'r R,
    tenant: TenantId,
    projects: EntityStore<Project>,
    works: EntityStore<Work>,
}

impl<'r, R: EntityRepository> Portfolio<'r, R> {
    /// `works_count` is recomputed from the loaded works; the persisted value
    /// is never trusted.
    pub fn load(repo: &'r R, tenant: TenantId) -> Result<Self, StoreError> {
        let works: EntityStore<Work> = EntityStore::from_entities(repo.load_entities(tenant)?)?;
        let mut projects: Vec<Project> = repo.load_entities(tenant)?;
        for project in &mut projects {
            project.works_count = works.iter().filter(|w| w.project_id == project.id).count() as u32;
        }
        let projects = EntityStore::from_entities(projects)?;
        Ok(Self {
            repo,
            tenant,
            projects,
            works,
        })
    }

    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    pub fn projects(&self) -> &EntityStore<Project> {
        &self.projects
    }

    pub fn works(&self) -> &EntityStore<Work> {
        &self.works
    }

    pub fn create_project(&mut self, draft: ProjectDraft, today: NaiveDate) -> Result<Project, StoreError> {
        let (repo, tenant) = (self.repo, self.tenant);
        let project = self
            .projects
            .create_with(draft, today, || repo.next_id(EntityKind::Project, tenant))?
            .clone();
        repo.save_entity(tenant, &project)?;
        info!(tenant, id = project.id, "project created");
        Ok(project)
    }

    /// Creates the work and bumps its project's in-memory `works_count`. Only
    /// the work is written; the count is derived again on every load.
    pub fn create_work(&mut self, draft: WorkDraft, today: NaiveDate) -> Result<Work, StoreError> {
        let (repo, tenant) = (self.repo, self.tenant);
        let linked = LinkedWorkDraft::resolve(draft, &self.projects);
        let work = self
            .works
            .create_with(linked, today, || repo.next_id(EntityKind::Work, tenant))?
            .clone();
        repo.save_entity(tenant, &work)?;

        let mut project = self
            .projects
            .get(work.project_id)
            .cloned()
            .ok_or(StoreError::UnknownEntity {
                kind: EntityKind::Project.as_str(),
                id: work.project_id,
            })?;
        project.works_count += 1;
        self.projects.replace(project)?;

        info!(tenant, id = work.id, project = work.project_id, "work created");
        Ok(work)
    }

    pub fn summary(&self) -> PortfolioSummary {
        let scores: Vec<f64> = self
            .works
            .iter()
            .filter_map(|work| work.quality_score)
            .map(|score| f64::from(score.get()))
            .collect();
        let average_quality = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };

        PortfolioSummary {
            total_projects: self.projects.len(),
            active_works: self
                .works
                .iter()
                .filter(|work| work.status.phase() == Phase::Active)
                .count(),
            total_budget: self.projects.iter().filter_map(|p| p.budget).sum(),
            total_actual_cost: self.projects.iter().filter_map(|p| p.actual_cost).sum(),
            average_quality,
            projects_by_status: status_counts(self.projects.status_counts()),
            works_by_status: status_counts(self.works.status_counts()),
        }
    }
}
