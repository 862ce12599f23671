//! Demo identity and sample portfolio
//!
//! Used by the `load_data` binary and by tests.

use chrono::NaiveDate;
use tracing::info;

use crate::auth::hash_password;
use crate::error::StoreError;
use crate::models::{Identity, Percent, Project, ProjectStatus, TenantId, Work, WorkStatus};
use crate::storage::{EntityRepository, SledStorage};

pub const DEMO_EMAIL: &str = "admin@construcao.com";
pub const DEMO_PASSWORD: &str = "admin123";
pub const DEMO_TENANT: TenantId = 1;

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("sample dates are valid")
}

pub fn demo_identity(bcrypt_cost: u32) -> Result<Identity, bcrypt::BcryptError> {
    Ok(Identity {
        subject_id: "1".to_string(),
        email: DEMO_EMAIL.to_string(),
        password_hash: hash_password(DEMO_PASSWORD, bcrypt_cost)?,
        display_name: "Administrador".to_string(),
        tenant_id: DEMO_TENANT,
    })
}

pub fn sample_projects() -> Vec<Project> {
    vec![
        Project {
            id: 1,
            name: "Residencial Jardim das Flores".to_string(),
            description: "Construção de condomínio residencial com 120 unidades".to_string(),
            status: ProjectStatus::InProgress,
            start_date: ymd(2024, 1, 15),
            end_date: Some(ymd(2024, 12, 30)),
            budget: Some(2_500_000.0),
            actual_cost: Some(1_200_000.0),
            progress: Percent::new(48),
            manager: "João Silva".to_string(),
            works_count: 2,
        },
        Project {
            id: 2,
            name: "Centro Comercial Plaza".to_string(),
            description: "Construção de centro comercial com 50 lojas".to_string(),
            status: ProjectStatus::Planning,
            start_date: ymd(2024, 3, 1),
            end_date: Some(ymd(2025, 2, 28)),
            budget: Some(4_200_000.0),
            actual_cost: Some(0.0),
            progress: Percent::new(5),
            manager: "Maria Santos".to_string(),
            works_count: 1,
        },
        Project {
            id: 3,
            name: "Galpão Industrial Norte".to_string(),
            description: "Construção de galpão industrial de 5000m²".to_string(),
            status: ProjectStatus::InProgress,
            start_date: ymd(2023, 10, 1),
            end_date: Some(ymd(2024, 6, 30)),
            budget: Some(1_800_000.0),
            actual_cost: Some(1_650_000.0),
            progress: Percent::new(92),
            manager: "Carlos Oliveira".to_string(),
            works_count: 1,
        },
        Project {
            id: 4,
            name: "Reforma Hospital Central".to_string(),
            description: "Reforma e ampliação do hospital central".to_string(),
            status: ProjectStatus::OnHold,
            start_date: ymd(2024, 2, 1),
            end_date: None,
            budget: Some(3_500_000.0),
            actual_cost: Some(450_000.0),
            progress: Percent::new(12),
            manager: "Ana Costa".to_string(),
            works_count: 1,
        },
    ]
}

/// Works of `sample_projects`, referencing them by id.
pub fn sample_works() -> Vec<Work> {
    vec![
        Work {
            id: 1,
            name: "Fundação Bloco A".to_string(),
            description: "Execução da fundação do bloco residencial A".to_string(),
            location: "Jardim das Flores - Quadra 1".to_string(),
            status: WorkStatus::Completed,
            progress: Percent::new(100),
            planned_cost: Some(180_000.0),
            actual_cost: Some(175_000.0),
            start_date: Some(ymd(2024, 1, 15)),
            end_date: Some(ymd(2024, 2, 28)),
            project_id: 1,
            project_name: "Residencial Jardim das Flores".to_string(),
            assignee: "Equipe Alpha".to_string(),
            quality_score: Some(Percent::new(95)),
            last_update: ymd(2024, 2, 28),
        },
        Work {
            id: 2,
            name: "Estrutura Bloco B".to_string(),
            description: "Construção da estrutura de concreto armado".to_string(),
            location: "Jardim das Flores - Quadra 2".to_string(),
            status: WorkStatus::InProgress,
            progress: Percent::new(65),
            planned_cost: Some(320_000.0),
            actual_cost: Some(210_000.0),
            start_date: Some(ymd(2024, 2, 1)),
            end_date: Some(ymd(2024, 5, 30)),
            project_id: 1,
            project_name: "Residencial Jardim das Flores".to_string(),
            assignee: "Equipe Beta".to_string(),
            quality_score: Some(Percent::new(88)),
            last_update: ymd(2024, 3, 15),
        },
        Work {
            id: 3,
            name: "Instalações Elétricas".to_string(),
            description: "Instalação do sistema elétrico completo".to_string(),
            location: "Centro Comercial Plaza".to_string(),
            status: WorkStatus::NotStarted,
            progress: Percent::ZERO,
            planned_cost: Some(450_000.0),
            actual_cost: Some(0.0),
            start_date: Some(ymd(2024, 4, 1)),
            end_date: Some(ymd(2024, 7, 15)),
            project_id: 2,
            project_name: "Centro Comercial Plaza".to_string(),
            assignee: "Equipe Gamma".to_string(),
            quality_score: None,
            last_update: ymd(2024, 3, 1),
        },
        Work {
            id: 4,
            name: "Cobertura Industrial".to_string(),
            description: "Instalação da cobertura metálica do galpão".to_string(),
            location: "Galpão Industrial Norte".to_string(),
            status: WorkStatus::InProgress,
            progress: Percent::new(85),
            planned_cost: Some(280_000.0),
            actual_cost: Some(265_000.0),
            start_date: Some(ymd(2024, 1, 10)),
            end_date: Some(ymd(2024, 4, 30)),
            project_id: 3,
            project_name: "Galpão Industrial Norte".to_string(),
            assignee: "Equipe Delta".to_string(),
            quality_score: Some(Percent::new(92)),
            last_update: ymd(2024, 3, 20),
        },
        Work {
            id: 5,
            name: "Reforma Ala Norte".to_string(),
            description: "Reforma completa da ala norte do hospital".to_string(),
            location: "Hospital Central".to_string(),
            status: WorkStatus::OnHold,
            progress: Percent::new(25),
            planned_cost: Some(680_000.0),
            actual_cost: Some(170_000.0),
            start_date: Some(ymd(2024, 2, 1)),
            end_date: None,
            project_id: 4,
            project_name: "Reforma Hospital Central".to_string(),
            assignee: "Equipe Epsilon".to_string(),
            quality_score: Some(Percent::new(78)),
            last_update: ymd(2024, 3, 10),
        },
    ]
}

/// Save the sample projects and works under `tenant`. Re-running overwrites
/// the same ids.
pub fn load_sample_portfolio<R: EntityRepository>(repo: &R, tenant: TenantId) -> Result<(), StoreError> {
    let projects = sample_projects();
    let works = sample_works();
    for project in &projects {
        repo.save_entity(tenant, project)?;
    }
    for work in &works {
        repo.save_entity(tenant, work)?;
    }
    info!(tenant, projects = projects.len(), works = works.len(), "sample portfolio loaded");
    Ok(())
}

/// Demo identity plus sample portfolio, ready to log in with `DEMO_EMAIL`.
pub fn seed_demo(storage: &SledStorage, bcrypt_cost: u32) -> Result<Identity, Box<dyn std::error::Error>> {
    let identity = demo_identity(bcrypt_cost)?;
    storage.put_identity(&identity)?;
    load_sample_portfolio(storage, identity.tenant_id)?;
    Ok(identity)
}
