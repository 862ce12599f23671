//! In-memory entity collections (projects, works)
//!
//! An `EntityStore` holds one tenant's records of one kind in insertion order.
//! Views read through `list`/`board`; the only mutations are `create` (validated
//! drafts) and whole-record `replace`.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::display::{self, ProgressBand};
use crate::error::{StoreError, ValidationError};
use crate::models::{
    EntityKind, Percent, Project, ProjectDraft, ProjectStatus, Status, UnknownStatus, Work,
    WorkDraft, WorkStatus,
};

/// A record kept in an `EntityStore`.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    type Status: Status;
    const KIND: EntityKind;

    fn id(&self) -> u64;
    fn status(&self) -> Self::Status;
    fn progress(&self) -> Percent;
    /// Fields matched by free-text search
    fn searchable_fields(&self) -> Vec<&str>;

    /// `needle` must already be lowercase.
    fn matches_text(&self, needle: &str) -> bool {
        needle.is_empty()
            || self
                .searchable_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(needle))
    }

    fn display_progress(&self) -> Percent {
        display::display_progress(self.progress(), self.status().phase())
    }

    fn progress_band(&self) -> ProgressBand {
        display::progress_band(self.progress(), self.status().phase())
    }
}

impl Entity for Project {
    type Status = ProjectStatus;
    const KIND: EntityKind = EntityKind::Project;

    fn id(&self) -> u64 {
        self.id
    }

    fn status(&self) -> Self::Status {
        self.status
    }

    fn progress(&self) -> Percent {
        self.progress
    }

    fn searchable_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str()]
    }
}

impl Entity for Work {
    type Status = WorkStatus;
    const KIND: EntityKind = EntityKind::Work;

    fn id(&self) -> u64 {
        self.id
    }

    fn status(&self) -> Self::Status {
        self.status
    }

    fn progress(&self) -> Percent {
        self.progress
    }

    fn searchable_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.location.as_str(),
            self.project_name.as_str(),
        ]
    }
}

/// A create request that validates itself and builds the stored record.
pub trait Draft {
    type Entity: Entity;

    fn validate(&self) -> Result<(), ValidationError>;
    fn build(self, id: u64, today: NaiveDate) -> Self::Entity;
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn check_dates(errors: &mut ValidationError, start: Option<NaiveDate>, end: Option<NaiveDate>) {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            errors.push("endDate", "must not be before startDate");
        }
    }
}

fn check_amount(errors: &mut ValidationError, field: &'static str, amount: Option<f64>) {
    if let Some(amount) = amount {
        if !amount.is_finite() || amount < 0.0 {
            errors.push(field, "must be a non-negative amount");
        }
    }
}

impl Draft for ProjectDraft {
    type Entity = Project;

    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        if is_blank(&self.name) {
            errors.push("name", "is required");
        }
        if self.start_date.is_none() {
            errors.push("startDate", "is required");
        }
        if is_blank(&self.manager) {
            errors.push("manager", "is required");
        }
        check_amount(&mut errors, "budget", self.budget);
        check_dates(&mut errors, self.start_date, self.end_date);
        errors.into_result()
    }

    fn build(self, id: u64, _today: NaiveDate) -> Project {
        Project {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            status: ProjectStatus::INITIAL,
            start_date: self.start_date.unwrap_or_default(),
            end_date: self.end_date,
            budget: self.budget,
            actual_cost: Some(0.0),
            progress: Percent::ZERO,
            manager: self.manager.trim().to_string(),
            works_count: 0,
        }
    }
}

/// A `WorkDraft` resolved against the tenant's projects.
///
/// Works reference projects by id; the project's name is copied onto the work
/// so free-text search can match it.
#[derive(Debug, Clone)]
pub struct LinkedWorkDraft {
    draft: WorkDraft,
    project_name: Option<String>,
}

impl LinkedWorkDraft {
    pub fn resolve(draft: WorkDraft, projects: &EntityStore<Project>) -> Self {
        let project_name = draft
            .project_id
            .and_then(|id| projects.get(id))
            .map(|project| project.name.clone());
        Self {
            draft,
            project_name,
        }
    }
}

impl Draft for LinkedWorkDraft {
    type Entity = Work;

    fn validate(&self) -> Result<(), ValidationError> {
        let draft = &self.draft;
        let mut errors = ValidationError::new();
        if is_blank(&draft.name) {
            errors.push("name", "is required");
        }
        match (draft.project_id, &self.project_name) {
            (None, _) => errors.push("projectId", "is required"),
            (Some(id), None) => {
                errors.push("projectId", format!("project {} does not exist", id))
            }
            (Some(_), Some(_)) => {}
        }
        if is_blank(&draft.assignee) {
            errors.push("assignee", "is required");
        }
        check_amount(&mut errors, "plannedCost", draft.planned_cost);
        check_dates(&mut errors, draft.start_date, draft.end_date);
        errors.into_result()
    }

    fn build(self, id: u64, today: NaiveDate) -> Work {
        let draft = self.draft;
        Work {
            id,
            name: draft.name.trim().to_string(),
            description: draft.description,
            location: draft.location,
            status: WorkStatus::INITIAL,
            progress: Percent::ZERO,
            planned_cost: draft.planned_cost,
            actual_cost: Some(0.0),
            start_date: draft.start_date,
            end_date: draft.end_date,
            project_id: draft.project_id.unwrap_or_default(),
            project_name: self.project_name.unwrap_or_default(),
            assignee: draft.assignee.trim().to_string(),
            quality_score: None,
            last_update: today,
        }
    }
}

/// Status restriction for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter<S> {
    All,
    Only(S),
}

impl<S: Status> StatusFilter<S> {
    fn accepts(&self, status: S) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl<S: Status> FromStr for StatusFilter<S> {
    type Err = UnknownStatus;

    /// `"all"` (or nothing) means no restriction; anything else must be a status wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter<S> {
    pub text: Option<String>,
    pub status: StatusFilter<S>,
}

impl<S> Default for ListFilter<S> {
    fn default() -> Self {
        Self {
            text: None,
            status: StatusFilter::All,
        }
    }
}

impl<S: Status> ListFilter<S> {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_status(mut self, status: S) -> Self {
        self.status = StatusFilter::Only(status);
        self
    }
}

/// Ordered, id-unique collection of one entity kind.
#[derive(Debug, Clone)]
pub struct EntityStore<E: Entity> {
    items: Vec<E>,
    /// Highest id ever issued or loaded. Never derived from `items.len()`.
    last_id: u64,
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            last_id: 0,
        }
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-persisted records, keeping their order.
    pub fn from_entities(items: Vec<E>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for item in items {
            store.append(item)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.items.iter()
    }

    pub fn get(&self, id: u64) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Filtered view in insertion order. Never mutates the collection.
    pub fn list(&self, filter: &ListFilter<E::Status>) -> Vec<&E> {
        let needle = filter
            .text
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.items
            .iter()
            .filter(|item| filter.status.accepts(item.status()) && item.matches_text(&needle))
            .collect()
    }

    /// Validate and append a draft, numbering it from the store's own sequence.
    pub fn create<D>(&mut self, draft: D, today: NaiveDate) -> Result<&E, ValidationError>
    where
        D: Draft<Entity = E>,
    {
        draft.validate()?;
        let id = self.last_id + 1;
        self.last_id = id;
        self.items.push(draft.build(id, today));
        Ok(&self.items[self.items.len() - 1])
    }

    /// Validate and append a draft, taking the id from `allocate`. The
    /// allocator only runs once validation has passed.
    pub fn create_with<D, F>(&mut self, draft: D, today: NaiveDate, allocate: F) -> Result<&E, StoreError>
    where
        D: Draft<Entity = E>,
        F: FnOnce() -> Result<u64, StoreError>,
    {
        draft.validate()?;
        let id = allocate()?;
        self.append(draft.build(id, today))
    }

    /// Whole-record replacement keyed by id. Returns the previous record.
    pub fn replace(&mut self, entity: E) -> Result<E, StoreError> {
        let slot = self
            .items
            .iter_mut()
            .find(|item| item.id() == entity.id())
            .ok_or(StoreError::UnknownEntity {
                kind: E::KIND.as_str(),
                id: entity.id(),
            })?;
        Ok(std::mem::replace(slot, entity))
    }

    /// Filtered entities grouped by status, one column per status in enum order.
    pub fn board(&self, filter: &ListFilter<E::Status>) -> Vec<(E::Status, Vec<&E>)> {
        let listed = self.list(filter);
        <E::Status as Status>::ALL
            .iter()
            .map(|status| {
                let column = listed
                    .iter()
                    .copied()
                    .filter(|item| item.status() == *status)
                    .collect();
                (*status, column)
            })
            .collect()
    }

    pub fn status_counts(&self) -> Vec<(E::Status, usize)> {
        <E::Status as Status>::ALL
            .iter()
            .map(|status| {
                let count = self.items.iter().filter(|item| item.status() == *status).count();
                (*status, count)
            })
            .collect()
    }

    fn append(&mut self, entity: E) -> Result<&E, StoreError> {
        if self.get(entity.id()).is_some() {
            return Err(StoreError::DuplicateId {
                kind: E::KIND.as_str(),
                id: entity.id(),
            });
        }
        self.last_id = self.last_id.max(entity.id());
        self.items.push(entity);
        Ok(&self.items[self.items.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 25).unwrap()
    }

    fn project_draft(name: &str) -> ProjectDraft {
        ProjectDraft {
            name: name.to_string(),
            description: "Obra teste".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            end_date: None,
            budget: Some(1000.0),
            manager: "Ana Costa".to_string(),
        }
    }

    fn sample_projects() -> EntityStore<Project> {
        EntityStore::from_entities(seed::sample_projects()).unwrap()
    }

    #[test]
    fn create_numbers_from_one() {
        let mut store = EntityStore::<Project>::new();
        assert_eq!(store.create(project_draft("A"), today()).unwrap().id, 1);

        // A filtered view in between changes nothing.
        let _ = store.list(&ListFilter::all().with_status(ProjectStatus::Completed));
        assert_eq!(store.create(project_draft("B"), today()).unwrap().id, 2);
    }

    #[test]
    fn created_project_starts_in_planning() {
        let mut store = EntityStore::<Project>::new();
        let project = store.create(project_draft("  Ponte Sul "), today()).unwrap();
        assert_eq!(project.name, "Ponte Sul");
        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(project.progress, Percent::ZERO);
        assert_eq!(project.actual_cost, Some(0.0));
        assert_eq!(project.works_count, 0);
    }

    #[test]
    fn create_rejects_blank_required_fields() {
        let mut store = EntityStore::<Project>::new();
        let draft = ProjectDraft {
            name: "   ".to_string(),
            manager: String::new(),
            start_date: None,
            ..ProjectDraft::default()
        };
        let err = store.create(draft, today()).unwrap_err();
        assert!(err.has_field("name"));
        assert!(err.has_field("manager"));
        assert!(err.has_field("startDate"));
        assert!(store.is_empty());

        // A rejected draft does not consume an id.
        assert_eq!(store.create(project_draft("A"), today()).unwrap().id, 1);
    }

    #[test]
    fn create_rejects_inverted_dates_and_negative_budget() {
        let mut store = EntityStore::<Project>::new();
        let mut draft = project_draft("A");
        draft.end_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        draft.budget = Some(-1.0);
        let err = store.create(draft, today()).unwrap_err();
        assert!(err.has_field("endDate"));
        assert!(err.has_field("budget"));
    }

    #[test]
    fn ids_stay_unique_after_loading_sparse_records() {
        let mut projects = seed::sample_projects();
        projects.remove(1);
        let mut store = EntityStore::from_entities(projects).unwrap();
        assert_eq!(store.len(), 3);
        // len()+1 would collide with the existing id 4.
        assert_eq!(store.create(project_draft("Nova"), today()).unwrap().id, 5);
    }

    #[test]
    fn duplicate_ids_are_rejected_on_load() {
        let mut projects = seed::sample_projects();
        projects.push(projects[0].clone());
        assert!(matches!(
            EntityStore::from_entities(projects),
            Err(StoreError::DuplicateId { id: 1, .. })
        ));
    }

    #[test]
    fn list_all_keeps_insertion_order() {
        let store = sample_projects();
        let filter = ListFilter {
            text: Some(String::new()),
            status: "all".parse().unwrap(),
        };
        let ids: Vec<u64> = store.list(&filter).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn text_search_is_case_insensitive_substring() {
        let store = sample_projects();
        let hits = store.list(&ListFilter::all().with_text("plaza"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Centro Comercial Plaza");

        let hits = store.list(&ListFilter::all().with_text("HOSPITAL"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 4);

        // Surrounding whitespace is part of the needle.
        assert!(store.list(&ListFilter::all().with_text("plaza ")).is_empty());
    }

    #[test]
    fn text_and_status_combine() {
        let store = sample_projects();
        let filter = ListFilter::all()
            .with_text("construção")
            .with_status(ProjectStatus::InProgress);
        let ids: Vec<u64> = store.list(&filter).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn work_search_covers_location_and_project_name() {
        let works = EntityStore::from_entities(seed::sample_works()).unwrap();

        let by_location = works.list(&ListFilter::all().with_text("quadra 2"));
        assert_eq!(by_location.len(), 1);
        assert_eq!(by_location[0].name, "Estrutura Bloco B");

        let by_project = works.list(&ListFilter::all().with_text("jardim das flores"));
        assert_eq!(by_project.len(), 2);
    }

    #[test]
    fn work_must_reference_an_existing_project() {
        let projects = sample_projects();
        let mut works = EntityStore::<Work>::new();
        let draft = WorkDraft {
            name: "Pintura".to_string(),
            project_id: Some(99),
            assignee: "Equipe Zeta".to_string(),
            ..WorkDraft::default()
        };
        let err = works
            .create(LinkedWorkDraft::resolve(draft, &projects), today())
            .unwrap_err();
        assert!(err.has_field("projectId"));
    }

    #[test]
    fn created_work_copies_project_name() {
        let projects = sample_projects();
        let mut works = EntityStore::<Work>::new();
        let draft = WorkDraft {
            name: "Pintura".to_string(),
            location: "Bloco C".to_string(),
            project_id: Some(2),
            assignee: "Equipe Zeta".to_string(),
            ..WorkDraft::default()
        };
        let work = works
            .create(LinkedWorkDraft::resolve(draft, &projects), today())
            .unwrap();
        assert_eq!(work.id, 1);
        assert_eq!(work.project_name, "Centro Comercial Plaza");
        assert_eq!(work.status, WorkStatus::NotStarted);
        assert_eq!(work.last_update, today());
        assert_eq!(work.quality_score, None);
    }

    #[test]
    fn replace_swaps_whole_record() {
        let mut store = sample_projects();
        let mut project = store.get(2).unwrap().clone();
        project.status = ProjectStatus::InProgress;
        project.progress = Percent::new(30);
        let previous = store.replace(project).unwrap();
        assert_eq!(previous.status, ProjectStatus::Planning);
        assert_eq!(store.get(2).unwrap().progress.get(), 30);

        let mut missing = store.get(1).unwrap().clone();
        missing.id = 42;
        assert!(matches!(
            store.replace(missing),
            Err(StoreError::UnknownEntity { id: 42, .. })
        ));
    }

    #[test]
    fn board_groups_by_status_in_enum_order() {
        let works = EntityStore::from_entities(seed::sample_works()).unwrap();
        let board = works.board(&ListFilter::all());
        let shape: Vec<(WorkStatus, usize)> =
            board.iter().map(|(status, column)| (*status, column.len())).collect();
        assert_eq!(
            shape,
            vec![
                (WorkStatus::NotStarted, 1),
                (WorkStatus::InProgress, 2),
                (WorkStatus::OnHold, 1),
                (WorkStatus::Completed, 1),
                (WorkStatus::Cancelled, 0),
            ]
        );
    }

    #[test]
    fn display_progress_rule_applies_to_both_kinds() {
        let mut store = sample_projects();
        let mut project = store.get(1).unwrap().clone();
        project.status = ProjectStatus::Completed;
        store.replace(project).unwrap();
        assert_eq!(store.get(1).unwrap().display_progress(), Percent::FULL);

        let mut work = seed::sample_works().remove(1);
        work.status = WorkStatus::Completed;
        assert_eq!(work.display_progress(), Percent::FULL);
        work.status = WorkStatus::Cancelled;
        assert_eq!(work.display_progress(), Percent::ZERO);
    }

    #[test]
    fn status_filter_parses_wire_names() {
        assert_eq!(
            "ON_HOLD".parse::<StatusFilter<ProjectStatus>>().unwrap(),
            StatusFilter::Only(ProjectStatus::OnHold)
        );
        assert_eq!("".parse::<StatusFilter<WorkStatus>>().unwrap(), StatusFilter::All);
        assert!("DONE".parse::<StatusFilter<WorkStatus>>().is_err());
    }
}
