use std::path::Path;

use sled::Db;
use tracing::debug;

use crate::collection::Entity;
use crate::error::StoreError;
use crate::models::{EntityKind, Identity, TenantId};

/// Identity lookup used by the session authority.
pub trait IdentityDirectory: Send + Sync {
    fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;
}

/// Tenant-scoped entity persistence. Owns the id sequence for each kind.
pub trait EntityRepository {
    /// Records of kind `E` for `tenant`, in id order.
    fn load_entities<E: Entity>(&self, tenant: TenantId) -> Result<Vec<E>, StoreError>;
    /// Upsert by id.
    fn save_entity<E: Entity>(&self, tenant: TenantId, entity: &E) -> Result<(), StoreError>;
    /// Next unused id; strictly increasing per (kind, tenant).
    fn next_id(&self, kind: EntityKind, tenant: TenantId) -> Result<u64, StoreError>;
}

/// Sled-backed storage for identities, projects and works
///
/// Trees:
/// - `identities`: email -> JSON identity
/// - `projects` / `works`: tenant ++ id (big-endian) -> JSON record
/// - `sequences`: kind ++ tenant -> last issued id
///
/// Big-endian keys make a tenant prefix scan return records in id order,
/// which is also creation order since ids only grow.
#[derive(Clone)]  // Sled handles are cheap to clone and thread-safe
pub struct SledStorage {
    #[allow(dead_code)]  // held so the database outlives its trees
    db: Db,
    identities: sled::Tree,
    projects: sled::Tree,
    works: sled::Tree,
    sequences: sled::Tree,
}

impl SledStorage {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Throwaway database, removed when dropped.
    pub fn open_temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        Ok(Self {
            identities: db.open_tree("identities")?,
            projects: db.open_tree("projects")?,
            works: db.open_tree("works")?,
            sequences: db.open_tree("sequences")?,
            db,
        })
    }

    pub fn put_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(identity)?;
        self.identities.insert(identity.email.as_bytes(), bytes)?;
        Ok(())
    }

    fn tree(&self, kind: EntityKind) -> &sled::Tree {
        match kind {
            EntityKind::Project => &self.projects,
            EntityKind::Work => &self.works,
        }
    }
}

fn entity_key(tenant: TenantId, id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&tenant.to_be_bytes());
    key[8..].copy_from_slice(&id.to_be_bytes());
    key
}

fn sequence_key(kind: EntityKind, tenant: TenantId) -> Vec<u8> {
    let mut key = kind.as_str().as_bytes().to_vec();
    key.push(b'/');
    key.extend_from_slice(&tenant.to_be_bytes());
    key
}

fn decode_u64(bytes: &[u8]) -> Option<u64> {
    <[u8; 8]>::try_from(bytes).ok().map(u64::from_be_bytes)
}

impl IdentityDirectory for SledStorage {
    fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        match self.identities.get(email.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl EntityRepository for SledStorage {
    fn load_entities<E: Entity>(&self, tenant: TenantId) -> Result<Vec<E>, StoreError> {
        let mut entities = Vec::new();
        for item in self.tree(E::KIND).scan_prefix(tenant.to_be_bytes()) {
            let (_, value) = item?;
            entities.push(serde_json::from_slice(&value)?);
        }
        let kind = E::KIND;
        debug!(%kind, tenant, count = entities.len(), "loaded entities");
        Ok(entities)
    }

    fn save_entity<E: Entity>(&self, tenant: TenantId, entity: &E) -> Result<(), StoreError> {
        let id = entity.id();
        let bytes = serde_json::to_vec(entity)?;
        self.tree(E::KIND).insert(entity_key(tenant, id), bytes)?;

        // Records saved with an explicit id (seeding, imports) push the
        // sequence forward so next_id never hands that id out again.
        self.sequences
            .fetch_and_update(sequence_key(E::KIND, tenant), |old| {
                let last = old.and_then(decode_u64).unwrap_or(0);
                Some(last.max(id).to_be_bytes().to_vec())
            })?;
        Ok(())
    }

    fn next_id(&self, kind: EntityKind, tenant: TenantId) -> Result<u64, StoreError> {
        let updated = self
            .sequences
            .update_and_fetch(sequence_key(kind, tenant), |old| {
                let last = old.and_then(decode_u64).unwrap_or(0);
                Some((last + 1).to_be_bytes().to_vec())
            })?;
        updated
            .as_deref()
            .and_then(decode_u64)
            .ok_or(StoreError::CorruptKey("sequences"))
    }
}
