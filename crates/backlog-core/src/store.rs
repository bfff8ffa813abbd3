//! Artifact store: projects, requirements documents, backlog snapshots and
//! review feedback.
//!
//! # Table design
//!
//! One redb table per entity, keyed by a `u64` id with the record encoded as
//! JSON:
//! ```text
//! projects               id -> Project
//! requirement_documents  id -> RequirementsDocument
//! backlog_snapshots      id -> BacklogSnapshot
//! review_feedback        id -> FeedbackRecord
//! sequences              entity name -> last issued id
//! ```
//!
//! Ids are issued from `sequences` inside the same write transaction that
//! inserts the record, so they start at 1 and never repeat. Keys are
//! big-endian integers, so table order is insertion order and the last key
//! of `backlog_snapshots` is the most recent snapshot.
//!
//! Every mutation is a single committed transaction: a failed write leaves
//! the previous record intact. There is no optimistic-concurrency token;
//! a snapshot must have a single writer at a time.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableTable, Table, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{store_err, BacklogError, Result};
use crate::types::{
    BacklogSnapshot, FeedbackRecord, FeedbackStatus, NewFeedback, Project, ProjectInput,
    RequirementsDocument,
};

// ---------------------------------------------------------------------------
// ArtifactStore
// ---------------------------------------------------------------------------

/// Persistence boundary used by the roles and the convergence loop.
///
/// Reads return `Ok(None)` for absent records; writes either fully succeed
/// or leave the store unchanged.
pub trait ArtifactStore: Send + Sync {
    fn create_project(&self, input: &ProjectInput) -> Result<Project>;
    fn get_project(&self, id: u64) -> Result<Option<Project>>;

    fn save_requirements_document(
        &self,
        project_id: u64,
        content: &str,
        created_by: &str,
    ) -> Result<RequirementsDocument>;
    fn latest_requirements_document(&self, project_id: u64)
        -> Result<Option<RequirementsDocument>>;

    fn add_backlog_snapshot(
        &self,
        project_id: u64,
        requirements_doc_id: u64,
        content: &str,
        created_by: &str,
    ) -> Result<BacklogSnapshot>;
    /// Overwrite a snapshot's content in place, bumping `updated_at` and `revision`.
    fn update_backlog_snapshot(&self, id: u64, content: &str) -> Result<BacklogSnapshot>;
    fn get_backlog_snapshot(&self, id: u64) -> Result<Option<BacklogSnapshot>>;
    fn latest_backlog_snapshot_id(&self) -> Result<Option<u64>>;
    fn list_backlog_snapshots(&self, project_id: u64) -> Result<Vec<BacklogSnapshot>>;

    fn add_feedback_record(&self, new: NewFeedback<'_>) -> Result<FeedbackRecord>;
    /// Highest `iteration_id` recorded for `backlog_id`, or 0 when none.
    fn max_feedback_iteration(&self, backlog_id: u64) -> Result<u32>;
    fn list_feedback(
        &self,
        project_id: u64,
        status: Option<FeedbackStatus>,
    ) -> Result<Vec<FeedbackRecord>>;
    fn list_feedback_for_backlog(&self, backlog_id: u64) -> Result<Vec<FeedbackRecord>>;
    fn resolve_feedback(&self, id: u64) -> Result<FeedbackRecord>;
}

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const PROJECTS: TableDefinition<u64, &[u8]> = TableDefinition::new("projects");
const REQUIREMENT_DOCS: TableDefinition<u64, &[u8]> =
    TableDefinition::new("requirement_documents");
const BACKLOGS: TableDefinition<u64, &[u8]> = TableDefinition::new("backlog_snapshots");
const FEEDBACK: TableDefinition<u64, &[u8]> = TableDefinition::new("review_feedback");
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

// ---------------------------------------------------------------------------
// Record helpers
// ---------------------------------------------------------------------------

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(store_err)
}

fn put<T: Serialize>(table: &mut Table<'_, u64, &'static [u8]>, id: u64, record: &T) -> Result<()> {
    let bytes = serde_json::to_vec(record).map_err(store_err)?;
    table.insert(id, bytes.as_slice()).map_err(store_err)?;
    Ok(())
}

fn fetch<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> Result<Option<T>> {
    match table.get(id).map_err(store_err)? {
        Some(guard) => decode(guard.value()).map(Some),
        None => Ok(None),
    }
}

fn scan<T: DeserializeOwned>(table: &impl ReadableTable<u64, &'static [u8]>) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for entry in table.iter().map_err(store_err)? {
        let (_, v) = entry.map_err(store_err)?;
        out.push(decode(v.value())?);
    }
    Ok(out)
}

/// Issue the next id for `entity` within `wt`.
fn next_id(wt: &WriteTransaction, entity: &str) -> Result<u64> {
    let mut seq = wt.open_table(SEQUENCES).map_err(store_err)?;
    let current = seq
        .get(entity)
        .map_err(store_err)?
        .map(|g| g.value())
        .unwrap_or(0);
    let next = current + 1;
    seq.insert(entity, next).map_err(store_err)?;
    Ok(next)
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

/// [`ArtifactStore`] backed by a single redb file.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the database at `path`, creating parent directories
    /// and all tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        let wt = db.begin_write().map_err(store_err)?;
        wt.open_table(PROJECTS).map_err(store_err)?;
        wt.open_table(REQUIREMENT_DOCS).map_err(store_err)?;
        wt.open_table(BACKLOGS).map_err(store_err)?;
        wt.open_table(FEEDBACK).map_err(store_err)?;
        wt.open_table(SEQUENCES).map_err(store_err)?;
        wt.commit().map_err(store_err)?;
        tracing::debug!(path = %path.display(), "artifact store opened");
        Ok(Self { db })
    }

    fn read<T: DeserializeOwned>(
        &self,
        def: TableDefinition<u64, &'static [u8]>,
        id: u64,
    ) -> Result<Option<T>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(def).map_err(store_err)?;
        fetch(&table, id)
    }

    fn read_all<T: DeserializeOwned>(&self, def: TableDefinition<u64, &'static [u8]>) -> Result<Vec<T>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(def).map_err(store_err)?;
        scan(&table)
    }

    fn require_project(wt: &WriteTransaction, project_id: u64) -> Result<()> {
        let projects = wt.open_table(PROJECTS).map_err(store_err)?;
        if projects.get(project_id).map_err(store_err)?.is_none() {
            return Err(BacklogError::ProjectNotFound(project_id));
        }
        Ok(())
    }
}

impl ArtifactStore for RedbStore {
    fn create_project(&self, input: &ProjectInput) -> Result<Project> {
        input.validate()?;
        let wt = self.db.begin_write().map_err(store_err)?;
        let project = Project {
            id: next_id(&wt, "projects")?,
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            user_requirements: input.user_requirements.clone(),
            tech_stack: input.tech_stack_text(),
            created_at: Utc::now(),
        };
        {
            let mut table = wt.open_table(PROJECTS).map_err(store_err)?;
            put(&mut table, project.id, &project)?;
        }
        wt.commit().map_err(store_err)?;
        tracing::info!(project_id = project.id, name = %project.name, "project created");
        Ok(project)
    }

    fn get_project(&self, id: u64) -> Result<Option<Project>> {
        self.read(PROJECTS, id)
    }

    fn save_requirements_document(
        &self,
        project_id: u64,
        content: &str,
        created_by: &str,
    ) -> Result<RequirementsDocument> {
        let wt = self.db.begin_write().map_err(store_err)?;
        Self::require_project(&wt, project_id)?;
        let previous = {
            let table = wt.open_table(REQUIREMENT_DOCS).map_err(store_err)?;
            scan::<RequirementsDocument>(&table)?
                .into_iter()
                .filter(|d| d.project_id == project_id)
                .map(|d| d.version)
                .max()
                .unwrap_or(0)
        };
        let doc = RequirementsDocument {
            id: next_id(&wt, "requirement_documents")?,
            project_id,
            content: content.to_string(),
            version: previous + 1,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        {
            let mut table = wt.open_table(REQUIREMENT_DOCS).map_err(store_err)?;
            put(&mut table, doc.id, &doc)?;
        }
        wt.commit().map_err(store_err)?;
        tracing::info!(
            project_id,
            doc_id = doc.id,
            version = doc.version,
            "requirements document saved"
        );
        Ok(doc)
    }

    fn latest_requirements_document(
        &self,
        project_id: u64,
    ) -> Result<Option<RequirementsDocument>> {
        Ok(self
            .read_all::<RequirementsDocument>(REQUIREMENT_DOCS)?
            .into_iter()
            .filter(|d| d.project_id == project_id)
            .max_by_key(|d| (d.version, d.id)))
    }

    fn add_backlog_snapshot(
        &self,
        project_id: u64,
        requirements_doc_id: u64,
        content: &str,
        created_by: &str,
    ) -> Result<BacklogSnapshot> {
        let wt = self.db.begin_write().map_err(store_err)?;
        Self::require_project(&wt, project_id)?;
        {
            let docs = wt.open_table(REQUIREMENT_DOCS).map_err(store_err)?;
            match fetch::<RequirementsDocument>(&docs, requirements_doc_id)? {
                Some(doc) if doc.project_id == project_id => {}
                Some(_) => {
                    return Err(BacklogError::Validation(format!(
                        "requirements document {requirements_doc_id} belongs to another project"
                    )))
                }
                None => {
                    return Err(BacklogError::Validation(format!(
                        "requirements document {requirements_doc_id} not found"
                    )))
                }
            }
        }
        let now = Utc::now();
        let snapshot = BacklogSnapshot {
            id: next_id(&wt, "backlog_snapshots")?,
            project_id,
            requirements_doc_id,
            content: content.to_string(),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
            revision: 0,
        };
        {
            let mut table = wt.open_table(BACKLOGS).map_err(store_err)?;
            put(&mut table, snapshot.id, &snapshot)?;
        }
        wt.commit().map_err(store_err)?;
        tracing::info!(project_id, backlog_id = snapshot.id, "backlog snapshot created");
        Ok(snapshot)
    }

    fn update_backlog_snapshot(&self, id: u64, content: &str) -> Result<BacklogSnapshot> {
        let wt = self.db.begin_write().map_err(store_err)?;
        let snapshot = {
            let mut table = wt.open_table(BACKLOGS).map_err(store_err)?;
            let mut snapshot: BacklogSnapshot =
                fetch(&table, id)?.ok_or(BacklogError::BacklogNotFound(id))?;
            snapshot.content = content.to_string();
            snapshot.revision += 1;
            // Keep updated_at strictly increasing even if the clock has not moved.
            let now = Utc::now();
            snapshot.updated_at = if now > snapshot.updated_at {
                now
            } else {
                snapshot.updated_at + chrono::Duration::microseconds(1)
            };
            put(&mut table, id, &snapshot)?;
            snapshot
        };
        wt.commit().map_err(store_err)?;
        tracing::debug!(backlog_id = id, revision = snapshot.revision, "backlog snapshot updated");
        Ok(snapshot)
    }

    fn get_backlog_snapshot(&self, id: u64) -> Result<Option<BacklogSnapshot>> {
        self.read(BACKLOGS, id)
    }

    fn latest_backlog_snapshot_id(&self) -> Result<Option<u64>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(BACKLOGS).map_err(store_err)?;
        let last = table.last().map_err(store_err)?;
        Ok(last.map(|(k, _)| k.value()))
    }

    fn list_backlog_snapshots(&self, project_id: u64) -> Result<Vec<BacklogSnapshot>> {
        Ok(self
            .read_all::<BacklogSnapshot>(BACKLOGS)?
            .into_iter()
            .filter(|b| b.project_id == project_id)
            .collect())
    }

    fn add_feedback_record(&self, new: NewFeedback<'_>) -> Result<FeedbackRecord> {
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let backlogs = wt.open_table(BACKLOGS).map_err(store_err)?;
            let snapshot: BacklogSnapshot =
                fetch(&backlogs, new.backlog_id)?.ok_or(BacklogError::BacklogNotFound(new.backlog_id))?;
            if snapshot.project_id != new.project_id {
                return Err(BacklogError::Validation(format!(
                    "backlog {} belongs to project {}, not {}",
                    new.backlog_id, snapshot.project_id, new.project_id
                )));
            }
        }
        {
            let table = wt.open_table(FEEDBACK).map_err(store_err)?;
            let max = scan::<FeedbackRecord>(&table)?
                .into_iter()
                .filter(|f| f.backlog_id == new.backlog_id)
                .map(|f| f.iteration_id)
                .max()
                .unwrap_or(0);
            if new.iteration_id <= max {
                return Err(BacklogError::Validation(format!(
                    "feedback iteration {} for backlog {} must be greater than {}",
                    new.iteration_id, new.backlog_id, max
                )));
            }
        }
        let record = FeedbackRecord {
            id: next_id(&wt, "review_feedback")?,
            project_id: new.project_id,
            backlog_id: new.backlog_id,
            iteration_id: new.iteration_id,
            content: new.content.to_string(),
            action_required: new.action_required.to_string(),
            status: FeedbackStatus::Open,
            created_by: new.created_by.to_string(),
            created_at: Utc::now(),
            resolved_at: None,
        };
        {
            let mut table = wt.open_table(FEEDBACK).map_err(store_err)?;
            put(&mut table, record.id, &record)?;
        }
        wt.commit().map_err(store_err)?;
        tracing::debug!(
            backlog_id = record.backlog_id,
            iteration = record.iteration_id,
            feedback_id = record.id,
            "feedback recorded"
        );
        Ok(record)
    }

    fn max_feedback_iteration(&self, backlog_id: u64) -> Result<u32> {
        Ok(self
            .list_feedback_for_backlog(backlog_id)?
            .into_iter()
            .map(|f| f.iteration_id)
            .max()
            .unwrap_or(0))
    }

    fn list_feedback(
        &self,
        project_id: u64,
        status: Option<FeedbackStatus>,
    ) -> Result<Vec<FeedbackRecord>> {
        let mut records: Vec<FeedbackRecord> = self
            .read_all::<FeedbackRecord>(FEEDBACK)?
            .into_iter()
            .filter(|f| f.project_id == project_id)
            .filter(|f| status.map_or(true, |s| f.status == s))
            .collect();
        records.sort_by_key(|f| (f.created_at, f.id));
        Ok(records)
    }

    fn list_feedback_for_backlog(&self, backlog_id: u64) -> Result<Vec<FeedbackRecord>> {
        let mut records: Vec<FeedbackRecord> = self
            .read_all::<FeedbackRecord>(FEEDBACK)?
            .into_iter()
            .filter(|f| f.backlog_id == backlog_id)
            .collect();
        records.sort_by_key(|f| f.iteration_id);
        Ok(records)
    }

    fn resolve_feedback(&self, id: u64) -> Result<FeedbackRecord> {
        let wt = self.db.begin_write().map_err(store_err)?;
        let record = {
            let mut table = wt.open_table(FEEDBACK).map_err(store_err)?;
            let mut record: FeedbackRecord =
                fetch(&table, id)?.ok_or(BacklogError::FeedbackNotFound(id))?;
            if record.status != FeedbackStatus::Resolved {
                record.status = FeedbackStatus::Resolved;
                record.resolved_at = Some(Utc::now());
                put(&mut table, id, &record)?;
            }
            record
        };
        wt.commit().map_err(store_err)?;
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
