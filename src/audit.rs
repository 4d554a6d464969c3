use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Analyze,
    Generate,
    Summarize,
    Embed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Completed,
    Failed,
}

// One row per AI request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: Uuid,
    pub principal_id: String,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub input_digest: String,
    pub repository_id: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub latency_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // insertion order, breaks created_at ties
    #[serde(skip)]
    pub sequence: u64,
}

#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub principal_id: String,
    pub kind: RequestKind,
    pub input_digest: String,
    pub repository_id: Option<String>,
}

impl NewAuditRecord {
    pub fn with_repository(mut self, repository_id: Option<String>) -> Self {
        self.repository_id = repository_id.filter(|r| !r.trim().is_empty());
        self
    }
}

/// Fields written when a request finishes.
#[derive(Debug, Clone)]
pub struct AuditPatch {
    pub status: RequestStatus,
    pub output: Option<String>,
    pub error: Option<String>,
    pub latency_ms: Option<u64>,
}

impl AuditPatch {
    pub fn completed(output: String, latency_ms: u64) -> Self {
        Self {
            status: RequestStatus::Completed,
            output: Some(output),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn failed(error: String, latency_ms: u64) -> Self {
        Self {
            status: RequestStatus::Failed,
            output: None,
            error: Some(error),
            latency_ms: Some(latency_ms),
        }
    }
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn create_request(&self, record: NewAuditRecord) -> Result<Uuid, AppError>;

    async fn update_request(&self, id: Uuid, patch: AuditPatch) -> Result<(), AppError>;

    /// Most recent first.
    async fn list_requests(&self, principal_id: &str, limit: usize)
    -> Result<Vec<AuditRecord>, AppError>;
}

// SHA-256 of the request input, hex encoded
pub fn input_digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub const DEFAULT_RETENTION: usize = 500;

/// Keeps the newest `retention` rows per principal; older rows are evicted
/// as new ones arrive.
pub struct InMemoryAuditStore {
    records: DashMap<Uuid, AuditRecord>,
    by_principal: DashMap<String, VecDeque<Uuid>>,
    next_sequence: AtomicU64,
    retention: usize,
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            records: DashMap::new(),
            by_principal: DashMap::new(),
            next_sequence: AtomicU64::new(0),
            retention: retention.max(1),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<AuditRecord> {
        self.records.get(&id).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn create_request(&self, record: NewAuditRecord) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        // the principal's index guard orders sequence, insert and eviction
        let mut ids = self
            .by_principal
            .entry(record.principal_id.clone())
            .or_default();
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);

        self.records.insert(
            id,
            AuditRecord {
                id,
                principal_id: record.principal_id,
                kind: record.kind,
                status: RequestStatus::Pending,
                input_digest: record.input_digest,
                repository_id: record.repository_id,
                output: None,
                error: None,
                latency_ms: None,
                created_at: now,
                updated_at: now,
                sequence,
            },
        );
        ids.push_back(id);

        while ids.len() > self.retention {
            if let Some(evicted) = ids.pop_front() {
                self.records.remove(&evicted);
            }
        }
        Ok(id)
    }

    async fn update_request(&self, id: Uuid, patch: AuditPatch) -> Result<(), AppError> {
        let mut record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| AppError::Persistence(format!("request {} not found", id)))?;
        record.status = patch.status;
        record.output = patch.output;
        record.error = patch.error;
        record.latency_ms = patch.latency_ms;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn list_requests(
        &self,
        principal_id: &str,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, AppError> {
        let Some(ids) = self.by_principal.get(principal_id) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<AuditRecord> = ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| r.clone()))
            .collect();
        drop(ids);

        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.sequence.cmp(&a.sequence))
        });
        rows.truncate(limit);
        Ok(rows)
    }
}
