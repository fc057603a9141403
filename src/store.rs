use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{KeyValueStore, StorageError};
use crate::models::{JobRecord, JobStatus, NewJob};

/// Slot name holding the JSON-serialized collection.
pub const JOBS_KEY: &str = "jobs";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job {0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        StoreError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Owns the job collection and mirrors every mutation to the backing slot.
pub struct RecordStore<S: KeyValueStore> {
    storage: S,
    records: Vec<JobRecord>,
    today: fn() -> NaiveDate,
}

impl<S: KeyValueStore> RecordStore<S> {
    /// Opens the store over `storage`, loading whatever collection it holds.
    pub fn open(storage: S) -> Self {
        Self::with_clock(storage, local_today)
    }

    pub fn with_clock(storage: S, today: fn() -> NaiveDate) -> Self {
        let mut store = Self {
            storage,
            records: Vec::new(),
            today,
        };
        store.records = store.load();
        store
    }

    /// Reads the persisted collection. Absent, unreadable or malformed
    /// payloads yield an empty collection.
    pub fn load(&self) -> Vec<JobRecord> {
        let raw = match self.storage.get(JOBS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read persisted jobs, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<JobRecord>>(&raw) {
            Ok(records) => {
                debug!(count = records.len(), "loaded jobs");
                records
            }
            Err(e) => {
                warn!(error = %e, "persisted jobs payload is malformed, starting empty");
                Vec::new()
            }
        }
    }

    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&JobRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn create(&mut self, input: NewJob) -> Result<JobRecord, StoreError> {
        let company = input.company.trim();
        let role = input.role.trim();
        if company.is_empty() {
            return Err(StoreError::Validation("company is required".to_string()));
        }
        if role.is_empty() {
            return Err(StoreError::Validation("role is required".to_string()));
        }

        let record = JobRecord {
            id: self.fresh_id(),
            company: company.to_string(),
            role: role.to_string(),
            location: input.location.unwrap_or_default(),
            salary: input.salary.unwrap_or_default(),
            url: input.url.unwrap_or_default(),
            notes: input.notes.unwrap_or_default(),
            status: JobStatus::Applied,
            applied_date: (self.today)(),
        };

        self.records.insert(0, record.clone());
        if let Err(e) = self.persist() {
            self.records.remove(0);
            return Err(e);
        }
        debug!(id = %record.id, company = %record.company, "created job");
        Ok(record)
    }

    pub fn set_status(&mut self, id: &str, status: JobStatus) -> Result<(), StoreError> {
        let idx = self.position(id)?;
        let previous = std::mem::replace(&mut self.records[idx].status, status);
        if let Err(e) = self.persist() {
            self.records[idx].status = previous;
            return Err(e);
        }
        debug!(id, from = %previous, to = %status, "updated job status");
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<JobRecord, StoreError> {
        let idx = self.position(id)?;
        let removed = self.records.remove(idx);
        if let Err(e) = self.persist() {
            self.records.insert(idx, removed);
            return Err(e);
        }
        debug!(id, "deleted job");
        Ok(removed)
    }

    fn position(&self, id: &str) -> Result<usize, StoreError> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn persist(&self) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&self.records)?;
        self.storage.set(JOBS_KEY, &payload)?;
        Ok(())
    }
}
