//! Patient Repository
//!
//! Read-only access to the comparison population. The engine never writes
//! through this interface.

use crate::patient::{PatientId, PatientRecord};
use std::path::Path;
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure inside a repository backend
#[derive(Debug, thiserror::Error)]
#[error("patient repository error: {message}")]
pub struct RepositoryError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl RepositoryError {
    pub fn new(message: impl Into<String>) -> Self {
        RepositoryError {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        RepositoryError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Source of patient records
///
/// Implementations must be safe to share across threads.
pub trait PatientRepository: Send + Sync {
    /// Look up a single patient
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend fails; an unknown id is `Ok(None)`.
    fn get_by_id(&self, id: &str) -> Result<Option<PatientRecord>, RepositoryError>;

    /// Every patient other than `id`, in a stable order
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get_all_except(&self, id: &str) -> Result<Vec<PatientRecord>, RepositoryError>;
}

impl<R: PatientRepository + ?Sized> PatientRepository for Arc<R> {
    fn get_by_id(&self, id: &str) -> Result<Option<PatientRecord>, RepositoryError> {
        (**self).get_by_id(id)
    }

    fn get_all_except(&self, id: &str) -> Result<Vec<PatientRecord>, RepositoryError> {
        (**self).get_all_except(id)
    }
}

impl<R: PatientRepository + ?Sized> PatientRepository for &R {
    fn get_by_id(&self, id: &str) -> Result<Option<PatientRecord>, RepositoryError> {
        (**self).get_by_id(id)
    }

    fn get_all_except(&self, id: &str) -> Result<Vec<PatientRecord>, RepositoryError> {
        (**self).get_all_except(id)
    }
}

/// Population held in memory, in insertion order
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    patients: Vec<PatientRecord>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(patients: Vec<PatientRecord>) -> Self {
        InMemoryRepository { patients }
    }

    /// Load a JSON array of patient records
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| RepositoryError::with_source(format!("cannot read {}", path.display()), e))?;
        let patients: Vec<PatientRecord> = serde_json::from_str(&json)
            .map_err(|e| RepositoryError::with_source(format!("cannot parse {}", path.display()), e))?;
        Ok(Self::from_records(patients))
    }

    /// Add a record, replacing any existing record with the same id in place
    pub fn insert(&mut self, patient: PatientRecord) {
        match self.patients.iter_mut().find(|p| p.id == patient.id) {
            Some(existing) => *existing = patient,
            None => self.patients.push(patient),
        }
    }

    pub fn patients(&self) -> &[PatientRecord] {
        &self.patients
    }

    pub fn ids(&self) -> Vec<PatientId> {
        self.patients.iter().map(|p| p.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}

impl PatientRepository for InMemoryRepository {
    fn get_by_id(&self, id: &str) -> Result<Option<PatientRecord>, RepositoryError> {
        Ok(self.patients.iter().find(|p| p.id == id).cloned())
    }

    fn get_all_except(&self, id: &str) -> Result<Vec<PatientRecord>, RepositoryError> {
        Ok(self.patients.iter().filter(|p| p.id != id).cloned().collect())
    }
}
