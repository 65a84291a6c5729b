use crate::model::{generate_id, Id, ModelInstance, TestInstance, Timestamp};
use serde::{Deserialize, Serialize};

/// The score obtained by running one test instance against one model instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub id: Id,
    pub model_instance_id: Id,
    pub test_instance_id: Id,
    pub score: f64,
    pub normalized_score: Option<f64>,
    pub passed: Option<bool>,
    pub app_id: Option<String>,
    pub results_storage: Vec<String>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewValidationResult {
    pub model_instance_id: Id,
    pub test_instance_id: Id,
    pub score: f64,
    #[serde(default)]
    pub normalized_score: Option<f64>,
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub results_storage: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

impl NewValidationResult {
    pub fn into_record(self, now: Timestamp) -> ValidationResult {
        ValidationResult {
            id: generate_id(),
            model_instance_id: self.model_instance_id,
            test_instance_id: self.test_instance_id,
            score: self.score,
            normalized_score: self.normalized_score,
            passed: self.passed,
            app_id: self.app_id,
            results_storage: self.results_storage,
            timestamp: self.timestamp.unwrap_or(now),
        }
    }
}

/// A result together with the instances it refers to.
///
/// Either side may be missing when the referenced instance was removed.
#[derive(Debug, Clone, Serialize)]
pub struct ResultDetail {
    #[serde(flatten)]
    pub result: ValidationResult,
    pub model_instance: Option<ModelInstance>,
    pub test_instance: Option<TestInstance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResultResponse {
    Standard(ValidationResult),
    Full(ResultDetail),
}
