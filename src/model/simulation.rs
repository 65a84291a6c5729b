use crate::model::{generate_id, Id, Timestamp};
use serde::{Deserialize, Serialize};

/// A recorded run of a model instance, with its configuration and output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub id: Id,
    pub model_instance_id: Id,
    pub description: Option<String>,
    pub configuration: serde_json::Value,
    pub outputs: Vec<String>,
    pub hardware: Option<String>,
    pub dependencies: Vec<String>,
    pub environment: serde_json::Value,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub status: Option<String>,
    pub app_id: Option<String>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSimulation {
    pub model_instance_id: Id,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub configuration: serde_json::Value,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub hardware: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub environment: serde_json::Value,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    #[serde(default)]
    pub ended_at: Option<Timestamp>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
}

impl NewSimulation {
    /// Reject a run that ends before it starts.
    pub fn validate(&self) -> Result<(), String> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) if end < start => Err(format!(
                "Simulation ended ({}) before it started ({})",
                end.to_rfc3339(),
                start.to_rfc3339()
            )),
            _ => Ok(()),
        }
    }

    pub fn into_record(self, now: Timestamp) -> Simulation {
        Simulation {
            id: generate_id(),
            model_instance_id: self.model_instance_id,
            description: self.description,
            configuration: self.configuration,
            outputs: self.outputs,
            hardware: self.hardware,
            dependencies: self.dependencies,
            environment: self.environment,
            started_at: self.started_at,
            ended_at: self.ended_at,
            status: self.status,
            app_id: self.app_id,
            timestamp: now,
        }
    }
}
