use crate::model::VocabularyKind;
use serde::{Deserialize, Serialize};

/// Per-collab selection of vocabulary values offered by the web apps of that collab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollabParameters {
    pub app_id: String,
    #[serde(default)]
    pub data_modalities: Vec<String>,
    #[serde(default)]
    pub test_type: Vec<String>,
    #[serde(default)]
    pub species: Vec<String>,
    #[serde(default)]
    pub brain_region: Vec<String>,
    #[serde(default)]
    pub cell_type: Vec<String>,
    #[serde(default)]
    pub model_scope: Vec<String>,
    #[serde(default)]
    pub abstraction_level: Vec<String>,
    #[serde(default)]
    pub organization: Vec<String>,
}

impl CollabParameters {
    pub fn empty(app_id: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            data_modalities: Vec::new(),
            test_type: Vec::new(),
            species: Vec::new(),
            brain_region: Vec::new(),
            cell_type: Vec::new(),
            model_scope: Vec::new(),
            abstraction_level: Vec::new(),
            organization: Vec::new(),
        }
    }

    /// Mutable access to each value list with the vocabulary it draws from.
    pub fn value_lists_mut(&mut self) -> [(VocabularyKind, &mut Vec<String>); 8] {
        [
            (VocabularyKind::DataModality, &mut self.data_modalities),
            (VocabularyKind::TestType, &mut self.test_type),
            (VocabularyKind::Species, &mut self.species),
            (VocabularyKind::BrainRegion, &mut self.brain_region),
            (VocabularyKind::CellType, &mut self.cell_type),
            (VocabularyKind::ModelScope, &mut self.model_scope),
            (VocabularyKind::AbstractionLevel, &mut self.abstraction_level),
            (VocabularyKind::Organization, &mut self.organization),
        ]
    }
}

/// Request body for `PUT /collabs/{app_id}/parameters`.
#[derive(Debug, Clone, Deserialize)]
pub struct CollabParametersUpdate {
    #[serde(default)]
    pub data_modalities: Vec<String>,
    #[serde(default)]
    pub test_type: Vec<String>,
    #[serde(default)]
    pub species: Vec<String>,
    #[serde(default)]
    pub brain_region: Vec<String>,
    #[serde(default)]
    pub cell_type: Vec<String>,
    #[serde(default)]
    pub model_scope: Vec<String>,
    #[serde(default)]
    pub abstraction_level: Vec<String>,
    #[serde(default)]
    pub organization: Vec<String>,
}

impl CollabParametersUpdate {
    pub fn into_parameters(self, app_id: &str) -> CollabParameters {
        CollabParameters {
            app_id: app_id.to_string(),
            data_modalities: self.data_modalities,
            test_type: self.test_type,
            species: self.species,
            brain_region: self.brain_region,
            cell_type: self.cell_type,
            model_scope: self.model_scope,
            abstraction_level: self.abstraction_level,
            organization: self.organization,
        }
    }
}
