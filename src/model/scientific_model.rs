use crate::model::{apply_field, apply_nullable, double_option, generate_id, Id, Person, Timestamp};
use serde::{Deserialize, Serialize};

/// A registered computational model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScientificModel {
    pub id: Id,
    pub name: String,
    pub alias: Option<String>,
    pub author: Vec<Person>,
    pub owner: Vec<Person>,
    /// Collab that owns the model; private models are visible to its members only.
    pub app_id: Option<String>,
    pub organization: Option<String>,
    pub private: bool,
    pub species: Option<String>,
    pub brain_region: Option<String>,
    pub cell_type: Option<String>,
    pub model_scope: Option<String>,
    pub abstraction_level: Option<String>,
    pub description: Option<String>,
    pub date_created: Timestamp,
}

/// Creation payload for a model, optionally carrying its first instances and images.
#[derive(Debug, Clone, Deserialize)]
pub struct NewScientificModel {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub author: Vec<Person>,
    #[serde(default)]
    pub owner: Vec<Person>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub brain_region: Option<String>,
    #[serde(default)]
    pub cell_type: Option<String>,
    #[serde(default)]
    pub model_scope: Option<String>,
    #[serde(default)]
    pub abstraction_level: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instances: Vec<NewModelInstance>,
    #[serde(default)]
    pub images: Vec<NewModelImage>,
}

impl NewScientificModel {
    /// Split the payload into the model record and its child records.
    pub fn into_records(
        self,
        now: Timestamp,
    ) -> (ScientificModel, Vec<ModelInstance>, Vec<ModelImage>) {
        let model = ScientificModel {
            id: generate_id(),
            name: self.name,
            alias: self.alias,
            author: self.author,
            owner: self.owner,
            app_id: self.app_id,
            organization: self.organization,
            private: self.private,
            species: self.species,
            brain_region: self.brain_region,
            cell_type: self.cell_type,
            model_scope: self.model_scope,
            abstraction_level: self.abstraction_level,
            description: self.description,
            date_created: now,
        };
        let instances = self
            .instances
            .into_iter()
            .map(|i| i.into_record(model.id, now))
            .collect();
        let images = self
            .images
            .into_iter()
            .map(|i| i.into_record(model.id))
            .collect();
        (model, instances, images)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScientificModelPatch {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub alias: Option<Option<String>>,
    #[serde(default)]
    pub author: Option<Vec<Person>>,
    #[serde(default)]
    pub owner: Option<Vec<Person>>,
    #[serde(default, deserialize_with = "double_option")]
    pub app_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub organization: Option<Option<String>>,
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub species: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub brain_region: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cell_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub model_scope: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub abstraction_level: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl ScientificModel {
    pub fn apply_patch(&mut self, patch: ScientificModelPatch) {
        apply_field(&mut self.name, patch.name);
        apply_nullable(&mut self.alias, patch.alias);
        apply_field(&mut self.author, patch.author);
        apply_field(&mut self.owner, patch.owner);
        apply_nullable(&mut self.app_id, patch.app_id);
        apply_nullable(&mut self.organization, patch.organization);
        apply_field(&mut self.private, patch.private);
        apply_nullable(&mut self.species, patch.species);
        apply_nullable(&mut self.brain_region, patch.brain_region);
        apply_nullable(&mut self.cell_type, patch.cell_type);
        apply_nullable(&mut self.model_scope, patch.model_scope);
        apply_nullable(&mut self.abstraction_level, patch.abstraction_level);
        apply_nullable(&mut self.description, patch.description);
    }
}

/// A specific, parameterised version of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInstance {
    pub id: Id,
    pub model_id: Id,
    pub version: String,
    pub description: Option<String>,
    pub parameters: Option<String>,
    pub code_format: Option<String>,
    pub source: Option<String>,
    pub license: Option<String>,
    pub hash: Option<String>,
    pub morphology: Option<String>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewModelInstance {
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<String>,
    #[serde(default)]
    pub code_format: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub morphology: Option<String>,
}

impl NewModelInstance {
    pub fn into_record(self, model_id: Id, now: Timestamp) -> ModelInstance {
        ModelInstance {
            id: generate_id(),
            model_id,
            version: self.version,
            description: self.description,
            parameters: self.parameters,
            code_format: self.code_format,
            source: self.source,
            license: self.license,
            hash: self.hash,
            morphology: self.morphology,
            timestamp: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelInstancePatch {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parameters: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub code_format: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub source: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub license: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub hash: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub morphology: Option<Option<String>>,
}

impl ModelInstance {
    pub fn apply_patch(&mut self, patch: ModelInstancePatch) {
        apply_field(&mut self.version, patch.version);
        apply_nullable(&mut self.description, patch.description);
        apply_nullable(&mut self.parameters, patch.parameters);
        apply_nullable(&mut self.code_format, patch.code_format);
        apply_nullable(&mut self.source, patch.source);
        apply_nullable(&mut self.license, patch.license);
        apply_nullable(&mut self.hash, patch.hash);
        apply_nullable(&mut self.morphology, patch.morphology);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelImage {
    pub id: Id,
    pub model_id: Id,
    pub url: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewModelImage {
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

impl NewModelImage {
    pub fn into_record(self, model_id: Id) -> ModelImage {
        ModelImage {
            id: generate_id(),
            model_id,
            url: self.url,
            caption: self.caption,
        }
    }
}

/// Reduced field set used in list views.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub id: Id,
    pub name: String,
    pub alias: Option<String>,
    pub author: Vec<Person>,
    pub owner: Vec<Person>,
    pub app_id: Option<String>,
    pub organization: Option<String>,
    pub private: bool,
    pub species: Option<String>,
    pub brain_region: Option<String>,
    pub cell_type: Option<String>,
    pub model_scope: Option<String>,
    pub abstraction_level: Option<String>,
    pub date_created: Timestamp,
}

impl From<&ScientificModel> for ModelSummary {
    fn from(model: &ScientificModel) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            alias: model.alias.clone(),
            author: model.author.clone(),
            owner: model.owner.clone(),
            app_id: model.app_id.clone(),
            organization: model.organization.clone(),
            private: model.private,
            species: model.species.clone(),
            brain_region: model.brain_region.clone(),
            cell_type: model.cell_type.clone(),
            model_scope: model.model_scope.clone(),
            abstraction_level: model.abstraction_level.clone(),
            date_created: model.date_created,
        }
    }
}

/// Full field set, including child records, used for single-item views.
#[derive(Debug, Clone, Serialize)]
pub struct ModelDetail {
    #[serde(flatten)]
    pub model: ScientificModel,
    pub instances: Vec<ModelInstance>,
    pub images: Vec<ModelImage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ModelResponse {
    Standard(ModelSummary),
    Full(ModelDetail),
}
