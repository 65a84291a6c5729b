use crate::model::{apply_field, apply_nullable, double_option, generate_id, Id, Person, Timestamp};
use serde::{Deserialize, Serialize};

/// A named specification of a validation test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationTest {
    pub id: Id,
    pub name: String,
    pub alias: Option<String>,
    pub implementation_status: Option<String>,
    pub species: Option<String>,
    pub brain_region: Option<String>,
    pub cell_type: Option<String>,
    pub age: Option<String>,
    pub data_location: Vec<String>,
    pub data_type: Option<String>,
    pub data_modality: Option<String>,
    pub test_type: Option<String>,
    pub score_type: Option<String>,
    pub protocol: Option<String>,
    pub author: Vec<Person>,
    pub publication: Option<String>,
    pub app_id: Option<String>,
    pub date_created: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewValidationTest {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub implementation_status: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub brain_region: Option<String>,
    #[serde(default)]
    pub cell_type: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub data_location: Vec<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub data_modality: Option<String>,
    #[serde(default)]
    pub test_type: Option<String>,
    #[serde(default)]
    pub score_type: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub author: Vec<Person>,
    #[serde(default)]
    pub publication: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    /// Client-supplied creation time; defaults to the time of the request.
    #[serde(default)]
    pub date_created: Option<Timestamp>,
    #[serde(default)]
    pub instances: Vec<NewTestInstance>,
}

impl NewValidationTest {
    pub fn into_records(self, now: Timestamp) -> (ValidationTest, Vec<TestInstance>) {
        let test = ValidationTest {
            id: generate_id(),
            name: self.name,
            alias: self.alias,
            implementation_status: self.implementation_status,
            species: self.species,
            brain_region: self.brain_region,
            cell_type: self.cell_type,
            age: self.age,
            data_location: self.data_location,
            data_type: self.data_type,
            data_modality: self.data_modality,
            test_type: self.test_type,
            score_type: self.score_type,
            protocol: self.protocol,
            author: self.author,
            publication: self.publication,
            app_id: self.app_id,
            date_created: self.date_created.unwrap_or(now),
        };
        let instances = self
            .instances
            .into_iter()
            .map(|i| i.into_record(test.id, now))
            .collect();
        (test, instances)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationTestPatch {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub alias: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub implementation_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub species: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub brain_region: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cell_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub age: Option<Option<String>>,
    #[serde(default)]
    pub data_location: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub data_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub data_modality: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub test_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub score_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub protocol: Option<Option<String>>,
    #[serde(default)]
    pub author: Option<Vec<Person>>,
    #[serde(default, deserialize_with = "double_option")]
    pub publication: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub app_id: Option<Option<String>>,
}

impl ValidationTest {
    pub fn apply_patch(&mut self, patch: ValidationTestPatch) {
        apply_field(&mut self.name, patch.name);
        apply_nullable(&mut self.alias, patch.alias);
        apply_nullable(&mut self.implementation_status, patch.implementation_status);
        apply_nullable(&mut self.species, patch.species);
        apply_nullable(&mut self.brain_region, patch.brain_region);
        apply_nullable(&mut self.cell_type, patch.cell_type);
        apply_nullable(&mut self.age, patch.age);
        apply_field(&mut self.data_location, patch.data_location);
        apply_nullable(&mut self.data_type, patch.data_type);
        apply_nullable(&mut self.data_modality, patch.data_modality);
        apply_nullable(&mut self.test_type, patch.test_type);
        apply_nullable(&mut self.score_type, patch.score_type);
        apply_nullable(&mut self.protocol, patch.protocol);
        apply_field(&mut self.author, patch.author);
        apply_nullable(&mut self.publication, patch.publication);
        apply_nullable(&mut self.app_id, patch.app_id);
    }
}

/// A concrete runnable version of a test definition (the test "code").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestInstance {
    pub id: Id,
    pub test_definition_id: Id,
    pub repository: String,
    pub version: String,
    pub description: Option<String>,
    pub parameters: Option<String>,
    pub path: Option<String>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTestInstance {
    pub repository: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl NewTestInstance {
    pub fn into_record(self, test_definition_id: Id, now: Timestamp) -> TestInstance {
        TestInstance {
            id: generate_id(),
            test_definition_id,
            repository: self.repository,
            version: self.version,
            description: self.description,
            parameters: self.parameters,
            path: self.path,
            timestamp: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestInstancePatch {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parameters: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub path: Option<Option<String>>,
}

impl TestInstance {
    pub fn apply_patch(&mut self, patch: TestInstancePatch) {
        apply_field(&mut self.repository, patch.repository);
        apply_field(&mut self.version, patch.version);
        apply_nullable(&mut self.description, patch.description);
        apply_nullable(&mut self.parameters, patch.parameters);
        apply_nullable(&mut self.path, patch.path);
    }
}

/// Reduced field set used in list views.
#[derive(Debug, Clone, Serialize)]
pub struct TestSummary {
    pub id: Id,
    pub name: String,
    pub alias: Option<String>,
    pub implementation_status: Option<String>,
    pub species: Option<String>,
    pub brain_region: Option<String>,
    pub cell_type: Option<String>,
    pub age: Option<String>,
    pub data_location: Vec<String>,
    pub data_type: Option<String>,
    pub data_modality: Option<String>,
    pub test_type: Option<String>,
    pub score_type: Option<String>,
    pub author: Vec<Person>,
    pub publication: Option<String>,
    pub app_id: Option<String>,
    pub date_created: Timestamp,
}

impl From<&ValidationTest> for TestSummary {
    fn from(test: &ValidationTest) -> Self {
        Self {
            id: test.id,
            name: test.name.clone(),
            alias: test.alias.clone(),
            implementation_status: test.implementation_status.clone(),
            species: test.species.clone(),
            brain_region: test.brain_region.clone(),
            cell_type: test.cell_type.clone(),
            age: test.age.clone(),
            data_location: test.data_location.clone(),
            data_type: test.data_type.clone(),
            data_modality: test.data_modality.clone(),
            test_type: test.test_type.clone(),
            score_type: test.score_type.clone(),
            author: test.author.clone(),
            publication: test.publication.clone(),
            app_id: test.app_id.clone(),
            date_created: test.date_created,
        }
    }
}

/// Full field set with the protocol text and every test instance.
#[derive(Debug, Clone, Serialize)]
pub struct TestDetail {
    #[serde(flatten)]
    pub test: ValidationTest,
    pub instances: Vec<TestInstance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TestResponse {
    Standard(TestSummary),
    Full(TestDetail),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_client_supplied_creation_date_is_kept() {
        let payload: NewValidationTest = serde_json::from_str(
            r#"{
                "name": "Somatic spikes",
                "alias": "somatic_spikes",
                "date_created": "2020-01-01T00:00:00Z",
                "instances": [{"repository": "https://github.com/x/y", "version": "1.0"}]
            }"#,
        )
        .unwrap();

        let (test, instances) = payload.into_records(Utc::now());
        assert_eq!(
            test.date_created,
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].test_definition_id, test.id);
    }

    #[test]
    fn test_instance_patch_only_touches_supplied_fields() {
        let mut instance = NewTestInstance {
            repository: "https://github.com/x/y".to_string(),
            version: "1.0".to_string(),
            description: Some("first".to_string()),
            parameters: None,
            path: Some("tests.Somatic".to_string()),
        }
        .into_record(generate_id(), Utc::now());

        let patch: TestInstancePatch = serde_json::from_str(r#"{"version": "1.1"}"#).unwrap();
        instance.apply_patch(patch);

        assert_eq!(instance.version, "1.1");
        assert_eq!(instance.description.as_deref(), Some("first"));
        assert_eq!(instance.path.as_deref(), Some("tests.Somatic"));
    }
}
