use anyhow::{anyhow, Result};
use itertools::Itertools;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::logic::{Filter, Filterable, Page};
use crate::model::{
    CollabParameters, Comment, Id, ModelImage, ModelInstance, ScientificModel, Simulation, Ticket,
    TestInstance, Timestamp, ValidationResult, ValidationTest, Vocabulary, VocabularyTerm,
};
use crate::store::traits::{
    FeedbackStore, ModelStore, ResultStore, SimulationStore, Store, TestStore, VocabularyStore,
};

#[derive(Debug, Default)]
struct Tables {
    vocabulary: Vocabulary,
    collab_parameters: BTreeMap<String, CollabParameters>,
    models: HashMap<Id, ScientificModel>,
    model_instances: HashMap<Id, ModelInstance>,
    model_images: HashMap<Id, ModelImage>,
    tests: HashMap<Id, ValidationTest>,
    test_instances: HashMap<Id, TestInstance>,
    results: HashMap<Id, ValidationResult>,
    simulations: HashMap<Id, Simulation>,
    comments: HashMap<Id, Comment>,
    tickets: HashMap<Id, Ticket>,
}

/// In-process store with the same semantics as [`crate::store::PostgresStore`].
///
/// A single lock guards every table, so each trait call is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Oldest first, id as tie-breaker, then paginated.
fn oldest_first<'a, T, I>(records: I, filter: &Filter, page: Page) -> Vec<T>
where
    T: Filterable + Clone + 'a,
    I: IntoIterator<Item = &'a T>,
    T: HasId,
{
    let matching = records
        .into_iter()
        .filter(|r| filter.matches(*r))
        .sorted_by_key(|r| (r.created_at(), r.record_id()))
        .cloned();
    page.apply(matching)
}

/// Newest first, id as tie-breaker, then paginated.
fn newest_first<'a, T, I>(records: I, filter: &Filter, page: Page) -> Vec<T>
where
    T: Filterable + Clone + 'a,
    I: IntoIterator<Item = &'a T>,
    T: HasId,
{
    let matching = records
        .into_iter()
        .filter(|r| filter.matches(*r))
        .sorted_by_key(|r| (Reverse(r.created_at()), r.record_id()))
        .cloned();
    page.apply(matching)
}

trait HasId {
    fn record_id(&self) -> Id;
}

macro_rules! has_id {
    ($($ty:ty),*) => {
        $(impl HasId for $ty {
            fn record_id(&self) -> Id {
                self.id
            }
        })*
    };
}

has_id!(
    ScientificModel,
    ModelInstance,
    ValidationTest,
    TestInstance,
    ValidationResult,
    Simulation
);

fn replace<T>(table: &mut HashMap<Id, T>, id: Id, record: T, what: &str) -> Result<()> {
    match table.get_mut(&id) {
        Some(existing) => {
            *existing = record;
            Ok(())
        }
        None => Err(anyhow!("{} {} does not exist", what, id)),
    }
}

impl Tables {
    fn remove_model_instance_dependents(&mut self, instance_ids: &HashSet<Id>) {
        self.results
            .retain(|_, r| !instance_ids.contains(&r.model_instance_id));
        self.simulations
            .retain(|_, s| !instance_ids.contains(&s.model_instance_id));
    }
}

#[async_trait::async_trait]
impl VocabularyStore for MemoryStore {
    async fn load_vocabulary(&self) -> Result<Vocabulary> {
        Ok(self.tables.read().vocabulary.clone())
    }

    async fn upsert_term(&self, term: VocabularyTerm) -> Result<()> {
        self.tables.write().vocabulary.insert(term);
        Ok(())
    }

    async fn get_collab_parameters(&self, app_id: &str) -> Result<Option<CollabParameters>> {
        Ok(self.tables.read().collab_parameters.get(app_id).cloned())
    }

    async fn upsert_collab_parameters(&self, parameters: CollabParameters) -> Result<()> {
        self.tables
            .write()
            .collab_parameters
            .insert(parameters.app_id.clone(), parameters);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ModelStore for MemoryStore {
    async fn get_model(&self, id: &Id) -> Result<Option<ScientificModel>> {
        Ok(self.tables.read().models.get(id).cloned())
    }

    async fn get_model_by_alias(&self, alias: &str) -> Result<Option<ScientificModel>> {
        Ok(self
            .tables
            .read()
            .models
            .values()
            .find(|m| m.alias.as_deref() == Some(alias))
            .cloned())
    }

    async fn list_models(&self, filter: &Filter, page: Page) -> Result<Vec<ScientificModel>> {
        Ok(oldest_first(self.tables.read().models.values(), filter, page))
    }

    async fn insert_model(
        &self,
        model: ScientificModel,
        instances: Vec<ModelInstance>,
        images: Vec<ModelImage>,
    ) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.models.contains_key(&model.id) {
            return Err(anyhow!("Model {} already exists", model.id));
        }
        tables.models.insert(model.id, model);
        tables
            .model_instances
            .extend(instances.into_iter().map(|i| (i.id, i)));
        tables
            .model_images
            .extend(images.into_iter().map(|i| (i.id, i)));
        Ok(())
    }

    async fn update_model(&self, model: ScientificModel) -> Result<()> {
        replace(&mut self.tables.write().models, model.id, model, "Model")
    }

    async fn delete_model(&self, id: &Id) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.models.remove(id).is_none() {
            return Ok(false);
        }
        let instance_ids: HashSet<Id> = tables
            .model_instances
            .values()
            .filter(|i| i.model_id == *id)
            .map(|i| i.id)
            .collect();
        tables.remove_model_instance_dependents(&instance_ids);
        tables.model_instances.retain(|_, i| i.model_id != *id);
        tables.model_images.retain(|_, i| i.model_id != *id);
        Ok(true)
    }

    async fn list_model_instances(
        &self,
        model_id: &Id,
        filter: &Filter,
    ) -> Result<Vec<ModelInstance>> {
        let tables = self.tables.read();
        let instances = tables
            .model_instances
            .values()
            .filter(|i| i.model_id == *model_id);
        Ok(oldest_first(instances, filter, Page::unbounded()))
    }

    async fn get_model_instance(&self, id: &Id) -> Result<Option<ModelInstance>> {
        Ok(self.tables.read().model_instances.get(id).cloned())
    }

    async fn insert_model_instance(&self, instance: ModelInstance) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables.models.contains_key(&instance.model_id) {
            return Err(anyhow!("Model {} does not exist", instance.model_id));
        }
        tables.model_instances.insert(instance.id, instance);
        Ok(())
    }

    async fn update_model_instance(&self, instance: ModelInstance) -> Result<()> {
        replace(
            &mut self.tables.write().model_instances,
            instance.id,
            instance,
            "Model instance",
        )
    }

    async fn list_model_images(&self, model_id: &Id) -> Result<Vec<ModelImage>> {
        Ok(self
            .tables
            .read()
            .model_images
            .values()
            .filter(|i| i.model_id == *model_id)
            .sorted_by_key(|i| i.id)
            .cloned()
            .collect())
    }

    async fn insert_model_image(&self, image: ModelImage) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables.models.contains_key(&image.model_id) {
            return Err(anyhow!("Model {} does not exist", image.model_id));
        }
        tables.model_images.insert(image.id, image);
        Ok(())
    }

    async fn delete_model_image(&self, id: &Id) -> Result<bool> {
        Ok(self.tables.write().model_images.remove(id).is_some())
    }
}

#[async_trait::async_trait]
impl TestStore for MemoryStore {
    async fn get_test(&self, id: &Id) -> Result<Option<ValidationTest>> {
        Ok(self.tables.read().tests.get(id).cloned())
    }

    async fn get_test_by_alias(&self, alias: &str) -> Result<Option<ValidationTest>> {
        Ok(self
            .tables
            .read()
            .tests
            .values()
            .find(|t| t.alias.as_deref() == Some(alias))
            .cloned())
    }

    async fn list_tests(&self, filter: &Filter, page: Page) -> Result<Vec<ValidationTest>> {
        Ok(oldest_first(self.tables.read().tests.values(), filter, page))
    }

    async fn test_exists(&self, name: &str, date_created: Timestamp) -> Result<bool> {
        Ok(self
            .tables
            .read()
            .tests
            .values()
            .any(|t| t.name == name && t.date_created == date_created))
    }

    async fn insert_test(&self, test: ValidationTest, instances: Vec<TestInstance>) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.tests.contains_key(&test.id) {
            return Err(anyhow!("Test {} already exists", test.id));
        }
        tables.tests.insert(test.id, test);
        tables
            .test_instances
            .extend(instances.into_iter().map(|i| (i.id, i)));
        Ok(())
    }

    async fn update_test(&self, test: ValidationTest) -> Result<()> {
        replace(&mut self.tables.write().tests, test.id, test, "Test")
    }

    async fn delete_test(&self, id: &Id) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.tests.remove(id).is_none() {
            return Ok(false);
        }
        let instance_ids: HashSet<Id> = tables
            .test_instances
            .values()
            .filter(|i| i.test_definition_id == *id)
            .map(|i| i.id)
            .collect();
        tables
            .results
            .retain(|_, r| !instance_ids.contains(&r.test_instance_id));
        tables.test_instances.retain(|_, i| i.test_definition_id != *id);
        tables.comments.retain(|_, c| c.test_id != *id);
        tables.tickets.retain(|_, t| t.test_id != *id);
        Ok(true)
    }

    async fn list_test_instances(
        &self,
        test_id: &Id,
        filter: &Filter,
    ) -> Result<Vec<TestInstance>> {
        let tables = self.tables.read();
        let instances = tables
            .test_instances
            .values()
            .filter(|i| i.test_definition_id == *test_id);
        Ok(oldest_first(instances, filter, Page::unbounded()))
    }

    async fn get_test_instance(&self, id: &Id) -> Result<Option<TestInstance>> {
        Ok(self.tables.read().test_instances.get(id).cloned())
    }

    async fn insert_test_instance(&self, instance: TestInstance) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables.tests.contains_key(&instance.test_definition_id) {
            return Err(anyhow!(
                "Test {} does not exist",
                instance.test_definition_id
            ));
        }
        tables.test_instances.insert(instance.id, instance);
        Ok(())
    }

    async fn update_test_instance(&self, instance: TestInstance) -> Result<()> {
        replace(
            &mut self.tables.write().test_instances,
            instance.id,
            instance,
            "Test instance",
        )
    }
}

#[async_trait::async_trait]
impl ResultStore for MemoryStore {
    async fn list_results(&self, filter: &Filter, page: Page) -> Result<Vec<ValidationResult>> {
        Ok(newest_first(self.tables.read().results.values(), filter, page))
    }

    async fn get_result(&self, id: &Id) -> Result<Option<ValidationResult>> {
        Ok(self.tables.read().results.get(id).cloned())
    }

    async fn result_exists(
        &self,
        model_instance_id: &Id,
        test_instance_id: &Id,
        timestamp: Timestamp,
    ) -> Result<bool> {
        Ok(self.tables.read().results.values().any(|r| {
            r.model_instance_id == *model_instance_id
                && r.test_instance_id == *test_instance_id
                && r.timestamp == timestamp
        }))
    }

    async fn insert_result(&self, result: ValidationResult) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables.model_instances.contains_key(&result.model_instance_id) {
            return Err(anyhow!(
                "Model instance {} does not exist",
                result.model_instance_id
            ));
        }
        if !tables.test_instances.contains_key(&result.test_instance_id) {
            return Err(anyhow!(
                "Test instance {} does not exist",
                result.test_instance_id
            ));
        }
        tables.results.insert(result.id, result);
        Ok(())
    }

    async fn delete_result(&self, id: &Id) -> Result<bool> {
        Ok(self.tables.write().results.remove(id).is_some())
    }
}

#[async_trait::async_trait]
impl SimulationStore for MemoryStore {
    async fn list_simulations(&self, filter: &Filter, page: Page) -> Result<Vec<Simulation>> {
        Ok(newest_first(
            self.tables.read().simulations.values(),
            filter,
            page,
        ))
    }

    async fn get_simulation(&self, id: &Id) -> Result<Option<Simulation>> {
        Ok(self.tables.read().simulations.get(id).cloned())
    }

    async fn insert_simulation(&self, simulation: Simulation) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables
            .model_instances
            .contains_key(&simulation.model_instance_id)
        {
            return Err(anyhow!(
                "Model instance {} does not exist",
                simulation.model_instance_id
            ));
        }
        tables.simulations.insert(simulation.id, simulation);
        Ok(())
    }
}

#[async_trait::async_trait]
impl FeedbackStore for MemoryStore {
    async fn list_comments(&self, test_id: &Id) -> Result<Vec<Comment>> {
        Ok(self
            .tables
            .read()
            .comments
            .values()
            .filter(|c| c.test_id == *test_id)
            .sorted_by_key(|c| (c.creation_date, c.id))
            .cloned()
            .collect())
    }

    async fn get_comment(&self, id: &Id) -> Result<Option<Comment>> {
        Ok(self.tables.read().comments.get(id).cloned())
    }

    async fn insert_comment(&self, comment: Comment) -> Result<()> {
        self.tables.write().comments.insert(comment.id, comment);
        Ok(())
    }

    async fn update_comment(&self, comment: Comment) -> Result<()> {
        replace(&mut self.tables.write().comments, comment.id, comment, "Comment")
    }

    async fn list_tickets(&self, test_id: &Id) -> Result<Vec<Ticket>> {
        Ok(self
            .tables
            .read()
            .tickets
            .values()
            .filter(|t| t.test_id == *test_id)
            .sorted_by_key(|t| (t.creation_date, t.id))
            .cloned()
            .collect())
    }

    async fn get_ticket(&self, id: &Id) -> Result<Option<Ticket>> {
        Ok(self.tables.read().tickets.get(id).cloned())
    }

    async fn insert_ticket(&self, ticket: Ticket) -> Result<()> {
        self.tables.write().tickets.insert(ticket.id, ticket);
        Ok(())
    }

    async fn update_ticket(&self, ticket: Ticket) -> Result<()> {
        replace(&mut self.tables.write().tickets, ticket.id, ticket, "Ticket")
    }
}

impl Store for MemoryStore {}
