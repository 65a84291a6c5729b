use crate::logic::{Filter, Page};
use crate::model::{
    CollabParameters, Comment, Id, ModelImage, ModelInstance, ScientificModel, Simulation, Ticket,
    TestInstance, Timestamp, ValidationResult, ValidationTest, Vocabulary, VocabularyTerm,
};
use anyhow::Result;

#[async_trait::async_trait]
pub trait VocabularyStore: Send + Sync {
    async fn load_vocabulary(&self) -> Result<Vocabulary>;
    async fn upsert_term(&self, term: VocabularyTerm) -> Result<()>;
    async fn get_collab_parameters(&self, app_id: &str) -> Result<Option<CollabParameters>>;
    async fn upsert_collab_parameters(&self, parameters: CollabParameters) -> Result<()>;
}

#[async_trait::async_trait]
pub trait ModelStore: Send + Sync {
    async fn get_model(&self, id: &Id) -> Result<Option<ScientificModel>>;
    async fn get_model_by_alias(&self, alias: &str) -> Result<Option<ScientificModel>>;
    /// Models matching `filter`, oldest first
    async fn list_models(&self, filter: &Filter, page: Page) -> Result<Vec<ScientificModel>>;
    /// Insert a model together with its initial instances and images
    async fn insert_model(
        &self,
        model: ScientificModel,
        instances: Vec<ModelInstance>,
        images: Vec<ModelImage>,
    ) -> Result<()>;
    async fn update_model(&self, model: ScientificModel) -> Result<()>;
    /// Delete a model and every instance, image, result and simulation that depends on it
    async fn delete_model(&self, id: &Id) -> Result<bool>;

    async fn list_model_instances(
        &self,
        model_id: &Id,
        filter: &Filter,
    ) -> Result<Vec<ModelInstance>>;
    async fn get_model_instance(&self, id: &Id) -> Result<Option<ModelInstance>>;
    async fn insert_model_instance(&self, instance: ModelInstance) -> Result<()>;
    async fn update_model_instance(&self, instance: ModelInstance) -> Result<()>;

    async fn list_model_images(&self, model_id: &Id) -> Result<Vec<ModelImage>>;
    async fn insert_model_image(&self, image: ModelImage) -> Result<()>;
    async fn delete_model_image(&self, id: &Id) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait TestStore: Send + Sync {
    async fn get_test(&self, id: &Id) -> Result<Option<ValidationTest>>;
    async fn get_test_by_alias(&self, alias: &str) -> Result<Option<ValidationTest>>;
    /// Tests matching `filter`, oldest first
    async fn list_tests(&self, filter: &Filter, page: Page) -> Result<Vec<ValidationTest>>;
    /// True if a test with this exact name and creation time exists
    async fn test_exists(&self, name: &str, date_created: Timestamp) -> Result<bool>;
    async fn insert_test(&self, test: ValidationTest, instances: Vec<TestInstance>) -> Result<()>;
    async fn update_test(&self, test: ValidationTest) -> Result<()>;
    /// Delete a test and every instance, result, comment and ticket that depends on it
    async fn delete_test(&self, id: &Id) -> Result<bool>;

    async fn list_test_instances(&self, test_id: &Id, filter: &Filter) -> Result<Vec<TestInstance>>;
    async fn get_test_instance(&self, id: &Id) -> Result<Option<TestInstance>>;
    async fn insert_test_instance(&self, instance: TestInstance) -> Result<()>;
    async fn update_test_instance(&self, instance: TestInstance) -> Result<()>;
}

#[async_trait::async_trait]
pub trait ResultStore: Send + Sync {
    /// Results matching `filter`, newest first
    async fn list_results(&self, filter: &Filter, page: Page) -> Result<Vec<ValidationResult>>;
    async fn get_result(&self, id: &Id) -> Result<Option<ValidationResult>>;
    async fn result_exists(
        &self,
        model_instance_id: &Id,
        test_instance_id: &Id,
        timestamp: Timestamp,
    ) -> Result<bool>;
    async fn insert_result(&self, result: ValidationResult) -> Result<()>;
    async fn delete_result(&self, id: &Id) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait SimulationStore: Send + Sync {
    /// Simulations matching `filter`, newest first
    async fn list_simulations(&self, filter: &Filter, page: Page) -> Result<Vec<Simulation>>;
    async fn get_simulation(&self, id: &Id) -> Result<Option<Simulation>>;
    async fn insert_simulation(&self, simulation: Simulation) -> Result<()>;
}

#[async_trait::async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn list_comments(&self, test_id: &Id) -> Result<Vec<Comment>>;
    async fn get_comment(&self, id: &Id) -> Result<Option<Comment>>;
    async fn insert_comment(&self, comment: Comment) -> Result<()>;
    async fn update_comment(&self, comment: Comment) -> Result<()>;

    async fn list_tickets(&self, test_id: &Id) -> Result<Vec<Ticket>>;
    async fn get_ticket(&self, id: &Id) -> Result<Option<Ticket>>;
    async fn insert_ticket(&self, ticket: Ticket) -> Result<()>;
    async fn update_ticket(&self, ticket: Ticket) -> Result<()>;
}

pub trait Store:
    VocabularyStore
    + ModelStore
    + TestStore
    + ResultStore
    + SimulationStore
    + FeedbackStore
    + Send
    + Sync
{
}
