use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::str::FromStr;

use crate::logic::{Clause, Field, Filter, Page};
use crate::model::{
    CollabParameters, Comment, Id, ModelImage, ModelInstance, ScientificModel, Simulation, Ticket,
    TestInstance, Timestamp, ValidationResult, ValidationTest, Vocabulary, VocabularyKind,
    VocabularyTerm,
};
use crate::store::sql_filter::{push_filter, push_page};
use crate::store::traits::{
    FeedbackStore, ModelStore, ResultStore, SimulationStore, Store, TestStore, VocabularyStore,
};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_max_connections(database_url, 20).await
    }

    pub async fn with_max_connections(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        log::info!("Database migrations applied");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_by_id<T: DeserializeOwned>(&self, table: &str, id: &Id) -> Result<Option<T>> {
        let row = sqlx::query(&format!("SELECT body FROM {} WHERE id = $1", table))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch from {}", table))?;

        row.as_ref().map(decode_body).transpose()
    }

    async fn fetch_by_alias<T: DeserializeOwned>(
        &self,
        table: &str,
        alias: &str,
    ) -> Result<Option<T>> {
        let row = sqlx::query(&format!("SELECT body FROM {} WHERE alias = $1", table))
            .bind(alias)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch from {} by alias", table))?;

        row.as_ref().map(decode_body).transpose()
    }

    async fn fetch_filtered<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &Filter,
        page: Page,
        newest_first: bool,
    ) -> Result<Vec<T>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT body FROM {}", table));
        push_filter(&mut builder, filter);
        push_page(&mut builder, page, newest_first);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {}", table))?;

        rows.iter().map(decode_body).collect()
    }

    async fn fetch_children<T: DeserializeOwned>(
        &self,
        table: &str,
        parent_column: &str,
        parent_id: &Id,
    ) -> Result<Vec<T>> {
        let rows = sqlx::query(&format!(
            "SELECT body FROM {} WHERE {} = $1 ORDER BY created_at, id",
            table, parent_column
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to list {}", table))?;

        rows.iter().map(decode_body).collect()
    }

    async fn delete_by_id(&self, table: &str, id: &Id) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table))
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete from {}", table))?;

        Ok(result.rows_affected() > 0)
    }
}

fn decode_body<T: DeserializeOwned>(row: &PgRow) -> Result<T> {
    let body: serde_json::Value = row.try_get("body").context("Failed to read record body")?;
    serde_json::from_value(body).context("Failed to deserialize stored record")
}

fn ensure_updated(rows_affected: u64, what: &str, id: &Id) -> Result<()> {
    if rows_affected == 0 {
        bail!("{} {} does not exist", what, id);
    }
    Ok(())
}

fn with_parent(filter: &Filter, field: Field, parent_id: &Id) -> Filter {
    let mut scoped = filter.clone();
    scoped.push(Clause::OneOf {
        field,
        values: vec![parent_id.to_string()],
    });
    scoped
}

async fn insert_model_instance_row<'e, E>(executor: E, instance: &ModelInstance) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "INSERT INTO model_instances (id, model_id, created_at, body) VALUES ($1, $2, $3, $4)",
    )
    .bind(instance.id)
    .bind(instance.model_id)
    .bind(instance.timestamp)
    .bind(Json(instance))
    .execute(executor)
    .await
    .context("Failed to insert model instance")?;
    Ok(())
}

async fn insert_model_image_row<'e, E>(executor: E, image: &ModelImage) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query("INSERT INTO model_images (id, model_id, body) VALUES ($1, $2, $3)")
        .bind(image.id)
        .bind(image.model_id)
        .bind(Json(image))
        .execute(executor)
        .await
        .context("Failed to insert model image")?;
    Ok(())
}

async fn insert_test_instance_row<'e, E>(executor: E, instance: &TestInstance) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "INSERT INTO test_instances (id, test_definition_id, created_at, body) VALUES ($1, $2, $3, $4)",
    )
    .bind(instance.id)
    .bind(instance.test_definition_id)
    .bind(instance.timestamp)
    .bind(Json(instance))
    .execute(executor)
    .await
    .context("Failed to insert test instance")?;
    Ok(())
}

#[async_trait::async_trait]
impl VocabularyStore for PostgresStore {
    async fn load_vocabulary(&self) -> Result<Vocabulary> {
        let rows = sqlx::query(
            "SELECT kind, label, synonyms FROM vocabulary_terms ORDER BY kind, label",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load vocabulary")?;

        let terms = rows
            .into_iter()
            .map(|row| {
                let kind: String = row.get("kind");
                Ok(VocabularyTerm {
                    kind: VocabularyKind::from_str(&kind).map_err(|e| anyhow!(e))?,
                    label: row.get("label"),
                    synonyms: row.get("synonyms"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Vocabulary::from_terms(terms))
    }

    async fn upsert_term(&self, term: VocabularyTerm) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO vocabulary_terms (kind, label, synonyms)
            VALUES ($1, $2, $3)
            ON CONFLICT (kind, label) DO UPDATE SET
                synonyms = EXCLUDED.synonyms
            "#,
        )
        .bind(term.kind.as_str())
        .bind(&term.label)
        .bind(&term.synonyms)
        .execute(&self.pool)
        .await
        .context("Failed to upsert vocabulary term")?;

        Ok(())
    }

    async fn get_collab_parameters(&self, app_id: &str) -> Result<Option<CollabParameters>> {
        let row = sqlx::query("SELECT body FROM collab_parameters WHERE app_id = $1")
            .bind(app_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch collab parameters")?;

        row.as_ref().map(decode_body).transpose()
    }

    async fn upsert_collab_parameters(&self, parameters: CollabParameters) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO collab_parameters (app_id, body)
            VALUES ($1, $2)
            ON CONFLICT (app_id) DO UPDATE SET
                body = EXCLUDED.body,
                updated_at = NOW()
            "#,
        )
        .bind(&parameters.app_id)
        .bind(Json(&parameters))
        .execute(&self.pool)
        .await
        .context("Failed to upsert collab parameters")?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl ModelStore for PostgresStore {
    async fn get_model(&self, id: &Id) -> Result<Option<ScientificModel>> {
        self.fetch_by_id("scientific_models", id).await
    }

    async fn get_model_by_alias(&self, alias: &str) -> Result<Option<ScientificModel>> {
        self.fetch_by_alias("scientific_models", alias).await
    }

    async fn list_models(&self, filter: &Filter, page: Page) -> Result<Vec<ScientificModel>> {
        self.fetch_filtered("scientific_models", filter, page, false)
            .await
    }

    async fn insert_model(
        &self,
        model: ScientificModel,
        instances: Vec<ModelInstance>,
        images: Vec<ModelImage>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            "INSERT INTO scientific_models (id, alias, created_at, body) VALUES ($1, $2, $3, $4)",
        )
        .bind(model.id)
        .bind(&model.alias)
        .bind(model.date_created)
        .bind(Json(&model))
        .execute(&mut *tx)
        .await
        .context("Failed to insert model")?;

        for instance in &instances {
            insert_model_instance_row(&mut *tx, instance).await?;
        }
        for image in &images {
            insert_model_image_row(&mut *tx, image).await?;
        }

        tx.commit().await.context("Failed to commit model")?;
        Ok(())
    }

    async fn update_model(&self, model: ScientificModel) -> Result<()> {
        let result = sqlx::query("UPDATE scientific_models SET alias = $2, body = $3 WHERE id = $1")
            .bind(model.id)
            .bind(&model.alias)
            .bind(Json(&model))
            .execute(&self.pool)
            .await
            .context("Failed to update model")?;

        ensure_updated(result.rows_affected(), "Model", &model.id)
    }

    async fn delete_model(&self, id: &Id) -> Result<bool> {
        // Instances, images, results and simulations go with it via ON DELETE CASCADE
        self.delete_by_id("scientific_models", id).await
    }

    async fn list_model_instances(
        &self,
        model_id: &Id,
        filter: &Filter,
    ) -> Result<Vec<ModelInstance>> {
        let scoped = with_parent(filter, Field::ModelId, model_id);
        self.fetch_filtered("model_instances", &scoped, Page::unbounded(), false)
            .await
    }

    async fn get_model_instance(&self, id: &Id) -> Result<Option<ModelInstance>> {
        self.fetch_by_id("model_instances", id).await
    }

    async fn insert_model_instance(&self, instance: ModelInstance) -> Result<()> {
        insert_model_instance_row(&self.pool, &instance).await
    }

    async fn update_model_instance(&self, instance: ModelInstance) -> Result<()> {
        let result = sqlx::query("UPDATE model_instances SET body = $2 WHERE id = $1")
            .bind(instance.id)
            .bind(Json(&instance))
            .execute(&self.pool)
            .await
            .context("Failed to update model instance")?;

        ensure_updated(result.rows_affected(), "Model instance", &instance.id)
    }

    async fn list_model_images(&self, model_id: &Id) -> Result<Vec<ModelImage>> {
        let rows = sqlx::query("SELECT body FROM model_images WHERE model_id = $1 ORDER BY id")
            .bind(model_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list model images")?;

        rows.iter().map(decode_body).collect()
    }

    async fn insert_model_image(&self, image: ModelImage) -> Result<()> {
        insert_model_image_row(&self.pool, &image).await
    }

    async fn delete_model_image(&self, id: &Id) -> Result<bool> {
        self.delete_by_id("model_images", id).await
    }
}

#[async_trait::async_trait]
impl TestStore for PostgresStore {
    async fn get_test(&self, id: &Id) -> Result<Option<ValidationTest>> {
        self.fetch_by_id("test_definitions", id).await
    }

    async fn get_test_by_alias(&self, alias: &str) -> Result<Option<ValidationTest>> {
        self.fetch_by_alias("test_definitions", alias).await
    }

    async fn list_tests(&self, filter: &Filter, page: Page) -> Result<Vec<ValidationTest>> {
        self.fetch_filtered("test_definitions", filter, page, false)
            .await
    }

    async fn test_exists(&self, name: &str, date_created: Timestamp) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM test_definitions WHERE name = $1 AND created_at = $2)",
        )
        .bind(name)
        .bind(date_created)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check for existing test")?;

        Ok(exists)
    }

    async fn insert_test(&self, test: ValidationTest, instances: Vec<TestInstance>) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            "INSERT INTO test_definitions (id, alias, name, created_at, body) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(test.id)
        .bind(&test.alias)
        .bind(&test.name)
        .bind(test.date_created)
        .bind(Json(&test))
        .execute(&mut *tx)
        .await
        .context("Failed to insert test")?;

        for instance in &instances {
            insert_test_instance_row(&mut *tx, instance).await?;
        }

        tx.commit().await.context("Failed to commit test")?;
        Ok(())
    }

    async fn update_test(&self, test: ValidationTest) -> Result<()> {
        let result = sqlx::query(
            "UPDATE test_definitions SET alias = $2, name = $3, body = $4 WHERE id = $1",
        )
        .bind(test.id)
        .bind(&test.alias)
        .bind(&test.name)
        .bind(Json(&test))
        .execute(&self.pool)
        .await
        .context("Failed to update test")?;

        ensure_updated(result.rows_affected(), "Test", &test.id)
    }

    async fn delete_test(&self, id: &Id) -> Result<bool> {
        self.delete_by_id("test_definitions", id).await
    }

    async fn list_test_instances(
        &self,
        test_id: &Id,
        filter: &Filter,
    ) -> Result<Vec<TestInstance>> {
        let scoped = with_parent(filter, Field::TestDefinitionId, test_id);
        self.fetch_filtered("test_instances", &scoped, Page::unbounded(), false)
            .await
    }

    async fn get_test_instance(&self, id: &Id) -> Result<Option<TestInstance>> {
        self.fetch_by_id("test_instances", id).await
    }

    async fn insert_test_instance(&self, instance: TestInstance) -> Result<()> {
        insert_test_instance_row(&self.pool, &instance).await
    }

    async fn update_test_instance(&self, instance: TestInstance) -> Result<()> {
        let result = sqlx::query("UPDATE test_instances SET body = $2 WHERE id = $1")
            .bind(instance.id)
            .bind(Json(&instance))
            .execute(&self.pool)
            .await
            .context("Failed to update test instance")?;

        ensure_updated(result.rows_affected(), "Test instance", &instance.id)
    }
}

#[async_trait::async_trait]
impl ResultStore for PostgresStore {
    async fn list_results(&self, filter: &Filter, page: Page) -> Result<Vec<ValidationResult>> {
        self.fetch_filtered("results", filter, page, true).await
    }

    async fn get_result(&self, id: &Id) -> Result<Option<ValidationResult>> {
        self.fetch_by_id("results", id).await
    }

    async fn result_exists(
        &self,
        model_instance_id: &Id,
        test_instance_id: &Id,
        timestamp: Timestamp,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM results
                WHERE model_instance_id = $1 AND test_instance_id = $2 AND created_at = $3
            )
            "#,
        )
        .bind(model_instance_id)
        .bind(test_instance_id)
        .bind(timestamp)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check for existing result")?;

        Ok(exists)
    }

    async fn insert_result(&self, result: ValidationResult) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO results (id, model_instance_id, test_instance_id, created_at, body)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(result.id)
        .bind(result.model_instance_id)
        .bind(result.test_instance_id)
        .bind(result.timestamp)
        .bind(Json(&result))
        .execute(&self.pool)
        .await
        .context("Failed to insert result")?;

        Ok(())
    }

    async fn delete_result(&self, id: &Id) -> Result<bool> {
        self.delete_by_id("results", id).await
    }
}

#[async_trait::async_trait]
impl SimulationStore for PostgresStore {
    async fn list_simulations(&self, filter: &Filter, page: Page) -> Result<Vec<Simulation>> {
        self.fetch_filtered("simulations", filter, page, true).await
    }

    async fn get_simulation(&self, id: &Id) -> Result<Option<Simulation>> {
        self.fetch_by_id("simulations", id).await
    }

    async fn insert_simulation(&self, simulation: Simulation) -> Result<()> {
        sqlx::query(
            "INSERT INTO simulations (id, model_instance_id, created_at, body) VALUES ($1, $2, $3, $4)",
        )
        .bind(simulation.id)
        .bind(simulation.model_instance_id)
        .bind(simulation.timestamp)
        .bind(Json(&simulation))
        .execute(&self.pool)
        .await
        .context("Failed to insert simulation")?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl FeedbackStore for PostgresStore {
    async fn list_comments(&self, test_id: &Id) -> Result<Vec<Comment>> {
        self.fetch_children("comments", "test_id", test_id).await
    }

    async fn get_comment(&self, id: &Id) -> Result<Option<Comment>> {
        self.fetch_by_id("comments", id).await
    }

    async fn insert_comment(&self, comment: Comment) -> Result<()> {
        sqlx::query("INSERT INTO comments (id, test_id, created_at, body) VALUES ($1, $2, $3, $4)")
            .bind(comment.id)
            .bind(comment.test_id)
            .bind(comment.creation_date)
            .bind(Json(&comment))
            .execute(&self.pool)
            .await
            .context("Failed to insert comment")?;

        Ok(())
    }

    async fn update_comment(&self, comment: Comment) -> Result<()> {
        let result = sqlx::query("UPDATE comments SET body = $2 WHERE id = $1")
            .bind(comment.id)
            .bind(Json(&comment))
            .execute(&self.pool)
            .await
            .context("Failed to update comment")?;

        ensure_updated(result.rows_affected(), "Comment", &comment.id)
    }

    async fn list_tickets(&self, test_id: &Id) -> Result<Vec<Ticket>> {
        self.fetch_children("tickets", "test_id", test_id).await
    }

    async fn get_ticket(&self, id: &Id) -> Result<Option<Ticket>> {
        self.fetch_by_id("tickets", id).await
    }

    async fn insert_ticket(&self, ticket: Ticket) -> Result<()> {
        sqlx::query("INSERT INTO tickets (id, test_id, created_at, body) VALUES ($1, $2, $3, $4)")
            .bind(ticket.id)
            .bind(ticket.test_id)
            .bind(ticket.creation_date)
            .bind(Json(&ticket))
            .execute(&self.pool)
            .await
            .context("Failed to insert ticket")?;

        Ok(())
    }

    async fn update_ticket(&self, ticket: Ticket) -> Result<()> {
        let result = sqlx::query("UPDATE tickets SET body = $2 WHERE id = $1")
            .bind(ticket.id)
            .bind(Json(&ticket))
            .execute(&self.pool)
            .await
            .context("Failed to update ticket")?;

        ensure_updated(result.rows_affected(), "Ticket", &ticket.id)
    }
}

impl Store for PostgresStore {}
