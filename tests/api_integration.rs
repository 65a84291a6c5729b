use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use validation_registry::api::{create_router, AppState};
use validation_registry::auth::StaticIdentityProvider;
use validation_registry::model::UserContext;
use validation_registry::seed;
use validation_registry::store::MemoryStore;

const ADMIN: &str = "admin-token";
const MEMBER: &str = "member-token";
const OUTSIDER: &str = "outsider-token";

// Test client wrapper for driving the router in-process
struct TestClient {
    app: Router,
}

impl TestClient {
    async fn new() -> Self {
        let store = MemoryStore::new();
        seed::load_vocabularies(&store).await.unwrap();

        let identity = StaticIdentityProvider::new()
            .with_user(ADMIN, UserContext::new("admin".to_string()))
            .with_user(MEMBER, UserContext::new("member".to_string()))
            .with_user(OUTSIDER, UserContext::new("outsider".to_string()))
            .with_membership("admin", "model-validation")
            .with_membership("member", "collab-a");

        let state = AppState::new(Arc::new(store), Arc::new(identity), "model-validation");
        Self {
            app: create_router().with_state(state),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, path, Some(token), None).await
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, path, Some(token), Some(body)).await
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, path, Some(token), Some(body)).await
    }

    async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, path, Some(token), None).await
    }
}

fn basket_cell_model() -> Value {
    json!({
        "name": "CA1 basket cell",
        "alias": "ca1_basket",
        "app_id": "collab-a",
        "species": "Mouse (Mus musculus)",
        "brain_region": "hippocampus",
        "cell_type": "Interneuron",
        "author": [{"given_name": "Rosanna", "family_name": "Migliore"}],
        "description": "Multi-compartment model",
        "instances": [
            {"version": "1.0", "source": "https://example.org/v1.zip"},
            {"version": "1.1", "source": "https://example.org/v1_1.zip"}
        ]
    })
}

fn spikes_test() -> Value {
    json!({
        "name": "Somatic spikes",
        "alias": "somatic_spikes",
        "species": "mouse",
        "brain_region": "Hippocampus",
        "cell_type": "Interneuron",
        "score_type": "ZScore",
        "instances": [
            {"repository": "https://github.com/KaliLab/hippounit", "version": "1.0"}
        ]
    })
}

#[tokio::test]
async fn test_health_and_vocabularies_are_public() {
    let client = TestClient::new().await;

    let (status, body) = client.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = client.send(Method::GET, "/vocab/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["species"]
        .as_array()
        .unwrap()
        .contains(&json!("Mus musculus")));

    let (status, _) = client.send(Method::GET, "/vocab/colour", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_or_unknown_token_is_unauthorized() {
    let client = TestClient::new().await;

    let (status, body) = client.send(Method::GET, "/models/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = client.get("/tests/", "forged-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_test_filters_accept_synonyms_and_reject_unknown_terms() {
    let client = TestClient::new().await;

    let (status, created) = client.post("/tests/", OUTSIDER, spikes_test()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["species"], "Mus musculus");

    let (status, _) = client
        .post(
            "/tests/",
            OUTSIDER,
            json!({"name": "Purkinje input resistance", "species": "Rattus norvegicus"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = client
        .get("/tests/?species=Mouse%20(Mus%20musculus)", OUTSIDER)
        .await;
    assert_eq!(status, StatusCode::OK);
    let tests = body.as_array().unwrap();
    assert_eq!(tests.len(), 1);
    assert_eq!(tests[0]["alias"], "somatic_spikes");

    let (status, body) = client.get("/tests/?brain_region=Atlantis", OUTSIDER).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Atlantis"));

    let (status, _) = client.post("/tests/", OUTSIDER, spikes_test()).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_model_detail_levels_and_alias_lookup() {
    let client = TestClient::new().await;

    let (status, created) = client.post("/models/", MEMBER, basket_cell_model()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["species"], "Mus musculus");
    assert_eq!(created["instances"].as_array().unwrap().len(), 2);

    let (status, body) = client.get("/models/", OUTSIDER).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert!(body[0].get("instances").is_none());

    let (_, body) = client.get("/models/?detail=full", OUTSIDER).await;
    assert_eq!(body[0]["instances"].as_array().unwrap().len(), 2);

    let (status, body) = client.get("/models/ca1_basket", OUTSIDER).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], created["id"]);

    let (status, _) = client
        .post(
            "/models/ca1_basket/instances/",
            MEMBER,
            json!({"version": "2.0", "source": "https://example.org/v2.zip"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, latest) = client.get("/models/ca1_basket/instances/latest", OUTSIDER).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["version"], "2.0");

    let (status, _) = client
        .post(
            "/models/ca1_basket/instances/",
            MEMBER,
            json!({"version": "1.0"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = client.post("/models/", MEMBER, basket_cell_model()).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = client.get("/models/no_such_model", OUTSIDER).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_model_update_only_touches_supplied_fields() {
    let client = TestClient::new().await;
    let (_, created) = client.post("/models/", MEMBER, basket_cell_model()).await;
    let id = created["id"].as_str().unwrap();

    let (status, updated) = client
        .put(
            &format!("/models/{}", id),
            MEMBER,
            json!({"description": "Updated description"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Updated description");
    assert_eq!(updated["name"], "CA1 basket cell");
    assert_eq!(updated["species"], "Mus musculus");
    assert_eq!(updated["alias"], "ca1_basket");

    let (status, _) = client
        .put(
            &format!("/models/{}", id),
            OUTSIDER,
            json!({"description": "Not mine"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = client
        .put(
            &format!("/models/{}", id),
            MEMBER,
            json!({"id": "00000000-0000-0000-0000-000000000000", "name": "Other"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_results_and_cascading_model_delete() {
    let client = TestClient::new().await;
    let (_, model) = client.post("/models/", MEMBER, basket_cell_model()).await;
    let (_, test) = client.post("/tests/", OUTSIDER, spikes_test()).await;
    let model_instance_id = model["instances"][0]["id"].as_str().unwrap().to_string();
    let test_instance_id = test["instances"][0]["id"].as_str().unwrap().to_string();

    let result = json!({
        "model_instance_id": model_instance_id,
        "test_instance_id": test_instance_id,
        "score": 0.42,
        "timestamp": "2024-03-01T12:00:00Z"
    });
    let (status, created) = client.post("/results/", OUTSIDER, result.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["model_instance"]["version"], "1.0");

    let (status, _) = client.post("/results/", OUTSIDER, result).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = client
        .post(
            "/results/",
            OUTSIDER,
            json!({
                "model_instance_id": "00000000-0000-0000-0000-000000000000",
                "test_instance_id": test_instance_id,
                "score": 1.0
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = client.get("/results/?model_id=ca1_basket", OUTSIDER).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let model_path = format!("/models/{}", model["id"].as_str().unwrap());
    let (status, _) = client.delete(&model_path, OUTSIDER).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = client.delete(&model_path, ADMIN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_model_id"], model["id"]);

    let (status, _) = client
        .get(&format!("/models/query/instances/{}", model_instance_id), OUTSIDER)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = client.get("/results/", OUTSIDER).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_private_models_are_hidden_from_non_members() {
    let client = TestClient::new().await;

    let mut private_model = basket_cell_model();
    private_model["private"] = json!(true);

    let (status, _) = client.post("/models/", OUTSIDER, private_model.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = client.post("/models/", MEMBER, private_model).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = client.get("/models/", OUTSIDER).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = client.get("/models/ca1_basket", OUTSIDER).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = client.get("/models/?app_id=collab-a", MEMBER).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = client.get("/models/", ADMIN).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_comment_edits_are_limited_to_author() {
    let client = TestClient::new().await;
    let (_, test) = client.post("/tests/", OUTSIDER, spikes_test()).await;
    let comments_path = format!("/tests/{}/comments/", test["id"].as_str().unwrap());

    let (status, comment) = client
        .post(&comments_path, MEMBER, json!({"text": "Which dataset is this?"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_path = format!("/comments/{}", comment["id"].as_str().unwrap());

    let (status, _) = client
        .put(&comment_path, OUTSIDER, json!({"text": "hijacked"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = client
        .put(&comment_path, MEMBER, json!({"text": "Which dataset version is this?"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["text"], "Which dataset version is this?");

    let (_, body) = client.get(&comments_path, OUTSIDER).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_test_update_only_touches_supplied_fields() {
    let client = TestClient::new().await;
    let (_, created) = client.post("/tests/", OUTSIDER, spikes_test()).await;
    let (status, _) = client
        .post(
            "/tests/",
            OUTSIDER,
            json!({"name": "Depolarization block", "alias": "depol_block"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, updated) = client
        .put(
            "/tests/somatic_spikes",
            OUTSIDER,
            json!({"cell_type": null, "protocol": "Step current injections"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], created["id"]);
    assert!(updated["cell_type"].is_null());
    assert_eq!(updated["protocol"], "Step current injections");
    assert_eq!(updated["species"], "Mus musculus");
    assert_eq!(updated["brain_region"], "Hippocampus");
    assert_eq!(updated["score_type"], "ZScore");
    assert_eq!(updated["instances"].as_array().unwrap().len(), 1);

    let (status, _) = client
        .put("/tests/somatic_spikes", OUTSIDER, json!({"alias": "depol_block"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = client
        .put("/tests/somatic_spikes", OUTSIDER, json!({"alias": "query"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = client.get("/tests/somatic_spikes", OUTSIDER).await;
    assert_eq!(body["alias"], "somatic_spikes");
    assert!(body["cell_type"].is_null());
}

#[tokio::test]
async fn test_test_instance_routes() {
    let client = TestClient::new().await;
    let (_, spikes) = client.post("/tests/", OUTSIDER, spikes_test()).await;
    let (_, other) = client
        .post(
            "/tests/",
            OUTSIDER,
            json!({
                "name": "Depolarization block",
                "alias": "depol_block",
                "instances": [{"repository": "https://github.com/x/depol", "version": "1.0"}]
            }),
        )
        .await;
    let first_id = spikes["instances"][0]["id"].as_str().unwrap().to_string();
    let other_instance_id = other["instances"][0]["id"].as_str().unwrap().to_string();

    let (status, added) = client
        .post(
            "/tests/somatic_spikes/instances/",
            OUTSIDER,
            json!({"repository": "https://github.com/KaliLab/hippounit", "version": "2.0"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = client
        .post(
            "/tests/somatic_spikes/instances/",
            OUTSIDER,
            json!({"repository": "https://github.com/KaliLab/hippounit", "version": "1.0"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = client.get("/tests/somatic_spikes/instances/", OUTSIDER).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    let (_, body) = client
        .get("/tests/somatic_spikes/instances/?version=1.0", OUTSIDER)
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], first_id.as_str());

    let (status, latest) = client
        .get("/tests/somatic_spikes/instances/latest", OUTSIDER)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["id"], added["id"]);

    let (status, body) = client
        .get(
            &format!("/tests/somatic_spikes/instances/{}", first_id),
            OUTSIDER,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], "1.0");

    // An instance addressed through a test it does not belong to
    let (status, _) = client
        .get(
            &format!("/tests/somatic_spikes/instances/{}", other_instance_id),
            OUTSIDER,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = client
        .put(
            &format!("/tests/somatic_spikes/instances/{}", other_instance_id),
            OUTSIDER,
            json!({"description": "misplaced"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = client
        .put(
            &format!("/tests/query/instances/{}", first_id),
            OUTSIDER,
            json!({"description": "Somatic features, first release"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Somatic features, first release");
    assert_eq!(updated["version"], "1.0");
    assert_eq!(updated["repository"], "https://github.com/KaliLab/hippounit");

    let (status, body) = client
        .get(&format!("/tests/query/instances/{}", first_id), OUTSIDER)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Somatic features, first release");

    let (status, _) = client
        .put(
            &format!("/tests/query/instances/{}", first_id),
            OUTSIDER,
            json!({"version": "2.0"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_test_delete_is_admin_only_and_cascades() {
    let client = TestClient::new().await;
    let (_, test) = client.post("/tests/", OUTSIDER, spikes_test()).await;
    let test_path = format!("/tests/{}", test["id"].as_str().unwrap());
    let instance_id = test["instances"][0]["id"].as_str().unwrap().to_string();
    let (status, _) = client
        .post(
            &format!("{}/comments/", test_path),
            OUTSIDER,
            json!({"text": "Looks good"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = client.delete(&test_path, OUTSIDER).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = client.delete(&test_path, MEMBER).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = client.get(&test_path, OUTSIDER).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = client.delete(&test_path, ADMIN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_test_id"], test["id"]);

    let (status, _) = client.get(&test_path, OUTSIDER).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = client
        .get(&format!("/tests/query/instances/{}", instance_id), OUTSIDER)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = client.delete(&test_path, ADMIN).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_query_is_not_accepted_as_an_alias() {
    let client = TestClient::new().await;

    let mut model = basket_cell_model();
    model["alias"] = json!("query");
    let (status, _) = client.post("/models/", MEMBER, model).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut test = spikes_test();
    test["alias"] = json!("query");
    let (status, _) = client.post("/tests/", OUTSIDER, test).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_results_and_simulations_of_private_models_are_hidden() {
    let client = TestClient::new().await;

    let mut private_model = basket_cell_model();
    private_model["private"] = json!(true);
    let (_, model) = client.post("/models/", MEMBER, private_model).await;
    let (_, test) = client.post("/tests/", OUTSIDER, spikes_test()).await;
    let model_instance_id = model["instances"][0]["id"].as_str().unwrap().to_string();
    let test_instance_id = test["instances"][0]["id"].as_str().unwrap().to_string();

    let result = json!({
        "model_instance_id": model_instance_id,
        "test_instance_id": test_instance_id,
        "score": 0.7
    });
    let (status, _) = client.post("/results/", OUTSIDER, result.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, created) = client.post("/results/", MEMBER, result).await;
    assert_eq!(status, StatusCode::CREATED);
    let result_path = format!("/results/{}", created["id"].as_str().unwrap());

    let (status, _) = client.get("/results/?model_id=ca1_basket", OUTSIDER).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = client.get("/results/?detail=full", OUTSIDER).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
    let (status, body) = client.get(&result_path, OUTSIDER).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.get("model_instance").is_none());

    let (_, body) = client.get("/results/?model_id=ca1_basket", MEMBER).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    let (status, _) = client.get(&result_path, ADMIN).await;
    assert_eq!(status, StatusCode::OK);

    let simulation = json!({
        "model_instance_id": model_instance_id,
        "description": "Step current protocol"
    });
    let (status, _) = client
        .post("/simulations/", OUTSIDER, simulation.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, created) = client.post("/simulations/", MEMBER, simulation).await;
    assert_eq!(status, StatusCode::CREATED);
    let simulation_path = format!("/simulations/{}", created["id"].as_str().unwrap());

    let (_, body) = client.get("/simulations/", OUTSIDER).await;
    assert!(body.as_array().unwrap().is_empty());
    let (status, _) = client.get(&simulation_path, OUTSIDER).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = client.get("/simulations/", MEMBER).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    let (status, _) = client.get(&simulation_path, MEMBER).await;
    assert_eq!(status, StatusCode::OK);
}
