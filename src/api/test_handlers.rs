use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use chrono::Utc;

use crate::api::auth_extractor::AuthenticatedUser;
use crate::api::error::{ApiError, ApiResult};
use crate::api::handlers::{check_alias, check_payload_id, check_unique_versions, parse_id};
use crate::api::params::QueryParams;
use crate::api::state::AppState;
use crate::logic::{normalize_test, Field, Filter, FilterBuilder};
use crate::model::{
    DetailLevel, NewTestInstance, NewValidationTest, TestDetail, TestInstance, TestInstancePatch,
    TestResponse, TestSummary, ValidationTest, ValidationTestPatch, VocabularyKind,
};
use crate::store::traits::Store;

pub(crate) async fn find_test<S: Store>(
    state: &AppState<S>,
    key: &str,
) -> ApiResult<ValidationTest> {
    let found = match parse_id(key) {
        Some(id) => state.store.get_test(&id).await?,
        None => state.store.get_test_by_alias(key).await?,
    };
    found.ok_or_else(|| ApiError::not_found(format!("Validation test '{}' not found", key)))
}

async fn test_detail<S: Store>(state: &AppState<S>, test: ValidationTest) -> ApiResult<TestDetail> {
    let instances = state
        .store
        .list_test_instances(&test.id, &Filter::new())
        .await?;
    Ok(TestDetail { test, instances })
}

async fn ensure_alias_free<S: Store>(
    state: &AppState<S>,
    alias: &str,
    current: Option<&ValidationTest>,
) -> ApiResult<()> {
    check_alias(alias)?;
    if let Some(existing) = state.store.get_test_by_alias(alias).await? {
        if current.map_or(true, |test| test.id != existing.id) {
            return Err(ApiError::conflict(format!(
                "Another validation test with alias '{}' already exists",
                alias
            )));
        }
    }
    Ok(())
}

async fn ensure_version_free<S: Store>(
    state: &AppState<S>,
    test: &ValidationTest,
    version: &str,
    current: Option<&TestInstance>,
) -> ApiResult<()> {
    let clash = state
        .store
        .list_test_instances(&test.id, &Filter::new())
        .await?
        .into_iter()
        .any(|i| i.version == version && current.map_or(true, |c| c.id != i.id));
    if clash {
        return Err(ApiError::conflict(format!(
            "Validation test '{}' already has an instance with version '{}'",
            test.name, version
        )));
    }
    Ok(())
}

pub async fn list_tests<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    params: QueryParams,
) -> ApiResult<Json<Vec<TestResponse>>> {
    let vocabulary = state.vocabulary().await?;
    let (date_from, date_to) = params.date_range()?;
    let ids = params.all("id");

    let filter = FilterBuilder::new(&vocabulary)
        .ids(Field::Id, ids.clone())?
        .one_of(Field::Alias, params.all("alias"))
        .one_of(Field::Name, params.all("name"))
        .terms(
            Field::ImplementationStatus,
            VocabularyKind::ImplementationStatus,
            params.all("implementation_status"),
        )?
        .terms(Field::Species, VocabularyKind::Species, params.all("species"))?
        .terms(
            Field::BrainRegion,
            VocabularyKind::BrainRegion,
            params.all("brain_region"),
        )?
        .terms(Field::CellType, VocabularyKind::CellType, params.all("cell_type"))?
        .one_of(Field::DataType, params.all("data_type"))
        .terms(
            Field::DataModality,
            VocabularyKind::DataModality,
            params.all("data_modality"),
        )?
        .terms(Field::TestType, VocabularyKind::TestType, params.all("test_type"))?
        .terms(Field::ScoreType, VocabularyKind::ScoreType, params.all("score_type"))?
        .people(Field::Author, params.all("author"))
        .one_of(Field::AppId, params.all("app_id"))
        .created_within(date_from, date_to)?
        .build();

    let detail = if ids.len() == 1 {
        DetailLevel::Full
    } else {
        params.detail()?
    };
    let tests = state.store.list_tests(&filter, params.page()?).await?;
    log::info!("Listing {} tests for {}", tests.len(), user.user.user_id);

    let mut responses = Vec::with_capacity(tests.len());
    for test in tests {
        responses.push(match detail {
            DetailLevel::Standard => TestResponse::Standard(TestSummary::from(&test)),
            DetailLevel::Full => TestResponse::Full(test_detail(&state, test).await?),
        });
    }
    Ok(Json(responses))
}

pub async fn create_test<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    RequestJson(payload): RequestJson<NewValidationTest>,
) -> ApiResult<(StatusCode, Json<TestDetail>)> {
    let vocabulary = state.vocabulary().await?;
    check_unique_versions(payload.instances.iter().map(|i| i.version.as_str()))?;

    let (mut test, instances) = payload.into_records(Utc::now());
    normalize_test(&vocabulary, &mut test)?;
    if let Some(alias) = test.alias.as_deref() {
        ensure_alias_free(&state, alias, None).await?;
    }
    if state.store.test_exists(&test.name, test.date_created).await? {
        return Err(ApiError::conflict(
            "Another validation test with the same name and timestamp already exists",
        ));
    }

    state
        .store
        .insert_test(test.clone(), instances.clone())
        .await?;
    log::info!("Validation test {} created by {}", test.id, user.user.user_id);

    Ok((StatusCode::CREATED, Json(TestDetail { test, instances })))
}

pub async fn get_test<S: Store>(
    State(state): State<AppState<S>>,
    _user: AuthenticatedUser,
    Path(test_id): Path<String>,
) -> ApiResult<Json<TestDetail>> {
    let test = find_test(&state, &test_id).await?;
    Ok(Json(test_detail(&state, test).await?))
}

pub async fn update_test<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(test_id): Path<String>,
    RequestJson(patch): RequestJson<ValidationTestPatch>,
) -> ApiResult<Json<TestDetail>> {
    let mut test = find_test(&state, &test_id).await?;
    check_payload_id(patch.id, test.id)?;
    if let Some(Some(alias)) = &patch.alias {
        ensure_alias_free(&state, alias, Some(&test)).await?;
    }

    let vocabulary = state.vocabulary().await?;
    test.apply_patch(patch);
    normalize_test(&vocabulary, &mut test)?;
    state.store.update_test(test.clone()).await?;
    log::info!("Validation test {} updated by {}", test.id, user.user.user_id);

    Ok(Json(test_detail(&state, test).await?))
}

pub async fn delete_test<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(test_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.require_admin(&user).await?;
    let test = find_test(&state, &test_id).await?;

    if !state.store.delete_test(&test.id).await? {
        return Err(ApiError::not_found(format!(
            "Validation test '{}' not found",
            test_id
        )));
    }
    log::info!("Validation test {} deleted by {}", test.id, user.user.user_id);

    Ok(Json(serde_json::json!({
        "message": "Validation test deleted successfully",
        "deleted_test_id": test.id
    })))
}

pub async fn list_test_instances<S: Store>(
    State(state): State<AppState<S>>,
    _user: AuthenticatedUser,
    Path(test_id): Path<String>,
    params: QueryParams,
) -> ApiResult<Json<Vec<TestInstance>>> {
    let test = find_test(&state, &test_id).await?;
    let vocabulary = state.vocabulary().await?;
    let filter = FilterBuilder::new(&vocabulary)
        .one_of(Field::Version, params.all("version"))
        .build();

    Ok(Json(
        state.store.list_test_instances(&test.id, &filter).await?,
    ))
}

pub async fn create_test_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(test_id): Path<String>,
    RequestJson(payload): RequestJson<NewTestInstance>,
) -> ApiResult<(StatusCode, Json<TestInstance>)> {
    let test = find_test(&state, &test_id).await?;
    ensure_version_free(&state, &test, &payload.version, None).await?;

    let instance = payload.into_record(test.id, Utc::now());
    state.store.insert_test_instance(instance.clone()).await?;
    log::info!(
        "Instance {} ({}) added to validation test {} by {}",
        instance.id,
        instance.version,
        test.id,
        user.user.user_id
    );

    Ok((StatusCode::CREATED, Json(instance)))
}

pub async fn get_latest_test_instance<S: Store>(
    State(state): State<AppState<S>>,
    _user: AuthenticatedUser,
    Path(test_id): Path<String>,
) -> ApiResult<Json<TestInstance>> {
    let test = find_test(&state, &test_id).await?;
    state
        .store
        .list_test_instances(&test.id, &Filter::new())
        .await?
        .into_iter()
        .max_by_key(|i| (i.timestamp, i.id))
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found(format!("Validation test '{}' has no instances", test_id))
        })
}

async fn find_test_instance<S: Store>(
    state: &AppState<S>,
    test: &ValidationTest,
    instance_id: &str,
) -> ApiResult<TestInstance> {
    let not_found = || ApiError::not_found(format!("Test instance '{}' not found", instance_id));
    let id = parse_id(instance_id).ok_or_else(not_found)?;
    let instance = state
        .store
        .get_test_instance(&id)
        .await?
        .ok_or_else(not_found)?;
    if instance.test_definition_id != test.id {
        return Err(ApiError::validation(format!(
            "Test instance {} does not belong to validation test {}",
            instance.id, test.id
        )));
    }
    Ok(instance)
}

async fn find_test_instance_by_id<S: Store>(
    state: &AppState<S>,
    instance_id: &str,
) -> ApiResult<(ValidationTest, TestInstance)> {
    let not_found = || ApiError::not_found(format!("Test instance '{}' not found", instance_id));
    let id = parse_id(instance_id).ok_or_else(not_found)?;
    let instance = state
        .store
        .get_test_instance(&id)
        .await?
        .ok_or_else(not_found)?;
    let test = state
        .store
        .get_test(&instance.test_definition_id)
        .await?
        .ok_or_else(not_found)?;
    Ok((test, instance))
}

async fn apply_instance_patch<S: Store>(
    state: &AppState<S>,
    user: &AuthenticatedUser,
    test: &ValidationTest,
    mut instance: TestInstance,
    patch: TestInstancePatch,
) -> ApiResult<TestInstance> {
    check_payload_id(patch.id, instance.id)?;
    if let Some(version) = patch.version.as_deref() {
        ensure_version_free(state, test, version, Some(&instance)).await?;
    }

    instance.apply_patch(patch);
    state.store.update_test_instance(instance.clone()).await?;
    log::info!("Test instance {} updated by {}", instance.id, user.user.user_id);
    Ok(instance)
}

pub async fn get_test_instance<S: Store>(
    State(state): State<AppState<S>>,
    _user: AuthenticatedUser,
    Path((test_id, instance_id)): Path<(String, String)>,
) -> ApiResult<Json<TestInstance>> {
    let test = find_test(&state, &test_id).await?;
    Ok(Json(find_test_instance(&state, &test, &instance_id).await?))
}

pub async fn update_test_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path((test_id, instance_id)): Path<(String, String)>,
    RequestJson(patch): RequestJson<TestInstancePatch>,
) -> ApiResult<Json<TestInstance>> {
    let test = find_test(&state, &test_id).await?;
    let instance = find_test_instance(&state, &test, &instance_id).await?;
    Ok(Json(
        apply_instance_patch(&state, &user, &test, instance, patch).await?,
    ))
}

pub async fn get_test_instance_by_id<S: Store>(
    State(state): State<AppState<S>>,
    _user: AuthenticatedUser,
    Path(instance_id): Path<String>,
) -> ApiResult<Json<TestInstance>> {
    let (_, instance) = find_test_instance_by_id(&state, &instance_id).await?;
    Ok(Json(instance))
}

pub async fn update_test_instance_by_id<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(instance_id): Path<String>,
    RequestJson(patch): RequestJson<TestInstancePatch>,
) -> ApiResult<Json<TestInstance>> {
    let (test, instance) = find_test_instance_by_id(&state, &instance_id).await?;
    Ok(Json(
        apply_instance_patch(&state, &user, &test, instance, patch).await?,
    ))
}
