use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use chrono::Utc;
use std::collections::HashMap;

use crate::api::auth_extractor::AuthenticatedUser;
use crate::api::error::{ApiError, ApiResult};
use crate::api::handlers::parse_id;
use crate::api::model_handlers::find_visible_model;
use crate::api::params::QueryParams;
use crate::api::state::AppState;
use crate::api::test_handlers::find_test;
use crate::logic::{Clause, Field, Filter, FilterBuilder};
use crate::model::{
    DetailLevel, Id, NewSimulation, NewValidationResult, ResultDetail, ResultResponse, Simulation,
    ValidationResult,
};
use crate::store::traits::Store;

async fn result_detail<S: Store>(
    state: &AppState<S>,
    result: ValidationResult,
) -> ApiResult<ResultDetail> {
    let model_instance = state
        .store
        .get_model_instance(&result.model_instance_id)
        .await?;
    let test_instance = state
        .store
        .get_test_instance(&result.test_instance_id)
        .await?;
    Ok(ResultDetail {
        result,
        model_instance,
        test_instance,
    })
}

/// Memo of which model instances the caller may see, so a listing asks the
/// identity provider once per instance.
struct InstanceVisibility<'a, S> {
    state: &'a AppState<S>,
    user: &'a AuthenticatedUser,
    known: HashMap<Id, bool>,
}

impl<'a, S: Store> InstanceVisibility<'a, S> {
    fn new(state: &'a AppState<S>, user: &'a AuthenticatedUser) -> Self {
        Self {
            state,
            user,
            known: HashMap::new(),
        }
    }

    async fn allows(&mut self, model_instance_id: &Id) -> ApiResult<bool> {
        if let Some(visible) = self.known.get(model_instance_id) {
            return Ok(*visible);
        }
        let visible = self
            .state
            .can_view_model_instance(self.user, model_instance_id)
            .await?;
        self.known.insert(*model_instance_id, visible);
        Ok(visible)
    }
}

async fn require_visible_instance<S: Store>(
    state: &AppState<S>,
    user: &AuthenticatedUser,
    model_instance_id: &Id,
) -> ApiResult<()> {
    if state.can_view_model_instance(user, model_instance_id).await? {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "Model instance {} belongs to a private model",
            model_instance_id
        )))
    }
}

/// Instance ids of every model (or test) named by the `model_id` (or `test_id`) parameter.
async fn instance_ids_of<S: Store>(
    state: &AppState<S>,
    user: &AuthenticatedUser,
    model_keys: &[String],
    test_keys: &[String],
) -> ApiResult<(Vec<String>, Vec<String>)> {
    let mut model_instance_ids = Vec::new();
    for key in model_keys {
        let model = find_visible_model(state, user, key).await?;
        let instances = state
            .store
            .list_model_instances(&model.id, &Filter::new())
            .await?;
        model_instance_ids.extend(instances.iter().map(|i| i.id.to_string()));
    }

    let mut test_instance_ids = Vec::new();
    for key in test_keys {
        let test = find_test(state, key).await?;
        let instances = state
            .store
            .list_test_instances(&test.id, &Filter::new())
            .await?;
        test_instance_ids.extend(instances.iter().map(|i| i.id.to_string()));
    }

    Ok((model_instance_ids, test_instance_ids))
}

pub async fn list_results<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    params: QueryParams,
) -> ApiResult<Json<Vec<ResultResponse>>> {
    let vocabulary = state.vocabulary().await?;
    let (date_from, date_to) = params.date_range()?;
    let ids = params.all("id");

    let mut filter = FilterBuilder::new(&vocabulary)
        .ids(Field::Id, ids.clone())?
        .ids(Field::ModelInstanceId, params.all("model_instance_id"))?
        .ids(Field::TestInstanceId, params.all("test_instance_id"))?
        .one_of(Field::AppId, params.all("app_id"))
        .created_within(date_from, date_to)?
        .build();

    // A model or test with no instances has no results, so these clauses are
    // kept even when empty.
    let model_keys = params.all("model_id");
    let test_keys = params.all("test_id");
    let (model_instance_ids, test_instance_ids) =
        instance_ids_of(&state, &user, &model_keys, &test_keys).await?;
    if !model_keys.is_empty() {
        filter.push(Clause::OneOf {
            field: Field::ModelInstanceId,
            values: model_instance_ids,
        });
    }
    if !test_keys.is_empty() {
        filter.push(Clause::OneOf {
            field: Field::TestInstanceId,
            values: test_instance_ids,
        });
    }

    let detail = if ids.len() == 1 {
        DetailLevel::Full
    } else {
        params.detail()?
    };
    let results = state.store.list_results(&filter, params.page()?).await?;
    log::info!("Listing {} results for {}", results.len(), user.user.user_id);

    let mut visibility = InstanceVisibility::new(&state, &user);
    let mut responses = Vec::with_capacity(results.len());
    for result in results {
        if !visibility.allows(&result.model_instance_id).await? {
            continue;
        }
        responses.push(match detail {
            DetailLevel::Standard => ResultResponse::Standard(result),
            DetailLevel::Full => ResultResponse::Full(result_detail(&state, result).await?),
        });
    }
    Ok(Json(responses))
}

pub async fn create_result<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    RequestJson(payload): RequestJson<NewValidationResult>,
) -> ApiResult<(StatusCode, Json<ResultDetail>)> {
    if !payload.score.is_finite() {
        return Err(ApiError::validation("Score must be a finite number"));
    }

    let result = payload.into_record(Utc::now());
    let model_instance = state
        .store
        .get_model_instance(&result.model_instance_id)
        .await?
        .ok_or_else(|| {
            ApiError::validation(format!(
                "Model instance {} does not exist",
                result.model_instance_id
            ))
        })?;
    require_visible_instance(&state, &user, &model_instance.id).await?;
    let test_instance = state
        .store
        .get_test_instance(&result.test_instance_id)
        .await?
        .ok_or_else(|| {
            ApiError::validation(format!(
                "Test instance {} does not exist",
                result.test_instance_id
            ))
        })?;

    if state
        .store
        .result_exists(
            &result.model_instance_id,
            &result.test_instance_id,
            result.timestamp,
        )
        .await?
    {
        return Err(ApiError::conflict(
            "A result for this model instance, test instance and timestamp already exists",
        ));
    }

    state.store.insert_result(result.clone()).await?;
    log::info!(
        "Result {} (score {}) recorded by {}",
        result.id,
        result.score,
        user.user.user_id
    );

    Ok((
        StatusCode::CREATED,
        Json(ResultDetail {
            result,
            model_instance: Some(model_instance),
            test_instance: Some(test_instance),
        }),
    ))
}

pub async fn get_result<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(result_id): Path<String>,
) -> ApiResult<Json<ResultDetail>> {
    let not_found = || ApiError::not_found(format!("Result '{}' not found", result_id));
    let id = parse_id(&result_id).ok_or_else(not_found)?;
    let result = state.store.get_result(&id).await?.ok_or_else(not_found)?;
    require_visible_instance(&state, &user, &result.model_instance_id).await?;
    Ok(Json(result_detail(&state, result).await?))
}

pub async fn delete_result<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(result_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.require_admin(&user).await?;
    let not_found = || ApiError::not_found(format!("Result '{}' not found", result_id));
    let id = parse_id(&result_id).ok_or_else(not_found)?;

    if !state.store.delete_result(&id).await? {
        return Err(not_found());
    }
    log::info!("Result {} deleted by {}", id, user.user.user_id);

    Ok(Json(serde_json::json!({
        "message": "Result deleted successfully",
        "deleted_result_id": id
    })))
}

pub async fn list_simulations<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    params: QueryParams,
) -> ApiResult<Json<Vec<Simulation>>> {
    let vocabulary = state.vocabulary().await?;
    let filter = FilterBuilder::new(&vocabulary)
        .ids(Field::ModelInstanceId, params.all("model_instance_id"))?
        .one_of(Field::AppId, params.all("app_id"))
        .build();

    let simulations = state
        .store
        .list_simulations(&filter, params.page()?)
        .await?;
    let mut visibility = InstanceVisibility::new(&state, &user);
    let mut visible = Vec::with_capacity(simulations.len());
    for simulation in simulations {
        if visibility.allows(&simulation.model_instance_id).await? {
            visible.push(simulation);
        }
    }
    Ok(Json(visible))
}

pub async fn create_simulation<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    RequestJson(payload): RequestJson<NewSimulation>,
) -> ApiResult<(StatusCode, Json<Simulation>)> {
    payload.validate().map_err(ApiError::validation)?;
    if state
        .store
        .get_model_instance(&payload.model_instance_id)
        .await?
        .is_none()
    {
        return Err(ApiError::validation(format!(
            "Model instance {} does not exist",
            payload.model_instance_id
        )));
    }
    require_visible_instance(&state, &user, &payload.model_instance_id).await?;

    let simulation = payload.into_record(Utc::now());
    state.store.insert_simulation(simulation.clone()).await?;
    log::info!(
        "Simulation {} of model instance {} recorded by {}",
        simulation.id,
        simulation.model_instance_id,
        user.user.user_id
    );

    Ok((StatusCode::CREATED, Json(simulation)))
}

pub async fn get_simulation<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(simulation_id): Path<String>,
) -> ApiResult<Json<Simulation>> {
    let not_found = || ApiError::not_found(format!("Simulation '{}' not found", simulation_id));
    let id = parse_id(&simulation_id).ok_or_else(not_found)?;
    let simulation = state.store.get_simulation(&id).await?.ok_or_else(not_found)?;
    require_visible_instance(&state, &user, &simulation.model_instance_id).await?;
    Ok(Json(simulation))
}
