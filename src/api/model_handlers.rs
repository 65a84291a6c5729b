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
use crate::logic::{normalize_model, Field, Filter, FilterBuilder};
use crate::model::{
    DetailLevel, ModelDetail, ModelImage, ModelInstance, ModelInstancePatch, ModelResponse,
    ModelSummary, NewModelImage, NewModelInstance, NewScientificModel, ScientificModel,
    ScientificModelPatch, VocabularyKind,
};
use crate::store::traits::Store;

async fn find_model<S: Store>(state: &AppState<S>, key: &str) -> ApiResult<ScientificModel> {
    let found = match parse_id(key) {
        Some(id) => state.store.get_model(&id).await?,
        None => state.store.get_model_by_alias(key).await?,
    };
    found.ok_or_else(|| ApiError::not_found(format!("Model '{}' not found", key)))
}

/// Look up a model the caller is allowed to see.
pub(crate) async fn find_visible_model<S: Store>(
    state: &AppState<S>,
    user: &AuthenticatedUser,
    key: &str,
) -> ApiResult<ScientificModel> {
    let model = find_model(state, key).await?;
    if !state.can_view_model(user, &model).await? {
        return Err(ApiError::forbidden(format!(
            "Model '{}' is private to collab {}",
            key,
            model.app_id.as_deref().unwrap_or("(none)")
        )));
    }
    Ok(model)
}

async fn model_detail<S: Store>(
    state: &AppState<S>,
    model: ScientificModel,
) -> ApiResult<ModelDetail> {
    let instances = state
        .store
        .list_model_instances(&model.id, &Filter::new())
        .await?;
    let images = state.store.list_model_images(&model.id).await?;
    Ok(ModelDetail {
        model,
        instances,
        images,
    })
}

async fn ensure_alias_free<S: Store>(
    state: &AppState<S>,
    alias: Option<&str>,
    current: Option<&ScientificModel>,
) -> ApiResult<()> {
    let Some(alias) = alias else {
        return Ok(());
    };
    check_alias(alias)?;
    if let Some(existing) = state.store.get_model_by_alias(alias).await? {
        if current.map_or(true, |model| model.id != existing.id) {
            return Err(ApiError::conflict(format!(
                "Another model with alias '{}' already exists",
                alias
            )));
        }
    }
    Ok(())
}

async fn ensure_version_free<S: Store>(
    state: &AppState<S>,
    model: &ScientificModel,
    version: &str,
    current: Option<&ModelInstance>,
) -> ApiResult<()> {
    let filter = Filter::new();
    let clash = state
        .store
        .list_model_instances(&model.id, &filter)
        .await?
        .into_iter()
        .any(|i| i.version == version && current.map_or(true, |c| c.id != i.id));
    if clash {
        return Err(ApiError::conflict(format!(
            "Model '{}' already has an instance with version '{}'",
            model.name, version
        )));
    }
    Ok(())
}

pub async fn list_models<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    params: QueryParams,
) -> ApiResult<Json<Vec<ModelResponse>>> {
    let vocabulary = state.vocabulary().await?;
    let (date_from, date_to) = params.date_range()?;
    let app_ids = params.all("app_id");
    let ids = params.all("id");

    let mut builder = FilterBuilder::new(&vocabulary)
        .ids(Field::Id, ids.clone())?
        .one_of(Field::Alias, params.all("alias"))
        .one_of(Field::Name, params.all("name"))
        .terms(Field::Species, VocabularyKind::Species, params.all("species"))?
        .terms(
            Field::BrainRegion,
            VocabularyKind::BrainRegion,
            params.all("brain_region"),
        )?
        .terms(Field::CellType, VocabularyKind::CellType, params.all("cell_type"))?
        .terms(
            Field::ModelScope,
            VocabularyKind::ModelScope,
            params.all("model_scope"),
        )?
        .terms(
            Field::AbstractionLevel,
            VocabularyKind::AbstractionLevel,
            params.all("abstraction_level"),
        )?
        .terms(
            Field::Organization,
            VocabularyKind::Organization,
            params.all("organization"),
        )?
        .people(Field::Author, params.all("author"))
        .people(Field::Owner, params.all("owner"))
        .one_of(Field::AppId, app_ids.clone())
        .created_within(date_from, date_to)?;

    if !state.is_admin(&user).await? {
        let mut collabs = Vec::new();
        for app_id in app_ids {
            if state.is_member(&user, &app_id).await? {
                collabs.push(app_id);
            }
        }
        builder = builder.visible_to(collabs);
    }
    let filter = builder.build();

    let detail = if ids.len() == 1 {
        DetailLevel::Full
    } else {
        params.detail()?
    };
    let models = state.store.list_models(&filter, params.page()?).await?;
    log::info!("Listing {} models for {}", models.len(), user.user.user_id);

    let mut responses = Vec::with_capacity(models.len());
    for model in models {
        responses.push(match detail {
            DetailLevel::Standard => ModelResponse::Standard(ModelSummary::from(&model)),
            DetailLevel::Full => ModelResponse::Full(model_detail(&state, model).await?),
        });
    }
    Ok(Json(responses))
}

pub async fn create_model<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    RequestJson(payload): RequestJson<NewScientificModel>,
) -> ApiResult<(StatusCode, Json<ModelDetail>)> {
    let vocabulary = state.vocabulary().await?;
    check_unique_versions(payload.instances.iter().map(|i| i.version.as_str()))?;

    let (mut model, instances, images) = payload.into_records(Utc::now());
    normalize_model(&vocabulary, &mut model)?;
    if let Some(app_id) = model.app_id.as_deref() {
        state.require_member_or_admin(&user, Some(app_id)).await?;
    }
    ensure_alias_free(&state, model.alias.as_deref(), None).await?;

    state
        .store
        .insert_model(model.clone(), instances.clone(), images.clone())
        .await?;
    log::info!("Model {} created by {}", model.id, user.user.user_id);

    Ok((
        StatusCode::CREATED,
        Json(ModelDetail {
            model,
            instances,
            images,
        }),
    ))
}

pub async fn get_model<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(model_id): Path<String>,
) -> ApiResult<Json<ModelDetail>> {
    let model = find_visible_model(&state, &user, &model_id).await?;
    Ok(Json(model_detail(&state, model).await?))
}

pub async fn update_model<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(model_id): Path<String>,
    RequestJson(patch): RequestJson<ScientificModelPatch>,
) -> ApiResult<Json<ModelDetail>> {
    let mut model = find_model(&state, &model_id).await?;
    check_payload_id(patch.id, model.id)?;
    state
        .require_member_or_admin(&user, model.app_id.as_deref())
        .await?;

    // Moving a model to another collab requires membership of both.
    if let Some(Some(new_app_id)) = &patch.app_id {
        if model.app_id.as_deref() != Some(new_app_id.as_str()) {
            state
                .require_member_or_admin(&user, Some(new_app_id.as_str()))
                .await?;
        }
    }
    if let Some(Some(alias)) = &patch.alias {
        ensure_alias_free(&state, Some(alias.as_str()), Some(&model)).await?;
    }

    let vocabulary = state.vocabulary().await?;
    model.apply_patch(patch);
    normalize_model(&vocabulary, &mut model)?;
    state.store.update_model(model.clone()).await?;
    log::info!("Model {} updated by {}", model.id, user.user.user_id);

    Ok(Json(model_detail(&state, model).await?))
}

pub async fn delete_model<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(model_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.require_admin(&user).await?;
    let model = find_model(&state, &model_id).await?;

    if !state.store.delete_model(&model.id).await? {
        return Err(ApiError::not_found(format!("Model '{}' not found", model_id)));
    }
    log::info!("Model {} deleted by {}", model.id, user.user.user_id);

    Ok(Json(serde_json::json!({
        "message": "Model deleted successfully",
        "deleted_model_id": model.id
    })))
}

pub async fn list_model_instances<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(model_id): Path<String>,
    params: QueryParams,
) -> ApiResult<Json<Vec<ModelInstance>>> {
    let model = find_visible_model(&state, &user, &model_id).await?;
    let vocabulary = state.vocabulary().await?;
    let filter = FilterBuilder::new(&vocabulary)
        .one_of(Field::Version, params.all("version"))
        .build();

    let instances = state
        .store
        .list_model_instances(&model.id, &filter)
        .await?;
    Ok(Json(instances))
}

pub async fn create_model_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(model_id): Path<String>,
    RequestJson(payload): RequestJson<NewModelInstance>,
) -> ApiResult<(StatusCode, Json<ModelInstance>)> {
    let model = find_model(&state, &model_id).await?;
    state
        .require_member_or_admin(&user, model.app_id.as_deref())
        .await?;
    ensure_version_free(&state, &model, &payload.version, None).await?;

    let instance = payload.into_record(model.id, Utc::now());
    state.store.insert_model_instance(instance.clone()).await?;
    log::info!(
        "Instance {} ({}) added to model {}",
        instance.id,
        instance.version,
        model.id
    );

    Ok((StatusCode::CREATED, Json(instance)))
}

pub async fn get_latest_model_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(model_id): Path<String>,
) -> ApiResult<Json<ModelInstance>> {
    let model = find_visible_model(&state, &user, &model_id).await?;
    state
        .store
        .list_model_instances(&model.id, &Filter::new())
        .await?
        .into_iter()
        .max_by_key(|i| (i.timestamp, i.id))
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Model '{}' has no instances", model_id)))
}

async fn find_model_instance<S: Store>(
    state: &AppState<S>,
    model: &ScientificModel,
    instance_id: &str,
) -> ApiResult<ModelInstance> {
    let not_found = || ApiError::not_found(format!("Model instance '{}' not found", instance_id));
    let id = parse_id(instance_id).ok_or_else(not_found)?;
    let instance = state
        .store
        .get_model_instance(&id)
        .await?
        .ok_or_else(not_found)?;
    if instance.model_id != model.id {
        return Err(ApiError::validation(format!(
            "Model instance {} does not belong to model {}",
            instance.id, model.id
        )));
    }
    Ok(instance)
}

/// Resolve an instance by its id alone, together with its parent model.
async fn find_model_instance_by_id<S: Store>(
    state: &AppState<S>,
    instance_id: &str,
) -> ApiResult<(ScientificModel, ModelInstance)> {
    let not_found = || ApiError::not_found(format!("Model instance '{}' not found", instance_id));
    let id = parse_id(instance_id).ok_or_else(not_found)?;
    let instance = state
        .store
        .get_model_instance(&id)
        .await?
        .ok_or_else(not_found)?;
    let model = state
        .store
        .get_model(&instance.model_id)
        .await?
        .ok_or_else(not_found)?;
    Ok((model, instance))
}

async fn apply_instance_patch<S: Store>(
    state: &AppState<S>,
    user: &AuthenticatedUser,
    model: &ScientificModel,
    mut instance: ModelInstance,
    patch: ModelInstancePatch,
) -> ApiResult<ModelInstance> {
    check_payload_id(patch.id, instance.id)?;
    state
        .require_member_or_admin(user, model.app_id.as_deref())
        .await?;
    if let Some(version) = patch.version.as_deref() {
        ensure_version_free(state, model, version, Some(&instance)).await?;
    }

    instance.apply_patch(patch);
    state.store.update_model_instance(instance.clone()).await?;
    log::info!("Model instance {} updated by {}", instance.id, user.user.user_id);
    Ok(instance)
}

pub async fn get_model_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path((model_id, instance_id)): Path<(String, String)>,
) -> ApiResult<Json<ModelInstance>> {
    let model = find_visible_model(&state, &user, &model_id).await?;
    Ok(Json(find_model_instance(&state, &model, &instance_id).await?))
}

pub async fn update_model_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path((model_id, instance_id)): Path<(String, String)>,
    RequestJson(patch): RequestJson<ModelInstancePatch>,
) -> ApiResult<Json<ModelInstance>> {
    let model = find_model(&state, &model_id).await?;
    let instance = find_model_instance(&state, &model, &instance_id).await?;
    Ok(Json(
        apply_instance_patch(&state, &user, &model, instance, patch).await?,
    ))
}

pub async fn get_model_instance_by_id<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(instance_id): Path<String>,
) -> ApiResult<Json<ModelInstance>> {
    let (model, instance) = find_model_instance_by_id(&state, &instance_id).await?;
    if !state.can_view_model(&user, &model).await? {
        return Err(ApiError::forbidden(format!(
            "Model instance '{}' belongs to a private model",
            instance_id
        )));
    }
    Ok(Json(instance))
}

pub async fn update_model_instance_by_id<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(instance_id): Path<String>,
    RequestJson(patch): RequestJson<ModelInstancePatch>,
) -> ApiResult<Json<ModelInstance>> {
    let (model, instance) = find_model_instance_by_id(&state, &instance_id).await?;
    Ok(Json(
        apply_instance_patch(&state, &user, &model, instance, patch).await?,
    ))
}

pub async fn list_model_images<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(model_id): Path<String>,
) -> ApiResult<Json<Vec<ModelImage>>> {
    let model = find_visible_model(&state, &user, &model_id).await?;
    Ok(Json(state.store.list_model_images(&model.id).await?))
}

pub async fn create_model_image<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(model_id): Path<String>,
    RequestJson(payload): RequestJson<NewModelImage>,
) -> ApiResult<(StatusCode, Json<ModelImage>)> {
    let model = find_model(&state, &model_id).await?;
    state
        .require_member_or_admin(&user, model.app_id.as_deref())
        .await?;

    let image = payload.into_record(model.id);
    state.store.insert_model_image(image.clone()).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn delete_model_image<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path((model_id, image_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let model = find_model(&state, &model_id).await?;
    state
        .require_member_or_admin(&user, model.app_id.as_deref())
        .await?;

    let not_found = || ApiError::not_found(format!("Image '{}' not found", image_id));
    let id = parse_id(&image_id).ok_or_else(not_found)?;
    let belongs = state
        .store
        .list_model_images(&model.id)
        .await?
        .iter()
        .any(|image| image.id == id);
    if !belongs || !state.store.delete_model_image(&id).await? {
        return Err(not_found());
    }

    Ok(Json(serde_json::json!({
        "message": "Image deleted successfully",
        "deleted_image_id": id
    })))
}
