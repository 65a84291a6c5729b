use axum::{
    extract::{Path, State},
    response::Json,
    Json as RequestJson,
};
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::api::auth_extractor::AuthenticatedUser;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::logic::normalize_collab_parameters;
use crate::model::{
    CollabParameters, CollabParametersUpdate, Id, VocabularyKind, VocabularyTerm,
};
use crate::store::traits::Store;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Labels of every vocabulary, keyed by vocabulary name
pub async fn list_vocabularies<S: Store>(
    State(state): State<AppState<S>>,
) -> ApiResult<Json<BTreeMap<String, Vec<String>>>> {
    let vocabulary = state.vocabulary().await?;
    let labels = vocabulary
        .to_label_map()
        .into_iter()
        .map(|(kind, labels)| {
            (
                kind.to_string(),
                labels.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();
    Ok(Json(labels))
}

/// Terms of one vocabulary, with their accepted synonyms
pub async fn get_vocabulary<S: Store>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
) -> ApiResult<Json<Vec<VocabularyTerm>>> {
    let kind = VocabularyKind::from_str(&kind).map_err(ApiError::not_found)?;
    let vocabulary = state.vocabulary().await?;
    Ok(Json(vocabulary.terms(kind).to_vec()))
}

pub async fn get_collab_parameters<S: Store>(
    State(state): State<AppState<S>>,
    _user: AuthenticatedUser,
    Path(app_id): Path<String>,
) -> ApiResult<Json<CollabParameters>> {
    state
        .store
        .get_collab_parameters(&app_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found(format!("No parameters configured for collab {}", app_id))
        })
}

pub async fn update_collab_parameters<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(app_id): Path<String>,
    RequestJson(update): RequestJson<CollabParametersUpdate>,
) -> ApiResult<Json<CollabParameters>> {
    if !state.is_member(&user, &app_id).await? {
        return Err(ApiError::forbidden(format!(
            "You are not a member of collab {}",
            app_id
        )));
    }

    let vocabulary = state.vocabulary().await?;
    let mut parameters = update.into_parameters(&app_id);
    normalize_collab_parameters(&vocabulary, &mut parameters)?;

    state
        .store
        .upsert_collab_parameters(parameters.clone())
        .await?;
    log::info!(
        "Collab parameters for {} updated by {}",
        app_id,
        user.user.user_id
    );
    Ok(Json(parameters))
}

/// Path segments that parse as UUIDs are ids, anything else is an alias.
pub(crate) fn parse_id(key: &str) -> Option<Id> {
    Uuid::parse_str(key).ok()
}

/// Path segment used by the `/models/query/...` and `/tests/query/...` routes.
const RESERVED_ALIAS: &str = "query";

/// Reject aliases that could not be told apart from a route segment or an id.
pub(crate) fn check_alias(alias: &str) -> ApiResult<()> {
    if alias.eq_ignore_ascii_case(RESERVED_ALIAS) {
        return Err(ApiError::validation(format!(
            "'{}' is reserved and cannot be used as an alias",
            alias
        )));
    }
    if parse_id(alias).is_some() {
        return Err(ApiError::validation(format!(
            "Alias '{}' must not be a UUID",
            alias
        )));
    }
    Ok(())
}

/// Reject a patch whose `id` disagrees with the record addressed by the path.
pub(crate) fn check_payload_id(payload_id: Option<Id>, path_id: Id) -> ApiResult<()> {
    match payload_id {
        Some(id) if id != path_id => Err(ApiError::validation(format!(
            "Payload id {} does not match {}",
            id, path_id
        ))),
        _ => Ok(()),
    }
}

/// Reject a create payload that lists the same version twice.
pub(crate) fn check_unique_versions<'a>(
    versions: impl IntoIterator<Item = &'a str>,
) -> ApiResult<()> {
    match versions.into_iter().duplicates().next() {
        Some(version) => Err(ApiError::conflict(format!(
            "Version '{}' is listed more than once",
            version
        ))),
        None => Ok(()),
    }
}
