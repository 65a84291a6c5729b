use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use chrono::Utc;

use crate::api::auth_extractor::AuthenticatedUser;
use crate::api::error::{ApiError, ApiResult};
use crate::api::handlers::parse_id;
use crate::api::state::AppState;
use crate::api::test_handlers::find_test;
use crate::model::{Comment, CommentPatch, NewComment, NewTicket, Ticket, TicketPatch};
use crate::store::traits::Store;

/// Only the author of a comment or ticket, or an administrator, may edit it.
async fn require_author_or_admin<S: Store>(
    state: &AppState<S>,
    user: &AuthenticatedUser,
    author: &str,
) -> ApiResult<()> {
    if author == user.user.user_id || state.is_admin(user).await? {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only the author or an administrator may edit this"))
    }
}

pub async fn list_comments<S: Store>(
    State(state): State<AppState<S>>,
    _user: AuthenticatedUser,
    Path(test_id): Path<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    let test = find_test(&state, &test_id).await?;
    Ok(Json(state.store.list_comments(&test.id).await?))
}

pub async fn create_comment<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(test_id): Path<String>,
    RequestJson(payload): RequestJson<NewComment>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    if payload.text.trim().is_empty() {
        return Err(ApiError::validation("Comment text must not be empty"));
    }
    let test = find_test(&state, &test_id).await?;

    let comment = payload.into_record(test.id, user.user.user_id.clone(), Utc::now());
    state.store.insert_comment(comment.clone()).await?;
    log::info!(
        "Comment {} on validation test {} by {}",
        comment.id,
        test.id,
        user.user.display_name()
    );

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(comment_id): Path<String>,
    RequestJson(patch): RequestJson<CommentPatch>,
) -> ApiResult<Json<Comment>> {
    let not_found = || ApiError::not_found(format!("Comment '{}' not found", comment_id));
    let id = parse_id(&comment_id).ok_or_else(not_found)?;
    let mut comment = state.store.get_comment(&id).await?.ok_or_else(not_found)?;

    require_author_or_admin(&state, &user, &comment.author).await?;
    if patch.approved.is_some() && !state.is_admin(&user).await? {
        return Err(ApiError::forbidden(
            "Only administrators may approve comments",
        ));
    }

    comment.apply_patch(patch);
    state.store.update_comment(comment.clone()).await?;
    Ok(Json(comment))
}

pub async fn list_tickets<S: Store>(
    State(state): State<AppState<S>>,
    _user: AuthenticatedUser,
    Path(test_id): Path<String>,
) -> ApiResult<Json<Vec<Ticket>>> {
    let test = find_test(&state, &test_id).await?;
    Ok(Json(state.store.list_tickets(&test.id).await?))
}

pub async fn create_ticket<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(test_id): Path<String>,
    RequestJson(payload): RequestJson<NewTicket>,
) -> ApiResult<(StatusCode, Json<Ticket>)> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::validation("Ticket title must not be empty"));
    }
    let test = find_test(&state, &test_id).await?;

    let ticket = payload.into_record(test.id, user.user.user_id.clone(), Utc::now());
    state.store.insert_ticket(ticket.clone()).await?;
    log::info!(
        "Ticket {} on validation test {} by {}",
        ticket.id,
        test.id,
        user.user.display_name()
    );

    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn update_ticket<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthenticatedUser,
    Path(ticket_id): Path<String>,
    RequestJson(patch): RequestJson<TicketPatch>,
) -> ApiResult<Json<Ticket>> {
    let not_found = || ApiError::not_found(format!("Ticket '{}' not found", ticket_id));
    let id = parse_id(&ticket_id).ok_or_else(not_found)?;
    let mut ticket = state.store.get_ticket(&id).await?.ok_or_else(not_found)?;

    require_author_or_admin(&state, &user, &ticket.author).await?;

    ticket.apply_patch(patch);
    state.store.update_ticket(ticket.clone()).await?;
    Ok(Json(ticket))
}
