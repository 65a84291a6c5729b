use std::sync::Arc;

use crate::api::auth_extractor::AuthenticatedUser;
use crate::api::error::{ApiError, ApiResult};
use crate::auth::IdentityProvider;
use crate::model::{Id, ScientificModel, Vocabulary};
use crate::store::traits::Store;

/// Shared state handed to every handler
pub struct AppState<S> {
    pub store: Arc<S>,
    pub identity: Arc<dyn IdentityProvider>,
    pub admin_collab_id: String,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            identity: Arc::clone(&self.identity),
            admin_collab_id: self.admin_collab_id.clone(),
        }
    }
}

impl<S: Store> AppState<S> {
    pub fn new(store: Arc<S>, identity: Arc<dyn IdentityProvider>, admin_collab_id: &str) -> Self {
        Self {
            store,
            identity,
            admin_collab_id: admin_collab_id.to_string(),
        }
    }

    pub async fn vocabulary(&self) -> ApiResult<Vocabulary> {
        Ok(self.store.load_vocabulary().await?)
    }

    pub async fn is_member(&self, user: &AuthenticatedUser, collab_id: &str) -> ApiResult<bool> {
        Ok(self.identity.is_collab_member(collab_id, &user.token).await?)
    }

    pub async fn is_admin(&self, user: &AuthenticatedUser) -> ApiResult<bool> {
        self.is_member(user, &self.admin_collab_id).await
    }

    pub async fn require_admin(&self, user: &AuthenticatedUser) -> ApiResult<()> {
        if self.is_admin(user).await? {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "This operation is restricted to administrators",
            ))
        }
    }

    /// Members of `collab_id` and administrators pass.
    pub async fn require_member_or_admin(
        &self,
        user: &AuthenticatedUser,
        collab_id: Option<&str>,
    ) -> ApiResult<()> {
        if let Some(collab_id) = collab_id {
            if self.is_member(user, collab_id).await? {
                return Ok(());
            }
        }
        if self.is_admin(user).await? {
            return Ok(());
        }
        Err(ApiError::forbidden(match collab_id {
            Some(collab_id) => format!("You are not a member of collab {}", collab_id),
            None => "This operation is restricted to administrators".to_string(),
        }))
    }

    /// Private models are only readable by members of their collab and administrators.
    pub async fn can_view_model(
        &self,
        user: &AuthenticatedUser,
        model: &ScientificModel,
    ) -> ApiResult<bool> {
        if !model.private {
            return Ok(true);
        }
        if let Some(app_id) = model.app_id.as_deref() {
            if self.is_member(user, app_id).await? {
                return Ok(true);
            }
        }
        self.is_admin(user).await
    }

    /// Visibility of the model owning a model instance. Dangling instances expose nothing.
    pub async fn can_view_model_instance(
        &self,
        user: &AuthenticatedUser,
        model_instance_id: &Id,
    ) -> ApiResult<bool> {
        let Some(instance) = self.store.get_model_instance(model_instance_id).await? else {
            return Ok(true);
        };
        match self.store.get_model(&instance.model_id).await? {
            Some(model) => self.can_view_model(user, &model).await,
            None => Ok(true),
        }
    }
}
