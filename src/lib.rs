pub mod api;
pub mod auth;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

pub use api::routes;
pub use api::AppState;
pub use auth::{IdentityProvider, OidcIdentityProvider, StaticIdentityProvider};
pub use model::*;
pub use store::{MemoryStore, PostgresStore, Store};

use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, IdentityBackend, StoreBackend};

/// Build the identity provider selected by the configuration.
pub fn identity_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    match config.auth.provider {
        IdentityBackend::Oidc => Ok(Arc::new(OidcIdentityProvider::new(
            &config.auth.userinfo_url,
            &config.auth.collab_api_url,
            Duration::from_secs(config.auth.request_timeout_secs),
        )?)),
        IdentityBackend::Static => {
            let token = config.auth.dev_token.as_deref().ok_or_else(|| {
                anyhow::anyhow!("auth.dev_token must be set for the static identity provider")
            })?;
            let user = UserContext::default_user();
            let user_id = user.user_id.clone();
            log::warn!("Static identity provider in use; token grants administrator access");
            Ok(Arc::new(
                StaticIdentityProvider::new()
                    .with_user(token, user)
                    .with_membership(&user_id, &config.auth.admin_collab_id),
            ))
        }
    }
}

/// Serve the API over `store` until the listener fails.
pub async fn serve<S: Store + 'static>(store: Arc<S>, config: &AppConfig) -> anyhow::Result<()> {
    let identity = identity_provider(config)?;
    let state = AppState::new(store, identity, &config.auth.admin_collab_id);
    let app = api::routes::create_router().with_state(state);

    let bind_address = config.server_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    log::info!("Validation registry listening on http://{}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Load configuration, open the configured store and serve.
///
/// Sample records are loaded when `LOAD_SEED_DATA=true`. The in-memory store
/// always receives the reference vocabularies, since it starts empty.
pub async fn run_server() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let load_samples = std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true";

    match config.database.backend {
        StoreBackend::Postgres => {
            let database_url = config.database_url()?;
            let store = PostgresStore::with_max_connections(
                &database_url,
                config.database.max_connections.unwrap_or(20),
            )
            .await?;
            log::info!("Running database migrations...");
            store.migrate().await?;
            if load_samples {
                seed::load_seed_data(&store).await?;
            }
            serve(Arc::new(store), &config).await
        }
        StoreBackend::Memory => {
            log::warn!("Using the in-memory store; records are lost on shutdown");
            let store = MemoryStore::new();
            seed::load_vocabularies(&store).await?;
            if load_samples {
                seed::load_sample_data(&store).await?;
            }
            serve(Arc::new(store), &config).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider_requires_dev_token() {
        let mut config = AppConfig::default();
        config.auth.provider = IdentityBackend::Static;
        assert!(identity_provider(&config).is_err());

        config.auth.dev_token = Some("secret".to_string());
        assert!(identity_provider(&config).is_ok());
    }

    #[tokio::test]
    async fn test_static_dev_user_is_admin() {
        let mut config = AppConfig::default();
        config.auth.provider = IdentityBackend::Static;
        config.auth.dev_token = Some("secret".to_string());

        let identity = identity_provider(&config).unwrap();
        let user = identity.user_info("secret").await.unwrap().unwrap();
        assert_eq!(user.user_id, UserContext::default_user().user_id);
        assert!(identity
            .is_collab_member("model-validation", "secret")
            .await
            .unwrap());
    }
}
