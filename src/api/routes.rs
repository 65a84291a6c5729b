use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::state::AppState;
use crate::api::{feedback_handlers, handlers, model_handlers, result_handlers, test_handlers};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Controlled vocabularies
        .route("/vocab/", get(handlers::list_vocabularies::<S>))
        .route("/vocab/:kind", get(handlers::get_vocabulary::<S>))
        .route(
            "/collabs/:app_id/parameters",
            get(handlers::get_collab_parameters::<S>).put(handlers::update_collab_parameters::<S>),
        )
        // Models
        .route(
            "/models/",
            get(model_handlers::list_models::<S>).post(model_handlers::create_model::<S>),
        )
        .route(
            "/models/:model_id",
            get(model_handlers::get_model::<S>)
                .put(model_handlers::update_model::<S>)
                .delete(model_handlers::delete_model::<S>),
        )
        .route(
            "/models/:model_id/instances/",
            get(model_handlers::list_model_instances::<S>)
                .post(model_handlers::create_model_instance::<S>),
        )
        .route(
            "/models/:model_id/instances/latest",
            get(model_handlers::get_latest_model_instance::<S>),
        )
        .route(
            "/models/:model_id/instances/:instance_id",
            get(model_handlers::get_model_instance::<S>)
                .put(model_handlers::update_model_instance::<S>),
        )
        .route(
            "/models/query/instances/:instance_id",
            get(model_handlers::get_model_instance_by_id::<S>)
                .put(model_handlers::update_model_instance_by_id::<S>),
        )
        .route(
            "/models/:model_id/images/",
            get(model_handlers::list_model_images::<S>)
                .post(model_handlers::create_model_image::<S>),
        )
        .route(
            "/models/:model_id/images/:image_id",
            delete(model_handlers::delete_model_image::<S>),
        )
        // Validation tests
        .route(
            "/tests/",
            get(test_handlers::list_tests::<S>).post(test_handlers::create_test::<S>),
        )
        .route(
            "/tests/:test_id",
            get(test_handlers::get_test::<S>)
                .put(test_handlers::update_test::<S>)
                .delete(test_handlers::delete_test::<S>),
        )
        .route(
            "/tests/:test_id/instances/",
            get(test_handlers::list_test_instances::<S>)
                .post(test_handlers::create_test_instance::<S>),
        )
        .route(
            "/tests/:test_id/instances/latest",
            get(test_handlers::get_latest_test_instance::<S>),
        )
        .route(
            "/tests/:test_id/instances/:instance_id",
            get(test_handlers::get_test_instance::<S>)
                .put(test_handlers::update_test_instance::<S>),
        )
        .route(
            "/tests/query/instances/:instance_id",
            get(test_handlers::get_test_instance_by_id::<S>)
                .put(test_handlers::update_test_instance_by_id::<S>),
        )
        // Feedback on tests
        .route(
            "/tests/:test_id/comments/",
            get(feedback_handlers::list_comments::<S>).post(feedback_handlers::create_comment::<S>),
        )
        .route("/comments/:comment_id", put(feedback_handlers::update_comment::<S>))
        .route(
            "/tests/:test_id/tickets/",
            get(feedback_handlers::list_tickets::<S>).post(feedback_handlers::create_ticket::<S>),
        )
        .route("/tickets/:ticket_id", put(feedback_handlers::update_ticket::<S>))
        // Results
        .route(
            "/results/",
            get(result_handlers::list_results::<S>).post(result_handlers::create_result::<S>),
        )
        .route(
            "/results/:result_id",
            get(result_handlers::get_result::<S>).delete(result_handlers::delete_result::<S>),
        )
        // Simulations
        .route(
            "/simulations/",
            get(result_handlers::list_simulations::<S>)
                .post(result_handlers::create_simulation::<S>),
        )
        .route(
            "/simulations/:simulation_id",
            get(result_handlers::get_simulation::<S>),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
