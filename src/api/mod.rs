pub mod auth_extractor;
pub mod error;
pub mod feedback_handlers;
pub mod handlers;
pub mod model_handlers;
pub mod params;
pub mod result_handlers;
pub mod routes;
pub mod state;
pub mod test_handlers;

pub use auth_extractor::AuthenticatedUser;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::*;
pub use state::AppState;
