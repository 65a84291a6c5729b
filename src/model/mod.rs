pub mod collab;
pub mod common;
pub mod feedback;
pub mod result;
pub mod scientific_model;
pub mod simulation;
pub mod user_context;
pub mod validation_test;
pub mod vocabulary;

pub use collab::*;
pub use common::*;
pub use feedback::*;
pub use result::*;
pub use scientific_model::*;
pub use simulation::*;
pub use user_context::*;
pub use validation_test::*;
pub use vocabulary::*;
