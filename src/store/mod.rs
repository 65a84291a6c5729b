pub mod memory;
pub mod postgres;
pub mod sql_filter;
pub mod traits;

pub use memory::*;
pub use postgres::*;
pub use traits::*;
