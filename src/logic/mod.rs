pub mod filter;
pub mod vocabulary;

pub use filter::*;
pub use vocabulary::*;
