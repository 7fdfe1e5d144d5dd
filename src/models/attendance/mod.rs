mod queries;
mod types;

pub mod filter;

pub use queries::*;
pub use types::*;
