pub mod fetcher;
pub mod types;

pub use fetcher::*;
pub use types::*;
