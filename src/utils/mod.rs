pub mod errors;

pub use errors::{RouterError, ScreenerError, Result};
