//! Local exchange used to exercise the evaluators without a chain
pub mod exchange;
pub mod token;

pub use exchange::{get_amount_out, SandboxExchange, MINIMUM_LIQUIDITY};
pub use token::{SandboxToken, TokenBehavior, TRANSFER_FROM_FAILED};
