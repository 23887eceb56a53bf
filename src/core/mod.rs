pub mod traits;
pub mod channel;
pub mod runner;

pub use traits::{Evaluator, LiquidityReceipt, RouterAdapter};
pub use channel::ResultChannel;
pub use runner::SimulationRunner;
