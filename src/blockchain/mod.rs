pub mod client;
pub mod fork_db;
pub mod evm_router;

pub use client::{chain_name, BlockContext, BlockchainClient};
pub use fork_db::ForkDB;
pub use evm_router::EvmRouter;
