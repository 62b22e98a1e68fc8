pub mod admission;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod stats;
pub mod storage;
