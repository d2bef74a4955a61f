pub mod config;
pub mod logging;

pub mod cancel;
pub mod catalog;
pub mod jobs;
pub mod naming;
pub mod pool;
pub mod retry;
pub mod sink;
pub mod transfer;
pub mod transport;
