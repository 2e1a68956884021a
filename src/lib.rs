pub mod artifacts;
pub mod cache;
pub mod config;
pub mod download;
pub mod extract;
pub mod filter;
pub mod metrics;
pub mod pagination;
pub mod remote;
pub mod run;
pub mod shared;
