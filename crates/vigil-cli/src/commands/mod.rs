pub mod config;
pub mod daemon;
pub mod export;
pub mod helpers;
pub mod purge;
pub mod report;
