pub mod config;
pub mod daemon;
pub mod ipc;
pub mod probe;
pub mod sampler;
pub mod tracker;
pub mod writer;

pub use daemon::Daemon;
pub use sampler::{Sample, Sampler};
pub use tracker::Tracker;
pub use writer::{SessionSink, SessionWriter};
