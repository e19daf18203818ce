pub mod error;
pub mod operations;
pub mod revision;
pub mod rollout;
pub mod workloads;
