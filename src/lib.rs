pub mod config;
pub mod demo;
pub mod hosted;
pub mod humanize;
pub mod observability;
pub mod rendezvous;
pub mod worker;

pub use worker::{LifecycleError, TaskContext, WorkerHandle, WorkerOptions, WorkerState};
