pub mod config;
pub mod database;
pub mod import_scheduler;
pub mod in_memory;
pub mod progress_eviction;
pub mod webhook_dispatcher;
