pub mod import_scheduler;
pub mod product_event_notifier;

pub use import_scheduler::ImportJobScheduler;
pub use product_event_notifier::{NoopProductEventNotifier, ProductEventNotifier};
