pub mod handler;
pub mod presenter;
pub mod repository;
