pub mod mock;
pub mod repository;
