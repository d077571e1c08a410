pub mod controllers;
pub mod messages;
pub mod models;
pub mod providers;
