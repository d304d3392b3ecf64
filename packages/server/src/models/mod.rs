pub mod auth;
pub mod forms;
pub mod posts;
