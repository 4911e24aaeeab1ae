pub mod app;
pub mod applications;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod skills;
pub mod state;
pub mod storage;
pub mod types;
pub mod users;
pub mod validation;
