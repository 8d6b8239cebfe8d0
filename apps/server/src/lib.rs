pub mod config;
pub mod db;
pub mod docs;
pub mod errors;
pub mod models;
pub mod query;
pub mod services;
pub mod state;
pub mod store;
