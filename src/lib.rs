pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod coordinator;
pub mod dashboard;
pub mod docs;
pub mod error;
pub mod export;
pub mod marking;
pub mod model;
pub mod models;
pub mod reports;
pub mod routes;
pub mod store;
