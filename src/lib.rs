// Library exports for Commentary
// This allows integration tests and external code to use Commentary modules

pub mod auth;
pub mod comments;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
