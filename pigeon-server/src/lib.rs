pub mod app;
pub mod config;
pub mod http;
pub mod routes;
pub mod state;
pub mod token;
