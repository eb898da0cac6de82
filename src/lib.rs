#[macro_use]
extern crate diesel;

pub mod actions;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod rules;
pub mod schema;
pub mod session;
pub mod store;
