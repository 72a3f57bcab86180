#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]

//! HTTP server for the Contact API: database bootstrap, middleware stack,
//! health probes, and OpenAPI documentation built on a validated
//! [`shared::config::Config`].

pub mod app_state;
pub mod commands;
pub mod db;
pub mod http;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod tracer;
