//! Library crate for pollwave-back, exposing modules for binaries and integration tests.

mod config;
mod dto;
mod error;
pub mod routes;
pub mod services;
pub mod state;
