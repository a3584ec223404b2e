//! # Teamboard API Server Library
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration from the environment
//! - `error`: error type and the failure envelope
//! - `response`: the success envelope
//! - `extract`: request extractors that reject with the envelope
//! - `middleware`: authentication and security headers
//! - `routes`: route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
