//! A multi-tenant cosmological simulation service: each universe is an
//! isolated, deterministically-seeded simulation document, stepped
//! forward on demand by an HTTP-driven orchestrator.

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod kernel;
pub mod orchestrator;
pub mod predictor;
pub mod rng;
pub mod store;
