//! obras_hub: construction portfolio back end
//!
//! Session authority (bcrypt credentials, HS256 session tokens) and tenant-scoped
//! project/work collections with search, validated create and display bands.
//! Sled persists identities and entities; Axum exposes them over REST.

pub mod auth;
pub mod collection;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod portfolio;
// REST API module: Axum HTTP handlers (port 11111 by default)
pub mod rest;
pub mod seed;
pub mod storage;
pub mod telemetry;
