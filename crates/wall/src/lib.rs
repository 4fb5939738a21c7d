//! # wall
//!
//! The webhook server: configuration, the `/mail` endpoint and media serving.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod server;
pub mod verify;

pub use config::WallConfig;
pub use server::{AppState, router, serve};
pub use verify::{AcceptAll, WebhookVerifier};
