//! HTTP transport for the character catalog API.
//!
//! This crate provides:
//! - HTTP client construction with timeouts and extra headers
//! - A single JSON `GET` operation with a typed error taxonomy
//! - The wire types returned by the catalog endpoints
//!
//! ## Usage
//!
//! ```ignore
//! use character_api::{ApiClient, ApiClientConfig, types::CharacterResponseDto};
//!
//! let client = ApiClient::new(ApiClientConfig::default())?;
//! let page: CharacterResponseDto = client.get("character", &[("page", "1".into())]).await?;
//! ```

mod client;
mod config;
mod error;
pub mod types;

pub use client::ApiClient;
pub use config::{ApiClientConfig, DEFAULT_API_URL};
pub use error::ApiClientError;
