//! Wire types of the catalog endpoints.
//!
//! These mirror the JSON documents served by the API one to one.
//! Mapping into domain types happens in the repository layer.

use serde::{Deserialize, Serialize};

/// Response of `GET /character`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterResponseDto {
    pub info: InfoDto,
    pub results: Vec<CharacterDto>,
}

/// Pagination block of a list response.
///
/// `next` and `prev` are absolute URLs of the neighbouring pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoDto {
    pub count: u32,
    pub pages: u32,
    pub next: Option<String>,
    pub prev: Option<String>,
}

/// A single character, as returned by `GET /character/{id}`
/// and as element of list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDto {
    pub id: u32,
    pub name: String,
    pub status: String,
    pub species: String,
    pub gender: String,
    pub origin: LocationDto,
    pub location: LocationDto,
    pub image: String,
    pub episode: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDto {
    pub name: String,
}
