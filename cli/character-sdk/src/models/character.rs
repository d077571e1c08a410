use std::num::NonZeroU32;

use character_api::types::{CharacterDto, CharacterResponseDto, InfoDto};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use url::Url;

/// A 1-based page index of the character listing.
pub type PageNumber = NonZeroU32;

/// The page every listing starts at.
pub const FIRST_PAGE: PageNumber = NonZeroU32::MIN;

/// Life status of a character as reported by the catalog.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterStatus {
    Alive,
    Dead,
    Unknown,
}

impl CharacterStatus {
    /// Parse the catalog's status string.
    ///
    /// The catalog uses `Alive`, `Dead` and `unknown`;
    /// anything unrecognized is treated as [CharacterStatus::Unknown].
    pub fn from_api_value(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "alive" => CharacterStatus::Alive,
            "dead" => CharacterStatus::Dead,
            _ => CharacterStatus::Unknown,
        }
    }
}

/// A character of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: u32,
    pub name: String,
    pub status: CharacterStatus,
    pub species: String,
    pub gender: String,
    pub origin_name: String,
    pub location_name: String,
    pub image_url: Option<Url>,
    /// Episode URLs that could be parsed
    pub episode_urls: Vec<Url>,
    /// Number of episodes listed by the catalog,
    /// including entries whose URL could not be parsed
    pub episode_count: usize,
}

impl From<CharacterDto> for Character {
    fn from(dto: CharacterDto) -> Self {
        let episode_count = dto.episode.len();
        Character {
            id: dto.id,
            name: dto.name,
            status: CharacterStatus::from_api_value(&dto.status),
            species: dto.species,
            gender: dto.gender,
            origin_name: dto.origin.name,
            location_name: dto.location.name,
            image_url: Url::parse(&dto.image).ok(),
            episode_urls: dto
                .episode
                .iter()
                .filter_map(|episode| Url::parse(episode).ok())
                .collect(),
            episode_count,
        }
    }
}

/// Pagination info of a listing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub count: u32,
    pub pages: u32,
    pub next: Option<PageNumber>,
    pub prev: Option<PageNumber>,
}

impl PageInfo {
    pub fn has_next_page(&self) -> bool {
        self.next.is_some()
    }
}

impl From<InfoDto> for PageInfo {
    fn from(dto: InfoDto) -> Self {
        PageInfo {
            count: dto.count,
            pages: dto.pages,
            next: dto.next.as_deref().and_then(page_number_from_link),
            prev: dto.prev.as_deref().and_then(page_number_from_link),
        }
    }
}

/// One page of the character listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterPage {
    pub info: PageInfo,
    pub characters: Vec<Character>,
}

impl CharacterPage {
    /// The cursor to continue the listing with, if any.
    pub fn next_cursor(&self) -> Option<PageNumber> {
        self.info.next
    }
}

impl From<CharacterResponseDto> for CharacterPage {
    fn from(dto: CharacterResponseDto) -> Self {
        CharacterPage {
            info: dto.info.into(),
            characters: dto.results.into_iter().map(Character::from).collect(),
        }
    }
}

/// Extract the `page` query parameter of a pagination link.
///
/// Returns [None] for links that cannot be parsed,
/// that lack a `page` parameter, or whose value is not a positive integer.
pub fn page_number_from_link(link: &str) -> Option<PageNumber> {
    let url = Url::parse(link)
        .or_else(|_| Url::parse("http://relative.invalid/")?.join(link))
        .ok()?;

    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse::<PageNumber>().ok())
}

#[cfg(any(test, feature = "tests"))]
pub mod test_helpers {
    use super::*;

    /// A character with plausible defaults for fields tests rarely care about
    pub fn character(id: u32, name: &str) -> Character {
        Character {
            id,
            name: name.to_string(),
            status: CharacterStatus::Alive,
            species: "Human".to_string(),
            gender: "Male".to_string(),
            origin_name: "Earth".to_string(),
            location_name: "Earth".to_string(),
            image_url: None,
            episode_urls: vec![],
            episode_count: 0,
        }
    }

    /// A page with the given characters and next cursor
    pub fn page(next: Option<u32>, characters: Vec<Character>) -> CharacterPage {
        CharacterPage {
            info: PageInfo {
                count: characters.len() as u32,
                pages: 1,
                next: next.and_then(PageNumber::new),
                prev: None,
            },
            characters,
        }
    }
}
