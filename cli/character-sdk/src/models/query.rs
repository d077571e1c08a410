use std::str::FromStr;

use derive_more::Display;
use thiserror::Error;

/// Status filter applied to the character listing.
#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    #[default]
    All,
    Alive,
    Dead,
    Unknown,
}

impl StatusFilter {
    pub const ALL_FILTERS: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Alive,
        StatusFilter::Dead,
        StatusFilter::Unknown,
    ];

    /// Value of the `status` query parameter, [None] if the filter is omitted.
    pub fn api_value(&self) -> Option<&'static str> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Alive => Some("alive"),
            StatusFilter::Dead => Some("dead"),
            StatusFilter::Unknown => Some("unknown"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown status filter '{0}', expected one of: all, alive, dead, unknown")]
pub struct ParseStatusFilterError(String);

impl FromStr for StatusFilter {
    type Err = ParseStatusFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "alive" => Ok(StatusFilter::Alive),
            "dead" => Ok(StatusFilter::Dead),
            "unknown" => Ok(StatusFilter::Unknown),
            _ => Err(ParseStatusFilterError(s.to_string())),
        }
    }
}

/// Search parameters of the character listing.
///
/// The name is stored sanitized (trimmed, empty names dropped),
/// so two queries compare equal iff they request the same listing.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct CharacterQuery {
    name: Option<String>,
    status: StatusFilter,
}

impl CharacterQuery {
    pub fn new(name: Option<&str>, status: StatusFilter) -> Self {
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string);
        CharacterQuery { name, status }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn status(&self) -> StatusFilter {
        self.status
    }

    /// A copy of this query searching for `name` instead.
    pub fn with_name(&self, name: &str) -> Self {
        CharacterQuery::new(Some(name), self.status)
    }

    /// A copy of this query filtering by `status` instead.
    pub fn with_status(&self, status: StatusFilter) -> Self {
        CharacterQuery {
            name: self.name.clone(),
            status,
        }
    }
}
