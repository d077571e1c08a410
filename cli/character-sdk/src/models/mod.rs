pub mod character;
pub mod query;

pub use character::{Character, CharacterPage, CharacterStatus, PageInfo, PageNumber, FIRST_PAGE};
pub use query::{CharacterQuery, StatusFilter};
