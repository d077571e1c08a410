//! Plain text presentation of characters.

use std::fmt::Write;

use character_sdk::models::Character;
use indoc::formatdoc;
use itertools::Itertools;

/// Episode URLs shown in a detail sheet before the rest is summarized
const EPISODE_PREVIEW: usize = 3;

pub const EMPTY_TITLE: &str = "No results";
pub const EMPTY_MESSAGE: &str = "Try changing the search or status filter.";

/// "1 episode", "N episodes"
pub fn episode_count(count: usize) -> String {
    let suffix = if count == 1 { "episode" } else { "episodes" };
    format!("{count} {suffix}")
}

/// A one line summary, used in selection lists
pub fn summary_line(character: &Character) -> String {
    format!(
        "{} ({}, {})",
        character.name, character.status, character.species
    )
}

/// Render characters as an aligned table with a header row.
pub fn character_table(characters: &[Character]) -> String {
    let headers = ["ID", "NAME", "STATUS", "SPECIES"];
    let rows = characters
        .iter()
        .map(|character| {
            [
                character.id.to_string(),
                character.name.clone(),
                character.status.to_string(),
                character.species.clone(),
            ]
        })
        .collect_vec();

    let widths: [usize; 4] = std::array::from_fn(|column| {
        rows.iter()
            .map(|row| row[column].chars().count())
            .chain([headers[column].len()])
            .max()
            .unwrap_or_default()
    });

    let format_row = |cells: [&str; 4]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .join("  ")
            .trim_end()
            .to_string()
    };

    std::iter::once(format_row(headers))
        .chain(rows.iter().map(|row| format_row(row.each_ref().map(String::as_str))))
        .join("\n")
}

/// Render the detail sheet of a character.
pub fn detail_sheet(character: &Character) -> String {
    let mut sheet = formatdoc! {"
        {name}

        Status:   {status}
        Species:  {species}
        Gender:   {gender}
        Origin:   {origin}
        Location: {location}

        Episodes: {episodes}
        ",
        name = character.name,
        status = character.status,
        species = character.species,
        gender = character.gender,
        origin = character.origin_name,
        location = character.location_name,
        episodes = episode_count(character.episode_count),
    };

    if character.episode_urls.is_empty() {
        sheet.push_str("  No URLs available.");
        return sheet;
    }

    let shown = character
        .episode_urls
        .iter()
        .take(EPISODE_PREVIEW)
        .map(|url| format!("  {url}"))
        .join("\n");
    sheet.push_str(&shown);

    let remaining = character.episode_urls.len().saturating_sub(EPISODE_PREVIEW);
    if remaining > 0 {
        let _ = write!(sheet, "\n  ... and {remaining} more");
    }

    sheet
}
