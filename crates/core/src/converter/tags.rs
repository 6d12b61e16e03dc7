//! Tag normalization.
//!
//! Probed tag names vary between containers and taggers (`TRACKNUMBER`,
//! `tracknumber`, `track`). They are mapped onto one set of output names and a
//! few values are reformatted before being written to the output file.

use super::types::{RawTags, TagSet};

/// Known source tag names (lowercase) and the output tag they map to.
const TAG_MAPPING: &[(&str, &str)] = &[
    ("title", "title"),
    ("artist", "artist"),
    ("album", "album"),
    ("albumartist", "albumartist"),
    ("date", "date"),
    ("year", "date"),
    ("genre", "genre"),
    ("track", "track"),
    ("tracknumber", "track"),
    ("tracktotal", "tracktotal"),
    ("disc", "disc"),
    ("discnumber", "disc"),
    ("disctotal", "disctotal"),
    ("composer", "composer"),
    ("performer", "performer"),
    ("comment", "comment"),
    ("lyrics", "lyrics"),
    ("copyright", "copyright"),
    ("encoder", "encoder"),
    ("encoded_by", "encoded_by"),
    ("organization", "organization"),
    ("albumart", "albumart"),
    ("picture", "albumart"),
];

fn mapped_key(key: &str) -> Option<&'static str> {
    TAG_MAPPING
        .iter()
        .find(|(source, _)| *source == key)
        .map(|(_, target)| *target)
}

/// Maps raw probe tags onto output tag names.
///
/// Keys are matched case-insensitively. Unknown keys pass through lowercased.
/// Values are trimmed and empty values dropped. Track and disc numbers and
/// dates are reformatted. When two source keys map to the same output key the
/// one that sorts last wins.
pub fn normalize_tags(raw: &RawTags) -> TagSet {
    let mut tags = TagSet::new();

    for (key, value) in raw {
        let key = key.to_lowercase();
        let value = value.trim();

        let (key, value) = match mapped_key(&key) {
            Some(target @ ("track" | "disc")) => (target.to_string(), format_track_number(value)),
            Some(target @ "date") => (target.to_string(), format_date(value)),
            Some(target) => (target.to_string(), value.to_string()),
            None => (key, value.to_string()),
        };

        if !value.is_empty() {
            tags.insert(key, value);
        }
    }

    tags
}

/// Formats a track or disc number.
///
/// `"N/Total"` forms pass through unchanged, bare integers are zero-padded to
/// two digits, anything else is returned as is.
pub fn format_track_number(value: &str) -> String {
    if value.contains('/') {
        return value.to_string();
    }
    match value.parse::<i64>() {
        Ok(number) => format!("{number:02}"),
        Err(_) => value.to_string(),
    }
}

/// Formats a date tag.
///
/// Four-digit years pass through; longer values are cut to their first four
/// characters; shorter values are returned as is.
pub fn format_date(value: &str) -> String {
    if value.chars().count() >= 4 {
        value.chars().take(4).collect()
    } else {
        value.to_string()
    }
}
