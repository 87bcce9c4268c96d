#![allow(dead_code)]

use kalamar_core::{Item, Site};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// One access point per storage/codec combination, all with the music schema.
pub const ACCESS_POINTS: [&str; 4] = [
    "memory_plain",
    "memory_headers",
    "sqlite_plain",
    "sqlite_json",
];

pub const MUSIC_PROPERTIES: &str =
    r#"["genre", "artiste", "album", "titre", "piste:integer", "_content:content"]"#;

/// `(genre, artiste, album, [titres in track order])`.
pub const ALBUMS: [(&str, &str, &str, &[&str]); 4] = [
    (
        "jazz",
        "Birelli Lagrène",
        "manouche swing",
        &[
            "swing 42",
            "minor swing",
            "nuages",
            "douce ambiance",
            "daphne",
            "troublant bolero",
        ],
    ),
    (
        "rock",
        "Jesus'harlem",
        "alleluia",
        &["good evening", "fire", "cathedral", "hosanna"],
    ),
    (
        "rock",
        "Jesus'harlem",
        "amen",
        &["mechanical blues", "cross", "amen", "light", "dust"],
    ),
    (
        "rock",
        "Water please",
        "S.O.B",
        &["sob", "drown", "thirsty", "rain", "glass"],
    ),
];

pub const TRACK_COUNT: usize = 20;

pub struct Fixture {
    pub site: Site,
    pub dir: TempDir,
}

impl Fixture {
    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("site.toml")
    }
}

/// Site descriptor covering every backend kind; sqlite access points share
/// one database file next to the configuration.
pub fn site_config(corrupt_content: &str) -> String {
    format!(
        r#"
corrupt_content = "{corrupt_content}"

[[access_points]]
name = "memory_plain"
storage = "memory"
properties = {MUSIC_PROPERTIES}

[[access_points]]
name = "memory_headers"
storage = "memory"
parser = "headers"
properties = {MUSIC_PROPERTIES}

[[access_points]]
name = "sqlite_plain"
storage = "sqlite"
url = "music.sqlite3"
properties = {MUSIC_PROPERTIES}

[[access_points]]
name = "sqlite_json"
storage = "sqlite"
url = "music.sqlite3"
parser = "json"
properties = {MUSIC_PROPERTIES}
"#
    )
}

pub fn write_config(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("site.toml");
    std::fs::write(&path, text).unwrap();
    path
}

/// Fresh site with the 20-track library saved into every access point.
pub fn fixture() -> Fixture {
    fixture_with_policy("skip")
}

pub fn fixture_with_policy(corrupt_content: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), &site_config(corrupt_content));
    let site = Site::from_config_file(&path).unwrap();

    for access_point in ACCESS_POINTS {
        for mut item in library(&site, access_point) {
            site.save(&mut item).unwrap();
        }
    }
    Fixture { site, dir }
}

pub fn library(site: &Site, access_point: &str) -> Vec<Item> {
    let mut items = Vec::with_capacity(TRACK_COUNT);
    for (genre, artiste, album, titres) in ALBUMS {
        for (index, titre) in titres.iter().enumerate() {
            let piste = (index + 1).to_string();
            items.push(track(site, access_point, genre, artiste, album, titre, &piste));
        }
    }
    items
}

pub fn track(
    site: &Site,
    access_point: &str,
    genre: &str,
    artiste: &str,
    album: &str,
    titre: &str,
    piste: &str,
) -> Item {
    let content = format!("{titre} audio");
    Item::create_from_text(
        site.access_point(access_point).unwrap(),
        [
            ("genre", genre),
            ("artiste", artiste),
            ("album", album),
            ("titre", titre),
            ("piste", piste),
            ("_content", content.as_str()),
        ],
    )
    .unwrap()
}

/// Sorted textual values of `property` over a search.
pub fn values(site: &Site, access_point: &str, query: &str, property: &str) -> Vec<String> {
    let mut values: Vec<String> = site
        .search(access_point, query)
        .unwrap()
        .map(|item| item.unwrap().text(property).unwrap())
        .collect();
    values.sort();
    values
}

pub fn distinct(mut values: Vec<String>) -> Vec<String> {
    values.sort();
    values.dedup();
    values
}
