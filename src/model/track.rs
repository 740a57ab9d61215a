use serde::{Deserialize, Serialize};

/// Reference to a catalog entity (artist, album, genre, product, season)
///
/// Albums and products carry a `title` on the wire, everything else a `name`;
/// both land in `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: i64,

    #[serde(alias = "title")]
    pub name: String,
}

impl EntityRef {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A single song as handed over by the catalog
///
/// The playlist core never looks inside a track beyond its id; the rest is
/// payload for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Catalog id of the song
    pub id: i64,

    /// Song title
    #[serde(default)]
    pub title: String,

    /// Alternative titles (romanizations, translations)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Release year (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artists: Vec<EntityRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<EntityRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<EntityRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<EntityRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seasons: Vec<EntityRef>,
}

impl Track {
    /// Create a track with only an id and a title
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            aliases: Vec::new(),
            year: None,
            artists: Vec::new(),
            album: None,
            genres: Vec::new(),
            products: Vec::new(),
            seasons: Vec::new(),
        }
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_artist(mut self, artist: EntityRef) -> Self {
        self.artists.push(artist);
        self
    }

    pub fn with_album(mut self, album: EntityRef) -> Self {
        self.album = Some(album);
        self
    }

    /// "Artist - Title" label, or just the title when no artist is known
    pub fn display_name(&self) -> String {
        match self.artists.first() {
            Some(artist) => format!("{} - {}", artist.name, self.title),
            None => self.title.clone(),
        }
    }
}
