use super::{EntityRef, Track};
use serde::{Deserialize, Serialize};

/// Name given to playlists that arrive without one
pub const UNNAMED_PLAYLIST: &str = "Unnamed Playlist";

fn unnamed() -> String {
    UNNAMED_PLAYLIST.to_string()
}

/// Playlist as exchanged with the persistence layer
///
/// `id <= 0` marks a playlist that has not been saved yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistTransfer {
    #[serde(default)]
    pub id: i64,

    #[serde(default = "unnamed")]
    pub name: String,

    #[serde(default)]
    pub list: Vec<TransferElement>,
}

/// Short listing entry for a stored playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub id: i64,
    pub name: String,
}

/// One entry of a transfer list: either a track record or a nested playlist
///
/// The wire format does not tag the two shapes. A nested playlist has a
/// `list`, a track has an `id` and no `list`. Anything else is malformed and
/// gets rejected when the tree is built.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<Vec<TransferElement>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

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

/// Borrowed view of what a transfer element holds
pub enum TransferKind<'a> {
    Track(Track),
    Playlist {
        id: i64,
        name: &'a str,
        list: &'a [TransferElement],
    },
}

impl TransferElement {
    /// Classify the element; `None` when it is neither a track nor a playlist
    pub fn kind(&self) -> Option<TransferKind<'_>> {
        if let Some(ref list) = self.list {
            return Some(TransferKind::Playlist {
                id: self.id.unwrap_or(0),
                name: self.name.as_deref().unwrap_or(UNNAMED_PLAYLIST),
                list,
            });
        }

        let id = self.id?;
        Some(TransferKind::Track(Track {
            id,
            title: self.title.clone().unwrap_or_default(),
            aliases: self.aliases.clone(),
            year: self.year,
            artists: self.artists.clone(),
            album: self.album.clone(),
            genres: self.genres.clone(),
            products: self.products.clone(),
            seasons: self.seasons.clone(),
        }))
    }

    pub fn is_playlist(&self) -> bool {
        self.list.is_some()
    }
}

impl From<&Track> for TransferElement {
    fn from(track: &Track) -> Self {
        Self {
            id: Some(track.id),
            title: Some(track.title.clone()),
            aliases: track.aliases.clone(),
            year: track.year,
            artists: track.artists.clone(),
            album: track.album.clone(),
            genres: track.genres.clone(),
            products: track.products.clone(),
            seasons: track.seasons.clone(),
            ..Self::default()
        }
    }
}

impl From<PlaylistTransfer> for TransferElement {
    fn from(playlist: PlaylistTransfer) -> Self {
        Self {
            // unsaved playlists carry no id on the wire
            id: (playlist.id > 0).then_some(playlist.id),
            name: Some(playlist.name),
            list: Some(playlist.list),
            ..Self::default()
        }
    }
}

impl PlaylistTransfer {
    /// Create an unsaved playlist
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            list: Vec::new(),
        }
    }

    /// Append a track record
    pub fn add_track(&mut self, track: &Track) {
        self.list.push(TransferElement::from(track));
    }

    /// Append a nested playlist
    pub fn add_playlist(&mut self, playlist: PlaylistTransfer) {
        self.list.push(TransferElement::from(playlist));
    }

    /// Track ids in playback order, nested playlists expanded
    pub fn track_ids(&self) -> Vec<i64> {
        fn walk(list: &[TransferElement], out: &mut Vec<i64>) {
            for element in list {
                match element.list {
                    Some(ref nested) => walk(nested, out),
                    None => out.extend(element.id),
                }
            }
        }

        let mut ids = Vec::new();
        walk(&self.list, &mut ids);
        ids
    }

    pub fn info(&self) -> PlaylistInfo {
        PlaylistInfo {
            id: self.id,
            name: self.name.clone(),
        }
    }

    /// Number of top-level entries
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_transfer() {
        let json = r#"{
            "id": 4,
            "name": "Evening",
            "list": [
                { "id": 1, "title": "Opening" },
                { "id": 9, "name": "Ballads", "list": [
                    { "id": 2, "title": "Slow One" },
                    { "id": 3, "title": "Slower One" }
                ]},
                { "id": 5, "title": "Closing" }
            ]
        }"#;

        let playlist: PlaylistTransfer = serde_json::from_str(json).unwrap();
        assert_eq!(playlist.len(), 3);
        assert!(playlist.list[1].is_playlist());
        assert_eq!(playlist.track_ids(), vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_kind_classification() {
        let track = TransferElement::from(&Track::new(7, "Seven"));
        assert!(matches!(track.kind(), Some(TransferKind::Track(t)) if t.id == 7));

        let nested = TransferElement::from(PlaylistTransfer::new("Inner"));
        assert!(matches!(
            nested.kind(),
            Some(TransferKind::Playlist { name: "Inner", .. })
        ));

        let broken = TransferElement {
            title: Some("no id".to_string()),
            ..TransferElement::default()
        };
        assert!(broken.kind().is_none());
    }

    #[test]
    fn test_unsaved_nested_playlist_has_no_id() {
        let nested = TransferElement::from(PlaylistTransfer::new("Inner"));
        assert_eq!(nested.id, None);

        let value = serde_json::to_value(&nested).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["name"], "Inner");
    }

    #[test]
    fn test_missing_name_defaults() {
        let playlist: PlaylistTransfer = serde_json::from_str(r#"{ "list": [] }"#).unwrap();
        assert_eq!(playlist.id, 0);
        assert_eq!(playlist.name, UNNAMED_PLAYLIST);
    }
}
