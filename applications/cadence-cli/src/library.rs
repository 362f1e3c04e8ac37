//! Static library of albums and podcasts
//!
//! The shell has no catalog service; collections are read from a TOML or
//! JSON file and turned into [`PlayContext`]s on demand.

use crate::error::{CliError, Result};
use cadence_playback::{CollectionRef, PlayContext, Playable};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Library {
    #[serde(default)]
    pub albums: Vec<AlbumEntry>,

    #[serde(default)]
    pub podcasts: Vec<PodcastEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<ItemEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PodcastEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub episodes: Vec<ItemEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemEntry {
    pub id: String,
    pub title: String,
    pub duration_secs: u64,
    #[serde(default)]
    pub cached: bool,
}

impl Library {
    /// Load a library file, picking the format from the extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let library: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| CliError::Library(e.to_string()))?
            }
            _ => toml::from_str(&content).map_err(|e| CliError::Library(e.to_string()))?,
        };
        library.validate()?;
        Ok(library)
    }

    /// Item ids must be unique across the whole library
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for item in self
            .albums
            .iter()
            .flat_map(|a| &a.tracks)
            .chain(self.podcasts.iter().flat_map(|p| &p.episodes))
        {
            if !seen.insert(item.id.as_str()) {
                return Err(CliError::Library(format!("duplicate item id: {}", item.id)));
            }
        }
        Ok(())
    }

    /// Build a play context for an album or podcast
    pub fn context(&self, collection_id: &str) -> Result<PlayContext> {
        if let Some(album) = self.albums.iter().find(|a| a.id == collection_id) {
            return Ok(PlayContext::new(&album.name, album.playables()));
        }
        if let Some(podcast) = self.podcasts.iter().find(|p| p.id == collection_id) {
            return Ok(PlayContext::new(&podcast.name, podcast.playables()));
        }
        Err(CliError::UnknownCollection(collection_id.to_string()))
    }

    /// Look up a single track or episode
    pub fn playable(&self, item_id: &str) -> Option<Playable> {
        self.albums
            .iter()
            .flat_map(AlbumEntry::playables)
            .chain(self.podcasts.iter().flat_map(PodcastEntry::playables))
            .find(|p| p.id == item_id)
    }

    /// `(id, name, item count)` of every collection
    pub fn collections(&self) -> Vec<(&str, &str, usize)> {
        self.albums
            .iter()
            .map(|a| (a.id.as_str(), a.name.as_str(), a.tracks.len()))
            .chain(
                self.podcasts
                    .iter()
                    .map(|p| (p.id.as_str(), p.name.as_str(), p.episodes.len())),
            )
            .collect()
    }
}

impl AlbumEntry {
    pub fn playables(&self) -> Vec<Playable> {
        let collection = CollectionRef::Album {
            id: self.id.clone(),
            name: self.name.clone(),
        };
        self.tracks
            .iter()
            .map(|t| {
                Playable::song(&t.id, &t.title, Duration::from_secs(t.duration_secs))
                    .cached(t.cached)
                    .in_collection(collection.clone())
            })
            .collect()
    }
}

impl PodcastEntry {
    pub fn playables(&self) -> Vec<Playable> {
        let collection = CollectionRef::Podcast {
            id: self.id.clone(),
            name: self.name.clone(),
        };
        self.episodes
            .iter()
            .map(|e| {
                Playable::episode(&e.id, &e.title, Duration::from_secs(e.duration_secs))
                    .cached(e.cached)
                    .in_collection(collection.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_playback::PlayableKind;
    use std::io::Write;

    const LIBRARY: &str = r#"
[[albums]]
id = "blue"
name = "Blue Album"

[[albums.tracks]]
id = "b1"
title = "Opening"
duration_secs = 180
cached = true

[[albums.tracks]]
id = "b2"
title = "Closing"
duration_secs = 240

[[podcasts]]
id = "talk"
name = "Weekly Talk"

[[podcasts.episodes]]
id = "e1"
title = "Pilot"
duration_secs = 1800
"#;

    fn write_library(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_toml_library() {
        let file = write_library(".toml", LIBRARY);
        let library = Library::load(file.path()).unwrap();

        assert_eq!(library.collections(), vec![("blue", "Blue Album", 2), ("talk", "Weekly Talk", 1)]);

        let context = library.context("blue").unwrap();
        assert_eq!(context.name(), "Blue Album");
        assert_eq!(context.items().len(), 2);
        assert!(context.items()[0].is_cached);
        assert!(!context.items()[1].is_cached);
    }

    #[test]
    fn loads_json_library() {
        let json = r#"{"podcasts":[{"id":"p","name":"Pod","episodes":[{"id":"e","title":"Ep","duration_secs":60}]}]}"#;
        let file = write_library(".json", json);
        let library = Library::load(file.path()).unwrap();

        let episode = library.playable("e").unwrap();
        assert_eq!(episode.kind, PlayableKind::Episode);
        assert_eq!(
            episode.collection,
            Some(CollectionRef::Podcast { id: "p".to_string(), name: "Pod".to_string() })
        );
    }

    #[test]
    fn unknown_collection() {
        let library = Library::default();
        assert!(matches!(library.context("nope"), Err(CliError::UnknownCollection(_))));
        assert!(library.playable("nope").is_none());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let content = LIBRARY.replace("id = \"e1\"", "id = \"b1\"");
        let file = write_library(".toml", &content);
        assert!(matches!(Library::load(file.path()), Err(CliError::Library(_))));
    }
}
