//! Media browsing types.

use serde::{Deserialize, Serialize};

/// One node of a media player's browse tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowseMedia {
    /// Display title.
    pub title: String,
    /// Media class (`directory`, `music`, ...).
    #[serde(default)]
    pub media_class: String,
    /// Content id to pass back when browsing deeper or playing.
    #[serde(default)]
    pub media_content_id: String,
    /// Content type.
    #[serde(default)]
    pub media_content_type: String,
    /// Whether the node can be played.
    #[serde(default)]
    pub can_play: bool,
    /// Whether the node has children.
    #[serde(default)]
    pub can_expand: bool,
    /// Thumbnail URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Children (only populated for the browsed node).
    #[serde(default)]
    pub children: Vec<BrowseMedia>,
}

impl BrowseMedia {
    /// Returns children that can be expanded further.
    pub fn directories(&self) -> impl Iterator<Item = &BrowseMedia> {
        self.children.iter().filter(|c| c.can_expand)
    }
}
