use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Platform, Rotation};

/// Seed list of tags per platform: subreddits, hashtags, and search terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagsFile {
    #[serde(default)]
    pub reddit: Vec<String>,
    #[serde(default)]
    pub mastodon: Vec<String>,
    #[serde(default)]
    pub bluesky: Vec<String>,
    /// Subreddits on the hot rotation, polled for their newest posts.
    #[serde(default)]
    pub reddit_hot: Vec<String>,
}

impl TagsFile {
    #[must_use]
    pub fn tags_for(&self, platform: Platform) -> &[String] {
        match platform {
            Platform::Reddit => &self.reddit,
            Platform::Mastodon => &self.mastodon,
            Platform::Bluesky => &self.bluesky,
        }
    }

    /// Entries for `rotation` on `platform`. Only Reddit has a hot rotation.
    #[must_use]
    pub fn rotation_for(&self, rotation: Rotation, platform: Platform) -> &[String] {
        match (rotation, platform) {
            (Rotation::History, platform) => self.tags_for(platform),
            (Rotation::Hot, Platform::Reddit) => &self.reddit_hot,
            (Rotation::Hot, _) => &[],
        }
    }
}

/// Load and validate the tag seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_tags(path: &Path) -> Result<TagsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TagsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_tags(&content)
}

/// Parse and validate tag seed YAML.
///
/// # Errors
///
/// Returns `ConfigError` on malformed YAML, blank tags, or duplicates within a platform.
pub fn parse_tags(content: &str) -> Result<TagsFile, ConfigError> {
    let file: TagsFile = serde_yaml::from_str(content)?;
    validate_tags(&file)?;
    Ok(file)
}

fn validate_tags(file: &TagsFile) -> Result<(), ConfigError> {
    for rotation in [Rotation::History, Rotation::Hot] {
        for platform in Platform::ALL {
            let mut seen = HashSet::new();
            for tag in file.rotation_for(rotation, platform) {
                if tag.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "{platform} {} tag must be non-empty",
                        rotation.slug()
                    )));
                }
                if !seen.insert(tag.trim().to_lowercase()) {
                    return Err(ConfigError::Validation(format!(
                        "duplicate {platform} {} tag: '{tag}'",
                        rotation.slug()
                    )));
                }
            }
        }
    }
    Ok(())
}
