//! Texture channels carried by exported materials.

use serde::{Deserialize, Serialize};

/// The named texture slots a material may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureChannel {
    Diffuse,
    Bump,
    Metallic,
    Height,
}

impl TextureChannel {
    /// All channels in the order they are written.
    pub const ALL: [TextureChannel; 4] = [
        TextureChannel::Diffuse,
        TextureChannel::Bump,
        TextureChannel::Metallic,
        TextureChannel::Height,
    ];

    /// Label used in the material artifact (`Label:path`).
    pub fn label(&self) -> &'static str {
        match self {
            TextureChannel::Diffuse => "Diffuse",
            TextureChannel::Bump => "Bump",
            TextureChannel::Metallic => "Metallic",
            TextureChannel::Height => "Height",
        }
    }

    /// Parse from a label (case-insensitive).
    pub fn from_label(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "diffuse" => Some(TextureChannel::Diffuse),
            "bump" | "normal" => Some(TextureChannel::Bump),
            "metallic" => Some(TextureChannel::Metallic),
            "height" => Some(TextureChannel::Height),
            _ => None,
        }
    }
}

impl std::fmt::Display for TextureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        for channel in TextureChannel::ALL {
            assert_eq!(TextureChannel::from_label(channel.label()), Some(channel));
        }
        assert_eq!(TextureChannel::from_label("NORMAL"), Some(TextureChannel::Bump));
        assert_eq!(TextureChannel::from_label("emission"), None);
    }
}
