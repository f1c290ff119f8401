//! Artifact types and data structures.

use std::path::Path;

use serde::{Deserialize, Serialize};
use stowage_shared::types::ArtifactId;

use crate::storage::{ProviderOutcomes, UploadTarget};

/// Artifact classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Meeting audio/video recording.
    #[default]
    Recording,
    /// Screenshot captured while debugging a bot session.
    DebugScreenshot,
}

impl ArtifactKind {
    /// Convert to string value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recording => "recording",
            Self::DebugScreenshot => "debug_screenshot",
        }
    }

    /// Parse from string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recording" => Some(Self::Recording),
            "debug_screenshot" => Some(Self::DebugScreenshot),
            _ => None,
        }
    }

    /// Key prefix grouping artifacts of this kind.
    #[must_use]
    pub const fn key_prefix(&self) -> &'static str {
        match self {
            Self::Recording => "recordings",
            Self::DebugScreenshot => "debug-screenshots",
        }
    }

    /// Extension used when none is given.
    #[must_use]
    pub const fn default_extension(&self) -> &'static str {
        match self {
            Self::Recording => "mp4",
            Self::DebugScreenshot => "png",
        }
    }
}

/// Identity and format of one artifact; determines its object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// Artifact ID.
    pub id: ArtifactId,
    /// Artifact kind.
    pub kind: ArtifactKind,
    extension: String,
    content_type: String,
}

impl ArtifactDescriptor {
    /// Descriptor with the kind's default extension.
    #[must_use]
    pub fn new(id: ArtifactId, kind: ArtifactKind) -> Self {
        let extension = kind.default_extension().to_string();
        let content_type = content_type_for(&extension).to_string();
        Self {
            id,
            kind,
            extension,
            content_type,
        }
    }

    /// Descriptor whose extension is taken from a local file name.
    #[must_use]
    pub fn for_file(id: ArtifactId, kind: ArtifactKind, path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => Self::new(id, kind).with_extension(ext),
            None => Self::new(id, kind),
        }
    }

    /// Sets the extension. Anything outside `[A-Za-z0-9]` is dropped; an
    /// extension left empty falls back to the kind's default.
    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        let sanitized: String = extension
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        self.extension = if sanitized.is_empty() {
            self.kind.default_extension().to_string()
        } else {
            sanitized
        };
        self.content_type = content_type_for(&self.extension).to_string();
        self
    }

    /// File extension, without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Content type stored with the object.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Deterministic object key: `{kind-prefix}/{artifact_id}.{ext}`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}/{}.{}", self.kind.key_prefix(), self.id, self.extension)
    }

    /// Upload target for the adapters.
    #[must_use]
    pub fn upload_target(&self) -> UploadTarget {
        UploadTarget {
            key: self.storage_key(),
            content_type: self.content_type.clone(),
        }
    }
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// An artifact's stored per-provider outcomes, as loaded from persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievableArtifact {
    /// Artifact ID.
    pub id: ArtifactId,
    /// Outcome per provider; providers never attempted are absent.
    pub outcomes: ProviderOutcomes,
}

impl RetrievableArtifact {
    /// Artifact with no recorded outcome.
    #[must_use]
    pub fn empty(id: ArtifactId) -> Self {
        Self {
            id,
            outcomes: ProviderOutcomes::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn id() -> ArtifactId {
        ArtifactId::from_uuid(Uuid::nil())
    }

    #[test]
    fn test_default_keys() {
        assert_eq!(
            ArtifactDescriptor::new(id(), ArtifactKind::Recording).storage_key(),
            "recordings/00000000-0000-0000-0000-000000000000.mp4"
        );
        let screenshot = ArtifactDescriptor::new(id(), ArtifactKind::DebugScreenshot);
        assert_eq!(
            screenshot.storage_key(),
            "debug-screenshots/00000000-0000-0000-0000-000000000000.png"
        );
        assert_eq!(screenshot.content_type(), "image/png");
    }

    #[test]
    fn test_extension_from_file() {
        let descriptor = ArtifactDescriptor::for_file(
            id(),
            ArtifactKind::Recording,
            &PathBuf::from("/tmp/bot-17/recording.WEBM"),
        );
        assert_eq!(descriptor.extension(), "webm");
        assert_eq!(descriptor.content_type(), "video/webm");

        let no_ext = ArtifactDescriptor::for_file(
            id(),
            ArtifactKind::Recording,
            &PathBuf::from("/tmp/bot-17/recording"),
        );
        assert_eq!(no_ext.extension(), "mp4");
    }

    #[test]
    fn test_extension_sanitized() {
        let descriptor =
            ArtifactDescriptor::new(id(), ArtifactKind::Recording).with_extension("../m p3");
        assert_eq!(descriptor.extension(), "mp3");

        let empty = ArtifactDescriptor::new(id(), ArtifactKind::DebugScreenshot).with_extension("..");
        assert_eq!(empty.extension(), "png");
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [ArtifactKind::Recording, ArtifactKind::DebugScreenshot] {
            assert_eq!(ArtifactKind::parse(kind.as_str()), Some(kind));
        }
    }

    proptest! {
        #[test]
        fn prop_key_is_deterministic_and_safe(bytes in any::<[u8; 16]>(), ext in ".{0,12}") {
            let id = ArtifactId::from_uuid(Uuid::from_bytes(bytes));
            let a = ArtifactDescriptor::new(id, ArtifactKind::Recording).with_extension(&ext);
            let b = ArtifactDescriptor::new(id, ArtifactKind::Recording).with_extension(&ext);
            let key = a.storage_key();

            prop_assert_eq!(&key, &b.storage_key());
            prop_assert!(key.starts_with("recordings/"));
            prop_assert_eq!(key.matches('/').count(), 1);
            prop_assert!(!a.extension().is_empty());
            prop_assert!(a.extension().chars().all(|c| c.is_ascii_alphanumeric()));
        }

        #[test]
        fn prop_distinct_ids_give_distinct_keys(a in any::<[u8; 16]>(), b in any::<[u8; 16]>()) {
            prop_assume!(a != b);
            let ka = ArtifactDescriptor::new(ArtifactId::from_uuid(Uuid::from_bytes(a)), ArtifactKind::Recording).storage_key();
            let kb = ArtifactDescriptor::new(ArtifactId::from_uuid(Uuid::from_bytes(b)), ArtifactKind::Recording).storage_key();
            prop_assert_ne!(ka, kb);
        }
    }
}
