//! Upload mode: which providers receive uploads and in which order they are
//! consulted for retrieval.

use serde::Serialize;

use super::error::ConfigurationError;
use super::reference::ProviderId;

/// Configured upload mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadMode {
    /// Upload to the primary provider only.
    #[default]
    PrimaryOnly,
    /// Upload to the secondary provider only.
    SecondaryOnly,
    /// Upload to every configured provider.
    Both,
}

impl UploadMode {
    /// Parses a mode value, accepting the provider-named aliases.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "s3" => Some(Self::PrimaryOnly),
            "secondary" | "azure" => Some(Self::SecondaryOnly),
            "both" | "all" => Some(Self::Both),
            _ => None,
        }
    }

    /// Canonical configuration value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryOnly => "primary",
            Self::SecondaryOnly => "secondary",
            Self::Both => "both",
        }
    }

    /// Providers receiving uploads.
    #[must_use]
    pub const fn upload_providers(&self) -> &'static [ProviderId] {
        match self {
            Self::PrimaryOnly => &[ProviderId::Primary],
            Self::SecondaryOnly => &[ProviderId::Secondary],
            Self::Both => &[ProviderId::Primary, ProviderId::Secondary],
        }
    }

    /// Retrieval priority. Every provider is listed so references written
    /// under an earlier mode stay reachable.
    #[must_use]
    pub const fn retrieval_order(&self) -> &'static [ProviderId] {
        match self {
            Self::PrimaryOnly | Self::Both => &[ProviderId::Primary, ProviderId::Secondary],
            Self::SecondaryOnly => &[ProviderId::Secondary, ProviderId::Primary],
        }
    }
}

/// Result of interpreting the configured mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModePlan {
    /// Effective mode.
    pub mode: UploadMode,
    /// Ordered providers for upload.
    pub upload: Vec<ProviderId>,
    /// Ordered providers for retrieval fallback.
    pub retrieval: Vec<ProviderId>,
    /// Set when the configured value was missing or unrecognized.
    pub diagnostic: Option<ConfigurationError>,
}

impl ModePlan {
    /// Interprets a raw mode value. Never fails: missing or unknown values
    /// fall back to [`UploadMode::PrimaryOnly`] with a diagnostic.
    #[must_use]
    pub fn from_setting(raw: Option<&str>) -> Self {
        let (mode, diagnostic) = match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => (UploadMode::default(), Some(ConfigurationError::MissingMode)),
            Some(value) => match UploadMode::parse(value) {
                Some(mode) => (mode, None),
                None => (
                    UploadMode::default(),
                    Some(ConfigurationError::UnknownMode(value.to_string())),
                ),
            },
        };

        Self::for_mode(mode).with_diagnostic(diagnostic)
    }

    /// Plan for an explicit mode.
    #[must_use]
    pub fn for_mode(mode: UploadMode) -> Self {
        Self {
            mode,
            upload: mode.upload_providers().to_vec(),
            retrieval: mode.retrieval_order().to_vec(),
            diagnostic: None,
        }
    }

    fn with_diagnostic(mut self, diagnostic: Option<ConfigurationError>) -> Self {
        self.diagnostic = diagnostic;
        self
    }
}
