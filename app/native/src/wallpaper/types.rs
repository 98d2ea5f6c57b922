//! Value types shared by the wallpaper index, theme cache and analysis pipeline.
//!
//! The serialized forms of these types are what ends up in the settings store,
//! so renames here are persisted-format changes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Wallpaper entries
// ============================================================================

/// A wallpaper image discovered by a directory scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallpaperEntry {
    /// Stable identifier (the lossy string form of the path).
    pub id: String,
    /// File name shown to users and matched by search.
    pub display_name: String,
    /// Location of the image on disk, if it has one.
    pub path: Option<PathBuf>,
}

impl WallpaperEntry {
    /// Builds an entry from a file path.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = path
            .file_name()
            .map_or_else(|| "Unknown".to_string(), |name| name.to_string_lossy().into_owned());

        Self {
            id: path.to_string_lossy().into_owned(),
            display_name,
            path: Some(path),
        }
    }

    /// Returns the entry path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }
}

// ============================================================================
// Theme classification
// ============================================================================

/// Light or dark color mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    /// Tone derived from the mode.
    #[must_use]
    pub const fn tone(self) -> u8 {
        match self {
            Self::Light => 80,
            Self::Dark => 20,
        }
    }

    /// Name used on tool command lines and in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Material color scheme variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeScheme {
    #[serde(rename = "scheme-neutral")]
    Neutral,
    #[serde(rename = "scheme-tonal-spot")]
    TonalSpot,
    #[serde(rename = "scheme-expressive")]
    Expressive,
    #[serde(rename = "scheme-rainbow")]
    Rainbow,
    #[serde(rename = "scheme-content")]
    Content,
}

impl ThemeScheme {
    /// All schemes, in display order.
    pub const ALL: [Self; 5] = [
        Self::Neutral,
        Self::TonalSpot,
        Self::Expressive,
        Self::Rainbow,
        Self::Content,
    ];

    /// Chroma derived from the scheme.
    #[must_use]
    pub const fn chroma(self) -> u8 {
        match self {
            Self::Neutral => 10,
            _ => 40,
        }
    }

    /// Bare scheme name, as accepted by the theme tool's `--scheme` flag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::TonalSpot => "tonal-spot",
            Self::Expressive => "expressive",
            Self::Rainbow => "rainbow",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for ThemeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Derived visual classification of a wallpaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeAnalysis {
    /// Perceived lightness, 0-100.
    pub tone: u8,
    /// Colorfulness, 0-100.
    pub chroma: u8,
    pub mode: ThemeMode,
    pub scheme: ThemeScheme,
}

impl ThemeAnalysis {
    /// Builds an analysis whose tone and chroma are derived from the classification.
    #[must_use]
    pub const fn classified(mode: ThemeMode, scheme: ThemeScheme) -> Self {
        Self {
            tone: mode.tone(),
            chroma: scheme.chroma(),
            mode,
            scheme,
        }
    }
}

/// A cached analysis together with the time it was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedThemeEntry {
    #[serde(flatten)]
    pub analysis: ThemeAnalysis,
    /// Milliseconds since the Unix epoch; the sole eviction key.
    pub timestamp: u64,
}

// ============================================================================
// Overrides
// ============================================================================

/// User choice for the theme mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeOverride {
    #[default]
    Auto,
    Light,
    Dark,
}

impl ModeOverride {
    /// The forced mode, or `None` for `auto`.
    #[must_use]
    pub const fn manual(self) -> Option<ThemeMode> {
        match self {
            Self::Auto => None,
            Self::Light => Some(ThemeMode::Light),
            Self::Dark => Some(ThemeMode::Dark),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for ModeOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ModeOverride {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(format!("Invalid mode '{s}'. Expected 'auto', 'light' or 'dark'.")),
        }
    }
}

/// User choice for the color scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemeOverride {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "scheme-neutral")]
    Neutral,
    #[serde(rename = "scheme-tonal-spot")]
    TonalSpot,
    #[serde(rename = "scheme-expressive")]
    Expressive,
    #[serde(rename = "scheme-rainbow")]
    Rainbow,
    #[serde(rename = "scheme-content")]
    Content,
}

impl SchemeOverride {
    /// The forced scheme, or `None` for `auto`.
    #[must_use]
    pub const fn manual(self) -> Option<ThemeScheme> {
        match self {
            Self::Auto => None,
            Self::Neutral => Some(ThemeScheme::Neutral),
            Self::TonalSpot => Some(ThemeScheme::TonalSpot),
            Self::Expressive => Some(ThemeScheme::Expressive),
            Self::Rainbow => Some(ThemeScheme::Rainbow),
            Self::Content => Some(ThemeScheme::Content),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self.manual() {
            Some(scheme) => scheme.as_str(),
            None => "auto",
        }
    }
}

impl From<ThemeScheme> for SchemeOverride {
    fn from(scheme: ThemeScheme) -> Self {
        match scheme {
            ThemeScheme::Neutral => Self::Neutral,
            ThemeScheme::TonalSpot => Self::TonalSpot,
            ThemeScheme::Expressive => Self::Expressive,
            ThemeScheme::Rainbow => Self::Rainbow,
            ThemeScheme::Content => Self::Content,
        }
    }
}

impl fmt::Display for SchemeOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SchemeOverride {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let name = normalized.strip_prefix("scheme-").unwrap_or(&normalized);

        if name == "auto" {
            return Ok(Self::Auto);
        }

        ThemeScheme::ALL
            .into_iter()
            .find(|scheme| scheme.as_str() == name)
            .map(Self::from)
            .ok_or_else(|| {
                format!(
                    "Invalid scheme '{s}'. Expected 'auto', 'neutral', 'tonal-spot', \
                     'expressive', 'rainbow' or 'content'."
                )
            })
    }
}

/// Manual theme settings layered over the automatic analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideState {
    pub mode: ModeOverride,
    pub scheme: SchemeOverride,
}

impl OverrideState {
    /// Returns the effective analysis: overridden mode and scheme, automatic tone and chroma.
    #[must_use]
    pub fn apply(self, auto: ThemeAnalysis) -> ThemeAnalysis {
        ThemeAnalysis {
            tone: auto.tone,
            chroma: auto.chroma,
            mode: self.mode.manual().unwrap_or(auto.mode),
            scheme: self.scheme.manual().unwrap_or(auto.scheme),
        }
    }
}
