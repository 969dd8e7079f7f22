//! Plugin configuration as seen by the self test.
//!
//! The document is read once at the start of a run and never written back.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Media type the redirect mechanism is expected to serve.
pub const ALTERNATE_MIME: &str = "image/webp";

/// Source image formats the self test knows how to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

    pub fn bit(self) -> u8 {
        match self {
            ImageFormat::Jpeg => 1,
            ImageFormat::Png => 2,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    /// Upper-case label used in report headings.
    pub fn label(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
        }
    }

    /// Match a file extension (without the dot), case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        };
        write!(f, "{label}")
    }
}

/// Bitmask of enabled source formats (jpeg = 1, png = 2).
///
/// Bits outside the known formats are carried but ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageFormats(u8);

impl ImageFormats {
    pub const NONE: ImageFormats = ImageFormats(0);
    pub const JPEG: ImageFormats = ImageFormats(1);
    pub const PNG: ImageFormats = ImageFormats(2);
    pub const ALL: ImageFormats = ImageFormats(3);

    pub fn from_bits(bits: u8) -> Self {
        ImageFormats(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, format: ImageFormat) -> bool {
        self.0 & format.bit() != 0
    }

    /// True when no known format bit is set.
    pub fn is_empty(self) -> bool {
        ImageFormat::ALL.iter().all(|format| !self.contains(*format))
    }
}

impl Default for ImageFormats {
    fn default() -> Self {
        ImageFormats::ALL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DestinationFolder {
    /// Alternate files live in a dedicated cache tree.
    #[default]
    Separate,
    /// Alternate files sit next to their source.
    Mingled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DestinationStructure {
    DocRoot,
    #[default]
    ImageRoots,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DestinationExtension {
    /// `photo.jpg` becomes `photo.jpg.webp`.
    #[default]
    Append,
    /// `photo.jpg` becomes `photo.webp`.
    Set,
}

/// Persisted plugin options relevant to the redirect self test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProbeConfig {
    #[serde(rename = "enable-redirection-to-webp-realizer", default)]
    pub redirection_enabled: bool,
    #[serde(rename = "image-types", default)]
    pub enabled_formats: ImageFormats,
    #[serde(default)]
    pub destination_folder: DestinationFolder,
    #[serde(default)]
    pub destination_structure: DestinationStructure,
    #[serde(default)]
    pub destination_extension: DestinationExtension,
}

/// Options handed to the rewrite resolver.
///
/// Always passed as an explicit argument; nothing reads them from shared state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AlterHtmlOptions {
    #[serde(rename = "only-for-webps-that-exists", default = "default_only_existing")]
    pub only_for_existing: bool,
    #[serde(rename = "image-types", default)]
    pub enabled_formats: ImageFormats,
    #[serde(default)]
    pub destination_folder: DestinationFolder,
    #[serde(default)]
    pub destination_structure: DestinationStructure,
    #[serde(default)]
    pub destination_extension: DestinationExtension,
}

fn default_only_existing() -> bool {
    true
}

impl AlterHtmlOptions {
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            only_for_existing: default_only_existing(),
            enabled_formats: config.enabled_formats,
            destination_folder: config.destination_folder,
            destination_structure: config.destination_structure,
            destination_extension: config.destination_extension,
        }
    }

    /// Copy with the "alternate file must already exist" check disabled.
    pub fn for_on_demand_probe(&self) -> Self {
        Self {
            only_for_existing: false,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plugin_option_names() {
        let raw = r#"{
            "enable-redirection-to-webp-realizer": true,
            "image-types": 1,
            "destination-folder": "mingled",
            "destination-structure": "doc-root",
            "destination-extension": "set",
            "unrelated-option": "ignored"
        }"#;
        let config: ProbeConfig = serde_json::from_str(raw).unwrap();
        assert!(config.redirection_enabled);
        assert_eq!(config.enabled_formats, ImageFormats::JPEG);
        assert_eq!(config.destination_folder, DestinationFolder::Mingled);
        assert_eq!(config.destination_structure, DestinationStructure::DocRoot);
        assert_eq!(config.destination_extension, DestinationExtension::Set);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: ProbeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ProbeConfig::default());
        assert!(!config.redirection_enabled);
    }

    #[test]
    fn unknown_bits_do_not_count_as_enabled() {
        assert!(ImageFormats::from_bits(4).is_empty());
        assert!(ImageFormats::NONE.is_empty());
        assert!(!ImageFormats::from_bits(6).is_empty());
        assert!(ImageFormats::from_bits(6).contains(ImageFormat::Png));
        assert!(!ImageFormats::from_bits(6).contains(ImageFormat::Jpeg));
    }

    #[test]
    fn on_demand_probe_options_skip_existence_check() {
        let options = AlterHtmlOptions::from_config(&ProbeConfig::default());
        assert!(options.only_for_existing);
        let probe = options.for_on_demand_probe();
        assert!(!probe.only_for_existing);
        assert_eq!(probe.destination_folder, options.destination_folder);
    }

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(ImageFormat::from_extension("JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("Png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("gif"), None);
    }
}
