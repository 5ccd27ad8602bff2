use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::BirdcallError;

/// Catalog grade attached to a recording. Declaration order is the ranking:
/// `A` is best, anything outside `A..=E` sorts after `E`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityRank {
    A,
    B,
    C,
    D,
    E,
    Unrated,
}

impl QualityRank {
    /// Lenient reading of a catalog field: only the first character counts.
    pub fn from_symbol(symbol: Option<&str>) -> Self {
        match symbol.and_then(|value| value.trim().chars().next()) {
            Some('A') => QualityRank::A,
            Some('B') => QualityRank::B,
            Some('C') => QualityRank::C,
            Some('D') => QualityRank::D,
            Some('E') => QualityRank::E,
            _ => QualityRank::Unrated,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityRank::A => "A",
            QualityRank::B => "B",
            QualityRank::C => "C",
            QualityRank::D => "D",
            QualityRank::E => "E",
            QualityRank::Unrated => "",
        }
    }
}

impl fmt::Display for QualityRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QualityRank {
    type Err = BirdcallError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let rank = match normalized.as_str() {
            "A" => QualityRank::A,
            "B" => QualityRank::B,
            "C" => QualityRank::C,
            "D" => QualityRank::D,
            "E" => QualityRank::E,
            _ => return Err(BirdcallError::InvalidQuality(value.to_string())),
        };
        Ok(rank)
    }
}

/// eBird region code such as `US`, `US-NY` or `US-NY-109`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionCode(String);

impl RegionCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RegionCode {
    type Err = BirdcallError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = !normalized.is_empty()
            && !normalized.starts_with('-')
            && !normalized.ends_with('-')
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
        if !is_valid {
            return Err(BirdcallError::InvalidRegionCode(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    XenoCanto,
    Macaulay,
}

impl CatalogSource {
    pub fn label(self) -> &'static str {
        match self {
            CatalogSource::XenoCanto => "xeno-canto",
            CatalogSource::Macaulay => "macaulay",
        }
    }

    /// Subdirectory of the download root owned by this source.
    pub fn dir_name(self) -> &'static str {
        match self {
            CatalogSource::XenoCanto => "XC",
            CatalogSource::Macaulay => "ML",
        }
    }

    /// Prefix for catalog ids in generated filenames.
    pub fn id_prefix(self) -> &'static str {
        self.dir_name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub source: CatalogSource,
    pub id: String,
    pub species: Option<String>,
    pub quality: QualityRank,
    pub quality_label: Option<String>,
    pub location: Option<String>,
    pub recordist: Option<String>,
    pub media_url: Option<String>,
}

impl Recording {
    /// Filename before sanitization, e.g. `(A) Common Loon; Lake X; Jane Doe; XC12345.mp3`.
    pub fn raw_filename(&self) -> String {
        format!(
            "({}) {}; {}; {}; {}{}.mp3",
            self.quality_label.as_deref().unwrap_or(""),
            self.species.as_deref().unwrap_or(""),
            self.location.as_deref().unwrap_or(""),
            self.recordist.as_deref().unwrap_or(""),
            self.source.id_prefix(),
            self.id
        )
    }

    pub fn has_species(&self) -> bool {
        non_blank(self.species.as_deref())
    }

    pub fn has_media(&self) -> bool {
        non_blank(self.media_url.as_deref())
    }

    /// Both a species directory and a URL to fetch from.
    pub fn is_downloadable(&self) -> bool {
        self.has_species() && self.has_media()
    }
}

fn non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.trim().is_empty())
}

/// One file to retrieve: consumed exactly once by the fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub directory: Utf8PathBuf,
    pub filename: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn quality_symbol_uses_first_letter() {
        assert_eq!(QualityRank::from_symbol(Some("B")), QualityRank::B);
        assert_eq!(QualityRank::from_symbol(Some("no score")), QualityRank::Unrated);
        assert_eq!(QualityRank::from_symbol(Some("")), QualityRank::Unrated);
        assert_eq!(QualityRank::from_symbol(None), QualityRank::Unrated);
    }

    #[test]
    fn quality_ordering_puts_unrated_last() {
        assert!(QualityRank::A < QualityRank::E);
        assert!(QualityRank::E < QualityRank::Unrated);
    }

    #[test]
    fn parse_quality_invalid() {
        let err = "F".parse::<QualityRank>().unwrap_err();
        assert_matches!(err, BirdcallError::InvalidQuality(_));
    }

    #[test]
    fn parse_region_code() {
        let code: RegionCode = " US-NY-109 ".parse().unwrap();
        assert_eq!(code.as_str(), "US-NY-109");
        assert_matches!(
            "US NY".parse::<RegionCode>(),
            Err(BirdcallError::InvalidRegionCode(_))
        );
        assert_matches!(
            "".parse::<RegionCode>(),
            Err(BirdcallError::InvalidRegionCode(_))
        );
    }

    #[test]
    fn raw_filename_layout() {
        let recording = Recording {
            source: CatalogSource::XenoCanto,
            id: "12345".to_string(),
            species: Some("Common Loon".to_string()),
            quality: QualityRank::A,
            quality_label: Some("A".to_string()),
            location: Some("Lake X".to_string()),
            recordist: Some("Jane Doe".to_string()),
            media_url: Some("https://xeno-canto.org/12345/download".to_string()),
        };
        assert_eq!(
            recording.raw_filename(),
            "(A) Common Loon; Lake X; Jane Doe; XC12345.mp3"
        );
    }
}
