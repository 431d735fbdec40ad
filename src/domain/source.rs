//! Points origin

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ValueError;

/// Why points moved.
///
/// `Unspecified` is the zero value left behind by uninitialised data; it is
/// distinct from every real source and should be rejected wherever a source
/// is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsSource {
    #[default]
    Unspecified,
    Invoice,
    Survey,
    Redemption,
    Expiration,
    Transfer,
}

impl PointsSource {
    /// Storage code. `0` is reserved for `Unspecified`.
    pub fn code(&self) -> i16 {
        match self {
            PointsSource::Unspecified => 0,
            PointsSource::Invoice => 1,
            PointsSource::Survey => 2,
            PointsSource::Redemption => 3,
            PointsSource::Expiration => 4,
            PointsSource::Transfer => 5,
        }
    }

    pub fn from_code(code: i16) -> Result<Self, ValueError> {
        match code {
            0 => Ok(PointsSource::Unspecified),
            1 => Ok(PointsSource::Invoice),
            2 => Ok(PointsSource::Survey),
            3 => Ok(PointsSource::Redemption),
            4 => Ok(PointsSource::Expiration),
            5 => Ok(PointsSource::Transfer),
            other => Err(ValueError::UnknownPointsSource(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PointsSource::Unspecified => "unspecified",
            PointsSource::Invoice => "invoice",
            PointsSource::Survey => "survey",
            PointsSource::Redemption => "redemption",
            PointsSource::Expiration => "expiration",
            PointsSource::Transfer => "transfer",
        }
    }

    pub fn is_defined(&self) -> bool {
        *self != PointsSource::Unspecified
    }
}

impl fmt::Display for PointsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointsSource {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unspecified" => Ok(PointsSource::Unspecified),
            "invoice" => Ok(PointsSource::Invoice),
            "survey" => Ok(PointsSource::Survey),
            "redemption" => Ok(PointsSource::Redemption),
            "expiration" => Ok(PointsSource::Expiration),
            "transfer" => Ok(PointsSource::Transfer),
            other => Err(ValueError::UnknownPointsSource(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PointsSource; 6] = [
        PointsSource::Unspecified,
        PointsSource::Invoice,
        PointsSource::Survey,
        PointsSource::Redemption,
        PointsSource::Expiration,
        PointsSource::Transfer,
    ];

    #[test]
    fn test_default_is_undefined_sentinel() {
        let source = PointsSource::default();
        assert_eq!(source, PointsSource::Unspecified);
        assert_eq!(source.code(), 0);
        assert!(!source.is_defined());
    }

    #[test]
    fn test_real_sources_are_defined() {
        for source in ALL.iter().skip(1) {
            assert!(source.is_defined(), "{source} should be defined");
            assert_ne!(source.code(), 0);
        }
    }

    #[test]
    fn test_codes_and_names_are_consistent() {
        for source in ALL {
            assert_eq!(PointsSource::from_code(source.code()), Ok(source));
            assert_eq!(source.as_str().parse::<PointsSource>(), Ok(source));
        }
    }

    #[test]
    fn test_unknown_values_rejected() {
        assert!(matches!(
            PointsSource::from_code(9),
            Err(ValueError::UnknownPointsSource(_))
        ));
        assert!("cashback".parse::<PointsSource>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&PointsSource::Invoice).unwrap();
        assert_eq!(json, r#""invoice""#);
    }
}
