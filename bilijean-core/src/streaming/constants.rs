//! Platform enumerations used for routing and stream selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::StreamingError;

/// Resource category a URL routes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StreamingCategory {
    /// User uploaded videos
    #[serde(rename = "ugc")]
    Ugc,
    /// Licensed long-form series
    #[serde(rename = "pgc")]
    Series,
    /// Paid courses
    #[serde(rename = "pugv")]
    Course,
}

impl StreamingCategory {
    pub const ALL: [Self; 3] = [Self::Ugc, Self::Series, Self::Course];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ugc => "ugc",
            Self::Series => "pgc",
            Self::Course => "pugv",
        }
    }
}

impl fmt::Display for StreamingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamingCategory {
    type Err = StreamingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ugc" => Ok(Self::Ugc),
            "pgc" | "series" => Ok(Self::Series),
            "pugv" | "course" => Ok(Self::Course),
            other => Err(StreamingError::InvalidArgument(format!("unknown category: {other}"))),
        }
    }
}

/// Video codecs; a larger id is a more efficient encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum VideoCodecId {
    Avc = 7,
    Hevc = 12,
    Av1 = 13,
}

impl TryFrom<u32> for VideoCodecId {
    type Error = StreamingError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            7 => Ok(Self::Avc),
            12 => Ok(Self::Hevc),
            13 => Ok(Self::Av1),
            other => Err(StreamingError::InvalidArgument(format!("unknown video codec: {other}"))),
        }
    }
}

/// Audio rendition ids
///
/// The raw ids are not in quality order (Dolby and Hi-Res sit between 132K and
/// 192K numerically), so ranking goes through [`AudioBitRateId::quality_ordinal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AudioBitRateId {
    Bps64K = 30216,
    Bps132K = 30232,
    Bps192K = 30280,
    Dolby = 30250,
    HiRes = 30251,
}

impl AudioBitRateId {
    pub const ALL: [Self; 5] = [Self::Bps64K, Self::Bps132K, Self::Bps192K, Self::Dolby, Self::HiRes];

    #[must_use]
    pub const fn value(self) -> u32 {
        self as u32
    }

    /// Position on the cross-tier quality scale, 1 being the lowest.
    #[must_use]
    pub const fn quality_ordinal(self) -> u32 {
        match self {
            Self::Bps64K => 1,
            Self::Bps132K => 2,
            Self::Bps192K => 3,
            Self::Dolby => 4,
            Self::HiRes => 5,
        }
    }
}

impl TryFrom<u32> for AudioBitRateId {
    type Error = StreamingError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|a| a.value() == value)
            .ok_or_else(|| StreamingError::InvalidArgument(format!("unknown audio quality: {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for category in StreamingCategory::ALL {
            assert_eq!(category.as_str().parse::<StreamingCategory>().unwrap(), category);
        }
        assert_eq!(serde_json::to_string(&StreamingCategory::Series).unwrap(), "\"pgc\"");
        assert!("live".parse::<StreamingCategory>().is_err());
    }

    #[test]
    fn test_codec_order() {
        assert!(VideoCodecId::Av1 > VideoCodecId::Hevc);
        assert!(VideoCodecId::Hevc > VideoCodecId::Avc);
        assert_eq!(VideoCodecId::try_from(12).unwrap(), VideoCodecId::Hevc);
    }

    #[test]
    fn test_audio_ordinal_is_not_raw_order() {
        // raw ids: 64K < 132K < Dolby < Hi-Res < 192K
        assert!(AudioBitRateId::Dolby.value() < AudioBitRateId::Bps192K.value());
        assert!(AudioBitRateId::Dolby.quality_ordinal() > AudioBitRateId::Bps192K.quality_ordinal());
        assert!(AudioBitRateId::HiRes.quality_ordinal() > AudioBitRateId::Dolby.quality_ordinal());
        assert_eq!(AudioBitRateId::try_from(30280).unwrap(), AudioBitRateId::Bps192K);
        assert!(AudioBitRateId::try_from(192).is_err());
    }
}
