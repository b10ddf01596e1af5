//! `fnval` request bitmap for the play endpoints

/// Feature flags a play request asks the platform to include
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatNumberValue(u32);

impl FormatNumberValue {
    pub const DASH: Self = Self(16);
    pub const HDR: Self = Self(64);
    pub const FOUR_K: Self = Self(128);
    pub const DOLBY_AUDIO: Self = Self(256);
    pub const DOLBY_VISION: Self = Self(512);
    pub const EIGHT_K: Self = Self(1024);
    pub const AV1: Self = Self(2048);

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Every DASH feature at once; 4K additionally needs `fourk=1`.
    #[must_use]
    pub const fn full_format() -> Self {
        Self::DASH
            .union(Self::HDR)
            .union(Self::FOUR_K)
            .union(Self::DOLBY_AUDIO)
            .union(Self::DOLBY_VISION)
            .union(Self::EIGHT_K)
            .union(Self::AV1)
    }
}
