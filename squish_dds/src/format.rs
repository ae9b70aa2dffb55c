use bitflags::bitflags;

use crate::{
    error::{Buffer, SurfaceError},
    tile::check_buffer,
};

bitflags! {
    /// The packed flag word used by libsquish compatible APIs.
    ///
    /// Convert to a [Format] with [Format::from_flags] to validate the flags once
    /// before compressing or decompressing any data.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
    pub struct SquishFlags: u32 {
        /// Use DXT1 compression.
        const DXT1 = 1 << 0;
        /// Use DXT3 compression.
        const DXT3 = 1 << 1;
        /// Use DXT5 compression.
        const DXT5 = 1 << 2;
        /// Use BC4 compression.
        const BC4 = 1 << 3;
        /// Use BC5 compression.
        const BC5 = 1 << 4;
        /// Use a slow but high quality colour compressor (the default).
        const COLOUR_CLUSTER_FIT = 1 << 5;
        /// Use a fast but low quality colour compressor.
        const COLOUR_RANGE_FIT = 1 << 6;
        /// Weight the colour by alpha during cluster fit (disabled by default).
        const WEIGHT_COLOUR_BY_ALPHA = 1 << 7;
        /// Use a very slow but very high quality colour compressor.
        const COLOUR_ITERATIVE_CLUSTER_FIT = 1 << 8;
        /// Source is BGRA rather than RGBA.
        const SOURCE_BGRA = 1 << 9;

        const FORMATS = Self::DXT1.bits()
            | Self::DXT3.bits()
            | Self::DXT5.bits()
            | Self::BC4.bits()
            | Self::BC5.bits();

        const FITS = Self::COLOUR_CLUSTER_FIT.bits()
            | Self::COLOUR_RANGE_FIT.bits()
            | Self::COLOUR_ITERATIVE_CLUSTER_FIT.bits();
    }
}

/// A block compressed format using 4x4 pixel blocks.
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "strum", derive(strum::EnumIter))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub enum CompressionFormat {
    /// DXT1 with four colours and optional 1-bit alpha.
    #[default]
    Bc1,
    /// DXT3 with explicit 4-bit alpha.
    Bc2,
    /// DXT5 with interpolated alpha.
    Bc3,
    /// A single interpolated channel taken from red.
    Bc4,
    /// Two interpolated channels taken from red and green.
    Bc5,
}

impl CompressionFormat {
    /// The size in bytes of a single compressed 4x4 block.
    pub fn block_size_in_bytes(&self) -> usize {
        match self {
            CompressionFormat::Bc1 => 8,
            CompressionFormat::Bc2 => 16,
            CompressionFormat::Bc3 => 16,
            CompressionFormat::Bc4 => 8,
            CompressionFormat::Bc5 => 16,
        }
    }
}

/// The conversion quality when converting to compressed formats.
///
/// Higher quality settings run significantly slower.
/// Block compressed formats use a fixed compression ratio,
/// so lower quality settings do not use less space than slower ones.
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "strum", derive(strum::EnumIter))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub enum Quality {
    /// Range fit. Faster exports with slightly lower quality.
    Fast,
    /// Cluster fit. Normal export speed and quality.
    #[default]
    Normal,
    /// Iterative cluster fit. Slower exports for slightly higher quality.
    Slow,
}

/// A validated compression format along with the options for the colour compressor.
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct Format {
    pub compression: CompressionFormat,
    pub quality: Quality,
    /// Weight the colour of each texel by its alpha when fitting endpoints.
    pub weight_colour_by_alpha: bool,
    /// The uncompressed data uses BGRA channel order instead of RGBA.
    pub source_bgra: bool,
}

impl Format {
    pub fn new(compression: CompressionFormat) -> Self {
        Self {
            compression,
            ..Default::default()
        }
    }

    pub fn with_quality(self, quality: Quality) -> Self {
        Self { quality, ..self }
    }

    pub fn with_weight_colour_by_alpha(self, weight_colour_by_alpha: bool) -> Self {
        Self {
            weight_colour_by_alpha,
            ..self
        }
    }

    pub fn with_source_bgra(self, source_bgra: bool) -> Self {
        Self {
            source_bgra,
            ..self
        }
    }

    /// Select a format from the packed `flags`.
    ///
    /// The format defaults to DXT1 unless exactly one format bit is set.
    /// The quality defaults to cluster fit unless exactly one of range fit
    /// or iterative cluster fit is set.
    /// Unknown bits are ignored.
    pub fn from_flags(flags: SquishFlags) -> Self {
        let compression = match flags & SquishFlags::FORMATS {
            f if f == SquishFlags::DXT3 => CompressionFormat::Bc2,
            f if f == SquishFlags::DXT5 => CompressionFormat::Bc3,
            f if f == SquishFlags::BC4 => CompressionFormat::Bc4,
            f if f == SquishFlags::BC5 => CompressionFormat::Bc5,
            _ => CompressionFormat::Bc1,
        };

        let quality = match flags & SquishFlags::FITS {
            f if f == SquishFlags::COLOUR_RANGE_FIT => Quality::Fast,
            f if f == SquishFlags::COLOUR_ITERATIVE_CLUSTER_FIT => Quality::Slow,
            _ => Quality::Normal,
        };

        Self {
            compression,
            quality,
            weight_colour_by_alpha: flags.contains(SquishFlags::WEIGHT_COLOUR_BY_ALPHA),
            source_bgra: flags.contains(SquishFlags::SOURCE_BGRA),
        }
    }

    /// The packed flags that select this format.
    pub fn flags(&self) -> SquishFlags {
        let mut flags = match self.compression {
            CompressionFormat::Bc1 => SquishFlags::DXT1,
            CompressionFormat::Bc2 => SquishFlags::DXT3,
            CompressionFormat::Bc3 => SquishFlags::DXT5,
            CompressionFormat::Bc4 => SquishFlags::BC4,
            CompressionFormat::Bc5 => SquishFlags::BC5,
        };

        flags |= match self.quality {
            Quality::Fast => SquishFlags::COLOUR_RANGE_FIT,
            Quality::Normal => SquishFlags::COLOUR_CLUSTER_FIT,
            Quality::Slow => SquishFlags::COLOUR_ITERATIVE_CLUSTER_FIT,
        };

        flags.set(
            SquishFlags::WEIGHT_COLOUR_BY_ALPHA,
            self.weight_colour_by_alpha,
        );
        flags.set(SquishFlags::SOURCE_BGRA, self.source_bgra);
        flags
    }

    pub fn block_size_in_bytes(&self) -> usize {
        self.compression.block_size_in_bytes()
    }
}

impl From<SquishFlags> for Format {
    fn from(value: SquishFlags) -> Self {
        Self::from_flags(value)
    }
}

impl From<Format> for SquishFlags {
    fn from(value: Format) -> Self {
        value.flags()
    }
}

impl From<CompressionFormat> for Format {
    fn from(value: CompressionFormat) -> Self {
        Self::new(value)
    }
}

/// The relative importance of the red, green, and blue channels when fitting colours.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Metric(pub [f32; 3]);

impl Default for Metric {
    fn default() -> Self {
        Self([1.0; 3])
    }
}

impl Metric {
    /// Uses the first three values of `metric` or uniform weights for [None].
    pub fn from_slice(metric: Option<&[f32]>) -> Result<Self, SurfaceError> {
        match metric {
            Some(values) => {
                check_buffer(Buffer::Metric, 3, values.len())?;
                Ok(Self([values[0], values[1], values[2]]))
            }
            None => Ok(Self::default()),
        }
    }
}
