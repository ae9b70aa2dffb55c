use std::fmt;

use thiserror::Error;

/// The logical buffer that failed validation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Buffer {
    /// The uncompressed RGBA or BGRA pixels.
    Pixels,
    /// The compressed blocks.
    Blocks,
    /// The colour metric weights.
    Metric,
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Buffer::Pixels => write!(f, "pixel"),
            Buffer::Blocks => write!(f, "block"),
            Buffer::Metric => write!(f, "metric"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("the {buffer} buffer is missing")]
    MissingBuffer { buffer: Buffer },

    #[error("expected the {buffer} buffer to have at least {expected} elements but found {actual}")]
    OutOfRange {
        buffer: Buffer,
        expected: usize,
        actual: usize,
    },

    #[error("row pitch {pitch} is smaller than the minimum pitch of {min_pitch} bytes")]
    PitchTooSmall { pitch: u32, min_pitch: usize },

    #[error("surface pixel count {width} x {height} would overflow")]
    PixelCountWouldOverflow { width: u32, height: u32 },

    #[error("surface dimensions {width} x {height} do not match the compressed dimensions {compressed_width} x {compressed_height}")]
    MismatchedDimensions {
        width: u32,
        height: u32,
        compressed_width: u32,
        compressed_height: u32,
    },
}

#[derive(Debug, Error)]
pub enum DdsError {
    #[error("the stream ended before the end of the header")]
    TruncatedStream,

    #[error("expected the magic bytes \"DDS \" but found {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("the four character code {0:?} is not a supported compressed format")]
    UnsupportedFourCC([u8; 4]),

    #[error("surface dimensions {width} x {height} are not valid")]
    InvalidDimensions { width: i64, height: i64 },

    #[error("error reading or writing the header: {0}")]
    Io(std::io::Error),

    #[error("error validating surface: {0}")]
    Surface(#[from] SurfaceError),
}

impl From<std::io::Error> for DdsError {
    fn from(value: std::io::Error) -> Self {
        // Short reads are the only io error with a dedicated variant.
        match value.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::TruncatedStream,
            _ => Self::Io(value),
        }
    }
}
