//! Compress RGBA8 images to block compressed formats and back.
//!
//! Images of any dimensions are split into 4x4 tiles in row-major order.
//! Tiles on the right and bottom edges that extend past the image are masked,
//! so texels outside the image never affect the compressed blocks and are
//! never written when decompressing.
//!
//! The per block bit packing is handled by a [BlockCodec].
//! The [ReferenceCodec] is used by default, but any implementation can be
//! supplied using the `_with` variants of each function.
//!
//! ```rust no_run
//! use squish_dds::{CompressionFormat, Format, Quality, SurfaceRgba8};
//!
//! let rgba8 = SurfaceRgba8 {
//!     width: 6,
//!     height: 4,
//!     data: vec![255u8; 6 * 4 * 4],
//! };
//!
//! let format = Format::new(CompressionFormat::Bc3).with_quality(Quality::Slow);
//! let surface = rgba8.encode(format, None)?;
//! let mse = rgba8.compute_mse(&surface)?;
//! # Ok::<(), squish_dds::SurfaceError>(())
//! ```
pub mod bcn;
pub mod dds;
mod decode;
mod encode;
mod error;
mod format;
mod mse;
mod surface;
mod tile;

pub use bcn::{BlockCodec, ReferenceCodec};
pub use decode::{decompress_block, decompress_block_with, decompress_image, decompress_image_with};
pub use encode::{
    compress_block, compress_block_masked, compress_block_masked_with, compress_image,
    compress_image_with,
};
pub use error::{Buffer, DdsError, SurfaceError};
pub use format::{CompressionFormat, Format, Metric, Quality, SquishFlags};
pub use mse::{compute_mse, compute_mse_with, Mse};
pub use surface::{Surface, SurfaceRgba8};

/// The number of bytes required to store a `width` x `height` image in the given `format`.
///
/// Partial blocks on the right and bottom edges still use an entire block.
/// The result saturates at [usize::MAX] instead of overflowing,
/// so extremely large images will fail any later length validation.
pub fn required_bytes(width: u32, height: u32, format: CompressionFormat) -> usize {
    let tiles_x = (width as usize).div_ceil(bcn::BLOCK_WIDTH);
    let tiles_y = (height as usize).div_ceil(bcn::BLOCK_HEIGHT);
    tiles_x
        .saturating_mul(tiles_y)
        .saturating_mul(format.block_size_in_bytes())
}

// Used for validation where overflow should be reported as an error.
pub(crate) fn checked_required_bytes(
    width: u32,
    height: u32,
    format: CompressionFormat,
) -> Option<usize> {
    (width as usize)
        .div_ceil(bcn::BLOCK_WIDTH)
        .checked_mul((height as usize).div_ceil(bcn::BLOCK_HEIGHT))?
        .checked_mul(format.block_size_in_bytes())
}
