//! The per block compression engine used by the image level functions.
use crate::{CompressionFormat, Format, Metric};

mod decode;
mod encode;

pub const BLOCK_WIDTH: usize = 4;
pub const BLOCK_HEIGHT: usize = 4;
pub const CHANNELS: usize = 4;

/// The 4x4 RGBA8 texels of a single block in row-major order.
pub type Texels = [[[u8; CHANNELS]; BLOCK_WIDTH]; BLOCK_HEIGHT];

/// A swappable engine for compressing and decompressing a single 4x4 block.
///
/// Texels are always RGBA. Channel swizzling for BGRA data is handled
/// before calling the codec.
pub trait BlockCodec: Sync {
    /// Compress `texels` into `block`.
    ///
    /// Bit `y * 4 + x` of `mask` is set if the texel at `texels[y][x]` is inside the image.
    /// Texels with a cleared bit have unspecified values and must not affect the result.
    /// The length of `block` is exactly [Format::block_size_in_bytes].
    fn compress_block(
        &self,
        texels: &Texels,
        mask: u16,
        format: &Format,
        metric: &Metric,
        block: &mut [u8],
    );

    /// Decompress `block` to RGBA8.
    ///
    /// The length of `block` is exactly [Format::block_size_in_bytes].
    fn decompress_block(&self, block: &[u8], format: &Format) -> Texels;
}

/// The default [BlockCodec] with range fit and cluster fit colour compressors.
///
/// Decoding matches the behavior of hardware decoders.
/// BC4 decodes to grayscale and BC5 sets blue to zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceCodec;

impl BlockCodec for ReferenceCodec {
    fn compress_block(
        &self,
        texels: &Texels,
        mask: u16,
        format: &Format,
        metric: &Metric,
        block: &mut [u8],
    ) {
        match format.compression {
            CompressionFormat::Bc1 => {
                encode::compress_colour_block(texels, mask, format, metric, true, block)
            }
            CompressionFormat::Bc2 => {
                let (alpha, colour) = block.split_at_mut(8);
                encode::compress_explicit_alpha_block(texels, mask, alpha);
                encode::compress_colour_block(texels, mask, format, metric, false, colour);
            }
            CompressionFormat::Bc3 => {
                let (alpha, colour) = block.split_at_mut(8);
                encode::compress_interpolated_block(
                    &channel(texels, 3),
                    mask,
                    encode::alpha_codebook,
                    alpha,
                );
                encode::compress_colour_block(texels, mask, format, metric, false, colour);
            }
            CompressionFormat::Bc4 => {
                encode::compress_interpolated_block(
                    &channel(texels, 0),
                    mask,
                    encode::channel_codebook,
                    block,
                )
            }
            CompressionFormat::Bc5 => {
                let (red, green) = block.split_at_mut(8);
                encode::compress_interpolated_block(
                    &channel(texels, 0),
                    mask,
                    encode::channel_codebook,
                    red,
                );
                encode::compress_interpolated_block(
                    &channel(texels, 1),
                    mask,
                    encode::channel_codebook,
                    green,
                );
            }
        }
    }

    fn decompress_block(&self, block: &[u8], format: &Format) -> Texels {
        match format.compression {
            CompressionFormat::Bc1 => decode::decompress_bc1(block),
            CompressionFormat::Bc2 => decode::decompress_bc2(block),
            CompressionFormat::Bc3 => decode::decompress_bc3(block),
            CompressionFormat::Bc4 => decode::decompress_bc4(block),
            CompressionFormat::Bc5 => decode::decompress_bc5(block),
        }
    }
}

// Single channel formats and alpha blocks work on one value per texel.
fn channel(texels: &Texels, index: usize) -> [[u8; BLOCK_WIDTH]; BLOCK_HEIGHT] {
    texels.map(|row| row.map(|texel| texel[index]))
}
