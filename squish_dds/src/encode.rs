use log::debug;

use crate::{
    bcn::{BlockCodec, ReferenceCodec, Texels, BLOCK_HEIGHT, BLOCK_WIDTH, CHANNELS},
    error::{Buffer, SurfaceError},
    tile::{check_buffer, Layout},
    Format, Metric, Surface, SurfaceRgba8,
};

impl<T: AsRef<[u8]>> SurfaceRgba8<T> {
    /// Encode an RGBA8 surface to the given `format` using the [ReferenceCodec].
    ///
    /// See [compress_image] for details on `metric`.
    pub fn encode(
        &self,
        format: Format,
        metric: Option<&[f32]>,
    ) -> Result<Surface<Vec<u8>>, SurfaceError> {
        // The surface data is always RGBA.
        let format = format.with_source_bgra(false);

        // Validate before allocating the blocks.
        let layout = Layout::new(self.width, self.height, None, format.compression)?;
        layout.check_pixels(self.data.as_ref().len())?;

        let mut data = vec![0u8; layout.blocks_size];
        compress_image(
            self.data.as_ref(),
            self.width,
            self.height,
            None,
            &mut data,
            format,
            metric,
        )?;

        Ok(Surface {
            width: self.width,
            height: self.height,
            format,
            data,
        })
    }
}

/// Compress the `width` x `height` pixels in `rgba` to `blocks` using the [ReferenceCodec].
///
/// The `rgba` data uses BGRA channel order if [Format::source_bgra] is set.
/// Rows start every `pitch` bytes or `width * 4` bytes for [None].
/// The `metric` weights the red, green, and blue channels when fitting colours
/// and must contain at least 3 values. Uniform weights are used for [None].
///
/// Only the first [required_bytes](crate::required_bytes) bytes of `blocks` are written.
pub fn compress_image(
    rgba: &[u8],
    width: u32,
    height: u32,
    pitch: Option<u32>,
    blocks: &mut [u8],
    format: Format,
    metric: Option<&[f32]>,
) -> Result<(), SurfaceError> {
    compress_image_with(
        &ReferenceCodec,
        rgba,
        width,
        height,
        pitch,
        blocks,
        format,
        metric,
    )
}

/// Compress an image like [compress_image] using a custom `codec`.
#[allow(clippy::too_many_arguments)]
pub fn compress_image_with<C: BlockCodec + ?Sized>(
    codec: &C,
    rgba: &[u8],
    width: u32,
    height: u32,
    pitch: Option<u32>,
    blocks: &mut [u8],
    format: Format,
    metric: Option<&[f32]>,
) -> Result<(), SurfaceError> {
    let metric = Metric::from_slice(metric)?;
    let layout = Layout::new(width, height, pitch, format.compression)?;
    layout.check_pixels(rgba.len())?;
    layout.check_blocks(blocks.len())?;

    debug!(
        "Compressing {width}x{height} image to {:?} with {} tiles",
        format.compression,
        layout.tiles_x * layout.tiles_y
    );

    if layout.is_empty() {
        return Ok(());
    }

    // Each row of tiles writes a disjoint range of blocks.
    let compress_tile_row = |(rows, row_blocks): (&[u8], &mut [u8])| {
        for (tile_x, block) in row_blocks.chunks_exact_mut(layout.block_size).enumerate() {
            let (texels, mask) = layout.read_tile(rows, tile_x, format.source_bgra);
            codec.compress_block(&texels, mask, &format, &metric, block);
        }
    };

    let rgba = &rgba[..layout.pixels_size];
    let blocks = &mut blocks[..layout.blocks_size];

    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;

        rgba.par_chunks(layout.tile_row_pitch)
            .zip(blocks.par_chunks_mut(layout.tile_row_size()))
            .for_each(compress_tile_row);
    }

    #[cfg(not(feature = "rayon"))]
    {
        rgba.chunks(layout.tile_row_pitch)
            .zip(blocks.chunks_mut(layout.tile_row_size()))
            .for_each(compress_tile_row);
    }

    Ok(())
}

/// Compress a single 4x4 block of row-major RGBA8 texels using the [ReferenceCodec].
pub fn compress_block(
    rgba: &[u8],
    block: &mut [u8],
    format: Format,
    metric: Option<&[f32]>,
) -> Result<(), SurfaceError> {
    compress_block_masked(rgba, 0xFFFF, block, format, metric)
}

/// Compress a single 4x4 block where only texels with a set `mask` bit are used.
///
/// Bit `y * 4 + x` corresponds to the texel in row `y` and column `x`.
pub fn compress_block_masked(
    rgba: &[u8],
    mask: u16,
    block: &mut [u8],
    format: Format,
    metric: Option<&[f32]>,
) -> Result<(), SurfaceError> {
    compress_block_masked_with(&ReferenceCodec, rgba, mask, block, format, metric)
}

/// Compress a single masked block like [compress_block_masked] using a custom `codec`.
pub fn compress_block_masked_with<C: BlockCodec + ?Sized>(
    codec: &C,
    rgba: &[u8],
    mask: u16,
    block: &mut [u8],
    format: Format,
    metric: Option<&[f32]>,
) -> Result<(), SurfaceError> {
    let metric = Metric::from_slice(metric)?;
    let block_size = format.block_size_in_bytes();
    check_buffer(Buffer::Pixels, BLOCK_WIDTH * BLOCK_HEIGHT * CHANNELS, rgba.len())?;
    check_buffer(Buffer::Blocks, block_size, block.len())?;

    let mut texels: Texels = [[[0u8; CHANNELS]; BLOCK_WIDTH]; BLOCK_HEIGHT];
    for (texel, pixel) in texels.iter_mut().flatten().zip(rgba.chunks_exact(CHANNELS)) {
        *texel = [pixel[0], pixel[1], pixel[2], pixel[3]];
        if format.source_bgra {
            texel.swap(0, 2);
        }
    }

    codec.compress_block(&texels, mask, &format, &metric, &mut block[..block_size]);
    Ok(())
}
