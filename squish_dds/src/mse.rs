use log::debug;

use crate::{
    bcn::{BlockCodec, ReferenceCodec},
    error::SurfaceError,
    tile::Layout,
    Format, Surface, SurfaceRgba8,
};

/// The mean squared error between an image and its compressed blocks.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct Mse {
    /// The squared error averaged over the red, green, and blue channels.
    pub colour: f64,
    /// The squared error of the alpha channel.
    pub alpha: f64,
}

impl<T: AsRef<[u8]>> SurfaceRgba8<T> {
    /// Compute the error of `surface` compared to this surface using the [ReferenceCodec].
    pub fn compute_mse<U: AsRef<[u8]>>(&self, surface: &Surface<U>) -> Result<Mse, SurfaceError> {
        if self.width != surface.width || self.height != surface.height {
            return Err(SurfaceError::MismatchedDimensions {
                width: self.width,
                height: self.height,
                compressed_width: surface.width,
                compressed_height: surface.height,
            });
        }

        compute_mse(
            self.data.as_ref(),
            self.width,
            self.height,
            None,
            surface.data.as_ref(),
            surface.format.with_source_bgra(false),
        )
    }
}

/// Compute the error of decompressing `blocks` compared to the original `rgba` pixels.
///
/// Only the `width` x `height` texels inside the image contribute to the error,
/// so both averages use `width * height` texels.
/// An empty image has no error.
pub fn compute_mse(
    rgba: &[u8],
    width: u32,
    height: u32,
    pitch: Option<u32>,
    blocks: &[u8],
    format: Format,
) -> Result<Mse, SurfaceError> {
    compute_mse_with(&ReferenceCodec, rgba, width, height, pitch, blocks, format)
}

/// Compute the error like [compute_mse] using a custom `codec`.
pub fn compute_mse_with<C: BlockCodec + ?Sized>(
    codec: &C,
    rgba: &[u8],
    width: u32,
    height: u32,
    pitch: Option<u32>,
    blocks: &[u8],
    format: Format,
) -> Result<Mse, SurfaceError> {
    let layout = Layout::new(width, height, pitch, format.compression)?;
    layout.check_pixels(rgba.len())?;
    layout.check_blocks(blocks.len())?;

    debug!(
        "Computing error for {width}x{height} image in {:?}",
        format.compression
    );

    if layout.is_empty() {
        return Ok(Mse::default());
    }

    // Integer sums make the result independent of the summation order.
    let tile_row_error = |(rows, row_blocks): (&[u8], &[u8])| {
        let mut colour = 0u64;
        let mut alpha = 0u64;
        for (tile_x, block) in row_blocks.chunks_exact(layout.block_size).enumerate() {
            let (texels, mask) = layout.read_tile(rows, tile_x, format.source_bgra);
            let decompressed = codec.decompress_block(block, &format);

            let texels = texels.iter().flatten();
            let decompressed = decompressed.iter().flatten();
            for (i, (original, decoded)) in texels.zip(decompressed).enumerate() {
                if mask & (1 << i) != 0 {
                    colour += (0..3)
                        .map(|c| squared_difference(original[c], decoded[c]))
                        .sum::<u64>();
                    alpha += squared_difference(original[3], decoded[3]);
                }
            }
        }
        (colour, alpha)
    };

    let rgba = &rgba[..layout.pixels_size];
    let blocks = &blocks[..layout.blocks_size];

    #[cfg(feature = "rayon")]
    let (colour, alpha) = {
        use rayon::prelude::*;

        rgba.par_chunks(layout.tile_row_pitch)
            .zip(blocks.par_chunks(layout.tile_row_size()))
            .map(tile_row_error)
            .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1))
    };

    #[cfg(not(feature = "rayon"))]
    let (colour, alpha) = rgba
        .chunks(layout.tile_row_pitch)
        .zip(blocks.chunks(layout.tile_row_size()))
        .map(tile_row_error)
        .fold((0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    let texel_count = (layout.width * layout.height) as f64;
    Ok(Mse {
        colour: colour as f64 / 3.0 / texel_count,
        alpha: alpha as f64 / texel_count,
    })
}

fn squared_difference(a: u8, b: u8) -> u64 {
    let d = a.abs_diff(b) as u64;
    d * d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compress_image, required_bytes, CompressionFormat, Quality};

    #[test]
    fn mse_exact_colour_is_zero() {
        let surface = SurfaceRgba8 {
            width: 8,
            height: 8,
            data: [132u8, 65, 206, 255].repeat(64),
        };
        let encoded = surface
            .encode(Format::new(CompressionFormat::Bc3), None)
            .unwrap();
        assert_eq!(
            Mse {
                colour: 0.0,
                alpha: 0.0
            },
            surface.compute_mse(&encoded).unwrap()
        );
    }

    #[test]
    fn mse_excludes_texels_outside_image() {
        // Zeroed blocks decode to opaque black.
        let rgba = [3u8, 3, 3, 255].repeat(6 * 4);
        let blocks = vec![0u8; required_bytes(6, 4, CompressionFormat::Bc1)];

        let mse = compute_mse(&rgba, 6, 4, None, &blocks, Format::new(CompressionFormat::Bc1)).unwrap();

        // The average uses 24 texels instead of 32 texels for the padded tiles.
        assert_eq!(9.0, mse.colour);
        assert_eq!(0.0, mse.alpha);
    }

    #[test]
    fn mse_alpha_error() {
        let rgba = [0u8, 0, 0, 10].repeat(4 * 4);
        let blocks = vec![0u8; 16];

        // Zeroed blocks decode to transparent black.
        let format = Format::new(CompressionFormat::Bc3);
        let mse = compute_mse(&rgba, 4, 4, None, &blocks, format).unwrap();
        assert_eq!(0.0, mse.colour);
        assert_eq!(100.0, mse.alpha);
    }

    #[test]
    fn mse_zero_size() {
        let format = Format::new(CompressionFormat::Bc1);
        assert_eq!(
            Mse::default(),
            compute_mse(&[], 0, 0, None, &[], format).unwrap()
        );
    }

    #[test]
    fn mse_quality_ordering() {
        let width = 16;
        let height = 16;
        let rgba: Vec<u8> = (0..width * height)
            .flat_map(|i| {
                let x = i % width;
                let y = i / width;
                [(x * 16) as u8, (y * 16) as u8, ((x * y) % 256) as u8, 255]
            })
            .collect();

        let mse = |quality| {
            let format = Format::new(CompressionFormat::Bc1).with_quality(quality);
            let mut blocks = vec![0u8; required_bytes(16, 16, format.compression)];
            compress_image(&rgba, 16, 16, None, &mut blocks, format, None).unwrap();
            compute_mse(&rgba, 16, 16, None, &blocks, format)
                .unwrap()
                .colour
        };

        // Refinement is only accepted if the error decreases.
        assert!(mse(Quality::Normal) <= mse(Quality::Fast));
        assert!(mse(Quality::Slow) <= mse(Quality::Normal));
    }

    #[test]
    fn mse_padded_pitch_matches_tightly_packed() {
        let width = 6;
        let height = 5;
        let pitch = 32;
        let rgba: Vec<u8> = (0..width * height)
            .flat_map(|i| [(i * 9) as u8, (i * 5) as u8, (255 - i * 7) as u8, (i * 8) as u8])
            .collect();

        let format = Format::new(CompressionFormat::Bc3);
        let mut blocks = vec![0u8; required_bytes(6, 5, format.compression)];
        compress_image(&rgba, 6, 5, None, &mut blocks, format, None).unwrap();

        // The bytes after each row are garbage and must not affect the error.
        let mut padded = vec![0xCDu8; height * pitch];
        for (row, padded_row) in rgba.chunks_exact(width * 4).zip(padded.chunks_exact_mut(pitch)) {
            padded_row[..width * 4].copy_from_slice(row);
        }

        let expected = compute_mse(&rgba, 6, 5, None, &blocks, format).unwrap();
        let actual = compute_mse(&padded, 6, 5, Some(32), &blocks, format).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn mse_mismatched_dimensions() {
        let surface = SurfaceRgba8 {
            width: 4,
            height: 4,
            data: vec![0u8; 64],
        };
        let compressed = Surface {
            width: 8,
            height: 4,
            format: Format::new(CompressionFormat::Bc1),
            data: vec![0u8; 16],
        };
        assert!(matches!(
            surface.compute_mse(&compressed),
            Err(SurfaceError::MismatchedDimensions { .. })
        ));
    }
}
