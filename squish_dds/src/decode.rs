use log::debug;

use crate::{
    bcn::{BlockCodec, ReferenceCodec, BLOCK_HEIGHT, BLOCK_WIDTH, CHANNELS},
    error::{Buffer, SurfaceError},
    tile::{check_buffer, Layout},
    Format, Surface, SurfaceRgba8,
};

impl<T: AsRef<[u8]>> Surface<T> {
    /// Decode the surface to tightly packed RGBA8 using the [ReferenceCodec].
    pub fn decode_rgba8(&self) -> Result<SurfaceRgba8<Vec<u8>>, SurfaceError> {
        // The output is always RGBA regardless of the source channel order.
        let format = self.format.with_source_bgra(false);

        // Validate before allocating the pixels.
        let layout = Layout::new(self.width, self.height, None, format.compression)?;
        layout.check_blocks(self.data.as_ref().len())?;

        let mut data = vec![0u8; layout.pixels_size];
        decompress_image(
            self.data.as_ref(),
            self.width,
            self.height,
            None,
            &mut data,
            format,
        )?;

        Ok(SurfaceRgba8 {
            width: self.width,
            height: self.height,
            data,
        })
    }
}

/// Decompress the `blocks` for a `width` x `height` image to `rgba` using the [ReferenceCodec].
///
/// The `rgba` data uses BGRA channel order if [Format::source_bgra] is set.
/// Rows start every `pitch` bytes or `width * 4` bytes for [None].
/// Pixels outside the image and bytes between the end of a row and the pitch
/// are never written.
pub fn decompress_image(
    blocks: &[u8],
    width: u32,
    height: u32,
    pitch: Option<u32>,
    rgba: &mut [u8],
    format: Format,
) -> Result<(), SurfaceError> {
    decompress_image_with(&ReferenceCodec, blocks, width, height, pitch, rgba, format)
}

/// Decompress an image like [decompress_image] using a custom `codec`.
pub fn decompress_image_with<C: BlockCodec + ?Sized>(
    codec: &C,
    blocks: &[u8],
    width: u32,
    height: u32,
    pitch: Option<u32>,
    rgba: &mut [u8],
    format: Format,
) -> Result<(), SurfaceError> {
    let layout = Layout::new(width, height, pitch, format.compression)?;
    layout.check_blocks(blocks.len())?;
    layout.check_pixels(rgba.len())?;

    debug!(
        "Decompressing {width}x{height} image from {:?} with {} tiles",
        format.compression,
        layout.tiles_x * layout.tiles_y
    );

    if layout.is_empty() {
        return Ok(());
    }

    let decompress_tile_row = |(row_blocks, rows): (&[u8], &mut [u8])| {
        for (tile_x, block) in row_blocks.chunks_exact(layout.block_size).enumerate() {
            let texels = codec.decompress_block(block, &format);
            layout.write_tile(rows, tile_x, &texels, format.source_bgra);
        }
    };

    let blocks = &blocks[..layout.blocks_size];
    let rgba = &mut rgba[..layout.pixels_size];

    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;

        blocks
            .par_chunks(layout.tile_row_size())
            .zip(rgba.par_chunks_mut(layout.tile_row_pitch))
            .for_each(decompress_tile_row);
    }

    #[cfg(not(feature = "rayon"))]
    {
        blocks
            .chunks(layout.tile_row_size())
            .zip(rgba.chunks_mut(layout.tile_row_pitch))
            .for_each(decompress_tile_row);
    }

    Ok(())
}

/// Decompress a single block to 4x4 row-major RGBA8 texels using the [ReferenceCodec].
pub fn decompress_block(block: &[u8], rgba: &mut [u8], format: Format) -> Result<(), SurfaceError> {
    decompress_block_with(&ReferenceCodec, block, rgba, format)
}

/// Decompress a single block like [decompress_block] using a custom `codec`.
pub fn decompress_block_with<C: BlockCodec + ?Sized>(
    codec: &C,
    block: &[u8],
    rgba: &mut [u8],
    format: Format,
) -> Result<(), SurfaceError> {
    let block_size = format.block_size_in_bytes();
    check_buffer(Buffer::Blocks, block_size, block.len())?;
    check_buffer(Buffer::Pixels, BLOCK_WIDTH * BLOCK_HEIGHT * CHANNELS, rgba.len())?;

    let texels = codec.decompress_block(&block[..block_size], &format);
    for (pixel, texel) in rgba.chunks_exact_mut(CHANNELS).zip(texels.iter().flatten()) {
        pixel.copy_from_slice(texel);
        if format.source_bgra {
            pixel.swap(0, 2);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compress_image, required_bytes, CompressionFormat};

    #[test]
    fn decompress_zero_size() {
        let format = Format::new(CompressionFormat::Bc1);
        assert!(decompress_image(&[], 0, 0, None, &mut [], format).is_ok());

        let surface = Surface {
            width: 0,
            height: 0,
            format,
            data: Vec::new(),
        };
        assert_eq!(
            SurfaceRgba8 {
                width: 0,
                height: 0,
                data: Vec::new()
            },
            surface.decode_rgba8().unwrap()
        );
    }

    #[test]
    fn decompress_5x5_never_writes_outside_image() {
        let width = 5;
        let height = 5;
        let pitch = 24;
        let format = Format::new(CompressionFormat::Bc3);

        let source = [132u8, 65, 206, 255].repeat(width * height);
        let mut blocks = vec![0u8; required_bytes(5, 5, format.compression)];
        compress_image(&source, 5, 5, None, &mut blocks, format, None).unwrap();
        assert_eq!(64, blocks.len());

        // Fill the padding with a sentinel value.
        let mut rgba = vec![0xAAu8; height * pitch + 16];
        decompress_image(&blocks, 5, 5, Some(24), &mut rgba, format).unwrap();

        for row in rgba[..height * pitch].chunks_exact(pitch) {
            assert_eq!(&source[..width * 4], &row[..width * 4]);
            assert!(row[width * 4..].iter().all(|b| *b == 0xAA));
        }
        assert!(rgba[height * pitch..].iter().all(|b| *b == 0xAA));
    }

    #[test]
    fn decompress_bgra() {
        let format = Format::new(CompressionFormat::Bc1);

        // Pure red with all indices 0.
        let block = [0x00, 0xF8, 0x00, 0xF8, 0, 0, 0, 0];
        let mut rgba = vec![0u8; 4];
        decompress_image(&block, 1, 1, None, &mut rgba, format).unwrap();
        assert_eq!([255u8, 0, 0, 255], rgba[..]);

        decompress_image(&block, 1, 1, None, &mut rgba, format.with_source_bgra(true)).unwrap();
        assert_eq!([0u8, 0, 255, 255], rgba[..]);
    }

    #[test]
    fn decompress_pixels_one_byte_short() {
        let format = Format::new(CompressionFormat::Bc4);
        let blocks = vec![0u8; 8];
        let mut rgba = vec![0u8; 4 * 4 * 4 - 1];

        let result = decompress_image(&blocks, 4, 4, None, &mut rgba, format);
        assert!(matches!(
            result,
            Err(SurfaceError::OutOfRange {
                buffer: Buffer::Pixels,
                expected: 64,
                actual: 63
            })
        ));
    }

    #[test]
    fn decompress_missing_blocks() {
        let format = Format::new(CompressionFormat::Bc1);
        let mut rgba = vec![0u8; 4 * 4 * 4];

        let result = decompress_image(&[], 4, 4, None, &mut rgba, format);
        assert!(matches!(
            result,
            Err(SurfaceError::MissingBuffer {
                buffer: Buffer::Blocks
            })
        ));
    }

    #[test]
    fn decode_surface_not_enough_data() {
        let surface = Surface {
            width: 8,
            height: 8,
            format: Format::new(CompressionFormat::Bc2),
            data: vec![0u8; 63],
        };
        assert!(matches!(
            surface.decode_rgba8(),
            Err(SurfaceError::OutOfRange {
                buffer: Buffer::Blocks,
                expected: 64,
                actual: 63
            })
        ));
    }

    #[test]
    fn decompress_block_matches_image() {
        let format = Format::new(CompressionFormat::Bc4);
        let block = [200, 10, 0b1000, 0, 0, 0, 0, 0];

        let mut rgba1 = [0u8; 64];
        decompress_block(&block, &mut rgba1, format).unwrap();

        let mut rgba2 = [0u8; 64];
        decompress_image(&block, 4, 4, None, &mut rgba2, format).unwrap();

        assert_eq!(rgba1, rgba2);
        assert_eq!([200u8, 200, 200, 255], rgba1[..4]);
        assert_eq!([10u8, 10, 10, 255], rgba1[4..8]);
    }
}
