use crate::{
    bcn::{Texels, BLOCK_HEIGHT, BLOCK_WIDTH, CHANNELS},
    checked_required_bytes,
    error::{Buffer, SurfaceError},
    CompressionFormat,
};

/// The validated dimensions and buffer sizes for an image split into 4x4 tiles.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) struct Layout {
    pub width: usize,
    pub height: usize,
    /// The number of bytes between the start of consecutive pixel rows.
    pub pitch: usize,
    /// The pixel bytes covered by one row of tiles.
    pub tile_row_pitch: usize,
    pub tiles_x: usize,
    pub tiles_y: usize,
    pub block_size: usize,
    /// The minimum length of the pixel buffer.
    pub pixels_size: usize,
    /// The minimum length of the block buffer.
    pub blocks_size: usize,
}

impl Layout {
    pub fn new(
        width: u32,
        height: u32,
        pitch: Option<u32>,
        compression: CompressionFormat,
    ) -> Result<Self, SurfaceError> {
        let overflow = || SurfaceError::PixelCountWouldOverflow { width, height };

        let min_pitch = (width as usize)
            .checked_mul(CHANNELS)
            .ok_or_else(overflow)?;
        let pitch = match pitch {
            Some(pitch) if (pitch as usize) < min_pitch => {
                return Err(SurfaceError::PitchTooSmall { pitch, min_pitch })
            }
            Some(pitch) => pitch as usize,
            None => min_pitch,
        };

        let pixels_size = (height as usize).checked_mul(pitch).ok_or_else(overflow)?;
        let tile_row_pitch = BLOCK_HEIGHT.checked_mul(pitch).ok_or_else(overflow)?;
        let blocks_size =
            checked_required_bytes(width, height, compression).ok_or_else(overflow)?;

        Ok(Self {
            width: width as usize,
            height: height as usize,
            pitch,
            tile_row_pitch,
            tiles_x: (width as usize).div_ceil(BLOCK_WIDTH),
            tiles_y: (height as usize).div_ceil(BLOCK_HEIGHT),
            block_size: compression.block_size_in_bytes(),
            pixels_size,
            blocks_size,
        })
    }

    /// Returns `true` if there are no tiles to process.
    pub fn is_empty(&self) -> bool {
        self.tiles_x == 0 || self.tiles_y == 0
    }

    /// The block bytes for one row of tiles.
    pub fn tile_row_size(&self) -> usize {
        self.tiles_x * self.block_size
    }

    pub fn check_pixels(&self, len: usize) -> Result<(), SurfaceError> {
        check_buffer(Buffer::Pixels, self.pixels_size, len)
    }

    pub fn check_blocks(&self, len: usize) -> Result<(), SurfaceError> {
        check_buffer(Buffer::Blocks, self.blocks_size, len)
    }

    /// Gather the texels of the tile at `tile_x` from the pixel rows of a tile row.
    ///
    /// Bit `dy * 4 + dx` of the returned mask is set for texels inside the image.
    /// Texels outside the image are left as zero and never read.
    pub fn read_tile(&self, rows: &[u8], tile_x: usize, bgra: bool) -> (Texels, u16) {
        let mut texels = [[[0u8; CHANNELS]; BLOCK_WIDTH]; BLOCK_HEIGHT];
        let mut mask = 0u16;

        let x0 = tile_x * BLOCK_WIDTH;
        for (dy, row) in texels.iter_mut().enumerate().take(self.valid_rows(rows.len())) {
            for (dx, texel) in row.iter_mut().enumerate().take(self.valid_columns(x0)) {
                let offset = dy * self.pitch + (x0 + dx) * CHANNELS;
                let pixel = &rows[offset..offset + CHANNELS];
                *texel = [pixel[0], pixel[1], pixel[2], pixel[3]];
                if bgra {
                    texel.swap(0, 2);
                }
                mask |= 1 << (dy * BLOCK_WIDTH + dx);
            }
        }

        (texels, mask)
    }

    /// Scatter the texels inside the image to the pixel rows of a tile row.
    pub fn write_tile(&self, rows: &mut [u8], tile_x: usize, texels: &Texels, bgra: bool) {
        let x0 = tile_x * BLOCK_WIDTH;
        for (dy, row) in texels.iter().enumerate().take(self.valid_rows(rows.len())) {
            for (dx, texel) in row.iter().enumerate().take(self.valid_columns(x0)) {
                let offset = dy * self.pitch + (x0 + dx) * CHANNELS;
                let pixel = &mut rows[offset..offset + CHANNELS];
                pixel.copy_from_slice(texel);
                if bgra {
                    pixel.swap(0, 2);
                }
            }
        }
    }

    fn valid_rows(&self, rows_len: usize) -> usize {
        // The last tile row is shorter for heights that aren't a multiple of 4.
        (rows_len / self.pitch).min(BLOCK_HEIGHT)
    }

    fn valid_columns(&self, x0: usize) -> usize {
        self.width.saturating_sub(x0).min(BLOCK_WIDTH)
    }
}

/// Check that a buffer of length `actual` can hold `expected` bytes.
///
/// Empty buffers are reported as missing unless nothing needs to be stored.
pub(crate) fn check_buffer(buffer: Buffer, expected: usize, actual: usize) -> Result<(), SurfaceError> {
    if expected == 0 {
        Ok(())
    } else if actual == 0 {
        Err(SurfaceError::MissingBuffer { buffer })
    } else if actual < expected {
        Err(SurfaceError::OutOfRange {
            buffer,
            expected,
            actual,
        })
    } else {
        Ok(())
    }
}
