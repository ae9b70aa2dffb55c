use super::{Texels, BLOCK_HEIGHT, BLOCK_WIDTH, CHANNELS};

pub fn decompress_bc1(block: &[u8]) -> Texels {
    let mut decompressed = [[[0u8; CHANNELS]; BLOCK_WIDTH]; BLOCK_HEIGHT];

    bcdec_rs::bc1(
        block,
        bytemuck::cast_slice_mut(&mut decompressed),
        BLOCK_WIDTH * CHANNELS,
    );

    decompressed
}

pub fn decompress_bc2(block: &[u8]) -> Texels {
    let mut decompressed = [[[0u8; CHANNELS]; BLOCK_WIDTH]; BLOCK_HEIGHT];

    bcdec_rs::bc2(
        block,
        bytemuck::cast_slice_mut(&mut decompressed),
        BLOCK_WIDTH * CHANNELS,
    );

    decompressed
}

pub fn decompress_bc3(block: &[u8]) -> Texels {
    let mut decompressed = [[[0u8; CHANNELS]; BLOCK_WIDTH]; BLOCK_HEIGHT];

    bcdec_rs::bc3(
        block,
        bytemuck::cast_slice_mut(&mut decompressed),
        BLOCK_WIDTH * CHANNELS,
    );

    decompressed
}

pub fn decompress_bc4(block: &[u8]) -> Texels {
    let mut red = [[0u8; BLOCK_WIDTH]; BLOCK_HEIGHT];

    bcdec_rs::bc4(block, bytemuck::cast_slice_mut(&mut red), BLOCK_WIDTH, false);

    red.map(|row| row.map(|r| [r, r, r, 255]))
}

pub fn decompress_bc5(block: &[u8]) -> Texels {
    let mut red_green = [[[0u8; 2]; BLOCK_WIDTH]; BLOCK_HEIGHT];

    bcdec_rs::bc5(
        block,
        bytemuck::cast_slice_mut(&mut red_green),
        BLOCK_WIDTH * 2,
        false,
    );

    red_green.map(|row| row.map(|[r, g]| [r, g, 0, 255]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bc1_opaque_endpoints() {
        // Pure red and pure blue with alternating indices 0 and 1.
        let block = [0x00, 0xF8, 0x1F, 0x00, 0x44, 0x44, 0x44, 0x44];
        let decompressed = decompress_bc1(&block);
        assert_eq!([255, 0, 0, 255], decompressed[0][0]);
        assert_eq!([0, 0, 255, 255], decompressed[0][1]);
        assert_eq!([255, 0, 0, 255], decompressed[0][2]);
    }

    #[test]
    fn bc1_transparent_index() {
        // c0 <= c1 enables the transparent black palette entry.
        let block = [0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!([[[0u8; 4]; 4]; 4], decompress_bc1(&block));
    }

    #[test]
    fn bc2_explicit_alpha() {
        let mut block = [0u8; 16];
        block[0] = 0x0F;
        let decompressed = decompress_bc2(&block);
        assert_eq!(255, decompressed[0][0][3]);
        assert_eq!(0, decompressed[0][1][3]);
    }

    #[test]
    fn bc4_endpoints() {
        // Index 0 uses the first endpoint and index 1 the second.
        let block = [200, 10, 0b1000, 0, 0, 0, 0, 0];
        let decompressed = decompress_bc4(&block);
        assert_eq!([200, 200, 200, 255], decompressed[0][0]);
        assert_eq!([10, 10, 10, 255], decompressed[0][1]);
        assert_eq!([200, 200, 200, 255], decompressed[3][3]);
    }

    #[test]
    fn bc4_unsigned_interpolated() {
        // Index 2 of the eight value mode is 6/7 of the first endpoint rounded.
        let block = [255, 0, 0b010, 0, 0, 0, 0, 0];
        let decompressed = decompress_bc4(&block);
        assert_eq!([219, 219, 219, 255], decompressed[0][0]);
        assert_eq!([255, 255, 255, 255], decompressed[0][1]);
    }

    #[test]
    fn bc5_red_and_green() {
        let block = [90, 90, 0, 0, 0, 0, 0, 0, 10, 10, 0, 0, 0, 0, 0, 0];
        assert_eq!([[[90u8, 10, 0, 255]; 4]; 4], decompress_bc5(&block));
    }
}
