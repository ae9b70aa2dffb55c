use crate::{Format, Metric, Quality};

use super::{Texels, BLOCK_HEIGHT, BLOCK_WIDTH};

const TEXELS_PER_BLOCK: usize = BLOCK_WIDTH * BLOCK_HEIGHT;

// BC1 texels with alpha below this value use the transparent index.
const ALPHA_THRESHOLD: u8 = 128;

// Interpolation weights of the start endpoint for each palette index.
const WEIGHTS4: [f32; 4] = [1.0, 0.0, 2.0 / 3.0, 1.0 / 3.0];
const WEIGHTS3: [f32; 3] = [1.0, 0.0, 0.5];

// The unique opaque colours of a block.
struct ColourSet {
    colours: [[u8; 3]; TEXELS_PER_BLOCK],
    weights: [f32; TEXELS_PER_BLOCK],
    count: usize,
    // The colour for each texel or None for masked and transparent texels.
    remap: [Option<usize>; TEXELS_PER_BLOCK],
    transparent: bool,
}

impl ColourSet {
    fn new(texels: &Texels, mask: u16, is_bc1: bool, weight_by_alpha: bool) -> Self {
        let mut set = Self {
            colours: [[0u8; 3]; TEXELS_PER_BLOCK],
            weights: [0.0; TEXELS_PER_BLOCK],
            count: 0,
            remap: [None; TEXELS_PER_BLOCK],
            transparent: false,
        };

        for i in 0..TEXELS_PER_BLOCK {
            if mask & (1 << i) == 0 {
                continue;
            }

            let [r, g, b, a] = texels[i / BLOCK_WIDTH][i % BLOCK_WIDTH];
            if is_bc1 && a < ALPHA_THRESHOLD {
                set.transparent = true;
                continue;
            }

            let weight = if weight_by_alpha {
                (a as f32 + 1.0) / 256.0
            } else {
                1.0
            };

            let colour = [r, g, b];
            match set.colours[..set.count].iter().position(|c| *c == colour) {
                Some(j) => {
                    set.weights[j] += weight;
                    set.remap[i] = Some(j);
                }
                None => {
                    set.colours[set.count] = colour;
                    set.weights[set.count] = weight;
                    set.remap[i] = Some(set.count);
                    set.count += 1;
                }
            }
        }

        set
    }

    fn point(&self, j: usize) -> [f32; 3] {
        self.colours[j].map(|c| c as f32)
    }
}

// Endpoints along with the palette index for each colour in the set.
struct Fit {
    start: u16,
    end: u16,
    three_colour: bool,
    indices: [u8; TEXELS_PER_BLOCK],
    error: f32,
}

pub fn compress_colour_block(
    texels: &Texels,
    mask: u16,
    format: &Format,
    metric: &Metric,
    is_bc1: bool,
    block: &mut [u8],
) {
    let set = ColourSet::new(texels, mask, is_bc1, format.weight_colour_by_alpha);

    let fit = if set.count == 0 {
        Fit {
            start: 0,
            end: 0,
            three_colour: set.transparent,
            indices: [0; TEXELS_PER_BLOCK],
            error: 0.0,
        }
    } else if set.transparent {
        fit_colours(&set, metric, format.quality, true)
    } else {
        let four = fit_colours(&set, metric, format.quality, false);
        if is_bc1 {
            // Opaque BC1 blocks can still benefit from the midpoint.
            let three = fit_colours(&set, metric, format.quality, true);
            if three.error < four.error {
                three
            } else {
                four
            }
        } else {
            four
        }
    };

    write_colour_block(&set, &fit, block);
}

fn fit_colours(set: &ColourSet, metric: &Metric, quality: Quality, three_colour: bool) -> Fit {
    if set.count == 1 {
        return single_colour_fit(set, metric, three_colour);
    }

    let iterations = match quality {
        Quality::Fast => 0,
        Quality::Normal => 1,
        Quality::Slow => 8,
    };

    let mut best = range_fit(set, metric, three_colour);
    for _ in 0..iterations {
        match least_squares_fit(set, metric, &best) {
            Some(fit) if fit.error < best.error => best = fit,
            _ => break,
        }
    }
    best
}

fn single_colour_fit(set: &ColourSet, metric: &Metric, three_colour: bool) -> Fit {
    let colour = set.colours[0];

    // Find the best endpoints for each channel using either an endpoint directly
    // or the closest interpolated value.
    let mut exact = [0u16; 3];
    let mut exact_error = 0.0;
    let mut interpolated = [(0u16, 0u16); 3];
    let mut interpolated_error = 0.0;
    for c in 0..3 {
        let bits = if c == 1 { 6 } else { 5 };
        let target = colour[c] as i32;
        let weight = metric.0[c] * metric.0[c];

        let mut best_exact = (i32::MAX, 0);
        let mut best_interpolated = (i32::MAX, (0, 0));
        for c0 in 0..1u16 << bits {
            let e0 = expand(c0, bits);
            let diff = (e0 - target).abs();
            if diff < best_exact.0 {
                best_exact = (diff, c0);
            }

            for c1 in 0..1u16 << bits {
                let e1 = expand(c1, bits);
                let value = if three_colour {
                    (e0 + e1 + 1) >> 1
                } else {
                    (2 * e0 + e1 + 1) / 3
                };
                let diff = (value - target).abs();
                if diff < best_interpolated.0 {
                    best_interpolated = (diff, (c0, c1));
                }
            }
        }

        exact[c] = best_exact.1;
        exact_error += weight * (best_exact.0 * best_exact.0) as f32;
        interpolated[c] = best_interpolated.1;
        interpolated_error += weight * (best_interpolated.0 * best_interpolated.0) as f32;
    }

    let (start, end) = if interpolated_error < exact_error {
        (
            pack565(interpolated.map(|p| p.0)),
            pack565(interpolated.map(|p| p.1)),
        )
    } else {
        (pack565(exact), pack565(exact))
    };

    evaluate(set, metric, start, end, three_colour)
}

fn range_fit(set: &ColourSet, metric: &Metric, three_colour: bool) -> Fit {
    let axis = principal_axis(set, metric);

    // Use the colours with the smallest and largest projection as endpoints.
    let mut min = (f32::MAX, 0);
    let mut max = (f32::MIN, 0);
    for j in 0..set.count {
        let point = set.point(j);
        let projection: f32 = (0..3).map(|c| point[c] * metric.0[c] * axis[c]).sum();
        if projection < min.0 {
            min = (projection, j);
        }
        if projection > max.0 {
            max = (projection, j);
        }
    }

    let start = quantize(set.point(max.1));
    let end = quantize(set.point(min.1));
    evaluate(set, metric, start, end, three_colour)
}

// Refine the endpoints for the current indices with weighted least squares.
fn least_squares_fit(set: &ColourSet, metric: &Metric, fit: &Fit) -> Option<Fit> {
    let weights: &[f32] = if fit.three_colour {
        &WEIGHTS3
    } else {
        &WEIGHTS4
    };

    let mut alpha2 = 0.0;
    let mut beta2 = 0.0;
    let mut alpha_beta = 0.0;
    let mut alpha_x = [0.0f32; 3];
    let mut beta_x = [0.0f32; 3];
    for j in 0..set.count {
        let alpha = weights[fit.indices[j] as usize];
        let beta = 1.0 - alpha;
        let w = set.weights[j];
        let point = set.point(j);

        alpha2 += w * alpha * alpha;
        beta2 += w * beta * beta;
        alpha_beta += w * alpha * beta;
        for c in 0..3 {
            alpha_x[c] += w * alpha * point[c];
            beta_x[c] += w * beta * point[c];
        }
    }

    let determinant = alpha2 * beta2 - alpha_beta * alpha_beta;
    if determinant.abs() < f32::EPSILON {
        return None;
    }

    let start: [f32; 3] = std::array::from_fn(|c| {
        ((alpha_x[c] * beta2 - beta_x[c] * alpha_beta) / determinant).clamp(0.0, 255.0)
    });
    let end: [f32; 3] = std::array::from_fn(|c| {
        ((beta_x[c] * alpha2 - alpha_x[c] * alpha_beta) / determinant).clamp(0.0, 255.0)
    });

    Some(evaluate(
        set,
        metric,
        quantize(start),
        quantize(end),
        fit.three_colour,
    ))
}

fn principal_axis(set: &ColourSet, metric: &Metric) -> [f32; 3] {
    let total: f32 = set.weights[..set.count].iter().sum();
    let scaled = |j: usize| {
        let point = set.point(j);
        [
            point[0] * metric.0[0],
            point[1] * metric.0[1],
            point[2] * metric.0[2],
        ]
    };

    let mut mean = [0.0f32; 3];
    for j in 0..set.count {
        let point = scaled(j);
        for c in 0..3 {
            mean[c] += set.weights[j] * point[c] / total;
        }
    }

    let mut covariance = [[0.0f32; 3]; 3];
    for j in 0..set.count {
        let point = scaled(j);
        let d = [point[0] - mean[0], point[1] - mean[1], point[2] - mean[2]];
        for row in 0..3 {
            for col in 0..3 {
                covariance[row][col] += set.weights[j] * d[row] * d[col];
            }
        }
    }

    // Power iteration converges quickly for the dominant eigenvector.
    let mut axis = [1.0f32; 3];
    for _ in 0..8 {
        let next: [f32; 3] = std::array::from_fn(|row| {
            (0..3).map(|col| covariance[row][col] * axis[col]).sum()
        });
        let largest = next.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        if largest <= f32::EPSILON {
            break;
        }
        axis = next.map(|v| v / largest);
    }
    axis
}

// Assign each colour to the closest palette entry.
fn evaluate(set: &ColourSet, metric: &Metric, start: u16, end: u16, three_colour: bool) -> Fit {
    let palette = palette(start, end, three_colour);
    let palette_size = if three_colour { 3 } else { 4 };

    let mut indices = [0u8; TEXELS_PER_BLOCK];
    let mut error = 0.0;
    for j in 0..set.count {
        let colour = set.colours[j];
        let mut best = (f32::MAX, 0);
        for (i, entry) in palette.iter().take(palette_size).enumerate() {
            let distance: f32 = (0..3)
                .map(|c| {
                    let d = metric.0[c] * (entry[c] - colour[c] as i32) as f32;
                    d * d
                })
                .sum();
            if distance < best.0 {
                best = (distance, i);
            }
        }
        indices[j] = best.1 as u8;
        error += set.weights[j] * best.0;
    }

    Fit {
        start,
        end,
        three_colour,
        indices,
        error,
    }
}

// The decoded palette using the same integer arithmetic as hardware decoders.
fn palette(start: u16, end: u16, three_colour: bool) -> [[i32; 3]; 4] {
    let a = unpack565(start);
    let b = unpack565(end);
    if three_colour {
        [
            a,
            b,
            std::array::from_fn(|c| (a[c] + b[c] + 1) >> 1),
            [0; 3],
        ]
    } else {
        [
            a,
            b,
            std::array::from_fn(|c| (2 * a[c] + b[c] + 1) / 3),
            std::array::from_fn(|c| (a[c] + 2 * b[c] + 1) / 3),
        ]
    }
}

fn write_colour_block(set: &ColourSet, fit: &Fit, block: &mut [u8]) {
    // Masked and transparent texels use the transparent index in three colour mode.
    let unmapped = if fit.three_colour { 3 } else { 0 };
    let mut indices: [u8; TEXELS_PER_BLOCK] =
        std::array::from_fn(|i| set.remap[i].map(|j| fit.indices[j]).unwrap_or(unmapped));

    // The endpoint order selects the palette mode when decoding.
    let (mut c0, mut c1) = (fit.start, fit.end);
    if fit.three_colour {
        if c0 > c1 {
            std::mem::swap(&mut c0, &mut c1);
            for index in indices.iter_mut().filter(|i| **i < 2) {
                *index ^= 1;
            }
        }
    } else if c0 < c1 {
        std::mem::swap(&mut c0, &mut c1);
        for index in indices.iter_mut() {
            *index ^= 1;
        }
    } else if c0 == c1 {
        indices = [0; TEXELS_PER_BLOCK];
    }

    let packed = indices
        .iter()
        .enumerate()
        .fold(0u32, |packed, (i, index)| packed | (*index as u32) << (2 * i));

    block[0..2].copy_from_slice(&c0.to_le_bytes());
    block[2..4].copy_from_slice(&c1.to_le_bytes());
    block[4..8].copy_from_slice(&packed.to_le_bytes());
}

pub fn compress_explicit_alpha_block(texels: &Texels, mask: u16, block: &mut [u8]) {
    for (y, row) in texels.iter().enumerate() {
        let mut packed = 0u16;
        for (x, texel) in row.iter().enumerate() {
            if mask & (1 << (y * BLOCK_WIDTH + x)) != 0 {
                let quantized = (texel[3] as u16 * 15 + 127) / 255;
                packed |= quantized << (4 * x);
            }
        }
        block[y * 2..y * 2 + 2].copy_from_slice(&packed.to_le_bytes());
    }
}

/// The eight decoded values for the endpoints `a0` and `a1` of an interpolated block.
pub type Codebook = fn(u8, u8) -> [u8; 8];

pub fn compress_interpolated_block(
    values: &[[u8; BLOCK_WIDTH]; BLOCK_HEIGHT],
    mask: u16,
    codebook: Codebook,
    block: &mut [u8],
) {
    let valid: Vec<(usize, u8)> = values
        .iter()
        .flatten()
        .copied()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .collect();

    // Eight values spanning the full range.
    let min = valid.iter().map(|(_, v)| *v).min().unwrap_or(0);
    let max = valid.iter().map(|(_, v)| *v).max().unwrap_or(0);
    let mut best = fit_alpha(&valid, max, min, codebook);

    // Six values spanning the range without the explicit 0 and 255 values.
    let inner = valid.iter().map(|(_, v)| *v).filter(|v| *v != 0 && *v != 255);
    let min6 = inner.clone().min().unwrap_or(0);
    let max6 = inner.max().unwrap_or(0);
    let fit6 = fit_alpha(&valid, min6, max6, codebook);
    if fit6.3 < best.3 {
        best = fit6;
    }

    let (a0, a1, indices, _) = best;
    let packed = indices
        .iter()
        .enumerate()
        .fold(0u64, |packed, (i, index)| packed | (*index as u64) << (3 * i));

    block[0] = a0;
    block[1] = a1;
    block[2..8].copy_from_slice(&packed.to_le_bytes()[..6]);
}

fn fit_alpha(
    valid: &[(usize, u8)],
    a0: u8,
    a1: u8,
    codebook: Codebook,
) -> (u8, u8, [u8; TEXELS_PER_BLOCK], u32) {
    let codebook = codebook(a0, a1);

    let mut indices = [0u8; TEXELS_PER_BLOCK];
    let mut error = 0;
    for (i, value) in valid {
        let (index, diff) = codebook
            .iter()
            .map(|c| (*c as i32 - *value as i32).unsigned_abs())
            .enumerate()
            .min_by_key(|(_, diff)| *diff)
            .unwrap_or((0, 0));
        indices[*i] = index as u8;
        error += diff * diff;
    }

    (a0, a1, indices, error)
}

// BC3 alpha blocks interpolate with integer division.
pub fn alpha_codebook(a0: u8, a1: u8) -> [u8; 8] {
    let a0 = a0 as u32;
    let a1 = a1 as u32;
    let mut codebook = [a0, a1, 0, 0, 0, 0, 0, 255];
    if a0 > a1 {
        for k in 1..7 {
            codebook[k + 1] = ((7 - k as u32) * a0 + k as u32 * a1 + 1) / 7;
        }
    } else {
        for k in 1..5 {
            codebook[k + 1] = ((5 - k as u32) * a0 + k as u32 * a1 + 1) / 5;
        }
        codebook[6] = 0;
    }
    codebook.map(|c| c as u8)
}

// BC4 and BC5 channels interpolate with rounded 16-bit fixed point weights.
pub fn channel_codebook(a0: u8, a1: u8) -> [u8; 8] {
    const WEIGHTS6: [u32; 6] = [9363, 18724, 28086, 37450, 46812, 56173];
    const WEIGHTS4: [u32; 4] = [13107, 26215, 39321, 52429];

    let a0 = a0 as u32;
    let a1 = a1 as u32;
    let mut codebook = [a0, a1, 0, 0, 0, 0, 0, 255];
    if a0 > a1 {
        for k in 1..7 {
            codebook[k + 1] = (WEIGHTS6[6 - k] * a0 + WEIGHTS6[k - 1] * a1 + 32768) >> 16;
        }
    } else {
        for k in 1..5 {
            codebook[k + 1] = (WEIGHTS4[4 - k] * a0 + WEIGHTS4[k - 1] * a1 + 32768) >> 16;
        }
        codebook[6] = 0;
    }
    codebook.map(|c| c as u8)
}

fn expand(value: u16, bits: u32) -> i32 {
    let value = value as i32;
    if bits == 6 {
        (value * 259 + 33) >> 6
    } else {
        (value * 527 + 23) >> 6
    }
}

fn unpack565(colour: u16) -> [i32; 3] {
    [
        expand((colour >> 11) & 0x1F, 5),
        expand((colour >> 5) & 0x3F, 6),
        expand(colour & 0x1F, 5),
    ]
}

fn pack565(channels: [u16; 3]) -> u16 {
    (channels[0] << 11) | (channels[1] << 5) | channels[2]
}

// Find the closest representable RGB565 colour.
fn quantize(colour: [f32; 3]) -> u16 {
    let channel = |value: f32, bits: u32| {
        let max = (1i32 << bits) - 1;
        let guess = (value.clamp(0.0, 255.0) * max as f32 / 255.0).round() as i32;
        (guess - 1..=guess + 1)
            .filter(|code| (0..=max).contains(code))
            .min_by_key(|code| (expand(*code as u16, bits) - value.round() as i32).abs())
            .unwrap_or(0) as u16
    };
    pack565([
        channel(colour[0], 5),
        channel(colour[1], 6),
        channel(colour[2], 5),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_endpoints() {
        assert_eq!(0, expand(0, 5));
        assert_eq!(255, expand(31, 5));
        assert_eq!(0, expand(0, 6));
        assert_eq!(255, expand(63, 6));
    }

    #[test]
    fn quantize_exact_colours() {
        for code in 0..32u16 {
            let value = expand(code, 5) as f32;
            assert_eq!(pack565([code, 0, 0]), quantize([value, 0.0, 0.0]));
            assert_eq!(pack565([0, 0, code]), quantize([0.0, 0.0, value]));
        }
        for code in 0..64u16 {
            let value = expand(code, 6) as f32;
            assert_eq!(pack565([0, code, 0]), quantize([0.0, value, 0.0]));
        }
    }

    #[test]
    fn alpha_codebook_eight_values() {
        assert_eq!([255, 0, 218, 182, 145, 109, 73, 36], alpha_codebook(255, 0));
    }

    #[test]
    fn channel_codebook_eight_values() {
        assert_eq!([255, 0, 219, 182, 146, 109, 73, 36], channel_codebook(255, 0));
    }

    #[test]
    fn channel_codebook_six_values() {
        assert_eq!([0, 255, 51, 102, 153, 204, 0, 255], channel_codebook(0, 255));
    }

    #[test]
    fn alpha_codebook_six_values() {
        assert_eq!([0, 255, 51, 102, 153, 204, 0, 255], alpha_codebook(0, 255));
    }

    #[test]
    fn explicit_alpha_nibbles() {
        let mut texels = [[[0u8; 4]; 4]; 4];
        texels[0][0][3] = 255;
        texels[0][1][3] = 17;
        texels[3][3][3] = 255;

        let mut block = [0u8; 8];
        compress_explicit_alpha_block(&texels, 0xFFFF, &mut block);
        assert_eq!([0x1F, 0x00, 0, 0, 0, 0, 0x00, 0xF0], block);

        // Masked texels are zeroed.
        compress_explicit_alpha_block(&texels, 0x0001, &mut block);
        assert_eq!([0x0F, 0x00, 0, 0, 0, 0, 0, 0], block);
    }

    #[test]
    fn interpolated_only_zero_and_full() {
        let mut values = [[0u8; 4]; 4];
        values[1][2] = 255;

        let mut block = [0u8; 8];
        compress_interpolated_block(&values, 0xFFFF, alpha_codebook, &mut block);

        let codebook = alpha_codebook(block[0], block[1]);
        let packed = u64::from_le_bytes(block) >> 16;
        for (i, value) in values.iter().flatten().enumerate() {
            let index = (packed >> (3 * i)) & 0x7;
            assert_eq!(*value, codebook[index as usize]);
        }
    }

    #[test]
    fn colour_block_layout() {
        let texels = [[[255u8, 255, 255, 255]; 4]; 4];
        let mut block = [0u8; 8];
        compress_colour_block(
            &texels,
            0xFFFF,
            &Format::default(),
            &Metric::default(),
            true,
            &mut block,
        );
        assert_eq!([0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0], block);
    }

    #[test]
    fn fully_masked_colour_block() {
        let texels = [[[255u8, 255, 255, 255]; 4]; 4];
        let mut block = [0xAAu8; 8];
        compress_colour_block(
            &texels,
            0,
            &Format::default(),
            &Metric::default(),
            true,
            &mut block,
        );
        assert_eq!([0u8; 8], block);
    }

    #[test]
    fn fully_transparent_colour_block() {
        let texels = [[[255u8, 255, 255, 0]; 4]; 4];
        let mut block = [0u8; 8];
        compress_colour_block(
            &texels,
            0xFFFF,
            &Format::default(),
            &Metric::default(),
            true,
            &mut block,
        );
        assert_eq!([0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF], block);
    }
}
