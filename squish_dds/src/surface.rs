use crate::Format;

/// A compressed surface with a format known at runtime.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Surface<T> {
    /// The width of the surface in pixels.
    pub width: u32,
    /// The height of the surface in pixels.
    pub height: u32,
    /// The format of the blocks in [data](#structfield.data).
    pub format: Format,
    /// The compressed blocks in row-major order.
    ///
    /// Partial blocks on the right and bottom edges still use an entire block.
    pub data: T,
}

/// An uncompressed RGBA8 surface with 4 bytes per pixel.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceRgba8<T> {
    /// The width of the surface in pixels.
    pub width: u32,
    /// The height of the surface in pixels.
    pub height: u32,
    /// The tightly packed RGBA pixels in row-major order.
    pub data: T,
}

#[cfg(feature = "image")]
impl<'a> SurfaceRgba8<&'a [u8]> {
    /// Borrow the pixels of `image` without copying.
    pub fn from_image(image: &'a image::RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            data: image.as_raw(),
        }
    }
}

#[cfg(feature = "image")]
impl SurfaceRgba8<Vec<u8>> {
    /// Create an image from the surface data.
    pub fn into_image(self) -> Result<image::RgbaImage, crate::SurfaceError> {
        let expected = self.width as usize * self.height as usize * 4;
        let actual = self.data.len();
        image::RgbaImage::from_raw(self.width, self.height, self.data).ok_or(
            crate::SurfaceError::OutOfRange {
                buffer: crate::Buffer::Pixels,
                expected,
                actual,
            },
        )
    }
}

#[cfg(all(test, feature = "image"))]
mod tests {
    use super::*;
    use crate::CompressionFormat;

    #[test]
    fn image_round_trip() {
        let image = image::RgbaImage::from_pixel(6, 5, image::Rgba([132, 65, 206, 255]));

        let surface = SurfaceRgba8::from_image(&image)
            .encode(Format::new(CompressionFormat::Bc1), None)
            .unwrap();
        assert_eq!(6, surface.width);
        assert_eq!(5, surface.height);

        let decoded = surface.decode_rgba8().unwrap().into_image().unwrap();
        assert_eq!(image, decoded);
    }

    #[test]
    fn into_image_not_enough_data() {
        let surface = SurfaceRgba8 {
            width: 2,
            height: 2,
            data: vec![0u8; 15],
        };
        assert!(matches!(
            surface.into_image(),
            Err(crate::SurfaceError::OutOfRange {
                buffer: crate::Buffer::Pixels,
                expected: 16,
                actual: 15
            })
        ));
    }
}
