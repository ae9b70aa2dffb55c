//! Reading and writing the DDS container header.
//!
//! The header can be read and written in either byte order.
//! Complete files with magic bytes and block data always use little endian.
use std::io::{Read, Write};

use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::trace;

use crate::{
    error::{Buffer, DdsError},
    required_bytes,
    tile::check_buffer,
    CompressionFormat, Format, Surface,
};

/// The magic bytes at the start of every DDS file.
pub const MAGIC: [u8; 4] = *b"DDS ";

/// The byte order of the header fields.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

bitflags! {
    /// Flags indicating which header fields contain valid data.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
    pub struct HeaderFlags: u32 {
        const CAPS = 0x1;
        const HEIGHT = 0x2;
        const WIDTH = 0x4;
        const PITCH = 0x8;
        const PIXEL_FORMAT = 0x1000;
        const MIPMAP_COUNT = 0x20000;
        const LINEAR_SIZE = 0x80000;
        const DEPTH = 0x800000;
    }
}

bitflags! {
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
    pub struct PixelFormatFlags: u32 {
        const ALPHA_PIXELS = 0x1;
        const ALPHA = 0x2;
        const FOURCC = 0x4;
        const RGB = 0x40;
        const YUV = 0x200;
        const LUMINANCE = 0x20000;
    }
}

bitflags! {
    /// The complexity of the stored surfaces.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
    pub struct SurfaceFlags: u32 {
        const COMPLEX = 0x8;
        const TEXTURE = 0x1000;
        const MIPMAP = 0x400000;
    }
}

bitflags! {
    /// Cube map faces and volume textures.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
    pub struct CubemapFlags: u32 {
        const CUBEMAP = 0x200;
        const POSITIVE_X = 0x400;
        const NEGATIVE_X = 0x800;
        const POSITIVE_Y = 0x1000;
        const NEGATIVE_Y = 0x2000;
        const POSITIVE_Z = 0x4000;
        const NEGATIVE_Z = 0x8000;
        const VOLUME = 0x200000;
    }
}

/// A four character code identifying a compressed format.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct FourCC(pub u32);

impl FourCC {
    pub const DXT1: Self = FourCC(u32::from_le_bytes(*b"DXT1"));
    pub const DXT2: Self = FourCC(u32::from_le_bytes(*b"DXT2"));
    pub const DXT3: Self = FourCC(u32::from_le_bytes(*b"DXT3"));
    pub const DXT4: Self = FourCC(u32::from_le_bytes(*b"DXT4"));
    pub const DXT5: Self = FourCC(u32::from_le_bytes(*b"DXT5"));
    pub const ATI1: Self = FourCC(u32::from_le_bytes(*b"ATI1"));
    pub const BC4U: Self = FourCC(u32::from_le_bytes(*b"BC4U"));
    pub const ATI2: Self = FourCC(u32::from_le_bytes(*b"ATI2"));
    pub const BC5U: Self = FourCC(u32::from_le_bytes(*b"BC5U"));

    /// The characters of the code in file order.
    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl From<CompressionFormat> for FourCC {
    fn from(value: CompressionFormat) -> Self {
        match value {
            CompressionFormat::Bc1 => FourCC::DXT1,
            CompressionFormat::Bc2 => FourCC::DXT3,
            CompressionFormat::Bc3 => FourCC::DXT5,
            CompressionFormat::Bc4 => FourCC::ATI1,
            CompressionFormat::Bc5 => FourCC::ATI2,
        }
    }
}

impl TryFrom<FourCC> for CompressionFormat {
    type Error = DdsError;

    fn try_from(value: FourCC) -> Result<Self, Self::Error> {
        match value {
            FourCC::DXT1 => Ok(CompressionFormat::Bc1),
            FourCC::DXT2 | FourCC::DXT3 => Ok(CompressionFormat::Bc2),
            FourCC::DXT4 | FourCC::DXT5 => Ok(CompressionFormat::Bc3),
            FourCC::ATI1 | FourCC::BC4U => Ok(CompressionFormat::Bc4),
            FourCC::ATI2 | FourCC::BC5U => Ok(CompressionFormat::Bc5),
            _ => Err(DdsError::UnsupportedFourCC(value.to_bytes())),
        }
    }
}

/// The pixel format record embedded in the [Header].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PixelFormat {
    pub size: u32,
    pub flags: PixelFormatFlags,
    pub four_cc: FourCC,
    pub rgb_bit_count: u32,
    pub r_bit_mask: u32,
    pub g_bit_mask: u32,
    pub b_bit_mask: u32,
    pub a_bit_mask: u32,
}

impl PixelFormat {
    /// The size in bytes of the serialized record.
    pub const SIZE: u32 = 8 * 4;

    pub fn from_four_cc(four_cc: FourCC) -> Self {
        Self {
            flags: PixelFormatFlags::FOURCC,
            four_cc,
            ..Default::default()
        }
    }

    fn read<R: Read, B: ByteOrder>(reader: &mut R) -> Result<Self, DdsError> {
        Ok(Self {
            size: reader.read_u32::<B>()?,
            flags: PixelFormatFlags::from_bits_retain(reader.read_u32::<B>()?),
            four_cc: FourCC(reader.read_u32::<B>()?),
            rgb_bit_count: reader.read_u32::<B>()?,
            r_bit_mask: reader.read_u32::<B>()?,
            g_bit_mask: reader.read_u32::<B>()?,
            b_bit_mask: reader.read_u32::<B>()?,
            a_bit_mask: reader.read_u32::<B>()?,
        })
    }

    fn write<W: Write, B: ByteOrder>(&self, writer: &mut W) -> Result<(), DdsError> {
        writer.write_u32::<B>(self.size)?;
        writer.write_u32::<B>(self.flags.bits())?;
        writer.write_u32::<B>(self.four_cc.0)?;
        writer.write_u32::<B>(self.rgb_bit_count)?;
        writer.write_u32::<B>(self.r_bit_mask)?;
        writer.write_u32::<B>(self.g_bit_mask)?;
        writer.write_u32::<B>(self.b_bit_mask)?;
        writer.write_u32::<B>(self.a_bit_mask)?;
        Ok(())
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self {
            size: Self::SIZE,
            flags: PixelFormatFlags::empty(),
            four_cc: FourCC::default(),
            rgb_bit_count: 0,
            r_bit_mask: 0,
            g_bit_mask: 0,
            b_bit_mask: 0,
            a_bit_mask: 0,
        }
    }
}

/// The fixed layout DDS header without the magic bytes.
///
/// Fields are stored as read, so headers with unknown flags or
/// an unexpected `size` are preserved when writing.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Header {
    pub size: u32,
    pub flags: HeaderFlags,
    pub height: i32,
    pub width: i32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mipmap_count: u32,
    pub reserved1: [u8; 44],
    pub pixel_format: PixelFormat,
    pub surface_flags: SurfaceFlags,
    pub cubemap_flags: CubemapFlags,
    pub reserved2: [u8; 12],
}

impl Default for Header {
    fn default() -> Self {
        Self {
            size: Self::SIZE,
            flags: HeaderFlags::empty(),
            height: 0,
            width: 0,
            pitch_or_linear_size: 0,
            depth: 0,
            mipmap_count: 0,
            reserved1: [0; 44],
            pixel_format: PixelFormat::default(),
            surface_flags: SurfaceFlags::empty(),
            cubemap_flags: CubemapFlags::empty(),
            reserved2: [0; 12],
        }
    }
}

impl Header {
    /// The size in bytes of the serialized header.
    pub const SIZE: u32 = 18 * 4 + PixelFormat::SIZE + 5 * 4;

    /// The expected value of [size](#structfield.size) computed from the layout.
    ///
    /// This does not depend on the stored `size`.
    pub fn size_field(&self) -> u32 {
        Self::SIZE
    }

    /// Read the header fields in the given byte order.
    ///
    /// Returns [DdsError::TruncatedStream] if the reader ends before the end of the header.
    pub fn read<R: Read>(reader: &mut R, endian: Endian) -> Result<Self, DdsError> {
        let header = match endian {
            Endian::Little => Self::read_inner::<R, LittleEndian>(reader)?,
            Endian::Big => Self::read_inner::<R, BigEndian>(reader)?,
        };
        trace!("Read {endian:?} header: {header:?}");
        Ok(header)
    }

    fn read_inner<R: Read, B: ByteOrder>(reader: &mut R) -> Result<Self, DdsError> {
        let size = reader.read_u32::<B>()?;
        let flags = HeaderFlags::from_bits_retain(reader.read_u32::<B>()?);
        let height = reader.read_i32::<B>()?;
        let width = reader.read_i32::<B>()?;
        let pitch_or_linear_size = reader.read_u32::<B>()?;
        let depth = reader.read_u32::<B>()?;
        let mipmap_count = reader.read_u32::<B>()?;

        let mut reserved1 = [0u8; 44];
        reader.read_exact(&mut reserved1)?;

        let pixel_format = PixelFormat::read::<R, B>(reader)?;
        let surface_flags = SurfaceFlags::from_bits_retain(reader.read_u32::<B>()?);
        let cubemap_flags = CubemapFlags::from_bits_retain(reader.read_u32::<B>()?);

        let mut reserved2 = [0u8; 12];
        reader.read_exact(&mut reserved2)?;

        Ok(Self {
            size,
            flags,
            height,
            width,
            pitch_or_linear_size,
            depth,
            mipmap_count,
            reserved1,
            pixel_format,
            surface_flags,
            cubemap_flags,
            reserved2,
        })
    }

    /// Write the header fields in the given byte order.
    ///
    /// The stored [size](#structfield.size) is written unchanged.
    pub fn write<W: Write>(&self, writer: &mut W, endian: Endian) -> Result<(), DdsError> {
        trace!("Write {endian:?} header: {self:?}");
        match endian {
            Endian::Little => self.write_inner::<W, LittleEndian>(writer),
            Endian::Big => self.write_inner::<W, BigEndian>(writer),
        }
    }

    fn write_inner<W: Write, B: ByteOrder>(&self, writer: &mut W) -> Result<(), DdsError> {
        writer.write_u32::<B>(self.size)?;
        writer.write_u32::<B>(self.flags.bits())?;
        writer.write_i32::<B>(self.height)?;
        writer.write_i32::<B>(self.width)?;
        writer.write_u32::<B>(self.pitch_or_linear_size)?;
        writer.write_u32::<B>(self.depth)?;
        writer.write_u32::<B>(self.mipmap_count)?;
        writer.write_all(&self.reserved1)?;
        self.pixel_format.write::<W, B>(writer)?;
        writer.write_u32::<B>(self.surface_flags.bits())?;
        writer.write_u32::<B>(self.cubemap_flags.bits())?;
        writer.write_all(&self.reserved2)?;
        Ok(())
    }
}

/// A DDS file with a single compressed surface.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Dds {
    pub header: Header,
    /// The bytes following the header.
    pub data: Vec<u8>,
}

impl Dds {
    /// Create a DDS file for the base level of a compressed surface.
    pub fn from_surface<T: AsRef<[u8]>>(surface: &Surface<T>) -> Result<Self, DdsError> {
        let invalid_dimensions = || DdsError::InvalidDimensions {
            width: surface.width as i64,
            height: surface.height as i64,
        };
        let width = i32::try_from(surface.width).map_err(|_| invalid_dimensions())?;
        let height = i32::try_from(surface.height).map_err(|_| invalid_dimensions())?;

        let compression = surface.format.compression;
        let linear_size = required_bytes(surface.width, surface.height, compression);
        let data = surface.data.as_ref();
        check_buffer(Buffer::Blocks, linear_size, data.len())?;

        let header = Header {
            flags: HeaderFlags::CAPS
                | HeaderFlags::HEIGHT
                | HeaderFlags::WIDTH
                | HeaderFlags::PIXEL_FORMAT
                | HeaderFlags::MIPMAP_COUNT
                | HeaderFlags::LINEAR_SIZE,
            height,
            width,
            pitch_or_linear_size: u32::try_from(linear_size).map_err(|_| invalid_dimensions())?,
            mipmap_count: 1,
            pixel_format: PixelFormat::from_four_cc(compression.into()),
            surface_flags: SurfaceFlags::TEXTURE,
            ..Default::default()
        };

        Ok(Self {
            header,
            data: data[..linear_size].to_vec(),
        })
    }

    /// The compressed base level of the file.
    ///
    /// The format is determined by the four character code.
    pub fn surface(&self) -> Result<Surface<&[u8]>, DdsError> {
        let pixel_format = &self.header.pixel_format;
        if !pixel_format.flags.contains(PixelFormatFlags::FOURCC) {
            return Err(DdsError::UnsupportedFourCC(pixel_format.four_cc.to_bytes()));
        }
        let compression = CompressionFormat::try_from(pixel_format.four_cc)?;

        let (width, height) = match (
            u32::try_from(self.header.width),
            u32::try_from(self.header.height),
        ) {
            (Ok(width), Ok(height)) => (width, height),
            _ => {
                return Err(DdsError::InvalidDimensions {
                    width: self.header.width as i64,
                    height: self.header.height as i64,
                })
            }
        };

        check_buffer(
            Buffer::Blocks,
            required_bytes(width, height, compression),
            self.data.len(),
        )?;

        Ok(Surface {
            width,
            height,
            format: Format::new(compression),
            data: &self.data,
        })
    }

    /// Read a little endian DDS file starting with the magic bytes.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, DdsError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(DdsError::InvalidMagic(magic));
        }

        let header = Header::read(reader, Endian::Little)?;

        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        Ok(Self { header, data })
    }

    /// Write a little endian DDS file starting with the magic bytes.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), DdsError> {
        writer.write_all(&MAGIC)?;
        self.header.write(writer, Endian::Little)?;
        writer.write_all(&self.data)?;
        Ok(())
    }
}
