// DirectDraw Surface loader
//
// Handles the legacy header (FourCC and bit-mask pixel formats) and the
// DX10 extension header, mip chains, cube maps, texture arrays and volume
// textures. Pixel data is copied as-is; block-compressed formats stay compressed.

use ash::vk;
use std::path::Path;

use super::{read_file, ResTexture, Result, Surface, TextureDimension, TextureError};

const MAGIC: &[u8; 4] = b"DDS ";
const HEADER_SIZE: usize = 124;
const DX10_HEADER_SIZE: usize = 20;

// Header flags
const DDSD_HEIGHT: u32 = 0x0000_0002;
const DDSD_WIDTH: u32 = 0x0000_0004;
const DDSD_PIXELFORMAT: u32 = 0x0000_1000;
const DDSD_MIPMAPCOUNT: u32 = 0x0002_0000;
const DDSD_DEPTH: u32 = 0x0080_0000;

// Pixel format flags
const DDPF_ALPHA: u32 = 0x0000_0002;
const DDPF_FOURCC: u32 = 0x0000_0004;
const DDPF_RGB: u32 = 0x0000_0040;
const DDPF_LUMINANCE: u32 = 0x0002_0000;

const DDSCAPS_COMPLEX: u32 = 0x0000_0008;

const DDSCAPS2_CUBEMAP: u32 = 0x0000_0200;
const DDSCAPS2_CUBEMAP_ALL_FACES: u32 = 0x0000_FC00;
const DDSCAPS2_VOLUME: u32 = 0x0040_0000;

const RESOURCE_DIMENSION_TEXTURE1D: u32 = 2;
const RESOURCE_DIMENSION_TEXTURE2D: u32 = 3;
const RESOURCE_DIMENSION_TEXTURE3D: u32 = 4;
const RESOURCE_MISC_TEXTURECUBE: u32 = 0x4;

const fn fourcc(code: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*code)
}

const FOURCC_DXT1: u32 = fourcc(b"DXT1");
const FOURCC_DXT2: u32 = fourcc(b"DXT2");
const FOURCC_DXT3: u32 = fourcc(b"DXT3");
const FOURCC_DXT4: u32 = fourcc(b"DXT4");
const FOURCC_DXT5: u32 = fourcc(b"DXT5");
const FOURCC_ATI1: u32 = fourcc(b"ATI1");
const FOURCC_ATI2: u32 = fourcc(b"ATI2");
const FOURCC_BC4U: u32 = fourcc(b"BC4U");
const FOURCC_BC4S: u32 = fourcc(b"BC4S");
const FOURCC_BC5U: u32 = fourcc(b"BC5U");
const FOURCC_BC5S: u32 = fourcc(b"BC5S");
const FOURCC_DX10: u32 = fourcc(b"DX10");
const FOURCC_RGBG: u32 = fourcc(b"RGBG");
const FOURCC_GRGB: u32 = fourcc(b"GRGB");
const FOURCC_YUY2: u32 = fourcc(b"YUY2");
// D3DFORMAT values stored directly in the FourCC field
const FOURCC_A16B16G16R16: u32 = 0x24;
const FOURCC_Q16W16V16U16: u32 = 0x6e;
const FOURCC_R16F: u32 = 0x6f;
const FOURCC_G16R16F: u32 = 0x70;
const FOURCC_A16B16G16R16F: u32 = 0x71;
const FOURCC_R32F: u32 = 0x72;
const FOURCC_G32R32F: u32 = 0x73;
const FOURCC_A32B32G32R32F: u32 = 0x74;

/// DXGI_FORMAT codes this loader understands
mod dxgi {
    pub const R32G32B32A32_FLOAT: u32 = 2;
    pub const R16G16B16A16_FLOAT: u32 = 10;
    pub const R16G16B16A16_UNORM: u32 = 11;
    pub const R32G32_FLOAT: u32 = 16;
    pub const R10G10B10A2_UNORM: u32 = 24;
    pub const R8G8B8A8_UNORM: u32 = 28;
    pub const R8G8B8A8_UNORM_SRGB: u32 = 29;
    pub const R16G16_FLOAT: u32 = 34;
    pub const R16G16_UNORM: u32 = 35;
    pub const R32_FLOAT: u32 = 41;
    pub const R8G8_UNORM: u32 = 49;
    pub const R16_FLOAT: u32 = 54;
    pub const R16_UNORM: u32 = 56;
    pub const R8_UNORM: u32 = 63;
    pub const A8_UNORM: u32 = 65;
    pub const R8G8_B8G8_UNORM: u32 = 68;
    pub const G8R8_G8B8_UNORM: u32 = 69;
    pub const BC1_UNORM: u32 = 71;
    pub const BC1_UNORM_SRGB: u32 = 72;
    pub const BC2_UNORM: u32 = 74;
    pub const BC2_UNORM_SRGB: u32 = 75;
    pub const BC3_UNORM: u32 = 77;
    pub const BC3_UNORM_SRGB: u32 = 78;
    pub const BC4_UNORM: u32 = 80;
    pub const BC4_SNORM: u32 = 81;
    pub const BC5_UNORM: u32 = 83;
    pub const BC5_SNORM: u32 = 84;
    pub const B5G6R5_UNORM: u32 = 85;
    pub const B5G5R5A1_UNORM: u32 = 86;
    pub const B8G8R8A8_UNORM: u32 = 87;
    pub const B8G8R8X8_UNORM: u32 = 88;
    pub const B8G8R8A8_UNORM_SRGB: u32 = 91;
    pub const BC6H_UF16: u32 = 95;
    pub const BC6H_SF16: u32 = 96;
    pub const BC7_UNORM: u32 = 98;
    pub const BC7_UNORM_SRGB: u32 = 99;
    pub const YUY2: u32 = 107;
    pub const B4G4R4A4_UNORM: u32 = 115;
}

/// How rows of a format are laid out in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// 4x4 blocks of the given byte size
    Block(u32),
    /// Two pixels share one 4 byte group
    Packed,
    /// Plain pixels of the given bit size
    Bits(u32),
}

struct FormatInfo {
    dxgi: u32,
    format: vk::Format,
    layout: Layout,
}

const fn info(dxgi: u32, format: vk::Format, layout: Layout) -> FormatInfo {
    FormatInfo { dxgi, format, layout }
}

const FORMATS: &[FormatInfo] = &[
    info(dxgi::R32G32B32A32_FLOAT, vk::Format::R32G32B32A32_SFLOAT, Layout::Bits(128)),
    info(dxgi::R16G16B16A16_FLOAT, vk::Format::R16G16B16A16_SFLOAT, Layout::Bits(64)),
    info(dxgi::R16G16B16A16_UNORM, vk::Format::R16G16B16A16_UNORM, Layout::Bits(64)),
    info(dxgi::R32G32_FLOAT, vk::Format::R32G32_SFLOAT, Layout::Bits(64)),
    info(dxgi::R10G10B10A2_UNORM, vk::Format::A2B10G10R10_UNORM_PACK32, Layout::Bits(32)),
    info(dxgi::R8G8B8A8_UNORM, vk::Format::R8G8B8A8_UNORM, Layout::Bits(32)),
    info(dxgi::R8G8B8A8_UNORM_SRGB, vk::Format::R8G8B8A8_SRGB, Layout::Bits(32)),
    info(dxgi::R16G16_FLOAT, vk::Format::R16G16_SFLOAT, Layout::Bits(32)),
    info(dxgi::R16G16_UNORM, vk::Format::R16G16_UNORM, Layout::Bits(32)),
    info(dxgi::R32_FLOAT, vk::Format::R32_SFLOAT, Layout::Bits(32)),
    info(dxgi::B8G8R8A8_UNORM, vk::Format::B8G8R8A8_UNORM, Layout::Bits(32)),
    info(dxgi::B8G8R8X8_UNORM, vk::Format::B8G8R8A8_UNORM, Layout::Bits(32)),
    info(dxgi::B8G8R8A8_UNORM_SRGB, vk::Format::B8G8R8A8_SRGB, Layout::Bits(32)),
    info(dxgi::R8G8_UNORM, vk::Format::R8G8_UNORM, Layout::Bits(16)),
    info(dxgi::R16_FLOAT, vk::Format::R16_SFLOAT, Layout::Bits(16)),
    info(dxgi::R16_UNORM, vk::Format::R16_UNORM, Layout::Bits(16)),
    info(dxgi::B5G6R5_UNORM, vk::Format::R5G6B5_UNORM_PACK16, Layout::Bits(16)),
    info(dxgi::B5G5R5A1_UNORM, vk::Format::A1R5G5B5_UNORM_PACK16, Layout::Bits(16)),
    info(dxgi::B4G4R4A4_UNORM, vk::Format::A4R4G4B4_UNORM_PACK16, Layout::Bits(16)),
    info(dxgi::R8_UNORM, vk::Format::R8_UNORM, Layout::Bits(8)),
    info(dxgi::A8_UNORM, vk::Format::R8_UNORM, Layout::Bits(8)),
    info(dxgi::R8G8_B8G8_UNORM, vk::Format::B8G8R8G8_422_UNORM, Layout::Packed),
    info(dxgi::G8R8_G8B8_UNORM, vk::Format::G8B8G8R8_422_UNORM, Layout::Packed),
    info(dxgi::YUY2, vk::Format::G8B8G8R8_422_UNORM, Layout::Packed),
    info(dxgi::BC1_UNORM, vk::Format::BC1_RGBA_UNORM_BLOCK, Layout::Block(8)),
    info(dxgi::BC1_UNORM_SRGB, vk::Format::BC1_RGBA_SRGB_BLOCK, Layout::Block(8)),
    info(dxgi::BC4_UNORM, vk::Format::BC4_UNORM_BLOCK, Layout::Block(8)),
    info(dxgi::BC4_SNORM, vk::Format::BC4_SNORM_BLOCK, Layout::Block(8)),
    info(dxgi::BC2_UNORM, vk::Format::BC2_UNORM_BLOCK, Layout::Block(16)),
    info(dxgi::BC2_UNORM_SRGB, vk::Format::BC2_SRGB_BLOCK, Layout::Block(16)),
    info(dxgi::BC3_UNORM, vk::Format::BC3_UNORM_BLOCK, Layout::Block(16)),
    info(dxgi::BC3_UNORM_SRGB, vk::Format::BC3_SRGB_BLOCK, Layout::Block(16)),
    info(dxgi::BC5_UNORM, vk::Format::BC5_UNORM_BLOCK, Layout::Block(16)),
    info(dxgi::BC5_SNORM, vk::Format::BC5_SNORM_BLOCK, Layout::Block(16)),
    info(dxgi::BC6H_UF16, vk::Format::BC6H_UFLOAT_BLOCK, Layout::Block(16)),
    info(dxgi::BC6H_SF16, vk::Format::BC6H_SFLOAT_BLOCK, Layout::Block(16)),
    info(dxgi::BC7_UNORM, vk::Format::BC7_UNORM_BLOCK, Layout::Block(16)),
    info(dxgi::BC7_UNORM_SRGB, vk::Format::BC7_SRGB_BLOCK, Layout::Block(16)),
];

fn format_info(dxgi: u32) -> Option<&'static FormatInfo> {
    FORMATS.iter().find(|info| info.dxgi == dxgi)
}

/// Byte sizes of one surface: `(num_bytes, row_bytes, num_rows)`.
/// `None` when a pitch does not fit in 32 bits.
fn surface_info(width: u32, height: u32, layout: Layout) -> Option<(u32, u32, u32)> {
    let (row_bytes, num_rows) = match layout {
        Layout::Block(block_bytes) => {
            let blocks_wide = width.div_ceil(4);
            let blocks_high = height.div_ceil(4);
            (blocks_wide.checked_mul(block_bytes)?, blocks_high)
        }
        Layout::Packed => (width.div_ceil(2).checked_mul(4)?, height),
        Layout::Bits(bpp) => (width.checked_mul(bpp)?.div_ceil(8), height),
    };
    Some((row_bytes.checked_mul(num_rows)?, row_bytes, num_rows))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let word = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
}

/// The parts of DDS_HEADER the loader looks at
struct Header {
    flags: u32,
    height: u32,
    width: u32,
    depth: u32,
    mip_count: u32,
    pf_flags: u32,
    fourcc: u32,
    bit_count: u32,
    masks: [u32; 4],
    caps: u32,
    caps2: u32,
}

impl Header {
    fn parse(bytes: &[u8]) -> Option<Self> {
        let field = |offset: usize| read_u32(bytes, offset);
        Some(Self {
            flags: field(4)?,
            height: field(8)?,
            width: field(12)?,
            depth: field(20)?,
            mip_count: field(24)?,
            pf_flags: field(76)?,
            fourcc: field(80)?,
            bit_count: field(84)?,
            masks: [field(88)?, field(92)?, field(96)?, field(100)?],
            caps: field(104)?,
            caps2: field(108)?,
        })
    }

    fn has_masks(&self, r: u32, g: u32, b: u32, a: u32) -> bool {
        self.masks == [r, g, b, a]
    }

    /// Format implied by the legacy pixel format block (DX10 is handled separately)
    fn legacy_format(&self) -> Option<u32> {
        if self.pf_flags & DDPF_FOURCC != 0 {
            return match self.fourcc {
                FOURCC_DXT1 => Some(dxgi::BC1_UNORM),
                FOURCC_DXT2 | FOURCC_DXT3 => Some(dxgi::BC2_UNORM),
                FOURCC_DXT4 | FOURCC_DXT5 => Some(dxgi::BC3_UNORM),
                FOURCC_ATI1 | FOURCC_BC4U => Some(dxgi::BC4_UNORM),
                FOURCC_BC4S => Some(dxgi::BC4_SNORM),
                FOURCC_ATI2 | FOURCC_BC5U => Some(dxgi::BC5_UNORM),
                FOURCC_BC5S => Some(dxgi::BC5_SNORM),
                FOURCC_RGBG => Some(dxgi::R8G8_B8G8_UNORM),
                FOURCC_GRGB => Some(dxgi::G8R8_G8B8_UNORM),
                FOURCC_YUY2 => Some(dxgi::YUY2),
                FOURCC_A16B16G16R16 | FOURCC_Q16W16V16U16 => Some(dxgi::R16G16B16A16_UNORM),
                FOURCC_R16F => Some(dxgi::R16_FLOAT),
                FOURCC_G16R16F => Some(dxgi::R16G16_FLOAT),
                FOURCC_A16B16G16R16F => Some(dxgi::R16G16B16A16_FLOAT),
                FOURCC_R32F => Some(dxgi::R32_FLOAT),
                FOURCC_G32R32F => Some(dxgi::R32G32_FLOAT),
                FOURCC_A32B32G32R32F => Some(dxgi::R32G32B32A32_FLOAT),
                _ => None,
            };
        }

        if self.pf_flags & DDPF_RGB != 0 {
            return match self.bit_count {
                32 if self.has_masks(0x0000_00ff, 0x0000_ff00, 0x00ff_0000, 0xff00_0000) => {
                    Some(dxgi::R8G8B8A8_UNORM)
                }
                32 if self.has_masks(0x00ff_0000, 0x0000_ff00, 0x0000_00ff, 0xff00_0000) => {
                    Some(dxgi::B8G8R8A8_UNORM)
                }
                32 if self.has_masks(0x00ff_0000, 0x0000_ff00, 0x0000_00ff, 0) => {
                    Some(dxgi::B8G8R8X8_UNORM)
                }
                32 if self.has_masks(0x3ff0_0000, 0x000f_fc00, 0x0000_03ff, 0xc000_0000) => {
                    Some(dxgi::R10G10B10A2_UNORM)
                }
                32 if self.has_masks(0x0000_ffff, 0xffff_0000, 0, 0) => Some(dxgi::R16G16_UNORM),
                32 if self.has_masks(0xffff_ffff, 0, 0, 0) => Some(dxgi::R32_FLOAT),
                16 if self.has_masks(0x7c00, 0x03e0, 0x001f, 0x8000) => {
                    Some(dxgi::B5G5R5A1_UNORM)
                }
                16 if self.has_masks(0xf800, 0x07e0, 0x001f, 0) => Some(dxgi::B5G6R5_UNORM),
                16 if self.has_masks(0x0f00, 0x00f0, 0x000f, 0xf000) => {
                    Some(dxgi::B4G4R4A4_UNORM)
                }
                // 24-bit RGB has no GPU equivalent
                _ => None,
            };
        }

        if self.pf_flags & DDPF_LUMINANCE != 0 {
            return match self.bit_count {
                8 if self.has_masks(0xff, 0, 0, 0) => Some(dxgi::R8_UNORM),
                16 if self.has_masks(0xffff, 0, 0, 0) => Some(dxgi::R16_UNORM),
                16 if self.has_masks(0xff, 0, 0, 0xff00) => Some(dxgi::R8G8_UNORM),
                _ => None,
            };
        }

        if self.pf_flags & DDPF_ALPHA != 0 && self.bit_count == 8 {
            return Some(dxgi::A8_UNORM);
        }

        None
    }
}

/// Read and parse a .dds file
pub fn load_dds(path: impl AsRef<Path>) -> Result<ResTexture> {
    let path = path.as_ref();
    let bytes = read_file(path)?;
    parse_dds(&bytes).inspect_err(|e| log::error!("Failed to load {:?}: {}", path, e))
}

/// Parse an in-memory DDS file
pub fn parse_dds(bytes: &[u8]) -> Result<ResTexture> {
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return Err(TextureError::InvalidDds("missing 'DDS ' signature"));
    }
    let header_bytes = bytes
        .get(MAGIC.len()..MAGIC.len() + HEADER_SIZE)
        .ok_or(TextureError::InvalidDds("header is truncated"))?;
    let header = Header::parse(header_bytes).ok_or(TextureError::InvalidDds("header is truncated"))?;
    let mut data_offset = MAGIC.len() + HEADER_SIZE;

    let width = if header.flags & DDSD_WIDTH != 0 { header.width } else { 0 };
    let height = if header.flags & DDSD_HEIGHT != 0 { header.height } else { 0 };
    let depth = if header.flags & DDSD_DEPTH != 0 { header.depth } else { 0 };
    let mip_levels = if header.flags & DDSD_MIPMAPCOUNT != 0 {
        header.mip_count.max(1)
    } else {
        1
    };
    if width == 0 || height == 0 {
        return Err(TextureError::InvalidDds("width and height are required"));
    }

    let mut surface_count = 1;
    let mut is_cube = false;
    let mut is_volume = false;
    if header.caps & DDSCAPS_COMPLEX != 0 {
        if header.caps2 & DDSCAPS2_CUBEMAP != 0 {
            if header.caps2 & DDSCAPS2_CUBEMAP_ALL_FACES != DDSCAPS2_CUBEMAP_ALL_FACES {
                return Err(TextureError::InvalidDds("partial cube maps are not supported"));
            }
            surface_count = 6;
            is_cube = true;
        } else if header.caps2 & DDSCAPS2_VOLUME != 0 {
            is_volume = true;
        }
    }

    if header.flags & DDSD_PIXELFORMAT == 0 {
        return Err(TextureError::InvalidDds("pixel format is missing"));
    }

    let dxgi_format = if header.pf_flags & DDPF_FOURCC != 0 && header.fourcc == FOURCC_DX10 {
        let ext = bytes
            .get(data_offset..data_offset + DX10_HEADER_SIZE)
            .ok_or(TextureError::InvalidDds("DX10 header is truncated"))?;
        data_offset += DX10_HEADER_SIZE;

        let format = read_u32(ext, 0).unwrap_or_default();
        let resource_dimension = read_u32(ext, 4).unwrap_or_default();
        let misc_flag = read_u32(ext, 8).unwrap_or_default();
        let array_size = read_u32(ext, 12).unwrap_or_default();
        if array_size == 0 {
            return Err(TextureError::InvalidDds("array size must be at least 1"));
        }
        surface_count = array_size;

        match resource_dimension {
            RESOURCE_DIMENSION_TEXTURE1D if height != 1 => {
                return Err(TextureError::InvalidDds("1D texture height must be 1"));
            }
            RESOURCE_DIMENSION_TEXTURE1D => {}
            RESOURCE_DIMENSION_TEXTURE2D => {
                if misc_flag & RESOURCE_MISC_TEXTURECUBE != 0 {
                    surface_count = array_size
                        .checked_mul(6)
                        .ok_or(TextureError::InvalidDds("array size is out of range"))?;
                    is_cube = true;
                }
            }
            RESOURCE_DIMENSION_TEXTURE3D => {
                if !is_volume {
                    return Err(TextureError::InvalidDds("3D texture without the volume flag"));
                }
                if array_size > 1 {
                    return Err(TextureError::InvalidDds("3D texture arrays are not supported"));
                }
            }
            _ => return Err(TextureError::InvalidDds("unknown resource dimension")),
        }
        format
    } else {
        header.legacy_format().ok_or_else(|| {
            TextureError::UnsupportedFormat(format!(
                "flags {:#x}, fourcc {:#x}, {} bpp",
                header.pf_flags, header.fourcc, header.bit_count
            ))
        })?
    };

    let info = format_info(dxgi_format)
        .ok_or_else(|| TextureError::UnsupportedFormat(format!("DXGI format {}", dxgi_format)))?;

    let data = &bytes[data_offset..];
    let surface_total = surface_count
        .checked_mul(mip_levels)
        .ok_or(TextureError::InvalidDds("surface count is out of range"))?;
    // Every surface holds at least one byte
    if surface_total as usize > data.len() {
        return Err(TextureError::InvalidDds("pixel data is truncated"));
    }

    let mut offset = 0usize;
    let mut surfaces = Vec::with_capacity(surface_total as usize);
    for _ in 0..surface_count {
        let (mut w, mut h, mut d) = (width, height, depth.max(1));
        for _ in 0..mip_levels {
            let (num_bytes, row_bytes, _) = surface_info(w, h, info.layout)
                .ok_or(TextureError::InvalidDds("surface size is out of range"))?;
            let slices = if is_volume { d as usize } else { 1 };
            let end = (num_bytes as usize)
                .checked_mul(slices)
                .and_then(|len| offset.checked_add(len))
                .ok_or(TextureError::InvalidDds("surface size is out of range"))?;
            let pixels = data
                .get(offset..end)
                .ok_or(TextureError::InvalidDds("pixel data is truncated"))?;

            surfaces.push(Surface {
                width: w,
                height: h,
                row_pitch: row_bytes,
                slice_pitch: num_bytes,
                pixels: pixels.to_vec(),
            });

            offset = end;
            w = (w >> 1).max(1);
            h = (h >> 1).max(1);
            d = (d >> 1).max(1);
        }
    }

    let dimension = if is_cube {
        TextureDimension::Cube
    } else if is_volume {
        TextureDimension::ThreeD
    } else if height != 1 {
        TextureDimension::TwoD
    } else {
        TextureDimension::OneD
    };

    Ok(ResTexture {
        dimension,
        width,
        height,
        depth_or_array_size: if is_volume { depth.max(1) } else { surface_count },
        format: info.format,
        mip_levels,
        surfaces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct HeaderDesc {
        width: u32,
        height: u32,
        depth: u32,
        mips: u32,
        pf_flags: u32,
        fourcc: u32,
        bit_count: u32,
        masks: [u32; 4],
        caps: u32,
        caps2: u32,
    }

    fn dds(desc: &HeaderDesc, extra: &[u32], payload_len: usize) -> Vec<u8> {
        let mut flags = DDSD_WIDTH | DDSD_HEIGHT | DDSD_PIXELFORMAT;
        if desc.mips > 0 {
            flags |= DDSD_MIPMAPCOUNT;
        }
        if desc.depth > 0 {
            flags |= DDSD_DEPTH;
        }

        let mut header = [0u32; HEADER_SIZE / 4];
        header[0] = HEADER_SIZE as u32;
        header[1] = flags;
        header[2] = desc.height;
        header[3] = desc.width;
        header[5] = desc.depth;
        header[6] = desc.mips;
        header[18] = 32;
        header[19] = desc.pf_flags;
        header[20] = desc.fourcc;
        header[21] = desc.bit_count;
        header[22..26].copy_from_slice(&desc.masks);
        header[26] = desc.caps;
        header[27] = desc.caps2;

        let mut bytes = MAGIC.to_vec();
        for word in header.iter().chain(extra) {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.extend((0..payload_len).map(|i| i as u8));
        bytes
    }

    #[test]
    fn bc1_mip_chain() {
        let desc = HeaderDesc {
            width: 4,
            height: 4,
            mips: 3,
            pf_flags: DDPF_FOURCC,
            fourcc: FOURCC_DXT1,
            ..Default::default()
        };
        let texture = parse_dds(&dds(&desc, &[], 24)).unwrap();
        assert_eq!(texture.format, vk::Format::BC1_RGBA_UNORM_BLOCK);
        assert_eq!(texture.dimension, TextureDimension::TwoD);
        assert_eq!(texture.mip_levels, 3);
        assert_eq!(texture.surfaces.len(), 3);
        // 4x4, 2x2 and 1x1 all occupy one 8 byte block
        for (surface, size) in texture.surfaces.iter().zip([4, 2, 1]) {
            assert_eq!(surface.width, size);
            assert_eq!(surface.row_pitch, 8);
            assert_eq!(surface.pixels.len(), 8);
        }
        assert_eq!(texture.surfaces[2].pixels[0], 16);
    }

    #[test]
    fn rgba_bit_masks() {
        let desc = HeaderDesc {
            width: 2,
            height: 2,
            pf_flags: DDPF_RGB,
            bit_count: 32,
            masks: [0x0000_00ff, 0x0000_ff00, 0x00ff_0000, 0xff00_0000],
            ..Default::default()
        };
        let texture = parse_dds(&dds(&desc, &[], 16)).unwrap();
        assert_eq!(texture.format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(texture.mip_levels, 1);
        assert_eq!(texture.surfaces[0].row_pitch, 8);
        assert_eq!(texture.surfaces[0].slice_pitch, 16);
    }

    #[test]
    fn cube_map_has_six_faces() {
        let desc = HeaderDesc {
            width: 1,
            height: 1,
            pf_flags: DDPF_RGB,
            bit_count: 32,
            masks: [0x00ff_0000, 0x0000_ff00, 0x0000_00ff, 0xff00_0000],
            caps: DDSCAPS_COMPLEX,
            caps2: DDSCAPS2_CUBEMAP | DDSCAPS2_CUBEMAP_ALL_FACES,
            ..Default::default()
        };
        let texture = parse_dds(&dds(&desc, &[], 24)).unwrap();
        assert_eq!(texture.dimension, TextureDimension::Cube);
        assert_eq!(texture.depth_or_array_size, 6);
        assert_eq!(texture.surfaces.len(), 6);
        assert_eq!(texture.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn volume_mips_consume_every_slice() {
        let desc = HeaderDesc {
            width: 2,
            height: 2,
            depth: 2,
            mips: 2,
            pf_flags: DDPF_LUMINANCE,
            bit_count: 8,
            masks: [0xff, 0, 0, 0],
            caps: DDSCAPS_COMPLEX,
            caps2: DDSCAPS2_VOLUME,
            ..Default::default()
        };
        // 2x2x2 then 1x1x1
        let texture = parse_dds(&dds(&desc, &[], 9)).unwrap();
        assert_eq!(texture.dimension, TextureDimension::ThreeD);
        assert_eq!(texture.depth_or_array_size, 2);
        assert_eq!(texture.surfaces[0].pixels.len(), 8);
        assert_eq!(texture.surfaces[0].slice_pitch, 4);
        assert_eq!(texture.surfaces[1].pixels, vec![8]);
    }

    #[test]
    fn dx10_texture_array() {
        let desc = HeaderDesc {
            width: 8,
            height: 8,
            pf_flags: DDPF_FOURCC,
            fourcc: FOURCC_DX10,
            ..Default::default()
        };
        let ext = [dxgi::BC7_UNORM, RESOURCE_DIMENSION_TEXTURE2D, 0, 2, 0];
        // 2x2 blocks of 16 bytes per slice
        let texture = parse_dds(&dds(&desc, &ext, 128)).unwrap();
        assert_eq!(texture.format, vk::Format::BC7_UNORM_BLOCK);
        assert_eq!(texture.depth_or_array_size, 2);
        assert_eq!(texture.surfaces.len(), 2);
        assert_eq!(texture.surfaces[1].row_pitch, 32);
    }

    #[test]
    fn dx10_cube_flag_multiplies_slices() {
        let desc = HeaderDesc {
            width: 1,
            height: 1,
            pf_flags: DDPF_FOURCC,
            fourcc: FOURCC_DX10,
            ..Default::default()
        };
        let ext = [dxgi::R8_UNORM, RESOURCE_DIMENSION_TEXTURE2D, RESOURCE_MISC_TEXTURECUBE, 1, 0];
        let texture = parse_dds(&dds(&desc, &ext, 6)).unwrap();
        assert_eq!(texture.dimension, TextureDimension::Cube);
        assert_eq!(texture.depth_or_array_size, 6);
    }

    #[test]
    fn one_pixel_high_texture_is_1d() {
        let desc = HeaderDesc {
            width: 4,
            height: 1,
            pf_flags: DDPF_ALPHA,
            bit_count: 8,
            ..Default::default()
        };
        let texture = parse_dds(&dds(&desc, &[], 4)).unwrap();
        assert_eq!(texture.dimension, TextureDimension::OneD);
        assert_eq!(texture.format, vk::Format::R8_UNORM);
    }

    #[test]
    fn bad_signature_is_rejected() {
        let mut bytes = dds(&HeaderDesc { width: 1, height: 1, ..Default::default() }, &[], 4);
        bytes[0] = b'X';
        assert!(matches!(parse_dds(&bytes), Err(TextureError::InvalidDds(_))));
        assert!(matches!(parse_dds(b"DD"), Err(TextureError::InvalidDds(_))));
    }

    #[test]
    fn truncated_pixels_are_rejected() {
        let desc = HeaderDesc {
            width: 4,
            height: 4,
            pf_flags: DDPF_FOURCC,
            fourcc: FOURCC_DXT5,
            ..Default::default()
        };
        assert!(matches!(
            parse_dds(&dds(&desc, &[], 15)),
            Err(TextureError::InvalidDds("pixel data is truncated"))
        ));
    }

    #[test]
    fn rgb24_is_unsupported() {
        let desc = HeaderDesc {
            width: 1,
            height: 1,
            pf_flags: DDPF_RGB,
            bit_count: 24,
            masks: [0xff0000, 0xff00, 0xff, 0],
            ..Default::default()
        };
        assert!(matches!(
            parse_dds(&dds(&desc, &[], 3)),
            Err(TextureError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn pitch_math() {
        assert_eq!(surface_info(5, 5, Layout::Block(16)), Some((64, 32, 2)));
        assert_eq!(surface_info(1, 1, Layout::Block(8)), Some((8, 8, 1)));
        assert_eq!(surface_info(3, 2, Layout::Packed), Some((16, 8, 2)));
        assert_eq!(surface_info(3, 1, Layout::Bits(16)), Some((6, 6, 1)));
        assert_eq!(surface_info(0, 0, Layout::Block(8)), Some((0, 0, 0)));
    }

    #[test]
    fn pitch_overflow_is_none() {
        assert_eq!(surface_info(16384, 16384, Layout::Bits(128)), None);
        assert_eq!(surface_info(u32::MAX, 1, Layout::Bits(32)), None);
        assert_eq!(surface_info(u32::MAX, 4, Layout::Block(16)), None);
    }

    #[test]
    fn oversized_surface_is_rejected() {
        let desc = HeaderDesc {
            width: 16384,
            height: 16384,
            pf_flags: DDPF_FOURCC,
            fourcc: FOURCC_DX10,
            ..Default::default()
        };
        let ext = [dxgi::R32G32B32A32_FLOAT, RESOURCE_DIMENSION_TEXTURE2D, 0, 1, 0];
        assert!(matches!(
            parse_dds(&dds(&desc, &ext, 16)),
            Err(TextureError::InvalidDds("surface size is out of range"))
        ));
    }

    #[test]
    fn huge_array_size_is_rejected() {
        let desc = HeaderDesc {
            width: 4,
            height: 4,
            mips: 2,
            pf_flags: DDPF_FOURCC,
            fourcc: FOURCC_DX10,
            ..Default::default()
        };
        let ext = [dxgi::BC1_UNORM, RESOURCE_DIMENSION_TEXTURE2D, 0, 0x8000_0000, 0];
        assert!(matches!(
            parse_dds(&dds(&desc, &ext, 16)),
            Err(TextureError::InvalidDds("surface count is out of range"))
        ));

        let cube = [
            dxgi::BC1_UNORM,
            RESOURCE_DIMENSION_TEXTURE2D,
            RESOURCE_MISC_TEXTURECUBE,
            0x8000_0000,
            0,
        ];
        assert!(matches!(
            parse_dds(&dds(&desc, &cube, 16)),
            Err(TextureError::InvalidDds("array size is out of range"))
        ));
    }

    #[test]
    fn surface_count_beyond_data_fails_before_allocating() {
        let desc = HeaderDesc {
            width: 1,
            height: 1,
            pf_flags: DDPF_FOURCC,
            fourcc: FOURCC_DX10,
            ..Default::default()
        };
        let ext = [dxgi::R8_UNORM, RESOURCE_DIMENSION_TEXTURE2D, 0, 0x1000_0000, 0];
        assert!(matches!(
            parse_dds(&dds(&desc, &ext, 8)),
            Err(TextureError::InvalidDds("pixel data is truncated"))
        ));
    }

    #[test]
    fn fourcc_is_little_endian() {
        assert_eq!(FOURCC_DXT1, 0x3154_5844);
    }
}
