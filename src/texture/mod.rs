// Texture resources loaded from disk
//
// A `ResTexture` is CPU-side pixel data, one `Surface` per mip level of
// every array slice (or cube face). Uploading to the GPU is up to the caller.

mod dds;
mod decoded;

use ash::vk;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::misc::get_ext;

pub use dds::{load_dds, parse_dds};
pub use decoded::{load_decoded, load_hdr, load_tga};

/// Errors returned by the texture loaders
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("unsupported texture file extension '{0}'")]
    UnsupportedExtension(String),

    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed DDS data: {0}")]
    InvalidDds(&'static str),

    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("image decoding failed")]
    Decode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, TextureError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureDimension {
    OneD,
    TwoD,
    ThreeD,
    Cube,
}

/// Pixels of one mip level of one slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub row_pitch: u32,
    pub slice_pitch: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResTexture {
    pub dimension: TextureDimension,
    pub width: u32,
    pub height: u32,
    /// Depth for volume textures, slice count otherwise (6 per cube)
    pub depth_or_array_size: u32,
    pub format: vk::Format,
    pub mip_levels: u32,
    /// Slice-major: all mips of slice 0, then all mips of slice 1, ...
    pub surfaces: Vec<Surface>,
}

impl ResTexture {
    /// Surface for `mip` of `slice`
    pub fn surface(&self, slice: u32, mip: u32) -> Option<&Surface> {
        if mip >= self.mip_levels {
            return None;
        }
        self.surfaces.get((slice * self.mip_levels + mip) as usize)
    }
}

/// Loader chosen for a file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Tga,
    Dds,
    Hdr,
    /// Common still-image formats (bmp, jpeg, tiff, gif, png)
    Decoded,
    /// HD Photo; recognized, but no decoder is available
    HdPhoto,
}

impl TextureFormat {
    /// Map a lower-case extension to its loader
    pub fn from_extension(ext: &str) -> Option<Self> {
        let format = match ext {
            "tga" => TextureFormat::Tga,
            "dds" => TextureFormat::Dds,
            "hdr" => TextureFormat::Hdr,
            "bmp" | "jpg" | "jpeg" | "tif" | "tiff" | "gif" | "png" => TextureFormat::Decoded,
            "hdp" => TextureFormat::HdPhoto,
            _ => return None,
        };
        Some(format)
    }
}

pub struct TextureFactory;

impl TextureFactory {
    /// Load any supported texture file, dispatching on its extension
    pub fn create(path: impl AsRef<Path>) -> Result<ResTexture> {
        let path = path.as_ref();
        let ext = get_ext(path);

        let Some(format) = TextureFormat::from_extension(&ext) else {
            log::error!("Invalid texture file format, extension is '{}' ({:?})", ext, path);
            return Err(TextureError::UnsupportedExtension(ext));
        };

        let texture = match format {
            TextureFormat::Tga => load_tga(path),
            TextureFormat::Dds => load_dds(path),
            TextureFormat::Hdr => load_hdr(path),
            TextureFormat::Decoded => load_decoded(path),
            TextureFormat::HdPhoto => {
                log::error!("HD Photo textures are not supported ({:?})", path);
                Err(TextureError::UnsupportedExtension(ext))
            }
        }?;

        log::debug!(
            "Loaded texture {:?}: {}x{} {:?}, {} mip(s), {} slice(s)",
            path,
            texture.width,
            texture.height,
            texture.format,
            texture.mip_levels,
            texture.depth_or_array_size
        );
        Ok(texture)
    }
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| TextureError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_dispatch_to_loaders() {
        assert_eq!(TextureFormat::from_extension("tga"), Some(TextureFormat::Tga));
        assert_eq!(TextureFormat::from_extension("dds"), Some(TextureFormat::Dds));
        assert_eq!(TextureFormat::from_extension("hdr"), Some(TextureFormat::Hdr));
        for ext in ["bmp", "jpg", "jpeg", "tif", "tiff", "gif", "png"] {
            assert_eq!(TextureFormat::from_extension(ext), Some(TextureFormat::Decoded));
        }
        assert_eq!(TextureFormat::from_extension("hdp"), Some(TextureFormat::HdPhoto));
        assert_eq!(TextureFormat::from_extension("exr"), None);
        assert_eq!(TextureFormat::from_extension(""), None);
    }

    #[test]
    fn unknown_extension_is_rejected_before_io() {
        let err = TextureFactory::create("missing/texture.xyz").unwrap_err();
        assert!(matches!(err, TextureError::UnsupportedExtension(ext) if ext == "xyz"));
    }

    #[test]
    fn upper_case_extension_is_accepted() {
        // Reaches the DDS loader, which then fails to open the file
        let err = TextureFactory::create("missing/texture.DDS").unwrap_err();
        assert!(matches!(err, TextureError::Io { .. }));
    }

    #[test]
    fn hd_photo_is_reported_unsupported() {
        let err = TextureFactory::create("missing/photo.hdp").unwrap_err();
        assert!(matches!(err, TextureError::UnsupportedExtension(ext) if ext == "hdp"));
    }

    #[test]
    fn surfaces_are_indexed_slice_major() {
        let surface = |w: u32| Surface {
            width: w,
            height: w,
            row_pitch: w * 4,
            slice_pitch: w * w * 4,
            pixels: vec![0; (w * w * 4) as usize],
        };
        let texture = ResTexture {
            dimension: TextureDimension::TwoD,
            width: 2,
            height: 2,
            depth_or_array_size: 2,
            format: vk::Format::R8G8B8A8_UNORM,
            mip_levels: 2,
            surfaces: vec![surface(2), surface(1), surface(2), surface(1)],
        };
        assert_eq!(texture.surface(1, 1).unwrap().width, 1);
        assert_eq!(texture.surface(1, 0).unwrap().width, 2);
        assert!(texture.surface(0, 2).is_none());
        assert!(texture.surface(2, 0).is_none());
    }
}
