// Loaders backed by the `image` crate
//
// TGA, Radiance HDR and the common still-image formats decode to a single
// 2D surface without mips: RGBA8 for LDR files, RGBA32F for HDR.

use ash::vk;
use image::{DynamicImage, ImageFormat};
use std::path::Path;

use super::{read_file, ResTexture, Result, Surface, TextureDimension};

pub fn load_tga(path: impl AsRef<Path>) -> Result<ResTexture> {
    decode_file(path.as_ref(), Some(ImageFormat::Tga))
}

pub fn load_hdr(path: impl AsRef<Path>) -> Result<ResTexture> {
    decode_file(path.as_ref(), Some(ImageFormat::Hdr))
}

/// Any format the `image` crate can detect from the file contents
pub fn load_decoded(path: impl AsRef<Path>) -> Result<ResTexture> {
    decode_file(path.as_ref(), None)
}

fn decode_file(path: &Path, format: Option<ImageFormat>) -> Result<ResTexture> {
    let bytes = read_file(path)?;
    let decoded = match format {
        Some(format) => image::load_from_memory_with_format(&bytes, format),
        None => image::load_from_memory(&bytes),
    }
    .inspect_err(|e| log::error!("Failed to decode {:?}: {}", path, e))?;

    Ok(from_image(decoded))
}

/// Convert a decoded image into a single-surface texture
pub(crate) fn from_image(decoded: DynamicImage) -> ResTexture {
    let (width, height) = (decoded.width(), decoded.height());

    let (format, bytes_per_pixel, pixels) = if is_float(&decoded) {
        let rgba = decoded.into_rgba32f();
        let pixels: Vec<u8> = bytemuck::cast_slice(rgba.as_raw()).to_vec();
        (vk::Format::R32G32B32A32_SFLOAT, 16, pixels)
    } else {
        (vk::Format::R8G8B8A8_UNORM, 4, decoded.into_rgba8().into_raw())
    };

    let row_pitch = width * bytes_per_pixel;
    ResTexture {
        dimension: if height == 1 {
            TextureDimension::OneD
        } else {
            TextureDimension::TwoD
        },
        width,
        height,
        depth_or_array_size: 1,
        format,
        mip_levels: 1,
        surfaces: vec![Surface {
            width,
            height,
            row_pitch,
            slice_pitch: row_pitch * height,
            pixels,
        }],
    }
}

fn is_float(image: &DynamicImage) -> bool {
    matches!(image, DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb32FImage, RgbaImage};

    #[test]
    fn ldr_images_become_rgba8() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let texture = from_image(DynamicImage::ImageRgba8(image));
        assert_eq!(texture.format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(texture.dimension, TextureDimension::TwoD);
        let surface = &texture.surfaces[0];
        assert_eq!(surface.row_pitch, 12);
        assert_eq!(surface.slice_pitch, 24);
        assert_eq!(&surface.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn float_images_become_rgba32f() {
        let image = Rgb32FImage::from_pixel(2, 1, image::Rgb([1.5, 0.0, 0.25]));
        let texture = from_image(DynamicImage::ImageRgb32F(image));
        assert_eq!(texture.format, vk::Format::R32G32B32A32_SFLOAT);
        assert_eq!(texture.dimension, TextureDimension::OneD);
        let surface = &texture.surfaces[0];
        assert_eq!(surface.row_pitch, 32);
        assert_eq!(surface.pixels.len(), 32);
        let first: f32 = bytemuck::pod_read_unaligned(&surface.pixels[..4]);
        assert_eq!(first, 1.5);
    }

    #[test]
    fn png_round_trips_through_the_factory() {
        let dir = std::env::temp_dir().join(format!("asvk-texture-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("checker.png");
        RgbaImage::from_fn(2, 2, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        })
        .save(&path)
        .unwrap();

        let texture = crate::texture::TextureFactory::create(&path).unwrap();
        assert_eq!(texture.width, 2);
        assert_eq!(texture.surfaces[0].pixels[4..8], [0, 0, 0, 255]);

        std::fs::remove_dir_all(&dir).ok();
    }
}
