//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU GPU texture resources,
//! and helper methods for creating depth textures, normal maps, solid colour
//! maps and linear gradient maps, and for loading textures from image data.

use anyhow::Result;
use image::{GenericImageView, ImageFormat, Rgba, RgbaImage, load_from_memory_with_format};
use serde::{Deserialize, Serialize};

use crate::error::AssetError;

/// A GPU texture with a view and optional sampler.
///
/// Wraps WGPU texture objects along with associated views and samplers.
/// Textures are used for color maps, normal maps, depth, and other data
/// bound to shaders. Typically created via [`from_bytes`](Self::from_bytes) or
/// via [`create_depth_texture`](Self::create_depth_texture).
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// Depth textures are required for proper depth-testing to determine which objects
    /// are in front of others. The returned texture is suitable for use as a
    /// `RENDER_ATTACHMENT` in render passes.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Create a default normal map (neutral blue, representing no deformation).
    ///
    /// Returns a solid blue texture suitable as a default when no normal map is provided.
    /// This avoids the need to change shaders when normal maps are optional.
    pub fn create_default_normal_map(
        width: u32,
        height: u32,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Texture {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        // The blue/purple-ish colour that represents the default for normal maps
        let data: Vec<u8> = [127, 127, 255, 255]
            .iter()
            .cycle()
            .take(width as usize * height as usize * 4)
            .copied()
            .collect();

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("default normal map"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_default_sampler(device));
        Texture {
            texture,
            view,
            sampler,
        }
    }

    /// Load a texture from raw byte data (image file contents).
    ///
    /// # Arguments
    ///
    /// * `bytes` represent raw image file data (PNG, JPEG, etc.)
    /// * `label` is used as a debug name for the GPU resource
    /// * `format`  is an optional file format hint (e.g., "png"). If None, auto-detect.
    /// * `is_normal_map` toggles between sRGB (false) and linear (true) color space
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        is_normal_map: bool,
    ) -> Result<Self> {
        let img = match format {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => match ImageFormat::from_extension(fmt) {
                Some(format) => load_from_memory_with_format(bytes, format)?,
                None => image::load_from_memory(bytes)?,
            },
        };
        Self::from_image(device, queue, &img, Some(label), is_normal_map)
    }

    /// Upload a linear gradient as an sRGB colour map clamped at its edges.
    pub fn from_gradient(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        gradient: &LinearGradient,
        label: &str,
    ) -> Result<Self> {
        let img = image::DynamicImage::ImageRgba8(gradient.to_image());
        let mut texture = Self::from_image(device, queue, &img, Some(label), false)?;
        texture.sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        }));
        Ok(texture)
    }

    /// A 1x1 map of a single colour, used for materials without a diffuse map.
    pub fn create_solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
    ) -> Result<Self> {
        let img = image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba(rgba)));
        Self::from_image(device, queue, &img, Some(label), false)
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        is_normal_map: bool,
    ) -> Result<Self> {
        let dimensions = img.dimensions();
        let rgba = img.to_rgba8();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let format = if is_normal_map {
            wgpu::TextureFormat::Rgba8Unorm
        } else {
            wgpu::TextureFormat::Rgba8UnormSrgb
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        }));

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientDirection {
    X,
    #[default]
    Y,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32,
    pub color: String,
}

/// A linear colour ramp rendered into an RGBA image.
///
/// Offsets run from `0.0` at the left (`X`) or top (`Y`) edge to `1.0` at the
/// opposite edge. Colours are interpolated per channel in sRGB byte space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearGradient {
    pub width: u32,
    pub height: u32,
    pub direction: GradientDirection,
    pub stops: Vec<GradientStop>,
}

impl Default for LinearGradient {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            direction: GradientDirection::Y,
            stops: vec![
                GradientStop {
                    offset: 0.0,
                    color: "#8A4CAE".to_string(),
                },
                GradientStop {
                    offset: 1.0,
                    color: "#FF6FB5".to_string(),
                },
            ],
        }
    }
}

impl LinearGradient {
    pub fn new(direction: GradientDirection, stops: &[(f32, &str)]) -> Self {
        Self {
            direction,
            stops: stops
                .iter()
                .map(|(offset, color)| GradientStop {
                    offset: *offset,
                    color: color.to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    /// Colour at `t` in `[0, 1]`, clamped to the outermost stops.
    pub fn sample(&self, t: f32) -> Result<[u8; 4], AssetError> {
        let mut stops = self
            .stops
            .iter()
            .map(|stop| Ok((stop.offset.clamp(0.0, 1.0), parse_hex_colour(&stop.color)?)))
            .collect::<Result<Vec<_>, AssetError>>()?;
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(sample_sorted(&stops, t))
    }

    pub fn to_image(&self) -> RgbaImage {
        let width = self.width.max(1);
        let height = self.height.max(1);
        let mut stops: Vec<(f32, [u8; 4])> = self
            .stops
            .iter()
            .filter_map(|stop| match parse_hex_colour(&stop.color) {
                Ok(colour) => Some((stop.offset.clamp(0.0, 1.0), colour)),
                Err(e) => {
                    log::warn!("Skipping gradient stop: {}", e);
                    None
                }
            })
            .collect();
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));

        let steps = match self.direction {
            GradientDirection::X => width,
            GradientDirection::Y => height,
        };
        let ramp: Vec<[u8; 4]> = (0..steps)
            .map(|i| {
                let t = if steps > 1 {
                    i as f32 / (steps - 1) as f32
                } else {
                    0.0
                };
                sample_sorted(&stops, t)
            })
            .collect();

        RgbaImage::from_fn(width, height, |x, y| {
            let i = match self.direction {
                GradientDirection::X => x,
                GradientDirection::Y => y,
            };
            Rgba(ramp[i as usize])
        })
    }
}

fn sample_sorted(stops: &[(f32, [u8; 4])], t: f32) -> [u8; 4] {
    let (first, last) = match (stops.first(), stops.last()) {
        (Some(first), Some(last)) => (first, last),
        // Transparent black, as an empty canvas gradient paints nothing
        _ => return [0, 0, 0, 0],
    };
    if t <= first.0 {
        return first.1;
    }
    if t >= last.0 {
        return last.1;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t >= a.0 && t <= b.0 {
            let span = b.0 - a.0;
            let f = if span > 0.0 { (t - a.0) / span } else { 1.0 };
            let mut out = [0u8; 4];
            for c in 0..4 {
                let v = a.1[c] as f32 + (b.1[c] as f32 - a.1[c] as f32) * f;
                out[c] = v.round().clamp(0.0, 255.0) as u8;
            }
            return out;
        }
    }
    last.1
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` into RGBA bytes.
pub fn parse_hex_colour(colour: &str) -> Result<[u8; 4], AssetError> {
    let invalid = || AssetError::InvalidColour(colour.to_string());
    let hex = colour.strip_prefix('#').ok_or_else(invalid)?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    match hex.len() {
        3 => {
            let nibble = |i: usize| {
                u8::from_str_radix(&hex[i..i + 1], 16)
                    .map(|n| n * 17)
                    .map_err(|_| invalid())
            };
            Ok([nibble(0)?, nibble(1)?, nibble(2)?, 255])
        }
        6 => Ok([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Ok([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => Err(invalid()),
    }
}

/// Converts sRGB bytes to the linear float tint the shader multiplies with.
pub fn srgb_to_linear(rgba: [u8; 4]) -> [f32; 4] {
    let channel = |c: u8| {
        let c = c as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [
        channel(rgba[0]),
        channel(rgba[1]),
        channel(rgba[2]),
        rgba[3] as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parses_short_long_and_alpha_forms() {
        assert_eq!(parse_hex_colour("#fff").unwrap(), [255, 255, 255, 255]);
        assert_eq!(parse_hex_colour("#8A4CAE").unwrap(), [0x8a, 0x4c, 0xae, 255]);
        assert_eq!(parse_hex_colour("#7b00ffff").unwrap(), [0x7b, 0x00, 0xff, 0xff]);
    }

    #[test]
    fn rejects_malformed_colours() {
        assert!(parse_hex_colour("fff").is_err());
        assert!(parse_hex_colour("#ggg").is_err());
        assert!(parse_hex_colour("#12345").is_err());
    }

    #[test]
    fn vertical_gradient_runs_top_to_bottom() {
        let gradient = LinearGradient {
            width: 4,
            height: 3,
            ..LinearGradient::new(GradientDirection::Y, &[(0.0, "#000000"), (1.0, "#ffffff")])
        };
        let img = gradient.to_image();
        assert_eq!(img.dimensions(), (4, 3));
        assert_eq!(img.get_pixel(2, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(2, 1).0, [128, 128, 128, 255]);
        assert_eq!(img.get_pixel(0, 2).0, [255, 255, 255, 255]);
        // constant along the other axis
        assert_eq!(img.get_pixel(0, 1), img.get_pixel(3, 1));
    }

    #[test]
    fn three_stop_gradient_hits_middle_stop() {
        let gradient = LinearGradient::new(
            GradientDirection::X,
            &[(0.0, "#7b00ffff"), (0.5, "#4900ffff"), (1.0, "#e91717ff")],
        );
        assert_eq!(gradient.sample(0.5).unwrap(), [0x49, 0x00, 0xff, 0xff]);
        assert_eq!(gradient.sample(1.0).unwrap(), [0xe9, 0x17, 0x17, 0xff]);
    }

    #[test]
    fn samples_outside_stops_are_clamped() {
        let gradient = LinearGradient::new(GradientDirection::Y, &[(0.25, "#ff0000"), (0.75, "#0000ff")]);
        assert_eq!(gradient.sample(0.0).unwrap(), [255, 0, 0, 255]);
        assert_eq!(gradient.sample(1.0).unwrap(), [0, 0, 255, 255]);
    }

    #[test]
    fn unsorted_stops_are_sorted() {
        let gradient = LinearGradient::new(GradientDirection::Y, &[(1.0, "#ffffff"), (0.0, "#000000")]);
        assert_eq!(gradient.sample(0.0).unwrap(), [0, 0, 0, 255]);
    }

    #[test]
    fn white_stays_white_in_linear_space() {
        let linear = srgb_to_linear([255, 255, 255, 255]);
        for c in linear {
            assert_relative_eq!(c, 1.0);
        }
        assert_relative_eq!(srgb_to_linear([0, 0, 0, 255])[0], 0.0);
    }
}
