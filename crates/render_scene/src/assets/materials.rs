//! Material and texture payloads

use super::resource_manager::Handle;

/// Loaded material
///
/// Only the data the scene needs: which render layers the material draws
/// into and which textures it samples.
#[derive(Debug, Clone, Default)]
pub struct Material {
    layer_mask: u64,
    textures: Vec<Handle<Texture>>,
}

impl Material {
    /// Material drawing into `layer_mask`
    pub const fn new(layer_mask: u64) -> Self {
        Self {
            layer_mask,
            textures: Vec::new(),
        }
    }

    /// Attach textures; the material owns one reference to each
    #[must_use]
    pub fn with_textures(mut self, textures: Vec<Handle<Texture>>) -> Self {
        self.textures = textures;
        self
    }

    /// Render layers
    pub const fn layer_mask(&self) -> u64 {
        self.layer_mask
    }

    /// Sampled textures, in slot order
    pub fn textures(&self) -> &[Handle<Texture>] {
        &self.textures
    }

    /// Texture in a slot
    pub fn texture(&self, slot: usize) -> Option<Handle<Texture>> {
        self.textures.get(slot).copied()
    }
}

/// CPU copy of texture pixels
#[derive(Debug, Clone, Default)]
pub struct Texture {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// 2 for 16-bit heightmaps, 4 for RGBA8
    pub bytes_per_pixel: u32,
    /// Row-major pixel bytes
    pub data: Vec<u8>,
}

impl Texture {
    /// Create a texture
    pub const fn new(width: u32, height: u32, bytes_per_pixel: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            bytes_per_pixel,
            data,
        }
    }

    fn clamped_index(&self, x: i64, y: i64) -> usize {
        let x = x.clamp(0, i64::from(self.width.max(1)) - 1);
        let y = y.clamp(0, i64::from(self.height.max(1)) - 1);
        (x + y * i64::from(self.width)) as usize
    }

    /// RGBA8 pixel packed as little-endian `u32`, coordinates clamped to the edges
    ///
    /// Returns 0 for textures that are not 4 bytes per pixel.
    pub fn pixel(&self, x: i64, y: i64) -> u32 {
        if self.bytes_per_pixel != 4 || self.data.is_empty() {
            return 0;
        }
        let offset = self.clamped_index(x, y) * 4;
        self.data
            .get(offset..offset + 4)
            .map_or(0, |p| u32::from_le_bytes([p[0], p[1], p[2], p[3]]))
    }

    /// Height sample in `0..=1`: 16-bit value for 2 bpp, red channel for 4 bpp
    pub fn height_sample(&self, x: i64, y: i64) -> f32 {
        let index = self.clamped_index(x, y);
        match self.bytes_per_pixel {
            2 => self
                .data
                .get(index * 2..index * 2 + 2)
                .map_or(0.0, |p| f32::from(u16::from_le_bytes([p[0], p[1]])) / f32::from(u16::MAX)),
            4 => self.data.get(index * 4).map_or(0.0, |r| f32::from(*r) / 255.0),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_read_is_clamped() {
        let texture = Texture::new(2, 1, 4, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(texture.pixel(1, 0), u32::from_le_bytes([5, 6, 7, 8]));
        assert_eq!(texture.pixel(9, 9), u32::from_le_bytes([5, 6, 7, 8]));
        assert_eq!(texture.pixel(-3, 0), u32::from_le_bytes([1, 2, 3, 4]));
        assert_eq!(Texture::new(1, 1, 2, vec![0, 0]).pixel(0, 0), 0);
    }

    #[test]
    fn test_height_samples() {
        let wide = Texture::new(1, 1, 2, u16::MAX.to_le_bytes().to_vec());
        assert!((wide.height_sample(0, 0) - 1.0).abs() < 1e-6);
        let rgba = Texture::new(1, 1, 4, vec![51, 0, 0, 255]);
        assert!((rgba.height_sample(0, 0) - 0.2).abs() < 1e-6);
    }
}
