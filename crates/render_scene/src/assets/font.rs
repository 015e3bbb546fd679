//! Font resource handing out reference-counted glyph sets per pixel size

use std::collections::HashMap;

/// Glyph set of a font at one pixel size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Font {
    size: u32,
}

impl Font {
    /// Pixel size of the glyph set
    pub const fn size(&self) -> u32 {
        self.size
    }
}

/// Loaded font face
#[derive(Debug, Clone, Default)]
pub struct FontResource {
    sizes: HashMap<u32, u32>,
}

impl FontResource {
    /// Empty font face
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a reference to the glyph set at `size`, building it on first use
    pub(crate) fn acquire(&mut self, size: u32) -> Font {
        *self.sizes.entry(size).or_insert(0) += 1;
        Font { size }
    }

    /// Drop a reference; the glyph set is freed at zero
    pub(crate) fn release(&mut self, font: Font) {
        if let Some(count) = self.sizes.get_mut(&font.size) {
            *count -= 1;
            if *count == 0 {
                self.sizes.remove(&font.size);
            }
        }
    }

    /// References held on the glyph set at `size`
    pub fn size_ref_count(&self, size: u32) -> u32 {
        self.sizes.get(&size).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sized_glyph_sets_are_counted() {
        let mut font = FontResource::new();
        let a = font.acquire(13);
        let b = font.acquire(13);
        assert_eq!(a, b);
        assert_eq!(font.size_ref_count(13), 2);
        font.release(a);
        font.release(b);
        assert_eq!(font.size_ref_count(13), 0);
    }
}
