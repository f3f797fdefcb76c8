//! Reusable pixel buffer for pipeline slots.
//!
//! `ImageBuffer` wraps a `bytes::BytesMut` together with its geometry. The
//! pipeline never allocates these per frame: a slot's buffers are reshaped in
//! place, and [`ImageBuffer::reshape`] keeps the existing allocation whenever
//! the new frame fits in it.
//!
//! ```text
//! 1. Slots start with empty (or pre-sized) buffers
//! 2. Acquisition reshapes its scratch buffer and writes pixels
//! 3. Scratch and slot buffers are swapped on hand-off (no copy)
//! 4. The slot's previous buffer becomes the next scratch buffer
//! ```

use crate::PoolError;
use bytes::{Bytes, BytesMut};

/// Interleaved 8-bit image with `width * height * channels` bytes of data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: BytesMut,
}

impl ImageBuffer {
    /// Allocate a zeroed image of the given geometry.
    #[must_use]
    pub fn new(width: u32, height: u32, channels: u8) -> Self {
        let mut image = Self::default();
        image.reshape(width, height, channels);
        image
    }

    /// Change the geometry, zero-filling any newly exposed bytes.
    ///
    /// Shrinking or reshaping within the current capacity does not allocate.
    pub fn reshape(&mut self, width: u32, height: u32, channels: u8) {
        self.width = width;
        self.height = height;
        self.channels = channels;
        self.data.resize(Self::byte_len(width, height, channels), 0);
    }

    /// Copy `src` into the buffer after reshaping it to the given geometry.
    ///
    /// # Errors
    ///
    /// [`PoolError::ImageSize`] if `src.len()` does not match
    /// `width * height * channels`. The buffer is left unchanged.
    pub fn copy_from_slice(
        &mut self,
        width: u32,
        height: u32,
        channels: u8,
        src: &[u8],
    ) -> Result<(), PoolError> {
        let expected = Self::byte_len(width, height, channels);
        if src.len() != expected {
            return Err(PoolError::ImageSize {
                expected,
                actual: src.len(),
            });
        }
        self.reshape(width, height, channels);
        self.data.copy_from_slice(src);
        Ok(())
    }

    /// Set every byte to `value`.
    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Interleaved channels per pixel.
    #[must_use]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Bytes per row.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.width as usize * usize::from(self.channels)
    }

    /// Pixel data, row-major.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel data, row-major.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Allocated capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Whether the image holds no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy the pixels into an immutable `Bytes` for consumers outside the
    /// pipeline. The slot keeps its own buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data)
    }

    fn byte_len(width: u32, height: u32, channels: u8) -> usize {
        width as usize * height as usize * usize::from(channels)
    }
}
