//! Flat word-addressed memory image.
//!
//! A memory image is the complete input (and, after a run, output) state of
//! one kernel execution. Images for the tree traversal problem start with a
//! seven word header:
//!
//! | Word | Contents |
//! |------|----------|
//! | 0 | rounds |
//! | 1 | n_nodes |
//! | 2 | batch_size |
//! | 3 | forest_height |
//! | 4 | pointer to forest node values |
//! | 5 | pointer to batch indices |
//! | 6 | pointer to batch values |
//!
//! followed by the forest values, batch indices and batch values regions.

use thiserror::Error;

/// Header word index: number of traversal rounds.
pub const HDR_ROUNDS: usize = 0;
/// Header word index: total nodes in the forest.
pub const HDR_N_NODES: usize = 1;
/// Header word index: number of parallel traversals.
pub const HDR_BATCH_SIZE: usize = 2;
/// Header word index: forest height.
pub const HDR_FOREST_HEIGHT: usize = 3;
/// Header word index: pointer to forest node values.
pub const HDR_FOREST_VALUES_P: usize = 4;
/// Header word index: pointer to batch indices.
pub const HDR_INP_INDICES_P: usize = 5;
/// Header word index: pointer to batch values.
pub const HDR_INP_VALUES_P: usize = 6;
/// Total header size in words.
pub const HDR_WORDS: usize = 7;

/// Memory access fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemError {
    /// Address past the end of the image.
    #[error("memory address {addr} out of bounds (image is {len} words)")]
    OutOfBounds { addr: usize, len: usize },
}

/// A flat image of 32-bit words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    words: Vec<u32>,
}

impl MemoryImage {
    /// Wrap an existing word vector.
    pub fn new(words: Vec<u32>) -> Self {
        Self { words }
    }

    /// An image of `len` zeroed words.
    pub fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0; len],
        }
    }

    /// Image size in words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when the image holds no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Read one word.
    pub fn get(&self, addr: usize) -> Result<u32, MemError> {
        self.words.get(addr).copied().ok_or(MemError::OutOfBounds {
            addr,
            len: self.words.len(),
        })
    }

    /// Write one word.
    pub fn set(&mut self, addr: usize, value: u32) -> Result<(), MemError> {
        let len = self.words.len();
        match self.words.get_mut(addr) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(MemError::OutOfBounds { addr, len }),
        }
    }

    /// Borrow a region as a slice.
    pub fn region(&self, start: usize, len: usize) -> Result<&[u32], MemError> {
        self.words
            .get(start..start + len)
            .ok_or(MemError::OutOfBounds {
                addr: start + len.saturating_sub(1),
                len: self.words.len(),
            })
    }

    /// The whole image as a slice.
    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_round_trip() {
        let mut image = MemoryImage::zeroed(8);
        image.set(3, 0xDEADBEEF).unwrap();
        assert_eq!(image.get(3).unwrap(), 0xDEADBEEF);
        assert_eq!(image.get(0).unwrap(), 0);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut image = MemoryImage::zeroed(4);
        assert_eq!(
            image.get(4),
            Err(MemError::OutOfBounds { addr: 4, len: 4 })
        );
        assert!(image.set(100, 1).is_err());
    }

    #[test]
    fn test_region_slice() {
        let image = MemoryImage::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(image.region(1, 3).unwrap(), &[2, 3, 4]);
        assert!(image.region(3, 3).is_err());
    }
}
