//! Problem generation and the ground-truth traversal.
//!
//! A problem is a perfect binary forest of hashed node values plus a batch
//! of independent traversals. Each traversal walks the tree for a number of
//! rounds; the branch taken at every step depends on the parity of the
//! running hash value:
//!
//! ```text
//! node_val = forest[idx]
//! val      = myhash(val ^ node_val)
//! idx      = 2*idx + (1 if val is even else 2)
//! idx      = 0 if idx >= n_nodes
//! ```
//!
//! [`reference_traversal`] runs that recurrence directly over a memory
//! image, with no notion of cycles or scheduling. It shares nothing with
//! the simulator's execution path, which is what makes it usable as an
//! oracle for kernels that claim to compute the same thing.

use crate::machine::{
    MemError, MemoryImage, HDR_BATCH_SIZE, HDR_FOREST_HEIGHT, HDR_FOREST_VALUES_P,
    HDR_INP_INDICES_P, HDR_INP_VALUES_P, HDR_N_NODES, HDR_ROUNDS, HDR_WORDS,
};
use crate::reference::hash::myhash;

/// Input-generation constant for batch values.
const BATCH_SALT: u32 = 0x9E37_79B9;

/// Parameters of one traversal problem.
///
/// All inputs are derived from `seed` through [`myhash`], so a problem is a
/// pure value: the same parameters always produce the same memory image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Problem {
    pub forest_height: u32,
    pub rounds: u32,
    pub batch_size: u32,
    pub seed: u32,
}

impl Problem {
    /// The standard benchmark problem.
    pub fn standard() -> Self {
        Self {
            forest_height: 10,
            rounds: 16,
            batch_size: 256,
            seed: 1,
        }
    }

    /// A reduced problem, convenient in tests.
    pub fn small() -> Self {
        Self {
            forest_height: 3,
            rounds: 4,
            batch_size: 8,
            seed: 1,
        }
    }

    /// Node count of a perfect binary tree of this height.
    pub fn n_nodes(&self) -> u32 {
        (1u32 << (self.forest_height + 1)) - 1
    }

    /// Total image size in words.
    pub fn image_words(&self) -> usize {
        HDR_WORDS + self.n_nodes() as usize + 2 * self.batch_size as usize
    }

    /// Build the input memory image: header, forest values, batch indices
    /// (all at the root) and batch values.
    pub fn image(&self) -> MemoryImage {
        let n_nodes = self.n_nodes();
        let forest_p = HDR_WORDS as u32;
        let indices_p = forest_p + n_nodes;
        let values_p = indices_p + self.batch_size;

        let mut words = Vec::with_capacity(self.image_words());
        words.extend_from_slice(&[
            self.rounds,
            n_nodes,
            self.batch_size,
            self.forest_height,
            forest_p,
            indices_p,
            values_p,
        ]);
        for i in 0..n_nodes {
            words.push(myhash(self.seed.wrapping_add(i)));
        }
        words.extend(std::iter::repeat(0).take(self.batch_size as usize));
        for i in 0..self.batch_size {
            words.push(myhash(self.seed ^ i.wrapping_mul(BATCH_SALT)));
        }
        MemoryImage::new(words)
    }

    /// The expected output image for this problem.
    pub fn expected(&self) -> Result<MemoryImage, MemError> {
        reference_traversal(&self.image())
    }
}

impl Default for Problem {
    fn default() -> Self {
        Self::standard()
    }
}

/// Run the traversal recurrence over an image, returning the updated image.
///
/// Reads the problem description from the image header, so it also works on
/// images not produced by [`Problem::image`]. Out-of-range pointers fault
/// with a [`MemError`] rather than being clamped.
pub fn reference_traversal(image: &MemoryImage) -> Result<MemoryImage, MemError> {
    let mut out = image.clone();
    let rounds = out.get(HDR_ROUNDS)?;
    let n_nodes = out.get(HDR_N_NODES)?;
    let batch_size = out.get(HDR_BATCH_SIZE)?;
    let forest_p = out.get(HDR_FOREST_VALUES_P)? as usize;
    let indices_p = out.get(HDR_INP_INDICES_P)? as usize;
    let values_p = out.get(HDR_INP_VALUES_P)? as usize;
    // The height word is informational here; the wrap test below only needs
    // the node count.
    let _ = out.get(HDR_FOREST_HEIGHT)?;

    for _ in 0..rounds {
        for i in 0..batch_size as usize {
            let idx = out.get(indices_p + i)?;
            let val = out.get(values_p + i)?;
            let node_val = out.get(forest_p + idx as usize)?;
            let val = myhash(val ^ node_val);
            let step = if val % 2 == 0 { 1 } else { 2 };
            let mut idx = idx.wrapping_mul(2).wrapping_add(step);
            if idx >= n_nodes {
                idx = 0;
            }
            out.set(indices_p + i, idx)?;
            out.set(values_p + i, val)?;
        }
    }
    Ok(out)
}
