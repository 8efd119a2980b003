//! Machine description and memory image.
//!
//! The simulated target is a VLIW SIMD machine with five execution engines,
//! a flat 32-bit word memory and a scratch space that serves as both register
//! file and manually managed cache.

pub mod memory;
pub mod spec;

pub use memory::{
    MemError, MemoryImage, HDR_BATCH_SIZE, HDR_FOREST_HEIGHT, HDR_FOREST_VALUES_P,
    HDR_INP_INDICES_P, HDR_INP_VALUES_P, HDR_N_NODES, HDR_ROUNDS, HDR_WORDS,
};
pub use spec::{MachineSpec, SCRATCH_WORDS, VLEN};
