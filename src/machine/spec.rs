//! Machine parameters.
//!
//! The target is a VLIW SIMD machine with the following execution engines:
//!
//! | Engine | Lanes | Operations |
//! |--------|-------|------------|
//! | alu    | 12    | scalar arithmetic (`+ - * // % ^ & \| << >> < ==`) |
//! | valu   | 6     | vector arithmetic, [`VLEN`] elements per op |
//! | load   | 2     | memory reads and constant loads |
//! | store  | 2     | memory writes |
//! | flow   | 1     | control (select, pause) |
//!
//! Words are 32 bits. Scratch space is [`SCRATCH_WORDS`] words. Operation
//! effects apply at the operation's end cycle.

use crate::kernel::Engine;

/// Number of elements processed by one vector operation.
pub const VLEN: usize = 8;

/// Scratch space capacity in 32-bit words.
pub const SCRATCH_WORDS: usize = 1536;

/// Engine lane counts and scratch capacity for one simulated machine.
///
/// [`MachineSpec::vliw8`] is the standard machine. Tests build reduced or
/// enlarged machines with [`MachineSpec::with_lanes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSpec {
    /// Lane count per engine, indexed by [`Engine::index`].
    lanes: [usize; Engine::COUNT],
    /// Scratch capacity in words.
    pub scratch_words: usize,
}

impl MachineSpec {
    /// The standard machine: 12 alu, 6 valu, 2 load, 2 store, 1 flow lane.
    pub fn vliw8() -> Self {
        let mut lanes = [0; Engine::COUNT];
        lanes[Engine::Alu.index()] = 12;
        lanes[Engine::Valu.index()] = 6;
        lanes[Engine::Load.index()] = 2;
        lanes[Engine::Store.index()] = 2;
        lanes[Engine::Flow.index()] = 1;
        Self {
            lanes,
            scratch_words: SCRATCH_WORDS,
        }
    }

    /// Lane count for an engine.
    #[inline]
    pub fn lanes(&self, engine: Engine) -> usize {
        self.lanes[engine.index()]
    }

    /// Override the lane count for one engine.
    pub fn with_lanes(mut self, engine: Engine, lanes: usize) -> Self {
        self.lanes[engine.index()] = lanes;
        self
    }

    /// Override the scratch capacity.
    pub fn with_scratch_words(mut self, words: usize) -> Self {
        self.scratch_words = words;
        self
    }

    /// Total lane count across all engines.
    pub fn total_lanes(&self) -> usize {
        self.lanes.iter().sum()
    }

    /// Stable global track id for a lane, used by the trace recorder.
    ///
    /// Lanes are numbered engine by engine in [`Engine::all`] order, so the
    /// mapping is a pure function of the spec.
    pub fn track_id(&self, engine: Engine, lane: usize) -> usize {
        let mut base = 0;
        for e in Engine::all() {
            if e == engine {
                break;
            }
            base += self.lanes(e);
        }
        base + lane
    }

    /// Inverse of [`MachineSpec::track_id`].
    pub fn lane_for_track(&self, track: usize) -> Option<(Engine, usize)> {
        let mut base = 0;
        for e in Engine::all() {
            let n = self.lanes(e);
            if track < base + n {
                return Some((e, track - base));
            }
            base += n;
        }
        None
    }
}

impl Default for MachineSpec {
    fn default() -> Self {
        Self::vliw8()
    }
}
