//! Dependency derivation and cycle detection.
//!
//! Builds the ordering constraints a schedule must honor:
//!
//! - **RAW**: a read of a scratch cell waits for the last write to it.
//! - **WAW**: a write waits for the previous write to the same cell.
//! - **WAR**: a write waits for every read issued since that previous write.
//! - Memory is treated as a single location: loads are readers, stores are
//!   writers. Two loads may overlap; anything involving a store is ordered.
//! - A pause orders after everything before it and before everything after
//!   it.
//! - Explicit `after` edges declared on the kernel are unioned in.
//!
//! Derived edges always point from an earlier to a later index, but explicit
//! edges may point anywhere, so the combined graph is checked for cycles
//! (Kahn) before any scheduling happens. A cyclic kernel is rejected
//! outright rather than hung on.

use smallvec::SmallVec;

use crate::kernel::{Kernel, MemEffect, Op};
use crate::sim::ConfigError;

/// Dependency DAG over operation indices.
#[derive(Debug, Clone)]
pub struct DepGraph {
    /// Direct predecessors per operation, sorted and deduplicated.
    preds: Vec<Vec<u32>>,
    /// Direct successors per operation.
    succs: Vec<Vec<u32>>,
}

impl DepGraph {
    /// Predecessors of `index`.
    pub fn preds(&self, index: usize) -> &[u32] {
        &self.preds[index]
    }

    /// Successors of `index`.
    pub fn succs(&self, index: usize) -> &[u32] {
        &self.succs[index]
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.preds.len()
    }

    /// True for an empty graph.
    pub fn is_empty(&self) -> bool {
        self.preds.is_empty()
    }

    /// Total edge count.
    pub fn edge_count(&self) -> usize {
        self.preds.iter().map(Vec::len).sum()
    }
}

/// Derive the dependency graph for a kernel.
pub fn build(kernel: &Kernel) -> Result<DepGraph, ConfigError> {
    let n = kernel.len();
    let ops = kernel.ops();

    // Highest scratch cell mentioned bounds the tracking tables; static
    // bounds against the machine spec are checked by the simulator.
    let mut max_cell = 0usize;
    for op in ops {
        for c in op.reads().iter().chain(op.writes().iter()) {
            max_cell = max_cell.max(*c as usize + 1);
        }
    }

    let mut last_write: Vec<Option<u32>> = vec![None; max_cell];
    let mut reads_since: Vec<SmallVec<[u32; 2]>> = vec![SmallVec::new(); max_cell];
    let mut mem_last_store: Option<u32> = None;
    let mut mem_loads_since: Vec<u32> = Vec::new();
    let mut last_pause: Option<u32> = None;
    let mut since_pause: Vec<u32> = Vec::new();

    let mut preds: Vec<Vec<u32>> = vec![Vec::new(); n];

    for (i, op) in ops.iter().enumerate() {
        let idx = i as u32;
        let mut edges: SmallVec<[u32; 8]> = SmallVec::new();

        for &cell in op.reads().iter() {
            if let Some(w) = last_write[cell as usize] {
                edges.push(w); // RAW
            }
        }
        for &cell in op.writes().iter() {
            if let Some(w) = last_write[cell as usize] {
                edges.push(w); // WAW
            }
            edges.extend_from_slice(&reads_since[cell as usize]); // WAR
        }
        match op.mem_effect() {
            Some(MemEffect::Read) => {
                if let Some(s) = mem_last_store {
                    edges.push(s);
                }
            }
            Some(MemEffect::Write) => {
                if let Some(s) = mem_last_store {
                    edges.push(s);
                }
                edges.extend_from_slice(&mem_loads_since);
            }
            None => {}
        }
        if let Some(p) = last_pause {
            edges.push(p);
        }
        if matches!(op, Op::Pause) {
            edges.extend_from_slice(&since_pause);
        }

        edges.sort_unstable();
        edges.dedup();
        preds[i] = edges.into_vec();

        // Update tracking state after the edges are drawn.
        for &cell in op.writes().iter() {
            last_write[cell as usize] = Some(idx);
            reads_since[cell as usize].clear();
        }
        for &cell in op.reads().iter() {
            reads_since[cell as usize].push(idx);
        }
        match op.mem_effect() {
            Some(MemEffect::Read) => mem_loads_since.push(idx),
            Some(MemEffect::Write) => {
                mem_last_store = Some(idx);
                mem_loads_since.clear();
            }
            None => {}
        }
        if matches!(op, Op::Pause) {
            last_pause = Some(idx);
            since_pause.clear();
        } else {
            since_pause.push(idx);
        }
    }

    // Union in the kernel's explicit edges.
    for &(earlier, later) in kernel.explicit_deps() {
        for target in [earlier, later] {
            if target >= n {
                return Err(ConfigError::DependencyOutOfRange { target, len: n });
            }
        }
        let e = earlier as u32;
        if !preds[later].contains(&e) {
            preds[later].push(e);
            preds[later].sort_unstable();
        }
    }

    let mut succs: Vec<Vec<u32>> = vec![Vec::new(); n];
    for (i, ps) in preds.iter().enumerate() {
        for &p in ps {
            succs[p as usize].push(i as u32);
        }
    }

    let graph = DepGraph { preds, succs };
    check_acyclic(&graph)?;
    log::debug!(
        "dependency graph: {} ops, {} edges",
        graph.len(),
        graph.edge_count()
    );
    Ok(graph)
}

/// Kahn's algorithm; reports the lowest-indexed operation left on a cycle.
fn check_acyclic(graph: &DepGraph) -> Result<(), ConfigError> {
    let n = graph.len();
    let mut indegree: Vec<u32> = (0..n).map(|i| graph.preds(i).len() as u32).collect();
    let mut queue: Vec<u32> = (0..n as u32).filter(|&i| indegree[i as usize] == 0).collect();
    let mut seen = 0usize;

    while let Some(i) = queue.pop() {
        seen += 1;
        for &s in graph.succs(i as usize) {
            indegree[s as usize] -= 1;
            if indegree[s as usize] == 0 {
                queue.push(s);
            }
        }
    }

    if seen == n {
        Ok(())
    } else {
        let index = indegree
            .iter()
            .position(|&d| d > 0)
            .unwrap_or(0);
        Err(ConfigError::CyclicDependency { index })
    }
}
