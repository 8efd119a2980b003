//! Execution trace recording.
//!
//! Buffers the timed events of a run and serializes them as Chrome trace
//! event JSON, the format generic trace viewers consume. Every engine lane
//! becomes one thread track (named by `thread_name` metadata records), each
//! retired operation one complete (`ph:"X"`) event with its start cycle as
//! the timestamp and its duration in cycles. One cycle is one trace tick.
//!
//! Serialization is a pure function of the machine description and the
//! accumulated event list, so re-running the same kernel produces a
//! byte-identical file. [`parse`] reconstructs the event list from the JSON
//! with no loss, which the tests use to close the loop.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kernel::Engine;
use crate::machine::MachineSpec;
use crate::sim::{Event, RunResult};

/// Trace serialization or reconstruction failure.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace JSON invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("trace record {record} lacks field {field:?}")]
    MissingField { record: usize, field: &'static str },

    #[error("trace record {record} names unknown track {tid}")]
    UnknownTrack { record: usize, tid: u32 },

    #[error("trace record {record} category {cat:?} does not match track {tid}")]
    CategoryMismatch { record: usize, cat: String, tid: u32 },
}

/// One record of the trace file.
///
/// Field order is fixed by this struct, which is what keeps the emitted
/// JSON stable across runs.
#[derive(Debug, Serialize, Deserialize)]
struct TraceRecord {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cat: Option<String>,
    ph: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dur: Option<u64>,
    pid: u32,
    tid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<TraceArgs>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TraceArgs {
    /// Operation index, on `ph:"X"` records.
    #[serde(skip_serializing_if = "Option::is_none")]
    op: Option<usize>,
    /// Track label, on `thread_name` metadata records.
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraceFile {
    #[serde(rename = "traceEvents")]
    trace_events: Vec<TraceRecord>,
}

const TRACE_PID: u32 = 1;

/// Accumulates events in retirement order and serializes them.
#[derive(Debug, Clone)]
pub struct TraceRecorder {
    spec: MachineSpec,
    events: Vec<Event>,
}

impl TraceRecorder {
    pub fn new(spec: MachineSpec) -> Self {
        Self {
            spec,
            events: Vec::new(),
        }
    }

    /// Append one retired event.
    pub fn record(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Append every event of a finished run, preserving retirement order.
    pub fn record_run(&mut self, result: &RunResult) {
        self.events.extend(result.events.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialize to Chrome trace event JSON.
    ///
    /// Metadata records for every lane come first, ordered by track id, then
    /// the recorded events in accumulation order.
    pub fn to_json(&self) -> Result<String, TraceError> {
        let mut records = Vec::with_capacity(self.spec.total_lanes() + self.events.len());
        for engine in Engine::all() {
            for lane in 0..self.spec.lanes(engine) {
                records.push(TraceRecord {
                    name: "thread_name".to_string(),
                    cat: None,
                    ph: "M".to_string(),
                    ts: None,
                    dur: None,
                    pid: TRACE_PID,
                    tid: self.spec.track_id(engine, lane) as u32,
                    args: Some(TraceArgs {
                        op: None,
                        name: Some(format!("{}.{}", engine.name(), lane)),
                    }),
                });
            }
        }
        for event in &self.events {
            records.push(TraceRecord {
                name: event.label.clone(),
                cat: Some(event.engine.name().to_string()),
                ph: "X".to_string(),
                ts: Some(event.start),
                dur: Some(event.end - event.start),
                pid: TRACE_PID,
                tid: self.spec.track_id(event.engine, event.lane) as u32,
                args: Some(TraceArgs {
                    op: Some(event.index),
                    name: None,
                }),
            });
        }
        let file = TraceFile {
            trace_events: records,
        };
        Ok(serde_json::to_string(&file)?)
    }

    /// Write the trace to `path`.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), TraceError> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json)?;
        log::info!(
            "wrote trace with {} events to {}",
            self.events.len(),
            path.as_ref().display()
        );
        Ok(())
    }
}

/// Reconstruct the event list from trace JSON.
///
/// Metadata records are skipped; complete events are mapped back through
/// the machine description's lane numbering. Cycle values survive exactly:
/// they are integers in both representations.
pub fn parse(json: &str, spec: &MachineSpec) -> Result<Vec<Event>, TraceError> {
    let file: TraceFile = serde_json::from_str(json)?;
    let mut events = Vec::new();
    for (record_index, record) in file.trace_events.iter().enumerate() {
        if record.ph != "X" {
            continue;
        }
        let ts = record.ts.ok_or(TraceError::MissingField {
            record: record_index,
            field: "ts",
        })?;
        let dur = record.dur.ok_or(TraceError::MissingField {
            record: record_index,
            field: "dur",
        })?;
        let op = record
            .args
            .as_ref()
            .and_then(|a| a.op)
            .ok_or(TraceError::MissingField {
                record: record_index,
                field: "args.op",
            })?;
        let (engine, lane) =
            spec.lane_for_track(record.tid as usize)
                .ok_or(TraceError::UnknownTrack {
                    record: record_index,
                    tid: record.tid,
                })?;
        if let Some(cat) = &record.cat {
            if Engine::from_name(cat) != Some(engine) {
                return Err(TraceError::CategoryMismatch {
                    record: record_index,
                    cat: cat.clone(),
                    tid: record.tid,
                });
            }
        }
        events.push(Event {
            index: op,
            engine,
            lane,
            start: ts,
            end: ts + dur,
            label: record.name.clone(),
        });
    }
    Ok(events)
}
