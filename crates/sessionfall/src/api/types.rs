use bytemuck::{Pod, Zeroable};
use serde::Deserialize;
use serde_json::Value;
use crate::api::error::ConfigError;

/// Unique identifier for a ball in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BallId(pub u32);

/// One transport delivery. Tuples are kept as raw JSON so a malformed entry
/// can be skipped without rejecting the rest of the batch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataBatch {
    pub insert: Vec<Value>,
    pub delete: Vec<Value>,
    pub update: Vec<Value>,
}

impl DataBatch {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.delete.is_empty() && self.update.is_empty()
    }
}

/// Why a ball was exploded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// The session was deleted upstream.
    Deleted,
    /// The stack crossed the border line.
    BorderOverflow,
}

/// Something the engine did that a host may want to react to (sound, counters, tests).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    BallSpawned { id: BallId, column: usize },
    BallLanded { id: BallId, column: usize },
    Exploded { id: BallId, x: f32, y: f32, reason: RemovalReason },
    FlipStarted { id: BallId },
}

impl EngineEvent {
    pub const KIND_SPAWNED: f32 = 1.0;
    pub const KIND_LANDED: f32 = 2.0;
    pub const KIND_EXPLODED: f32 = 3.0;
    pub const KIND_OVERFLOW: f32 = 4.0;
    pub const KIND_FLIP: f32 = 5.0;

    /// Flatten into the 4-float wire form read by the JS host.
    pub fn to_wire(&self) -> WireEvent {
        match *self {
            EngineEvent::BallSpawned { id, column } => WireEvent {
                kind: Self::KIND_SPAWNED, a: id.0 as f32, b: column as f32, c: 0.0,
            },
            EngineEvent::BallLanded { id, column } => WireEvent {
                kind: Self::KIND_LANDED, a: id.0 as f32, b: column as f32, c: 0.0,
            },
            EngineEvent::Exploded { x, y, reason, id } => WireEvent {
                kind: match reason {
                    RemovalReason::Deleted => Self::KIND_EXPLODED,
                    RemovalReason::BorderOverflow => Self::KIND_OVERFLOW,
                },
                a: x,
                b: y,
                c: id.0 as f32,
            },
            EngineEvent::FlipStarted { id } => WireEvent {
                kind: Self::KIND_FLIP, a: id.0 as f32, b: 0.0, c: 0.0,
            },
        }
    }
}

/// An engine event as written to shared memory.
/// `kind` identifies the event, `a/b/c` carry payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct WireEvent {
    pub kind: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl WireEvent {
    pub const FLOATS: usize = 4;
}
