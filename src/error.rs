use crate::direction::Direction;
use crate::link::{DoorType, LinkType};
use crate::room::RoomId;
use thiserror::Error;

/// A raw direction index outside `0..=3`, carrying the value exactly as given.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
#[error("direction {0} is out of range (expected 0..=3)")]
pub struct OutOfRangeError(pub i128);

/// Errors from [`RoomGraph`](crate::room_graph::RoomGraph) mutators and queries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error(transparent)]
    OutOfRange(#[from] OutOfRangeError),
    #[error("room {0:?} does not belong to this graph")]
    UnknownRoom(RoomId),
    #[error("cell ({x}, {y}) already holds a room")]
    Occupied { x: i32, y: i32 },
}

/// Structural problem found by [`RoomGraph::validate`](crate::room_graph::RoomGraph::validate).
///
/// Recoverable: the generator discards the attempt and retries with a new seed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("graph has no rooms")]
    Empty,
    #[error("room {room:?} points {direction:?} at a room that does not point back")]
    AsymmetricNeighbor { room: RoomId, direction: Direction },
    #[error("room {room:?} points {direction:?} at a room that is not adjacent on the grid")]
    MisplacedNeighbor { room: RoomId, direction: Direction },
    #[error("room {room:?} is linked {direction:?} but has no neighbor there")]
    DanglingLink { room: RoomId, direction: Direction },
    #[error("room {room:?} links {direction:?} with {link:?} but the neighbor answers {reciprocal:?}")]
    LinkMismatch {
        room: RoomId,
        direction: Direction,
        link: LinkType,
        reciprocal: LinkType,
    },
    #[error("room {room:?} has door {door:?} {direction:?} but the neighbor has {reciprocal:?}")]
    DoorMismatch {
        room: RoomId,
        direction: Direction,
        door: DoorType,
        reciprocal: DoorType,
    },
    #[error("expected exactly one start room, found {0}")]
    StartCount(usize),
    #[error("expected exactly one end room, found {0}")]
    EndCount(usize),
    #[error("room {0:?} has no role")]
    MissingRole(RoomId),
    #[error("no linked path from the start room to the end room")]
    EndUnreachable,
    #[error("only {reached} of {total} rooms are reachable from the start room")]
    Disconnected { reached: usize, total: usize },
}

/// A floor template that can never produce a layout.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("template {0} has no room cells")]
    EmptyShape(String),
    #[error("template {template}: mask row {row} has width {width}, expected {expected}")]
    RaggedMask {
        template: String,
        row: usize,
        width: usize,
        expected: usize,
    },
    #[error("template {template}: unknown mask character {found:?} at ({x}, {y})")]
    UnknownMaskCell {
        template: String,
        x: i32,
        y: i32,
        found: char,
    },
    #[error("template {0} allows no door types")]
    NoDoorTypes(String),
    #[error("template {template}: loop chance {chance} is not within 0..=1")]
    InvalidLoopChance { template: String, chance: f64 },
    #[error("template {template}: cell ({x}, {y}) is outside the floor shape")]
    CellOutsideShape { template: String, x: i32, y: i32 },
    #[error("template {template}: a {width}x{height} shape does not fit the grid")]
    ShapeTooLarge {
        template: String,
        width: u64,
        height: u64,
    },
    #[error("template {template}: fixed link from ({x}, {y}) toward {direction:?} leaves the floor shape")]
    LinkLeavesShape {
        template: String,
        x: i32,
        y: i32,
        direction: Direction,
    },
    #[error("template {template}: door type {} at ({x}, {y}) is not allowed", door.value())]
    DoorNotAllowed {
        template: String,
        x: i32,
        y: i32,
        door: DoorType,
    },
    #[error("template {template}: start and end are both at ({x}, {y})")]
    SameEndpoints { template: String, x: i32, y: i32 },
}

/// Failure to produce a floor for a caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("no floor template named {0}")]
    UnknownTemplate(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("floor {template} could not be generated after {attempts} attempts")]
    Exhausted { template: String, attempts: u32 },
}
