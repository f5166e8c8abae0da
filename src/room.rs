use crate::direction::{AsDirection, Direction, DIRECTIONS};
use crate::error::OutOfRangeError;
use crate::link::{DoorType, LinkType};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

pub type GridPos = Vector2<i32>;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomRole {
    #[default]
    None,
    Alley,
    Start,
    End,
    Room,
}

#[derive(Ord, PartialOrd, PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub struct RoomId(usize);

impl RoomId {
    pub fn first() -> Self {
        RoomId(0)
    }

    pub fn gen_id(&mut self) -> Self {
        let ret = *self;
        self.0 += 1;
        ret
    }

    pub fn inner(&self) -> usize {
        self.0
    }
}

/// One vertex of the floor graph.
///
/// Slots are indexed by [`Direction`]. Neighbor ids are adjacency pointers
/// only; the owning [`RoomGraph`](crate::room_graph::RoomGraph) performs every
/// write that must stay mirrored on the other side of an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomNode {
    id: RoomId,
    position: GridPos,
    neighbors: [Option<RoomId>; 4],
    links: [LinkType; 4],
    door_types: [DoorType; 4],
    role: RoomRole,
}

impl RoomNode {
    pub(crate) fn new(id: RoomId, position: GridPos) -> Self {
        RoomNode {
            id,
            position,
            neighbors: [None; 4],
            links: [LinkType::NONE; 4],
            door_types: [DoorType::PLAIN; 4],
            role: RoomRole::None,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn position(&self) -> GridPos {
        self.position
    }

    pub fn role(&self) -> RoomRole {
        self.role
    }

    pub fn neighbor(&self, direction: impl AsDirection) -> Result<Option<RoomId>, OutOfRangeError> {
        Ok(self.neighbors[direction.as_direction()?.index()])
    }

    pub fn is_linked(&self, direction: impl AsDirection) -> Result<bool, OutOfRangeError> {
        Ok(self.link_type(direction)?.is_open())
    }

    pub fn link_type(&self, direction: impl AsDirection) -> Result<LinkType, OutOfRangeError> {
        Ok(self.links[direction.as_direction()?.index()])
    }

    pub fn door_type(&self, direction: impl AsDirection) -> Result<DoorType, OutOfRangeError> {
        Ok(self.door_types[direction.as_direction()?.index()])
    }

    /// Directions with an open link, in slot order.
    pub fn linked_directions(&self) -> impl Iterator<Item = Direction> + '_ {
        DIRECTIONS
            .iter()
            .copied()
            .filter(|dir| self.links[dir.index()].is_open())
    }

    pub fn link_count(&self) -> usize {
        self.linked_directions().count()
    }

    #[inline]
    pub(crate) fn neighbor_at(&self, direction: Direction) -> Option<RoomId> {
        self.neighbors[direction.index()]
    }

    #[inline]
    pub(crate) fn link_at(&self, direction: Direction) -> LinkType {
        self.links[direction.index()]
    }

    #[inline]
    pub(crate) fn door_at(&self, direction: Direction) -> DoorType {
        self.door_types[direction.index()]
    }

    /// One-sided write; callers keep the other end in sync.
    pub(crate) fn set_neighbor(&mut self, direction: Direction, room: Option<RoomId>) {
        self.neighbors[direction.index()] = room;
    }

    pub(crate) fn set_link(&mut self, direction: Direction, link: LinkType) {
        self.links[direction.index()] = link;
    }

    pub(crate) fn set_door(&mut self, direction: Direction, door: DoorType) {
        self.door_types[direction.index()] = door;
    }

    pub(crate) fn set_role(&mut self, role: RoomRole) {
        self.role = role;
    }
}
