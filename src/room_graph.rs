use crate::direction::{AsDirection, Direction, DIRECTIONS};
use crate::error::{GraphError, OutOfRangeError, ValidationFailure};
use crate::link::{DoorType, LinkType};
use crate::room::{GridPos, RoomId, RoomNode, RoomRole};
use pathfinding::prelude::{bfs, bfs_reach};
use std::collections::HashMap;
use std::fmt;

/// Owns every [`RoomNode`] of one floor and performs all edge writes.
///
/// Each mutator that touches an edge updates both endpoints in the same call,
/// so neighbor symmetry, link reciprocity and door symmetry cannot be broken
/// through this API. Only [`validate`](Self::validate) checks the global
/// properties (roles and connectivity).
#[derive(Debug, Clone)]
pub struct RoomGraph {
    rooms: Vec<RoomNode>,
    cells: HashMap<GridPos, RoomId>,
    next_id: RoomId,
}

impl Default for RoomGraph {
    fn default() -> Self {
        RoomGraph::new()
    }
}

impl RoomGraph {
    pub fn new() -> Self {
        RoomGraph {
            rooms: Vec::new(),
            cells: HashMap::new(),
            next_id: RoomId::first(),
        }
    }

    /// Allocates one room per cell, wiring grid adjacency as it goes.
    pub fn from_cells<I>(cells: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = GridPos>,
    {
        let mut graph = RoomGraph::new();
        for cell in cells {
            graph.add_room(cell)?;
        }
        Ok(graph)
    }

    /// Adds a room at `position` and points it at every existing room on an
    /// adjacent cell, setting the reverse pointers at the same time.
    pub fn add_room(&mut self, position: GridPos) -> Result<RoomId, GraphError> {
        if self.cells.contains_key(&position) {
            return Err(GraphError::Occupied {
                x: position.x,
                y: position.y,
            });
        }
        let id = self.next_id.gen_id();
        let mut node = RoomNode::new(id, position);
        for dir in DIRECTIONS {
            let Some(cell) = dir.step(&position) else {
                continue;
            };
            if let Some(&other) = self.cells.get(&cell) {
                node.set_neighbor(*dir, Some(other));
                self.rooms[other.inner()].set_neighbor(dir.opposite(), Some(id));
            }
        }
        self.rooms.push(node);
        self.cells.insert(position, id);
        Ok(id)
    }

    /// Sets the link tag of `room` toward `direction`; the neighbor on that
    /// side, if any, receives the complementary tag.
    pub fn link(
        &mut self,
        room: RoomId,
        direction: impl AsDirection,
        link: LinkType,
    ) -> Result<(), GraphError> {
        let direction = direction.as_direction()?;
        let neighbor = {
            let node = self.node_mut(room)?;
            node.set_link(direction, link);
            node.neighbor_at(direction)
        };
        if let Some(neighbor) = neighbor {
            self.rooms[neighbor.inner()].set_link(direction.opposite(), link.complement());
        }
        Ok(())
    }

    /// Sets the door of `room` toward `direction` and mirrors it on the neighbor.
    pub fn set_door_type(
        &mut self,
        room: RoomId,
        direction: impl AsDirection,
        door: DoorType,
    ) -> Result<(), GraphError> {
        let direction = direction.as_direction()?;
        let neighbor = {
            let node = self.node_mut(room)?;
            node.set_door(direction, door);
            node.neighbor_at(direction)
        };
        if let Some(neighbor) = neighbor {
            self.rooms[neighbor.inner()].set_door(direction.opposite(), door);
        }
        Ok(())
    }

    pub fn open_passage(
        &mut self,
        room: RoomId,
        direction: impl AsDirection,
        link: LinkType,
        door: DoorType,
    ) -> Result<(), GraphError> {
        let direction = direction.as_direction()?;
        self.link(room, direction, link)?;
        self.set_door_type(room, direction, door)
    }

    pub fn set_role(&mut self, room: RoomId, role: RoomRole) -> Result<(), GraphError> {
        self.node_mut(room)?.set_role(role);
        Ok(())
    }

    fn node_mut(&mut self, room: RoomId) -> Result<&mut RoomNode, GraphError> {
        self.rooms
            .get_mut(room.inner())
            .ok_or(GraphError::UnknownRoom(room))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn room(&self, room: RoomId) -> Option<&RoomNode> {
        self.rooms.get(room.inner())
    }

    pub fn room_at(&self, position: &GridPos) -> Option<&RoomNode> {
        self.id_at(position).and_then(|id| self.room(id))
    }

    pub fn id_at(&self, position: &GridPos) -> Option<RoomId> {
        self.cells.get(position).copied()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomNode> {
        self.rooms.iter()
    }

    /// `false` when no room occupies `position`.
    pub fn is_linked(
        &self,
        position: &GridPos,
        direction: impl AsDirection,
    ) -> Result<bool, OutOfRangeError> {
        match self.room_at(position) {
            Some(room) => room.is_linked(direction),
            None => direction.as_direction().map(|_| false),
        }
    }

    pub fn door_type(
        &self,
        position: &GridPos,
        direction: impl AsDirection,
    ) -> Result<Option<DoorType>, OutOfRangeError> {
        match self.room_at(position) {
            Some(room) => room.door_type(direction).map(Some),
            None => direction.as_direction().map(|_| None),
        }
    }

    pub fn role(&self, position: &GridPos) -> Option<RoomRole> {
        self.room_at(position).map(RoomNode::role)
    }

    pub fn start(&self) -> Option<RoomId> {
        self.first_with_role(RoomRole::Start)
    }

    pub fn end(&self) -> Option<RoomId> {
        self.first_with_role(RoomRole::End)
    }

    fn first_with_role(&self, role: RoomRole) -> Option<RoomId> {
        self.rooms
            .iter()
            .find(|room| room.role() == role)
            .map(RoomNode::id)
    }

    /// Grid-adjacent rooms, linked or not.
    pub fn neighbors(&self, room: RoomId) -> impl Iterator<Item = (Direction, RoomId)> + '_ {
        self.room(room).into_iter().flat_map(|node| {
            DIRECTIONS
                .iter()
                .filter_map(move |dir| node.neighbor_at(*dir).map(|id| (*dir, id)))
        })
    }

    /// Rooms reachable from `room` through one open link.
    pub fn linked_neighbors(&self, room: RoomId) -> impl Iterator<Item = RoomId> + '_ {
        self.room(room).into_iter().flat_map(|node| {
            node.linked_directions()
                .filter_map(move |dir| node.neighbor_at(dir))
        })
    }

    /// Rooms in breadth-first order over open links, starting at `room`.
    pub fn reachable_from(&self, room: RoomId) -> impl Iterator<Item = RoomId> + '_ {
        bfs_reach(room, move |id| self.linked_neighbors(*id))
    }

    /// Smallest and largest occupied cell coordinates.
    pub fn bounds(&self) -> Option<(GridPos, GridPos)> {
        let mut positions = self.rooms.iter().map(RoomNode::position);
        let first = positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| (min.inf(&p), max.sup(&p))))
    }

    /// Checks every structural invariant of a finished floor.
    ///
    /// Read-only: calling it again on the same graph gives the same answer.
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        if self.rooms.is_empty() {
            return Err(ValidationFailure::Empty);
        }

        for room in &self.rooms {
            for dir in DIRECTIONS.iter().copied() {
                self.validate_edge(room, dir)?;
            }
        }

        let mut starts = 0;
        let mut ends = 0;
        for room in &self.rooms {
            match room.role() {
                RoomRole::Start => starts += 1,
                RoomRole::End => ends += 1,
                RoomRole::Room | RoomRole::Alley => {}
                RoomRole::None => return Err(ValidationFailure::MissingRole(room.id())),
            }
        }
        if starts != 1 {
            return Err(ValidationFailure::StartCount(starts));
        }
        if ends != 1 {
            return Err(ValidationFailure::EndCount(ends));
        }
        let (Some(start), Some(end)) = (self.start(), self.end()) else {
            return Err(ValidationFailure::EndUnreachable);
        };

        if bfs(&start, |id| self.linked_neighbors(*id), |id| *id == end).is_none() {
            return Err(ValidationFailure::EndUnreachable);
        }
        let reached = self.reachable_from(start).count();
        if reached != self.rooms.len() {
            return Err(ValidationFailure::Disconnected {
                reached,
                total: self.rooms.len(),
            });
        }
        Ok(())
    }

    fn validate_edge(&self, room: &RoomNode, dir: Direction) -> Result<(), ValidationFailure> {
        let link = room.link_at(dir);
        let Some(neighbor_id) = room.neighbor_at(dir) else {
            if link.is_open() {
                return Err(ValidationFailure::DanglingLink {
                    room: room.id(),
                    direction: dir,
                });
            }
            return Ok(());
        };
        let opposite = dir.opposite();
        let neighbor = match self.room(neighbor_id) {
            Some(neighbor) if neighbor.neighbor_at(opposite) == Some(room.id()) => neighbor,
            _ => {
                return Err(ValidationFailure::AsymmetricNeighbor {
                    room: room.id(),
                    direction: dir,
                })
            }
        };
        if dir.step(&room.position()) != Some(neighbor.position()) {
            return Err(ValidationFailure::MisplacedNeighbor {
                room: room.id(),
                direction: dir,
            });
        }
        let reciprocal = neighbor.link_at(opposite);
        if reciprocal != link.complement() {
            return Err(ValidationFailure::LinkMismatch {
                room: room.id(),
                direction: dir,
                link,
                reciprocal,
            });
        }
        let door = room.door_at(dir);
        let reciprocal_door = neighbor.door_at(opposite);
        if reciprocal_door != door {
            return Err(ValidationFailure::DoorMismatch {
                room: room.id(),
                direction: dir,
                door,
                reciprocal: reciprocal_door,
            });
        }
        Ok(())
    }
}

fn role_char(role: RoomRole) -> char {
    match role {
        RoomRole::None => '?',
        RoomRole::Alley => 'A',
        RoomRole::Start => 'S',
        RoomRole::End => 'E',
        RoomRole::Room => 'R',
    }
}

/// Text map: one letter per room (`#` for no room), `-` and `|` for open links.
impl fmt::Display for RoomGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((min, max)) = self.bounds() else {
            return Ok(());
        };
        for y in min.y..=max.y {
            if y != min.y {
                f.write_str("\n")?;
            }
            for x in min.x..=max.x {
                let room = self.room_at(&GridPos::new(x, y));
                write!(f, "{}", room.map_or('#', |room| role_char(room.role())))?;
                if x < max.x {
                    let open = room.is_some_and(|room| room.link_at(Direction::Right).is_open());
                    f.write_str(if open { "-" } else { " " })?;
                }
            }
            if y < max.y {
                f.write_str("\n")?;
                for x in min.x..=max.x {
                    let open = self
                        .room_at(&GridPos::new(x, y))
                        .is_some_and(|room| room.link_at(Direction::Down).is_open());
                    f.write_str(if open { "|" } else { "." })?;
                    if x < max.x {
                        f.write_str(" ")?;
                    }
                }
            }
        }
        Ok(())
    }
}
