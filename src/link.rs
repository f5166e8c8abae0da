use serde::{Deserialize, Serialize};

/// Traversal tag on one side of an edge.
///
/// `0` is closed. `FORWARD` and `BACKWARD` form a complementary pair, so a
/// room linked `FORWARD` toward its neighbor is seen `BACKWARD` from the other
/// side. Any other non-zero tag mirrors as itself.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkType(u8);

impl LinkType {
    pub const NONE: LinkType = LinkType(0);
    pub const FORWARD: LinkType = LinkType(1);
    pub const BACKWARD: LinkType = LinkType(2);

    pub const fn new(value: u8) -> Self {
        LinkType(value)
    }

    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_open(self) -> bool {
        self.0 != 0
    }

    /// The tag the neighbor must carry on the reciprocal slot.
    pub const fn complement(self) -> LinkType {
        match self.0 {
            1 => LinkType::BACKWARD,
            2 => LinkType::FORWARD,
            other => LinkType(other),
        }
    }
}

impl From<u8> for LinkType {
    fn from(value: u8) -> Self {
        LinkType(value)
    }
}

/// Threshold rendered between two rooms; both sides always carry the same value.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoorType(u32);

impl DoorType {
    pub const PLAIN: DoorType = DoorType(0);

    pub const fn new(value: u32) -> Self {
        DoorType(value)
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for DoorType {
    fn from(value: u32) -> Self {
        DoorType(value)
    }
}
