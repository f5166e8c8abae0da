mod carve;
pub mod direction;
pub mod error;
pub mod generator;
pub mod link;
pub mod room;
pub mod room_graph;
pub mod template;

pub use direction::{opposite, AsDirection, Direction, DIRECTIONS};
pub use error::{GenerationError, GraphError, OutOfRangeError, TemplateError, ValidationFailure};
pub use generator::{generate_floor, FloorGenerator, FloorLayout, GenerationState, GeneratorConfig};
pub use link::{DoorType, LinkType};
pub use room::{GridPos, RoomId, RoomNode, RoomRole};
pub use room_graph::RoomGraph;
pub use template::{CarvePolicy, Endpoints, FixedLink, FloorShape, FloorTemplate, TemplateCatalog};
