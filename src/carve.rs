use crate::direction::{Direction, DIRECTIONS};
use crate::error::GraphError;
use crate::link::{DoorType, LinkType};
use crate::room::{GridPos, RoomId, RoomNode, RoomRole};
use crate::room_graph::RoomGraph;
use crate::template::{CarvePolicy, Endpoints, FixedLink, FloorTemplate};
use pathfinding::prelude::{bfs_reach, kruskal};
use rand::prelude::{IteratorRandom, SliceRandom};
use rand::Rng;
use std::collections::HashSet;

/// Carves passages into a freshly allocated grid, opens extra loops and
/// assigns room roles. The result still has to pass
/// [`RoomGraph::validate`].
pub(crate) fn carve<R: Rng>(
    graph: &mut RoomGraph,
    template: &FloorTemplate,
    rng: &mut R,
) -> Result<(), GraphError> {
    let fixed_start = match template.endpoints {
        Endpoints::Fixed { start, .. } => graph.id_at(&GridPos::new(start.0, start.1)),
        Endpoints::LongestPath => None,
    };
    let Some(root) = fixed_start.or_else(|| graph.rooms().map(RoomNode::id).choose(rng)) else {
        return Ok(());
    };

    let doors = &template.door_types;
    match &template.carve {
        CarvePolicy::Backtracking => carve_backtracking(graph, root, doors, rng)?,
        CarvePolicy::RandomWalk => carve_random_walk(graph, root, doors, rng)?,
        CarvePolicy::SpanningTree => carve_spanning_tree(graph, doors, rng)?,
        CarvePolicy::Fixed { links } => carve_fixed(graph, links)?,
    }
    add_loops(graph, template.loop_chance, doors, rng)?;
    assign_roles(graph, &template.endpoints, root)
}

fn open_passage<R: Rng>(
    graph: &mut RoomGraph,
    room: RoomId,
    direction: Direction,
    doors: &[DoorType],
    rng: &mut R,
) -> Result<(), GraphError> {
    let door = doors.choose(rng).copied().unwrap_or_default();
    graph.open_passage(room, direction, LinkType::FORWARD, door)
}

fn carve_backtracking<R: Rng>(
    graph: &mut RoomGraph,
    root: RoomId,
    doors: &[DoorType],
    rng: &mut R,
) -> Result<(), GraphError> {
    let mut visited = HashSet::from([root]);
    let mut stack = vec![root];
    while let Some(&current) = stack.last() {
        let mut dirs = *DIRECTIONS;
        dirs.shuffle(rng);
        let next = dirs.iter().find_map(|dir| {
            graph
                .room(current)?
                .neighbor(*dir)
                .ok()
                .flatten()
                .filter(|neighbor| !visited.contains(neighbor))
                .map(|neighbor| (*dir, neighbor))
        });
        match next {
            Some((dir, neighbor)) => {
                open_passage(graph, current, dir, doors, rng)?;
                visited.insert(neighbor);
                stack.push(neighbor);
            }
            None => {
                stack.pop();
            }
        }
    }
    Ok(())
}

fn carve_random_walk<R: Rng>(
    graph: &mut RoomGraph,
    root: RoomId,
    doors: &[DoorType],
    rng: &mut R,
) -> Result<(), GraphError> {
    // Rooms cut off from the root on the grid itself can never be entered.
    let reachable = bfs_reach(root, |id| {
        graph
            .neighbors(*id)
            .map(|(_, neighbor)| neighbor)
            .collect::<Vec<_>>()
    })
    .count();

    let mut visited = HashSet::from([root]);
    let mut current = root;
    while visited.len() < reachable {
        let candidates = graph.neighbors(current).collect::<Vec<_>>();
        let Some(&(dir, next)) = candidates.choose(rng) else {
            break;
        };
        if visited.insert(next) {
            open_passage(graph, current, dir, doors, rng)?;
        }
        current = next;
    }
    Ok(())
}

fn carve_spanning_tree<R: Rng>(
    graph: &mut RoomGraph,
    doors: &[DoorType],
    rng: &mut R,
) -> Result<(), GraphError> {
    let mut weighted_edges = Vec::new();
    for room in graph.rooms() {
        for dir in [Direction::Right, Direction::Down] {
            if let Ok(Some(neighbor)) = room.neighbor(dir) {
                weighted_edges.push((room.id(), neighbor, rng.gen::<u32>()));
            }
        }
    }
    let tree = kruskal(&weighted_edges)
        .map(|(room0_id, room1_id, _)| (*room0_id, *room1_id))
        .collect::<Vec<_>>();
    for (room0_id, room1_id) in tree {
        let dir = graph
            .neighbors(room0_id)
            .find(|(_, neighbor)| *neighbor == room1_id)
            .map(|(dir, _)| dir);
        if let Some(dir) = dir {
            open_passage(graph, room0_id, dir, doors, rng)?;
        }
    }
    Ok(())
}

fn carve_fixed(graph: &mut RoomGraph, links: &[FixedLink]) -> Result<(), GraphError> {
    for link in links {
        if let Some(id) = graph.id_at(&GridPos::new(link.from.0, link.from.1)) {
            graph.open_passage(id, link.direction, link.link, link.door)?;
        }
    }
    Ok(())
}

/// Opens each still-closed adjacent pair with probability `chance`.
fn add_loops<R: Rng>(
    graph: &mut RoomGraph,
    chance: f64,
    doors: &[DoorType],
    rng: &mut R,
) -> Result<(), GraphError> {
    if chance <= 0.0 {
        return Ok(());
    }
    let closed = graph
        .rooms()
        .flat_map(|room| {
            [Direction::Right, Direction::Down]
                .into_iter()
                .filter(move |dir| {
                    matches!(room.neighbor(*dir), Ok(Some(_)))
                        && !matches!(room.is_linked(*dir), Ok(true))
                })
                .map(move |dir| (room.id(), dir))
        })
        .collect::<Vec<_>>();
    for (room, dir) in closed {
        if rng.gen_bool(chance) {
            open_passage(graph, room, dir, doors, rng)?;
        }
    }
    Ok(())
}

/// Dead ends become alleys, everything else a plain room; then the start and
/// end rooms are placed.
fn assign_roles(
    graph: &mut RoomGraph,
    endpoints: &Endpoints,
    root: RoomId,
) -> Result<(), GraphError> {
    let roles = graph
        .rooms()
        .map(|room| {
            let role = if room.link_count() == 1 {
                RoomRole::Alley
            } else {
                RoomRole::Room
            };
            (room.id(), role)
        })
        .collect::<Vec<_>>();
    for (room, role) in roles {
        graph.set_role(room, role)?;
    }

    let (start, end) = match endpoints {
        Endpoints::Fixed { start, end } => (
            graph.id_at(&GridPos::new(start.0, start.1)),
            graph.id_at(&GridPos::new(end.0, end.1)),
        ),
        Endpoints::LongestPath => {
            let start = graph.reachable_from(root).last().unwrap_or(root);
            let end = graph.reachable_from(start).last().unwrap_or(start);
            (Some(start), Some(end))
        }
    };
    if let Some(start) = start {
        graph.set_role(start, RoomRole::Start)?;
    }
    if let Some(end) = end {
        graph.set_role(end, RoomRole::End)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::FloorShape;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn template(shape: FloorShape, carve: CarvePolicy) -> FloorTemplate {
        FloorTemplate {
            carve,
            door_types: vec![DoorType::new(1), DoorType::new(2)],
            ..FloorTemplate::new("test", shape)
        }
    }

    fn allocate(template: &FloorTemplate) -> RoomGraph {
        RoomGraph::from_cells(template.shape.cells(&template.id).unwrap()).unwrap()
    }

    fn open_edges(graph: &RoomGraph) -> usize {
        graph.rooms().map(RoomNode::link_count).sum::<usize>() / 2
    }

    #[test]
    fn test_tree_policies_carve_spanning_trees() {
        let shape = FloorShape::Rectangle {
            width: 4,
            height: 3,
        };
        for policy in [
            CarvePolicy::Backtracking,
            CarvePolicy::RandomWalk,
            CarvePolicy::SpanningTree,
        ] {
            for seed in 0..8 {
                let template = template(shape.clone(), policy.clone());
                let mut graph = allocate(&template);
                carve(&mut graph, &template, &mut StdRng::seed_from_u64(seed)).unwrap();
                assert_eq!(open_edges(&graph), graph.len() - 1, "{policy:?} seed {seed}");
                assert_eq!(graph.validate(), Ok(()), "{policy:?} seed {seed}");
            }
        }
    }

    #[test]
    fn test_doors_come_from_template() {
        let template = template(
            FloorShape::Rectangle {
                width: 3,
                height: 3,
            },
            CarvePolicy::Backtracking,
        );
        let mut graph = allocate(&template);
        carve(&mut graph, &template, &mut StdRng::seed_from_u64(3)).unwrap();
        for room in graph.rooms() {
            for dir in room.linked_directions() {
                let door = room.door_type(dir).unwrap();
                assert!(template.door_types.contains(&door));
            }
        }
    }

    #[test]
    fn test_loops_add_edges() {
        let mut template = template(
            FloorShape::Rectangle {
                width: 3,
                height: 3,
            },
            CarvePolicy::Backtracking,
        );
        template.loop_chance = 1.0;
        let mut graph = allocate(&template);
        carve(&mut graph, &template, &mut StdRng::seed_from_u64(11)).unwrap();
        // every adjacent pair of a 3x3 grid
        assert_eq!(open_edges(&graph), 12);
        assert_eq!(graph.validate(), Ok(()));
    }

    #[test]
    fn test_longest_path_endpoints_on_corridor() {
        let template = template(
            FloorShape::Rectangle {
                width: 5,
                height: 1,
            },
            CarvePolicy::RandomWalk,
        );
        let mut graph = allocate(&template);
        carve(&mut graph, &template, &mut StdRng::seed_from_u64(5)).unwrap();
        let ends = [
            graph.role(&GridPos::new(0, 0)),
            graph.role(&GridPos::new(4, 0)),
        ];
        assert!(ends.contains(&Some(RoomRole::Start)));
        assert!(ends.contains(&Some(RoomRole::End)));
        for x in 1..4 {
            assert_eq!(graph.role(&GridPos::new(x, 0)), Some(RoomRole::Room));
        }
    }

    #[test]
    fn test_fixed_policy() {
        let mut template = template(
            FloorShape::Rectangle {
                width: 3,
                height: 3,
            },
            CarvePolicy::Fixed {
                links: [
                    ((0, 0), Direction::Right),
                    ((1, 0), Direction::Right),
                    ((2, 0), Direction::Down),
                    ((2, 1), Direction::Left),
                    ((1, 1), Direction::Left),
                    ((0, 1), Direction::Down),
                    ((0, 2), Direction::Right),
                    ((2, 1), Direction::Down),
                ]
                .into_iter()
                .map(|(from, direction)| FixedLink {
                    from,
                    direction,
                    link: LinkType::FORWARD,
                    door: DoorType::new(2),
                })
                .collect(),
            },
        );
        template.endpoints = Endpoints::Fixed {
            start: (0, 0),
            end: (2, 2),
        };
        assert_eq!(template.validate(), Ok(()));
        let mut graph = allocate(&template);
        carve(&mut graph, &template, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(graph.validate(), Ok(()));
        assert_eq!(
            graph.door_type(&GridPos::new(1, 2), Direction::Left),
            Ok(Some(DoorType::new(2)))
        );
        insta::assert_snapshot!(graph.to_string(), @r"
        S-R-R
        . . |
        R-R-R
        | . |
        R-A E
        ");
    }

    #[test]
    fn test_disconnected_shape_cannot_validate() {
        let template = template(
            FloorShape::Mask {
                rows: vec!["##.##".to_string()],
            },
            CarvePolicy::RandomWalk,
        );
        for seed in 0..4 {
            let mut graph = allocate(&template);
            carve(&mut graph, &template, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert!(graph.validate().is_err());
        }
    }
}
