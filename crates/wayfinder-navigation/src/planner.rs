//! Building map and route planning.
//!
//! A building is a graph of waypoints on a grid. Each waypoint may serve one
//! or more rooms, and connections between waypoints are undirected corridors
//! weighted by their length in meters. Directions are computed along the
//! shortest path and expressed as robot instructions, assuming the robot
//! faces map north (+y) at the start node:
//!
//! - the first edge decides the initial turn (east: right, west: left,
//!   south: around);
//! - at every later waypoint the sign of the cross product of the incoming
//!   and outgoing edges decides between a left turn, a right turn and going
//!   straight on; straight segments are merged into one distance;
//! - on arrival the robot turns back to north and the destination becomes the
//!   next start node.
//!
//! # Examples
//!
//! ```
//! use wayfinder_core::Instruction;
//! use wayfinder_navigation::planner::{BuildingMap, RoutePlanner};
//!
//! let map = BuildingMap::from_json(r#"{
//!     "nodes": [
//!         { "id": 0, "x": 0, "y": 0, "rooms": [100], "start": true },
//!         { "id": 1, "x": 0, "y": 5, "rooms": [] },
//!         { "id": 2, "x": 4, "y": 5, "rooms": [118] }
//!     ],
//!     "connections": [
//!         { "a": 0, "b": 1, "weight": 5.0 },
//!         { "a": 1, "b": 2, "weight": 4.0 }
//!     ]
//! }"#).unwrap();
//!
//! let mut planner = RoutePlanner::new(map).unwrap();
//! let directions = planner.directions(118).unwrap();
//!
//! assert_eq!(directions, vec![
//!     Instruction::Distance(5.0),
//!     Instruction::Angle(90.0),
//!     Instruction::Distance(4.0),
//!     Instruction::Angle(-90.0),
//! ]);
//! ```

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wayfinder_core::{Error, Instruction, Result};

/// A waypoint of the building map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapNode {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    /// Rooms reachable from this waypoint.
    #[serde(default)]
    pub rooms: Vec<u32>,
    /// Whether the robot starts here.
    #[serde(default)]
    pub start: bool,
}

/// An undirected corridor between two waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub a: u32,
    pub b: u32,
    /// Length in meters.
    pub weight: f64,
}

/// Waypoint graph of a building.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BuildingMap {
    pub nodes: Vec<MapNode>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl BuildingMap {
    /// Parse a map from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidMap(e.to_string()))
    }

    /// Load a map from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check ids, connection endpoints, weights and the start marker.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id) {
                return Err(Error::InvalidMap(format!("duplicate node id {}", node.id)));
            }
        }

        for connection in &self.connections {
            for end in [connection.a, connection.b] {
                if !ids.contains(&end) {
                    return Err(Error::InvalidMap(format!(
                        "connection {}-{} references unknown node {}",
                        connection.a, connection.b, end
                    )));
                }
            }
            if !connection.weight.is_finite() || connection.weight < 0.0 {
                return Err(Error::InvalidMap(format!(
                    "connection {}-{} has invalid weight {}",
                    connection.a, connection.b, connection.weight
                )));
            }
        }

        let starts = self.nodes.iter().filter(|node| node.start).count();
        if starts > 1 {
            return Err(Error::InvalidMap(format!(
                "{} start nodes, expected at most one",
                starts
            )));
        }

        Ok(())
    }
}

/// Heap entry for Dijkstra, ordered so the `BinaryHeap` pops the cheapest.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frontier {
    cost: f64,
    node: u32,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Computes directions between rooms of a [`BuildingMap`].
#[derive(Debug, Clone)]
pub struct RoutePlanner {
    nodes: HashMap<u32, MapNode>,
    /// Rooms in map order, so the first node listing a room serves it.
    room_index: HashMap<u32, u32>,
    adjacency: HashMap<u32, Vec<(u32, f64)>>,
    start: Option<u32>,
}

impl RoutePlanner {
    /// Build a planner, validating the map first.
    pub fn new(map: BuildingMap) -> Result<Self> {
        map.validate()?;

        let start = map.nodes.iter().find(|node| node.start).map(|node| node.id);

        let mut room_index = HashMap::new();
        for node in &map.nodes {
            for room in &node.rooms {
                room_index.entry(*room).or_insert(node.id);
            }
        }

        let mut adjacency: HashMap<u32, Vec<(u32, f64)>> = HashMap::new();
        for connection in &map.connections {
            adjacency
                .entry(connection.a)
                .or_default()
                .push((connection.b, connection.weight));
            adjacency
                .entry(connection.b)
                .or_default()
                .push((connection.a, connection.weight));
        }

        let nodes = map.nodes.into_iter().map(|node| (node.id, node)).collect();

        debug!(
            "Route planner loaded: {} rooms, start node {:?}",
            room_index.len(),
            start
        );

        Ok(Self {
            nodes,
            room_index,
            adjacency,
            start,
        })
    }

    /// Whether any waypoint serves `room`.
    pub fn has_room(&self, room: u32) -> bool {
        self.room_index.contains_key(&room)
    }

    /// Current start node, if one is known.
    pub fn start_node(&self) -> Option<u32> {
        self.start
    }

    /// Place the robot at the waypoint serving `room`, facing north.
    pub fn set_start_room(&mut self, room: u32) -> Result<()> {
        let node = self.node_for_room(room)?;
        self.start = Some(node);
        info!("Start position set to room {} (node {})", room, node);
        Ok(())
    }

    fn node_for_room(&self, room: u32) -> Result<u32> {
        self.room_index
            .get(&room)
            .copied()
            .ok_or(Error::RoomNotFound(room))
    }

    /// Instructions leading from the start node to `room`.
    ///
    /// On success the destination becomes the new start node.
    ///
    /// # Errors
    ///
    /// Fails if the room is unknown, no start node is set or the room is not
    /// reachable.
    pub fn directions(&mut self, room: u32) -> Result<Vec<Instruction>> {
        let end = self.node_for_room(room)?;
        let start = self
            .start
            .ok_or_else(|| Error::InvalidMap("no start node set".to_string()))?;

        let path = self
            .shortest_path(start, end)
            .ok_or(Error::NoRoute { from: start, to: end })?;

        let instructions = self.instructions_along(&path);
        self.start = Some(end);

        info!(
            "Directions to room {}: {} instruction(s) over {} waypoint(s)",
            room,
            instructions.len(),
            path.len()
        );
        Ok(instructions)
    }

    /// Dijkstra over the undirected graph. Returns the node sequence.
    fn shortest_path(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        let mut best: HashMap<u32, f64> = HashMap::from([(from, 0.0)]);
        let mut previous: HashMap<u32, u32> = HashMap::new();
        let mut heap = BinaryHeap::from([Frontier {
            cost: 0.0,
            node: from,
        }]);

        while let Some(Frontier { cost, node }) = heap.pop() {
            if node == to {
                break;
            }
            if best.get(&node).is_some_and(|&known| cost > known) {
                continue;
            }

            for &(next, weight) in self.adjacency.get(&node).into_iter().flatten() {
                let candidate = cost + weight;
                if best.get(&next).is_none_or(|&known| candidate < known) {
                    best.insert(next, candidate);
                    previous.insert(next, node);
                    heap.push(Frontier {
                        cost: candidate,
                        node: next,
                    });
                }
            }
        }

        if from != to && !previous.contains_key(&to) {
            return None;
        }

        let mut path = vec![to];
        let mut current = to;
        while current != from {
            current = *previous.get(&current)?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }

    fn edge_weight(&self, a: u32, b: u32) -> f64 {
        self.adjacency
            .get(&a)
            .into_iter()
            .flatten()
            .filter(|(node, _)| *node == b)
            .map(|(_, weight)| *weight)
            .fold(f64::INFINITY, f64::min)
    }

    fn position(&self, id: u32) -> (i64, i64) {
        self.nodes
            .get(&id)
            .map(|node| (i64::from(node.x), i64::from(node.y)))
            .unwrap_or_default()
    }

    fn instructions_along(&self, path: &[u32]) -> Vec<Instruction> {
        let mut instructions = Vec::new();
        let mut heading: i32 = 0;
        let mut distance = 0.0;

        for (index, pair) in path.windows(2).enumerate() {
            let (from, to) = (self.position(pair[0]), self.position(pair[1]));
            let (dx, dy) = (to.0 - from.0, to.1 - from.1);

            if index == 0 {
                let turn = if dx > 0 {
                    Some(90)
                } else if dx < 0 {
                    Some(-90)
                } else if dy < 0 {
                    Some(180)
                } else {
                    None
                };
                if let Some(degrees) = turn {
                    instructions.push(Instruction::Angle(f64::from(degrees)));
                    heading += degrees;
                }
            } else {
                let before = self.position(path[index - 1]);
                let (px, py) = (from.0 - before.0, from.1 - before.1);
                let cross = px * dy - py * dx;

                if cross != 0 {
                    instructions.push(Instruction::Distance(distance));
                    distance = 0.0;

                    let degrees = if cross > 0 { -90 } else { 90 };
                    instructions.push(Instruction::Angle(f64::from(degrees)));
                    heading += degrees;
                }
            }

            distance += self.edge_weight(pair[0], pair[1]);
        }

        if path.len() > 1 {
            instructions.push(Instruction::Distance(distance));
        }

        if let Some(degrees) = reorientation(heading) {
            instructions.push(Instruction::Angle(f64::from(degrees)));
        }

        instructions
    }
}

/// Turn that brings a robot with `heading` (degrees clockwise from north)
/// back to north.
fn reorientation(heading: i32) -> Option<i32> {
    match heading.rem_euclid(360) {
        0 => None,
        180 => Some(180),
        h if h < 180 => Some(-h),
        h => Some(360 - h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn node(id: u32, x: i32, y: i32, rooms: &[u32]) -> MapNode {
        MapNode {
            id,
            x,
            y,
            rooms: rooms.to_vec(),
            start: false,
        }
    }

    fn connection(a: u32, b: u32, weight: f64) -> Connection {
        Connection { a, b, weight }
    }

    /// A plus-shaped floor around node 1 with a long detour to node 4.
    ///
    /// ```text
    ///        3 (300)
    ///        |
    /// 5 ---- 1 ---- 2 (200)
    ///        |      |
    ///        0      4 (400)
    ///      (100)
    /// ```
    fn floor() -> BuildingMap {
        let mut start = node(0, 0, 0, &[100]);
        start.start = true;
        BuildingMap {
            nodes: vec![
                start,
                node(1, 0, 3, &[]),
                node(2, 3, 3, &[200]),
                node(3, 0, 6, &[300]),
                node(4, 3, 0, &[400]),
                node(5, -3, 3, &[500]),
            ],
            connections: vec![
                connection(0, 1, 3.0),
                connection(1, 2, 3.0),
                connection(1, 3, 3.0),
                connection(2, 4, 3.0),
                connection(1, 5, 3.0),
            ],
        }
    }

    #[test]
    fn test_straight_segments_merge() {
        let mut planner = RoutePlanner::new(floor()).unwrap();
        assert_eq!(planner.directions(300).unwrap(), vec![Instruction::Distance(6.0)]);
        assert_eq!(planner.start_node(), Some(3));
    }

    #[test]
    fn test_left_turn() {
        let mut planner = RoutePlanner::new(floor()).unwrap();
        assert_eq!(
            planner.directions(500).unwrap(),
            vec![
                Instruction::Distance(3.0),
                Instruction::Angle(-90.0),
                Instruction::Distance(3.0),
                Instruction::Angle(90.0),
            ]
        );
    }

    #[test]
    fn test_two_right_turns_end_facing_south() {
        let mut planner = RoutePlanner::new(floor()).unwrap();
        assert_eq!(
            planner.directions(400).unwrap(),
            vec![
                Instruction::Distance(3.0),
                Instruction::Angle(90.0),
                Instruction::Distance(3.0),
                Instruction::Angle(90.0),
                Instruction::Distance(3.0),
                Instruction::Angle(180.0),
            ]
        );
    }

    #[test]
    fn test_initial_turn_from_new_start() {
        let mut planner = RoutePlanner::new(floor()).unwrap();
        planner.set_start_room(200).unwrap();

        // West first, then south at node 1.
        assert_eq!(
            planner.directions(100).unwrap(),
            vec![
                Instruction::Angle(-90.0),
                Instruction::Distance(3.0),
                Instruction::Angle(-90.0),
                Instruction::Distance(3.0),
                Instruction::Angle(180.0),
            ]
        );
    }

    #[test]
    fn test_destination_becomes_start() {
        let mut planner = RoutePlanner::new(floor()).unwrap();
        planner.directions(300).unwrap();

        // From node 3 facing north, node 0 is straight behind.
        assert_eq!(
            planner.directions(100).unwrap(),
            vec![Instruction::Angle(180.0), Instruction::Distance(6.0), Instruction::Angle(180.0)]
        );
    }

    #[test]
    fn test_room_at_start_needs_no_instructions() {
        let mut planner = RoutePlanner::new(floor()).unwrap();
        assert!(planner.directions(100).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_room() {
        let mut planner = RoutePlanner::new(floor()).unwrap();
        assert!(!planner.has_room(999));
        assert!(matches!(planner.directions(999), Err(Error::RoomNotFound(999))));
        assert!(matches!(planner.set_start_room(999), Err(Error::RoomNotFound(999))));
    }

    #[test]
    fn test_unreachable_room() {
        let mut map = floor();
        map.nodes.push(node(6, 10, 10, &[600]));
        let mut planner = RoutePlanner::new(map).unwrap();

        assert!(matches!(
            planner.directions(600),
            Err(Error::NoRoute { from: 0, to: 6 })
        ));
        assert_eq!(planner.start_node(), Some(0));
    }

    #[test]
    fn test_missing_start() {
        let mut map = floor();
        map.nodes[0].start = false;
        let mut planner = RoutePlanner::new(map).unwrap();

        assert!(matches!(planner.directions(300), Err(Error::InvalidMap(_))));
        planner.set_start_room(100).unwrap();
        assert!(planner.directions(300).is_ok());
    }

    #[test]
    fn test_shortest_path_preferred() {
        let mut map = floor();
        // A direct but long corridor from 0 to 4.
        map.connections.push(connection(0, 4, 20.0));
        let mut planner = RoutePlanner::new(map).unwrap();

        let directions = planner.directions(400).unwrap();
        assert_eq!(directions.len(), 6);
    }

    #[rstest]
    #[case::duplicate_id(|m: &mut BuildingMap| m.nodes.push(node(1, 9, 9, &[])))]
    #[case::unknown_endpoint(|m: &mut BuildingMap| m.connections.push(connection(0, 42, 1.0)))]
    #[case::negative_weight(|m: &mut BuildingMap| m.connections[0].weight = -1.0)]
    #[case::two_starts(|m: &mut BuildingMap| m.nodes[1].start = true)]
    fn test_invalid_maps(#[case] corrupt: fn(&mut BuildingMap)) {
        let mut map = floor();
        corrupt(&mut map);
        assert!(matches!(RoutePlanner::new(map), Err(Error::InvalidMap(_))));
    }

    #[test]
    fn test_map_from_json() {
        let map = BuildingMap::from_json(
            r#"{"nodes": [{"id": 7, "x": 1, "y": 2, "rooms": [118]}]}"#,
        )
        .unwrap();
        assert_eq!(map.nodes[0].rooms, vec![118]);
        assert!(!map.nodes[0].start);
        assert!(map.connections.is_empty());

        assert!(matches!(
            BuildingMap::from_json("{not json"),
            Err(Error::InvalidMap(_))
        ));
    }

    #[rstest]
    #[case(0, None)]
    #[case(90, Some(-90))]
    #[case(-90, Some(90))]
    #[case(180, Some(180))]
    #[case(-180, Some(180))]
    #[case(270, Some(90))]
    #[case(360, None)]
    fn test_reorientation(#[case] heading: i32, #[case] expected: Option<i32>) {
        assert_eq!(reorientation(heading), expected);
    }
}
