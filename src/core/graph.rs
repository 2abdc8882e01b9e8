//! Road network graph for butterfly-sumo
//!
//! Turns signal records into SUMO nodes and edges. Each usable record adds one
//! edge in each direction between its two locations; locations become nodes the
//! first time they are seen and keep their randomly drawn position afterwards.

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::core::config::{EdgeDefaults, NetworkConfig};
use crate::core::error::Result;
use crate::core::record::{Endpoints, SignalRecord};

/// SUMO junction control types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Priority,
    #[default]
    TrafficLight,
    RightBeforeLeft,
    Unregulated,
    TrafficSign,
    Stop,
}

impl NodeType {
    /// Name used in `.nod.xml` files
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Priority => "priority",
            NodeType::TrafficLight => "traffic_light",
            NodeType::RightBeforeLeft => "right_before_left",
            NodeType::Unregulated => "unregulated",
            NodeType::TrafficSign => "traffic_sign",
            NodeType::Stop => "stop",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An intersection
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    /// Meters
    pub x: f64,
    /// Meters
    pub y: f64,
    pub node_type: NodeType,
}

/// A directed road segment between two nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub priority: i32,
    pub num_lanes: u32,
    /// Meters per second
    pub speed: f64,
}

/// Insertion-ordered nodes and edges
#[derive(Debug, Default)]
pub struct Network {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_index: HashMap<String, usize>,
    edge_ids: HashSet<String>,
}

impl Network {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Look up a node by identifier
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Insert a node unless one with the same id exists. Returns true if inserted.
    fn insert_node(&mut self, node: Node) -> bool {
        if self.node_index.contains_key(&node.id) {
            return false;
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Append an edge. Returns false if its id was already used.
    fn push_edge(&mut self, edge: Edge) -> bool {
        debug_assert!(self.node_index.contains_key(&edge.from));
        debug_assert!(self.node_index.contains_key(&edge.to));
        let fresh = self.edge_ids.insert(edge.id.clone());
        self.edges.push(edge);
        fresh
    }
}

/// Counters collected while building a network
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub rows_read: usize,
    pub rows_used: usize,
    /// Rows whose location list was empty
    pub skipped_empty: usize,
    /// Rows naming a single location
    pub skipped_single: usize,
    /// Used rows that listed more than two locations
    pub rows_with_extra_ids: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
    /// Edges whose id repeats an earlier one
    pub duplicate_edge_ids: usize,
}

impl BuildReport {
    pub fn rows_skipped(&self) -> usize {
        self.skipped_empty + self.skipped_single
    }
}

/// Builds a [`Network`] row by row
pub struct NetworkBuilder<R: Rng> {
    rng: R,
    max_x: u32,
    max_y: u32,
    node_type: NodeType,
    edge: EdgeDefaults,
    reverse_suffix: String,
    network: Network,
    report: BuildReport,
}

impl NetworkBuilder<StdRng> {
    /// Builder seeded from the configuration, or from OS entropy when no seed is set
    pub fn from_config(config: &NetworkConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> NetworkBuilder<R> {
    /// Builder drawing coordinates from `rng`
    pub fn with_rng(config: &NetworkConfig, rng: R) -> Self {
        Self {
            rng,
            max_x: config.max_x,
            max_y: config.max_y,
            node_type: config.node_type,
            edge: config.edge.clone(),
            reverse_suffix: config.reverse_suffix.clone(),
            network: Network::default(),
            report: BuildReport::default(),
        }
    }

    /// Add one record: two nodes (if new) and a forward and reverse edge
    pub fn add_record(&mut self, record: &SignalRecord) {
        self.report.rows_read += 1;

        let (from, to) = match record.endpoints() {
            Endpoints::Empty => {
                debug!("Skipping signal '{}': no locations listed", record.signal_id);
                self.report.skipped_empty += 1;
                return;
            }
            Endpoints::Single(only) => {
                debug!(
                    "Skipping signal '{}': only one location ({only})",
                    record.signal_id
                );
                self.report.skipped_single += 1;
                return;
            }
            Endpoints::Pair { from, to, ignored } => {
                if ignored > 0 {
                    debug!(
                        "Signal '{}' lists {ignored} extra location(s), using {from} and {to}",
                        record.signal_id
                    );
                    self.report.rows_with_extra_ids += 1;
                }
                (from, to)
            }
        };

        self.report.rows_used += 1;
        self.ensure_node(from);
        self.ensure_node(to);

        let forward_id = record.signal_id.clone();
        let reverse_id = format!("{}{}", record.signal_id, self.reverse_suffix);
        self.add_edge(forward_id, from, to);
        self.add_edge(reverse_id, to, from);
    }

    /// Add every record from a fallible iterator, stopping at the first error
    pub fn extend_from_records<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<SignalRecord>>,
    {
        for record in records {
            self.add_record(&record?);
        }
        Ok(())
    }

    /// Finish and hand back the network with its build counters
    pub fn finish(self) -> (Network, BuildReport) {
        let report = self.report;
        info!(
            "Built network: {} nodes, {} edges from {} of {} rows",
            report.nodes_created, report.edges_created, report.rows_used, report.rows_read
        );
        if report.rows_skipped() > 0 {
            warn!(
                "Skipped {} row(s): {} with no locations, {} with a single location",
                report.rows_skipped(),
                report.skipped_empty,
                report.skipped_single
            );
        }
        (self.network, report)
    }

    fn ensure_node(&mut self, id: &str) {
        if self.network.node(id).is_some() {
            return;
        }
        let node = Node {
            id: id.to_string(),
            x: f64::from(self.rng.random_range(0..=self.max_x)),
            y: f64::from(self.rng.random_range(0..=self.max_y)),
            node_type: self.node_type,
        };
        if self.network.insert_node(node) {
            self.report.nodes_created += 1;
        }
    }

    fn add_edge(&mut self, id: String, from: &str, to: &str) {
        let edge = Edge {
            id,
            from: from.to_string(),
            to: to.to_string(),
            priority: self.edge.priority,
            num_lanes: self.edge.num_lanes,
            speed: self.edge.speed,
        };
        let edge_id = edge.id.clone();
        if !self.network.push_edge(edge) {
            warn!("Edge id '{edge_id}' is used more than once");
            self.report.duplicate_edge_ids += 1;
        }
        self.report.edges_created += 1;
    }
}
