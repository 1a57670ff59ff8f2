//! Graph model and the random generator.

use log::info;
use rand::Rng;

use super::geometry::{Point, Viewport, count_crossings};

/// Margin kept free on every side when placing fresh nodes.
pub const GENERATION_MARGIN: f64 = 80.0;
/// Probability that any given unordered pair of nodes is joined.
pub const EDGE_PROBABILITY: f64 = 0.35;

const MIN_NODE_RADIUS: f64 = 8.0;
const MAX_NODE_RADIUS: f64 = 14.0;
const NODE_RADIUS_FACTOR: f64 = 0.012;

/// Node radius for a viewport of the given width.
pub fn node_radius(width: f64) -> f64 {
	(width * NODE_RADIUS_FACTOR).clamp(MIN_NODE_RADIUS, MAX_NODE_RADIUS)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeColor {
	#[default]
	Gold,
	Hint,
}

impl NodeColor {
	pub fn css(self) -> &'static str {
		match self {
			NodeColor::Gold => "#FFD700",
			NodeColor::Hint => "#FFFF66",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	pub pos: Point,
	pub radius: f64,
	pub color: NodeColor,
}

impl Node {
	pub fn new(pos: Point, radius: f64) -> Self {
		Self {
			pos,
			radius,
			color: NodeColor::default(),
		}
	}
}

/// An unordered pair of distinct node indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
	pub a: usize,
	pub b: usize,
}

impl Edge {
	pub const fn new(a: usize, b: usize) -> Self {
		Self { a, b }
	}

	pub fn shares_endpoint(self, other: Edge) -> bool {
		self.a == other.a || self.a == other.b || self.b == other.a || self.b == other.b
	}
}

/// Nodes (identity = index) plus the fixed edge set over them.
///
/// Every edge endpoint is a valid index into `nodes`; [`Graph::from_parts`]
/// and [`Graph::generate`] are the only constructors and both uphold it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
	pub nodes: Vec<Node>,
	pub edges: Vec<Edge>,
}

impl Graph {
	/// Builds a graph from raw positions and index pairs. Returns `None` if an
	/// edge is a self-loop or points past the node list.
	pub fn from_parts(positions: &[Point], edges: &[(usize, usize)], radius: f64) -> Option<Self> {
		let n = positions.len();
		let edges = edges
			.iter()
			.map(|&(a, b)| (a != b && a < n && b < n).then_some(Edge::new(a, b)))
			.collect::<Option<Vec<_>>>()?;
		Some(Self {
			nodes: positions.iter().map(|&p| Node::new(p, radius)).collect(),
			edges,
		})
	}

	/// Random placement inside the margin, each index pair joined with
	/// [`EDGE_PROBABILITY`].
	pub fn generate<R: Rng + ?Sized>(node_count: usize, viewport: Viewport, rng: &mut R) -> Self {
		let margin = GENERATION_MARGIN.min(viewport.width.min(viewport.height) / 4.0);
		let radius = node_radius(viewport.width);
		let nodes: Vec<Node> = (0..node_count)
			.map(|_| Node::new(viewport.random_point(margin, rng), radius))
			.collect();

		let mut edges = Vec::new();
		for i in 0..node_count {
			for j in i + 1..node_count {
				if rng.gen_bool(EDGE_PROBABILITY) {
					edges.push(Edge::new(i, j));
				}
			}
		}

		let graph = Self { nodes, edges };
		info!(
			"generated graph: {} nodes, {} edges, {} crossings",
			graph.nodes.len(),
			graph.edges.len(),
			graph.crossings()
		);
		graph
	}

	pub fn crossings(&self) -> usize {
		count_crossings(&self.nodes, &self.edges)
	}

	pub fn positions(&self) -> Vec<Point> {
		self.nodes.iter().map(|n| n.pos).collect()
	}

	pub fn edge_pairs(&self) -> Vec<[usize; 2]> {
		self.edges.iter().map(|e| [e.a, e.b]).collect()
	}

	/// Edge lengths in edge order.
	pub fn edge_lengths(&self) -> impl Iterator<Item = f64> + '_ {
		self.edges
			.iter()
			.map(|e| self.nodes[e.a].pos.distance(self.nodes[e.b].pos))
	}

	/// Re-derives radii and pulls every node back inside the viewport.
	pub fn fit_to(&mut self, viewport: Viewport, inset: f64) {
		let radius = node_radius(viewport.width);
		for node in &mut self.nodes {
			node.radius = radius;
			node.pos = viewport.clamp(node.pos, inset);
		}
	}
}
