//! Segment intersection and crossing counts over a node/edge set.
//!
//! Everything here is recomputed from the current positions on demand. Graphs
//! are capped around a dozen nodes, so the quadratic edge-pair scans are cheap
//! enough to run every frame.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::graph::{Edge, Node};

/// Distances below this are treated as this value before dividing.
pub const MIN_DISTANCE: f64 = 1e-2;

/// A position in viewport space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance(self, other: Point) -> f64 {
		(self.x - other.x).hypot(self.y - other.y)
	}
}

/// The drawable area. Node positions are kept inside it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
}

impl Viewport {
	pub const fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}

	/// The larger dimension, used to scale perturbations and variance.
	pub fn scale(&self) -> f64 {
		self.width.max(self.height)
	}

	/// Clamps `p` into `[inset, dim - inset]` on both axes. A viewport too
	/// small for the inset collapses onto its center line.
	pub fn clamp(&self, p: Point, inset: f64) -> Point {
		Point::new(
			clamp_axis(p.x, inset, self.width),
			clamp_axis(p.y, inset, self.height),
		)
	}

	pub fn contains(&self, p: Point, inset: f64) -> bool {
		self.clamp(p, inset) == p
	}

	/// A uniformly random point inside the inset rectangle.
	pub fn random_point<R: Rng + ?Sized>(&self, inset: f64, rng: &mut R) -> Point {
		Point::new(
			sample_axis(rng, inset, self.width),
			sample_axis(rng, inset, self.height),
		)
	}
}

fn clamp_axis(v: f64, inset: f64, dim: f64) -> f64 {
	let (lo, hi) = (inset, dim - inset);
	if lo > hi { dim / 2.0 } else { v.clamp(lo, hi) }
}

fn sample_axis<R: Rng + ?Sized>(rng: &mut R, inset: f64, dim: f64) -> f64 {
	let (lo, hi) = (inset, dim - inset);
	if lo < hi { rng.gen_range(lo..hi) } else { dim / 2.0 }
}

fn ccw(a: Point, b: Point, c: Point) -> bool {
	(c.y - a.y) * (b.x - a.x) > (b.y - a.y) * (c.x - a.x)
}

/// True iff segment `p1`-`p2` properly crosses segment `p3`-`p4`.
///
/// Collinear and endpoint-touching configurations fall on the strict side of
/// the orientation test and report no crossing.
pub fn segments_intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
	ccw(p1, p3, p4) != ccw(p2, p3, p4) && ccw(p1, p2, p3) != ccw(p1, p2, p4)
}

fn edges_cross(nodes: &[Node], e1: Edge, e2: Edge) -> bool {
	!e1.shares_endpoint(e2)
		&& segments_intersect(
			nodes[e1.a].pos,
			nodes[e1.b].pos,
			nodes[e2.a].pos,
			nodes[e2.b].pos,
		)
}

/// Visits every unordered pair of crossing edges.
fn for_each_crossing(nodes: &[Node], edges: &[Edge], mut visit: impl FnMut(Edge, Edge)) {
	for (i, &e1) in edges.iter().enumerate() {
		for &e2 in &edges[i + 1..] {
			if edges_cross(nodes, e1, e2) {
				visit(e1, e2);
			}
		}
	}
}

/// Number of unordered pairs of non-adjacent edges that cross.
pub fn count_crossings(nodes: &[Node], edges: &[Edge]) -> usize {
	let mut count = 0;
	for_each_crossing(nodes, edges, |_, _| count += 1);
	count
}

/// Whether `edge` crosses any other non-adjacent edge. Render-only.
pub fn edge_is_crossed(nodes: &[Node], edges: &[Edge], edge: Edge) -> bool {
	edges.iter().any(|&other| edges_cross(nodes, edge, other))
}

/// Per-node crossing involvement: every crossing credits all four endpoints.
pub fn node_crossing_counts(nodes: &[Node], edges: &[Edge]) -> Vec<usize> {
	let mut counts = vec![0; nodes.len()];
	for_each_crossing(nodes, edges, |e1, e2| {
		for idx in [e1.a, e1.b, e2.a, e2.b] {
			counts[idx] += 1;
		}
	});
	counts
}
