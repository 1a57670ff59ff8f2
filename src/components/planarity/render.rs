use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use crate::game::Session;
use crate::game::geometry::edge_is_crossed;

const BACKGROUND: &str = "rgba(0, 0, 10, 0.7)";
const SOLVED_GLOW: &str = "rgba(255, 240, 200, 0.95)";

pub fn render(session: &Session, ctx: &CanvasRenderingContext2d) {
	let viewport = session.viewport();
	ctx.clear_rect(0.0, 0.0, viewport.width, viewport.height);
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, viewport.width, viewport.height);

	let planar = session.graph().crossings() == 0;
	draw_edges(session, planar, ctx);
	draw_nodes(session, planar, ctx);
	ctx.set_shadow_blur(0.0);

	if planar {
		ctx.set_fill_style_str("rgba(120, 255, 150, 0.95)");
		ctx.set_font("26px Orbitron, sans-serif");
		let x = (viewport.width / 2.0 - 220.0).max(20.0);
		let _ = ctx.fill_text("Planar Graph Achieved!", x, 90.0);
	}
}

fn draw_edges(session: &Session, planar: bool, ctx: &CanvasRenderingContext2d) {
	let graph = session.graph();
	ctx.set_line_width(2.5);

	for &edge in &graph.edges {
		let (a, b) = (graph.nodes[edge.a].pos, graph.nodes[edge.b].pos);
		// Crossed edges red, free edges green; everything glows once solved.
		let (stroke, glow, blur) = if planar {
			("rgba(255, 250, 240, 0.98)", SOLVED_GLOW, 22.0)
		} else if edge_is_crossed(&graph.nodes, &graph.edges, edge) {
			("rgba(255, 80, 80, 0.98)", "rgba(255, 60, 60, 0.8)", 10.0)
		} else {
			("rgba(100, 255, 160, 0.95)", "rgba(160, 255, 200, 0.6)", 14.0)
		};
		ctx.set_stroke_style_str(stroke);
		ctx.set_shadow_color(glow);
		ctx.set_shadow_blur(blur);
		ctx.begin_path();
		ctx.move_to(a.x, a.y);
		ctx.line_to(b.x, b.y);
		ctx.stroke();
	}
	ctx.set_shadow_blur(0.0);
}

fn draw_nodes(session: &Session, planar: bool, ctx: &CanvasRenderingContext2d) {
	for (idx, node) in session.graph().nodes.iter().enumerate() {
		if planar {
			ctx.set_fill_style_str("rgba(255, 250, 240, 1)");
			ctx.set_shadow_color(SOLVED_GLOW);
			ctx.set_shadow_blur(30.0);
		} else {
			ctx.set_fill_style_str(node.color.css());
			ctx.set_shadow_color("rgba(255, 215, 0, 0.9)");
			ctx.set_shadow_blur(20.0);
		}
		ctx.begin_path();
		let _ = ctx.arc(node.pos.x, node.pos.y, node.radius, 0.0, 2.0 * PI);
		ctx.fill();

		if session.selected() == Some(idx) {
			ctx.set_shadow_blur(0.0);
			ctx.set_stroke_style_str("rgba(255, 255, 255, 0.8)");
			ctx.set_line_width(1.5);
			ctx.begin_path();
			let _ = ctx.arc(node.pos.x, node.pos.y, node.radius + 3.0, 0.0, 2.0 * PI);
			ctx.stroke();
		}
	}
}
