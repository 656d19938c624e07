use super::sketch::Sketch;
use super::types::{Drawing, Primitive, Stroke};
use crate::config::FigureConfig;
use crate::ir::Coord;
use crate::resolve::ResolvedFigure;

/// Circle around the first point, with a dashed radius to the right and
/// the radius value captioned under the circle.
pub(crate) fn draw(resolved: &ResolvedFigure, config: &FigureConfig) -> Drawing {
    let center = resolved.at(0);
    let rim = resolved
        .anchors
        .rim
        .unwrap_or(center.add(Coord::new(config.default_length / 2.0, 0.0)));
    let r = center.distance(rim);
    let extent = [
        center.add(Coord::new(-r, -r)),
        center.add(Coord::new(r, r)),
    ];
    let mut sketch = Sketch::new(resolved, config, &extent);

    let c = sketch.pt(0);
    let radius = sketch.view.length(r);
    let rim_canvas = sketch.map(rim);
    sketch.push(Primitive::Circle {
        center: c,
        radius,
        stroke: Stroke::Solid,
    });
    sketch.push(Primitive::Segment {
        from: c,
        to: rim_canvas,
        stroke: Stroke::Construction,
    });
    let rim_is_named = (1..resolved.vertices.len()).any(|idx| sketch.pt(idx).distance(rim_canvas) < 1e-6);
    if !rim_is_named {
        sketch.push(Primitive::Dot {
            at: rim_canvas,
            radius: config.point_radius,
        });
    }
    if let Some(measure) = &resolved.radius {
        sketch.caption(format!("r = {}", measure.label()), Coord::new(c.x, c.y + radius + 24.0));
    }
    sketch.decorate();
    sketch.finish()
}
