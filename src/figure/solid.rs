//! Solids in cavalier projection. Edges hidden behind the solid are dashed.

use super::sketch::Sketch;
use super::types::{Drawing, Label, LabelKind, Primitive, Stroke};
use crate::config::FigureConfig;
use crate::ir::Coord;
use crate::resolve::ResolvedFigure;

const CUBE_VISIBLE: [(usize, usize); 5] = [(5, 6), (6, 7), (1, 5), (2, 6), (3, 7)];
const CUBE_HIDDEN: [(usize, usize); 3] = [(4, 5), (4, 7), (0, 4)];

pub(crate) fn draw_cube(resolved: &ResolvedFigure, config: &FigureConfig) -> Drawing {
    let mut sketch = Sketch::new(resolved, config, &[]);
    for (a, b) in CUBE_HIDDEN {
        sketch.edge(a, b, Stroke::Hidden);
    }
    sketch.outline(&[0, 1, 2, 3], Stroke::Solid);
    for (a, b) in CUBE_VISIBLE {
        sketch.edge(a, b, Stroke::Solid);
    }
    sketch.decorate();
    sketch.finish()
}

pub(crate) fn draw_pyramid(resolved: &ResolvedFigure, config: &FigureConfig) -> Drawing {
    let (apex, foot) = (4, 5);
    let mut sketch = Sketch::new(resolved, config, &[]);
    for (a, b) in [(2, 3), (3, 0), (3, apex)] {
        sketch.edge(a, b, Stroke::Hidden);
    }
    for (a, b) in [(0, 1), (1, 2), (0, apex), (1, apex), (2, apex)] {
        sketch.edge(a, b, Stroke::Solid);
    }

    let top = sketch.pt(apex);
    let bottom = if sketch.has(foot) {
        sketch.edge(apex, foot, Stroke::Construction);
        Some(sketch.pt(foot))
    } else {
        resolved.anchors.base_center.map(|at| {
            let at = sketch.map(at);
            sketch.push(Primitive::Segment {
                from: top,
                to: at,
                stroke: Stroke::Construction,
            });
            at
        })
    };
    if let (Some(bottom), Some(height)) = (bottom, &resolved.height) {
        let covered = resolved.lengths.iter().any(|span| {
            (span.from == apex && span.to == foot) || (span.from == foot && span.to == apex)
        });
        if !covered {
            let endpoints = sketch.has(foot).then(|| (sketch.name(apex).to_string(), sketch.name(foot).to_string()));
            measure_label(&mut sketch, height.label(), top, bottom, Coord::new(1.0, 0.0), endpoints);
        }
    }
    sketch.decorate();
    sketch.finish()
}

/// Upright cylinder: vertex 0 is the base center, 1 the top center, 2 and 3
/// points on the base and top rims.
pub(crate) fn draw_cylinder(resolved: &ResolvedFigure, config: &FigureConfig) -> Drawing {
    let base = resolved.anchors.base_center.unwrap_or(resolved.at(0));
    let top = resolved.anchors.top_center.unwrap_or(resolved.at(1));
    let rim = resolved.anchors.rim.unwrap_or(resolved.at(2));
    let r = base.distance(rim);
    let depth = r * config.ellipse_ratio;
    let extent = [
        base.add(Coord::new(-r, -depth)),
        base.add(Coord::new(r, depth)),
        top.add(Coord::new(-r, -depth)),
        top.add(Coord::new(r, depth)),
    ];
    let mut sketch = Sketch::new(resolved, config, &extent);

    let (c0, c1) = (sketch.map(base), sketch.map(top));
    let rx = sketch.view.length(r);
    let ry = rx * config.ellipse_ratio;
    sketch.push(Primitive::Ellipse {
        center: c1,
        rx,
        ry,
        stroke: Stroke::Solid,
    });
    sketch.push(Primitive::Arc {
        center: c0,
        rx,
        ry,
        start: 0.0,
        sweep: 180.0,
        stroke: Stroke::Solid,
    });
    sketch.push(Primitive::Arc {
        center: c0,
        rx,
        ry,
        start: 180.0,
        sweep: 180.0,
        stroke: Stroke::Hidden,
    });
    for side in [-1.0, 1.0] {
        sketch.push(Primitive::Segment {
            from: Coord::new(c0.x + side * rx, c0.y),
            to: Coord::new(c1.x + side * rx, c1.y),
            stroke: Stroke::Solid,
        });
    }
    sketch.edge(0, 1, Stroke::Construction);
    let rim_canvas = sketch.map(rim);
    sketch.push(Primitive::Segment {
        from: c0,
        to: rim_canvas,
        stroke: Stroke::Construction,
    });
    sketch.link(0, 2);

    let spans = |a: usize, b: usize| {
        resolved
            .lengths
            .iter()
            .any(|span| (span.from == a && span.to == b) || (span.from == b && span.to == a))
    };
    if let Some(radius) = &resolved.radius {
        if !spans(0, 2) {
            measure_label(&mut sketch, radius.label(), c0, rim_canvas, Coord::new(0.0, 1.0), None);
        }
    }
    if let Some(height) = &resolved.height {
        if !spans(0, 1) {
            let (from, to) = (Coord::new(c0.x + rx, c0.y), Coord::new(c1.x + rx, c1.y));
            measure_label(&mut sketch, height.label(), from, to, Coord::new(1.0, 0.0), None);
        }
    }
    sketch.decorate();
    sketch.finish()
}

fn measure_label(
    sketch: &mut Sketch<'_>,
    text: String,
    from: Coord,
    to: Coord,
    normal: Coord,
    endpoints: Option<(String, String)>,
) {
    let offset = sketch.config.measure_offset;
    sketch.label(Label {
        text,
        at: from.midpoint(to).add(normal.scale(offset)),
        kind: LabelKind::Length,
        normal,
        endpoints,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Figure, Measure, Schema};
    use crate::resolve::resolve;

    fn count(drawing: &Drawing, stroke: Stroke) -> usize {
        drawing
            .primitives
            .iter()
            .filter(|p| match p {
                Primitive::Segment { stroke: s, .. } | Primitive::Arc { stroke: s, .. } => *s == stroke,
                _ => false,
            })
            .count()
    }

    #[test]
    fn cube_dashes_three_hidden_edges() {
        let schema = Schema::new(
            Figure::Cube {
                side: Some(Measure::with_unit(3.0, "cm")),
            },
            &["A", "B", "C", "D", "E", "F", "G", "H"],
        );
        let config = FigureConfig::default();
        let drawing = draw_cube(&resolve(&schema, &config).figure, &config);
        assert_eq!(count(&drawing, Stroke::Hidden), 3);
        assert_eq!(count(&drawing, Stroke::Solid), 5);
        assert!(drawing.labels.iter().any(|l| l.text == "3 cm"));
    }

    #[test]
    fn pyramid_draws_its_height() {
        let schema = Schema::new(
            Figure::Pyramid {
                base_side: Some(Measure::new(4.0)),
                height: Some(Measure::with_unit(6.0, "cm")),
            },
            &["A", "B", "C", "D", "S"],
        );
        let config = FigureConfig::default();
        let drawing = draw_pyramid(&resolve(&schema, &config).figure, &config);
        assert_eq!(count(&drawing, Stroke::Hidden), 3);
        assert_eq!(count(&drawing, Stroke::Construction), 1);
        assert!(drawing.labels.iter().any(|l| l.text == "6 cm"));
    }

    #[test]
    fn cylinder_has_hidden_back_arc() {
        let schema = Schema::new(
            Figure::Cylinder {
                radius: Some(Measure::with_unit(2.0, "cm")),
                height: Some(Measure::with_unit(5.0, "cm")),
            },
            &["O", "O'"],
        );
        let config = FigureConfig::default();
        let resolution = resolve(&schema, &config);
        let drawing = draw_cylinder(&resolution.figure, &config);
        assert_eq!(count(&drawing, Stroke::Hidden), 1);
        assert!(drawing.primitives.iter().any(|p| matches!(p, Primitive::Ellipse { .. })));
        let texts: Vec<&str> = drawing.labels.iter().map(|l| l.text.as_str()).collect();
        assert!(texts.contains(&"2 cm") && texts.contains(&"5 cm"));
    }
}
