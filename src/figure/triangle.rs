use super::sketch::Sketch;
use super::types::{Drawing, Stroke};
use crate::config::FigureConfig;
use crate::resolve::ResolvedFigure;

/// General and right triangles. Extra points beyond the first three are
/// drawn as free points.
pub(crate) fn draw(resolved: &ResolvedFigure, config: &FigureConfig) -> Drawing {
    let mut sketch = Sketch::new(resolved, config, &[]);
    sketch.outline(&[0, 1, 2], Stroke::Solid);
    sketch.decorate();
    sketch.finish()
}

/// Triangle ABC with M on [AB], N on [AC] and the parallel (MN) highlighted.
pub(crate) fn draw_thales(resolved: &ResolvedFigure, config: &FigureConfig) -> Drawing {
    let (a, b, c, m, n) = (0, 1, 2, 3, 4);
    let mut sketch = Sketch::new(resolved, config, &[]);
    sketch.outline(&[a, b, c], Stroke::Solid);
    sketch.edge(m, n, Stroke::Highlight);
    for (x, y) in [(a, m), (m, b), (a, n), (n, c)] {
        sketch.link(x, y);
    }
    sketch.decorate();
    sketch.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::types::{LabelKind, Primitive};
    use crate::ir::{Figure, Schema};
    use crate::resolve::resolve;

    #[test]
    fn right_triangle_gets_mark_and_hypotenuse_label() {
        let schema = Schema::new(
            Figure::RightTriangle {
                right_angle: Some("B".to_string()),
            },
            &["A", "B", "C"],
        )
        .with_length("A", "B", 3.0)
        .with_length("B", "C", 4.0);
        let config = FigureConfig::default();
        let drawing = draw(&resolve(&schema, &config).figure, &config);
        assert!(drawing
            .primitives
            .iter()
            .any(|p| matches!(p, Primitive::RightAngle { .. })));
        let lengths: Vec<&str> = drawing
            .labels
            .iter()
            .filter(|l| l.kind == LabelKind::Length)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(lengths, vec!["3", "4", "5"]);
    }

    #[test]
    fn point_labels_sit_outside_the_triangle() {
        let schema = Schema::new(
            Figure::Triangle {
                equilateral: true,
                isosceles: false,
            },
            &["A", "B", "C"],
        );
        let config = FigureConfig::default();
        let resolved = resolve(&schema, &config).figure;
        let drawing = draw(&resolved, &config);
        let top = drawing.labels.iter().find(|l| l.text == "A").expect("label A");
        // A is the apex, so its label goes above it (smaller canvas y).
        let apex_y = drawing
            .primitives
            .iter()
            .find_map(|p| match p {
                Primitive::Dot { at, .. } => Some(at.y),
                _ => None,
            })
            .expect("dot");
        assert!(top.at.y < apex_y);
    }

    #[test]
    fn thales_highlights_the_parallel() {
        let schema = Schema::new(Figure::Thales, &["A", "B", "C", "M", "N"]);
        let config = FigureConfig::default();
        let drawing = draw_thales(&resolve(&schema, &config).figure, &config);
        assert!(drawing.primitives.iter().any(|p| matches!(
            p,
            Primitive::Segment {
                stroke: Stroke::Highlight,
                ..
            }
        )));
        assert_eq!(
            drawing.labels.iter().filter(|l| l.kind == LabelKind::Point).count(),
            5
        );
    }
}
