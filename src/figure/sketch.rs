use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::types::{Drawing, Label, LabelKind, Primitive, Stroke};
use crate::config::FigureConfig;
use crate::ir::{Coord, centroid, format_number};
use crate::resolve::ResolvedFigure;

/// Uniform scale from figure space into the canvas, y flipped, centered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    scale: f64,
    center_math: Coord,
    center_canvas: Coord,
}

impl Viewport {
    pub fn fit(points: &[Coord], config: &FigureConfig) -> Self {
        let center_canvas = Coord::new(config.canvas_width / 2.0, config.canvas_height / 2.0);
        let Some((min, max)) = bounds(points) else {
            return Self {
                scale: 1.0,
                center_math: Coord::ORIGIN,
                center_canvas,
            };
        };
        let width = max.x - min.x;
        let height = max.y - min.y;
        let avail_w = (config.canvas_width - 2.0 * config.margin).max(1.0);
        let avail_h = (config.canvas_height - 2.0 * config.margin).max(1.0);
        let scale = match (width > 1e-9, height > 1e-9) {
            (true, true) => (avail_w / width).min(avail_h / height),
            (true, false) => avail_w / width,
            (false, true) => avail_h / height,
            (false, false) => 1.0,
        };
        Self {
            scale: if scale.is_finite() && scale > 0.0 { scale } else { 1.0 },
            center_math: min.midpoint(max),
            center_canvas,
        }
    }

    pub fn to_canvas(&self, p: Coord) -> Coord {
        Coord::new(
            self.center_canvas.x + (p.x - self.center_math.x) * self.scale,
            self.center_canvas.y - (p.y - self.center_math.y) * self.scale,
        )
    }

    pub fn length(&self, value: f64) -> f64 {
        value * self.scale
    }
}

fn bounds(points: &[Coord]) -> Option<(Coord, Coord)> {
    let mut iter = points.iter().filter(|p| p.is_finite());
    let first = *iter.next()?;
    Some(iter.fold((first, first), |(min, max), p| {
        (
            Coord::new(min.x.min(p.x), min.y.min(p.y)),
            Coord::new(max.x.max(p.x), max.y.max(p.y)),
        )
    }))
}

/// Accumulates primitives and labels for one figure. Edges drawn through
/// [`Sketch::edge`] and [`Sketch::outline`] are remembered so point labels
/// can be pushed away from them.
pub(crate) struct Sketch<'a> {
    pub resolved: &'a ResolvedFigure,
    pub config: &'a FigureConfig,
    pub view: Viewport,
    canvas: Vec<Coord>,
    links: BTreeSet<(usize, usize)>,
    concealed: BTreeSet<usize>,
    leanings: BTreeMap<usize, Coord>,
    drawing: Drawing,
}

impl<'a> Sketch<'a> {
    pub fn new(resolved: &'a ResolvedFigure, config: &'a FigureConfig, extra: &[Coord]) -> Self {
        let anchors = resolved.anchors;
        let mut fit: Vec<Coord> = resolved.vertices.iter().map(|v| v.at).collect();
        fit.extend(
            [anchors.center, anchors.rim, anchors.base_center, anchors.top_center]
                .into_iter()
                .flatten(),
        );
        fit.extend_from_slice(extra);
        let view = Viewport::fit(&fit, config);
        let canvas = resolved.vertices.iter().map(|v| view.to_canvas(v.at)).collect();
        Self {
            resolved,
            config,
            view,
            canvas,
            links: BTreeSet::new(),
            concealed: BTreeSet::new(),
            leanings: BTreeMap::new(),
            drawing: Drawing {
                figure: resolved.figure.name().to_string(),
                primitives: Vec::new(),
                labels: Vec::new(),
                placeholder: false,
            },
        }
    }

    pub fn pt(&self, idx: usize) -> Coord {
        self.canvas
            .get(idx)
            .copied()
            .unwrap_or_else(|| self.view.to_canvas(Coord::ORIGIN))
    }

    pub fn map(&self, p: Coord) -> Coord {
        self.view.to_canvas(p)
    }

    pub fn name(&self, idx: usize) -> &str {
        self.resolved.vertices.get(idx).map_or("", |v| v.name.as_str())
    }

    pub fn has(&self, idx: usize) -> bool {
        idx < self.canvas.len()
    }

    pub fn push(&mut self, primitive: Primitive) {
        self.drawing.primitives.push(primitive);
    }

    pub fn label(&mut self, label: Label) {
        self.drawing.labels.push(label);
    }

    /// Records that `a` and `b` are joined by a drawn line without drawing it.
    pub fn link(&mut self, a: usize, b: usize) {
        if a != b && self.has(a) && self.has(b) {
            self.links.insert((a.min(b), a.max(b)));
        }
    }

    fn linked(&self, a: usize, b: usize) -> bool {
        self.links.contains(&(a.min(b), a.max(b)))
    }

    /// Leaves the point undrawn by [`Sketch::decorate`], together with the
    /// lengths and angles that touch it.
    pub fn conceal(&mut self, idx: usize) {
        self.concealed.insert(idx);
    }

    fn shows(&self, idx: usize) -> bool {
        self.has(idx) && !self.concealed.contains(&idx)
    }

    /// Forces the label of `idx` to sit in `direction` from the point.
    pub fn lean(&mut self, idx: usize, direction: Coord) {
        if let Some(unit) = direction.normalized() {
            self.leanings.insert(idx, unit);
        }
    }

    pub fn edge(&mut self, a: usize, b: usize, stroke: Stroke) {
        if !(self.has(a) && self.has(b)) {
            return;
        }
        let (from, to) = (self.pt(a), self.pt(b));
        self.push(Primitive::Segment { from, to, stroke });
        self.link(a, b);
    }

    pub fn outline(&mut self, indices: &[usize], stroke: Stroke) {
        let indices: Vec<usize> = indices.iter().copied().filter(|&i| self.has(i)).collect();
        if indices.len() < 2 {
            return;
        }
        let points = indices.iter().map(|&i| self.pt(i)).collect();
        self.push(Primitive::Polygon { points, stroke });
        for (pos, &a) in indices.iter().enumerate() {
            self.link(a, indices[(pos + 1) % indices.len()]);
        }
    }

    pub fn centroid(&self) -> Coord {
        centroid(&self.canvas).unwrap_or_else(|| self.view.to_canvas(Coord::ORIGIN))
    }

    pub fn caption(&mut self, text: String, at: Coord) {
        self.label(Label {
            text,
            at,
            kind: LabelKind::Caption,
            normal: Coord::new(0.0, 1.0),
            endpoints: None,
        });
    }

    /// Length labels, angle marks, dots and point labels, in drawing order.
    pub fn decorate(&mut self) {
        self.length_labels();
        self.angle_marks();
        let radius = self.config.point_radius;
        let shown: Vec<usize> = (0..self.canvas.len()).filter(|&idx| self.shows(idx)).collect();
        for &idx in &shown {
            let at = self.pt(idx);
            self.push(Primitive::Dot { at, radius });
        }
        for &idx in &shown {
            let label = self.point_label(idx);
            self.label(label);
        }
    }

    fn point_label(&self, idx: usize) -> Label {
        let p = self.pt(idx);
        let pull = self
            .links
            .iter()
            .filter_map(|&(a, b)| match (a == idx, b == idx) {
                (true, _) => Some(b),
                (_, true) => Some(a),
                _ => None,
            })
            .filter_map(|other| self.pt(other).sub(p).normalized())
            .fold(Coord::ORIGIN, Coord::add);
        let direction = self.leanings.get(&idx).copied().unwrap_or_else(|| {
            pull.scale(-1.0)
                .normalized()
                .or_else(|| p.sub(self.centroid()).normalized())
                .unwrap_or(Coord::new(0.0, -1.0))
        });
        Label {
            text: self.name(idx).to_string(),
            at: p.add(direction.scale(self.config.label_offset)),
            kind: LabelKind::Point,
            normal: direction,
            endpoints: None,
        }
    }

    fn length_labels(&mut self) {
        let center = self.centroid();
        for span in &self.resolved.lengths {
            if !(self.shows(span.from) && self.shows(span.to)) {
                continue;
            }
            let (a, b) = (self.pt(span.from), self.pt(span.to));
            let Some(direction) = b.sub(a).normalized() else {
                debug!(from = self.name(span.from), to = self.name(span.to); "zero-length span, label skipped");
                continue;
            };
            if !self.linked(span.from, span.to) {
                self.drawing.primitives.push(Primitive::Segment {
                    from: a,
                    to: b,
                    stroke: Stroke::Construction,
                });
            }
            let mid = a.midpoint(b);
            let mut normal = direction.perp();
            if normal.dot(mid.sub(center)) < 0.0 {
                normal = normal.scale(-1.0);
            }
            let label = Label {
                text: span.label.text(),
                at: mid.add(normal.scale(self.config.measure_offset)),
                kind: LabelKind::Length,
                normal,
                endpoints: Some((self.name(span.from).to_string(), self.name(span.to).to_string())),
            };
            self.drawing.labels.push(label);
        }
    }

    fn angle_marks(&mut self) {
        let radius = self.config.angle_arc_radius;
        for corner in &self.resolved.angles {
            let Some((a, b)) = corner.arms else {
                debug!(vertex = self.name(corner.vertex); "angle without arms, mark skipped");
                continue;
            };
            if ![corner.vertex, a, b].iter().all(|&idx| self.shows(idx)) {
                continue;
            }
            let p = self.pt(corner.vertex);
            let (Some(u1), Some(u2)) = (self.pt(a).sub(p).normalized(), self.pt(b).sub(p).normalized()) else {
                continue;
            };
            if corner.right {
                let size = self.config.right_angle_size;
                self.drawing.primitives.push(Primitive::RightAngle {
                    points: [
                        p.add(u1.scale(size)),
                        p.add(u1.add(u2).scale(size)),
                        p.add(u2.scale(size)),
                    ],
                });
                continue;
            }
            let start = u1.y.atan2(u1.x).to_degrees();
            let end = u2.y.atan2(u2.x).to_degrees();
            self.drawing.primitives.push(Primitive::Arc {
                center: p,
                rx: radius,
                ry: radius,
                start,
                sweep: short_sweep(end - start),
                stroke: Stroke::Solid,
            });
            if let Some(degrees) = corner.degrees {
                let bisector = u1.add(u2).normalized().unwrap_or(u1.perp());
                self.drawing.labels.push(Label {
                    text: format!("{}°", format_number(degrees)),
                    at: p.add(bisector.scale(radius + 12.0)),
                    kind: LabelKind::Angle,
                    normal: bisector,
                    endpoints: None,
                });
            }
        }
    }

    pub fn finish(self) -> Drawing {
        self.drawing
    }
}

/// Wraps an angle difference into (-180, 180].
fn short_sweep(delta: f64) -> f64 {
    let wrapped = delta % 360.0;
    if wrapped > 180.0 {
        wrapped - 360.0
    } else if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}
