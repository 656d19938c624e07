//! Builds a total coordinate map for a schema. Explicit coordinates win,
//! figure constructions fill the gaps and anything still missing is placed
//! on a small circle so no renderer ever meets an unplaced point.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::config::FigureConfig;
use crate::error::Degradation;
use crate::ir::{Axis, Coord, Figure, Measure, Schema, centroid, preimage_name};

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub name: String,
    pub at: Coord,
}

/// Construction points that are not named in the exercise.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Anchors {
    pub center: Option<Coord>,
    pub rim: Option<Coord>,
    pub base_center: Option<Coord>,
    pub top_center: Option<Coord>,
}

impl Anchors {
    fn map(self, f: impl Fn(Coord) -> Coord) -> Self {
        Self {
            center: self.center.map(&f),
            rim: self.rim.map(&f),
            base_center: self.base_center.map(&f),
            top_center: self.top_center.map(&f),
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&'static str, Coord)> + '_ {
        [
            ("@center", self.center),
            ("@rim", self.rim),
            ("@base_center", self.base_center),
            ("@top_center", self.top_center),
        ]
        .into_iter()
        .filter_map(|(name, coord)| coord.map(|c| (name, c)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpanLabel {
    Given(Measure),
    /// Computed from other measures, e.g. a hypotenuse from both legs.
    Derived(Measure),
    /// Listed as the length to find.
    Unknown,
}

impl SpanLabel {
    pub fn text(&self) -> String {
        match self {
            SpanLabel::Given(measure) | SpanLabel::Derived(measure) => measure.label(),
            SpanLabel::Unknown => "?".to_string(),
        }
    }

    fn value(&self) -> Option<f64> {
        match self {
            SpanLabel::Given(measure) => Some(measure.value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub from: usize,
    pub to: usize,
    pub label: SpanLabel,
}

impl Span {
    fn joins(&self, a: usize, b: usize) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Corner {
    pub vertex: usize,
    pub arms: Option<(usize, usize)>,
    pub degrees: Option<f64>,
    pub right: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFigure {
    pub figure: Figure,
    pub vertices: Vec<Vertex>,
    pub anchors: Anchors,
    pub lengths: Vec<Span>,
    pub angles: Vec<Corner>,
    pub radius: Option<Measure>,
    pub height: Option<Measure>,
}

impl ResolvedFigure {
    pub fn at(&self, idx: usize) -> Coord {
        self.vertices.get(idx).map_or(Coord::ORIGIN, |v| v.at)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.vertices.iter().position(|v| v.name == name)
    }

    pub fn centroid(&self) -> Coord {
        centroid(self.vertices.iter().map(|v| &v.at)).unwrap_or(Coord::ORIGIN)
    }

    /// Every named point plus the anchors, keyed `@center`, `@rim`, ...
    pub fn coordinates(&self) -> BTreeMap<String, Coord> {
        let mut map: BTreeMap<String, Coord> = self
            .vertices
            .iter()
            .map(|v| (v.name.clone(), v.at))
            .collect();
        for (name, coord) in self.anchors.iter() {
            map.insert(name.to_string(), coord);
        }
        map
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub figure: ResolvedFigure,
    pub degradations: Vec<Degradation>,
}

struct Context<'a> {
    names: &'a [String],
    explicit: &'a [Option<Coord>],
    spans: &'a [Span],
    corners: &'a [Corner],
    config: &'a FigureConfig,
}

impl Context<'_> {
    fn given(&self, a: usize, b: usize) -> Option<f64> {
        self.spans
            .iter()
            .find(|span| span.joins(a, b))
            .and_then(|span| span.label.value())
    }

    fn unit(&self, a: usize, b: usize) -> Option<String> {
        self.spans.iter().find(|span| span.joins(a, b)).and_then(|span| match &span.label {
            SpanLabel::Given(measure) => measure.unit.clone(),
            _ => None,
        })
    }

    fn degrees_at(&self, vertex: usize) -> Option<f64> {
        self.corners
            .iter()
            .filter(|corner| corner.vertex == vertex)
            .find_map(|corner| corner.degrees.or(corner.right.then_some(90.0)))
    }

    fn pair(&self, a: usize, b: usize) -> String {
        format!("{}{}", self.name(a), self.name(b))
    }

    fn name(&self, idx: usize) -> &str {
        self.names.get(idx).map_or("?", String::as_str)
    }
}

#[derive(Default)]
struct Construction {
    points: Vec<Option<Coord>>,
    anchors: Anchors,
    derived: Vec<Span>,
}

impl Construction {
    fn new(count: usize) -> Self {
        Self {
            points: vec![None; count],
            ..Self::default()
        }
    }

    fn set(&mut self, idx: usize, at: Coord) {
        if let Some(slot) = self.points.get_mut(idx) {
            *slot = Some(at);
        }
    }
}

pub fn resolve(schema: &Schema, config: &FigureConfig) -> Resolution {
    let mut degradations = Vec::new();
    let (figure, radius, height) = checked_figure(&schema.figure, config, &mut degradations);
    let names = collect_names(schema, &figure, config, &mut degradations);
    let index: HashMap<&str, usize> = names
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();

    let explicit = explicit_coordinates(schema, &names, config, &mut degradations);
    let mut spans = collect_spans(schema, &index, config, &mut degradations);
    let mut corners = collect_corners(schema, &figure, &index, config, &mut degradations);
    add_figure_spans(&figure, &mut spans);

    let ctx = Context {
        names: &names,
        explicit: &explicit,
        spans: &spans,
        corners: &corners,
        config,
    };
    let built = construct(&figure, &ctx, &index, &mut degradations);

    let fit = if figure.on_grid() {
        Similarity::IDENTITY
    } else {
        Similarity::fit(&built.points, &explicit)
    };
    let mut placed: Vec<Option<Coord>> = explicit
        .iter()
        .zip(&built.points)
        .map(|(explicit, constructed)| explicit.or(constructed.map(|c| fit.apply(c))))
        .collect();
    let anchors = built.anchors.map(|c| fit.apply(c));
    synthesize_missing(&names, &mut placed, config, &mut degradations);

    for span in built.derived {
        if !spans.iter().any(|existing| existing.joins(span.from, span.to)) {
            spans.push(span);
        }
    }
    if let Figure::RightTriangle { .. } = figure {
        let right = right_vertex(&figure, &corners, &index);
        if !corners.iter().any(|corner| corner.vertex == right && corner.right) {
            corners.push(Corner {
                vertex: right,
                arms: Some(((right + 1) % 3, (right + 2) % 3)),
                degrees: None,
                right: true,
            });
        }
    }

    let vertices = names
        .into_iter()
        .zip(placed)
        .map(|(name, at)| Vertex {
            name,
            at: at.unwrap_or(Coord::ORIGIN),
        })
        .collect();

    debug!(figure = figure.name(); "resolved coordinates");
    Resolution {
        figure: ResolvedFigure {
            figure,
            vertices,
            anchors,
            lengths: spans,
            angles: corners,
            radius,
            height,
        },
        degradations,
    }
}

fn valid_measure(measure: &Measure, config: &FigureConfig) -> bool {
    measure.value.is_finite() && measure.value > 0.0 && measure.value <= config.max_measure
}

fn checked(
    measure: &Option<Measure>,
    field: &str,
    config: &FigureConfig,
    degradations: &mut Vec<Degradation>,
) -> Option<Measure> {
    let measure = measure.as_ref()?;
    if valid_measure(measure, config) {
        Some(measure.clone())
    } else {
        Degradation::InvalidMeasure(field.to_string()).report(degradations);
        None
    }
}

/// Validates figure-level measures. Returns the figure plus its radius and
/// height labels where the figure carries them.
fn checked_figure(
    figure: &Figure,
    config: &FigureConfig,
    degradations: &mut Vec<Degradation>,
) -> (Figure, Option<Measure>, Option<Measure>) {
    match figure {
        Figure::Square { side } => (
            Figure::Square {
                side: checked(side, "side", config, degradations),
            },
            None,
            None,
        ),
        Figure::Rectangle { width, height } => (
            Figure::Rectangle {
                width: checked(width, "width", config, degradations),
                height: checked(height, "height", config, degradations),
            },
            None,
            None,
        ),
        Figure::Circle { center, radius } => {
            let radius = checked(radius, "radius", config, degradations);
            (
                Figure::Circle {
                    center: center.clone(),
                    radius: radius.clone(),
                },
                radius,
                None,
            )
        }
        Figure::Pyramid { base_side, height } => {
            let height = checked(height, "height", config, degradations);
            (
                Figure::Pyramid {
                    base_side: checked(base_side, "base side", config, degradations),
                    height: height.clone(),
                },
                None,
                height,
            )
        }
        Figure::Cylinder { radius, height } => {
            let radius = checked(radius, "radius", config, degradations);
            let height = checked(height, "height", config, degradations);
            (
                Figure::Cylinder {
                    radius: radius.clone(),
                    height: height.clone(),
                },
                radius,
                height,
            )
        }
        Figure::Cube { side } => (
            Figure::Cube {
                side: checked(side, "side", config, degradations),
            },
            None,
            None,
        ),
        Figure::AxialSymmetry {
            axis,
            grid,
            hide_image,
        } => {
            let position = match *axis {
                Axis::Vertical(at) | Axis::Horizontal(at) => Some(at),
                Axis::Oblique => None,
            };
            let axis = match position {
                Some(at) if !(at.is_finite() && at.abs() <= config.max_coordinate) => {
                    Degradation::InvalidMeasure("axis".to_string()).report(degradations);
                    Axis::default()
                }
                _ => *axis,
            };
            (
                Figure::AxialSymmetry {
                    axis,
                    grid: *grid,
                    hide_image: *hide_image,
                },
                None,
                None,
            )
        }
        other => (other.clone(), None, None),
    }
}

fn collect_names(
    schema: &Schema,
    figure: &Figure,
    config: &FigureConfig,
    degradations: &mut Vec<Degradation>,
) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut dropped = 0usize;
    for raw in &schema.points {
        let name = raw.trim();
        if name.is_empty() {
            continue;
        }
        if names.iter().any(|existing| existing == name) {
            Degradation::DuplicatePoint(name.to_string()).report(degradations);
            continue;
        }
        if names.len() >= config.max_points {
            dropped += 1;
            continue;
        }
        names.push(name.to_string());
    }
    if dropped > 0 {
        Degradation::TooManyPoints(dropped).report(degradations);
    }

    let named_o = || names.iter().any(|n| n == "O").then(|| "O".to_string());
    let center = match figure {
        Figure::Circle { center, .. } => center.clone().or_else(named_o),
        // Without a name, the center is the middle of `[point, center, image]`.
        Figure::CentralSymmetry { center, .. } => center.clone().or_else(named_o).or_else(|| {
            names
                .get(1)
                .filter(|name| preimage_name(name).is_none())
                .or_else(|| names.iter().find(|name| preimage_name(name).is_none()))
                .cloned()
        }),
        _ => None,
    };
    if let Some(center) = center {
        names.retain(|name| *name != center);
        names.insert(0, center);
    }

    let missing = figure.vertex_count().saturating_sub(names.len());
    if missing > 0 {
        let mut letters = ('A'..='Z').map(String::from).chain((1..).map(|n| format!("P{n}")));
        while names.len() < figure.vertex_count() {
            if let Some(letter) = letters.find(|l| !names.contains(l) && !schema.labels.contains_key(l)) {
                names.push(letter);
            }
        }
        Degradation::PaddedVertices {
            figure: figure.name().to_string(),
            count: missing,
        }
        .report(degradations);
    }
    names
}

fn explicit_coordinates(
    schema: &Schema,
    names: &[String],
    config: &FigureConfig,
    degradations: &mut Vec<Degradation>,
) -> Vec<Option<Coord>> {
    names
        .iter()
        .map(|name| {
            let coord = schema.labels.get(name)?;
            let in_range = coord.x.abs() <= config.max_coordinate && coord.y.abs() <= config.max_coordinate;
            if coord.is_finite() && in_range {
                Some(*coord)
            } else {
                Degradation::InvalidCoordinate(name.clone()).report(degradations);
                None
            }
        })
        .collect()
}

fn lookup(
    index: &HashMap<&str, usize>,
    name: &str,
    degradations: &mut Vec<Degradation>,
) -> Option<usize> {
    let found = index.get(name.trim()).copied();
    if found.is_none() {
        Degradation::UnknownReference(name.to_string()).report(degradations);
    }
    found
}

fn collect_spans(
    schema: &Schema,
    index: &HashMap<&str, usize>,
    config: &FigureConfig,
    degradations: &mut Vec<Degradation>,
) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    let mut dropped = 0usize;
    for length in &schema.lengths {
        let from = lookup(index, &length.from, degradations);
        let to = lookup(index, &length.to, degradations);
        let (Some(from), Some(to)) = (from, to) else {
            continue;
        };
        if from == to || spans.iter().any(|span| span.joins(from, to)) {
            continue;
        }
        if spans.len() >= config.max_lengths {
            dropped += 1;
            continue;
        }
        let label = match &length.measure {
            Some(measure) if valid_measure(measure, config) => SpanLabel::Given(measure.clone()),
            Some(_) => {
                Degradation::InvalidMeasure(format!("{}{}", length.from, length.to)).report(degradations);
                continue;
            }
            None => SpanLabel::Unknown,
        };
        spans.push(Span { from, to, label });
    }
    if dropped > 0 {
        Degradation::TooManyAnnotations {
            kind: "lengths",
            count: dropped,
        }
        .report(degradations);
    }
    spans
}

/// Angles sharing a vertex and arms are merged, so the count is bounded by
/// the figure rather than by the input.
fn collect_corners(
    schema: &Schema,
    figure: &Figure,
    index: &HashMap<&str, usize>,
    config: &FigureConfig,
    degradations: &mut Vec<Degradation>,
) -> Vec<Corner> {
    let mut corners: Vec<Corner> = Vec::new();
    let mut dropped = 0usize;
    for angle in &schema.angles {
        let Some(vertex) = lookup(index, &angle.vertex, degradations) else {
            continue;
        };
        let arms = match &angle.arms {
            Some((first, second)) => {
                match (lookup(index, first, degradations), lookup(index, second, degradations)) {
                    (Some(a), Some(b)) if a != vertex && b != vertex && a != b => Some((a, b)),
                    _ => outline_arms(figure, vertex),
                }
            }
            None => outline_arms(figure, vertex),
        };
        let degrees = match angle.degrees {
            Some(d) if d.is_finite() && d > 0.0 && d < 360.0 => Some(d),
            Some(_) => {
                Degradation::InvalidMeasure(format!("angle {}", angle.vertex)).report(degradations);
                None
            }
            None => None,
        };
        if let Some(existing) = corners
            .iter_mut()
            .find(|corner| corner.vertex == vertex && same_arms(corner.arms, arms))
        {
            existing.right |= angle.right;
            existing.degrees = existing.degrees.or(degrees);
            continue;
        }
        if corners.len() >= config.max_angles {
            dropped += 1;
            continue;
        }
        corners.push(Corner {
            vertex,
            arms,
            degrees,
            right: angle.right,
        });
    }
    if dropped > 0 {
        Degradation::TooManyAnnotations {
            kind: "angles",
            count: dropped,
        }
        .report(degradations);
    }
    corners
}

fn same_arms(a: Option<(usize, usize)>, b: Option<(usize, usize)>) -> bool {
    match (a, b) {
        (Some((a1, a2)), Some((b1, b2))) => (a1, a2) == (b1, b2) || (a1, a2) == (b2, b1),
        (None, None) => true,
        _ => false,
    }
}

fn outline_arms(figure: &Figure, vertex: usize) -> Option<(usize, usize)> {
    let n = figure.outline_len()?;
    (vertex < n).then(|| ((vertex + n - 1) % n, (vertex + 1) % n))
}

/// Figure-level measures become labels on the matching edge when no length
/// already covers it.
fn add_figure_spans(figure: &Figure, spans: &mut Vec<Span>) {
    let mut add = |from: usize, to: usize, measure: &Option<Measure>, also: &[(usize, usize)]| {
        let Some(measure) = measure else {
            return;
        };
        let covered = spans.iter().any(|span| {
            span.joins(from, to) || also.iter().any(|&(a, b)| span.joins(a, b))
        });
        if !covered {
            spans.push(Span {
                from,
                to,
                label: SpanLabel::Given(measure.clone()),
            });
        }
    };
    match figure {
        Figure::Rectangle { width, height } => {
            add(0, 1, width, &[(2, 3)]);
            add(1, 2, height, &[(3, 0)]);
        }
        Figure::Square { side } => add(0, 1, side, &[(1, 2), (2, 3), (3, 0)]),
        Figure::Cube { side } => add(0, 1, side, &[]),
        Figure::Pyramid { base_side, .. } => add(0, 1, base_side, &[]),
        _ => {}
    }
}

fn right_vertex(figure: &Figure, corners: &[Corner], index: &HashMap<&str, usize>) -> usize {
    let named = match figure {
        Figure::RightTriangle {
            right_angle: Some(name),
        } => index.get(name.as_str()).copied().filter(|&idx| idx < 3),
        _ => None,
    };
    named
        .or_else(|| {
            corners
                .iter()
                .find(|corner| corner.right && corner.vertex < 3)
                .map(|corner| corner.vertex)
        })
        .unwrap_or(1)
}

fn construct(
    figure: &Figure,
    ctx: &Context<'_>,
    index: &HashMap<&str, usize>,
    degradations: &mut Vec<Degradation>,
) -> Construction {
    let mut built = Construction::new(ctx.names.len());
    match figure {
        Figure::Triangle {
            equilateral,
            isosceles,
        } => {
            let sides = [ctx.given(0, 1), ctx.given(1, 2), ctx.given(2, 0)];
            let placed = if *equilateral {
                regular_triangle(sides.iter().flatten().next().copied().unwrap_or(ctx.config.default_length))
            } else if *isosceles {
                isosceles_triangle(ctx, sides, degradations)
            } else {
                general_triangle(ctx, [0, 1, 2], sides, degradations)
            };
            for (idx, at) in placed.into_iter().enumerate() {
                built.set(idx, at);
            }
        }
        Figure::RightTriangle { right_angle } => {
            if let Some(name) = right_angle {
                if !index.contains_key(name.as_str()) {
                    Degradation::UnknownReference(name.clone()).report(degradations);
                }
            }
            let r = right_vertex(figure, ctx.corners, index);
            right_triangle(ctx, r, &mut built, degradations);
        }
        Figure::Square { side } => {
            let s = side
                .as_ref()
                .map(|m| m.value)
                .or_else(|| edge_measure(ctx, &[(0, 1), (1, 2), (2, 3), (3, 0)]))
                .unwrap_or(ctx.config.default_length);
            rectangle(&mut built, s, s);
        }
        Figure::Rectangle { width, height } => {
            let w = width
                .as_ref()
                .map(|m| m.value)
                .or_else(|| edge_measure(ctx, &[(0, 1), (2, 3)]));
            let h = height
                .as_ref()
                .map(|m| m.value)
                .or_else(|| edge_measure(ctx, &[(1, 2), (3, 0)]));
            let aspect = ctx.config.default_aspect;
            let (w, h) = match (w, h) {
                (Some(w), Some(h)) => (w, h),
                (Some(w), None) => (w, w / aspect),
                (None, Some(h)) => (h * aspect, h),
                (None, None) => (ctx.config.default_length, ctx.config.default_length / aspect),
            };
            rectangle(&mut built, w, h);
        }
        Figure::Circle { radius, .. } => {
            let r = radius
                .as_ref()
                .map(|m| m.value)
                .or_else(|| (1..ctx.names.len()).find_map(|idx| ctx.given(0, idx)))
                .unwrap_or(ctx.config.default_length / 2.0);
            built.set(0, Coord::ORIGIN);
            let rim_points = ctx.names.len().saturating_sub(1);
            for k in 0..rim_points {
                let degrees = k as f64 * 360.0 / rim_points as f64;
                built.set(k + 1, Coord::polar(Coord::ORIGIN, r, degrees));
            }
            built.anchors.center = Some(Coord::ORIGIN);
            built.anchors.rim = Some(Coord::new(r, 0.0));
        }
        Figure::Thales => thales(ctx, &mut built, degradations),
        Figure::Pyramid { base_side, height } => {
            let b = base_side
                .as_ref()
                .map(|m| m.value)
                .or_else(|| edge_measure(ctx, &[(0, 1), (1, 2), (2, 3), (3, 0)]))
                .unwrap_or(ctx.config.default_length);
            let h = height
                .as_ref()
                .map(|m| m.value)
                .unwrap_or(b * ctx.config.solid_height_ratio);
            let project = |x: f64, y: f64, z: f64| oblique(ctx.config, x, y, z);
            built.set(0, project(0.0, 0.0, 0.0));
            built.set(1, project(b, 0.0, 0.0));
            built.set(2, project(b, 0.0, b));
            built.set(3, project(0.0, 0.0, b));
            built.set(4, project(b / 2.0, h, b / 2.0));
            let foot = project(b / 2.0, 0.0, b / 2.0);
            built.anchors.base_center = Some(foot);
            // A sixth name is the foot of the height.
            built.set(5, foot);
        }
        Figure::Cylinder { radius, height } => {
            let r = radius
                .as_ref()
                .map(|m| m.value)
                .or_else(|| ctx.given(0, 2))
                .unwrap_or(ctx.config.default_length / 2.0);
            let h = height
                .as_ref()
                .map(|m| m.value)
                .or_else(|| ctx.given(0, 1))
                .unwrap_or(ctx.config.default_length * ctx.config.solid_height_ratio);
            built.set(0, Coord::ORIGIN);
            built.set(1, Coord::new(0.0, h));
            built.set(2, Coord::new(r, 0.0));
            built.set(3, Coord::new(r, h));
            built.anchors.base_center = Some(Coord::ORIGIN);
            built.anchors.top_center = Some(Coord::new(0.0, h));
            built.anchors.rim = Some(Coord::new(r, 0.0));
        }
        Figure::Cube { side } => {
            let s = side
                .as_ref()
                .map(|m| m.value)
                .or_else(|| edge_measure(ctx, &[(0, 1), (1, 2), (2, 3), (3, 0), (0, 4)]))
                .unwrap_or(ctx.config.default_length);
            let corners = [
                (0.0, 0.0, 0.0),
                (s, 0.0, 0.0),
                (s, s, 0.0),
                (0.0, s, 0.0),
                (0.0, 0.0, s),
                (s, 0.0, s),
                (s, s, s),
                (0.0, s, s),
            ];
            for (idx, (x, y, z)) in corners.into_iter().enumerate() {
                built.set(idx, oblique(ctx.config, x, y, z));
            }
        }
        Figure::AxialSymmetry { axis, .. } => {
            let axis = *axis;
            let slot = |k: usize| {
                let (along, across) = (2.0 + 2.0 * k as f64, 2.0 + 1.5 * (k % 3) as f64);
                match axis {
                    Axis::Vertical(a) => Coord::new(a - across, along),
                    Axis::Horizontal(b) => Coord::new(along, b - across),
                    Axis::Oblique => Coord::new(along + across, along),
                }
            };
            mirror(ctx, &mut built, 0, |p| axis.reflect(p), slot);
        }
        Figure::CentralSymmetry { .. } => {
            let middle = ctx.config.grid_size / 2.0;
            let center = ctx
                .explicit
                .first()
                .copied()
                .flatten()
                .unwrap_or(Coord::new(middle, middle));
            built.set(0, center);
            built.anchors.center = Some(center);
            let slot = |k: usize| {
                center.add(Coord::new(-2.0 - 1.5 * (k % 3) as f64, 1.0 + 1.5 * k as f64))
            };
            mirror(ctx, &mut built, 1, |p| center.scale(2.0).sub(p), slot);
        }
        Figure::PerpendicularBisector => {
            let length = ctx.given(0, 1).unwrap_or(ctx.config.default_length);
            let middle = Coord::new(length / 2.0, 0.0);
            built.set(0, Coord::ORIGIN);
            built.set(1, Coord::new(length, 0.0));
            built.set(2, middle);
            built.anchors.center = Some(middle);
        }
        Figure::Unknown { .. } => {}
    }
    built
}

/// Places the points of a symmetry from index `first` on. A point keeps its
/// explicit coordinate or takes the next default `slot`; an image `X'` whose
/// preimage `X` is named is the `reflect`ion of it.
fn mirror(
    ctx: &Context<'_>,
    built: &mut Construction,
    first: usize,
    reflect: impl Fn(Coord) -> Coord,
    slot: impl Fn(usize) -> Coord,
) {
    let preimage = |idx: usize| {
        let base = preimage_name(&ctx.names[idx])?;
        ctx.names.iter().position(|name| name == base)
    };
    let mut images: Vec<(usize, usize)> = Vec::new();
    let mut free = 0usize;
    for idx in first..ctx.names.len() {
        if let Some(base) = preimage(idx) {
            images.push((idx, base));
            continue;
        }
        let at = ctx.explicit.get(idx).copied().flatten().unwrap_or_else(|| {
            free += 1;
            slot(free - 1)
        });
        built.set(idx, at);
    }
    // `A''` reflects `A'`, so shorter names go first.
    images.sort_by_key(|&(idx, _)| ctx.names[idx].len());
    for (idx, base) in images {
        if let Some(at) = built.points.get(base).copied().flatten() {
            built.set(idx, reflect(at));
        }
    }
}

fn edge_measure(ctx: &Context<'_>, edges: &[(usize, usize)]) -> Option<f64> {
    edges.iter().find_map(|&(a, b)| ctx.given(a, b))
}

/// Cavalier projection: the receding axis goes up and to the right.
pub(crate) fn oblique(config: &FigureConfig, x: f64, y: f64, z: f64) -> Coord {
    let angle = config.oblique_angle.to_radians();
    Coord::new(
        x + z * config.oblique_depth * angle.cos(),
        y + z * config.oblique_depth * angle.sin(),
    )
}

fn rectangle(built: &mut Construction, w: f64, h: f64) {
    built.set(0, Coord::new(0.0, 0.0));
    built.set(1, Coord::new(w, 0.0));
    built.set(2, Coord::new(w, h));
    built.set(3, Coord::new(0.0, h));
}

fn regular_triangle(side: f64) -> [Coord; 3] {
    let radius = side / 3f64.sqrt();
    [90.0, 210.0, 330.0].map(|deg| Coord::polar(Coord::ORIGIN, radius, deg))
}

/// `a` at the origin, `b` along +x, `c` above the x axis.
fn place_sss(ab: f64, bc: f64, ca: f64) -> Option<[Coord; 3]> {
    let eps = 1e-9 * (ab + bc + ca);
    if ab + bc <= ca + eps || bc + ca <= ab + eps || ca + ab <= bc + eps {
        return None;
    }
    let x = (ab * ab + ca * ca - bc * bc) / (2.0 * ab);
    let y = (ca * ca - x * x).max(0.0).sqrt();
    Some([Coord::ORIGIN, Coord::new(ab, 0.0), Coord::new(x, y)])
}

fn law_of_cosines(s1: f64, s2: f64, degrees: f64) -> f64 {
    (s1 * s1 + s2 * s2 - 2.0 * s1 * s2 * degrees.to_radians().cos())
        .max(0.0)
        .sqrt()
}

/// `sides` are `[ab, bc, ca]` for the vertices in `tri`.
fn general_triangle(
    ctx: &Context<'_>,
    tri: [usize; 3],
    sides: [Option<f64>; 3],
    degradations: &mut Vec<Degradation>,
) -> [Coord; 3] {
    let mut sides = sides;
    let known = sides.iter().filter(|s| s.is_some()).count();
    if known == 2 {
        // The missing side is opposite the vertex shared by the two others.
        let missing = sides.iter().position(Option::is_none).unwrap_or(0);
        let shared = tri[(missing + 2) % 3];
        let s1 = sides[(missing + 1) % 3].unwrap_or_default();
        let s2 = sides[(missing + 2) % 3].unwrap_or_default();
        let angle = ctx
            .degrees_at(shared)
            .filter(|d| *d < 180.0)
            .unwrap_or(ctx.config.default_angle);
        sides[missing] = Some(law_of_cosines(s1, s2, angle));
    }
    match sides {
        [Some(ab), Some(bc), Some(ca)] => place_sss(ab, bc, ca).unwrap_or_else(|| {
            let name = format!("{}{}{}", ctx.name(tri[0]), ctx.name(tri[1]), ctx.name(tri[2]));
            Degradation::InconsistentMeasure(name).report(degradations);
            regular_triangle(ctx.config.default_length)
        }),
        _ => regular_triangle(sides.iter().flatten().next().copied().unwrap_or(ctx.config.default_length)),
    }
}

fn isosceles_triangle(
    ctx: &Context<'_>,
    sides: [Option<f64>; 3],
    degradations: &mut Vec<Degradation>,
) -> [Coord; 3] {
    let base = sides[1].unwrap_or(ctx.config.default_length);
    let apex_angle = ctx.degrees_at(0).filter(|d| *d < 180.0);
    let mut leg = sides[0]
        .or(sides[2])
        .or_else(|| apex_angle.map(|d| base / (2.0 * (d.to_radians() / 2.0).sin())))
        .unwrap_or(base * 1.25);
    if leg <= base / 2.0 {
        Degradation::InconsistentMeasure(ctx.pair(0, 1)).report(degradations);
        leg = base * 1.25;
    }
    let apex_height = (leg * leg - base * base / 4.0).sqrt();
    [
        Coord::new(0.0, apex_height),
        Coord::new(-base / 2.0, 0.0),
        Coord::new(base / 2.0, 0.0),
    ]
}

fn right_triangle(
    ctx: &Context<'_>,
    r: usize,
    built: &mut Construction,
    degradations: &mut Vec<Degradation>,
) {
    let p = (r + 2) % 3;
    let q = (r + 1) % 3;
    let (p, q) = if p < q { (p, q) } else { (q, p) };
    let config = ctx.config;
    let given_p = ctx.given(r, p);
    let given_q = ctx.given(r, q);
    let hyp = ctx.given(p, q);

    let (leg_p, leg_q) = match (given_p, given_q, hyp) {
        (Some(lp), Some(lq), hyp) => {
            if let Some(h) = hyp {
                if (h - lp.hypot(lq)).abs() > 0.01 * h {
                    Degradation::InconsistentMeasure(ctx.pair(p, q)).report(degradations);
                }
            }
            (lp, lq)
        }
        (Some(lp), None, Some(h)) if h > lp => (lp, (h * h - lp * lp).sqrt()),
        (None, Some(lq), Some(h)) if h > lq => ((h * h - lq * lq).sqrt(), lq),
        (Some(lp), None, hyp) => {
            if hyp.is_some() {
                Degradation::InconsistentMeasure(ctx.pair(p, q)).report(degradations);
            }
            (lp, lp / config.default_leg_ratio)
        }
        (None, Some(lq), hyp) => {
            if hyp.is_some() {
                Degradation::InconsistentMeasure(ctx.pair(p, q)).report(degradations);
            }
            (lq * config.default_leg_ratio, lq)
        }
        (None, None, Some(h)) => (0.6 * h, 0.8 * h),
        (None, None, None) => (
            config.default_length * config.default_leg_ratio,
            config.default_length,
        ),
    };

    built.set(r, Coord::ORIGIN);
    built.set(p, Coord::new(0.0, leg_p));
    built.set(q, Coord::new(leg_q, 0.0));

    if let (Some(lp), Some(lq), None) = (given_p, given_q, hyp) {
        let unit = ctx.unit(r, p).or_else(|| ctx.unit(r, q));
        let value = lp.hypot(lq);
        built.derived.push(Span {
            from: p,
            to: q,
            label: SpanLabel::Derived(Measure { value, unit }),
        });
    }
}

fn thales(ctx: &Context<'_>, built: &mut Construction, degradations: &mut Vec<Degradation>) {
    let (a, b, c, m, n) = (0, 1, 2, 3, 4);
    let sum = |x: Option<f64>, y: Option<f64>| x.zip(y).map(|(x, y)| x + y);
    let ab = ctx.given(a, b).or_else(|| sum(ctx.given(a, m), ctx.given(m, b)));
    let ac = ctx.given(a, c).or_else(|| sum(ctx.given(a, n), ctx.given(n, c)));
    let triangle = general_triangle(ctx, [a, b, c], [ab, ctx.given(b, c), ac], degradations);
    // Apex on top reads like the textbook figure.
    let [pa, pb, pc] = if ab.is_some() || ac.is_some() {
        triangle
    } else {
        regular_triangle(ctx.config.default_length * 1.5)
    };

    let ratio = thales_ratio(ctx.given(a, m), ctx.given(m, b), ab)
        .or_else(|| thales_ratio(ctx.given(a, n), ctx.given(n, c), ac));
    let ratio = match ratio {
        Some(t) if t > 0.0 && t < 1.0 => t,
        Some(_) => {
            Degradation::InconsistentMeasure(ctx.pair(a, m)).report(degradations);
            ctx.config.thales_ratio
        }
        None => ctx.config.thales_ratio,
    };

    built.set(a, pa);
    built.set(b, pb);
    built.set(c, pc);
    built.set(m, pa.lerp(pb, ratio));
    built.set(n, pa.lerp(pc, ratio));
}

fn thales_ratio(part: Option<f64>, rest: Option<f64>, whole: Option<f64>) -> Option<f64> {
    match (part, rest, whole) {
        (Some(p), _, Some(w)) => Some(p / w),
        (Some(p), Some(r), None) => Some(p / (p + r)),
        (None, Some(r), Some(w)) => Some(1.0 - r / w),
        _ => None,
    }
}

/// Maps construction space onto the frame of the explicit coordinates,
/// `z -> a * z + b` with complex `a` (rotation and scale) and `b`.
#[derive(Debug, Clone, Copy)]
struct Similarity {
    a: Coord,
    b: Coord,
}

impl Similarity {
    const IDENTITY: Similarity = Similarity {
        a: Coord { x: 1.0, y: 0.0 },
        b: Coord::ORIGIN,
    };

    fn fit(constructed: &[Option<Coord>], explicit: &[Option<Coord>]) -> Self {
        let pairs: Vec<(Coord, Coord)> = constructed
            .iter()
            .zip(explicit)
            .filter_map(|(c, e)| c.zip(*e))
            .collect();
        let Some(&(c1, e1)) = pairs.first() else {
            return Self::IDENTITY;
        };
        let translation = Similarity {
            a: Self::IDENTITY.a,
            b: e1.sub(c1),
        };
        let Some(&(c2, e2)) = pairs.iter().skip(1).find(|(c, _)| c.distance(c1) > 1e-9) else {
            return translation;
        };
        let dc = c2.sub(c1);
        let de = e2.sub(e1);
        let denom = dc.dot(dc);
        let a = Coord::new(
            (de.x * dc.x + de.y * dc.y) / denom,
            (de.y * dc.x - de.x * dc.y) / denom,
        );
        if !a.is_finite() || a.length() < 1e-9 {
            return translation;
        }
        Similarity {
            a,
            b: e1.sub(complex_mul(a, c1)),
        }
    }

    fn apply(&self, z: Coord) -> Coord {
        complex_mul(self.a, z).add(self.b)
    }
}

fn complex_mul(a: Coord, z: Coord) -> Coord {
    Coord::new(a.x * z.x - a.y * z.y, a.x * z.y + a.y * z.x)
}

fn synthesize_missing(
    names: &[String],
    placed: &mut [Option<Coord>],
    config: &FigureConfig,
    degradations: &mut Vec<Degradation>,
) {
    let missing: Vec<usize> = (0..placed.len()).filter(|&idx| placed[idx].is_none()).collect();
    if missing.is_empty() {
        return;
    }
    let known: Vec<Coord> = placed.iter().flatten().copied().collect();
    let center = centroid(&known).unwrap_or(Coord::ORIGIN);
    let extent = known.iter().map(|c| c.distance(center)).fold(0.0, f64::max);
    let radius = (extent * config.fallback_radius_ratio).max(config.default_length * 0.5);
    let step = 360.0 / missing.len() as f64;
    for (k, &idx) in missing.iter().enumerate() {
        placed[idx] = Some(Coord::polar(center, radius, 90.0 + k as f64 * step));
    }
    Degradation::SynthesizedPoints(missing.iter().map(|&idx| names[idx].clone()).collect())
        .report(degradations);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Angle, Axis, Length};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn right_triangle_schema() -> Schema {
        Schema::new(
            Figure::RightTriangle {
                right_angle: Some("B".to_string()),
            },
            &["A", "B", "C"],
        )
        .with_length("A", "B", 3.0)
        .with_length("B", "C", 4.0)
    }

    #[test]
    fn right_triangle_derives_hypotenuse() {
        let resolved = resolve(&right_triangle_schema(), &FigureConfig::default());
        assert!(resolved.degradations.is_empty());
        let figure = resolved.figure;
        let (a, b, c) = (figure.at(0), figure.at(1), figure.at(2));
        assert!(close(a.distance(b), 3.0));
        assert!(close(b.distance(c), 4.0));
        assert!(close(a.sub(b).dot(c.sub(b)), 0.0));
        let hyp = figure
            .lengths
            .iter()
            .find(|span| span.joins(0, 2))
            .expect("hypotenuse span");
        assert_eq!(hyp.label.text(), "5");
        assert!(figure.angles.iter().any(|corner| corner.vertex == 1 && corner.right));
    }

    #[test]
    fn hypotenuse_to_compute_stays_unknown() {
        let mut schema = right_triangle_schema();
        schema.lengths.push(Length::unknown("A", "C"));
        let figure = resolve(&schema, &FigureConfig::default()).figure;
        let hyp = figure.lengths.iter().find(|span| span.joins(0, 2)).expect("span");
        assert_eq!(hyp.label, SpanLabel::Unknown);
    }

    #[test]
    fn right_triangle_from_hypotenuse_only() {
        let schema = Schema::new(Figure::RightTriangle { right_angle: None }, &["D", "E", "F"])
            .with_length("D", "F", 10.0);
        let figure = resolve(&schema, &FigureConfig::default()).figure;
        assert!(close(figure.at(0).distance(figure.at(2)), 10.0));
        let e = figure.at(1);
        assert!(close(figure.at(0).sub(e).dot(figure.at(2).sub(e)), 0.0));
    }

    #[test]
    fn rectangle_without_coordinates_is_not_degenerate() {
        let schema = Schema::new(Figure::Rectangle { width: None, height: None }, &["A", "B", "C", "D"]);
        let resolution = resolve(&schema, &FigureConfig::default());
        assert!(resolution.degradations.is_empty());
        let pts: Vec<Coord> = resolution.figure.vertices.iter().map(|v| v.at).collect();
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert!(pts[i].distance(pts[j]) > 1e-6);
            }
        }
        let cross = pts[1].sub(pts[0]).x * pts[2].sub(pts[0]).y - pts[1].sub(pts[0]).y * pts[2].sub(pts[0]).x;
        assert!(cross.abs() > 1e-6);
    }

    #[test]
    fn triangle_from_three_sides_and_from_sas() {
        let sss = Schema::new(Figure::Triangle { equilateral: false, isosceles: false }, &["A", "B", "C"])
            .with_length("A", "B", 5.0)
            .with_length("B", "C", 6.0)
            .with_length("C", "A", 7.0);
        let figure = resolve(&sss, &FigureConfig::default()).figure;
        assert!(close(figure.at(0).distance(figure.at(1)), 5.0));
        assert!(close(figure.at(1).distance(figure.at(2)), 6.0));
        assert!(close(figure.at(2).distance(figure.at(0)), 7.0));

        let sas = Schema::new(Figure::Triangle { equilateral: false, isosceles: false }, &["A", "B", "C"])
            .with_length("A", "B", 3.0)
            .with_length("A", "C", 4.0)
            .with_angle(Angle::measured("B", "A", "C", 90.0));
        let figure = resolve(&sas, &FigureConfig::default()).figure;
        assert!(close(figure.at(1).distance(figure.at(2)), 5.0));
    }

    #[test]
    fn impossible_sides_fall_back_with_warning() {
        let schema = Schema::new(Figure::Triangle { equilateral: false, isosceles: false }, &["A", "B", "C"])
            .with_length("A", "B", 1.0)
            .with_length("B", "C", 1.0)
            .with_length("C", "A", 5.0);
        let resolution = resolve(&schema, &FigureConfig::default());
        assert!(matches!(
            resolution.degradations.as_slice(),
            [Degradation::InconsistentMeasure(name)] if name == "ABC"
        ));
    }

    #[test]
    fn pads_missing_vertices_with_unused_letters() {
        let schema = Schema::new(Figure::Square { side: None }, &["A", "C"]);
        let resolution = resolve(&schema, &FigureConfig::default());
        let names: Vec<&str> = resolution.figure.vertices.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "B", "D"]);
        assert!(resolution.degradations.contains(&Degradation::PaddedVertices {
            figure: "square".to_string(),
            count: 2
        }));
    }

    #[test]
    fn explicit_coordinates_anchor_the_construction() {
        let schema = right_triangle_schema()
            .with_label("B", 10.0, 10.0)
            .with_label("A", 10.0, 13.0);
        let figure = resolve(&schema, &FigureConfig::default()).figure;
        assert_eq!(figure.at(0), Coord::new(10.0, 13.0));
        assert_eq!(figure.at(1), Coord::new(10.0, 10.0));
        let c = figure.at(2);
        assert!(close(c.x, 14.0) && close(c.y, 10.0));
    }

    #[test]
    fn bad_input_degrades_instead_of_failing() {
        let mut schema = Schema::new(Figure::Triangle { equilateral: false, isosceles: false }, &["A", "B", "C", "H", "A"])
            .with_label("C", f64::NAN, 0.0)
            .with_label("B", 1e12, 0.0)
            .with_length("A", "Z", 3.0)
            .with_length("A", "B", -2.0);
        schema.angles.push(Angle::right("Q"));
        let resolution = resolve(&schema, &FigureConfig::default());
        let kinds: Vec<&str> = resolution.degradations.iter().map(Degradation::kind).collect();
        for expected in [
            "duplicate_point",
            "invalid_coordinate",
            "unknown_reference",
            "invalid_measure",
            "synthesized_points",
        ] {
            assert!(kinds.contains(&expected), "missing {expected} in {kinds:?}");
        }
        let coords = resolution.figure.coordinates();
        for name in ["A", "B", "C", "H"] {
            assert!(coords[name].is_finite());
        }
        assert!(resolution.degradations.contains(&Degradation::SynthesizedPoints(vec!["H".to_string()])));
    }

    #[test]
    fn point_limit_is_enforced() {
        let names: Vec<String> = (0..40).map(|i| format!("P{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let schema = Schema::new(Figure::Unknown { name: "cloud".to_string() }, &refs);
        let resolution = resolve(&schema, &FigureConfig::default());
        assert_eq!(resolution.figure.vertices.len(), 26);
        assert!(resolution.degradations.contains(&Degradation::TooManyPoints(14)));
    }

    #[test]
    fn thales_places_points_by_ratio() {
        let schema = Schema::new(Figure::Thales, &["A", "B", "C", "M", "N"])
            .with_length("A", "M", 2.0)
            .with_length("M", "B", 3.0);
        let figure = resolve(&schema, &FigureConfig::default()).figure;
        let (a, b, m) = (figure.at(0), figure.at(1), figure.at(3));
        assert!(close(a.distance(b), 5.0));
        assert!(close(a.distance(m), 2.0));
        let (c, n) = (figure.at(2), figure.at(4));
        assert!(close(a.distance(n) / a.distance(c), 0.4));
    }

    #[test]
    fn circle_center_comes_first() {
        let schema = Schema::new(
            Figure::Circle {
                center: Some("O".to_string()),
                radius: Some(Measure::with_unit(3.0, "cm")),
            },
            &["A", "O", "B"],
        );
        let figure = resolve(&schema, &FigureConfig::default()).figure;
        assert_eq!(figure.vertices[0].name, "O");
        assert_eq!(figure.at(0), Coord::ORIGIN);
        assert!(close(figure.at(1).distance(Coord::ORIGIN), 3.0));
        assert!(close(figure.at(2).distance(Coord::ORIGIN), 3.0));
        assert_eq!(figure.anchors.rim, Some(Coord::new(3.0, 0.0)));
        assert_eq!(figure.radius, Some(Measure::with_unit(3.0, "cm")));
    }

    #[test]
    fn cube_uses_cavalier_projection() {
        let schema = Schema::new(Figure::Cube { side: Some(Measure::new(2.0)) }, &["A", "B", "C", "D", "E", "F", "G", "H"]);
        let figure = resolve(&schema, &FigureConfig::default()).figure;
        let e = figure.at(4);
        let shift = 2.0 * 0.5 * 45f64.to_radians().cos();
        assert!(close(e.x, shift) && close(e.y, shift));
        assert_eq!(figure.lengths.len(), 1);
    }

    #[test]
    fn two_sides_without_their_angle_keep_both_lengths() {
        let schema = Schema::new(Figure::Triangle { equilateral: false, isosceles: false }, &["A", "B", "C"])
            .with_length("A", "B", 4.0)
            .with_length("B", "C", 4.0);
        let resolution = resolve(&schema, &FigureConfig::default());
        assert!(resolution.degradations.is_empty());
        let figure = resolution.figure;
        let (a, b, c) = (figure.at(0), figure.at(1), figure.at(2));
        assert!(close(a.distance(b), 4.0));
        assert!(close(b.distance(c), 4.0));
        // The included angle at B defaults to 60 degrees.
        assert!(close(a.distance(c), 4.0));
    }

    #[test]
    fn repeated_angles_merge_and_extra_annotations_are_capped() {
        let mut schema = Schema::new(Figure::Triangle { equilateral: false, isosceles: false }, &["A", "B", "C"]);
        for i in 0..500 {
            let mut angle = Angle::measured(&format!("X{i}"), "A", &format!("Y{i}"), 50.0);
            angle.right = i == 7;
            schema.angles.push(angle);
        }
        let resolution = resolve(&schema, &FigureConfig::default());
        let corners = &resolution.figure.angles;
        assert_eq!(corners.len(), 1);
        assert_eq!(corners[0].arms, Some((2, 1)));
        assert!(corners[0].right);

        let names: Vec<String> = (0..26).map(|i| format!("P{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut schema = Schema::new(Figure::Unknown { name: "cloud".to_string() }, &refs);
        for i in 0..26 {
            for j in (i + 1)..26 {
                schema = schema.with_length(&names[i], &names[j], 1.0);
            }
        }
        for k in 1..=40 {
            schema.angles.push(Angle::measured(&names[k % 26], "P0", &names[(k * 7) % 25 + 1], 30.0));
        }
        let config = FigureConfig::default();
        let resolution = resolve(&schema, &config);
        assert_eq!(resolution.figure.lengths.len(), config.max_lengths);
        assert!(resolution.figure.angles.len() <= config.max_angles);
        assert!(resolution.degradations.contains(&Degradation::TooManyAnnotations {
            kind: "lengths",
            count: 325 - config.max_lengths
        }));
    }

    #[test]
    fn axial_symmetry_reflects_across_the_axis() {
        let schema = Schema::new(
            Figure::AxialSymmetry {
                axis: Axis::Vertical(5.0),
                grid: true,
                hide_image: false,
            },
            &["A", "B", "A'", "B'", "C"],
        )
        .with_label("A", 3.0, 5.0)
        .with_label("B", 2.0, 1.0);
        let resolution = resolve(&schema, &FigureConfig::default());
        assert!(resolution.degradations.is_empty());
        let coords = resolution.figure.coordinates();
        assert_eq!(coords["A"], Coord::new(3.0, 5.0));
        assert_eq!(coords["A'"], Coord::new(7.0, 5.0));
        assert_eq!(coords["B'"], Coord::new(8.0, 1.0));
        assert!(coords["C"].x < 5.0);
    }

    #[test]
    fn unusable_axis_falls_back_to_the_default() {
        let schema = Schema::new(
            Figure::AxialSymmetry {
                axis: Axis::Horizontal(f64::NAN),
                grid: false,
                hide_image: false,
            },
            &["A", "A'"],
        );
        let resolution = resolve(&schema, &FigureConfig::default());
        assert!(matches!(
            resolution.figure.figure,
            Figure::AxialSymmetry { axis: Axis::Vertical(x), .. } if x == 5.0
        ));
        assert!(resolution.degradations.contains(&Degradation::InvalidMeasure("axis".to_string())));
        assert!(resolution.figure.coordinates().values().all(|c| c.is_finite()));
    }

    #[test]
    fn central_symmetry_puts_the_center_first() {
        let schema = Schema::new(
            Figure::CentralSymmetry {
                center: None,
                grid: true,
                hide_image: false,
            },
            &["A", "I", "A'"],
        )
        .with_label("A", 3.0, 5.0)
        .with_label("I", 6.0, 6.0);
        let figure = resolve(&schema, &FigureConfig::default()).figure;
        assert_eq!(figure.vertices[0].name, "I");
        assert_eq!(figure.coordinates()["A'"], Coord::new(9.0, 7.0));
        assert_eq!(figure.anchors.center, Some(Coord::new(6.0, 6.0)));
    }

    #[test]
    fn bisector_midpoint_is_equidistant() {
        let schema = Schema::new(Figure::PerpendicularBisector, &["A", "B", "I"])
            .with_length("A", "B", 6.0)
            .with_label("A", 1.0, 1.0)
            .with_label("B", 1.0, 7.0);
        let figure = resolve(&schema, &FigureConfig::default()).figure;
        let (a, b, i) = (figure.at(0), figure.at(1), figure.at(2));
        assert!(close(i.distance(a), 3.0) && close(i.distance(b), 3.0));
        assert_eq!(figure.anchors.center, Some(i));
    }
}
