use crate::ir::Coord;

/// How a line is stroked; the composer maps each to theme colors and dashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    Solid,
    /// Edge hidden behind a solid, dashed.
    Hidden,
    Highlight,
    /// Helper line such as a radius or a height, dashed and lighter.
    Construction,
    /// Axis of symmetry, dashed in the highlight color.
    Axis,
}

/// Draw instruction in canvas space (y down).
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Segment {
        from: Coord,
        to: Coord,
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Coord>,
        stroke: Stroke,
    },
    Circle {
        center: Coord,
        radius: f64,
        stroke: Stroke,
    },
    Ellipse {
        center: Coord,
        rx: f64,
        ry: f64,
        stroke: Stroke,
    },
    /// Elliptic arc from `start` sweeping `sweep` degrees; positive sweeps
    /// turn clockwise on screen.
    Arc {
        center: Coord,
        rx: f64,
        ry: f64,
        start: f64,
        sweep: f64,
        stroke: Stroke,
    },
    /// Open square at a right angle: first arm point, far corner, second arm point.
    RightAngle {
        points: [Coord; 3],
    },
    Dot {
        at: Coord,
        radius: f64,
    },
    Frame {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    /// Square cells of `cell` pixels from the top-left `origin`.
    Grid {
        origin: Coord,
        cell: f64,
        columns: usize,
        rows: usize,
    },
}

impl Primitive {
    /// Extreme points, used for the view box.
    pub fn extent(&self) -> Vec<Coord> {
        match self {
            Primitive::Segment { from, to, .. } => vec![*from, *to],
            Primitive::Polygon { points, .. } => points.clone(),
            Primitive::RightAngle { points } => points.to_vec(),
            Primitive::Circle { center, radius, .. } => corners(*center, *radius, *radius),
            Primitive::Ellipse { center, rx, ry, .. } | Primitive::Arc { center, rx, ry, .. } => {
                corners(*center, *rx, *ry)
            }
            Primitive::Dot { at, radius } => corners(*at, *radius, *radius),
            Primitive::Frame {
                x,
                y,
                width,
                height,
            } => vec![Coord::new(*x, *y), Coord::new(x + width, y + height)],
            Primitive::Grid {
                origin,
                cell,
                columns,
                rows,
            } => vec![
                *origin,
                origin.add(Coord::new(cell * *columns as f64, cell * *rows as f64)),
            ],
        }
    }

    /// Straight pieces approximating the primitive, used as label obstacles.
    pub fn segments(&self) -> Vec<(Coord, Coord)> {
        match self {
            Primitive::Segment { from, to, .. } => vec![(*from, *to)],
            Primitive::Polygon { points, .. } => closed(points),
            Primitive::RightAngle { points } => vec![(points[0], points[1]), (points[1], points[2])],
            Primitive::Circle { center, radius, .. } => {
                let pts = ellipse_points(*center, *radius, *radius, 0.0, 360.0, 24);
                pts.windows(2).map(|w| (w[0], w[1])).collect()
            }
            Primitive::Ellipse { center, rx, ry, .. } => {
                let pts = ellipse_points(*center, *rx, *ry, 0.0, 360.0, 24);
                pts.windows(2).map(|w| (w[0], w[1])).collect()
            }
            Primitive::Arc {
                center,
                rx,
                ry,
                start,
                sweep,
                ..
            } => {
                let pts = ellipse_points(*center, *rx, *ry, *start, *sweep, 8);
                pts.windows(2).map(|w| (w[0], w[1])).collect()
            }
            // Labels may sit on the grid.
            Primitive::Dot { .. } | Primitive::Frame { .. } | Primitive::Grid { .. } => Vec::new(),
        }
    }
}

fn corners(center: Coord, rx: f64, ry: f64) -> Vec<Coord> {
    vec![
        Coord::new(center.x - rx, center.y - ry),
        Coord::new(center.x + rx, center.y + ry),
    ]
}

fn closed(points: &[Coord]) -> Vec<(Coord, Coord)> {
    (0..points.len())
        .map(|i| (points[i], points[(i + 1) % points.len()]))
        .collect()
}

pub(crate) fn ellipse_points(center: Coord, rx: f64, ry: f64, start: f64, sweep: f64, steps: usize) -> Vec<Coord> {
    (0..=steps)
        .map(|i| {
            let angle = (start + sweep * i as f64 / steps as f64).to_radians();
            Coord::new(center.x + rx * angle.cos(), center.y + ry * angle.sin())
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Point,
    Length,
    Angle,
    Caption,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    /// Center of the text box.
    pub at: Coord,
    pub kind: LabelKind,
    /// Direction the label may be pushed along when it overlaps a line.
    pub normal: Coord,
    /// Point names of the measured segment, for length labels.
    pub endpoints: Option<(String, String)>,
}

/// Everything a figure renderer produces; composed into SVG by `render`.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    pub figure: String,
    pub primitives: Vec<Primitive>,
    pub labels: Vec<Label>,
    pub placeholder: bool,
}
