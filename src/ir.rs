use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A point in figure space. The resolver works with y pointing up; the
/// renderers flip it when mapping onto the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub const ORIGIN: Coord = Coord { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn polar(center: Coord, radius: f64, degrees: f64) -> Self {
        let rad = degrees.to_radians();
        Self {
            x: center.x + radius * rad.cos(),
            y: center.y + radius * rad.sin(),
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn add(self, other: Coord) -> Coord {
        Coord::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Coord) -> Coord {
        Coord::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, factor: f64) -> Coord {
        Coord::new(self.x * factor, self.y * factor)
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Coord) -> f64 {
        self.sub(other).length()
    }

    pub fn midpoint(self, other: Coord) -> Coord {
        Coord::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn lerp(self, other: Coord, t: f64) -> Coord {
        self.add(other.sub(self).scale(t))
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalized(self) -> Option<Coord> {
        let len = self.length();
        if len > 1e-9 && len.is_finite() {
            Some(self.scale(1.0 / len))
        } else {
            None
        }
    }

    /// Counter-clockwise perpendicular.
    pub fn perp(self) -> Coord {
        Coord::new(-self.y, self.x)
    }

    pub fn dot(self, other: Coord) -> f64 {
        self.x * other.x + self.y * other.y
    }
}

pub fn centroid<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> Option<Coord> {
    let mut sum = Coord::ORIGIN;
    let mut count = 0usize;
    for coord in coords {
        sum = sum.add(*coord);
        count += 1;
    }
    (count > 0).then(|| sum.scale(1.0 / count as f64))
}

/// A length or distance as written in the exercise, e.g. `5 cm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Measure {
    pub fn new(value: f64) -> Self {
        Self { value, unit: None }
    }

    pub fn with_unit(value: f64, unit: &str) -> Self {
        let unit = unit.trim();
        Self {
            value,
            unit: (!unit.is_empty()).then(|| unit.to_string()),
        }
    }

    /// Parses `"5"`, `"5 cm"`, `"5,5cm"` or `"7.25 m"`. Returns `None` when no
    /// leading number is present.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let end = trimmed
            .char_indices()
            .find(|(idx, ch)| {
                !(ch.is_ascii_digit() || *ch == '.' || *ch == ',' || (*idx == 0 && *ch == '-'))
            })
            .map(|(idx, _)| idx)
            .unwrap_or(trimmed.len());
        let number = trimmed[..end].trim_end_matches([',', '.']).replace(',', ".");
        let value: f64 = number.parse().ok()?;
        Some(Self::with_unit(value, &trimmed[end..]))
    }

    pub fn label(&self) -> String {
        match &self.unit {
            Some(unit) => format!("{} {}", format_number(self.value), unit),
            None => format_number(self.value),
        }
    }
}

/// Formats a value with at most two decimals and no trailing zeros.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0 + 0.0;
    if (rounded - rounded.round()).abs() < 1e-9 {
        format!("{:.0}", rounded)
    } else {
        let text = format!("{:.2}", rounded);
        text.trim_end_matches('0').to_string()
    }
}

/// A segment with a known length, or a length the pupil must find when
/// `measure` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Length {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure: Option<Measure>,
}

impl Length {
    pub fn known(from: &str, to: &str, measure: Measure) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            measure: Some(measure),
        }
    }

    pub fn unknown(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            measure: None,
        }
    }

    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Angle {
    pub vertex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arms: Option<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degrees: Option<f64>,
    #[serde(default)]
    pub right: bool,
}

impl Angle {
    pub fn right(vertex: &str) -> Self {
        Self {
            vertex: vertex.to_string(),
            arms: None,
            degrees: None,
            right: true,
        }
    }

    pub fn measured(first: &str, vertex: &str, second: &str, degrees: f64) -> Self {
        Self {
            vertex: vertex.to_string(),
            arms: Some((first.to_string(), second.to_string())),
            degrees: Some(degrees),
            right: false,
        }
    }
}

/// Mirror line of an axial symmetry, in figure coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// `x = position`
    Vertical(f64),
    /// `y = position`
    Horizontal(f64),
    /// The first bisector, `y = x`.
    Oblique,
}

impl Default for Axis {
    fn default() -> Self {
        Axis::Vertical(5.0)
    }
}

impl Axis {
    pub fn reflect(self, p: Coord) -> Coord {
        match self {
            Axis::Vertical(a) => Coord::new(2.0 * a - p.x, p.y),
            Axis::Horizontal(b) => Coord::new(p.x, 2.0 * b - p.y),
            Axis::Oblique => Coord::new(p.y, p.x),
        }
    }

    /// Equation shown next to the drawn axis.
    pub fn equation(self) -> String {
        match self {
            Axis::Vertical(a) => format!("x = {}", format_number(a)),
            Axis::Horizontal(b) => format!("y = {}", format_number(b)),
            Axis::Oblique => "y = x".to_string(),
        }
    }
}

/// Name of the point `name` is the image of: `A'` is the image of `A`.
pub fn preimage_name(name: &str) -> Option<&str> {
    name.strip_suffix('\'').filter(|base| !base.is_empty())
}

/// Supported figures. Every variant carries its own optional fields; anything
/// the engine does not know is kept as `Unknown` and drawn as a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Figure {
    Triangle {
        #[serde(default)]
        equilateral: bool,
        /// Apex is the first point; the two sides from it are equal.
        #[serde(default)]
        isosceles: bool,
    },
    RightTriangle {
        right_angle: Option<String>,
    },
    Square {
        side: Option<Measure>,
    },
    Rectangle {
        width: Option<Measure>,
        height: Option<Measure>,
    },
    Circle {
        center: Option<String>,
        radius: Option<Measure>,
    },
    Thales,
    Pyramid {
        base_side: Option<Measure>,
        height: Option<Measure>,
    },
    Cylinder {
        radius: Option<Measure>,
        height: Option<Measure>,
    },
    Cube {
        side: Option<Measure>,
    },
    /// Points and their images `X'` across an axis, on a coordinate grid.
    AxialSymmetry {
        #[serde(default)]
        axis: Axis,
        #[serde(default)]
        grid: bool,
        /// Question version: images are left for the pupil to construct.
        #[serde(default)]
        hide_image: bool,
    },
    /// Points and their images `X'` through a center.
    CentralSymmetry {
        center: Option<String>,
        #[serde(default)]
        grid: bool,
        #[serde(default)]
        hide_image: bool,
    },
    /// Segment [AB] with its perpendicular bisector; a third name is the
    /// midpoint.
    PerpendicularBisector,
    Unknown {
        name: String,
    },
}

impl Figure {
    pub fn name(&self) -> &str {
        match self {
            Figure::Triangle { .. } => "triangle",
            Figure::RightTriangle { .. } => "right_triangle",
            Figure::Square { .. } => "square",
            Figure::Rectangle { .. } => "rectangle",
            Figure::Circle { .. } => "circle",
            Figure::Thales => "thales",
            Figure::Pyramid { .. } => "pyramid",
            Figure::Cylinder { .. } => "cylinder",
            Figure::Cube { .. } => "cube",
            Figure::AxialSymmetry { .. } => "axial_symmetry",
            Figure::CentralSymmetry { .. } => "central_symmetry",
            Figure::PerpendicularBisector => "perpendicular_bisector",
            Figure::Unknown { name } => name.as_str(),
        }
    }

    /// Number of named vertices the construction needs.
    pub fn vertex_count(&self) -> usize {
        match self {
            Figure::Triangle { .. } | Figure::RightTriangle { .. } => 3,
            Figure::Square { .. } | Figure::Rectangle { .. } => 4,
            Figure::Circle { .. } => 1,
            Figure::Thales | Figure::Pyramid { .. } => 5,
            Figure::Cylinder { .. } | Figure::AxialSymmetry { .. } | Figure::PerpendicularBisector => 2,
            Figure::CentralSymmetry { .. } => 3,
            Figure::Cube { .. } => 8,
            Figure::Unknown { .. } => 0,
        }
    }

    /// Whether coordinates are read on a fixed grid, so explicit
    /// coordinates are kept as given rather than fitted.
    pub fn on_grid(&self) -> bool {
        matches!(self, Figure::AxialSymmetry { .. } | Figure::CentralSymmetry { .. })
    }

    /// The same figure with the points to construct hidden. Figures without
    /// a question form are returned unchanged.
    pub fn as_question(&self) -> Figure {
        match self {
            Figure::AxialSymmetry { axis, grid, .. } => Figure::AxialSymmetry {
                axis: *axis,
                grid: *grid,
                hide_image: true,
            },
            Figure::CentralSymmetry { center, grid, .. } => Figure::CentralSymmetry {
                center: center.clone(),
                grid: *grid,
                hide_image: true,
            },
            other => other.clone(),
        }
    }

    /// Size of the closed outline formed by the first vertices, if any.
    pub fn outline_len(&self) -> Option<usize> {
        match self {
            Figure::Triangle { .. } | Figure::RightTriangle { .. } | Figure::Thales => Some(3),
            Figure::Square { .. } | Figure::Rectangle { .. } => Some(4),
            _ => None,
        }
    }
}

/// Canonical description of a figure to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(flatten)]
    pub figure: Figure,
    #[serde(default)]
    pub points: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, Coord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lengths: Vec<Length>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub angles: Vec<Angle>,
}

impl Schema {
    pub fn new(figure: Figure, points: &[&str]) -> Self {
        Self {
            figure,
            points: points.iter().map(|p| p.to_string()).collect(),
            labels: BTreeMap::new(),
            lengths: Vec::new(),
            angles: Vec::new(),
        }
    }

    pub fn with_label(mut self, name: &str, x: f64, y: f64) -> Self {
        self.labels.insert(name.to_string(), Coord::new(x, y));
        self
    }

    pub fn with_length(mut self, from: &str, to: &str, value: f64) -> Self {
        self.lengths.push(Length::known(from, to, Measure::new(value)));
        self
    }

    pub fn with_angle(mut self, angle: Angle) -> Self {
        self.angles.push(angle);
        self
    }

    /// Version handed out with the exercise statement, see
    /// [`Figure::as_question`].
    pub fn question(&self) -> Schema {
        Schema {
            figure: self.figure.as_question(),
            ..self.clone()
        }
    }

    pub fn length_between(&self, a: &str, b: &str) -> Option<&Length> {
        self.lengths.iter().find(|length| length.joins(a, b))
    }

    /// Stable textual key of the canonical form, used to share renders of
    /// identical schemas.
    pub fn canonical_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
