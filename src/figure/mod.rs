//! Figure renderers. Each figure family turns a resolved figure into a
//! [`Drawing`] in canvas space; label collision avoidance runs last.

mod circle;
mod label_placement;
mod placeholder;
mod quadrilateral;
mod sketch;
mod solid;
mod symmetry;
mod triangle;
pub mod types;

use log::debug;

use crate::config::FigureConfig;
use crate::ir::Figure;
use crate::resolve::ResolvedFigure;
use crate::theme::Theme;

pub(crate) use label_placement::{font_size, label_box};
pub use sketch::Viewport;
pub use types::{Drawing, Label, LabelKind, Primitive, Stroke};

pub fn draw(resolved: &ResolvedFigure, config: &FigureConfig, theme: &Theme) -> Drawing {
    let mut drawing = match &resolved.figure {
        Figure::Triangle { .. } | Figure::RightTriangle { .. } => triangle::draw(resolved, config),
        Figure::Thales => triangle::draw_thales(resolved, config),
        Figure::Square { .. } | Figure::Rectangle { .. } => quadrilateral::draw(resolved, config),
        Figure::Circle { .. } => circle::draw(resolved, config),
        Figure::Pyramid { .. } => solid::draw_pyramid(resolved, config),
        Figure::Cylinder { .. } => solid::draw_cylinder(resolved, config),
        Figure::Cube { .. } => solid::draw_cube(resolved, config),
        Figure::AxialSymmetry {
            axis,
            grid,
            hide_image,
        } => symmetry::draw_axial(resolved, config, *axis, *grid, *hide_image),
        Figure::CentralSymmetry {
            grid, hide_image, ..
        } => symmetry::draw_central(resolved, config, *grid, *hide_image),
        Figure::PerpendicularBisector => symmetry::draw_bisector(resolved, config),
        Figure::Unknown { name } => placeholder::draw(name, config),
    };
    label_placement::place_labels(&mut drawing, config, theme);
    debug!(
        figure = drawing.figure.as_str(),
        primitives = drawing.primitives.len(),
        labels = drawing.labels.len();
        "figure drawn"
    );
    drawing
}
