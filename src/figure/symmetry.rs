use super::sketch::Sketch;
use super::types::{Drawing, Primitive, Stroke};
use crate::config::FigureConfig;
use crate::ir::{Axis, Coord, preimage_name};
use crate::resolve::ResolvedFigure;

const TICK: f64 = 5.0;

/// Square piece of the integer lattice that frames a symmetry figure. It
/// always covers `0..grid_size` and grows in whole units to reach every
/// point; the step widens so no more than `max_grid_cells` cells are drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Lattice {
    lo: f64,
    hi: f64,
    step: f64,
}

impl Lattice {
    fn around(resolved: &ResolvedFigure, config: &FigureConfig) -> Self {
        let (mut min, mut max) = (0.0_f64, config.grid_size);
        for p in resolved
            .vertices
            .iter()
            .map(|v| v.at)
            .chain(resolved.anchors.center)
            .filter(|p| p.is_finite())
        {
            min = min.min((p.x.min(p.y) - 1.0).floor());
            max = max.max((p.x.max(p.y) + 1.0).ceil());
        }
        let step = ((max - min) / config.max_grid_cells.max(1) as f64).ceil().max(1.0);
        Self {
            lo: min,
            hi: min + step * ((max - min) / step).ceil(),
            step,
        }
    }

    fn corners(&self) -> [Coord; 2] {
        [Coord::new(self.lo, self.lo), Coord::new(self.hi, self.hi)]
    }

    fn cells(&self) -> usize {
        let cells = ((self.hi - self.lo) / self.step).round();
        if cells.is_finite() { cells as usize } else { 0 }
    }

    fn grid(&self, sketch: &Sketch) -> Primitive {
        let cells = self.cells();
        Primitive::Grid {
            origin: sketch.map(Coord::new(self.lo, self.hi)),
            cell: sketch.view.length(self.step),
            columns: cells,
            rows: cells,
        }
    }

    /// Stretch of the axis inside the frame, lower end first.
    fn clip(&self, axis: Axis) -> (Coord, Coord) {
        match axis {
            Axis::Vertical(a) => (Coord::new(a, self.lo), Coord::new(a, self.hi)),
            Axis::Horizontal(b) => (Coord::new(self.lo, b), Coord::new(self.hi, b)),
            Axis::Oblique => (Coord::new(self.lo, self.lo), Coord::new(self.hi, self.hi)),
        }
    }
}

/// `(original, image)` index pairs where the image is named after its
/// original with a prime, sorted by original.
fn image_pairs(resolved: &ResolvedFigure, first: usize) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize)> = resolved
        .vertices
        .iter()
        .enumerate()
        .skip(first)
        .filter_map(|(idx, vertex)| {
            let origin = resolved.index_of(preimage_name(&vertex.name)?)?;
            (origin >= first && origin != idx).then_some((origin, idx))
        })
        .collect();
    pairs.sort_unstable();
    pairs
}

/// Three or more pairs read as a polygon and its image; fewer are joined
/// point to point.
fn draw_polygons(sketch: &mut Sketch, pairs: &[(usize, usize)], hide_image: bool) {
    let originals: Vec<usize> = pairs.iter().map(|&(origin, _)| origin).collect();
    sketch.outline(&originals, Stroke::Solid);
    if !hide_image {
        let images: Vec<usize> = pairs.iter().map(|&(_, image)| image).collect();
        sketch.outline(&images, Stroke::Hidden);
    }
}

/// Reflection across `axis` on the lattice. Images are dashed, or left out
/// entirely for the question version of the exercise.
pub(crate) fn draw_axial(
    resolved: &ResolvedFigure,
    config: &FigureConfig,
    axis: Axis,
    grid: bool,
    hide_image: bool,
) -> Drawing {
    let lattice = Lattice::around(resolved, config);
    let mut sketch = Sketch::new(resolved, config, &lattice.corners());
    if grid {
        let primitive = lattice.grid(&sketch);
        sketch.push(primitive);
    }

    let (low, high) = lattice.clip(axis);
    let (from, to) = (sketch.map(low), sketch.map(high));
    sketch.push(Primitive::Segment {
        from,
        to,
        stroke: Stroke::Axis,
    });
    sketch.caption(axis.equation(), to.add(Coord::new(0.0, -14.0)));

    let pairs = image_pairs(resolved, 0);
    if hide_image {
        for &(_, image) in &pairs {
            sketch.conceal(image);
        }
    }
    if pairs.len() >= 3 {
        draw_polygons(&mut sketch, &pairs, hide_image);
    } else if !hide_image {
        let radius = config.point_radius * 0.6;
        for &(origin, image) in &pairs {
            sketch.edge(origin, image, Stroke::Construction);
            let at = sketch.pt(origin).midpoint(sketch.pt(image));
            sketch.push(Primitive::Dot { at, radius });
        }
    }
    sketch.decorate();
    sketch.finish()
}

/// Point reflection through the first point, marked with a cross.
pub(crate) fn draw_central(
    resolved: &ResolvedFigure,
    config: &FigureConfig,
    grid: bool,
    hide_image: bool,
) -> Drawing {
    let center = 0;
    let lattice = Lattice::around(resolved, config);
    let mut sketch = Sketch::new(resolved, config, &lattice.corners());
    if grid {
        let primitive = lattice.grid(&sketch);
        sketch.push(primitive);
    }

    let pairs = image_pairs(resolved, 1);
    if hide_image {
        for &(_, image) in &pairs {
            sketch.conceal(image);
        }
    }
    if pairs.len() >= 3 {
        draw_polygons(&mut sketch, &pairs, hide_image);
    } else {
        for &(origin, image) in &pairs {
            sketch.edge(origin, center, Stroke::Construction);
            if !hide_image {
                sketch.edge(center, image, Stroke::Construction);
            }
        }
    }

    let c = sketch.pt(center);
    let arm = config.point_radius * 2.5;
    for (dx, dy) in [(1.0, 1.0), (1.0, -1.0)] {
        let reach = Coord::new(dx * arm, dy * arm);
        sketch.push(Primitive::Segment {
            from: c.sub(reach),
            to: c.add(reach),
            stroke: Stroke::Highlight,
        });
    }
    sketch.decorate();
    sketch.finish()
}

/// Segment [AB] with its perpendicular bisector through the midpoint,
/// a right-angle mark and equal-length ticks on both halves.
pub(crate) fn draw_bisector(resolved: &ResolvedFigure, config: &FigureConfig) -> Drawing {
    let (a, b) = (resolved.at(0), resolved.at(1));
    let middle = resolved.anchors.center.unwrap_or(a.midpoint(b));
    let across = b.sub(a).normalized().unwrap_or(Coord::new(1.0, 0.0)).perp();
    let reach = (a.distance(b) * 0.6).max(config.default_length * 0.1);
    let ends = [middle.sub(across.scale(reach)), middle.add(across.scale(reach))];
    let mut sketch = Sketch::new(resolved, config, &ends);

    sketch.edge(0, 1, Stroke::Solid);
    let (m, top) = (sketch.map(middle), sketch.map(ends[1]));
    sketch.push(Primitive::Segment {
        from: sketch.map(ends[0]),
        to: top,
        stroke: Stroke::Highlight,
    });

    let (pa, pb) = (sketch.pt(0), sketch.pt(1));
    if let (Some(u1), Some(u2)) = (pb.sub(m).normalized(), top.sub(m).normalized()) {
        let size = config.right_angle_size;
        sketch.push(Primitive::RightAngle {
            points: [
                m.add(u1.scale(size)),
                m.add(u1.add(u2).scale(size)),
                m.add(u2.scale(size)),
            ],
        });
        if sketch.has(2) {
            sketch.lean(2, u1.add(u2).scale(-1.0));
        }
    }
    for (from, to) in [(pa, m), (m, pb)] {
        if let Some(dir) = to.sub(from).normalized() {
            let (at, n) = (from.midpoint(to), dir.perp().scale(TICK));
            sketch.push(Primitive::Segment {
                from: at.sub(n),
                to: at.add(n),
                stroke: Stroke::Solid,
            });
        }
    }

    if sketch.has(2) {
        sketch.link(0, 2);
        sketch.link(1, 2);
    } else {
        sketch.push(Primitive::Dot {
            at: m,
            radius: config.point_radius,
        });
    }
    sketch.decorate();
    sketch.finish()
}
