// Label collision avoidance. Pure geometry on canvas coordinates, run after
// a figure has produced its primitives and before the SVG is composed.

use log::debug;

use super::types::{Drawing, Label, LabelKind};
use crate::config::FigureConfig;
use crate::ir::Coord;
use crate::theme::Theme;

/// `(x, y, width, height)` with `(x, y)` the top-left corner.
pub(crate) type Rect = (f64, f64, f64, f64);

pub(crate) fn font_size(kind: LabelKind, theme: &Theme) -> f64 {
    match kind {
        LabelKind::Length | LabelKind::Angle => theme.measure_font_size,
        LabelKind::Point | LabelKind::Caption | LabelKind::Placeholder => theme.font_size,
    }
}

fn char_width_factor(ch: char) -> f64 {
    match ch {
        ' ' | '.' | ',' | ':' | '(' | ')' | '[' | ']' | '\'' => 0.30,
        'i' | 'j' | 'l' | 'I' | '|' => 0.26,
        'f' | 't' | 'r' => 0.36,
        'm' | 'w' | 'M' | 'W' => 0.88,
        '°' => 0.40,
        '0'..='9' => 0.56,
        c if c.is_ascii_uppercase() => 0.68,
        _ => 0.56,
    }
}

pub(crate) fn text_width(text: &str, font_size: f64) -> f64 {
    text.chars().map(char_width_factor).sum::<f64>() * font_size
}

/// Box a label occupies when its text is centered on `label.at`.
pub(crate) fn label_box(label: &Label, theme: &Theme) -> Rect {
    let size = font_size(label.kind, theme);
    let width = text_width(&label.text, size);
    let height = size * 1.1;
    (label.at.x - width / 2.0, label.at.y - height / 2.0, width, height)
}

fn inflate_rect(rect: Rect, pad: f64) -> Rect {
    (rect.0 - pad, rect.1 - pad, rect.2 + 2.0 * pad, rect.3 + 2.0 * pad)
}

fn collides(rect: &Rect, occupied: &[Rect]) -> bool {
    for (x, y, w, h) in occupied {
        if rect.0 < x + w && rect.0 + rect.2 > *x && rect.1 < y + h && rect.1 + rect.3 > *y {
            return true;
        }
    }
    false
}

/// Liang-Barsky clip; true when any part of `a`-`b` lies inside `rect`.
fn segment_intersects_rect(a: Coord, b: Coord, rect: &Rect) -> bool {
    let (x0, y0, x1, y1) = (rect.0, rect.1, rect.0 + rect.2, rect.1 + rect.3);
    let d = b.sub(a);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [
        (-d.x, a.x - x0),
        (d.x, x1 - a.x),
        (-d.y, a.y - y0),
        (d.y, y1 - a.y),
    ] {
        if p.abs() < 1e-12 {
            if q < 0.0 {
                return false;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return false;
        }
    }
    true
}

fn hits_lines(rect: &Rect, lines: &[(Coord, Coord)]) -> bool {
    lines.iter().any(|(a, b)| segment_intersects_rect(*a, *b, rect))
}

/// Moves each label along its normal, `nudge_step` at a time, until it
/// neither crosses a drawn line nor overlaps an already placed label. A
/// label that finds no free spot keeps its preferred position.
pub(crate) fn place_labels(drawing: &mut Drawing, config: &FigureConfig, theme: &Theme) {
    let lines: Vec<(Coord, Coord)> = drawing
        .primitives
        .iter()
        .flat_map(|primitive| primitive.segments())
        .collect();
    let pad = config.collision_tolerance;
    let mut occupied: Vec<Rect> = Vec::new();

    for label in drawing.labels.iter_mut() {
        if label.kind == LabelKind::Placeholder {
            occupied.push(inflate_rect(label_box(label, theme), pad));
            continue;
        }
        let direction = label.normal.normalized().unwrap_or(Coord::new(0.0, -1.0));
        let origin = label.at;
        let free = (0..=config.max_nudges).find_map(|step| {
            let at = origin.add(direction.scale(step as f64 * config.nudge_step));
            let candidate = Label { at, ..label.clone() };
            let rect = inflate_rect(label_box(&candidate, theme), pad);
            (!hits_lines(&rect, &lines) && !collides(&rect, &occupied)).then_some((at, rect))
        });
        match free {
            Some((at, rect)) => {
                label.at = at;
                occupied.push(rect);
            }
            None => {
                debug!(label = label.text.as_str(); "no free spot, kept preferred position");
                occupied.push(inflate_rect(label_box(label, theme), pad));
            }
        }
    }
}
