use crate::figure::{Drawing, Label, LabelKind, Primitive, Stroke, font_size, label_box};
use crate::ir::Coord;
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

const HALO_PAD: f64 = 2.0;

pub fn render_svg(drawing: &Drawing, theme: &Theme) -> String {
    let (min, max) = view_bounds(drawing, theme);
    let width = max.x - min.x;
    let height = max.y - min.y;
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"{:.2} {:.2} {width:.2} {height:.2}\" data-figure=\"{}\">",
        min.x,
        min.y,
        escape_xml(&drawing.figure)
    ));
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"{}\"/>",
        min.x, min.y, theme.background
    ));

    if drawing.placeholder {
        svg.push_str("<g class=\"placeholder\" data-placeholder=\"true\">");
    }
    for primitive in &drawing.primitives {
        svg.push_str(&primitive_svg(primitive, theme));
    }
    for label in &drawing.labels {
        svg.push_str(&label_svg(label, theme));
    }
    if drawing.placeholder {
        svg.push_str("</g>");
    }
    svg.push_str("</svg>");
    svg
}

/// Bounding box of every primitive and label box, padded by the theme.
fn view_bounds(drawing: &Drawing, theme: &Theme) -> (Coord, Coord) {
    let mut points: Vec<Coord> = drawing.primitives.iter().flat_map(Primitive::extent).collect();
    for label in &drawing.labels {
        let (x, y, w, h) = label_box(label, theme);
        points.push(Coord::new(x - HALO_PAD, y - HALO_PAD));
        points.push(Coord::new(x + w + HALO_PAD, y + h + HALO_PAD));
    }
    let mut finite = points.into_iter().filter(|p| p.is_finite());
    let Some(first) = finite.next() else {
        return (Coord::ORIGIN, Coord::new(200.0, 200.0));
    };
    let (min, max) = finite.fold((first, first), |(min, max), p| {
        (
            Coord::new(min.x.min(p.x), min.y.min(p.y)),
            Coord::new(max.x.max(p.x), max.y.max(p.y)),
        )
    });
    let pad = theme.padding;
    (
        Coord::new(min.x - pad, min.y - pad),
        Coord::new(max.x + pad, max.y + pad),
    )
}

fn stroke_attrs(stroke: Stroke, theme: &Theme) -> String {
    match stroke {
        Stroke::Solid => format!(
            "stroke=\"{}\" stroke-width=\"{:.2}\"",
            theme.line_color, theme.line_width
        ),
        Stroke::Hidden => format!(
            "stroke=\"{}\" stroke-width=\"{:.2}\" stroke-dasharray=\"{}\"",
            theme.line_color,
            theme.line_width * 0.8,
            theme.hidden_dasharray
        ),
        Stroke::Highlight => format!(
            "stroke=\"{}\" stroke-width=\"{:.2}\"",
            theme.highlight_color, theme.highlight_width
        ),
        Stroke::Construction => format!(
            "stroke=\"{}\" stroke-width=\"{:.2}\" stroke-dasharray=\"4,3\"",
            theme.construction_color, theme.mark_width
        ),
        Stroke::Axis => format!(
            "stroke=\"{}\" stroke-width=\"{:.2}\" stroke-dasharray=\"8,4\"",
            theme.highlight_color, theme.highlight_width
        ),
    }
}

fn primitive_svg(primitive: &Primitive, theme: &Theme) -> String {
    match primitive {
        Primitive::Segment { from, to, stroke } => format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" {} stroke-linecap=\"round\"/>",
            from.x,
            from.y,
            to.x,
            to.y,
            stroke_attrs(*stroke, theme)
        ),
        Primitive::Polygon { points, stroke } => format!(
            "<path d=\"{} Z\" fill=\"none\" {} stroke-linejoin=\"round\"/>",
            points_to_path(points),
            stroke_attrs(*stroke, theme)
        ),
        Primitive::Circle {
            center,
            radius,
            stroke,
        } => format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"none\" {}/>",
            center.x,
            center.y,
            radius,
            stroke_attrs(*stroke, theme)
        ),
        Primitive::Ellipse {
            center,
            rx,
            ry,
            stroke,
        } => format!(
            "<ellipse cx=\"{:.2}\" cy=\"{:.2}\" rx=\"{:.2}\" ry=\"{:.2}\" fill=\"none\" {}/>",
            center.x,
            center.y,
            rx,
            ry,
            stroke_attrs(*stroke, theme)
        ),
        Primitive::Arc {
            center,
            rx,
            ry,
            start,
            sweep,
            stroke,
        } => {
            let at = |degrees: f64| {
                let rad = degrees.to_radians();
                Coord::new(center.x + rx * rad.cos(), center.y + ry * rad.sin())
            };
            let (from, to) = (at(*start), at(start + sweep));
            let large_arc = u8::from(sweep.abs() > 180.0);
            let sweep_flag = u8::from(*sweep > 0.0);
            format!(
                "<path d=\"M {:.2} {:.2} A {rx:.2} {ry:.2} 0 {large_arc} {sweep_flag} {:.2} {:.2}\" fill=\"none\" {}/>",
                from.x,
                from.y,
                to.x,
                to.y,
                stroke_attrs(*stroke, theme)
            )
        }
        Primitive::RightAngle { points } => format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            points_to_path(points),
            theme.line_color,
            theme.mark_width
        ),
        Primitive::Dot { at, radius } => format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\"/>",
            at.x, at.y, radius, theme.point_color
        ),
        Primitive::Frame {
            x,
            y,
            width,
            height,
        } => format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" rx=\"8\" ry=\"8\" fill=\"{}\" stroke=\"{}\" stroke-dasharray=\"6 4\" stroke-width=\"1.2\"/>",
            theme.placeholder_fill, theme.placeholder_border
        ),
        Primitive::Grid {
            origin,
            cell,
            columns,
            rows,
        } => grid_svg(*origin, *cell, *columns, *rows, theme),
    }
}

fn grid_svg(origin: Coord, cell: f64, columns: usize, rows: usize, theme: &Theme) -> String {
    let (right, bottom) = (origin.x + cell * columns as f64, origin.y + cell * rows as f64);
    let mut out = format!(
        "<g class=\"grid\" stroke=\"{}\" stroke-width=\"0.5\">",
        theme.grid_color
    );
    for i in 0..=columns {
        let x = origin.x + cell * i as f64;
        out.push_str(&format!(
            "<line x1=\"{x:.2}\" y1=\"{:.2}\" x2=\"{x:.2}\" y2=\"{bottom:.2}\"/>",
            origin.y
        ));
    }
    for i in 0..=rows {
        let y = origin.y + cell * i as f64;
        out.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{y:.2}\" x2=\"{right:.2}\" y2=\"{y:.2}\"/>",
            origin.x
        ));
    }
    out.push_str("</g>");
    out
}

fn label_svg(label: &Label, theme: &Theme) -> String {
    let size = font_size(label.kind, theme);
    let mut out = String::new();
    let (class, fill) = match label.kind {
        LabelKind::Point => ("point-label", theme.text_color.as_str()),
        LabelKind::Length => ("measure", theme.text_color.as_str()),
        LabelKind::Angle => ("angle-label", theme.text_color.as_str()),
        LabelKind::Caption => ("caption", theme.text_color.as_str()),
        LabelKind::Placeholder => ("placeholder-text", theme.placeholder_text.as_str()),
    };
    if label.kind == LabelKind::Length {
        let (x, y, w, h) = label_box(label, theme);
        out.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" fill-opacity=\"0.8\"/>",
            x - HALO_PAD,
            y - HALO_PAD,
            w + 2.0 * HALO_PAD,
            h + 2.0 * HALO_PAD,
            theme.label_background
        ));
    }
    let data = match &label.endpoints {
        Some((from, to)) => format!(
            " data-from=\"{}\" data-to=\"{}\"",
            escape_xml(from),
            escape_xml(to)
        ),
        None => String::new(),
    };
    let weight = if label.kind == LabelKind::Point {
        " font-weight=\"bold\""
    } else {
        ""
    };
    // Baseline sits a third of the size below the box center.
    out.push_str(&format!(
        "<text class=\"{class}\"{data} x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{size:.2}\"{weight} fill=\"{fill}\">{}</text>",
        label.at.x,
        label.at.y + size * 0.35,
        escape_xml(&theme.font_family),
        escape_xml(&label.text)
    ));
    out
}

fn points_to_path(points: &[Coord]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].x, points[0].y));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.x, point.y));
    }
    d
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
