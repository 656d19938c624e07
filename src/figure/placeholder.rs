use super::types::{Drawing, Label, LabelKind, Primitive};
use crate::config::FigureConfig;
use crate::ir::Coord;

/// Framed notice drawn in place of a figure the engine cannot construct.
pub(crate) fn draw(name: &str, config: &FigureConfig) -> Drawing {
    let (w, h, m) = (config.canvas_width, config.canvas_height, config.margin);
    let center = Coord::new(w / 2.0, h / 2.0);
    let notice = |text: String, at: Coord, kind: LabelKind| Label {
        text,
        at,
        kind,
        normal: Coord::new(0.0, 1.0),
        endpoints: None,
    };
    Drawing {
        figure: name.to_string(),
        primitives: vec![Primitive::Frame {
            x: m,
            y: m,
            width: (w - 2.0 * m).max(1.0),
            height: (h - 2.0 * m).max(1.0),
        }],
        labels: vec![
            notice(config.placeholder_message.clone(), center, LabelKind::Placeholder),
            notice(
                format!("({name})"),
                Coord::new(center.x, center.y + 24.0),
                LabelKind::Placeholder,
            ),
        ],
        placeholder: true,
    }
}
