use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f64,
    pub measure_font_size: f64,
    pub line_color: String,
    pub line_width: f64,
    pub highlight_color: String,
    pub highlight_width: f64,
    pub construction_color: String,
    pub grid_color: String,
    pub hidden_dasharray: String,
    pub mark_width: f64,
    pub point_color: String,
    pub text_color: String,
    pub label_background: String,
    pub background: String,
    pub placeholder_fill: String,
    pub placeholder_border: String,
    pub placeholder_text: String,
    pub padding: f64,
}

impl Theme {
    /// Black strokes with the orange construction accent used on worksheets.
    pub fn classic() -> Self {
        Self {
            font_family: "Arial, sans-serif".to_string(),
            font_size: 14.0,
            measure_font_size: 12.0,
            line_color: "#000000".to_string(),
            line_width: 1.5,
            highlight_color: "#FF6600".to_string(),
            highlight_width: 2.0,
            construction_color: "#666666".to_string(),
            grid_color: "#E8E8E8".to_string(),
            hidden_dasharray: "5,4".to_string(),
            mark_width: 1.0,
            point_color: "#000000".to_string(),
            text_color: "#000000".to_string(),
            label_background: "#FFFFFF".to_string(),
            background: "#FFFFFF".to_string(),
            placeholder_fill: "#F8FAFC".to_string(),
            placeholder_border: "#E2E8F0".to_string(),
            placeholder_text: "#64748B".to_string(),
            padding: 12.0,
        }
    }

    /// Monochrome variant for photocopied handouts.
    pub fn print() -> Self {
        Self {
            font_family: "\"Times New Roman\", serif".to_string(),
            font_size: 15.0,
            measure_font_size: 13.0,
            line_width: 1.8,
            highlight_color: "#000000".to_string(),
            highlight_width: 2.4,
            construction_color: "#444444".to_string(),
            grid_color: "#CCCCCC".to_string(),
            placeholder_fill: "#FFFFFF".to_string(),
            placeholder_border: "#000000".to_string(),
            placeholder_text: "#000000".to_string(),
            ..Self::classic()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "classic" | "default" => Some(Self::classic()),
            "print" | "mono" => Some(Self::print()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
