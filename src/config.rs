use crate::theme::Theme;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Geometry and layout constants for figure construction and drawing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FigureConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub margin: f64,
    /// Side used when an exercise gives no length at all.
    pub default_length: f64,
    /// Width over height of a rectangle with unknown sides.
    pub default_aspect: f64,
    /// Vertical leg over horizontal leg of a right triangle with unknown legs.
    pub default_leg_ratio: f64,
    /// Included angle assumed when two sides of a triangle are known but
    /// the angle between them is not.
    pub default_angle: f64,
    pub thales_ratio: f64,
    pub oblique_angle: f64,
    pub oblique_depth: f64,
    pub ellipse_ratio: f64,
    pub solid_height_ratio: f64,
    pub point_radius: f64,
    pub label_offset: f64,
    pub measure_offset: f64,
    pub angle_arc_radius: f64,
    pub right_angle_size: f64,
    pub collision_tolerance: f64,
    pub nudge_step: f64,
    pub max_nudges: usize,
    pub fallback_radius_ratio: f64,
    /// Smallest extent of the coordinate grid behind a symmetry.
    pub grid_size: f64,
    pub max_grid_cells: usize,
    pub max_points: usize,
    pub max_lengths: usize,
    pub max_angles: usize,
    pub max_coordinate: f64,
    pub max_measure: f64,
    pub placeholder_message: String,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            canvas_width: 400.0,
            canvas_height: 300.0,
            margin: 40.0,
            default_length: 4.0,
            default_aspect: 1.5,
            default_leg_ratio: 0.75,
            default_angle: 60.0,
            thales_ratio: 0.4,
            oblique_angle: 45.0,
            oblique_depth: 0.5,
            ellipse_ratio: 0.3,
            solid_height_ratio: 1.2,
            point_radius: 3.0,
            label_offset: 14.0,
            measure_offset: 16.0,
            angle_arc_radius: 20.0,
            right_angle_size: 10.0,
            collision_tolerance: 2.0,
            nudge_step: 4.0,
            max_nudges: 8,
            fallback_radius_ratio: 0.35,
            grid_size: 14.0,
            max_grid_cells: 40,
            max_points: 26,
            max_lengths: 32,
            max_angles: 32,
            max_coordinate: 1.0e6,
            max_measure: 1.0e6,
            placeholder_message: "Figure unavailable".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterConfig {
    pub scale: f32,
    pub max_dimension: u32,
    pub font_family: String,
    pub load_system_fonts: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            max_dimension: 4096,
            font_family: "Arial".to_string(),
            load_system_fonts: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub figure: FigureConfig,
    pub raster: RasterConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    figure: Option<FigureConfigFile>,
    raster: Option<RasterConfigFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f64>,
    measure_font_size: Option<f64>,
    line_color: Option<String>,
    line_width: Option<f64>,
    highlight_color: Option<String>,
    text_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FigureConfigFile {
    canvas_width: Option<f64>,
    canvas_height: Option<f64>,
    margin: Option<f64>,
    default_length: Option<f64>,
    label_offset: Option<f64>,
    measure_offset: Option<f64>,
    nudge_step: Option<f64>,
    max_nudges: Option<usize>,
    grid_size: Option<f64>,
    max_points: Option<usize>,
    max_lengths: Option<usize>,
    max_angles: Option<usize>,
    placeholder_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RasterConfigFile {
    scale: Option<f32>,
    max_dimension: Option<u32>,
    font_family: Option<String>,
    load_system_fonts: Option<bool>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    info!(path = path.display().to_string(); "Loading configuration");
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("Unknown theme `{theme_name}`"))?;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.measure_font_size {
            config.theme.measure_font_size = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.line_width {
            config.theme.line_width = v;
        }
        if let Some(v) = vars.highlight_color {
            config.theme.highlight_color = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }

    if let Some(figure) = parsed.figure {
        if let Some(v) = figure.canvas_width {
            config.figure.canvas_width = v;
        }
        if let Some(v) = figure.canvas_height {
            config.figure.canvas_height = v;
        }
        if let Some(v) = figure.margin {
            config.figure.margin = v;
        }
        if let Some(v) = figure.default_length {
            config.figure.default_length = v;
        }
        if let Some(v) = figure.label_offset {
            config.figure.label_offset = v;
        }
        if let Some(v) = figure.measure_offset {
            config.figure.measure_offset = v;
        }
        if let Some(v) = figure.nudge_step {
            config.figure.nudge_step = v;
        }
        if let Some(v) = figure.max_nudges {
            config.figure.max_nudges = v;
        }
        if let Some(v) = figure.grid_size {
            config.figure.grid_size = v;
        }
        if let Some(v) = figure.max_points {
            config.figure.max_points = v;
        }
        if let Some(v) = figure.max_lengths {
            config.figure.max_lengths = v;
        }
        if let Some(v) = figure.max_angles {
            config.figure.max_angles = v;
        }
        if let Some(v) = figure.placeholder_message {
            config.figure.placeholder_message = v;
        }
    }

    if let Some(raster) = parsed.raster {
        if let Some(v) = raster.scale {
            config.raster.scale = v;
        }
        if let Some(v) = raster.max_dimension {
            config.raster.max_dimension = v;
        }
        if let Some(v) = raster.font_family {
            config.raster.font_family = v;
        }
        if let Some(v) = raster.load_system_fonts {
            config.raster.load_system_fonts = v;
        }
    }

    sanitize_limits(&mut config);
    Ok(config)
}

fn sanitize_limits(config: &mut Config) {
    let figure = &mut config.figure;
    figure.canvas_width = figure.canvas_width.clamp(50.0, 4000.0);
    figure.canvas_height = figure.canvas_height.clamp(50.0, 4000.0);
    figure.margin = figure
        .margin
        .clamp(0.0, figure.canvas_width.min(figure.canvas_height) / 3.0);
    if !(figure.default_length.is_finite() && figure.default_length > 0.0) {
        figure.default_length = FigureConfig::default().default_length;
    }
    figure.max_nudges = figure.max_nudges.min(64);
    figure.max_points = figure.max_points.clamp(1, 256);
    figure.max_lengths = figure.max_lengths.min(256);
    figure.max_angles = figure.max_angles.min(256);
    if !(figure.grid_size.is_finite() && figure.grid_size > 0.0) {
        figure.grid_size = FigureConfig::default().grid_size;
    }
    figure.grid_size = figure.grid_size.min(1000.0);
    if !(config.raster.scale.is_finite() && config.raster.scale > 0.0) {
        config.raster.scale = RasterConfig::default().scale;
    }
}
