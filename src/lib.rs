//! Deterministic renderer for classroom geometry figures.
//!
//! A [`Schema`] goes through four stages: the resolver builds a total
//! coordinate map, a figure renderer turns it into a [`Drawing`], the
//! composer writes SVG and the rasterizer derives a PNG from that exact SVG.
//! Nothing in the pipeline fails for a well-typed schema; irregular input is
//! reported as [`Degradation`]s and rendered with a deterministic fallback.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod exercise;
pub mod figure;
pub mod ir;
pub mod raster;
pub mod render;
pub mod resolve;
pub mod sanitize;
pub mod theme;

use std::collections::HashMap;

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "cli")]
pub use cli::{Args, run};
pub use config::{Config, FigureConfig, RasterConfig, load_config, parse_config};
pub use error::{Degradation, RasterError, SchemaError};
pub use exercise::{Exercise, generate_exercises};
pub use figure::Drawing;
pub use ir::{Angle, Axis, Coord, Figure, Length, Measure, Schema};
pub use sanitize::{Sanitized, canonicalize, sanitize};
pub use theme::Theme;

/// Vector markup for print and, when rasterization succeeded, the PNG as
/// base64 for inline display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResult {
    pub vector_markup: String,
    pub raster_base64: Option<String>,
}

impl RenderResult {
    pub fn data_url(&self) -> Option<String> {
        self.raster_base64
            .as_ref()
            .map(|b64| format!("data:image/png;base64,{b64}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub result: RenderResult,
    pub degradations: Vec<Degradation>,
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: Config,
}

impl Renderer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn render(&self, schema: &Schema) -> RenderResult {
        self.render_with_report(schema).result
    }

    pub fn render_with_report(&self, schema: &Schema) -> RenderReport {
        let resolution = resolve::resolve(schema, &self.config.figure);
        let mut degradations = resolution.degradations;
        if let Figure::Unknown { name } = &resolution.figure.figure {
            Degradation::UnsupportedFigure(name.clone()).report(&mut degradations);
        }

        let drawing = figure::draw(&resolution.figure, &self.config.figure, &self.config.theme);
        let vector_markup = render::render_svg(&drawing, &self.config.theme);
        let raster_base64 = match raster::rasterize_png(&vector_markup, &self.config.raster) {
            Ok(png) => Some(raster::encode_base64(&png)),
            Err(RasterError::Unsupported) => {
                debug!("PNG support not compiled in, raster omitted");
                None
            }
            Err(err) => {
                Degradation::RasterFailed(err.to_string()).report(&mut degradations);
                None
            }
        };
        debug!(
            figure = drawing.figure.as_str(),
            degradations = degradations.len();
            "rendered schema"
        );
        RenderReport {
            result: RenderResult {
                vector_markup,
                raster_base64,
            },
            degradations,
        }
    }

    /// Renders the statement version, with symmetric images left out, and
    /// the full correction.
    pub fn render_question_and_correction(&self, schema: &Schema) -> (RenderResult, RenderResult) {
        rayon::join(|| self.render(&schema.question()), || self.render(schema))
    }

    /// Renders every schema in parallel. Schemas with the same canonical form
    /// are rendered once and share the result.
    pub fn render_batch(&self, schemas: &[Schema]) -> Vec<RenderResult> {
        let mut slot_of: HashMap<String, usize> = HashMap::new();
        let mut unique: Vec<&Schema> = Vec::new();
        let slots: Vec<usize> = schemas
            .iter()
            .map(|schema| {
                *slot_of.entry(schema.canonical_key()).or_insert_with(|| {
                    unique.push(schema);
                    unique.len() - 1
                })
            })
            .collect();
        debug!(total = schemas.len(), unique = unique.len(); "rendering batch");
        let rendered: Vec<RenderResult> = unique.par_iter().map(|schema| self.render(schema)).collect();
        slots.into_iter().map(|slot| rendered[slot].clone()).collect()
    }
}

/// Renders with the default configuration.
pub fn render(schema: &Schema) -> RenderResult {
    Renderer::default().render(schema)
}

/// Canonicalizes a raw JSON value and renders it. Only values whose fields
/// have the wrong JSON types are rejected.
pub fn render_value(value: &Value) -> Result<RenderResult, SchemaError> {
    match canonicalize(value)? {
        Some(schema) => Ok(render(&schema)),
        None => Err(SchemaError::NotAnObject { found: "null" }),
    }
}
