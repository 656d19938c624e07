//! Exercise records. The figure is rendered once, when the record is built,
//! and the render fields are read-only afterwards.

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Renderer;
use crate::error::SchemaError;
use crate::ir::Schema;
use crate::sanitize::{canonicalize, sanitize};

/// Raw exercise as handed over by the content generator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExerciseInput {
    pub statement: String,
    #[serde(default, alias = "schéma", alias = "schema_geometrique")]
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exercise {
    statement: String,
    schema: Option<Schema>,
    schema_svg: Option<String>,
    schema_img: Option<String>,
}

impl Exercise {
    /// Cleans the statement and renders the schema, taken from `schema` when
    /// given and otherwise from a fragment left in the statement text.
    pub fn generate(
        statement: &str,
        schema: Option<&Value>,
        renderer: &Renderer,
    ) -> Result<Self, SchemaError> {
        let cleaned = sanitize(statement);
        let explicit = match schema {
            Some(value) => canonicalize(value)?,
            None => None,
        };
        let schema = explicit.or(cleaned.schema);
        let (schema_svg, schema_img) = match &schema {
            Some(schema) => {
                let result = renderer.render(schema);
                let img = result.data_url();
                (Some(result.vector_markup), img)
            }
            None => (None, None),
        };
        info!(
            figure = schema.as_ref().map_or("none", |s| s.figure.name()),
            raster = schema_img.is_some();
            "exercise generated"
        );
        Ok(Self {
            statement: cleaned.text,
            schema,
            schema_svg,
            schema_img,
        })
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn schema_svg(&self) -> Option<&str> {
        self.schema_svg.as_deref()
    }

    /// PNG data URL, present when rasterization succeeded.
    pub fn schema_img(&self) -> Option<&str> {
        self.schema_img.as_deref()
    }
}

/// Builds every exercise in parallel; one malformed schema does not affect
/// the others.
pub fn generate_exercises(
    inputs: &[ExerciseInput],
    renderer: &Renderer,
) -> Vec<Result<Exercise, SchemaError>> {
    inputs
        .par_iter()
        .map(|input| Exercise::generate(&input.statement, input.schema.as_ref(), renderer))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    fn renderer() -> Renderer {
        let mut config = Config::default();
        config.raster.load_system_fonts = false;
        Renderer::new(config)
    }

    #[test]
    fn schema_is_recovered_from_the_statement() {
        let statement = "Soit ABC un triangle rectangle en B.\n\n{\"type\": \"triangle_rectangle\", \"points\": [\"A\", \"B\", \"C\"]}\n\nCalculer AC.";
        let exercise = Exercise::generate(statement, None, &renderer()).expect("exercise");
        assert_eq!(exercise.statement(), "Soit ABC un triangle rectangle en B.\n\nCalculer AC.");
        assert!(exercise.schema().is_some());
        assert!(exercise.schema_svg().is_some_and(|svg| svg.starts_with("<svg")));
    }

    #[test]
    fn explicit_schema_wins_over_the_fragment() {
        let exercise = Exercise::generate(
            "Un carré ABCD.",
            Some(&json!({ "type": "carre", "points": ["A", "B", "C", "D"] })),
            &renderer(),
        )
        .expect("exercise");
        assert_eq!(exercise.schema().map(|s| s.figure.name()), Some("square"));
    }

    #[test]
    fn no_schema_means_no_render() {
        let exercise = Exercise::generate("Calculer 3 + 4.", None, &renderer()).expect("exercise");
        assert!(exercise.schema().is_none());
        assert!(exercise.schema_svg().is_none() && exercise.schema_img().is_none());
    }

    #[test]
    fn batch_keeps_going_after_a_bad_schema() {
        let inputs = vec![
            ExerciseInput {
                statement: "A".to_string(),
                schema: Some(json!({ "type": "cube", "points": 42 })),
            },
            ExerciseInput {
                statement: "B".to_string(),
                schema: Some(json!({ "type": "cube", "points": ["A", "B", "C", "D", "E", "F", "G", "H"] })),
            },
        ];
        let results = generate_exercises(&inputs, &renderer());
        assert!(results[0].is_err());
        assert!(results[1].as_ref().is_ok_and(|e| e.schema_svg().is_some()));
    }
}
