use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use geometry_schema_renderer::{Config, RenderResult, Renderer, canonicalize};
use serde_json::Value;

fn renderer() -> Renderer {
    let mut config = Config::default();
    config.raster.load_system_fonts = false;
    Renderer::new(config)
}

fn assert_valid_svg(svg: &str, fixture: &str) {
    assert!(svg.starts_with("<svg"), "{fixture}: missing <svg tag");
    assert!(svg.ends_with("</svg>"), "{fixture}: missing </svg tag");
    assert!(!svg.contains("NaN"), "{fixture}: non-finite number in markup");
}

fn load_fixture(rel: &str) -> Value {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(rel);
    assert!(path.exists(), "fixture missing: {}", rel);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    serde_json::from_str(&input).expect("fixture is not JSON")
}

fn render_fixture(rel: &str) -> RenderResult {
    let schema = canonicalize(&load_fixture(rel))
        .expect("fixture has valid field types")
        .expect("fixture holds a schema");
    renderer().render(&schema)
}

fn svg_attr(svg: &str, name: &str) -> f64 {
    let marker = format!(" {name}=\"");
    let start = svg.find(&marker).expect("attribute present") + marker.len();
    let end = start + svg[start..].find('"').expect("closing quote");
    svg[start..end].parse().expect("numeric attribute")
}

#[test]
fn render_all_fixtures() {
    // Keep this list explicit so new fixtures must be added intentionally.
    let fixtures = [
        "axial_symmetry.json",
        "axial_symmetry_triangle.json",
        "central_symmetry.json",
        "circle.json",
        "coordinates.json",
        "cube.json",
        "cylinder.json",
        "dodecahedron.json",
        "equilateral.json",
        "legacy_wrapper.json",
        "missing_coordinate.json",
        "perpendicular_bisector.json",
        "pyramid.json",
        "rectangle.json",
        "right_triangle.json",
        "right_triangle_to_compute.json",
        "square.json",
        "thales.json",
        "triangle_angle.json",
        "triangle_sides.json",
    ];

    for rel in fixtures {
        let result = render_fixture(rel);
        assert_valid_svg(&result.vector_markup, rel);
        if cfg!(feature = "png") {
            assert!(result.raster_base64.is_some(), "{rel}: raster missing");
        }
    }
}

#[test]
fn rendering_is_deterministic() {
    for rel in ["thales.json", "cylinder.json", "missing_coordinate.json"] {
        assert_eq!(render_fixture(rel), render_fixture(rel), "{rel}");
    }
}

#[test]
fn right_triangle_shows_pythagorean_hypotenuse() {
    let svg = render_fixture("right_triangle.json").vector_markup;
    assert!(svg.contains("data-from=\"A\" data-to=\"C\""));
    assert!(svg.contains(">5 cm</text>"));

    let svg = render_fixture("legacy_wrapper.json").vector_markup;
    assert!(svg.contains(">13</text>"));
}

#[test]
fn length_to_compute_is_a_question_mark() {
    let svg = render_fixture("right_triangle_to_compute.json").vector_markup;
    assert!(svg.contains("data-from=\"F\" data-to=\"G\""));
    assert!(svg.contains(">?</text>"));
    assert!(!svg.contains(">10</text>"));
}

#[test]
fn unsupported_figure_renders_placeholder() {
    let result = render_fixture("dodecahedron.json");
    assert!(result.vector_markup.contains("data-placeholder=\"true\""));
    assert!(result.vector_markup.contains("Figure unavailable"));
    if cfg!(feature = "png") {
        assert!(result.data_url().is_some_and(|url| url.starts_with("data:image/png;base64,")));
    }
}

#[test]
fn missing_coordinate_is_synthesized() {
    let schema = canonicalize(&load_fixture("missing_coordinate.json"))
        .expect("valid")
        .expect("schema");
    let report = renderer().render_with_report(&schema);
    assert!(report.degradations.iter().any(|d| d.kind() == "synthesized_points"));
    assert!(report.result.vector_markup.contains(">H</text>"));
}

#[test]
fn flat_coordinates_place_the_symmetric_point() {
    let schema = canonicalize(&load_fixture("axial_symmetry.json"))
        .expect("valid")
        .expect("schema");
    assert_eq!(schema.labels.len(), 2);
    let report = renderer().render_with_report(&schema);
    assert!(
        report.degradations.iter().all(|d| d.kind() == "raster_failed"),
        "{:?}",
        report.degradations
    );
    let svg = report.result.vector_markup;
    assert!(svg.contains("data-figure=\"axial_symmetry\""));
    assert!(svg.contains("class=\"grid\""));
    assert!(svg.contains(">y = 4</text>"));
    assert!(svg.contains(">A&apos;</text>"));
}

#[test]
fn symmetric_triangle_question_hides_the_image() {
    let schema = canonicalize(&load_fixture("axial_symmetry_triangle.json"))
        .expect("valid")
        .expect("schema");
    let (question, correction) = renderer().render_question_and_correction(&schema);
    for svg in [&question.vector_markup, &correction.vector_markup] {
        assert!(svg.contains(">x = 7</text>"));
        assert!(svg.contains(">C</text>"));
    }
    assert!(!question.vector_markup.contains(">C&apos;</text>"));
    assert!(correction.vector_markup.contains(">C&apos;</text>"));
    assert!(correction.vector_markup.contains("stroke-dasharray=\"5,4\""));
}

#[test]
fn central_symmetry_is_on_a_grid_by_default() {
    let svg = render_fixture("central_symmetry.json").vector_markup;
    assert!(svg.contains("data-figure=\"central_symmetry\""));
    assert!(svg.contains("class=\"grid\""));
    assert!(svg.contains(">O</text>"));
    assert!(svg.contains(">B&apos;</text>"));
}

#[test]
fn bisector_keeps_the_segment_length() {
    let svg = render_fixture("perpendicular_bisector.json").vector_markup;
    assert!(svg.contains("data-figure=\"perpendicular_bisector\""));
    assert!(svg.contains("data-from=\"A\" data-to=\"B\""));
    assert!(svg.contains(">8 cm</text>"));
    assert!(svg.contains(">I</text>"));
}

#[cfg(feature = "png")]
#[test]
fn raster_is_derived_from_the_markup() {
    let result = render_fixture("rectangle.json");
    let png = STANDARD
        .decode(result.raster_base64.as_deref().expect("raster"))
        .expect("valid base64");
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
    let scale = f64::from(Config::default().raster.scale);
    let svg_width = svg_attr(&result.vector_markup, "width");
    let svg_height = svg_attr(&result.vector_markup, "height");
    assert!((f64::from(width) - svg_width * scale).abs() <= 2.0);
    assert!((f64::from(height) - svg_height * scale).abs() <= 2.0);
}

mod proptest_tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;

    use geometry_schema_renderer::resolve::resolve;
    use geometry_schema_renderer::{Angle, Axis, Config, Figure, Length, Measure, Renderer, Schema};

    /// Finite, negative, zero, huge and non-finite values alike.
    fn value_strategy() -> impl Strategy<Value = f64> + Clone {
        prop_oneof![
            4 => 0.5f64..50.0,
            1 => -5.0f64..0.5,
            1 => prop_oneof![
                Just(0.0),
                Just(1e12),
                Just(f64::MAX),
                Just(f64::NAN),
                Just(f64::INFINITY),
                Just(f64::NEG_INFINITY),
            ],
        ]
    }

    fn measure_strategy() -> impl Strategy<Value = Option<Measure>> + Clone {
        prop::option::of(value_strategy().prop_map(Measure::new))
    }

    fn axis_strategy() -> impl Strategy<Value = Axis> {
        prop_oneof![
            value_strategy().prop_map(Axis::Vertical),
            value_strategy().prop_map(Axis::Horizontal),
            Just(Axis::Oblique),
        ]
    }

    fn figure_strategy() -> impl Strategy<Value = Figure> {
        let measure = measure_strategy();
        let name = prop::option::of("[A-H]'?");
        prop_oneof![
            (any::<bool>(), any::<bool>()).prop_map(|(equilateral, isosceles)| Figure::Triangle {
                equilateral,
                isosceles
            }),
            name.clone().prop_map(|right_angle| Figure::RightTriangle { right_angle }),
            measure.clone().prop_map(|side| Figure::Square { side }),
            (measure.clone(), measure.clone()).prop_map(|(width, height)| Figure::Rectangle { width, height }),
            (name.clone(), measure.clone()).prop_map(|(center, radius)| Figure::Circle { center, radius }),
            Just(Figure::Thales),
            (measure.clone(), measure.clone()).prop_map(|(base_side, height)| Figure::Pyramid { base_side, height }),
            (measure.clone(), measure.clone()).prop_map(|(radius, height)| Figure::Cylinder { radius, height }),
            measure.prop_map(|side| Figure::Cube { side }),
            (axis_strategy(), any::<bool>(), any::<bool>()).prop_map(|(axis, grid, hide_image)| {
                Figure::AxialSymmetry {
                    axis,
                    grid,
                    hide_image,
                }
            }),
            (name, any::<bool>(), any::<bool>()).prop_map(|(center, grid, hide_image)| {
                Figure::CentralSymmetry {
                    center,
                    grid,
                    hide_image,
                }
            }),
            Just(Figure::PerpendicularBisector),
            "[a-z]{1,12}".prop_map(|name| Figure::Unknown { name }),
        ]
    }

    fn schema_strategy() -> impl Strategy<Value = Schema> {
        (
            figure_strategy(),
            prop::collection::vec("[A-H]'?| ?[A-H] ", 0..12),
            prop::collection::vec(("[A-H]'?", value_strategy(), value_strategy()), 0..6),
            prop::collection::vec(("[A-H]", "[A-H]", prop::option::of(value_strategy())), 0..4),
            prop::collection::vec(("[A-H]", "[A-H]", "[A-H]", prop::option::of(value_strategy())), 0..4),
        )
            .prop_map(|(figure, points, labels, lengths, angles)| {
                let refs: Vec<&str> = points.iter().map(String::as_str).collect();
                let mut schema = Schema::new(figure, &refs);
                for (name, x, y) in labels {
                    schema = schema.with_label(&name, x, y);
                }
                for (from, to, value) in lengths {
                    schema = match value {
                        Some(value) => schema.with_length(&from, &to, value),
                        None => {
                            schema.lengths.push(Length::unknown(&from, &to));
                            schema
                        }
                    };
                }
                for (first, vertex, second, degrees) in angles {
                    schema = schema.with_angle(match degrees {
                        Some(degrees) => Angle::measured(&first, &vertex, &second, degrees),
                        None => Angle::right(&vertex),
                    });
                }
                schema
            })
    }

    fn check_render_is_stable(schema: &Schema) -> Result<(), TestCaseError> {
        let mut config = Config::default();
        config.raster.scale = 0.25;
        config.raster.load_system_fonts = false;
        let renderer = Renderer::new(config);
        let first = renderer.render(schema);
        let second = renderer.render(schema);
        prop_assert_eq!(&first, &second);
        prop_assert!(first.vector_markup.starts_with("<svg"));
        prop_assert!(!first.vector_markup.contains("NaN"));
        Ok(())
    }

    /// Every kept point name gets a finite coordinate.
    fn check_coordinates_are_complete(schema: &Schema) -> Result<(), TestCaseError> {
        let config = Config::default().figure;
        let mut kept: Vec<&str> = Vec::new();
        for name in schema.points.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            if !kept.contains(&name) && kept.len() < config.max_points {
                kept.push(name);
            }
        }
        let coordinates = resolve(schema, &config).figure.coordinates();
        let named: BTreeSet<&str> = coordinates
            .keys()
            .map(String::as_str)
            .filter(|key| !key.starts_with('@'))
            .collect();
        for name in kept {
            prop_assert!(named.contains(name), "{} has no coordinate", name);
        }
        for (name, at) in &coordinates {
            prop_assert!(at.is_finite(), "{} is not finite: {:?}", name, at);
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn renders_are_deterministic_and_finite(schema in schema_strategy()) {
            check_render_is_stable(&schema)?;
        }

        #[test]
        fn every_point_is_placed(schema in schema_strategy()) {
            check_coordinates_are_complete(&schema)?;
        }
    }
}
