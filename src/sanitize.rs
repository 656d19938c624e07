//! Recovery of schema fragments left inside exercise text, and normalization
//! of every legacy schema spelling into the canonical [`Schema`].

use std::collections::{BTreeMap, HashMap};

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::ir::{Angle, Axis, Coord, Figure, Length, Measure, Schema};

const ENVELOPE_KEYS: [&str; 6] = [
    "schema",
    "schéma",
    "schema_geometrique",
    "geometric_schema",
    "figure_geometrique",
    "donnees",
];
const WRAPPER_TYPE: &str = "schema_geometrique";
const MAX_ENVELOPE_DEPTH: usize = 8;
/// Blocks beyond these limits are never schema fragments and are not parsed.
const MAX_FRAGMENT_BYTES: usize = 64 * 1024;
const MAX_FRAGMENT_DEPTH: usize = 32;
const TYPE_KEYS: [&str; 4] = ["type", "figure", "type_figure", "figure_type"];
const COORDINATE_KEYS: [&str; 5] = ["labels", "coordonnees", "coordinates", "points_coords", "coords"];
const RIGHT_ANGLE_KEYS: [&str; 3] = ["right_angle", "rectangle_en", "angle_droit"];
const MEASURE_KEYS: [&str; 7] = ["longueur", "length", "mesure", "measure", "valeur", "value", "distance"];
const LENGTH_MAP_KEYS: [&str; 3] = ["longueurs_connues", "known_lengths", "longueurs"];
const UNIT_KEYS: [&str; 2] = ["unit", "unite"];
const UNKNOWN_FLAGS: [&str; 4] = ["a_calculer", "inconnu", "unknown", "to_compute"];
const RIGHT_FLAGS: [&str; 4] = ["angle_droit", "droit", "right", "right_angle"];
const GRID_FLAGS: [&str; 3] = ["with_grid", "grid", "quadrillage"];
const HIDE_IMAGE_FLAGS: [&str; 3] = ["hide_image", "hide_image_triangle", "question"];
const DEGREE_KEYS: [&str; 7] = ["degrees", "degres", "mesure", "measure", "valeur", "value", "angle"];

static FRAGMENT_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\{\s*["']([^"'\r\n]{1,64})["']\s*:"#).unwrap());
static EMPTY_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*```[ \t]*(?:json5?|JSON)?[ \t]*\n(?:[ \t]*\n)*[ \t]*```[ \t]*$").unwrap()
});
static AXIS_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)_([xXyY])$").unwrap());
static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static COORD_DOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?\s*(-?\d+(?:\.\d+)?)\s*[,;]\s*(-?\d+(?:\.\d+)?)\s*\)?$").unwrap()
});
static COORD_COMMA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?\s*(-?\d+(?:,\d+)?)\s*;\s*(-?\d+(?:,\d+)?)\s*\)?$").unwrap()
});

/// Cleaned exercise text plus the schema recovered from it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    pub text: String,
    pub schema: Option<Schema>,
}

/// Removes embedded schema fragments and normalizes whitespace. Running it
/// on its own output returns that output unchanged.
pub fn sanitize(text: &str) -> Sanitized {
    let mut current = text.replace("\r\n", "\n");
    let mut schema = None;
    // Every pass either shrinks the text or only swaps tabs for spaces.
    loop {
        let (stripped, found) = strip_fragments(&current);
        if schema.is_none() {
            schema = found;
        }
        let next = normalize_whitespace(&stripped);
        if next == current {
            break;
        }
        current = next;
    }
    Sanitized { text: current, schema }
}

fn strip_fragments(text: &str) -> (String, Option<Schema>) {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut schema = None;
    let mut removed = false;
    let mut cursor = 0;
    let mut idx = 0;
    let mut blocks = Blocks::default();

    while idx < bytes.len() {
        if bytes[idx] != b'{' {
            idx += 1;
            continue;
        }
        let Some(block) = fragment_at(text, idx, &mut blocks) else {
            idx += 1;
            continue;
        };
        let end = block.end;
        let Some(parsed) = classify_fragment(&text[idx..end], block) else {
            idx += 1;
            continue;
        };
        out.push_str(&text[cursor..idx]);
        cursor = end;
        idx = end;
        removed = true;
        if schema.is_none() {
            if let Some(value) = parsed {
                match canonicalize(&value) {
                    Ok(found) => schema = found,
                    Err(err) => debug!(error = err.to_string(); "discarding malformed schema fragment"),
                }
            }
        }
    }
    out.push_str(&text[cursor..]);

    if removed {
        debug!("stripped embedded schema fragments");
        out = EMPTY_FENCE.replace_all(&out, "").into_owned();
    }
    (out, schema)
}

/// A balanced `{...}` block: its end offset and deepest brace nesting.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Block {
    end: usize,
    depth: usize,
}

/// Scan results keyed by opening offset. One scan settles every opener it
/// meets outside quotes, so each byte is scanned a bounded number of times.
#[derive(Default)]
struct Blocks {
    known: HashMap<usize, Option<Block>>,
}

impl Blocks {
    fn scan(&mut self, bytes: &[u8], start: usize) {
        // Open braces with the deepest nesting seen inside each.
        let mut open: Vec<(usize, usize)> = Vec::new();
        let mut quote: Option<u8> = None;
        let mut escaped = false;
        for (offset, &byte) in bytes[start..].iter().enumerate() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if byte == b'\\' {
                    escaped = true;
                } else if byte == q {
                    quote = None;
                }
                continue;
            }
            match byte {
                b'"' | b'\'' => quote = Some(byte),
                b'{' => open.push((start + offset, 1)),
                b'}' => {
                    let Some((at, depth)) = open.pop() else {
                        break;
                    };
                    let end = start + offset + 1;
                    self.known.insert(at, Some(Block { end, depth }));
                    match open.last_mut() {
                        Some(parent) => parent.1 = parent.1.max(depth + 1),
                        None => return,
                    }
                }
                _ => {}
            }
        }
        for (at, _) in open {
            self.known.insert(at, None);
        }
    }
}

/// The balanced block opening at `start`, when that block starts with a
/// quoted key.
fn fragment_at(text: &str, start: usize, blocks: &mut Blocks) -> Option<Block> {
    if !FRAGMENT_OPEN.is_match(&text[start..]) {
        return None;
    }
    if !blocks.known.contains_key(&start) {
        blocks.scan(text.as_bytes(), start);
    }
    blocks.known.get(&start).copied().flatten()
}

/// `Some` when the block is a schema fragment; the inner value is the parsed
/// block when it could be read.
fn classify_fragment(source: &str, block: Block) -> Option<Option<Value>> {
    if source.len() > MAX_FRAGMENT_BYTES || block.depth > MAX_FRAGMENT_DEPTH {
        return None;
    }
    let key = FRAGMENT_OPEN.captures(source)?.get(1)?.as_str();
    let parsed = parse_lenient(source);
    if is_envelope_key(key) {
        return Some(parsed);
    }
    match parsed {
        Some(value) if looks_like_schema(&value) => Some(Some(value)),
        _ => None,
    }
}

fn parse_lenient(block: &str) -> Option<Value> {
    serde_json::from_str::<Value>(block)
        .ok()
        .or_else(|| json5::from_str::<Value>(block).ok())
}

fn is_envelope_key(key: &str) -> bool {
    let key = key.trim().to_lowercase();
    ENVELOPE_KEYS.contains(&key.as_str())
}

fn looks_like_schema(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    let typed = TYPE_KEYS.iter().any(|key| object.contains_key(*key));
    let wrapper = object
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|kind| normalize_name(kind) == WRAPPER_TYPE);
    wrapper || (typed && object.contains_key("points"))
}

fn normalize_whitespace(text: &str) -> String {
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| INLINE_SPACE.replace_all(line, " ").trim_end().to_string())
        .collect();
    let joined = lines.join("\n");
    BLANK_RUN.replace_all(&joined, "\n\n").trim().to_string()
}

/// Collapses every accepted spelling of a schema into the canonical form.
/// `null` (or an envelope holding `null`) means "no figure".
pub fn canonicalize(value: &Value) -> Result<Option<Schema>, SchemaError> {
    let Some(object) = unwrap_envelopes(value)? else {
        return Ok(None);
    };
    build_schema(&object).map(Some)
}

fn unwrap_envelopes(value: &Value) -> Result<Option<Map<String, Value>>, SchemaError> {
    let mut current = value;
    let mut inherited: Option<String> = None;
    for _ in 0..MAX_ENVELOPE_DEPTH {
        let object = match current {
            Value::Null => return Ok(None),
            Value::Object(object) => object,
            other => {
                return Err(SchemaError::NotAnObject {
                    found: json_kind(other),
                });
            }
        };
        if !object.contains_key("points") {
            let inner = ENVELOPE_KEYS
                .iter()
                .filter_map(|key| object.get(*key))
                .find(|value| value.is_object() || value.is_null())
                .or_else(|| object.get("figure").filter(|value| value.is_object()));
            if let Some(inner) = inner {
                if let Some(kind) = type_name(object)? {
                    inherited = Some(kind);
                }
                current = inner;
                continue;
            }
        }
        let mut owned = object.clone();
        if let Some(kind) = inherited {
            if type_name(&owned)?.is_none() {
                owned.insert("type".to_string(), Value::String(kind));
            }
        }
        return Ok(Some(owned));
    }
    debug!("schema envelopes nested too deeply, ignoring");
    Ok(None)
}

fn build_schema(object: &Map<String, Value>) -> Result<Schema, SchemaError> {
    let (mut points, mut labels) = read_points(object)?;
    for key in COORDINATE_KEYS {
        read_coordinates(object, key, &mut labels)?;
    }
    for key in LENGTH_MAP_KEYS {
        if let Some(Value::Object(entries)) = object.get(key) {
            read_axis_pairs(entries, &mut labels);
        }
    }
    for name in labels.keys() {
        if !points.contains(name) {
            points.push(name.clone());
        }
    }

    let lengths = read_lengths(object, &points)?;
    let angles = read_angles(object, &points)?;
    if points.is_empty() {
        points = infer_points(&lengths, &angles);
    }
    let figure = read_figure(object, &angles, &mut labels)?;

    Ok(Schema {
        figure,
        points,
        labels,
        lengths,
        angles,
    })
}

fn read_points(object: &Map<String, Value>) -> Result<(Vec<String>, BTreeMap<String, Coord>), SchemaError> {
    let mut points = Vec::new();
    let mut labels = BTreeMap::new();
    let invalid = || SchemaError::InvalidField {
        field: "points".to_string(),
        expected: "an array of point names",
    };

    match object.get("points").or_else(|| object.get("points_labels")) {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::String(name) => push_name(&mut points, name),
                    Value::Object(entry) => {
                        let name = ["name", "nom", "label"]
                            .iter()
                            .find_map(|key| entry.get(*key).and_then(Value::as_str))
                            .ok_or_else(invalid)?;
                        push_name(&mut points, name);
                        if let Some(coord) = parse_coord(item) {
                            labels.insert(name.trim().to_string(), coord);
                        }
                    }
                    _ => return Err(invalid()),
                }
            }
        }
        Some(Value::Object(entries)) => {
            for (name, coord) in entries {
                push_name(&mut points, name);
                if let Some(coord) = parse_coord(coord) {
                    labels.insert(name.trim().to_string(), coord);
                }
            }
        }
        Some(_) => return Err(invalid()),
    }
    Ok((points, labels))
}

fn push_name(points: &mut Vec<String>, raw: &str) {
    let name = raw.trim();
    if !name.is_empty() {
        points.push(name.to_string());
    }
}

fn read_coordinates(
    object: &Map<String, Value>,
    key: &str,
    labels: &mut BTreeMap<String, Coord>,
) -> Result<(), SchemaError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Object(entries)) => {
            for (name, value) in entries {
                let name = name.trim();
                match parse_coord(value) {
                    Some(coord) if !name.is_empty() => {
                        labels.entry(name.to_string()).or_insert(coord);
                    }
                    _ if axis_key(name, value).is_some() => {}
                    _ => debug!(point = name; "unreadable coordinate ignored"),
                }
            }
            read_axis_pairs(entries, labels);
            Ok(())
        }
        Some(_) => Err(SchemaError::InvalidField {
            field: key.to_string(),
            expected: "an object mapping point names to coordinates",
        }),
    }
}

/// Splits a flat per-axis entry such as `"A_prime_x": 7` into the point
/// name (`A'`), the axis and the value.
fn axis_key(key: &str, value: &Value) -> Option<(String, char, f64)> {
    if parse_coord(value).is_some() {
        return None;
    }
    let value = number(value)?;
    let caps = AXIS_KEY.captures(key.trim())?;
    let name = caps.get(1)?.as_str().trim().replace("_prime", "'");
    let axis = caps.get(2)?.as_str().chars().next()?.to_ascii_lowercase();
    (!name.is_empty()).then_some((name, axis, value))
}

/// Collects `X_x` / `X_y` pairs into coordinates. A point with only one
/// axis given is left out.
fn read_axis_pairs(entries: &Map<String, Value>, labels: &mut BTreeMap<String, Coord>) {
    let mut pairs: BTreeMap<String, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for (key, value) in entries {
        let Some((name, axis, value)) = axis_key(key, value) else {
            continue;
        };
        let slot = pairs.entry(name).or_default();
        if axis == 'x' {
            slot.0 = Some(value);
        } else {
            slot.1 = Some(value);
        }
    }
    for (name, pair) in pairs {
        match pair {
            (Some(x), Some(y)) => {
                labels.entry(name).or_insert(Coord::new(x, y));
            }
            _ => debug!(point = name.as_str(); "coordinate with a single axis ignored"),
        }
    }
}

/// Accepts `[x, y]`, `{"x": .., "y": ..}` and `"(x, y)"` / `"(x; y)"`.
fn parse_coord(value: &Value) -> Option<Coord> {
    match value {
        Value::Array(items) if items.len() == 2 => {
            Some(Coord::new(number(&items[0])?, number(&items[1])?))
        }
        Value::Object(entry) => Some(Coord::new(number(entry.get("x")?)?, number(entry.get("y")?)?)),
        Value::String(text) => {
            let text = text.trim();
            let caps = COORD_DOT
                .captures(text)
                .or_else(|| COORD_COMMA.captures(text))?;
            let x = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
            let y = caps.get(2)?.as_str().replace(',', ".").parse().ok()?;
            Some(Coord::new(x, y))
        }
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => Measure::parse(text).map(|m| m.value),
        _ => None,
    }
}

enum LengthValue {
    Known(Measure),
    Unknown,
    Absent,
}

fn length_value(value: &Value, field: &str) -> Result<LengthValue, SchemaError> {
    match value {
        Value::Null => Ok(LengthValue::Absent),
        Value::Number(n) => Ok(n
            .as_f64()
            .map(|v| LengthValue::Known(Measure::new(v)))
            .unwrap_or(LengthValue::Absent)),
        Value::String(text) => {
            let text = text.trim();
            if matches!(text, "?" | "x" | "inconnu" | "unknown") {
                return Ok(LengthValue::Unknown);
            }
            match Measure::parse(text) {
                Some(measure) => Ok(LengthValue::Known(measure)),
                None => {
                    debug!(field = field, value = text; "unreadable measure ignored");
                    Ok(LengthValue::Absent)
                }
            }
        }
        Value::Object(entry) => {
            if UNKNOWN_FLAGS
                .iter()
                .any(|flag| entry.get(*flag).is_some_and(is_truthy))
            {
                return Ok(LengthValue::Unknown);
            }
            let Some(inner) = MEASURE_KEYS.iter().find_map(|key| entry.get(*key)) else {
                return Ok(LengthValue::Absent);
            };
            let unit = UNIT_KEYS
                .iter()
                .find_map(|key| entry.get(*key).and_then(Value::as_str));
            Ok(match length_value(inner, field)? {
                LengthValue::Known(measure) if measure.unit.is_none() => match unit {
                    Some(unit) => LengthValue::Known(Measure::with_unit(measure.value, unit)),
                    None => LengthValue::Known(measure),
                },
                other => other,
            })
        }
        Value::Bool(_) | Value::Array(_) => Err(SchemaError::InvalidField {
            field: field.to_string(),
            expected: "a number or a measure such as \"5 cm\"",
        }),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => matches!(text.trim().to_lowercase().as_str(), "true" | "oui" | "yes"),
        _ => false,
    }
}

fn add_length(lengths: &mut Vec<Length>, from: String, to: String, measure: Option<Measure>) {
    if from == to {
        return;
    }
    match lengths.iter_mut().find(|length| length.joins(&from, &to)) {
        Some(existing) => {
            if existing.measure.is_none() && measure.is_some() {
                existing.measure = measure;
            }
        }
        None => lengths.push(Length { from, to, measure }),
    }
}

fn read_lengths(object: &Map<String, Value>, names: &[String]) -> Result<Vec<Length>, SchemaError> {
    let mut lengths = Vec::new();

    for key in ["lengths", "segments"] {
        match object.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    read_segment_item(item, key, names, &mut lengths)?;
                }
            }
            Some(Value::Object(entries)) => read_length_map(entries, key, names, &mut lengths)?,
            Some(_) => {
                return Err(SchemaError::InvalidField {
                    field: key.to_string(),
                    expected: "an array of segments",
                });
            }
        }
    }

    for key in LENGTH_MAP_KEYS {
        match object.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::Object(entries)) => read_length_map(entries, key, names, &mut lengths)?,
            Some(_) => {
                return Err(SchemaError::InvalidField {
                    field: key.to_string(),
                    expected: "an object mapping segments to lengths",
                });
            }
        }
    }

    for key in ["longueurs_a_calculer", "unknown_lengths", "a_calculer"] {
        let segments: Vec<&str> = match object.get(key) {
            None | Some(Value::Null) => continue,
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::Object(entries)) => entries.keys().map(String::as_str).collect(),
            Some(Value::String(single)) => vec![single.as_str()],
            Some(_) => {
                return Err(SchemaError::InvalidField {
                    field: key.to_string(),
                    expected: "a list of segments",
                });
            }
        };
        for segment in segments {
            if let Some((from, to)) = split_pair(segment, names) {
                add_length(&mut lengths, from, to, None);
            }
        }
    }

    Ok(lengths)
}

fn read_length_map(
    entries: &Map<String, Value>,
    field: &str,
    names: &[String],
    lengths: &mut Vec<Length>,
) -> Result<(), SchemaError> {
    for (segment, value) in entries {
        if axis_key(segment, value).is_some() {
            continue;
        }
        let Some((from, to)) = split_pair(segment, names) else {
            debug!(segment = segment.as_str(); "segment key does not name two points");
            continue;
        };
        match length_value(value, field)? {
            LengthValue::Known(measure) => add_length(lengths, from, to, Some(measure)),
            LengthValue::Unknown => add_length(lengths, from, to, None),
            LengthValue::Absent => {}
        }
    }
    Ok(())
}

fn read_segment_item(
    item: &Value,
    field: &str,
    names: &[String],
    lengths: &mut Vec<Length>,
) -> Result<(), SchemaError> {
    let (endpoints, value) = match item {
        Value::Array(parts) => {
            let labels: Vec<&str> = parts.iter().map_while(Value::as_str).collect();
            let endpoints = match labels.as_slice() {
                [from, to, ..] => Some((from.trim().to_string(), to.trim().to_string())),
                [single] => split_pair(single, names),
                [] => None,
            };
            (endpoints, parts.get(labels.len()))
        }
        Value::String(segment) => (split_pair(segment, names), None),
        Value::Object(entry) => {
            let endpoints = match (
                entry.get("from").and_then(Value::as_str),
                entry.get("to").and_then(Value::as_str),
            ) {
                (Some(from), Some(to)) => Some((from.trim().to_string(), to.trim().to_string())),
                _ => entry
                    .get("points")
                    .and_then(Value::as_array)
                    .and_then(|pair| match pair.as_slice() {
                        [Value::String(from), Value::String(to)] => {
                            Some((from.trim().to_string(), to.trim().to_string()))
                        }
                        _ => None,
                    })
                    .or_else(|| {
                        ["segment", "nom", "name"]
                            .iter()
                            .find_map(|key| entry.get(*key).and_then(Value::as_str))
                            .and_then(|segment| split_pair(segment, names))
                    }),
            };
            (endpoints, Some(item))
        }
        _ => {
            return Err(SchemaError::InvalidField {
                field: field.to_string(),
                expected: "segments as arrays, strings or objects",
            });
        }
    };

    let Some((from, to)) = endpoints else {
        debug!(field = field; "segment without two endpoints ignored");
        return Ok(());
    };
    match value.map(|v| length_value(v, field)).transpose()? {
        Some(LengthValue::Known(measure)) => add_length(lengths, from, to, Some(measure)),
        Some(LengthValue::Unknown) => add_length(lengths, from, to, None),
        Some(LengthValue::Absent) | None => {}
    }
    Ok(())
}

fn read_angles(object: &Map<String, Value>, names: &[String]) -> Result<Vec<Angle>, SchemaError> {
    let mut angles: Vec<Angle> = Vec::new();

    match object.get("angles") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for item in items {
                if let Some(angle) = read_angle_item(item, names)? {
                    push_angle(&mut angles, angle);
                }
            }
        }
        Some(Value::Object(entries)) => read_angle_map(entries, names, &mut angles),
        Some(_) => {
            return Err(SchemaError::InvalidField {
                field: "angles".to_string(),
                expected: "an array of angles",
            });
        }
    }

    for key in ["angles_connus", "known_angles"] {
        match object.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::Object(entries)) => read_angle_map(entries, names, &mut angles),
            Some(_) => {
                return Err(SchemaError::InvalidField {
                    field: key.to_string(),
                    expected: "an object mapping angles to degrees",
                });
            }
        }
    }
    Ok(angles)
}

fn read_angle_map(entries: &Map<String, Value>, names: &[String], angles: &mut Vec<Angle>) {
    for (key, value) in entries {
        if let Some(mut angle) = angle_from_key(key, names) {
            apply_angle_props(&mut angle, value);
            push_angle(angles, angle);
        }
    }
}

fn read_angle_item(item: &Value, names: &[String]) -> Result<Option<Angle>, SchemaError> {
    match item {
        Value::Array(parts) => {
            let labels: Vec<&str> = parts.iter().map_while(Value::as_str).collect();
            let mut angle = match labels.as_slice() {
                [first, vertex, second, ..] => Angle {
                    vertex: vertex.trim().to_string(),
                    arms: Some((first.trim().to_string(), second.trim().to_string())),
                    degrees: None,
                    right: false,
                },
                [key, ..] => match angle_from_key(key, names) {
                    Some(angle) => angle,
                    None => return Ok(None),
                },
                [] => return Ok(None),
            };
            if let Some(props) = parts.get(labels.len()) {
                apply_angle_props(&mut angle, props);
            }
            Ok(Some(angle))
        }
        Value::Object(entry) => {
            let vertex = ["vertex", "sommet", "point"]
                .iter()
                .find_map(|key| entry.get(*key).and_then(Value::as_str));
            let mut angle = match vertex {
                Some(vertex) => Angle {
                    vertex: vertex.trim().to_string(),
                    arms: read_arms(entry.get("arms")),
                    degrees: None,
                    right: false,
                },
                None => match ["name", "nom"]
                    .iter()
                    .find_map(|key| entry.get(*key).and_then(Value::as_str))
                    .and_then(|key| angle_from_key(key, names))
                {
                    Some(angle) => angle,
                    None => return Ok(None),
                },
            };
            apply_angle_props(&mut angle, item);
            Ok(Some(angle))
        }
        Value::String(key) => Ok(angle_from_key(key, names)),
        _ => Err(SchemaError::InvalidField {
            field: "angles".to_string(),
            expected: "angles as arrays, strings or objects",
        }),
    }
}

fn read_arms(value: Option<&Value>) -> Option<(String, String)> {
    match value?.as_array()?.as_slice() {
        [Value::String(first), Value::String(second)] => {
            Some((first.trim().to_string(), second.trim().to_string()))
        }
        _ => None,
    }
}

fn apply_angle_props(angle: &mut Angle, props: &Value) {
    match props {
        Value::Object(entry) => {
            if RIGHT_FLAGS.iter().any(|flag| entry.get(*flag).is_some_and(is_truthy)) {
                angle.right = true;
            }
            if let Some(degrees) = DEGREE_KEYS.iter().find_map(|key| entry.get(*key).and_then(number)) {
                angle.degrees = Some(degrees);
            }
        }
        Value::Bool(true) => angle.right = true,
        other => {
            if let Some(degrees) = number(other) {
                angle.degrees = Some(degrees);
            }
        }
    }
    if angle.degrees.is_some_and(|d| (d - 90.0).abs() < 1e-9) {
        angle.right = true;
    }
}

fn angle_from_key(key: &str, names: &[String]) -> Option<Angle> {
    if let Some(parts) = split_names(key, names, 3) {
        let [first, vertex, second]: [String; 3] = parts.try_into().ok()?;
        return Some(Angle {
            vertex,
            arms: Some((first, second)),
            degrees: None,
            right: false,
        });
    }
    let vertex = key.trim().trim_start_matches('^').trim();
    (!vertex.is_empty()).then(|| Angle {
        vertex: vertex.to_string(),
        arms: None,
        degrees: None,
        right: false,
    })
}

fn push_angle(angles: &mut Vec<Angle>, angle: Angle) {
    match angles
        .iter_mut()
        .find(|existing| existing.vertex == angle.vertex && existing.arms == angle.arms)
    {
        Some(existing) => {
            existing.right |= angle.right;
            if existing.degrees.is_none() {
                existing.degrees = angle.degrees;
            }
        }
        None => angles.push(angle),
    }
}

fn split_pair(key: &str, names: &[String]) -> Option<(String, String)> {
    let [from, to]: [String; 2] = split_names(key, names, 2)?.try_into().ok()?;
    Some((from, to))
}

/// Splits a compound label such as `AB`, `[A'B]` or `B-A-C` into `parts`
/// point names, preferring names already declared.
fn split_names(key: &str, names: &[String], parts: usize) -> Option<Vec<String>> {
    let key = key
        .trim()
        .trim_start_matches(['[', '(', '^'])
        .trim_end_matches([']', ')'])
        .trim();
    let explicit: Vec<&str> = key
        .split(|c: char| c == '-' || c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect();
    if explicit.len() == parts {
        return Some(explicit.iter().map(|part| part.to_string()).collect());
    }
    if let Some(found) = split_known(key, names, parts) {
        return Some(found);
    }
    let chars: Vec<char> = key.chars().collect();
    (chars.len() == parts).then(|| chars.iter().map(|c| c.to_string()).collect())
}

fn split_known(key: &str, names: &[String], parts: usize) -> Option<Vec<String>> {
    if parts == 0 {
        return key.is_empty().then(Vec::new);
    }
    for name in names.iter().filter(|name| !name.is_empty()) {
        if let Some(rest) = key.strip_prefix(name.as_str()) {
            if let Some(mut tail) = split_known(rest, names, parts - 1) {
                tail.insert(0, name.clone());
                return Some(tail);
            }
        }
    }
    None
}

fn infer_points(lengths: &[Length], angles: &[Angle]) -> Vec<String> {
    let mut points: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !name.is_empty() && !points.iter().any(|p| p == name) {
            points.push(name.to_string());
        }
    };
    for length in lengths {
        push(&length.from);
        push(&length.to);
    }
    for angle in angles {
        if let Some((first, second)) = &angle.arms {
            push(first);
            push(&angle.vertex);
            push(second);
        } else {
            push(&angle.vertex);
        }
    }
    points
}

fn type_name(object: &Map<String, Value>) -> Result<Option<String>, SchemaError> {
    for key in TYPE_KEYS {
        match object.get(key) {
            Some(Value::String(kind)) => {
                if normalize_name(kind) != WRAPPER_TYPE && !kind.trim().is_empty() {
                    return Ok(Some(kind.trim().to_string()));
                }
            }
            None | Some(Value::Null) | Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(SchemaError::InvalidField {
                    field: key.to_string(),
                    expected: "a figure type name",
                });
            }
        }
    }
    Ok(None)
}

fn normalize_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' => 'a',
            'î' | 'ï' => 'i',
            'ô' => 'o',
            'û' | 'ù' => 'u',
            'ç' => 'c',
            ' ' | '-' => '_',
            other => other,
        })
        .collect()
}

fn read_figure(
    object: &Map<String, Value>,
    angles: &[Angle],
    labels: &mut BTreeMap<String, Coord>,
) -> Result<Figure, SchemaError> {
    let Some(raw) = type_name(object)? else {
        return Ok(Figure::Unknown {
            name: "unspecified".to_string(),
        });
    };
    let explicit_right = read_right_angle(object)?;
    let equilateral = flag(object, &["equilateral", "equilateralite"]);
    let isosceles = flag(object, &["isosceles", "isocele", "isocèle"]);

    let figure = match normalize_name(&raw).as_str() {
        "triangle" | "triangle_quelconque" | "scalene_triangle" if explicit_right.is_none() => {
            Figure::Triangle {
                equilateral,
                isosceles,
            }
        }
        "triangle_equilateral" | "equilateral_triangle" => Figure::Triangle {
            equilateral: true,
            isosceles: false,
        },
        "triangle_isocele" | "isosceles_triangle" => Figure::Triangle {
            equilateral,
            isosceles: true,
        },
        "triangle" | "triangle_quelconque" | "scalene_triangle" | "triangle_rectangle"
        | "right_triangle" | "triangle_rect" | "pythagore" => Figure::RightTriangle {
            right_angle: explicit_right
                .or_else(|| angles.iter().find(|angle| angle.right).map(|a| a.vertex.clone())),
        },
        "carre" | "square" => Figure::Square {
            side: measure_field(object, &["side", "cote", "côté", "longueur"])?,
        },
        "rectangle" => Figure::Rectangle {
            width: measure_field(object, &["width", "longueur"])?,
            height: measure_field(object, &["height", "largeur", "hauteur"])?,
        },
        "cercle" | "circle" | "disque" | "disk" => Figure::Circle {
            center: read_center(object, labels),
            radius: measure_field(object, &["radius", "rayon"])?,
        },
        "thales" | "configuration_thales" | "triangles_thales" => Figure::Thales,
        "pyramide" | "pyramid" | "pyramide_base_carree" | "square_pyramid" => Figure::Pyramid {
            base_side: measure_field(object, &["base_side", "cote_base", "base", "cote", "side"])?,
            height: measure_field(object, &["height", "hauteur"])?,
        },
        "cylindre" | "cylinder" => Figure::Cylinder {
            radius: measure_field(object, &["radius", "rayon"])?,
            height: measure_field(object, &["height", "hauteur"])?,
        },
        "cube" => Figure::Cube {
            side: measure_field(object, &["side", "cote", "côté", "arete"])?,
        },
        "symetrie_axiale" | "symetrie_orthogonale" | "axial_symmetry" | "reflection" => {
            Figure::AxialSymmetry {
                axis: read_axis(object),
                grid: flag_or(object, &GRID_FLAGS, false),
                hide_image: flag(object, &HIDE_IMAGE_FLAGS),
            }
        }
        "symetrie_centrale" | "central_symmetry" | "point_reflection" => Figure::CentralSymmetry {
            center: read_center(object, labels),
            grid: flag_or(object, &GRID_FLAGS, true),
            hide_image: flag(object, &HIDE_IMAGE_FLAGS),
        },
        "mediatrice" | "construction_mediatrice" | "perpendicular_bisector" => {
            Figure::PerpendicularBisector
        }
        "unknown" => Figure::Unknown {
            name: object
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        },
        _ => Figure::Unknown { name: raw },
    };
    Ok(figure)
}

fn read_axis(object: &Map<String, Value>) -> Axis {
    let mut kind = ["axe_type", "axis_type", "axe", "axis"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(normalize_name);
    let mut position = None;
    match ["axe_position", "axis_position", "position"]
        .iter()
        .find_map(|key| object.get(*key))
    {
        Some(Value::String(text)) if is_first_bisector(text) => kind = Some("oblique".to_string()),
        Some(value) => position = number(value),
        None => {}
    }

    let properties = ["proprietes", "properties"]
        .iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str)
        .map(normalize_name);
    for property in properties {
        let Some(rest) = property
            .strip_prefix("axe_")
            .or_else(|| property.strip_prefix("axis_"))
        else {
            continue;
        };
        match rest.strip_prefix("position_") {
            Some(pos) if is_first_bisector(pos) => kind = Some("oblique".to_string()),
            Some(pos) => position = position.or_else(|| Measure::parse(pos).map(|m| m.value)),
            None if kind.is_none() => kind = Some(rest.to_string()),
            None => {}
        }
    }

    let position = position.filter(|p| p.is_finite()).unwrap_or(5.0);
    match kind.as_deref() {
        Some("horizontal" | "horizontale") => Axis::Horizontal(position),
        Some("oblique" | "diagonal" | "diagonale" | "bissectrice") => Axis::Oblique,
        _ => Axis::Vertical(position),
    }
}

fn is_first_bisector(text: &str) -> bool {
    text.chars().filter(|c| !c.is_whitespace()).collect::<String>() == "y=x"
}

fn read_right_angle(object: &Map<String, Value>) -> Result<Option<String>, SchemaError> {
    for key in RIGHT_ANGLE_KEYS {
        match object.get(key) {
            Some(Value::String(vertex)) if !vertex.trim().is_empty() => {
                return Ok(Some(vertex.trim().to_string()));
            }
            None | Some(Value::Null) | Some(Value::Bool(_)) | Some(Value::String(_)) => {}
            Some(_) => {
                return Err(SchemaError::InvalidField {
                    field: key.to_string(),
                    expected: "a point name",
                });
            }
        }
    }
    Ok(None)
}

fn read_center(object: &Map<String, Value>, labels: &mut BTreeMap<String, Coord>) -> Option<String> {
    let value = ["center", "centre"].iter().find_map(|key| object.get(*key))?;
    match value {
        Value::String(name) if !name.trim().is_empty() => Some(name.trim().to_string()),
        other => {
            let coord = parse_coord(other)?;
            labels.entry("O".to_string()).or_insert(coord);
            Some("O".to_string())
        }
    }
}

fn measure_field(object: &Map<String, Value>, keys: &[&str]) -> Result<Option<Measure>, SchemaError> {
    for key in keys {
        if let Some(value) = object.get(*key) {
            if let LengthValue::Known(measure) = length_value(value, key)? {
                return Ok(Some(measure));
            }
        }
    }
    Ok(None)
}

fn flag(object: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().any(|key| object.get(*key).is_some_and(is_truthy))
}

/// Like [`flag`], with `default` when none of the keys is present.
fn flag_or(object: &Map<String, Value>, keys: &[&str], default: bool) -> bool {
    keys.iter()
        .find_map(|key| object.get(*key))
        .map_or(default, is_truthy)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_envelope_fragment_and_keeps_schema() {
        let text = "Soit ABC un triangle rectangle en B.\n{\"schema\": {\"type\": \"triangle_rectangle\", \"points\": [\"A\", \"B\", \"C\"], \"angles\": [[\"B\", {\"angle_droit\": true}]]}}\nCalculer AC.";
        let out = sanitize(text);
        assert_eq!(out.text, "Soit ABC un triangle rectangle en B.\n\nCalculer AC.");
        let schema = out.schema.expect("schema recovered");
        assert_eq!(
            schema.figure,
            Figure::RightTriangle {
                right_angle: Some("B".to_string())
            }
        );
        assert_eq!(schema.points, vec!["A", "B", "C"]);
    }

    #[test]
    fn preserves_math_notation() {
        let text = "Soit E = {x | x > 0} et F = {1, 2, 3}. Calculer \\frac{1}{2}.";
        let out = sanitize(text);
        assert_eq!(out.text, text);
        assert!(out.schema.is_none());
    }

    #[test]
    fn removes_fenced_fragment() {
        let text = "Énoncé.\n```json\n{\"type\": \"carre\", \"points\": [\"A\", \"B\", \"C\", \"D\"]}\n```\nFin.";
        let out = sanitize(text);
        assert_eq!(out.text, "Énoncé.\n\nFin.");
        assert!(matches!(out.schema.map(|s| s.figure), Some(Figure::Square { .. })));
    }

    #[test]
    fn recovers_lenient_fragment() {
        let out = sanitize("Figure : {'type': 'cercle', 'points': ['O', 'A'], 'rayon': '3 cm',}");
        assert_eq!(out.text, "Figure :");
        let schema = out.schema.expect("json5 fragment parsed");
        assert_eq!(
            schema.figure,
            Figure::Circle {
                center: None,
                radius: Some(Measure::with_unit(3.0, "cm"))
            }
        );
    }

    #[test]
    fn leaves_ordinary_json_objects_alone() {
        let text = "La réponse attendue est {\"reponse\": 5}.";
        assert_eq!(sanitize(text).text, text);
    }

    #[test]
    fn normalizes_whitespace() {
        assert_eq!(sanitize("  a \t b  \n\n\n\nc  ").text, "a b\n\nc");
        assert_eq!(sanitize("").text, "");
    }

    #[test]
    fn unwraps_legacy_wrapper() {
        let value = json!({
            "type": "schema_geometrique",
            "figure": "rectangle",
            "donnees": {"points": ["A", "B", "C", "D"], "longueur": "6 cm", "largeur": 4}
        });
        let schema = canonicalize(&value).expect("valid").expect("present");
        assert_eq!(
            schema.figure,
            Figure::Rectangle {
                width: Some(Measure::with_unit(6.0, "cm")),
                height: Some(Measure::new(4.0)),
            }
        );
        assert_eq!(schema.points.len(), 4);
    }

    #[test]
    fn reads_segments_and_lengths_to_compute() {
        let value = json!({
            "type": "triangle_rectangle",
            "points": ["D", "E", "F"],
            "segments": [["D", "E", {"longueur": "5 cm"}], ["E", "F", {"longueur": 12}]],
            "angles": [["E", {"angle_droit": true}]],
            "longueurs_a_calculer": ["DF"]
        });
        let schema = canonicalize(&value).expect("valid").expect("present");
        assert_eq!(schema.lengths.len(), 3);
        assert_eq!(
            schema.length_between("E", "D").and_then(|l| l.measure.clone()),
            Some(Measure::with_unit(5.0, "cm"))
        );
        assert_eq!(schema.length_between("D", "F").map(|l| l.measure.is_none()), Some(true));
        assert_eq!(
            schema.figure,
            Figure::RightTriangle {
                right_angle: Some("E".to_string())
            }
        );
    }

    #[test]
    fn splits_keys_on_multi_character_names() {
        let value = json!({
            "type": "triangle",
            "points": ["A", "A'", "B"],
            "longueurs_connues": {"AA'": 3, "A'B": "4,5 cm"},
            "angles_connus": {"AA'B": 40},
            "rectangle_en": "A'"
        });
        let schema = canonicalize(&value).expect("valid").expect("present");
        assert!(schema.length_between("A", "A'").is_some());
        assert_eq!(
            schema.length_between("A'", "B").and_then(|l| l.measure.clone()),
            Some(Measure::with_unit(4.5, "cm"))
        );
        assert_eq!(schema.angles[0].vertex, "A'");
        assert_eq!(schema.angles[0].degrees, Some(40.0));
        assert!(matches!(schema.figure, Figure::RightTriangle { .. }));
    }

    #[test]
    fn reads_coordinates_in_every_form() {
        let value = json!({
            "type": "triangle",
            "points": ["A", "B"],
            "labels": {"A": "(1, 2)", "B": [3, 4]},
            "coordonnees": {"C": {"x": -1.5, "y": 0}, "D": "(2,5; 3)"}
        });
        let schema = canonicalize(&value).expect("valid").expect("present");
        assert_eq!(schema.labels["A"], Coord::new(1.0, 2.0));
        assert_eq!(schema.labels["B"], Coord::new(3.0, 4.0));
        assert_eq!(schema.labels["C"], Coord::new(-1.5, 0.0));
        assert_eq!(schema.labels["D"], Coord::new(2.5, 3.0));
        assert_eq!(schema.points, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn reads_flat_per_axis_coordinates() {
        let value = json!({
            "type": "triangle",
            "points": ["A", "B", "C"],
            "points_coords": {"A_x": 1, "A_y": 1, "B_x": 7, "B_y": 1, "C_x": 4, "C_y": 6}
        });
        let schema = canonicalize(&value).expect("valid").expect("present");
        assert_eq!(schema.labels.len(), 3);
        assert_eq!(schema.labels["B"], Coord::new(7.0, 1.0));

        let value = json!({
            "type": "symetrie_axiale",
            "points": ["A", "A'"],
            "longueurs_connues": {"A_x": 3, "A_y": 5, "A_prime_x": 7, "A_prime_y": 5, "Z_x": 2}
        });
        let schema = canonicalize(&value).expect("valid").expect("present");
        assert_eq!(schema.labels["A'"], Coord::new(7.0, 5.0));
        assert!(!schema.labels.contains_key("Z"));
        assert!(schema.lengths.is_empty());
        assert_eq!(schema.points, vec!["A", "A'"]);
    }

    #[test]
    fn reads_symmetry_figures() {
        let axial = json!({
            "type": "symetrie_axiale",
            "axe_type": "horizontal",
            "axe_position": 4,
            "with_grid": true,
            "points_labels": ["M", "M'"]
        });
        let schema = canonicalize(&axial).expect("valid").expect("present");
        assert_eq!(
            schema.figure,
            Figure::AxialSymmetry {
                axis: Axis::Horizontal(4.0),
                grid: true,
                hide_image: false
            }
        );
        assert_eq!(schema.points, vec!["M", "M'"]);

        let from_properties = json!({
            "type": "symetrie_axiale",
            "points": ["A", "A'"],
            "proprietes": ["axe_oblique", "axe_position_y=x"]
        });
        let schema = canonicalize(&from_properties).expect("valid").expect("present");
        assert!(matches!(schema.figure, Figure::AxialSymmetry { axis: Axis::Oblique, grid: false, .. }));

        let central = json!({"type": "symetrie_centrale", "points": ["A", "O", "A'"], "centre": "O"});
        let schema = canonicalize(&central).expect("valid").expect("present");
        assert_eq!(
            schema.figure,
            Figure::CentralSymmetry {
                center: Some("O".to_string()),
                grid: true,
                hide_image: false
            }
        );

        let bisector = json!({"type": "médiatrice", "points": ["A", "B"]});
        let schema = canonicalize(&bisector).expect("valid").expect("present");
        assert_eq!(schema.figure, Figure::PerpendicularBisector);
    }

    #[test]
    fn one_scan_settles_nested_openers() {
        let text = "{\"a\": {\"b\": 1} {\"c\": 2}";
        let mut blocks = Blocks::default();
        assert_eq!(fragment_at(text, 0, &mut blocks), None);
        assert_eq!(blocks.known.get(&6), Some(&Some(Block { end: 14, depth: 1 })));
        assert_eq!(blocks.known.get(&15), Some(&Some(Block { end: 23, depth: 1 })));
        assert_eq!(fragment_at(text, 6, &mut blocks), Some(Block { end: 14, depth: 1 }));
    }

    #[test]
    fn unclosed_openers_do_not_hide_a_later_fragment() {
        let mut text = "{\"a\": ".repeat(20_000);
        text.push_str("{\"type\": \"cube\", \"points\": [\"A\"]}");
        let out = sanitize(&text);
        assert!(matches!(out.schema.map(|s| s.figure), Some(Figure::Cube { .. })));
        assert!(!out.text.contains("cube"));
    }

    #[test]
    fn deeply_nested_blocks_are_not_fragments() {
        let depth = MAX_FRAGMENT_DEPTH + 1;
        let source = format!("{}null{}", "{\"schema\": ".repeat(depth), "}".repeat(depth));
        let mut blocks = Blocks::default();
        let block = fragment_at(&source, 0, &mut blocks).expect("balanced");
        assert_eq!(block.depth, depth);
        assert_eq!(classify_fragment(&source, block), None);

        let shallow = "{\"schema\": null}";
        let block = fragment_at(shallow, 0, &mut Blocks::default()).expect("balanced");
        assert_eq!(classify_fragment(shallow, block), Some(Some(json!({"schema": null}))));
    }

    #[test]
    fn null_and_bad_types() {
        assert_eq!(canonicalize(&Value::Null), Ok(None));
        assert_eq!(canonicalize(&json!({"schema": null})), Ok(None));
        assert_eq!(
            canonicalize(&json!({"type": "triangle", "points": 42})),
            Err(SchemaError::InvalidField {
                field: "points".to_string(),
                expected: "an array of point names"
            })
        );
        assert!(matches!(
            canonicalize(&json!([1, 2])),
            Err(SchemaError::NotAnObject { found: "an array" })
        ));
    }

    #[test]
    fn unknown_type_keeps_its_name() {
        let schema = canonicalize(&json!({"type": "dodecahedron", "points": []}))
            .expect("valid")
            .expect("present");
        assert_eq!(
            schema.figure,
            Figure::Unknown {
                name: "dodecahedron".to_string()
            }
        );
    }

    #[test]
    fn canonical_form_is_a_fixed_point() {
        let schema = Schema::new(
            Figure::Circle {
                center: Some("O".to_string()),
                radius: Some(Measure::with_unit(3.0, "cm")),
            },
            &["O", "A"],
        )
        .with_label("O", 0.0, 0.0)
        .with_length("O", "A", 3.0)
        .with_angle(Angle::measured("A", "O", "B", 45.0));
        let value = serde_json::to_value(&schema).expect("serializes");
        assert_eq!(canonicalize(&value), Ok(Some(schema)));
    }
}
