//! Shapefile-backed [`GeometryEngine`] writing merged layers to GeoPackage.

mod gpkg;

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use geo::{Coord, LineString, MultiLineString};
use hpms_core::{
    GeometryDescription, GeometryEngine, GeometryError, GeometryKind, MergeReport, MergeTarget,
};
use log::{debug, info};
use rusqlite::types::Value;
use shapefile::dbase::{self, Date, FieldType, FieldValue, Record};
use shapefile::{Reader, Shape, ShapeReader, ShapeType};

use gpkg::GeoPackage;

/// Reads ESRI shapefiles and merges line layers into a GeoPackage.
///
/// Z and M ordinates are dropped when merging; the output is two-dimensional.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapefileEngine;

impl ShapefileEngine {
    /// Construct the engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl GeometryEngine for ShapefileEngine {
    fn describe(&self, path: &Utf8Path) -> Result<GeometryDescription, GeometryError> {
        let mut reader = ShapeReader::from_path(path).map_err(|err| read_error(path, &err))?;
        let kind = kind_of(reader.header().shape_type);
        let mut feature_count = 0;
        let mut invalid_features = 0;
        for shape in reader.iter_shapes() {
            let shape = shape.map_err(|err| read_error(path, &err))?;
            feature_count += 1;
            if !has_valid_geometry(&shape) {
                invalid_features += 1;
            }
        }
        debug!("{path}: {kind} with {feature_count} features");
        Ok(GeometryDescription {
            path: path.to_path_buf(),
            kind,
            feature_count,
            invalid_features,
        })
    }

    fn merge(
        &self,
        inputs: &[Utf8PathBuf],
        target: &MergeTarget,
    ) -> Result<MergeReport, GeometryError> {
        let Some(first) = inputs.first() else {
            return Err(GeometryError::NoInputs);
        };
        prepare_target(target)?;
        let projection = hpms_fs::read_optional_string(&first.with_extension("prj"))
            .map_err(|err| GeometryError::read(first, err))?;
        let mut package = GeoPackage::create(&target.path, &target.layer, projection.as_deref())
            .map_err(|err| GeometryError::write(&target.path, err))?;

        for input in inputs {
            append_shapefile(&mut package, input, &target.path)?;
        }

        let (feature_count, fields) = package
            .finish()
            .map_err(|err| GeometryError::write(&target.path, err))?;
        info!(
            "Merged {} shapefiles ({feature_count} features) into {}",
            inputs.len(),
            target.path
        );
        Ok(MergeReport {
            output_path: target.path.clone(),
            layer: target.layer.clone(),
            input_count: inputs.len(),
            feature_count,
            fields,
        })
    }
}

fn prepare_target(target: &MergeTarget) -> Result<(), GeometryError> {
    let exists = hpms_fs::is_existing_file(&target.path)
        .map_err(|err| GeometryError::write(&target.path, err))?;
    if exists {
        if !target.overwrite {
            return Err(GeometryError::OutputExists {
                path: target.path.clone(),
            });
        }
        hpms_fs::remove_file_if_exists(&target.path)
            .map_err(|err| GeometryError::write(&target.path, err))?;
        info!("Replacing existing dataset {}", target.path);
    }
    if let Some(parent) = target.path.parent()
        && !parent.as_str().is_empty()
    {
        hpms_fs::create_dir_all(parent).map_err(|err| GeometryError::write(&target.path, err))?;
    }
    Ok(())
}

fn append_shapefile(
    package: &mut GeoPackage,
    input: &Utf8Path,
    output: &Utf8Path,
) -> Result<(), GeometryError> {
    let declared = ShapeReader::from_path(input)
        .map(|reader| kind_of(reader.header().shape_type))
        .map_err(|err| read_error(input, &err))?;
    if !declared.is_line() {
        return Err(GeometryError::read(
            input,
            io::Error::other(format!("cannot merge {declared} geometries")),
        ));
    }
    let source_file = input.file_stem().unwrap_or(input.as_str());
    package
        .declare_columns(&table_schema(input)?)
        .map_err(|err| GeometryError::write(output, err))?;
    let mut reader = Reader::from_path(input).map_err(|err| read_error(input, &err))?;
    let mut written = 0_usize;
    for entry in reader.iter_shapes_and_records() {
        let (shape, record) = entry.map_err(|err| read_error(input, &err))?;
        let geometry = to_multi_line(shape).ok_or_else(|| {
            GeometryError::read(input, io::Error::other("mixed shape types in a line layer"))
        })?;
        package
            .insert(&geometry, source_file, attributes(record))
            .map_err(|err| GeometryError::write(output, err))?;
        written += 1;
    }
    debug!("appended {written} features from {input}");
    Ok(())
}

/// Attribute columns of the shapefile's `.dbf` table, sorted by name.
fn table_schema(input: &Utf8Path) -> Result<Vec<(String, &'static str)>, GeometryError> {
    let table = dbase::Reader::from_path(input.with_extension("dbf"))
        .map_err(|err| GeometryError::read(input, io::Error::other(err.to_string())))?;
    let mut fields: Vec<(String, &'static str)> = table
        .fields()
        .iter()
        .map(|field| (field.name().to_owned(), column_type(field.field_type())))
        .collect();
    fields.sort_by(|left, right| left.0.cmp(&right.0));
    Ok(fields)
}

/// GeoPackage column type for a dBASE field type.
const fn column_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Character | FieldType::Memo => "TEXT",
        FieldType::Numeric | FieldType::Float | FieldType::Double | FieldType::Currency => {
            "DOUBLE"
        }
        FieldType::Integer => "INTEGER",
        FieldType::Logical => "BOOLEAN",
        FieldType::Date => "DATE",
        FieldType::DateTime => "DATETIME",
    }
}

fn read_error(path: &Utf8Path, err: &shapefile::Error) -> GeometryError {
    GeometryError::read(path, io::Error::other(err.to_string()))
}

fn kind_of(shape_type: ShapeType) -> GeometryKind {
    match shape_type {
        ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => GeometryKind::Point,
        ShapeType::Polyline | ShapeType::PolylineZ | ShapeType::PolylineM => GeometryKind::Line,
        ShapeType::Polygon | ShapeType::PolygonZ | ShapeType::PolygonM => GeometryKind::Polygon,
        ShapeType::Multipoint | ShapeType::MultipointZ | ShapeType::MultipointM => {
            GeometryKind::MultiPoint
        }
        ShapeType::Multipatch => GeometryKind::MultiPatch,
        _ => GeometryKind::Null,
    }
}

/// Line parts need two vertices and finite coordinates; other shapes pass.
fn has_valid_geometry(shape: &Shape) -> bool {
    match shape {
        Shape::Polyline(line) => valid_parts(line.parts(), |point| (point.x, point.y)),
        Shape::PolylineM(line) => valid_parts(line.parts(), |point| (point.x, point.y)),
        Shape::PolylineZ(line) => valid_parts(line.parts(), |point| (point.x, point.y)),
        _ => true,
    }
}

fn valid_parts<P>(parts: &[Vec<P>], xy: impl Fn(&P) -> (f64, f64)) -> bool {
    parts.iter().all(|part| {
        part.len() >= 2
            && part.iter().all(|point| {
                let (x, y) = xy(point);
                x.is_finite() && y.is_finite()
            })
    })
}

fn to_multi_line(shape: Shape) -> Option<MultiLineString<f64>> {
    match shape {
        Shape::Polyline(line) => Some(line_parts(line.parts(), |p| Coord { x: p.x, y: p.y })),
        Shape::PolylineM(line) => Some(line_parts(line.parts(), |p| Coord { x: p.x, y: p.y })),
        Shape::PolylineZ(line) => Some(line_parts(line.parts(), |p| Coord { x: p.x, y: p.y })),
        Shape::NullShape => Some(MultiLineString::new(Vec::new())),
        _ => None,
    }
}

fn line_parts<P>(parts: &[Vec<P>], coord: impl Fn(&P) -> Coord<f64>) -> MultiLineString<f64> {
    MultiLineString::new(
        parts
            .iter()
            .map(|part| LineString::new(part.iter().map(&coord).collect()))
            .collect(),
    )
}

/// Attribute values sorted by field name.
fn attributes(record: Record) -> Vec<(String, Value)> {
    let mut fields: Vec<(String, Value)> = record
        .into_iter()
        .map(|(name, value)| (name, attribute_value(value)))
        .collect();
    fields.sort_by(|left, right| left.0.cmp(&right.0));
    fields
}

fn attribute_value(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(text) => {
            text.map_or(Value::Null, |value| Value::Text(value.trim_end().to_owned()))
        }
        FieldValue::Memo(text) => Value::Text(text),
        FieldValue::Numeric(number) => number.map_or(Value::Null, Value::Real),
        FieldValue::Float(number) => number.map_or(Value::Null, |n| Value::Real(f64::from(n))),
        FieldValue::Double(number) => Value::Real(number),
        FieldValue::Integer(number) => Value::Integer(i64::from(number)),
        FieldValue::Logical(flag) => flag.map_or(Value::Null, |f| Value::Integer(i64::from(f))),
        FieldValue::Currency(amount) => Value::Real(amount),
        FieldValue::Date(date) => date.map_or(Value::Null, |day| Value::Text(iso_date(&day))),
        FieldValue::DateTime(stamp) => {
            let time = stamp.time();
            Value::Text(format!(
                "{}T{:02}:{:02}:{:02}Z",
                iso_date(&stamp.date()),
                time.hours(),
                time.minutes(),
                time.seconds()
            ))
        }
    }
}

/// `YYYY-MM-DD`, the GeoPackage `DATE` encoding.
fn iso_date(date: &Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}
