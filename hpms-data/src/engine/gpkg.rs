//! Minimal GeoPackage writer for a single MULTILINESTRING feature table.
//!
//! The file follows GeoPackage 1.3: the three core metadata tables, one
//! feature table with an autoincrement `fid`, a `geom` column holding
//! GeoPackage binary geometries and attribute columns declared from each
//! input's table schema.

use std::collections::HashMap;

use camino::Utf8Path;
use geo::{BoundingRect, Coord, MultiLineString, Rect};
use rusqlite::{Connection, params, params_from_iter, types::Value};

const APPLICATION_ID: i32 = 0x4750_4B47;
const USER_VERSION: i32 = 10_300;
const CUSTOM_SRS_ID: i32 = 100_000;
const UNDEFINED_SRS_ID: i32 = 0;
const GEOMETRY_COLUMN: &str = "geom";
const SOURCE_COLUMN: &str = "source_file";
const RESERVED_COLUMNS: [&str; 3] = ["fid", GEOMETRY_COLUMN, SOURCE_COLUMN];

const WKB_LINE_STRING: u32 = 2;
const WKB_MULTI_LINE_STRING: u32 = 5;
const WKB_LITTLE_ENDIAN: u8 = 1;
const FLAG_LITTLE_ENDIAN: u8 = 0b0000_0001;
const FLAG_XY_ENVELOPE: u8 = 0b0000_0010;
const FLAG_EMPTY: u8 = 0b0001_0000;

const CORE_SCHEMA: &str = "
    CREATE TABLE gpkg_spatial_ref_sys (
        srs_name TEXT NOT NULL,
        srs_id INTEGER NOT NULL PRIMARY KEY,
        organization TEXT NOT NULL,
        organization_coordsys_id INTEGER NOT NULL,
        definition TEXT NOT NULL,
        description TEXT
    );
    CREATE TABLE gpkg_contents (
        table_name TEXT NOT NULL PRIMARY KEY,
        data_type TEXT NOT NULL,
        identifier TEXT UNIQUE,
        description TEXT DEFAULT '',
        last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
        min_x DOUBLE,
        min_y DOUBLE,
        max_x DOUBLE,
        max_y DOUBLE,
        srs_id INTEGER,
        CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
    );
    CREATE TABLE gpkg_geometry_columns (
        table_name TEXT NOT NULL,
        column_name TEXT NOT NULL,
        geometry_type_name TEXT NOT NULL,
        srs_id INTEGER NOT NULL,
        z TINYINT NOT NULL,
        m TINYINT NOT NULL,
        CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
        CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
        CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys (srs_id)
    );
    INSERT INTO gpkg_spatial_ref_sys VALUES
        ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', 'undefined cartesian coordinate reference system'),
        ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', 'undefined geographic coordinate reference system'),
        ('WGS 84 geodetic', 4326, 'EPSG', 4326,
         'GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]]',
         'longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid');
";

#[derive(Debug)]
struct AttributeColumn {
    name: String,
    quoted: String,
}

/// Open GeoPackage accepting features for one layer.
///
/// Everything is written inside a single transaction that [`GeoPackage::finish`]
/// commits.
#[derive(Debug)]
pub(crate) struct GeoPackage {
    connection: Connection,
    layer: String,
    srs_id: i32,
    columns: Vec<AttributeColumn>,
    by_name: HashMap<String, usize>,
    bounds: Option<Rect<f64>>,
    features: usize,
}

impl GeoPackage {
    /// Create a new GeoPackage at `path` holding an empty `layer`.
    ///
    /// `projection` is the WKT of the inputs' coordinate system, when known.
    pub(crate) fn create(
        path: &Utf8Path,
        layer: &str,
        projection: Option<&str>,
    ) -> rusqlite::Result<Self> {
        let connection = Connection::open(path)?;
        connection.pragma_update(None, "application_id", APPLICATION_ID)?;
        connection.pragma_update(None, "user_version", USER_VERSION)?;
        connection.execute_batch("BEGIN")?;
        connection.execute_batch(CORE_SCHEMA)?;

        let srs_id = match projection {
            Some(definition) => {
                connection.execute(
                    "INSERT INTO gpkg_spatial_ref_sys VALUES (?1, ?2, 'NONE', ?2, ?3, ?4)",
                    params![
                        format!("{layer} source projection"),
                        CUSTOM_SRS_ID,
                        definition.trim(),
                        "copied from the first merged shapefile",
                    ],
                )?;
                CUSTOM_SRS_ID
            }
            None => UNDEFINED_SRS_ID,
        };

        let table = quote_identifier(layer);
        connection.execute_batch(&format!(
            "CREATE TABLE {table} (
                fid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                {GEOMETRY_COLUMN} MULTILINESTRING,
                {SOURCE_COLUMN} TEXT
            )"
        ))?;
        connection.execute(
            "INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id)
             VALUES (?1, 'features', ?1, ?2)",
            params![layer, srs_id],
        )?;
        connection.execute(
            "INSERT INTO gpkg_geometry_columns VALUES (?1, ?2, 'MULTILINESTRING', ?3, 0, 0)",
            params![layer, GEOMETRY_COLUMN, srs_id],
        )?;

        Ok(Self {
            connection,
            layer: layer.to_owned(),
            srs_id,
            columns: Vec::new(),
            by_name: HashMap::new(),
            bounds: None,
            features: 0,
        })
    }

    /// Append one feature, adding any attribute columns not seen before.
    ///
    /// Attribute names match existing columns case-insensitively.
    pub(crate) fn insert(
        &mut self,
        geometry: &MultiLineString<f64>,
        source_file: &str,
        attributes: Vec<(String, Value)>,
    ) -> rusqlite::Result<()> {
        let mut column_list = vec![
            quote_identifier(GEOMETRY_COLUMN),
            quote_identifier(SOURCE_COLUMN),
        ];
        let mut values = vec![
            Value::Blob(encode_geometry(geometry, self.srs_id)),
            Value::Text(source_file.to_owned()),
        ];
        let mut used = Vec::new();
        for (name, value) in attributes {
            let index = self.column_for(&name, &value)?;
            if used.contains(&index) {
                continue;
            }
            let Some(column) = self.columns.get(index) else {
                continue;
            };
            used.push(index);
            column_list.push(column.quoted.clone());
            values.push(value);
        }

        let placeholders = (1..=values.len())
            .map(|position| format!("?{position}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote_identifier(&self.layer),
            column_list.join(", ")
        );
        self.connection
            .prepare_cached(&sql)?
            .execute(params_from_iter(values))?;

        self.bounds = merge_bounds(self.bounds, geometry.bounding_rect());
        self.features += 1;
        Ok(())
    }

    /// Record the layer extent, commit, and return the attribute column names.
    pub(crate) fn finish(self) -> rusqlite::Result<(usize, Vec<String>)> {
        if let Some(bounds) = self.bounds {
            let min = bounds.min();
            let max = bounds.max();
            self.connection.execute(
                "UPDATE gpkg_contents SET min_x = ?1, min_y = ?2, max_x = ?3, max_y = ?4
                 WHERE table_name = ?5",
                params![min.x, min.y, max.x, max.y, self.layer],
            )?;
        }
        self.connection.execute_batch("COMMIT")?;
        let fields = self.columns.into_iter().map(|column| column.name).collect();
        Ok((self.features, fields))
    }

    /// Add a column for every `(name, declared_type)` pair not already present.
    /// Existing columns keep the type they were created with.
    pub(crate) fn declare_columns(&mut self, fields: &[(String, &str)]) -> rusqlite::Result<()> {
        for (name, declared_type) in fields {
            self.ensure_column(name, declared_type)?;
        }
        Ok(())
    }

    fn column_for(&mut self, name: &str, value: &Value) -> rusqlite::Result<usize> {
        self.ensure_column(name, sql_type(value))
    }

    fn ensure_column(&mut self, name: &str, declared_type: &str) -> rusqlite::Result<usize> {
        let column_name = if RESERVED_COLUMNS
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
        {
            format!("{name}_attr")
        } else {
            name.to_owned()
        };
        let key = column_name.to_lowercase();
        if let Some(index) = self.by_name.get(&key) {
            return Ok(*index);
        }

        let quoted = quote_identifier(&column_name);
        self.connection.execute_batch(&format!(
            "ALTER TABLE {} ADD COLUMN {quoted} {declared_type}",
            quote_identifier(&self.layer),
        ))?;
        let index = self.columns.len();
        self.columns.push(AttributeColumn {
            name: column_name,
            quoted,
        });
        self.by_name.insert(key, index);
        Ok(index)
    }
}

fn sql_type(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "INTEGER",
        Value::Real(_) => "DOUBLE",
        Value::Blob(_) => "BLOB",
        Value::Text(_) | Value::Null => "TEXT",
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn merge_bounds(lhs: Option<Rect<f64>>, rhs: Option<Rect<f64>>) -> Option<Rect<f64>> {
    match (lhs, rhs) {
        (Some(left), Some(right)) => {
            let left_min = left.min();
            let left_max = left.max();
            let right_min = right.min();
            let right_max = right.max();

            Some(Rect::new(
                Coord {
                    x: left_min.x.min(right_min.x),
                    y: left_min.y.min(right_min.y),
                },
                Coord {
                    x: left_max.x.max(right_max.x),
                    y: left_max.y.max(right_max.y),
                },
            ))
        }
        (Some(bounds), None) | (None, Some(bounds)) => Some(bounds),
        (None, None) => None,
    }
}

/// Encode `geometry` as a GeoPackage binary blob: the `GP` header with an
/// XY envelope (or the empty flag) followed by little-endian WKB.
pub(crate) fn encode_geometry(geometry: &MultiLineString<f64>, srs_id: i32) -> Vec<u8> {
    let envelope = geometry.bounding_rect();
    let mut blob = Vec::with_capacity(64);
    blob.extend_from_slice(b"GP");
    blob.push(0);
    let flags = match envelope {
        Some(_) => FLAG_LITTLE_ENDIAN | FLAG_XY_ENVELOPE,
        None => FLAG_LITTLE_ENDIAN | FLAG_EMPTY,
    };
    blob.push(flags);
    blob.extend_from_slice(&srs_id.to_le_bytes());
    if let Some(rect) = envelope {
        for value in [rect.min().x, rect.max().x, rect.min().y, rect.max().y] {
            blob.extend_from_slice(&value.to_le_bytes());
        }
    }

    blob.push(WKB_LITTLE_ENDIAN);
    blob.extend_from_slice(&WKB_MULTI_LINE_STRING.to_le_bytes());
    blob.extend_from_slice(&wkb_count(geometry.0.len()).to_le_bytes());
    for line in &geometry.0 {
        blob.push(WKB_LITTLE_ENDIAN);
        blob.extend_from_slice(&WKB_LINE_STRING.to_le_bytes());
        blob.extend_from_slice(&wkb_count(line.0.len()).to_le_bytes());
        for coord in &line.0 {
            blob.extend_from_slice(&coord.x.to_le_bytes());
            blob.extend_from_slice(&coord.y.to_le_bytes());
        }
    }
    blob
}

fn wkb_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
