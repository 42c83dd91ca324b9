//! Shared fixtures: an in-memory region source and synthetic shapefiles.

use std::{
    cell::RefCell,
    collections::HashMap,
    fs,
    future::Future,
    io::{self, Cursor, Write},
};

use async_trait::async_trait;
use camino::Utf8Path;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polyline};
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use crate::{RegionSource, TransportError};

/// Stub [`RegionSource`] serving archives from memory.
///
/// Unknown URLs answer with HTTP 404. Every request is remembered so tests
/// can assert on network activity.
#[derive(Debug, Default)]
pub struct StubSource {
    archives: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl StubSource {
    /// Construct a source that knows no archives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` for `url`.
    #[must_use]
    pub fn with_archive(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.archives.insert(url.into(), bytes);
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl RegionSource for StubSource {
    async fn fetch_archive(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        self.requests.borrow_mut().push(url.to_owned());
        let Some(bytes) = self.archives.get(url) else {
            return Err(TransportError::Http {
                url: url.to_owned(),
                status: 404,
                message: "not found".to_owned(),
            });
        };
        sink.write_all(bytes)
            .map_err(|source| TransportError::Network {
                url: url.to_owned(),
                source,
            })?;
        Ok(u64::try_from(bytes.len()).expect("archive length should fit in u64"))
    }
}

/// Drive `future` to completion on a single-threaded Tokio runtime.
pub fn block_on_for_tests<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("create Tokio runtime")
        .block_on(future)
}

fn route_table() -> TableWriterBuilder {
    let route_id = FieldName::try_from("ROUTE_ID").expect("valid field name");
    TableWriterBuilder::new().add_character_field(route_id, 32)
}

fn route_record(route: &str) -> Record {
    let mut record = Record::default();
    record.insert(
        "ROUTE_ID".to_owned(),
        FieldValue::Character(Some(route.to_owned())),
    );
    record
}

/// Write a polyline shapefile holding `features` two-vertex sections.
///
/// Each feature carries a `ROUTE_ID` attribute of the form `R{index}`.
pub fn write_line_shapefile(path: &Utf8Path, features: usize) -> Result<(), shapefile::Error> {
    let mut writer = shapefile::Writer::from_path(path, route_table())?;
    for index in 0..features {
        let offset = f64::from(u32::try_from(index).expect("feature index should fit in u32"));
        let section = Polyline::new(vec![
            Point::new(-84.0 + offset, 39.0),
            Point::new(-83.5 + offset, 39.5),
        ]);
        writer.write_shape_and_record(&section, &route_record(&format!("R{index}")))?;
    }
    Ok(())
}

/// Write a point shapefile holding `features` points.
pub fn write_point_shapefile(path: &Utf8Path, features: usize) -> Result<(), shapefile::Error> {
    let mut writer = shapefile::Writer::from_path(path, route_table())?;
    for index in 0..features {
        let offset = f64::from(u32::try_from(index).expect("feature index should fit in u32"));
        let point = Point::new(-84.0 + offset, 39.0);
        writer.write_shape_and_record(&point, &route_record(&format!("P{index}")))?;
    }
    Ok(())
}

/// Zip every regular file directly inside `dir` into an in-memory archive.
pub fn zip_directory(dir: &Utf8Path) -> io::Result<Vec<u8>> {
    let mut names: Vec<_> = fs::read_dir(dir)?
        .map(|entry| entry.map(|found| found.path()))
        .collect::<Result<_, _>>()?;
    names.sort();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for path in names.into_iter().filter(|path| path.is_file()) {
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .ok_or_else(|| io::Error::other("archive member names must be UTF-8"))?;
        writer.start_file(name, options).map_err(io::Error::other)?;
        writer.write_all(&fs::read(&path)?)?;
    }
    let cursor = writer.finish().map_err(io::Error::other)?;
    Ok(cursor.into_inner())
}

/// Build a region archive containing a line shapefile named `shapefile_name`.
///
/// The shapefile is written to `scratch`, which must be an empty directory.
pub fn region_archive(
    scratch: &Utf8Path,
    shapefile_name: &str,
    features: usize,
) -> io::Result<Vec<u8>> {
    write_line_shapefile(&scratch.join(shapefile_name), features)
        .map_err(|err| io::Error::other(err.to_string()))?;
    zip_directory(scratch)
}
