//! Compress the data store into the distributable archive.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use crate::PackageError;

/// Summary of a written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    /// Archive that was written.
    pub archive_path: Utf8PathBuf,
    /// Entry names, relative to the data store root.
    pub entries: Vec<String>,
    /// Uncompressed bytes stored.
    pub bytes: u64,
}

/// Zip every file beneath `data_store` into `archive`, replacing it.
///
/// Entry names are relative to `data_store` and use `/` separators; entries
/// appear in file-name order and are deflate-compressed.
pub fn package_data_store(
    data_store: &Utf8Path,
    archive: &Utf8Path,
) -> Result<PackageReport, PackageError> {
    let file = hpms_fs::create_file(archive).map_err(|source| PackageError::Write {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = Vec::new();
    let mut bytes = 0_u64;

    for entry in WalkDir::new(data_store).sort_by_file_name() {
        let entry = entry.map_err(|source| PackageError::Walk {
            path: data_store.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = Utf8Path::from_path(entry.path()).ok_or_else(|| PackageError::NonUtf8Path {
            path: entry.path().to_string_lossy().into_owned(),
        })?;
        let name = entry_name(data_store, path)?;
        writer
            .start_file(name.as_str(), options)
            .map_err(|source| PackageError::Encode {
                path: archive.to_path_buf(),
                source,
            })?;
        let mut input = std::fs::File::open(path).map_err(|source| PackageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        bytes += io::copy(&mut input, &mut writer).map_err(|source| PackageError::Write {
            path: archive.to_path_buf(),
            source,
        })?;
        debug!("archived {name}");
        entries.push(name);
    }

    let mut file = writer.finish().map_err(|source| PackageError::Encode {
        path: archive.to_path_buf(),
        source,
    })?;
    file.flush().map_err(|source| PackageError::Write {
        path: archive.to_path_buf(),
        source,
    })?;
    info!("Packaged {} files into {archive}", entries.len());
    Ok(PackageReport {
        archive_path: archive.to_path_buf(),
        entries,
        bytes,
    })
}

fn entry_name(root: &Utf8Path, path: &Utf8Path) -> Result<String, PackageError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| PackageError::NonUtf8Path {
            path: path.to_string(),
        })?;
    Ok(relative
        .components()
        .map(|component| component.as_str())
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::{fs, io::Read};
    use tempfile::TempDir;
    use zip::ZipArchive;

    struct Scratch {
        _dir: TempDir,
        root: Utf8PathBuf,
    }

    #[fixture]
    fn scratch() -> Scratch {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        Scratch { _dir: dir, root }
    }

    #[rstest]
    fn archives_nested_files_with_relative_names(scratch: Scratch) {
        let store = scratch.root.join("hpms_workspace");
        fs::create_dir_all(store.join("nested")).expect("create store");
        fs::write(store.join("HPMS_National_2015.gpkg"), b"gpkg").expect("write dataset");
        fs::write(store.join("nested/notes.txt"), b"notes").expect("write nested");
        let archive = scratch.root.join("HPMS_National_2015.zip");

        let report = package_data_store(&store, &archive).expect("package");

        assert_eq!(report.entries, ["HPMS_National_2015.gpkg", "nested/notes.txt"]);
        assert_eq!(report.bytes, 9);
        let mut zip = ZipArchive::new(fs::File::open(&archive).expect("open archive"))
            .expect("read archive");
        let mut contents = String::new();
        zip.by_name("nested/notes.txt")
            .expect("nested entry")
            .read_to_string(&mut contents)
            .expect("read entry");
        assert_eq!(contents, "notes");
        assert_eq!(
            zip.by_name("HPMS_National_2015.gpkg")
                .expect("dataset entry")
                .compression(),
            CompressionMethod::Deflated
        );
    }

    #[rstest]
    fn replaces_an_existing_archive(scratch: Scratch) {
        let store = scratch.root.join("store");
        fs::create_dir_all(&store).expect("create store");
        fs::write(store.join("a.txt"), b"a").expect("write file");
        let archive = scratch.root.join("out.zip");
        fs::write(&archive, b"stale bytes that are not a zip").expect("write stale");

        package_data_store(&store, &archive).expect("package");

        let zip = ZipArchive::new(fs::File::open(&archive).expect("open archive"))
            .expect("archive is valid");
        assert_eq!(zip.len(), 1);
    }

    #[rstest]
    fn missing_data_store_is_reported(scratch: Scratch) {
        let err = package_data_store(&scratch.root.join("absent"), &scratch.root.join("out.zip"))
            .expect_err("missing store");
        assert!(matches!(err, PackageError::Walk { .. }), "got {err:?}");
    }
}
