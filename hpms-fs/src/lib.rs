//! Capability-based filesystem helpers for the HPMS workspace, built on
//! `cap-std` and `camino`.
#![forbid(unsafe_code)]

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs as cap_fs, fs_utf8};
use std::{fs, io};

/// Return whether `path` names an existing regular file.
///
/// A missing file or a missing ancestor directory both report `false`;
/// other I/O failures are returned.
pub fn is_existing_file(path: &Utf8Path) -> io::Result<bool> {
    let Some(name) = path.file_name() else {
        return Ok(false);
    };
    let dir = match fs_utf8::Dir::open_ambient_dir(parent_or_current(path), ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Create `path` and any missing ancestors.
pub fn create_dir_all(path: &Utf8Path) -> io::Result<()> {
    let (anchor, relative) = split_anchor(path)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    anchor.create_dir_all(&relative)
}

/// Create or truncate the file at `path`. The parent directory must exist.
pub fn create_file(path: &Utf8Path) -> io::Result<fs::File> {
    let name = file_name(path)?;
    let dir = cap_fs::Dir::open_ambient_dir(parent_or_current(path), ambient_authority())?;
    dir.create(name).map(cap_fs::File::into_std)
}

/// Remove the file at `path`, returning whether anything was removed.
pub fn remove_file_if_exists(path: &Utf8Path) -> io::Result<bool> {
    let name = file_name(path)?;
    let dir = match fs_utf8::Dir::open_ambient_dir(parent_or_current(path), ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.remove_file(name) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Read `path` as UTF-8 text, returning `None` when it does not exist.
pub fn read_optional_string(path: &Utf8Path) -> io::Result<Option<String>> {
    let name = file_name(path)?;
    let dir = match fs_utf8::Dir::open_ambient_dir(parent_or_current(path), ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    match dir.read_to_string(name) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

fn file_name(path: &Utf8Path) -> io::Result<&str> {
    path.file_name()
        .ok_or_else(|| io::Error::other(format!("{path} should include a file name")))
}

fn parent_or_current(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    }
}

/// Split `path` into an ambient directory handle and the remainder below it.
///
/// The anchor absorbs the root (and drive prefix on Windows) of absolute
/// paths, and any leading `.` or `..` of relative ones, because cap-std
/// refuses to resolve paths that climb out of a directory handle.
fn split_anchor(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let mut anchor = Utf8PathBuf::new();
    let mut relative = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::Prefix(_) | Utf8Component::RootDir => anchor.push(component.as_str()),
            Utf8Component::CurDir | Utf8Component::ParentDir
                if relative.as_str().is_empty() =>
            {
                anchor.push(component.as_str());
            }
            other => relative.push(other.as_str()),
        }
    }
    if anchor.as_str().is_empty() {
        anchor.push(".");
    }
    let dir = fs_utf8::Dir::open_ambient_dir(&anchor, ambient_authority())?;
    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn scratch() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        (dir, root)
    }

    #[rstest]
    fn reports_existing_files_only(scratch: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = scratch;
        let file = root.join("Ohio_Sections.shp");
        fs::write(&file, b"shp").expect("write file");
        assert!(is_existing_file(&file).expect("inspect file"));
        assert!(!is_existing_file(&root).expect("inspect directory"));
        assert!(!is_existing_file(&root.join("missing.shp")).expect("inspect missing"));
        assert!(
            !is_existing_file(&root.join("absent").join("x.shp")).expect("inspect missing parent")
        );
    }

    #[rstest]
    fn creates_nested_directories(scratch: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = scratch;
        let nested = root.join("a").join("b").join("c");
        create_dir_all(&nested).expect("create nested");
        assert!(nested.is_dir());
        create_dir_all(&nested).expect("creating twice is harmless");
    }

    #[rstest]
    fn creates_and_removes_files(scratch: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = scratch;
        let target = root.join("out.zip");
        {
            use std::io::Write;
            let mut file = create_file(&target).expect("create file");
            file.write_all(b"zip").expect("write file");
        }
        assert_eq!(fs::read(&target).expect("read back"), b"zip");
        assert!(remove_file_if_exists(&target).expect("remove"));
        assert!(!remove_file_if_exists(&target).expect("remove again"));
    }

    #[rstest]
    fn reads_optional_text(scratch: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = scratch;
        let prj = root.join("Ohio_Sections.prj");
        assert_eq!(read_optional_string(&prj).expect("read missing"), None);
        fs::write(&prj, "GEOGCS[\"GCS_North_American_1983\"]").expect("write prj");
        let contents = read_optional_string(&prj).expect("read prj");
        assert_eq!(contents.as_deref(), Some("GEOGCS[\"GCS_North_American_1983\"]"));
    }

    #[rstest]
    fn anchors_leading_parent_components() {
        let (_, relative) = split_anchor(Utf8Path::new("../target/work")).expect("anchor parent");
        assert_eq!(relative, "target/work");
    }
}
