//! Loaders for RESGen's `.rfa` ("res file addition") text format, used both
//! for supplemental manifest content and for resource exclude lists.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::err::{Error, Result};
use crate::resource_name::has_extension;

pub const RFA_EXTENSION: &str = ".rfa";

/// Appends the conventional `.rfa` extension when the argument lacks it.
pub fn with_rfa_extension(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if has_extension(&s, RFA_EXTENSION) {
        path.to_path_buf()
    } else {
        PathBuf::from(format!("{s}{RFA_EXTENSION}"))
    }
}

/// Loads a resource exclude list.
///
/// One entry per line; lines that are blank after trimming or start with
/// `//` are skipped, backslashes are normalized. Keys are lowercased,
/// values keep the casing written in the file. Entries name resources, not
/// maps.
pub fn load_exclude_list(path: &Path) -> Result<HashMap<String, String>> {
    let path = with_rfa_extension(path);
    let contents = fs::read_to_string(&path).map_err(|source| Error::FailedToOpenFile {
        path: path.clone(),
        source,
    })?;

    let mut excludes = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let entry = line.replace('\\', "/");
        excludes.insert(entry.to_lowercase(), entry);
    }

    Ok(excludes)
}

/// Loads supplemental res content, appended verbatim to every written
/// manifest.
pub fn load_supplement(path: &Path) -> Result<String> {
    let path = with_rfa_extension(path);
    fs::read_to_string(&path).map_err(|source| Error::FailedToOpenFile { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_appends_missing_extension() {
        assert_eq!(
            with_rfa_extension(Path::new("excludes")),
            PathBuf::from("excludes.rfa")
        );
        assert_eq!(
            with_rfa_extension(Path::new("excludes.rfa")),
            PathBuf::from("excludes.rfa")
        );
        assert_eq!(
            with_rfa_extension(Path::new("EXCLUDES.RFA")),
            PathBuf::from("EXCLUDES.RFA")
        );
    }

    #[test]
    fn test_parses_exclude_entries() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("server.rfa");
        std::fs::write(
            &list,
            "// standard server content\n\nModels\\Player.mdl  \nhalflife.wad\n",
        )
        .unwrap();

        let excludes = load_exclude_list(&list).unwrap();
        assert_eq!(excludes.len(), 2);
        assert_eq!(
            excludes.get("models/player.mdl"),
            Some(&"Models/Player.mdl".to_string())
        );
        assert_eq!(excludes.get("halflife.wad"), Some(&"halflife.wad".to_string()));
    }

    #[test]
    fn test_missing_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        match load_exclude_list(&dir.path().join("nope")) {
            Err(Error::FailedToOpenFile { .. }) => {}
            other => panic!("expected open error, got {other:?}"),
        }
    }
}
