use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, info, trace, warn};
use walkdir::WalkDir;

use crate::pak;
use crate::resource_name::normalize_key;

/// Extensions that can appear in a res file and are therefore worth
/// indexing. Sounds are deliberately absent: wav references resolve by
/// convention-based path, not by disk presence.
pub const RESOURCE_EXTENSIONS: [&str; 6] = ["mdl", "spr", "bmp", "tga", "txt", "wad"];

const PAK_EXTENSION: &str = "pak";
const FALLBACK_DIR: &str = "valve";

/// Case-insensitive index of every resource available on disk or inside a
/// PAK archive, built once per run and read-only afterwards.
///
/// Keys are lowercased slash-normalized paths; values keep the casing found
/// on disk so case-match mode can restore it. On duplicate names across
/// roots or archives the first one seen wins, which makes the primary root
/// take precedence over the `valve` fallback.
#[derive(Debug, Default)]
pub struct ResourceCatalog {
    resources: HashMap<String, String>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        ResourceCatalog::default()
    }

    /// Walks every search root, indexing allow-listed files and expanding
    /// any PAK archives found along the way. Unreadable directories or
    /// archives are reported and skipped; catalog building never fails.
    pub fn build(roots: &[PathBuf], check_paks: bool) -> ResourceCatalog {
        let mut catalog = ResourceCatalog::new();

        for root in roots {
            info!("Searching {} for resources", root.display());
            catalog.scan_root(root, check_paks);
        }

        debug!("Resource catalog holds {} entries", catalog.len());
        catalog
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Looks up a normalized key, yielding the on-disk casing.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.resources.get(key).map(String::as_str)
    }

    pub(crate) fn insert_first_seen(&mut self, display: String) {
        self.resources.entry(normalize_key(&display)).or_insert(display);
    }

    fn scan_root(&mut self, root: &Path, check_paks: bool) {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Error walking {}: {err}", root.display());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let rel = match entry.path().strip_prefix(root) {
                Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                Err(_) => continue,
            };

            let Some((_, ext)) = rel.rsplit_once('.') else {
                continue;
            };
            let ext = ext.to_lowercase();

            if RESOURCE_EXTENSIONS.contains(&ext.as_str()) {
                debug!("Added \"{rel}\" to resource list");
                self.insert_first_seen(rel);
            } else if ext == PAK_EXTENSION && check_paks {
                self.scan_pak(entry.path());
            } else {
                trace!("Ignoring \"{rel}\"");
            }
        }
    }

    fn scan_pak(&mut self, path: &Path) {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                warn!("Could not open pakfile {}: {err}", path.display());
                return;
            }
        };

        let entries = match pak::read_directory(&mut file) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Skipping pakfile {}: {err}", path.display());
                return;
            }
        };

        info!(
            "Scanning pak file {} for resources ({} files in pak)",
            path.display(),
            entries.len()
        );

        for entry in entries {
            let name = entry.name.replace('\\', "/");
            let Some((_, ext)) = name.rsplit_once('.') else {
                continue;
            };
            if RESOURCE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                debug!("Added \"{name}\" to resource list");
                self.insert_first_seen(name);
            }
        }
    }
}

/// The search roots for a mod path: the path itself plus the sibling
/// `valve` directory, unless the path already points at it.
pub fn resource_roots(mod_path: &Path) -> Vec<PathBuf> {
    let mut roots = vec![mod_path.to_path_buf()];

    let is_fallback = mod_path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().eq_ignore_ascii_case(FALLBACK_DIR));

    if !is_fallback {
        let fallback = match mod_path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => PathBuf::from(FALLBACK_DIR),
            Some(parent) => parent.join(FALLBACK_DIR),
            None => mod_path.join("..").join(FALLBACK_DIR),
        };
        roots.push(fallback);
    }

    roots
}
