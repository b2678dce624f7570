use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::bsp::{self, BspHeader};
use crate::catalog::{self, ResourceCatalog};
use crate::ent_tokenizer::EntTokenizer;
use crate::err::{Error, Result};
use crate::mdl;
use crate::resource_name::{SKY_PREFIX, SKY_SUFFIXES, has_extension, sanitize};
use crate::rfa;
use crate::wad;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const WAD_EXT: &str = ".wad";
const MDL_EXT: &str = ".mdl";

/// Suffix replacing a model's `.mdl` extension to name its companion
/// texture file.
const MDL_COMPANION_SUFFIX: &str = "T.mdl";

/// Per-run behavior toggles, builder style.
#[derive(Debug, Clone)]
pub struct ResGenSettings {
    overwrite: bool,
    lowercase: bool,
    match_case: bool,
    check_paks: bool,
    check_usage: bool,
    preserve_wads: bool,
}

impl Default for ResGenSettings {
    fn default() -> Self {
        ResGenSettings {
            overwrite: false,
            lowercase: false,
            match_case: false,
            check_paks: true,
            check_usage: false,
            preserve_wads: false,
        }
    }
}

impl ResGenSettings {
    pub fn new() -> Self {
        Default::default()
    }

    /// Overwrite existing res files instead of skipping the map.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Lowercase the display form of every res entry.
    pub fn lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    /// Rewrite display names with the casing found on disk.
    pub fn match_case(mut self, match_case: bool) -> Self {
        self.match_case = match_case;
        self
    }

    /// Expand PAK archives into the resource catalog.
    pub fn check_paks(mut self, check_paks: bool) -> Self {
        self.check_paks = check_paks;
        self
    }

    /// Parse WAD files for used textures and MDL files for external
    /// textures.
    pub fn check_usage(mut self, check_usage: bool) -> Self {
        self.check_usage = check_usage;
        self
    }

    /// Keep WAD files in the manifest even when no needed texture uses
    /// them.
    pub fn preserve_wads(mut self, preserve_wads: bool) -> Self {
        self.preserve_wads = preserve_wads;
        self
    }
}

/// Outcome of processing one map. Hard failures (unreadable or corrupt
/// input, nothing produced) surface as [`Error`]s instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResStatus {
    /// Manifest complete (or legitimately empty).
    Complete,
    /// Manifest written, but one or more required resources were missing.
    MissingResources,
}

/// The manifest generator: drives per-map extraction and resolution.
///
/// Catalog, exclude list and WAD texture cache persist across the whole
/// run; everything else is rebuilt per map, so results never depend on
/// processing order.
pub struct ResGen {
    settings: ResGenSettings,
    resource_paths: Vec<PathBuf>,
    catalog: ResourceCatalog,
    exclude_list: HashMap<String, String>,
    check_excludes: bool,
    supplement: String,
    wad_cache: HashMap<String, HashSet<String>>,
    // Per-map state.
    manifest: BTreeMap<String, String>,
    wad_textures: BTreeMap<String, String>,
}

impl ResGen {
    pub fn new(settings: ResGenSettings) -> Self {
        ResGen {
            settings,
            resource_paths: Vec::new(),
            catalog: ResourceCatalog::new(),
            exclude_list: HashMap::new(),
            check_excludes: false,
            supplement: String::new(),
            wad_cache: HashMap::new(),
            manifest: BTreeMap::new(),
            wad_textures: BTreeMap::new(),
        }
    }

    /// Loads supplemental res content appended verbatim to every written
    /// manifest.
    pub fn load_supplement(&mut self, path: &Path) -> Result<()> {
        self.supplement = rfa::load_supplement(path)?;
        Ok(())
    }

    /// Loads (and merges) a resource exclude list, enabling the exclude
    /// pass.
    pub fn load_exclude_list(&mut self, path: &Path) -> Result<()> {
        let excludes = rfa::load_exclude_list(path)?;
        info!("Loaded resource exclude list {}", path.display());
        self.exclude_list.extend(excludes);
        self.check_excludes = true;
        Ok(())
    }

    /// Indexes the mod path (and its `valve` fallback) so resolution can
    /// check resource existence.
    pub fn build_catalog(&mut self, mod_path: &Path) {
        self.resource_paths = catalog::resource_roots(mod_path);
        self.catalog = ResourceCatalog::build(&self.resource_paths, self.settings.check_paks);
    }

    /// Creates the `.res` file next to one map.
    ///
    /// Format and grammar errors abort only this map; the caller moves on
    /// to the next one.
    pub fn make_res(&mut self, map: &Path) -> Result<ResStatus> {
        let res_path = map.with_extension("res");
        let map_name = map
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!("Creating .res file {}", res_path.display());

        let file_exists = res_path.exists();
        if file_exists && !self.settings.overwrite {
            return Err(Error::ResFileExists { path: res_path });
        }

        // Per-map state; should already be clear, but make sure.
        self.manifest.clear();
        self.wad_textures.clear();

        let mut file = File::open(map).map_err(|source| Error::FailedToOpenFile {
            path: map.to_path_buf(),
            source,
        })?;
        let header = BspHeader::from_stream(&mut file)?;
        let entdata = bsp::read_entity_data(&mut file, &header)?;

        if self.settings.check_usage && !self.resource_paths.is_empty() {
            self.wad_textures = bsp::read_wad_texture_names(&mut file, &header)?;
        }
        drop(file);

        self.extract_resources(entdata)?;
        self.add_overview_files(map, &map_name);

        let mut status = ResStatus::Complete;

        if !self.resource_paths.is_empty() && self.resolve() == ResStatus::MissingResources {
            status = ResStatus::MissingResources;
        }

        if self.check_excludes {
            self.apply_excludes();
        }

        // Whatever is left in the still-needed set was claimed by no WAD.
        if self.settings.check_usage
            && !self.resource_paths.is_empty()
            && !self.wad_textures.is_empty()
        {
            status = ResStatus::MissingResources;
            for display in self.wad_textures.values() {
                info!("Texture not found in wad files: {display}");
            }
        }

        if self.manifest.is_empty() && self.supplement.is_empty() {
            info!("No resources were found for \"{map_name}.res\"");
            if file_exists {
                // Getting here with an existing file implies overwrite mode.
                fs::remove_file(&res_path)?;
                info!("Deleted existing res file {}", res_path.display());
            }
            return Ok(status);
        }

        self.write_res(&res_path, &map_name)?;

        self.manifest.clear();
        self.wad_textures.clear();

        Ok(status)
    }

    /// Walks the entity text, collecting raw resource names.
    ///
    /// The first block (worldspawn) additionally contributes the WAD list
    /// and the six skybox faces; every value anywhere is checked for a
    /// resource extension.
    fn extract_resources(&mut self, entdata: Vec<u8>) -> Result<()> {
        let mut tokenizer = EntTokenizer::new(entdata);
        let mut found_any = false;

        loop {
            let Some(pair) = tokenizer.next_pair()? else {
                break;
            };
            found_any = true;

            let is_wad_key = pair.key == b"wad";
            let is_sky_key = pair.key == b"skyname";
            let first_block_value = if is_wad_key || is_sky_key {
                Some(pair.value_str().into_owned())
            } else {
                None
            };
            let ext_resource = resource_from_value(pair.value);

            // Sampled after the pair: the closing brace of this pair's own
            // block has not been consumed yet.
            let in_first_block = tokenizer.blocks_read() == 0;

            if in_first_block {
                if let Some(value) = first_block_value {
                    if is_wad_key {
                        self.add_wad_list(&value);
                    } else {
                        for suffix in SKY_SUFFIXES {
                            self.add_res(&value, Some(SKY_PREFIX), Some(suffix));
                        }
                    }
                }
            }

            if let Some((value, prefix)) = ext_resource {
                self.add_res(&value, prefix, None);
            }
        }

        if !found_any {
            return Err(Error::NoEntityData);
        }

        Ok(())
    }

    /// Adds one resource to the manifest, deduplicated by normalized name.
    fn add_res(&mut self, res: &str, prefix: Option<&str>, suffix: Option<&str>) {
        let mut res = sanitize(res);
        if res.is_empty() {
            return;
        }

        if let Some(prefix) = prefix {
            res.insert_str(0, prefix);
        }
        if let Some(suffix) = suffix {
            res.push_str(suffix);
        }

        if self.settings.lowercase {
            res = res.to_lowercase();
        }

        debug!("{res}");

        // Overwriting a previous entry is fine; it only differs by case.
        self.manifest.insert(res.to_lowercase(), res);
    }

    /// Splits a worldspawn `wad` value on `;` and adds each WAD by its
    /// bare file name.
    fn add_wad_list(&mut self, list: &str) {
        for part in list.split(';') {
            if part.is_empty() {
                continue;
            }
            let part = part.replace('\\', "/");
            let basename = match part.rfind('/') {
                Some(pos) => &part[pos + 1..],
                None => part.as_str(),
            };
            self.add_res(basename, None, None);
        }
    }

    /// Adds the overview description and image when both exist next to the
    /// maps folder.
    fn add_overview_files(&mut self, map: &Path, map_name: &str) {
        let base_folder = map.parent().unwrap_or_else(|| Path::new(""));
        let overview = base_folder.join("..").join("overviews");

        if !overview.join(format!("{map_name}.txt")).exists() {
            return;
        }

        if overview.join(format!("{map_name}.tga")).exists() {
            self.add_res(map_name, Some("overviews/"), Some(".tga"));
            self.add_res(map_name, Some("overviews/"), Some(".txt"));
        } else if overview.join(format!("{map_name}.bmp")).exists() {
            self.add_res(map_name, Some("overviews/"), Some(".bmp"));
            self.add_res(map_name, Some("overviews/"), Some(".txt"));
        }
    }

    /// Cross-references the manifest against the catalog.
    ///
    /// Entries are visited in sorted normalized-name order, which makes the
    /// first-match-wins texture claiming between WADs deliberate rather
    /// than a container-order accident. Companion textures found for models
    /// are queued and inserted after the pass so the iteration snapshot
    /// stays valid.
    fn resolve(&mut self) -> ResStatus {
        let mut status = ResStatus::Complete;

        let entries: Vec<(String, String)> = self
            .manifest
            .iter()
            .map(|(key, display)| (key.clone(), display.clone()))
            .collect();
        let mut companions: Vec<String> = Vec::new();

        for (key, mut display) in entries {
            let found = self.catalog.get(&key).map(str::to_string);

            let Some(disk_name) = found else {
                if self.exclude_list.contains_key(&key) {
                    debug!("Resource is excluded: {display}");
                } else if !has_extension(&key, WAD_EXT) {
                    info!("Resource file not found: {display}");
                    status = ResStatus::MissingResources;
                } else {
                    // A missing WAD never blocks completion.
                    debug!("Resource file not found: {display}");
                }
                self.manifest.remove(&key);
                continue;
            };

            if self.settings.match_case {
                self.manifest.insert(key.clone(), disk_name.clone());
                display = disk_name.clone();
            }

            if !self.settings.check_usage {
                continue;
            }

            if has_extension(&key, WAD_EXT) {
                if !self.check_wad_use(&key, &disk_name) {
                    debug!("WAD file not used: {display}");
                    if !self.settings.preserve_wads {
                        self.manifest.remove(&key);
                    }
                }
            } else if has_extension(&key, MDL_EXT) && self.check_model_ext_texture(&disk_name) {
                let stem = &display[..display.len() - MDL_EXT.len()];
                let companion = format!("{stem}{MDL_COMPANION_SUFFIX}");

                if !self.manifest.contains_key(&companion.to_lowercase())
                    && !companions.iter().any(|c| c.eq_ignore_ascii_case(&companion))
                {
                    debug!("MDL texture file added: {companion}");
                    companions.push(companion);
                }
            }
        }

        for companion in companions {
            self.manifest.insert(companion.to_lowercase(), companion);
        }

        status
    }

    /// Drops every manifest entry named by a loaded exclude list.
    fn apply_excludes(&mut self) {
        let excludes = &self.exclude_list;
        self.manifest.retain(|key, display| {
            if excludes.contains_key(key) {
                debug!("Resource is excluded: {display}");
                false
            } else {
                true
            }
        });
    }

    /// Checks whether a WAD contributes any still-needed texture, claiming
    /// the ones it does.
    ///
    /// The lump directory is memoized per run; a WAD that cannot be read is
    /// cached as an empty set so it stays marked unused without retrying.
    fn check_wad_use(&mut self, key: &str, disk_name: &str) -> bool {
        if !self.wad_cache.contains_key(key) {
            let textures = match self.open_first_valid_path(disk_name) {
                Some((path, mut file)) => match wad::read_texture_names(&mut file) {
                    Ok(textures) => textures,
                    Err(err) => {
                        warn!("WAD file {}: {err}", path.display());
                        HashSet::new()
                    }
                },
                None => {
                    warn!("Failed to open WAD file \"{disk_name}\"");
                    HashSet::new()
                }
            };
            self.wad_cache.insert(key.to_string(), textures);
        }

        let Some(textures) = self.wad_cache.get(key) else {
            return false;
        };

        let before = self.wad_textures.len();
        self.wad_textures.retain(|name, _| !textures.contains(name));
        before != self.wad_textures.len()
    }

    /// True when the model declares no embedded texture data.
    fn check_model_ext_texture(&self, disk_name: &str) -> bool {
        match self.open_first_valid_path(disk_name) {
            Some((path, mut file)) => match mdl::has_external_texture(&mut file) {
                Ok(external) => external,
                Err(err) => {
                    warn!("MDL file {}: {err}", path.display());
                    false
                }
            },
            None => {
                warn!("Failed to open MDL file \"{disk_name}\"");
                false
            }
        }
    }

    /// Tries the resource name against each search root in order.
    fn open_first_valid_path(&self, name: &str) -> Option<(PathBuf, File)> {
        for root in &self.resource_paths {
            let path = root.join(name);
            if let Ok(file) = File::open(&path) {
                return Some((path, file));
            }
        }
        None
    }

    fn write_res(&self, res_path: &Path, map_name: &str) -> Result<()> {
        let file = File::create(res_path).map_err(|source| Error::FailedToOpenFile {
            path: res_path.to_path_buf(),
            source,
        })?;
        let mut out = BufWriter::new(file);

        writeln!(out, "// {map_name}.res - created with RESGen v{VERSION}.")?;
        writeln!(out, "// RESGen is made by Jeroen \"ShadowLord\" Bogers,")?;
        writeln!(out, "// with serveral improvements and additions by Zero3Cool.")?;
        writeln!(out, "// For more info go to http://resgen.hltools.com")?;

        writeln!(out, "\n// .res entries ({}):", self.manifest.len())?;
        for display in self.manifest.values() {
            writeln!(out, "{display}")?;
        }

        if !self.supplement.is_empty() {
            writeln!(out, "\n// Added .res content:\n{}", self.supplement)?;
        }

        out.flush()?;
        Ok(())
    }
}

/// Recognizes a value by its trailing `.xyz` extension; wavs get the
/// conventional `sound/` prefix.
///
/// Needs at least 5 bytes, assuming the name is `[alpha][.][alpha]{3}`;
/// this is fast rather than thorough, matching on the last four bytes only.
fn resource_from_value(value: &[u8]) -> Option<(String, Option<&'static str>)> {
    if value.len() < 5 || value[value.len() - 4] != b'.' {
        return None;
    }

    let ext = [
        value[value.len() - 3].to_ascii_lowercase(),
        value[value.len() - 2].to_ascii_lowercase(),
        value[value.len() - 1].to_ascii_lowercase(),
    ];

    let prefix = match &ext {
        b"mdl" | b"spr" | b"bmp" | b"tga" => None,
        b"wav" => Some("sound/"),
        _ => return None,
    };

    Some((String::from_utf8_lossy(value).into_owned(), prefix))
}
