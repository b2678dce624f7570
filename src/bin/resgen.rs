use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{debug, info};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::path::{Path, PathBuf};
use std::process::exit;
use walkdir::WalkDir;

use resgen::{ResGen, ResGenSettings, ResStatus};

fn command() -> Command {
    Command::new("RESGen")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Creates .res resource manifests for Half-Life maps")
        .arg(
            Arg::new("MAPS")
                .action(ArgAction::Append)
                .value_name("MAP")
                .help("Map (.bsp) files to process. \".bsp\" is appended when missing."),
        )
        .arg(
            Arg::new("dir")
                .long("dir")
                .short('d')
                .action(ArgAction::Append)
                .value_name("DIR")
                .help("Process every map in this folder. Can be passed multiple times."),
        )
        .arg(
            Arg::new("recursive")
                .long("recursive")
                .short('r')
                .action(ArgAction::SetTrue)
                .help("Recurse into subfolders of folders given with -d."),
        )
        .arg(
            Arg::new("exclude-map")
                .long("exclude-map")
                .short('x')
                .action(ArgAction::Append)
                .value_name("MAP")
                .help("Skip this map. Can be passed multiple times."),
        )
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .short('o')
                .action(ArgAction::SetTrue)
                .help("Overwrite existing res files instead of skipping the map."),
        )
        .arg(
            Arg::new("add-content")
                .long("add-content")
                .short('a')
                .value_name("FILE")
                .help("Append the contents of this .rfa file to every res file."),
        )
        .arg(
            Arg::new("lowercase")
                .long("lowercase")
                .short('l')
                .action(ArgAction::SetTrue)
                .help("Write resource names lowercased."),
        )
        .arg(
            Arg::new("match-case")
                .long("match-case")
                .short('m')
                .action(ArgAction::SetTrue)
                .help("Rewrite resource names with the casing found on disk. Requires -e."),
        )
        .arg(
            Arg::new("mod-path")
                .long("mod-path")
                .short('e')
                .value_name("DIR")
                .help(
                    "Mod folder to verify resources against (e.g. half-life/cstrike). \
                     The sibling valve folder is searched as well. \
                     Resources that cannot be found are left out of the res file.",
                ),
        )
        .arg(
            Arg::new("no-paks")
                .long("no-paks")
                .short('p')
                .action(ArgAction::SetTrue)
                .help("Do not index the contents of PAK files when verifying."),
        )
        .arg(
            Arg::new("check-usage")
                .long("check-usage")
                .short('u')
                .action(ArgAction::SetTrue)
                .help(
                    "Drop WAD files no map texture uses and add the external \
                     texture files of listed models. Requires -e.",
                ),
        )
        .arg(
            Arg::new("preserve-wads")
                .long("preserve-wads")
                .short('n')
                .action(ArgAction::SetTrue)
                .help("With -u, keep unused WAD files listed."),
        )
        .arg(
            Arg::new("exclude-list")
                .long("exclude-list")
                .short('b')
                .action(ArgAction::Append)
                .value_name("FILE")
                .help(
                    "Never list the resources named in this .rfa file. \
                     Can be passed multiple times; the lists merge.",
                ),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("-v - info, -vv - debug, -vvv - trace."),
        )
}

fn init_logging(matches: &ArgMatches) {
    let level = match matches.get_count("verbose") {
        0 => return,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        3 => LevelFilter::Trace,
        _ => {
            eprintln!("using more than -vvv does not affect verbosity level");
            LevelFilter::Trace
        }
    };

    match TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        Ok(_) => {}
        Err(e) => eprintln!("Failed to initialize logging: {e}"),
    }
}

/// Builds the sorted, deduplicated work list from explicit map arguments
/// and `-d` folders.
fn collect_maps(matches: &ArgMatches) -> Result<Vec<PathBuf>> {
    let excludes: Vec<String> = matches
        .get_many::<String>("exclude-map")
        .unwrap_or_default()
        .map(|name| name.to_lowercase())
        .collect();

    let is_excluded = |path: &Path| -> bool {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        excludes.iter().any(|x| *x == stem || *x == name)
    };

    let mut maps: Vec<PathBuf> = Vec::new();

    if let Some(values) = matches.get_many::<String>("MAPS") {
        for value in values {
            let path = if value.to_lowercase().ends_with(".bsp") {
                PathBuf::from(value)
            } else {
                PathBuf::from(format!("{value}.bsp"))
            };

            if is_excluded(&path) {
                debug!("Skipping excluded map {}", path.display());
                continue;
            }
            maps.push(path);
        }
    }

    let recursive = matches.get_flag("recursive");

    for dir in matches.get_many::<String>("dir").unwrap_or_default() {
        let mut walker = WalkDir::new(dir).min_depth(1);
        if !recursive {
            walker = walker.max_depth(1);
        }

        for entry in walker.sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to list maps under {dir}"))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let is_bsp = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("bsp"));
            if !is_bsp {
                continue;
            }

            if is_excluded(path) {
                debug!("Skipping excluded map {}", path.display());
                continue;
            }
            maps.push(path.to_path_buf());
        }
    }

    maps.sort();
    maps.dedup();
    Ok(maps)
}

fn run(matches: &ArgMatches) -> Result<()> {
    let settings = ResGenSettings::new()
        .overwrite(matches.get_flag("overwrite"))
        .lowercase(matches.get_flag("lowercase"))
        .match_case(matches.get_flag("match-case"))
        .check_paks(!matches.get_flag("no-paks"))
        .check_usage(matches.get_flag("check-usage"))
        .preserve_wads(matches.get_flag("preserve-wads"));

    let maps = collect_maps(matches)?;
    if maps.is_empty() {
        bail!("No maps to process. Pass map files or a folder with -d.");
    }

    let mut resgen = ResGen::new(settings);

    if let Some(path) = matches.get_one::<String>("add-content") {
        resgen
            .load_supplement(Path::new(path))
            .context("Failed to load the additional res content file")?;
    }

    for path in matches.get_many::<String>("exclude-list").unwrap_or_default() {
        resgen
            .load_exclude_list(Path::new(path))
            .context("Failed to load the resource exclude list")?;
    }

    if let Some(mod_path) = matches.get_one::<String>("mod-path") {
        resgen.build_catalog(Path::new(mod_path));
    } else if matches.get_flag("match-case") || matches.get_flag("check-usage") {
        bail!("-m and -u require a mod path (-e).");
    }

    info!("Processing {} map(s)", maps.len());

    let mut failed: Vec<&Path> = Vec::new();
    let mut missing: Vec<&Path> = Vec::new();

    for map in &maps {
        match resgen.make_res(map) {
            Ok(ResStatus::Complete) => {}
            Ok(ResStatus::MissingResources) => missing.push(map),
            Err(err) => {
                eprintln!("{}: {err}", map.display());
                failed.push(map);
            }
        }
    }

    println!("\nDone creating res file(s)!");
    if !failed.is_empty() {
        println!("\n{} error(s) occurred while creating the res file(s):", failed.len());
        for map in &failed {
            println!("  {}", map.display());
        }
    }
    if !missing.is_empty() {
        println!("\n{} res file(s) are missing resources:", missing.len());
        for map in &missing {
            println!("  {}", map.display());
        }
    }

    if !failed.is_empty() {
        exit(1);
    }
    Ok(())
}

fn main() -> Result<()> {
    let matches = command().get_matches();
    init_logging(&matches);
    run(&matches)
}
