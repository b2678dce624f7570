
use fixtures::*;

use pretty_assertions::assert_eq;
use resgen::{Error, ResGen, ResGenSettings, ResStatus};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Half-Life style folder pair: `<root>/mymod` next to `<root>/valve`.
fn game_tree() -> (TempDir, PathBuf) {
    let root = tempfile::tempdir().unwrap();
    let mod_path = root.path().join("mymod");
    fs::create_dir_all(mod_path.join("maps")).unwrap();
    fs::create_dir_all(root.path().join("valve")).unwrap();
    (root, mod_path)
}

fn res_entries(res_path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(res_path)
        .unwrap()
        .lines()
        .filter(|line| !line.starts_with("//") && !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[test]
fn it_lists_resolved_resources_sorted() {
    ensure_env_logger_initialized();
    let (root, mod_path) = game_tree();

    write_file(&mod_path, "models/barney.mdl", &build_mdl(2048));
    write_file(&mod_path, "sprites/glow01.spr", b"spr");
    write_file(root.path(), "valve/halflife.wad", &build_wad(b'3', &["CRATE01"]));

    let entities = concat!(
        "{\n",
        "\"classname\" \"worldspawn\"\n",
        "\"wad\" \"\\half-life\\valve\\halflife.wad\"\n",
        "}\n",
        "{\n",
        "\"classname\" \"monster_barney\"\n",
        "\"model\" \"models/barney.mdl\"\n",
        "}\n",
        "{\n",
        "\"classname\" \"env_glow\"\n",
        "\"model\" \"sprites/glow01.spr\"\n",
        "}\n\0",
    );
    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(entities.as_bytes(), &[])).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new());
    resgen.build_catalog(&mod_path);

    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::Complete);
    assert_eq!(
        res_entries(&map.with_extension("res")),
        vec!["halflife.wad", "models/barney.mdl", "sprites/glow01.spr"]
    );
}

#[test]
fn it_flags_missing_resources_and_drops_them() {
    ensure_env_logger_initialized();
    let (_root, mod_path) = game_tree();

    write_file(&mod_path, "sprites/glow01.spr", b"spr");

    // The model does not exist anywhere; the WAD is missing too, but a
    // missing WAD never flags the map by itself.
    let entities = concat!(
        "{\n",
        "\"wad\" \"custom.wad\"\n",
        "}\n",
        "{\n",
        "\"model\" \"models/lost.mdl\"\n",
        "\"model2\" \"sprites/glow01.spr\"\n",
        "}\n\0",
    );
    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(entities.as_bytes(), &[])).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new());
    resgen.build_catalog(&mod_path);

    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::MissingResources);
    assert_eq!(
        res_entries(&map.with_extension("res")),
        vec!["sprites/glow01.spr"]
    );
}

#[test]
fn it_only_flags_a_missing_wad_silently() {
    ensure_env_logger_initialized();
    let (_root, mod_path) = game_tree();

    write_file(&mod_path, "sprites/glow01.spr", b"spr");

    let entities = concat!(
        "{\n",
        "\"wad\" \"custom.wad\"\n",
        "}\n",
        "{\n",
        "\"model\" \"sprites/glow01.spr\"\n",
        "}\n\0",
    );
    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(entities.as_bytes(), &[])).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new());
    resgen.build_catalog(&mod_path);

    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::Complete);
    assert_eq!(
        res_entries(&map.with_extension("res")),
        vec!["sprites/glow01.spr"]
    );
}

#[test]
fn it_refuses_to_overwrite_without_the_flag() {
    ensure_env_logger_initialized();
    let (_root, mod_path) = game_tree();

    let entities = "{\n\"model\" \"sprites/glow01.spr\"\n}\n\0";
    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(entities.as_bytes(), &[])).unwrap();
    fs::write(map.with_extension("res"), "stale\n").unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new());
    match resgen.make_res(&map) {
        Err(Error::ResFileExists { .. }) => {}
        other => panic!("expected a res-file-exists error, got {other:?}"),
    }
    assert_eq!(fs::read_to_string(map.with_extension("res")).unwrap(), "stale\n");

    let mut resgen = ResGen::new(ResGenSettings::new().overwrite(true));
    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::Complete);
    assert_eq!(
        res_entries(&map.with_extension("res")),
        vec!["sprites/glow01.spr"]
    );
}

#[test]
fn it_deletes_a_stale_res_file_when_nothing_is_found() {
    ensure_env_logger_initialized();
    let (_root, mod_path) = game_tree();

    // Resolution drops the only candidate, leaving an empty manifest.
    let entities = "{\n\"model\" \"models/lost.mdl\"\n}\n\0";
    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(entities.as_bytes(), &[])).unwrap();
    let res_path = map.with_extension("res");
    fs::write(&res_path, "stale\n").unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new().overwrite(true));
    resgen.build_catalog(&mod_path);

    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::MissingResources);
    assert!(!res_path.exists());
}

#[test]
fn it_prunes_unused_wads_and_flags_unclaimed_textures() {
    ensure_env_logger_initialized();
    let (_root, mod_path) = game_tree();

    write_file(&mod_path, "a.wad", &build_wad(b'3', &["CRATE01"]));
    write_file(&mod_path, "b.wad", &build_wad(b'3', &["OTHER"]));

    let entities = "{\n\"wad\" \"a.wad;b.wad\"\n}\n\0";
    let map = mod_path.join("maps").join("test.bsp");
    let textures = [("CRATE01", [0_u32; 4])];
    fs::write(&map, build_bsp(entities.as_bytes(), &textures)).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new().check_usage(true));
    resgen.build_catalog(&mod_path);

    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::Complete);
    assert_eq!(res_entries(&map.with_extension("res")), vec!["a.wad"]);

    // A texture no listed WAD provides leaves the map incomplete.
    let map2 = mod_path.join("maps").join("test2.bsp");
    let textures2 = [("NOWHERE", [0_u32; 4])];
    fs::write(&map2, build_bsp(entities.as_bytes(), &textures2)).unwrap();

    assert_eq!(resgen.make_res(&map2).unwrap(), ResStatus::MissingResources);
}

#[test]
fn it_keeps_unused_wads_with_preserve_wads() {
    ensure_env_logger_initialized();
    let (_root, mod_path) = game_tree();

    write_file(&mod_path, "b.wad", &build_wad(b'3', &["OTHER"]));

    let entities = "{\n\"wad\" \"b.wad\"\n}\n\0";
    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(entities.as_bytes(), &[])).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new().check_usage(true).preserve_wads(true));
    resgen.build_catalog(&mod_path);

    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::Complete);
    assert_eq!(res_entries(&map.with_extension("res")), vec!["b.wad"]);
}

#[test]
fn it_adds_external_model_textures() {
    ensure_env_logger_initialized();
    let (_root, mod_path) = game_tree();

    write_file(&mod_path, "models/barney.mdl", &build_mdl(0));
    write_file(&mod_path, "models/barneyT.mdl", &build_mdl(2048));

    let entities = "{\n\"model\" \"models/barney.mdl\"\n}\n\0";
    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(entities.as_bytes(), &[])).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new().check_usage(true).match_case(true));
    resgen.build_catalog(&mod_path);

    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::Complete);
    assert_eq!(
        res_entries(&map.with_extension("res")),
        vec!["models/barney.mdl", "models/barneyT.mdl"]
    );
}

#[test]
fn it_finds_resources_inside_pak_files() {
    ensure_env_logger_initialized();
    let (root, mod_path) = game_tree();

    write_file(
        root.path(),
        "valve/pak0.pak",
        &build_pak(&["models/can.mdl"]),
    );

    let entities = "{\n\"model\" \"models/can.mdl\"\n}\n\0";
    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(entities.as_bytes(), &[])).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new());
    resgen.build_catalog(&mod_path);
    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::Complete);

    // Without PAK indexing the model is nowhere to be found.
    let map2 = mod_path.join("maps").join("test2.bsp");
    fs::write(&map2, build_bsp(entities.as_bytes(), &[])).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new().check_paks(false));
    resgen.build_catalog(&mod_path);
    assert_eq!(resgen.make_res(&map2).unwrap(), ResStatus::MissingResources);
}

#[test]
fn it_applies_the_exclude_list() {
    ensure_env_logger_initialized();
    let (_root, mod_path) = game_tree();

    write_file(&mod_path, "models/barney.mdl", &build_mdl(2048));
    write_file(&mod_path, "sprites/glow01.spr", b"spr");
    write_file(
        &mod_path,
        "official.rfa",
        b"// stock resources\nmodels\\barney.mdl\n\n",
    );

    let entities = concat!(
        "{\n",
        "\"model\" \"models/barney.mdl\"\n",
        "\"model2\" \"sprites/glow01.spr\"\n",
        "}\n\0",
    );
    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(entities.as_bytes(), &[])).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new());
    resgen.load_exclude_list(&mod_path.join("official.rfa")).unwrap();
    resgen.build_catalog(&mod_path);

    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::Complete);
    assert_eq!(
        res_entries(&map.with_extension("res")),
        vec!["sprites/glow01.spr"]
    );
}

#[test]
fn it_appends_supplemental_content() {
    ensure_env_logger_initialized();
    let (_root, mod_path) = game_tree();

    write_file(&mod_path, "extra.rfa", b"overviews/custom.txt\n");

    // No resources in the map at all; the supplement alone forces a write.
    let entities = "{\n\"classname\" \"worldspawn\"\n}\n\0";
    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(entities.as_bytes(), &[])).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new());
    resgen.load_supplement(&mod_path.join("extra.rfa")).unwrap();

    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::Complete);

    let written = fs::read_to_string(map.with_extension("res")).unwrap();
    assert!(written.contains("// .res entries (0):"));
    assert!(written.contains("// Added .res content:\noverviews/custom.txt"));
}

#[test]
fn it_adds_overview_files() {
    ensure_env_logger_initialized();
    let (_root, mod_path) = game_tree();

    write_file(&mod_path, "overviews/test.txt", b"// overview layout\n");
    write_file(&mod_path, "overviews/test.bmp", b"BM");

    let entities = "{\n\"classname\" \"worldspawn\"\n}\n\0";
    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(entities.as_bytes(), &[])).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new());
    resgen.build_catalog(&mod_path);

    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::Complete);
    assert_eq!(
        res_entries(&map.with_extension("res")),
        vec!["overviews/test.bmp", "overviews/test.txt"]
    );
}

#[test]
fn it_rejects_a_map_without_entity_data() {
    ensure_env_logger_initialized();
    let (_root, mod_path) = game_tree();

    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(b" \n \0", &[])).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new());
    match resgen.make_res(&map) {
        Err(Error::NoEntityData) => {}
        other => panic!("expected a no-entity-data error, got {other:?}"),
    }
    assert!(!map.with_extension("res").exists());
}

#[test]
fn it_rewrites_casing_from_disk() {
    ensure_env_logger_initialized();
    let (_root, mod_path) = game_tree();

    write_file(&mod_path, "models/Barney.mdl", &build_mdl(2048));

    let entities = "{\n\"model\" \"MODELS/BARNEY.MDL\"\n}\n\0";
    let map = mod_path.join("maps").join("test.bsp");
    fs::write(&map, build_bsp(entities.as_bytes(), &[])).unwrap();

    let mut resgen = ResGen::new(ResGenSettings::new().match_case(true));
    resgen.build_catalog(&mod_path);

    assert_eq!(resgen.make_res(&map).unwrap(), ResStatus::Complete);
    assert_eq!(
        res_entries(&map.with_extension("res")),
        vec!["models/Barney.mdl"]
    );
}
