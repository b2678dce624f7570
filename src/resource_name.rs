//! Resource name normalization rules.
//!
//! Entity values arrive in whatever shape the map author typed: stray
//! punctuation up front, backslash separators, mixed case. Lookup keys are
//! always the lowercased, slash-normalized form; the display form only gets
//! lowercased when the whole-run lowercase setting asks for it.

/// Prefix for the six skybox face textures derived from a `skyname` value.
pub const SKY_PREFIX: &str = "gfx/env/";

/// Face name + extension appended to a `skyname` value, one per face.
pub const SKY_SUFFIXES: [&str; 6] = ["up.tga", "dn.tga", "lf.tga", "rt.tga", "ft.tga", "bk.tga"];

/// Strips leading non-alphanumeric bytes and normalizes path separators.
///
/// Some entity fields begin with a stray punctuation byte (sprites attached
/// to `env_glow` entities, mostly); keep stripping until a valid character
/// is found.
pub fn sanitize(res: &str) -> String {
    let start = res
        .find(|c: char| c.is_ascii_alphanumeric())
        .unwrap_or(res.len());
    res[start..].replace('\\', "/")
}

/// The canonical lookup key: lowercased, forward slashes only.
pub fn normalize_key(res: &str) -> String {
    res.replace('\\', "/").to_lowercase()
}

/// Case-insensitive extension check against a dotted suffix like `".wad"`.
pub fn has_extension(name: &str, dotted_ext: &str) -> bool {
    name.len() >= dotted_ext.len()
        && name[name.len() - dotted_ext.len()..].eq_ignore_ascii_case(dotted_ext)
}

/// Extracts a NUL-terminated name from a fixed-size binary field.
pub(crate) fn fixed_cstr(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
