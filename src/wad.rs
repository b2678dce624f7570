use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::err::{Error, Result};
use crate::resource_name::fixed_cstr;

// Identification is "WAD2" or "WAD3"; both directory layouts are identical
// for our purposes (we only want the lump names).

const LUMP_NAME_LEN: usize = 16;

/// Reads the lump directory of a WAD file and returns the contained texture
/// names, lowercased for matching against the still-needed texture set.
pub fn read_texture_names<T: Read + Seek>(stream: &mut T) -> Result<HashSet<String>> {
    let mut identification = [0_u8; 4];
    stream
        .read_exact(&mut identification)
        .map_err(|_| Error::Truncated { what: "WAD header" })?;

    if &identification[..3] != b"WAD" {
        return Err(Error::InvalidWadMagic {
            magic: identification,
        });
    }
    if identification[3] != b'2' && identification[3] != b'3' {
        return Err(Error::InvalidWadVersion {
            found: identification[3] as char,
        });
    }

    let num_lumps = stream
        .read_i32::<LittleEndian>()
        .map_err(|_| Error::Truncated { what: "WAD header" })?;
    let info_table_offset = stream
        .read_i32::<LittleEndian>()
        .map_err(|_| Error::Truncated { what: "WAD header" })?;

    if num_lumps < 0 || info_table_offset < 0 {
        return Err(Error::Truncated {
            what: "WAD info table",
        });
    }

    stream.seek(SeekFrom::Start(info_table_offset as u64))?;

    let mut names = HashSet::with_capacity(num_lumps as usize);

    for _ in 0..num_lumps {
        let _file_pos = stream
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Truncated { what: "WAD lump record" })?;
        let _disk_size = stream
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Truncated { what: "WAD lump record" })?;
        let _size = stream
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Truncated { what: "WAD lump record" })?;
        // type, compression, 2 pad bytes
        let mut flags = [0_u8; 4];
        stream
            .read_exact(&mut flags)
            .map_err(|_| Error::Truncated { what: "WAD lump record" })?;
        let mut name = [0_u8; LUMP_NAME_LEN];
        stream
            .read_exact(&mut name)
            .map_err(|_| Error::Truncated { what: "WAD lump record" })?;

        names.insert(fixed_cstr(&name).to_lowercase());
    }

    Ok(names)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) fn build_wad(version: u8, lumps: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"WAD");
        out.push(version);
        out.extend_from_slice(&(lumps.len() as i32).to_le_bytes());
        out.extend_from_slice(&12_i32.to_le_bytes());

        for name in lumps {
            out.extend_from_slice(&0_u32.to_le_bytes());
            out.extend_from_slice(&0_u32.to_le_bytes());
            out.extend_from_slice(&0_u32.to_le_bytes());
            out.extend_from_slice(&[0x43, 0, 0, 0]); // type, compression, pad
            let mut field = [0_u8; LUMP_NAME_LEN];
            field[..name.len()].copy_from_slice(name.as_bytes());
            out.extend_from_slice(&field);
        }

        out
    }

    #[test]
    fn test_reads_lowercased_lump_names() {
        let wad = build_wad(b'3', &["CRATE01", "Sky_Top"]);
        let names = read_texture_names(&mut Cursor::new(&wad)).unwrap();
        assert!(names.contains("crate01"));
        assert!(names.contains("sky_top"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_accepts_wad2() {
        let wad = build_wad(b'2', &["water0"]);
        assert!(read_texture_names(&mut Cursor::new(&wad)).is_ok());
    }

    #[test]
    fn test_rejects_non_wad() {
        let wad = build_wad(b'3', &["crate01"]);
        let mut bad = wad.clone();
        bad[0] = b'M';
        match read_texture_names(&mut Cursor::new(&bad)) {
            Err(Error::InvalidWadMagic { .. }) => {}
            other => panic!("expected magic error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_version() {
        let wad = build_wad(b'4', &["crate01"]);
        match read_texture_names(&mut Cursor::new(&wad)) {
            Err(Error::InvalidWadVersion { found: '4' }) => {}
            other => panic!("expected version error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_truncated_info_table() {
        let wad = build_wad(b'3', &["crate01", "crate02"]);
        match read_texture_names(&mut Cursor::new(&wad[..wad.len() - 4])) {
            Err(Error::Truncated { .. }) => {}
            other => panic!("expected truncation error, got {other:?}"),
        }
    }
}
