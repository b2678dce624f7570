use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::err::{Error, Result};
use crate::resource_name::fixed_cstr;

/// The one Half-Life BSP version this tool understands.
pub const BSP_VERSION: u32 = 30;

// Lump indices consumed here: 0 = entity text, 2 = texture directory
// (lump 1, planes, is skipped).

const TEXTURE_NAME_LEN: usize = 16;
const MIP_LEVELS: usize = 4;

/// Sanity cap on the texture directory; goldsrc maps top out well below this.
const MAX_TEXTURES: u32 = 0x10000;

#[derive(Debug, PartialEq, Eq)]
pub struct LumpInfo {
    pub file_offset: i32,
    pub file_length: u32,
}

impl LumpInfo {
    fn from_stream<T: Read>(stream: &mut T) -> Result<LumpInfo> {
        let file_offset = stream
            .read_i32::<LittleEndian>()
            .map_err(|_| Error::Truncated { what: "BSP lump descriptor" })?;
        let file_length = stream
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Truncated { what: "BSP lump descriptor" })?;
        Ok(LumpInfo {
            file_offset,
            file_length,
        })
    }
}

/// The slice of the BSP header this tool cares about. Offsets are only
/// trusted after the version check passes and the offset/length pair has
/// been sanity-checked.
#[derive(Debug, PartialEq, Eq)]
pub struct BspHeader {
    pub version: u32,
    pub entities: LumpInfo,
    pub textures: LumpInfo,
}

impl BspHeader {
    pub fn from_stream<T: Read>(stream: &mut T) -> Result<BspHeader> {
        let version = stream
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Truncated { what: "BSP header" })?;

        if version != BSP_VERSION {
            return Err(Error::InvalidBspVersion {
                expected: BSP_VERSION,
                found: version,
            });
        }

        let entities = LumpInfo::from_stream(stream)?;
        let _planes = LumpInfo::from_stream(stream)?;
        let textures = LumpInfo::from_stream(stream)?;

        if entities.file_offset <= 0 {
            return Err(Error::CorruptBspHeader {
                what: "entity lump offset",
            });
        }
        if entities.file_length == 0 {
            return Err(Error::CorruptBspHeader {
                what: "entity lump length",
            });
        }

        Ok(BspHeader {
            version,
            entities,
            textures,
        })
    }
}

/// Reads the raw entity text lump into an owned buffer.
pub fn read_entity_data<T: Read + Seek>(stream: &mut T, header: &BspHeader) -> Result<Vec<u8>> {
    stream.seek(SeekFrom::Start(header.entities.file_offset as u64))?;

    let mut entdata = vec![0_u8; header.entities.file_length as usize];
    stream
        .read_exact(&mut entdata)
        .map_err(|_| Error::Truncated { what: "entity data" })?;

    Ok(entdata)
}

/// Collects the names of textures the map expects to find in a WAD file.
///
/// A texture record with all four mip offsets zero carries no embedded
/// pixel data, which is the marker for "lives in an external WAD". Keys are
/// lowercased names, values keep the record's original casing for display.
pub fn read_wad_texture_names<T: Read + Seek>(
    stream: &mut T,
    header: &BspHeader,
) -> Result<BTreeMap<String, String>> {
    if header.textures.file_offset <= 0 {
        return Err(Error::CorruptTextureDirectory {
            what: "texture lump offset",
        });
    }

    let lump_start = header.textures.file_offset as u64;
    stream.seek(SeekFrom::Start(lump_start))?;

    let count = stream
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::Truncated { what: "texture count" })?;

    if count > MAX_TEXTURES {
        return Err(Error::CorruptTextureDirectory {
            what: "texture count",
        });
    }

    let mut offsets = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let offset = stream
            .read_i32::<LittleEndian>()
            .map_err(|_| Error::Truncated { what: "texture offsets" })?;
        offsets.push(offset);
    }

    let mut texlist = BTreeMap::new();

    for offset in offsets {
        if offset < 0 {
            return Err(Error::CorruptTextureDirectory {
                what: "texture offset",
            });
        }
        stream.seek(SeekFrom::Start(lump_start + offset as u64))?;

        let mut name = [0_u8; TEXTURE_NAME_LEN];
        stream
            .read_exact(&mut name)
            .map_err(|_| Error::Truncated { what: "texture record" })?;
        let _width = stream
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Truncated { what: "texture record" })?;
        let _height = stream
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Truncated { what: "texture record" })?;

        let mut embedded = false;
        for _ in 0..MIP_LEVELS {
            let mip_offset = stream
                .read_u32::<LittleEndian>()
                .map_err(|_| Error::Truncated { what: "texture record" })?;
            if mip_offset != 0 {
                embedded = true;
            }
        }

        if !embedded {
            let display = fixed_cstr(&name);
            texlist.insert(display.to_lowercase(), display);
        }
    }

    Ok(texlist)
}
