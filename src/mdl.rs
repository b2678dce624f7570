use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::err::{Error, Result};

pub const MDL_MAGIC: [u8; 4] = *b"IDST";
pub const MDL_VERSION: u32 = 10;

/// Byte offset of the `textureindex` field in the studio model header
/// (magic, version, 64-byte name, length, six float triples, flags, then
/// ten u32 counts/indices precede it).
const TEXTURE_INDEX_OFFSET: u64 = 184;

/// Checks whether a studio model keeps its textures in a separate
/// companion file.
///
/// A zero `textureindex` means no embedded texture data; the engine then
/// loads `<name>T.mdl` alongside the model. That zero is the only field
/// this subsystem consumes beyond the magic and version.
pub fn has_external_texture<T: Read + Seek>(stream: &mut T) -> Result<bool> {
    let mut magic = [0_u8; 4];
    stream
        .read_exact(&mut magic)
        .map_err(|_| Error::Truncated { what: "MDL header" })?;

    if magic != MDL_MAGIC {
        return Err(Error::InvalidMdlMagic { magic });
    }

    let version = stream
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::Truncated { what: "MDL header" })?;

    if version != MDL_VERSION {
        return Err(Error::InvalidMdlVersion {
            expected: MDL_VERSION,
            found: version,
        });
    }

    stream.seek(SeekFrom::Start(TEXTURE_INDEX_OFFSET))?;
    let texture_index = stream
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::Truncated { what: "MDL header" })?;

    Ok(texture_index == 0)
}
