use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::err::{Error, Result};
use crate::resource_name::fixed_cstr;

/// "PACK", little-endian.
pub const PAK_ID: u32 = 0x4B43_4150;

/// 56-byte name + u32 offset + u32 length.
pub const PAK_ENTRY_SIZE: u32 = 64;

const PAK_NAME_LEN: usize = 56;

#[derive(Debug, PartialEq, Eq)]
pub struct PakEntry {
    pub name: String,
    pub file_offset: u32,
    pub file_length: u32,
}

/// Reads a PAK archive's directory.
///
/// The header is only trusted after the id matches and the directory size
/// is a non-zero exact multiple of the entry record size; anything else is
/// a corrupt or foreign file and rejects the archive as a whole.
pub fn read_directory<T: Read + Seek>(stream: &mut T) -> Result<Vec<PakEntry>> {
    let id = stream
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::Truncated { what: "PAK header" })?;

    if id != PAK_ID {
        return Err(Error::InvalidPakId {
            expected: PAK_ID,
            found: id,
        });
    }

    let dir_offset = stream
        .read_i32::<LittleEndian>()
        .map_err(|_| Error::Truncated { what: "PAK header" })?;
    let dir_size = stream
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::Truncated { what: "PAK header" })?;

    if dir_size == 0 || dir_size % PAK_ENTRY_SIZE != 0 || dir_offset <= 0 {
        return Err(Error::InvalidPakDirectorySize {
            size: dir_size,
            entry_size: PAK_ENTRY_SIZE,
        });
    }

    stream.seek(SeekFrom::Start(dir_offset as u64))?;

    let entry_count = dir_size / PAK_ENTRY_SIZE;
    let mut entries = Vec::with_capacity(entry_count as usize);

    for _ in 0..entry_count {
        let mut name = [0_u8; PAK_NAME_LEN];
        stream
            .read_exact(&mut name)
            .map_err(|_| Error::Truncated { what: "PAK directory entry" })?;
        let file_offset = stream
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Truncated { what: "PAK directory entry" })?;
        let file_length = stream
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Truncated { what: "PAK directory entry" })?;

        entries.push(PakEntry {
            name: fixed_cstr(&name),
            file_offset,
            file_length,
        });
    }

    Ok(entries)
}
