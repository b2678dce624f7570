use std::borrow::Cow;
use std::ops::Range;

use crate::err::EntParseError;

/// A single `"key" "value"` pair pulled out of the entity text.
///
/// Both sides borrow the tokenizer's buffer and stay valid until the next
/// call to [`EntTokenizer::next_pair`] overwrites them, so callers must copy
/// out anything they need to keep.
#[derive(Debug, PartialEq, Eq)]
pub struct KeyValuePair<'a> {
    pub key: &'a [u8],
    pub value: &'a [u8],
}

impl<'a> KeyValuePair<'a> {
    pub fn key_str(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.key)
    }

    pub fn value_str(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.value)
    }
}

/// Destructive scanner over one map's entity text.
///
/// The lower layer splits the owned buffer on `"` delimiters, overwriting
/// each found delimiter with a NUL terminator and advancing a bounds-checked
/// cursor; tokens are byte ranges into the buffer, so the hot path never
/// copies. On top of that sits the key/value state machine: text between
/// quoted strings may only contain block braces (tracked for balance) or, in
/// between a key and its value, spaces.
///
/// Reaching the end of the buffer outside a block with no pending key is the
/// normal "no more pairs" termination. Anything else mid-stream raises an
/// [`EntParseError`] carrying the byte offset reached.
pub struct EntTokenizer {
    buf: Vec<u8>,
    /// Cursor into `buf`. `None` once the clean end of the data is reached.
    pos: Option<usize>,
    delim: u8,
    in_block: bool,
    blocks_read: usize,
    key: Range<usize>,
    value: Range<usize>,
}

impl EntTokenizer {
    pub fn new(buf: Vec<u8>) -> Self {
        EntTokenizer {
            buf,
            pos: Some(0),
            delim: b'"',
            in_block: false,
            blocks_read: 0,
            key: 0..0,
            value: 0..0,
        }
    }

    /// Byte offset of the cursor, for diagnostics.
    pub fn offset(&self) -> usize {
        self.pos.unwrap_or(self.buf.len())
    }

    /// Number of `{ ... }` blocks fully closed so far. Zero while the first
    /// block (worldspawn) is still open.
    pub fn blocks_read(&self) -> usize {
        self.blocks_read
    }

    /// Length of the most recent key token. The buffer holds NUL terminators
    /// instead of explicit counts, so the latest lengths are tracked here for
    /// callers doing fast extension checks without a copy.
    pub fn latest_key_len(&self) -> usize {
        self.key.len()
    }

    pub fn latest_value_len(&self) -> usize {
        self.value.len()
    }

    /// Advances to the next key/value pair.
    ///
    /// Returns `Ok(None)` once the entity text is cleanly exhausted.
    pub fn next_pair(&mut self) -> Result<Option<KeyValuePair<'_>>, EntParseError> {
        let Some(mut pos) = self.pos else {
            return Ok(None);
        };

        // Skip ahead to the opening quote of the next key, tracking block
        // delimiters on the way.
        loop {
            if pos == self.buf.len() {
                self.pos = None;
                if self.in_block {
                    return Err(EntParseError::UnterminatedBlock { offset: pos });
                }
                return Ok(None);
            }
            match self.buf[pos] {
                b if b == self.delim => {
                    self.buf[pos] = 0;
                    pos += 1;
                    break;
                }
                b'{' => {
                    if self.in_block {
                        return Err(EntParseError::UnexpectedBlockStart { offset: pos });
                    }
                    self.in_block = true;
                }
                b'}' => {
                    if !self.in_block {
                        return Err(EntParseError::UnexpectedBlockEnd { offset: pos });
                    }
                    self.in_block = false;
                    self.blocks_read += 1;
                }
                _ => {}
            }
            pos += 1;
        }

        let key_start = pos;
        let key_end = self.scan_token(&mut pos)?;

        // Only spaces may sit between the key's closing quote and the
        // value's opening quote.
        loop {
            if pos == self.buf.len() {
                return Err(EntParseError::MissingValue { offset: pos });
            }
            match self.buf[pos] {
                b if b == self.delim => {
                    self.buf[pos] = 0;
                    pos += 1;
                    break;
                }
                b' ' => pos += 1,
                _ => return Err(EntParseError::NonWhitespaceSeparator { offset: pos }),
            }
        }

        let value_start = pos;
        let value_end = self.scan_token(&mut pos)?;

        self.pos = Some(pos);
        self.key = key_start..key_end;
        self.value = value_start..value_end;

        Ok(Some(KeyValuePair {
            key: &self.buf[key_start..key_end],
            value: &self.buf[value_start..value_end],
        }))
    }

    /// Scans from `pos` to the next delimiter, NUL-terminating the token in
    /// place. Running out of data mid-token is fatal here; the pair-level
    /// caller decides what a clean end means.
    fn scan_token(&mut self, pos: &mut usize) -> Result<usize, EntParseError> {
        while *pos < self.buf.len() {
            if self.buf[*pos] == self.delim {
                let end = *pos;
                self.buf[*pos] = 0;
                *pos += 1;
                return Ok(end);
            }
            *pos += 1;
        }
        Err(EntParseError::UnterminatedString { offset: *pos })
    }
}
