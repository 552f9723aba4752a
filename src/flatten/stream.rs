//! Element-at-a-time reading of a top-level JSON array
//!
//! The array framing (`[`, `,`, `]`) is scanned by hand over a `BufRead`, and
//! each element in between is handed to `serde_json` on its own. Only the
//! element currently being decoded is ever held in memory, so arbitrarily
//! long arrays can be processed.
//!
//! Elements are read into a `serde_json::Value` before being converted to the
//! target type, so an object that repeats a key keeps the last value instead
//! of failing the whole stream.

use crate::flatten::error::StreamError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::io::{self, BufRead};

/// Cursor over the elements of a JSON array
pub struct ArrayStream<R: BufRead> {
    reader: R,
    /// Number of elements decoded so far
    decoded: u64,
}

impl<R: BufRead> ArrayStream<R> {
    /// Consume leading whitespace and the opening `[`
    pub fn open(mut reader: R) -> Result<Self, StreamError> {
        match peek_token(&mut reader)? {
            None => Err(StreamError::Empty),
            Some(b'[') => {
                reader.consume(1);
                Ok(ArrayStream { reader, decoded: 0 })
            }
            Some(b) => Err(StreamError::MissingArrayStart { found: b }),
        }
    }

    /// Decode the next element, or return `None` once a closing delimiter or
    /// end of input is reached.
    ///
    /// The delimiter is left in place for [`ArrayStream::close`] to check.
    pub fn next_element<T: DeserializeOwned>(&mut self) -> Result<Option<T>, StreamError> {
        let next = peek_token(&mut self.reader)?;

        if self.decoded > 0 {
            match next {
                None | Some(b']' | b'}') => return Ok(None),
                Some(b',') => self.reader.consume(1),
                Some(b) => {
                    return Err(StreamError::MissingSeparator {
                        index: self.decoded - 1,
                        found: b,
                    })
                }
            }
        } else if matches!(next, None | Some(b']' | b'}')) {
            return Ok(None);
        }

        let index = self.decoded;
        // Elements are objects or null: the deserializer stops right after the
        // closing brace or literal and never reads ahead into the framing.
        let mut de = serde_json::Deserializer::from_reader(&mut self.reader);
        let value = Value::deserialize(&mut de)
            .and_then(T::deserialize)
            .map_err(|source| StreamError::Decode { index, source })?;

        self.decoded += 1;
        Ok(Some(value))
    }

    /// Number of elements decoded so far
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Consume the closing `]`.
    ///
    /// Running out of input where the bracket should be is accepted.
    pub fn close(mut self) -> Result<(), StreamError> {
        match peek_token(&mut self.reader)? {
            None => Ok(()),
            Some(b']') => {
                self.reader.consume(1);
                Ok(())
            }
            Some(b) => Err(StreamError::MissingArrayEnd { found: b }),
        }
    }
}

/// Skip JSON whitespace and return the next byte without consuming it
fn peek_token<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    loop {
        let buf = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if buf.is_empty() {
            return Ok(None);
        }

        match buf.iter().position(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r')) {
            Some(pos) => {
                let b = buf[pos];
                reader.consume(pos);
                return Ok(Some(b));
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}
