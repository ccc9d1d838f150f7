//! Argument marshalling: the typed value stack and its wire codec.
//!
//! Wire format — each value is a typed, length-prefixed field:
//!
//! ```text
//! <tag><decimal len>:<payload>
//!
//! tag 'N': number — payload is the ASCII decimal rendering (i64)
//! tag 'S': string — payload is raw UTF-8 bytes
//! tag 'B': binary — payload is raw bytes (embedded NUL survives)
//! ```
//!
//! A call argument blob is the concatenation of fields in declared order,
//! e.g. `S11:scratch.txtS15:O_CREAT O_TRUNCN1:0`. [`ArgStack`] decodes a
//! blob and pops values from the front in declared order; [`ResultStack`]
//! appends values in push order and renders the identical encoding, so the
//! codec is exactly reversible.
//!
//! Binary fields carry an explicit length instead of a terminator, which is
//! what lets non-text payloads (pipe data, file contents) travel through the
//! same textual boundary as paths and flag strings.
//!
//! Tag or count mismatches fail with `ProtocolError` before any OS call.

use std::collections::VecDeque;

use crate::error::{Error, Result};

/// One marshalled value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Signed number (fds, pids, byte counts, timeouts, handles).
    Num(i64),
    /// UTF-8 text (paths, flag names, host names).
    Str(String),
    /// Raw bytes with explicit length.
    Bin(Vec<u8>),
}

impl Value {
    fn tag(&self) -> char {
        match self {
            Value::Num(_) => 'N',
            Value::Str(_) => 'S',
            Value::Bin(_) => 'B',
        }
    }
}

/// Append one encoded field to `out`.
fn encode_field(value: &Value, out: &mut Vec<u8>) {
    let payload: Vec<u8> = match value {
        Value::Num(n) => n.to_string().into_bytes(),
        Value::Str(s) => s.as_bytes().to_vec(),
        Value::Bin(b) => b.clone(),
    };
    out.push(value.tag() as u8);
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(&payload);
}

// ─── Decode side ───────────────────────────────────────────────────────────

/// Ordered call arguments, consumed from the front in declared order.
#[derive(Debug)]
pub struct ArgStack {
    values: VecDeque<Value>,
}

impl ArgStack {
    /// Decode an argument blob into an ordered stack.
    ///
    /// # Errors
    ///
    /// `ProtocolError` on an unknown tag, a malformed length, a truncated
    /// payload, non-UTF-8 string bytes, or a non-numeric number payload.
    pub fn decode(blob: &[u8]) -> Result<Self> {
        let mut values = VecDeque::new();
        let mut pos = 0;
        while pos < blob.len() {
            let tag = blob[pos];
            pos += 1;
            let colon = blob[pos..]
                .iter()
                .position(|&b| b == b':')
                .ok_or_else(|| Error::protocol("malformed argument field: missing ':'"))?;
            let len: usize = std::str::from_utf8(&blob[pos..pos + colon])
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| Error::protocol("malformed argument field: bad length"))?;
            pos += colon + 1;
            // Overflow-safe: `len` comes off the wire and may be huge.
            if len > blob.len() - pos {
                return Err(Error::protocol("malformed argument field: truncated payload"));
            }
            let payload = &blob[pos..pos + len];
            pos += len;

            let value = match tag {
                b'N' => {
                    let text = std::str::from_utf8(payload)
                        .map_err(|_| Error::protocol("number field is not ASCII"))?;
                    Value::Num(text.parse().map_err(|_| {
                        Error::protocol(format!("number field is not numeric: {text:?}"))
                    })?)
                }
                b'S' => Value::Str(
                    std::str::from_utf8(payload)
                        .map_err(|_| Error::protocol("string field is not UTF-8"))?
                        .to_owned(),
                ),
                b'B' => Value::Bin(payload.to_vec()),
                other => {
                    return Err(Error::protocol(format!(
                        "unknown argument tag: 0x{other:02x}"
                    )))
                }
            };
            values.push_back(value);
        }
        Ok(Self { values })
    }

    /// Pop the next argument as a number.
    ///
    /// # Errors
    ///
    /// `ProtocolError` when no argument remains or the next value is not
    /// a number.
    pub fn pop_num(&mut self) -> Result<i64> {
        match self.next("number")? {
            Value::Num(n) => Ok(n),
            other => Err(Self::type_mismatch("number", &other)),
        }
    }

    /// Pop the next argument as a string.
    ///
    /// # Errors
    ///
    /// `ProtocolError` when no argument remains or the next value is not
    /// a string.
    pub fn pop_str(&mut self) -> Result<String> {
        match self.next("string")? {
            Value::Str(s) => Ok(s),
            other => Err(Self::type_mismatch("string", &other)),
        }
    }

    /// Pop the next argument as binary data.
    ///
    /// # Errors
    ///
    /// `ProtocolError` when no argument remains or the next value is not
    /// binary.
    pub fn pop_bin(&mut self) -> Result<Vec<u8>> {
        match self.next("binary")? {
            Value::Bin(b) => Ok(b),
            other => Err(Self::type_mismatch("binary", &other)),
        }
    }

    /// Assert that every declared argument was consumed.
    ///
    /// # Errors
    ///
    /// `ProtocolError` if surplus arguments remain.
    pub fn finish(self) -> Result<()> {
        if self.values.is_empty() {
            Ok(())
        } else {
            Err(Error::protocol(format!(
                "argument count mismatch: {} surplus argument(s)",
                self.values.len()
            )))
        }
    }

    fn next(&mut self, wanted: &str) -> Result<Value> {
        self.values
            .pop_front()
            .ok_or_else(|| Error::protocol(format!("missing {wanted} argument")))
    }

    fn type_mismatch(wanted: &str, got: &Value) -> Error {
        Error::protocol(format!(
            "argument type mismatch: wanted {wanted}, got tag '{}'",
            got.tag()
        ))
    }
}

// ─── Encode side ───────────────────────────────────────────────────────────

/// Result values for one call, appended in push order.
///
/// Built fresh per call — no state outlives the operation that created it.
#[derive(Debug, Default)]
pub struct ResultStack {
    buf: Vec<u8>,
}

impl ResultStack {
    /// Empty result stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a number field.
    pub fn push_num(&mut self, n: i64) {
        encode_field(&Value::Num(n), &mut self.buf);
    }

    /// Append a string field.
    pub fn push_str(&mut self, s: &str) {
        encode_field(&Value::Str(s.to_owned()), &mut self.buf);
    }

    /// Append a binary field.
    pub fn push_bin(&mut self, b: &[u8]) {
        encode_field(&Value::Bin(b.to_vec()), &mut self.buf);
    }

    /// Render the encoded payload.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
