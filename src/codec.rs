use crate::error::Error;
use chrono::{DateTime, Utc};

/// Reference instant identifiers are measured from: 2014-12-31T17:00:00Z,
/// in milliseconds since the Unix epoch.
pub const EPOCH_MILLIS: u64 = 1_420_045_200_000;
/// Bit length of the timestamp field (~139 years from the epoch).
pub const BIT_LEN_TIMESTAMP: u64 = 42;
/// Bit length of the machine id field.
pub const BIT_LEN_MACHINE_ID: u64 = 6;
/// Bit length of the sequence field.
pub const BIT_LEN_SEQUENCE: u64 = 16;
/// Shift of the timestamp field within an identifier.
pub const TIMESTAMP_SHIFT: u64 = BIT_LEN_MACHINE_ID + BIT_LEN_SEQUENCE;
/// Shift of the machine id field within an identifier.
pub const MACHINE_ID_SHIFT: u64 = BIT_LEN_SEQUENCE;
/// Exclusive upper bound for machine ids.
pub const MAX_MACHINE_ID: u8 = 1 << BIT_LEN_MACHINE_ID;
/// Largest sequence number minted within one millisecond. The field is 16
/// bits wide but the counter caps at 16384 values per millisecond.
pub const MAX_SEQUENCE: u16 = 16_383;
/// Largest epoch-relative timestamp an identifier can carry.
pub const MAX_TIMESTAMP: u64 = (1 << BIT_LEN_TIMESTAMP) - 1;

const MACHINE_ID_MASK: u64 = (1 << BIT_LEN_MACHINE_ID) - 1;
const SEQUENCE_MASK: u64 = (1 << BIT_LEN_SEQUENCE) - 1;

/// Radix of the textual identifier form.
pub const ALPHA_NUMERIC_BASE: u64 = 36;

/// The parts of an identifier, recovered by [`decode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedId {
    /// The identifier the parts were extracted from.
    pub id: u64,
    /// Absolute creation time, in milliseconds since the Unix epoch.
    pub timestamp_millis: u64,
    pub machine_id: u8,
    pub sequence: u16,
}

impl DecodedId {
    /// The creation time as an absolute instant.
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp_millis as i64)
            .expect("a 42-bit epoch-relative timestamp is always representable")
    }
}

/// Pack an epoch-relative timestamp, machine id and sequence into an
/// identifier.
///
/// Each field is bounds-checked against its bit width; a violation returns
/// [`Error::FieldOverflow`].
pub fn encode(timestamp: u64, machine_id: u8, sequence: u16) -> Result<u64, Error> {
    if timestamp > MAX_TIMESTAMP {
        return Err(Error::FieldOverflow {
            field: "timestamp",
            value: timestamp,
            max: MAX_TIMESTAMP,
        });
    }
    if machine_id >= MAX_MACHINE_ID {
        return Err(Error::FieldOverflow {
            field: "machine id",
            value: machine_id as u64,
            max: (MAX_MACHINE_ID - 1) as u64,
        });
    }
    if sequence > MAX_SEQUENCE {
        return Err(Error::FieldOverflow {
            field: "sequence",
            value: sequence as u64,
            max: MAX_SEQUENCE as u64,
        });
    }
    Ok((timestamp << TIMESTAMP_SHIFT) | ((machine_id as u64) << MACHINE_ID_SHIFT) | sequence as u64)
}

/// Break an identifier up into its parts.
///
/// Each field is extracted with its own mask: 6 bits for the machine id,
/// 16 bits for the sequence.
pub fn decode(id: u64) -> DecodedId {
    DecodedId {
        id,
        timestamp_millis: (id >> TIMESTAMP_SHIFT) + EPOCH_MILLIS,
        machine_id: ((id >> MACHINE_ID_SHIFT) & MACHINE_ID_MASK) as u8,
        sequence: (id & SEQUENCE_MASK) as u16,
    }
}

/// Render an identifier as a lowercase base-36 string.
pub fn to_alpha(id: u64) -> String {
    if id == 0 {
        return "0".to_owned();
    }
    // u64::MAX is 13 digits in base 36.
    let mut digits = Vec::with_capacity(13);
    let mut n = id;
    while n > 0 {
        let d = (n % ALPHA_NUMERIC_BASE) as u8;
        digits.push(if d < 10 { b'0' + d } else { b'a' + d - 10 });
        n /= ALPHA_NUMERIC_BASE;
    }
    digits.reverse();
    // Digits are ASCII by construction.
    String::from_utf8(digits).expect("base-36 digits are ascii")
}

/// Parse a base-36 string back into an identifier. Case-insensitive.
///
/// Fails with [`Error::MalformedAlphaId`] when the input is empty, contains
/// a non-base-36 byte, or encodes a value larger than 64 bits.
pub fn from_alpha(alpha: &str) -> Result<u64, Error> {
    if alpha.is_empty() {
        return Err(Error::MalformedAlphaId(alpha.to_owned()));
    }
    let mut acc: u64 = 0;
    for b in alpha.bytes() {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'z' => b - b'a' + 10,
            b'A'..=b'Z' => b - b'A' + 10,
            _ => return Err(Error::MalformedAlphaId(alpha.to_owned())),
        };
        acc = acc
            .checked_mul(ALPHA_NUMERIC_BASE)
            .and_then(|v| v.checked_add(digit as u64))
            .ok_or_else(|| Error::MalformedAlphaId(alpha.to_owned()))?;
    }
    Ok(acc)
}

/// Parse a base-36 string and break it up into its parts.
pub fn decode_alpha(alpha: &str) -> Result<DecodedId, Error> {
    Ok(decode(from_alpha(alpha)?))
}
