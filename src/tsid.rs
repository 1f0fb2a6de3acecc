use crate::error::Error;
use chrono::{DateTime, Utc};
use std::{cmp::Ordering, fmt, str::FromStr};

/// The custom epoch, 2015-01-01T00:00:00Z, in milliseconds since the Unix epoch.
pub const CUSTOM_EPOCH_MS: i64 = 1_420_070_400_000;

/// bit length of time
pub const BIT_LEN_TIME: u32 = 41;
/// bit length of the worker id
pub const BIT_LEN_WORKER_ID: u32 = 5;
/// bit length of the process id
pub const BIT_LEN_PROCESS_ID: u32 = 5;
/// bit length of sequence number
pub const BIT_LEN_SEQUENCE: u32 = 12;

pub(crate) const SHIFT_PROCESS_ID: u32 = BIT_LEN_SEQUENCE;
pub(crate) const SHIFT_WORKER_ID: u32 = BIT_LEN_SEQUENCE + BIT_LEN_PROCESS_ID;
pub(crate) const SHIFT_TIME: u32 = BIT_LEN_SEQUENCE + BIT_LEN_PROCESS_ID + BIT_LEN_WORKER_ID;

/// Largest worker id that fits in the layout.
pub const MAX_WORKER_ID: i64 = (1 << BIT_LEN_WORKER_ID) - 1;
/// Largest process id that fits in the layout.
pub const MAX_PROCESS_ID: i64 = (1 << BIT_LEN_PROCESS_ID) - 1;
/// Largest sequence number issued within one millisecond.
pub const MAX_SEQUENCE: i64 = (1 << BIT_LEN_SEQUENCE) - 1;
/// Largest elapsed time, in milliseconds since [`CUSTOM_EPOCH_MS`].
pub const MAX_ELAPSED_TIME: i64 = (1 << BIT_LEN_TIME) - 1;

const MASK_WORKER_ID: i64 = MAX_WORKER_ID << SHIFT_WORKER_ID;
const MASK_PROCESS_ID: i64 = MAX_PROCESS_ID << SHIFT_PROCESS_ID;

/// Number of characters in the canonical string form.
pub const TSID_CHARS: usize = 13;

const ALPHABET_UPPERCASE: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const ALPHABET_LOWERCASE: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";
const NO_VALUE: u8 = 255;

/// Crockford base32 decoding table, case insensitive, with the `O`/`I`/`L` aliases.
const LOOKUP: [u8; 128] = {
    let mut lut = [NO_VALUE; 128];
    let mut i = 0;
    while i < 32 {
        lut[ALPHABET_UPPERCASE[i] as usize] = i as u8;
        lut[ALPHABET_LOWERCASE[i] as usize] = i as u8;
        i += 1;
    }
    lut[b'O' as usize] = 0;
    lut[b'o' as usize] = 0;
    lut[b'I' as usize] = 1;
    lut[b'i' as usize] = 1;
    lut[b'L' as usize] = 1;
    lut[b'l' as usize] = 1;
    lut
};

/// Builds an id from its parts.
///
/// `timestamp` is in milliseconds since the Unix epoch. Every part is masked
/// to the width of its field; no range checks are made.
pub fn compose(timestamp: i64, worker_id: i64, process_id: i64, sequence: i64) -> i64 {
    ((timestamp - CUSTOM_EPOCH_MS) & MAX_ELAPSED_TIME) << SHIFT_TIME
        | (worker_id & MAX_WORKER_ID) << SHIFT_WORKER_ID
        | (process_id & MAX_PROCESS_ID) << SHIFT_PROCESS_ID
        | (sequence & MAX_SEQUENCE)
}

/// DecomposedTsid is the parts of a TSID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecomposedTsid {
    pub id: i64,
    pub msb: i64,
    /// Milliseconds since [`CUSTOM_EPOCH_MS`].
    pub time: i64,
    pub worker_id: i64,
    pub process_id: i64,
    pub sequence: i64,
}

impl DecomposedTsid {
    /// Returns the timestamp in milliseconds since the Unix epoch.
    pub fn unix_millis(&self) -> i64 {
        self.time + CUSTOM_EPOCH_MS
    }

    /// Returns `[timestamp, worker_id, process_id, sequence]`, the timestamp
    /// in milliseconds since the Unix epoch.
    pub fn to_array(&self) -> [i64; 4] {
        [
            self.unix_millis(),
            self.worker_id,
            self.process_id,
            self.sequence,
        ]
    }
}

/// Break a TSID up into its parts.
pub fn decompose(id: i64) -> DecomposedTsid {
    DecomposedTsid {
        id,
        msb: ((id as u64) >> 63) as i64,
        time: ((id as u64) >> SHIFT_TIME) as i64,
        worker_id: (id & MASK_WORKER_ID) >> SHIFT_WORKER_ID,
        process_id: (id & MASK_PROCESS_ID) >> SHIFT_PROCESS_ID,
        sequence: id & MAX_SEQUENCE,
    }
}

/// Parse an id into `[timestamp, worker_id, process_id, sequence]`.
///
/// The timestamp is in milliseconds since the Unix epoch. Values that were
/// not built with this layout decode to meaningless parts.
pub fn parse(id: i64) -> [i64; 4] {
    decompose(id).to_array()
}

/// Returns the instant an id was generated at.
pub fn generated_at(id: i64) -> DateTime<Utc> {
    millis_to_datetime(decompose(id).unix_millis())
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    // The 42 bits left after the unsigned shift stay well inside chrono's range.
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// A Time-Sorted unique IDentifier.
///
/// Wraps the raw 64-bit value. The canonical text form is 13 characters of
/// Crockford base32:
///
/// ```
/// use tsid_gen::Tsid;
///
/// let tsid: Tsid = "0AXFXR5W7VBX0".parse().unwrap();
/// assert_eq!(tsid.to_string(), "0AXFXR5W7VBX0");
/// assert_eq!(tsid.to_lowercase(), "0axfxr5w7vbx0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tsid(i64);

impl Tsid {
    /// Wraps a raw value.
    pub const fn from_i64(number: i64) -> Self {
        Self(number)
    }

    /// Builds a TSID from its parts; see [`compose`].
    pub fn from_parts(timestamp: i64, worker_id: i64, process_id: i64, sequence: i64) -> Self {
        Self(compose(timestamp, worker_id, process_id, sequence))
    }

    /// Returns the raw value.
    pub const fn to_i64(self) -> i64 {
        self.0
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(i64::from_be_bytes(bytes))
    }

    /// Big-endian bytes.
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn decompose(self) -> DecomposedTsid {
        decompose(self.0)
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_millis(self) -> i64 {
        self.decompose().unix_millis()
    }

    /// Milliseconds since [`CUSTOM_EPOCH_MS`].
    pub fn elapsed_millis(self) -> i64 {
        self.decompose().time
    }

    pub fn worker_id(self) -> i64 {
        self.decompose().worker_id
    }

    pub fn process_id(self) -> i64 {
        self.decompose().process_id
    }

    pub fn sequence(self) -> i64 {
        self.decompose().sequence
    }

    pub fn generated_at(self) -> DateTime<Utc> {
        generated_at(self.0)
    }

    /// Canonical string in lower case.
    pub fn to_lowercase(self) -> String {
        self.encode(ALPHABET_LOWERCASE)
    }

    /// Checks that `s` is a canonical TSID string.
    pub fn is_valid(s: &str) -> bool {
        s.parse::<Tsid>().is_ok()
    }

    fn encode(self, alphabet: &[u8; 32]) -> String {
        let number = self.0 as u64;
        (0..TSID_CHARS)
            .map(|i| {
                let shift = 5 * (TSID_CHARS - 1 - i);
                alphabet[((number >> shift) & 0x1F) as usize] as char
            })
            .collect()
    }
}

fn decode_char(c: char) -> Result<u64, Error> {
    if !c.is_ascii() {
        return Err(Error::InvalidCharacter(c));
    }
    match LOOKUP[c as usize] {
        NO_VALUE => Err(Error::InvalidCharacter(c)),
        value => Ok(u64::from(value)),
    }
}

impl FromStr for Tsid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != TSID_CHARS {
            return Err(Error::InvalidLength(s.len()));
        }
        let mut number = 0u64;
        for (i, c) in s.chars().enumerate() {
            let value = decode_char(c)?;
            // 13 chars carry 65 bits; the extra top bit must be clear.
            if i == 0 && value & 0b10000 != 0 {
                return Err(Error::Overflow);
            }
            number = (number << 5) | value;
        }
        Ok(Self(number as i64))
    }
}

impl fmt::Display for Tsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode(ALPHABET_UPPERCASE))
    }
}

/// TSIDs compare as unsigned 64-bit integers.
impl Ord for Tsid {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.0 as u64).cmp(&(other.0 as u64))
    }
}

impl PartialOrd for Tsid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for Tsid {
    fn from(number: i64) -> Self {
        Self(number)
    }
}

impl From<Tsid> for i64 {
    fn from(tsid: Tsid) -> Self {
        tsid.0
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::Tsid;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    impl Serialize for Tsid {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    struct TsidVisitor;

    impl de::Visitor<'_> for TsidVisitor {
        type Value = Tsid;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a 13 character Crockford base32 TSID string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Tsid, E> {
            v.parse().map_err(de::Error::custom)
        }
    }

    impl<'de> Deserialize<'de> for Tsid {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_str(TsidVisitor)
        }
    }
}
