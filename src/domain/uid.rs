// src/domain/uid.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::error::{DomainError, DomainResult};
use crate::util::rand::fill_random;

const BASE62: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub const UID_BYTES: usize = 20;
pub const UID_ENCODED_LEN: usize = 27;
const TIMESTAMP_BYTES: usize = 4;

/// Sortable identifier for bookmarks and feed entries.
///
/// Four big-endian bytes of Unix seconds followed by sixteen random bytes.
/// The text form is fixed-width base62 over an ASCII-ordered alphabet, so
/// string order and generation order agree at second granularity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid([u8; UID_BYTES]);

impl Uid {
    /// Generates a fresh UID stamped with the current time.
    pub fn new() -> DomainResult<Self> {
        Self::at(Utc::now())
    }

    pub fn at(time: DateTime<Utc>) -> DomainResult<Self> {
        let mut payload = [0u8; UID_BYTES - TIMESTAMP_BYTES];
        fill_random(&mut payload)?;
        let seconds = u32::try_from(time.timestamp().max(0)).unwrap_or(u32::MAX);
        Ok(Self::from_parts(seconds, payload))
    }

    pub fn from_parts(seconds: u32, payload: [u8; UID_BYTES - TIMESTAMP_BYTES]) -> Self {
        let mut bytes = [0u8; UID_BYTES];
        bytes[..TIMESTAMP_BYTES].copy_from_slice(&seconds.to_be_bytes());
        bytes[TIMESTAMP_BYTES..].copy_from_slice(&payload);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; UID_BYTES] {
        &self.0
    }

    pub fn seconds(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(i64::from(self.seconds()), 0)
            .single()
            .unwrap_or_default()
    }

    /// Validates the text form without keeping the value.
    pub fn validate(s: &str) -> DomainResult<()> {
        s.parse::<Uid>().map(|_| ())
    }
}

fn encode(bytes: &[u8; UID_BYTES]) -> String {
    let mut out = [b'0'; UID_ENCODED_LEN];
    let mut pos = UID_ENCODED_LEN;
    let mut digits: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();

    while !digits.is_empty() {
        let mut remainder: u32 = 0;
        let mut quotient = Vec::with_capacity(digits.len());
        for digit in &digits {
            let acc = remainder * 256 + u32::from(*digit);
            let q = acc / 62;
            remainder = acc % 62;
            if !quotient.is_empty() || q != 0 {
                quotient.push(q as u8);
            }
        }
        pos -= 1;
        out[pos] = BASE62[remainder as usize];
        digits = quotient;
    }

    out.iter().map(|b| *b as char).collect()
}

fn base62_value(c: u8) -> Option<u32> {
    match c {
        b'0'..=b'9' => Some(u32::from(c - b'0')),
        b'A'..=b'Z' => Some(u32::from(c - b'A') + 10),
        b'a'..=b'z' => Some(u32::from(c - b'a') + 36),
        _ => None,
    }
}

fn decode(s: &str) -> DomainResult<[u8; UID_BYTES]> {
    if s.len() != UID_ENCODED_LEN {
        return Err(DomainError::UidInvalid(format!(
            "expected {} characters, got {}",
            UID_ENCODED_LEN,
            s.len()
        )));
    }

    let mut out = [0u8; UID_BYTES];
    for c in s.bytes() {
        let mut carry = base62_value(c)
            .ok_or_else(|| DomainError::UidInvalid(format!("invalid character {:?}", c as char)))?;
        for byte in out.iter_mut().rev() {
            let acc = u32::from(*byte) * 62 + carry;
            *byte = (acc & 0xff) as u8;
            carry = acc >> 8;
        }
        if carry != 0 {
            return Err(DomainError::UidInvalid("value out of range".to_string()));
        }
    }
    Ok(out)
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(&self.0))
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self)
    }
}

impl FromStr for Uid {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s).map(Uid)
    }
}

impl Serialize for Uid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_zero_and_max_values_when_encoded_then_fixed_width() {
        let zero = Uid([0u8; UID_BYTES]);
        let max = Uid([0xff; UID_BYTES]);

        assert_eq!(zero.to_string(), "000000000000000000000000000");
        assert_eq!(max.to_string(), "aWgEPTl1tmebfsQzFP4bxwgy80V");
    }

    #[test]
    fn given_generated_uid_when_parsed_back_then_identical() {
        let uid = Uid::new().unwrap();
        let text = uid.to_string();

        assert_eq!(text.len(), UID_ENCODED_LEN);
        assert_eq!(text.parse::<Uid>().unwrap(), uid);
    }

    #[test]
    fn given_uids_from_later_seconds_when_compared_as_text_then_ordered() {
        let earlier = Uid::from_parts(1_700_000_000, [0xff; 16]);
        let later = Uid::from_parts(1_700_000_001, [0x00; 16]);

        assert!(earlier.to_string() < later.to_string());
        assert!(earlier < later);
    }

    #[test]
    fn given_timestamp_when_generating_then_leading_bytes_hold_seconds() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let uid = Uid::at(time).unwrap();

        assert_eq!(uid.timestamp(), time);
    }

    #[test]
    fn given_malformed_text_when_parsed_then_uid_invalid() {
        assert!(matches!("".parse::<Uid>(), Err(DomainError::UidInvalid(_))));
        assert!(matches!("short".parse::<Uid>(), Err(DomainError::UidInvalid(_))));
        assert!(matches!(
            "00000000000000000000000000!".parse::<Uid>(),
            Err(DomainError::UidInvalid(_))
        ));
        // one past the largest 160-bit value
        assert!(matches!(
            "aWgEPTl1tmebfsQzFP4bxwgy80W".parse::<Uid>(),
            Err(DomainError::UidInvalid(_))
        ));
    }
}
