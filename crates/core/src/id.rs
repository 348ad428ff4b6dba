//! Chained event identifiers.
//!
//! Each [`EventId`] records its position in the response (`sequence`), a
//! short digest of the id issued just before it (`link`) and a random
//! `nonce`. The textual form is `{sequence:08}-{link}-{nonce}`, e.g.
//! `00000003-9f86d081-k3x0q1v7za`.
//!
//! A consumer that knows this rule can check, for any two consecutive
//! events, that the second one [`follows`](EventId::follows) the first,
//! which exposes dropped or reordered events.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;

/// Link value carried by the first id of a chain.
pub const ROOT_LINK: &str = "00000000";

/// Length of the random suffix of an id.
const NONCE_LEN: usize = 10;

/// Alphabet for random tokens (nonces and stream ids).
const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// An opaque, globally unique, strictly ordered event identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventId {
    sequence: u64,
    link: String,
    nonce: String,
}

impl EventId {
    /// Derive the id that comes after `previous` (or the first id of a chain).
    pub fn successor(previous: Option<&EventId>) -> Self {
        let (sequence, link) = match previous {
            Some(prev) => (prev.sequence + 1, prev.digest()),
            None => (0, ROOT_LINK.to_string()),
        };
        Self {
            sequence,
            link,
            nonce: random_token(NONCE_LEN),
        }
    }

    /// Position of this id in its chain, starting at zero.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Digest of the predecessor, or [`ROOT_LINK`] for the first id.
    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn is_root(&self) -> bool {
        self.sequence == 0 && self.link == ROOT_LINK
    }

    /// Whether this id was derived directly from `previous`.
    pub fn follows(&self, previous: &EventId) -> bool {
        self.sequence == previous.sequence + 1 && self.link == previous.digest()
    }

    /// Parse the textual form produced by `Display`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, '-');
        let sequence = parts.next()?.parse::<u64>().ok()?;
        let link = parts.next()?;
        let nonce = parts.next()?;

        let valid_link = link.len() == 8 && link.bytes().all(|b| b.is_ascii_hexdigit());
        let valid_nonce = !nonce.is_empty() && nonce.bytes().all(|b| TOKEN_ALPHABET.contains(&b));
        if !valid_link || !valid_nonce {
            return None;
        }

        Some(Self {
            sequence,
            link: link.to_string(),
            nonce: nonce.to_string(),
        })
    }

    /// First four bytes of the SHA-256 of this id's textual form, as hex.
    fn digest(&self) -> String {
        let hash = Sha256::digest(self.to_string().as_bytes());
        hash[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08}-{}-{}", self.sequence, self.link, self.nonce)
    }
}

impl Ord for EventId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then_with(|| self.link.cmp(&other.link))
            .then_with(|| self.nonce.cmp(&other.nonce))
    }
}

impl PartialOrd for EventId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for EventId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        EventId::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid event id: {raw}")))
    }
}

/// Issues the id chain for one response.
///
/// Shared by a response handler and all of its streams so that every event of
/// the response lands on a single chain.
#[derive(Debug, Default)]
pub struct IdHandler {
    last: Option<EventId>,
}

impl IdHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id, chained to the one issued before it.
    pub fn next(&mut self) -> EventId {
        let id = EventId::successor(self.last.as_ref());
        self.last = Some(id.clone());
        id
    }

    /// The most recently issued id, if any.
    pub fn last(&self) -> Option<&EventId> {
        self.last.as_ref()
    }
}

/// Check that `ids` form an unbroken chain starting at the root.
pub fn is_chain<'a>(ids: impl IntoIterator<Item = &'a EventId>) -> bool {
    let mut previous: Option<&EventId> = None;
    for id in ids {
        let linked = match previous {
            Some(prev) => id.follows(prev),
            None => id.is_root(),
        };
        if !linked {
            return false;
        }
        previous = Some(id);
    }
    true
}

/// A random lowercase alphanumeric token of `len` characters.
pub(crate) fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}
