// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Port identity
//!
//! Describes where the peer of a port lives: in this process, reachable directly, or on another
//! rank, reachable through the transport under a tag derived from the port's logical name.
//!

use crate::{runtime::RemoteLink, transport::Rank};

use serde::{Deserialize, Serialize};

use std::fmt::{Display, Formatter};

/// Stream identifier used on top of rank-to-rank messaging.
pub type Tag = u64;

const HASH_BASE: u64 = 53;
const HASH_MODULUS: u64 = 1_000_000_009;

/// Derives the tag of a logical port name.
///
/// Polynomial rolling hash over the UTF-8 bytes of `name`. The result only depends on the
/// name, so every rank computes the same tag for the same port.
pub fn compute_tag(name: &str) -> Tag {
    let mut hash = 0;
    let mut power = 1;
    for byte in name.bytes() {
        hash = (hash + (u64::from(byte) + 1) * power) % HASH_MODULUS;
        power = (power * HASH_BASE) % HASH_MODULUS;
    }
    hash
}

/// Logical name of the stream feeding the in port `port` of `actor`.
pub fn qualified_name(actor: &str, port: &str) -> String {
    format!("{}.{}", actor, port)
}

/// A port on another rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    pub rank: Rank,
    pub tag: Tag,
}

impl Display for RemoteEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "rank {} tag {}", self.rank, self.tag)
    }
}

/// Where the peer of a port is.
///
/// Exactly one form is populated. A port without a `PortIdentity` is not connected.
pub enum PortIdentity<L> {
    /// The peer lives in this process.
    Local(L),
    /// The peer lives on another rank.
    Remote(RemoteLink),
}

impl<L> PortIdentity<L> {
    pub fn is_local(&self) -> bool {
        matches!(self, PortIdentity::Local(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, PortIdentity::Remote(_))
    }

    /// Remote coordinates of the peer, if it is remote.
    pub fn endpoint(&self) -> Option<RemoteEndpoint> {
        match self {
            PortIdentity::Local(_) => None,
            PortIdentity::Remote(link) => Some(link.endpoint()),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_tag_is_deterministic() {
        let name = qualified_name("patch-0-1", "BND_LEFT");
        assert_eq!(name, "patch-0-1.BND_LEFT");
        assert_eq!(compute_tag(&name), compute_tag("patch-0-1.BND_LEFT"));
    }

    #[test]
    fn test_tag_known_values() {
        assert_eq!(compute_tag(""), 0);
        // 'a' = 97 -> 98
        assert_eq!(compute_tag("a"), 98);
        // 98 + 99 * 53
        assert_eq!(compute_tag("ab"), 98 + 99 * 53);
    }

    #[test]
    fn test_tags_differ_between_ports() {
        assert_ne!(
            compute_tag(&qualified_name("A", "out")),
            compute_tag(&qualified_name("B", "in"))
        );
        assert_ne!(compute_tag("A.in"), compute_tag("B.in"));
    }
}
