/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::fmt;

#[derive(Debug,Clone,PartialEq,Eq,Hash)]
pub struct PeerId (pub String);

impl fmt::Display for PeerId {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from (s: &str) -> Self { PeerId(s.to_string()) }
}

impl From<String> for PeerId {
    fn from (s: String) -> Self { PeerId(s) }
}

/// join order: monotonically assigned per session. the peer with the lowest order is
/// the authoritative one - asked to provide canonical animation state.
pub type JoinOrder = u64;

/// a connected peer's identity and sync-relevant state. the transport itself, and the
/// session-facing echo channel, are owned by whatever embeds this (see `Session`) - this
/// struct only holds what the protocol needs to reason about the peer.
#[derive(Debug,Clone)]
pub struct Peer {
    pub id: PeerId,
    pub order: JoinOrder,
    pub latency_ms: u64,
    pub authoritative: bool,
}

impl Peer {
    pub fn new (id: impl Into<PeerId>, order: JoinOrder, authoritative: bool) -> Self {
        Peer { id: id.into(), order, latency_ms: 0, authoritative }
    }

    pub fn with_latency (mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_order_is_conventionally_authoritative() {
        let peers = vec![
            Peer::new("b", 2, false),
            Peer::new("a", 1, true),
            Peer::new("c", 3, false),
        ];
        let authoritative = peers.iter().min_by_key(|p| p.order).unwrap();
        assert_eq!(authoritative.id, PeerId::from("a"));
        assert!(authoritative.authoritative);
    }
}
