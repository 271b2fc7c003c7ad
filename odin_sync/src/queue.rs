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

use std::collections::VecDeque;

use crate::message::{Payload, ReplyContinuation};

/// a deferred outbound message plus whatever reply continuation its caller is awaiting.
/// created when the router returns `Handling::Queue`; destroyed when drained and dispatched
/// or when the peer disconnects and the whole queue is dropped.
pub struct QueuedMessage {
    pub message: Payload,
    pub reply: Option<ReplyContinuation>,
}

impl QueuedMessage {
    pub fn new (message: Payload, reply: Option<ReplyContinuation>) -> Self {
        QueuedMessage { message, reply }
    }
}

/// per-peer FIFO outbound queue. backed by a `VecDeque` for O(1) append; `filter` walks it
/// once, in order, splitting out everything the predicate accepts.
#[derive(Default)]
pub struct PeerQueue {
    entries: VecDeque<QueuedMessage>,
}

impl PeerQueue {
    pub fn new() -> Self {
        PeerQueue::default()
    }

    pub fn push (&mut self, entry: QueuedMessage) {
        self.entries.push_back(entry);
    }

    pub fn len (&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty (&self) -> bool {
        self.entries.is_empty()
    }

    /// removes entries matching `predicate`, in original order, and returns them to the
    /// caller; entries that don't match stay behind in their original relative order.
    pub fn filter <F: Fn(&Payload) -> bool> (&mut self, predicate: F) -> Vec<QueuedMessage> {
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if predicate(&entry.message) {
                taken.push(entry);
            } else {
                kept.push_back(entry);
            }
        }
        self.entries = kept;
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load (id: &str) -> Payload { Payload::LoadAsset { asset_id: id.into() } }
    fn create (id: &str) -> Payload { Payload::CreateActor { actor_id: id.into(), parent_id: None } }

    #[test]
    fn push_is_fifo() {
        let mut q = PeerQueue::new();
        q.push(QueuedMessage::new(load("a"), None));
        q.push(QueuedMessage::new(load("b"), None));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn filter_preserves_order_on_both_sides() {
        let mut q = PeerQueue::new();
        q.push(QueuedMessage::new(load("a"), None));
        q.push(QueuedMessage::new(create("x"), None));
        q.push(QueuedMessage::new(load("b"), None));
        q.push(QueuedMessage::new(create("y"), None));

        let taken = q.filter(|m| matches!(m, Payload::LoadAsset{..}));
        let taken_ids: Vec<_> = taken.iter().map(|e| match &e.message {
            Payload::LoadAsset{asset_id} => asset_id.clone(),
            _ => unreachable!(),
        }).collect();
        assert_eq!(taken_ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(q.len(), 2); // the two CreateActor entries remain, in order
    }

    #[test]
    fn empty_filter_leaves_queue_untouched() {
        let mut q = PeerQueue::new();
        q.push(QueuedMessage::new(load("a"), None));
        let taken = q.filter(|_| false);
        assert!(taken.is_empty());
        assert_eq!(q.len(), 1);
    }
}
