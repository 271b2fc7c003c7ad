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

use std::collections::HashSet;

use tokio::sync::mpsc::UnboundedSender;

use odin_actor::{warn,error};

use crate::errors::Result;
use crate::message::{Payload, Discriminant, ReplyContinuation, ReplyPayload};
use crate::peer::PeerId;
use crate::queue::{PeerQueue, QueuedMessage};
use crate::rules::{rule_for, Handling, RULE_TABLE};
use crate::stage::{Stage, StageState};
use crate::transport::Transport;

/// consults the rule table and a peer's stage state to classify every outbound message,
/// and owns that peer's queue of deferred ones. this is the only place classification
/// happens - stage drivers and the queue drain both go through `route`/`send`.
pub struct Router {
    peer: PeerId,
    stages: StageState,
    queue: PeerQueue,
    warned_unknown: HashSet<String>,
    /// §4.8: set only while this peer is the sole member of its session. every reply an
    /// `allow`ed, reply-expecting message eventually receives is also pushed here, since
    /// the host application is awaiting it directly on its own connection.
    echo: Option<UnboundedSender<ReplyPayload>>,
}

impl Router {
    pub fn new (peer: PeerId) -> Self {
        Router { peer, stages: StageState::new(), queue: PeerQueue::new(), warned_unknown: HashSet::new(), echo: None }
    }

    pub fn with_reply_echo (mut self, echo: UnboundedSender<ReplyPayload>) -> Self {
        self.echo = Some(echo);
        self
    }

    pub fn stages (&self) -> &StageState { &self.stages }
    pub fn stages_mut (&mut self) -> &mut StageState { &mut self.stages }
    pub fn queue_len (&self) -> usize { self.queue.len() }

    /// wraps a reply continuation so that, once resolved, its value is forwarded to both
    /// the original caller and the session's application-facing echo channel.
    fn tap_reply (reply: ReplyContinuation, echo: UnboundedSender<ReplyPayload>) -> ReplyContinuation {
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            if let Ok(value) = rx.await {
                let _ = echo.send(value.clone());
                let _ = reply.send(value);
            }
        });
        tx
    }

    /// classify a message without side effects - `route(m) == Handling::queue` is the
    /// condition the drain loop polls on.
    pub fn route (&mut self, payload: &Payload) -> Handling {
        let discriminant = payload.discriminant();
        let rule = match RULE_TABLE.get(&discriminant) {
            Some(r) => *r,
            None => {
                if let Discriminant::Unknown(tag) = &discriminant {
                    if self.warned_unknown.insert(tag.clone()) {
                        warn!("peer {}: no rule for discriminant {:?}, deferring under default rule", self.peer, discriminant);
                    }
                }
                rule_for(&discriminant)
            }
        };

        if self.stages.is_complete(rule.stage) {
            rule.after
        } else if self.stages.is_in_progress(rule.stage) {
            rule.during
        } else {
            rule.before
        }
    }

    /// classify and act: forward, defer, drop, or reject. this is the single entry point
    /// application and replay traffic both go through.
    pub async fn send (&mut self, transport: &dyn Transport, message: Payload, reply: Option<ReplyContinuation>) -> Result<()> {
        match self.route(&message) {
            Handling::Allow => {
                let reply = match (reply, &self.echo) {
                    (Some(reply), Some(echo)) => Some(Self::tap_reply(reply, echo.clone())),
                    (reply, _) => reply,
                };
                transport.send(message, reply).await
            }
            Handling::Queue => {
                self.queue.push(QueuedMessage::new(message, reply));
                Ok(())
            }
            Handling::Ignore => {
                if let Some(reply) = reply {
                    warn!("peer {}: dropping {:?}, resolving its reply as ignored", self.peer, message.discriminant());
                    let _ = reply.send(ReplyPayload::Ignored);
                }
                Ok(())
            }
            Handling::Error => {
                error!(
                    "peer {}: rule violation for {:?} at stage {:?} (in_progress={:?}, stage_complete)",
                    self.peer, message.discriminant(), rule_for(&message.discriminant()).stage, self.stages.is_in_progress(rule_for(&message.discriminant()).stage)
                );
                Ok(())
            }
        }
    }

    /// §4.6.2 queue drain: repeatedly pulls every now-`allow`ed entry and dispatches it,
    /// until nothing more is eligible. terminates because every taken entry is removed for
    /// good - it never re-enters the queue.
    pub async fn drain (&mut self, transport: &dyn Transport) -> Result<()> {
        loop {
            let taken = self.queue.filter(|m| {
                let discriminant = m.discriminant();
                let rule = rule_for(&discriminant);
                let handling = if self.stages.is_complete(rule.stage) {
                    rule.after
                } else if self.stages.is_in_progress(rule.stage) {
                    rule.during
                } else {
                    rule.before
                };
                handling == Handling::Allow
            });
            if taken.is_empty() { break }
            for entry in taken {
                let reply = match (entry.reply, &self.echo) {
                    (Some(reply), Some(echo)) => Some(Self::tap_reply(reply, echo.clone())),
                    (reply, _) => reply,
                };
                transport.send(entry.message, reply).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingTransport {
        sent: Mutex<Vec<Discriminant>>,
    }

    impl RecordingTransport {
        fn new() -> Self { RecordingTransport { sent: Mutex::new(Vec::new()) } }
        fn trace (&self) -> Vec<Discriminant> { self.sent.lock().unwrap().clone() }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send (&self, message: Payload, reply: Option<ReplyContinuation>) -> Result<()> {
            self.sent.lock().unwrap().push(message.discriminant());
            if let Some(reply) = reply {
                let _ = reply.send(ReplyPayload::Ack);
            }
            Ok(())
        }
        async fn ping (&self) -> Result<()> { Ok(()) }
    }

    fn load (id: &str) -> Payload { Payload::LoadAsset { asset_id: id.into() } }
    fn create (id: &str) -> Payload { Payload::CreateActor { actor_id: id.into(), parent_id: None } }

    #[tokio::test]
    async fn queues_before_stage_begins_then_drains_when_in_progress() {
        let transport = RecordingTransport::new();
        let mut router = Router::new(PeerId::from("p1"));

        router.send(&transport, create("A"), None).await.unwrap();
        assert_eq!(router.queue_len(), 1);
        assert!(transport.trace().is_empty());

        router.stages_mut().begin(Stage::CreateActors);
        router.drain(&transport).await.unwrap();
        assert_eq!(router.queue_len(), 0);
        assert_eq!(transport.trace(), vec![Discriminant::CreateActor]);
    }

    #[tokio::test]
    async fn allowed_during_stage_is_sent_immediately() {
        let transport = RecordingTransport::new();
        let mut router = Router::new(PeerId::from("p1"));
        router.stages_mut().begin(Stage::LoadAssets);

        router.send(&transport, load("X"), None).await.unwrap();
        assert_eq!(transport.trace(), vec![Discriminant::LoadAsset]);
        assert_eq!(router.queue_len(), 0);
    }

    #[tokio::test]
    async fn ignore_resolves_reply_instead_of_stalling_caller() {
        let transport = RecordingTransport::new();
        let mut router = Router::new(PeerId::from("p1"));
        let (tx, rx) = crate::message::reply_pair();

        // sync-animations-reply is `ignore` before its stage begins
        router.send(&transport, Payload::SyncAnimationsReply { states: vec![] }, Some(tx)).await.unwrap();
        assert!(transport.trace().is_empty());
        match rx.await {
            Ok(ReplyPayload::Ignored) => {}
            other => panic!("expected Ignored reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_discriminant_defaults_to_queue_before_allow_after() {
        let transport = RecordingTransport::new();
        let mut router = Router::new(PeerId::from("p1"));
        let msg = Payload::Unknown { discriminant: "future-feature".into() };

        router.send(&transport, msg.clone(), None).await.unwrap();
        assert_eq!(router.queue_len(), 1);

        router.stages_mut().begin(Stage::Always);
        router.stages_mut().complete(Stage::Always);
        router.drain(&transport).await.unwrap();
        assert_eq!(router.queue_len(), 0);
    }
}
