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

use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::Mutex;

use odin_actor::info;

use crate::errors::{op_failed, Result, SyncError};
use crate::message::{reply_pair, Payload, ReplyContinuation, ReplyPayload};
use crate::peer::Peer;
use crate::reconciler;
use crate::router::Router;
use crate::session::Session;
use crate::stage::{Stage, SEQUENCE};
use crate::transport::{SessionCache, Transport};

/// drives one peer through the fixed sync sequence (§4.6), replaying cached state through
/// its `Router` and draining the queue between stages.
///
/// the router is shared behind a mutex rather than owned outright: the application's own
/// live traffic for this peer (§3's "application -> router" data flow) must classify
/// through the *same* router and stage state the driver is advancing, concurrently with
/// the cache replay (see `handle()`/`RouterHandle`). contention is never real - one task
/// drives the sync, the other only calls in occasionally - so a single async mutex is
/// enough; nothing here needs true parallelism.
pub struct SyncDriver {
    peer: Peer,
    router: Arc<Mutex<Router>>,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn SessionCache>,
    session: Session,
}

/// a cloneable façade onto the same peer's router, for live application traffic arriving
/// while its `SyncDriver::run` is in flight.
#[derive(Clone)]
pub struct RouterHandle {
    router: Arc<Mutex<Router>>,
    transport: Arc<dyn Transport>,
}

impl RouterHandle {
    pub async fn route_live_message (&self, message: Payload, reply: Option<ReplyContinuation>) -> Result<()> {
        let mut router = self.router.lock().await;
        router.send(self.transport.as_ref(), message, reply).await
    }
}

impl SyncDriver {
    pub fn new (peer: Peer, transport: Arc<dyn Transport>, cache: Arc<dyn SessionCache>, session: Session) -> Self {
        let mut router = Router::new(peer.id.clone());
        // §4.8: this peer is sole-authoritative only while the session has no other
        // authoritative client to speak of - that's also exactly when `conn` is set.
        if peer.authoritative {
            if let Some(echo) = session.conn.clone() {
                router = router.with_reply_echo(echo);
            }
        }
        SyncDriver { peer, router: Arc::new(Mutex::new(router)), transport, cache, session }
    }

    pub fn handle (&self) -> RouterHandle {
        RouterHandle { router: self.router.clone(), transport: self.transport.clone() }
    }

    /// §4.6 top-level algorithm.
    pub async fn run (&mut self) -> Result<()> {
        self.begin(Stage::Always).await;

        if self.session.peer_authoritative {
            for stage in SEQUENCE {
                self.begin(stage).await;
                self.execute_stage(stage).await?;
                self.complete(stage).await;
                self.drain().await?;
            }
        }

        self.complete(Stage::Always).await;
        self.send_and_forget(Payload::SyncComplete).await?;
        self.drain().await?;
        info!("peer {}: sync complete", self.peer.id);
        Ok(())
    }

    async fn begin (&self, stage: Stage) {
        self.router.lock().await.stages_mut().begin(stage);
    }

    async fn complete (&self, stage: Stage) {
        self.router.lock().await.stages_mut().complete(stage);
    }

    async fn drain (&self) -> Result<()> {
        self.router.lock().await.drain(self.transport.as_ref()).await
    }

    async fn send (&self, payload: Payload, reply: Option<ReplyContinuation>) -> Result<()> {
        self.router.lock().await.send(self.transport.as_ref(), payload, reply).await
    }

    async fn send_and_forget (&self, payload: Payload) -> Result<()> {
        self.send(payload, None).await
    }

    async fn execute_stage (&mut self, stage: Stage) -> Result<()> {
        match stage {
            Stage::LoadAssets => self.run_load_assets().await,
            Stage::CreateActors => self.run_create_actors().await,
            Stage::SetBehaviors => self.run_set_behaviors().await,
            Stage::CreateAnimations => self.run_create_animations().await,
            Stage::SyncAnimations => self.run_sync_animations().await,
            Stage::Always | Stage::Never => Ok(()),
        }
    }

    /// §4.6.1 load-assets: cached loads dispatched concurrently and awaited, then asset
    /// updates replayed with no reply expected.
    async fn run_load_assets (&mut self) -> Result<()> {
        let assets = self.cache.assets();
        let mut receivers = Vec::with_capacity(assets.len());
        for asset in assets {
            let (tx, rx) = reply_pair();
            self.send(asset, Some(tx)).await?;
            receivers.push(rx);
        }
        try_join_all(receivers).await.map_err(|_| SyncError::PeerDisconnected { peer: self.peer.id.clone() })?;

        for update in self.cache.asset_updates() {
            self.send_and_forget(update).await?;
        }
        Ok(())
    }

    /// §4.6.1 create-actors: depth-first by level. every actor at a level is sent and its
    /// reply joined before any of that level's children are sent, so a child's parent
    /// reference is always already materialized.
    async fn run_create_actors (&mut self) -> Result<()> {
        let mut frontier = self.cache.root_actor_ids();

        while !frontier.is_empty() {
            let mut receivers = Vec::with_capacity(frontier.len());
            for actor_id in &frontier {
                let cached = self.cache.actor(actor_id)
                    .ok_or_else(|| op_failed(format!("session cache has no entry for actor {actor_id}")))?;
                let (tx, rx) = reply_pair();
                self.send(cached.created_message, Some(tx)).await?;
                receivers.push(rx);
            }
            try_join_all(receivers).await.map_err(|_| SyncError::PeerDisconnected { peer: self.peer.id.clone() })?;

            let mut next = Vec::new();
            for actor_id in &frontier {
                next.extend(self.cache.children_of(actor_id));
            }
            frontier = next;
        }
        Ok(())
    }

    /// §4.6.1 set-behaviors: fire-and-forget per actor with a non-empty behavior.
    async fn run_set_behaviors (&mut self) -> Result<()> {
        for actor_id in self.all_cached_actor_ids() {
            if let Some(cached) = self.cache.actor(&actor_id) {
                if let Some(behavior_type) = cached.behavior {
                    self.send_and_forget(Payload::SetBehavior { actor_id, behavior_type }).await?;
                }
            }
        }
        Ok(())
    }

    /// §4.6.1 create-animations: interpolations are forwarded with playback suppressed
    /// (resumed implicitly once sync-animations hands out the real clock), then every
    /// animation's creation is sent-and-awaited.
    async fn run_create_animations (&mut self) -> Result<()> {
        for actor_id in self.all_cached_actor_ids() {
            let cached = match self.cache.actor(&actor_id) { Some(c) => c, None => continue };

            for interpolation in cached.active_interpolations {
                let suppressed = match interpolation {
                    Payload::InterpolateActor { actor_id, .. } => Payload::InterpolateActor { actor_id, enabled: false },
                    other => other,
                };
                self.send_and_forget(suppressed).await?;
            }

            let mut receivers = Vec::with_capacity(cached.created_animations.len());
            for animation in cached.created_animations {
                let (tx, rx) = reply_pair();
                self.send(animation, Some(tx)).await?;
                receivers.push(rx);
            }
            try_join_all(receivers).await.map_err(|_| SyncError::PeerDisconnected { peer: self.peer.id.clone() })?;
        }
        Ok(())
    }

    /// §4.7: the authoritative peer is asked for current animation state; replies are
    /// latency-compensated and forwarded to the joining peer bypassing the router, since
    /// sync-animations is explicitly allowed during its own stage.
    async fn run_sync_animations (&mut self) -> Result<()> {
        if self.peer.authoritative {
            return Ok(())
        }

        let authoritative = self.session.authoritative_client.clone()
            .ok_or_else(|| SyncError::AuthoritativePeerUnreachable { peer: self.peer.id.clone() })?;
        let authoritative_transport = self.session.authoritative_transport.clone()
            .ok_or_else(|| SyncError::AuthoritativePeerUnreachable { peer: self.peer.id.clone() })?;

        let (tx, rx) = reply_pair();
        {
            let mut router = self.router.lock().await;
            router.send(authoritative_transport.as_ref(), Payload::SyncAnimationsRequest, Some(tx)).await?;
        }

        let reply = rx.await.map_err(|_| SyncError::AuthoritativePeerUnreachable { peer: self.peer.id.clone() })?;
        let mut states = match reply {
            ReplyPayload::AnimationStates(states) => states,
            _ => return Err(SyncError::AuthoritativePeerUnreachable { peer: self.peer.id.clone() }),
        };

        reconciler::reconcile(&mut states, &authoritative, &self.peer);
        self.transport.send(Payload::SyncAnimationsReply { states }, None).await
    }

    fn all_cached_actor_ids (&self) -> Vec<String> {
        let mut ids = Vec::new();
        let mut frontier = self.cache.root_actor_ids();
        while let Some(actor_id) = frontier.pop() {
            let children = self.cache.children_of(&actor_id);
            frontier.extend(children);
            ids.push(actor_id);
        }
        ids
    }
}
