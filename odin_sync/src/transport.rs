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

use async_trait::async_trait;

use crate::errors::Result;
use crate::message::{Payload, ReplyContinuation};

/// the per-peer connection. owned and implemented by whatever embeds this crate - this core
/// only ever calls `send`, and separately samples `latency_ms` during startup calibration
/// (see `startup::calibrate`). ordering (FIFO per peer) is the transport's responsibility.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send (&self, message: Payload, reply: Option<ReplyContinuation>) -> Result<()>;

    /// round-trip heartbeat used by the calibration burst; one full round-trip per call.
    async fn ping (&self) -> Result<()>;
}

/// one actor as recorded by the session cache at the moment a joining peer starts its sync.
/// opaque beyond what the stage drivers need to replay it.
#[derive(Debug,Clone)]
pub struct CachedActor {
    pub actor_id: String,
    pub parent_id: Option<String>,
    pub created_message: Payload,
    pub created_animations: Vec<Payload>,
    pub active_interpolations: Vec<Payload>,
    pub behavior: Option<String>,
}

/// read-only view over everything the application has cached so far: load-asset and
/// asset-update history, and the actor tree. mutated only by the application's own task;
/// sync drivers only read, and must tolerate concurrent appends by observing a consistent
/// growing prefix - entries appended after a peer's sync begins are live traffic, routed
/// separately, not cache replay.
pub trait SessionCache: Send + Sync {
    fn assets (&self) -> Vec<Payload>;
    fn asset_updates (&self) -> Vec<Payload>;
    fn root_actor_ids (&self) -> Vec<String>;
    fn actor (&self, actor_id: &str) -> Option<CachedActor>;
    fn children_of (&self, actor_id: &str) -> Vec<String>;
}
