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

#![allow(unused)]

//! multi-peer synchronization protocol for a shared 3D scene: brings a freshly joined
//! peer to a state observationally identical to peers already present, by replaying
//! cached actor/asset/animation state through a stage-aware router while live
//! application traffic keeps flowing.

pub mod config;
pub mod driver;
pub mod errors;
pub mod message;
pub mod peer;
pub mod queue;
pub mod reconciler;
pub mod router;
pub mod rules;
pub mod session;
pub mod stage;
pub mod startup;
pub mod transport;

pub mod prelude {
    pub use crate::config::SyncConfig;
    pub use crate::driver::{RouterHandle, SyncDriver};
    pub use crate::errors::{Result, SyncError};
    pub use crate::message::{AnimationStateSample, Discriminant, Payload, ReplyPayload, reply_pair};
    pub use crate::peer::{JoinOrder, Peer, PeerId};
    pub use crate::queue::{PeerQueue, QueuedMessage};
    pub use crate::reconciler::reconcile;
    pub use crate::router::Router;
    pub use crate::rules::{rule_for, Handling, Rule, DEFAULT_RULE, RULE_TABLE};
    pub use crate::session::Session;
    pub use crate::stage::{Stage, StageState, SEQUENCE};
    pub use crate::startup::calibrate;
    pub use crate::transport::{CachedActor, SessionCache, Transport};
}
