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

use tokio::sync::oneshot;

/// closed set of message families the router classifies by. every payload carries a tag
/// it can be classified on without the core inspecting its contents - `Unknown` is the
/// catch-all for application messages this crate has no rule for (defaulted, not rejected).
#[derive(Debug,Clone,PartialEq,Eq,Hash)]
pub enum Discriminant {
    LoadAsset,
    AssetUpdate,
    CreateActor,
    SetBehavior,
    CreateAnimation,
    InterpolateActor,
    SyncAnimationsRequest,
    SyncAnimationsReply,
    SyncComplete,
    Heartbeat,
    Unknown(String),
}

/// the opaque application payload, modeled as a tagged sum type per discriminant family.
/// the router never inspects fields beyond `discriminant()` - everything else is carried
/// through untouched except `AnimationStateSample.time`, which the reconciler rewrites.
#[derive(Debug,Clone)]
pub enum Payload {
    LoadAsset { asset_id: String },
    AssetUpdate { asset_id: String },
    CreateActor { actor_id: String, parent_id: Option<String> },
    SetBehavior { actor_id: String, behavior_type: String },
    CreateAnimation { animation_id: String },
    InterpolateActor { actor_id: String, enabled: bool },
    SyncAnimationsRequest,
    SyncAnimationsReply { states: Vec<AnimationStateSample> },
    SyncComplete,
    Heartbeat,
    /// application traffic this crate has no specific rule for - still dispatched, just
    /// deferred by the default rule until sync completes.
    Unknown { discriminant: String },
}

impl Payload {
    pub fn discriminant (&self) -> Discriminant {
        match self {
            Payload::LoadAsset{..} => Discriminant::LoadAsset,
            Payload::AssetUpdate{..} => Discriminant::AssetUpdate,
            Payload::CreateActor{..} => Discriminant::CreateActor,
            Payload::SetBehavior{..} => Discriminant::SetBehavior,
            Payload::CreateAnimation{..} => Discriminant::CreateAnimation,
            Payload::InterpolateActor{..} => Discriminant::InterpolateActor,
            Payload::SyncAnimationsRequest => Discriminant::SyncAnimationsRequest,
            Payload::SyncAnimationsReply{..} => Discriminant::SyncAnimationsReply,
            Payload::SyncComplete => Discriminant::SyncComplete,
            Payload::Heartbeat => Discriminant::Heartbeat,
            Payload::Unknown{discriminant} => Discriminant::Unknown(discriminant.clone()),
        }
    }
}

/// one animation's reconciled playhead; `time` is the field the reconciler mutates in-place.
#[derive(Debug,Clone,PartialEq)]
pub struct AnimationStateSample {
    pub animation_id: String,
    pub time: f64,
}

/// the answer half of a reply continuation. kept as a closed sum type rather than a generic
/// so the router and queue can store replies for differently-shaped requests uniformly.
#[derive(Debug,Clone)]
pub enum ReplyPayload {
    Created { actor_id: String },
    Ack,
    AnimationStates(Vec<AnimationStateSample>),
    /// resolved in place of a real answer when the router drops an `ignore`-classified
    /// message - see the open question in the design notes on `ignore` vs reply resolution.
    Ignored,
}

/// a reply continuation: resumed exactly once, when the response arrives (or the peer is
/// dropped, in which case it is dropped without being resolved and the awaiting `recv()` errors).
pub type ReplyContinuation = oneshot::Sender<ReplyPayload>;
pub type ReplyReceiver = oneshot::Receiver<ReplyPayload>;

pub fn reply_pair() -> (ReplyContinuation, ReplyReceiver) {
    oneshot::channel()
}
