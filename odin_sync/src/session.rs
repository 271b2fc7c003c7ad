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

use tokio::sync::mpsc::UnboundedSender;

use crate::message::ReplyPayload;
use crate::peer::Peer;
use crate::transport::Transport;

/// the group-level context a sync driver needs beyond its own peer: whether this
/// deployment delegates authority to a peer at all, who that peer is and how to reach it,
/// and the application-facing echo channel used by §4.8's reply-correlation side effect.
pub struct Session {
    /// false in single-authority mode, where the server itself is canonical and joining
    /// peers skip the staged replay entirely (§4.6).
    pub peer_authoritative: bool,
    pub authoritative_client: Option<Peer>,
    /// peer-to-peer channel used to ask the authoritative peer for current animation
    /// state (§4.7). `None` whenever `authoritative_client` is `None`.
    pub authoritative_transport: Option<Arc<dyn Transport>>,
    /// present only while this peer is the sole member of the session: every reply this
    /// peer's own router resolves is also pushed here, because the host application is
    /// awaiting it directly (§4.8). torn down once a second peer joins and the generic
    /// transport takes over.
    pub conn: Option<UnboundedSender<ReplyPayload>>,
}

impl Session {
    pub fn new (peer_authoritative: bool, authoritative_client: Option<Peer>, authoritative_transport: Option<Arc<dyn Transport>>, conn: Option<UnboundedSender<ReplyPayload>>) -> Self {
        Session { peer_authoritative, authoritative_client, authoritative_transport, conn }
    }
}
