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

use thiserror::Error;
use crate::stage::Stage;
use crate::message::Discriminant;
use crate::peer::PeerId;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error,Debug)]
pub enum SyncError {
    #[error("peer {peer} disconnected during sync")]
    PeerDisconnected { peer: PeerId },

    #[error("reply channel closed for peer {peer}, discriminant {discriminant:?}")]
    ReplyChannelClosed { peer: PeerId, discriminant: Discriminant },

    #[error("rule violation for discriminant {discriminant:?} at stage {stage:?} (peer {peer})")]
    RuleViolation { peer: PeerId, discriminant: Discriminant, stage: Stage },

    #[error("authoritative peer unreachable during sync-animations for peer {peer}")]
    AuthoritativePeerUnreachable { peer: PeerId },

    #[error("stage {0:?} driver failed: {1}")]
    StageFailed(Stage, String),

    #[error("calibration burst failed for peer {peer}: {reason}")]
    CalibrationFailed { peer: PeerId, reason: String },

    #[error("config parse error {0}")]
    ConfigParseError(String),

    #[error("task join error")]
    JoinError( #[from] tokio::task::JoinError),

    #[error("operation failed {0}")]
    OpFailed(String),
}

pub fn op_failed (msg: impl ToString) -> SyncError {
    SyncError::OpFailed(msg.to_string())
}
