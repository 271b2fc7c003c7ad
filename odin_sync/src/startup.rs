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

use std::time::{Duration, Instant};

use odin_actor::{info,warn};

use crate::config::SyncConfig;
use crate::errors::{Result, SyncError};
use crate::peer::PeerId;
use crate::transport::Transport;

/// §4.5 startup protocol: runs a fixed burst of heartbeat round-trips against a freshly
/// connected peer and returns the averaged latency in milliseconds, ready to seed
/// `Peer::latency_ms` before the sync driver takes over. a round that blows its timeout,
/// or a transport error, fails the whole calibration - the peer is dropped, not retried
/// at this layer (link-level resilience is the transport's job).
pub async fn calibrate (peer: &PeerId, transport: &dyn Transport, config: &SyncConfig) -> Result<u64> {
    let mut total = Duration::ZERO;
    for round in 0..config.calibration_burst {
        let started = Instant::now();
        let outcome = tokio::time::timeout(config.calibration_round_timeout, transport.ping()).await;
        match outcome {
            Ok(Ok(())) => {
                total += started.elapsed();
            }
            Ok(Err(e)) => {
                warn!("peer {}: calibration round {} failed: {}", peer, round, e);
                return Err(SyncError::CalibrationFailed { peer: peer.clone(), reason: e.to_string() });
            }
            Err(_) => {
                warn!("peer {}: calibration round {} timed out", peer, round);
                return Err(SyncError::CalibrationFailed { peer: peer.clone(), reason: "round timeout".into() });
            }
        }
    }

    let avg_ms = (total.as_millis() / config.calibration_burst.max(1) as u128) as u64;
    info!("peer {}: calibration complete, {} rounds, avg rtt {} ms", peer, config.calibration_burst, avg_ms);
    Ok(avg_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Payload, ReplyContinuation};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyTransport { fail_on_round: usize, calls: AtomicUsize }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn send (&self, _message: Payload, _reply: Option<ReplyContinuation>) -> Result<()> { Ok(()) }
        async fn ping (&self) -> Result<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == self.fail_on_round {
                Err(SyncError::OpFailed("simulated link drop".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn successful_burst_returns_an_average() {
        let transport = FlakyTransport { fail_on_round: usize::MAX, calls: AtomicUsize::new(0) };
        let config = SyncConfig { calibration_burst: 3, ..SyncConfig::default() };
        let latency = calibrate(&PeerId::from("p1"), &transport, &config).await.unwrap();
        // a local no-op ping should measure near-zero latency
        assert!(latency < 50);
    }

    #[tokio::test]
    async fn failed_round_fails_the_whole_calibration() {
        let transport = FlakyTransport { fail_on_round: 1, calls: AtomicUsize::new(0) };
        let config = SyncConfig { calibration_burst: 3, ..SyncConfig::default() };
        let result = calibrate(&PeerId::from("p1"), &transport, &config).await;
        assert!(matches!(result, Err(SyncError::CalibrationFailed{..})));
    }
}
