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

use crate::message::AnimationStateSample;
use crate::peer::Peer;

/// §4.7: biases each animation's clock forward by the estimated one-way delay on both
/// links, so that by the time the joining peer starts playback its local clock matches
/// the authoritative peer's current playhead. mutates `time` in place, as the spec requires.
pub fn reconcile (states: &mut [AnimationStateSample], authoritative: &Peer, joining: &Peer) {
    let authoritative_bias = authoritative.latency_ms as f64 / 2000.0;
    let joining_bias = joining.latency_ms as f64 / 2000.0;
    for state in states.iter_mut() {
        state.time += authoritative_bias;
        state.time += joining_bias;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s4_latency_compensation() {
        let authoritative = Peer::new("auth", 0, true).with_latency(100);
        let joining = Peer::new("join", 1, false).with_latency(60);
        let mut states = vec![AnimationStateSample { animation_id: "a1".into(), time: 10.000 }];

        reconcile(&mut states, &authoritative, &joining);

        assert!((states[0].time - 10.080).abs() < 1e-9);
    }

    #[test]
    fn zero_latency_is_a_no_op() {
        let authoritative = Peer::new("auth", 0, true);
        let joining = Peer::new("join", 1, false);
        let mut states = vec![AnimationStateSample { animation_id: "a1".into(), time: 5.0 }];
        reconcile(&mut states, &authoritative, &joining);
        assert_eq!(states[0].time, 5.0);
    }
}
