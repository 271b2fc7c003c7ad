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

use std::time::Duration;
use serde::Deserialize;

use crate::errors::{Result, SyncError};

/// the only two numbers the spec names: the RTT calibration burst size (§4.5) and the
/// per-round timeout that bounds it. everything else in the protocol is structural, not
/// configurable, so it stays out of this struct.
#[derive(Debug,Clone,Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub calibration_burst: usize,
    #[serde(with = "duration_millis")]
    pub calibration_round_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            calibration_burst: 10,
            calibration_round_timeout: Duration::from_millis(500),
        }
    }
}

impl SyncConfig {
    pub fn from_ron_str (s: &str) -> Result<Self> {
        ron::from_str(s).map_err(|e| SyncError::ConfigParseError(e.to_string()))
    }
}

mod duration_millis {
    use std::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize <S: Serializer> (d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize <'de, D: Deserializer<'de>> (d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_burst_matches_spec_example() {
        let cfg = SyncConfig::default();
        assert_eq!(cfg.calibration_burst, 10);
    }

    #[test]
    fn loads_from_ron() {
        let cfg = SyncConfig::from_ron_str("(calibration_burst: 5, calibration_round_timeout: 250)").unwrap();
        assert_eq!(cfg.calibration_burst, 5);
        assert_eq!(cfg.calibration_round_timeout, Duration::from_millis(250));
    }
}
