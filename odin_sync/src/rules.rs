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

use std::collections::HashMap;
use lazy_static::lazy_static;

use crate::stage::Stage;
use crate::message::Discriminant;

/// how the router disposes of an outbound message at the moment it is classified.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Handling {
    Allow,
    Queue,
    Ignore,
    Error,
}

/// per-discriminant decision record: which stage governs this message, and how to handle
/// it before that stage starts, while it is in progress, and after it completes.
#[derive(Debug,Clone,Copy)]
pub struct Rule {
    pub stage: Stage,
    pub before: Handling,
    pub during: Handling,
    pub after: Handling,
}

/// fail-safe default for discriminants with no table entry: defer until sync completes,
/// never drop. `stage: Never` means this rule is only ever evaluated via `before`.
pub const DEFAULT_RULE: Rule = Rule { stage: Stage::Never, before: Handling::Queue, during: Handling::Queue, after: Handling::Allow };

lazy_static! {
    /// the canonical source of truth for message classification. the router performs no
    /// other classification - every discriminant the application emits either has an entry
    /// here or falls back to `DEFAULT_RULE`.
    pub static ref RULE_TABLE: HashMap<Discriminant, Rule> = {
        let mut m = HashMap::new();
        m.insert(Discriminant::LoadAsset, Rule { stage: Stage::LoadAssets, before: Handling::Queue, during: Handling::Allow, after: Handling::Allow });
        m.insert(Discriminant::AssetUpdate, Rule { stage: Stage::LoadAssets, before: Handling::Queue, during: Handling::Allow, after: Handling::Allow });
        m.insert(Discriminant::CreateActor, Rule { stage: Stage::CreateActors, before: Handling::Queue, during: Handling::Allow, after: Handling::Allow });
        m.insert(Discriminant::SetBehavior, Rule { stage: Stage::SetBehaviors, before: Handling::Queue, during: Handling::Allow, after: Handling::Allow });
        m.insert(Discriminant::CreateAnimation, Rule { stage: Stage::CreateAnimations, before: Handling::Queue, during: Handling::Allow, after: Handling::Allow });
        m.insert(Discriminant::InterpolateActor, Rule { stage: Stage::CreateAnimations, before: Handling::Queue, during: Handling::Allow, after: Handling::Allow });
        m.insert(Discriminant::SyncAnimationsRequest, Rule { stage: Stage::SyncAnimations, before: Handling::Ignore, during: Handling::Allow, after: Handling::Allow });
        m.insert(Discriminant::SyncAnimationsReply, Rule { stage: Stage::SyncAnimations, before: Handling::Ignore, during: Handling::Allow, after: Handling::Allow });
        m.insert(Discriminant::SyncComplete, Rule { stage: Stage::Always, before: Handling::Allow, during: Handling::Allow, after: Handling::Allow });
        m.insert(Discriminant::Heartbeat, Rule { stage: Stage::Always, before: Handling::Allow, during: Handling::Allow, after: Handling::Allow });
        m
    };
}

/// looks up the rule for a discriminant, falling back to `DEFAULT_RULE` for anything the
/// table has no entry for (this is where `Discriminant::Unknown(_)` always lands).
pub fn rule_for (discriminant: &Discriminant) -> Rule {
    RULE_TABLE.get(discriminant).copied().unwrap_or(DEFAULT_RULE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_discriminants_resolve_from_table() {
        let r = rule_for(&Discriminant::CreateActor);
        assert_eq!(r.stage, Stage::CreateActors);
        assert_eq!(r.before, Handling::Queue);
        assert_eq!(r.during, Handling::Allow);
        assert_eq!(r.after, Handling::Allow);
    }

    #[test]
    fn unknown_discriminant_falls_back_to_default() {
        let r = rule_for(&Discriminant::Unknown("some-future-message".into()));
        assert_eq!(r.stage, Stage::Never);
        assert_eq!(r.before, Handling::Queue);
        assert_eq!(r.after, Handling::Allow);
    }

    #[test]
    fn always_stage_messages_pass_in_every_phase() {
        let r = rule_for(&Discriminant::Heartbeat);
        assert_eq!(r.before, Handling::Allow);
        assert_eq!(r.during, Handling::Allow);
        assert_eq!(r.after, Handling::Allow);
    }
}
