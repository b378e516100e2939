//! Tie-break policy: which exit wins when one bar touches both levels.
//!
//! A single bar only carries its high and low, not the path between them, so
//! a bar whose low reaches the target and whose high reaches the stoploss is
//! ambiguous. The policy decides the ordering.

use crate::domain::ExitType;
use serde::{Deserialize, Serialize};

/// Same-bar ambiguity resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Target before stoploss (optimistic). The canonical rule.
    #[default]
    TargetFirst,
    /// Stoploss before target (adversarial).
    StoplossFirst,
}

impl TieBreak {
    /// Pick the exit for a bar given which levels it touched.
    pub fn pick(&self, target_hit: bool, stoploss_hit: bool) -> Option<ExitType> {
        match (target_hit, stoploss_hit) {
            (false, false) => None,
            (true, false) => Some(ExitType::Target),
            (false, true) => Some(ExitType::Stoploss),
            (true, true) => Some(match self {
                TieBreak::TargetFirst => ExitType::Target,
                TieBreak::StoplossFirst => ExitType::Stoploss,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TieBreak::TargetFirst => "target_first",
            TieBreak::StoplossFirst => "stoploss_first",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_hit_ignores_policy() {
        for policy in [TieBreak::TargetFirst, TieBreak::StoplossFirst] {
            assert_eq!(policy.pick(true, false), Some(ExitType::Target));
            assert_eq!(policy.pick(false, true), Some(ExitType::Stoploss));
            assert_eq!(policy.pick(false, false), None);
        }
    }

    #[test]
    fn target_first_wins_ties() {
        assert_eq!(TieBreak::TargetFirst.pick(true, true), Some(ExitType::Target));
    }

    #[test]
    fn stoploss_first_wins_ties() {
        assert_eq!(
            TieBreak::StoplossFirst.pick(true, true),
            Some(ExitType::Stoploss)
        );
    }

    #[test]
    fn default_is_target_first() {
        assert_eq!(TieBreak::default(), TieBreak::TargetFirst);
    }

    #[test]
    fn policy_names() {
        assert_eq!(TieBreak::TargetFirst.name(), "target_first");
        assert_eq!(TieBreak::StoplossFirst.name(), "stoploss_first");
        assert_eq!(
            serde_json::to_string(&TieBreak::StoplossFirst).unwrap(),
            "\"stoploss_first\""
        );
    }
}
