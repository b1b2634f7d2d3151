use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Per-branch classification produced by the AST classifier.
///
/// The ordering is explicit: a branch is a filopodium iff
/// `Absent < type < BranchOnly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FiloType {
    Absent,
    Added,
    Subtracted,
    Transitioned,
    Interstitial,
    Terminal,
    BranchOnly,
}

impl FiloType {
    pub const ALL: [FiloType; 7] = [
        FiloType::Absent,
        FiloType::Added,
        FiloType::Subtracted,
        FiloType::Transitioned,
        FiloType::Interstitial,
        FiloType::Terminal,
        FiloType::BranchOnly,
    ];

    pub fn rank(self) -> u8 {
        match self {
            FiloType::Absent => 0,
            FiloType::Added => 1,
            FiloType::Subtracted => 2,
            FiloType::Transitioned => 3,
            FiloType::Interstitial => 4,
            FiloType::Terminal => 5,
            FiloType::BranchOnly => 6,
        }
    }

    pub fn is_filopodium(self) -> bool {
        FiloType::Absent < self && self < FiloType::BranchOnly
    }

    /// Horizontal spurs in the dendrogram.
    pub fn is_drawn_as_filo(self) -> bool {
        matches!(self, FiloType::Interstitial | FiloType::Terminal)
    }
}

impl PartialOrd for FiloType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FiloType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for FiloType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FiloType::Absent => "ABSENT",
                FiloType::Added => "ADDED",
                FiloType::Subtracted => "SUBTRACTED",
                FiloType::Transitioned => "TRANSITIONED",
                FiloType::Interstitial => "INTERSTITIAL",
                FiloType::Terminal => "TERMINAL",
                FiloType::BranchOnly => "BRANCH_ONLY",
            }
        )
    }
}

#[cfg(test)]
mod filo_type_tests {
    use super::*;

    #[test]
    fn test_ordering_follows_rank() {
        for pair in FiloType::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{} should sort before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_filopodium_predicate() {
        let filo: Vec<FiloType> = FiloType::ALL
            .iter()
            .copied()
            .filter(|t| t.is_filopodium())
            .collect();
        assert_eq!(
            filo,
            vec![
                FiloType::Added,
                FiloType::Subtracted,
                FiloType::Transitioned,
                FiloType::Interstitial,
                FiloType::Terminal
            ]
        );
        assert!(FiloType::Terminal.is_drawn_as_filo());
        assert!(!FiloType::Added.is_drawn_as_filo());
        assert_eq!(FiloType::BranchOnly.to_string(), "BRANCH_ONLY");
    }
}
