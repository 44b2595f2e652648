//! Membership state machine
//!
//! Every state change of a watchlist item goes through [`transition`]. Call
//! sites never assign a state directly.

use cinelist_models::{Membership, PendingOperation};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MembershipState {
    Unknown,
    Checking,
    Present,
    Absent,
    Adding,
    Removing,
    /// Catalog miss; terminal for the item
    Error,
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    MountSignedIn,
    MountSignedOut,
    CheckPresent,
    CheckAbsent,
    CheckFailed,
    Toggle,
    AddConfirmed,
    AddFailed,
    RemoveConfirmed,
    RemoveFailed,
    /// Background revalidation result, applied only to settled items
    RefreshPresent,
    RefreshAbsent,
    CatalogMiss,
    CredentialRevoked,
}

/// The transition table. `None` means the event is not legal in `state`.
pub fn transition(state: MembershipState, event: Event) -> Option<MembershipState> {
    use Event::*;
    use MembershipState::*;

    match (state, event) {
        (_, CatalogMiss) => Some(Error),
        (Error, _) => None,
        (_, CredentialRevoked) => Some(Absent),

        (Unknown, MountSignedIn) => Some(Checking),
        (Unknown, MountSignedOut) => Some(Absent),

        (Checking, CheckPresent) => Some(Present),
        (Checking, CheckAbsent) | (Checking, CheckFailed) => Some(Absent),

        (Present, Toggle) => Some(Removing),
        (Absent, Toggle) => Some(Adding),

        (Adding, AddConfirmed) => Some(Present),
        (Adding, AddFailed) => Some(Absent),
        (Removing, RemoveConfirmed) => Some(Absent),
        (Removing, RemoveFailed) => Some(Present),

        (Present, RefreshPresent) | (Absent, RefreshPresent) => Some(Present),
        (Present, RefreshAbsent) | (Absent, RefreshAbsent) => Some(Absent),

        _ => None,
    }
}

impl MembershipState {
    pub fn membership(&self) -> Membership {
        match self {
            MembershipState::Present | MembershipState::Removing => Membership::Present,
            MembershipState::Absent | MembershipState::Adding => Membership::Absent,
            MembershipState::Unknown | MembershipState::Checking | MembershipState::Error => {
                Membership::Unknown
            }
        }
    }

    pub fn pending(&self) -> PendingOperation {
        match self {
            MembershipState::Checking => PendingOperation::Checking,
            MembershipState::Adding => PendingOperation::Adding,
            MembershipState::Removing => PendingOperation::Removing,
            _ => PendingOperation::None,
        }
    }

    /// Present or Absent with nothing blocking the control
    pub fn is_settled(&self) -> bool {
        matches!(self, MembershipState::Present | MembershipState::Absent)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MembershipState::Error)
    }
}

impl fmt::Display for MembershipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MembershipState::Unknown => "unknown",
            MembershipState::Checking => "checking",
            MembershipState::Present => "in watchlist",
            MembershipState::Absent => "not in watchlist",
            MembershipState::Adding => "adding",
            MembershipState::Removing => "removing",
            MembershipState::Error => "not in catalog",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Event::*;
    use MembershipState::*;

    const ALL_STATES: [MembershipState; 7] = [Unknown, Checking, Present, Absent, Adding, Removing, Error];

    #[test]
    fn test_mount_paths() {
        assert_eq!(transition(Unknown, MountSignedIn), Some(Checking));
        assert_eq!(transition(Unknown, MountSignedOut), Some(Absent));
        assert_eq!(transition(Present, MountSignedIn), None);
    }

    #[test]
    fn test_check_resolution() {
        assert_eq!(transition(Checking, CheckPresent), Some(Present));
        assert_eq!(transition(Checking, CheckAbsent), Some(Absent));
        assert_eq!(transition(Checking, CheckFailed), Some(Absent));
        assert_eq!(transition(Checking, CatalogMiss), Some(Error));
    }

    #[test]
    fn test_toggle_direction_follows_membership() {
        assert_eq!(transition(Present, Toggle), Some(Removing));
        assert_eq!(transition(Absent, Toggle), Some(Adding));
    }

    #[test]
    fn test_toggle_refused_while_pending_or_terminal() {
        for state in [Unknown, Checking, Adding, Removing, Error] {
            assert_eq!(transition(state, Toggle), None, "toggle accepted in {:?}", state);
        }
    }

    #[test]
    fn test_mutation_failures_revert() {
        assert_eq!(transition(Adding, AddConfirmed), Some(Present));
        assert_eq!(transition(Adding, AddFailed), Some(Absent));
        assert_eq!(transition(Removing, RemoveConfirmed), Some(Absent));
        assert_eq!(transition(Removing, RemoveFailed), Some(Present));
    }

    #[test]
    fn test_catalog_miss_from_anywhere_is_terminal() {
        for state in ALL_STATES {
            assert_eq!(transition(state, CatalogMiss), Some(Error));
        }
        for event in [MountSignedIn, Toggle, CheckPresent, AddConfirmed, RefreshPresent, CredentialRevoked] {
            assert_eq!(transition(Error, event), None);
        }
    }

    #[test]
    fn test_revocation_downgrades_to_absent() {
        for state in [Unknown, Checking, Present, Absent, Adding, Removing] {
            assert_eq!(transition(state, CredentialRevoked), Some(Absent));
        }
    }

    #[test]
    fn test_refresh_only_applies_to_settled_states() {
        assert_eq!(transition(Absent, RefreshPresent), Some(Present));
        assert_eq!(transition(Present, RefreshAbsent), Some(Absent));
        assert_eq!(transition(Adding, RefreshAbsent), None);
        assert_eq!(transition(Checking, RefreshPresent), None);
    }

    #[test]
    fn test_at_most_one_pending_operation() {
        for state in ALL_STATES {
            let pending = [Checking, Adding, Removing].iter().filter(|s| **s == state).count();
            assert!(pending <= 1);
            assert_eq!(state.pending().is_pending(), pending == 1);
        }
    }

    #[test]
    fn test_membership_projection() {
        assert_eq!(Removing.membership(), Membership::Present);
        assert_eq!(Adding.membership(), Membership::Absent);
        assert_eq!(Checking.membership(), Membership::Unknown);
    }
}
