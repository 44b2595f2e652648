//! Per-item state: one rendered movie, its state machine and its single
//! outstanding request.
//!
//! Every request is tagged with a sequence number (`Ticket`). The item keeps
//! the ticket of its one outstanding request; a response carrying any other
//! ticket is stale and is dropped without touching state.

use cinelist_models::{Membership, MovieId, MovieRef, PendingOperation};
use cinelist_store::{AddOutcome, RemoveOutcome, StoreError};
use serde::Serialize;
use tracing::debug;
use crate::state::{transition, Event, MembershipState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Request {
    /// Initial membership check; the item shows `Checking`
    Check,
    /// Background revalidation; the item keeps its visible state
    Refresh,
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub request: Request,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeKind {
    /// Retry is possible; the control stays enabled
    Transient,
    /// The movie is not in the catalog; the control is disabled
    CatalogMiss,
    /// No usable credential
    SignedOut,
}

/// User-visible message attached to an item by its last failed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn from_error(error: &StoreError) -> Self {
        let kind = match error {
            StoreError::NotFound => NoticeKind::CatalogMiss,
            StoreError::AuthMissing | StoreError::Unauthorized => NoticeKind::SignedOut,
            _ => NoticeKind::Transient,
        };
        Self {
            kind,
            message: error.user_message(),
        }
    }

    fn signed_out() -> Self {
        Self::from_error(&StoreError::AuthMissing)
    }
}

/// Why a toggle was not issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ToggleRefused {
    #[error("a request for this movie is already in flight")]
    Busy,
    #[error("movie is not in the catalog")]
    CatalogMiss,
    #[error("sign in to manage your watchlist")]
    SignedOut,
    #[error("movie is not mounted")]
    NotMounted,
}

/// A state change produced by applying an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    pub from: MembershipState,
    pub to: MembershipState,
}

/// What happened to a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Superseded request; nothing changed
    Stale,
    Applied(Change),
    /// The store rejected the credential; the whole session must be revoked
    SessionExpired,
}

/// Read-only view of an item for presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSnapshot {
    pub movie_id: MovieId,
    pub title: String,
    pub state: MembershipState,
    pub membership: Membership,
    pub pending: PendingOperation,
    pub can_toggle: bool,
    pub notice: Option<Notice>,
}

#[derive(Debug)]
pub struct ItemMachine {
    movie: MovieRef,
    state: MembershipState,
    outstanding: Option<Ticket>,
    /// Sequence number of the most recently issued request
    last_issued: u64,
    notice: Option<Notice>,
}

impl ItemMachine {
    pub fn new(movie: MovieRef) -> Self {
        Self {
            movie,
            state: MembershipState::Unknown,
            outstanding: None,
            last_issued: 0,
            notice: None,
        }
    }

    pub fn movie(&self) -> &MovieRef {
        &self.movie
    }

    pub fn state(&self) -> MembershipState {
        self.state
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn outstanding(&self) -> Option<Ticket> {
        self.outstanding
    }

    pub fn last_issued(&self) -> u64 {
        self.last_issued
    }

    pub fn snapshot(&self, signed_in: bool) -> ItemSnapshot {
        ItemSnapshot {
            movie_id: self.movie.movie_id,
            title: self.movie.title.clone(),
            state: self.state,
            membership: self.state.membership(),
            pending: self.state.pending(),
            can_toggle: signed_in && self.state.is_settled(),
            notice: self.notice.clone(),
        }
    }

    fn apply(&mut self, event: Event) -> Option<Change> {
        let from = self.state;
        let to = transition(from, event)?;
        self.state = to;
        Some(Change { from, to })
    }

    fn issue(&mut self, request: Request, seq: u64) -> Ticket {
        let ticket = Ticket { seq, request };
        if let Some(previous) = self.outstanding.replace(ticket) {
            debug!(movie_id = %self.movie.movie_id, superseded = previous.seq, seq, "Request superseded");
        }
        self.last_issued = seq;
        ticket
    }

    /// First render. Issues a check when signed in; otherwise settles on
    /// `Absent` without a request. Re-mounting a live item does nothing.
    pub fn mount(&mut self, signed_in: bool, seq: u64) -> Option<Ticket> {
        if self.state != MembershipState::Unknown {
            return None;
        }
        if signed_in {
            self.apply(Event::MountSignedIn)?;
            Some(self.issue(Request::Check, seq))
        } else {
            self.apply(Event::MountSignedOut);
            None
        }
    }

    /// User toggle. Captures the pre-toggle state to pick add or remove.
    pub fn toggle(&mut self, signed_in: bool, seq: u64) -> Result<Ticket, ToggleRefused> {
        if self.state.is_terminal() {
            return Err(ToggleRefused::CatalogMiss);
        }
        if !signed_in {
            return Err(ToggleRefused::SignedOut);
        }
        let request = match self.state {
            MembershipState::Present => Request::Remove,
            MembershipState::Absent => Request::Add,
            _ => return Err(ToggleRefused::Busy),
        };
        self.apply(Event::Toggle).ok_or(ToggleRefused::Busy)?;
        self.notice = None;
        Ok(self.issue(request, seq))
    }

    /// Silent revalidation of a settled item with nothing in flight
    pub fn refresh(&mut self, signed_in: bool, seq: u64) -> Option<Ticket> {
        if !signed_in || !self.state.is_settled() || self.outstanding.is_some() {
            return None;
        }
        Some(self.issue(Request::Refresh, seq))
    }

    fn take_if_current(&mut self, ticket: Ticket) -> bool {
        if self.outstanding == Some(ticket) {
            self.outstanding = None;
            true
        } else {
            debug!(
                movie_id = %self.movie.movie_id,
                seq = ticket.seq,
                request = ?ticket.request,
                "Discarding stale response"
            );
            false
        }
    }

    fn settle(&mut self, event: Event, notice: Option<Notice>) -> Resolution {
        let from = self.state;
        let change = self.apply(event).unwrap_or(Change { from, to: from });
        self.notice = notice;
        Resolution::Applied(change)
    }

    fn fail(&mut self, error: StoreError, event: Event) -> Resolution {
        match error {
            StoreError::Unauthorized => Resolution::SessionExpired,
            StoreError::NotFound => self.settle(Event::CatalogMiss, Some(Notice::from_error(&error))),
            error => {
                let notice = Notice::from_error(&error);
                self.settle(event, Some(notice))
            }
        }
    }

    pub fn resolve_check(&mut self, ticket: Ticket, result: Result<bool, StoreError>) -> Resolution {
        if !self.take_if_current(ticket) {
            return Resolution::Stale;
        }
        match (ticket.request, result) {
            (Request::Check, Ok(true)) => self.settle(Event::CheckPresent, None),
            (Request::Check, Ok(false)) => self.settle(Event::CheckAbsent, None),
            (Request::Check, Err(e)) => self.fail(e, Event::CheckFailed),
            (_, Ok(is_member)) => {
                // A refresh that got through means the session is usable again
                let notice = self.notice.clone().filter(|n| n.kind != NoticeKind::SignedOut);
                let event = if is_member { Event::RefreshPresent } else { Event::RefreshAbsent };
                self.settle(event, notice)
            }
            // A failed background refresh leaves the settled state alone
            (_, Err(StoreError::Unauthorized)) => Resolution::SessionExpired,
            (_, Err(StoreError::NotFound)) => {
                self.settle(Event::CatalogMiss, Some(Notice::from_error(&StoreError::NotFound)))
            }
            (_, Err(e)) => {
                debug!(movie_id = %self.movie.movie_id, error = %e, "Background refresh failed");
                Resolution::Applied(Change { from: self.state, to: self.state })
            }
        }
    }

    pub fn resolve_add(&mut self, ticket: Ticket, result: Result<AddOutcome, StoreError>) -> Resolution {
        if !self.take_if_current(ticket) {
            return Resolution::Stale;
        }
        match result {
            Ok(_) => self.settle(Event::AddConfirmed, None),
            Err(e) => self.fail(e, Event::AddFailed),
        }
    }

    pub fn resolve_remove(&mut self, ticket: Ticket, result: Result<RemoveOutcome, StoreError>) -> Resolution {
        if !self.take_if_current(ticket) {
            return Resolution::Stale;
        }
        match result {
            Ok(_) => self.settle(Event::RemoveConfirmed, None),
            Err(e) => self.fail(e, Event::RemoveFailed),
        }
    }

    /// Credential gone: drop the outstanding request and fall back to Absent
    pub fn revoke(&mut self) -> Option<Change> {
        self.outstanding = None;
        let change = self.apply(Event::CredentialRevoked)?;
        self.notice = Some(Notice::signed_out());
        Some(change)
    }

    /// Apply a membership fact learned outside this item's own requests
    /// (a full watchlist listing). Ignored if a request was issued after
    /// `as_of` or one is still in flight.
    pub fn reconcile(&mut self, is_member: bool, as_of: u64) -> Option<Change> {
        if self.outstanding.is_some() || self.last_issued > as_of {
            return None;
        }
        let event = if is_member { Event::RefreshPresent } else { Event::RefreshAbsent };
        self.apply(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> ItemMachine {
        ItemMachine::new(MovieRef::new(42u64, "Inception"))
    }

    fn checked(is_member: bool) -> ItemMachine {
        let mut item = item();
        let ticket = item.mount(true, 1).unwrap();
        item.resolve_check(ticket, Ok(is_member));
        item
    }

    #[test]
    fn test_mount_signed_out_settles_absent_without_request() {
        let mut item = item();
        assert_eq!(item.mount(false, 1), None);
        assert_eq!(item.state(), MembershipState::Absent);
        assert!(item.outstanding().is_none());
    }

    #[test]
    fn test_mount_twice_issues_one_check() {
        let mut item = item();
        assert!(item.mount(true, 1).is_some());
        assert!(item.mount(true, 2).is_none());
        assert_eq!(item.state(), MembershipState::Checking);
    }

    #[test]
    fn test_toggle_present_removes_and_absent_adds() {
        let mut present = checked(true);
        assert_eq!(present.toggle(true, 2).unwrap().request, Request::Remove);
        assert_eq!(present.state(), MembershipState::Removing);

        let mut absent = checked(false);
        assert_eq!(absent.toggle(true, 2).unwrap().request, Request::Add);
        assert_eq!(absent.state(), MembershipState::Adding);
    }

    #[test]
    fn test_second_toggle_while_pending_is_refused() {
        let mut item = checked(false);
        item.toggle(true, 2).unwrap();
        assert_eq!(item.toggle(true, 3), Err(ToggleRefused::Busy));
        assert_eq!(item.outstanding().unwrap().seq, 2);
    }

    #[test]
    fn test_toggle_refused_while_checking_or_signed_out() {
        let mut item = item();
        item.mount(true, 1);
        assert_eq!(item.toggle(true, 2), Err(ToggleRefused::Busy));

        let mut item = checked(true);
        assert_eq!(item.toggle(false, 2), Err(ToggleRefused::SignedOut));
        assert_eq!(item.state(), MembershipState::Present);
    }

    #[test]
    fn test_catalog_miss_is_terminal() {
        let mut item = item();
        let ticket = item.mount(true, 1).unwrap();
        item.resolve_check(ticket, Err(StoreError::NotFound));
        assert_eq!(item.state(), MembershipState::Error);
        assert_eq!(item.notice().unwrap().kind, NoticeKind::CatalogMiss);
        assert_eq!(item.toggle(true, 2), Err(ToggleRefused::CatalogMiss));
        assert!(!item.snapshot(true).can_toggle);
    }

    #[test]
    fn test_failed_check_fails_safe_to_absent() {
        let mut item = item();
        let ticket = item.mount(true, 1).unwrap();
        item.resolve_check(ticket, Err(StoreError::MalformedResponse("eof".into())));
        assert_eq!(item.state(), MembershipState::Absent);
        assert!(item.snapshot(true).can_toggle);
    }

    #[test]
    fn test_failed_add_reverts_with_notice_then_retry_succeeds() {
        let mut item = checked(false);
        let ticket = item.toggle(true, 2).unwrap();
        let resolution = item.resolve_add(ticket, Err(StoreError::rejected(500, "database is locked")));
        assert_eq!(
            resolution,
            Resolution::Applied(Change { from: MembershipState::Adding, to: MembershipState::Absent })
        );
        let notice = item.notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Transient);
        assert_eq!(notice.message, "database is locked");

        let ticket = item.toggle(true, 3).unwrap();
        assert!(item.notice().is_none());
        item.resolve_add(ticket, Ok(AddOutcome::AlreadyPresent));
        assert_eq!(item.state(), MembershipState::Present);
    }

    #[test]
    fn test_failed_remove_reverts_to_present() {
        let mut item = checked(true);
        let ticket = item.toggle(true, 2).unwrap();
        item.resolve_remove(ticket, Err(StoreError::NetworkFailure("timeout".into())));
        assert_eq!(item.state(), MembershipState::Present);
    }

    #[test]
    fn test_stale_refresh_does_not_overwrite_toggle() {
        let mut item = checked(false);
        let refresh = item.refresh(true, 2).unwrap();
        let add = item.toggle(true, 3).unwrap();

        assert_eq!(item.resolve_add(add, Ok(AddOutcome::Added)), Resolution::Applied(Change {
            from: MembershipState::Adding,
            to: MembershipState::Present,
        }));
        assert_eq!(item.resolve_check(refresh, Ok(false)), Resolution::Stale);
        assert_eq!(item.state(), MembershipState::Present);
    }

    #[test]
    fn test_response_after_revoke_is_stale() {
        let mut item = checked(false);
        let add = item.toggle(true, 2).unwrap();
        item.revoke();
        assert_eq!(item.state(), MembershipState::Absent);
        assert_eq!(item.resolve_add(add, Ok(AddOutcome::Added)), Resolution::Stale);
        assert_eq!(item.state(), MembershipState::Absent);
        assert_eq!(item.notice().unwrap().kind, NoticeKind::SignedOut);
    }

    #[test]
    fn test_unauthorized_asks_for_session_revocation() {
        let mut item = checked(true);
        let ticket = item.toggle(true, 2).unwrap();
        assert_eq!(item.resolve_remove(ticket, Err(StoreError::Unauthorized)), Resolution::SessionExpired);
    }

    #[test]
    fn test_reconcile_skips_items_touched_after_listing_started() {
        let mut item = checked(false);
        assert!(item.reconcile(true, 5).is_some());
        assert_eq!(item.state(), MembershipState::Present);

        let ticket = item.toggle(true, 6).unwrap();
        item.resolve_remove(ticket, Ok(RemoveOutcome::Removed));
        assert!(item.reconcile(true, 5).is_none());
        assert_eq!(item.state(), MembershipState::Absent);
    }
}
