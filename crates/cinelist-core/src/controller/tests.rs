use super::*;
use crate::item::NoticeKind;
use cinelist_store::{InMemoryStore, StoreCall, StoreOp};

fn credential() -> SessionCredential {
    SessionCredential::new("test-token").unwrap()
}

fn catalog_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_catalog(vec![
        MovieRef::new(42u64, "Inception"),
        MovieRef::new(1u64, "Heat"),
        MovieRef::new(2u64, "Alien"),
    ]))
}

fn controller(store: &Arc<InMemoryStore>, signed_in: bool) -> Arc<SyncController<InMemoryStore>> {
    let credential = if signed_in { Some(credential()) } else { None };
    Arc::new(SyncController::new(store.clone(), credential))
}

fn inception() -> MovieRef {
    MovieRef::new(42u64, "Inception")
}

async fn wait_for_calls(store: &InMemoryStore, op: StoreOp, count: usize) {
    while store.call_count(op).await < count {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_mount_present_then_toggle_removes() {
    let store = catalog_store();
    store.seed_member(MovieId::new(42)).await;
    let controller = controller(&store, true);

    let mounted = controller.mount(inception()).await.unwrap();
    assert_eq!(mounted.state, MembershipState::Present);
    assert!(mounted.can_toggle);

    let toggled = controller.toggle(MovieId::new(42)).await.unwrap();
    assert_eq!(toggled.state, MembershipState::Absent);
    assert!(!store.is_member(MovieId::new(42)).await);

    assert_eq!(
        store.calls().await,
        vec![
            StoreCall { op: StoreOp::Check, movie_id: Some(MovieId::new(42)) },
            StoreCall { op: StoreOp::Remove, movie_id: Some(MovieId::new(42)) },
        ]
    );
}

#[tokio::test]
async fn test_toggle_absent_adds() {
    let store = catalog_store();
    let controller = controller(&store, true);

    controller.mount(inception()).await;
    let toggled = controller.toggle(MovieId::new(42)).await.unwrap();
    assert_eq!(toggled.state, MembershipState::Present);
    assert_eq!(store.call_count(StoreOp::Add).await, 1);
    assert_eq!(store.call_count(StoreOp::Remove).await, 0);
}

#[tokio::test]
async fn test_catalog_miss_disables_toggle() {
    let store = catalog_store();
    let controller = controller(&store, true);

    let mounted = controller.mount(MovieRef::untitled(7u64)).await.unwrap();
    assert_eq!(mounted.state, MembershipState::Error);
    assert!(!mounted.can_toggle);
    assert_eq!(mounted.notice.unwrap().kind, NoticeKind::CatalogMiss);

    assert_eq!(controller.toggle(MovieId::new(7)).await, Err(ToggleRefused::CatalogMiss));
    assert_eq!(controller.toggle(MovieId::new(7)).await, Err(ToggleRefused::CatalogMiss));
    assert_eq!(store.calls().await.len(), 1);
}

#[tokio::test]
async fn test_no_credential_means_absent_without_requests() {
    let store = catalog_store();
    store.seed_member(MovieId::new(42)).await;
    let controller = controller(&store, false);

    let mounted = controller.mount(inception()).await.unwrap();
    assert_eq!(mounted.state, MembershipState::Absent);
    assert!(!mounted.can_toggle);
    assert_eq!(controller.toggle(MovieId::new(42)).await, Err(ToggleRefused::SignedOut));
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn test_double_toggle_issues_one_add() {
    let store = catalog_store();
    let controller = controller(&store, true);
    controller.mount(inception()).await;

    let release = store.hold_next(StoreOp::Add).await;
    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.toggle(MovieId::new(42)).await })
    };
    wait_for_calls(&store, StoreOp::Add, 1).await;

    assert_eq!(
        controller.snapshot(MovieId::new(42)).await.unwrap().state,
        MembershipState::Adding
    );
    assert_eq!(controller.toggle(MovieId::new(42)).await, Err(ToggleRefused::Busy));

    release.send(()).unwrap();
    let settled = first.await.unwrap().unwrap();
    assert_eq!(settled.state, MembershipState::Present);
    assert_eq!(store.call_count(StoreOp::Add).await, 1);
}

#[tokio::test]
async fn test_toggle_refused_while_initial_check_in_flight() {
    let store = catalog_store();
    let controller = controller(&store, true);

    let release = store.hold_next(StoreOp::Check).await;
    let mount = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.mount(inception()).await })
    };
    wait_for_calls(&store, StoreOp::Check, 1).await;

    assert_eq!(controller.toggle(MovieId::new(42)).await, Err(ToggleRefused::Busy));
    release.send(()).unwrap();
    assert_eq!(mount.await.unwrap().unwrap().state, MembershipState::Absent);
    assert_eq!(store.call_count(StoreOp::Add).await, 0);
}

#[tokio::test]
async fn test_late_check_does_not_overwrite_newer_toggle() {
    let store = catalog_store();
    let controller = controller(&store, true);
    controller.mount(inception()).await;

    // Background refresh answers "absent" but is held until after the user's add
    let release = store.hold_next(StoreOp::Check).await;
    let refresh = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.refresh(MovieId::new(42)).await })
    };
    wait_for_calls(&store, StoreOp::Check, 2).await;

    let toggled = controller.toggle(MovieId::new(42)).await.unwrap();
    assert_eq!(toggled.state, MembershipState::Present);

    release.send(()).unwrap();
    refresh.await.unwrap();
    assert_eq!(
        controller.snapshot(MovieId::new(42)).await.unwrap().state,
        MembershipState::Present
    );
}

#[tokio::test]
async fn test_remove_when_store_already_absent_is_quiet() {
    let store = catalog_store();
    store.seed_member(MovieId::new(42)).await;
    let controller = controller(&store, true);
    controller.mount(inception()).await;

    // Removed elsewhere after the check
    store.remove_membership(&credential(), MovieId::new(42)).await.unwrap();

    let toggled = controller.toggle(MovieId::new(42)).await.unwrap();
    assert_eq!(toggled.state, MembershipState::Absent);
    assert!(toggled.notice.is_none());
}

#[tokio::test]
async fn test_failed_add_reverts_and_allows_retry() {
    let store = catalog_store();
    let controller = controller(&store, true);
    controller.mount(inception()).await;

    store
        .fail_next(StoreOp::Add, StoreError::rejected(500, "database is locked"))
        .await;
    let failed = controller.toggle(MovieId::new(42)).await.unwrap();
    assert_eq!(failed.state, MembershipState::Absent);
    assert!(failed.can_toggle);
    let notice = failed.notice.unwrap();
    assert_eq!(notice.kind, NoticeKind::Transient);
    assert_eq!(notice.message, "database is locked");

    let retried = controller.toggle(MovieId::new(42)).await.unwrap();
    assert_eq!(retried.state, MembershipState::Present);
    assert!(retried.notice.is_none());
}

#[tokio::test]
async fn test_failed_check_fails_safe_to_absent() {
    let store = catalog_store();
    let controller = controller(&store, true);
    store
        .fail_next(StoreOp::Check, StoreError::NetworkFailure("connection refused".into()))
        .await;

    let mounted = controller.mount(inception()).await.unwrap();
    assert_eq!(mounted.state, MembershipState::Absent);
    assert!(mounted.can_toggle);
}

#[tokio::test]
async fn test_unauthorized_response_signs_out_every_item() {
    let store = catalog_store();
    store.seed_member(MovieId::new(1)).await;
    let controller = controller(&store, true);
    controller
        .mount_all(vec![inception(), MovieRef::new(1u64, "Heat")])
        .await;
    assert_eq!(
        controller.snapshot(MovieId::new(1)).await.unwrap().state,
        MembershipState::Present
    );

    store.revoke_all_tokens().await;
    let result = controller.toggle(MovieId::new(42)).await.unwrap();
    assert_eq!(result.state, MembershipState::Absent);
    assert!(!controller.is_signed_in().await);

    for snapshot in controller.snapshots().await {
        assert_eq!(snapshot.state, MembershipState::Absent);
        assert!(!snapshot.can_toggle);
        assert_eq!(snapshot.notice.unwrap().kind, NoticeKind::SignedOut);
    }

    let calls_before = store.calls().await.len();
    assert_eq!(controller.toggle(MovieId::new(1)).await, Err(ToggleRefused::SignedOut));
    assert_eq!(store.calls().await.len(), calls_before);
}

#[tokio::test]
async fn test_sign_out_discards_in_flight_add() {
    let store = catalog_store();
    let controller = controller(&store, true);
    controller.mount(inception()).await;

    let release = store.hold_next(StoreOp::Add).await;
    let toggle = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.toggle(MovieId::new(42)).await })
    };
    wait_for_calls(&store, StoreOp::Add, 1).await;

    controller.set_credential(None).await;
    release.send(()).unwrap();

    let result = toggle.await.unwrap().unwrap();
    assert_eq!(result.state, MembershipState::Absent);
    assert!(!result.can_toggle);
}

#[tokio::test]
async fn test_sign_in_refreshes_mounted_items() {
    let store = catalog_store();
    store.seed_member(MovieId::new(42)).await;
    let controller = controller(&store, false);
    controller.mount(inception()).await;
    controller.mount(MovieRef::new(2u64, "Alien")).await;

    controller.set_credential(Some(credential())).await;

    assert_eq!(
        controller.snapshot(MovieId::new(42)).await.unwrap().state,
        MembershipState::Present
    );
    let alien = controller.snapshot(MovieId::new(2)).await.unwrap();
    assert_eq!(alien.state, MembershipState::Absent);
    assert!(alien.can_toggle);
    assert_eq!(store.call_count(StoreOp::Check).await, 2);
}

#[tokio::test]
async fn test_subscribers_see_each_transition() {
    let store = catalog_store();
    store.seed_member(MovieId::new(42)).await;
    let controller = controller(&store, true);
    let mut changes = controller.subscribe();

    controller.mount(inception()).await;
    controller.toggle(MovieId::new(42)).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(change) = changes.try_recv() {
        assert_eq!(change.movie_id, MovieId::new(42));
        seen.push((change.from, change.to));
    }
    assert_eq!(
        seen,
        vec![
            (MembershipState::Unknown, MembershipState::Checking),
            (MembershipState::Checking, MembershipState::Present),
            (MembershipState::Present, MembershipState::Removing),
            (MembershipState::Removing, MembershipState::Absent),
        ]
    );
}

#[tokio::test]
async fn test_unmount_discards_late_response() {
    let store = catalog_store();
    let controller = controller(&store, true);

    let release = store.hold_next(StoreOp::Check).await;
    let mount = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.mount(inception()).await })
    };
    wait_for_calls(&store, StoreOp::Check, 1).await;

    assert!(controller.unmount(MovieId::new(42)).await);
    release.send(()).unwrap();

    assert!(mount.await.unwrap().is_none());
    assert!(controller.snapshots().await.is_empty());
}

#[tokio::test]
async fn test_load_watchlist_reconciles_settled_items() {
    let store = catalog_store();
    let controller = controller(&store, true);
    controller.mount(inception()).await;
    controller.mount(MovieRef::new(1u64, "Heat")).await;

    // Changed elsewhere since the items were checked
    store.seed_member(MovieId::new(42)).await;

    let entries = controller.load_watchlist().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Inception");
    assert_eq!(
        controller.snapshot(MovieId::new(42)).await.unwrap().state,
        MembershipState::Present
    );
    assert_eq!(
        controller.snapshot(MovieId::new(1)).await.unwrap().state,
        MembershipState::Absent
    );
}

#[tokio::test]
async fn test_load_watchlist_requires_credential() {
    let store = catalog_store();
    let controller = controller(&store, false);
    assert_eq!(controller.load_watchlist().await, Err(StoreError::AuthMissing));
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn test_mount_all_checks_every_movie() {
    let store = catalog_store();
    store.seed_member(MovieId::new(2)).await;
    let controller = controller(&store, true);

    let snapshots = controller
        .mount_all(vec![
            MovieRef::new(1u64, "Heat"),
            MovieRef::new(2u64, "Alien"),
            MovieRef::untitled(99u64),
        ])
        .await;

    let states: Vec<MembershipState> = snapshots.iter().map(|s| s.state).collect();
    assert_eq!(
        states,
        vec![MembershipState::Absent, MembershipState::Present, MembershipState::Error]
    );
    assert_eq!(store.call_count(StoreOp::Check).await, 3);
}

#[tokio::test]
async fn test_refresh_picks_up_change_made_elsewhere() {
    let store = catalog_store();
    let controller = controller(&store, true);
    controller.mount(inception()).await;

    store.seed_member(MovieId::new(42)).await;
    let refreshed = controller.refresh(MovieId::new(42)).await.unwrap();
    assert_eq!(refreshed.state, MembershipState::Present);
    assert_eq!(store.call_count(StoreOp::Check).await, 2);

    assert!(controller.refresh(MovieId::new(7)).await.is_none());
}

#[tokio::test]
async fn test_credential_swap_revokes_then_refreshes() {
    let store = catalog_store();
    store.seed_member(MovieId::new(42)).await;
    let controller = controller(&store, true);
    controller.mount(inception()).await;
    let mut changes = controller.subscribe();

    store.accept_only("other-token").await;
    controller
        .set_credential(SessionCredential::new("other-token"))
        .await;

    let snapshot = controller.snapshot(MovieId::new(42)).await.unwrap();
    assert_eq!(snapshot.state, MembershipState::Present);
    assert!(snapshot.can_toggle);
    assert_eq!(snapshot.notice, None);

    let mut seen = Vec::new();
    while let Ok(change) = changes.try_recv() {
        seen.push((change.from, change.to));
    }
    assert_eq!(
        seen,
        vec![
            (MembershipState::Present, MembershipState::Absent),
            (MembershipState::Absent, MembershipState::Present),
        ]
    );
}

#[tokio::test]
async fn test_mount_all_mounts_repeated_ids_once() {
    let store = catalog_store();
    let controller = controller(&store, true);

    let snapshots = controller
        .mount_all(vec![inception(), MovieRef::new(1u64, "Heat"), inception()])
        .await;

    let ids: Vec<MovieId> = snapshots.iter().map(|s| s.movie_id).collect();
    assert_eq!(ids, vec![MovieId::new(42), MovieId::new(1)]);
    assert!(snapshots.iter().all(|s| s.state == MembershipState::Absent));
    assert_eq!(store.call_count(StoreOp::Check).await, 2);
}

#[tokio::test]
async fn test_add_not_found_is_terminal() {
    let store = catalog_store();
    let controller = controller(&store, true);
    controller.mount(inception()).await;

    store.fail_next(StoreOp::Add, StoreError::NotFound).await;
    let snapshot = controller.toggle(MovieId::new(42)).await.unwrap();
    assert_eq!(snapshot.state, MembershipState::Error);
    assert!(!snapshot.can_toggle);
    assert_eq!(snapshot.notice.map(|n| n.kind), Some(NoticeKind::CatalogMiss));

    assert_eq!(
        controller.toggle(MovieId::new(42)).await,
        Err(ToggleRefused::CatalogMiss)
    );
    assert_eq!(store.call_count(StoreOp::Add).await, 1);
}

#[tokio::test]
async fn test_unauthorized_listing_signs_out_every_item() {
    let store = catalog_store();
    store.seed_member(MovieId::new(42)).await;
    let controller = controller(&store, true);
    controller.mount(inception()).await;
    controller.mount(MovieRef::new(1u64, "Heat")).await;

    store.revoke_all_tokens().await;
    assert_eq!(controller.load_watchlist().await, Err(StoreError::Unauthorized));

    assert!(!controller.is_signed_in().await);
    let snapshots = controller.snapshots().await;
    assert_eq!(snapshots.len(), 2);
    for snapshot in snapshots {
        assert_eq!(snapshot.state, MembershipState::Absent);
        assert!(!snapshot.can_toggle);
        assert_eq!(snapshot.notice.map(|n| n.kind), Some(NoticeKind::SignedOut));
    }
}
