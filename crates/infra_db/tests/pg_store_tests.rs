//! PostgreSQL store integration tests
//!
//! These start a PostgreSQL container and are ignored by default:
//! `cargo test -p infra_db -- --ignored`

use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;

use core_kernel::{FixedClock, PortError};
use domain_claims::{
    ActivityAction, ClaimError, ClaimQuery, ClaimService, ClaimStore, LogNotifier, ShipOwner,
    TimebarSweep, User, Voyage,
};
use infra_db::PgClaimStore;
use test_utils::{
    assert_conflict, assert_time_barred_on, create_isolated_test_database, DateFixtures,
    NewClaimBuilder, ShipOwnerFixtures, TestDatabase, UserFixtures, VoyageBuilder,
};

struct PgHarness {
    _db: TestDatabase,
    store: Arc<PgClaimStore>,
    clock: Arc<FixedClock>,
    service: Arc<ClaimService>,
    admin: User,
    lead: User,
    analyst: User,
    owner: ShipOwner,
}

impl PgHarness {
    async fn new() -> Self {
        let db = create_isolated_test_database()
            .await
            .expect("Failed to create test database");
        let store = Arc::new(PgClaimStore::new(db.pool().clone()));
        let clock = Arc::new(FixedClock::on_date(DateFixtures::today()));
        let service = Arc::new(ClaimService::new(
            store.clone(),
            clock.clone(),
            Arc::new(LogNotifier),
        ));

        let admin = UserFixtures::admin();
        let lead = UserFixtures::team_lead();
        let analyst = UserFixtures::analyst();
        for user in [&admin, &lead, &analyst] {
            store.save_user(user).await.unwrap();
        }
        let owner = ShipOwnerFixtures::owner();
        store.save_ship_owner(&owner).await.unwrap();

        Self {
            _db: db,
            store,
            clock,
            service,
            admin,
            lead,
            analyst,
            owner,
        }
    }

    async fn voyage(&self) -> Voyage {
        self.service
            .register_voyage(&self.admin, VoyageBuilder::new(self.owner.id).build())
            .await
            .unwrap()
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_claim_round_trip_and_demurrage() {
    let h = PgHarness::new().await;
    let voyage = h.voyage().await;

    let created = h
        .service
        .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).laytime_used(dec!(90)).build())
        .await
        .unwrap();
    let loaded = h.store.get_claim(created.id).await.unwrap();

    assert_eq!(loaded.claim_number, "CLM-20240201-0001");
    assert_eq!(loaded.demurrage_days, dec!(18));
    assert_eq!(loaded.version, 0);
    assert_eq!(loaded.ship_owner_id, h.owner.id);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_numbers_unique_within_day() {
    let h = PgHarness::new().await;
    let voyage = h.voyage().await;

    let mut numbers = HashSet::new();
    for _ in 0..50 {
        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();
        assert!(numbers.insert(claim.claim_number));
    }
    assert!(numbers.contains("CLM-20240201-0050"));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_duplicate_claim_number_reports_field() {
    let h = PgHarness::new().await;
    let voyage = h.voyage().await;
    let first = h
        .service
        .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
        .await
        .unwrap();

    let mut copy = first.clone();
    copy.id = core_kernel::ClaimId::new_v7();
    match h.store.insert_claim(&copy, &[]).await {
        Err(PortError::Duplicate { field, .. }) => assert_eq!(field, "claim_number"),
        other => panic!("expected Duplicate, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_stale_version_rejected_by_database() {
    let h = PgHarness::new().await;
    let voyage = h.voyage().await;
    let claim = h
        .service
        .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
        .await
        .unwrap();

    let mut first = claim.clone();
    first.claim_amount = dec!(150000);
    h.service.save_claim(&h.admin, first).await.unwrap();

    let mut stale = claim.clone();
    stale.version = 1;
    let result = h.store.update_claim(&stale, 0, &[]).await;
    assert!(matches!(result, Err(PortError::VersionConflict { found: 1, .. })));

    let mut second = claim.clone();
    second.claim_amount = dec!(1);
    assert_conflict(h.service.save_claim(&h.admin, second).await);
    assert_eq!(h.store.get_claim(claim.id).await.unwrap().claim_amount, dec!(150000));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_assignment_cascade_and_single_active_record() {
    let h = PgHarness::new().await;
    let voyage = h.voyage().await;
    let open = h
        .service
        .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
        .await
        .unwrap();

    h.service
        .assign_voyage(voyage.id, h.analyst.id, &h.lead)
        .await
        .unwrap();
    h.service
        .reassign_voyage(voyage.id, h.lead.id, &h.lead, Some("cover".to_string()))
        .await
        .unwrap();

    let claim = h.store.get_claim(open.id).await.unwrap();
    assert_eq!(claim.assigned_to, Some(h.analyst.id));
    assert_eq!(claim.version, 1);

    let history = h.store.assignment_history(voyage.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.iter().filter(|a| a.is_active).count(), 1);

    let comments = h.store.list_comments(open.id).await.unwrap();
    assert_eq!(comments.len(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_delete_keeps_activity_trail() {
    let h = PgHarness::new().await;
    let voyage = h.voyage().await;
    let claim = h
        .service
        .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
        .await
        .unwrap();
    h.service
        .add_comment(&h.analyst, claim.id, "draft")
        .await
        .unwrap();

    h.service.delete_claim(&h.analyst, claim.id).await.unwrap();

    let lookup = h.service.get_claim(&h.admin, claim.id).await;
    assert!(matches!(lookup, Err(ClaimError::NotFound { .. })));

    let orphaned: Vec<String> = sqlx::query_scalar(
        "SELECT action FROM claim_activity_log WHERE claim_number = $1 AND claim_id IS NULL ORDER BY created_at, id",
    )
    .bind(&claim.claim_number)
    .fetch_all(h.store.pool())
    .await
    .unwrap();
    assert_eq!(orphaned, vec!["CREATED".to_string(), "DELETED".to_string()]);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_activity_log_rejects_edits() {
    let h = PgHarness::new().await;
    let voyage = h.voyage().await;
    h.service
        .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
        .await
        .unwrap();

    let update = sqlx::query("UPDATE claim_activity_log SET message = 'rewritten'")
        .execute(h.store.pool())
        .await;
    assert!(update.is_err());
    let delete = sqlx::query("DELETE FROM claim_activity_log")
        .execute(h.store.pool())
        .await;
    assert!(delete.is_err());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_sweep_against_database() {
    let h = PgHarness::new().await;
    h.clock.set_date(DateFixtures::date(2024, 1, 1));
    let voyage = h.voyage().await;
    let claim = h
        .service
        .create_claim(
            &h.admin,
            NewClaimBuilder::new(voyage.id)
                .deadline(DateFixtures::date(2024, 1, 20))
                .build(),
        )
        .await
        .unwrap();

    h.clock.set_date(DateFixtures::date(2024, 2, 1));
    let report = TimebarSweep::new(h.service.clone()).run().await.unwrap();
    assert_eq!(report.time_barred, 1);

    let flagged = h.store.get_claim(claim.id).await.unwrap();
    assert_time_barred_on(&flagged, DateFixtures::date(2024, 2, 1));

    let actions: Vec<_> = h
        .store
        .list_activity(claim.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert!(actions.contains(&ActivityAction::TimeBarred));

    let barred = h
        .store
        .find_claims(&ClaimQuery {
            is_time_barred: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(barred.len(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_port_activity_timeline_round_trip() {
    use chrono::{TimeZone, Utc};
    use domain_claims::{ActivityCategory, DateStatus, NewPortActivity};

    let h = PgHarness::new().await;
    let voyage = h.voyage().await;
    let at = |day: u32, hour: u32| Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap();
    let input = |category, start, end| NewPortActivity {
        category,
        port_name: "Qingdao".to_string(),
        start_at: start,
        start_status: DateStatus::Actual,
        end_at: end,
        end_status: DateStatus::Estimated,
        cargo_quantity: Some(dec!(82000.50)),
        notes: None,
    };

    let discharge = h
        .service
        .record_port_activity(&h.analyst, voyage.id, input(ActivityCategory::CargoOps, at(5, 0), at(6, 12)))
        .await
        .unwrap();
    let anchorage = h
        .service
        .record_port_activity(&h.analyst, voyage.id, input(ActivityCategory::Operational, at(2, 0), at(5, 0)))
        .await
        .unwrap();

    let stored = h.store.list_port_activities(voyage.id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].id, anchorage.id);
    assert_eq!(stored[1], discharge);

    let overlapping = h
        .service
        .record_port_activity(&h.analyst, voyage.id, input(ActivityCategory::Bunkering, at(6, 0), at(7, 0)))
        .await;
    assert!(matches!(overlapping, Err(ClaimError::Validation(_))));
}
