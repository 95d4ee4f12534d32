//! ClaimService tests over the in-memory store

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;

use core_kernel::PortError;
use domain_claims::service::MAX_NUMBERING_ATTEMPTS;
use domain_claims::{
    ActivityAction, AssignmentStatus, Claim, ClaimError, ClaimQuery, ClaimStatus, ClaimStore,
    DocumentType, NewDocument, PaymentStatus, Role, StatusChange, TimebarSweep,
};
use test_utils::{
    assert_claim_number_on, assert_conflict, assert_demurrage_days, assert_permission_denied,
    assert_time_barred_on, assert_validation, ClaimsHarness, DateFixtures, NewClaimBuilder,
    UserFixtures,
};

// ============================================================================
// Creation and derived fields
// ============================================================================

mod creation_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_numbers_and_derives() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;

        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).laytime_used(dec!(90)).build())
            .await
            .unwrap();

        assert_eq!(claim.claim_number, "CLM-20240201-0001");
        assert_claim_number_on(&claim, DateFixtures::today());
        assert_demurrage_days(&claim, dec!(18));
        assert_eq!(claim.version, 0);
        assert_eq!(claim.status, ClaimStatus::Draft);
        assert_eq!(claim.payment_status, PaymentStatus::NotSent);
        assert_eq!(claim.ship_owner_id, h.owner.id);
        assert_eq!(claim.created_by, Some(h.analyst.id));

        let activity = h.service.activity(&h.analyst, claim.id).await.unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].action, ActivityAction::Created);
    }

    #[tokio::test]
    async fn test_laytime_edit_recomputes_demurrage() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).laytime_used(dec!(90)).build())
            .await
            .unwrap();

        let mut edited = claim.clone();
        edited.laytime_used = Some(dec!(60));
        let saved = h.service.save_claim(&h.analyst, edited).await.unwrap();

        assert_demurrage_days(&saved, Decimal::ZERO);
        assert_eq!(saved.version, 1);
    }

    #[tokio::test]
    async fn test_client_supplied_demurrage_is_overwritten() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).laytime_used(dec!(80)).build())
            .await
            .unwrap();

        let mut edited = claim.clone();
        edited.demurrage_days = dec!(500);
        let saved = h.service.save_claim(&h.analyst, edited).await.unwrap();
        assert_demurrage_days(&saved, dec!(8));
    }

    #[tokio::test]
    async fn test_claim_on_unknown_voyage_is_invalid() {
        let h = ClaimsHarness::new().await;
        let result = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(core_kernel::VoyageId::new()).build())
            .await;
        assert_validation(result);
    }

    #[tokio::test]
    async fn test_negative_amount_is_invalid() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let result = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).amount(dec!(-5)).build())
            .await;
        assert_validation(result);
    }

    #[tokio::test]
    async fn test_duplicate_external_id_rejected() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        h.service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).external_id("OPS-1").build())
            .await
            .unwrap();

        let result = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).external_id("OPS-1").build())
            .await;
        match result {
            Err(ClaimError::UniquenessViolation { field, .. }) => assert_eq!(field, "external_id"),
            other => panic!("expected UniquenessViolation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_overdue_claim_is_time_barred_on_create() {
        let h = ClaimsHarness::on(DateFixtures::date(2024, 2, 1)).await;
        let voyage = h.voyage().await;

        let claim = h
            .service
            .create_claim(
                &h.analyst,
                NewClaimBuilder::new(voyage.id)
                    .deadline(DateFixtures::date(2024, 1, 1))
                    .build(),
            )
            .await
            .unwrap();

        assert_time_barred_on(&claim, DateFixtures::date(2024, 2, 1));
        let actions: Vec<_> = h
            .service
            .activity(&h.analyst, claim.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, vec![ActivityAction::Created, ActivityAction::TimeBarred]);
    }

    #[tokio::test]
    async fn test_new_claim_ignores_supplied_creator_and_lifecycle() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let mut forged = Claim::draft(
            NewClaimBuilder::new(voyage.id).amount(dec!(1000)).build(),
            &voyage,
            Some(h.other_analyst.id),
            chrono::Utc::now(),
        );
        forged.status = ClaimStatus::Settled;
        forged.payment_status = PaymentStatus::Paid;
        forged.paid_amount = dec!(1000);
        forged.is_time_barred = true;
        forged.version = 7;
        forged.submitted_at = Some(chrono::Utc::now());
        forged.paid_at = Some(chrono::Utc::now());

        let claim = h.service.save_claim(&h.analyst, forged).await.unwrap();

        assert_eq!(claim.created_by, Some(h.analyst.id));
        assert_eq!(claim.status, ClaimStatus::Draft);
        assert_eq!(claim.payment_status, PaymentStatus::NotSent);
        assert_eq!(claim.paid_amount, Decimal::ZERO);
        assert!(!claim.is_time_barred);
        assert_eq!(claim.time_bar_date, None);
        assert_eq!(claim.version, 0);
        assert!(claim.submitted_at.is_none() && claim.paid_at.is_none());

        // The colleague it was credited to gains nothing over it
        let mut edit = claim.clone();
        edit.description = Some("not mine".to_string());
        assert_permission_denied(h.service.save_claim(&h.other_analyst, edit).await);
        assert_permission_denied(h.service.delete_claim(&h.other_analyst, claim.id).await);
    }
}

// ============================================================================
// Claim numbering
// ============================================================================

mod numbering_tests {
    use super::*;

    #[tokio::test]
    async fn test_thousand_claims_same_day_are_unique_and_increasing() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;

        let mut numbers = Vec::with_capacity(1000);
        for _ in 0..1000 {
            let claim = h
                .service
                .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
                .await
                .unwrap();
            numbers.push(claim.claim_number);
        }

        let unique: HashSet<_> = numbers.iter().collect();
        assert_eq!(unique.len(), 1000);
        assert!(numbers.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(numbers.last().unwrap(), "CLM-20240201-1000");
    }

    #[tokio::test]
    async fn test_numbering_restarts_next_day() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        for _ in 0..3 {
            h.service
                .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
                .await
                .unwrap();
        }

        h.clock.set_date(DateFixtures::date(2024, 2, 2));
        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();
        assert_eq!(claim.claim_number, "CLM-20240202-0001");
    }

    #[tokio::test]
    async fn test_collisions_retried_until_free_number() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        h.store.inject_claim_number_collisions(MAX_NUMBERING_ATTEMPTS - 1);

        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();
        assert_eq!(claim.claim_number, "CLM-20240201-0001");
    }

    #[tokio::test]
    async fn test_persistent_collisions_give_up() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        h.store.inject_claim_number_collisions(MAX_NUMBERING_ATTEMPTS);

        let result = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
            .await;

        match result {
            Err(err @ ClaimError::UniquenessViolation { .. }) => assert!(err.is_retryable()),
            other => panic!("expected UniquenessViolation, got {:?}", other),
        }
        let claims = h.store.find_claims(&ClaimQuery::default()).await.unwrap();
        assert!(claims.is_empty());
    }
}

// ============================================================================
// Optimistic concurrency
// ============================================================================

mod concurrency_tests {
    use super::*;

    #[tokio::test]
    async fn test_stale_save_is_rejected() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let mut claim = h
            .service
            .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();

        for amount in [dec!(101000), dec!(102000), dec!(103000)] {
            claim.claim_amount = amount;
            claim = h.service.save_claim(&h.admin, claim).await.unwrap();
        }
        assert_eq!(claim.version, 3);

        let mut first = claim.clone();
        let mut second = claim.clone();
        first.claim_amount = dec!(110000);
        second.claim_amount = dec!(120000);

        let saved = h.service.save_claim(&h.admin, first).await.unwrap();
        assert_eq!(saved.version, 4);
        assert_conflict(h.service.save_claim(&h.admin, second).await);

        let stored = h.store.get_claim(claim.id).await.unwrap();
        assert_eq!(stored.version, 4);
        assert_eq!(stored.claim_amount, dec!(110000));
    }

    #[tokio::test]
    async fn test_store_guards_version_on_write() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();

        let mut concurrent = claim.clone();
        concurrent.version = 1;
        h.store.overwrite_claim(concurrent).await;

        let mut stale = claim.clone();
        stale.version = 1;
        stale.claim_amount = dec!(1);
        let result = h.store.update_claim(&stale, 0, &[]).await;
        assert!(matches!(result, Err(PortError::VersionConflict { .. })));
        assert_eq!(h.store.get_claim(claim.id).await.unwrap().claim_amount, dec!(100000));
    }

    #[tokio::test]
    async fn test_failed_save_writes_no_activity() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();

        let mut stale = claim.clone();
        stale.version = 7;
        stale.claim_amount = dec!(5);
        assert_conflict(h.service.save_claim(&h.admin, stale).await);

        let activity = h.service.activity(&h.admin, claim.id).await.unwrap();
        assert_eq!(activity.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_number_is_immutable() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let mut claim = h
            .service
            .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();

        claim.claim_number = "CLM-20240201-0999".to_string();
        assert_validation(h.service.save_claim(&h.admin, claim).await);
    }
}

// ============================================================================
// Status and payments
// ============================================================================

mod status_tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_stamps_and_logs() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();

        let submitted = h
            .service
            .update_status(
                &h.analyst,
                claim.id,
                claim.version,
                StatusChange {
                    status: Some(ClaimStatus::Submitted),
                    payment_status: Some(PaymentStatus::Sent),
                },
            )
            .await
            .unwrap();

        assert!(submitted.submitted_at.is_some());
        assert!(submitted.sent_to_owner_at.is_some());
        assert_eq!(submitted.version, 1);

        let actions: Vec<_> = h
            .service
            .activity(&h.analyst, claim.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert!(actions.contains(&ActivityAction::StatusChanged));
        assert!(actions.contains(&ActivityAction::PaymentStatusChanged));
    }

    #[tokio::test]
    async fn test_writer_cannot_edit_after_submission() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();
        let submitted = h
            .service
            .update_status(
                &h.analyst,
                claim.id,
                claim.version,
                StatusChange {
                    status: Some(ClaimStatus::Submitted),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut edited = submitted.clone();
        edited.claim_amount = dec!(1);
        assert_permission_denied(h.service.save_claim(&h.analyst, edited.clone()).await);
        assert!(h.service.save_claim(&h.admin, edited).await.is_ok());
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).amount(dec!(100000)).build())
            .await
            .unwrap();

        let partial = h
            .service
            .record_payment(&h.analyst, claim.id, claim.version, dec!(40000))
            .await
            .unwrap();
        assert_eq!(partial.payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(partial.outstanding_amount().amount(), dec!(60000));

        assert_conflict(
            h.service
                .record_payment(&h.analyst, claim.id, claim.version, dec!(60000))
                .await,
        );

        let paid = h
            .service
            .record_payment(&h.analyst, claim.id, partial.version, dec!(60000))
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert!(paid.outstanding_amount().amount().is_zero());
        assert!(paid.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_payment_must_be_positive() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();

        assert_validation(
            h.service
                .record_payment(&h.analyst, claim.id, claim.version, Decimal::ZERO)
                .await,
        );
        assert_permission_denied(
            h.service
                .record_payment(&h.viewer, claim.id, claim.version, dec!(10))
                .await,
        );
    }

    #[tokio::test]
    async fn test_payment_notifies_assignee() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(
                &h.admin,
                NewClaimBuilder::new(voyage.id).assigned_to(h.analyst.id).build(),
            )
            .await
            .unwrap();
        let before = h.notifier.sent().len();

        h.service
            .record_payment(&h.lead, claim.id, claim.version, dec!(500))
            .await
            .unwrap();

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), before + 1);
        assert_eq!(sent.last().unwrap().recipients, vec![h.analyst.email.clone().unwrap()]);
    }

    #[tokio::test]
    async fn test_analytics_totals() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let first = h
            .service
            .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).amount(dec!(1000)).build())
            .await
            .unwrap();
        h.service
            .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).amount(dec!(500)).build())
            .await
            .unwrap();
        h.service
            .record_payment(&h.admin, first.id, first.version, dec!(250))
            .await
            .unwrap();

        let analytics = h
            .service
            .analytics(&h.viewer, &ClaimQuery::for_voyage(voyage.id))
            .await
            .unwrap();
        assert_eq!(analytics.total_claims, 2);
        assert_eq!(analytics.total_claimed, dec!(1500));
        assert_eq!(analytics.total_paid, dec!(250));
        assert_eq!(analytics.total_outstanding, dec!(1250));
        assert_eq!(analytics.by_payment_status.get("PARTIALLY_PAID"), Some(&1));
    }
}

// ============================================================================
// Voyage assignment
// ============================================================================

mod assignment_tests {
    use super::*;

    #[tokio::test]
    async fn test_assignment_cascades_to_unassigned_claims_only() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let open = h
            .service
            .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();
        let owned = h
            .service
            .create_claim(
                &h.admin,
                NewClaimBuilder::new(voyage.id)
                    .assigned_to(h.other_analyst.id)
                    .build(),
            )
            .await
            .unwrap();

        let assigned = h
            .service
            .assign_voyage(voyage.id, h.analyst.id, &h.lead)
            .await
            .unwrap();
        assert_eq!(assigned.assignment_status, AssignmentStatus::Assigned);
        assert_eq!(assigned.assigned_analyst_id, Some(h.analyst.id));
        assert!(assigned.assigned_at.is_some());

        let open = h.store.get_claim(open.id).await.unwrap();
        assert_eq!(open.assigned_to, Some(h.analyst.id));
        assert_eq!(open.version, 1);

        let owned = h.store.get_claim(owned.id).await.unwrap();
        assert_eq!(owned.assigned_to, Some(h.other_analyst.id));
        assert_eq!(owned.version, 0);
    }

    #[tokio::test]
    async fn test_new_claims_inherit_voyage_analyst() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        h.service
            .assign_voyage(voyage.id, h.analyst.id, &h.analyst)
            .await
            .unwrap();

        let claim = h
            .service
            .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();
        assert_eq!(claim.assigned_to, Some(h.analyst.id));
    }

    #[tokio::test]
    async fn test_only_one_active_assignment() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        h.service
            .assign_voyage(voyage.id, h.analyst.id, &h.lead)
            .await
            .unwrap();
        h.service
            .reassign_voyage(voyage.id, h.other_analyst.id, &h.lead, None)
            .await
            .unwrap();

        let history = h.service.assignment_history(&h.viewer, voyage.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_active);
        assert!(history[0].unassigned_at.is_some());
        assert!(history[1].is_active);
        assert_eq!(history[1].assigned_to, h.other_analyst.id);
        assert_eq!(history.iter().filter(|a| a.is_active).count(), 1);
    }

    #[tokio::test]
    async fn test_reassignment_with_reason_comments_every_claim() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let mut ids = Vec::new();
        for _ in 0..2 {
            let claim = h
                .service
                .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
                .await
                .unwrap();
            ids.push(claim.id);
        }
        h.service
            .assign_voyage(voyage.id, h.analyst.id, &h.lead)
            .await
            .unwrap();

        h.service
            .reassign_voyage(
                voyage.id,
                h.other_analyst.id,
                &h.lead,
                Some("Workload balancing".to_string()),
            )
            .await
            .unwrap();

        let expected = format!(
            "Reassigned from {} to {}. Reason: Workload balancing",
            h.analyst.full_name, h.other_analyst.full_name
        );
        for id in ids {
            let comments = h.service.comments(&h.viewer, id).await.unwrap();
            assert_eq!(comments.len(), 1);
            assert_eq!(comments[0].content, expected);
            assert_eq!(comments[0].author_id, h.lead.id);
        }
    }

    #[tokio::test]
    async fn test_reassignment_without_reason_adds_no_comment() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();

        h.service
            .reassign_voyage(voyage.id, h.analyst.id, &h.lead, Some("   ".to_string()))
            .await
            .unwrap();
        assert!(h.service.comments(&h.admin, claim.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writer_cannot_assign_others() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;

        assert_permission_denied(
            h.service
                .assign_voyage(voyage.id, h.other_analyst.id, &h.analyst)
                .await,
        );
        let untouched = h.service.get_voyage(&h.viewer, voyage.id).await.unwrap();
        assert_eq!(untouched.assignment_status, AssignmentStatus::Unassigned);
    }

    #[tokio::test]
    async fn test_current_assignee_may_hand_over() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        h.service
            .assign_voyage(voyage.id, h.analyst.id, &h.analyst)
            .await
            .unwrap();

        assert_permission_denied(
            h.service
                .reassign_voyage(voyage.id, h.analyst.id, &h.other_analyst, None)
                .await,
        );
        let voyage = h
            .service
            .reassign_voyage(voyage.id, h.other_analyst.id, &h.analyst, None)
            .await
            .unwrap();
        assert_eq!(voyage.assigned_analyst_id, Some(h.other_analyst.id));
    }

    #[tokio::test]
    async fn test_read_only_user_cannot_receive_voyage() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        assert_validation(h.service.assign_voyage(voyage.id, h.viewer.id, &h.lead).await);
    }

    #[tokio::test]
    async fn test_assignment_notifies_analyst() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;

        h.service
            .assign_voyage(voyage.id, h.analyst.id, &h.lead)
            .await
            .unwrap();

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipients, vec![h.analyst.email.clone().unwrap()]);
        assert!(sent[0].subject.contains(&voyage.voyage_number));
    }

    #[tokio::test]
    async fn test_writer_cannot_hand_claim_to_someone_else() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();

        let mut edit = claim.clone();
        edit.assigned_to = Some(h.viewer.id);
        assert_permission_denied(h.service.save_claim(&h.analyst, edit).await);

        let mut edit = claim.clone();
        edit.assigned_to = Some(h.other_analyst.id);
        assert_permission_denied(h.service.save_claim(&h.analyst, edit).await);

        let stored = h.store.get_claim(claim.id).await.unwrap();
        assert_eq!(stored.assigned_to, None);
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn test_writer_cannot_create_claim_for_someone_else() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;

        assert_permission_denied(
            h.service
                .create_claim(
                    &h.analyst,
                    NewClaimBuilder::new(voyage.id).assigned_to(h.other_analyst.id).build(),
                )
                .await,
        );
        assert!(h.store.find_claims(&ClaimQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writer_may_take_claim_themselves() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).assigned_to(h.analyst.id).build())
            .await
            .unwrap();
        assert_eq!(claim.assigned_to, Some(h.analyst.id));

        let mut edit = claim.clone();
        edit.description = Some("taking this one".to_string());
        let saved = h.service.save_claim(&h.analyst, edit).await.unwrap();
        assert_eq!(saved.assigned_to, Some(h.analyst.id));
    }

    #[tokio::test]
    async fn test_claim_assignee_must_be_active_writer() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let retired = UserFixtures::inactive(Role::Write);
        h.add_user(&retired).await;

        for actor in [&h.lead, &h.admin] {
            assert_validation(
                h.service
                    .create_claim(actor, NewClaimBuilder::new(voyage.id).assigned_to(retired.id).build())
                    .await,
            );
            assert_validation(
                h.service
                    .create_claim(actor, NewClaimBuilder::new(voyage.id).assigned_to(h.viewer.id).build())
                    .await,
            );
        }

        let claim = h
            .service
            .create_claim(&h.admin, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();
        let mut edit = claim.clone();
        edit.assigned_to = Some(retired.id);
        assert_validation(h.service.save_claim(&h.admin, edit).await);
    }

    #[tokio::test]
    async fn test_team_lead_assigns_claim_to_analyst() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.lead, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();

        let mut edit = claim.clone();
        edit.assigned_to = Some(h.analyst.id);
        let saved = h.service.save_claim(&h.lead, edit).await.unwrap();

        assert_eq!(saved.assigned_to, Some(h.analyst.id));
        let actions: Vec<_> = h
            .service
            .activity(&h.lead, claim.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert!(actions.contains(&ActivityAction::Assigned));
    }
}

// ============================================================================
// Port activities
// ============================================================================

mod port_activity_tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use domain_claims::{ActivityCategory, DateStatus, NewPortActivity};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn activity(category: ActivityCategory, start: DateTime<Utc>, end: DateTime<Utc>) -> NewPortActivity {
        NewPortActivity {
            category,
            port_name: "Tubarao".to_string(),
            start_at: start,
            start_status: DateStatus::Actual,
            end_at: end,
            end_status: DateStatus::Actual,
            cargo_quantity: None,
            notes: Some("per statement of facts".to_string()),
        }
    }

    #[tokio::test]
    async fn test_timeline_in_start_order_with_totals() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;

        let mut loading = activity(ActivityCategory::CargoOps, at(3, 6), at(4, 18));
        loading.cargo_quantity = Some(dec!(170000));
        h.service
            .record_port_activity(&h.analyst, voyage.id, loading)
            .await
            .unwrap();
        let waiting = h
            .service
            .record_port_activity(&h.analyst, voyage.id, activity(ActivityCategory::Operational, at(1, 0), at(3, 6)))
            .await
            .unwrap();
        assert_eq!(waiting.created_by, h.analyst.id);
        assert_eq!(waiting.duration_hours(), dec!(54));

        let timeline = h.service.voyage_timeline(&h.viewer, voyage.id).await.unwrap();
        assert_eq!(timeline.activities.len(), 2);
        assert_eq!(timeline.activities[0].id, waiting.id);
        assert_eq!(timeline.total_hours, dec!(90));
        let cargo = timeline
            .by_category
            .iter()
            .find(|s| s.category == ActivityCategory::CargoOps)
            .unwrap();
        assert_eq!(cargo.total_cargo, dec!(170000));
    }

    #[tokio::test]
    async fn test_overlapping_activity_is_rejected() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        h.service
            .record_port_activity(&h.analyst, voyage.id, activity(ActivityCategory::CargoOps, at(2, 0), at(2, 12)))
            .await
            .unwrap();

        assert_validation(
            h.service
                .record_port_activity(&h.analyst, voyage.id, activity(ActivityCategory::Bunkering, at(2, 10), at(2, 14)))
                .await,
        );
        h.service
            .record_port_activity(&h.analyst, voyage.id, activity(ActivityCategory::Bunkering, at(2, 12), at(2, 14)))
            .await
            .unwrap();

        let timeline = h.service.voyage_timeline(&h.analyst, voyage.id).await.unwrap();
        assert_eq!(timeline.activities.len(), 2);
    }

    #[tokio::test]
    async fn test_viewer_cannot_record_activity() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;

        assert_permission_denied(
            h.service
                .record_port_activity(&h.viewer, voyage.id, activity(ActivityCategory::Transit, at(1, 0), at(1, 4)))
                .await,
        );
        assert_validation(
            h.service
                .record_port_activity(&h.analyst, voyage.id, activity(ActivityCategory::Transit, at(1, 4), at(1, 0)))
                .await,
        );
        assert!(h.store.list_port_activities(voyage.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_voyage_timeline_is_not_found() {
        let h = ClaimsHarness::new().await;
        let result = h.service.voyage_timeline(&h.viewer, core_kernel::VoyageId::new()).await;
        assert!(matches!(result, Err(ClaimError::NotFound { .. })));
    }
}

// ============================================================================
// Threads and deletion
// ============================================================================

mod thread_tests {
    use super::*;

    #[tokio::test]
    async fn test_viewer_may_comment() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();

        h.service
            .add_comment(&h.viewer, claim.id, "Owner confirmed receipt")
            .await
            .unwrap();
        assert_validation(h.service.add_comment(&h.viewer, claim.id, "  ").await);

        let comments = h.service.comments(&h.analyst, claim.id).await.unwrap();
        assert_eq!(comments.len(), 1);
    }

    #[tokio::test]
    async fn test_document_stored_under_voyage_and_claim() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();

        let document = h
            .service
            .attach_document(
                &h.analyst,
                claim.id,
                NewDocument {
                    title: "Statement of facts".to_string(),
                    document_type: DocumentType::Sof,
                    file_name: "sof.pdf".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            document.file_path,
            format!("voyages/{}/claims/{}/documents/sof.pdf", voyage.id, claim.id)
        );
        assert_eq!(h.service.documents(&h.viewer, claim.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_creator_deletes_draft_and_trail_survives() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();
        h.service
            .add_comment(&h.analyst, claim.id, "to be removed")
            .await
            .unwrap();

        assert_permission_denied(h.service.delete_claim(&h.other_analyst, claim.id).await);
        h.service.delete_claim(&h.analyst, claim.id).await.unwrap();

        let lookup = h.service.get_claim(&h.admin, claim.id).await;
        assert!(matches!(lookup, Err(ClaimError::NotFound { .. })));
        assert!(h.store.list_comments(claim.id).await.unwrap().is_empty());

        let trail: Vec<_> = h
            .store
            .all_activity()
            .await
            .into_iter()
            .filter(|e| e.claim_number == claim.claim_number)
            .collect();
        assert_eq!(trail.len(), 2);
        assert!(trail.iter().all(|e| e.claim_id.is_none()));
        assert_eq!(trail[1].action, ActivityAction::Deleted);
    }

    #[tokio::test]
    async fn test_only_admin_deletes_submitted_claims() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let claim = h
            .service
            .create_claim(&h.analyst, NewClaimBuilder::new(voyage.id).build())
            .await
            .unwrap();
        h.service
            .update_status(
                &h.analyst,
                claim.id,
                claim.version,
                StatusChange {
                    status: Some(ClaimStatus::Submitted),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_permission_denied(h.service.delete_claim(&h.analyst, claim.id).await);
        assert_permission_denied(h.service.delete_claim(&h.lead, claim.id).await);
        h.service.delete_claim(&h.admin, claim.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_inactive_user_is_locked_out() {
        let h = ClaimsHarness::new().await;
        let voyage = h.voyage().await;
        let inactive = UserFixtures::inactive(domain_claims::Role::Admin);
        h.add_user(&inactive).await;

        assert_permission_denied(
            h.service
                .create_claim(&inactive, NewClaimBuilder::new(voyage.id).build())
                .await,
        );
        assert_permission_denied(h.service.find_claims(&inactive, &ClaimQuery::default()).await);
    }
}

// ============================================================================
// Time-bar sweep
// ============================================================================

mod sweep_tests {
    use super::*;

    #[tokio::test]
    async fn test_sweep_flags_overdue_and_warns_approaching() {
        let h = ClaimsHarness::on(DateFixtures::date(2024, 1, 1)).await;
        let voyage = h.voyage().await;
        let overdue = h
            .service
            .create_claim(
                &h.admin,
                NewClaimBuilder::new(voyage.id)
                    .deadline(DateFixtures::date(2024, 1, 20))
                    .assigned_to(h.analyst.id)
                    .build(),
            )
            .await
            .unwrap();
        let approaching = h
            .service
            .create_claim(
                &h.admin,
                NewClaimBuilder::new(voyage.id)
                    .deadline(DateFixtures::date(2024, 3, 1))
                    .assigned_to(h.analyst.id)
                    .build(),
            )
            .await
            .unwrap();
        let sent = h
            .service
            .create_claim(
                &h.admin,
                NewClaimBuilder::new(voyage.id)
                    .deadline(DateFixtures::date(2024, 1, 10))
                    .build(),
            )
            .await
            .unwrap();
        h.service
            .update_status(
                &h.admin,
                sent.id,
                sent.version,
                StatusChange {
                    payment_status: Some(PaymentStatus::Sent),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let notified_before = h.notifier.sent().len();

        h.clock.set_date(DateFixtures::date(2024, 2, 1));
        let report = TimebarSweep::new(h.service.clone()).run().await.unwrap();

        assert_eq!(report.time_barred, 1);
        assert_eq!(report.approaching, 1);
        assert_eq!(report.skipped, 0);

        let flagged = h.store.get_claim(overdue.id).await.unwrap();
        assert_time_barred_on(&flagged, DateFixtures::date(2024, 2, 1));
        assert_eq!(flagged.version, overdue.version + 1);

        let entry = h
            .store
            .list_activity(overdue.id)
            .await
            .unwrap()
            .into_iter()
            .find(|e| e.action == ActivityAction::TimeBarred)
            .expect("time-bar entry");
        assert_eq!(entry.user_id, None);

        assert!(!h.store.get_claim(sent.id).await.unwrap().is_time_barred);
        assert!(!h.store.get_claim(approaching.id).await.unwrap().is_time_barred);
        assert_eq!(h.notifier.sent().len(), notified_before + 2);
    }

    #[tokio::test]
    async fn test_second_sweep_is_a_no_op() {
        let h = ClaimsHarness::on(DateFixtures::date(2024, 1, 1)).await;
        let voyage = h.voyage().await;
        h.service
            .create_claim(
                &h.admin,
                NewClaimBuilder::new(voyage.id)
                    .deadline(DateFixtures::date(2024, 1, 20))
                    .build(),
            )
            .await
            .unwrap();
        h.clock.set_date(DateFixtures::date(2024, 2, 1));

        let sweep = TimebarSweep::new(h.service.clone()).with_warning_days(0);
        assert_eq!(sweep.run().await.unwrap().time_barred, 1);
        assert_eq!(sweep.run().await.unwrap().time_barred, 0);
    }

    #[tokio::test]
    async fn test_huge_warning_window_covers_every_future_deadline() {
        let h = ClaimsHarness::on(DateFixtures::date(2024, 1, 1)).await;
        let voyage = h.voyage().await;
        h.service
            .create_claim(
                &h.admin,
                NewClaimBuilder::new(voyage.id)
                    .deadline(DateFixtures::date(2099, 12, 31))
                    .build(),
            )
            .await
            .unwrap();

        let report = TimebarSweep::new(h.service.clone())
            .with_warning_days(i64::MAX)
            .run()
            .await
            .unwrap();

        assert_eq!(report.approaching, 1);
        assert_eq!(report.time_barred, 0);
    }
}
