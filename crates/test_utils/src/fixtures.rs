//! Pre-built Test Fixtures
//!
//! Provides ready-to-use users, owners and dates, plus [`ClaimsHarness`]:
//! a `ClaimService` over the in-memory store with a pinned clock and a
//! recording notifier, seeded with one user per role.

use chrono::{NaiveDate, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use std::sync::Arc;
use uuid::Uuid;

use core_kernel::FixedClock;
use domain_claims::{
    ClaimService, ClaimStore, InMemoryClaimStore, RecordingNotifier, Role, ShipOwner, User,
    Voyage,
};

use crate::builders::VoyageBuilder;

/// Fixture for users
pub struct UserFixtures;

impl UserFixtures {
    /// A random active user with the given role and an email address
    pub fn with_role(role: Role) -> User {
        let first: String = FirstName().fake();
        let last: String = LastName().fake();
        let suffix = Uuid::new_v4().simple().to_string();
        let mut user = User::new(
            format!("{}.{}", first.to_lowercase(), &suffix[..8]),
            format!("{} {}", first, last),
            role,
        );
        user.email = Some(SafeEmail().fake());
        user
    }

    pub fn admin() -> User {
        Self::with_role(Role::Admin)
    }

    pub fn team_lead() -> User {
        Self::with_role(Role::TeamLead)
    }

    /// A WRITE user
    pub fn analyst() -> User {
        Self::with_role(Role::Write)
    }

    /// A READ user
    pub fn viewer() -> User {
        Self::with_role(Role::Read)
    }

    pub fn inactive(role: Role) -> User {
        let mut user = Self::with_role(role);
        user.is_active = false;
        user
    }
}

/// Fixture for ship owners
pub struct ShipOwnerFixtures;

impl ShipOwnerFixtures {
    pub fn owner() -> ShipOwner {
        let suffix = Uuid::new_v4().simple().to_string();
        let mut owner = ShipOwner::new(
            format!("{} Shipping {}", LastName().fake::<String>(), &suffix[..6]),
            format!("OWN{}", &suffix[..6].to_uppercase()),
            Utc::now(),
        );
        owner.contact_email = Some(SafeEmail().fake());
        owner
    }
}

/// Fixture for dates used across scenarios
pub struct DateFixtures;

impl DateFixtures {
    /// The default "today" of the harness
    pub fn today() -> NaiveDate {
        Self::date(2024, 2, 1)
    }

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }
}

/// A claim service wired to in-memory collaborators
pub struct ClaimsHarness {
    pub store: Arc<InMemoryClaimStore>,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: Arc<ClaimService>,
    pub owner: ShipOwner,
    pub admin: User,
    pub lead: User,
    pub analyst: User,
    pub other_analyst: User,
    pub viewer: User,
}

impl ClaimsHarness {
    /// Harness whose clock reads [`DateFixtures::today`]
    pub async fn new() -> Self {
        Self::on(DateFixtures::today()).await
    }

    pub async fn on(today: NaiveDate) -> Self {
        let store = Arc::new(InMemoryClaimStore::new());
        let clock = Arc::new(FixedClock::on_date(today));
        let notifier = Arc::new(RecordingNotifier::new());
        let service = Arc::new(ClaimService::new(
            store.clone(),
            clock.clone(),
            notifier.clone(),
        ));

        let owner = ShipOwnerFixtures::owner();
        store.save_ship_owner(&owner).await.unwrap();

        let harness = Self {
            store,
            clock,
            notifier,
            service,
            owner,
            admin: UserFixtures::admin(),
            lead: UserFixtures::team_lead(),
            analyst: UserFixtures::analyst(),
            other_analyst: UserFixtures::analyst(),
            viewer: UserFixtures::viewer(),
        };
        for user in [
            &harness.admin,
            &harness.lead,
            &harness.analyst,
            &harness.other_analyst,
            &harness.viewer,
        ] {
            harness.store.save_user(user).await.unwrap();
        }
        harness
    }

    /// Adds another user to the store
    pub async fn add_user(&self, user: &User) {
        self.store.save_user(user).await.unwrap();
    }

    /// Registers a voyage for the harness owner with 72 days allowed laytime
    pub async fn voyage(&self) -> Voyage {
        self.register(VoyageBuilder::new(self.owner.id)).await
    }

    pub async fn register(&self, builder: VoyageBuilder) -> Voyage {
        self.service
            .register_voyage(&self.admin, builder.build())
            .await
            .unwrap()
    }
}
