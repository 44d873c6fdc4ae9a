//! Test data builders backed by the `fake` crate

use std::sync::atomic::{AtomicU64, Ordering};

use fake::faker::address::en::CityName;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use serde_json::{json, Value};

use CommunityHub::models::approval::ApprovalStatus;
use CommunityHub::models::user::{NewUser, User};
use CommunityHub::services::auth::hash_password;
use CommunityHub::utils::helpers::generate_sub_family_number;
use CommunityHub::AppState;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_seq() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

pub fn unique_email() -> String {
    format!("member{}@example.org", next_seq())
}

pub fn unique_mobile() -> String {
    format!("+91{:010}", 9_000_000_000u64 + next_seq())
}

/// JSON body for `POST /api/auth/register`
pub fn register_body() -> Value {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();
    let city: String = CityName().fake();

    json!({
        "first_name": first_name,
        "last_name": last_name,
        "email": unique_email(),
        "mobile": unique_mobile(),
        "password": TEST_PASSWORD,
        "city": city,
    })
}

/// Insert the primary account of a fresh sub-family
pub async fn create_user(state: &AppState, role: &str, status: ApprovalStatus) -> User {
    let role = state
        .database
        .roles
        .find_by_name(role)
        .await
        .expect("Failed to load role")
        .expect("Role is not seeded");

    let new_user = NewUser {
        first_name: FirstName().fake(),
        last_name: LastName().fake(),
        email: unique_email(),
        mobile: unique_mobile(),
        password_hash: hash_password(TEST_PASSWORD).expect("Failed to hash password"),
        role_id: role.id,
        approval_status: status,
        sub_family_number: generate_sub_family_number(),
        is_primary_account: true,
        gender: None,
        date_of_birth: None,
        address: None,
        city: Some(CityName().fake()),
        occupation: None,
    };

    state.database.users.create(new_user).await.expect("Failed to create user")
}

pub async fn create_approved(state: &AppState, role: &str) -> User {
    create_user(state, role, ApprovalStatus::Approved).await
}

/// JSON body for a family member
pub fn family_member_body(relationship: &str) -> Value {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();
    json!({
        "first_name": first_name,
        "last_name": last_name,
        "relationship": relationship,
    })
}
