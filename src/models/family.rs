//! Family member model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::approval::ApprovalStatus;
use super::user::User;

/// A dependent linked to a primary account through its sub-family number
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FamilyMember {
    pub id: i64,
    pub sub_family_number: String,
    pub primary_user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub relationship: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub mobile: Option<String>,
    pub occupation: Option<String>,
    pub approval_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a family member row
#[derive(Debug, Clone)]
pub struct NewFamilyMember {
    pub sub_family_number: String,
    pub primary_user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub relationship: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub mobile: Option<String>,
    pub occupation: Option<String>,
    pub approval_status: ApprovalStatus,
    pub created_by: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFamilyMemberRequest {
    /// Only honoured for callers allowed to manage any family
    pub sub_family_number: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub relationship: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub mobile: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFamilyMemberRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub relationship: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub mobile: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FamilyMemberFilter {
    pub q: Option<String>,
    pub status: Option<ApprovalStatus>,
    pub sub_family_number: Option<String>,
}

/// A whole sub-family: its primary account and dependents
#[derive(Debug, Clone, Serialize)]
pub struct FamilyView {
    pub sub_family_number: String,
    pub primary: Option<User>,
    pub members: Vec<FamilyMember>,
}
