//! Domain DTOs for the activity registration backend.
//!
//! # Design
//! Wire names are camelCase. Optional filter fields are skipped when unset
//! so they never reach the query string. These types are defined
//! independently of the mock server; the integration test catches drift.

use serde::{Deserialize, Serialize};

/// A published activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A student's registration for one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: i64,
    pub activity_id: i64,
    #[serde(default)]
    pub activity_title: Option<String>,
    pub student_name: String,
    pub phone: String,
    #[serde(default)]
    pub student_no: Option<String>,
    pub status: String,
    #[serde(default)]
    pub checked_in: bool,
}

/// What a valid check-in token resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInTokenInfo {
    pub activity_id: i64,
    pub activity_title: String,
}

/// Filters for the public activity list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// Registration form submitted by a student.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub activity_id: i64,
    pub student_name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

/// Manual check-in by activity and phone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInForm {
    pub activity_id: i64,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
}

/// Filters for the generic registration list; students narrow it by phone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Lookup of a student's own records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecordQuery {
    pub name: String,
    pub phone: String,
}

/// Check-in through a scanned QR token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCheckIn {
    pub token: String,
    pub student_name: String,
    pub phone: String,
}
