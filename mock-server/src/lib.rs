use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub code: i64,
    pub message: String,
    pub data: Value,
}

impl Envelope {
    pub fn ok<T: Serialize>(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    pub fn fail(code: i64, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: Value::Null,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub cover_image: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: i64,
    pub activity_id: i64,
    pub activity_title: Option<String>,
    pub student_name: String,
    pub phone: String,
    pub student_no: Option<String>,
    pub status: String,
    pub checked_in: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub activity_id: i64,
    pub student_name: String,
    pub phone: String,
    pub student_no: Option<String>,
    pub remark: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInInput {
    pub activity_id: i64,
    pub phone: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCheckInInput {
    pub token: String,
    pub student_name: String,
    pub phone: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFilter {
    pub keyword: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFilter {
    pub phone: Option<String>,
    pub activity_id: Option<i64>,
    pub status: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct StudentFilter {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct TokenQuery {
    pub token: Option<String>,
}

pub const REGISTERED: &str = "registered";
pub const CANCELLED: &str = "cancelled";

/// In-memory backend state.
#[derive(Debug, Default)]
pub struct Store {
    pub activities: Vec<Activity>,
    pub registrations: Vec<Registration>,
    tokens: HashMap<String, i64>,
    next_registration_id: i64,
}

impl Store {
    /// Two published activities, each with a check-in token.
    pub fn seeded() -> Self {
        let mut store = Store {
            next_registration_id: 1,
            ..Default::default()
        };
        store.activities.push(Activity {
            id: 1,
            title: "Campus Cleanup Day".to_string(),
            description: Some("Litter pick along the east lake".to_string()),
            location: Some("East Lake Gate".to_string()),
            start_time: Some("2026-11-02 09:00".to_string()),
            end_time: Some("2026-11-02 12:00".to_string()),
            cover_image: Some("http://10.0.0.5:9000/covers/cleanup.png".to_string()),
            status: Some("open".to_string()),
        });
        store.activities.push(Activity {
            id: 2,
            title: "Library Volunteer Orientation".to_string(),
            description: None,
            location: Some("Main Library 3F".to_string()),
            start_time: Some("2026-11-05 14:00".to_string()),
            end_time: Some("2026-11-05 15:30".to_string()),
            cover_image: None,
            status: Some("closed".to_string()),
        });
        store.issue_token(1);
        store.issue_token(2);
        store
    }

    /// Mint a fresh check-in token for an activity.
    pub fn issue_token(&mut self, activity_id: i64) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), activity_id);
        token
    }

    /// Any token currently valid for `activity_id`.
    pub fn token_for(&self, activity_id: i64) -> Option<String> {
        self.tokens
            .iter()
            .find(|(_, id)| **id == activity_id)
            .map(|(token, _)| token.clone())
    }

    fn activity(&self, id: i64) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    fn active_registration_mut(&mut self, activity_id: i64, phone: &str) -> Option<&mut Registration> {
        self.registrations
            .iter_mut()
            .find(|r| r.activity_id == activity_id && r.phone == phone && r.status != CANCELLED)
    }

    fn check_in(&mut self, activity_id: i64, phone: &str) -> Envelope {
        let Some(registration) = self.active_registration_mut(activity_id, phone) else {
            return Envelope::fail(404, "Registration not found");
        };
        if registration.checked_in {
            return Envelope::fail(400, "Already checked in");
        }
        registration.checked_in = true;
        tracing::info!(registration_id = registration.id, activity_id, "checked in");
        Envelope::ok(registration.clone())
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn seeded_db() -> Db {
    Arc::new(RwLock::new(Store::seeded()))
}

pub fn app() -> Router {
    router(seeded_db())
}

/// Routes are served at the root and again under `/api`, standing in for
/// the development proxy that strips that prefix.
pub fn router(db: Db) -> Router {
    let routes = routes();
    Router::new()
        .nest("/api", routes.clone())
        .merge(routes)
        .with_state(db)
}

fn routes() -> Router<Db> {
    Router::new()
        .route("/public/activities", get(list_activities))
        .route("/public/activities/{id}", get(activity_detail))
        .route("/registration/register", post(register))
        .route("/registration/cancel/{id}", post(cancel_registration))
        .route("/registration/checkin", post(check_in))
        .route("/registration/list", get(list_registrations))
        .route("/registration/student", get(student_records))
        .route("/h5/checkin/validate", get(validate_token))
        .route("/h5/checkin", post(check_in_by_token))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, seeded_db()).await
}

pub async fn run_with(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, router(db)).await
}

async fn list_activities(
    State(db): State<Db>,
    Query(filter): Query<ActivityFilter>,
) -> Json<Envelope> {
    let store = db.read().await;
    let activities: Vec<&Activity> = store
        .activities
        .iter()
        .filter(|a| filter.keyword.as_ref().map_or(true, |k| a.title.contains(k.as_str())))
        .filter(|a| filter.status.is_none() || a.status == filter.status)
        .collect();
    Json(Envelope::ok(activities))
}

async fn activity_detail(State(db): State<Db>, Path(id): Path<i64>) -> Json<Envelope> {
    let store = db.read().await;
    Json(match store.activity(id) {
        Some(activity) => Envelope::ok(activity),
        None => Envelope::fail(404, "Activity not found"),
    })
}

async fn register(State(db): State<Db>, Json(input): Json<RegisterInput>) -> Json<Envelope> {
    if input.student_name.trim().is_empty() || input.phone.trim().is_empty() {
        return Json(Envelope::fail(400, "studentName and phone are required"));
    }
    let mut store = db.write().await;
    let Some(title) = store.activity(input.activity_id).map(|a| a.title.clone()) else {
        return Json(Envelope::fail(404, "Activity not found"));
    };
    if store
        .active_registration_mut(input.activity_id, &input.phone)
        .is_some()
    {
        return Json(Envelope::fail(409, "Already registered for this activity"));
    }
    let registration = Registration {
        id: store.next_registration_id,
        activity_id: input.activity_id,
        activity_title: Some(title),
        student_name: input.student_name,
        phone: input.phone,
        student_no: input.student_no,
        status: REGISTERED.to_string(),
        checked_in: false,
    };
    store.next_registration_id += 1;
    store.registrations.push(registration.clone());
    tracing::info!(
        registration_id = registration.id,
        activity_id = registration.activity_id,
        remark = input.remark.as_deref().unwrap_or_default(),
        "registered"
    );
    Json(Envelope::ok(registration))
}

async fn cancel_registration(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer ") && v.len() > "Bearer ".len());
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(Envelope::fail(401, "Unauthorized")),
        )
            .into_response();
    }
    let mut store = db.write().await;
    let Some(registration) = store.registrations.iter_mut().find(|r| r.id == id) else {
        return Json(Envelope::fail(404, "Registration not found")).into_response();
    };
    if registration.status == CANCELLED {
        return Json(Envelope::fail(400, "Registration already cancelled")).into_response();
    }
    registration.status = CANCELLED.to_string();
    tracing::info!(registration_id = id, "cancelled");
    Json(Envelope::ok(registration.clone())).into_response()
}

async fn check_in(State(db): State<Db>, Json(input): Json<CheckInInput>) -> Json<Envelope> {
    let mut store = db.write().await;
    Json(store.check_in(input.activity_id, &input.phone))
}

async fn list_registrations(
    State(db): State<Db>,
    Query(filter): Query<RegistrationFilter>,
) -> Json<Envelope> {
    let store = db.read().await;
    let registrations: Vec<&Registration> = store
        .registrations
        .iter()
        .filter(|r| filter.phone.as_ref().map_or(true, |p| &r.phone == p))
        .filter(|r| filter.activity_id.map_or(true, |id| r.activity_id == id))
        .filter(|r| filter.status.as_ref().map_or(true, |s| &r.status == s))
        .collect();
    Json(Envelope::ok(registrations))
}

async fn student_records(
    State(db): State<Db>,
    Query(filter): Query<StudentFilter>,
) -> Json<Envelope> {
    let (Some(name), Some(phone)) = (filter.name, filter.phone) else {
        return Json(Envelope::fail(400, "name and phone are required"));
    };
    let store = db.read().await;
    let records: Vec<&Registration> = store
        .registrations
        .iter()
        .filter(|r| r.student_name == name && r.phone == phone)
        .collect();
    Json(Envelope::ok(records))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenInfo {
    activity_id: i64,
    activity_title: String,
}

async fn validate_token(State(db): State<Db>, Query(query): Query<TokenQuery>) -> Json<Envelope> {
    let store = db.read().await;
    let info = query
        .token
        .as_ref()
        .and_then(|t| store.tokens.get(t))
        .and_then(|id| store.activity(*id))
        .map(|a| TokenInfo {
            activity_id: a.id,
            activity_title: a.title.clone(),
        });
    Json(match info {
        Some(info) => Envelope::ok(info),
        None => Envelope::fail(400, "Invalid check-in token"),
    })
}

async fn check_in_by_token(
    State(db): State<Db>,
    Json(input): Json<TokenCheckInInput>,
) -> Json<Envelope> {
    let mut store = db.write().await;
    let Some(activity_id) = store.tokens.get(&input.token).copied() else {
        return Json(Envelope::fail(400, "Invalid check-in token"));
    };
    tracing::info!(student = %input.student_name, activity_id, "token check-in");
    Json(store.check_in(activity_id, &input.phone))
}
