//! Request builders and the student-facing API client.
//!
//! # Design
//! Each backend operation has a free `build_*` function that produces a
//! relative `HttpRequest` without touching the network, so routes can be
//! checked in isolation. `StudentClient` pairs a `Pipeline` with a
//! `Transport` and runs each built request through both. Every call resolves
//! with the whole envelope; use `Envelope::into_data` for typed payloads.

use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::pipeline::Pipeline;
use crate::transport::Transport;
use crate::types::{
    ActivityQuery, CheckInForm, RegistrationForm, RegistrationQuery, StudentRecordQuery,
    TokenCheckIn,
};

pub fn build_list_activities(query: &ActivityQuery) -> Result<HttpRequest, ApiError> {
    HttpRequest::get("/public/activities").with_query(query)
}

pub fn build_activity_detail(activity_id: i64) -> HttpRequest {
    HttpRequest::get(format!("/public/activities/{activity_id}"))
}

pub fn build_register_activity(form: &RegistrationForm) -> Result<HttpRequest, ApiError> {
    HttpRequest::post("/registration/register").with_json(form)
}

pub fn build_cancel_registration(registration_id: i64) -> HttpRequest {
    HttpRequest::post(format!("/registration/cancel/{registration_id}"))
}

pub fn build_check_in(form: &CheckInForm) -> Result<HttpRequest, ApiError> {
    HttpRequest::post("/registration/checkin").with_json(form)
}

pub fn build_my_registrations(query: &RegistrationQuery) -> Result<HttpRequest, ApiError> {
    HttpRequest::get("/registration/list").with_query(query)
}

pub fn build_student_registration_records(
    query: &StudentRecordQuery,
) -> Result<HttpRequest, ApiError> {
    HttpRequest::get("/registration/student").with_query(query)
}

pub fn build_validate_check_in_token(token: &str) -> HttpRequest {
    let mut request = HttpRequest::get("/h5/checkin/validate");
    request.query.push(("token".to_string(), token.to_string()));
    request
}

pub fn build_check_in_by_token(payload: &TokenCheckIn) -> Result<HttpRequest, ApiError> {
    HttpRequest::post("/h5/checkin").with_json(payload)
}

/// API wrappers over a pipeline and a transport.
#[derive(Debug, Clone)]
pub struct StudentClient<T> {
    pipeline: Pipeline,
    transport: T,
}

impl<T: Transport> StudentClient<T> {
    pub fn new(pipeline: Pipeline, transport: T) -> Self {
        Self {
            pipeline,
            transport,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn call(&self, request: HttpRequest) -> Result<Envelope, ApiError> {
        self.pipeline.execute(&self.transport, request)
    }

    pub fn list_activities(&self, query: &ActivityQuery) -> Result<Envelope, ApiError> {
        self.call(build_list_activities(query)?)
    }

    pub fn activity_detail(&self, activity_id: i64) -> Result<Envelope, ApiError> {
        self.call(build_activity_detail(activity_id))
    }

    pub fn register_activity(&self, form: &RegistrationForm) -> Result<Envelope, ApiError> {
        self.call(build_register_activity(form)?)
    }

    pub fn cancel_registration(&self, registration_id: i64) -> Result<Envelope, ApiError> {
        self.call(build_cancel_registration(registration_id))
    }

    pub fn check_in(&self, form: &CheckInForm) -> Result<Envelope, ApiError> {
        self.call(build_check_in(form)?)
    }

    /// Registrations from the generic list endpoint. When `query.phone` is
    /// set, entries for any other phone are dropped from `data` even if the
    /// backend ignored the parameter.
    pub fn my_registrations(&self, query: &RegistrationQuery) -> Result<Envelope, ApiError> {
        let mut envelope = self.call(build_my_registrations(query)?)?;
        if let (Some(phone), Value::Array(entries)) = (&query.phone, &mut envelope.data) {
            entries.retain(|entry| {
                entry.get("phone").and_then(Value::as_str) == Some(phone.as_str())
            });
        }
        Ok(envelope)
    }

    pub fn student_registration_records(
        &self,
        query: &StudentRecordQuery,
    ) -> Result<Envelope, ApiError> {
        self.call(build_student_registration_records(query)?)
    }

    pub fn validate_check_in_token(&self, token: &str) -> Result<Envelope, ApiError> {
        self.call(build_validate_check_in_token(token))
    }

    pub fn check_in_by_token(&self, payload: &TokenCheckIn) -> Result<Envelope, ApiError> {
        self.call(build_check_in_by_token(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::env::{Environment, MemoryCredentials, RecordingNotifier, StaticHost};
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpResponse};
    use parking_lot::Mutex;

    /// Replays one canned response and remembers what was sent.
    struct Canned {
        status: u16,
        body: String,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl Canned {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl Transport for Canned {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.sent.lock().push(request.clone());
            Ok(HttpResponse {
                status: self.status,
                headers: Vec::new(),
                body: self.body.clone(),
            })
        }
    }

    fn client(transport: Canned) -> (StudentClient<Canned>, RecordingNotifier) {
        let notifier = RecordingNotifier::new();
        let credentials = MemoryCredentials::new();
        credentials.set("student_token", "abc123");
        let env = Environment::new(StaticHost::new("192.168.1.5"), credentials, notifier.clone());
        let pipeline = Pipeline::new(PipelineConfig::default(), env);
        (StudentClient::new(pipeline, transport), notifier)
    }

    #[test]
    fn build_list_activities_produces_correct_request() {
        let query = ActivityQuery {
            keyword: Some("volunteer".to_string()),
            page_num: Some(1),
            ..Default::default()
        };
        let req = build_list_activities(&query).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "/public/activities");
        assert_eq!(req.url(), "/public/activities?keyword=volunteer&pageNum=1");
        assert!(req.body.is_none());
    }

    #[test]
    fn build_activity_detail_produces_correct_request() {
        let req = build_activity_detail(42);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "/public/activities/42");
        assert!(req.query.is_empty());
    }

    #[test]
    fn build_register_activity_produces_correct_request() {
        let form = RegistrationForm {
            activity_id: 3,
            student_name: "Li Hua".to_string(),
            phone: "13800000000".to_string(),
            student_no: None,
            remark: None,
        };
        let req = build_register_activity(&form).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "/registration/register");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["activityId"], 3);
        assert_eq!(body["studentName"], "Li Hua");
        assert!(body.get("remark").is_none());
    }

    #[test]
    fn build_cancel_registration_has_no_body() {
        let req = build_cancel_registration(17);
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "/registration/cancel/17");
        assert!(req.body.is_none());
    }

    #[test]
    fn build_validate_check_in_token_encodes_token() {
        let req = build_validate_check_in_token("a b&c");
        assert_eq!(req.url(), "/h5/checkin/validate?token=a+b%26c");
    }

    #[test]
    fn build_student_records_sends_name_and_phone() {
        let query = StudentRecordQuery {
            name: "Li Hua".to_string(),
            phone: "13800000000".to_string(),
        };
        let req = build_student_registration_records(&query).unwrap();
        assert_eq!(req.path, "/registration/student");
        assert_eq!(
            req.query,
            vec![
                ("name".to_string(), "Li Hua".to_string()),
                ("phone".to_string(), "13800000000".to_string()),
            ]
        );
    }

    #[test]
    fn client_call_goes_through_pipeline() {
        let (client, notifier) = client(Canned::new(200, r#"{"code":200,"message":"ok","data":[]}"#));
        let envelope = client
            .my_registrations(&RegistrationQuery {
                phone: Some("13800000000".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(envelope.is_success());
        assert!(notifier.messages().is_empty());

        let sent = client.transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].url(),
            "http://192.168.1.5:8080/registration/list?phone=13800000000"
        );
        assert_eq!(sent[0].header("Authorization"), Some("Bearer abc123"));
    }

    #[test]
    fn client_logical_failure_is_notified() {
        let (client, notifier) =
            client(Canned::new(200, r#"{"code":400,"message":"Invalid check-in token"}"#));
        let err = client.validate_check_in_token("stale").unwrap_err();
        assert!(matches!(err, ApiError::Logical { code: Some(400), .. }));
        assert_eq!(notifier.messages(), vec!["Invalid check-in token"]);
    }

    #[test]
    fn my_registrations_keeps_only_the_queried_phone() {
        let body = r#"{"code":200,"message":"ok","data":[
            {"id":1,"activityId":1,"studentName":"Li Hua","phone":"13800000000","status":"registered","checkedIn":false},
            {"id":2,"activityId":1,"studentName":"Wang Fang","phone":"13900000000","status":"registered","checkedIn":false}
        ]}"#;
        let (client, notifier) = client(Canned::new(200, body));
        let envelope = client
            .my_registrations(&RegistrationQuery {
                phone: Some("13800000000".to_string()),
                ..Default::default()
            })
            .unwrap();
        let entries = envelope.data.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["id"], 1);
        assert!(notifier.messages().is_empty());

        // Without a phone the reply is passed through.
        let envelope = client.my_registrations(&RegistrationQuery::default()).unwrap();
        assert_eq!(envelope.data.as_array().unwrap().len(), 2);
    }
}
