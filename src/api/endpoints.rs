//! One method per backend operation.
//!
//! Each method issues exactly one request through [`HttpClient`] and hands the
//! classified error back untouched.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::client::{HttpClient, HttpRequest};
use super::error::{ApiError, ApiResult};
use crate::models::{DispenseRequest, Listing, Log, NewLog, Pill, RecordId, Reminder, User, UserInput};

/// Query filters for `GET /logs`, serialized in key order.
pub type LogFilters = BTreeMap<String, String>;

/// Outcome of [`MedTrackApi::test_connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct MedTrackApi {
    http: HttpClient,
}

impl MedTrackApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    // UID lookup

    /// The backend answers with a boolean-like body (`"true"` / `"false"`).
    pub async fn check_uid(&self, uid: &str) -> ApiResult<Value> {
        self.http.send(HttpRequest::get(format!("/check-uid/{}", segment(uid)))).await
    }

    // Reminders

    pub async fn get_reminders(&self, user_id: Option<&RecordId>) -> ApiResult<Listing<Reminder>> {
        let path = match user_id {
            Some(id) => format!("/reminders/{}", id_segment(id)),
            None => "/reminders".to_string(),
        };
        self.http.send_as(HttpRequest::get(path)).await
    }

    pub async fn create_reminder(&self, data: &impl Serialize) -> ApiResult<Value> {
        let request = HttpRequest::post("/reminders").with_json(to_body(data)?);
        self.http.send(request).await
    }

    pub async fn update_reminder(&self, id: &RecordId, data: &impl Serialize) -> ApiResult<Value> {
        let request = HttpRequest::put(format!("/reminders/{}", id_segment(id))).with_json(to_body(data)?);
        self.http.send(request).await
    }

    pub async fn delete_reminder(&self, id: &RecordId) -> ApiResult<Value> {
        self.http.send(HttpRequest::delete(format!("/reminders/{}", id_segment(id)))).await
    }

    // Users

    pub async fn get_users(&self) -> ApiResult<Listing<User>> {
        self.http.send_as(HttpRequest::get("/users")).await
    }

    pub async fn get_user(&self, id: &RecordId) -> ApiResult<User> {
        self.http.send_as(HttpRequest::get(format!("/users/{}", id_segment(id)))).await
    }

    pub async fn create_user(&self, data: &UserInput) -> ApiResult<Value> {
        let request = HttpRequest::post("/users").with_json(to_body(data)?);
        self.http.send(request).await
    }

    pub async fn update_user(&self, id: &RecordId, data: &impl Serialize) -> ApiResult<Value> {
        let request = HttpRequest::put(format!("/users/{}", id_segment(id))).with_json(to_body(data)?);
        self.http.send(request).await
    }

    pub async fn delete_user(&self, id: &RecordId) -> ApiResult<Value> {
        self.http.send(HttpRequest::delete(format!("/users/{}", id_segment(id)))).await
    }

    // Logs

    /// `None` and an empty map both request plain `/logs`.
    pub async fn get_logs(&self, filters: Option<&LogFilters>) -> ApiResult<Listing<Log>> {
        let mut request = HttpRequest::get("/logs");
        if let Some(filters) = filters {
            request = request.with_query(filters.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        self.http.send_as(request).await
    }

    pub async fn create_log(&self, data: &NewLog) -> ApiResult<Value> {
        let request = HttpRequest::post("/logs").with_json(to_body(data)?);
        self.http.send(request).await
    }

    pub async fn get_logs_by_user(&self, user_id: &RecordId) -> ApiResult<Listing<Log>> {
        self.http
            .send_as(HttpRequest::get(format!("/logs/user/{}", id_segment(user_id))))
            .await
    }

    // Pills

    pub async fn get_pills(&self) -> ApiResult<Listing<Pill>> {
        self.http.send_as(HttpRequest::get("/pills")).await
    }

    pub async fn get_pill(&self, id: &RecordId) -> ApiResult<Pill> {
        self.http.send_as(HttpRequest::get(format!("/pills/{}", id_segment(id)))).await
    }

    pub async fn create_pill(&self, data: &Pill) -> ApiResult<Value> {
        let request = HttpRequest::post("/pills").with_json(to_body(data)?);
        self.http.send(request).await
    }

    // Dispensing

    pub async fn dispense_pill(&self, data: &DispenseRequest) -> ApiResult<Value> {
        let request = HttpRequest::post("/dispense").with_json(to_body(data)?);
        self.http.send(request).await
    }

    // Health

    pub async fn health_check(&self) -> ApiResult<Value> {
        self.http.send(HttpRequest::get("/health")).await
    }

    /// Folds [`health_check`](Self::health_check) into a report; never errors.
    pub async fn test_connection(&self) -> ConnectionReport {
        match self.health_check().await {
            Ok(_) => ConnectionReport {
                success: true,
                message: "API connection successful".to_string(),
            },
            Err(e) => ConnectionReport {
                success: false,
                message: e.user_message(),
            },
        }
    }
}

fn to_body(data: &impl Serialize) -> ApiResult<Value> {
    serde_json::to_value(data)
        .map_err(|e| ApiError::Configuration(format!("could not encode request body: {}", e)))
}

fn id_segment(id: &RecordId) -> String {
    segment(&id.to_string())
}

/// Percent-encodes a single path segment.
fn segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    async fn api_for(server: &MockServer) -> MedTrackApi {
        let http = HttpClient::new(server.uri(), Duration::from_secs(2))
            .unwrap()
            .without_observers();
        MedTrackApi::new(http)
    }

    #[test]
    fn segments_are_percent_encoded() {
        assert_eq!(segment("04:A3 7F"), "04%3AA3%207F");
        assert_eq!(id_segment(&RecordId::Number(12)), "12");
    }

    #[tokio::test]
    async fn get_reminders_with_and_without_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reminders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "pill_name": "Aspirin", "time": "08:00"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/reminders/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let all = api.get_reminders(None).await.unwrap().into_vec();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].display_name(), "Aspirin");

        let mine = api.get_reminders(Some(&RecordId::Number(7))).await.unwrap();
        assert!(mine.0.is_empty());
    }

    #[tokio::test]
    async fn get_logs_serializes_filters_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs"))
            .and(query_param("user_id", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let mut filters = LogFilters::new();
        filters.insert("user_id".to_string(), "3".to_string());
        filters.insert("device_id".to_string(), String::new());
        let logs = api.get_logs(Some(&filters)).await.unwrap();
        assert_eq!(logs.0.len(), 1);

        let received = server.received_requests().await.unwrap();
        assert_eq!(received[0].url.query(), Some("user_id=3"));
    }

    #[tokio::test]
    async fn get_logs_without_filters_has_no_query_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        api.get_logs(None).await.unwrap();
        api.get_logs(Some(&LogFilters::new())).await.unwrap();

        let received: Vec<Request> = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 2);
        assert!(received.iter().all(|r| r.url.query().is_none()));
    }

    #[tokio::test]
    async fn create_user_posts_the_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .and(body_json(json!({
                "username": "bob",
                "email": "bob@x.com",
                "password": "Abcdef1"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let body = api
            .create_user(&UserInput::new("bob", "bob@x.com", "Abcdef1"))
            .await
            .unwrap();
        assert_eq!(body, json!({"id": 5}));
    }

    #[tokio::test]
    async fn mutations_use_expected_methods_and_paths() {
        let server = MockServer::start().await;
        for (verb, route) in [
            ("PUT", "/reminders/2"),
            ("DELETE", "/reminders/2"),
            ("PUT", "/users/3"),
            ("DELETE", "/users/3"),
            ("POST", "/reminders"),
            ("POST", "/logs"),
            ("POST", "/pills"),
            ("POST", "/dispense"),
        ] {
            Mock::given(method(verb))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
                .expect(1)
                .mount(&server)
                .await;
        }

        let api = api_for(&server).await;
        let reminder = Reminder {
            pill_name: Some("Aspirin".to_string()),
            time: Some("08:00".to_string()),
            ..Default::default()
        };
        api.update_reminder(&RecordId::Number(2), &reminder).await.unwrap();
        api.delete_reminder(&RecordId::Number(2)).await.unwrap();
        api.update_user(&RecordId::Number(3), &json!({"email": "new@x.com"})).await.unwrap();
        api.delete_user(&RecordId::Number(3)).await.unwrap();
        api.create_reminder(&reminder).await.unwrap();
        api.create_log(&NewLog {
            user_uid: "04A3".to_string(),
            pill_dispensed: true,
            device_id: "dispenser-1".to_string(),
        })
        .await
        .unwrap();
        api.create_pill(&Pill {
            name: Some("Aspirin".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        api.dispense_pill(&DispenseRequest {
            user_id: RecordId::Number(3),
            pill_id: None,
            device_id: Some("dispenser-1".to_string()),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn typed_reads_decode_records() {
        let server = MockServer::start().await;
        Mock::given(path("/users/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 3, "username": "bob", "email": "bob@x.com", "rfid_uid": "04A3"
            })))
            .mount(&server)
            .await;
        Mock::given(path("/pills"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "Aspirin", "color": "white"}
            ])))
            .mount(&server)
            .await;
        Mock::given(path("/pills/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "Aspirin"})))
            .mount(&server)
            .await;
        Mock::given(path("/logs/user/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 9, "user_id": 3, "pill_dispensed": true}
            ])))
            .mount(&server)
            .await;
        Mock::given(path("/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": []})))
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let user = api.get_user(&RecordId::Number(3)).await.unwrap();
        assert_eq!(user.username.as_deref(), Some("bob"));

        let pills = api.get_pills().await.unwrap().into_vec();
        assert_eq!(pills[0].extra.get("color"), Some(&json!("white")));
        assert_eq!(api.get_pill(&RecordId::Number(1)).await.unwrap().name.as_deref(), Some("Aspirin"));

        let logs = api.get_logs_by_user(&RecordId::Number(3)).await.unwrap().into_vec();
        assert_eq!(logs[0].id, Some(RecordId::Number(9)));

        // Object bodies on list endpoints coerce to empty lists.
        assert!(api.get_users().await.unwrap().0.is_empty());
    }

    #[tokio::test]
    async fn errors_propagate_unchanged() {
        let server = MockServer::start().await;
        Mock::given(path("/check-uid/ABC"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/users"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad"))
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        assert!(matches!(api.check_uid("ABC").await, Err(ApiError::NotFound { .. })));
        match api.create_user(&UserInput::default()).await {
            Err(ApiError::Http { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_reports_instead_of_failing() {
        let server = MockServer::start().await;
        Mock::given(path("/health"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let first = api.test_connection().await;
        assert!(!first.success);
        assert_eq!(first.message, "Server error. Please try again later.");

        let second = api.test_connection().await;
        assert_eq!(
            second,
            ConnectionReport {
                success: true,
                message: "API connection successful".to_string()
            }
        );
    }
}
