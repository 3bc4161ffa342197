//! [`Remote`] over the tudu REST API.
//!
//! Lists live under `/api/lists`, list items under `/api/items`, and
//! standalone todos under `/api/todos`. The session cookie is passed through
//! verbatim from the environment.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use tudu_core::config::RemoteConfig;
use tudu_core::model::{Container, ContainerFields, Member, MemberFields, MemberRef};
use tudu_core::sync::{Remote, RemoteError};

pub struct HttpRemote {
    agent: ureq::Agent,
    base_url: String,
    cookie: Option<String>,
}

impl HttpRemote {
    /// Build from project config. `None` when no server is configured.
    pub fn from_config(config: &RemoteConfig) -> Option<Self> {
        let base_url = config.base_url.as_deref()?;
        let cookie = std::env::var(&config.session_env)
            .ok()
            .filter(|value| !value.trim().is_empty());
        Some(Self::new(base_url, config.timeout(), cookie))
    }

    pub fn new(base_url: &str, timeout: Duration, cookie: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{path}", self.base_url);
        trace!(%method, %url, "request");
        let request = self
            .agent
            .request(method, &url)
            .set("Accept", "application/json");
        match &self.cookie {
            Some(cookie) => request.set("Cookie", cookie),
            None => request,
        }
    }
}

fn fetch<T: DeserializeOwned>(request: ureq::Request) -> Result<T, RemoteError> {
    let response = request.call().map_err(map_error)?;
    decode(response)
}

fn send<T: DeserializeOwned>(
    request: ureq::Request,
    body: &impl Serialize,
) -> Result<T, RemoteError> {
    let response = request.send_json(body).map_err(map_error)?;
    decode(response)
}

fn remove(request: ureq::Request) -> Result<(), RemoteError> {
    request.call().map(drop).map_err(map_error)
}

fn member_path(target: MemberRef<'_>) -> String {
    match target.container_id {
        Some(_) => format!("/api/items/{}", target.id),
        None => format!("/api/todos/{}", target.id),
    }
}

fn decode<T: DeserializeOwned>(response: ureq::Response) -> Result<T, RemoteError> {
    response
        .into_json::<T>()
        .map_err(|err| RemoteError::Decode(err.to_string()))
}

/// Translate a ureq failure into the sync error taxonomy.
fn map_error(err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, response) => match status {
            401 => RemoteError::Unauthorized,
            403 => RemoteError::Forbidden,
            404 => RemoteError::NotFound,
            _ => RemoteError::Rejected {
                status,
                message: error_message(response),
            },
        },
        ureq::Error::Transport(transport) => RemoteError::Network(transport.to_string()),
    }
}

/// The server answers errors as `{"error": "..."}`; fall back to the raw body.
fn error_message(response: ureq::Response) -> String {
    let status_text = response.status_text().to_string();
    let body = response.into_string().unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or(status_text)
}

impl Remote for HttpRemote {
    fn create_container(&mut self, title: &str) -> Result<Container, RemoteError> {
        send(
            self.request("POST", "/api/lists"),
            &serde_json::json!({ "title": title }),
        )
    }

    fn update_container(
        &mut self,
        id: &str,
        fields: &ContainerFields,
    ) -> Result<Container, RemoteError> {
        send(self.request("PATCH", &format!("/api/lists/{id}")), fields)
    }

    fn delete_container(&mut self, id: &str) -> Result<(), RemoteError> {
        remove(self.request("DELETE", &format!("/api/lists/{id}")))
    }

    fn create_member(
        &mut self,
        container_id: Option<&str>,
        title: &str,
    ) -> Result<Member, RemoteError> {
        match container_id {
            Some(list_id) => send(
                self.request("POST", "/api/items"),
                &serde_json::json!({ "title": title, "listId": list_id }),
            ),
            None => send(
                self.request("POST", "/api/todos"),
                &serde_json::json!({ "title": title }),
            ),
        }
    }

    fn update_member(
        &mut self,
        target: MemberRef<'_>,
        fields: &MemberFields,
    ) -> Result<Member, RemoteError> {
        send(self.request("PATCH", &member_path(target)), fields)
    }

    fn delete_member(&mut self, target: MemberRef<'_>) -> Result<(), RemoteError> {
        remove(self.request("DELETE", &member_path(target)))
    }

    fn list_containers(&mut self) -> Result<Vec<Container>, RemoteError> {
        fetch(self.request("GET", "/api/lists"))
    }

    fn list_members(&mut self, container_id: Option<&str>) -> Result<Vec<Member>, RemoteError> {
        match container_id {
            Some(list_id) => {
                let mut members: Vec<Member> =
                    fetch(self.request("GET", "/api/items").query("listId", list_id))?;
                // Item records may omit the owning list.
                for member in &mut members {
                    member.container_id.get_or_insert_with(|| list_id.to_string());
                }
                Ok(members)
            }
            None => {
                let mut todos: Vec<Member> = fetch(self.request("GET", "/api/todos"))?;
                for todo in &mut todos {
                    todo.container_id = None;
                }
                Ok(todos)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16, body: &str) -> ureq::Error {
        let response = ureq::Response::new(code, "Status", body).unwrap();
        ureq::Error::Status(code, response)
    }

    #[test]
    fn auth_statuses_map_to_dedicated_errors() {
        assert_eq!(map_error(status(401, "")), RemoteError::Unauthorized);
        assert_eq!(
            map_error(status(403, "{\"error\":\"forbidden\"}")),
            RemoteError::Forbidden
        );
        assert_eq!(map_error(status(404, "")), RemoteError::NotFound);
    }

    #[test]
    fn other_statuses_keep_server_message() {
        assert_eq!(
            map_error(status(400, "{\"error\":\"title required\"}")),
            RemoteError::Rejected {
                status: 400,
                message: "title required".into(),
            }
        );
        assert_eq!(
            map_error(status(502, "bad gateway")),
            RemoteError::Rejected {
                status: 502,
                message: "bad gateway".into(),
            }
        );
    }

    #[test]
    fn empty_error_body_falls_back_to_status_text() {
        let err = map_error(status(500, ""));
        assert_eq!(
            err,
            RemoteError::Rejected {
                status: 500,
                message: "Status".into(),
            }
        );
    }

    #[test]
    fn undecodable_body_is_a_decode_error() {
        let response = ureq::Response::new(200, "OK", "<html>").unwrap();
        let err = decode::<Container>(response).unwrap_err();
        assert!(matches!(err, RemoteError::Decode(_)));
    }

    #[test]
    fn server_list_record_decodes_clean() {
        let body = r#"{"id":"ck1","userId":"u1","title":"Groceries","posX":2.0,"posZ":0,"createdAt":"2024-01-01T00:00:00.000Z"}"#;
        let response = ureq::Response::new(200, "OK", body).unwrap();
        let list: Container = decode(response).unwrap();
        assert_eq!(list.id, "ck1");
        assert!((list.position_x - 2.0).abs() < f64::EPSILON);
        assert!(!list.sync.is_pending());
    }

    #[test]
    fn todo_record_without_sort_order_decodes() {
        let body = r#"{"id":"t1","userId":"u1","title":"Call mom","completed":false,"pile":0}"#;
        let response = ureq::Response::new(200, "OK", body).unwrap();
        let todo: Member = decode(response).unwrap();
        assert!(todo.is_standalone());
        assert_eq!(todo.sort_order, 0);
    }

    #[test]
    fn member_routes_follow_ownership() {
        let item = MemberRef {
            id: "srv-2",
            container_id: Some("srv-1"),
        };
        let todo = MemberRef {
            id: "srv-3",
            container_id: None,
        };
        assert_eq!(member_path(item), "/api/items/srv-2");
        assert_eq!(member_path(todo), "/api/todos/srv-3");
    }

    #[test]
    fn base_url_is_normalized() {
        let remote = HttpRemote::new("http://localhost:3000/", Duration::from_secs(1), None);
        assert_eq!(remote.base_url(), "http://localhost:3000");
    }

    #[test]
    fn missing_base_url_means_no_remote() {
        assert!(HttpRemote::from_config(&RemoteConfig::default()).is_none());
    }

    #[test]
    fn unreachable_server_is_a_network_error() {
        let mut remote =
            HttpRemote::new("http://127.0.0.1:9", Duration::from_millis(500), None);
        let err = remote.list_containers().unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));
    }
}
