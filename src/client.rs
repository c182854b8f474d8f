//! Async client for the TaMM backend.
//!
//! Every endpoint except the task filter answers with the same envelope
//! (`JsonResult`). A result other than `"ok"` becomes
//! `ClientError::Rejected` carrying the backend's free-text message, which
//! the pages show as the status line.

use reqwest::{header, multipart, Client, Method, RequestBuilder, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::attachment::Attachment;
use crate::directory::{KeyValue, KeyValueList};
use crate::task::Task;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { message: String },

    #[error("Backend response carried no data")]
    MissingData,

    #[error("Invalid next page: {0}")]
    InvalidPage(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonResult<T> {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub next_page: String,
    pub data: Option<T>,
}

impl<T> JsonResult<T> {
    pub fn is_ok(&self) -> bool {
        self.result == "ok"
    }

    fn into_data(self) -> Result<T, ClientError> {
        self.data.ok_or(ClientError::MissingData)
    }
}

/// A file forwarded to `POST upload`.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveUrlRequest<'a> {
    task_id: &'a str,
    file_name: &'a str,
    url: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    name: &'a str,
    pwd: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FilterRequest<'a> {
    filter_text: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SessionInfo {
    #[serde(default)]
    user_names: Vec<KeyValue>,
    #[serde(default)]
    role_names: Vec<KeyValue>,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str, session_cookie: Option<String>) -> Result<Self, ClientError> {
        let http = Client::builder().cookie_store(true).build()?;
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            http,
            base_url,
            session_cookie,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.session_cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<JsonResult<T>, ClientError> {
        let response = builder.send().await?.error_for_status()?;
        let result: JsonResult<T> = response.json().await?;
        if !result.is_ok() {
            warn!(call = what, message = %result.message, "backend rejected request");
            return Err(ClientError::Rejected {
                message: result.message,
            });
        }
        debug!(call = what, "backend call ok");
        Ok(result)
    }

    /// Log in at the backend. The session cookie it sets stays in the
    /// client's cookie store for the following calls.
    pub async fn login(&self, name: &str, password: &str) -> Result<(), ClientError> {
        let _: JsonResult<IgnoredAny> = self
            .send(
                self.request(Method::POST, "system/login")
                    .json(&LoginRequest { name, pwd: password }),
                "login",
            )
            .await?;
        Ok(())
    }

    /// End the backend session. Returns the page to continue with,
    /// `nextPage?next=<next>`.
    pub async fn logout(&self, next: &str) -> Result<String, ClientError> {
        let result: JsonResult<IgnoredAny> = self
            .send(self.request(Method::GET, "system/logout"), "logout")
            .await?;

        let page = if result.next_page.contains("://") {
            result.next_page
        } else {
            self.url(&result.next_page)
        };
        let mut target = Url::parse(&page).map_err(|e| ClientError::InvalidPage(e.to_string()))?;
        target.query_pairs_mut().append_pair("next", next);
        Ok(target.into())
    }

    /// Owner directory of the logged in client: users first, then roles.
    pub async fn fetch_directory(&self) -> Result<KeyValueList, ClientError> {
        let session: SessionInfo = self
            .send(self.request(Method::GET, "system/session"), "session")
            .await?
            .data
            .unwrap_or_default();

        Ok(session
            .user_names
            .into_iter()
            .chain(session.role_names)
            .collect())
    }

    pub async fn list_tasks(&self, filter: &str) -> Result<Vec<Task>, ClientError> {
        let tasks = self
            .request(Method::POST, "system/filtertask")
            .json(&FilterRequest { filter_text: filter })
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Task>>()
            .await?;
        debug!(filter, count = tasks.len(), "tasks listed");
        Ok(tasks)
    }

    /// Look a task up in the unfiltered list. The backend has no single
    /// task endpoint.
    pub async fn find_task(&self, task_id: &str) -> Result<Option<Task>, ClientError> {
        Ok(self
            .list_tasks("")
            .await?
            .into_iter()
            .find(|task| task.id == task_id))
    }

    /// Store a task. Returns the id the backend assigned or kept.
    pub async fn save_task(&self, task: &Task) -> Result<String, ClientError> {
        self.send::<String>(
            self.request(Method::POST, "system/savetask").json(task),
            "savetask",
        )
        .await?
        .into_data()
    }

    pub async fn remove_task(&self, task_id: &str) -> Result<(), ClientError> {
        self.send::<IgnoredAny>(
            self.request(Method::DELETE, &format!("system/removetask/{task_id}")),
            "removetask",
        )
        .await?;
        Ok(())
    }

    /// Completed occurrences of a task, newest first as the backend sends them.
    pub async fn task_history(&self, task_id: &str) -> Result<Vec<Task>, ClientError> {
        Ok(self
            .send::<Vec<Task>>(
                self.request(Method::GET, &format!("system/taskhistory/{task_id}")),
                "taskhistory",
            )
            .await?
            .data
            .unwrap_or_default())
    }

    pub async fn list_attachments(&self, task_id: &str) -> Result<Vec<Attachment>, ClientError> {
        Ok(self
            .send::<Vec<Attachment>>(
                self.request(Method::GET, &format!("system/attachments/{task_id}")),
                "attachments",
            )
            .await?
            .data
            .unwrap_or_default())
    }

    pub async fn delete_attachment(&self, guid: &str) -> Result<(), ClientError> {
        self.send::<IgnoredAny>(
            self.request(Method::DELETE, &format!("upload/{guid}")),
            "delete upload",
        )
        .await?;
        Ok(())
    }

    /// Store a URL attachment. Returns the new attachment's guid.
    pub async fn save_url(&self, task_id: &str, file_name: &str, url: &str) -> Result<String, ClientError> {
        let result: JsonResult<IgnoredAny> = self
            .send(
                self.request(Method::POST, "system/saveurl").json(&SaveUrlRequest {
                    task_id,
                    file_name,
                    url,
                }),
                "saveurl",
            )
            .await?;
        Ok(result.message)
    }

    /// Upload files for a task. The returned guids line up with `files`.
    pub async fn upload(&self, task_id: &str, files: Vec<UploadFile>) -> Result<Vec<String>, ClientError> {
        let mut form = multipart::Form::new().text("taskid", task_id.to_string());
        for file in files {
            let part = multipart::Part::bytes(file.content).file_name(file.file_name);
            form = form.part("file", part);
        }

        self.send::<Vec<String>>(self.request(Method::POST, "upload").multipart(form), "upload")
            .await?
            .into_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_backend;
    use crate::interval::Interval;

    #[tokio::test]
    async fn test_logout_builds_next_page() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();

        let target = client.logout("task.html").await.unwrap();

        assert_eq!(target, format!("{}login.html?next=task.html", backend.base_url));
    }

    #[test]
    fn test_envelope_data_needs_no_default() {
        #[derive(Deserialize)]
        struct Receipt {
            guid: String,
        }

        let missing: JsonResult<Receipt> =
            serde_json::from_str(r#"{"result": "ok", "message": "saved"}"#).unwrap();
        assert!(missing.data.is_none());
        assert!(matches!(missing.into_data(), Err(ClientError::MissingData)));

        let present: JsonResult<Receipt> =
            serde_json::from_str(r#"{"result": "ok", "data": {"guid": "g9"}}"#).unwrap();
        assert_eq!(present.into_data().unwrap().guid, "g9");
    }

    #[tokio::test]
    async fn test_login() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();

        client.login("anna", fake_backend::PASSWORD).await.unwrap();

        assert_eq!(backend.calls(), vec!["POST system/login anna"]);
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_rejected() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();

        let err = client.login("anna", "guess").await.unwrap_err();

        assert!(matches!(err, ClientError::Rejected { .. }));
        assert_eq!(err.to_string(), "Unbekannter Benutzer oder falsches Passwort.");
    }

    #[tokio::test]
    async fn test_logout_encodes_next() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();

        let target = client.logout("a\nb&c").await.unwrap();

        assert_eq!(target, format!("{}login.html?next=a%0Ab%26c", backend.base_url));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = BackendClient::new("http://localhost:8080/tamm", None).unwrap();
        assert_eq!(client.url("upload"), "http://localhost:8080/tamm/upload");
    }

    #[tokio::test]
    async fn test_fetch_directory_users_then_roles() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();

        let directory = client.fetch_directory().await.unwrap();

        let names: Vec<&str> = directory.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Anna", "Bernd", "Hausmeister"]);
    }

    #[tokio::test]
    async fn test_list_and_find_tasks() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();

        let all = client.list_tasks("").await.unwrap();
        let filtered = client.list_tasks("mow").await.unwrap();
        let found = client.find_task("14").await.unwrap();
        let missing = client.find_task("99").await.unwrap();

        assert_eq!(all.len(), 3);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Mow lawn");
        assert_eq!(found.map(|task| task.name), Some("Tax return".to_string()));
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_save_new_task_returns_assigned_id() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();
        let mut task = Task::draft().with_interval(&Interval::decode(Some("daily|1|2023-06-01")));
        task.name = "Water plants".to_string();

        let id = client.save_task(&task).await.unwrap();

        assert_eq!(id, "77");
        assert_eq!(
            backend.calls(),
            vec!["POST system/savetask -1 Water plants daily|1|2023-06-01"]
        );
    }

    #[tokio::test]
    async fn test_rejected_remove_carries_message() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();

        let error = client.remove_task(fake_backend::FORBIDDEN_TASK).await.unwrap_err();

        assert!(matches!(error, ClientError::Rejected { .. }));
        assert_eq!(error.to_string(), "Keine Berechtigung.");
    }

    #[tokio::test]
    async fn test_remove_task() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();

        client.remove_task("12").await.unwrap();

        assert_eq!(backend.calls(), vec!["DELETE system/removetask/12"]);
    }

    #[tokio::test]
    async fn test_attachments() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();

        let attachments = client.list_attachments("12").await.unwrap();
        let none = client.list_attachments("13").await.unwrap();

        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].href(), "upload/g1/manual.pdf");
        assert_eq!(attachments[1].href(), "https://example.org/vendor");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_delete_attachment() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();

        client.delete_attachment("g1").await.unwrap();

        assert_eq!(backend.calls(), vec!["DELETE upload/g1"]);
    }

    #[tokio::test]
    async fn test_save_url_returns_guid() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();

        let guid = client
            .save_url("12", "Vendor page", "https://example.org/vendor")
            .await
            .unwrap();

        assert_eq!(guid, "url-guid-1");
        assert_eq!(
            backend.calls(),
            vec!["POST system/saveurl 12 Vendor page https://example.org/vendor"]
        );
    }

    #[tokio::test]
    async fn test_upload_returns_guid_per_file() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();
        let files = vec![
            UploadFile {
                file_name: "a.txt".to_string(),
                content: b"first".to_vec(),
            },
            UploadFile {
                file_name: "b.txt".to_string(),
                content: b"second".to_vec(),
            },
        ];

        let guids = client.upload("12", files).await.unwrap();

        assert_eq!(guids, vec!["guid-a.txt", "guid-b.txt"]);
        assert_eq!(backend.calls(), vec!["POST upload 12 a.txt,b.txt"]);
    }

    #[tokio::test]
    async fn test_task_history() {
        let backend = fake_backend::spawn().await;
        let client = BackendClient::new(&backend.base_url, None).unwrap();

        let history = client.task_history("12").await.unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].next_due_date, "2023-02-20");
    }

    #[tokio::test]
    async fn test_session_cookie_is_forwarded() {
        let backend = fake_backend::spawn().await;
        let client =
            BackendClient::new(&backend.base_url, Some("JSESSIONID=abc".to_string())).unwrap();

        client.delete_attachment("g2").await.unwrap();

        assert_eq!(backend.cookies(), vec!["JSESSIONID=abc"]);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_request_error() {
        let client = BackendClient::new("http://127.0.0.1:9/tamm/", None).unwrap();

        let error = client.list_attachments("12").await.unwrap_err();

        assert!(matches!(error, ClientError::Request(_)));
    }
}
