//! In-process stand-in for the TaMM backend, served on a random local port.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Removing this task is refused by the backend.
pub const FORBIDDEN_TASK: &str = "13";

/// Password accepted for every user.
pub const PASSWORD: &str = "geheim";

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
    cookies: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn call(&self, headers: &HeaderMap, call: String) {
        self.calls.lock().unwrap().push(call);
        if let Some(cookie) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
            self.cookies.lock().unwrap().push(cookie.to_string());
        }
    }
}

pub struct FakeBackend {
    /// Base url with the `tamm/` context path and trailing slash.
    pub base_url: String,
    recorder: Recorder,
}

impl FakeBackend {
    /// Mutating calls received so far. Reads are not recorded.
    pub fn calls(&self) -> Vec<String> {
        self.recorder.calls.lock().unwrap().clone()
    }

    pub fn cookies(&self) -> Vec<String> {
        self.recorder.cookies.lock().unwrap().clone()
    }
}

pub async fn spawn() -> FakeBackend {
    let recorder = Recorder::default();
    let app = Router::new()
        .nest("/tamm", routes())
        .with_state(recorder.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeBackend {
        base_url: format!("http://{addr}/tamm/"),
        recorder,
    }
}

fn routes() -> Router<Recorder> {
    Router::new()
        .route("/system/login", post(login))
        .route("/system/logout", get(logout))
        .route("/system/session", get(session))
        .route("/system/filtertask", post(filter_tasks))
        .route("/system/savetask", post(save_task))
        .route("/system/removetask/{id}", delete(remove_task))
        .route("/system/taskhistory/{id}", get(task_history))
        .route("/system/attachments/{id}", get(attachments))
        .route("/system/saveurl", post(save_url))
        .route("/upload", post(upload))
        .route("/upload/{guid}", delete(delete_upload))
}

fn tasks() -> Value {
    json!([
        {
            "lId": "12",
            "name": "Change filter",
            "description": "Air conditioning, 2nd floor",
            "owner": 2,
            "creator": 1,
            "lastChanged": "2023-02-20T09:30:00",
            "nextDueDate": "2023-05-20",
            "interval": "monthly|3|2023-02-20"
        },
        {
            "lId": "13",
            "name": "Mow lawn",
            "description": "",
            "owner": 1,
            "creator": 1,
            "nextDueDate": "2023-06-03",
            "interval": "weekly|1|2023-05-06"
        },
        {
            "lId": "14",
            "name": "Tax return",
            "description": "",
            "owner": 10,
            "creator": 1,
            "nextDueDate": "2023-09-30",
            "interval": "yearly|1|2023-09-30"
        }
    ])
}

fn ok(message: &str, data: Value) -> Json<Value> {
    Json(json!({"result": "ok", "message": message, "nextPage": "", "data": data}))
}

async fn login(
    State(recorder): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let name = body["name"].as_str().unwrap_or_default();
    recorder.call(&headers, format!("POST system/login {name}"));
    if body["pwd"].as_str() == Some(PASSWORD) {
        Json(json!({"result": "ok", "message": "", "nextPage": "index.html"}))
    } else {
        Json(json!({
            "result": "error",
            "message": "Unbekannter Benutzer oder falsches Passwort.",
            "nextPage": ""
        }))
    }
}

async fn logout() -> Json<Value> {
    Json(json!({"result": "ok", "message": "", "nextPage": "login.html"}))
}

async fn session() -> Json<Value> {
    ok(
        "",
        json!({
            "clientIp": "127.0.0.1",
            "userNames": [{"id": 1, "name": "Anna"}, {"id": 2, "name": "Bernd"}],
            "roleNames": [{"id": 10, "name": "Hausmeister"}]
        }),
    )
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Filter {
    filter_text: String,
}

async fn filter_tasks(Json(filter): Json<Filter>) -> Json<Value> {
    let needle = filter.filter_text.to_lowercase();
    let found: Vec<Value> = tasks()
        .as_array()
        .unwrap()
        .iter()
        .filter(|task| {
            task["name"]
                .as_str()
                .unwrap()
                .to_lowercase()
                .contains(&needle)
        })
        .cloned()
        .collect();
    Json(Value::Array(found))
}

async fn save_task(
    State(recorder): State<Recorder>,
    headers: HeaderMap,
    Json(task): Json<Value>,
) -> Json<Value> {
    let id = task["lId"].as_str().unwrap_or_default().to_string();
    recorder.call(
        &headers,
        format!(
            "POST system/savetask {} {} {}",
            id,
            task["name"].as_str().unwrap_or_default(),
            task["interval"].as_str().unwrap_or_default()
        ),
    );
    let assigned = if id == "-1" { "77".to_string() } else { id };
    ok("", json!(assigned))
}

async fn remove_task(
    State(recorder): State<Recorder>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Json<Value> {
    recorder.call(&headers, format!("DELETE system/removetask/{id}"));
    if id == FORBIDDEN_TASK {
        return Json(json!({"result": "error", "message": "Keine Berechtigung.", "nextPage": ""}));
    }
    ok("", Value::Null)
}

async fn task_history(Path(id): Path<String>) -> Json<Value> {
    let done = if id == "12" {
        json!([
            {"lId": "12", "name": "Change filter", "owner": 2, "nextDueDate": "2023-02-20"},
            {"lId": "12", "name": "Change filter", "owner": 2, "nextDueDate": "2022-11-20"}
        ])
    } else {
        json!([])
    };
    ok("", done)
}

async fn attachments(Path(id): Path<String>) -> Json<Value> {
    let list = if id == "12" {
        json!([
            {"guid": "g1", "fileName": "manual.pdf"},
            {"guid": "g2", "fileName": "Vendor", "url": "https://example.org/vendor"}
        ])
    } else {
        json!([])
    };
    ok("", list)
}

async fn save_url(
    State(recorder): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorder.call(
        &headers,
        format!(
            "POST system/saveurl {} {} {}",
            body["taskId"].as_str().unwrap_or_default(),
            body["fileName"].as_str().unwrap_or_default(),
            body["url"].as_str().unwrap_or_default()
        ),
    );
    ok("url-guid-1", Value::Null)
}

async fn upload(
    State(recorder): State<Recorder>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Json<Value> {
    let mut task_id = String::new();
    let mut names = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "taskid" => task_id = field.text().await.unwrap(),
            "file" => {
                names.push(field.file_name().unwrap_or_default().to_string());
                field.bytes().await.unwrap();
            }
            _ => {}
        }
    }
    recorder.call(&headers, format!("POST upload {} {}", task_id, names.join(",")));
    let guids: Vec<String> = names.iter().map(|name| format!("guid-{name}")).collect();
    ok("", json!(guids))
}

async fn delete_upload(
    State(recorder): State<Recorder>,
    headers: HeaderMap,
    Path(guid): Path<String>,
) -> Json<Value> {
    recorder.call(&headers, format!("DELETE upload/{guid}"));
    ok("", Value::Null)
}
