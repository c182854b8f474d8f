use axum::{
    extract::{Multipart, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get},
    Router,
};
use axum_extra::extract::Form;
use chrono::NaiveDate;
use hypertext::{prelude::*, Raw};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::attachment::Attachment;
use crate::client::{BackendClient, ClientError, UploadFile};
use crate::directory::KeyValueList;
use crate::i18n::{Locale, TextKey};
use crate::interval::{format_iso_date, Repeat};
use crate::presenter::{present, ListEntry, ListOptions, RowTag, Separator, TaskRow};
use crate::session::{TaskForm, TaskSession};
use crate::task::{Task, NEW_TASK_ID};

/// Number of upcoming dates shown under the interval fields.
const PREVIEW_DATES: usize = 5;

#[derive(Clone)]
pub struct AppState {
    pub client: BackendClient,
    pub directory: Arc<KeyValueList>,
    pub locale: Locale,
    pub today: fn() -> NaiveDate,
}

impl AppState {
    fn text(&self, key: TextKey) -> &'static str {
        self.locale.text(key)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(homepage))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/attachments/{guid}", delete(delete_attachment))
        .nest("/tasks", tasks_router())
}

fn tasks_router() -> Router<AppState> {
    Router::new()
        .route("/list", get(task_list))
        .route("/new", get(new_task_form))
        .route("/{id}", get(task_form).post(save_task).delete(remove_task))
        .route("/{id}/dates", axum::routing::post(add_date))
        .route(
            "/{id}/attachments",
            get(attachment_list).post(upload_attachments),
        )
        .route("/{id}/urls", axum::routing::post(save_url))
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Deserialize, Debug, Default)]
pub struct ListQuery {
    /// Show the completed occurrences of this task instead of the open list.
    #[serde(default)]
    pub history: Option<String>,
    /// Comma separated owner ids to leave out.
    #[serde(default)]
    pub hide: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

impl ListQuery {
    fn options(&self) -> ListOptions {
        let visibility: HashMap<i32, bool> = self
            .hide
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|owner| owner.trim().parse().ok())
            .map(|owner| (owner, false))
            .collect();
        ListOptions {
            history: self.history.is_some(),
            visibility,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct LogoutQuery {
    #[serde(default = "default_next")]
    pub next: String,
}

fn default_next() -> String {
    "/".to_string()
}

#[derive(Deserialize, Debug)]
pub struct UrlForm {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Ids end up in htmx urls, so only plain backend ids are accepted.
fn valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

async fn load_task(state: &AppState, id: &str) -> Result<Option<Task>, ClientError> {
    if id == NEW_TASK_ID {
        return Ok(Some(Task::draft()));
    }
    if !valid_id(id) {
        return Ok(None);
    }
    state.client.find_task(id).await
}

// ============================================================================
// Handlers
// ============================================================================

// GET / - Task list next to an empty form
pub async fn homepage(State(state): State<AppState>) -> Html<String> {
    let list_html = render_task_list(&state, &ListQuery::default()).await;
    let session = TaskSession::new_task(&state.directory);
    let form_html = render_task_form(&state, &session);
    Html(render_page(&state, &list_html, &form_html))
}

// GET /tasks/list - Just the list (for HTMX)
async fn task_list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Html<String> {
    Html(render_task_list(&state, &query).await)
}

// GET /tasks/new - Empty form for a new task
async fn new_task_form(State(state): State<AppState>) -> Html<String> {
    let session = TaskSession::new_task(&state.directory);
    Html(render_task_form(&state, &session))
}

// GET /tasks/:id - Form for a stored task
async fn task_form(State(state): State<AppState>, Path(id): Path<String>) -> Html<String> {
    match load_task(&state, &id).await {
        Ok(Some(task)) => {
            let session = TaskSession::with_task(task, &state.directory);
            Html(render_task_form(&state, &session))
        }
        Ok(None) => Html(render_status(state.text(TextKey::NotFound))),
        Err(e) => {
            warn!(task = %id, error = %e, "could not load task");
            Html(render_status(&e.to_string()))
        }
    }
}

// POST /tasks/:id - Save the form
async fn save_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<TaskForm>,
) -> Html<String> {
    let base = match load_task(&state, &id).await {
        Ok(Some(task)) => task,
        Ok(None) => return Html(render_status(state.text(TextKey::NotFound))),
        Err(e) => {
            warn!(task = %id, error = %e, "could not load task");
            return Html(render_status(&e.to_string()));
        }
    };

    let mut session = TaskSession::from_form(base, form);
    let task = session.to_task(&state.directory);
    match state.client.save_task(&task).await {
        Ok(saved_id) => {
            info!(task = %saved_id, "task saved");
            let saved = Task { id: saved_id, ..task };
            let mut session = TaskSession::with_task(saved, &state.directory);
            session.set_status(state.text(TextKey::Saved));
            Html(render_task_form(&state, &session) + LIST_REFRESH)
        }
        Err(e) => {
            warn!(task = %id, error = %e, "saving task failed");
            session.set_status(&e.to_string());
            Html(render_task_form(&state, &session))
        }
    }
}

// POST /tasks/:id/dates - Re-render the posted form with one more start date
async fn add_date(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<TaskForm>,
) -> Html<String> {
    if !valid_id(&id) {
        return Html(render_status(state.text(TextKey::NotFound)));
    }
    let shell = Task { id, ..Task::draft() };
    let mut session = TaskSession::from_form(shell, form);
    session.form.add_date_field(None);
    Html(render_task_form(&state, &session))
}

// DELETE /tasks/:id - Remove the task and show an empty form
async fn remove_task(State(state): State<AppState>, Path(id): Path<String>) -> Html<String> {
    if id == NEW_TASK_ID || !valid_id(&id) {
        let session = TaskSession::new_task(&state.directory);
        return Html(render_task_form(&state, &session));
    }

    match state.client.remove_task(&id).await {
        Ok(()) => {
            info!(task = %id, "task removed");
            let mut session = TaskSession::new_task(&state.directory);
            session.set_status(state.text(TextKey::Removed));
            Html(render_task_form(&state, &session) + LIST_REFRESH)
        }
        Err(e) => {
            warn!(task = %id, error = %e, "removing task failed");
            let mut session = match load_task(&state, &id).await {
                Ok(Some(task)) => TaskSession::with_task(task, &state.directory),
                _ => TaskSession::new_task(&state.directory),
            };
            session.set_status(&e.to_string());
            Html(render_task_form(&state, &session))
        }
    }
}

// GET /tasks/:id/attachments - Attachment list of a task
async fn attachment_list(State(state): State<AppState>, Path(id): Path<String>) -> Html<String> {
    if id == NEW_TASK_ID || !valid_id(&id) {
        return Html(String::new());
    }
    match state.client.list_attachments(&id).await {
        Ok(attachments) => Html(render_attachment_list(&state, &attachments, "")),
        Err(e) => {
            warn!(task = %id, error = %e, "could not load attachments");
            Html(render_attachment_list(&state, &[], &e.to_string()))
        }
    }
}

// POST /tasks/:id/attachments - Forward uploaded files to the backend
async fn upload_attachments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Html<String> {
    if id == NEW_TASK_ID || !valid_id(&id) {
        return Html(String::new());
    }

    let mut files = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                if field.name() != Some("file") || file_name.is_empty() {
                    continue;
                }
                match field.bytes().await {
                    Ok(content) => files.push(UploadFile {
                        file_name,
                        content: content.to_vec(),
                    }),
                    Err(e) => {
                        warn!(task = %id, error = %e, "reading upload failed");
                        return Html(render_status(&e.to_string()));
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(task = %id, error = %e, "reading upload failed");
                return Html(render_status(&e.to_string()));
            }
        }
    }

    let mut shown = state.client.list_attachments(&id).await.unwrap_or_default();
    if files.is_empty() {
        return Html(render_attachment_list(&state, &shown, ""));
    }

    let pending: Vec<Attachment> = files.iter().map(|f| Attachment::pending(&f.file_name)).collect();
    match state.client.upload(&id, files).await {
        Ok(guids) => {
            info!(task = %id, count = guids.len(), "files uploaded");
            shown.extend(Attachment::resolve_pending(pending, &guids));
            Html(render_attachment_list(&state, &shown, ""))
        }
        Err(e) => {
            warn!(task = %id, error = %e, "upload failed");
            Html(render_attachment_list(&state, &shown, &e.to_string()))
        }
    }
}

// POST /tasks/:id/urls - Store a URL attachment
async fn save_url(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<UrlForm>,
) -> Html<String> {
    if id == NEW_TASK_ID || !valid_id(&id) {
        return Html(String::new());
    }

    let status = match state.client.save_url(&id, form.filename.trim(), form.url.trim()).await {
        Ok(guid) => {
            info!(task = %id, guid = %guid, "url attachment saved");
            String::new()
        }
        Err(e) => {
            warn!(task = %id, error = %e, "saving url failed");
            e.to_string()
        }
    };
    let attachments = state.client.list_attachments(&id).await.unwrap_or_default();
    Html(render_attachment_list(&state, &attachments, &status))
}

// DELETE /attachments/:guid - Remove an attachment; the list item is swapped out
async fn delete_attachment(State(state): State<AppState>, Path(guid): Path<String>) -> Html<String> {
    if !valid_id(&guid) {
        warn!(guid = %guid, "refusing to remove attachment with malformed guid");
        return Html(render_status(state.text(TextKey::NotFound)));
    }
    if let Err(e) = state.client.delete_attachment(&guid).await {
        warn!(guid = %guid, error = %e, "removing attachment failed");
    }
    Html(String::new())
}

// GET /login - Login form
async fn login_page(State(state): State<AppState>) -> Html<String> {
    Html(render_login(&state))
}

// POST /login - Log in at the backend; htmx follows HX-Redirect to the task page
async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let name = form.username.trim();
    match state.client.login(name, &form.password).await {
        Ok(()) => {
            info!(user = %name, "logged in");
            ([("HX-Redirect", "/")], Html(String::new())).into_response()
        }
        Err(e) => {
            warn!(user = %name, error = %e, "login failed");
            Html(render_status(&e.to_string())).into_response()
        }
    }
}

// GET /logout - End the backend session and follow its next page
async fn logout(State(state): State<AppState>, Query(query): Query<LogoutQuery>) -> Response {
    match state.client.logout(&query.next).await {
        Ok(target) => Redirect::to(&target).into_response(),
        Err(e) => {
            warn!(error = %e, "logout failed");
            Html(render_status(&e.to_string())).into_response()
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Reloads the list after the form changed a task.
const LIST_REFRESH: &str = r##"<div hx-get="/tasks/list" hx-trigger="load" hx-target="#tasklist" hx-swap="innerHTML"></div>"##;

fn render_page(state: &AppState, list_html: &str, form_html: &str) -> String {
    let new_button = format!(
        r##"<button class="btn" hx-get="/tasks/new" hx-target="#taskform" hx-swap="innerHTML">{}</button>"##,
        state.text(TextKey::NewTask)
    );
    let filter_input = r##"<input type="search" name="filter" class="filter" hx-get="/tasks/list" hx-trigger="input changed delay:300ms" hx-target="#tasklist" hx-swap="innerHTML">"##;

    maud! {
        !DOCTYPE
        html lang=(state.locale.tag()) {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "TaMM - " (state.text(TextKey::Tasks)) }
                link rel="stylesheet" href="/static/app.css";
                script src="https://unpkg.com/htmx.org@2.0.4" {}
            }
            body {
                div .page {
                    div .page-header {
                        h1 { (state.text(TextKey::Tasks)) }
                        (Raw::dangerously_create(&new_button))
                        a .logout href="/logout?next=/" { (state.text(TextKey::Logout)) }
                    }
                    div .columns {
                        section .list-column {
                            (Raw::dangerously_create(filter_input))
                            div #tasklist {
                                (Raw::dangerously_create(list_html))
                            }
                        }
                        section #taskform .form-column {
                            (Raw::dangerously_create(form_html))
                        }
                    }
                }
            }
        }
    }
    .render()
    .into_inner()
}

/// Login page. Labels are looked up by their markup key.
fn render_login(state: &AppState) -> String {
    let text = |key: &str| state.locale.translate(key).unwrap_or_default();
    let form_open = r##"<form class="login" hx-post="/login" hx-target="#status" hx-swap="outerHTML" hx-indicator="#wait">"##;

    maud! {
        !DOCTYPE
        html lang=(state.locale.tag()) {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "TaMM - " (text("dologin")) }
                link rel="stylesheet" href="/static/app.css";
                script src="https://unpkg.com/htmx.org@2.0.4" {}
            }
            body {
                div .page {
                    (Raw::dangerously_create(form_open))
                    div .form-group {
                        label for="username" { (text("username")) }
                        input #username type="text" name="username";
                    }
                    div .form-group {
                        label for="password" { (text("password")) }
                        input #password type="password" name="password";
                    }
                    button .btn type="submit" { (text("dologin")) }
                    span #wait .htmx-indicator { (text("wait")) }
                    div #status .status {}
                    (Raw::dangerously_create("</form>"))
                    p .pwdreq { (text("pwdreq")) }
                }
            }
        }
    }
    .render()
    .into_inner()
}

async fn render_task_list(state: &AppState, query: &ListQuery) -> String {
    let tasks = match query.history.as_deref() {
        Some(id) if valid_id(id) => state.client.task_history(id).await,
        Some(_) => Ok(Vec::new()),
        None => {
            state
                .client
                .list_tasks(query.filter.as_deref().unwrap_or_default())
                .await
        }
    };

    match tasks {
        Ok(tasks) => {
            let entries = present(&tasks, (state.today)(), &query.options());
            render_entries(state.locale, &entries, query.history.is_some())
        }
        Err(e) => {
            warn!(error = %e, "task list unavailable");
            render_status(&e.to_string())
        }
    }
}

fn render_entries(locale: Locale, entries: &[ListEntry<'_>], history: bool) -> String {
    let items: Vec<String> = entries
        .iter()
        .map(|entry| match entry {
            ListEntry::Separator(separator) => render_separator(locale, *separator),
            ListEntry::Row(row) => render_row(row),
        })
        .collect();

    maud! {
        @if history {
            h2 .history-title { (locale.text(TextKey::History)) }
        }
        @if entries.is_empty() {
            div .empty-state {
                p { (locale.text(TextKey::NoTasks)) }
            }
        }
        (Raw::dangerously_create(&items.join("\n")))
    }
    .render()
    .into_inner()
}

fn render_separator(locale: Locale, separator: Separator) -> String {
    let (class, label) = match separator {
        Separator::EndOfOverdue => ("separator separator-overdue", TextKey::Overdue),
        Separator::FarFuture => ("separator separator-later", TextKey::Later),
    };
    maud! {
        div class=(class) { (locale.text(label)) }
    }
    .render()
    .into_inner()
}

fn render_row(row: &TaskRow<'_>) -> String {
    let mut due_class = String::from("duedate");
    for tag in &row.tags {
        due_class.push(' ');
        due_class.push_str(tag.class());
    }
    let item_class = if row.has_tag(RowTag::FutureTask) {
        "listitem futuretask"
    } else {
        "listitem"
    };

    let inner = maud! {
        div .taskname { (row.name) }
        div class=(due_class) { (row.due_date) }
    }
    .render()
    .into_inner();

    format!(
        r##"<div class="{}" hx-get="/tasks/{}" hx-target="#taskform" hx-swap="innerHTML">{}</div>"##,
        item_class, row.task.id, inner
    )
}

struct IntervalOption {
    id: String,
    value: String,
    label: String,
    checked: bool,
}

fn interval_options(locale: Locale, selected: &Repeat) -> Vec<IntervalOption> {
    let mut kinds = Repeat::known().to_vec();
    if !selected.is_known() {
        kinds.push(selected.clone());
    }
    kinds
        .iter()
        .map(|kind| IntervalOption {
            id: format!("interval-{}", kind.label()),
            value: kind.label().to_string(),
            label: locale.repeat_label(kind),
            checked: kind == selected,
        })
        .collect()
}

fn render_task_form(state: &AppState, session: &TaskSession) -> String {
    let form = &session.form;
    let task_id = session.selected().id.as_str();
    let interval = form.interval();
    let options = interval_options(state.locale, &interval.repeat);
    let preview: Vec<String> = if interval.is_valid() {
        interval
            .upcoming((state.today)(), PREVIEW_DATES)
            .into_iter()
            .map(format_iso_date)
            .collect()
    } else {
        Vec::new()
    };

    let disabled = |flag: bool| if flag { " disabled" } else { "" };
    let add_date_button = format!(
        r##"<button type="button" class="btn" hx-post="/tasks/{}/dates" hx-target="#taskform" hx-swap="innerHTML">{}</button>"##,
        task_id,
        state.text(TextKey::AddDate)
    );
    let buttons = format!(
        concat!(
            r##"<button type="submit" id="save" class="btn"{}>{}</button>"##,
            r##"<button type="button" id="remove" class="btn" hx-delete="/tasks/{}" hx-target="#taskform" hx-swap="innerHTML" hx-confirm="{}?"{}>{}</button>"##,
            r##"<button type="button" id="history" class="btn" hx-get="/tasks/list?history={}" hx-target="#tasklist" hx-swap="innerHTML"{}>{}</button>"##,
        ),
        disabled(session.controls.save_disabled),
        state.text(TextKey::Save),
        task_id,
        state.text(TextKey::Remove),
        disabled(session.controls.remove_disabled),
        state.text(TextKey::Remove),
        task_id,
        disabled(session.controls.history_disabled),
        state.text(TextKey::History),
    );
    let attachments_html = if session.is_new() {
        String::new()
    } else {
        render_attachment_section(state, task_id)
    };

    let body = maud! {
        input type="hidden" name="tasklid" value=(form.tasklid);
        div .form-group {
            label for="name" { (state.text(TextKey::Name)) }
            input type="text" id="name" name="name" value=(form.name);
        }
        div .form-group {
            label for="description" { (state.text(TextKey::Description)) }
            textarea id="description" name="description" rows="4" { (form.description) }
        }
        div .form-group {
            label for="owner" { (state.text(TextKey::Owner)) }
            input type="text" id="owner" name="owner" value=(form.owner);
        }
        div .form-group .inline-field {
            label for="duedate" { (state.text(TextKey::DueDate)) }
            input type="date" id="duedate" name="duedate" value=(form.duedate);
            label for="lastchanged" { (state.text(TextKey::LastChanged)) }
            input type="text" id="lastchanged" name="lastchanged" value=(form.lastchanged) readonly;
        }
        fieldset .interval {
            legend { (state.text(TextKey::Interval)) }
            div .interval-kinds {
                @for option in &options {
                    div .field-row {
                        @if option.checked {
                            input type="radio" id=(option.id) name="interval" value=(option.value) checked;
                        } @else {
                            input type="radio" id=(option.id) name="interval" value=(option.value);
                        }
                        label for=(option.id) { (option.label) }
                    }
                }
            }
            div .inline-field {
                label for="divider" { (state.text(TextKey::Divisor)) }
                input type="number" id="divider" name="divider" min="1" value=(form.divider);
            }
            div .form-group {
                label { (state.text(TextKey::StartDates)) }
                div #datelist {
                    @for date in &form.startdate {
                        input type="date" name="startdate" value=(date);
                    }
                }
                (Raw::dangerously_create(&add_date_button))
            }
            @if !preview.is_empty() {
                div .next-dates {
                    (state.text(TextKey::NextDates)) ": " (preview.join(", "))
                }
            }
        }
        div .form-buttons {
            (Raw::dangerously_create(&buttons))
        }
        div #status .status { (session.status) }
    }
    .render()
    .into_inner();

    format!(
        r##"<form id="task-form" hx-post="/tasks/{}" hx-target="#taskform" hx-swap="innerHTML" oninput="document.getElementById('save').disabled = false">{}</form>{}"##,
        task_id, body, attachments_html
    )
}

fn render_attachment_section(state: &AppState, task_id: &str) -> String {
    let list_loader = format!(
        r##"<div id="attachments" hx-get="/tasks/{}/attachments" hx-trigger="load" hx-swap="innerHTML"></div>"##,
        task_id
    );
    let upload_form = format!(
        r##"<form class="upload-form" hx-post="/tasks/{}/attachments" hx-encoding="multipart/form-data" hx-target="#attachments" hx-swap="innerHTML"><input type="file" name="file" multiple><button type="submit" class="btn">{}</button></form>"##,
        task_id,
        state.text(TextKey::Upload)
    );
    let url_form = format!(
        r##"<form class="url-form" hx-post="/tasks/{}/urls" hx-target="#attachments" hx-swap="innerHTML"><input type="text" name="filename" placeholder="{}"><input type="url" name="url" placeholder="{}"><button type="submit" class="btn">{}</button></form>"##,
        task_id,
        state.text(TextKey::UrlName),
        state.text(TextKey::Url),
        state.text(TextKey::SaveUrl)
    );

    maud! {
        section .attachments {
            h2 { (state.text(TextKey::Attachments)) }
            (Raw::dangerously_create(&list_loader))
            (Raw::dangerously_create(&upload_form))
            (Raw::dangerously_create(&url_form))
        }
    }
    .render()
    .into_inner()
}

fn attachment_link(state: &AppState, attachment: &Attachment) -> String {
    match attachment.url.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => url.to_string(),
        None => state.client.url(&attachment.href()),
    }
}

fn render_attachment_list(state: &AppState, attachments: &[Attachment], status: &str) -> String {
    let items: Vec<String> = attachments
        .iter()
        .map(|attachment| {
            let link = attachment_link(state, attachment);
            let remove_button = if attachment.is_pending() || !valid_id(&attachment.guid) {
                String::new()
            } else {
                format!(
                    r##"<button class="btn attachment-remove" hx-delete="/attachments/{}" hx-target="closest .filelistitem" hx-swap="outerHTML">×</button>"##,
                    attachment.guid
                )
            };
            maud! {
                div .filelistitem {
                    a href=(link) target="_blank" { span { (attachment.file_name) } }
                    (Raw::dangerously_create(&remove_button))
                }
            }
            .render()
            .into_inner()
        })
        .collect();

    maud! {
        div #filelist {
            (Raw::dangerously_create(&items.join("\n")))
        }
        @if !status.is_empty() {
            div .status { (status) }
        }
    }
    .render()
    .into_inner()
}

fn render_status(message: &str) -> String {
    maud! {
        div #status .status { (message) }
    }
    .render()
    .into_inner()
}
