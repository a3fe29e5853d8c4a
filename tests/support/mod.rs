#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use notepress::application::accounts::{AccountService, TokenSigner};
use notepress::application::compile::{CompileService, CompilerConfig};
use notepress::application::documents::DocumentService;
use notepress::application::repos::{
    CreateDocumentParams, CreateUserParams, DocumentsRepo, HealthRepo, RepoError, TodosRepo,
    UpdateDocumentParams, UpdateTodoParams, UsersRepo,
};
use notepress::application::todos::TodoService;
use notepress::domain::entities::{DocumentRecord, TodoRecord, UserRecord};
use notepress::infra::http::{ApiState, RequestLimits, build_router};
use notepress::infra::storage::FilesystemBlobStore;

pub const BUCKET: &str = "documents";
const JWT_SECRET: &[u8] = b"integration-test-secret";

/// Stand-in for [`notepress::infra::db::PostgresRepositories`].
#[derive(Default)]
pub struct InMemoryRepositories {
    users: Mutex<HashMap<Uuid, UserRecord>>,
    documents: Mutex<HashMap<Uuid, DocumentRecord>>,
    todos: Mutex<HashMap<Uuid, TodoRecord>>,
    pub database_down: AtomicBool,
    pub fail_document_inserts: AtomicBool,
}

impl InMemoryRepositories {
    pub async fn document_count(&self) -> usize {
        self.documents.lock().await.len()
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut users = self.users.lock().await;
        if users.values().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        if users.values().any(|user| user.email == params.email) {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".to_string(),
            });
        }

        let user = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            email: params.email,
            password_hash: params.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let users = self.users.lock().await;
        Ok(users.values().find(|user| user.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.users.lock().await.get(&id).cloned())
    }
}

#[async_trait]
impl DocumentsRepo for InMemoryRepositories {
    async fn create_document(
        &self,
        params: CreateDocumentParams,
    ) -> Result<DocumentRecord, RepoError> {
        if self.fail_document_inserts.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("insert rejected".to_string()));
        }

        let now = OffsetDateTime::now_utc();
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            title: params.title,
            object_storage_key: params.object_storage_key,
            format: params.format,
            created_at: now,
            updated_at: now,
        };
        self.documents
            .lock()
            .await
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_document(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DocumentRecord>, RepoError> {
        let documents = self.documents.lock().await;
        Ok(documents
            .get(&id)
            .filter(|doc| doc.user_id == user_id)
            .cloned())
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentRecord>, RepoError> {
        let documents = self.documents.lock().await;
        let mut owned: Vec<_> = documents
            .values()
            .filter(|doc| doc.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(owned)
    }

    async fn update_document(
        &self,
        params: UpdateDocumentParams,
    ) -> Result<DocumentRecord, RepoError> {
        let mut documents = self.documents.lock().await;
        let doc = documents
            .get_mut(&params.id)
            .filter(|doc| doc.user_id == params.user_id)
            .ok_or(RepoError::NotFound)?;
        doc.title = params.title;
        doc.format = params.format;
        doc.updated_at = params.updated_at;
        Ok(doc.clone())
    }

    async fn delete_document(&self, user_id: Uuid, id: Uuid) -> Result<(), RepoError> {
        let mut documents = self.documents.lock().await;
        match documents.get(&id) {
            Some(doc) if doc.user_id == user_id => {
                documents.remove(&id);
                Ok(())
            }
            _ => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl TodosRepo for InMemoryRepositories {
    async fn create_todo(&self, user_id: Uuid, content: String) -> Result<TodoRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let todo = TodoRecord {
            id: Uuid::new_v4(),
            user_id,
            content,
            is_completed: false,
            created_at: now,
            updated_at: now,
        };
        self.todos.lock().await.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn find_todo(&self, user_id: Uuid, id: Uuid) -> Result<Option<TodoRecord>, RepoError> {
        let todos = self.todos.lock().await;
        Ok(todos.get(&id).filter(|todo| todo.user_id == user_id).cloned())
    }

    async fn list_todos(&self, user_id: Uuid) -> Result<Vec<TodoRecord>, RepoError> {
        let todos = self.todos.lock().await;
        let mut owned: Vec<_> = todos
            .values()
            .filter(|todo| todo.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(owned)
    }

    async fn update_todo(&self, params: UpdateTodoParams) -> Result<TodoRecord, RepoError> {
        let mut todos = self.todos.lock().await;
        let todo = todos
            .get_mut(&params.id)
            .filter(|todo| todo.user_id == params.user_id)
            .ok_or(RepoError::NotFound)?;
        todo.content = params.content;
        todo.is_completed = params.is_completed;
        todo.updated_at = params.updated_at;
        Ok(todo.clone())
    }

    async fn delete_todo(&self, user_id: Uuid, id: Uuid) -> Result<(), RepoError> {
        let mut todos = self.todos.lock().await;
        match todos.get(&id) {
            Some(todo) if todo.user_id == user_id => {
                todos.remove(&id);
                Ok(())
            }
            _ => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl HealthRepo for InMemoryRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.database_down.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Fake Typst: `typst compile <in> <out>`. The PDF embeds the source so
/// callers can tell outputs apart. `FAIL` in the source exits non-zero and
/// `HANG` never finishes.
const FAKE_TYPST: &str = r#"#!/bin/sh
src="$2"
out="$3"
if grep -q HANG "$src"; then exec sleep 30; fi
if grep -q FAIL "$src"; then
  echo "compiling document"
  echo "error: unknown variable: oops" >&2
  exit 1
fi
{ printf '%%PDF-1.7\n'; cat "$src"; } > "$out"
"#;

/// Fake pdflatex: `pdflatex -interaction=nonstopmode -output-directory <dir> <dir>/document.tex`.
const FAKE_LATEX: &str = r#"#!/bin/sh
dir="$3"
src="$4"
if grep -q HANG "$src"; then exec sleep 30; fi
if grep -q FAIL "$src"; then
  echo "! Undefined control sequence."
  echo "l.3 \oops"
  exit 1
fi
{ printf '%%PDF-1.5\n'; cat "$src"; } > "$dir/document.pdf"
"#;

pub struct TestOptions {
    pub timeout: Duration,
    pub max_concurrent: usize,
    /// Use the real compilers from `PATH` instead of the fakes.
    pub real_compilers: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_concurrent: 4,
            real_compilers: false,
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub repos: Arc<InMemoryRepositories>,
    pub compiler: Arc<CompileService>,
    pub storage_dir: TempDir,
    pub workspace_dir: TempDir,
    _bin_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(TestOptions::default())
    }

    pub fn with_options(options: TestOptions) -> Self {
        let bin_dir = TempDir::new().expect("bin dir");
        let storage_dir = TempDir::new().expect("storage dir");
        let workspace_dir = TempDir::new().expect("workspace dir");

        let (latex_program, typst_program) = if options.real_compilers {
            (PathBuf::from("pdflatex"), PathBuf::from("typst"))
        } else {
            (
                write_script(bin_dir.path(), "fake-pdflatex", FAKE_LATEX),
                write_script(bin_dir.path(), "fake-typst", FAKE_TYPST),
            )
        };

        let compiler = Arc::new(CompileService::new(CompilerConfig {
            latex_program,
            typst_program,
            timeout: options.timeout,
            max_concurrent: options.max_concurrent.try_into().expect("non-zero"),
            workspace_root: Some(workspace_dir.path().to_path_buf()),
        }));

        let blobs = FilesystemBlobStore::new(storage_dir.path().to_path_buf()).expect("blobs");
        blobs.ensure_bucket(BUCKET).expect("bucket");

        let repos = Arc::new(InMemoryRepositories::default());
        let state = ApiState {
            accounts: Arc::new(AccountService::new(
                repos.clone(),
                TokenSigner::new(JWT_SECRET, time::Duration::hours(1)),
            )),
            documents: Arc::new(DocumentService::new(repos.clone(), Arc::new(blobs), BUCKET)),
            todos: Arc::new(TodoService::new(repos.clone())),
            compiler: compiler.clone(),
            health: repos.clone(),
            limits: RequestLimits {
                compile_bytes: 64 * 1024,
                document_bytes: 64 * 1024,
            },
        };

        Self {
            router: build_router(state),
            repos,
            compiler,
            storage_dir,
            workspace_dir,
            _bin_dir: bin_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        // Extractor rejections from axum are plain text.
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", uri, &body, None)).await
    }

    /// Register `username` and return a bearer token for it.
    pub async fn login_as(&self, username: &str) -> String {
        let password = "correct horse battery";
        let (status, _) = self
            .post_json(
                "/api/register",
                serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": password,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .post_json(
                "/api/login",
                serde_json::json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().expect("token").to_string()
    }

    pub fn workspace_entries(&self) -> usize {
        dir_entries(self.workspace_dir.path())
    }

    pub fn stored_blobs(&self) -> usize {
        dir_entries(&self.storage_dir.path().join(BUCKET))
    }
}

pub fn json_request(method: &str, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

fn dir_entries(path: &Path) -> usize {
    std::fs::read_dir(path)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
    }
    path
}
