//! In-process test server: a real SQLite store and content directory in a
//! temp dir, served by axum on an ephemeral port.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use tempfile::TempDir;
use uuid::Uuid;

use notehall::auth::PasswordHasher;
use notehall::server::{AppState, create_router};
use notehall::store::{SqliteStore, Store};
use notehall::types::User;

pub const ADMIN_EMAIL: &str = "admin@notehall.test";
pub const ADMIN_PASSWORD: &str = "admin-password-1";

pub struct TestServer {
    pub base_url: String,
    _temp_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");

        let store: Arc<SqliteStore> =
            Arc::new(SqliteStore::new(temp_dir.path().join("notehall.db")).expect("open store"));
        store.initialize().expect("initialize store");

        let now = Utc::now();
        let admin = User {
            id: Uuid::new_v4().to_string(),
            name: "Admin".to_string(),
            email: ADMIN_EMAIL.to_string(),
            password_hash: PasswordHasher::new()
                .hash(ADMIN_PASSWORD)
                .expect("hash admin password"),
            is_admin: true,
            profile_image: None,
            created_at: now,
            updated_at: now,
        };
        store.create_user(&admin).expect("create admin");

        let state = Arc::new(AppState::new(store as Arc<dyn Store>, temp_dir.path()));
        let app = create_router(state, &[]);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            base_url: format!("http://{addr}"),
            _temp_dir: temp_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A client with its own cookie jar, i.e. its own session.
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("build client")
    }

    /// Fresh client logged in as the seeded admin.
    pub async fn admin_client(&self) -> reqwest::Client {
        let client = self.client();
        let resp = client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
            .send()
            .await
            .expect("admin login");
        assert_eq!(resp.status(), 200, "admin login failed");
        client
    }

    /// Fresh client registered as a new student.
    pub async fn student_client(&self, name: &str) -> reqwest::Client {
        let client = self.client();
        let resp = client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "name": name,
                "email": format!("{}@notehall.test", Uuid::new_v4()),
                "password": "student-password-1",
            }))
            .send()
            .await
            .expect("register student");
        assert_eq!(resp.status(), 201, "student registration failed");
        client
    }

    /// Creates a teacher through the admin API and returns its id.
    pub async fn create_teacher(&self, admin: &reqwest::Client, name: &str, subject: &str) -> String {
        let form = reqwest::multipart::Form::new()
            .text("name", name.to_string())
            .text("subject", subject.to_string());
        let resp = admin
            .post(self.url("/api/admin/teachers"))
            .multipart(form)
            .send()
            .await
            .expect("create teacher");
        assert_eq!(resp.status(), 201, "teacher creation failed");
        let body: Value = resp.json().await.expect("teacher body");
        body["data"]["id"].as_str().expect("teacher id").to_string()
    }

    /// Uploads a single one-page PDF note and returns its id.
    pub async fn create_note(
        &self,
        admin: &reqwest::Client,
        teacher_id: &str,
        title: &str,
        price: i64,
    ) -> String {
        let file = reqwest::multipart::Part::bytes(b"%PDF-1.4 test note".to_vec())
            .file_name("note.pdf")
            .mime_str("application/pdf")
            .expect("pdf part");
        let form = reqwest::multipart::Form::new()
            .text("teacher_id", teacher_id.to_string())
            .text("title", title.to_string())
            .text("price", price.to_string())
            .part("files", file);

        let resp = admin
            .post(self.url("/api/admin/notes"))
            .multipart(form)
            .send()
            .await
            .expect("create note");
        assert_eq!(resp.status(), 201, "note creation failed");
        let body: Value = resp.json().await.expect("note body");
        body["data"][0]["id"].as_str().expect("note id").to_string()
    }
}
