use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::Value;

use common::config::{MqAppConfig, StorageAppConfig};
use common::storage::FsBlobStore;
use server::config::{AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ServerConfig};
use server::entity::{
    assignment, assignment_problem, assignment_user, class, dataset, language, problem,
    problem_language, test_case, user,
};
use server::state::AppState;
use server::utils::jwt;

pub const JWT_SECRET: &str = "test-secret-for-integration-tests";

/// Monotonic counter for unique codes and slugs within one test binary.
static SEED_COUNTER: AtomicU32 = AtomicU32::new(0);

fn next_seed() -> u32 {
    SEED_COUNTER.fetch_add(1, Ordering::Relaxed)
}

pub mod routes {
    pub const SUBMISSIONS: &str = "/api/v1/submissions";

    pub fn submission(id: i32) -> String {
        format!("/api/v1/submissions/{id}")
    }

    pub fn problem_submissions(problem_id: i32) -> String {
        format!("/api/v1/problems/{problem_id}/submissions")
    }

    pub fn assignment_submissions(assignment_id: i32, problem_id: i32) -> String {
        format!("/api/v1/assignments/{assignment_id}/problems/{problem_id}/submissions")
    }

    pub fn assignment_start(id: i32) -> String {
        format!("/api/v1/assignments/{id}/start")
    }

    pub fn assignment_activity(id: i32) -> String {
        format!("/api/v1/assignments/{id}/activity")
    }

    pub fn best_submissions(id: i32) -> String {
        format!("/api/v1/assignments/{id}/best-submissions")
    }

    pub fn best_submissions_for(id: i32, user_id: i32) -> String {
        format!("/api/v1/assignments/{id}/best-submissions?user_id={user_id}")
    }

    pub fn grade(assignment_id: i32, problem_id: i32, user_id: i32) -> String {
        format!("/api/v1/assignments/{assignment_id}/problems/{problem_id}/users/{user_id}/grade")
    }
}

/// A running test server backed by an in-memory SQLite database and a
/// temporary blob store. MQ is disabled, so accepted submissions stay
/// Pending until a test drives the consumer functions directly.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub storage: Arc<FsBlobStore>,
    _storage_dir: tempfile::TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        // A single pooled connection keeps the in-memory database alive and
        // shared across the app and the test's direct queries.
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to connect to in-memory SQLite");
        server::database::sync_schema(&db)
            .await
            .expect("Failed to sync schema");

        let storage_dir = tempfile::tempdir().expect("Failed to create storage dir");
        let storage = Arc::new(
            FsBlobStore::open(storage_dir.path().join("blobs"), 16 * 1024 * 1024)
                .await
                .expect("Failed to open blob store"),
        );

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
            },
            mq: MqAppConfig {
                enabled: false,
                ..Default::default()
            },
            storage: StorageAppConfig {
                root: storage_dir.path().join("blobs"),
                max_bytes: 16 * 1024 * 1024,
            },
        };

        let state = AppState {
            db: db.clone(),
            config: app_config,
            mq: None,
            storage: storage.clone(),
        };

        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            storage,
            _storage_dir: storage_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn put_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    /// Insert a user row and mint a token for it. Tokens come from the
    /// identity provider in production, so there is no auth endpoint to call.
    pub async fn create_user(&self, username: &str, role: &str) -> (i32, String) {
        let row = user::ActiveModel {
            username: Set(username.to_string()),
            role: Set(role.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let model = row.insert(&self.db).await.expect("Failed to insert user");
        let token =
            jwt::sign(JWT_SECRET, model.id, username, role).expect("Failed to sign test token");
        (model.id, token)
    }

    pub async fn put_blob(&self, bytes: &[u8]) -> String {
        use common::storage::BlobStore;
        self.storage
            .put(bytes)
            .await
            .expect("Failed to store blob")
            .to_hex()
    }

    pub async fn seed_class(&self, teacher_id: i32) -> i32 {
        let row = class::ActiveModel {
            name: Set(format!("Class {}", next_seed())),
            teacher_id: Set(teacher_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        row.insert(&self.db).await.expect("Failed to insert class").id
    }

    pub async fn seed_problem(&self) -> problem::Model {
        self.seed_problem_with_limits(2000, 262_144, 64).await
    }

    pub async fn seed_problem_with_limits(
        &self,
        time_limit_ms: i32,
        memory_limit_kb: i32,
        source_limit_kb: i32,
    ) -> problem::Model {
        let n = next_seed();
        let row = problem::ActiveModel {
            code: Set(format!("P{n:04}")),
            slug: Set(format!("problem-{n}")),
            title: Set(format!("Problem {n}")),
            description: Set("## Task\nRead the input, print the answer.".to_string()),
            difficulty: Set(problem::DIFFICULTY_EASY.to_string()),
            visibility: Set("PUBLIC".to_string()),
            status: Set("PUBLISHED".to_string()),
            io_mode: Set(problem::IO_MODE_STDIO.to_string()),
            time_limit_ms: Set(time_limit_ms),
            memory_limit_kb: Set(memory_limit_kb),
            source_limit_kb: Set(source_limit_kb),
            stack_limit_kb: Set(None),
            is_locked: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        row.insert(&self.db).await.expect("Failed to insert problem")
    }

    pub async fn seed_language(&self, code: &str, enabled: bool) -> language::Model {
        let row = language::ActiveModel {
            code: Set(code.to_string()),
            name: Set(code.to_string()),
            default_time_factor: Set(None),
            default_memory_kb: Set(None),
            head_template: Set(None),
            body_template: Set(None),
            tail_template: Set(None),
            enabled: Set(enabled),
            display_order: Set(0),
            ..Default::default()
        };
        row.insert(&self.db).await.expect("Failed to insert language")
    }

    pub async fn seed_pairing(
        &self,
        problem_id: i32,
        language_id: i32,
        is_allowed: bool,
    ) -> problem_language::Model {
        let row = problem_language::ActiveModel {
            problem_id: Set(problem_id),
            language_id: Set(language_id),
            is_allowed: Set(is_allowed),
            time_factor_override: Set(None),
            memory_kb_override: Set(None),
            head_template: Set(None),
            body_template: Set(None),
            tail_template: Set(None),
            ..Default::default()
        };
        row.insert(&self.db).await.expect("Failed to insert pairing")
    }

    pub async fn seed_dataset(&self, problem_id: i32) -> i32 {
        let row = dataset::ActiveModel {
            problem_id: Set(problem_id),
            kind: Set(dataset::KIND_HIDDEN.to_string()),
            name: Set(format!("dataset-{}", next_seed())),
            ..Default::default()
        };
        row.insert(&self.db).await.expect("Failed to insert dataset").id
    }

    pub async fn seed_test_case(&self, dataset_id: i32, index_no: i32, score: i32) -> i32 {
        let input_ref = self.put_blob(format!("input {index_no}\n").as_bytes()).await;
        let output_ref = self
            .put_blob(format!("output {index_no}\n").as_bytes())
            .await;
        let row = test_case::ActiveModel {
            dataset_id: Set(dataset_id),
            index_no: Set(index_no),
            input_ref: Set(input_ref),
            output_ref: Set(output_ref),
            score: Set(score),
            ..Default::default()
        };
        row.insert(&self.db).await.expect("Failed to insert test case").id
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn seed_assignment(
        &self,
        class_id: i32,
        kind: &str,
        status: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        allow_late_submission: bool,
    ) -> i32 {
        let row = assignment::ActiveModel {
            class_id: Set(class_id),
            title: Set(format!("Assignment {}", next_seed())),
            kind: Set(kind.to_string()),
            status: Set(status.to_string()),
            start_time: Set(start_time),
            end_time: Set(end_time),
            total_points: Set(100),
            allow_late_submission: Set(allow_late_submission),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        row.insert(&self.db)
            .await
            .expect("Failed to insert assignment")
            .id
    }

    pub async fn add_problem(
        &self,
        assignment_id: i32,
        problem_id: i32,
        points: i32,
        order_no: i32,
    ) -> i32 {
        let row = assignment_problem::ActiveModel {
            assignment_id: Set(assignment_id),
            problem_id: Set(problem_id),
            points: Set(points),
            order_no: Set(order_no),
            ..Default::default()
        };
        row.insert(&self.db)
            .await
            .expect("Failed to insert assignment problem")
            .id
    }

    pub async fn enroll(&self, assignment_id: i32, user_id: i32, status: &str) -> i32 {
        let started_at = if status == assignment_user::STATUS_NOT_STARTED {
            None
        } else {
            Some(Utc::now())
        };
        let row = assignment_user::ActiveModel {
            assignment_id: Set(assignment_id),
            user_id: Set(user_id),
            status: Set(status.to_string()),
            started_at: Set(started_at),
            score: Set(0),
            max_score: Set(0),
            tab_switch_count: Set(0),
            captured_ai_count: Set(0),
            ..Default::default()
        };
        row.insert(&self.db)
            .await
            .expect("Failed to insert enrollment")
            .id
    }

    /// Seed a complete open-assignment fixture: a published homework inside
    /// its submission window, one problem worth 100 points with a two-case
    /// dataset, one enrolled student already IN_PROGRESS, and a stored
    /// source blob.
    pub async fn seed_open_assignment(&self) -> AssignmentContext {
        let (teacher_id, teacher_token) = self.create_user("teacher1", user::ROLE_TEACHER).await;
        let (student_id, student_token) = self.create_user("student1", user::ROLE_STUDENT).await;

        let class_id = self.seed_class(teacher_id).await;
        let prob = self.seed_problem().await;
        let lang = self.seed_language("python", true).await;
        let dataset_id = self.seed_dataset(prob.id).await;
        let case_a = self.seed_test_case(dataset_id, 0, 40).await;
        let case_b = self.seed_test_case(dataset_id, 1, 60).await;

        let assignment_id = self
            .seed_assignment(
                class_id,
                assignment::KIND_HOMEWORK,
                assignment::STATUS_PUBLISHED,
                Utc::now() - Duration::hours(1),
                Utc::now() + Duration::hours(1),
                false,
            )
            .await;
        self.add_problem(assignment_id, prob.id, 100, 1).await;
        let enrollment_id = self
            .enroll(assignment_id, student_id, assignment_user::STATUS_IN_PROGRESS)
            .await;

        let source_ref = self.put_blob(b"print(input())\n").await;

        AssignmentContext {
            teacher_id,
            teacher_token,
            student_id,
            student_token,
            class_id,
            assignment_id,
            problem_id: prob.id,
            dataset_id,
            language_id: lang.id,
            enrollment_id,
            test_case_ids: vec![case_a, case_b],
            source_ref,
        }
    }
}

/// Everything `seed_open_assignment` created, by ID.
pub struct AssignmentContext {
    pub teacher_id: i32,
    pub teacher_token: String,
    pub student_id: i32,
    pub student_token: String,
    pub class_id: i32,
    pub assignment_id: i32,
    pub problem_id: i32,
    pub dataset_id: i32,
    pub language_id: i32,
    pub enrollment_id: i32,
    pub test_case_ids: Vec<i32>,
    pub source_ref: String,
}

impl AssignmentContext {
    /// A valid submission payload for this fixture.
    pub fn submission_body(&self) -> Value {
        serde_json::json!({
            "dataset_id": self.dataset_id,
            "language": "python",
            "source_code_ref": self.source_ref,
        })
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }
}
