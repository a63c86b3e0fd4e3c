use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use common::StorageAppConfig;
use common::storage::FilesystemBlobStore;
use reqwest::Client;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tempfile::TempDir;

use server::config::{AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ServerConfig};
use server::image::{ImageService, SeaOrmImageRepository};
use server::state::AppState;
use server::utils::jwt;

const JWT_SECRET: &str = "test-secret-for-integration-tests";

pub mod routes {
    pub const IMAGES: &str = "/api/v1/images";
    pub const GALLERY_UPLOAD: &str = "/api/v1/images/gallery/upload";
    pub const DRAWING_UPLOAD: &str = "/api/v1/images/drawing/upload";

    pub fn image(id: i32) -> String {
        format!("/api/v1/images/{id}")
    }

    pub fn image_base64(id: i32) -> String {
        format!("/api/v1/images/base64/{id}")
    }

    pub fn image_content(id: i32) -> String {
        format!("/api/v1/images/{id}/content")
    }

    pub fn drawing_replace(id: i32) -> String {
        format!("/api/v1/images/drawing/upload/{id}")
    }
}

/// A running test server backed by a throwaway sqlite database and blob root.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub storage_root: PathBuf,
    _dir: TempDir,
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
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let db = server::database::init_db(&db_url)
            .await
            .expect("Failed to initialize test database");

        let storage = StorageAppConfig {
            root: dir.path().join("public"),
            base_url: "http://images.test".to_string(),
            ..Default::default()
        };

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig { url: db_url },
            auth: AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
            },
            storage: storage.clone(),
        };

        let store = FilesystemBlobStore::new(storage.root.clone(), storage.max_blob_size)
            .await
            .expect("Failed to create blob store");
        let images = ImageService::new(
            Arc::new(store),
            Arc::new(SeaOrmImageRepository::new(db.clone())),
            storage.clone(),
        )
        .expect("Failed to create image service");

        let state = AppState {
            images: Arc::new(images),
            config: Arc::new(app_config),
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
            storage_root: storage.root,
            _dir: dir,
        }
    }

    /// Token for `user_id`, signed with the server's secret.
    pub fn token(&self, user_id: i32) -> String {
        jwt::sign(user_id, &format!("user{user_id}"), JWT_SECRET).expect("Failed to sign token")
    }

    /// Absolute path of a stored blob.
    pub fn blob_file(&self, path: &str) -> PathBuf {
        self.storage_root.join(path)
    }

    pub fn url(&self, path: &str) -> String {
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

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
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

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Upload a gallery image through the multipart endpoint.
    pub async fn upload_gallery(
        &self,
        file_name: &str,
        file_bytes: Vec<u8>,
        uploaded_to: Option<i32>,
        token: &str,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name.to_string())
            .mime_str("image/png")
            .expect("Failed to set MIME type");
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(uploaded_to) = uploaded_to {
            form = form.text("uploaded_to", uploaded_to.to_string());
        }

        let res = self
            .client
            .post(self.url(routes::GALLERY_UPLOAD))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Create a drawing from base64 data and return its id.
    pub async fn create_drawing(&self, image: &str, token: &str) -> i32 {
        let res = self
            .post_with_token(
                routes::DRAWING_UPLOAD,
                &serde_json::json!({ "uploaded_to": 0, "image": image }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "drawing upload failed: {}", res.text);
        res.id()
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

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}
