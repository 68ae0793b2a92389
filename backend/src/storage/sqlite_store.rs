use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

use super::image_store::{ImageStore, NewImage, StoreError, UploadedImage};

const CREATE_IMAGES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS uploaded_images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_name TEXT NOT NULL,
        content_type TEXT NOT NULL,
        sha256 TEXT NOT NULL,
        image_data BLOB NOT NULL,
        uploaded_at TEXT NOT NULL,
        owner_id INTEGER,
        subject_id INTEGER
    )
"#;

#[derive(Clone)]
pub struct SqliteImageStore {
    pool: SqlitePool,
}

impl SqliteImageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database and ensures the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(8);
        if database_url.contains(":memory:") {
            // each in-memory connection is its own database
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }
        let pool = pool_options.connect_with(options).await?;
        let store = Self::new(pool);
        store.migrate().await?;
        log::info!("Image store ready at {}", database_url);
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_IMAGES_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ImageStore for SqliteImageStore {
    async fn save(&self, image: NewImage) -> Result<UploadedImage, StoreError> {
        if image.image_data.is_empty() {
            return Err(StoreError::EmptyImage);
        }
        let uploaded_at = chrono::Utc::now();
        let sha256 = image.sha256();

        let result = sqlx::query(
            r#"
            INSERT INTO uploaded_images
                (file_name, content_type, sha256, image_data, uploaded_at, owner_id, subject_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&image.file_name)
        .bind(&image.content_type)
        .bind(&sha256)
        .bind(&image.image_data)
        .bind(uploaded_at)
        .bind(image.owner_id)
        .bind(image.subject_id)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        log::debug!("Stored image {} ({} bytes)", id, image.image_data.len());
        Ok(image.into_record(id, uploaded_at))
    }

    async fn get(&self, id: i64) -> Result<Option<UploadedImage>, StoreError> {
        let record = sqlx::query_as::<_, UploadedImage>(
            r#"
            SELECT id, file_name, content_type, sha256, image_data, uploaded_at, owner_id, subject_id
            FROM uploaded_images WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}
