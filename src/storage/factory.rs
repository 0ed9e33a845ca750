//! 저장소 팩토리
//!
//! 설정에 따라 조회 실행기를 만든다.

use crate::config::{DatabaseConfig, DatabaseType};
use crate::error::{AppError, Result};
use crate::storage::executor::QueryExecutor;
use crate::storage::memory::MemoryStore;
use std::sync::Arc;

#[cfg(feature = "surrealdb")]
use crate::storage::surrealdb::{SurrealExecutor, SurrealPool};

/// 저장소 팩토리
pub struct StorageFactory;

impl StorageFactory {
    /// 설정에 맞는 실행기 생성
    pub async fn create(config: &DatabaseConfig) -> Result<Arc<dyn QueryExecutor>> {
        match config.db_type {
            DatabaseType::Memory => Self::create_memory(config).await,
            DatabaseType::SurrealDB => Self::create_surrealdb(config).await,
        }
    }

    async fn create_memory(config: &DatabaseConfig) -> Result<Arc<dyn QueryExecutor>> {
        let store = match &config.fixture_path {
            Some(path) => MemoryStore::from_file(path).await?,
            None => {
                tracing::warn!("No fixture configured, memory store starts empty");
                MemoryStore::new()
            }
        };
        Ok(Arc::new(store))
    }

    #[cfg(feature = "surrealdb")]
    async fn create_surrealdb(config: &DatabaseConfig) -> Result<Arc<dyn QueryExecutor>> {
        let pool = SurrealPool::new(config)
            .await
            .map_err(|e| AppError::Connection(e.to_string()))?;
        tracing::info!("Connected to SurrealDB at {}", config.url);
        Ok(Arc::new(SurrealExecutor::new(Arc::new(pool))))
    }

    #[cfg(not(feature = "surrealdb"))]
    async fn create_surrealdb(_config: &DatabaseConfig) -> Result<Arc<dyn QueryExecutor>> {
        Err(AppError::Config(
            "SurrealDB feature is not enabled. Enable 'surrealdb' feature to use SurrealDB."
                .into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_memory_store_from_fixture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"courses": [{{"course_code": "C1"}}]}}"#).unwrap();

        let config = DatabaseConfig {
            db_type: DatabaseType::Memory,
            fixture_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let executor = StorageFactory::create(&config).await.unwrap();
        assert_eq!(executor.backend(), "memory");
    }

    #[tokio::test]
    async fn test_missing_fixture_is_an_error() {
        let config = DatabaseConfig {
            db_type: DatabaseType::Memory,
            fixture_path: Some("/nonexistent/fixture.json".into()),
            ..Default::default()
        };
        assert!(StorageFactory::create(&config).await.is_err());
    }
}
