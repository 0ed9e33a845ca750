use crate::config::config::{AppConfig, DatabaseType};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 환경 변수 접두사
pub const ENV_PREFIX: &str = "HAKSA_";

/// 설정 로더
pub struct ConfigLoader;

impl ConfigLoader {
    /// 기본 경로에서 설정 로드
    ///
    /// 우선순위:
    /// 1. 개발 환경 기본값
    /// 2. ./haksa.toml
    /// 3. `HAKSA_` 환경 변수 (`__`로 섹션 구분)
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 지정한 경로에서 설정 로드
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::development()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// 설정 검증
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.query.course_limit == 0 || config.query.student_limit == 0 {
            return Err(ConfigValidationError::InvalidLimit);
        }

        if config.query.max_query_length == 0 {
            return Err(ConfigValidationError::InvalidQueryLength);
        }

        match config.database.db_type {
            DatabaseType::SurrealDB if config.database.url.is_empty() => {
                Err(ConfigValidationError::MissingDatabaseUrl)
            }
            DatabaseType::Memory => match &config.database.fixture_path {
                Some(path) if !path.exists() => Err(ConfigValidationError::InvalidPath(
                    path.display().to_string(),
                )),
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

/// 설정 검증 오류
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("조회 결과 상한이 올바르지 않습니다. 0보다 커야 합니다")]
    InvalidLimit,

    #[error("질문 최대 길이가 올바르지 않습니다. 0보다 커야 합니다")]
    InvalidQueryLength,

    #[error("데이터베이스 연결 URL이 설정되지 않았습니다")]
    MissingDatabaseUrl,

    #[error("설정 경로가 올바르지 않습니다: {0}")]
    InvalidPath(String),
}

impl From<ConfigValidationError> for crate::error::AppError {
    fn from(e: ConfigValidationError) -> Self {
        crate::error::AppError::Config(e.to_string())
    }
}

/// 기본 설정 파일 경로
pub fn default_config_path() -> PathBuf {
    PathBuf::from("haksa.toml")
}

/// 설정 파일 존재 여부
pub fn config_exists() -> bool {
    default_config_path().exists()
}
