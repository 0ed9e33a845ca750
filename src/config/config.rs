use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::services::query_builder::BuilderSettings;

/// 저장소 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// 메모리 저장소 (JSON 데이터 파일)
    #[default]
    Memory,
    /// SurrealDB
    SurrealDB,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::Memory => write!(f, "memory"),
            DatabaseType::SurrealDB => write!(f, "surrealdb"),
        }
    }
}

/// 데이터베이스 설정
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 저장소 종류
    pub db_type: DatabaseType,
    /// SurrealDB 연결 주소
    pub url: String,
    /// 네임스페이스
    pub namespace: String,
    /// 데이터베이스 이름
    pub database: String,
    /// 사용자 이름
    pub username: String,
    /// 비밀번호
    pub password: String,
    /// 메모리 저장소 데이터 파일
    pub fixture_path: Option<PathBuf>,
}

/// 조회 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// 강의 검색 결과 상한
    pub course_limit: usize,
    /// 학생 조회 결과 상한
    pub student_limit: usize,
    /// 전 학년 대상 표시 값
    pub grade_sentinels: Vec<String>,
    /// 질문 최대 길이 (문자 수)
    pub max_query_length: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        let builder = BuilderSettings::default();
        Self {
            course_limit: builder.course_limit,
            student_limit: builder.student_limit,
            grade_sentinels: builder.grade_sentinels,
            max_query_length: 500,
        }
    }
}

impl QueryConfig {
    pub fn builder_settings(&self) -> BuilderSettings {
        BuilderSettings {
            course_limit: self.course_limit,
            student_limit: self.student_limit,
            grade_sentinels: self.grade_sentinels.clone(),
        }
    }
}

/// 호출자 신원 설정
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IdentityConfig {
    /// 기본 학번 (`HAKSA_STUDENT_KEY`로 덮어쓸 수 있음)
    pub student_key: Option<String>,
}

/// 로그 설정
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 구조화(JSON) 로그
    pub structured: bool,
    /// 로그 파일 디렉터리
    pub log_dir: Option<PathBuf>,
}

/// 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 조회 설정
    pub query: QueryConfig,
    /// 신원 설정
    pub identity: IdentityConfig,
    /// 로그 설정
    pub logging: LoggingConfig,
    /// 애플리케이션 이름
    pub app_name: String,
    /// 환경
    pub environment: String,
}

impl AppConfig {
    /// 개발 환경 설정
    pub fn development() -> Self {
        Self {
            database: DatabaseConfig {
                db_type: DatabaseType::Memory,
                url: "ws://localhost:8000".into(),
                namespace: "haksa".into(),
                database: "academic".into(),
                username: "root".into(),
                password: "root".into(),
                fixture_path: Some(PathBuf::from("./fixtures/sample_data.json")),
            },
            query: QueryConfig::default(),
            identity: IdentityConfig::default(),
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            app_name: "haksa".into(),
            environment: "development".into(),
        }
    }

    /// 운영 환경 설정
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.database.db_type = DatabaseType::SurrealDB;
        config.database.fixture_path = None;
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.logging.log_dir = Some(PathBuf::from("./logs"));
        config
    }
}
