//! 설정 관리 모듈
//!
//! TOML 설정 파일과 환경 변수 덮어쓰기를 지원한다.

pub mod config;
pub mod loader;

pub use config::{AppConfig, DatabaseConfig, DatabaseType, IdentityConfig, LoggingConfig, QueryConfig};
pub use loader::{ConfigLoader, ConfigValidationError};
