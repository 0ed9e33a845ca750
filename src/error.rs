//! 오류 처리 모듈
//!
//! 애플리케이션 오류 타입과 사용자 메시지 매핑을 정의한다.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 애플리케이션 오류 타입
#[derive(Error, Debug)]
pub enum AppError {
    /// 질문에서 조건을 하나도 추출하지 못함
    #[error("조건을 추출할 수 없습니다")]
    ExtractionAmbiguous {
        /// 사용자에게 보여줄 예시 질문
        examples: Vec<String>,
    },

    /// 접근 범위 검사에서 거부됨
    #[error("접근이 거부되었습니다: {reason}")]
    ScopeDenied { reason: String },

    /// 허용되지 않은 테이블을 참조하는 직접 쿼리
    #[error("{allowed} 테이블만 사용할 수 있습니다.")]
    EntityNotPermitted { allowed: String },

    /// 조건은 있으나 추가 정보가 필요함
    #[error("{0}")]
    Clarification(String),

    /// 저장소 실행 실패
    #[error("데이터베이스 오류: {0}")]
    StorageExecutionFailed(String),

    /// 연결 오류
    #[error("연결 오류: {0}")]
    Connection(String),

    /// 입력 검증 오류
    #[error("입력 검증 실패: {0}")]
    Validation(String),

    /// 설정 오류
    #[error("설정 오류: {0}")]
    Config(String),

    /// 직렬화 오류
    #[error("직렬화 오류: {0}")]
    Serialization(String),

    /// 내부 오류
    #[error("내부 오류: {0}")]
    Internal(String),

    /// IO 오류
    #[error("IO 오류: {0}")]
    Io(String),
}

impl AppError {
    /// 조건 추출 실패 오류 생성
    pub fn ambiguous<I, S>(examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AppError::ExtractionAmbiguous {
            examples: examples.into_iter().map(Into::into).collect(),
        }
    }

    /// 접근 거부 오류 생성
    pub fn denied(reason: impl Into<String>) -> Self {
        AppError::ScopeDenied {
            reason: reason.into(),
        }
    }

    /// 안정적인 오류 코드
    pub fn code(&self) -> &'static str {
        let (_, code): (&'static str, &'static str) = self.into();
        code
    }

    /// 사용자에게 그대로 전달되는 메시지
    ///
    /// 모든 실패 경로는 여기서 문자열이 된다. 저장소 오류는 원인을 감싸서
    /// 일반적인 데이터 접근 오류로 보고한다.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ExtractionAmbiguous { examples } => {
                let mut message = String::from("질문을 이해하지 못했습니다. 다음과 같이 질문해 주세요:\n");
                for example in examples {
                    message.push_str("- '");
                    message.push_str(example);
                    message.push_str("'\n");
                }
                message.trim_end().to_string()
            }
            AppError::ScopeDenied { reason } => format!("조회가 거부되었습니다: {}", reason),
            AppError::EntityNotPermitted { .. } | AppError::Clarification(_) => self.to_string(),
            AppError::Validation(_) => self.to_string(),
            AppError::StorageExecutionFailed(_) | AppError::Connection(_) => self.to_string(),
            _ => "요청을 처리하는 중 오류가 발생했습니다.".to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

#[cfg(feature = "surrealdb")]
impl From<surrealdb::Error> for AppError {
    fn from(e: surrealdb::Error) -> Self {
        AppError::StorageExecutionFailed(e.to_string())
    }
}

/// 오류 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 오류 코드
    pub code: String,
    /// 오류 메시지
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.user_message(),
        }
    }
}

/// 오류 분류 코드 매핑
impl From<&AppError> for (&'static str, &'static str) {
    fn from(err: &AppError) -> (&'static str, &'static str) {
        match err {
            AppError::ExtractionAmbiguous { .. } => ("recoverable", "EXTRACTION_AMBIGUOUS"),
            AppError::Clarification(_) => ("recoverable", "CLARIFICATION_NEEDED"),
            AppError::ScopeDenied { .. } => ("policy", "SCOPE_DENIED"),
            AppError::EntityNotPermitted { .. } => ("policy", "ENTITY_NOT_PERMITTED"),
            AppError::Validation(_) => ("input", "BAD_REQUEST"),
            AppError::StorageExecutionFailed(_) => ("storage", "STORAGE_EXECUTION_FAILED"),
            AppError::Connection(_) => ("storage", "SERVICE_UNAVAILABLE"),
            _ => ("internal", "INTERNAL_ERROR"),
        }
    }
}

/// 결과 타입 별칭
pub type Result<T> = std::result::Result<T, AppError>;
