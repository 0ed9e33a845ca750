//! Query Validation Module
//!
//! Sanitizes free-form question text before it reaches the extractors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;

/// Validation error types
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("질문을 입력해주세요.")]
    Empty,

    #[error("질문이 너무 깁니다 (최대 {max}자, 입력 {got}자)")]
    TooLong { max: usize, got: usize },
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Validation result type
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Question text validator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryValidator {
    /// Maximum question length in characters
    max_length: usize,
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryValidator {
    /// Create new validator
    pub fn new() -> Self {
        Self { max_length: 500 }
    }

    /// Set maximum question length
    pub fn with_max_length(mut self, length: usize) -> Self {
        self.max_length = length;
        self
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Sanitize string input
    pub fn sanitize_string(input: &str) -> String {
        // Whitespace controls become spaces, other control characters are removed
        input
            .trim()
            .chars()
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .filter(|c| !c.is_control())
            .collect()
    }

    /// Sanitize and validate a question, returning the cleaned text
    pub fn validate(&self, input: &str) -> ValidationResult<String> {
        let cleaned = Self::sanitize_string(input);
        let cleaned = cleaned.trim();

        if cleaned.is_empty() {
            return Err(ValidationError::Empty);
        }

        let length = cleaned.chars().count();
        if length > self.max_length {
            return Err(ValidationError::TooLong {
                max: self.max_length,
                got: length,
            });
        }

        Ok(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_control_characters() {
        let validator = QueryValidator::new();
        let cleaned = validator.validate("  다음 학기\u{0}\t강의\r\n").unwrap();
        assert_eq!(cleaned, "다음 학기 강의");
    }

    #[test]
    fn test_line_breaks_keep_words_apart() {
        let validator = QueryValidator::new();
        let cleaned = validator.validate("SELECT *\nFROM\tcourses\r\nLIMIT 2").unwrap();
        assert_eq!(cleaned, "SELECT * FROM courses  LIMIT 2");
    }

    #[test]
    fn test_rejects_empty_input() {
        let validator = QueryValidator::new();
        assert_eq!(validator.validate("   "), Err(ValidationError::Empty));
        assert_eq!(validator.validate("\u{7}"), Err(ValidationError::Empty));
    }

    #[test]
    fn test_length_counts_characters() {
        let validator = QueryValidator::new().with_max_length(4);
        assert!(validator.validate("심리학과").is_ok());
        assert_eq!(
            validator.validate("심리학과 강의"),
            Err(ValidationError::TooLong { max: 4, got: 7 })
        );
    }

    #[test]
    fn test_validation_error_becomes_app_error() {
        let err: AppError = ValidationError::Empty.into();
        assert_eq!(err.code(), "BAD_REQUEST");
        assert_eq!(err.user_message(), "입력 검증 실패: 질문을 입력해주세요.");
    }
}
