//! Haksa - 한국어 학사 질의 변환
//!
//! 자연어 질문을 학기 달력, 조건 추출, 접근 범위 검사를 거쳐 바인딩 파라미터
//! 기반의 구조화된 조회로 바꾸고, 결과를 사람이 읽는 텍스트로 돌려준다.

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;
