//! 핵심 데이터 모델 모듈
//!
//! 학기 좌표, 추출 조건, 조회 요청, 접근 결정 등 요청 단위로 생성되고
//! 응답 후 버려지는 값들을 정의한다.

pub mod access;
pub mod conditions;
pub mod query_spec;
pub mod schema;
pub mod semester;

pub use access::*;
pub use conditions::*;
pub use query_spec::*;
pub use semester::*;
