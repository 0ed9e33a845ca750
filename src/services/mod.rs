//! 서비스 모듈
//!
//! 질문 텍스트를 조회 계획으로 바꾸고 결과를 텍스트로 돌려주는 구성 요소.

pub mod calendar;
pub mod extractor;
pub mod formatter;
pub mod pipeline;
pub mod query_builder;
pub mod student_intent;

pub use calendar::SemesterCalendar;
pub use extractor::{ConditionExtractor, ConditionField, Extracted, Matcher};
pub use formatter::{DisplayMode, ResultFormatter};
pub use pipeline::{Domain, QueryPipeline};
pub use query_builder::{BuilderSettings, QueryBuilder};
pub use student_intent::StudentIntentExtractor;
