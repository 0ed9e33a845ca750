//! 저장소 계층
//!
//! 조회 계획을 실행하는 어댑터. 메모리 저장소와 SurrealDB를 지원한다.

pub mod executor;
pub mod factory;
pub mod memory;

#[cfg(feature = "surrealdb")]
pub mod surrealdb;

pub use executor::QueryExecutor;
pub use factory::StorageFactory;
pub use memory::{Dataset, MemoryStore};
