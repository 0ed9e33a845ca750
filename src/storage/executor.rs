//! 조회 실행 trait

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{QueryPlan, Row};

/// 조회 계획 실행기
///
/// 실행, 연결 관리, 트랜잭션은 구현체가 책임진다. 결과 행의 키는 결과
/// 컬럼의 표시 이름이다.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// 조회 계획 실행
    async fn execute(&self, plan: &QueryPlan) -> Result<Vec<Row>>;

    /// 저장소 이름 (로그용)
    fn backend(&self) -> &'static str;
}
