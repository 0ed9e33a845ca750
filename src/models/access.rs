//! 호출자 신원과 접근 결정 모델

use serde::{Deserialize, Serialize};
use std::fmt;

use super::query_spec::QueryPlan;

/// 호출자 신원
///
/// 본인 조회에만 학번이 필요하다. 강의 검색은 신원 없이 가능하다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub authenticated_student_key: Option<String>,
}

impl Identity {
    pub fn student(key: impl Into<String>) -> Self {
        Self {
            authenticated_student_key: Some(key.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 비어 있지 않은 학번
    pub fn student_key(&self) -> Option<&str> {
        self.authenticated_student_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// 인증된 호출자 본인의 학적 속성
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerProfile {
    pub student_id: String,
    pub name: String,
    pub major_code: String,
    pub admission_year: i32,
}

/// 접근 범위 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessScope {
    /// 공개 카탈로그
    Unscoped,
    /// 본인 행만
    SelfScoped,
    /// 같은 전공·입학년도 집계만
    PeerAggregateScoped,
    /// 거부 (종료 상태)
    Denied,
}

impl fmt::Display for AccessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessScope::Unscoped => write!(f, "unscoped"),
            AccessScope::SelfScoped => write!(f, "self_scoped"),
            AccessScope::PeerAggregateScoped => write!(f, "peer_aggregate_scoped"),
            AccessScope::Denied => write!(f, "denied"),
        }
    }
}

/// 접근 결정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub scope: AccessScope,
    pub narrowed_plan: Option<QueryPlan>,
    pub denial_reason: Option<String>,
}

impl AccessDecision {
    pub fn allow(scope: AccessScope, plan: QueryPlan) -> Self {
        Self {
            allowed: true,
            scope,
            narrowed_plan: Some(plan),
            denial_reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            scope: AccessScope::Denied,
            narrowed_plan: None,
            denial_reason: Some(reason.into()),
        }
    }
}
