//! 질문에서 추출한 조건 모델

use serde::{Deserialize, Serialize};
use std::fmt;

/// 시간 범위
///
/// `QueryConditions::time_scope`가 `None`이면 시간 조건이 없는 것이고,
/// `All`은 "전체"를 명시적으로 요청한 것이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeScope {
    Current,
    Next,
    Previous,
    All,
}

impl fmt::Display for TimeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeScope::Current => write!(f, "current"),
            TimeScope::Next => write!(f, "next"),
            TimeScope::Previous => write!(f, "previous"),
            TimeScope::All => write!(f, "all"),
        }
    }
}

/// 강의 검색 조건
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConditions {
    /// 대상 학년 (1~4)
    pub grade: Option<u8>,
    /// 개설 학과
    pub department: Option<String>,
    /// 과목 키워드
    pub subject_keyword: Option<String>,
    /// 담당 교수
    pub professor: Option<String>,
    /// 시간 범위
    pub time_scope: Option<TimeScope>,
}

impl QueryConditions {
    /// 추출된 조건이 하나도 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.grade.is_none()
            && self.department.is_none()
            && self.subject_keyword.is_none()
            && self.professor.is_none()
            && self.time_scope.is_none()
    }
}

/// 학생 정보 조회 의도
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum StudentIntent {
    /// 본인 정보
    SelfProfile,
    /// 학번으로 조회
    ById(String),
    /// 이름으로 조회
    ByName(String),
    /// 입학년도별 조회
    AdmissionCohort(i32),
    /// 같은 전공·입학년도 학생 통계
    PeerStatistics,
    /// 전체 목록
    Listing,
}
