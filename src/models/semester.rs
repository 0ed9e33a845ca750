//! 학기 좌표 모델

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 학기 구분
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// 1학기 (3월 ~ 6월 20일)
    #[serde(rename = "1")]
    First,
    /// 2학기 (9월 ~ 12월 20일)
    #[serde(rename = "2")]
    Second,
}

impl Term {
    /// 저장소의 offered_semester 값
    pub fn number(self) -> i64 {
        match self {
            Term::First => 1,
            Term::Second => 2,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// (연도, 학기) 좌표. `term`이 `None`이면 방학 기간이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SemesterCoordinate {
    pub year: i32,
    pub term: Option<Term>,
}

impl SemesterCoordinate {
    pub fn new(year: i32, term: Term) -> Self {
        Self {
            year,
            term: Some(term),
        }
    }

    pub fn vacation(year: i32) -> Self {
        Self { year, term: None }
    }

    pub fn is_vacation(&self) -> bool {
        self.term.is_none()
    }
}

impl fmt::Display for SemesterCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term {
            Some(term) => write!(f, "{}년 {}학기", self.year, term),
            None => write!(f, "방학 기간"),
        }
    }
}

/// 기준 날짜에 대한 학기 해석 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemesterInfo {
    /// 기준 날짜
    pub today: NaiveDate,
    /// 현재 학기 (방학이면 term = None)
    pub current: SemesterCoordinate,
    /// 다음 학기 (항상 학기)
    pub next: SemesterCoordinate,
    /// 지난 학기 (항상 학기)
    pub previous: SemesterCoordinate,
}

impl SemesterInfo {
    /// 상담 에이전트에 넘겨줄 현재 날짜 안내문
    pub fn banner(&self) -> String {
        let status = if self.current.is_vacation() {
            "방학 기간"
        } else {
            "학기 중"
        };
        format!(
            "📅 현재 날짜 정보:\n\
             - 오늘 날짜: {}\n\
             - 현재 학기: {}\n\
             - 다음 학기: {}\n\
             - 지난 학기: {}\n\
             - 현재는 {}입니다.",
            self.today.format("%Y-%m-%d"),
            self.current,
            self.next,
            self.previous,
            status
        )
    }
}
