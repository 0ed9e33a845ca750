//! 학기 달력
//!
//! 날짜를 학사 학기 좌표로 변환한다. 1학기는 3월 ~ 6월 20일,
//! 2학기는 9월 ~ 12월 20일이며 나머지는 방학이다.

use chrono::{Datelike, Local, NaiveDate};

use crate::models::{SemesterCoordinate, SemesterInfo, Term};

/// 학기 종료일 (6월, 12월)
const TERM_END_DAY: u32 = 20;

/// 날짜가 속한 기간
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    FirstTerm,
    SecondTerm,
    WinterBreak,
    SummerBreak,
    YearEndBreak,
}

fn period_of(month: u32, day: u32) -> Period {
    match month {
        3..=5 => Period::FirstTerm,
        6 if day <= TERM_END_DAY => Period::FirstTerm,
        9..=11 => Period::SecondTerm,
        12 if day <= TERM_END_DAY => Period::SecondTerm,
        1 | 2 => Period::WinterBreak,
        6..=8 => Period::SummerBreak,
        _ => Period::YearEndBreak,
    }
}

/// 학기 달력
///
/// 기준 날짜는 항상 인자로 받는다. 시스템 시계는 `today()`에서만 읽는다.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemesterCalendar;

impl SemesterCalendar {
    pub fn new() -> Self {
        Self
    }

    /// 현재/다음/지난 학기 계산
    pub fn resolve(&self, date: NaiveDate) -> SemesterInfo {
        let year = date.year();
        let (current, next, previous) = match period_of(date.month(), date.day()) {
            Period::FirstTerm => (
                SemesterCoordinate::new(year, Term::First),
                SemesterCoordinate::new(year, Term::Second),
                SemesterCoordinate::new(year - 1, Term::Second),
            ),
            Period::SecondTerm => (
                SemesterCoordinate::new(year, Term::Second),
                SemesterCoordinate::new(year + 1, Term::First),
                SemesterCoordinate::new(year, Term::First),
            ),
            Period::WinterBreak => (
                SemesterCoordinate::vacation(year),
                SemesterCoordinate::new(year, Term::First),
                SemesterCoordinate::new(year - 1, Term::Second),
            ),
            Period::SummerBreak => (
                SemesterCoordinate::vacation(year),
                SemesterCoordinate::new(year, Term::Second),
                SemesterCoordinate::new(year, Term::First),
            ),
            Period::YearEndBreak => (
                SemesterCoordinate::vacation(year),
                SemesterCoordinate::new(year + 1, Term::First),
                SemesterCoordinate::new(year, Term::Second),
            ),
        };

        SemesterInfo {
            today: date,
            current,
            next,
            previous,
        }
    }

    /// 오늘 날짜 기준 학기 정보
    pub fn today(&self) -> SemesterInfo {
        self.resolve(Local::now().date_naive())
    }
}
