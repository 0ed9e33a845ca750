//! 조회 결과 포맷터
//!
//! 저장소가 돌려준 행을 사람이 읽는 텍스트로 바꾼다. 행의 키는 결과 컬럼의
//! 표시 이름이다.

use serde_json::Value;

use crate::models::Row;

/// 결과가 없을 때 메시지
pub const NO_DATA_MESSAGE: &str = "조회된 데이터가 없습니다.";
pub const NO_COURSE_MESSAGE: &str = "조회된 강의가 없습니다.";

/// 표시 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// 강의 목록
    Course,
    /// 학생 정보
    Student,
    /// 집계 결과
    Statistics,
}

impl DisplayMode {
    fn header(&self) -> &'static str {
        match self {
            DisplayMode::Course => "=== 강의 정보 ===",
            DisplayMode::Student => "=== 학생 정보 ===",
            DisplayMode::Statistics => "=== 통계 정보 ===",
        }
    }

    fn empty_message(&self) -> &'static str {
        match self {
            DisplayMode::Course => NO_COURSE_MESSAGE,
            _ => NO_DATA_MESSAGE,
        }
    }
}

/// 값 표시. null은 `None`.
fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// 값이 비어 있지 않은 컬럼
fn present(row: &Row, key: &str) -> Option<String> {
    row.get(key)
        .and_then(render_value)
        .filter(|value| !value.is_empty())
}

/// 조회 결과 포맷터
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultFormatter;

impl ResultFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(&self, rows: &[Row], mode: DisplayMode) -> String {
        match rows {
            [] => mode.empty_message().to_string(),
            [row] => Self::format_single(row, mode),
            _ => match mode {
                DisplayMode::Course => Self::format_courses(rows),
                _ => Self::format_generic(rows),
            },
        }
    }

    fn format_single(row: &Row, mode: DisplayMode) -> String {
        let mut output = format!("{}\n", mode.header());
        for (key, value) in row {
            if let Some(value) = render_value(value) {
                output.push_str(&format!("{}: {}\n", key, value));
            }
        }
        output
    }

    fn format_courses(rows: &[Row]) -> String {
        let lines: Vec<String> = rows
            .iter()
            .enumerate()
            .map(|(i, course)| {
                let mut line = format!(
                    "{}. [{}] {}",
                    i + 1,
                    present(course, "과목코드").unwrap_or_else(|| "N/A".to_string()),
                    present(course, "과목명").unwrap_or_else(|| "N/A".to_string()),
                );
                if let Some(credits) = present(course, "학점") {
                    line.push_str(&format!(" ({}학점)", credits));
                }
                if let Some(department) = present(course, "개설학과") {
                    line.push_str(&format!(" - {}", department));
                }
                if let Some(professor) = present(course, "교수") {
                    line.push_str(&format!(" - {} 교수", professor));
                }
                if let Some(grade) = present(course, "대상학년") {
                    if grade.ends_with("학년") {
                        line.push_str(&format!(" - {}", grade));
                    } else {
                        line.push_str(&format!(" - {}학년", grade));
                    }
                }
                line
            })
            .collect();

        format!("조회된 강의 ({}개):\n{}", rows.len(), lines.join("\n"))
    }

    fn format_generic(rows: &[Row]) -> String {
        let lines: Vec<String> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let pairs: Vec<String> = row
                    .iter()
                    .filter_map(|(key, value)| {
                        render_value(value).map(|value| format!("{}: {}", key, value))
                    })
                    .collect();
                format!("{}. {}", i + 1, pairs.join(", "))
            })
            .collect();

        format!("조회 결과:\n{}", lines.join("\n"))
    }
}
