//! 학생 정보 조회 의도 추출
//!
//! 규칙은 위에서부터 순서대로 시도되며 처음 일치한 규칙이 의도를 결정한다.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::StudentIntent;

/// 의도를 찾지 못했을 때 안내할 예시 질문
pub const STUDENT_EXAMPLES: [&str; 4] = [
    "내 정보 조회해주세요",
    "다인장 학생의 정보를 찾아주세요",
    "우리 학과 동기 통계 알려줘",
    "전체 학생 리스트를 보여주세요",
];

const PEER_MARKERS: &[&str] = &["통계", "평균", "동기", "몇 명", "몇명"];
const SELF_MARKERS: &[&str] = &["내 ", "내정보", "나의", "제 정보"];
const LISTING_MARKERS: &[&str] = &["전체", "모든", "리스트", "목록"];

/// 이름으로 오인되는 일반 단어
const NAME_STOPLIST: &[&str] = &[
    "학생", "정보", "전체", "모든", "우리", "같은", "다른", "신입", "재학", "졸업",
];

static STUDENT_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"학번\s*:?\s*([A-Za-z]*\d+)").expect("Invalid regex"));
static ADMISSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\s*년?\s*도?\s*입학").expect("Invalid regex"));
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w{2,})\s*학생").expect("Invalid regex"));

type Rule = fn(&str) -> Option<StudentIntent>;

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| text.contains(marker))
}

fn peer_statistics(text: &str) -> Option<StudentIntent> {
    contains_any(text, PEER_MARKERS).then_some(StudentIntent::PeerStatistics)
}

fn self_profile(text: &str) -> Option<StudentIntent> {
    let padded = format!("{} ", text);
    contains_any(&padded, SELF_MARKERS).then_some(StudentIntent::SelfProfile)
}

fn by_student_id(text: &str) -> Option<StudentIntent> {
    STUDENT_ID_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| StudentIntent::ById(m.as_str().to_string()))
}

fn admission_cohort(text: &str) -> Option<StudentIntent> {
    ADMISSION_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .map(StudentIntent::AdmissionCohort)
}

fn by_name(text: &str) -> Option<StudentIntent> {
    NAME_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|name| !NAME_STOPLIST.iter().any(|word| word == name))
        .map(|name| StudentIntent::ByName(name.to_string()))
}

fn listing(text: &str) -> Option<StudentIntent> {
    contains_any(text, LISTING_MARKERS).then_some(StudentIntent::Listing)
}

/// 학생 조회 의도 추출기
#[derive(Debug, Clone)]
pub struct StudentIntentExtractor {
    rules: Vec<(&'static str, Rule)>,
}

impl Default for StudentIntentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl StudentIntentExtractor {
    pub fn new() -> Self {
        Self {
            rules: vec![
                ("peer_statistics", peer_statistics as Rule),
                ("self_profile", self_profile as Rule),
                ("student_id", by_student_id as Rule),
                ("admission_cohort", admission_cohort as Rule),
                ("student_name", by_name as Rule),
                ("listing", listing as Rule),
            ],
        }
    }

    pub fn extract(&self, text: &str) -> Result<StudentIntent> {
        let text = text.trim();
        for (name, rule) in &self.rules {
            if let Some(intent) = rule(text) {
                tracing::debug!("Student rule '{}' matched: {:?}", name, intent);
                return Ok(intent);
            }
        }
        Err(AppError::ambiguous(STUDENT_EXAMPLES))
    }
}
