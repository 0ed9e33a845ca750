//! 조건 추출기
//!
//! 자유 형식의 한국어 질문에서 강의 검색 조건을 뽑아낸다. 통계 모델이
//! 아니라 순서가 정해진 규칙 목록이다:
//! - 필드마다 처음 일치한 규칙이 이긴다
//! - 필드끼리는 서로 독립적으로 추출된다
//! - 아무 조건도 없으면 "이해하지 못함" 신호를 돌려준다

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{QueryConditions, TimeScope};

/// 조건이 없을 때 안내할 예시 질문
pub const COURSE_EXAMPLES: [&str; 6] = [
    "3학년 과목 중 한국역사학과 개설 강의 알려줘",
    "심리학 관련 강의 검색해줘",
    "김철수 교수의 강의를 알려줘",
    "소프트웨어학과 2학년 과목 알려줘",
    "컴퓨터 관련 강의 찾아줘",
    "다음 학기 개설 과목 알려줘",
];

/// 과목 키워드 사전. 앞에 있는 항목이 우선한다.
pub const SUBJECT_VOCABULARY: [&str; 18] = [
    "심리학",
    "심리",
    "수학",
    "영어",
    "물리학",
    "화학",
    "생물학",
    "역사",
    "철학",
    "경제학",
    "경영학",
    "컴퓨터",
    "프로그래밍",
    "데이터",
    "인공지능",
    "AI",
    "머신러닝",
    "통계",
];

/// 학과명으로 오인되는 일반 명사
const DEPARTMENT_STOPLIST: [&str; 4] = ["과목", "학과", "전공", "강의"];

const NEXT_PHRASES: &[&str] = &["다음 학기", "다음학기"];
const PREVIOUS_PHRASES: &[&str] = &[
    "지난 학기",
    "지난학기",
    "이전 학기",
    "이전학기",
    "저번 학기",
    "저번학기",
];
const CURRENT_PHRASES: &[&str] = &["이번 학기", "이번학기", "현재 학기", "현재학기"];
const ALL_PHRASES: &[&str] = &["전체", "모든"];

/// 앞에 숫자가 붙은 경우("2024학년도")는 학년이 아니다
static GRADE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)([1-4])학년").expect("Invalid regex"));
static DEPT_FULL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+학과)").expect("Invalid regex"));
static DEPT_SHORT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+과)").expect("Invalid regex"));
static DEPT_FULL_STEM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w{2,})학과").expect("Invalid regex"));
static DEPT_SHORT_STEM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w{2,})과").expect("Invalid regex"));
static PROFESSOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\s*교수").expect("Invalid regex"));

/// 규칙이 채우는 조건 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionField {
    Grade,
    Department,
    SubjectKeyword,
    Professor,
    TimeScope,
}

/// 규칙 하나가 추출한 값
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Grade(u8),
    Department(String),
    SubjectKeyword(String),
    Professor(String),
    TimeScope(TimeScope),
}

impl Extracted {
    pub fn field(&self) -> ConditionField {
        match self {
            Extracted::Grade(_) => ConditionField::Grade,
            Extracted::Department(_) => ConditionField::Department,
            Extracted::SubjectKeyword(_) => ConditionField::SubjectKeyword,
            Extracted::Professor(_) => ConditionField::Professor,
            Extracted::TimeScope(_) => ConditionField::TimeScope,
        }
    }
}

/// 규칙 종류
#[derive(Debug, Clone)]
enum MatcherKind {
    /// 정규식의 첫 캡처 그룹. `reject_next`가 바로 뒤에 오면 그 위치는 건너뛴다.
    Capture {
        pattern: &'static Lazy<Regex>,
        reject_next: Option<char>,
        stoplist: &'static [&'static str],
    },
    /// 사전 순서대로 포함 여부 확인
    Vocabulary(&'static [&'static str]),
    /// 구문 중 하나가 있으면 고정된 시간 범위
    Phrases {
        phrases: &'static [&'static str],
        scope: TimeScope,
    },
}

/// 태그가 붙은 추출 규칙
#[derive(Debug, Clone)]
pub struct Matcher {
    name: &'static str,
    field: ConditionField,
    kind: MatcherKind,
}

impl Matcher {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field(&self) -> ConditionField {
        self.field
    }

    /// 질문에 규칙을 적용
    pub fn apply(&self, text: &str) -> Option<Extracted> {
        match &self.kind {
            MatcherKind::Capture {
                pattern,
                reject_next,
                stoplist,
            } => {
                let captured = first_capture(pattern, text, *reject_next)?;
                if stoplist.iter().any(|word| *word == captured) {
                    return None;
                }
                self.wrap(captured)
            }
            MatcherKind::Vocabulary(words) => words
                .iter()
                .find(|word| text.contains(*word))
                .and_then(|word| self.wrap(word)),
            MatcherKind::Phrases { phrases, scope } => phrases
                .iter()
                .any(|phrase| text.contains(phrase))
                .then_some(Extracted::TimeScope(*scope)),
        }
    }

    fn wrap(&self, value: &str) -> Option<Extracted> {
        match self.field {
            ConditionField::Grade => value.parse().ok().map(Extracted::Grade),
            ConditionField::Department => Some(Extracted::Department(value.to_string())),
            ConditionField::SubjectKeyword => Some(Extracted::SubjectKeyword(value.to_string())),
            ConditionField::Professor => Some(Extracted::Professor(value.to_string())),
            ConditionField::TimeScope => None,
        }
    }
}

/// 첫 번째 허용 위치의 캡처 그룹 1
fn first_capture<'t>(pattern: &Regex, text: &'t str, reject_next: Option<char>) -> Option<&'t str> {
    pattern.captures_iter(text).find_map(|caps| {
        let whole = caps.get(0)?;
        if let Some(rejected) = reject_next {
            if text[whole.end()..].starts_with(rejected) {
                return None;
            }
        }
        caps.get(1).map(|m| m.as_str())
    })
}

fn capture(
    name: &'static str,
    field: ConditionField,
    pattern: &'static Lazy<Regex>,
    reject_next: Option<char>,
    stoplist: &'static [&'static str],
) -> Matcher {
    Matcher {
        name,
        field,
        kind: MatcherKind::Capture {
            pattern,
            reject_next,
            stoplist,
        },
    }
}

fn phrases(name: &'static str, phrases: &'static [&'static str], scope: TimeScope) -> Matcher {
    Matcher {
        name,
        field: ConditionField::TimeScope,
        kind: MatcherKind::Phrases { phrases, scope },
    }
}

/// 기본 규칙 목록 (순서가 곧 우선순위)
pub fn default_matchers() -> Vec<Matcher> {
    vec![
        capture("grade", ConditionField::Grade, &GRADE_PATTERN, None, &[]),
        capture(
            "department_full",
            ConditionField::Department,
            &DEPT_FULL_PATTERN,
            None,
            &DEPARTMENT_STOPLIST,
        ),
        capture(
            "department_short",
            ConditionField::Department,
            &DEPT_SHORT_PATTERN,
            Some('목'),
            &DEPARTMENT_STOPLIST,
        ),
        capture(
            "department_full_stem",
            ConditionField::Department,
            &DEPT_FULL_STEM_PATTERN,
            None,
            &DEPARTMENT_STOPLIST,
        ),
        capture(
            "department_short_stem",
            ConditionField::Department,
            &DEPT_SHORT_STEM_PATTERN,
            Some('목'),
            &DEPARTMENT_STOPLIST,
        ),
        Matcher {
            name: "subject_keyword",
            field: ConditionField::SubjectKeyword,
            kind: MatcherKind::Vocabulary(&SUBJECT_VOCABULARY),
        },
        capture("professor", ConditionField::Professor, &PROFESSOR_PATTERN, None, &[]),
        phrases("scope_next", NEXT_PHRASES, TimeScope::Next),
        phrases("scope_previous", PREVIOUS_PHRASES, TimeScope::Previous),
        phrases("scope_current", CURRENT_PHRASES, TimeScope::Current),
        phrases("scope_all", ALL_PHRASES, TimeScope::All),
    ]
}

/// 강의 검색 조건 추출기
#[derive(Debug, Clone)]
pub struct ConditionExtractor {
    matchers: Vec<Matcher>,
}

impl Default for ConditionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionExtractor {
    pub fn new() -> Self {
        Self {
            matchers: default_matchers(),
        }
    }

    /// 사용자 정의 규칙 목록으로 생성
    pub fn with_matchers(matchers: Vec<Matcher>) -> Self {
        Self { matchers }
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// 질문에서 조건 추출
    ///
    /// 아무 조건도 찾지 못하면 `AppError::ExtractionAmbiguous`를 돌려준다.
    pub fn extract(&self, text: &str) -> Result<QueryConditions> {
        let text = text.trim();
        let mut conditions = QueryConditions::default();

        for matcher in &self.matchers {
            if is_filled(&conditions, matcher.field) {
                continue;
            }
            if let Some(value) = matcher.apply(text) {
                tracing::debug!("Matcher '{}' extracted {:?}", matcher.name, value);
                fill(&mut conditions, value);
            }
        }

        if conditions.is_empty() {
            tracing::debug!("No condition extracted from query");
            return Err(AppError::ambiguous(COURSE_EXAMPLES));
        }

        Ok(conditions)
    }
}

fn is_filled(conditions: &QueryConditions, field: ConditionField) -> bool {
    match field {
        ConditionField::Grade => conditions.grade.is_some(),
        ConditionField::Department => conditions.department.is_some(),
        ConditionField::SubjectKeyword => conditions.subject_keyword.is_some(),
        ConditionField::Professor => conditions.professor.is_some(),
        ConditionField::TimeScope => conditions.time_scope.is_some(),
    }
}

fn fill(conditions: &mut QueryConditions, value: Extracted) {
    match value {
        Extracted::Grade(grade) => conditions.grade = Some(grade),
        Extracted::Department(department) => conditions.department = Some(department),
        Extracted::SubjectKeyword(keyword) => conditions.subject_keyword = Some(keyword),
        Extracted::Professor(professor) => conditions.professor = Some(professor),
        Extracted::TimeScope(scope) => conditions.time_scope = Some(scope),
    }
}
