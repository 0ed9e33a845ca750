//! 조회 요청 빌더
//!
//! 추출된 조건을 바인딩 파라미터만 사용하는 `QuerySpec`으로 바꾼다.
//! 조건 하나는 술어 하나가 되고 술어끼리는 AND로 결합된다.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::schema::{TABLES, courses, major, students};
use crate::models::{
    AggregateColumn, FieldFilter, PassThroughQuery, Predicate, Projection, QueryConditions,
    QueryPlan, QuerySpec, ResultShape, SemesterCoordinate, SemesterInfo, StudentIntent,
    TargetEntity, TimeScope,
};
use crate::services::extractor::ConditionExtractor;
use crate::services::student_intent::StudentIntentExtractor;

static SELECT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*select\b").expect("Invalid regex"));
static WRITE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(insert|update|upsert|delete|create|relate|remove|define|let|live|kill|begin|commit|cancel)\b|type::",
    )
    .expect("Invalid regex")
});

/// 직접 쿼리가 단일 조회문이 아닐 때
pub const SINGLE_SELECT_MESSAGE: &str = "직접 쿼리는 단일 SELECT 문만 허용됩니다.";

/// 빌더 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderSettings {
    /// 강의 검색 결과 상한
    pub course_limit: usize,
    /// 학생 조회 결과 상한
    pub student_limit: usize,
    /// "전 학년 수강 가능"을 뜻하는 대상학년 값
    pub grade_sentinels: Vec<String>,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            course_limit: 30,
            student_limit: 10,
            grade_sentinels: vec!["전체".to_string(), "전학년".to_string()],
        }
    }
}

/// 대상별로 직접 조회를 허용하는 테이블
pub fn allowed_tables(target: TargetEntity) -> &'static [&'static str] {
    match target {
        TargetEntity::Course => &[courses::TABLE],
        TargetEntity::Student => &[students::TABLE, major::TABLE],
    }
}

/// 테이블 이름이 단어 단위로 등장하는지 확인
fn names_table(statement: &str, table: &str) -> bool {
    let pattern = format!(r"(?i)\b{}\b", regex::escape(table));
    Regex::new(&pattern)
        .map(|re| re.is_match(statement))
        .unwrap_or(false)
}

fn course_projection() -> Vec<Projection> {
    vec![
        Projection::new(courses::COURSE_CODE, "과목코드"),
        Projection::new(courses::COURSE_NAME, "과목명"),
        Projection::new(courses::CREDITS, "학점"),
        Projection::new(courses::COURSE_TYPE, "과목구분"),
        Projection::new(courses::DEPARTMENT, "개설학과"),
        Projection::new(courses::PROFESSOR, "교수"),
        Projection::new(courses::TARGET_GRADE, "대상학년"),
        Projection::new(courses::NOTE, "비고"),
    ]
}

fn student_projection() -> Vec<Projection> {
    vec![
        Projection::new(students::NAME, "학생이름"),
        Projection::new(students::STUDENT_ID, "학번"),
        Projection::new(students::COMPLETED_SEMESTER, "이수학기"),
        Projection::new(students::ADMISSION_YEAR, "입학년도"),
        Projection::new(major::MAJOR_NAME, "전공명").with_fallback("전공정보없음"),
        Projection::new(major::DEPARTMENT, "학과").with_fallback("학과정보없음"),
        Projection::new(major::COLLEGE, "단과대학").with_fallback("단과대학정보없음"),
    ]
}

/// 동기 통계에 허용되는 집계 컬럼
pub fn peer_aggregate_columns() -> Vec<AggregateColumn> {
    vec![
        AggregateColumn::count("학생수"),
        AggregateColumn::avg(students::COMPLETED_SEMESTER, "평균이수학기"),
    ]
}

/// 조회 요청 빌더
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    settings: BuilderSettings,
}

impl QueryBuilder {
    pub fn new(settings: BuilderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &BuilderSettings {
        &self.settings
    }

    /// 직접 작성된 조회문 감지
    ///
    /// `SELECT`로 시작하지 않으면 `None`. 끝의 `;` 하나를 제외한 문장 구분자나
    /// 쓰기 키워드가 있으면 검증 오류다. 허용된 테이블을 단어 단위로 포함하고
    /// 다른 스키마 테이블은 하나도 언급하지 않을 때만 그대로 통과시키며,
    /// 아니면 `EntityNotPermitted`를 돌려준다. 조건을 다시 해석하지는 않는다.
    pub fn detect_pass_through(&self, text: &str, target: TargetEntity) -> Option<Result<QueryPlan>> {
        if !SELECT_PREFIX.is_match(text) {
            return None;
        }

        let statement = text.trim().trim_end_matches(';').trim_end();
        if statement.contains(';') || WRITE_KEYWORDS.is_match(statement) {
            return Some(Err(AppError::Validation(SINGLE_SELECT_MESSAGE.to_string())));
        }

        let tables = allowed_tables(target);
        let names_allowed = tables.iter().any(|table| names_table(statement, table));
        let names_other = TABLES
            .iter()
            .filter(|table| !tables.contains(*table))
            .any(|table| names_table(statement, table));

        if names_allowed && !names_other {
            Some(Ok(QueryPlan::PassThrough(PassThroughQuery {
                target,
                statement: statement.to_string(),
            })))
        } else {
            Some(Err(AppError::EntityNotPermitted {
                allowed: tables.join(", "),
            }))
        }
    }

    /// 시간 범위에 해당하는 학기 좌표
    pub fn resolve_scope(scope: TimeScope, semester: &SemesterInfo) -> Option<SemesterCoordinate> {
        match scope {
            TimeScope::Current => Some(semester.current),
            TimeScope::Next => Some(semester.next),
            TimeScope::Previous => Some(semester.previous),
            TimeScope::All => None,
        }
    }

    /// 강의 검색 요청 생성
    ///
    /// `coordinate`는 시간 범위가 current/next/previous일 때 그 학기 좌표다.
    pub fn build_course(
        &self,
        conditions: &QueryConditions,
        coordinate: Option<SemesterCoordinate>,
    ) -> Result<QuerySpec> {
        if conditions.is_empty() {
            return Err(AppError::ambiguous(crate::services::extractor::COURSE_EXAMPLES));
        }

        let mut predicates = Vec::new();

        if let Some(grade) = conditions.grade {
            predicates.push(self.grade_predicate(grade));
        }

        if let Some(department) = &conditions.department {
            predicates.push(Predicate::Field(FieldFilter::contains(
                courses::DEPARTMENT,
                department.trim(),
            )));
        }

        if let Some(keyword) = &conditions.subject_keyword {
            predicates.push(Predicate::AnyOf(vec![
                FieldFilter::contains(courses::COURSE_NAME, keyword.as_str()),
                FieldFilter::contains(courses::DEPARTMENT, keyword.as_str()),
            ]));
        }

        if let Some(professor) = &conditions.professor {
            predicates.push(Predicate::Field(FieldFilter::contains(
                courses::PROFESSOR,
                professor.as_str(),
            )));
        }

        match conditions.time_scope {
            None | Some(TimeScope::All) => {}
            Some(scope) => {
                let coordinate = coordinate.ok_or_else(|| {
                    AppError::Internal(format!("semester for scope '{}' was not resolved", scope))
                })?;
                let term = coordinate.term.ok_or_else(|| {
                    AppError::Clarification(
                        "현재는 방학 기간이라 진행 중인 학기가 없습니다. '다음 학기' 또는 '지난 학기' 개설 과목으로 질문해 주세요."
                            .to_string(),
                    )
                })?;
                predicates.push(Predicate::AllOf(vec![
                    FieldFilter::eq(courses::OFFERED_YEAR, coordinate.year),
                    FieldFilter::eq(courses::OFFERED_SEMESTER, term.number()),
                ]));
            }
        }

        Ok(QuerySpec {
            target: TargetEntity::Course,
            predicates,
            order_by: vec![courses::DEPARTMENT.to_string(), courses::COURSE_NAME.to_string()],
            limit: self.settings.course_limit,
            shape: ResultShape::Rows(course_projection()),
        })
    }

    fn grade_predicate(&self, grade: u8) -> Predicate {
        let grade = grade.to_string();
        let mut alternatives = vec![
            FieldFilter::eq(courses::TARGET_GRADE, grade.as_str()),
            FieldFilter::contains(courses::TARGET_GRADE, grade.as_str()),
        ];
        alternatives.extend(
            self.settings
                .grade_sentinels
                .iter()
                .map(|sentinel| FieldFilter::eq(courses::TARGET_GRADE, sentinel.as_str())),
        );
        Predicate::AnyOf(alternatives)
    }

    /// 학생 조회 요청 생성
    ///
    /// 본인 바인딩은 접근 범위 검사기가 한다. 여기서는 질문에 드러난 조건만 담는다.
    pub fn build_student(&self, intent: &StudentIntent) -> QuerySpec {
        let rows = |predicates: Vec<Predicate>| QuerySpec {
            target: TargetEntity::Student,
            predicates,
            order_by: vec![students::STUDENT_ID.to_string()],
            limit: self.settings.student_limit,
            shape: ResultShape::Rows(student_projection()),
        };

        match intent {
            StudentIntent::SelfProfile | StudentIntent::Listing => rows(Vec::new()),
            StudentIntent::ById(id) => rows(vec![Predicate::Field(FieldFilter::eq(
                students::STUDENT_ID,
                id.as_str(),
            ))]),
            StudentIntent::ByName(name) => rows(vec![Predicate::Field(FieldFilter::eq(
                students::NAME,
                name.as_str(),
            ))]),
            StudentIntent::AdmissionCohort(year) => rows(vec![Predicate::Field(FieldFilter::eq(
                students::ADMISSION_YEAR,
                *year,
            ))]),
            StudentIntent::PeerStatistics => QuerySpec {
                target: TargetEntity::Student,
                predicates: Vec::new(),
                order_by: Vec::new(),
                limit: 1,
                shape: ResultShape::Aggregate(peer_aggregate_columns()),
            },
        }
    }

    /// 강의 질문 → 조회 계획
    pub fn plan_course(
        &self,
        text: &str,
        extractor: &ConditionExtractor,
        semester: &SemesterInfo,
    ) -> Result<QueryPlan> {
        if let Some(plan) = self.detect_pass_through(text, TargetEntity::Course) {
            return plan;
        }

        let conditions = extractor.extract(text)?;
        let coordinate = conditions
            .time_scope
            .and_then(|scope| Self::resolve_scope(scope, semester));
        let spec = self.build_course(&conditions, coordinate)?;
        tracing::debug!("Course plan: {}", spec.summary());
        Ok(QueryPlan::Structured(spec))
    }

    /// 학생 질문 → 조회 계획
    pub fn plan_student(&self, text: &str, extractor: &StudentIntentExtractor) -> Result<QueryPlan> {
        if let Some(plan) = self.detect_pass_through(text, TargetEntity::Student) {
            return plan;
        }

        let intent = extractor.extract(text)?;
        let spec = self.build_student(&intent);
        tracing::debug!("Student plan: {}", spec.summary());
        Ok(QueryPlan::Structured(spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundValue, Operator, Term};
    use crate::services::calendar::SemesterCalendar;
    use chrono::NaiveDate;

    fn semester(y: i32, m: u32, d: u32) -> SemesterInfo {
        SemesterCalendar::new().resolve(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn plan_course(text: &str, today: &SemesterInfo) -> Result<QueryPlan> {
        QueryBuilder::default().plan_course(text, &ConditionExtractor::new(), today)
    }

    #[test]
    fn test_next_semester_scenario() {
        let plan = plan_course("다음 학기 개설 과목 알려줘", &semester(2024, 11, 15)).unwrap();
        let spec = plan.as_spec().unwrap();

        assert_eq!(spec.target, TargetEntity::Course);
        assert_eq!(
            spec.predicates,
            vec![Predicate::AllOf(vec![
                FieldFilter::eq("offered_year", 2025),
                FieldFilter::eq("offered_semester", 1i64),
            ])]
        );
        assert_eq!(spec.order_by, vec!["department", "course_name"]);
        assert_eq!(spec.limit, 30);
    }

    #[test]
    fn test_grade_predicate_accepts_sentinel() {
        let conditions = QueryConditions {
            grade: Some(2),
            ..Default::default()
        };
        let spec = QueryBuilder::default().build_course(&conditions, None).unwrap();

        assert_eq!(spec.predicates.len(), 1);
        let filters = spec.predicates[0].filters();
        assert!(matches!(spec.predicates[0], Predicate::AnyOf(_)));
        assert!(filters.contains(&FieldFilter::eq("target_grade", "2")));
        assert!(filters.contains(&FieldFilter::contains("target_grade", "2")));
        assert!(filters.contains(&FieldFilter::eq("target_grade", "전체")));
    }

    #[test]
    fn test_one_predicate_per_condition() {
        let conditions = QueryConditions {
            grade: Some(3),
            department: Some("국문학과".into()),
            subject_keyword: Some("역사".into()),
            professor: Some("김철수".into()),
            time_scope: Some(TimeScope::Previous),
        };
        let coordinate = SemesterCoordinate::new(2024, Term::First);
        let spec = QueryBuilder::default()
            .build_course(&conditions, Some(coordinate))
            .unwrap();

        assert_eq!(spec.predicates.len(), 5);
        assert_eq!(
            spec.predicates[1],
            Predicate::Field(FieldFilter::contains("department", "국문학과"))
        );
        assert_eq!(
            spec.predicates[3],
            Predicate::Field(FieldFilter::contains("professor", "김철수"))
        );
        for predicate in &spec.predicates {
            for filter in predicate.filters() {
                if filter.op == Operator::Contains {
                    assert!(matches!(filter.value, BoundValue::Text(_)));
                }
            }
        }
    }

    #[test]
    fn test_all_scope_adds_no_predicate() {
        let plan = plan_course("전체 과목 보여줘", &semester(2024, 4, 1)).unwrap();
        let spec = plan.as_spec().unwrap();
        assert!(spec.predicates.is_empty());
        assert_eq!(spec.limit, 30);
    }

    #[test]
    fn test_current_scope_during_vacation_needs_clarification() {
        let err = plan_course("이번 학기 강의", &semester(2024, 7, 15)).unwrap_err();
        assert!(matches!(err, AppError::Clarification(_)));
    }

    #[test]
    fn test_current_scope_during_term() {
        let plan = plan_course("이번 학기 강의", &semester(2024, 4, 15)).unwrap();
        let spec = plan.as_spec().unwrap();
        assert_eq!(
            spec.predicates,
            vec![Predicate::AllOf(vec![
                FieldFilter::eq("offered_year", 2024),
                FieldFilter::eq("offered_semester", 1i64),
            ])]
        );
    }

    #[test]
    fn test_no_condition_is_clarification() {
        let err = plan_course("아무 말", &semester(2024, 4, 1)).unwrap_err();
        assert!(matches!(err, AppError::ExtractionAmbiguous { .. }));

        let err = QueryBuilder::default()
            .build_course(&QueryConditions::default(), None)
            .unwrap_err();
        assert!(matches!(err, AppError::ExtractionAmbiguous { .. }));
    }

    #[test]
    fn test_pass_through_requires_whole_word_table() {
        let builder = QueryBuilder::default();

        let plan = builder
            .detect_pass_through("SELECT * FROM courses WHERE credits = 3", TargetEntity::Course)
            .unwrap()
            .unwrap();
        assert!(matches!(plan, QueryPlan::PassThrough(_)));

        let err = builder
            .detect_pass_through("select * from courses_archive", TargetEntity::Course)
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotPermitted { ref allowed } if allowed == "courses"));

        let err = builder
            .detect_pass_through("SELECT * FROM students", TargetEntity::Course)
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotPermitted { .. }));

        assert!(builder
            .detect_pass_through("courses 테이블 보여줘", TargetEntity::Course)
            .is_none());
    }

    #[test]
    fn test_pass_through_rejects_other_tables_anywhere() {
        let builder = QueryBuilder::default();

        for statement in [
            "SELECT * FROM students WHERE name != 'courses'",
            "SELECT *, (SELECT * FROM major) AS m FROM courses",
            "select * from courses where course_code in (select course_code from enrollments)",
        ] {
            let err = builder
                .detect_pass_through(statement, TargetEntity::Course)
                .unwrap()
                .unwrap_err();
            assert!(
                matches!(err, AppError::EntityNotPermitted { ref allowed } if allowed == "courses"),
                "{}",
                statement
            );
        }
    }

    #[test]
    fn test_pass_through_must_be_single_select() {
        let builder = QueryBuilder::default();

        for statement in [
            "SELECT * FROM courses; DELETE students",
            "SELECT * FROM courses;DELETE courses;",
            "SELECT * FROM courses WHERE (DELETE courses)",
            "SELECT * FROM type::table('stud' + 'ents')",
        ] {
            let err = builder
                .detect_pass_through(statement, TargetEntity::Course)
                .unwrap()
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{}", statement);
        }

        let plan = builder
            .detect_pass_through("SELECT * FROM courses LIMIT 2;", TargetEntity::Course)
            .unwrap()
            .unwrap();
        match plan {
            QueryPlan::PassThrough(query) => assert_eq!(query.statement, "SELECT * FROM courses LIMIT 2"),
            other => panic!("unexpected plan: {:?}", other),
        }
    }

    #[test]
    fn test_student_pass_through_allowlist() {
        let builder = QueryBuilder::default();
        let plan = builder
            .detect_pass_through("SELECT name FROM Students", TargetEntity::Student)
            .unwrap()
            .unwrap();
        assert_eq!(plan.target(), TargetEntity::Student);

        let err = builder
            .detect_pass_through("SELECT * FROM enrollments", TargetEntity::Student)
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotPermitted { ref allowed } if allowed == "students, major"));
    }

    #[test]
    fn test_student_specs() {
        let builder = QueryBuilder::default();

        let spec = builder.build_student(&StudentIntent::SelfProfile);
        assert!(spec.predicates.is_empty());
        assert_eq!(spec.limit, 10);

        let spec = builder.build_student(&StudentIntent::ByName("다인장".into()));
        assert_eq!(
            spec.predicates,
            vec![Predicate::Field(FieldFilter::eq("name", "다인장"))]
        );

        let spec = builder.build_student(&StudentIntent::PeerStatistics);
        assert!(spec.shape.is_aggregate());
        assert!(!spec.shape.exposed_fields().contains(&"name"));
        assert!(!spec.shape.exposed_fields().contains(&"student_id"));
    }

    #[test]
    fn test_plans_are_deterministic() {
        let today = semester(2024, 11, 15);
        let first = plan_course("3학년 심리학 다음 학기 강의", &today).unwrap();
        let second = plan_course("3학년 심리학 다음 학기 강의", &today).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
