//! 구조화된 조회 요청 모델
//!
//! 모든 조건 값은 바인딩 파라미터로만 전달된다. 쿼리 문자열은
//! 저장소 어댑터만 만든다.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::schema::is_identity_field;

/// 조회 대상 엔티티
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetEntity {
    /// 학생 (students + major)
    #[serde(rename = "student")]
    Student,
    /// 강의 (courses)
    #[serde(rename = "course")]
    Course,
}

impl fmt::Display for TargetEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetEntity::Student => write!(f, "student"),
            TargetEntity::Course => write!(f, "course"),
        }
    }
}

/// 바인딩 값
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundValue {
    Integer(i64),
    Text(String),
}

impl BoundValue {
    pub fn text(value: impl Into<String>) -> Self {
        BoundValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            BoundValue::Text(s) => Some(s),
            BoundValue::Integer(_) => None,
        }
    }

    /// 따옴표 없는 문자열 표현
    pub fn plain_text(&self) -> String {
        match self {
            BoundValue::Integer(n) => n.to_string(),
            BoundValue::Text(s) => s.clone(),
        }
    }

    /// JSON 값으로 변환
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            BoundValue::Integer(n) => serde_json::Value::from(*n),
            BoundValue::Text(s) => serde_json::Value::from(s.as_str()),
        }
    }
}

impl From<i64> for BoundValue {
    fn from(n: i64) -> Self {
        BoundValue::Integer(n)
    }
}

impl From<i32> for BoundValue {
    fn from(n: i32) -> Self {
        BoundValue::Integer(n as i64)
    }
}

impl From<&str> for BoundValue {
    fn from(s: &str) -> Self {
        BoundValue::Text(s.to_string())
    }
}

impl From<String> for BoundValue {
    fn from(s: String) -> Self {
        BoundValue::Text(s)
    }
}

impl fmt::Display for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundValue::Integer(n) => write!(f, "{}", n),
            BoundValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// 비교 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// 완전 일치
    Eq,
    /// 부분 일치
    Contains,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => write!(f, "="),
            Operator::Contains => write!(f, "contains"),
        }
    }
}

/// (필드, 연산자, 값) 단일 필터
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: Operator,
    pub value: BoundValue,
}

impl FieldFilter {
    pub fn eq(field: &str, value: impl Into<BoundValue>) -> Self {
        Self {
            field: field.to_string(),
            op: Operator::Eq,
            value: value.into(),
        }
    }

    pub fn contains(field: &str, value: impl Into<BoundValue>) -> Self {
        Self {
            field: field.to_string(),
            op: Operator::Contains,
            value: value.into(),
        }
    }
}

impl fmt::Display for FieldFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

/// 하나의 조건이 만드는 술어
///
/// 조건 하나는 정확히 하나의 술어가 된다. 같은 조건 안의 대안은 `AnyOf`,
/// 함께 묶여야 하는 쌍은 `AllOf`로 표현한다. 술어끼리는 AND로 결합된다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Field(FieldFilter),
    AnyOf(Vec<FieldFilter>),
    AllOf(Vec<FieldFilter>),
}

impl Predicate {
    /// 술어가 포함하는 모든 필터
    pub fn filters(&self) -> &[FieldFilter] {
        match self {
            Predicate::Field(filter) => std::slice::from_ref(filter),
            Predicate::AnyOf(filters) | Predicate::AllOf(filters) => filters,
        }
    }

    /// 학생 신원 필드를 참조하는지 여부
    pub fn touches_identity(&self) -> bool {
        self.filters().iter().any(|f| is_identity_field(&f.field))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |filters: &[FieldFilter], sep: &str| {
            filters
                .iter()
                .map(|filter| filter.to_string())
                .collect::<Vec<_>>()
                .join(sep)
        };
        match self {
            Predicate::Field(filter) => write!(f, "{}", filter),
            Predicate::AnyOf(filters) => write!(f, "({})", join(filters, " OR ")),
            Predicate::AllOf(filters) => write!(f, "({})", join(filters, " AND ")),
        }
    }
}

/// 결과 컬럼 (필드 → 표시 이름)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projection {
    pub field: String,
    pub label: String,
    /// 값이 없을 때 대신 보여줄 값
    pub fallback: Option<String>,
}

impl Projection {
    pub fn new(field: &str, label: &str) -> Self {
        Self {
            field: field.to_string(),
            label: label.to_string(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: &str) -> Self {
        self.fallback = Some(fallback.to_string());
        self
    }
}

/// 집계 함수
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Count,
    Avg,
}

/// 집계 컬럼
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateColumn {
    pub function: AggregateFunction,
    /// `Count`는 필드 없이 행 수를 센다
    pub field: Option<String>,
    pub label: String,
}

impl AggregateColumn {
    pub fn count(label: &str) -> Self {
        Self {
            function: AggregateFunction::Count,
            field: None,
            label: label.to_string(),
        }
    }

    pub fn avg(field: &str, label: &str) -> Self {
        Self {
            function: AggregateFunction::Avg,
            field: Some(field.to_string()),
            label: label.to_string(),
        }
    }
}

/// 결과 형태
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    /// 개별 행
    Rows(Vec<Projection>),
    /// 개수·평균만
    Aggregate(Vec<AggregateColumn>),
}

impl ResultShape {
    pub fn is_aggregate(&self) -> bool {
        matches!(self, ResultShape::Aggregate(_))
    }

    /// 결과에 노출되는 원본 필드 목록
    pub fn exposed_fields(&self) -> Vec<&str> {
        match self {
            ResultShape::Rows(projections) => {
                projections.iter().map(|p| p.field.as_str()).collect()
            }
            ResultShape::Aggregate(columns) => {
                columns.iter().filter_map(|c| c.field.as_deref()).collect()
            }
        }
    }
}

/// 구조화된 조회 요청
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuerySpec {
    pub target: TargetEntity,
    pub predicates: Vec<Predicate>,
    pub order_by: Vec<String>,
    pub limit: usize,
    pub shape: ResultShape,
}

impl QuerySpec {
    /// 사람이 읽을 수 있는 요약 (로그용)
    pub fn summary(&self) -> String {
        let predicates = if self.predicates.is_empty() {
            "-".to_string()
        } else {
            self.predicates
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(" AND ")
        };
        format!(
            "{} where {} order by [{}] limit {}{}",
            self.target,
            predicates,
            self.order_by.join(", "),
            self.limit,
            if self.shape.is_aggregate() {
                " (aggregate)"
            } else {
                ""
            }
        )
    }

    /// 특정 필드에 대한 모든 필터
    pub fn filters_on<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldFilter> + 'a {
        self.predicates
            .iter()
            .flat_map(|p| p.filters().iter())
            .filter(move |f| f.field == field)
    }
}

/// 호출자가 직접 작성한 조회문
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassThroughQuery {
    pub target: TargetEntity,
    pub statement: String,
}

/// 저장소로 전달되는 조회 계획
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPlan {
    Structured(QuerySpec),
    PassThrough(PassThroughQuery),
}

impl QueryPlan {
    pub fn target(&self) -> TargetEntity {
        match self {
            QueryPlan::Structured(spec) => spec.target,
            QueryPlan::PassThrough(query) => query.target,
        }
    }

    pub fn as_spec(&self) -> Option<&QuerySpec> {
        match self {
            QueryPlan::Structured(spec) => Some(spec),
            QueryPlan::PassThrough(_) => None,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            QueryPlan::Structured(spec) => spec.summary(),
            QueryPlan::PassThrough(query) => format!("{} pass-through", query.target),
        }
    }
}

/// 저장소가 돌려주는 한 행 (컬럼 순서 유지, null 허용)
pub type Row = serde_json::Map<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_display() {
        let predicate = Predicate::AllOf(vec![
            FieldFilter::eq("offered_year", 2025),
            FieldFilter::eq("offered_semester", 1i64),
        ]);
        assert_eq!(
            predicate.to_string(),
            "(offered_year = 2025 AND offered_semester = 1)"
        );

        let predicate = Predicate::Field(FieldFilter::contains("department", "국문"));
        assert_eq!(predicate.to_string(), "department contains \"국문\"");
    }

    #[test]
    fn test_touches_identity() {
        assert!(Predicate::Field(FieldFilter::eq("student_id", "S1")).touches_identity());
        assert!(Predicate::AnyOf(vec![
            FieldFilter::eq("major_code", "M1"),
            FieldFilter::eq("name", "홍길동"),
        ])
        .touches_identity());
        assert!(!Predicate::Field(FieldFilter::eq("admission_year", 2020)).touches_identity());
    }

    #[test]
    fn test_exposed_fields_of_aggregate_shape() {
        let shape = ResultShape::Aggregate(vec![
            AggregateColumn::count("학생수"),
            AggregateColumn::avg("completed_semester", "평균이수학기"),
        ]);
        assert_eq!(shape.exposed_fields(), vec!["completed_semester"]);
    }

    #[test]
    fn test_bound_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![BoundValue::from(3i64), BoundValue::from("전체")])
            .unwrap();
        assert_eq!(json, r#"[3,"전체"]"#);
    }
}
