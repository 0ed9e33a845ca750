//! 메모리 저장소
//!
//! JSON 데이터 파일에서 읽은 테이블 위에서 조회 계획을 평가한다.
//! 데모 모드와 테스트에서 사용한다.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::schema::{courses, enrollments, major, students};
use crate::models::{
    AggregateColumn, AggregateFunction, BoundValue, FieldFilter, Operator, PassThroughQuery,
    Predicate, Projection, QueryPlan, QuerySpec, ResultShape, Row, TargetEntity,
};
use crate::storage::executor::QueryExecutor;

static SIMPLE_SELECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*select\s+\*\s+from\s+(\w+)(?:\s+limit\s+(\d+))?\s*;?\s*$")
        .expect("Invalid regex")
});

/// 테이블 데이터
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub students: Vec<Row>,
    pub major: Vec<Row>,
    pub courses: Vec<Row>,
    pub enrollments: Vec<Row>,
}

impl Dataset {
    fn table(&self, name: &str) -> Option<&Vec<Row>> {
        match name.to_lowercase().as_str() {
            students::TABLE => Some(&self.students),
            major::TABLE => Some(&self.major),
            courses::TABLE => Some(&self.courses),
            enrollments::TABLE => Some(&self.enrollments),
            _ => None,
        }
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut Vec<Row>> {
        match name {
            students::TABLE => Some(&mut self.students),
            major::TABLE => Some(&mut self.major),
            courses::TABLE => Some(&mut self.courses),
            enrollments::TABLE => Some(&mut self.enrollments),
            _ => None,
        }
    }

    /// students LEFT JOIN major ON major_code
    fn joined_students(&self) -> Vec<Row> {
        self.students
            .iter()
            .map(|student| {
                let mut row = student.clone();
                let code = student.get(students::MAJOR_CODE);
                let matched = code.and_then(|code| {
                    self.major
                        .iter()
                        .find(|m| !code.is_null() && m.get(major::MAJOR_CODE) == Some(code))
                });
                if let Some(major_row) = matched {
                    for (key, value) in major_row {
                        row.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
                row
            })
            .collect()
    }
}

/// 메모리 저장소
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Dataset>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            data: Arc::new(RwLock::new(dataset)),
        }
    }

    /// JSON 문자열에서 생성
    pub fn from_json_str(json: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(json)?;
        Ok(Self::from_dataset(dataset))
    }

    /// JSON 데이터 파일에서 생성
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let store = Self::from_json_str(&content)?;
        tracing::info!("Memory store loaded from {}", path.as_ref().display());
        Ok(store)
    }

    /// 행 추가
    pub async fn insert(&self, table: &str, row: Row) -> Result<()> {
        let mut data = self.data.write().await;
        let rows = data
            .table_mut(table)
            .ok_or_else(|| AppError::StorageExecutionFailed(format!("unknown table '{}'", table)))?;
        rows.push(row);
        Ok(())
    }

    /// 테이블 행 수
    pub async fn count(&self, table: &str) -> usize {
        let data = self.data.read().await;
        data.table(table).map(Vec::len).unwrap_or(0)
    }

    fn run_spec(data: &Dataset, spec: &QuerySpec) -> Vec<Row> {
        let source = match spec.target {
            TargetEntity::Course => data.courses.clone(),
            TargetEntity::Student => data.joined_students(),
        };

        let mut matched: Vec<Row> = source
            .into_iter()
            .filter(|row| spec.predicates.iter().all(|p| predicate_matches(row, p)))
            .collect();

        match &spec.shape {
            ResultShape::Aggregate(columns) => vec![aggregate(&matched, columns)],
            ResultShape::Rows(projections) => {
                matched.sort_by(|a, b| {
                    spec.order_by
                        .iter()
                        .map(|field| compare_values(a.get(field), b.get(field)))
                        .find(|ordering| *ordering != Ordering::Equal)
                        .unwrap_or(Ordering::Equal)
                });
                matched.truncate(spec.limit);
                matched.iter().map(|row| project(row, projections)).collect()
            }
        }
    }

    fn run_pass_through(data: &Dataset, query: &PassThroughQuery) -> Result<Vec<Row>> {
        let caps = SIMPLE_SELECT.captures(&query.statement).ok_or_else(|| {
            AppError::StorageExecutionFailed(
                "memory store only supports 'SELECT * FROM <table> [LIMIT n]'".to_string(),
            )
        })?;

        let table = &caps[1];
        let rows = data.table(table).ok_or_else(|| {
            AppError::StorageExecutionFailed(format!("unknown table '{}'", table))
        })?;

        let limit = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .unwrap_or(usize::MAX);
        Ok(rows.iter().take(limit).cloned().collect())
    }
}

fn filter_matches(row: &Row, filter: &FieldFilter) -> bool {
    let Some(value) = row.get(&filter.field).filter(|v| !v.is_null()) else {
        return false;
    };

    match filter.op {
        Operator::Eq => match &filter.value {
            BoundValue::Integer(n) => {
                value.as_i64() == Some(*n)
                    || value.as_str().and_then(|s| s.trim().parse::<i64>().ok()) == Some(*n)
            }
            BoundValue::Text(s) => value_text(value) == *s,
        },
        Operator::Contains => value_text(value).contains(&filter.value.plain_text()),
    }
}

fn predicate_matches(row: &Row, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Field(filter) => filter_matches(row, filter),
        Predicate::AnyOf(filters) => filters.iter().any(|f| filter_matches(row, f)),
        Predicate::AllOf(filters) => filters.iter().all(|f| filter_matches(row, f)),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => value_text(a).cmp(&value_text(b)),
        },
    }
}

fn project(row: &Row, projections: &[Projection]) -> Row {
    projections
        .iter()
        .map(|projection| {
            let value = row
                .get(&projection.field)
                .filter(|v| !v.is_null())
                .cloned()
                .or_else(|| projection.fallback.clone().map(Value::String))
                .unwrap_or(Value::Null);
            (projection.label.clone(), value)
        })
        .collect()
}

fn aggregate(rows: &[Row], columns: &[AggregateColumn]) -> Row {
    columns
        .iter()
        .map(|column| {
            let value = match column.function {
                AggregateFunction::Count => Value::from(rows.len() as u64),
                AggregateFunction::Avg => {
                    let values: Vec<f64> = column
                        .field
                        .as_deref()
                        .map(|field| {
                            rows.iter()
                                .filter_map(|row| row.get(field).and_then(Value::as_f64))
                                .collect()
                        })
                        .unwrap_or_default();
                    if values.is_empty() {
                        Value::Null
                    } else {
                        let mean = values.iter().sum::<f64>() / values.len() as f64;
                        Value::from((mean * 100.0).round() / 100.0)
                    }
                }
            };
            (column.label.clone(), value)
        })
        .collect()
}

#[async_trait]
impl QueryExecutor for MemoryStore {
    async fn execute(&self, plan: &QueryPlan) -> Result<Vec<Row>> {
        let data = self.data.read().await;
        match plan {
            QueryPlan::Structured(spec) => Ok(Self::run_spec(&data, spec)),
            QueryPlan::PassThrough(query) => Self::run_pass_through(&data, query),
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::from_json_str(
            &json!({
                "students": [
                    {"student_id": "S1", "name": "가", "major_code": "M1", "completed_semester": 4, "admission_year": 2021},
                    {"student_id": "S2", "name": "나", "major_code": "M1", "completed_semester": 5, "admission_year": 2021},
                    {"student_id": "S3", "name": "다", "major_code": "M9", "completed_semester": 2, "admission_year": 2023}
                ],
                "major": [
                    {"major_code": "M1", "major_name": "심리학", "department": "심리학과", "college": "사회과학대학", "dept_code": "D1"}
                ],
                "courses": [
                    {"course_code": "C2", "course_name": "발달심리", "department": "심리학과", "target_grade": "2", "offered_year": 2025, "offered_semester": 1},
                    {"course_code": "C1", "course_name": "교양글쓰기", "department": "교양학부", "target_grade": "전체", "offered_year": "2025", "offered_semester": 1},
                    {"course_code": "C3", "course_name": "고급통계", "department": "심리학과", "target_grade": "3-4", "offered_year": 2024, "offered_semester": 2}
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    fn course_spec(predicates: Vec<Predicate>) -> QueryPlan {
        QueryPlan::Structured(QuerySpec {
            target: TargetEntity::Course,
            predicates,
            order_by: vec!["department".into(), "course_name".into()],
            limit: 30,
            shape: ResultShape::Rows(vec![
                Projection::new("course_code", "과목코드"),
                Projection::new("course_name", "과목명"),
            ]),
        })
    }

    #[tokio::test]
    async fn test_semester_filter_accepts_text_years() {
        let plan = course_spec(vec![Predicate::AllOf(vec![
            FieldFilter::eq("offered_year", 2025),
            FieldFilter::eq("offered_semester", 1i64),
        ])]);
        let rows = store().execute(&plan).await.unwrap();

        let codes: Vec<&str> = rows.iter().map(|r| r["과목코드"].as_str().unwrap()).collect();
        assert_eq!(codes, vec!["C1", "C2"]);
    }

    #[tokio::test]
    async fn test_any_of_matches_alternatives() {
        let plan = course_spec(vec![Predicate::AnyOf(vec![
            FieldFilter::eq("target_grade", "3"),
            FieldFilter::contains("target_grade", "3"),
            FieldFilter::eq("target_grade", "전체"),
        ])]);
        let rows = store().execute(&plan).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_student_join_uses_fallbacks() {
        let plan = QueryPlan::Structured(QuerySpec {
            target: TargetEntity::Student,
            predicates: vec![Predicate::Field(FieldFilter::eq("student_id", "S3"))],
            order_by: vec!["student_id".into()],
            limit: 10,
            shape: ResultShape::Rows(vec![
                Projection::new("name", "학생이름"),
                Projection::new("major_name", "전공명").with_fallback("전공정보없음"),
            ]),
        });
        let rows = store().execute(&plan).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["학생이름"], json!("다"));
        assert_eq!(rows[0]["전공명"], json!("전공정보없음"));
    }

    #[tokio::test]
    async fn test_aggregate_counts_and_averages() {
        let plan = QueryPlan::Structured(QuerySpec {
            target: TargetEntity::Student,
            predicates: vec![
                Predicate::Field(FieldFilter::eq("major_code", "M1")),
                Predicate::Field(FieldFilter::eq("admission_year", 2021)),
            ],
            order_by: vec![],
            limit: 1,
            shape: ResultShape::Aggregate(vec![
                AggregateColumn::count("학생수"),
                AggregateColumn::avg("completed_semester", "평균이수학기"),
            ]),
        });
        let rows = store().execute(&plan).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["학생수"], json!(2));
        assert_eq!(rows[0]["평균이수학기"], json!(4.5));
        assert!(rows[0].get("name").is_none());
    }

    #[tokio::test]
    async fn test_limit_is_applied() {
        let mut plan = course_spec(vec![]);
        if let QueryPlan::Structured(spec) = &mut plan {
            spec.limit = 1;
        }
        let rows = store().execute(&plan).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["과목코드"], json!("C1"));
    }

    #[tokio::test]
    async fn test_pass_through_simple_select() {
        let plan = QueryPlan::PassThrough(PassThroughQuery {
            target: TargetEntity::Course,
            statement: "SELECT * FROM courses LIMIT 2".into(),
        });
        let rows = store().execute(&plan).await.unwrap();
        assert_eq!(rows.len(), 2);

        let plan = QueryPlan::PassThrough(PassThroughQuery {
            target: TargetEntity::Course,
            statement: "SELECT course_name FROM courses WHERE credits = 3".into(),
        });
        let err = store().execute(&plan).await.unwrap_err();
        assert!(matches!(err, AppError::StorageExecutionFailed(_)));
    }

    #[tokio::test]
    async fn test_insert_and_count() {
        let store = MemoryStore::new();
        let row = json!({"course_code": "X1"}).as_object().cloned().unwrap();
        store.insert("courses", row).await.unwrap();
        assert_eq!(store.count("courses").await, 1);
        assert!(store.insert("grades", Row::new()).await.is_err());
    }
}
