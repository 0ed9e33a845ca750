//! SurrealDB 저장소
//!
//! `QuerySpec`을 SurrealQL로 렌더링한다. 조건 값은 모두 `$p0`, `$p1` … 바인딩
//! 파라미터로 전달되며 쿼리 문자열에는 필드 이름과 표시 이름만 들어간다.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use surrealdb::{
    Surreal,
    engine::any::{Any, connect},
    opt::auth::Root,
};
use tokio::sync::Mutex;

use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::models::schema::{courses, major, students};
use crate::models::{
    AggregateFunction, FieldFilter, Operator, PassThroughQuery, Predicate, QueryPlan, QuerySpec,
    ResultShape, Row, TargetEntity,
};
use crate::storage::executor::QueryExecutor;

/// major 테이블에서만 오는 학생 조회 필드
const MAJOR_ONLY_FIELDS: [&str; 4] = [
    major::COLLEGE,
    major::DEPARTMENT,
    major::DEPT_CODE,
    major::MAJOR_NAME,
];

/// SurrealDB 연결 풀
#[derive(Clone)]
pub struct SurrealPool {
    /// 데이터베이스 연결
    db: Arc<Mutex<Option<Surreal<Any>>>>,
}

impl SurrealPool {
    /// 새 연결 생성
    pub async fn new(config: &DatabaseConfig) -> std::result::Result<Self, surrealdb::Error> {
        let db: Surreal<Any> = connect(&config.url).await?;

        // 인증
        if !config.username.is_empty() {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await?;
        }

        // 네임스페이스와 데이터베이스 선택
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        Ok(Self {
            db: Arc::new(Mutex::new(Some(db))),
        })
    }

    /// 내부 데이터베이스 인스턴스
    pub async fn inner(&self) -> Result<Surreal<Any>> {
        let guard = self.db.lock().await;
        guard
            .as_ref()
            .cloned()
            .ok_or_else(|| AppError::Connection("database connection closed".to_string()))
    }

    /// 연결 종료
    pub async fn close(&self) {
        let mut guard = self.db.lock().await;
        *guard = None;
    }
}

/// 렌더링된 SurrealQL 문장
#[derive(Debug, Clone, PartialEq)]
pub struct SurrealStatement {
    pub sql: String,
    pub binds: Vec<(String, Value)>,
}

impl SurrealStatement {
    fn bind(&mut self, value: Value) -> String {
        let name = format!("p{}", self.binds.len());
        self.binds.push((name.clone(), value));
        format!("${}", name)
    }
}

fn table_of(target: TargetEntity) -> &'static str {
    match target {
        TargetEntity::Course => courses::TABLE,
        TargetEntity::Student => students::TABLE,
    }
}

/// 필드 표현식. 학생 조회의 전공 필드는 major 테이블 하위 쿼리로 읽는다.
fn field_expr(target: TargetEntity, field: &str) -> String {
    if target == TargetEntity::Student && MAJOR_ONLY_FIELDS.contains(&field) {
        format!(
            "(SELECT VALUE {} FROM {} WHERE {} = $parent.{} LIMIT 1)[0]",
            field,
            major::TABLE,
            major::MAJOR_CODE,
            students::MAJOR_CODE
        )
    } else {
        field.to_string()
    }
}

fn quote_label(label: &str) -> String {
    format!("`{}`", label.replace('`', ""))
}

fn render_filter(statement: &mut SurrealStatement, target: TargetEntity, filter: &FieldFilter) -> String {
    let expr = field_expr(target, &filter.field);
    let param = statement.bind(filter.value.to_json());
    match filter.op {
        Operator::Eq => format!("{} = {}", expr, param),
        Operator::Contains => format!("string::contains(<string> {}, {})", expr, param),
    }
}

fn render_predicate(
    statement: &mut SurrealStatement,
    target: TargetEntity,
    predicate: &Predicate,
) -> String {
    let join = |statement: &mut SurrealStatement, filters: &[FieldFilter], sep: &str| {
        let parts: Vec<String> = filters
            .iter()
            .map(|filter| render_filter(statement, target, filter))
            .collect();
        format!("({})", parts.join(sep))
    };

    match predicate {
        Predicate::Field(filter) => render_filter(statement, target, filter),
        Predicate::AnyOf(filters) => join(statement, filters, " OR "),
        Predicate::AllOf(filters) => join(statement, filters, " AND "),
    }
}

/// `QuerySpec` → SurrealQL
pub fn render(spec: &QuerySpec) -> SurrealStatement {
    let mut statement = SurrealStatement {
        sql: String::new(),
        binds: Vec::new(),
    };

    let columns: Vec<String> = match &spec.shape {
        ResultShape::Rows(projections) => projections
            .iter()
            .map(|projection| {
                let expr = field_expr(spec.target, &projection.field);
                match &projection.fallback {
                    Some(fallback) => {
                        let param = statement.bind(Value::String(fallback.clone()));
                        format!("({} ?? {}) AS {}", expr, param, quote_label(&projection.label))
                    }
                    None => format!("{} AS {}", expr, quote_label(&projection.label)),
                }
            })
            .collect(),
        ResultShape::Aggregate(columns) => columns
            .iter()
            .map(|column| match (column.function, column.field.as_deref()) {
                (AggregateFunction::Count, _) => format!("count() AS {}", quote_label(&column.label)),
                (AggregateFunction::Avg, Some(field)) => format!(
                    "math::mean({}) AS {}",
                    field_expr(spec.target, field),
                    quote_label(&column.label)
                ),
                (AggregateFunction::Avg, None) => format!("NONE AS {}", quote_label(&column.label)),
            })
            .collect(),
    };

    let conditions: Vec<String> = spec
        .predicates
        .iter()
        .map(|predicate| render_predicate(&mut statement, spec.target, predicate))
        .collect();

    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), table_of(spec.target));
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    match &spec.shape {
        ResultShape::Aggregate(_) => sql.push_str(" GROUP ALL"),
        ResultShape::Rows(projections) => {
            // ORDER BY는 결과 컬럼 이름을 참조한다
            let order: Vec<String> = spec
                .order_by
                .iter()
                .map(|field| {
                    projections
                        .iter()
                        .find(|p| &p.field == field)
                        .map(|p| quote_label(&p.label))
                        .unwrap_or_else(|| field.clone())
                })
                .collect();
            if !order.is_empty() {
                sql.push_str(" ORDER BY ");
                sql.push_str(&order.join(", "));
            }
            sql.push_str(&format!(" LIMIT {}", spec.limit));
        }
    }

    statement.sql = sql;
    statement
}

fn into_rows(values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// SurrealDB 조회 실행기
#[derive(Clone)]
pub struct SurrealExecutor {
    pool: Arc<SurrealPool>,
}

impl SurrealExecutor {
    pub fn new(pool: Arc<SurrealPool>) -> Self {
        Self { pool }
    }

    async fn run_spec(&self, spec: &QuerySpec) -> Result<Vec<Row>> {
        let statement = render(spec);
        tracing::debug!("SurrealQL: {} ({} binds)", statement.sql, statement.binds.len());

        let db = self.pool.inner().await?;
        let mut query = db.query(statement.sql);
        for (name, value) in statement.binds {
            query = query.bind((name, value));
        }
        let values: Vec<Value> = query.await?.take(0)?;
        Ok(into_rows(values))
    }

    async fn run_pass_through(&self, pass_through: &PassThroughQuery) -> Result<Vec<Row>> {
        let db = self.pool.inner().await?;
        let values: Vec<Value> = db.query(pass_through.statement.as_str()).await?.take(0)?;
        Ok(into_rows(values))
    }
}

#[async_trait]
impl QueryExecutor for SurrealExecutor {
    async fn execute(&self, plan: &QueryPlan) -> Result<Vec<Row>> {
        match plan {
            QueryPlan::Structured(spec) => self.run_spec(spec).await,
            QueryPlan::PassThrough(query) => self.run_pass_through(query).await,
        }
    }

    fn backend(&self) -> &'static str {
        "surrealdb"
    }
}
