//! 질의 처리 파이프라인
//!
//! 질문 하나를 받아 검증 → 추출 → 빌드 → 접근 검사 → 실행 → 포맷 순서로
//! 처리하고, 어떤 결과든 사용자에게 보여줄 문자열 하나로 돌려준다.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;

use crate::config::QueryConfig;
use crate::error::{AppError, Result};
use crate::models::{Identity, QueryPlan, Row, SemesterInfo, TargetEntity};
use crate::observability::{PipelineMetrics, RequestOutcome};
use crate::security::scope_guard::{AccessScopeGuard, ExecutorProfileResolver};
use crate::security::validation::QueryValidator;
use crate::services::calendar::SemesterCalendar;
use crate::services::extractor::ConditionExtractor;
use crate::services::formatter::{DisplayMode, ResultFormatter};
use crate::services::query_builder::QueryBuilder;
use crate::services::student_intent::StudentIntentExtractor;
use crate::storage::QueryExecutor;

const COURSE_MARKERS: &[&str] = &["과목", "강의", "수업", "교과"];
const STUDENT_MARKERS: &[&str] = &["학생", "학번", "내 ", "내정보", "나의", "동기", "입학"];

/// 질문 영역
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// 강의 검색
    Course,
    /// 학생 정보
    Student,
}

impl Domain {
    pub fn target(&self) -> TargetEntity {
        match self {
            Domain::Course => TargetEntity::Course,
            Domain::Student => TargetEntity::Student,
        }
    }

    /// 키워드 기반 영역 선택. 강의 관련 단어가 있으면 강의 검색이 우선한다.
    pub fn route(text: &str) -> Self {
        let padded = format!("{} ", text);
        let mentions = |markers: &[&str]| markers.iter().any(|m| padded.contains(m));
        if !mentions(COURSE_MARKERS) && mentions(STUDENT_MARKERS) {
            Domain::Student
        } else {
            Domain::Course
        }
    }
}

/// 질의 처리 파이프라인
pub struct QueryPipeline {
    calendar: SemesterCalendar,
    validator: QueryValidator,
    extractor: ConditionExtractor,
    student_extractor: StudentIntentExtractor,
    builder: QueryBuilder,
    guard: AccessScopeGuard,
    executor: Arc<dyn QueryExecutor>,
    formatter: ResultFormatter,
    metrics: PipelineMetrics,
}

impl QueryPipeline {
    pub fn new(executor: Arc<dyn QueryExecutor>, config: &QueryConfig) -> Self {
        let resolver = Arc::new(ExecutorProfileResolver::new(executor.clone()));
        Self {
            calendar: SemesterCalendar::new(),
            validator: QueryValidator::new().with_max_length(config.max_query_length),
            extractor: ConditionExtractor::new(),
            student_extractor: StudentIntentExtractor::new(),
            builder: QueryBuilder::new(config.builder_settings()),
            guard: AccessScopeGuard::new(resolver),
            executor,
            formatter: ResultFormatter::new(),
            metrics: PipelineMetrics::default(),
        }
    }

    /// 접근 검사기 교체
    pub fn with_guard(mut self, guard: AccessScopeGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// 기준 날짜의 학기 정보
    pub fn semester_info(&self, today: NaiveDate) -> SemesterInfo {
        self.calendar.resolve(today)
    }

    /// 질문 → 조회 계획 (접근 검사 전)
    pub fn plan(&self, domain: Domain, text: &str, today: NaiveDate) -> Result<QueryPlan> {
        let text = self.validator.validate(text)?;
        match domain {
            Domain::Course => {
                let semester = self.calendar.resolve(today);
                self.builder.plan_course(&text, &self.extractor, &semester)
            }
            Domain::Student => self.builder.plan_student(&text, &self.student_extractor),
        }
    }

    /// 질문 실행. 결과 행과 표시 방식을 돌려준다.
    pub async fn run(
        &self,
        domain: Domain,
        text: &str,
        identity: &Identity,
        today: NaiveDate,
    ) -> Result<(Vec<Row>, DisplayMode)> {
        let plan = self.plan(domain, text, today)?;
        tracing::debug!("Plan: {}", plan.summary());

        let decision = self.guard.authorize(plan, identity).await?;
        let plan = match decision.narrowed_plan {
            Some(plan) if decision.allowed => plan,
            _ => {
                return Err(AppError::denied(
                    decision.denial_reason.unwrap_or_else(|| "접근 범위 없음".to_string()),
                ));
            }
        };

        let mode = match (&plan, domain) {
            (_, Domain::Course) => DisplayMode::Course,
            (QueryPlan::Structured(spec), Domain::Student) if spec.shape.is_aggregate() => {
                DisplayMode::Statistics
            }
            _ => DisplayMode::Student,
        };

        let rows = self.executor.execute(&plan).await.map_err(|e| match e {
            AppError::StorageExecutionFailed(_) | AppError::Connection(_) => e,
            other => AppError::StorageExecutionFailed(other.to_string()),
        })?;

        tracing::info!(
            "Query executed on {} with scope {}: {} rows",
            self.executor.backend(),
            decision.scope,
            rows.len()
        );
        Ok((rows, mode))
    }

    /// 질문 하나 처리. 모든 결과는 문자열로 돌아온다.
    pub async fn handle(
        &self,
        domain: Domain,
        text: &str,
        identity: &Identity,
        today: NaiveDate,
    ) -> String {
        let start = Instant::now();
        let (outcome, response) = match self.run(domain, text, identity, today).await {
            Ok((rows, mode)) => {
                let outcome = if rows.is_empty() {
                    RequestOutcome::NoData
                } else {
                    RequestOutcome::Success
                };
                (outcome, self.formatter.format(&rows, mode))
            }
            Err(err) => {
                let outcome = RequestOutcome::from_error(&err);
                match outcome {
                    RequestOutcome::StorageFailure => tracing::error!("Query failed: {}", err),
                    RequestOutcome::Denied | RequestOutcome::Rejected => {
                        tracing::warn!("Query rejected [{}]: {}", err.code(), err)
                    }
                    _ => tracing::info!("Clarification requested [{}]", err.code()),
                }
                (outcome, err.user_message())
            }
        };

        self.metrics.record(outcome, start.elapsed().as_millis() as u64);
        response
    }
}
