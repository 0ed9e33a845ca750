//! Access Scope Guard
//!
//! Binds every student query to the authenticated caller before it reaches
//! storage. Course catalog queries pass untouched. Student row queries are
//! narrowed to the caller's own record, and peer statistics are reduced to
//! counts and averages over the caller's own major and admission cohort.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;
use crate::models::schema::students;
use crate::models::{
    AccessDecision, AccessScope, BoundValue, CallerProfile, FieldFilter, Identity, Predicate,
    Projection, QueryPlan, QuerySpec, ResultShape, Row, TargetEntity,
};
use crate::services::query_builder::peer_aggregate_columns;
use crate::storage::QueryExecutor;

/// Denial reasons
pub const REASON_IDENTITY_REQUIRED: &str = "본인 확인이 필요합니다 (학번 미인증)";
pub const REASON_PASS_THROUGH: &str = "학생 정보는 직접 쿼리로 조회할 수 없습니다";
pub const REASON_OTHER_STUDENT: &str = "다른 학생의 정보는 조회할 수 없습니다";
pub const REASON_PROFILE_UNAVAILABLE: &str = "본인 학적 정보를 확인할 수 없습니다";

/// Resolves the caller's own academic attributes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    /// Look up the profile of an authenticated student key
    async fn resolve(&self, student_key: &str) -> Result<Option<CallerProfile>>;
}

/// Profile resolver backed by the query executor
pub struct ExecutorProfileResolver {
    executor: Arc<dyn QueryExecutor>,
}

impl ExecutorProfileResolver {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }

    fn profile_plan(student_key: &str) -> QueryPlan {
        let column = |field: &str| Projection::new(field, field);
        QueryPlan::Structured(QuerySpec {
            target: TargetEntity::Student,
            predicates: vec![Predicate::Field(FieldFilter::eq(
                students::STUDENT_ID,
                student_key,
            ))],
            order_by: Vec::new(),
            limit: 1,
            shape: ResultShape::Rows(vec![
                column(students::STUDENT_ID),
                column(students::NAME),
                column(students::MAJOR_CODE),
                column(students::ADMISSION_YEAR),
            ]),
        })
    }
}

fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn year_of(value: Option<&Value>) -> Option<i32> {
    match value? {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn profile_from_row(row: &Row) -> Option<CallerProfile> {
    Some(CallerProfile {
        student_id: text_of(row.get(students::STUDENT_ID))?,
        name: text_of(row.get(students::NAME))?,
        major_code: text_of(row.get(students::MAJOR_CODE))?,
        admission_year: year_of(row.get(students::ADMISSION_YEAR))?,
    })
}

#[async_trait]
impl ProfileResolver for ExecutorProfileResolver {
    async fn resolve(&self, student_key: &str) -> Result<Option<CallerProfile>> {
        let rows = self.executor.execute(&Self::profile_plan(student_key)).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let profile = profile_from_row(row);

        if profile.is_none() {
            tracing::warn!("Incomplete profile for student {}", student_key);
        }
        Ok(profile)
    }
}

/// Access scope guard
pub struct AccessScopeGuard {
    resolver: Arc<dyn ProfileResolver>,
}

impl AccessScopeGuard {
    pub fn new(resolver: Arc<dyn ProfileResolver>) -> Self {
        Self { resolver }
    }

    /// Whether deciding on this plan needs the caller's profile
    pub fn needs_profile(plan: &QueryPlan) -> bool {
        match plan {
            QueryPlan::Structured(spec) if spec.target == TargetEntity::Student => {
                spec.shape.is_aggregate() || spec.filters_on(students::NAME).next().is_some()
            }
            _ => false,
        }
    }

    /// Authorize a plan, resolving the caller profile only when required
    pub async fn authorize(&self, plan: QueryPlan, identity: &Identity) -> Result<AccessDecision> {
        let profile = match identity.student_key() {
            Some(key) if Self::needs_profile(&plan) => self.resolver.resolve(key).await?,
            _ => None,
        };

        let decision = Self::decide(plan, identity, profile.as_ref());
        if decision.allowed {
            tracing::debug!("Access granted with scope {}", decision.scope);
        } else {
            tracing::warn!(
                "Access denied: {}",
                decision.denial_reason.as_deref().unwrap_or_default()
            );
        }
        Ok(decision)
    }

    /// Pure access decision
    pub fn decide(
        plan: QueryPlan,
        identity: &Identity,
        profile: Option<&CallerProfile>,
    ) -> AccessDecision {
        if plan.target() == TargetEntity::Course {
            return AccessDecision::allow(AccessScope::Unscoped, plan);
        }

        let Some(key) = identity.student_key() else {
            return AccessDecision::deny(REASON_IDENTITY_REQUIRED);
        };

        let spec = match plan {
            QueryPlan::Structured(spec) => spec,
            QueryPlan::PassThrough(_) => return AccessDecision::deny(REASON_PASS_THROUGH),
        };

        if Self::names_other_student(&spec, key, profile) {
            return AccessDecision::deny(REASON_OTHER_STUDENT);
        }

        if spec.shape.is_aggregate() {
            match profile {
                Some(profile) => AccessDecision::allow(
                    AccessScope::PeerAggregateScoped,
                    QueryPlan::Structured(Self::peer_scoped(spec, profile)),
                ),
                None => AccessDecision::deny(REASON_PROFILE_UNAVAILABLE),
            }
        } else {
            AccessDecision::allow(
                AccessScope::SelfScoped,
                QueryPlan::Structured(Self::self_scoped(spec, key)),
            )
        }
    }

    /// Whether an identity predicate points at anyone but the caller
    fn names_other_student(spec: &QuerySpec, key: &str, profile: Option<&CallerProfile>) -> bool {
        let other_id = spec
            .filters_on(students::STUDENT_ID)
            .any(|filter| filter.value != BoundValue::text(key));

        let other_name = spec.filters_on(students::NAME).any(|filter| match profile {
            Some(profile) => filter.value != BoundValue::text(profile.name.as_str()),
            None => true,
        });

        other_id || other_name
    }

    /// Replace identity predicates with the caller's own key
    fn self_scoped(mut spec: QuerySpec, key: &str) -> QuerySpec {
        spec.predicates.retain(|predicate| !predicate.touches_identity());
        spec.predicates.push(Predicate::Field(FieldFilter::eq(
            students::STUDENT_ID,
            key,
        )));
        spec
    }

    /// Restrict statistics to the caller's major and admission year
    fn peer_scoped(mut spec: QuerySpec, profile: &CallerProfile) -> QuerySpec {
        spec.predicates.retain(|predicate| {
            !predicate.touches_identity()
                && predicate.filters().iter().all(|filter| {
                    filter.field != students::MAJOR_CODE && filter.field != students::ADMISSION_YEAR
                })
        });
        spec.predicates.push(Predicate::Field(FieldFilter::eq(
            students::MAJOR_CODE,
            profile.major_code.as_str(),
        )));
        spec.predicates.push(Predicate::Field(FieldFilter::eq(
            students::ADMISSION_YEAR,
            profile.admission_year,
        )));
        spec.order_by.clear();
        spec.limit = 1;
        spec.shape = ResultShape::Aggregate(peer_aggregate_columns());
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{PassThroughQuery, StudentIntent};
    use crate::services::query_builder::QueryBuilder;
    use crate::storage::executor::MockQueryExecutor;
    use serde_json::json;

    fn caller() -> CallerProfile {
        CallerProfile {
            student_id: "S123".into(),
            name: "다인장".into(),
            major_code: "M01".into(),
            admission_year: 2021,
        }
    }

    fn student_plan(intent: StudentIntent) -> QueryPlan {
        QueryPlan::Structured(QueryBuilder::default().build_student(&intent))
    }

    #[test]
    fn test_self_profile_is_bound_to_caller() {
        let decision = AccessScopeGuard::decide(
            student_plan(StudentIntent::SelfProfile),
            &Identity::student("S123"),
            None,
        );

        assert!(decision.allowed);
        assert_eq!(decision.scope, AccessScope::SelfScoped);
        let plan = decision.narrowed_plan.unwrap();
        let spec = plan.as_spec().unwrap();
        assert_eq!(
            spec.predicates,
            vec![Predicate::Field(FieldFilter::eq("student_id", "S123"))]
        );
    }

    #[test]
    fn test_course_plans_are_unscoped() {
        let plan = QueryPlan::PassThrough(PassThroughQuery {
            target: TargetEntity::Course,
            statement: "SELECT * FROM courses".into(),
        });
        let decision = AccessScopeGuard::decide(plan.clone(), &Identity::anonymous(), None);
        assert!(decision.allowed);
        assert_eq!(decision.scope, AccessScope::Unscoped);
        assert_eq!(decision.narrowed_plan, Some(plan));
    }

    #[test]
    fn test_student_plan_requires_identity() {
        let decision = AccessScopeGuard::decide(
            student_plan(StudentIntent::SelfProfile),
            &Identity::anonymous(),
            None,
        );
        assert!(!decision.allowed);
        assert_eq!(decision.scope, AccessScope::Denied);
        assert_eq!(decision.denial_reason.as_deref(), Some(REASON_IDENTITY_REQUIRED));
    }

    #[test]
    fn test_student_pass_through_is_denied() {
        let plan = QueryPlan::PassThrough(PassThroughQuery {
            target: TargetEntity::Student,
            statement: "SELECT * FROM students".into(),
        });
        let decision = AccessScopeGuard::decide(plan, &Identity::student("S123"), Some(&caller()));
        assert!(!decision.allowed);
        assert_eq!(decision.denial_reason.as_deref(), Some(REASON_PASS_THROUGH));
    }

    #[test]
    fn test_other_student_is_denied() {
        let identity = Identity::student("S123");
        let profile = caller();

        for intent in [
            StudentIntent::ById("S999".into()),
            StudentIntent::ByName("홍길동".into()),
        ] {
            let decision =
                AccessScopeGuard::decide(student_plan(intent), &identity, Some(&profile));
            assert!(!decision.allowed);
            assert_eq!(decision.denial_reason.as_deref(), Some(REASON_OTHER_STUDENT));
            assert!(decision.narrowed_plan.is_none());
        }
    }

    #[test]
    fn test_own_name_is_narrowed_not_denied() {
        let decision = AccessScopeGuard::decide(
            student_plan(StudentIntent::ByName("다인장".into())),
            &Identity::student("S123"),
            Some(&caller()),
        );
        assert_eq!(decision.scope, AccessScope::SelfScoped);
        let plan = decision.narrowed_plan.unwrap();
        assert_eq!(
            plan.as_spec().unwrap().predicates,
            vec![Predicate::Field(FieldFilter::eq("student_id", "S123"))]
        );
    }

    #[test]
    fn test_name_without_profile_is_denied() {
        let decision = AccessScopeGuard::decide(
            student_plan(StudentIntent::ByName("다인장".into())),
            &Identity::student("S123"),
            None,
        );
        assert!(!decision.allowed);
    }

    #[test]
    fn test_cohort_listing_is_narrowed_to_self() {
        let decision = AccessScopeGuard::decide(
            student_plan(StudentIntent::AdmissionCohort(2020)),
            &Identity::student("S123"),
            None,
        );
        assert_eq!(decision.scope, AccessScope::SelfScoped);
        let plan = decision.narrowed_plan.unwrap();
        let spec = plan.as_spec().unwrap();
        assert_eq!(spec.filters_on("student_id").count(), 1);
        assert!(spec.filters_on("name").next().is_none());
    }

    #[test]
    fn test_peer_statistics_are_aggregate_only() {
        let decision = AccessScopeGuard::decide(
            student_plan(StudentIntent::PeerStatistics),
            &Identity::student("S123"),
            Some(&caller()),
        );

        assert_eq!(decision.scope, AccessScope::PeerAggregateScoped);
        let plan = decision.narrowed_plan.unwrap();
        let spec = plan.as_spec().unwrap();
        assert!(spec.shape.is_aggregate());
        let exposed = spec.shape.exposed_fields();
        assert!(!exposed.contains(&"name"));
        assert!(!exposed.contains(&"student_id"));
        assert!(spec.predicates.iter().all(|p| !p.touches_identity()));
        assert_eq!(
            spec.predicates,
            vec![
                Predicate::Field(FieldFilter::eq("major_code", "M01")),
                Predicate::Field(FieldFilter::eq("admission_year", 2021)),
            ]
        );
    }

    #[test]
    fn test_peer_statistics_strip_forged_scope() {
        let mut spec = QueryBuilder::default().build_student(&StudentIntent::PeerStatistics);
        spec.predicates.push(Predicate::Field(FieldFilter::eq("major_code", "M99")));
        spec.shape = ResultShape::Aggregate(vec![]);

        let decision = AccessScopeGuard::decide(
            QueryPlan::Structured(spec),
            &Identity::student("S123"),
            Some(&caller()),
        );
        let plan = decision.narrowed_plan.unwrap();
        let spec = plan.as_spec().unwrap();
        assert_eq!(spec.filters_on("major_code").count(), 1);
        assert_eq!(spec.shape, ResultShape::Aggregate(peer_aggregate_columns()));
    }

    #[tokio::test]
    async fn test_authorize_skips_profile_lookup_when_not_needed() {
        let mut resolver = MockProfileResolver::new();
        resolver.expect_resolve().never();

        let guard = AccessScopeGuard::new(Arc::new(resolver));
        let decision = guard
            .authorize(student_plan(StudentIntent::SelfProfile), &Identity::student("S123"))
            .await
            .unwrap();
        assert_eq!(decision.scope, AccessScope::SelfScoped);
    }

    #[tokio::test]
    async fn test_authorize_resolves_profile_for_statistics() {
        let mut resolver = MockProfileResolver::new();
        resolver
            .expect_resolve()
            .withf(|key| key.to_string() == "S123")
            .times(1)
            .returning(|_| Ok(Some(caller())));

        let guard = AccessScopeGuard::new(Arc::new(resolver));
        let decision = guard
            .authorize(student_plan(StudentIntent::PeerStatistics), &Identity::student("S123"))
            .await
            .unwrap();
        assert_eq!(decision.scope, AccessScope::PeerAggregateScoped);
    }

    #[tokio::test]
    async fn test_authorize_propagates_resolver_failure() {
        let mut resolver = MockProfileResolver::new();
        resolver
            .expect_resolve()
            .returning(|_| Err(AppError::StorageExecutionFailed("down".into())));

        let guard = AccessScopeGuard::new(Arc::new(resolver));
        let result = guard
            .authorize(student_plan(StudentIntent::PeerStatistics), &Identity::student("S123"))
            .await;
        assert!(matches!(result, Err(AppError::StorageExecutionFailed(_))));
    }

    #[tokio::test]
    async fn test_executor_profile_resolver_reads_row() {
        let mut executor = MockQueryExecutor::new();
        executor
            .expect_execute()
            .withf(|plan| {
                plan.as_spec()
                    .map(|spec| spec.filters_on("student_id").count() == 1)
                    .unwrap_or(false)
            })
            .returning(|_| {
                Ok(vec![json!({
                    "student_id": "S123",
                    "name": "다인장",
                    "major_code": "M01",
                    "admission_year": "2021"
                })
                .as_object()
                .cloned()
                .unwrap()])
            });

        let resolver = ExecutorProfileResolver::new(Arc::new(executor));
        let profile = resolver.resolve("S123").await.unwrap();
        assert_eq!(profile, Some(caller()));
    }

    #[tokio::test]
    async fn test_executor_profile_resolver_unknown_student() {
        let mut executor = MockQueryExecutor::new();
        executor.expect_execute().returning(|_| Ok(vec![]));

        let resolver = ExecutorProfileResolver::new(Arc::new(executor));
        assert_eq!(resolver.resolve("S000").await.unwrap(), None);
    }
}
