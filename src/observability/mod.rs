//! 관측 모듈
//!
//! 구조화 로그 초기화와 질의 처리 지표를 제공한다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, fmt::writer::BoxMakeWriter, prelude::*};

use crate::config::LoggingConfig;
use crate::error::{AppError, Result};

// ===== Pipeline Metrics =====

/// 요청 처리 결과 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// 결과 행 있음
    Success,
    /// 결과 없음
    NoData,
    /// 예시 안내 또는 추가 정보 요청
    Clarification,
    /// 접근 범위 거부
    Denied,
    /// 입력 또는 직접 쿼리 거부
    Rejected,
    /// 저장소 실패
    StorageFailure,
}

impl RequestOutcome {
    /// 오류 종류별 분류
    pub fn from_error(err: &AppError) -> Self {
        match err {
            AppError::ExtractionAmbiguous { .. } | AppError::Clarification(_) => {
                RequestOutcome::Clarification
            }
            AppError::ScopeDenied { .. } => RequestOutcome::Denied,
            AppError::EntityNotPermitted { .. } | AppError::Validation(_) => {
                RequestOutcome::Rejected
            }
            _ => RequestOutcome::StorageFailure,
        }
    }
}

/// 질의 처리 지표
#[derive(Clone, Default)]
pub struct PipelineMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub success_total: Arc<AtomicU64>,
    pub no_data_total: Arc<AtomicU64>,
    pub clarification_total: Arc<AtomicU64>,
    pub denied_total: Arc<AtomicU64>,
    pub rejected_total: Arc<AtomicU64>,
    pub storage_failures_total: Arc<AtomicU64>,
    pub duration_sum_ms: Arc<AtomicU64>,
}

impl PipelineMetrics {
    fn counter(&self, outcome: RequestOutcome) -> &AtomicU64 {
        match outcome {
            RequestOutcome::Success => &self.success_total,
            RequestOutcome::NoData => &self.no_data_total,
            RequestOutcome::Clarification => &self.clarification_total,
            RequestOutcome::Denied => &self.denied_total,
            RequestOutcome::Rejected => &self.rejected_total,
            RequestOutcome::StorageFailure => &self.storage_failures_total,
        }
    }

    /// 요청 하나 기록
    pub fn record(&self, outcome: RequestOutcome, duration_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::SeqCst);
        self.duration_sum_ms.fetch_add(duration_ms, Ordering::SeqCst);
        self.counter(outcome).fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self, outcome: RequestOutcome) -> u64 {
        self.counter(outcome).load(Ordering::SeqCst)
    }

    /// Prometheus 형식 출력
    pub fn gather(&self) -> String {
        format!(
            r#"# HELP haksa_requests_total Total questions handled
# TYPE haksa_requests_total counter
haksa_requests_total {}
# HELP haksa_request_duration_seconds Question handling duration in seconds
# TYPE haksa_request_duration_seconds summary
haksa_request_duration_seconds_sum {}
haksa_request_duration_seconds_count {}
# HELP haksa_outcomes_total Questions by outcome
# TYPE haksa_outcomes_total counter
haksa_outcomes_total{{outcome="success"}} {}
haksa_outcomes_total{{outcome="no_data"}} {}
haksa_outcomes_total{{outcome="clarification"}} {}
haksa_outcomes_total{{outcome="denied"}} {}
haksa_outcomes_total{{outcome="rejected"}} {}
haksa_outcomes_total{{outcome="storage_failure"}} {}
"#,
            self.requests_total.load(Ordering::SeqCst),
            self.duration_sum_ms.load(Ordering::SeqCst) as f64 / 1000.0,
            self.requests_total.load(Ordering::SeqCst),
            self.success_total.load(Ordering::SeqCst),
            self.no_data_total.load(Ordering::SeqCst),
            self.clarification_total.load(Ordering::SeqCst),
            self.denied_total.load(Ordering::SeqCst),
            self.rejected_total.load(Ordering::SeqCst),
            self.storage_failures_total.load(Ordering::SeqCst),
        )
    }
}

// ===== Structured Logging =====

/// 로그 초기화
///
/// `RUST_LOG`가 있으면 우선한다. `log_dir`이 설정되면 일 단위로 회전하는
/// 파일에 기록하며, 반환된 guard가 살아 있는 동안만 기록된다.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = if config.level.is_empty() {
        "info"
    } else {
        config.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| AppError::Config(e.to_string()))?;

    let (writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "haksa.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = if config.structured {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_writer(writer)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| AppError::Config(e.to_string()))?;

    Ok(guard)
}
