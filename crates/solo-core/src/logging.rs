//! tracing 기반 로깅 초기화.
//!
//! 리스크 엔진은 라이브러리로 쓰이므로 로깅 초기화는 바이너리/테스트
//! 진입점에서 한 번 호출합니다. 세 가지 출력 형식을 지원합니다:
//! - **pretty**: 개발용 사람이 읽기 쉬운 형식
//! - **json**: 운영환경/로그 집계용 JSON 형식
//! - **compact**: 로그 크기를 줄이기 위한 간결한 형식

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 색상이 포함된 사람이 읽기 쉬운 형식 (개발용)
    Pretty,
    /// 로그 집계용 JSON 형식 (운영용)
    Json,
    /// 간결한 한 줄 형식
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 로그 레벨 필터 (예: "info", "debug", "solo_risk=debug")
    pub level: String,
    /// 출력 형식
    pub format: LogFormat,
    /// span 이벤트 포함 여부 (진입/종료)
    pub with_span_events: bool,
    /// 파일명과 줄 번호 포함 여부
    pub with_file: bool,
    /// 대상(모듈 경로) 포함 여부
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_span_events: false,
            with_file: true,
            with_target: true,
        }
    }
}

impl LogConfig {
    /// 새 로그 설정을 생성합니다.
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// 로그 형식을 설정합니다.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// span 이벤트를 활성화합니다.
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// 환경 변수에서 설정을 생성합니다.
    pub fn from_env() -> Self {
        let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let format = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(LogFormat::Pretty);

        Self {
            level,
            format,
            ..Default::default()
        }
    }
}

/// 주어진 설정으로 로깅 시스템을 초기화합니다.
///
/// # 예제
///
/// ```no_run
/// use solo_core::logging::{init_logging, LogConfig, LogFormat};
///
/// // 간단한 초기화
/// init_logging(LogConfig::default()).unwrap();
///
/// // 사용자 정의 설정으로 초기화
/// let config = LogConfig::new("debug")
///     .with_format(LogFormat::Json);
/// init_logging(config).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    // 공통 옵션을 먼저 구성하고 출력 형식만 마지막에 분기한다
    let base = fmt::layer()
        .with_file(config.with_file)
        .with_line_number(config.with_file)
        .with_target(config.with_target)
        .with_span_events(span_events);
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Pretty => registry.with(base.pretty()).try_init()?,
        LogFormat::Json => registry.with(base.json()).try_init()?,
        LogFormat::Compact => registry.with(base.compact()).try_init()?,
    }

    tracing::info!(
        format = ?config.format,
        level = %config.level,
        "Logging initialized"
    );

    Ok(())
}

/// 환경 변수에서 로깅을 초기화합니다.
///
/// 레벨에는 `RUST_LOG`를, 형식에는 `LOG_FORMAT`을 사용합니다.
pub fn init_logging_from_env() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LogConfig::from_env())
}
