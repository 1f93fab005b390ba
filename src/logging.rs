//! 로깅 초기화
//!
//! `RUST_LOG` 환경변수를 우선 적용하고, 없으면 지정한 기본 레벨을 사용합니다.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// tracing 구독자 초기화
///
/// 이미 전역 구독자가 설정되어 있으면 아무것도 하지 않고 `false`를 반환합니다.
/// 테스트에서 여러 번 호출해도 안전합니다.
pub fn init_logging(default_level: Level) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
