//! 파이프라인 trait — 확장 포인트 정의
//!
//! 엔진은 네 가지 확장 지점으로 구성됩니다.
//!
//! - [`Input`]: 외부 소스에서 [`RawMessage`]를 읽어 원시 메시지 큐로 보냅니다.
//! - [`EventTypeMatcher`]: 원시 바이트에 의미 타입을 부여합니다.
//! - [`Rule`]: 타입 이벤트를 처리하고, 선택적으로 주기적 윈도우 결과를 생성합니다.
//! - [`Output`]: 공유 출력 큐를 끝까지 소비합니다.
//!
//! `Input`/`Output`은 `Box<dyn ...>`로 보관되어야 하므로 async 메서드 대신
//! [`BoxFuture`]를 반환합니다.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{AdapterError, ClassifyError, RuleError};
use crate::event::{OutputEvent, RawMessage, RuleOutput, TypedEvent};

/// `Send`인 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 이벤트 처리 규칙
///
/// 새로운 탐지/필터 규칙을 추가하려면 이 trait을 구현합니다.
/// 하나의 규칙 인스턴스는 이벤트 처리 태스크와 윈도우 태스크에서 동시에 참조되므로
/// 처리 메서드는 `&self`를 받으며, 가변 상태는 내부 가변성으로 관리해야 합니다.
///
/// # 생명주기
///
/// `initialize` → (`process` | `window_flush`)* → `close`
pub trait Rule: Send + Sync {
    /// 규칙 이름 (로그 및 리포트에 사용)
    fn name(&self) -> &str;

    /// 규칙 초기화
    ///
    /// 실패한 규칙은 엔진에서 제외되고, 나머지 규칙으로 실행을 계속합니다.
    fn initialize(&mut self) -> Result<(), RuleError>;

    /// 이벤트 하나를 처리합니다.
    ///
    /// 무관한 이벤트 타입이나 조건 불일치는 `None`으로 무시합니다.
    fn process(&self, event: &TypedEvent) -> Option<RuleOutput>;

    /// 윈도우 주기. `Duration::ZERO`이면 윈도우 처리를 하지 않습니다.
    fn window_interval(&self) -> Duration {
        Duration::ZERO
    }

    /// 윈도우 주기마다 호출되어 누적 결과를 내보냅니다.
    fn window_flush(&self) -> Result<Vec<OutputEvent>, RuleError> {
        Ok(Vec::new())
    }

    /// 입력 큐가 모두 소진된 뒤 한 번 호출됩니다.
    fn close(&self) {}
}

/// 입력 어댑터
///
/// `retrieve`는 입력이 끝날 때까지 원시 메시지를 `tx`로 보냅니다.
/// 반환 시 `tx`가 drop되어 원시 메시지 큐가 닫힙니다.
pub trait Input: Send {
    /// 어댑터 이름
    fn name(&self) -> &str;

    /// 어댑터 초기화. 실패는 실행 전체를 중단시킵니다.
    fn initialize(&mut self) -> BoxFuture<'_, Result<(), AdapterError>>;

    /// 입력을 끝까지 읽어 원시 메시지 큐로 보냅니다.
    fn retrieve(
        self: Box<Self>,
        tx: mpsc::Sender<RawMessage>,
    ) -> BoxFuture<'static, Result<(), AdapterError>>;
}

/// 출력 어댑터
///
/// `sink`는 출력 큐가 닫히고 모두 소진될 때까지 읽어야 합니다.
pub trait Output: Send {
    /// 어댑터 이름
    fn name(&self) -> &str;

    /// 출력 큐를 끝까지 소비하고 기록한 레코드 수를 반환합니다.
    fn sink(
        self: Box<Self>,
        rx: mpsc::Receiver<RuleOutput>,
    ) -> BoxFuture<'static, Result<u64, AdapterError>>;
}

/// 이벤트 타입 매처
///
/// 분류기는 등록 순서대로 `matches`를 호출하고, 처음 매칭된 매처의 `build`로
/// 타입 이벤트를 만듭니다.
pub trait EventTypeMatcher: Send + Sync {
    /// 이벤트 타입명
    fn name(&self) -> &str;

    /// 원시 바이트가 이 타입인지 판별합니다.
    fn matches(&self, data: &[u8]) -> bool;

    /// 원시 메시지로부터 타입 이벤트를 생성합니다.
    fn build(&self, raw: &RawMessage) -> Result<TypedEvent, ClassifyError>;
}
