//! 생명주기 trait — 정리 단계에서 정지시킬 컴포넌트
//!
//! [`Component`]는 시나리오가 띄운 자원(프록시, 자식 프로세스)이 구현하는 trait입니다.
//! RPITIT를 사용하므로 `dyn Component`가 불가하며, 동적 관리에는
//! [`DynComponent`]를 사용합니다.
//!
//! # 생명주기
//! ```text
//! 시작(컴포넌트별 생성자) → Running → shutdown() → Stopped
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::KeyfaultError;

/// `Pin<Box<dyn Future>>` 별칭
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 정지 가능한 컴포넌트
///
/// `shutdown`은 여러 번 호출해도 안전해야 합니다.
///
/// # 구현 예시
/// ```ignore
/// struct MyComponent;
///
/// impl Component for MyComponent {
///     fn name(&self) -> &str { "my-component" }
///
///     async fn shutdown(&self) -> Result<(), KeyfaultError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Component: Send + Sync {
    /// 로그에 사용할 컴포넌트 이름
    fn name(&self) -> &str;

    /// 컴포넌트를 정지하고 자원을 해제합니다.
    fn shutdown(&self) -> impl Future<Output = Result<(), KeyfaultError>> + Send;
}

/// 공유 핸들도 컴포넌트로 취급합니다.
///
/// 정리 단계에 넘긴 뒤에도 호출자가 핸들을 계속 조회할 수 있습니다.
impl<T: Component> Component for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn shutdown(&self) -> impl Future<Output = Result<(), KeyfaultError>> + Send {
        (**self).shutdown()
    }
}

/// dyn-compatible 컴포넌트 trait
///
/// `Vec<Box<dyn DynComponent>>`으로 정리 순서를 관리할 수 있게 합니다.
pub trait DynComponent: Send + Sync {
    /// 로그에 사용할 컴포넌트 이름
    fn name(&self) -> &str;

    /// 컴포넌트를 정지합니다.
    fn shutdown(&self) -> BoxFuture<'_, Result<(), KeyfaultError>>;
}

/// Component를 구현한 타입은 자동으로 DynComponent도 구현됩니다.
impl<T: Component> DynComponent for T {
    fn name(&self) -> &str {
        Component::name(self)
    }

    fn shutdown(&self) -> BoxFuture<'_, Result<(), KeyfaultError>> {
        Box::pin(Component::shutdown(self))
    }
}
