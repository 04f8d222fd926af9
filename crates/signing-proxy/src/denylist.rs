//! 에이전트 차단 목록
//!
//! 드라이버와 프록시 정책이 같은 [`Denylist`]를 복제해 공유합니다.
//! 드라이버는 쓰기 잠금으로 키를 추가하고, 정책은 요청마다 읽기 잠금으로 조회합니다.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use keyfault_core::AgentKey;

/// 공유 가능한 에이전트 차단 목록
///
/// `Clone`은 같은 집합을 가리키는 핸들을 만듭니다.
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    inner: Arc<RwLock<HashSet<AgentKey>>>,
}

impl Denylist {
    /// 빈 차단 목록을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 키를 추가합니다. 새로 추가되었으면 `true`를 반환합니다.
    pub fn insert(&self, key: AgentKey) -> bool {
        self.write().insert(key)
    }

    /// 키를 제거합니다. 존재했으면 `true`를 반환합니다.
    pub fn remove(&self, key: &AgentKey) -> bool {
        self.write().remove(key)
    }

    /// 키가 차단 목록에 있는지 확인합니다.
    pub fn contains(&self, key: &AgentKey) -> bool {
        self.read().contains(key)
    }

    /// 차단된 키 개수
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// 현재 시점의 복사본
    pub fn snapshot(&self) -> HashSet<AgentKey> {
        self.read().clone()
    }

    // 집합 연산은 중간에 패닉하지 않으므로 poison 상태의 값도 그대로 사용합니다.
    fn read(&self) -> RwLockReadGuard<'_, HashSet<AgentKey>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashSet<AgentKey>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
