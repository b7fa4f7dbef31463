//! 冷却与信任窗口
//!
//! 两者本质相同：`user_id -> expires_at` 的惰性过期表。
//! 过期只在读取时对当前时间判断，不跑任何后台定时器；
//! 残留的过期条目由 `purge_expired` 机会性回收。

use dashmap::DashMap;

/// 信任窗口时长（秒），仅在通过人机验证后授予
pub const TRUST_WINDOW_SECS: i64 = 300;

/// 惰性过期表
#[derive(Debug, Default)]
pub struct ExpiryMap {
    entries: DashMap<u64, i64>,
}

impl ExpiryMap {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// 是否在有效期内（无条目视为未激活）
    pub fn active(&self, user_id: u64, now: i64) -> bool {
        self.entries.get(&user_id).map_or(false, |e| now < *e)
    }

    /// 授予 / 覆盖有效期
    pub fn grant(&self, user_id: u64, now: i64, duration_secs: i64) {
        self.entries.insert(user_id, now + duration_secs);
    }

    /// 机会性清理过期条目，返回清理数量
    pub fn purge_expired(&self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| now < *expires_at);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 限速冷却表：action=throttle 时授予，时长由配置决定。
/// 冷却期内的事件仍会被上游记录，但不再进入评分流程。
#[derive(Debug, Default)]
pub struct CooldownStore {
    map: ExpiryMap,
}

impl CooldownStore {
    pub fn new() -> Self {
        Self { map: ExpiryMap::new() }
    }

    pub fn active(&self, user_id: u64, now: i64) -> bool {
        self.map.active(user_id, now)
    }

    pub fn set(&self, user_id: u64, now: i64, duration_secs: i64) {
        self.map.grant(user_id, now, duration_secs);
    }

    pub fn purge_expired(&self, now: i64) -> usize {
        self.map.purge_expired(now)
    }
}

/// 信任窗口：验证通过后 300 秒内风险乘 0.6 衰减
#[derive(Debug, Default)]
pub struct TrustWindow {
    map: ExpiryMap,
}

impl TrustWindow {
    pub fn new() -> Self {
        Self { map: ExpiryMap::new() }
    }

    pub fn active(&self, user_id: u64, now: i64) -> bool {
        self.map.active(user_id, now)
    }

    /// 授予固定 300 秒的信任窗口
    pub fn grant(&self, user_id: u64, now: i64) {
        self.map.grant(user_id, now, TRUST_WINDOW_SECS);
    }

    pub fn purge_expired(&self, now: i64) -> usize {
        self.map.purge_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_expiry_semantics() {
        let map = ExpiryMap::new();
        assert!(!map.active(1, 100));

        map.grant(1, 100, 20);
        assert!(map.active(1, 100));
        assert!(map.active(1, 119));
        // now == expires_at 即失效
        assert!(!map.active(1, 120));
        assert!(!map.active(1, 500));
    }

    #[test]
    fn test_grant_overwrites_expiry() {
        let map = ExpiryMap::new();
        map.grant(1, 100, 10);
        map.grant(1, 200, 10);
        assert!(map.active(1, 150));
        assert!(map.active(1, 209));
        assert!(!map.active(1, 210));
    }

    #[test]
    fn test_purge_removes_only_stale_entries() {
        let map = ExpiryMap::new();
        map.grant(1, 100, 10);
        map.grant(2, 100, 1000);
        assert_eq!(map.purge_expired(500), 1);
        assert_eq!(map.len(), 1);
        assert!(map.active(2, 500));
    }

    #[test]
    fn test_trust_window_duration_is_fixed() {
        let trust = TrustWindow::new();
        trust.grant(7, 1000);
        assert!(trust.active(7, 1000 + TRUST_WINDOW_SECS - 1));
        assert!(!trust.active(7, 1000 + TRUST_WINDOW_SECS));
    }
}
