//! 人机验证子系统
//!
//! 中置信度的自动化信号不直接处罚，改为下发一道轻量验证题：
//! 回答 a+b 的和、带一个表情符号、外加一处拼写错误（或至少 3 个词）。
//!
//! 每用户同时只有一条记录，状态机：absent -> pending -> {passed, expired}。
//! 过期在读取时惰性发现并删除，不依赖定时器。

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// 验证题有效期（秒）
pub const CHALLENGE_EXPIRY_SECS: i64 = 120;

/// 已知拼写错误集合（typo 判定用）
const KNOWN_TYPOS: &[&str] = &["teh", "adn", "recieve"];

/// 验证题记录
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub user_id: u64,
    /// 操作数 a ∈ [5,9]
    pub operand_a: u32,
    /// 操作数 b ∈ [6,9]
    pub operand_b: u32,
    /// 过期时间（Unix 秒，含）
    pub expires_at: i64,
    /// 是否已通过（通过后对后续验证惰性失效，需重新 create）
    pub passed: bool,
}

impl ChallengeRecord {
    pub fn expected_sum(&self) -> u32 {
        self.operand_a + self.operand_b
    }
}

/// 验证题管理器
#[derive(Debug, Default)]
pub struct ChallengeManager {
    pending: DashMap<u64, ChallengeRecord>,
}

impl ChallengeManager {
    pub fn new() -> Self {
        Self { pending: DashMap::new() }
    }

    /// 下发新验证题（覆盖该用户的任何旧记录）
    pub fn create(&self, user_id: u64, now: i64) -> ChallengeRecord {
        let record = ChallengeRecord {
            user_id,
            operand_a: fastrand::u32(5..=9),
            operand_b: fastrand::u32(6..=9),
            expires_at: now + CHALLENGE_EXPIRY_SECS,
            passed: false,
        };
        self.pending.insert(user_id, record);
        record
    }

    /// 读取记录；已过期的在此处删除并返回 None
    pub fn get(&self, user_id: u64, now: i64) -> Option<ChallengeRecord> {
        let record = self.pending.get(&user_id).map(|r| *r)?;
        if now > record.expires_at {
            self.pending.remove(&user_id);
            return None;
        }
        Some(record)
    }

    /// 校验用户的回复；通过则把记录标记为 passed 并返回 true
    ///
    /// 通过条件：含等于 a+b 的数字 且 含表情符号 且（有拼写错误 或 ≥3 个词）。
    /// 无挂起记录、已通过、已过期、格式不合法一律返回 false，用户可在
    /// 有效期内重试。
    pub fn verify(&self, user_id: u64, now: i64, response: &str) -> bool {
        let record = match self.get(user_id, now) {
            Some(r) if !r.passed => r,
            _ => return false,
        };

        if !check_response(response, record.expected_sum()) {
            return false;
        }

        if let Some(mut entry) = self.pending.get_mut(&user_id) {
            entry.passed = true;
        }
        true
    }

    /// 机会性清理过期记录
    pub fn purge_expired(&self, now: i64) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, r| now <= r.expires_at);
        before - self.pending.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// 验证回复文本是否满足三个子条件
fn check_response(response: &str, expected_sum: u32) -> bool {
    let tokens: Vec<&str> = response.split_whitespace().collect();
    if tokens.is_empty() {
        return false;
    }

    let has_number = tokens.iter().any(|t| {
        t.chars().all(|c| c.is_ascii_digit()) && t.parse::<u32>() == Ok(expected_sum)
    });

    // 粗粒度表情判定：码点超过 10000 的字符
    let has_emoji = response.chars().any(|c| c as u32 > 10000);

    // "拼写错误"：命中已知错拼词，或原文里有连续两个空格
    let typoish = tokens
        .iter()
        .any(|t| t.len() >= 3 && KNOWN_TYPOS.contains(&t.to_lowercase().as_str()))
        || response.contains("  ");

    has_number && has_emoji && (typoish || tokens.len() >= 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_fixed_record(a: u32, b: u32, now: i64) -> ChallengeManager {
        let manager = ChallengeManager::new();
        manager.pending.insert(
            42,
            ChallengeRecord {
                user_id: 42,
                operand_a: a,
                operand_b: b,
                expires_at: now + CHALLENGE_EXPIRY_SECS,
                passed: false,
            },
        );
        manager
    }

    #[test]
    fn test_create_operand_ranges() {
        let manager = ChallengeManager::new();
        for _ in 0..50 {
            let r = manager.create(1, 0);
            assert!((5..=9).contains(&r.operand_a));
            assert!((6..=9).contains(&r.operand_b));
            assert_eq!(r.expires_at, CHALLENGE_EXPIRY_SECS);
            assert!(!r.passed);
        }
    }

    #[test]
    fn test_pass_requires_all_three_conditions() {
        // 操作数 5 和 7，期望和 12
        let manager = manager_with_fixed_record(5, 7, 0);
        assert!(manager.verify(42, 10, "12 😅 teh"));

        // 没有表情
        let manager = manager_with_fixed_record(5, 7, 0);
        assert!(!manager.verify(42, 10, "12 hello world"));

        // 没有正确的数字
        let manager = manager_with_fixed_record(5, 7, 0);
        assert!(!manager.verify(42, 10, "hi 😅 teh"));
    }

    #[test]
    fn test_three_tokens_substitute_for_typo() {
        let manager = manager_with_fixed_record(5, 7, 0);
        // 无拼写错误但有 3 个词
        assert!(manager.verify(42, 10, "12 😅 ok"));

        let manager = manager_with_fixed_record(5, 7, 0);
        // 两个词且无拼写错误：不通过
        assert!(!manager.verify(42, 10, "12 😅"));
    }

    #[test]
    fn test_double_space_counts_as_typo() {
        let manager = manager_with_fixed_record(5, 7, 0);
        assert!(manager.verify(42, 10, "12  😅"));
    }

    #[test]
    fn test_empty_and_malformed_responses_fail() {
        let manager = manager_with_fixed_record(5, 7, 0);
        assert!(!manager.verify(42, 10, ""));
        assert!(!manager.verify(42, 10, "   "));
        // "12," 不是纯数字 token
        assert!(!manager.verify(42, 10, "12, 😅 teh"));
    }

    #[test]
    fn test_lazy_expiry_on_read() {
        let manager = manager_with_fixed_record(5, 7, 0);
        // 恰好在过期时刻仍有效
        assert!(manager.get(42, CHALLENGE_EXPIRY_SECS).is_some());
        // 过期后读取即删除
        assert!(manager.get(42, CHALLENGE_EXPIRY_SECS + 1).is_none());
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_passed_record_is_inert_until_recreated() {
        let manager = manager_with_fixed_record(5, 7, 0);
        assert!(manager.verify(42, 10, "12 😅 teh"));
        // 已通过的记录不再接受验证
        assert!(!manager.verify(42, 20, "12 😅 teh"));

        // create 覆盖为全新 pending
        let r = manager.create(42, 100);
        assert!(!r.passed);
    }

    #[test]
    fn test_create_replaces_prior_record() {
        let manager = manager_with_fixed_record(5, 7, 0);
        let fresh = manager.create(42, 50);
        assert_eq!(fresh.expires_at, 50 + CHALLENGE_EXPIRY_SECS);
        assert_eq!(manager.pending_count(), 1);
    }
}
