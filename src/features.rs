//! 特征提取
//!
//! 从单用户滚动历史派生固定形状的特征快照。快照是临时值，
//! 每次按需基于当前时间重新计算，不做任何缓存。
//!
//! 内容哈希必须跨进程稳定（FxHasher，固定算法无随机种子），
//! 否则重复检测在状态持久化 / 跨进程对比时会静默失效。

use std::collections::HashSet;
use std::hash::Hasher;

use rustc_hash::FxHasher;

use crate::state::RollingUserState;

/// 滑动速率窗口（秒）
pub const RATE_WINDOW_SECS: i64 = 60;

/// 稀疏历史的间隔哨兵值（"几乎没发言，不构成自动化信号"）
pub const SPARSE_INTERVAL_SENTINEL: f64 = 999.0;

/// 特征快照（固定形状，全部非负）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSnapshot {
    /// 最近 60 秒消息速率（条/秒）
    pub msg_rate_60s: f64,
    /// 相邻消息间隔均值（秒）
    pub avg_inter: f64,
    /// 相邻消息间隔总体方差
    pub var_inter: f64,
    /// 消息长度均值
    pub avg_len: f64,
    /// 消息长度总体方差
    pub var_len: f64,
    /// 重复率 = 1 - 去重哈希数/总哈希数（不足 5 条时恒为 0）
    pub dup_ratio: f64,
    /// 最近 60 秒链接速率（条/秒）
    pub link_rate_60s: f64,
    /// 最近 60 秒提及速率（个/秒）
    pub mention_rate_60s: f64,
}

/// 归一化内容的稳定哈希（trim + 小写）
pub fn content_hash(text: &str) -> u64 {
    let normalized = text.trim().to_lowercase();
    let mut hasher = FxHasher::default();
    hasher.write(normalized.as_bytes());
    hasher.finish()
}

/// 消息是否含 URL 形态的片段（http(s):// 或 www. 开头的 token）
pub fn has_link(text: &str) -> bool {
    let lower = text.to_lowercase();
    if lower.contains("http://") || lower.contains("https://") {
        return true;
    }
    // "www." 后面必须紧跟非空白字符
    let mut rest = lower.as_str();
    while let Some(pos) = rest.find("www.") {
        let after = &rest[pos + 4..];
        if matches!(after.chars().next(), Some(c) if !c.is_whitespace()) {
            return true;
        }
        rest = after;
    }
    false
}

/// 更新用户历史（追加本条消息的五项记录）
pub fn update_state(state: &mut RollingUserState, now: i64, content: &str, mention_count: u32) {
    state.push(
        now,
        content.chars().count(),
        content_hash(content),
        has_link(content),
        mention_count,
    );
}

/// 从滚动历史提取特征快照
///
/// 历史不足 3 条时返回退化快照：速率全 0、间隔取哨兵值 999，
/// 避免冷启动用户被误判。
pub fn extract_features(state: &RollingUserState, now: i64) -> FeatureSnapshot {
    let ts = &state.timestamps;

    let (avg_len, var_len) = mean_var_usize(&state.lengths);

    if ts.len() < 3 {
        return FeatureSnapshot {
            msg_rate_60s: 0.0,
            avg_inter: SPARSE_INTERVAL_SENTINEL,
            var_inter: SPARSE_INTERVAL_SENTINEL,
            avg_len,
            var_len,
            dup_ratio: 0.0,
            link_rate_60s: 0.0,
            mention_rate_60s: 0.0,
        };
    }

    let in_window = |t: i64| now - t <= RATE_WINDOW_SECS;

    let msg_rate_60s = ts.iter().filter(|&&t| in_window(t)).count() as f64 / RATE_WINDOW_SECS as f64;

    // 相邻消息间隔
    let inter: Vec<f64> = ts
        .iter()
        .zip(ts.iter().skip(1))
        .map(|(a, b)| (b - a) as f64)
        .collect();
    let avg_inter = mean(&inter);
    let var_inter = if inter.len() > 1 { variance(&inter, avg_inter) } else { 0.0 };

    // 重复率（至少 5 条哈希才有意义）
    let hashes = &state.content_hashes;
    let dup_ratio = if hashes.len() >= 5 {
        let distinct: HashSet<u64> = hashes.iter().copied().collect();
        1.0 - (distinct.len() as f64 / hashes.len() as f64)
    } else {
        0.0
    };

    // 窗口内的链接 / 提及速率（按配对时间戳过滤）
    let link_rate_60s = ts
        .iter()
        .zip(state.link_flags.iter())
        .filter(|(&t, _)| in_window(t))
        .map(|(_, &f)| f as f64)
        .sum::<f64>()
        / RATE_WINDOW_SECS as f64;
    let mention_rate_60s = ts
        .iter()
        .zip(state.mention_counts.iter())
        .filter(|(&t, _)| in_window(t))
        .map(|(_, &c)| c as f64)
        .sum::<f64>()
        / RATE_WINDOW_SECS as f64;

    FeatureSnapshot {
        msg_rate_60s,
        avg_inter,
        var_inter,
        avg_len,
        var_len,
        dup_ratio,
        link_rate_60s,
        mention_rate_60s,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 总体方差（分母为 n）
fn variance(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn mean_var_usize(values: &std::collections::VecDeque<usize>) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let floats: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    let m = mean(&floats);
    let v = if floats.len() > 1 { variance(&floats, m) } else { 0.0 };
    (m, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RollingUserState;

    #[test]
    fn test_content_hash_is_normalized_and_stable() {
        assert_eq!(content_hash("Hello World"), content_hash("  hello world  "));
        assert_ne!(content_hash("hello"), content_hash("world"));
        // 固定算法：同一输入任何时候都得到同一哈希
        assert_eq!(content_hash("abc"), content_hash("abc"));
    }

    #[test]
    fn test_has_link() {
        assert!(has_link("check https://example.com now"));
        assert!(has_link("HTTP://UPPER.CASE"));
        assert!(has_link("visit www.example.com"));
        assert!(!has_link("www. 后面是空白不算"));
        assert!(!has_link("just a plain message"));
    }

    #[test]
    fn test_sparse_history_returns_degenerate_snapshot() {
        let mut state = RollingUserState::new();
        update_state(&mut state, 100, "hi", 0);
        update_state(&mut state, 105, "there", 0);

        let f = extract_features(&state, 110);
        assert_eq!(f.msg_rate_60s, 0.0);
        assert_eq!(f.link_rate_60s, 0.0);
        assert_eq!(f.mention_rate_60s, 0.0);
        assert_eq!(f.avg_inter, SPARSE_INTERVAL_SENTINEL);
        assert_eq!(f.var_inter, SPARSE_INTERVAL_SENTINEL);
        // 长度统计仍然基于已有历史
        assert!((f.avg_len - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_rates_count_only_recent_window() {
        let mut state = RollingUserState::new();
        update_state(&mut state, 0, "old https://spam.example", 3);
        update_state(&mut state, 1000, "new https://spam.example", 2);
        update_state(&mut state, 1010, "new plain", 1);
        update_state(&mut state, 1020, "new plain", 1);

        let f = extract_features(&state, 1030);
        // 旧消息在 60 秒窗口之外
        assert!((f.msg_rate_60s - 3.0 / 60.0).abs() < 1e-9);
        assert!((f.link_rate_60s - 1.0 / 60.0).abs() < 1e-9);
        assert!((f.mention_rate_60s - 4.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_dup_ratio_gated_below_five_hashes() {
        let mut state = RollingUserState::new();
        for i in 0..4 {
            update_state(&mut state, i * 10, "same message", 0);
        }
        assert_eq!(extract_features(&state, 100).dup_ratio, 0.0);

        update_state(&mut state, 40, "same message", 0);
        let f = extract_features(&state, 100);
        // 5 条全重复：1 - 1/5
        assert!((f.dup_ratio - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_dup_ratio_non_decreasing_with_more_duplicates() {
        let mut state = RollingUserState::new();
        for i in 0..5 {
            update_state(&mut state, i, &format!("unique {}", i), 0);
        }
        let mut last = extract_features(&state, 100).dup_ratio;
        for i in 5..20 {
            update_state(&mut state, i, "copy paste", 0);
            let cur = extract_features(&state, 100).dup_ratio;
            assert!(cur >= last);
            last = cur;
        }
    }

    #[test]
    fn test_uniform_cadence_has_zero_variance() {
        let mut state = RollingUserState::new();
        for i in 0..10 {
            update_state(&mut state, i * 5, "msg", 0);
        }
        let f = extract_features(&state, 50);
        assert!((f.avg_inter - 5.0).abs() < 1e-9);
        assert_eq!(f.var_inter, 0.0);
    }
}
