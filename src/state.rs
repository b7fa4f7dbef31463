//! 用户滚动历史
//!
//! 每个用户一份有界历史：五条平行序列（时间戳 / 长度 / 内容哈希 /
//! 链接标记 / 提及数），容量 50，满了先淘汰最旧的一条。
//! 五条序列必须原子地一起追加，任何时刻长度都相等。

use std::collections::VecDeque;

/// 历史容量（条）
pub const HISTORY_CAPACITY: usize = 50;

/// 单用户滚动状态
#[derive(Debug, Default)]
pub struct RollingUserState {
    /// 事件时间戳（Unix 秒，按到达顺序）
    pub timestamps: VecDeque<i64>,
    /// 消息长度（字符数）
    pub lengths: VecDeque<usize>,
    /// 归一化内容的稳定哈希（用于重复检测）
    pub content_hashes: VecDeque<u64>,
    /// 是否含 URL（0/1）
    pub link_flags: VecDeque<u8>,
    /// 每条消息的 @ 提及数
    pub mention_counts: VecDeque<u32>,
}

impl RollingUserState {
    pub fn new() -> Self {
        Self {
            timestamps: VecDeque::with_capacity(HISTORY_CAPACITY),
            lengths: VecDeque::with_capacity(HISTORY_CAPACITY),
            content_hashes: VecDeque::with_capacity(HISTORY_CAPACITY),
            link_flags: VecDeque::with_capacity(HISTORY_CAPACITY),
            mention_counts: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// 原子追加一条记录（五条序列一起推进，超容量时先淘汰最旧）
    pub fn push(&mut self, ts: i64, len: usize, content_hash: u64, has_link: bool, mentions: u32) {
        if self.timestamps.len() == HISTORY_CAPACITY {
            self.timestamps.pop_front();
            self.lengths.pop_front();
            self.content_hashes.pop_front();
            self.link_flags.pop_front();
            self.mention_counts.pop_front();
        }
        self.timestamps.push_back(ts);
        self.lengths.push_back(len);
        self.content_hashes.push_back(content_hash);
        self.link_flags.push_back(if has_link { 1 } else { 0 });
        self.mention_counts.push_back(mentions);
    }

    /// 当前记录条数
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_sequences_stay_aligned() {
        let mut state = RollingUserState::new();
        for i in 0..10 {
            state.push(i, 5, i as u64, false, 0);
        }
        assert_eq!(state.timestamps.len(), 10);
        assert_eq!(state.lengths.len(), 10);
        assert_eq!(state.content_hashes.len(), 10);
        assert_eq!(state.link_flags.len(), 10);
        assert_eq!(state.mention_counts.len(), 10);
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let mut state = RollingUserState::new();
        for i in 0..51 {
            state.push(i, 1, 0, false, 0);
        }
        // 追加 51 条后最旧的 ts=0 被淘汰，长度保持 50
        assert_eq!(state.len(), HISTORY_CAPACITY);
        assert!(!state.timestamps.contains(&0));
        assert_eq!(*state.timestamps.front().unwrap(), 1);
        assert_eq!(*state.timestamps.back().unwrap(), 50);
    }
}
