//! 行为审核引擎
//!
//! 单事件处理管线：验证回复检查 -> 冷却闸门 -> 更新历史 ->
//! 特征提取 -> 双轴评分 -> 决策 -> 同步提交状态变更。
//!
//! 并发纪律：按用户串行。每个用户持有一个 `Arc<Mutex<...>>` 状态单元，
//! 整条"读-决策-提交"序列在该用户的锁内完成；不同用户的事件天然并行，
//! 不存在全局锁的队头阻塞。所有步骤都是 O(窗口=50) 的纯内存计算，
//! 不阻塞 I/O，外部副作用在引擎返回之后才由协作方执行。

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::challenge::ChallengeManager;
use crate::features::{extract_features, update_state};
use crate::model::{ChallengePayload, Decision, EngineOutcome, MessageEvent, ModAction};
use crate::policy::{assemble_reasons, decide, Thresholds};
use crate::scoring::{agent_score, final_risk, harm_score};
use crate::state::RollingUserState;
use crate::throttle::{CooldownStore, TrustWindow};

/// 审核引擎（进程级单例，内部状态全部驻留内存）
pub struct ModerationEngine {
    thresholds: Thresholds,
    /// 限速冷却时长（秒，来自配置）
    throttle_seconds: i64,
    /// 每用户滚动历史；Mutex 同时充当该用户的串行化锁
    users: DashMap<u64, Arc<Mutex<RollingUserState>>>,
    cooldowns: CooldownStore,
    trust: TrustWindow,
    challenges: ChallengeManager,
}

impl ModerationEngine {
    pub fn new(thresholds: Thresholds, throttle_seconds: i64) -> Self {
        Self {
            thresholds,
            throttle_seconds,
            users: DashMap::new(),
            cooldowns: CooldownStore::new(),
            trust: TrustWindow::new(),
            challenges: ChallengeManager::new(),
        }
    }

    /// 处理一条消息事件，返回需要外部协作方执行的内容
    ///
    /// `now` 由调用方提供（Unix 秒），引擎本身不读时钟。
    pub fn process_event(&self, event: &MessageEvent, now: i64) -> EngineOutcome {
        let cell = self
            .users
            .entry(event.user_id)
            .or_insert_with(|| Arc::new(Mutex::new(RollingUserState::new())))
            .clone();
        // 整个读-决策-提交序列持有该用户的锁
        let mut state = cell.lock();

        let mut outcome = EngineOutcome::default();
        let user_id = event.user_id;

        // 1. 挂起验证题：先看这条消息是不是验证回复
        if let Some(pending) = self.challenges.get(user_id, now) {
            if !pending.passed && self.challenges.verify(user_id, now, &event.content) {
                self.trust.grant(user_id, now);
                outcome.verification_passed = true;
                info!("✅ 用户 {} 通过人机验证，授予 {} 秒信任窗口", user_id, crate::throttle::TRUST_WINDOW_SECS);
            }
        }

        // 2. 冷却期内不评分（事件已由上游记录）
        if self.cooldowns.active(user_id, now) {
            debug!("⏳ 用户 {} 处于冷却期，跳过评分", user_id);
            return outcome;
        }

        let trust_active = self.trust.active(user_id, now);

        // 3. 更新历史并提取特征
        update_state(&mut state, now, &event.content, event.mention_count);
        let features = extract_features(&state, now);

        // 4. 双轴评分与融合
        let (a_score, a_reasons) = agent_score(&features, &event.content);
        let (h_score, h_reasons) = harm_score(&features);
        let risk = final_risk(a_score, h_score);

        // 5. 决策（信任衰减在策略内部完成）
        let policy = decide(a_score, risk, trust_active, &self.thresholds);
        let action = match policy.action {
            Some(action) => action,
            None => return outcome,
        };

        // 6. 先同步提交状态变更，再产出决策给协作方
        match action {
            ModAction::Throttle => {
                self.cooldowns.set(user_id, now, self.throttle_seconds);
            }
            ModAction::Challenge => {
                let record = self.challenges.create(user_id, now);
                outcome.challenge = Some(ChallengePayload {
                    operand_a: record.operand_a,
                    operand_b: record.operand_b,
                    expires_at: record.expires_at,
                });
            }
            ModAction::Warn | ModAction::Quarantine => {}
        }

        let decision = Decision {
            ts: now,
            user_id,
            guild_id: event.guild_id,
            channel_id: event.channel_id,
            message_id: event.message_id,
            agent_score: a_score,
            harm_score: h_score,
            final_risk: policy.effective_risk,
            action,
            reasons: assemble_reasons(&a_reasons, &h_reasons),
        };
        info!(
            "🛡️ 决策: user={} action={} risk={:.2} (agent={:.2} harm={:.2})",
            user_id,
            action.as_str(),
            decision.final_risk,
            a_score,
            h_score
        );
        outcome.decision = Some(decision);
        outcome
    }

    /// 当前追踪的用户数
    pub fn tracked_users(&self) -> usize {
        self.users.len()
    }

    /// 机会性清理过期的冷却 / 信任 / 验证条目
    pub fn purge_expired(&self, now: i64) {
        let cooldowns = self.cooldowns.purge_expired(now);
        let trust = self.trust.purge_expired(now);
        let challenges = self.challenges.purge_expired(now);
        if cooldowns + trust + challenges > 0 {
            debug!(
                "🧹 过期清理: cooldown={} trust={} challenge={}",
                cooldowns, trust, challenges
            );
        }
    }

    /// 测试与内省用：当前是否处于冷却 / 信任期
    pub fn cooldown_active(&self, user_id: u64, now: i64) -> bool {
        self.cooldowns.active(user_id, now)
    }

    pub fn trust_active(&self, user_id: u64, now: i64) -> bool {
        self.trust.active(user_id, now)
    }
}
