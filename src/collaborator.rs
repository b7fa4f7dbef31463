//! 外部协作方接口
//!
//! 核心引擎不做任何副作用：落库、发消息、改角色都通过这两个
//! 接口交给外部实现。引擎先同步提交内存状态，协作方调用不会
//! 阻塞决策路径。效果层的幂等（比如"已隔离"去重）由实现方负责。

use async_trait::async_trait;
use tracing::{info, warn};

use crate::model::{ChallengePayload, Decision, MessageEvent};

/// 持久化落点（原始事件 + 决策记录）
#[async_trait]
pub trait DecisionSink: Send + Sync {
    /// 记录一条原始事件
    async fn record_event(&self, event: &MessageEvent);

    /// 记录一条决策
    async fn record_decision(&self, decision: &Decision);
}

/// 处置动作执行方（消息回复、角色变更、验证提示渲染）
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// 通知用户验证已通过
    async fn notify_verification_passed(&self, user_id: u64);

    /// 警告（附带决策原因）
    async fn warn(&self, decision: &Decision);

    /// 限速提示
    async fn throttle_notice(&self, decision: &Decision, throttle_seconds: i64);

    /// 下发验证题提示
    async fn issue_challenge(&self, decision: &Decision, payload: &ChallengePayload);

    /// 隔离信号（交给角色管理方；role_name 来自配置）
    async fn quarantine(&self, decision: &Decision, role_name: &str);
}

/// 默认落点：只写结构化日志（独立部署 / 调试用）
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl DecisionSink for LogSink {
    async fn record_event(&self, event: &MessageEvent) {
        info!(
            "📥 event: user={} channel={} message={} len={} mentions={}",
            event.user_id,
            event.channel_id,
            event.message_id,
            event.content.chars().count(),
            event.mention_count
        );
    }

    async fn record_decision(&self, decision: &Decision) {
        info!(
            "📝 decision: user={} action={} risk={:.2} reasons={:?}",
            decision.user_id,
            decision.action.as_str(),
            decision.final_risk,
            decision.reasons
        );
    }
}

/// 默认执行方：只写结构化日志
#[derive(Debug, Default)]
pub struct LogExecutor;

#[async_trait]
impl ActionExecutor for LogExecutor {
    async fn notify_verification_passed(&self, user_id: u64) {
        info!("✅ 用户 {} 验证通过（5 分钟降低审查）", user_id);
    }

    async fn warn(&self, decision: &Decision) {
        warn!(
            "⚠️ 警告用户 {}: risk={:.2} 原因={:?}",
            decision.user_id, decision.final_risk, decision.reasons
        );
    }

    async fn throttle_notice(&self, decision: &Decision, throttle_seconds: i64) {
        warn!(
            "⏳ 用户 {} 被限速 {} 秒: risk={:.2}",
            decision.user_id, throttle_seconds, decision.final_risk
        );
    }

    async fn issue_challenge(&self, decision: &Decision, payload: &ChallengePayload) {
        info!(
            "🧩 向用户 {} 下发验证题: {}+{} (expires_at={})",
            decision.user_id, payload.operand_a, payload.operand_b, payload.expires_at
        );
    }

    async fn quarantine(&self, decision: &Decision, role_name: &str) {
        warn!(
            "🚧 隔离用户 {} (role={}): risk={:.2}",
            decision.user_id, role_name, decision.final_risk
        );
    }
}
