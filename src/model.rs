//! 核心数据模型
//!
//! 引擎的输入/输出值类型：消息事件、决策记录、验证题载荷。
//! 这些类型不持有任何内部状态，可安全序列化后交给外部协作方。

use serde::{Deserialize, Serialize};

/// 入站消息事件（引擎的唯一输入）
///
/// `has_link` 由引擎内部推导，调用方无需提供。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Unix 时间戳（秒）；缺省时由接入层补齐
    #[serde(default)]
    pub ts: Option<i64>,
    /// 用户 ID
    pub user_id: u64,
    /// 服务器（guild）ID
    pub guild_id: u64,
    /// 频道 ID
    pub channel_id: u64,
    /// 消息 ID
    pub message_id: u64,
    /// 消息文本内容
    pub content: String,
    /// 本条消息 @ 提及的数量
    #[serde(default)]
    pub mention_count: u32,
}

/// 处置动作（由弱到强）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModAction {
    /// 警告：仅提示，不限制
    Warn,
    /// 限速：临时冷却，冷却期内消息不再评分
    Throttle,
    /// 隔离：交给外部角色管理方打隔离标记
    Quarantine,
    /// 人机验证：中置信度时用验证题代替自动处罚
    Challenge,
}

impl ModAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModAction::Warn => "warn",
            ModAction::Throttle => "throttle",
            ModAction::Quarantine => "quarantine",
            ModAction::Challenge => "challenge",
        }
    }
}

/// 决策记录（每个被处置的事件产出一条）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// 事件时间戳（秒）
    pub ts: i64,
    /// 用户 ID
    pub user_id: u64,
    /// 服务器 ID
    pub guild_id: u64,
    /// 频道 ID
    pub channel_id: u64,
    /// 消息 ID
    pub message_id: u64,
    /// 自动化评分 [0,1]
    pub agent_score: f64,
    /// 危害评分 [0,1]
    pub harm_score: f64,
    /// 融合后的最终风险 [0,1]（信任期内记录的是衰减后的值）
    pub final_risk: f64,
    /// 处置动作
    pub action: ModAction,
    /// 触发原因（前 3 条自动化 + 前 3 条危害，最多 8 条）
    pub reasons: Vec<String>,
}

/// 验证题载荷（action=challenge 时交给提示渲染方）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChallengePayload {
    pub operand_a: u32,
    pub operand_b: u32,
    /// 过期时间（Unix 秒）
    pub expires_at: i64,
}

/// 单个事件的处理结果
///
/// 三个字段相互独立：验证通过后事件仍会进入正常评分流程，
/// 所以 `verification_passed` 可能与 `decision` 同时出现。
#[derive(Debug, Clone, Default)]
pub struct EngineOutcome {
    /// 本条消息是否通过了挂起的人机验证
    pub verification_passed: bool,
    /// 决策记录；action=none 时为 None，不产出任何处置信号
    pub decision: Option<Decision>,
    /// action=challenge 时的验证题载荷
    pub challenge: Option<ChallengePayload>,
}

impl EngineOutcome {
    /// 是否没有任何需要外部协作方处理的内容
    pub fn is_empty(&self) -> bool {
        !self.verification_passed && self.decision.is_none() && self.challenge.is_none()
    }
}
