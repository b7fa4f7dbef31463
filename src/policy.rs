//! 决策策略
//!
//! 把（评分 + 信任状态 + 阈值）映射为至多一个处置动作。
//! 基础动作和中置信度覆盖是两个独立计算，最后由一条显式的
//! 优先级规则合并，便于单独审计和测试。

use crate::model::ModAction;

/// 信任窗口内的风险衰减系数
pub const TRUST_DAMPENING: f64 = 0.6;

/// 中置信度区间（闭区间，落在其中的 agent_score 触发验证而非处罚）
pub const CHALLENGE_BAND: (f64, f64) = (0.40, 0.60);

/// 动作阈值（0 < warn < throttle < quarantine ≤ 1）
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub warn: f64,
    pub throttle: f64,
    pub quarantine: f64,
}

/// 策略输出
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyOutcome {
    /// 参与阈值比较（以及落库）的风险值：信任期内已乘衰减系数
    pub effective_risk: f64,
    /// 最终动作；None 表示不产出任何决策
    pub action: Option<ModAction>,
}

/// 决策算法
///
/// 1. 信任期内先把风险乘 0.6 再比阈值（记录的也是衰减后的值）；
/// 2. 基础动作 = 从强到弱命中的第一个阈值；
/// 3. 覆盖规则：agent 落在中置信度区间、风险过 warn 线且不在信任期时，
///    一律改发 challenge；
/// 4. 基础动作为 none 且无覆盖时不产出决策。
pub fn decide(agent: f64, final_risk: f64, trust_active: bool, t: &Thresholds) -> PolicyOutcome {
    let risk = if trust_active { final_risk * TRUST_DAMPENING } else { final_risk };

    let base = if risk >= t.quarantine {
        Some(ModAction::Quarantine)
    } else if risk >= t.throttle {
        Some(ModAction::Throttle)
    } else if risk >= t.warn {
        Some(ModAction::Warn)
    } else {
        None
    };

    let (band_lo, band_hi) = CHALLENGE_BAND;
    let challenge_override =
        agent >= band_lo && agent <= band_hi && risk >= t.warn && !trust_active;

    let action = if challenge_override { Some(ModAction::Challenge) } else { base };

    PolicyOutcome { effective_risk: risk, action }
}

/// 拼装决策原因：前 3 条自动化原因 + 前 3 条危害原因，总量截到 8
pub fn assemble_reasons(agent_reasons: &[String], harm_reasons: &[String]) -> Vec<String> {
    let mut reasons: Vec<String> = Vec::with_capacity(8);
    reasons.extend(agent_reasons.iter().take(3).cloned());
    reasons.extend(harm_reasons.iter().take(3).cloned());
    reasons.truncate(8);
    reasons
}
