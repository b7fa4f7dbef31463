//! 双轴评分引擎
//!
//! 两条独立的加权规则表：
//! - agent_score：消息流是否像机器生成（节奏、格式、重复度）
//! - harm_score：行为是否具有危害性（链接刷屏、@ 轰炸、突发刷屏）
//!
//! 最终风险 = agent × (0.4 + 0.6 × harm)：危害只放大已有的自动化信号，
//! 不会独立制造风险，避免误伤只是多发链接的真人用户。

use crate::features::FeatureSnapshot;

/// 截断到 [0,1]
pub fn clamp(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// 模板化措辞（命中任意一个短语即计分）
const TEMPLATE_PHRASES: &[&str] = &["here are", "in summary", "overall", "step-by-step", "bullet points"];

/// 自动化评分
///
/// 每条命中的规则累加权重并记录原因，最后截断到 [0,1]。
pub fn agent_score(features: &FeatureSnapshot, content: &str) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    // 行为：高发言速率（>9 条/分钟）
    if features.msg_rate_60s > 0.15 {
        score += 0.25;
        reasons.push(format!(
            "High message rate (~{:.0}/min)",
            features.msg_rate_60s * 60.0
        ));
    }

    // 行为：发言间隔短且方差极低（机器般的节奏）
    if features.avg_inter < 8.0 && features.var_inter < 10.0 {
        score += 0.20;
        reasons.push("Low response-time variance".to_string());
    }

    // 格式：项目符号 / 编号列表
    if has_bullet_formatting(content) {
        score += 0.15;
        reasons.push("Structured bullet/number formatting".to_string());
    }

    // 格式：模板化措辞
    if has_template_phrasing(content) {
        score += 0.10;
        reasons.push("Template-like phrasing".to_string());
    }

    // 长度：持续偏长且高度均匀
    if features.avg_len > 250.0 && features.var_len < 2000.0 {
        score += 0.15;
        reasons.push("Consistently long, uniform messages".to_string());
    }

    // 重复
    if features.dup_ratio > 0.25 {
        score += 0.20;
        reasons.push("Repeated/duplicate messages".to_string());
    }

    if reasons.is_empty() {
        reasons.push("No strong automation signals".to_string());
    }
    (clamp(score), reasons)
}

/// 危害评分（独立截断）
pub fn harm_score(features: &FeatureSnapshot) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    // 链接刷屏（>3 条/分钟）
    if features.link_rate_60s > 0.05 {
        score += 0.35;
        reasons.push("High link posting rate".to_string());
    }

    // @ 轰炸
    if features.mention_rate_60s > 0.10 {
        score += 0.20;
        reasons.push("High @mention rate".to_string());
    }

    // 突发刷屏（>12 条/分钟）
    if features.msg_rate_60s > 0.20 {
        score += 0.25;
        reasons.push("Burst posting behavior".to_string());
    }

    // 高重复
    if features.dup_ratio > 0.30 {
        score += 0.30;
        reasons.push("High repetition/duplication".to_string());
    }

    if reasons.is_empty() {
        reasons.push("No strong harm signals".to_string());
    }
    (clamp(score), reasons)
}

/// 融合最终风险：危害只做放大器，放大系数落在 [0.4, 1.0]
pub fn final_risk(agent: f64, harm: f64) -> f64 {
    clamp(agent * (0.4 + 0.6 * harm))
}

/// 是否存在行首的 "- " / "* " / "1. " 列表标记
fn has_bullet_formatting(content: &str) -> bool {
    content.lines().any(|line| {
        let t = line.trim_start();
        if let Some(rest) = t.strip_prefix('-').or_else(|| t.strip_prefix('*')) {
            return rest.starts_with(char::is_whitespace);
        }
        let digits = t.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            if let Some(rest) = t[digits..].strip_prefix('.') {
                return rest.starts_with(char::is_whitespace);
            }
        }
        false
    })
}

/// 是否命中模板短语（不区分大小写，按词边界匹配）
fn has_template_phrasing(content: &str) -> bool {
    let lower = content.to_lowercase();
    TEMPLATE_PHRASES.iter().any(|p| contains_word(&lower, p))
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut search = 0;
    while let Some(pos) = haystack[search..].find(needle) {
        let start = search + pos;
        let end = start + needle.len();
        let before_ok = haystack[..start].chars().next_back().map_or(true, |c| !is_word(c));
        let after_ok = haystack[end..].chars().next().map_or(true, |c| !is_word(c));
        if before_ok && after_ok {
            return true;
        }
        search = start + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_features() -> FeatureSnapshot {
        FeatureSnapshot {
            msg_rate_60s: 0.0,
            avg_inter: 999.0,
            var_inter: 999.0,
            avg_len: 10.0,
            var_len: 5.0,
            dup_ratio: 0.0,
            link_rate_60s: 0.0,
            mention_rate_60s: 0.0,
        }
    }

    #[test]
    fn test_no_signal_defaults() {
        let (a, reasons) = agent_score(&quiet_features(), "hello everyone");
        assert_eq!(a, 0.0);
        assert_eq!(reasons, vec!["No strong automation signals".to_string()]);

        let (h, reasons) = harm_score(&quiet_features());
        assert_eq!(h, 0.0);
        assert_eq!(reasons, vec!["No strong harm signals".to_string()]);
    }

    #[test]
    fn test_agent_score_is_clamped() {
        let features = FeatureSnapshot {
            msg_rate_60s: 0.5,
            avg_inter: 2.0,
            var_inter: 1.0,
            avg_len: 400.0,
            var_len: 100.0,
            dup_ratio: 0.6,
            link_rate_60s: 0.0,
            mention_rate_60s: 0.0,
        };
        // 全规则命中：0.25+0.20+0.15+0.10+0.15+0.20 > 1
        let (a, reasons) = agent_score(&features, "- step one\nIn summary it works");
        assert_eq!(a, 1.0);
        assert_eq!(reasons.len(), 6);
    }

    #[test]
    fn test_harm_amplifies_but_never_creates_risk() {
        assert_eq!(final_risk(0.0, 1.0), 0.0);
        // 放大系数上限 1.0：final 永远不超过 agent
        for agent in [0.1, 0.4, 0.7, 1.0] {
            for harm in [0.0, 0.3, 0.6, 1.0] {
                let r = final_risk(agent, harm);
                assert!(r <= agent + 1e-12);
                assert!((0.0..=1.0).contains(&r));
            }
        }
        assert!((final_risk(0.5, 0.0) - 0.2).abs() < 1e-9);
        assert!((final_risk(0.5, 1.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_bullet_formatting_detection() {
        assert!(has_bullet_formatting("- first item"));
        assert!(has_bullet_formatting("text\n  * nested"));
        assert!(has_bullet_formatting("1. numbered"));
        assert!(!has_bullet_formatting("-nospace"));
        assert!(!has_bullet_formatting("3.14 is pi"));
        assert!(!has_bullet_formatting("plain sentence"));
    }

    #[test]
    fn test_template_phrasing_detection() {
        assert!(has_template_phrasing("Here are the steps"));
        assert!(has_template_phrasing("IN SUMMARY, yes"));
        assert!(has_template_phrasing("a step-by-step guide"));
        assert!(!has_template_phrasing("the overalls look great"));
        assert!(!has_template_phrasing("casual chat"));
    }
}
