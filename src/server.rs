//! 审核服务器
//!
//! 把核心引擎接到进程边界：事件范围过滤、持久化落点、
//! 处置动作分发，以及一个 JSON-lines 的标准输入接入循环
//! （每行一个 MessageEvent，决策以 JSON 写到标准输出）。
//!
//! 内存状态变更在引擎内同步完成之后，协作方调用才会发生，
//! 同一用户紧跟着的第二条事件看到的一定是一致状态。

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::collaborator::{ActionExecutor, DecisionSink};
use crate::config::GuardConfig;
use crate::engine::ModerationEngine;
use crate::error::Result;
use crate::model::{Decision, MessageEvent, ModAction};

/// 每处理多少条事件做一次机会性过期清理
const PURGE_INTERVAL_EVENTS: u64 = 512;

/// 审核服务器
pub struct GuardServer {
    engine: ModerationEngine,
    sink: Arc<dyn DecisionSink>,
    executor: Arc<dyn ActionExecutor>,
    guild_id: u64,
    /// 监控的频道集合（空 = 全部）；支持运行期更新
    monitored_channels: RwLock<HashSet<u64>>,
    quarantine_role_name: String,
    throttle_seconds: i64,
    processed: AtomicU64,
}

impl GuardServer {
    pub fn new(
        config: &GuardConfig,
        sink: Arc<dyn DecisionSink>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        Self {
            engine: ModerationEngine::new(config.thresholds(), config.throttle_seconds),
            sink,
            executor,
            guild_id: config.guild_id,
            monitored_channels: RwLock::new(config.monitored_channels.iter().copied().collect()),
            quarantine_role_name: config.quarantine_role_name.clone(),
            throttle_seconds: config.throttle_seconds,
            processed: AtomicU64::new(0),
        }
    }

    /// 运行期更新监控频道列表
    pub fn set_monitored_channels(&self, channels: Vec<u64>) {
        let mut guard = self.monitored_channels.write();
        *guard = channels.into_iter().collect();
        info!("✅ 监控频道已更新: {:?}", guard);
    }

    /// 事件是否在监控范围内
    fn in_scope(&self, event: &MessageEvent) -> bool {
        // guild_id 为 0 时视为不限定服务器
        if self.guild_id != 0 && event.guild_id != self.guild_id {
            return false;
        }
        let channels = self.monitored_channels.read();
        channels.is_empty() || channels.contains(&event.channel_id)
    }

    /// 处理一条事件：记录、评分、分发处置效果
    ///
    /// 返回产出的决策（action=none 时为 None）。
    pub async fn handle_message(&self, mut event: MessageEvent) -> Option<Decision> {
        if !self.in_scope(&event) {
            return None;
        }

        // 接入层补齐缺省时间戳
        let now = event.ts.unwrap_or_else(|| chrono::Utc::now().timestamp());
        event.ts = Some(now);

        self.sink.record_event(&event).await;

        // 内存状态变更在引擎内同步提交
        let outcome = self.engine.process_event(&event, now);

        let n = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if n % PURGE_INTERVAL_EVENTS == 0 {
            self.engine.purge_expired(now);
        }

        if outcome.verification_passed {
            self.executor.notify_verification_passed(event.user_id).await;
        }

        let decision = outcome.decision?;
        self.sink.record_decision(&decision).await;

        match decision.action {
            ModAction::Warn => self.executor.warn(&decision).await,
            ModAction::Throttle => {
                self.executor.throttle_notice(&decision, self.throttle_seconds).await
            }
            ModAction::Challenge => {
                // 引擎保证 challenge 决策必然带验证题载荷
                if let Some(payload) = &outcome.challenge {
                    self.executor.issue_challenge(&decision, payload).await;
                }
            }
            ModAction::Quarantine => {
                self.executor.quarantine(&decision, &self.quarantine_role_name).await
            }
        }

        Some(decision)
    }

    /// JSON-lines 接入循环：标准输入每行一个事件，决策写标准输出
    pub async fn run(&self) -> Result<()> {
        info!(
            "🚀 AgentGuard 就绪 (guild={}, channels={})",
            self.guild_id,
            self.monitored_channels.read().len()
        );

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event: MessageEvent = match serde_json::from_str(&line) {
                Ok(event) => event,
                Err(err) => {
                    // 坏事件不致命：记录后继续
                    warn!("❌ 事件解析失败: {}", err);
                    continue;
                }
            };
            if let Some(decision) = self.handle_message(event).await {
                println!("{}", serde_json::to_string(&decision)?);
            }
        }

        info!(
            "👋 输入流结束，共处理 {} 条事件，追踪 {} 个用户",
            self.processed.load(Ordering::Relaxed),
            self.engine.tracked_users()
        );
        Ok(())
    }

    /// 当前追踪的用户数（状态查询用）
    pub fn tracked_users(&self) -> usize {
        self.engine.tracked_users()
    }

    /// 引擎内省（测试用）
    pub fn engine(&self) -> &ModerationEngine {
        &self.engine
    }
}
