pub mod challenge;
pub mod cli;
pub mod collaborator;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod policy;
pub mod scoring;
pub mod server;
pub mod state;
pub mod throttle;  // 冷却与信任窗口

pub use challenge::{ChallengeManager, ChallengeRecord, CHALLENGE_EXPIRY_SECS};
pub use collaborator::{ActionExecutor, DecisionSink, LogExecutor, LogSink};
pub use config::GuardConfig;
pub use engine::ModerationEngine;
pub use error::{GuardError, Result};
pub use features::{extract_features, FeatureSnapshot};
pub use model::{ChallengePayload, Decision, EngineOutcome, MessageEvent, ModAction};
pub use policy::Thresholds;
pub use server::GuardServer;
pub use state::{RollingUserState, HISTORY_CAPACITY};
pub use throttle::{CooldownStore, TrustWindow, TRUST_WINDOW_SECS};
