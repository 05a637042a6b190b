use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lotto_execution::admin::{self, AdminError};
use lotto_execution::{SettlementConfig, Store};
use lotto_types::api::{CreateLotteryTypeRequest, CreateRoundRequest, CreateUserRequest};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HTTP_RATE_LIMIT_PER_SECOND: u64 = 100;
pub const DEFAULT_HTTP_RATE_LIMIT_BURST: u32 = 500;
pub const DEFAULT_HTTP_BODY_LIMIT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_ROUND_TICK: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub settlement: SettlementConfig,
    /// Auto-close period for rounds past their betting window (`None` disables).
    pub round_tick: Option<Duration>,
    pub http_rate_limit_per_second: Option<u64>,
    pub http_rate_limit_burst: Option<u32>,
    pub http_body_limit_bytes: Option<usize>,
    /// Browser origins allowed to call the API; `*` allows any.
    pub allowed_origins: Vec<String>,
    /// Whether requests without an `Origin` header (curl, server-to-server) are served.
    pub allow_no_origin: bool,
    /// Required on `/lottery/admin/**` and `/admin/**` when set.
    pub admin_token: Option<String>,
    /// Required on `/metrics/**` when set.
    pub metrics_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            settlement: SettlementConfig::default(),
            round_tick: Some(DEFAULT_ROUND_TICK),
            http_rate_limit_per_second: Some(DEFAULT_HTTP_RATE_LIMIT_PER_SECOND),
            http_rate_limit_burst: Some(DEFAULT_HTTP_RATE_LIMIT_BURST),
            http_body_limit_bytes: Some(DEFAULT_HTTP_BODY_LIMIT_BYTES),
            allowed_origins: Vec::new(),
            allow_no_origin: true,
            admin_token: None,
            metrics_token: None,
        }
    }
}

/// Lottery types, users and rounds loaded at startup.
///
/// ```yaml
/// lotteryTypes:
///   - name: หวยรัฐบาลไทย
///     code: TH_GOV
///     payoutRates: { two_digit: 90, three_digit: 900 }
/// users:
///   - username: somchai
///     initialBalance: "1000"
/// rounds:
///   - lotteryType: TH_GOV
///     roundNumber: "2026-11-01"
///     openTime: 2026-10-17T00:00:00Z
///     closeTime: 2026-11-01T08:00:00Z
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub lottery_types: Vec<CreateLotteryTypeRequest>,
    #[serde(default)]
    pub users: Vec<CreateUserRequest>,
    #[serde(default)]
    pub rounds: Vec<SeedRound>,
}

/// A round keyed by its lottery type's code rather than id.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRound {
    pub lottery_type: String,
    pub round_number: String,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub lottery_types: usize,
    pub users: usize,
    pub rounds: usize,
}

impl SeedFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid seed file {}", path.display()))
    }

    /// Create every entry through the admin operations, so seeds obey the same rules as
    /// console input.
    pub async fn apply<S: Store>(
        self,
        store: &mut S,
        now: DateTime<Utc>,
    ) -> Result<SeedSummary, AdminError> {
        let mut summary = SeedSummary::default();
        for request in self.lottery_types {
            admin::create_lottery_type(store, request, now).await?;
            summary.lottery_types += 1;
        }
        for request in self.users {
            admin::create_user(store, request, now).await?;
            summary.users += 1;
        }
        if !self.rounds.is_empty() {
            let lottery_types = admin::list_lottery_types(store, None).await?;
            for round in self.rounds {
                let lottery_type = lottery_types
                    .iter()
                    .find(|lottery_type| lottery_type.code.eq_ignore_ascii_case(&round.lottery_type))
                    .ok_or_else(|| {
                        AdminError::Validation(format!(
                            "round {} references unknown lottery type {}",
                            round.round_number, round.lottery_type
                        ))
                    })?;
                admin::create_round(
                    store,
                    CreateRoundRequest {
                        lottery_type_id: lottery_type.id,
                        round_number: round.round_number,
                        open_time: round.open_time,
                        close_time: round.close_time,
                    },
                )
                .await?;
                summary.rounds += 1;
            }
        }
        Ok(summary)
    }
}
