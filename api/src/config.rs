//! Configuration Module
//!
//! Everything comes from the environment (after `.env` is loaded) and is
//! validated in `from_env()`: a bad value stops the server at startup.

use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::services::ScorePolicy;
use crate::types::ProofSystem;

/// Token accepted in development when `ADMIN_TOKEN` is unset
const DEV_ADMIN_TOKEN: &str = "dev-admin-token";

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen port (default 3001)
    pub port: u16,

    pub environment: Environment,

    /// Postgres ledger; in-memory when unset
    pub database_url: Option<String>,

    /// Secret presented in `x-admin-token` for mutations
    pub admin_token: String,

    /// Backend used for proof generation; both verify
    pub proof_backend: ProofSystem,

    /// Halo2 circuit size (2^k rows)
    pub halo2_k: u32,

    pub policy: ScorePolicy,

    /// CORS origins accepted in production
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} is invalid: {}", key, e)),
        None => Ok(default),
    }
}

fn parse_breakpoints(raw: &str) -> Result<[u32; 3]> {
    let values = raw
        .split(',')
        .map(|s| s.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .context("TIER_BREAKPOINTS must be comma-separated integers")?;

    <[u32; 3]>::try_from(values)
        .map_err(|v| anyhow!("TIER_BREAKPOINTS needs exactly 3 values, got {}", v.len()))
}

impl Config {
    /// Load and validate configuration from the environment
    ///
    /// # Environment Variables
    ///
    /// - `PORT` (3001), `ENVIRONMENT` (development | staging | production)
    /// - `DATABASE_URL`: optional Postgres ledger
    /// - `ADMIN_TOKEN`: required in production
    /// - `PROOF_BACKEND` (groth16 | halo2), `HALO2_K` (17)
    /// - `SCORE_DELTA_WALLET_AGE`, `SCORE_DELTA_REPAYMENT`, `SCORE_DELTA_DEFAULT_RATIO`
    /// - `INITIAL_SCORE`, `TIER_BREAKPOINTS` ("250,500,750"), `MIN_LOANS_FOR_CREDIT`
    /// - `MIN_WALLET_AGE_DAYS`, `MIN_REPAYMENT_RATE`, `MAX_DEFAULT_RATE`
    /// - `ALLOWED_ORIGINS`: comma-separated
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let environment = match lookup("ENVIRONMENT")
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        };

        let admin_token = match lookup("ADMIN_TOKEN").filter(|t| !t.trim().is_empty()) {
            Some(token) => token,
            None if environment == Environment::Production => {
                bail!("ADMIN_TOKEN is required in production")
            }
            None => {
                tracing::warn!("ADMIN_TOKEN not set, using the development token");
                DEV_ADMIN_TOKEN.to_string()
            }
        };

        let defaults = ScorePolicy::default();
        let tier_breakpoints = match lookup("TIER_BREAKPOINTS") {
            Some(raw) => parse_breakpoints(&raw)?,
            None => defaults.tier_breakpoints,
        };

        let policy = ScorePolicy {
            wallet_age_delta: parse_or(&lookup, "SCORE_DELTA_WALLET_AGE", defaults.wallet_age_delta)?,
            repayment_delta: parse_or(&lookup, "SCORE_DELTA_REPAYMENT", defaults.repayment_delta)?,
            default_ratio_delta: parse_or(
                &lookup,
                "SCORE_DELTA_DEFAULT_RATIO",
                defaults.default_ratio_delta,
            )?,
            initial_score: parse_or(&lookup, "INITIAL_SCORE", defaults.initial_score)?,
            tier_breakpoints,
            min_loans_for_credit: parse_or(
                &lookup,
                "MIN_LOANS_FOR_CREDIT",
                defaults.min_loans_for_credit,
            )?,
            min_wallet_age_days: parse_or(
                &lookup,
                "MIN_WALLET_AGE_DAYS",
                defaults.min_wallet_age_days,
            )?,
            min_repayment_rate: parse_or(&lookup, "MIN_REPAYMENT_RATE", defaults.min_repayment_rate)?,
            max_default_rate: parse_or(&lookup, "MAX_DEFAULT_RATE", defaults.max_default_rate)?,
        };
        policy.validate().context("Invalid score policy")?;

        let proof_backend = match lookup("PROOF_BACKEND") {
            Some(raw) => raw.parse::<ProofSystem>().map_err(|e| anyhow!(e))?,
            None => ProofSystem::Groth16,
        };

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            port: parse_or(&lookup, "PORT", 3001)?,
            environment,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            admin_token,
            proof_backend,
            halo2_k: parse_or(&lookup, "HALO2_K", zk_credit_circuits::CIRCUIT_K)?,
            policy,
            allowed_origins,
        })
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}
