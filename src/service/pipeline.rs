//! Explicit wrapper pipeline for service operations.
//!
//! Stages apply in a fixed order, outermost first: exception translation, logging,
//! timing, retry. Each stage is toggled by its own config record.

use crate::error::{AppError, DbError, ServiceError};
use crate::session::Session;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Level;

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {{
        let level = $level;
        if level == Level::ERROR {
            tracing::error!($($arg)+)
        } else if level == Level::WARN {
            tracing::warn!($($arg)+)
        } else if level == Level::INFO {
            tracing::info!($($arg)+)
        } else if level == Level::DEBUG {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    }};
}

/// State an operation runs against. `reset` is called before every retry so a
/// new attempt does not inherit what the failed one left behind.
#[async_trait]
pub trait RetryContext: Send {
    async fn reset(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// A failed statement aborts the whole PostgreSQL transaction; roll it back so
/// the next attempt autobegins a fresh one.
#[async_trait]
impl RetryContext for Session {
    async fn reset(&mut self) -> Result<(), ServiceError> {
        self.rollback().await?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExceptionsConfig {
    pub enabled: bool,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub enabled: bool,
    pub entry: bool,
    pub exit: bool,
    pub error: bool,
    pub level: Level,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub enabled: bool,
    pub level: Level,
}

/// Fixed-delay retry. The context is reset between attempts; for a [`Session`]
/// that rolls back everything uncommitted in it, not only the failed attempt.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_attempts: u32,
    pub delay: Duration,
    pub log_retries: bool,
    pub level: Level,
    /// Errors for which another attempt is made. Defaults to every error,
    /// including ones no retry can fix.
    pub retry_if: fn(&ServiceError) -> bool,
}

fn retry_everything(_: &ServiceError) -> bool {
    true
}

impl ExceptionsConfig {
    pub fn enabled() -> Self {
        ExceptionsConfig { enabled: true }
    }
}

impl LogConfig {
    pub fn enabled(level: Level) -> Self {
        LogConfig {
            enabled: true,
            entry: true,
            exit: true,
            error: true,
            level,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            enabled: false,
            entry: false,
            exit: false,
            error: false,
            level: Level::INFO,
        }
    }
}

impl TimingConfig {
    pub fn enabled(level: Level) -> Self {
        TimingConfig { enabled: true, level }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            enabled: false,
            level: Level::DEBUG,
        }
    }
}

impl RetryConfig {
    pub fn enabled(max_attempts: u32, delay: Duration) -> Self {
        RetryConfig {
            enabled: true,
            max_attempts: max_attempts.max(1),
            delay,
            ..Self::default()
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            enabled: false,
            max_attempts: 1,
            delay: Duration::ZERO,
            log_retries: false,
            level: Level::DEBUG,
            retry_if: retry_everything,
        }
    }
}

/// Ordered set of wrappers applied around an operation. Every stage is off by default.
#[derive(Clone, Debug, Default)]
pub struct OperationPipeline {
    pub exceptions: ExceptionsConfig,
    pub log: LogConfig,
    pub timing: TimingConfig,
    pub retry: RetryConfig,
}

impl OperationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exceptions(mut self, config: ExceptionsConfig) -> Self {
        self.exceptions = config;
        self
    }

    pub fn with_log(mut self, config: LogConfig) -> Self {
        self.log = config;
        self
    }

    pub fn with_timing(mut self, config: TimingConfig) -> Self {
        self.timing = config;
        self
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Run `op` against `ctx` through the enabled stages. `op` is called once per attempt.
    pub async fn run<C, T, F>(&self, name: &'static str, ctx: &mut C, mut op: F) -> Result<T, ServiceError>
    where
        C: RetryContext,
        T: Send + fmt::Debug,
        F: for<'c> FnMut(&'c mut C) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    {
        let result = self.logged(name, ctx, &mut op).await;
        if !self.exceptions.enabled {
            return result;
        }
        result.map_err(|err| translate_lookup(name, err))
    }

    async fn logged<C, T, F>(&self, name: &'static str, ctx: &mut C, op: &mut F) -> Result<T, ServiceError>
    where
        C: RetryContext,
        T: Send + fmt::Debug,
        F: for<'c> FnMut(&'c mut C) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    {
        let cfg = &self.log;
        if !cfg.enabled {
            return self.timed(name, ctx, op).await;
        }
        if cfg.entry {
            log_at!(cfg.level, operation = name, "entering");
        }
        let result = self.timed(name, ctx, op).await;
        match &result {
            Ok(value) if cfg.exit => log_at!(cfg.level, operation = name, result = ?value, "exiting"),
            Err(err) if cfg.error => log_at!(cfg.level, operation = name, error = %err, "failed"),
            _ => {}
        }
        result
    }

    async fn timed<C, T, F>(&self, name: &'static str, ctx: &mut C, op: &mut F) -> Result<T, ServiceError>
    where
        C: RetryContext,
        T: Send,
        F: for<'c> FnMut(&'c mut C) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    {
        if !self.timing.enabled {
            return self.retried(name, ctx, op).await;
        }
        let start = Instant::now();
        let value = self.retried(name, ctx, op).await?;
        log_at!(
            self.timing.level,
            operation = name,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "executed"
        );
        Ok(value)
    }

    async fn retried<C, T, F>(&self, name: &'static str, ctx: &mut C, op: &mut F) -> Result<T, ServiceError>
    where
        C: RetryContext,
        T: Send,
        F: for<'c> FnMut(&'c mut C) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    {
        let cfg = &self.retry;
        if !cfg.enabled {
            return op(&mut *ctx).await;
        }
        let mut attempt = 1;
        loop {
            if cfg.log_retries {
                log_at!(cfg.level, operation = name, attempt, "executing");
            }
            let err = match op(&mut *ctx).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if cfg.log_retries {
                log_at!(
                    cfg.level,
                    operation = name,
                    attempt,
                    max_attempts = cfg.max_attempts,
                    error = %err,
                    "attempt failed"
                );
            }
            if attempt >= cfg.max_attempts || !(cfg.retry_if)(&err) {
                if cfg.log_retries {
                    log_at!(cfg.level, operation = name, "giving up");
                }
                return Err(err);
            }
            if cfg.log_retries {
                log_at!(cfg.level, operation = name, delay_ms = cfg.delay.as_millis() as u64, "retrying");
            }
            tokio::time::sleep(cfg.delay).await;
            if let Err(reset_err) = ctx.reset().await {
                tracing::warn!(operation = name, error = %reset_err, "could not reset before retry");
                return Err(err);
            }
            attempt += 1;
        }
    }
}

/// A failed single-row lookup becomes `NotFound`, naming the operation and what was looked up.
fn translate_lookup(operation: &'static str, err: ServiceError) -> ServiceError {
    match err {
        ServiceError::Persistence(DbError::NoResultFound(ctx)) => {
            tracing::debug!(operation, entity = ctx.entity, id = %ctx.id, "lookup found nothing");
            AppError::not_found(json!({
                "operation": operation,
                "entity": ctx.entity,
                "id": ctx.id,
            }))
            .into()
        }
        other => other,
    }
}
