//! Trade lifecycle manager
//!
//! Each `buy`/`sell` call walks the same states:
//! Validating, Quoting, Building, then Simulating or Submitting, then
//! (optionally) Confirming. Validation failures return before any network
//! call. Every ledger call goes through the [`RetryExecutor`]; the pool data
//! source retries on its own and is called exactly once per trade.

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use std::{str::FromStr, sync::Arc, time::Duration};
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info_span, Instrument};

use super::instructions::{
    plan_trade_instructions, priority_fee_micro_lamports, sanity_check_ix_order,
    trade_instruction, ProgramAccounts, TradeAccounts,
};
use super::outcome::{ExecutionMode, TradeRequest, TransactionOutcome};
use super::request::TransactionRequest;
use crate::blockhash::BlockhashCache;
use crate::data_source::PoolDataSource;
use crate::errors::{TraderError, TraderResult, ValidationError};
use crate::ledger::{ConfirmationLevel, LedgerClient, SignatureState, TransactionRecord};
use crate::metrics::{Metrics, Timer};
use crate::observability::TradeContext;
use crate::quoter::{validate_amount, validate_slippage, PoolState, TradeSide};
use crate::retry::RetryExecutor;
use crate::signer::resolve_signer;
use crate::structured_logging::TradeLogger;

pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 200_000;
pub const DEFAULT_SLIPPAGE: f64 = 0.01;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

/// Manager-wide defaults applied when a request leaves a field unset
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub compute_unit_limit: u32,
    pub default_slippage: f64,
    /// Priority fee in SOL
    pub default_priority_fee: f64,
    pub poll_interval: Duration,
    pub confirm_timeout: Duration,
    pub program: ProgramAccounts,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            compute_unit_limit: DEFAULT_COMPUTE_UNIT_LIMIT,
            default_slippage: DEFAULT_SLIPPAGE,
            default_priority_fee: 0.0,
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            program: ProgramAccounts::default(),
        }
    }
}

/// Request fields after validation, ready to drive the network phases
struct ValidatedTrade {
    mint: Pubkey,
    amount: f64,
    slippage: f64,
    priority_fee: f64,
    executor: RetryExecutor,
    signer: Keypair,
}

pub struct TransactionLifecycleManager {
    ledger: Arc<dyn LedgerClient>,
    data_source: Arc<dyn PoolDataSource>,
    executor: RetryExecutor,
    blockhash_cache: Arc<BlockhashCache>,
    settings: ManagerSettings,
    metrics: Option<Arc<Metrics>>,
}

impl TransactionLifecycleManager {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        data_source: Arc<dyn PoolDataSource>,
        executor: RetryExecutor,
    ) -> Self {
        Self {
            ledger,
            data_source,
            executor,
            blockhash_cache: Arc::new(BlockhashCache::new()),
            settings: ManagerSettings::default(),
            metrics: None,
        }
    }

    pub fn with_settings(mut self, settings: ManagerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Share a cache with other managers talking to the same ledger
    pub fn with_blockhash_cache(mut self, cache: Arc<BlockhashCache>) -> Self {
        self.blockhash_cache = cache;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn blockhash_cache(&self) -> &Arc<BlockhashCache> {
        &self.blockhash_cache
    }

    pub async fn buy(&self, request: TradeRequest) -> TraderResult<TransactionOutcome> {
        self.run(TradeSide::Buy, request).await
    }

    pub async fn sell(&self, request: TradeRequest) -> TraderResult<TransactionOutcome> {
        self.run(TradeSide::Sell, request).await
    }

    async fn run(&self, side: TradeSide, request: TradeRequest) -> TraderResult<TransactionOutcome> {
        let ctx = TradeContext::new(side.as_str());
        let span = info_span!(
            "trade",
            operation = side.as_str(),
            correlation_id = %ctx.correlation_id()
        );
        self.run_in_context(side, &request, &ctx)
            .instrument(span)
            .await
    }

    async fn run_in_context(
        &self,
        side: TradeSide,
        request: &TradeRequest,
        ctx: &TradeContext,
    ) -> TraderResult<TransactionOutcome> {
        let operation = ctx.operation();
        let logger = TradeLogger::new(ctx.correlation_id().clone());
        let timer = Timer::new();
        if let Some(metrics) = &self.metrics {
            metrics.trades_total.inc();
        }
        logger.log_attempt(
            operation,
            &request.target,
            request.amount,
            request.mode == ExecutionMode::Simulate,
        );

        let result = match request.deadline {
            Some(budget) => {
                let deadline = Instant::now() + budget;
                timeout_at(deadline, self.execute_trade(side, request, &logger, Some(deadline)))
                    .await
                    .unwrap_or_else(|_| {
                        Err(TraderError::rpc(format!(
                            "{operation} timed out after overall deadline of {}ms",
                            budget.as_millis()
                        )))
                    })
            }
            None => self.execute_trade(side, request, &logger, None).await,
        }
        .map_err(|e| e.scoped_to(operation));

        if let Some(metrics) = &self.metrics {
            timer.observe_duration(&metrics.trade_latency);
            match &result {
                Ok(TransactionOutcome::Simulated { .. }) => metrics.trades_simulated.inc(),
                Ok(_) => metrics.trades_success.inc(),
                Err(e) => metrics.record_failure(e),
            }
        }

        match &result {
            Ok(TransactionOutcome::Executed {
                signature, record, ..
            }) => logger.log_success(
                operation,
                &signature.to_string(),
                record.is_some(),
                ctx.elapsed_ms(),
            ),
            Ok(TransactionOutcome::Simulated { logs, .. }) => {
                logger.log_simulated(operation, logs.len(), ctx.elapsed_ms())
            }
            Ok(TransactionOutcome::Failed { .. }) => {}
            Err(e) => logger.log_failure(operation, e, ctx.elapsed_ms()),
        }

        result
    }

    async fn execute_trade(
        &self,
        side: TradeSide,
        request: &TradeRequest,
        logger: &TradeLogger,
        overall_deadline: Option<Instant>,
    ) -> TraderResult<TransactionOutcome> {
        let trade = self.validate(request)?;

        // Quote and bound come from the same snapshot the instruction is built from
        let pool = self.data_source.fetch_pool_state(&trade.mint).await?;
        // Only whole tokens can be sold; quote and guard cover exactly what is sent
        let input_amount = match side {
            TradeSide::Buy => trade.amount,
            TradeSide::Sell => trade.amount.floor(),
        };
        if input_amount < 1.0 {
            return Err(ValidationError::DustAmount(trade.amount).into());
        }
        let quote = side.quote(&pool, input_amount)?;
        let sol_bound = side.sol_bound(&pool, input_amount, trade.slippage)?;
        let token_amount = match side {
            TradeSide::Buy => quote.expected_output_amount,
            TradeSide::Sell => input_amount,
        };
        let token_amount = token_amount as u64;
        if token_amount == 0 {
            return Err(ValidationError::DustAmount(trade.amount).into());
        }
        logger.log_quote(
            side.as_str(),
            quote.expected_output_amount,
            quote.price_impact,
            sol_bound,
        );

        let tx = self
            .build_transaction(side, &pool, &trade, token_amount, sol_bound)
            .await?;

        match request.mode {
            ExecutionMode::Simulate => {
                let simulation = trade
                    .executor
                    .execute("simulate", || self.ledger.simulate(&tx))
                    .await?;
                if let Some(err) = simulation.err {
                    return Err(TraderError::transaction(
                        "simulate",
                        err,
                        simulation.logs,
                        None,
                    ));
                }
                debug!(
                    units_consumed = ?simulation.units_consumed,
                    "Simulation passed"
                );
                Ok(TransactionOutcome::Simulated {
                    logs: simulation.logs,
                    expected_output: quote.expected_output_amount,
                })
            }
            ExecutionMode::Execute { track_finality } => {
                let signature = trade
                    .executor
                    .execute("submit_and_confirm", || self.ledger.submit_and_confirm(&tx))
                    .await?;
                debug!(signature = %signature, "Transaction submitted");

                let record = if track_finality {
                    let budget = request
                        .confirm_timeout
                        .unwrap_or(self.settings.confirm_timeout);
                    Some(
                        self.track_finality(&signature, &trade.executor, budget, overall_deadline)
                            .await?,
                    )
                } else {
                    None
                };

                Ok(TransactionOutcome::Executed {
                    signature,
                    expected_output: quote.expected_output_amount,
                    record,
                })
            }
        }
    }

    /// Checks run in a fixed order; each yields its own [`ValidationError`]
    fn validate(&self, request: &TradeRequest) -> TraderResult<ValidatedTrade> {
        if request.signer_secret.trim().is_empty() {
            return Err(ValidationError::EmptySecret.into());
        }

        let target = request.target.trim();
        if target.is_empty() {
            return Err(ValidationError::EmptyTarget.into());
        }
        let mint = Pubkey::from_str(target)
            .map_err(|_| ValidationError::InvalidTarget(target.to_string()))?;

        let amount = validate_amount(request.amount)?;
        let slippage =
            validate_slippage(request.slippage.unwrap_or(self.settings.default_slippage))?;

        let priority_fee = request
            .priority_fee
            .unwrap_or(self.settings.default_priority_fee);
        if !priority_fee.is_finite() || priority_fee < 0.0 {
            return Err(ValidationError::InvalidPriorityFee(priority_fee).into());
        }

        let executor = match &request.policy_overrides {
            Some(overrides) if !overrides.is_empty() => self.executor.with_overrides(overrides)?,
            _ => self.executor.clone(),
        };

        let signer = resolve_signer(&request.signer_secret)?;

        Ok(ValidatedTrade {
            mint,
            amount,
            slippage,
            priority_fee,
            executor,
            signer,
        })
    }

    async fn build_transaction(
        &self,
        side: TradeSide,
        pool: &PoolState,
        trade: &ValidatedTrade,
        token_amount: u64,
        sol_bound: u64,
    ) -> TraderResult<Transaction> {
        let user = trade.signer.pubkey();
        let user_token_account = get_associated_token_address(&user, &pool.mint);

        let existing = trade
            .executor
            .execute("get_account_info", || {
                self.ledger.get_account_info(&user_token_account)
            })
            .await?;
        let create_token_account = existing.is_none().then(|| {
            create_associated_token_account_idempotent(&user, &user, &pool.mint, &spl_token::id())
        });

        let accounts = TradeAccounts {
            mint: pool.mint,
            bonding_curve: pool.bonding_curve,
            associated_bonding_curve: pool.associated_bonding_curve,
            user,
            user_token_account,
        };
        let trade_ix = trade_instruction(
            side,
            &self.settings.program,
            &accounts,
            token_amount,
            sol_bound,
        );

        let cu_price =
            priority_fee_micro_lamports(trade.priority_fee, self.settings.compute_unit_limit);
        let plan = plan_trade_instructions(
            self.settings.compute_unit_limit,
            cu_price,
            create_token_account,
            trade_ix,
        )?;
        sanity_check_ix_order(&plan)?;

        let blockhash = self
            .blockhash_cache
            .get(self.ledger.as_ref(), &trade.executor)
            .await?;

        TransactionRequest::new(plan.instructions, user, cu_price).into_signed(blockhash, &trade.signer)
    }

    /// Poll `signature` until finalized, an error status, or the deadline.
    ///
    /// The deadline is the earlier of `budget` from now and the caller's
    /// overall deadline; every poll and sleep is bounded by it.
    async fn track_finality(
        &self,
        signature: &Signature,
        executor: &RetryExecutor,
        budget: Duration,
        overall_deadline: Option<Instant>,
    ) -> TraderResult<TransactionRecord> {
        let started = Instant::now();
        let deadline = overall_deadline.map_or(started + budget, |overall| {
            overall.min(started + budget)
        });
        let timed_out = || {
            TraderError::rpc(format!(
                "timed out after {}ms waiting for {signature} to finalize",
                started.elapsed().as_millis()
            ))
        };

        let mut polls: u32 = 0;
        loop {
            polls += 1;
            let status = timeout_at(
                deadline,
                executor.execute("get_signature_status", || {
                    self.ledger.get_signature_status(signature)
                }),
            )
            .await
            .map_err(|_| timed_out())??;

            match status {
                Some(SignatureState { err: Some(err), .. }) => {
                    return Err(TraderError::transaction(
                        "confirm",
                        err,
                        Vec::new(),
                        Some(*signature),
                    ));
                }
                Some(SignatureState {
                    confirmation: Some(ConfirmationLevel::Finalized),
                    ..
                }) => {
                    let record = timeout_at(
                        deadline,
                        executor.execute("get_transaction", || {
                            self.ledger
                                .get_transaction(signature, ConfirmationLevel::Finalized)
                        }),
                    )
                    .await
                    .map_err(|_| timed_out())??;

                    if let Some(metrics) = &self.metrics {
                        metrics
                            .confirmation_latency
                            .observe(started.elapsed().as_secs_f64());
                    }
                    debug!(signature = %signature, polls, slot = record.slot, "Transaction finalized");
                    return Ok(record);
                }
                other => {
                    debug!(
                        signature = %signature,
                        polls,
                        confirmation = ?other.and_then(|s| s.confirmation),
                        "Awaiting finality"
                    );
                }
            }

            let next_poll = Instant::now() + self.settings.poll_interval;
            sleep_until(next_poll.min(deadline)).await;
            if Instant::now() >= deadline {
                return Err(timed_out());
            }
        }
    }
}

impl std::fmt::Debug for TransactionLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLifecycleManager")
            .field("settings", &self.settings)
            .field("retry_policy", self.executor.policy())
            .field("blockhash_cache", &self.blockhash_cache)
            .finish_non_exhaustive()
    }
}
