//! Instruction planning and ordering validation
//!
//! Every trade transaction carries its instructions in this order:
//! 1. Compute-unit limit
//! 2. Compute-unit price (only when a priority fee is set)
//! 3. Idempotent associated-token-account creation (only when the trader has none)
//! 4. The bonding-curve trade instruction
//!
//! The trade instruction payload is an 8-byte discriminator followed by two
//! little-endian `u64`s: the token amount and the SOL bound (max cost for a
//! buy, min output for a sell).

use solana_sdk::{
    compute_budget::{self, ComputeBudgetInstruction},
    instruction::{AccountMeta, Instruction},
    native_token::LAMPORTS_PER_SOL,
    pubkey,
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::errors::{TraderError, TraderResult};
use crate::quoter::TradeSide;

pub const PUMP_PROGRAM_ID: Pubkey = pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");
pub const PUMP_GLOBAL: Pubkey = pubkey!("4wTV1YmiEkRvAtNtsSGPtUrqRYQMe5SKy2uB4Jjaxnjf");
pub const PUMP_FEE_RECIPIENT: Pubkey = pubkey!("CebN5WGQ4jvEPvsVU4EoHEpgzq1VV7AbicfhtW4xC9iM");
pub const PUMP_EVENT_AUTHORITY: Pubkey = pubkey!("Ce6TQqeHC9p8KetsN6JsjHK7UKZk7Ktk3ZeqNhtZM2h1");

pub const BUY_DISCRIMINATOR: [u8; 8] = [102, 6, 61, 18, 1, 218, 235, 234];
pub const SELL_DISCRIMINATOR: [u8; 8] = [51, 230, 133, 164, 1, 127, 131, 173];

const MICRO_LAMPORTS_PER_LAMPORT: f64 = 1_000_000.0;

/// Program-level addresses the trade instruction references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramAccounts {
    pub program_id: Pubkey,
    pub global: Pubkey,
    pub fee_recipient: Pubkey,
    pub event_authority: Pubkey,
}

impl Default for ProgramAccounts {
    fn default() -> Self {
        Self {
            program_id: PUMP_PROGRAM_ID,
            global: PUMP_GLOBAL,
            fee_recipient: PUMP_FEE_RECIPIENT,
            event_authority: PUMP_EVENT_AUTHORITY,
        }
    }
}

/// Per-trade accounts, taken from the pool snapshot and the signer
#[derive(Debug, Clone, Copy)]
pub struct TradeAccounts {
    pub mint: Pubkey,
    pub bonding_curve: Pubkey,
    pub associated_bonding_curve: Pubkey,
    pub user: Pubkey,
    pub user_token_account: Pubkey,
}

/// Encode the buy or sell instruction for one trade
pub fn trade_instruction(
    side: TradeSide,
    program: &ProgramAccounts,
    accounts: &TradeAccounts,
    token_amount: u64,
    sol_bound: u64,
) -> Instruction {
    let discriminator = match side {
        TradeSide::Buy => BUY_DISCRIMINATOR,
        TradeSide::Sell => SELL_DISCRIMINATOR,
    };
    let mut data = Vec::with_capacity(24);
    data.extend_from_slice(&discriminator);
    data.extend_from_slice(&token_amount.to_le_bytes());
    data.extend_from_slice(&sol_bound.to_le_bytes());

    let mut metas = vec![
        AccountMeta::new_readonly(program.global, false),
        AccountMeta::new(program.fee_recipient, false),
        AccountMeta::new_readonly(accounts.mint, false),
        AccountMeta::new(accounts.bonding_curve, false),
        AccountMeta::new(accounts.associated_bonding_curve, false),
        AccountMeta::new(accounts.user_token_account, false),
        AccountMeta::new(accounts.user, true),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    // The two sides differ only in the middle of the account list
    match side {
        TradeSide::Buy => {
            metas.push(AccountMeta::new_readonly(spl_token::id(), false));
            metas.push(AccountMeta::new_readonly(sysvar::rent::id(), false));
        }
        TradeSide::Sell => {
            metas.push(AccountMeta::new_readonly(
                spl_associated_token_account::id(),
                false,
            ));
            metas.push(AccountMeta::new_readonly(spl_token::id(), false));
        }
    }
    metas.push(AccountMeta::new_readonly(program.event_authority, false));
    metas.push(AccountMeta::new_readonly(program.program_id, false));

    Instruction::new_with_bytes(program.program_id, &data, metas)
}

/// Convert a priority fee expressed in SOL into the per-compute-unit price
/// the compute-budget program expects.
pub fn priority_fee_micro_lamports(fee_sol: f64, cu_limit: u32) -> u64 {
    if cu_limit == 0 || !fee_sol.is_finite() || fee_sol <= 0.0 {
        return 0;
    }
    let lamports = fee_sol * LAMPORTS_PER_SOL as f64;
    (lamports * MICRO_LAMPORTS_PER_LAMPORT / cu_limit as f64).floor() as u64
}

/// Ordered instructions for one trade transaction
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    pub instructions: Vec<Instruction>,

    /// Whether the plan creates the trader's token account before trading
    pub creates_token_account: bool,
}

/// Assemble the ordered instruction list for a trade.
///
/// `cu_limit` of 0 skips the limit instruction, `cu_price` of 0 skips the
/// price instruction.
pub fn plan_trade_instructions(
    cu_limit: u32,
    cu_price: u64,
    create_token_account: Option<Instruction>,
    trade_ix: Instruction,
) -> TraderResult<InstructionPlan> {
    if trade_ix.accounts.is_empty() {
        return Err(TraderError::internal("trade instruction has no accounts"));
    }

    // compute_budget (2) + ata (1) + trade (1)
    let mut instructions = Vec::with_capacity(4);

    if cu_limit > 0 {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(cu_limit));
    }
    if cu_price > 0 {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(cu_price));
    }

    let creates_token_account = create_token_account.is_some();
    if let Some(create_ix) = create_token_account {
        instructions.push(create_ix);
    }

    instructions.push(trade_ix);

    Ok(InstructionPlan {
        instructions,
        creates_token_account,
    })
}

/// Validate plan ordering (debug/test builds only)
///
/// Fails when the list is empty, a compute-budget instruction follows a
/// non-budget one, the account-creation flag disagrees with the list, or the
/// last instruction is not a program call.
#[cfg(debug_assertions)]
pub fn sanity_check_ix_order(plan: &InstructionPlan) -> TraderResult<()> {
    let instructions = &plan.instructions;
    let Some(last) = instructions.last() else {
        return Err(TraderError::internal("instruction list is empty"));
    };

    let is_budget = |ix: &Instruction| ix.program_id == compute_budget::id();
    let is_ata = |ix: &Instruction| ix.program_id == spl_associated_token_account::id();

    if is_budget(last) || is_ata(last) {
        return Err(TraderError::internal(format!(
            "last instruction must be the trade, got program {}",
            last.program_id
        )));
    }

    let budget_count = instructions.iter().take_while(|ix| is_budget(ix)).count();
    if let Some(idx) = instructions
        .iter()
        .skip(budget_count)
        .position(|ix| is_budget(ix))
    {
        return Err(TraderError::internal(format!(
            "compute budget instruction at position {} follows a program instruction",
            idx + budget_count
        )));
    }

    let ata_positions: Vec<usize> = instructions
        .iter()
        .enumerate()
        .filter(|(_, ix)| is_ata(ix))
        .map(|(idx, _)| idx)
        .collect();
    match (plan.creates_token_account, ata_positions.as_slice()) {
        (false, []) => Ok(()),
        (true, [idx]) if *idx + 2 == instructions.len() => Ok(()),
        (expected, found) => Err(TraderError::internal(format!(
            "token account creation mismatch: expected {expected}, found at {found:?}"
        ))),
    }
}

#[cfg(not(debug_assertions))]
#[inline]
pub fn sanity_check_ix_order(_plan: &InstructionPlan) -> TraderResult<()> {
    Ok(())
}
