use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};

use crate::errors::{TraderError, TraderResult};

/// Unsigned trade transaction, built fresh for every call.
///
/// Compiling it consumes the request, so a request (and the blockhash it is
/// eventually signed with) is never replayed across calls.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub instructions: Vec<Instruction>,
    pub fee_payer: Pubkey,
    /// Compute-unit price in micro-lamports, 0 when no priority fee was set
    pub priority_fee: u64,
}

impl TransactionRequest {
    pub fn new(instructions: Vec<Instruction>, fee_payer: Pubkey, priority_fee: u64) -> Self {
        Self {
            instructions,
            fee_payer,
            priority_fee,
        }
    }

    /// Compile against `blockhash` and sign with the fee payer
    pub fn into_signed(self, blockhash: Hash, signer: &Keypair) -> TraderResult<Transaction> {
        if signer.pubkey() != self.fee_payer {
            return Err(TraderError::internal(format!(
                "signer {} is not the fee payer {}",
                signer.pubkey(),
                self.fee_payer
            )));
        }

        let message = Message::new(&self.instructions, Some(&self.fee_payer));
        let mut tx = Transaction::new_unsigned(message);
        tx.try_sign(&[signer], blockhash)
            .map_err(|e| TraderError::internal(format!("failed to sign transaction: {e}")))?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{instruction::AccountMeta, system_instruction};

    #[test]
    fn test_into_signed_sets_blockhash_and_payer() {
        let signer = Keypair::new();
        let ix = system_instruction::transfer(&signer.pubkey(), &Pubkey::new_unique(), 1);
        let blockhash = Hash::new_unique();

        let tx = TransactionRequest::new(vec![ix], signer.pubkey(), 0)
            .into_signed(blockhash, &signer)
            .unwrap();

        assert_eq!(tx.message.recent_blockhash, blockhash);
        assert_eq!(tx.message.account_keys[0], signer.pubkey());
        assert!(tx.is_signed());
    }

    #[test]
    fn test_into_signed_rejects_foreign_signer() {
        let payer = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1],
            vec![AccountMeta::new(payer, true)],
        );
        let err = TransactionRequest::new(vec![ix], payer, 0)
            .into_signed(Hash::new_unique(), &Keypair::new())
            .unwrap_err();
        assert!(matches!(err, TraderError::Internal(_)));
    }
}
