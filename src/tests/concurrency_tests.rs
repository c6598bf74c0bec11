//! Concurrency Tests
//!
//! Independent calls share only the blockhash cache.

#[cfg(test)]
mod concurrency_tests {
    use solana_sdk::hash::Hash;
    use std::sync::Arc;

    use crate::blockhash::BlockhashCache;
    use crate::tests::test_helpers::{fast_executor, harness};
    use crate::tx::TransactionLifecycleManager;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_buy_and_sell_share_one_blockhash() {
        let h = harness();
        let hash = Hash::new_unique();
        h.ledger.push_blockhash(hash, 5_000);

        let (buy, sell) = tokio::join!(
            h.manager.buy(h.execute(1.0)),
            h.manager.sell(h.execute(10_000.0))
        );

        assert!(buy.is_ok());
        assert!(sell.is_ok());
        assert_eq!(h.ledger.blockhash_fetches(), 1);
        assert_eq!(h.ledger.submissions(), 2);
        assert_eq!(
            h.ledger.last_transaction().unwrap().message.recent_blockhash,
            hash
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_managers_can_share_a_cache() {
        let h = harness();
        let cache = Arc::new(BlockhashCache::new());
        let first = TransactionLifecycleManager::new(
            h.ledger.clone(),
            h.source.clone(),
            fast_executor(),
        )
        .with_blockhash_cache(cache.clone());
        let second = TransactionLifecycleManager::new(
            h.ledger.clone(),
            h.source.clone(),
            fast_executor(),
        )
        .with_blockhash_cache(cache.clone());

        let handles = vec![
            tokio::spawn({
                let request = h.execute(1.0);
                async move { first.buy(request).await }
            }),
            tokio::spawn({
                let request = h.execute(2.0);
                async move { second.buy(request).await }
            }),
        ];
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(h.ledger.blockhash_fetches(), 1);
        assert!(cache.peek().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_refreshes_after_expiry_between_trades() {
        let h = harness();
        h.ledger.push_blockhash(Hash::new_unique(), 1_010);
        h.ledger.push_blockhash(Hash::new_unique(), 2_000);

        h.manager.buy(h.execute(1.0)).await.unwrap();
        h.ledger.set_block_height(1_010);
        h.manager.buy(h.execute(1.0)).await.unwrap();

        assert_eq!(h.ledger.blockhash_fetches(), 2);
        assert_eq!(
            h.manager
                .blockhash_cache()
                .peek()
                .unwrap()
                .last_valid_block_height,
            2_000
        );
    }
}
