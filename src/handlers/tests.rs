//! Handler tests
//!
//! Exercise the three handlers against the in-memory collection, plus a
//! collection double that fails every call.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;

    use crate::domain::{DomainError, NewTransaction, Transaction};
    use crate::error::AppError;
    use crate::handlers::{
        BalanceAggregator, BalanceParams, BalanceQuery, ListFilter, ListParams, QueryBuilder,
        TransactionStore,
    };
    use crate::storage::{
        AggregateRow, IndexSpec, MemoryCollection, Predicate, Stage, StorageError,
        TransactionCollection,
    };

    // 2017-07-14T00:00:00Z
    const D1: i64 = 1_499_990_400;
    // 2017-07-15T00:00:00Z
    const D2: i64 = D1 + 86_400;

    /// Collection whose every operation fails, so any storage access by a
    /// handler shows up as a `Storage` error.
    struct UnreachableCollection;

    fn unreachable_error() -> StorageError {
        StorageError::Unavailable("storage must not be reached".to_string())
    }

    #[async_trait]
    impl TransactionCollection for UnreachableCollection {
        async fn insert_one(&self, _record: NewTransaction) -> Result<Uuid, StorageError> {
            Err(unreachable_error())
        }

        async fn find_all(&self, _predicate: &Predicate) -> Result<Vec<Transaction>, StorageError> {
            Err(unreachable_error())
        }

        async fn ensure_index(&self, _index: &IndexSpec) -> Result<(), StorageError> {
            Err(unreachable_error())
        }

        async fn aggregate(&self, _stages: &[Stage]) -> Result<Vec<AggregateRow>, StorageError> {
            Err(unreachable_error())
        }
    }

    struct Ledger {
        collection: Arc<MemoryCollection>,
        store: TransactionStore,
        queries: QueryBuilder,
        balances: BalanceAggregator,
    }

    fn ledger() -> Ledger {
        let collection = Arc::new(MemoryCollection::new());
        let shared: Arc<dyn TransactionCollection> = collection.clone();
        Ledger {
            collection,
            store: TransactionStore::new(shared.clone()),
            queries: QueryBuilder::new(shared.clone()),
            balances: BalanceAggregator::new(shared),
        }
    }

    fn balance_params(user: Option<&str>, since: Option<&str>, until: Option<&str>) -> BalanceParams {
        BalanceParams {
            user: user.map(String::from),
            since: since.map(String::from),
            until: until.map(String::from),
        }
    }

    fn ids(transactions: &[Transaction]) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = transactions.iter().filter_map(|tx| tx.id).collect();
        ids.sort();
        ids
    }

    // =========================================================================
    // Create
    // =========================================================================

    #[tokio::test]
    async fn test_create_returns_input_with_assigned_id() {
        let ledger = ledger();
        let input = NewTransaction::new(1, 2, D1 + 10, 50);

        let stored = ledger.store.create(input).await.unwrap();

        assert!(stored.id.is_some());
        assert_eq!(
            (stored.sender, stored.receiver, stored.timestamp, stored.sum),
            (1, 2, D1 + 10, 50)
        );

        let all = ledger
            .queries
            .list_filtered(&ListFilter::default())
            .await
            .unwrap();
        assert_eq!(all, vec![stored]);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_timestamp_or_sum() {
        let ledger = ledger();
        ledger
            .store
            .create(NewTransaction::new(1, 2, D1, 10))
            .await
            .unwrap();

        for input in [
            NewTransaction::new(1, 2, 0, 10),
            NewTransaction::new(1, 2, D1, 0),
        ] {
            match ledger.store.create(input).await {
                Err(AppError::Domain(DomainError::InvalidInput(_))) => {}
                other => panic!("Expected InvalidInput, got: {:?}", other),
            }
        }

        assert_eq!(ledger.collection.len(), 1);
    }

    #[tokio::test]
    async fn test_create_validation_happens_before_storage() {
        let store = TransactionStore::new(Arc::new(UnreachableCollection));

        let result = store.create(NewTransaction::new(1, 2, 0, 0)).await;
        assert!(matches!(result, Err(AppError::Domain(DomainError::InvalidInput(_)))));
    }

    #[tokio::test]
    async fn test_create_surfaces_storage_failure() {
        let store = TransactionStore::new(Arc::new(UnreachableCollection));

        let result = store.create(NewTransaction::new(1, 2, D1, 5)).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
    }

    // =========================================================================
    // List
    // =========================================================================

    #[tokio::test]
    async fn test_filter_composition() {
        let ledger = ledger();
        let a = ledger
            .store
            .create(NewTransaction::new(1, 2, D1 + 3600, 50))
            .await
            .unwrap();
        let b = ledger
            .store
            .create(NewTransaction::new(3, 1, D2 + 3600, 200))
            .await
            .unwrap();
        ledger
            .store
            .create(NewTransaction::new(4, 5, D2 + 60, 500))
            .await
            .unwrap();

        let by_user = ledger
            .queries
            .list_filtered(&ListFilter::default().with_user(1))
            .await
            .unwrap();
        assert_eq!(ids(&by_user), ids(&[a.clone(), b.clone()]));

        let by_user_and_threshold = ledger
            .queries
            .list_filtered(&ListFilter::default().with_user(1).with_threshold(100))
            .await
            .unwrap();
        assert_eq!(by_user_and_threshold, vec![b]);

        let by_day = ledger
            .queries
            .list_filtered(&ListFilter::default().with_day(D1 + 7200))
            .await
            .unwrap();
        assert_eq!(by_day, vec![a]);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let ledger = ledger();
        let exact = ledger
            .store
            .create(NewTransaction::new(1, 2, D1, 100))
            .await
            .unwrap();
        ledger
            .store
            .create(NewTransaction::new(1, 2, D1, 99))
            .await
            .unwrap();

        let listed = ledger
            .queries
            .list_filtered(&ListFilter::default().with_threshold(100))
            .await
            .unwrap();
        assert_eq!(listed, vec![exact]);
    }

    #[tokio::test]
    async fn test_day_filter_excludes_last_second() {
        let ledger = ledger();
        let first = ledger
            .store
            .create(NewTransaction::new(1, 2, D1, 10))
            .await
            .unwrap();
        let penultimate = ledger
            .store
            .create(NewTransaction::new(1, 2, D1 + 86_398, 10))
            .await
            .unwrap();
        ledger
            .store
            .create(NewTransaction::new(1, 2, D1 + 86_399, 10))
            .await
            .unwrap();
        ledger
            .store
            .create(NewTransaction::new(1, 2, D2, 10))
            .await
            .unwrap();

        let listed = ledger
            .queries
            .list_filtered(&ListFilter::default().with_day(D1 + 43_200))
            .await
            .unwrap();
        assert_eq!(listed, vec![first, penultimate]);
    }

    #[tokio::test]
    async fn test_malformed_filters_are_ignored() {
        let ledger = ledger();
        ledger
            .store
            .create(NewTransaction::new(1, 2, D1, 10))
            .await
            .unwrap();
        ledger
            .store
            .create(NewTransaction::new(3, 4, D2, 20))
            .await
            .unwrap();

        let params = ListParams {
            user: Some("one".to_string()),
            day: Some("".to_string()),
            threshold: Some("1e3".to_string()),
        };
        let listed = ledger
            .queries
            .list_filtered(&ListFilter::from(&params))
            .await
            .unwrap();

        assert_eq!(listed.len(), 2);
        assert!(ledger.collection.indexes().is_empty());
    }

    #[tokio::test]
    async fn test_user_filter_ensures_account_index_once() {
        let ledger = ledger();
        let filter = ListFilter::default().with_user(1);

        assert_ok!(ledger.queries.list_filtered(&filter).await);
        assert_ok!(ledger.queries.list_filtered(&filter).await);
        assert_ok!(ledger.balances.compute(BalanceQuery::new(1, 0, D2)).await);

        assert_eq!(ledger.collection.indexes(), vec![crate::handlers::account_index()]);
    }

    #[tokio::test]
    async fn test_list_surfaces_storage_failure() {
        let queries = QueryBuilder::new(Arc::new(UnreachableCollection));
        assert_err!(queries.list(&Predicate::any_stored()).await);
    }

    // =========================================================================
    // Balance
    // =========================================================================

    #[tokio::test]
    async fn test_balance_is_sent_minus_received() {
        let ledger = ledger();
        ledger
            .store
            .create(NewTransaction::new(1, 2, D1 + 10, 300))
            .await
            .unwrap();
        ledger
            .store
            .create(NewTransaction::new(3, 1, D1 + 20, 120))
            .await
            .unwrap();
        // Outside the window
        ledger
            .store
            .create(NewTransaction::new(1, 2, D2, 1_000))
            .await
            .unwrap();
        // Unrelated accounts
        ledger
            .store
            .create(NewTransaction::new(2, 3, D1 + 30, 77))
            .await
            .unwrap();

        let since = D1.to_string();
        let until = D2.to_string();
        let rows = ledger
            .balances
            .compute_balance(&balance_params(Some("1"), Some(&since), Some(&until)))
            .await
            .unwrap();

        assert_eq!(rows, vec![AggregateRow { key: 1, balance: 180 }]);
    }

    #[tokio::test]
    async fn test_balance_window_is_half_open() {
        let ledger = ledger();
        ledger
            .store
            .create(NewTransaction::new(1, 2, 100, 10))
            .await
            .unwrap();
        ledger
            .store
            .create(NewTransaction::new(1, 2, 200, 1_000))
            .await
            .unwrap();

        let rows = ledger
            .balances
            .compute(BalanceQuery::new(1, 100, 200))
            .await
            .unwrap();
        assert_eq!(rows, vec![AggregateRow { key: 1, balance: 10 }]);
    }

    #[tokio::test]
    async fn test_balance_self_transfer_nets_zero() {
        let ledger = ledger();
        ledger
            .store
            .create(NewTransaction::new(1, 1, D1, 500))
            .await
            .unwrap();
        ledger
            .store
            .create(NewTransaction::new(2, 1, D1, 40))
            .await
            .unwrap();

        let rows = ledger
            .balances
            .compute(BalanceQuery::new(1, D1, D2))
            .await
            .unwrap();
        assert_eq!(rows, vec![AggregateRow { key: 1, balance: -40 }]);
    }

    #[tokio::test]
    async fn test_balance_without_matches_is_empty() {
        let ledger = ledger();
        ledger
            .store
            .create(NewTransaction::new(2, 3, D1, 40))
            .await
            .unwrap();

        let rows = ledger
            .balances
            .compute(BalanceQuery::new(1, D1, D2))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_balance_missing_parameter_skips_storage() {
        let balances = BalanceAggregator::new(Arc::new(UnreachableCollection));

        for (params, field) in [
            (balance_params(Some("1"), None, Some("10")), "since"),
            (balance_params(Some("1"), Some("0"), None), "until"),
            (balance_params(None, Some("0"), Some("10")), "user"),
            (balance_params(Some("1"), Some("zero"), Some("10")), "since"),
        ] {
            match balances.compute_balance(&params).await {
                Err(AppError::Domain(DomainError::MissingParameter(name))) => {
                    assert_eq!(name, field)
                }
                other => panic!("Expected MissingParameter({}), got: {:?}", field, other),
            }
        }
    }

    #[tokio::test]
    async fn test_balance_surfaces_storage_failure() {
        let balances = BalanceAggregator::new(Arc::new(UnreachableCollection));

        let result = balances.compute(BalanceQuery::new(1, 0, 10)).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
    }
}
