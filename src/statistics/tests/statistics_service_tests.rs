// Service-level tests for the statistics aggregator, run against a real
// SQLite database with migrations applied.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use crate::coins::{Coin, CoinService, NewCoin};
use crate::db;
use crate::errors::Error;
use crate::statistics::StatisticsService;
use crate::transactions::{RecordTransaction, TransactionInput, TransactionService};
use crate::users::{NewUser, User, UserCredentials, UserService};

const PASSWORD: &str = "Str0ng!pass";

struct TestContext {
    // Keeps the database directory alive for the duration of the test.
    _data_dir: TempDir,
    users: UserService,
    coins: CoinService,
    transactions: TransactionService,
    statistics: Arc<StatisticsService>,
}

fn setup() -> TestContext {
    let data_dir = tempfile::tempdir().expect("create temp dir");
    let db_path = db::init(data_dir.path().to_str().unwrap()).expect("init database");
    let pool = db::create_pool(&db_path).expect("create pool");
    db::run_migrations(&pool).expect("run migrations");

    let statistics = Arc::new(StatisticsService::new(pool.clone()));
    TestContext {
        _data_dir: data_dir,
        users: UserService::new(pool.clone()),
        coins: CoinService::new(pool.clone()),
        transactions: TransactionService::new(pool, statistics.clone()),
        statistics,
    }
}

async fn create_user(ctx: &TestContext, username: &str) -> User {
    ctx.users
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: PASSWORD.to_string(),
        })
        .await
        .expect("create user")
}

async fn add_coin(ctx: &TestContext, username: &str, name: &str, symbol: &str) -> Coin {
    ctx.coins
        .add_coin(NewCoin {
            username: username.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
        })
        .await
        .expect("add coin")
}

fn buy(quantity: Decimal, average_price: Decimal) -> TransactionInput {
    TransactionInput {
        buy: quantity,
        average_price,
        ..Default::default()
    }
}

fn sell(quantity: Decimal, average_price: Decimal) -> TransactionInput {
    TransactionInput {
        sell: quantity,
        average_price,
        ..Default::default()
    }
}

#[tokio::test]
async fn records_transactions_and_builds_statistics() {
    let ctx = setup();
    let user = create_user(&ctx, "satoshi").await;
    let coin = add_coin(&ctx, "satoshi", "Bitcoin", "BTC").await;

    // Addressed by name, with sloppy casing on purpose.
    let stats = ctx
        .transactions
        .record_transaction(RecordTransaction {
            username: " Satoshi ".to_string(),
            coin_name: "bitcoin".to_string(),
            coin_symbol: "btc".to_string(),
            amounts: buy(dec!(10), dec!(5)),
        })
        .await
        .expect("record buy");
    assert_eq!(stats.invested_total, dec!(50));

    let stats = ctx
        .statistics
        .apply_transaction(user.id, coin.id, sell(dec!(4), dec!(8)))
        .await
        .expect("record sell");

    assert_eq!(stats.buy_total, dec!(10));
    assert_eq!(stats.sell_total, dec!(4));
    assert_eq!(stats.invested_total, dec!(50));
    assert_eq!(stats.invested_avg, dec!(5));
    assert_eq!(stats.realized_total, dec!(32));
    assert_eq!(stats.realized_avg, dec!(8));
    assert_eq!(stats.holdings, dec!(6));
    assert_eq!(stats.transactions_count, 2);

    let ledger = ctx
        .transactions
        .list_transactions(user.id, coin.id)
        .expect("list ledger");
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger[0].buy, dec!(10));
    assert_eq!(ledger[1].sell, dec!(4));
}

#[tokio::test]
async fn statistics_row_is_created_lazily() {
    let ctx = setup();
    let user = create_user(&ctx, "satoshi").await;
    add_coin(&ctx, "satoshi", "Bitcoin", "BTC").await;

    let coin_id = ctx
        .coins
        .get_coin_id(user.id, "bitcoin", "btc")
        .expect("resolve coin id");

    assert!(matches!(
        ctx.statistics.get_statistics(user.id, coin_id),
        Err(Error::NotFound(_))
    ));

    ctx.statistics
        .apply_transaction(user.id, coin_id, buy(dec!(1), dec!(100)))
        .await
        .expect("first transaction");

    let stats = ctx
        .statistics
        .get_statistics(user.id, coin_id)
        .expect("statistics exist now");
    assert_eq!(stats.transactions_count, 1);
}

#[tokio::test]
async fn unknown_coin_fails_and_writes_nothing() {
    let ctx = setup();
    let user = create_user(&ctx, "satoshi").await;
    let coin = add_coin(&ctx, "satoshi", "Bitcoin", "BTC").await;

    let missing = coin.id + 999;
    let result = ctx
        .statistics
        .apply_transaction(user.id, missing, buy(dec!(1), dec!(5)))
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    let ledger = ctx
        .transactions
        .list_transactions(user.id, missing)
        .expect("list ledger");
    assert!(ledger.is_empty());
}

#[tokio::test]
async fn coins_of_other_users_are_not_reachable() {
    let ctx = setup();
    let alice = create_user(&ctx, "alice").await;
    create_user(&ctx, "bob").await;
    let alices_coin = add_coin(&ctx, "alice", "Bitcoin", "BTC").await;

    let bob_id = ctx.users.get_user_by_username("bob").expect("bob").id;
    let result = ctx
        .statistics
        .apply_transaction(bob_id, alices_coin.id, buy(dec!(1), dec!(5)))
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    // Alice's pair is untouched.
    assert!(ctx.statistics.get_statistics(alice.id, alices_coin.id).is_err());
}

#[tokio::test]
async fn validation_failures_win_over_lookup_failures() {
    let ctx = setup();

    // Both paid and average_price set, for a user that doesn't even exist:
    // the contradictory amounts must be rejected before any lookup runs.
    let result = ctx
        .transactions
        .record_transaction(RecordTransaction {
            username: "nobody".to_string(),
            coin_name: "Bitcoin".to_string(),
            coin_symbol: "BTC".to_string(),
            amounts: TransactionInput {
                buy: dec!(1),
                paid: dec!(10),
                average_price: dec!(10),
                ..Default::default()
            },
        })
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn duplicate_watchlist_coin_is_a_conflict() {
    let ctx = setup();
    create_user(&ctx, "satoshi").await;
    add_coin(&ctx, "satoshi", "Bitcoin", "BTC").await;

    let result = ctx
        .coins
        .add_coin(NewCoin {
            username: "satoshi".to_string(),
            name: " bitcoin ".to_string(),
            symbol: "btc".to_string(),
        })
        .await;
    assert!(matches!(result, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn free_transfers_count_quantity_only() {
    let ctx = setup();
    let user = create_user(&ctx, "satoshi").await;
    let coin = add_coin(&ctx, "satoshi", "Bitcoin", "BTC").await;

    let stats = ctx
        .statistics
        .apply_transaction(
            user.id,
            coin.id,
            TransactionInput {
                buy: dec!(5),
                ..Default::default()
            },
        )
        .await
        .expect("free transfer");

    assert_eq!(stats.holdings, dec!(5));
    assert_eq!(stats.invested_total, Decimal::ZERO);
    assert_eq!(stats.transactions_count, 1);
}

#[tokio::test]
async fn deleting_a_coin_cascades_to_its_rows_only() {
    let ctx = setup();
    let user = create_user(&ctx, "satoshi").await;
    let btc = add_coin(&ctx, "satoshi", "Bitcoin", "BTC").await;
    let eth = add_coin(&ctx, "satoshi", "Ethereum", "ETH").await;

    ctx.statistics
        .apply_transaction(user.id, btc.id, buy(dec!(1), dec!(100)))
        .await
        .expect("btc buy");
    ctx.statistics
        .apply_transaction(user.id, eth.id, buy(dec!(2), dec!(10)))
        .await
        .expect("eth buy");

    ctx.coins
        .delete_coin("satoshi", "Bitcoin", "BTC")
        .await
        .expect("delete coin");

    assert!(matches!(
        ctx.statistics.get_statistics(user.id, btc.id),
        Err(Error::NotFound(_))
    ));
    assert!(ctx
        .transactions
        .list_transactions(user.id, btc.id)
        .expect("btc ledger")
        .is_empty());

    // The other pair is untouched.
    let eth_stats = ctx
        .statistics
        .get_statistics(user.id, eth.id)
        .expect("eth statistics");
    assert_eq!(eth_stats.transactions_count, 1);
}

#[tokio::test]
async fn deleting_a_user_requires_credentials_and_cascades() {
    let ctx = setup();
    let user = create_user(&ctx, "satoshi").await;
    let coin = add_coin(&ctx, "satoshi", "Bitcoin", "BTC").await;

    ctx.statistics
        .apply_transaction(user.id, coin.id, buy(dec!(1), dec!(100)))
        .await
        .expect("buy");

    // Wrong password: nothing is deleted.
    let result = ctx
        .users
        .delete_user(UserCredentials {
            username: "satoshi".to_string(),
            email: "satoshi@example.com".to_string(),
            password: "Wr0ng!pass9".to_string(),
        })
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(ctx.users.list_users().expect("users").len(), 1);

    // Full credential match: the user and everything owned goes away.
    ctx.users
        .delete_user(UserCredentials {
            username: "satoshi".to_string(),
            email: "satoshi@example.com".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .expect("delete user");

    assert!(ctx.users.list_users().expect("users").is_empty());
    assert!(ctx.coins.list_coins("satoshi").expect("coins").is_empty());
    assert!(matches!(
        ctx.statistics.get_statistics(user.id, coin.id),
        Err(Error::NotFound(_))
    ));
    assert!(ctx
        .transactions
        .list_transactions(user.id, coin.id)
        .expect("ledger")
        .is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_applies_to_one_pair_lose_nothing() {
    let ctx = setup();
    let user = create_user(&ctx, "satoshi").await;
    let coin = add_coin(&ctx, "satoshi", "Bitcoin", "BTC").await;

    let tasks = 8;
    let per_task = 5;

    let mut handles = Vec::new();
    for _ in 0..tasks {
        let statistics = ctx.statistics.clone();
        let (user_id, coin_id) = (user.id, coin.id);
        handles.push(tokio::spawn(async move {
            for _ in 0..per_task {
                statistics
                    .apply_transaction(user_id, coin_id, buy(dec!(1), dec!(2)))
                    .await?;
            }
            Ok::<(), Error>(())
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked").expect("apply failed");
    }

    let stats = ctx
        .statistics
        .get_statistics(user.id, coin.id)
        .expect("statistics");
    let total = Decimal::from(tasks * per_task);
    assert_eq!(stats.buy_total, total);
    assert_eq!(stats.invested_total, total * dec!(2));
    assert_eq!(stats.invested_avg, dec!(2));
    assert_eq!(stats.holdings, total);
    assert_eq!(stats.transactions_count, (tasks * per_task) as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_pairs_proceed_independently() {
    let ctx = setup();
    let user = create_user(&ctx, "satoshi").await;

    let mut coins = Vec::new();
    for (name, symbol) in [
        ("Bitcoin", "BTC"),
        ("Ethereum", "ETH"),
        ("Litecoin", "LTC"),
        ("Dogecoin", "DOGE"),
    ] {
        coins.push(add_coin(&ctx, "satoshi", name, symbol).await);
    }

    let per_pair = 5;
    let mut handles = Vec::new();
    for coin in &coins {
        let statistics = ctx.statistics.clone();
        let (user_id, coin_id) = (user.id, coin.id);
        handles.push(tokio::spawn(async move {
            for i in 1..=per_pair {
                statistics
                    .apply_transaction(user_id, coin_id, buy(Decimal::from(i), dec!(3)))
                    .await?;
            }
            Ok::<(), Error>(())
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked").expect("apply failed");
    }

    for coin in &coins {
        let stats = ctx
            .statistics
            .get_statistics(user.id, coin.id)
            .expect("statistics");
        assert_eq!(stats.transactions_count, per_pair as i64);
        // 1 + 2 + ... + 5 units.
        assert_eq!(stats.buy_total, dec!(15));
    }
}
