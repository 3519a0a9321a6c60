use std::time::Duration;

use burrow_core::{KeyedUrl, Resolution, ShortCode, Stats};
use burrow_storage::{PostgresRepository, Repository, StorageError};
use burrow_test_infra::postgres::{PostgresConfig, PostgresServer};
use sqlx::postgres::PgPoolOptions;

struct Fixture {
    _postgres: PostgresServer,
    repo: PostgresRepository,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(PostgresConfig::builder().build())
            .await
            .expect("start postgres");
        let url = postgres.database_url().await.expect("postgres url");
        let pool = connect_with_retry(&url).await;

        let repo = PostgresRepository::new(pool).with_timeout(Duration::from_secs(5));
        repo.migrate().await.expect("run migrations");

        Self {
            _postgres: postgres,
            repo,
        }
    }
}

async fn connect_with_retry(url: &str) -> sqlx::PgPool {
    let mut last_error = None;

    for _ in 0..20 {
        match PgPoolOptions::new().max_connections(5).connect(url).await {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect postgres: {last_error:?}");
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

#[tokio::test]
async fn insert_and_resolve() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_url(&code("AB12CD34"), "https://example.com", 1)
        .await
        .unwrap();

    assert_eq!(
        fixture.repo.get_url(&code("AB12CD34")).await.unwrap(),
        Resolution::Active("https://example.com".into())
    );
    assert_eq!(
        fixture.repo.get_url(&code("MISSING0")).await.unwrap(),
        Resolution::NotFound
    );
}

#[tokio::test]
async fn duplicate_url_and_key_conflict_are_distinguished() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_url(&code("AAAA0001"), "https://example.com/a", 1)
        .await
        .unwrap();

    let duplicate = fixture
        .repo
        .add_url(&code("BBBB0001"), "https://example.com/a", 2)
        .await
        .unwrap_err();
    assert!(matches!(duplicate, StorageError::DuplicateUrl(_)));

    let conflict = fixture
        .repo
        .add_url(&code("AAAA0001"), "https://example.com/b", 1)
        .await
        .unwrap_err();
    assert!(matches!(conflict, StorageError::KeyConflict(_)));

    assert_eq!(
        fixture
            .repo
            .get_short_url("https://example.com/a")
            .await
            .unwrap(),
        Some(code("AAAA0001"))
    );
}

#[tokio::test]
async fn failed_batch_leaves_nothing_behind() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_url(&code("AAAA0001"), "https://example.com/taken", 1)
        .await
        .unwrap();

    let err = fixture
        .repo
        .add_batch(
            &[
                KeyedUrl::new(code("BBBB0001"), "https://example.com/x"),
                KeyedUrl::new(code("BBBB0002"), "https://example.com/taken"),
            ],
            1,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::DuplicateUrl(_)));
    assert_eq!(
        fixture.repo.get_url(&code("BBBB0001")).await.unwrap(),
        Resolution::NotFound
    );
}

#[tokio::test]
async fn soft_delete_only_touches_the_owners_rows() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_batch(
            &[
                KeyedUrl::new(code("MINE0001"), "https://example.com/1"),
                KeyedUrl::new(code("MINE0002"), "https://example.com/2"),
            ],
            1,
        )
        .await
        .unwrap();
    fixture
        .repo
        .add_url(&code("THEIRS01"), "https://example.com/3", 2)
        .await
        .unwrap();

    let affected = fixture
        .repo
        .delete_batch(&[code("MINE0001"), code("THEIRS01")], 1)
        .await
        .unwrap();
    assert_eq!(affected, 1);

    assert_eq!(
        fixture.repo.get_url(&code("MINE0001")).await.unwrap(),
        Resolution::Deleted
    );
    assert_eq!(
        fixture.repo.get_url(&code("THEIRS01")).await.unwrap(),
        Resolution::Active("https://example.com/3".into())
    );

    // deleting again is a no-op
    assert_eq!(
        fixture
            .repo
            .delete_batch(&[code("MINE0001")], 1)
            .await
            .unwrap(),
        0
    );

    let listed = fixture.repo.get_all_urls(1).await.unwrap();
    assert_eq!(
        listed,
        vec![KeyedUrl::new(code("MINE0002"), "https://example.com/2")]
    );
}

#[tokio::test]
async fn stats_and_ping() {
    let fixture = Fixture::start().await;

    fixture.repo.ping().await.unwrap();
    assert_eq!(fixture.repo.stats().await.unwrap(), Stats::default());

    fixture
        .repo
        .add_url(&code("AAAA0001"), "https://example.com/a", 1)
        .await
        .unwrap();
    fixture
        .repo
        .add_url(&code("AAAA0002"), "https://example.com/b", 2)
        .await
        .unwrap();

    assert_eq!(
        fixture.repo.stats().await.unwrap(),
        Stats { urls: 2, users: 2 }
    );
}

#[tokio::test]
async fn closed_pool_reports_unavailable() {
    let fixture = Fixture::start().await;
    fixture.repo.pool().close().await;

    let err = fixture.repo.ping().await.unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn slow_write_times_out_and_rolls_back() {
    let fixture = Fixture::start().await;
    let impatient = fixture
        .repo
        .clone()
        .with_timeout(Duration::from_millis(200));

    // an uncommitted row with the same key makes the insert wait on the unique index
    let mut holder = fixture.repo.pool().begin().await.unwrap();
    sqlx::query(
        "INSERT INTO shorturl (id, short_url, original_url) VALUES (gen_random_uuid(), $1, $2)",
    )
    .bind("LOCK0001")
    .bind("https://example.com/holder")
    .execute(&mut *holder)
    .await
    .unwrap();

    let started = std::time::Instant::now();
    let err = impatient
        .add_url(&code("LOCK0001"), "https://example.com/slow", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Timeout(_)), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(3));

    holder.rollback().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(
        fixture
            .repo
            .get_short_url("https://example.com/slow")
            .await
            .unwrap(),
        None
    );
    assert_eq!(
        fixture.repo.get_url(&code("LOCK0001")).await.unwrap(),
        Resolution::NotFound
    );
}

#[tokio::test]
async fn slow_delete_times_out_and_leaves_the_row_active() {
    let fixture = Fixture::start().await;
    let impatient = fixture
        .repo
        .clone()
        .with_timeout(Duration::from_millis(200));

    fixture
        .repo
        .add_url(&code("AAAA0001"), "https://example.com/a", 1)
        .await
        .unwrap();

    // a row lock stalls the soft-delete update behind it
    let mut holder = fixture.repo.pool().begin().await.unwrap();
    sqlx::query("SELECT 1 FROM shorturl WHERE short_url = $1 FOR UPDATE")
        .bind("AAAA0001")
        .execute(&mut *holder)
        .await
        .unwrap();

    let err = impatient
        .delete_batch(&[code("AAAA0001")], 1)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Timeout(_)), "{err:?}");

    holder.rollback().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(
        fixture.repo.get_url(&code("AAAA0001")).await.unwrap(),
        Resolution::Active("https://example.com/a".into())
    );
}
