//! Tests against a live PostgreSQL. Run with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.
//! Each test owns its own schema so they can run in parallel.

use api_template::error::ErrorKind;
use api_template::migration::{clear_tables, downgrade, upgrade};
use api_template::model::{Example, ExampleStatus, NewExample, SortOrder};
use api_template::sql::QueryOptions;
use api_template::{app_router, AppError, AppState, DatabaseSessionManager, Entity, Repository, ServiceError, Settings};
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use futures::FutureExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const TOKEN: &str = "frankjony17";

fn settings(schema: &str) -> Settings {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");
    let schema = schema.to_string();
    Settings::from_lookup(
        move |key| match key {
            "PG_URL" => Some(url.clone()),
            "POSTGRES_SCHEMA" => Some(schema.clone()),
            "POSTGRES_ACQUIRE_TIMEOUT" => Some("5".into()),
            _ => None,
        },
        false,
    )
    .unwrap()
}

async fn setup(schema: &str) -> (Arc<DatabaseSessionManager>, Settings) {
    let settings = settings(schema);
    let manager = DatabaseSessionManager::new()
        .with_search_path(schema)
        .with_acquire_timeout(settings.database.acquire_timeout);
    manager.init(&settings.database.url, 4).unwrap();
    upgrade(&manager, schema).await.unwrap();
    let mut conn = manager.pool().unwrap().acquire().await.unwrap();
    clear_tables(&mut conn, schema, &[]).await.unwrap();
    (Arc::new(manager), settings)
}

fn sample(name: &str, status: ExampleStatus) -> Example {
    Example::new(NewExample {
        example_name: name.into(),
        example_date: NaiveDate::from_ymd_opt(2024, 4, 4).unwrap(),
        example_number: Some(3),
        example_status: status,
        example_boolean: true,
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri).header("X-API-Key", TOKEN);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
#[ignore = "requires database"]
async fn duplicate_insert_is_a_unique_violation_and_rolls_back() {
    let schema = "test_unique";
    let (manager, _) = setup(schema).await;
    let repo: Repository<Example> = Repository::new(schema);
    let example = sample("dup", ExampleStatus::A);
    let id = example.id;

    let r = repo.clone();
    let err = manager
        .session(move |s| {
            async move {
                r.add(s, &example).await?;
                r.add(s, &example).await?;
                Ok::<_, ServiceError>(())
            }
            .boxed()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UniqueConstraint);
    assert_eq!(err.status(), StatusCode::CONFLICT);

    let r = repo.clone();
    let found = manager
        .session(move |s| async move { Ok::<_, ServiceError>(r.find_all(s, 0, 10, &QueryOptions::default()).await?) }.boxed())
        .await
        .unwrap();
    assert!(found.iter().all(|e| e.id != id));
}

#[tokio::test]
#[ignore = "requires database"]
async fn domain_error_discards_uncommitted_work() {
    let schema = "test_domain_rollback";
    let (manager, _) = setup(schema).await;
    let repo: Repository<Example> = Repository::new(schema);

    let r = repo.clone();
    let err = manager
        .session(move |s| {
            async move {
                r.add(s, &sample("never", ExampleStatus::A)).await?;
                Err::<(), _>(AppError::bad_request("abort").into())
            }
            .boxed()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRequest);

    let r = repo.clone();
    let rows = manager
        .session(move |s| async move { Ok::<_, ServiceError>(r.find_all(s, 0, 10, &QueryOptions::default()).await?) }.boxed())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn find_all_paginates_and_find_one_reports_missing_rows() {
    let schema = "test_pagination";
    let (manager, _) = setup(schema).await;
    let repo: Repository<Example> = Repository::new(schema);

    let r = repo.clone();
    manager
        .session(move |s| {
            async move {
                for name in ["alpha", "bravo", "charlie"] {
                    r.save(s, &sample(name, ExampleStatus::B)).await?;
                }
                Ok::<_, ServiceError>(())
            }
            .boxed()
        })
        .await
        .unwrap();

    let mut session = manager.open_session().unwrap();
    let ordered = QueryOptions::default().order_by("example_name", SortOrder::Asc);
    let page = repo.find_all(&mut session, 1, 1, &ordered).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].example_name, "bravo");
    assert!(repo.find_all(&mut session, 0, 0, &ordered).await.unwrap().is_empty());
    assert!(repo.find_all(&mut session, 5, 10, &ordered).await.unwrap().is_empty());

    let missing = repo.find_one(&mut session, Uuid::new_v4(), &QueryOptions::default()).await;
    assert!(matches!(missing, Err(api_template::DbError::NoResultFound(_))));
    session.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn update_and_delete_report_what_they_touched() {
    let schema = "test_update_delete";
    let (manager, _) = setup(schema).await;
    let repo: Repository<Example> = Repository::new(schema);

    let mut session = manager.open_session().unwrap();
    let saved = repo.save(&mut session, &sample("before", ExampleStatus::A)).await.unwrap();
    let updated = repo
        .update(&mut session, saved.id, vec![("example_name".into(), "after".into())], true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.example_name, "after");
    assert!(repo
        .update(&mut session, Uuid::new_v4(), vec![("example_name".into(), "x".into())], true)
        .await
        .unwrap()
        .is_none());

    assert_eq!(repo.delete(&mut session, saved.id).await.unwrap(), 1);
    assert_eq!(repo.delete(&mut session, saved.id).await.unwrap(), 0);
    session.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn created_example_reads_back_identically_over_http() {
    let schema = "test_http";
    let (manager, settings) = setup(schema).await;
    let app = app_router(AppState::new(settings, manager).unwrap());

    let (status, health) = send(&app, Method::GET, "/healthcheck/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health, json!({"status": "pass", "output": "Service is healthy"}));

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/v1/example/",
        Some(json!({
            "example_name": "Example Name",
            "example_date": "2024-04-04",
            "example_number": 1,
            "example_status": "b",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["example_status"], "B");
    assert_eq!(created["example_boolean"], true);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, fetched) = send(&app, Method::GET, &format!("/api/v1/example/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (_, listed) = send(&app, Method::GET, "/api/v1/example/?example_status=B", None).await;
    assert_eq!(listed, json!([created]));
    let (_, listed) = send(&app, Method::GET, "/api/v1/example/?example_status=A", None).await;
    assert_eq!(listed, json!([]));

    let (status, body) = send(&app, Method::DELETE, &format!("/api/v1/example/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Example deleted successfully");

    let (status, body) = send(&app, Method::GET, &format!("/api/v1/example/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"]["operation"], "get_example_by_id");
    assert_eq!(body["detail"]["id"], id);
}

async fn count_examples(manager: &DatabaseSessionManager, schema: &str) -> i64 {
    let pool = manager.pool().unwrap();
    sqlx::query_scalar(&format!("SELECT count(*) FROM {schema}.example"))
        .fetch_one(&pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires database"]
async fn connect_commits_on_success_and_rolls_back_on_error() {
    let schema = "test_connect";
    let (manager, _) = setup(schema).await;

    let err = manager
        .connect(|conn| {
            async move {
                sqlx::query("INSERT INTO example (example_name, example_date) VALUES ('raw', '2024-04-04')")
                    .execute(&mut *conn)
                    .await?;
                Err::<(), _>(AppError::bad_request("abort").into())
            }
            .boxed()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(ref e) if e.kind == ErrorKind::BadRequest));
    assert_eq!(count_examples(&manager, schema).await, 0);

    let inserted = manager
        .connect(|conn| {
            async move {
                let done = sqlx::query("INSERT INTO example (example_name, example_date) VALUES ('raw', '2024-04-04')")
                    .execute(&mut *conn)
                    .await?;
                Ok::<_, ServiceError>(done.rows_affected())
            }
            .boxed()
        })
        .await
        .unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(count_examples(&manager, schema).await, 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn add_all_is_discarded_with_the_session() {
    let schema = "test_add_all";
    let (manager, _) = setup(schema).await;
    let repo: Repository<Example> = Repository::new(schema);

    let err = manager
        .session(move |s| {
            async move {
                let batch = [sample("one", ExampleStatus::A), sample("two", ExampleStatus::B)];
                let added = repo.add_all(s, &batch).await?;
                assert_eq!(added.len(), 2);
                Err::<(), _>(AppError::bad_request("abort").into())
            }
            .boxed()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRequest);
    assert_eq!(count_examples(&manager, schema).await, 0);
}

#[tokio::test]
#[ignore = "requires database"]
async fn downgrade_to_zero_drops_the_table_and_upgrade_restores_it() {
    let schema = "test_downgrade";
    let (manager, _) = setup(schema).await;
    let pool = manager.pool().unwrap();
    let table = format!("{schema}.example");
    let exists = |pool: sqlx::PgPool, table: String| async move {
        let found: Option<String> = sqlx::query_scalar("SELECT to_regclass($1)::text")
            .bind(table)
            .fetch_one(&pool)
            .await
            .unwrap();
        found.is_some()
    };
    assert!(exists(pool.clone(), table.clone()).await);

    downgrade(&manager, schema, 0).await.unwrap();
    assert!(!exists(pool.clone(), table.clone()).await);

    upgrade(&manager, schema).await.unwrap();
    assert!(exists(pool, table).await);
}

#[tokio::test]
#[ignore = "requires database"]
async fn orphan_reference_is_a_foreign_key_violation() {
    let schema = "test_foreign_key";
    let (manager, _) = setup(schema).await;
    let pool = manager.pool().unwrap();
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {schema}.child (\
         id UUID PRIMARY KEY, \
         example_id UUID NOT NULL REFERENCES {schema}.example (id))"
    ))
    .execute(&pool)
    .await
    .unwrap();

    let table = format!("{schema}.child");
    let err = manager
        .session(move |s| {
            async move {
                let conn = s.connection().await?;
                sqlx::query(&format!("INSERT INTO {table} (id, example_id) VALUES ($1, $2)"))
                    .bind(Uuid::new_v4())
                    .bind(Uuid::new_v4())
                    .execute(conn)
                    .await?;
                Ok::<_, ServiceError>(())
            }
            .boxed()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ForeignKey);
}

#[tokio::test]
#[ignore = "requires database"]
async fn example_columns_match_the_migrated_table() {
    let schema = "test_schema_sync";
    let (manager, _) = setup(schema).await;
    let pool = manager.pool().unwrap();

    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT column_name::text, udt_name::text FROM information_schema.columns \
         WHERE table_schema = $1::text AND table_name = 'example'",
    )
    .bind(schema)
    .fetch_all(&pool)
    .await
    .unwrap();

    let mut in_table: Vec<&str> = rows.iter().map(|(name, _)| name.as_str()).collect();
    let mut in_model: Vec<&str> = Example::COLUMNS.iter().map(|c| c.name).collect();
    in_table.sort_unstable();
    in_model.sort_unstable();
    assert_eq!(in_table, in_model);

    for column in Example::COLUMNS.iter().filter(|c| c.is_enum) {
        let (_, udt) = rows.iter().find(|(name, _)| name == column.name).unwrap();
        assert_eq!(udt, column.pg_type);
    }
}
