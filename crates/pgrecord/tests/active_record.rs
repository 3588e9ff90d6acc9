//! End-to-end active-record tests.
//!
//! These run only when DATABASE_URL is set; every test works on its own
//! temporary table.

use pgrecord::{Model, Order, Table, TableDef, Value, WriteOp, describe_table};

async fn try_connect() -> Option<tokio_postgres::Client> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let (client, connection) = tokio_postgres::connect(&database_url, tokio_postgres::NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("tokio-postgres connection error: {e}");
        }
    });
    Some(client)
}

async fn demo_table(client: &tokio_postgres::Client) -> Table {
    client
        .batch_execute(
            "CREATE TEMP TABLE demo (
                id BIGSERIAL PRIMARY KEY,
                field_name TEXT,
                field1 TEXT,
                field2 TEXT,
                hits INT NOT NULL DEFAULT 0
            )",
        )
        .await
        .unwrap();
    Table::for_model::<Demo>(client).await.unwrap()
}

struct Demo;

impl Model for Demo {
    const UPDATE_BLACKLIST: &'static [&'static str] = &["field_name"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["field1", "field2"];
}

async fn insert(table: &Table, client: &tokio_postgres::Client, name: &str, f1: &str, f2: &str) {
    let mut record = table.record();
    record.hydrate([("field_name", name), ("field1", f1), ("field2", f2)]);
    record.set("hits", 0);
    assert!(record.save(client).await.unwrap());
}

#[tokio::test]
async fn discovers_columns_in_table_order() {
    let Some(client) = try_connect().await else {
        return;
    };
    let demo = demo_table(&client).await;
    assert_eq!(
        demo.column_names(),
        &["id", "field_name", "field1", "field2", "hits"]
    );

    let schema = describe_table(&client, "demo").await.unwrap();
    let id = schema.column("id").unwrap();
    assert!(id.not_null);
    assert!(id.default_expr.as_deref().unwrap().contains("nextval"));
}

#[tokio::test]
async fn unknown_table_has_no_columns() {
    let Some(client) = try_connect().await else {
        return;
    };
    let table = Table::open(&client, TableDef::new("pgrecord_missing_table"))
        .await
        .unwrap();
    assert!(table.column_names().is_empty());
}

#[tokio::test]
async fn insert_then_find_one() {
    let Some(client) = try_connect().await else {
        return;
    };
    let demo = demo_table(&client).await;

    insert(&demo, &client, "field_value", "hello world", "a").await;
    let id = demo.last_id(&client).await.unwrap();
    assert_eq!(id, Value::Int(1));

    let found = demo.find_one(&client, id).await.unwrap().unwrap();
    assert_eq!(found.get("field_name"), Some(&Value::from("field_value")));
    assert_eq!(found.get("hits"), Some(&Value::Int(0)));
    assert!(!found.is_new());

    assert!(demo.find_one(&client, 42).await.unwrap().is_none());
    assert_eq!(demo.count_records(&client).await.unwrap(), 1);
}

#[tokio::test]
async fn textual_values_are_coerced_to_column_types() {
    let Some(client) = try_connect().await else {
        return;
    };
    let demo = demo_table(&client).await;

    let mut record = demo.record();
    record.set("field_name", "x");
    record.set("hits", "12");
    record.save(&client).await.unwrap();

    let found = demo.find_one(&client, "1").await.unwrap().unwrap();
    assert_eq!(found.get("hits"), Some(&Value::Int(12)));
}

#[tokio::test]
async fn update_skips_blacklisted_columns() {
    let Some(client) = try_connect().await else {
        return;
    };
    let demo = demo_table(&client).await;
    insert(&demo, &client, "original", "f1", "f2").await;

    let mut record = demo.find_one(&client, 1).await.unwrap().unwrap();
    record.set("field_name", "changed");
    record.set("field2", "updated");
    assert!(record.save(&client).await.unwrap());

    let found = demo.find_one(&client, 1).await.unwrap().unwrap();
    assert_eq!(found.get("field_name"), Some(&Value::from("original")));
    assert_eq!(found.get("field2"), Some(&Value::from("updated")));
    assert_eq!(demo.count_records(&client).await.unwrap(), 1);
}

#[tokio::test]
async fn find_where_with_clauses() {
    let Some(client) = try_connect().await else {
        return;
    };
    let demo = demo_table(&client).await;
    for i in 0..5 {
        insert(&demo, &client, "field_value", &format!("row {i}"), "x").await;
    }
    insert(&demo, &client, "other", "row x", "x").await;

    let records = demo
        .find_where(["field_name=:field_name"])
        .bind_param(":field_name", "field_value")
        .order_by("id", -1)
        .limit(1, 2)
        .fetch(&client)
        .await
        .unwrap();
    let ids: Vec<_> = records.iter().map(|r| r.id().cloned().unwrap()).collect();
    assert_eq!(ids, vec![Value::Int(5), Value::Int(4)]);

    let second_page = demo
        .find_where(["field_name=:field_name"])
        .bind_param(":field_name", "field_value")
        .order_by("id", Order::Desc)
        .limit(2, 2)
        .fetch(&client)
        .await
        .unwrap();
    assert_eq!(second_page[0].id(), Some(&Value::Int(3)));

    let none = demo
        .find_where(["field_name=:field_name"])
        .bind_param(":field_name", "missing")
        .fetch(&client)
        .await
        .unwrap();
    assert!(none.is_empty());

    assert_eq!(demo.find_all().fetch(&client).await.unwrap().len(), 6);
}

#[tokio::test]
async fn group_by_identifier() {
    let Some(client) = try_connect().await else {
        return;
    };
    let demo = demo_table(&client).await;
    insert(&demo, &client, "a", "1", "x").await;
    insert(&demo, &client, "b", "2", "x").await;

    let records = demo
        .find_all()
        .group_by(["id"])
        .order_by("id", 1)
        .fetch(&client)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn search_matches_any_search_column() {
    let Some(client) = try_connect().await else {
        return;
    };
    let demo = demo_table(&client).await;
    insert(&demo, &client, "n", "say hello world", "x").await;
    insert(&demo, &client, "n", "x", "hello world again").await;
    insert(&demo, &client, "hello world", "x", "y").await;

    let records = demo.search("hello world").limit(1, 10).fetch(&client).await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn remove_deletes_row() {
    let Some(client) = try_connect().await else {
        return;
    };
    let demo = demo_table(&client).await;
    insert(&demo, &client, "n", "a", "b").await;

    let record = demo.find_one(&client, 1).await.unwrap().unwrap();
    assert!(record.remove(&client).await.unwrap());
    assert!(!record.remove(&client).await.unwrap());
    assert_eq!(demo.count_records(&client).await.unwrap(), 0);

    assert!(!demo.record().remove(&client).await.unwrap());
}

#[tokio::test]
async fn insert_blacklist_lets_defaults_apply() {
    let Some(client) = try_connect().await else {
        return;
    };
    client
        .batch_execute(
            "CREATE TEMP TABLE account (
                account_id SERIAL PRIMARY KEY,
                email TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .await
        .unwrap();
    let def = TableDef::new("account")
        .with_id_col("account_id")
        .with_blacklist(WriteOp::Insert, ["created_at"]);
    let accounts = Table::open(&client, def).await.unwrap();

    let mut record = accounts.record();
    record.set("email", "a@example.com");
    record.set("created_at", Value::Null);
    assert!(record.save(&client).await.unwrap());

    let id = accounts.last_id(&client).await.unwrap();
    let found = accounts.find_one(&client, id).await.unwrap().unwrap();
    assert!(matches!(found.get("created_at"), Some(Value::TimestampTz(_))));
}

#[tokio::test]
async fn unique_violation_is_reported() {
    let Some(client) = try_connect().await else {
        return;
    };
    client
        .batch_execute("CREATE TEMP TABLE tag (id SERIAL PRIMARY KEY, name TEXT UNIQUE)")
        .await
        .unwrap();
    let tags = Table::open(&client, TableDef::new("tag")).await.unwrap();

    let mut record = tags.record();
    record.set("name", "rust");
    record.save(&client).await.unwrap();
    let err = record.save(&client).await.unwrap_err();
    assert!(err.is_unique_violation());
}

#[tokio::test]
async fn array_and_interval_columns_read_and_write_back() {
    let Some(client) = try_connect().await else {
        return;
    };
    client
        .batch_execute(
            "CREATE TEMP TABLE post (
                id SERIAL PRIMARY KEY,
                title TEXT,
                tags TEXT[],
                scores INT4[],
                dur INTERVAL
            );
            INSERT INTO post (title, tags, scores, dur)
            VALUES ('first', ARRAY['rust', NULL], '{1,2}', '1 day 2 hours');",
        )
        .await
        .unwrap();
    let posts = Table::open(&client, TableDef::new("post")).await.unwrap();

    let all = posts.find_all().fetch(&client).await.unwrap();
    assert_eq!(all.len(), 1);

    let mut post = posts.find_one(&client, 1).await.unwrap().unwrap();
    assert_eq!(
        post.get("tags"),
        Some(&Value::Array(vec![Value::from("rust"), Value::Null]))
    );
    assert_eq!(
        post.get("scores"),
        Some(&Value::Array(vec![Value::Int(1), Value::Int(2)]))
    );
    assert!(matches!(post.get("dur"), Some(Value::Raw(_))));

    post.set("title", "renamed");
    post.set("tags", vec![Value::from("orm")]);
    assert!(post.save(&client).await.unwrap());

    let row = client
        .query_one(
            "SELECT title, tags, dur = INTERVAL '1 day 2 hours' AS same_dur FROM post WHERE id = 1",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(row.get::<_, String>("title"), "renamed");
    assert_eq!(row.get::<_, Vec<String>>("tags"), vec!["orm".to_string()]);
    assert!(row.get::<_, bool>("same_dur"));
}

#[tokio::test]
async fn find_one_requires_exactly_one_match() {
    let Some(client) = try_connect().await else {
        return;
    };
    demo_table(&client).await;
    client
        .batch_execute(
            "INSERT INTO demo (field_name, field1) VALUES ('dup', 'a'), ('dup', 'b'), ('one', 'c')",
        )
        .await
        .unwrap();
    let by_name = Table::open(&client, TableDef::new("demo").with_id_col("field_name"))
        .await
        .unwrap();

    assert!(by_name.find_one(&client, "dup").await.unwrap().is_none());
    assert!(by_name.find_one(&client, "missing").await.unwrap().is_none());

    let one = by_name.find_one(&client, "one").await.unwrap().unwrap();
    assert_eq!(one.get("field1"), Some(&Value::from("c")));
}

#[tokio::test]
async fn find_one_with_unconvertible_identifier_matches_nothing() {
    let Some(client) = try_connect().await else {
        return;
    };
    let demo = demo_table(&client).await;
    insert(&demo, &client, "n", "a", "b").await;

    assert!(demo.find_one(&client, "abc").await.unwrap().is_none());

    let err = demo
        .find_where(["id=:id"])
        .bind_param("id", "abc")
        .fetch(&client)
        .await
        .unwrap_err();
    assert!(err.is_encode());
}

#[tokio::test]
async fn server_errors_keep_their_message() {
    let Some(client) = try_connect().await else {
        return;
    };
    client
        .batch_execute("CREATE TEMP TABLE note (id SERIAL PRIMARY KEY, body TEXT NOT NULL)")
        .await
        .unwrap();
    let notes = Table::open(&client, TableDef::new("note")).await.unwrap();

    let err = notes.record().save(&client).await.unwrap_err();
    assert!(matches!(err, pgrecord::OrmError::Query(_)));
    let message = err.to_string();
    assert!(message.contains("db error"), "{message}");
    assert!(message.contains("null value in column"), "{message}");
}
