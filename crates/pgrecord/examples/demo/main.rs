//! Walk through the active-record API against a `demo` table.
//!
//! Run with: cargo run --example demo -p pgrecord
//!
//! Set DB_NAME (and optionally DB_HOST, DB_PORT, DB_USER, DB_PASSWORD) in a
//! .env file or the environment. `RUST_LOG=pgrecord.sql=debug` shows every
//! statement sent.

mod output;

use output::{print_header, print_info, print_records, print_success};
use pgrecord::prelude::*;

struct Demo;

impl Model for Demo {
    const UPDATE_BLACKLIST: &'static [&'static str] = &["field_name"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["field1", "field2"];
}

#[tokio::main]
async fn main() -> Result<(), OrmError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let config = DbConfig::from_env()?.application_name("pgrecord-demo");
    let conn = Connection::connect_or_exit(&config).await;

    conn.client()
        .batch_execute(
            "CREATE TABLE IF NOT EXISTS demo (
                id BIGSERIAL PRIMARY KEY,
                field_name TEXT,
                field1 TEXT,
                field2 TEXT
            );
            TRUNCATE demo RESTART IDENTITY;",
        )
        .await?;

    let demo = Table::for_model::<Demo>(&conn).await?;

    print_header("Columns");
    print_info(&demo.column_names().join(", "));

    print_header("Set / get");
    let mut record = demo.record();
    record.set("field_name", "field_value");
    record.set("field1", "hello world");
    record.set("field2", "first");
    if let Some(value) = record.get("field_name").and_then(Value::as_str) {
        print_success(&format!("field_name = {value}"));
    }
    print_info(&format!("columns = {}", record.columns().to_json()));

    print_header("Save");
    record.save(&conn).await?;
    let id = demo.last_id(&conn).await?;
    print_success(&format!("inserted id {id}"));

    let mut second = demo.record();
    second.hydrate([("field_name", "field_value"), ("field1", "other"), ("field2", "second")]);
    second.save(&conn).await?;
    print_success(&format!("{} records", demo.count_records(&conn).await?));

    print_header("Find one");
    match demo.find_one(&conn, 1).await? {
        Some(found) => print_records(&[found]),
        None => print_info("no record with id 1"),
    }

    print_header("Find where");
    let records = demo
        .find_where(["field_name=:field_name"])
        .bind_param(":field_name", "field_value")
        .order_by("id", -1)
        .limit(1, 10)
        .fetch(&conn)
        .await?;
    print_records(&records);

    print_header("Search");
    let records = demo.search("hello world").limit(1, 10).fetch(&conn).await?;
    print_records(&records);

    print_header("Update");
    if let Some(mut found) = demo.find_one(&conn, id.clone()).await? {
        found.set("field_name", "ignored by update");
        found.set("field2", "updated");
        found.save(&conn).await?;
    }
    print_records(&demo.find_all().order_by("id", 1).fetch(&conn).await?);

    print_header("Remove");
    if let Some(found) = demo.find_one(&conn, id).await? {
        let removed = found.remove(&conn).await?;
        print_success(&format!("removed: {removed}"));
    }
    print_success(&format!("{} records left", demo.count_records(&conn).await?));

    Ok(())
}
