use super::*;
use crate::table::{Table, TableDef, WriteOp};

fn demo() -> Table {
    Table::with_columns(
        TableDef::new("demo")
            .with_search_cols(["field1", "field2"])
            .with_blacklist(WriteOp::Update, ["field_name"]),
        ["id", "field_name", "field1", "field2"],
    )
    .unwrap()
}

#[test]
fn count_and_find_by_id_shapes() {
    assert_eq!(count("demo", "id").sql(), "SELECT COUNT(id) AS nb FROM demo");

    let stmt = find_by_id("demo", "id", Value::Int(3));
    assert_eq!(stmt.sql(), "SELECT * FROM demo WHERE id=:id");
    assert_eq!(stmt.params().get(":id"), Some(&Value::Int(3)));
}

#[test]
fn delete_and_last_id_shapes() {
    let stmt = delete("demo", "demo_id", Value::Int(5));
    assert_eq!(stmt.sql(), "DELETE FROM demo WHERE demo_id=:id");
    assert_eq!(stmt.params().len(), 1);
    assert_eq!(last_id().sql(), "SELECT lastval() AS id");
}

#[test]
fn find_all_is_unfiltered() {
    let stmt = demo().find_all().statement(Dialect::MySql).unwrap();
    assert_eq!(stmt.sql(), "SELECT * FROM demo");
    assert!(stmt.params().is_empty());
}

#[test]
fn find_where_renders_clauses_in_order() {
    let query = demo()
        .find_where(["field_name=:field_name", " ", "field1 IS NOT NULL"])
        .bind_param(":field_name", "field_value")
        .group_by(["field_name, field1"])
        .order_by("field_name", -1)
        .limit(2, 10);

    let mysql = query.statement(Dialect::MySql).unwrap();
    assert_eq!(
        mysql.sql(),
        "SELECT * FROM demo WHERE field_name=:field_name AND field1 IS NOT NULL \
         GROUP BY field_name,field1 ORDER BY field_name DESC LIMIT 10,10"
    );

    let pg = query.statement(Dialect::Postgres).unwrap();
    assert_eq!(
        pg.sql(),
        "SELECT * FROM demo WHERE field_name=:field_name AND field1 IS NOT NULL \
         GROUP BY field_name,field1 ORDER BY field_name DESC LIMIT 10 OFFSET 10"
    );
    assert_eq!(pg.params().get("field_name"), Some(&Value::from("field_value")));
}

#[test]
fn ascending_order_has_no_keyword() {
    let stmt = demo()
        .find_all()
        .order_by("id", Order::Asc)
        .statement(Dialect::MySql)
        .unwrap();
    assert_eq!(stmt.sql(), "SELECT * FROM demo ORDER BY id");

    let stmt = demo()
        .find_all()
        .order_by("id", 1)
        .statement(Dialect::MySql)
        .unwrap();
    assert_eq!(stmt.sql(), "SELECT * FROM demo ORDER BY id");
}

#[test]
fn first_page_starts_at_zero() {
    let stmt = demo()
        .find_all()
        .limit(1, 25)
        .statement(Dialect::MySql)
        .unwrap();
    assert_eq!(stmt.sql(), "SELECT * FROM demo LIMIT 0,25");
}

#[test]
fn invalid_group_or_order_column_fails_on_render() {
    let err = demo()
        .find_all()
        .group_by(["field1; DROP TABLE demo"])
        .statement(Dialect::Postgres)
        .unwrap_err();
    assert!(err.is_validation());

    let err = demo()
        .find_all()
        .order_by("1=1 --", Order::Desc)
        .statement(Dialect::Postgres)
        .unwrap_err();
    assert!(err.to_string().contains("invalid column name"));
}

#[test]
fn search_ors_search_columns_with_one_term() {
    let stmt = demo().search("abc").statement(Dialect::MySql).unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT * FROM demo WHERE field1 LIKE :term OR field2 LIKE :term"
    );
    assert_eq!(stmt.params().get("term"), Some(&Value::from("%abc%")));

    let compiled = stmt.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM demo WHERE field1 LIKE $1 OR field2 LIKE $1"
    );
    assert_eq!(compiled.params.len(), 1);
}

#[test]
fn search_without_columns_matches_everything() {
    let table = Table::with_columns(TableDef::new("plain"), ["id", "name"]).unwrap();
    let stmt = table.search("abc").statement(Dialect::MySql).unwrap();
    assert_eq!(stmt.sql(), "SELECT * FROM plain");
    assert!(stmt.compile().is_ok());
}

#[test]
fn insert_and_update_shapes() {
    let a = Value::from("x");
    let b = Value::Int(2);
    let cols = [("a", &a), ("b", &b)];

    let stmt = insert("t", cols, Dialect::MySql);
    assert_eq!(stmt.sql(), "INSERT INTO t (a,b) VALUES (:a,:b)");

    let stmt = update("t", "id", &Value::Int(9), cols, Dialect::MySql).unwrap();
    assert_eq!(stmt.sql(), "UPDATE t SET a=:a,b=:b WHERE id=:id");
    assert_eq!(stmt.params().get("id"), Some(&Value::Int(9)));
    assert_eq!(stmt.params().len(), 3);
}

#[test]
fn empty_insert_per_dialect() {
    let none: [(&str, &Value); 0] = [];
    assert_eq!(
        insert("t", none, Dialect::Postgres).sql(),
        "INSERT INTO t DEFAULT VALUES"
    );
    assert_eq!(insert("t", none, Dialect::MySql).sql(), "INSERT INTO t () VALUES ()");
}

#[test]
fn update_rejects_id_collision_and_empty_set() {
    let v = Value::Int(1);
    let err = update("t", "pk", &v, [("id", &v)], Dialect::Postgres).unwrap_err();
    assert!(err.is_validation());

    let none: [(&str, &Value); 0] = [];
    assert!(update("t", "id", &v, none, Dialect::Postgres).is_err());
}

#[test]
fn odd_column_names_are_quoted_with_positional_placeholders() {
    let v = Value::Int(1);
    let stmt = insert("t", [("userName", &v), ("ok", &v)], Dialect::Postgres);
    assert_eq!(stmt.sql(), "INSERT INTO t (\"userName\",ok) VALUES (:userName,:ok)");

    let stmt = insert("t", [("first name", &v)], Dialect::Postgres);
    assert_eq!(stmt.sql(), "INSERT INTO t (\"first name\") VALUES (:__p1)");

    let stmt = insert("t", [("first name", &v)], Dialect::MySql);
    assert_eq!(stmt.sql(), "INSERT INTO t (`first name`) VALUES (:__p1)");
}

#[test]
fn compile_numbers_placeholders_by_first_use() {
    let mut params = Params::new();
    params.bind("b", 2).bind("a", 1);
    let compiled = compile("SELECT * FROM t WHERE a=:a AND b=:b OR a=:a", &params).unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM t WHERE a=$1 AND b=$2 OR a=$1");
    assert_eq!(compiled.params, vec![&Value::Int(1), &Value::Int(2)]);
}

#[test]
fn compile_skips_casts_literals_and_comments() {
    let mut params = Params::new();
    params.bind("x", "v");
    let compiled = compile(
        "SELECT ':not', \"col:umn\", now()::date -- :nope\nFROM t WHERE c=:x",
        &params,
    )
    .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT ':not', \"col:umn\", now()::date -- :nope\nFROM t WHERE c=$1"
    );
}

#[test]
fn compile_handles_escaped_quotes() {
    let mut params = Params::new();
    params.bind("x", 1);
    let compiled = compile("SELECT 'it''s :x' WHERE a=:x", &params).unwrap();
    assert_eq!(compiled.sql, "SELECT 'it''s :x' WHERE a=$1");
}

#[test]
fn compile_rejects_missing_and_unused_params() {
    let err = compile("SELECT * FROM t WHERE a=:a", &Params::new()).unwrap_err();
    assert!(err.to_string().contains(":a"));

    let mut params = Params::new();
    params.bind(":extra", 1);
    let err = compile("SELECT * FROM t", &params).unwrap_err();
    assert!(err.to_string().contains(":extra"));
}

#[test]
fn rebinding_replaces_value() {
    let mut params = Params::new();
    params.bind(":k", 1).bind("k", 2);
    assert_eq!(params.len(), 1);
    assert_eq!(params.get(":k"), Some(&Value::Int(2)));
}

#[test]
fn for_exec_keeps_canonical_form_when_different() {
    let query = demo().find_all().limit(3, 5);
    let stmt = Statement::for_exec(|d| query.statement(d)).unwrap();
    assert_eq!(stmt.sql(), "SELECT * FROM demo LIMIT 5 OFFSET 10");
    assert_eq!(stmt.canonical_sql(), Some("SELECT * FROM demo LIMIT 10,5"));

    let stmt = Statement::for_exec(|d| demo().find_all().statement(d)).unwrap();
    assert_eq!(stmt.canonical_sql(), None);
}

#[test]
fn order_from_sign() {
    assert_eq!(Order::from(-1), Order::Desc);
    assert_eq!(Order::from(1), Order::Asc);
    assert_eq!(Order::from(0), Order::Asc);
}
