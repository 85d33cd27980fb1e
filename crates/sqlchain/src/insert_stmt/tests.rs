use super::*;
use crate::buffer::build_query;
use crate::dialect::{MSSQL, MYSQL, POSTGRES, SQLITE3};
use crate::params;

struct Person {
    id: i64,
    name: String,
    email: Option<String>,
}

impl Record for Person {
    fn columns() -> &'static [&'static str] {
        &["id", "name", "email"]
    }

    fn id_column() -> Option<&'static str> {
        Some("id")
    }

    fn value(&self, column: &str) -> Option<Param> {
        match column {
            "id" => Some(Param::new(self.id)),
            "name" => Some(Param::new(self.name.clone())),
            "email" => Some(Param::new(self.email.clone())),
            _ => None,
        }
    }
}

fn person(name: &str) -> Person {
    Person {
        id: 0,
        name: name.to_string(),
        email: None,
    }
}

#[test]
fn test_insert_columns_and_values() {
    let mut stmt = InsertStmt::insert_into("users");
    stmt.columns(&["name", "age"])
        .values(params!["alice", 30_i32])
        .values(params!["bob", 41_i32]);

    let built = build_query(&stmt, &POSTGRES).unwrap();
    assert_eq!(
        built.sql,
        r#"INSERT INTO "users" ("name","age") VALUES ($1,$2), ($3,$4)"#
    );
    assert_eq!(built.params.len(), 4);

    let built = build_query(&stmt, &MYSQL).unwrap();
    assert_eq!(
        built.sql,
        "INSERT INTO `users` (`name`,`age`) VALUES (?,?), (?,?)"
    );
}

#[test]
fn test_insert_pair() {
    let mut stmt = InsertStmt::insert_into("users");
    stmt.pair("name", "alice").pair("age", 30_i32);

    let built = build_query(&stmt, &POSTGRES).unwrap();
    assert_eq!(built.sql, r#"INSERT INTO "users" ("name","age") VALUES ($1,$2)"#);
    assert_eq!(stmt.row_count(), 1);
}

#[test]
fn test_pair_after_multiple_rows_fails_at_build() {
    let mut stmt = InsertStmt::insert_into("users");
    stmt.columns(&["name"])
        .values(params!["a"])
        .values(params!["b"])
        .pair("age", 1_i32);

    assert_eq!(stmt.error(), Some(&BuildError::PairMultipleRecords));
    let err = build_query(&stmt, &POSTGRES).unwrap_err();
    assert_eq!(err.as_build_error(), Some(&BuildError::PairMultipleRecords));
}

#[test]
fn test_first_error_wins() {
    let mut stmt = InsertStmt::insert_into("users");
    stmt.columns(&["nickname"]).record(&person("a"));
    stmt.values(params!["x"]).values(params!["y"]).pair("z", 1_i32);

    assert!(matches!(
        stmt.error(),
        Some(BuildError::UnknownColumn { column, .. }) if column == "nickname"
    ));
}

#[test]
fn test_record_uses_insert_columns_by_default() {
    let mut stmt = InsertStmt::insert_into("people");
    stmt.record(&person("ann")).record(&person("ben"));

    let built = build_query(&stmt, &POSTGRES).unwrap();
    assert_eq!(
        built.sql,
        r#"INSERT INTO "people" ("name","email") VALUES ($1,$2), ($3,$4)"#
    );
}

#[test]
fn test_record_respects_explicit_columns() {
    let mut stmt = InsertStmt::insert_into("people");
    stmt.columns(&["email", "name"]).record(&person("ann"));

    let built = build_query(&stmt, &SQLITE3).unwrap();
    assert_eq!(
        built.sql,
        r#"INSERT INTO "people" ("email","name") VALUES (?,?)"#
    );
    assert_eq!(format!("{:?}", built.params), r#"ParamList { params: [None, "ann"] }"#);
}

#[test]
fn test_missing_table_and_columns() {
    let stmt = InsertStmt::default();
    let err = build_query(&stmt, &POSTGRES).unwrap_err();
    assert_eq!(err.as_build_error(), Some(&BuildError::TableNotSpecified));

    let stmt = InsertStmt::insert_into("users");
    let err = build_query(&stmt, &POSTGRES).unwrap_err();
    assert_eq!(err.as_build_error(), Some(&BuildError::ColumnNotSpecified));

    let mut stmt = InsertStmt::insert_into("users");
    stmt.columns(&["a"]);
    let err = build_query(&stmt, &POSTGRES).unwrap_err();
    assert_eq!(err.as_build_error(), Some(&BuildError::ColumnNotSpecified));
}

#[test]
fn test_row_width_must_match_columns() {
    let mut stmt = InsertStmt::insert_into("users");
    stmt.columns(&["a", "b"]).values(params![1_i32, 2_i32]).values(params![3_i32]);

    let err = build_query(&stmt, &POSTGRES).unwrap_err();
    assert_eq!(
        err.as_build_error(),
        Some(&BuildError::ValueCountMismatch {
            row: 1,
            expected: 2,
            got: 1
        })
    );
}

#[test]
fn test_ignore_per_dialect() {
    let mut stmt = InsertStmt::insert_into("tags");
    stmt.pair("name", "rust").ignore();

    assert_eq!(
        build_query(&stmt, &POSTGRES).unwrap().sql,
        r#"INSERT INTO "tags" ("name") VALUES ($1) ON CONFLICT DO NOTHING"#
    );
    assert_eq!(
        build_query(&stmt, &MYSQL).unwrap().sql,
        "INSERT IGNORE INTO `tags` (`name`) VALUES (?)"
    );
    assert_eq!(
        build_query(&stmt, &SQLITE3).unwrap().sql,
        r#"INSERT OR IGNORE INTO "tags" ("name") VALUES (?)"#
    );
    let err = build_query(&stmt, &MSSQL).unwrap_err();
    assert_eq!(err.as_build_error(), Some(&BuildError::IgnoreUnsupported("mssql")));
}

#[test]
fn test_returning() {
    let mut stmt = InsertStmt::insert_into("users");
    stmt.pair("name", "alice").returning(&["id", "created_at"]);

    assert_eq!(
        build_query(&stmt, &POSTGRES).unwrap().sql,
        r#"INSERT INTO "users" ("name") VALUES ($1) RETURNING "id","created_at""#
    );
    let err = build_query(&stmt, &MYSQL).unwrap_err();
    assert_eq!(err.as_build_error(), Some(&BuildError::ReturningUnsupported("mysql")));
}

#[test]
fn test_ignore_then_returning_order() {
    let mut stmt = InsertStmt::insert_into("tags");
    stmt.pair("name", "rust").ignore().returning(&["id"]);
    assert_eq!(
        build_query(&stmt, &POSTGRES).unwrap().sql,
        r#"INSERT INTO "tags" ("name") VALUES ($1) ON CONFLICT DO NOTHING RETURNING "id""#
    );
}

#[test]
fn test_schema_qualified_table() {
    let mut stmt = InsertStmt::insert_into("audit.events");
    stmt.pair("kind", "login");
    assert_eq!(
        build_query(&stmt, &MSSQL).unwrap().sql,
        "INSERT INTO [audit].[events] ([kind]) VALUES (@p1)"
    );
}

#[test]
fn test_empty_column_name_rejected() {
    let mut stmt = InsertStmt::insert_into("users");
    stmt.pair("", 1_i32);
    let err = build_query(&stmt, &POSTGRES).unwrap_err();
    assert_eq!(err.as_build_error(), Some(&BuildError::EmptyIdent));
}

#[test]
fn test_empty_dotted_parts_rejected() {
    let mut stmt = InsertStmt::insert_into("public.");
    stmt.pair("a", 1_i32);
    let err = build_query(&stmt, &POSTGRES).unwrap_err();
    assert_eq!(err.as_build_error(), Some(&BuildError::EmptyIdent));

    let mut stmt = InsertStmt::insert_into(".users");
    stmt.pair("a", 1_i32);
    assert!(build_query(&stmt, &MSSQL).is_err());

    let mut stmt = InsertStmt::insert_into("public.users");
    stmt.pair("meta..a", 1_i32);
    let err = build_query(&stmt, &POSTGRES).unwrap_err();
    assert_eq!(err.as_build_error(), Some(&BuildError::EmptyIdent));

    let mut stmt = InsertStmt::insert_into("public.users");
    stmt.pair("a", 1_i32).returning(&["id."]);
    let err = build_query(&stmt, &POSTGRES).unwrap_err();
    assert_eq!(err.as_build_error(), Some(&BuildError::EmptyIdent));
}

#[test]
fn test_raw_takes_precedence() {
    let mut stmt =
        InsertStmt::insert_by_sql("INSERT INTO t (a) VALUES (?) ON CONFLICT (a) DO NOTHING", params![1_i32]);
    stmt.columns(&["ignored"]);

    assert!(stmt.is_raw());
    assert_eq!(
        build_query(&stmt, &POSTGRES).unwrap().sql,
        "INSERT INTO t (a) VALUES ($1) ON CONFLICT (a) DO NOTHING"
    );
}
