use affaire::db::Database;
use affaire::orm::{
    Direction, Fetched, Field, Model, OnDelete, Predicate, QueryBuilder, Record, RowFactory,
    Value,
};
use affaire::Error;
use tempfile::TempDir;

struct User;

impl Model for User {
    const NAME: &'static str = "User";

    fn fields() -> Vec<(&'static str, Field)> {
        vec![
            ("last_name", Field::text().primary_key()),
            ("first_name", Field::text().nullable()),
            ("dob", Field::text()),
        ]
    }
}

struct Book;

impl Model for Book {
    const NAME: &'static str = "Book";

    fn fields() -> Vec<(&'static str, Field)> {
        vec![
            ("desc", Field::text().nullable()),
            (
                "owner",
                Field::references::<User>()
                    .nullable()
                    .on_delete(OnDelete::Cascade),
            ),
        ]
    }
}

fn database() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let mut db = Database::open(dir.path().join("test.db"));
    db.register_model::<User>().unwrap();
    db.register_model::<Book>().unwrap();
    db.initialize_schema().unwrap();
    (dir, db)
}

fn select(db: &Database, model: &str) -> Vec<Record> {
    let fetched = QueryBuilder::new(db, model)
        .unwrap()
        .select()
        .unwrap()
        .build()
        .unwrap()
        .execute()
        .unwrap()
        .into_result();
    RowFactory::new(db, model, fetched)
        .unwrap()
        .to_instances()
        .unwrap()
}

fn john(db: &Database) -> Record {
    db.record("User")
        .unwrap()
        .with("last_name", "John")
        .with("dob", "93")
}

#[test]
fn test_book_scenario() {
    let (_dir, db) = database();

    let mut book = db
        .record("Book")
        .unwrap()
        .with("desc", "x")
        .with_related("owner", john(&db));
    book.save(&db, true).unwrap();
    assert_eq!(book.pk(), Some(&Value::Integer(1)));
    assert_eq!(
        book.related("owner").unwrap().pk(),
        Some(&Value::from("John"))
    );

    for _ in 0..5 {
        db.record("Book").unwrap().save(&db, true).unwrap();
    }

    assert_eq!(select(&db, "Book").len(), 6);
    assert_eq!(select(&db, "User").len(), 1);

    let fetched = QueryBuilder::new(&db, "Book")
        .unwrap()
        .select()
        .unwrap()
        .where_("desc", Predicate::Eq, Value::Null)
        .unwrap()
        .build()
        .unwrap()
        .execute()
        .unwrap()
        .into_result();
    assert_eq!(fetched.len(), 5);
}

#[test]
fn test_insert_round_trip() {
    let (_dir, db) = database();
    let mut user = john(&db).with("first_name", "Doe");
    user.save(&db, true).unwrap();
    assert_eq!(user.pk(), Some(&Value::from("John")));

    let fetched = QueryBuilder::new(&db, "User")
        .unwrap()
        .select()
        .unwrap()
        .where_("last_name", Predicate::Eq, &user)
        .unwrap()
        .limit(1)
        .build()
        .unwrap()
        .execute()
        .unwrap()
        .into_result();
    assert_eq!(
        fetched,
        Fetched::Row(vec![
            Value::from("John"),
            Value::from("Doe"),
            Value::from("93")
        ])
    );

    let loaded = RowFactory::new(&db, "User", fetched)
        .unwrap()
        .to_instances()
        .unwrap();
    assert_eq!(loaded[0].get("first_name"), Some(&Value::from("Doe")));
}

#[test]
fn test_update_keys_on_frozen_pk() {
    let (_dir, db) = database();
    john(&db).save(&db, true).unwrap();

    let mut user = select(&db, "User").remove(0);
    assert_eq!(user.pk(), Some(&Value::from("John")));
    user.set("last_name", "Jim");

    let builder = QueryBuilder::new(&db, "User")
        .unwrap()
        .update(&mut user, false)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(builder.params().last(), Some(&Value::from("John")));
    drop(builder);

    user.save(&db, false).unwrap();
    assert_eq!(user.pk(), Some(&Value::from("Jim")));

    let users = select(&db, "User");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].pk(), Some(&Value::from("Jim")));
}

#[test]
fn test_delete_with_cascade() {
    let (_dir, db) = database();
    let mut book = db.record("Book").unwrap().with_related("owner", john(&db));
    book.save(&db, true).unwrap();

    book.delete(&db, true).unwrap();
    assert!(book.pk().is_none());
    assert!(book.related("owner").unwrap().pk().is_none());
    assert!(select(&db, "Book").is_empty());
    assert!(select(&db, "User").is_empty());
}

#[test]
fn test_delete_without_cascade() {
    let (_dir, db) = database();
    let mut book = db.record("Book").unwrap().with_related("owner", john(&db));
    book.save(&db, true).unwrap();

    book.delete(&db, false).unwrap();
    assert!(select(&db, "Book").is_empty());
    assert_eq!(select(&db, "User").len(), 1);
}

#[test]
fn test_save_without_cascade_uses_existing_key() {
    let (_dir, db) = database();
    let mut user = john(&db);
    user.save(&db, true).unwrap();

    let mut book = db.record("Book").unwrap().with_related("owner", user);
    book.save(&db, false).unwrap();

    let rows = select(&db, "Book");
    assert_eq!(rows[0].get("owner"), Some(&Value::from("John")));
    assert_eq!(select(&db, "User").len(), 1);
}

#[test]
fn test_limit_shapes() {
    let (_dir, db) = database();
    for desc in ["a", "b", "c"] {
        db.record("Book")
            .unwrap()
            .with("desc", desc)
            .save(&db, true)
            .unwrap();
    }

    let single = QueryBuilder::new(&db, "Book")
        .unwrap()
        .select()
        .unwrap()
        .limit(1)
        .build()
        .unwrap()
        .execute()
        .unwrap()
        .into_result();
    assert!(matches!(single, Fetched::Row(_)));

    let many = QueryBuilder::new(&db, "Book")
        .unwrap()
        .select()
        .unwrap()
        .order("desc", Direction::Desc)
        .unwrap()
        .limit(2)
        .build()
        .unwrap()
        .execute()
        .unwrap()
        .into_result();
    let Fetched::Rows(rows) = many else {
        panic!("expected rows");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][1], Value::from("c"));

    let paged = QueryBuilder::new(&db, "Book")
        .unwrap()
        .select()
        .unwrap()
        .order("id", Direction::Asc)
        .unwrap()
        .offset(1)
        .build()
        .unwrap()
        .execute()
        .unwrap()
        .into_result();
    assert_eq!(paged.len(), 2);
}

#[test]
fn test_where_or_composition() {
    let (_dir, db) = database();
    db.record("Book")
        .unwrap()
        .with("desc", "x")
        .save(&db, true)
        .unwrap();
    db.record("Book").unwrap().save(&db, true).unwrap();
    db.record("Book")
        .unwrap()
        .with("desc", "y")
        .save(&db, true)
        .unwrap();

    let builder = QueryBuilder::new(&db, "Book")
        .unwrap()
        .select()
        .unwrap()
        .where_("id", Predicate::Eq, 1)
        .unwrap()
        .or_where("desc", Predicate::Is, Value::Null)
        .unwrap()
        .build()
        .unwrap();
    assert!(builder.sql().contains(" OR "));
    assert!(builder.sql().contains(" IS "));
    assert!(builder.params().contains(&Value::Null));
    assert_eq!(builder.execute().unwrap().result().len(), 2);

    let fetched = QueryBuilder::new(&db, "Book")
        .unwrap()
        .select()
        .unwrap()
        .where_("desc", Predicate::Like, "y")
        .unwrap()
        .and_where("id", Predicate::Gt, 1)
        .unwrap()
        .build()
        .unwrap()
        .execute()
        .unwrap()
        .into_result();
    assert_eq!(fetched.len(), 1);
}

#[test]
fn test_missing_required_value() {
    let (_dir, db) = database();
    let mut user = db.record("User").unwrap().with("last_name", "Nobody");
    assert!(matches!(
        user.save(&db, true),
        Err(Error::MissingValue(column)) if column == "dob"
    ));
    assert!(user.pk().is_none());
}
