use link_manager::database::Db;
use link_manager::{account, Error};
use rusqlite::Connection;

async fn user(db : &Db, email : &str) -> u32 {
    account::register(db, "Test User", email, "secret1")
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn register_then_authenticate() {
    let db = Db::open_in_memory().unwrap();
    let id = account::register(&db, " Ada ", " ada@example.com ", "secret1")
        .await
        .unwrap();

    let user = account::authenticate(&db, "ada@example.com", "secret1")
        .await
        .unwrap();
    assert_eq!(user.id, id);
    assert_eq!(user.name, "Ada");
    assert_eq!(user.email, "ada@example.com");
    assert_ne!(user.password_hash, "secret1");

    assert!(matches!(
        account::authenticate(&db, "ada@example.com", "secret2").await,
        Err(Error::FailedLogin)
    ));
    assert!(matches!(
        account::authenticate(&db, "bob@example.com", "secret1").await,
        Err(Error::FailedLogin)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn register_rejects_bad_input() {
    let db = Db::open_in_memory().unwrap();
    user(&db, "ada@example.com").await;

    assert!(matches!(
        account::register(&db, "Other", "ada@example.com", "other-pass").await,
        Err(Error::DuplicateEmail)
    ));
    let first = account::authenticate(&db, "ada@example.com", "secret1")
        .await
        .unwrap();
    assert_eq!(first.name, "Test User");
    assert!(matches!(
        account::authenticate(&db, "ada@example.com", "other-pass").await,
        Err(Error::FailedLogin)
    ));

    assert!(matches!(
        account::register(&db, "", "x@example.com", "secret1").await,
        Err(Error::MissingField)
    ));
    assert!(matches!(
        account::register(&db, "X", "not-an-email", "secret1").await,
        Err(Error::InvalidEmail)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn links_are_listed_newest_first() {
    let db = Db::open_in_memory().unwrap();
    let uid = user(&db, "ada@example.com").await;

    let a = db
        .insert_link(uid, "A", "https://a.io", None)
        .await
        .unwrap();
    let b = db
        .insert_link(uid, "B", "https://b.io", Some("second"))
        .await
        .unwrap();

    let links = db.get_links(uid).await.unwrap();
    assert_eq!(links.iter().map(|l| l.id).collect::<Vec<_>>(), vec![b, a]);
    assert_eq!(links[0].user_id, Some(uid));
    assert_eq!(links[0].description.as_deref(), Some("second"));
    assert_eq!(links[1].description, None);
    assert!(links.iter().all(|l| l.created_at.is_some()));
}

#[tokio::test(flavor = "multi_thread")]
async fn links_are_private_to_their_owner() {
    let db = Db::open_in_memory().unwrap();
    let ada = user(&db, "ada@example.com").await;
    let bob = user(&db, "bob@example.com").await;

    let id = db
        .insert_link(ada, "Ada's", "https://ada.io", None)
        .await
        .unwrap();

    assert!(db.get_links(bob).await.unwrap().is_empty());
    assert!(db.search_links(bob, "Ada").await.unwrap().is_empty());

    assert!(matches!(
        db.update_link(id, bob, "Mine", "https://bob.io", None).await,
        Err(Error::LinkNotFound(i)) if i == id
    ));
    assert!(matches!(
        db.delete_link(id, bob).await,
        Err(Error::LinkNotFound(_))
    ));

    let links = db.get_links(ada).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].name, "Ada's");
}

#[tokio::test(flavor = "multi_thread")]
async fn update_keeps_id_and_creation_time() {
    let db = Db::open_in_memory().unwrap();
    let uid = user(&db, "ada@example.com").await;
    let id = db
        .insert_link(uid, "Old", "https://old.io", Some("d"))
        .await
        .unwrap();
    let before = db.get_links(uid).await.unwrap().remove(0);

    db.update_link(id, uid, "New", "https://new.io", None)
        .await
        .unwrap();

    let after = db.get_links(uid).await.unwrap().remove(0);
    assert_eq!(after.id, id);
    assert_eq!(after.name, "New");
    assert_eq!(after.url, "https://new.io");
    assert_eq!(after.description, None);
    assert_eq!(after.created_at, before.created_at);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_twice_reports_missing() {
    let db = Db::open_in_memory().unwrap();
    let uid = user(&db, "ada@example.com").await;
    let id = db
        .insert_link(uid, "A", "https://a.io", None)
        .await
        .unwrap();

    db.delete_link(id, uid).await.unwrap();
    assert!(matches!(
        db.delete_link(id, uid).await,
        Err(Error::LinkNotFound(_))
    ));
    assert!(db.get_links(uid).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn search_matches_name_or_description() {
    let db = Db::open_in_memory().unwrap();
    let uid = user(&db, "ada@example.com").await;
    db.insert_link(uid, "Rust book", "https://doc.rust-lang.org/book", None)
        .await
        .unwrap();
    db.insert_link(uid, "Docs", "https://docs.rs", Some("crate documentation"))
        .await
        .unwrap();
    db.insert_link(uid, "Sale", "https://shop.io", Some("50% off"))
        .await
        .unwrap();

    let names = |links : Vec<link_manager::models::Link>| {
        links.into_iter().map(|l| l.name).collect::<Vec<_>>()
    };

    assert_eq!(names(db.search_links(uid, "rust").await.unwrap()), ["Rust book"]);
    assert_eq!(names(db.search_links(uid, "CRATE").await.unwrap()), ["Docs"]);
    assert_eq!(names(db.search_links(uid, "%").await.unwrap()), ["Sale"]);
    // the url is not searched
    assert!(db.search_links(uid, "shop").await.unwrap().is_empty());
}

fn legacy_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE LINK (
             id   INTEGER PRIMARY KEY AUTOINCREMENT,
             name TEXT NOT NULL,
             url  TEXT NOT NULL
         );
         INSERT INTO LINK (name, url) VALUES ('Old', 'https://old.io');",
    )
    .unwrap();
    conn
}

#[tokio::test(flavor = "multi_thread")]
async fn legacy_links_are_shared_until_assigned() {
    let db = Db::from_connection(legacy_connection()).unwrap();
    let ada = user(&db, "ada@example.com").await;
    let bob = user(&db, "bob@example.com").await;

    for uid in &[ada, bob] {
        let links = db.get_links(*uid).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].user_id, None);
        assert_eq!(links[0].created_at, None);
        assert_eq!(links[0].description, None);
    }

    let id = db.insert_link(ada, "New", "https://new.io", None).await.unwrap();
    assert_eq!(db.get_links(bob).await.unwrap().len(), 1);
    assert_eq!(db.get_links(ada).await.unwrap()[0].id, id);

    assert_eq!(db.assign_unowned_links(ada).await.unwrap(), 1);
    assert_eq!(db.assign_unowned_links(ada).await.unwrap(), 0);

    assert!(db.get_links(bob).await.unwrap().is_empty());
    assert_eq!(db.get_links(ada).await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn legacy_links_can_be_edited_by_anyone() {
    let db = Db::from_connection(legacy_connection()).unwrap();
    let bob = user(&db, "bob@example.com").await;
    let id = db.get_links(bob).await.unwrap()[0].id;

    db.update_link(id, bob, "Renamed", "https://old.io", Some("now described"))
        .await
        .unwrap();
    assert_eq!(
        db.search_links(bob, "described").await.unwrap()[0].name,
        "Renamed"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn data_survives_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("links.db");

    let uid = {
        let db = Db::new(&path).unwrap();
        let uid = user(&db, "ada@example.com").await;
        db.insert_link(uid, "A", "https://a.io", None).await.unwrap();
        uid
    };

    let db = Db::new(&path).unwrap();
    assert_eq!(db.get_links(uid).await.unwrap().len(), 1);
    assert!(account::authenticate(&db, "ada@example.com", "secret1")
        .await
        .is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn first_tool_tables_are_upgraded_in_place() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE LINK (
             id          INTEGER PRIMARY KEY AUTOINCREMENT,
             name        TEXT NOT NULL,
             link        TEXT NOT NULL,
             description TEXT
         );
         INSERT INTO LINK (name, link, description)
             VALUES ('Old', 'https://old.io', 'from the menu');",
    )
    .unwrap();

    let db = Db::from_connection(conn).unwrap();
    let uid = user(&db, "ada@example.com").await;

    let links = db.get_links(uid).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].url, "https://old.io");
    assert_eq!(links[0].description.as_deref(), Some("from the menu"));
    assert_eq!(links[0].user_id, None);

    assert_eq!(db.search_links(uid, "menu").await.unwrap().len(), 1);
    db.update_link(links[0].id, uid, "Old", "https://new.io", None)
        .await
        .unwrap();
    assert_eq!(db.get_links(uid).await.unwrap()[0].url, "https://new.io");
}

#[tokio::test(flavor = "multi_thread")]
async fn odd_timestamps_read_as_unknown() {
    let conn = legacy_connection();
    conn.execute_batch(
        "ALTER TABLE LINK ADD COLUMN created_at TIMESTAMP;
         UPDATE LINK SET created_at = '2024-01-01 10:00:00';
         INSERT INTO LINK (name, url, created_at)
             VALUES ('Micro', 'https://micro.io', '2024-01-01 10:00:00.123456');
         INSERT INTO LINK (name, url, created_at)
             VALUES ('Number', 'https://number.io', 1704103200);",
    )
    .unwrap();

    let db = Db::from_connection(conn).unwrap();
    let uid = user(&db, "ada@example.com").await;

    let links = db.get_links(uid).await.unwrap();
    assert_eq!(links.len(), 3);
    assert_eq!(links[0].name, "Number");
    assert_eq!(links[0].created_at, None);
    assert_eq!(links[1].name, "Micro");
    assert_eq!(links[1].added(), "Unknown");
    assert_eq!(links[2].added(), "2024-01-01");
}

#[tokio::test(flavor = "multi_thread")]
async fn passwords_keep_their_spaces() {
    let db = Db::open_in_memory().unwrap();
    account::register(&db, "Ada", "ada@example.com", "      ")
        .await
        .unwrap();

    assert!(account::authenticate(&db, "ada@example.com", "      ")
        .await
        .is_ok());
    assert!(matches!(
        account::authenticate(&db, "ada@example.com", "").await,
        Err(Error::FailedLogin)
    ));
}
