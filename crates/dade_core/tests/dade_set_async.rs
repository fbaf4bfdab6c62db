mod common;

use common::{TestDb, TestRow};
use dade_core::{DadeContext, DbError, Repository, SqlParams, TransactionStatus};

#[tokio::test]
async fn async_crud_round_trip_in_one_transaction() {
    let db = TestDb::new();
    let mut ctx = DadeContext::new(&db.factory);
    let set = ctx.set::<TestRow>().unwrap();

    let id = set.add_async(TestRow::named("first")).await.unwrap();
    let found = set.get_async(id).await.unwrap().unwrap();
    assert_eq!(found.name, "first");

    let renamed = TestRow {
        id,
        name: "renamed".to_string(),
    };
    assert!(set.update_async(renamed.clone()).await.unwrap());
    assert_eq!(set.get_async(id).await.unwrap(), Some(renamed.clone()));

    assert!(set.delete_async(renamed.clone()).await.unwrap());
    assert!(!set.delete_async(renamed).await.unwrap());
    assert_eq!(set.get_async(id).await.unwrap(), None);

    ctx.commit().unwrap();
    assert_eq!(db.committed_rows(), 0);
}

#[tokio::test]
async fn async_bulk_operations_report_counts() {
    let db = TestDb::new();
    let mut ctx = DadeContext::new(&db.factory);
    let set = ctx.set::<TestRow>().unwrap();

    let inserted = set
        .add_many_async(vec![TestRow::named("a"), TestRow::named("b"), TestRow::named("c")])
        .await
        .unwrap();
    assert_eq!(inserted, 3);

    let mut rows = set.get_all_async().await.unwrap();
    assert_eq!(rows.len(), 3);
    for row in &mut rows {
        row.name = row.name.to_uppercase();
    }
    assert_eq!(set.update_many_async(rows.clone()).await.unwrap(), 3);
    assert_eq!(set.delete_many_async(rows[1..].to_vec()).await.unwrap(), 2);

    let remaining = set.get_all_async().await.unwrap();
    assert_eq!(remaining, vec![rows[0].clone()]);

    ctx.commit().unwrap();
    assert_eq!(db.committed_rows(), 1);
}

#[tokio::test]
async fn async_queries_match_their_sync_counterparts() {
    let db = TestDb::new();
    let mut ctx = DadeContext::new(&db.factory);
    let set = ctx.set::<TestRow>().unwrap();
    set.add_many(&[TestRow::named("x"), TestRow::named("y"), TestRow::named("y")])
        .unwrap();

    let by_name = "SELECT Id, Name FROM Test WHERE Name = :name";
    let ys = set
        .query_async(by_name, SqlParams::named([("name", String::from("y"))]))
        .await
        .unwrap();
    assert_eq!(ys.len(), 2);

    let x = set
        .single_async(by_name, SqlParams::named([("name", String::from("x"))]))
        .await
        .unwrap();
    assert_eq!(x.name, "x");

    let err = set
        .single_async(by_name, SqlParams::named([("name", String::from("y"))]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::MultipleRows));

    let err = set
        .single_async(by_name, SqlParams::named([("name", String::from("z"))]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NoRows));

    let count_sql = "SELECT COUNT(*) FROM Test WHERE Name = :name";
    assert!(set
        .any_async(count_sql, SqlParams::named([("name", String::from("x"))]))
        .await
        .unwrap());
    assert!(!set
        .any_async(count_sql, SqlParams::named([("name", String::from("z"))]))
        .await
        .unwrap());

    let deleted = set
        .execute_async(
            "DELETE FROM Test WHERE Name = ?1",
            SqlParams::positional([String::from("y")]),
        )
        .await
        .unwrap();
    assert_eq!(deleted, 2);
}

#[tokio::test]
async fn async_calls_fail_once_the_context_completes() {
    let db = TestDb::new();
    let mut ctx = DadeContext::new(&db.factory);
    let set = ctx.set::<TestRow>().unwrap();
    set.add_async(TestRow::named("kept")).await.unwrap();

    ctx.rollback().unwrap();

    let err = set.get_all_async().await.unwrap_err();
    assert!(matches!(err, DbError::TransactionCompleted(TransactionStatus::RolledBack)));
    let err = set.add_async(TestRow::named("late")).await.unwrap_err();
    assert!(matches!(err, DbError::TransactionCompleted(TransactionStatus::RolledBack)));
    assert_eq!(db.committed_rows(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_calls_on_one_transaction_are_serialized() {
    let db = TestDb::new();
    let mut ctx = DadeContext::new(&db.factory);
    let left = ctx.set::<TestRow>().unwrap();
    let right = left.clone();

    let (a, b, c) = tokio::join!(
        left.add_many_async((0..20).map(|i| TestRow::named(&format!("l{i}"))).collect()),
        right.add_many_async((0..20).map(|i| TestRow::named(&format!("r{i}"))).collect()),
        left.any_async("SELECT COUNT(*) FROM Test", ()),
    );
    assert_eq!(a.unwrap(), 20);
    assert_eq!(b.unwrap(), 20);
    c.unwrap();

    assert_eq!(
        ctx.execute_scalar_i64("SELECT COUNT(*) FROM Test", ()).unwrap(),
        40
    );
    ctx.commit().unwrap();
    assert_eq!(db.committed_rows(), 40);
}
