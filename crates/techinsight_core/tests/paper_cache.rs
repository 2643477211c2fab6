use techinsight_core::db::open_db_in_memory;
use techinsight_core::{
    Paper, PaperCache, PaperRepository, RawPaper, RepoError, SqlitePaperRepository,
};
use rusqlite::Connection;

fn paper(id: &str, published: &str) -> Paper {
    paper_with_title(id, published, &format!("Paper {id}"))
}

fn paper_with_title(id: &str, published: &str, title: &str) -> Paper {
    Paper::from_raw(RawPaper {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        authors: vec!["Ada Lovelace".to_string(), "Charles Babbage".to_string()],
        abstract_text: Some(format!("Abstract of {id}.")),
        categories: vec!["cs.AI".to_string(), "cs.LG".to_string()],
        published_date: Some(published.to_string()),
        pdf_link: Some(format!("http://arxiv.org/pdf/{id}")),
    })
    .unwrap()
}

fn ids(papers: &[Paper]) -> Vec<&str> {
    papers.iter().map(Paper::id).collect()
}

#[test]
fn list_recent_orders_newest_first() {
    let cache = PaperCache::open_in_memory().unwrap();
    cache
        .upsert_many(&[
            paper("2401.00001", "2024-01-01T00:00:00Z"),
            paper("2403.00003", "2024-03-01T00:00:00Z"),
            paper("2402.00002", "2024-02-01T00:00:00Z"),
        ])
        .unwrap();

    let listed = cache.list_recent(2).unwrap();
    assert_eq!(ids(&listed), vec!["2403.00003", "2402.00002"]);
}

#[test]
fn equal_timestamps_keep_insertion_order() {
    let cache = PaperCache::open_in_memory().unwrap();
    cache
        .upsert_many(&[
            paper("b", "2024-01-01T00:00:00Z"),
            paper("a", "2024-01-01T00:00:00Z"),
            paper("c", "2024-01-01T00:00:00Z"),
        ])
        .unwrap();

    assert_eq!(ids(&cache.list_recent(10).unwrap()), vec!["b", "a", "c"]);
}

#[test]
fn upsert_replaces_existing_row_without_merging() {
    let cache = PaperCache::open_in_memory().unwrap();
    cache
        .upsert_many(&[paper_with_title("2401.00001", "2024-01-01T00:00:00Z", "Draft")])
        .unwrap();

    let replacement = Paper::from_raw(RawPaper {
        id: Some("2401.00001".to_string()),
        title: Some("Final".to_string()),
        authors: vec!["Solo Author".to_string()],
        abstract_text: Some("Rewritten.".to_string()),
        categories: Vec::new(),
        published_date: Some("2024-01-05T00:00:00Z".to_string()),
        pdf_link: Some("http://arxiv.org/pdf/2401.00001v2".to_string()),
    })
    .unwrap();
    assert_eq!(cache.upsert_many(&[replacement.clone()]).unwrap(), 1);

    assert_eq!(cache.count_papers().unwrap(), 1);
    let stored = cache.get_paper("2401.00001").unwrap().unwrap();
    assert_eq!(stored, replacement);
    assert!(stored.categories().is_empty());
}

#[test]
fn upserting_same_batch_twice_is_idempotent() {
    let cache = PaperCache::open_in_memory().unwrap();
    let batch = vec![
        paper("2401.00001", "2024-01-01T00:00:00Z"),
        paper("2401.00002", "2024-01-02T00:00:00Z"),
    ];

    cache.upsert_many(&batch).unwrap();
    cache.upsert_many(&batch).unwrap();

    assert_eq!(cache.count_papers().unwrap(), 2);
}

#[test]
fn limit_zero_and_oversized_limit() {
    let cache = PaperCache::open_in_memory().unwrap();
    cache
        .upsert_many(&[
            paper("2401.00001", "2024-01-01T00:00:00Z"),
            paper("2401.00002", "2024-01-02T00:00:00Z"),
        ])
        .unwrap();

    assert!(cache.list_recent(0).unwrap().is_empty());
    assert_eq!(cache.list_recent(u32::MAX).unwrap().len(), 2);
}

#[test]
fn empty_batch_is_a_noop() {
    let cache = PaperCache::open_in_memory().unwrap();
    assert_eq!(cache.upsert_many(&[]).unwrap(), 0);
    assert_eq!(cache.count_papers().unwrap(), 0);
    assert!(cache.get_paper("missing").unwrap().is_none());
}

#[test]
fn stored_papers_round_trip_ordered_lists_and_subsecond_dates() {
    let cache = PaperCache::open_in_memory().unwrap();
    let original = Paper::from_raw(RawPaper {
        id: Some("2405.11111".to_string()),
        title: Some("Ordering".to_string()),
        authors: vec!["Z".to_string(), "A".to_string(), "Z".to_string()],
        abstract_text: Some("Lists keep order.".to_string()),
        categories: vec!["stat.ML".to_string(), "cs.AI".to_string()],
        published_date: Some("2024-05-01T12:30:45.123456789Z".to_string()),
        pdf_link: Some("http://arxiv.org/pdf/2405.11111".to_string()),
    })
    .unwrap();
    cache.upsert_many(&[original.clone()]).unwrap();

    let stored = cache.get_paper("2405.11111").unwrap().unwrap();
    assert_eq!(stored, original);
    assert_eq!(stored.authors(), ["Z", "A", "Z"]);
}

#[test]
fn subsecond_timestamps_sort_correctly() {
    let cache = PaperCache::open_in_memory().unwrap();
    cache
        .upsert_many(&[
            paper("whole", "2024-01-01T00:00:00Z"),
            paper("fraction", "2024-01-01T00:00:00.5Z"),
        ])
        .unwrap();

    assert_eq!(ids(&cache.list_recent(2).unwrap()), vec!["fraction", "whole"]);
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let mut conn = Connection::open_in_memory().unwrap();
    let err = SqlitePaperRepository::try_new(&mut conn).err().unwrap();
    assert!(matches!(err, RepoError::UninitializedConnection { .. }));
}

#[test]
fn repository_reports_corrupt_rows() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO papers (id, title, authors, abstract, categories, published_date, pdf_link)
         VALUES ('bad', 't', 'not json', 'a', '[]', '2024-01-01T00:00:00Z', 'p');",
        [],
    )
    .unwrap();

    let repo = SqlitePaperRepository::try_new(&mut conn).unwrap();
    let err = repo.list_recent(5).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn concurrent_batches_are_all_visible() {
    let cache = std::sync::Arc::new(PaperCache::open_in_memory().unwrap());
    let handles = (0..4)
        .map(|worker| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                let batch = (0..5)
                    .map(|n| paper(&format!("w{worker}-{n}"), "2024-01-01T00:00:00Z"))
                    .collect::<Vec<_>>();
                cache.upsert_many(&batch).unwrap();
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.count_papers().unwrap(), 20);
}

#[test]
fn second_handle_reads_while_another_connection_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let writer = PaperCache::open(&path).unwrap();
    writer
        .upsert_many(&[paper("2401.00001", "2024-01-01T00:00:00Z")])
        .unwrap();
    let reader = PaperCache::open(&path).unwrap();

    let holder = Connection::open(&path).unwrap();
    holder
        .execute_batch("BEGIN IMMEDIATE; DELETE FROM papers;")
        .unwrap();

    // WAL readers see the last committed snapshot without waiting on the lock.
    let started_at = std::time::Instant::now();
    assert_eq!(ids(&reader.list_recent(10).unwrap()), vec!["2401.00001"]);
    assert!(started_at.elapsed() < std::time::Duration::from_secs(1));

    holder.execute_batch("ROLLBACK;").unwrap();
}
