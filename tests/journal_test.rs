use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

use reclaim::cleaner::{HistoryJournal, JournalAction, JournalEntry};

fn append_raw(path: &Path, bytes: &[u8]) {
    let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

#[test]
fn test_entries_read_back_in_write_order() {
    let dir = TempDir::new().unwrap();
    let journal = HistoryJournal::open(dir.path().join("history.jsonl")).unwrap();

    for (i, name) in ["a", "b", "c"].iter().enumerate() {
        journal
            .append(&JournalEntry::deleted(&dir.path().join(name), i as u64 * 10))
            .unwrap();
    }

    let entries = journal.read_all(None).unwrap();
    let names: Vec<_> = entries
        .iter()
        .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(entries.iter().all(|e| e.action == JournalAction::Delete));
    assert_eq!(entries[2].size, Some(20));
    assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn test_limit_returns_most_recent() {
    let dir = TempDir::new().unwrap();
    let journal = HistoryJournal::open(dir.path().join("history.jsonl")).unwrap();
    for name in ["a", "b", "c", "d"] {
        journal.append(&JournalEntry::deleted(&dir.path().join(name), 1)).unwrap();
    }

    let last_two: Vec<_> = journal
        .read_all(Some(2))
        .unwrap()
        .into_iter()
        .map(|e| e.path)
        .collect();
    assert_eq!(last_two, vec![dir.path().join("c"), dir.path().join("d")]);
}

#[test]
fn test_torn_trailing_write_keeps_earlier_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.jsonl");
    let journal = HistoryJournal::open(&path).unwrap();
    journal.append(&JournalEntry::deleted(&dir.path().join("one"), 1)).unwrap();
    journal.append(&JournalEntry::deleted(&dir.path().join("two"), 2)).unwrap();

    // A crash mid-append leaves half a record with no newline
    append_raw(&path, br#"{"timestamp":"2026-01-01T00:00:00Z","action":"del"#);

    let entries = journal.read_all(None).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].path, dir.path().join("two"));
}

#[test]
fn test_append_after_torn_write_is_readable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.jsonl");
    let journal = HistoryJournal::open(&path).unwrap();
    journal.append(&JournalEntry::deleted(&dir.path().join("one"), 1)).unwrap();
    append_raw(&path, b"{\"timestamp\":");

    // Reopening is what a restart after the crash does
    let journal = HistoryJournal::open(&path).unwrap();
    journal.append(&JournalEntry::deleted(&dir.path().join("three"), 3)).unwrap();

    let paths: Vec<_> = journal.read_all(None).unwrap().into_iter().map(|e| e.path).collect();
    assert_eq!(paths, vec![dir.path().join("one"), dir.path().join("three")]);
}

#[test]
fn test_missing_journal_reads_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.jsonl");
    let journal = HistoryJournal::open(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(journal.read_all(None).unwrap().is_empty());
}

#[test]
fn test_concurrent_appends_do_not_interleave() {
    let dir = TempDir::new().unwrap();
    let journal = std::sync::Arc::new(HistoryJournal::open(dir.path().join("history.jsonl")).unwrap());

    std::thread::scope(|s| {
        for t in 0..4 {
            let journal = journal.clone();
            let base = dir.path().to_path_buf();
            s.spawn(move || {
                for i in 0..25 {
                    journal
                        .append(&JournalEntry::deleted(&base.join(format!("t{}-{}", t, i)), i))
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(journal.read_all(None).unwrap().len(), 100);
}
