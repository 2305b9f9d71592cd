#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use eventsink_core::{EventStore, NewEvent};

const WRITERS: usize = 8;
const PER_WRITER: usize = 250;

#[test]
fn concurrent_adds_assign_every_id_exactly_once() {
    let store = Arc::new(EventStore::new());

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..PER_WRITER)
                    .map(|i| store.add(NewEvent::new("load", format!("{w}:{i}"))).id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for h in handles {
        let mine = h.join().expect("writer panicked");
        // Each writer observes its own ids in increasing order.
        assert!(mine.windows(2).all(|w| w[0] < w[1]));
        for id in mine {
            assert!(ids.insert(id), "duplicate id {id}");
        }
    }

    let n = (WRITERS * PER_WRITER) as i64;
    assert_eq!(ids.len() as i64, n);
    assert!((1..=n).all(|id| ids.contains(&id)));
    assert_eq!(store.len(), WRITERS * PER_WRITER);
}

#[test]
fn list_during_writes_sees_whole_records_in_order() {
    let store = Arc::new(EventStore::new());

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..2_000 {
                store.add(NewEvent::new("w", i.to_string()));
            }
        })
    };

    for _ in 0..200 {
        let page = store.list(50);
        assert!(page.len() <= 50);
        for pair in page.windows(2) {
            assert_eq!(pair[0].id, pair[1].id + 1);
            assert!(pair[0].received_at >= pair[1].received_at);
        }
        // payload i was written as id i + 1
        for ev in &page {
            assert_eq!(ev.payload, (ev.id - 1).to_string());
        }
    }

    writer.join().unwrap();
    assert_eq!(store.list(0).len(), 2_000);
}
