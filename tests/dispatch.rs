use anyhow::{Result, bail};
use slow5merge::dispatch::{self, Assignment, effective_workers, worker_items};
use slow5merge::DispatchError;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn contiguous_ranges_cover_items_once() {
    let items = 10;
    let workers = effective_workers(4, items, Assignment::Contiguous);
    assert_eq!(workers, 4);

    let ranges: Vec<Vec<usize>> = (0..workers)
        .map(|t| worker_items(t, workers, items, Assignment::Contiguous))
        .collect();
    assert_eq!(
        ranges,
        vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8], vec![9]]
    );
}

#[test]
fn workers_without_a_range_are_not_started() {
    // ceil(4 / 3) = 2 items per worker, so the third worker has nothing.
    assert_eq!(effective_workers(3, 4, Assignment::Contiguous), 2);
    assert_eq!(effective_workers(3, 4, Assignment::RoundRobin), 3);
    assert_eq!(effective_workers(8, 3, Assignment::Contiguous), 3);
    assert_eq!(effective_workers(0, 5, Assignment::Contiguous), 1);
    assert_eq!(effective_workers(4, 0, Assignment::Contiguous), 0);
}

#[test]
fn round_robin_strides_by_worker_count() {
    assert_eq!(worker_items(1, 3, 8, Assignment::RoundRobin), vec![1, 4, 7]);
    assert_eq!(worker_items(2, 3, 8, Assignment::RoundRobin), vec![2, 5]);
    assert!(worker_items(3, 3, 8, Assignment::RoundRobin).is_empty());
}

#[test]
fn results_come_back_in_item_order() -> Result<()> {
    for workers in [1, 2, 3, 7, 64] {
        let out = dispatch::run(workers, 100, |i| Ok(i * 2))?;
        assert_eq!(out, (0..100).map(|i| i * 2).collect::<Vec<_>>());
    }
    let out = dispatch::run_with(3, 20, Assignment::RoundRobin, |i| Ok(i))?;
    assert_eq!(out, (0..20).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn every_item_runs_exactly_once() -> Result<()> {
    let hits: Vec<AtomicUsize> = (0..57).map(|_| AtomicUsize::new(0)).collect();
    dispatch::run(5, hits.len(), |i| {
        hits[i].fetch_add(1, Ordering::SeqCst);
        Ok(())
    })?;
    assert!(hits.iter().all(|h| h.load(Ordering::SeqCst) == 1));
    Ok(())
}

#[test]
fn never_uses_more_threads_than_requested() -> Result<()> {
    let names = Mutex::new(HashSet::new());
    dispatch::run(3, 30, |_| {
        let name = std::thread::current().name().unwrap_or_default().to_string();
        names.lock().unwrap().insert(name);
        std::thread::sleep(std::time::Duration::from_millis(1));
        Ok(())
    })?;
    let names = names.into_inner().unwrap();
    assert!(!names.is_empty() && names.len() <= 3);
    assert!(names.iter().all(|n| n.starts_with("slow5merge-worker-")));
    Ok(())
}

#[test]
fn no_items_no_work() -> Result<()> {
    let out: Vec<()> = dispatch::run(4, 0, |_| bail!("must not be called"))?;
    assert!(out.is_empty());
    Ok(())
}

#[test]
fn worker_error_is_reported_with_item() {
    let err = dispatch::run(2, 10, |i| {
        if i == 7 {
            bail!("bad record");
        }
        Ok(i)
    })
    .unwrap_err();
    match err {
        DispatchError::WorkerFailed {
            worker,
            item,
            source,
        } => {
            assert_eq!(item, 7);
            assert_eq!(worker, 1);
            assert!(source.to_string().contains("bad record"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn worker_panic_is_reported_as_abnormal() {
    let err = dispatch::run(3, 6, |i| {
        if i == 4 {
            panic!("boom at {i}");
        }
        Ok(i)
    })
    .unwrap_err();
    match err {
        DispatchError::WorkerPanicked { worker, message } => {
            assert_eq!(worker, 2);
            assert_eq!(message, "boom at 4");
        }
        other => panic!("unexpected error: {other}"),
    }
}
