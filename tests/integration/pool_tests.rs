use dupewave::batch::{
    boxed_worker, BatchJob, BatchWorker, PoolConfig, ProgressSink, WorkResult, WorkerError,
    WorkerPool,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

type Factory = Box<dyn Fn(usize) -> Result<Box<dyn BatchWorker<usize>>, WorkerError> + Send + Sync>;

fn counting_factory(seen: Arc<Mutex<Vec<usize>>>) -> Factory {
    Box::new(move |_batch| {
        let seen = Arc::clone(&seen);
        Ok(boxed_worker(move |job: BatchJob<usize>, sink: &ProgressSink| {
            let mut result = WorkResult::default();
            for (done, item) in job.items.into_iter().enumerate() {
                seen.lock().unwrap().push(item);
                result.record_success();
                sink.report(done + 1, &item.to_string());
            }
            Ok(result)
        }))
    })
}

#[test]
fn test_ninety_seven_items_in_three_waves() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let pool = WorkerPool::new(PoolConfig::new(4, 10)).unwrap();

    let report = pool.run((0..97).collect(), counting_factory(Arc::clone(&seen)));

    assert_eq!(report.total_batches, 10);
    assert_eq!(report.waves_planned, 3);
    assert_eq!(report.waves_run, 3);
    assert_eq!(report.batches_completed, 10);
    assert_eq!(report.totals.processed, 97);
    assert_eq!(report.totals.succeeded, 97);
    assert!(!report.has_failures());

    let seen = seen.lock().unwrap();
    let unique: HashSet<_> = seen.iter().copied().collect();
    assert_eq!(seen.len(), 97);
    assert_eq!(unique.len(), 97);
}

#[test]
fn test_wave_never_exceeds_worker_count() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (a, p) = (Arc::clone(&active), Arc::clone(&peak));

    let factory: Factory = Box::new(move |_batch| {
        let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
        Ok(boxed_worker(move |job: BatchJob<usize>, _sink: &ProgressSink| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            active.fetch_sub(1, Ordering::SeqCst);
            let mut result = WorkResult::default();
            for _ in job.items {
                result.record_success();
            }
            Ok(result)
        }))
    });

    let pool = WorkerPool::new(PoolConfig::new(3, 2)).unwrap();
    let report = pool.run((0..20).collect(), factory);

    assert_eq!(report.totals.processed, 20);
    assert!(peak.load(Ordering::SeqCst) <= 3);
}

#[test]
fn test_crashing_batch_does_not_sink_the_run() {
    let factory: Factory = Box::new(|batch| {
        Ok(boxed_worker(move |job: BatchJob<usize>, _sink: &ProgressSink| {
            if batch == 1 {
                panic!("worker exploded");
            }
            if batch == 3 {
                return Err(WorkerError::Other("disk gone".to_string()));
            }
            let mut result = WorkResult::default();
            for _ in job.items {
                result.record_success();
            }
            Ok(result)
        }))
    });

    let pool = WorkerPool::new(PoolConfig::new(2, 5)).unwrap();
    let report = pool.run((0..25).collect(), factory);

    assert_eq!(report.total_batches, 5);
    assert_eq!(report.batches_completed, 3);
    assert_eq!(report.batches_failed, 2);
    assert_eq!(report.totals.processed, 25);
    assert_eq!(report.totals.succeeded, 15);
    assert_eq!(report.totals.failed, 10);
    assert_eq!(report.totals.error_details.len(), 2);

    let failed: Vec<_> = report.failed_batches.iter().map(|f| f.batch_index).collect();
    assert_eq!(failed, vec![1, 3]);
    assert!(report.failed_batches[0].reason.contains("worker exploded"));
    assert!(report.failed_batches[1].reason.contains("disk gone"));
}

#[test]
fn test_skip_heavy_run_warns() {
    let factory: Factory = Box::new(|_batch| {
        Ok(boxed_worker(|job: BatchJob<usize>, _sink: &ProgressSink| {
            let mut result = WorkResult::default();
            for item in job.items {
                if item % 2 == 0 {
                    result.record_skip(job.batch_index, item.to_string(), "unreadable");
                } else {
                    result.record_success();
                }
            }
            Ok(result)
        }))
    });

    let pool = WorkerPool::new(PoolConfig::new(2, 4)).unwrap();
    let report = pool.run((0..16).collect(), factory);

    assert_eq!(report.totals.skipped, 8);
    assert!((report.skip_rate() - 50.0).abs() < f64::EPSILON);
    assert!(report.warnings.iter().any(|w| w.contains("skip rate")));
    assert!(!report.has_failures());
}

#[test]
fn test_shutdown_flag_stops_after_current_wave() {
    let flag = Arc::new(AtomicBool::new(false));
    let trigger = Arc::clone(&flag);

    let factory: Factory = Box::new(move |_batch| {
        let trigger = Arc::clone(&trigger);
        Ok(boxed_worker(move |job: BatchJob<usize>, _sink: &ProgressSink| {
            trigger.store(true, Ordering::SeqCst);
            let mut result = WorkResult::default();
            for _ in job.items {
                result.record_success();
            }
            Ok(result)
        }))
    });

    let pool = WorkerPool::new(PoolConfig::new(2, 1))
        .unwrap()
        .with_shutdown_flag(flag);
    let report = pool.run((0..6).collect(), factory);

    assert!(report.interrupted);
    assert_eq!(report.waves_run, 1);
    assert_eq!(report.batches_completed, 2);
    assert_eq!(report.batches_pending, 4);
    assert_eq!(report.totals.processed, 2);
}
