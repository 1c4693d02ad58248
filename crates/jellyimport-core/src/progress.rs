use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Progress sink: `(stage, current, total, message)`.
///
/// The lifetime lets callers pass closures that borrow local state, such as
/// a set of progress bars owned by `main`.
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + Send + Sync + 'a;

const MIN_INTERVAL: Duration = Duration::from_millis(200);

/// Rate-limits a [`ProgressCallback`] across the rayon pool.
///
/// The first report of each stage and the completion report always get
/// through; anything in between is dropped if it comes within
/// `MIN_INTERVAL` of the previous emit.
pub struct ThrottledProgress<'a> {
    sink: &'a ProgressCallback<'a>,
    /// Stage of the last emitted report and when it went out
    last: Mutex<Option<(String, Instant)>>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(sink: &'a ProgressCallback<'a>) -> Self {
        Self {
            sink,
            last: Mutex::new(None),
        }
    }

    fn should_emit(&self, stage: &str, finished: bool) -> bool {
        let Ok(mut last) = self.last.lock() else {
            return finished;
        };
        let due = match last.as_ref() {
            Some((prev, at)) => prev != stage || finished || at.elapsed() >= MIN_INTERVAL,
            None => true,
        };
        if due {
            *last = Some((stage.to_string(), Instant::now()));
        }
        due
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        if self.should_emit(stage, current + 1 >= total) {
            (self.sink)(stage, current, total, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_throttle_keeps_completion() {
        let calls = AtomicU64::new(0);
        let cb = |_: &str, _: u64, _: u64, _: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
        };
        let tp = ThrottledProgress::new(&cb);
        for i in 0..1000 {
            tp.report("hash", i, 1000, "");
        }
        let n = calls.load(Ordering::SeqCst);
        // first emit plus the completion report, nothing in between this fast
        assert!(n >= 2);
        assert!(n < 1000);
    }

    #[test]
    fn test_stage_change_always_emits() {
        let seen = Mutex::new(Vec::new());
        let cb = |stage: &str, current: u64, _: u64, _: &str| {
            seen.lock().unwrap().push((stage.to_string(), current));
        };
        let tp = ThrottledProgress::new(&cb);
        tp.report("scan-import", 0, 10, "");
        tp.report("scan-import", 1, 10, "");
        tp.report("hash-import", 0, 10, "");
        tp.report("hash-import", 9, 10, "");

        let seen = seen.into_inner().unwrap();
        assert_eq!(
            seen,
            vec![
                ("scan-import".to_string(), 0),
                ("hash-import".to_string(), 0),
                ("hash-import".to_string(), 9),
            ]
        );
    }
}
