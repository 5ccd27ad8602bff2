/// Receives fractional progress (0.0..=1.0) from one pipeline run.
///
/// Called from whichever thread drives the pipeline; implementations should
/// return quickly.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, fraction: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn notify(&self, fraction: f64) {
        self(fraction)
    }
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn notify(&self, _fraction: f64) {}
}

/// Per-run progress state in front of a sink.
///
/// Values are clamped so the reported trace never decreases, and the terminal
/// `1.0` is delivered exactly once: by [`ProgressTracker::finish`], by a report
/// of `>= 1.0`, or on drop if neither happened.
pub struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    current: f64,
    finished: bool,
}

impl<'a> ProgressTracker<'a> {
    pub fn start(sink: &'a dyn ProgressSink) -> Self {
        sink.notify(0.0);
        Self {
            sink,
            current: 0.0,
            finished: false,
        }
    }

    pub fn report(&mut self, fraction: f64) {
        if self.finished {
            return;
        }
        if fraction >= 1.0 {
            self.finish();
            return;
        }
        if fraction.is_nan() || fraction <= self.current {
            return;
        }
        self.current = fraction;
        self.sink.notify(fraction);
    }

    /// Maps `done / total` of a phase onto `[start, start + span]`.
    pub fn report_phase(&mut self, start: f64, span: f64, done: usize, total: usize) {
        let ratio = done as f64 / total.max(1) as f64;
        self.report(start + span * ratio.min(1.0));
    }

    #[cfg(test)]
    fn current(&self) -> f64 {
        self.current
    }

    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.current = 1.0;
        self.sink.notify(1.0);
    }
}

impl Drop for ProgressTracker<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}
