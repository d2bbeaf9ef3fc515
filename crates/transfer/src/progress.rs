use std::time::{Duration, Instant};

/// Default minimum time between two forwarded UI updates.
const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Default minimum advance (in percent) that is always forwarded.
const DEFAULT_MIN_STEP: f64 = 1.0;

/// Maps one file's progress and its position in the batch to an overall
/// percentage.
///
/// `overall = (file_index / total_files) * 100 + file_percent / total_files`,
/// computed as a single division so the batch ends on exactly 100.
/// Inputs outside their ranges are clamped; an empty batch reports 0.
pub fn combine(file_index: usize, total_files: usize, file_percent: f64) -> f64 {
    if total_files == 0 {
        return 0.0;
    }
    let index = file_index.min(total_files) as f64;
    let percent = if file_percent.is_nan() {
        0.0
    } else {
        file_percent.clamp(0.0, 100.0)
    };
    ((index * 100.0 + percent) / total_files as f64).clamp(0.0, 100.0)
}

/// Batch-level progress with a high-water mark.
///
/// A file that restarts after a failed attempt reports 0% again; the
/// aggregate keeps the furthest value reached so the bar never moves back.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    total_files: usize,
    high_water: f64,
}

impl ProgressAggregator {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            high_water: 0.0,
        }
    }

    /// Records progress for the active file and returns the overall value.
    pub fn update(&mut self, file_index: usize, file_percent: f64) -> f64 {
        let overall = combine(file_index, self.total_files, file_percent);
        if overall > self.high_water {
            self.high_water = overall;
        }
        self.high_water
    }

    /// Marks `file_index` as fully transferred.
    pub fn file_completed(&mut self, file_index: usize) -> f64 {
        self.update(file_index, 100.0)
    }
}

/// Decides which progress updates are worth redrawing.
///
/// An update passes when it moved at least `min_step` percent, when
/// `min_interval` elapsed since the last forwarded one, or when it is the
/// first to reach 100.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    min_step: f64,
    min_interval: Duration,
    last: Option<(f64, Instant)>,
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl ProgressThrottle {
    /// Creates a throttle.
    ///
    /// - `min_step`: forced-forward advance in percent (default 1.0).
    /// - `min_interval`: time-based forward interval (default 500 ms).
    pub fn new(min_step: Option<f64>, min_interval: Option<Duration>) -> Self {
        Self {
            min_step: min_step.unwrap_or(DEFAULT_MIN_STEP),
            min_interval: min_interval.unwrap_or(DEFAULT_INTERVAL),
            last: None,
        }
    }

    /// Returns `true` if `percent` should be shown now.
    pub fn should_emit(&mut self, percent: f64) -> bool {
        self.should_emit_at(percent, Instant::now())
    }

    fn should_emit_at(&mut self, percent: f64, now: Instant) -> bool {
        let emit = match self.last {
            None => true,
            Some((last_percent, last_at)) => {
                (percent >= 100.0 && last_percent < 100.0)
                    || percent - last_percent >= self.min_step
                    || (percent != last_percent
                        && now.duration_since(last_at) >= self.min_interval)
            }
        };
        if emit {
            self.last = Some((percent, now));
        }
        emit
    }

    /// Forgets the last forwarded update (new batch).
    pub fn reset(&mut self) {
        self.last = None;
    }
}
