use log::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Compteurs de la boucle, lisibles depuis le thread de contrôle.
#[derive(Debug, Default)]
pub struct LoopStats {
    iterations: AtomicU64,
    frames_presented: AtomicU64,
    swaps: AtomicU64,
    frame_errors: AtomicU64,
}

impl LoopStats {
    pub(crate) fn record_iteration(&self) -> u64 {
        self.iterations.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn record_presented(&self, swapped: bool) -> u64 {
        if swapped {
            self.swaps.fetch_add(1, Ordering::AcqRel);
        }
        self.frames_presented.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn record_error(&self) {
        self.frame_errors.fetch_add(1, Ordering::AcqRel);
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Acquire)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented.load(Ordering::Acquire)
    }

    pub fn swaps(&self) -> u64 {
        self.swaps.load(Ordering::Acquire)
    }

    pub fn frame_errors(&self) -> u64 {
        self.frame_errors.load(Ordering::Acquire)
    }
}

/// FPS lissé (EMA) avec log périodique.
pub(crate) struct FpsMeter {
    fps_avg: f32,
    last_log: Instant,
    log_interval: Duration,
}

impl FpsMeter {
    const ALPHA: f32 = 0.15;

    pub(crate) fn new(log_interval: Duration) -> Self {
        Self {
            fps_avg: 0.0,
            last_log: Instant::now(),
            log_interval,
        }
    }

    pub(crate) fn tick(&mut self, delta: f32, stats: &LoopStats) {
        let fps = if delta > 0.0 { 1.0 / delta } else { 0.0 };
        self.fps_avg = Self::ALPHA * fps + (1.0 - Self::ALPHA) * self.fps_avg;

        if self.last_log.elapsed() >= self.log_interval {
            info!(
                "📈 FPS: {:.1} | frames: {} | swaps: {} | errors: {}",
                self.fps_avg,
                stats.frames_presented(),
                stats.swaps(),
                stats.frame_errors()
            );
            self.last_log = Instant::now();
        }
    }

    #[cfg(test)]
    fn average(&self) -> f32 {
        self.fps_avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = LoopStats::default();
        assert_eq!(stats.record_iteration(), 1);
        assert_eq!(stats.record_presented(true), 1);
        assert_eq!(stats.record_presented(false), 2);
        stats.record_error();
        assert_eq!(stats.swaps(), 1);
        assert_eq!(stats.frames_presented(), 2);
        assert_eq!(stats.frame_errors(), 1);
    }

    #[test]
    fn fps_meter_converges_to_steady_rate() {
        let stats = LoopStats::default();
        let mut meter = FpsMeter::new(Duration::from_secs(3600));
        for _ in 0..200 {
            meter.tick(1.0 / 60.0, &stats);
        }
        assert!((meter.average() - 60.0).abs() < 0.5);
    }
}
