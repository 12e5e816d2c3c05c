//! Drop scheduling: turns bursts of queued sessions into drops that are
//! separated in space and time, so two balls never appear on top of each other.

use std::collections::VecDeque;
use crate::api::config::EngineConfig;
use crate::components::session::SessionRecord;
use super::rng::Rng;
use super::stacking::StackingGrid;

/// Horizontal offsets tried in each column, as fractions of the column width.
pub const CANDIDATE_OFFSETS: [f32; 5] = [0.0, -0.225, 0.225, -0.45, 0.45];

/// Below this distance ratio a conflicting drop rejects the candidate outright.
const REJECT_RATIO: f32 = 0.3;
/// Fallback picks among this many best candidates.
const FALLBACK_POOL: usize = 5;
/// Fallback horizontal jitter in px.
const FALLBACK_JITTER: f32 = 5.0;
const FALLBACK_DELAY_MS: (f32, f32) = (200.0, 700.0);
const STAGGER_MS: (f32, f32) = (50.0, 150.0);
const BATCH_PAUSE_MS: (f32, f32) = (200.0, 500.0);

/// A possible drop x, ordered by the height of its column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropCandidate {
    pub x: f32,
    pub column: usize,
    /// Column stack height; lower is tried first.
    pub priority: usize,
}

/// A drop that has been placed, remembered for collision avoidance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecentDrop {
    pub x: f32,
    /// When the ball appears (may be in the future).
    pub timestamp: f64,
    pub column: usize,
}

/// Where and how late a drop should happen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropPlacement {
    pub x: f32,
    pub column: usize,
    /// Extra delay in ms before the ball is created.
    pub delay: f64,
}

/// Outcome of planning one queued session.
#[derive(Debug, Clone, PartialEq)]
pub enum DropPlan {
    /// Create a falling ball at `at` (absolute ms).
    Scheduled {
        session: SessionRecord,
        x: f32,
        column: usize,
        at: f64,
    },
    /// No placement possible; stack directly into the shortest column.
    Direct(SessionRecord),
}

/// FIFO of sessions awaiting a drop, plus the recent-drop history.
#[derive(Debug, Default)]
pub struct DropScheduler {
    queue: VecDeque<SessionRecord>,
    recent: Vec<RecentDrop>,
    processing: bool,
}

impl DropScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, session: SessionRecord) {
        self.queue.push_back(session);
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Drop a queued (not yet placed) session. Returns true if one was removed.
    pub fn dequeue_device(&mut self, device_id: &str) -> bool {
        match self.queue.iter().position(|s| s.device_id == device_id) {
            Some(idx) => {
                self.queue.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Refresh a queued session's metrics in place.
    pub fn update_queued(&mut self, session: &SessionRecord) -> bool {
        match self.queue.iter_mut().find(|s| s.device_id == session.device_id) {
            Some(queued) => {
                *queued = session.clone();
                true
            }
            None => false,
        }
    }

    /// Whether a drain is in progress (guards against re-entrant processing).
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn set_processing(&mut self, processing: bool) {
        self.processing = processing;
    }

    pub fn recent_drops(&self) -> &[RecentDrop] {
        &self.recent
    }

    pub fn record_drop(&mut self, x: f32, column: usize, timestamp: f64) {
        self.recent.push(RecentDrop { x, timestamp, column });
    }

    /// Forget drops older than the history window.
    pub fn prune(&mut self, now: f64, window_ms: f64) {
        self.recent.retain(|d| now - d.timestamp < window_ms);
    }

    /// Five candidates per column (centre and two offsets each side), kept inside
    /// the canvas, sorted by column height ascending. Equal heights keep column order.
    pub fn generate_global_drop_positions(config: &EngineConfig, grid: &StackingGrid) -> Vec<DropCandidate> {
        let width = config.column_width();
        let radius = config.ball_radius;
        let mut candidates = Vec::with_capacity(grid.column_count() * CANDIDATE_OFFSETS.len());
        for column in 0..grid.column_count() {
            let center = config.column_center(column);
            for offset in CANDIDATE_OFFSETS {
                let x = center + offset * width;
                if x - radius < 0.0 || x + radius > config.width {
                    continue;
                }
                candidates.push(DropCandidate {
                    x,
                    column,
                    priority: grid.height(column),
                });
            }
        }
        candidates.sort_by_key(|c| c.priority);
        candidates
    }

    /// Pick the first candidate that does not collide with a recent drop.
    ///
    /// A recent drop conflicts when it is within `drop_spacing` horizontally and
    /// younger than `conflict_window_ms`. Too close (ratio < 0.3) rejects the
    /// candidate; otherwise it is accepted with a proportional extra delay.
    /// If every candidate is rejected, a random top candidate with jitter and a
    /// 200-700 ms delay is used so the queue always makes progress.
    /// Returns `None` only when there is no candidate at all.
    pub fn find_best_drop_position(
        &mut self,
        config: &EngineConfig,
        grid: &StackingGrid,
        rng: &mut Rng,
        now: f64,
    ) -> Option<DropPlacement> {
        self.prune(now, config.recent_drop_window_ms);

        let mut candidates = Self::generate_global_drop_positions(config, grid);
        if candidates.is_empty() {
            return None;
        }
        shuffle_ties(&mut candidates, rng);

        let spacing = config.drop_spacing;
        'candidates: for candidate in &candidates {
            let mut delay = 0.0f64;
            for drop in &self.recent {
                let distance = (candidate.x - drop.x).abs();
                if distance >= spacing {
                    continue;
                }
                let elapsed = now - drop.timestamp;
                if elapsed > config.conflict_window_ms {
                    continue;
                }
                let ratio = distance / spacing;
                if ratio < REJECT_RATIO {
                    continue 'candidates;
                }
                let extra = ((config.conflict_window_ms - elapsed) * (1.0 - ratio as f64))
                    .min(config.max_extra_delay_ms);
                delay = delay.max(extra);
            }
            log::debug!(
                "drop placed at x={:.1} column={} delay={:.0}ms",
                candidate.x, candidate.column, delay
            );
            return Some(DropPlacement {
                x: candidate.x,
                column: candidate.column,
                delay,
            });
        }

        let pool = candidates.len().min(FALLBACK_POOL);
        let pick = candidates[rng.next_int(pool as u32) as usize];
        let jitter = rng.range(-FALLBACK_JITTER, FALLBACK_JITTER);
        let x = (pick.x + jitter).clamp(config.ball_radius, (config.width - config.ball_radius).max(config.ball_radius));
        let delay = rng.range(FALLBACK_DELAY_MS.0, FALLBACK_DELAY_MS.1) as f64;
        log::debug!("no clear drop position, fallback x={:.1} delay={:.0}ms", x, delay);
        Some(DropPlacement {
            x,
            column: pick.column,
            delay,
        })
    }

    /// Pop up to `max_simultaneous_drop` sessions (and never more than `limit`)
    /// and place each one. Every placement is recorded at its scheduled time, so later entries in
    /// the same batch avoid it; entries are staggered by 50-150 ms per index.
    pub fn plan_batch(
        &mut self,
        config: &EngineConfig,
        grid: &StackingGrid,
        rng: &mut Rng,
        now: f64,
        limit: usize,
    ) -> Vec<DropPlan> {
        let count = self
            .queue
            .len()
            .min(config.max_simultaneous_drop.max(1))
            .min(limit);
        let mut plans = Vec::with_capacity(count);
        for index in 0..count {
            let Some(session) = self.queue.pop_front() else {
                break;
            };
            match self.find_best_drop_position(config, grid, rng, now) {
                Some(placement) => {
                    let stagger = index as f64 * rng.range(STAGGER_MS.0, STAGGER_MS.1) as f64;
                    let at = now + placement.delay + stagger;
                    self.record_drop(placement.x, placement.column, at);
                    plans.push(DropPlan::Scheduled {
                        session,
                        x: placement.x,
                        column: placement.column,
                        at,
                    });
                }
                None => {
                    log::warn!("no drop position for {}, stacking directly", session.device_id);
                    plans.push(DropPlan::Direct(session));
                }
            }
        }
        plans
    }

    /// Randomised pause before the next batch.
    pub fn batch_pause(rng: &mut Rng) -> f64 {
        rng.range(BATCH_PAUSE_MS.0, BATCH_PAUSE_MS.1) as f64
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.recent.clear();
        self.processing = false;
    }
}

/// Shuffle candidates within runs of equal priority, keeping the ascending order
/// between runs, so equally tall columns share the load.
fn shuffle_ties(candidates: &mut [DropCandidate], rng: &mut Rng) {
    let mut start = 0;
    while start < candidates.len() {
        let priority = candidates[start].priority;
        let end = candidates[start..]
            .iter()
            .position(|c| c.priority != priority)
            .map(|n| start + n)
            .unwrap_or(candidates.len());
        let run = &mut candidates[start..end];
        for i in (1..run.len()).rev() {
            let j = rng.next_int(i as u32 + 1) as usize;
            run.swap(i, j);
        }
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arena::BallArena;
    use crate::components::ball::Ball;

    fn config() -> EngineConfig {
        // 10 columns of 60px, radius 12.
        EngineConfig {
            column_count: Some(10),
            ..EngineConfig::default().with_viewport(600.0, 800.0)
        }
    }

    #[test]
    fn candidates_are_in_bounds_and_sorted() {
        let config = config();
        let mut arena = BallArena::new();
        let mut grid = StackingGrid::new(10);
        let id = arena.next_id();
        arena.spawn(Ball::new(id, SessionRecord::new("a"), 0, 12.0));
        grid.stack_ball(&mut arena, id, config.floor());

        let candidates = DropScheduler::generate_global_drop_positions(&config, &grid);
        // Column 0 loses its -0.45 offset (x = 3 < radius).
        assert_eq!(candidates.len(), 10 * 5 - 2);
        assert!(candidates.iter().all(|c| c.x >= 12.0 && c.x <= 588.0));
        assert!(candidates.windows(2).all(|w| w[0].priority <= w[1].priority));
        assert_eq!(candidates.last().unwrap().column, 0);
    }

    #[test]
    fn close_drops_are_separated_in_space_or_time() {
        let config = config();
        let grid = StackingGrid::new(10);
        let mut rng = Rng::new(3);
        let mut sched = DropScheduler::new();

        let first = sched.find_best_drop_position(&config, &grid, &mut rng, 1000.0).unwrap();
        sched.record_drop(first.x, first.column, 1000.0 + first.delay);
        // Queued in the same instant: must be displaced, delayed, or both.
        let second = sched.find_best_drop_position(&config, &grid, &mut rng, 1000.0).unwrap();

        let apart = (second.x - first.x).abs();
        let t1 = 1000.0 + first.delay;
        let t2 = 1000.0 + second.delay;
        assert!(
            apart >= config.drop_spacing * REJECT_RATIO && (apart >= config.drop_spacing || t2 > t1),
            "overlapping drops: {:?} {:?}",
            first,
            second
        );
    }

    #[test]
    fn near_conflict_adds_proportional_delay() {
        let config = EngineConfig {
            column_count: Some(1),
            ..EngineConfig::default().with_viewport(60.0, 800.0)
        };
        let grid = StackingGrid::new(1);
        let mut rng = Rng::new(1);
        let mut sched = DropScheduler::new();
        // Candidates: 30, 16.5, 43.5 (the 0.45 offsets fall outside). A drop at
        // x=30 rejects 30; 16.5 and 43.5 are 13.5px away: ratio 0.386 accepted.
        sched.record_drop(30.0, 0, 1000.0);
        let placed = sched.find_best_drop_position(&config, &grid, &mut rng, 1200.0).unwrap();
        assert!((placed.x - 30.0).abs() > 13.0);
        let expected = (800.0 - 200.0) * (1.0 - 13.5 / 35.0);
        assert!((placed.delay - expected).abs() < 0.5, "delay {}", placed.delay);
    }

    #[test]
    fn stale_drops_are_ignored() {
        let config = EngineConfig {
            column_count: Some(1),
            ..EngineConfig::default().with_viewport(60.0, 800.0)
        };
        let grid = StackingGrid::new(1);
        let mut rng = Rng::new(1);
        let mut sched = DropScheduler::new();
        sched.record_drop(30.0, 0, 0.0);
        sched.record_drop(16.5, 0, 0.0);
        sched.record_drop(43.5, 0, 0.0);
        let placed = sched.find_best_drop_position(&config, &grid, &mut rng, 900.0).unwrap();
        assert_eq!(placed.delay, 0.0);

        // And history past the window is pruned.
        sched.prune(2500.0, config.recent_drop_window_ms);
        assert!(sched.recent_drops().is_empty());
    }

    #[test]
    fn exhausted_candidates_fall_back() {
        let config = EngineConfig {
            column_count: Some(1),
            ..EngineConfig::default().with_viewport(60.0, 800.0)
        };
        let grid = StackingGrid::new(1);
        let mut rng = Rng::new(9);
        let mut sched = DropScheduler::new();
        for x in [30.0, 16.5, 43.5] {
            sched.record_drop(x, 0, 1000.0);
        }
        let placed = sched.find_best_drop_position(&config, &grid, &mut rng, 1000.0).unwrap();
        assert!(placed.delay >= 200.0 && placed.delay < 700.0);
        assert!(placed.x >= 12.0 && placed.x <= 48.0);
    }

    #[test]
    fn batch_is_capped_and_staggered() {
        let config = config();
        let grid = StackingGrid::new(10);
        let mut rng = Rng::new(5);
        let mut sched = DropScheduler::new();
        for i in 0..11 {
            sched.enqueue(SessionRecord::new(format!("d{}", i)));
        }

        let plans = sched.plan_batch(&config, &grid, &mut rng, 0.0, usize::MAX);
        assert_eq!(plans.len(), 8);
        assert_eq!(sched.queue_len(), 3);
        assert_eq!(sched.recent_drops().len(), 8);
        for (plan, drop) in plans.iter().zip(sched.recent_drops()) {
            match plan {
                DropPlan::Scheduled { at, x, .. } => {
                    assert_eq!(*at, drop.timestamp);
                    assert_eq!(*x, drop.x);
                }
                DropPlan::Direct(_) => panic!("expected a scheduled drop"),
            }
        }
    }

    #[test]
    fn queued_sessions_can_be_dropped_or_updated() {
        let mut sched = DropScheduler::new();
        sched.enqueue(SessionRecord::new("a"));
        sched.enqueue(SessionRecord::new("b"));
        assert!(sched.update_queued(&SessionRecord::new("b").with_lcp(10.0)));
        assert!(sched.dequeue_device("a"));
        assert!(!sched.dequeue_device("a"));
        assert_eq!(sched.queue_len(), 1);
    }

    #[test]
    fn batch_respects_external_limit() {
        let config = config();
        let grid = StackingGrid::new(10);
        let mut rng = Rng::new(5);
        let mut sched = DropScheduler::new();
        for i in 0..5 {
            sched.enqueue(SessionRecord::new(format!("d{}", i)));
        }
        assert_eq!(sched.plan_batch(&config, &grid, &mut rng, 0.0, 2).len(), 2);
        assert!(sched.plan_batch(&config, &grid, &mut rng, 0.0, 0).is_empty());
        assert_eq!(sched.queue_len(), 3);
    }
}
