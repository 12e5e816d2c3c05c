//! The session visualisation engine.
//!
//! One context object owns every ball, the column ledger, the drop queue and
//! the deferred-task scheduler. All mutation goes through its public
//! operations; the host drives it with `set_data(batch, now)` and `tick(now)`.

use std::collections::HashMap;
use glam::Vec2;

use crate::api::config::EngineConfig;
use crate::api::types::{BallId, DataBatch, EngineEvent, RemovalReason};
use crate::components::ball::Ball;
use crate::components::session::{device_id_of, SessionRecord};
use crate::core::arena::BallArena;
use crate::core::scheduler::{Scheduler, TaskId};
use crate::core::time::FrameClock;
use crate::renderer::instance::RenderBuffer;
use crate::systems::drop_scheduler::{DropPlan, DropScheduler};
use crate::systems::flip::{start_image_flip, tick_flips};
use crate::systems::particles::ParticleSystem;
use crate::systems::physics::step_falling;
use crate::systems::render::build_render_buffer;
use crate::systems::rng::Rng;
use crate::systems::stacking::StackingGrid;

/// Horizontal jitter (px) for sessions stacked without a drop.
const DIRECT_JITTER: f32 = 2.0;
/// Spin given to new balls, rad/s.
const ROTATION_SPEED: (f32, f32) = (-2.0, 2.0);

/// Deferred work, run at the start of the first tick at or after its due time.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineTask {
    /// Create the falling ball for a placed drop.
    SpawnBall { device_id: String, x: f32, column: usize },
    /// Batch spacing elapsed: continue draining the drop queue.
    ResumeDropQueue,
    /// Close the initial-load window; new sessions fall from now on.
    EndInitialLoad,
}

pub struct SessionEngine {
    config: EngineConfig,
    arena: BallArena,
    grid: StackingGrid,
    drops: DropScheduler,
    tasks: Scheduler<EngineTask>,
    particles: ParticleSystem,
    rng: Rng,
    clock: FrameClock,
    /// Active sessions, deviceId -> latest metrics.
    sessions: HashMap<String, SessionRecord>,
    /// Drops placed but not yet spawned, by device.
    pending_spawns: HashMap<String, TaskId>,
    initial_load: bool,
    initial_load_task: Option<TaskId>,
    events: Vec<EngineEvent>,
    render_buffer: RenderBuffer,
    running: bool,
    destroyed: bool,
}

impl SessionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let columns = config.column_count();
        let max_balls = config.max_balls();
        log::info!(
            "engine: {}x{} viewport, {} columns, cap {} balls",
            config.width, config.height, columns, max_balls
        );
        Self {
            arena: BallArena::with_capacity(max_balls),
            grid: StackingGrid::new(columns),
            drops: DropScheduler::new(),
            tasks: Scheduler::new(),
            particles: ParticleSystem::new(config.seed),
            rng: Rng::new(config.seed),
            clock: FrameClock::new(config.max_delta_ms),
            sessions: HashMap::new(),
            pending_spawns: HashMap::new(),
            initial_load: true,
            initial_load_task: None,
            events: Vec::new(),
            render_buffer: RenderBuffer::with_capacity(max_balls),
            running: true,
            destroyed: false,
            config,
        }
    }

    // ---- Ingress ----

    /// Apply one transport batch: inserts, then deletes, then updates.
    /// Malformed entries are logged and skipped; the rest of the batch still applies.
    pub fn set_data(&mut self, batch: &DataBatch, now: f64) {
        if self.destroyed {
            log::warn!("set_data after destroy ignored");
            return;
        }
        if batch.is_empty() {
            return;
        }
        if self.initial_load && self.initial_load_task.is_none() {
            self.arm_initial_load(now);
        }

        for value in &batch.insert {
            match SessionRecord::from_tuple(value) {
                Ok(session) => self.insert_session(session),
                Err(err) => log::warn!("skipping insert {}: {}", value, err),
            }
        }
        for value in &batch.delete {
            match device_id_of(value) {
                Ok(device_id) => self.delete_session(&device_id),
                Err(err) => log::warn!("skipping delete {}: {}", value, err),
            }
        }
        for value in &batch.update {
            match SessionRecord::from_tuple(value) {
                Ok(session) => self.update_session(session),
                Err(err) => log::warn!("skipping update {}: {}", value, err),
            }
        }

        if !self.initial_load {
            self.process_drop_queue(now);
        }
    }

    fn arm_initial_load(&mut self, now: f64) {
        let due = now + self.config.initial_load_ms;
        self.initial_load_task = Some(self.tasks.schedule(due, EngineTask::EndInitialLoad));
        log::debug!("initial load window until {:.0}", due);
    }

    fn insert_session(&mut self, session: SessionRecord) {
        if self.sessions.contains_key(&session.device_id) {
            log::debug!("insert for known device {}, applying as update", session.device_id);
            self.update_session(session);
            return;
        }
        self.sessions.insert(session.device_id.clone(), session.clone());
        if self.initial_load {
            self.insert_session_directly(session);
        } else {
            self.drops.enqueue(session);
        }
    }

    fn delete_session(&mut self, device_id: &str) {
        if self.sessions.remove(device_id).is_none() {
            log::debug!("delete for unknown device {}", device_id);
        }
        if self.drops.dequeue_device(device_id) {
            return;
        }
        if let Some(task) = self.pending_spawns.remove(device_id) {
            self.tasks.cancel(task);
            return;
        }
        if let Some(id) = self.arena.find_device(device_id) {
            self.remove_and_explode(id, RemovalReason::Deleted);
        }
    }

    fn update_session(&mut self, session: SessionRecord) {
        let Some(stored) = self.sessions.get_mut(&session.device_id) else {
            log::debug!("update for unknown device {}, inserting", session.device_id);
            self.insert_session(session);
            return;
        };
        *stored = session.clone();
        self.drops.update_queued(&session);

        let Some(id) = self.arena.find_device(&session.device_id) else {
            return;
        };
        let duration = self.config.flip_duration_ms;
        if let Some(ball) = self.arena.get_mut(id) {
            let next = session.image_slot();
            ball.session = session;
            if start_image_flip(ball, next, duration) {
                self.events.push(EngineEvent::FlipStarted { id });
            }
        }
    }

    /// Stack a session straight into the shortest column, no fall.
    /// Used during initial load and when no drop position exists.
    pub fn insert_session_directly(&mut self, session: SessionRecord) {
        let column = self.grid.shortest_column();
        let center = self.config.column_center(column);
        let x = center + self.rng.range(-DIRECT_JITTER, DIRECT_JITTER);
        let id = self.spawn(session, x, column);
        if self.grid.stack_ball(&mut self.arena, id, self.config.floor()).is_some() {
            self.events.push(EngineEvent::BallLanded { id, column });
        }
    }

    /// Create a falling ball just above the canvas.
    fn spawn(&mut self, session: SessionRecord, x: f32, column: usize) -> BallId {
        let radius = self.config.ball_radius;
        let id = self.arena.next_id();
        let mut ball = Ball::new(id, session, column, radius)
            .with_pos(Vec2::new(x, -radius))
            .with_target_x(self.config.column_center(column))
            .with_rotation_speed(self.rng.range(ROTATION_SPEED.0, ROTATION_SPEED.1));
        ball.rotation = self.rng.range(0.0, std::f32::consts::TAU);
        self.arena.spawn(ball);
        self.events.push(EngineEvent::BallSpawned { id, column });
        id
    }

    fn spawn_ball(&mut self, device_id: &str, x: f32, column: usize) {
        self.pending_spawns.remove(device_id);
        let Some(session) = self.sessions.get(device_id).cloned() else {
            log::debug!("drop for {} skipped, session gone", device_id);
            return;
        };
        // The viewport may have shrunk since the drop was placed.
        let column = column.min(self.grid.column_count() - 1);
        let radius = self.config.ball_radius;
        let x = x.clamp(radius, (self.config.width - radius).max(radius));
        self.spawn(session, x, column);
    }

    // ---- Drop queue ----

    /// Drain one batch of the drop queue and schedule the next.
    /// Only one drain is active at a time: while a `ResumeDropQueue` is pending,
    /// calls are no-ops. At the ball cap the batch is skipped, never dropped.
    pub fn process_drop_queue(&mut self, now: f64) {
        if self.drops.is_processing() || self.drops.queue_len() == 0 {
            return;
        }
        self.drops.set_processing(true);

        let cap = self.config.max_balls();
        let room = cap.saturating_sub(self.arena.len() + self.pending_spawns.len());
        if room == 0 {
            log::debug!("ball cap {} reached, {} sessions waiting", cap, self.drops.queue_len());
        } else {
            let plans = self.drops.plan_batch(&self.config, &self.grid, &mut self.rng, now, room);
            for plan in plans {
                match plan {
                    DropPlan::Scheduled { session, x, column, at } => {
                        let device_id = session.device_id;
                        let task = self.tasks.schedule(
                            at,
                            EngineTask::SpawnBall { device_id: device_id.clone(), x, column },
                        );
                        self.pending_spawns.insert(device_id, task);
                    }
                    DropPlan::Direct(session) => self.insert_session_directly(session),
                }
            }
        }

        if self.drops.queue_len() > 0 {
            let pause = DropScheduler::batch_pause(&mut self.rng);
            self.tasks.schedule(now + pause, EngineTask::ResumeDropQueue);
        } else {
            self.drops.set_processing(false);
        }
    }

    fn run_task(&mut self, task: EngineTask, now: f64) {
        match task {
            EngineTask::SpawnBall { device_id, x, column } => self.spawn_ball(&device_id, x, column),
            EngineTask::ResumeDropQueue => {
                self.drops.set_processing(false);
                self.process_drop_queue(now);
            }
            EngineTask::EndInitialLoad => {
                self.initial_load = false;
                log::info!("initial load done, {} sessions stacked", self.sessions.len());
                self.process_drop_queue(now);
            }
        }
    }

    // ---- Simulation ----

    /// One simulation step at host time `now` (ms): due tasks, falling balls,
    /// flips, border check, particles, then the render buffer.
    pub fn tick(&mut self, now: f64) {
        if !self.running || self.destroyed {
            return;
        }
        let dt = self.clock.advance(now);

        for (_, task) in self.tasks.drain_due(now) {
            self.run_task(task, now);
        }

        for (id, column) in step_falling(&mut self.arena, &mut self.grid, &self.config, dt) {
            self.events.push(EngineEvent::BallLanded { id, column });
        }
        tick_flips(&mut self.arena, dt);
        self.check_border();
        self.particles.tick(dt);

        build_render_buffer(&self.arena, &self.particles, &self.config, &mut self.render_buffer);
        debug_assert!(self.grid.is_consistent(&self.arena));
    }

    /// Explode every stacked ball whose top edge has reached the border line.
    /// Topmost first: a removal only shifts the balls above it, which are
    /// already gone, so each ball explodes where it crossed.
    fn check_border(&mut self) {
        let border = self.config.border_y();
        let mut over: Vec<(BallId, f32)> = StackingGrid::overflowing(&self.arena, border)
            .into_iter()
            .filter_map(|id| self.arena.get(id).map(|b| (id, b.pos.y)))
            .collect();
        over.sort_by(|a, b| a.1.total_cmp(&b.1));

        for (id, _) in over {
            let still_over = self
                .arena
                .get(id)
                .map_or(false, |b| b.is_stacked() && b.top() <= border);
            if still_over {
                self.remove_and_explode(id, RemovalReason::BorderOverflow);
            }
        }
    }

    /// Remove a ball with an explosion at its position. Stacked balls also
    /// release their ledger slot and the balls above them drop into the gap.
    pub fn remove_and_explode(&mut self, id: BallId, reason: RemovalReason) -> bool {
        let Some(ball) = self.arena.despawn(id) else {
            return false;
        };
        if ball.is_stacked() {
            self.grid.remove_stacked(&mut self.arena, &ball);
        }
        self.particles
            .create_explosion_particles(ball.pos, self.config.explosion_particles);
        log::debug!("ball {} ({}) exploded: {:?}", id.0, ball.device_id, reason);
        self.events.push(EngineEvent::Exploded {
            id,
            x: ball.pos.x,
            y: ball.pos.y,
            reason,
        });
        true
    }

    // ---- Lifecycle ----

    /// Halt ticking and cancel every pending task. Drops that were placed but
    /// not spawned go back to the queue so `start` picks them up again.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.tasks.clear();
        self.drops.set_processing(false);

        let mut pending: Vec<(TaskId, String)> =
            self.pending_spawns.drain().map(|(device, task)| (task, device)).collect();
        pending.sort();
        for (_, device_id) in pending {
            if let Some(session) = self.sessions.get(&device_id) {
                self.drops.enqueue(session.clone());
            }
        }

        if self.initial_load {
            self.initial_load_task = None;
        }
        self.clock.reset();
        log::info!("engine stopped, {} sessions queued", self.drops.queue_len());
    }

    pub fn start(&mut self, now: f64) {
        if self.destroyed || self.running {
            return;
        }
        self.running = true;
        self.clock.reset();
        if self.initial_load {
            if self.initial_load_task.is_none() && !self.sessions.is_empty() {
                self.arm_initial_load(now);
            }
        } else {
            self.process_drop_queue(now);
        }
        log::info!("engine started");
    }

    /// Clear every transient state and re-open the initial-load window.
    /// Calling it twice is the same as calling it once.
    pub fn reset(&mut self) {
        self.arena.clear();
        self.grid = StackingGrid::new(self.config.column_count());
        self.drops.clear();
        self.tasks.clear();
        self.particles = ParticleSystem::new(self.config.seed);
        self.rng = Rng::new(self.config.seed);
        self.clock.reset();
        self.sessions.clear();
        self.pending_spawns.clear();
        self.initial_load = true;
        self.initial_load_task = None;
        self.events.clear();
        self.render_buffer.clear();
    }

    /// Release everything. Later calls are ignored.
    pub fn destroy(&mut self) {
        self.reset();
        self.running = false;
        self.destroyed = true;
        log::info!("engine destroyed");
    }

    /// Adopt a new viewport: recompute geometry and the ball cap, re-centre every
    /// ball on its (possibly folded) column and restack from scratch.
    pub fn resize(&mut self, width: f32, height: f32) {
        let resized = self.config.clone().with_viewport(width, height);
        if let Err(err) = resized.validate() {
            log::warn!("resize ignored: {}", err);
            return;
        }
        self.config = resized;

        let columns = self.config.column_count();
        let config = &self.config;
        for ball in self.arena.iter_mut() {
            ball.column = ball.column.min(columns - 1);
            ball.target_x = config.column_center(ball.column);
            if ball.is_stacked() {
                ball.pos.x = ball.target_x;
            }
        }
        self.grid.restack_all(&mut self.arena, columns, self.config.floor());
        self.check_border();
        build_render_buffer(&self.arena, &self.particles, &self.config, &mut self.render_buffer);
        log::info!(
            "resized to {}x{}: {} columns, cap {}",
            width, height, columns, self.config.max_balls()
        );
    }

    // ---- Accessors ----

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn arena(&self) -> &BallArena {
        &self.arena
    }

    pub fn column_heights(&self) -> &[usize] {
        self.grid.heights()
    }

    pub fn active_sessions(&self) -> &HashMap<String, SessionRecord> {
        &self.sessions
    }

    pub fn is_active(&self, device_id: &str) -> bool {
        self.sessions.contains_key(device_id)
    }

    pub fn is_initial_load(&self) -> bool {
        self.initial_load
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn queue_len(&self) -> usize {
        self.drops.queue_len()
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn explosion_count(&self) -> u64 {
        self.particles.explosion_count()
    }

    /// Whether the column ledger matches the stacked balls.
    pub fn is_consistent(&self) -> bool {
        self.grid.is_consistent(&self.arena)
    }

    pub fn render_buffer(&self) -> &RenderBuffer {
        &self.render_buffer
    }

    /// Take the events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}
