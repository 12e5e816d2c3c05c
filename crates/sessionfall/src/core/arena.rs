use crate::api::types::BallId;
use crate::components::ball::{Ball, BallState};

/// Flat storage for every live ball, falling or stacked.
/// One arena with a state tag per ball, so a ball can never sit in both sets.
/// Insertion order is preserved; removal is O(n), fine for a few hundred balls.
pub struct BallArena {
    balls: Vec<Ball>,
    next_id: u32,
}

impl BallArena {
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            balls: Vec::with_capacity(capacity),
            next_id: 1,
        }
    }

    /// Generate the next unique ball ID.
    pub fn next_id(&mut self) -> BallId {
        let id = BallId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn spawn(&mut self, ball: Ball) {
        self.balls.push(ball);
    }

    /// Remove a ball by ID. Returns the removed ball if found.
    pub fn despawn(&mut self, id: BallId) -> Option<Ball> {
        let idx = self.balls.iter().position(|b| b.id == id)?;
        Some(self.balls.remove(idx))
    }

    pub fn get(&self, id: BallId) -> Option<&Ball> {
        self.balls.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: BallId) -> Option<&mut Ball> {
        self.balls.iter_mut().find(|b| b.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ball> {
        self.balls.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Ball> {
        self.balls.iter_mut()
    }

    pub fn falling(&self) -> impl Iterator<Item = &Ball> {
        self.balls.iter().filter(|b| b.state == BallState::Falling)
    }

    pub fn stacked(&self) -> impl Iterator<Item = &Ball> {
        self.balls.iter().filter(|b| b.state == BallState::Stacked)
    }

    /// Stacked balls resting in `column`.
    pub fn stacked_in_column(&self, column: usize) -> impl Iterator<Item = &Ball> {
        self.stacked().filter(move |b| b.column == column)
    }

    /// First ball for a device in the given state.
    pub fn find_by_device(&self, device_id: &str, state: BallState) -> Option<BallId> {
        self.balls
            .iter()
            .find(|b| b.state == state && b.device_id == device_id)
            .map(|b| b.id)
    }

    /// First ball for a device: stacked balls are searched before falling ones.
    pub fn find_device(&self, device_id: &str) -> Option<BallId> {
        self.find_by_device(device_id, BallState::Stacked)
            .or_else(|| self.find_by_device(device_id, BallState::Falling))
    }

    pub fn count(&self, state: BallState) -> usize {
        self.balls.iter().filter(|b| b.state == state).count()
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    /// Drop every ball. IDs keep increasing so stale handles never alias.
    pub fn clear(&mut self) {
        self.balls.clear();
    }
}

impl Default for BallArena {
    fn default() -> Self {
        Self::new()
    }
}
