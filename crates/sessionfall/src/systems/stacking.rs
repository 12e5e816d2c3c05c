//! Column towers: the per-column height ledger and ball placement inside a column.
//!
//! Invariant: after every public operation, `heights[c]` equals the number of
//! stacked balls whose column is `c`, and consecutive balls in a column touch
//! (centres exactly one diameter apart, no gaps, no overlap).

use crate::api::types::BallId;
use crate::components::ball::{Ball, BallState};
use crate::core::arena::BallArena;

pub struct StackingGrid {
    heights: Vec<usize>,
}

impl StackingGrid {
    pub fn new(columns: usize) -> Self {
        Self {
            heights: vec![0; columns.max(1)],
        }
    }

    pub fn column_count(&self) -> usize {
        self.heights.len()
    }

    pub fn height(&self, column: usize) -> usize {
        self.heights.get(column).copied().unwrap_or(0)
    }

    pub fn heights(&self) -> &[usize] {
        &self.heights
    }

    /// Lowest column; ties go to the leftmost.
    pub fn shortest_column(&self) -> usize {
        self.heights
            .iter()
            .enumerate()
            .min_by_key(|(idx, h)| (**h, *idx))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    /// Topmost stacked ball in a column (smallest y).
    pub fn top_ball<'a>(arena: &'a BallArena, column: usize) -> Option<&'a Ball> {
        arena
            .stacked_in_column(column)
            .min_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
    }

    /// Y a falling ball's bottom edge must reach to land in `column`:
    /// the top edge of the column's tower, or the floor.
    pub fn landing_y(arena: &BallArena, column: usize, floor: f32) -> f32 {
        Self::top_ball(arena, column).map(|b| b.top()).unwrap_or(floor)
    }

    /// Rest a ball on top of its column and hand it to the stacked set.
    /// Returns the resting y, or `None` if the ball is unknown or already stacked.
    pub fn stack_ball(&mut self, arena: &mut BallArena, id: BallId, floor: f32) -> Option<f32> {
        let (column, radius) = match arena.get(id) {
            Some(b) if b.state == BallState::Falling => (b.column, b.radius),
            _ => return None,
        };
        let column = column.min(self.heights.len() - 1);
        let rest_y = match Self::top_ball(arena, column) {
            Some(top) => top.pos.y - top.radius - radius,
            None => floor - radius,
        };

        let ball = arena.get_mut(id)?;
        ball.column = column;
        ball.pos.y = rest_y;
        ball.vel = glam::Vec2::ZERO;
        ball.state = BallState::Stacked;
        self.heights[column] += 1;
        Some(rest_y)
    }

    /// Ledger and gravity-fill bookkeeping for a stacked ball that has just
    /// left the arena: every ball above it in the same column drops by one diameter.
    pub fn remove_stacked(&mut self, arena: &mut BallArena, removed: &Ball) {
        if let Some(h) = self.heights.get_mut(removed.column) {
            *h = h.saturating_sub(1);
        }
        let shift = removed.radius * 2.0;
        for ball in arena.iter_mut() {
            if ball.state == BallState::Stacked
                && ball.column == removed.column
                && ball.pos.y < removed.pos.y
            {
                ball.pos.y += shift;
            }
        }
    }

    /// Recompute every column from scratch: bottom-first order is kept and each
    /// ball is re-seated at `floor - r - 2r * index`. Used after a resize; the
    /// column count may change, balls beyond the last column move into it.
    pub fn restack_all(&mut self, arena: &mut BallArena, columns: usize, floor: f32) {
        self.heights = vec![0; columns.max(1)];
        let last = self.heights.len() - 1;

        let mut order: Vec<(usize, f32, BallId)> = arena
            .stacked()
            .map(|b| (b.column.min(last), b.pos.y, b.id))
            .collect();
        // Group by column, bottom (largest y) first, stable on id.
        order.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(b.1.total_cmp(&a.1))
                .then(a.2.cmp(&b.2))
        });

        for (column, _, id) in order {
            let index = self.heights[column];
            if let Some(ball) = arena.get_mut(id) {
                ball.column = column;
                ball.pos.y = floor - ball.radius - 2.0 * ball.radius * index as f32;
                self.heights[column] += 1;
            }
        }
    }

    /// Stacked balls whose top edge has reached the border line.
    pub fn overflowing(arena: &BallArena, border_y: f32) -> Vec<BallId> {
        arena
            .stacked()
            .filter(|b| b.top() <= border_y)
            .map(|b| b.id)
            .collect()
    }

    /// Whether the ledger matches the arena. Cheap enough for debug assertions.
    pub fn is_consistent(&self, arena: &BallArena) -> bool {
        let mut counted = vec![0usize; self.heights.len()];
        for ball in arena.stacked() {
            match counted.get_mut(ball.column) {
                Some(c) => *c += 1,
                None => return false,
            }
        }
        counted == self.heights
    }

    pub fn clear(&mut self) {
        self.heights.iter_mut().for_each(|h| *h = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::session::SessionRecord;
    use glam::Vec2;

    const FLOOR: f32 = 500.0;
    const R: f32 = 10.0;

    fn falling(arena: &mut BallArena, column: usize) -> BallId {
        let id = arena.next_id();
        arena.spawn(
            Ball::new(id, SessionRecord::new(format!("d{}", id.0)), column, R)
                .with_pos(Vec2::new(column as f32 * 20.0 + 10.0, 0.0)),
        );
        id
    }

    fn column_ys(arena: &BallArena, column: usize) -> Vec<f32> {
        let mut ys: Vec<f32> = arena.stacked_in_column(column).map(|b| b.pos.y).collect();
        ys.sort_by(|a, b| b.total_cmp(a));
        ys
    }

    #[test]
    fn first_ball_rests_on_floor_and_next_touches_it() {
        let mut arena = BallArena::new();
        let mut grid = StackingGrid::new(3);
        let a = falling(&mut arena, 1);
        let b = falling(&mut arena, 1);

        assert_eq!(grid.stack_ball(&mut arena, a, FLOOR), Some(FLOOR - R));
        assert_eq!(grid.stack_ball(&mut arena, b, FLOOR), Some(FLOOR - 3.0 * R));
        assert_eq!(grid.height(1), 2);
        assert!(grid.is_consistent(&arena));
        assert_eq!(StackingGrid::landing_y(&arena, 1, FLOOR), FLOOR - 4.0 * R);
        assert_eq!(StackingGrid::landing_y(&arena, 0, FLOOR), FLOOR);
    }

    #[test]
    fn stacking_twice_is_rejected() {
        let mut arena = BallArena::new();
        let mut grid = StackingGrid::new(2);
        let a = falling(&mut arena, 0);
        assert!(grid.stack_ball(&mut arena, a, FLOOR).is_some());
        assert!(grid.stack_ball(&mut arena, a, FLOOR).is_none());
        assert_eq!(grid.height(0), 1);
    }

    #[test]
    fn removal_gravity_fills_the_column() {
        let mut arena = BallArena::new();
        let mut grid = StackingGrid::new(1);
        let ids: Vec<_> = (0..4).map(|_| falling(&mut arena, 0)).collect();
        for id in &ids {
            grid.stack_ball(&mut arena, *id, FLOOR);
        }

        let removed = arena.despawn(ids[1]).unwrap();
        grid.remove_stacked(&mut arena, &removed);

        assert_eq!(grid.height(0), 3);
        assert_eq!(column_ys(&arena, 0), vec![FLOOR - R, FLOOR - 3.0 * R, FLOOR - 5.0 * R]);
        assert!(grid.is_consistent(&arena));
    }

    #[test]
    fn restack_removes_drift_and_folds_columns() {
        let mut arena = BallArena::new();
        let mut grid = StackingGrid::new(4);
        for column in [0, 0, 3, 3, 3] {
            let id = falling(&mut arena, column);
            grid.stack_ball(&mut arena, id, FLOOR);
        }
        for ball in arena.iter_mut() {
            ball.pos.y -= 3.7;
        }

        grid.restack_all(&mut arena, 2, 400.0);

        assert_eq!(grid.heights(), &[2, 3]);
        assert_eq!(column_ys(&arena, 1), vec![390.0, 370.0, 350.0]);
        assert!(grid.is_consistent(&arena));
    }

    #[test]
    fn overflow_detects_top_edge_crossing() {
        let mut arena = BallArena::new();
        let mut grid = StackingGrid::new(1);
        let ids: Vec<_> = (0..3).map(|_| falling(&mut arena, 0)).collect();
        for id in &ids {
            grid.stack_ball(&mut arena, *id, 60.0);
        }
        // Tops at 40, 20, 0.
        assert_eq!(StackingGrid::overflowing(&arena, 10.0), vec![ids[2]]);
        assert_eq!(StackingGrid::overflowing(&arena, 20.0), vec![ids[1], ids[2]]);
    }

    #[test]
    fn shortest_column_prefers_leftmost() {
        let mut arena = BallArena::new();
        let mut grid = StackingGrid::new(3);
        let id = falling(&mut arena, 0);
        grid.stack_ball(&mut arena, id, FLOOR);
        assert_eq!(grid.shortest_column(), 1);
    }
}
