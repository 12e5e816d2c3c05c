/// Frame clock driven by host wall-clock timestamps (ms).
/// Produces one clamped delta per tick so a suspended tab does not
/// fling every ball through the floor when it wakes up.
pub struct FrameClock {
    /// Largest delta handed to the simulation, in ms.
    max_dt: f32,
    /// Timestamp of the previous tick.
    last: Option<f64>,
}

impl FrameClock {
    pub fn new(max_dt: f32) -> Self {
        Self { max_dt, last: None }
    }

    /// Record `now` and return the clamped delta since the previous tick.
    /// The first tick (and any clock going backwards) yields 0.
    pub fn advance(&mut self, now: f64) -> f32 {
        let dt = match self.last {
            Some(last) if now > last => ((now - last) as f32).min(self.max_dt),
            _ => 0.0,
        };
        self.last = Some(now);
        dt
    }

    /// Forget the previous timestamp (after a stop or reset).
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_is_zero() {
        let mut clock = FrameClock::new(33.0);
        assert_eq!(clock.advance(1000.0), 0.0);
    }

    #[test]
    fn regular_delta() {
        let mut clock = FrameClock::new(33.0);
        clock.advance(1000.0);
        assert_eq!(clock.advance(1016.0), 16.0);
    }

    #[test]
    fn clamps_long_gaps() {
        let mut clock = FrameClock::new(33.0);
        clock.advance(0.0);
        assert_eq!(clock.advance(5000.0), 33.0);
    }

    #[test]
    fn backwards_clock_is_zero() {
        let mut clock = FrameClock::new(33.0);
        clock.advance(1000.0);
        assert_eq!(clock.advance(900.0), 0.0);
        assert_eq!(clock.advance(916.0), 16.0);
    }
}
