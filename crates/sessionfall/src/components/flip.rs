use crate::components::feel::ImageSlot;

/// Outcome of advancing a flip by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipStep {
    /// Still running, nothing to apply.
    Running,
    /// Crossed the halfway mark: the image must be swapped now.
    Swap,
    /// Reached 100% (the swap is included if it had not happened yet).
    Done { swap: bool },
}

/// Horizontal-flip transition that hides an image change behind a squash to edge-on.
#[derive(Debug, Clone, PartialEq)]
pub struct FlipAnimation {
    /// Duration in ms.
    pub duration: f32,
    pub elapsed: f32,
    /// Normalized progress [0, 1].
    pub progress: f32,
    /// Whether the image has already been swapped.
    pub swapped: bool,
    pub next_image: ImageSlot,
}

impl FlipAnimation {
    /// Narrowest horizontal scale, so the ball never renders zero-width.
    pub const MIN_SCALE_X: f32 = 0.12;

    pub fn new(next_image: ImageSlot, duration: f32) -> Self {
        Self {
            duration,
            elapsed: 0.0,
            progress: 0.0,
            swapped: false,
            next_image,
        }
    }

    pub fn tick(&mut self, dt: f32) -> FlipStep {
        self.elapsed += dt;
        self.progress = if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        };

        let swap = self.progress >= 0.5 && !self.swapped;
        if swap {
            self.swapped = true;
        }
        if self.progress >= 1.0 {
            FlipStep::Done { swap }
        } else if swap {
            FlipStep::Swap
        } else {
            FlipStep::Running
        }
    }

    /// `max(0.12, |cos(progress * PI)|)`.
    pub fn scale_x(&self) -> f32 {
        (self.progress * std::f32::consts::PI).cos().abs().max(Self::MIN_SCALE_X)
    }
}
