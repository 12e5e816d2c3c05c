//! Feel score: a 0..=100 composite of LCP, INP and CLS, bucketed into five levels.

use serde::{Deserialize, Serialize};

/// Threshold pair for one metric: values at or below `good` score 100,
/// `poor` scores 50, `2 * poor` and beyond score 0.
#[derive(Debug, Clone, Copy)]
struct Threshold {
    good: f64,
    poor: f64,
    weight: f32,
}

const LCP: Threshold = Threshold { good: 2500.0, poor: 4000.0, weight: 0.4 };
const INP: Threshold = Threshold { good: 200.0, poor: 500.0, weight: 0.3 };
const CLS: Threshold = Threshold { good: 0.1, poor: 0.25, weight: 0.3 };

impl Threshold {
    fn score(&self, value: f64) -> f32 {
        let s = if value <= self.good {
            100.0
        } else if value <= self.poor {
            100.0 - 50.0 * (value - self.good) / (self.poor - self.good)
        } else {
            50.0 - 50.0 * (value - self.poor) / self.poor
        };
        s.clamp(0.0, 100.0) as f32
    }
}

/// Weighted score over the present metrics. Missing metrics are excluded and the
/// remaining weights renormalised; returns `None` when nothing can be scored.
pub fn feel_score(lcp: Option<f64>, inp: Option<f64>, cls: Option<f64>) -> Option<f32> {
    let mut total = 0.0f32;
    let mut weight = 0.0f32;
    for (value, threshold) in [(lcp, LCP), (inp, INP), (cls, CLS)] {
        if let Some(v) = value {
            total += threshold.score(v) * threshold.weight;
            weight += threshold.weight;
        }
    }
    if weight <= 0.0 {
        None
    } else {
        Some(total / weight)
    }
}

/// Qualitative bucket of a feel score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeelLevel {
    VeryBad,
    Bad,
    Normal,
    Good,
    VeryGood,
}

impl FeelLevel {
    pub fn from_score(score: f32) -> Self {
        if score >= 90.0 {
            FeelLevel::VeryGood
        } else if score >= 75.0 {
            FeelLevel::Good
        } else if score >= 50.0 {
            FeelLevel::Normal
        } else if score >= 25.0 {
            FeelLevel::Bad
        } else {
            FeelLevel::VeryBad
        }
    }
}

/// Well-known image asset keys. A ball's image is one of these slots;
/// the host resolves slots to decoded images through the `ImageSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageSlot {
    VeryBad,
    Bad,
    Normal,
    Good,
    VeryGood,
    #[default]
    Default,
}

impl ImageSlot {
    pub const ALL: [ImageSlot; 6] = [
        Self::VeryBad, Self::Bad, Self::Normal,
        Self::Good, Self::VeryGood, Self::Default,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::VeryBad => "very-bad",
            Self::Bad => "bad",
            Self::Normal => "normal",
            Self::Good => "good",
            Self::VeryGood => "very-good",
            Self::Default => "default",
        }
    }
}

impl From<FeelLevel> for ImageSlot {
    fn from(level: FeelLevel) -> Self {
        match level {
            FeelLevel::VeryBad => ImageSlot::VeryBad,
            FeelLevel::Bad => ImageSlot::Bad,
            FeelLevel::Normal => ImageSlot::Normal,
            FeelLevel::Good => ImageSlot::Good,
            FeelLevel::VeryGood => ImageSlot::VeryGood,
        }
    }
}
