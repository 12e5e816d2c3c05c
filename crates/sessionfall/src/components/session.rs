//! Session records: the named form of the `[deviceId, lcp, fcp, inp, cls, ttfb]` tuple.

use serde_json::Value;
use crate::api::error::RecordError;
use crate::components::feel::{feel_score, FeelLevel, ImageSlot};

/// Number of positional fields in a wire tuple.
pub const TUPLE_LEN: usize = 6;

/// Latest web-vitals metrics for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub device_id: String,
    /// Largest Contentful Paint (ms).
    pub lcp: Option<f64>,
    /// First Contentful Paint (ms).
    pub fcp: Option<f64>,
    /// Interaction to Next Paint (ms).
    pub inp: Option<f64>,
    /// Cumulative Layout Shift (unitless).
    pub cls: Option<f64>,
    /// Time To First Byte (ms).
    pub ttfb: Option<f64>,
}

impl SessionRecord {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            lcp: None,
            fcp: None,
            inp: None,
            cls: None,
            ttfb: None,
        }
    }

    // -- Builder pattern --

    pub fn with_lcp(mut self, lcp: f64) -> Self {
        self.lcp = Some(lcp);
        self
    }

    pub fn with_fcp(mut self, fcp: f64) -> Self {
        self.fcp = Some(fcp);
        self
    }

    pub fn with_inp(mut self, inp: f64) -> Self {
        self.inp = Some(inp);
        self
    }

    pub fn with_cls(mut self, cls: f64) -> Self {
        self.cls = Some(cls);
        self
    }

    pub fn with_ttfb(mut self, ttfb: f64) -> Self {
        self.ttfb = Some(ttfb);
        self
    }

    /// Parse a wire tuple. Trailing elements beyond the sixth are ignored;
    /// null, non-numeric, negative or non-finite metrics become `None`.
    pub fn from_tuple(value: &Value) -> Result<Self, RecordError> {
        let items = value.as_array().ok_or(RecordError::NotAnArray)?;
        if items.len() < TUPLE_LEN {
            return Err(RecordError::TooShort(items.len()));
        }
        let device_id = match items[0].as_str() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => return Err(RecordError::MissingDeviceId),
        };
        Ok(Self {
            device_id,
            lcp: metric(&items[1]),
            fcp: metric(&items[2]),
            inp: metric(&items[3]),
            cls: metric(&items[4]),
            ttfb: metric(&items[5]),
        })
    }

    /// Composite 0..=100 score, `None` when no scorable metric is present.
    pub fn feel_score(&self) -> Option<f32> {
        feel_score(self.lcp, self.inp, self.cls)
    }

    pub fn feel_level(&self) -> Option<FeelLevel> {
        self.feel_score().map(FeelLevel::from_score)
    }

    /// Which image a ball for this session displays.
    pub fn image_slot(&self) -> ImageSlot {
        self.feel_level().map(ImageSlot::from).unwrap_or(ImageSlot::Default)
    }
}

/// Device id of a delete entry: either the bare id string or a full tuple.
pub fn device_id_of(value: &Value) -> Result<String, RecordError> {
    let id = match value {
        Value::String(id) => id.as_str(),
        Value::Array(items) => items.first().and_then(Value::as_str).unwrap_or_default(),
        _ => return Err(RecordError::NotAnArray),
    };
    if id.trim().is_empty() {
        return Err(RecordError::MissingDeviceId);
    }
    Ok(id.to_string())
}

fn metric(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite() && *v >= 0.0)
}
