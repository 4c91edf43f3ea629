/// Largest blink strength the headset reports.
pub const BLINK_STRENGTH_MAX: u32 = 255;

/// Result of feeding one blink event into the gate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlinkOutcome {
    /// Whether the blink crossed the threshold and (re)armed the mask.
    pub masking: bool,
    /// `strength / BLINK_STRENGTH_MAX`, clamped to `[0, 1]`.
    pub ratio: f64,
    pub mask_until: f64,
}

/// Turns discrete blink events into a time-bounded validity mask.
///
/// The mask only ever grows: a new blink extends `mask_until`, never
/// shortens it.
#[derive(Clone, Debug)]
pub struct BlinkMaskGate {
    threshold: u32,
    post_mask_secs: f64,
    mask_until: f64,
    last_ratio: f64,
}

impl BlinkMaskGate {
    pub fn new(threshold: u32, post_mask_secs: f64) -> Self {
        Self {
            threshold,
            post_mask_secs,
            mask_until: f64::NEG_INFINITY,
            last_ratio: 0.0,
        }
    }

    pub fn on_blink(&mut self, strength: u32, now: f64) -> BlinkOutcome {
        self.last_ratio = (strength as f64 / BLINK_STRENGTH_MAX as f64).clamp(0.0, 1.0);
        let masking = strength >= self.threshold;
        if masking {
            self.mask_until = self.mask_until.max(now + self.post_mask_secs);
        }
        BlinkOutcome {
            masking,
            ratio: self.last_ratio,
            mask_until: self.mask_until,
        }
    }

    pub fn is_masked(&self, now: f64) -> bool {
        now < self.mask_until
    }

    pub fn mask_until(&self) -> f64 {
        self.mask_until
    }

    pub fn last_ratio(&self) -> f64 {
        self.last_ratio
    }
}
