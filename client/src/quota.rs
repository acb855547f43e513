//! Per-user placement allotment: a slow base lane gated by a cooldown and
//! a bonus lane limited only by its remaining count.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Buffered into the extra-pixel overlay; does not touch the cooldown.
    Bonus,
    /// Submitted to the ledger; starts the cooldown.
    Base,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaReject {
    LoggedOut,
    OutOfPixels,
    Cooling,
}

/// What the placement button shows. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaStatus {
    LoggedOut,
    PlacePixels(u32),
    PlacePixel,
    OutOfPixels,
    Base(String),
}

impl fmt::Display for QuotaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaStatus::LoggedOut => f.write_str("Login to Play"),
            QuotaStatus::PlacePixels(_) => f.write_str("Place Pixels"),
            QuotaStatus::PlacePixel => f.write_str("Place Pixel"),
            QuotaStatus::OutOfPixels => f.write_str("Out of Pixels"),
            QuotaStatus::Base(timer) => f.write_str(timer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quota {
    logged_in: bool,
    base_pixel_up: bool,
    base_timer: String,
    /// A base placement is in flight; the countdown must not re-open the lane.
    base_pending: bool,
    available_pixels: u32,
    available_pixels_used: u32,
    last_placed_time: Option<u64>,
}

impl Quota {
    pub fn new(logged_in: bool) -> Self {
        Self {
            logged_in,
            base_pixel_up: logged_in,
            base_timer: format_timer(0),
            base_pending: false,
            available_pixels: 0,
            available_pixels_used: 0,
            last_placed_time: None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn base_pixel_up(&self) -> bool {
        self.base_pixel_up
    }

    pub fn base_timer(&self) -> &str {
        &self.base_timer
    }

    pub fn available_pixels(&self) -> u32 {
        self.available_pixels
    }

    pub fn available_pixels_used(&self) -> u32 {
        self.available_pixels_used
    }

    pub fn bonus_remaining(&self) -> u32 {
        self.available_pixels - self.available_pixels_used
    }

    /// Unix millis of the last successful placement; display only.
    pub fn last_placed_time(&self) -> Option<u64> {
        self.last_placed_time
    }

    pub fn status(&self) -> QuotaStatus {
        if !self.logged_in {
            return QuotaStatus::LoggedOut;
        }
        if self.available_pixels > 0 {
            return match self.bonus_remaining() {
                0 => QuotaStatus::OutOfPixels,
                1 => QuotaStatus::PlacePixel,
                n => QuotaStatus::PlacePixels(n),
            };
        }
        QuotaStatus::Base(self.base_timer.clone())
    }

    /// Which lane the next placement goes through. Bonus is preferred.
    pub fn lane(&self) -> Result<Lane, QuotaReject> {
        if !self.logged_in {
            return Err(QuotaReject::LoggedOut);
        }
        // The service counts an up base pixel inside `available_pixels`.
        let has_bonus = self.available_pixels > u32::from(self.base_pixel_up);
        if has_bonus && self.available_pixels_used < self.available_pixels {
            return Ok(Lane::Bonus);
        }
        if self.base_pixel_up {
            return Ok(Lane::Base);
        }
        if has_bonus {
            Err(QuotaReject::OutOfPixels)
        } else {
            Err(QuotaReject::Cooling)
        }
    }

    /// Consume up to `count` bonus units, returning how many were taken.
    pub fn consume_bonus(&mut self, count: u32) -> u32 {
        let taken = count.min(self.bonus_remaining());
        self.available_pixels_used += taken;
        taken
    }

    pub fn refund_bonus(&mut self) {
        self.available_pixels_used = self.available_pixels_used.saturating_sub(1);
    }

    pub fn consume_base(&mut self) {
        self.base_pixel_up = false;
        self.base_pending = true;
    }

    /// Undo [`Quota::consume_base`] after a failed submission.
    pub fn restore_base(&mut self) {
        self.base_pending = false;
        self.base_pixel_up = true;
    }

    pub fn record_placement(&mut self, now_ms: u64) {
        self.base_pending = false;
        self.last_placed_time = Some(now_ms);
    }

    /// A fresh allotment from the service resets the used counter.
    pub fn refresh_bonus(&mut self, available_pixels: u32) {
        self.available_pixels = available_pixels;
        self.available_pixels_used = 0;
    }

    /// Externally supplied base lane state.
    pub fn set_base(&mut self, up: bool, timer: String) {
        self.base_pixel_up = up && self.logged_in;
        self.base_timer = timer;
    }

    /// Client-side countdown from the last placement.
    pub fn tick(&mut self, now_ms: u64, time_between_pixels_secs: u64) {
        let cooldown_ms = time_between_pixels_secs * 1000;
        let elapsed = self
            .last_placed_time
            .map(|t| now_ms.saturating_sub(t))
            .unwrap_or(cooldown_ms);
        let remaining_secs = cooldown_ms.saturating_sub(elapsed).div_ceil(1000);
        let up = remaining_secs == 0 && !self.base_pending;
        self.set_base(up, format_timer(remaining_secs));
    }
}

/// `m:ss`
pub fn format_timer(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
