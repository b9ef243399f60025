//! Numeric session join codes.
//!
//! Codes are drawn at random from the smallest digit width first (4 digits, so
//! never below 1000). After `attempts_per_width` collisions the search widens by
//! one digit; once `max_digits` is exhausted allocation fails instead of looping.

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AppError;

const MIN_DIGITS: u32 = 4;
// u32 holds every 9-digit code.
const MAX_DIGITS: u32 = 9;

#[derive(Clone, Debug, Deserialize)]
pub struct CodeConfig {
  #[serde(default = "default_min_digits")]
  pub min_digits: u32,
  #[serde(default = "default_max_digits")]
  pub max_digits: u32,
  #[serde(default = "default_attempts")]
  pub attempts_per_width: u32,
}

fn default_min_digits() -> u32 { 4 }
fn default_max_digits() -> u32 { 6 }
fn default_attempts() -> u32 { 32 }

impl Default for CodeConfig {
  fn default() -> Self {
    Self {
      min_digits: default_min_digits(),
      max_digits: default_max_digits(),
      attempts_per_width: default_attempts(),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeAllocator {
  min_digits: u32,
  max_digits: u32,
  attempts_per_width: u32,
}

impl CodeAllocator {
  /// Out-of-bounds settings are clamped to 4..=9 digits and at least one attempt.
  pub fn new(min_digits: u32, max_digits: u32, attempts_per_width: u32) -> Self {
    let min_digits = min_digits.clamp(MIN_DIGITS, MAX_DIGITS);
    let max_digits = max_digits.clamp(min_digits, MAX_DIGITS);
    Self { min_digits, max_digits, attempts_per_width: attempts_per_width.max(1) }
  }

  pub fn from_config(cfg: &CodeConfig) -> Self {
    Self::new(cfg.min_digits, cfg.max_digits, cfg.attempts_per_width)
  }

  /// Upper bound on draws before giving up.
  pub fn max_attempts(&self) -> u32 {
    (self.max_digits - self.min_digits + 1) * self.attempts_per_width
  }

  pub fn allocate<R: Rng + ?Sized>(
    &self,
    rng: &mut R,
    is_taken: impl Fn(u32) -> bool,
  ) -> Result<u32, AppError> {
    let mut attempts = 0;
    for digits in self.min_digits..=self.max_digits {
      let (lo, hi) = width_bounds(digits);
      for _ in 0..self.attempts_per_width {
        attempts += 1;
        let code = rng.gen_range(lo..=hi);
        if !is_taken(code) {
          debug!(target: "session", code, digits, attempts, "Allocated session code");
          return Ok(code);
        }
      }
      debug!(target: "session", digits, attempts, "Code width crowded; widening");
    }
    warn!(target: "session", attempts, "Session code space exhausted");
    Err(AppError::CodeSpaceExhausted { attempts })
  }
}

impl Default for CodeAllocator {
  fn default() -> Self {
    Self::from_config(&CodeConfig::default())
  }
}

fn width_bounds(digits: u32) -> (u32, u32) {
  (10u32.pow(digits - 1), 10u32.pow(digits) - 1)
}
