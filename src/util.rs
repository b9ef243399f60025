//! Small utility helpers used across modules.

/// Read a choice description as a number, the way respondents' labels like
/// `"1"` or `" 2.5 "` are meant. Non-finite values (`"inf"`, `"NaN"`) are not
/// numbers here because summaries must never carry them.
pub fn parse_numeric_description(s: &str) -> Option<f64> {
  s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge validation reports.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
