//! Boot-sequence timing.
//!
//! The kiosk opens with a staged `[OK] ...` boot log before the banner and
//! stats appear: one line every 400ms, banner at 2.5s, stats half a second
//! later.

use std::time::{Duration, Instant};

/// The staged boot log, with per-line reveal delays in milliseconds.
pub const BOOT_LINES: [(&str, u64); 4] = [
    ("[OK] Loading kernel modules...", 0),
    ("[OK] Initializing network interface...", 400),
    ("[OK] Mounting filesystem...", 800),
    ("[OK] Starting FUNDLINE_SYSTEMS v0.1.0...", 1200),
];

const BANNER_AT: Duration = Duration::from_millis(2500);
const STATS_AT: Duration = Duration::from_millis(3000);

/// How many boot lines are visible after `elapsed`.
pub fn lines_visible_at(elapsed: Duration) -> usize {
    BOOT_LINES
        .iter()
        .filter(|(_, delay)| elapsed >= Duration::from_millis(*delay))
        .count()
}

/// Wall-clock driver for the boot reveal.
pub struct BootSequence {
    started: Instant,
}

impl BootSequence {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn visible_lines(&self) -> &'static [(&'static str, u64)] {
        &BOOT_LINES[..lines_visible_at(self.started.elapsed())]
    }

    /// The ASCII banner appears once the boot log has finished.
    pub fn banner_visible(&self) -> bool {
        self.started.elapsed() >= BANNER_AT
    }

    /// Stats (fund monitor, profile block) fade in after the banner.
    pub fn stats_visible(&self) -> bool {
        self.started.elapsed() >= STATS_AT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_reveal_in_order() {
        assert_eq!(lines_visible_at(Duration::from_millis(0)), 1);
        assert_eq!(lines_visible_at(Duration::from_millis(500)), 2);
        assert_eq!(lines_visible_at(Duration::from_millis(1199)), 3);
        assert_eq!(lines_visible_at(Duration::from_millis(5000)), BOOT_LINES.len());
    }
}
