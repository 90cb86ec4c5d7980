use chrono::NaiveDateTime;
use std::time::Duration;

use super::NowFn;
use crate::clock::{self, local_now};
use crate::display::{ElementId, Surface};

/// Node detail page: nothing but a clock.
pub struct NodeDetailView<S: Surface> {
    surface: S,
    now: NowFn,
}

impl<S: Surface> NodeDetailView<S> {
    pub fn new(surface: S) -> Self {
        Self { surface, now: local_now }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, now: NowFn) -> Self {
        self.now = now;
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn tick_clock(&mut self, now: &NaiveDateTime) -> usize {
        clock::tick(&mut self.surface, now, &[ElementId::CurrentTime])
    }

    pub async fn run_clock<F: FnMut(&Self)>(&mut self, period: Duration, mut observe: F) {
        let mut ticker = clock::ticker(period);
        loop {
            ticker.tick().await;
            let now = (self.now)();
            self.tick_clock(&now);
            observe(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::TextBoard;
    use chrono::NaiveDate;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 2).unwrap().and_hms_opt(23, 59, 58).unwrap()
    }

    #[test]
    fn ignores_db_update_target() {
        let mut view = NodeDetailView::new(TextBoard::all());
        assert_eq!(view.tick_clock(&fixed_now()), 2);
        assert_eq!(view.surface().text(ElementId::DbUpdateTime), Some(""));
        assert_eq!(view.surface().text(ElementId::CurrentTime), Some("11:59:58 μ.μ."));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_with_no_targets() {
        let mut view = NodeDetailView::new(TextBoard::empty()).with_clock(fixed_now);
        let mut ticks = 0;
        let run = view.run_clock(Duration::from_secs(1), |_| ticks += 1);
        let _ = tokio::time::timeout(Duration::from_millis(2_500), run).await;
        assert_eq!(ticks, 3);
        assert!(view.surface().lines().is_empty());
    }
}
