//! Period reconciliation.
//!
//! Period points come from separate quarter and half tables, and pages often
//! carry one set without the other. A half that reads zero while one of its
//! quarters is nonzero is rebuilt from the quarters. Full-game totals are
//! never checked against the periods.

use crate::models::{EnrichedRow, Period, PeriodBreakdown, PeriodPoints, PlayerRow};
use tracing::debug;

/// Attach period points to each row, then repair missing halves.
pub fn enrich(rows: Vec<PlayerRow>, periods: &[PeriodPoints]) -> Vec<EnrichedRow> {
    rows.into_iter()
        .map(|row| {
            let key = row.key();
            let mut breakdown = PeriodBreakdown::default();
            for points in periods {
                breakdown.set(points.period(), points.get(&key));
            }
            if reconcile_halves(&mut breakdown) {
                debug!("{}: derived half totals from quarters", key);
            }
            EnrichedRow {
                row,
                periods: breakdown,
            }
        })
        .collect()
}

/// Returns true if either half was rewritten. Idempotent.
pub fn reconcile_halves(b: &mut PeriodBreakdown) -> bool {
    let mut changed = false;
    for (half, first, second) in [
        (Period::H1, Period::Q1, Period::Q2),
        (Period::H2, Period::Q3, Period::Q4),
    ] {
        let (a, c) = (b.get(first), b.get(second));
        if b.get(half) == 0 && (a > 0 || c > 0) {
            b.set(half, a + c);
            changed = true;
        }
    }
    changed
}
