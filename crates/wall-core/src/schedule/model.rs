//! Block cadence configuration.

use chrono::{DateTime, TimeDelta, Utc};

use crate::{Error, Result};

/// How often blocks open, and how long each stays hidden from readers.
///
/// Fixed at startup and shared read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSchedule {
    frequency: TimeDelta,
    release_offset: TimeDelta,
}

impl BlockSchedule {
    /// Creates a schedule.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `frequency` is not positive or
    /// `release_offset` is negative.
    pub fn new(frequency: TimeDelta, release_offset: TimeDelta) -> Result<Self> {
        if frequency <= TimeDelta::zero() {
            return Err(Error::Config("block frequency must be positive".to_string()));
        }
        if release_offset < TimeDelta::zero() {
            return Err(Error::Config("release offset must not be negative".to_string()));
        }
        Ok(Self {
            frequency,
            release_offset,
        })
    }

    /// Cadence at which new blocks open.
    #[must_use]
    pub const fn frequency(&self) -> TimeDelta {
        self.frequency
    }

    /// Delay after a block closes before it becomes visible.
    #[must_use]
    pub const fn release_offset(&self) -> TimeDelta {
        self.release_offset
    }

    /// Start of the block that should receive posts at `now`, when that is
    /// later than `last`.
    ///
    /// Returns `None` while `last` is still current. Otherwise the result is
    /// `last` advanced by the largest whole number of periods that fits,
    /// so boundaries stay on the same grid after downtime.
    #[must_use]
    pub fn next_boundary(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let elapsed = now - last;
        if elapsed < self.frequency {
            return None;
        }

        let period = self.frequency.num_microseconds()?;
        let periods = elapsed.num_microseconds()? / period;
        let step = TimeDelta::microseconds(periods.checked_mul(period)?);
        last.checked_add_signed(step)
    }

    /// Latest block start whose posts are visible to readers at `now`.
    ///
    /// A block is released one full period plus the offset after it opens.
    #[must_use]
    pub fn release_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.frequency - self.release_offset
    }
}

impl Default for BlockSchedule {
    /// Daily blocks released eight hours after they close.
    fn default() -> Self {
        Self {
            frequency: TimeDelta::hours(24),
            release_offset: TimeDelta::hours(8),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_frequency() {
        assert!(BlockSchedule::new(TimeDelta::zero(), TimeDelta::zero()).is_err());
        assert!(BlockSchedule::new(TimeDelta::hours(-1), TimeDelta::zero()).is_err());
        assert!(BlockSchedule::new(TimeDelta::hours(1), TimeDelta::hours(-1)).is_err());
    }

    #[test]
    fn test_current_block_is_kept() {
        let schedule = BlockSchedule::default();
        assert_eq!(schedule.next_boundary(t0(), t0()), None);
        assert_eq!(
            schedule.next_boundary(t0(), t0() + TimeDelta::hours(23)),
            None
        );
        // A clock behind the last block never opens a new one.
        assert_eq!(schedule.next_boundary(t0(), t0() - TimeDelta::hours(5)), None);
    }

    #[test]
    fn test_exact_period_opens_next_block() {
        let schedule = BlockSchedule::default();
        assert_eq!(
            schedule.next_boundary(t0(), t0() + TimeDelta::hours(24)),
            Some(t0() + TimeDelta::hours(24))
        );
    }

    #[test]
    fn test_snaps_to_latest_whole_period() {
        let schedule = BlockSchedule::default();
        assert_eq!(
            schedule.next_boundary(t0(), t0() + TimeDelta::hours(50)),
            Some(t0() + TimeDelta::hours(48))
        );
    }

    #[test]
    fn test_release_cutoff() {
        let schedule = BlockSchedule::default();
        assert_eq!(
            schedule.release_cutoff(t0() + TimeDelta::hours(32)),
            t0()
        );
    }

    proptest! {
        #[test]
        fn boundary_stays_on_grid(minutes in 0i64..1_000_000, freq_minutes in 1i64..10_000) {
            let schedule = BlockSchedule::new(TimeDelta::minutes(freq_minutes), TimeDelta::zero()).unwrap();
            let now = t0() + TimeDelta::minutes(minutes);
            if let Some(boundary) = schedule.next_boundary(t0(), now) {
                let offset = (boundary - t0()).num_minutes();
                prop_assert_eq!(offset % freq_minutes, 0);
                prop_assert!(boundary <= now);
                prop_assert!(now - boundary < schedule.frequency());
            } else {
                prop_assert!(minutes < freq_minutes);
            }
        }
    }
}
