use stakeline_types::{Period, Stake, StakingParams, Timestamp};

use crate::error::PeriodError;

/// Converts between timestamps and period indices for one network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeriodCalculator {
    epoch: Timestamp,
    period_length_secs: u64,
}

impl PeriodCalculator {
    pub fn new(epoch: Timestamp, period_length_secs: u64) -> Result<Self, PeriodError> {
        if period_length_secs == 0 {
            return Err(PeriodError::ZeroPeriodLength);
        }
        Ok(Self {
            epoch,
            period_length_secs,
        })
    }

    pub fn from_params(params: &StakingParams) -> Result<Self, PeriodError> {
        Self::new(Timestamp::new(params.epoch_secs), params.period_length_secs)
    }

    pub fn epoch(&self) -> Timestamp {
        self.epoch
    }

    pub fn period_length_secs(&self) -> u64 {
        self.period_length_secs
    }

    /// The period containing `timestamp`.
    pub fn period_at(&self, timestamp: Timestamp) -> Result<Period, PeriodError> {
        let offset = timestamp
            .as_secs()
            .checked_sub(self.epoch.as_secs())
            .ok_or(PeriodError::InvalidTimestamp {
                timestamp,
                epoch: self.epoch,
            })?;
        Ok(Period::new(offset / self.period_length_secs))
    }

    /// First second of `period`.
    pub fn period_start(&self, period: Period) -> Result<Timestamp, PeriodError> {
        period
            .index()
            .checked_mul(self.period_length_secs)
            .and_then(|secs| secs.checked_add(self.epoch.as_secs()))
            .map(Timestamp::new)
            .ok_or(PeriodError::Overflow)
    }

    pub fn periods_to_secs(&self, periods: u64) -> Result<u64, PeriodError> {
        periods
            .checked_mul(self.period_length_secs)
            .ok_or(PeriodError::Overflow)
    }

    /// Seconds from `now` until `period` begins; zero if it already has.
    pub fn secs_until(&self, period: Period, now: Timestamp) -> Result<u64, PeriodError> {
        let start = self.period_start(period)?;
        Ok(start.as_secs().saturating_sub(now.as_secs()))
    }

    /// Moment the stake stops locking tokens.
    pub fn unlock_time(&self, stake: &Stake) -> Result<Timestamp, PeriodError> {
        self.period_start(stake.end_period)
    }
}
