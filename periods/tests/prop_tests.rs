use proptest::prelude::*;

use stakeline_periods::PeriodCalculator;
use stakeline_types::{Period, Timestamp};

proptest! {
    /// period_at never decreases as time moves forward.
    #[test]
    fn period_at_monotonic(
        epoch in 0u64..1_000_000_000,
        length in 1u64..1_000_000,
        t in 0u64..1_000_000_000,
        dt in 0u64..1_000_000_000,
    ) {
        let calc = PeriodCalculator::new(Timestamp::new(epoch), length).unwrap();
        let a = calc.period_at(Timestamp::new(epoch + t)).unwrap();
        let b = calc.period_at(Timestamp::new(epoch + t + dt)).unwrap();
        prop_assert!(b >= a);
    }

    /// Every timestamp at or after the epoch maps to a period whose start is
    /// not after it and whose successor starts after it.
    #[test]
    fn timestamp_lies_within_its_period(
        epoch in 0u64..1_000_000_000,
        length in 1u64..1_000_000,
        t in 0u64..1_000_000_000,
    ) {
        let calc = PeriodCalculator::new(Timestamp::new(epoch), length).unwrap();
        let ts = Timestamp::new(epoch + t);
        let p = calc.period_at(ts).unwrap();
        prop_assert!(calc.period_start(p).unwrap() <= ts);
        prop_assert!(calc.period_start(p.next()).unwrap() > ts);
    }

    /// Any timestamp before the epoch is rejected.
    #[test]
    fn before_epoch_rejected(epoch in 1u64..1_000_000_000, back in 1u64..1_000_000) {
        let calc = PeriodCalculator::new(Timestamp::new(epoch), 60).unwrap();
        let ts = Timestamp::new(epoch.saturating_sub(back));
        prop_assume!(ts.as_secs() < epoch);
        prop_assert!(calc.period_at(ts).is_err());
    }

    #[test]
    fn start_of_period_round_trips(index in 0u64..10_000_000, length in 1u64..100_000) {
        let calc = PeriodCalculator::new(Timestamp::EPOCH, length).unwrap();
        let start = calc.period_start(Period::new(index)).unwrap();
        prop_assert_eq!(calc.period_at(start).unwrap(), Period::new(index));
    }
}
