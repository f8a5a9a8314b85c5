//! Weekly volume progression
//!
//! Development and Specific weeks follow a repeating charge/discharge cycle
//! with charge weeks climbing linearly from the minimum to the maximum
//! volume. Taper weeks decay linearly from the peak down to a fraction of
//! the minimum volume. Weeks holding an intermediate race are cut.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::config::PlanConfig;
use crate::models::{TrainingPhase, WeekLoad};
use crate::phases::PhasePartition;

/// Target distance in km per week index
pub type WeeklyVolumes = BTreeMap<u32, Decimal>;

/// Assigns a target volume to every week of a plan
#[derive(Debug, Clone)]
pub struct VolumeCalculator {
    pattern: Vec<WeekLoad>,
    discharge_reduction: Decimal,
    race_week_reduction: Decimal,
    taper_final_ratio: Decimal,
    floor_ratio: Decimal,
    floor_km: Decimal,
}

impl Default for VolumeCalculator {
    fn default() -> Self {
        Self::from_config(&PlanConfig::default())
    }
}

impl VolumeCalculator {
    pub fn from_config(config: &PlanConfig) -> Self {
        Self {
            pattern: config.charge_discharge_pattern.clone(),
            discharge_reduction: config.discharge_reduction,
            race_week_reduction: config.race_week_volume_reduction,
            taper_final_ratio: config.taper_final_week_ratio,
            floor_ratio: config.min_volume_floor_ratio,
            floor_km: config.min_volume_floor_km,
        }
    }

    /// Charge/discharge marker of every Development and Specific week
    pub fn load_pattern(&self, partition: &PhasePartition) -> BTreeMap<u32, WeekLoad> {
        if self.pattern.is_empty() {
            return BTreeMap::new();
        }

        (0..partition.total_weeks())
            .filter(|week| partition.week_phase(*week) != TrainingPhase::Taper)
            .enumerate()
            .map(|(i, week)| (week, self.pattern[i % self.pattern.len()]))
            .collect()
    }

    /// Volume for every week, rounded to 0.1 km and always positive
    pub fn calculate(
        &self,
        min_volume: Decimal,
        max_volume: Decimal,
        partition: &PhasePartition,
        race_dates: &[NaiveDate],
    ) -> WeeklyVolumes {
        let total_weeks = partition.total_weeks();
        let loads = self.load_pattern(partition);
        let mut volumes: BTreeMap<u32, Decimal> = BTreeMap::new();

        let charge_weeks = loads.values().filter(|l| **l == WeekLoad::Charge).count();
        let increment = if charge_weeks > 1 {
            (max_volume - min_volume) / Decimal::from(charge_weeks - 1)
        } else {
            Decimal::ZERO
        };

        let mut charge_index = 0u32;
        let mut last_charge = min_volume;
        for (&week, load) in &loads {
            let volume = match load {
                WeekLoad::Charge => {
                    let volume = min_volume + increment * Decimal::from(charge_index);
                    charge_index += 1;
                    last_charge = volume;
                    volume
                }
                WeekLoad::Discharge => last_charge * (Decimal::ONE - self.discharge_reduction),
            };
            trace!(week, ?load, %volume, "Load week");
            volumes.insert(week, volume);
        }

        let taper_weeks: Vec<u32> = (0..total_weeks)
            .filter(|week| partition.week_phase(*week) == TrainingPhase::Taper)
            .collect();
        if !taper_weeks.is_empty() {
            let start = volumes.values().max().copied().unwrap_or(max_volume);
            let end = min_volume * self.taper_final_ratio;
            let decrement = if taper_weeks.len() > 1 {
                (start - end) / Decimal::from(taper_weeks.len() - 1)
            } else {
                Decimal::ZERO
            };

            for (i, week) in taper_weeks.iter().enumerate() {
                volumes.insert(*week, start - decrement * Decimal::from(i));
            }
            debug!(weeks = taper_weeks.len(), %start, %end, "Taper decay");
        }

        for week in 0..total_weeks {
            volumes.entry(week).or_insert_with(|| {
                if partition.week_phase(week) == TrainingPhase::Taper {
                    min_volume * self.taper_final_ratio
                } else {
                    min_volume
                }
            });
        }

        for date in race_dates {
            if let Some(volume) = partition
                .week_index(*date)
                .and_then(|week| volumes.get_mut(&week))
            {
                *volume *= Decimal::ONE - self.race_week_reduction;
                debug!(%date, "Race week volume reduced");
            }
        }

        let floor = (min_volume * self.floor_ratio).max(self.floor_km);
        volumes
            .into_iter()
            .map(|(week, volume)| {
                let rounded = volume.round_dp(1);
                (week, if rounded <= Decimal::ZERO { floor } else { rounded })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::PhaseCalculator;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn partition() -> PhasePartition {
        PhaseCalculator::default().calculate(date(2024, 1, 1), date(2024, 3, 31))
    }

    #[test]
    fn test_charge_discharge_progression() {
        let volumes = VolumeCalculator::default().calculate(dec!(20), dec!(40), &partition(), &[]);
        let values: Vec<Decimal> = volumes.values().copied().collect();

        assert_eq!(
            values,
            vec![
                dec!(20),
                dec!(24),
                dec!(19.2),
                dec!(28),
                dec!(32),
                dec!(25.6),
                dec!(36),
                dec!(40),
                dec!(32),
                dec!(40),
                dec!(30),
                dec!(20),
                dec!(10),
            ]
        );
    }

    #[test]
    fn test_load_pattern() {
        let loads = VolumeCalculator::default().load_pattern(&partition());
        assert_eq!(loads.len(), 9);
        assert_eq!(loads[&2], WeekLoad::Discharge);
        assert_eq!(loads[&3], WeekLoad::Charge);
        assert!(!loads.contains_key(&9));
    }

    #[test]
    fn test_race_week_reduction() {
        let calculator = VolumeCalculator::default();
        let base = calculator.calculate(dec!(20), dec!(40), &partition(), &[]);
        let reduced = calculator.calculate(dec!(20), dec!(40), &partition(), &[date(2024, 1, 21)]);

        assert_eq!(base[&2], dec!(19.2));
        // 19.2 * 0.8 = 15.36
        assert_eq!(reduced[&2], dec!(15.4));
        assert_eq!(reduced[&3], base[&3]);
    }

    #[test]
    fn test_floor_for_non_positive_volume() {
        let mut config = PlanConfig::default();
        config.taper_final_week_ratio = Decimal::ZERO;
        config.race_week_volume_reduction = Decimal::ONE;
        let calculator = VolumeCalculator::from_config(&config);

        let volumes = calculator.calculate(dec!(20), dec!(40), &partition(), &[date(2024, 3, 24)]);
        // Week 11 would drop to zero: floored to max(20 * 0.2, 5)
        assert_eq!(volumes[&11], dec!(5.0));
        assert!(volumes.values().all(|v| *v > Decimal::ZERO));
    }

    #[test]
    fn test_equal_bounds_give_flat_volume() {
        let mut config = PlanConfig::default();
        config.charge_discharge_pattern = vec![WeekLoad::Charge];
        let volumes = VolumeCalculator::from_config(&config).calculate(dec!(30), dec!(30), &partition(), &[]);
        assert!(volumes.range(0..9).all(|(_, v)| *v == dec!(30)));
    }
}
