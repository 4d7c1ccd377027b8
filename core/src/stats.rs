use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::TimeZone;

use crate::db::FoodDb;
use crate::error::{FoodError, FoodResult};
use crate::models::{
    Blame, Culprit, Granularity, KCAL_PER_G_CARBS, KCAL_PER_G_FAT, KCAL_PER_G_PROTEIN, Meal,
    Nutrients, SECONDS_PER_DAY, Stats, TimeSeriesRow, start_of_day,
};

/// Macro shares of energy, or `None` when no macro energy was eaten.
fn macro_split(sum: Nutrients) -> Option<(f64, f64, f64)> {
    let carbs = sum.carbs_g * KCAL_PER_G_CARBS;
    let fat = sum.fat_g * KCAL_PER_G_FAT;
    let protein = sum.protein_g * KCAL_PER_G_PROTEIN;
    let macro_kcal = carbs + fat + protein;
    if macro_kcal == 0.0 {
        return None;
    }
    Some((
        100.0 * carbs / macro_kcal,
        100.0 * fat / macro_kcal,
        100.0 * protein / macro_kcal,
    ))
}

impl FoodDb {
    fn summed(&self) -> Nutrients {
        self.meals().iter().map(|m| m.totals).sum()
    }

    /// Total energy plus macro shares of the macro-derived energy.
    ///
    /// Percentages are relative to `4*carbs + 9*fat + 4*protein`, not to the
    /// logged kcal. When that sum is zero every percentage is reported as 0.
    #[must_use]
    pub fn total_stats(&self) -> Stats {
        let sum = self.summed();
        let (carbs_pct, fat_pct, protein_pct) = macro_split(sum).unwrap_or_else(|| {
            if !self.meals().is_empty() {
                tracing::warn!(
                    meals = self.meals().len(),
                    "no macro energy in window, reporting 0% for each macro"
                );
            }
            (0.0, 0.0, 0.0)
        });
        Stats {
            kcal: sum.kcal,
            carbs_pct,
            fat_pct,
            protein_pct,
        }
    }

    /// Like [`FoodDb::total_stats`] but refuses a zero macro-energy total.
    pub fn checked_total_stats(&self) -> FoodResult<Stats> {
        let sum = self.summed();
        let (carbs_pct, fat_pct, protein_pct) = macro_split(sum).ok_or_else(|| {
            FoodError::DegenerateStats(format!(
                "no macro energy across {} meal(s)",
                self.meals().len()
            ))
        })?;
        Ok(Stats {
            kcal: sum.kcal,
            carbs_pct,
            fat_pct,
            protein_pct,
        })
    }

    /// Window length in days, never less than one.
    #[must_use]
    pub fn window_days(&self) -> f64 {
        ((self.end() - self.begin()) / SECONDS_PER_DAY).max(1.0)
    }

    #[must_use]
    pub fn mean_daily_stats(&self) -> Stats {
        let total = self.total_stats();
        Stats {
            kcal: total.kcal / self.window_days(),
            ..total
        }
    }

    /// Daily rows starting at midnight (in `tz`) of the window's first day.
    ///
    /// Each row averages the trailing `[cursor + step - avg_window, cursor +
    /// step)` window and is stamped with `cursor`.
    pub fn time_series<'a, Tz: TimeZone>(
        &'a self,
        tz: &Tz,
        step_days: f64,
        avg_window_days: f64,
    ) -> FoodResult<TimeSeries<'a>> {
        if !(step_days > 0.0 && step_days.is_finite()) {
            return Err(FoodError::InvalidQuantity(format!(
                "time series step must be positive, got {step_days}"
            )));
        }
        if !(avg_window_days > 0.0 && avg_window_days.is_finite()) {
            return Err(FoodError::InvalidQuantity(format!(
                "averaging window must be positive, got {avg_window_days}"
            )));
        }
        if !(self.begin().is_finite() && self.end().is_finite()) {
            return Err(FoodError::InvalidQuantity(format!(
                "time series needs a finite window, got [{}, {})",
                self.begin(),
                self.end()
            )));
        }
        let start = start_of_day(self.begin(), tz).unwrap_or(self.begin());
        Ok(TimeSeries {
            db: self,
            start,
            cursor: start,
            step: step_days * SECONDS_PER_DAY,
            window: avg_window_days * SECONDS_PER_DAY,
        })
    }

    pub fn blame(&self, granularity: Granularity) -> FoodResult<Blame> {
        match granularity {
            Granularity::Meal => Ok(self.blame_meals()),
            Granularity::Ingredient => self.blame_ingredients(),
        }
    }

    /// Attribute totals to the ingredient named by each meal.
    #[must_use]
    pub fn blame_meals(&self) -> Blame {
        tally(
            self.meals()
                .iter()
                .map(|m| (m.ingredient.as_str(), m.totals)),
        )
    }

    /// Attribute totals to primitive ingredients by expanding composites.
    pub fn blame_ingredients(&self) -> FoodResult<Blame> {
        let culprits = self
            .meals()
            .iter()
            .flat_map(|meal| self.leaf_contributions(meal))
            .collect::<FoodResult<Vec<_>>>()?;
        Ok(tally(culprits))
    }

    /// Depth-first walk of a meal down to its leaves, yielding each leaf's
    /// contribution at the accumulated amount.
    fn leaf_contributions<'a>(
        &'a self,
        meal: &'a Meal,
    ) -> impl Iterator<Item = FoodResult<(&'a str, Nutrients)>> + 'a {
        let mut stack: Vec<(&'a str, f64)> = vec![(meal.ingredient.as_str(), meal.amount)];
        std::iter::from_fn(move || {
            while let Some((name, amount)) = stack.pop() {
                let ingredient = match self.ingredients().lookup(name) {
                    Ok(i) => i,
                    Err(e) => return Some(Err(e)),
                };
                if ingredient.is_primitive() {
                    return Some(Ok((ingredient.name.as_str(), ingredient.per_unit.scale(amount))));
                }
                stack.extend(
                    ingredient
                        .contents
                        .iter()
                        .rev()
                        .map(|c| (c.name.as_str(), amount * c.amount)),
                );
            }
            None
        })
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { 100.0 * part / whole }
}

/// Sum contributions per key and rank each nutrient's share of the total.
///
/// Keys iterate in name order and sorting is stable, so equal shares rank
/// alphabetically.
fn tally<'a, I>(culprits: I) -> Blame
where
    I: IntoIterator<Item = (&'a str, Nutrients)>,
{
    let mut sources: BTreeMap<&str, Nutrients> = BTreeMap::new();
    let mut totals = Nutrients::default();
    for (name, contribution) in culprits {
        *sources.entry(name).or_default() += contribution;
        totals += contribution;
    }

    let board = |pick: fn(&Nutrients) -> f64| {
        let whole = pick(&totals);
        let mut ranked: Vec<Culprit> = sources
            .iter()
            .map(|(name, n)| Culprit {
                name: (*name).to_string(),
                percent: percent(pick(n), whole),
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.percent
                .partial_cmp(&a.percent)
                .unwrap_or(Ordering::Equal)
        });
        ranked
    };

    Blame {
        kcal: board(|n: &Nutrients| n.kcal),
        carbs: board(|n: &Nutrients| n.carbs_g),
        fat: board(|n: &Nutrients| n.fat_g),
        protein: board(|n: &Nutrients| n.protein_g),
    }
}

/// Lazy, restartable daily series over a [`FoodDb`].
#[derive(Debug, Clone)]
pub struct TimeSeries<'a> {
    db: &'a FoodDb,
    start: f64,
    cursor: f64,
    step: f64,
    window: f64,
}

impl TimeSeries<'_> {
    /// Rewind to the first row.
    pub fn restart(&mut self) {
        self.cursor = self.start;
    }
}

impl Iterator for TimeSeries<'_> {
    type Item = TimeSeriesRow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.db.end() {
            return None;
        }
        let window_end = self.cursor + self.step;
        let stats = self
            .db
            .filtered_range(window_end - self.window, window_end)
            .mean_daily_stats();
        let row = TimeSeriesRow {
            time: self.cursor,
            kcal: stats.kcal,
            carbs_pct: stats.carbs_pct,
            fat_pct: stats.fat_pct,
            protein_pct: stats.protein_pct,
        };
        self.cursor = window_end;
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FoodLog;
    use chrono::Utc;

    const DAY: f64 = SECONDS_PER_DAY;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn kitchen() -> FoodLog {
        let mut log = FoodLog::new();
        log.integrate(
            "kitchen.log",
            "\
ingredient butter --unit=cup --amt=1 --kcal=1628 --carbs=0.1 --fat=184 --protein=1.9
ingredient boxmac --unit=serving --amt=1 --kcal=250 --carbs=47 --fat=3 --protein=9
ingredient sugar --unit=g --amt=1 --kcal=4 --carbs=1 --fat=0 --protein=0
ingredient water --unit=cup --amt=1 --kcal=0 --carbs=0 --fat=0 --protein=0
combine cheesy_mac butter 0.25 boxmac 1.5
combine mac_pot cheesy_mac 4 sugar 10 --amt=2 --unit=bowl
",
        )
        .unwrap();
        log
    }

    #[test]
    fn test_total_stats() {
        let mut log = kitchen();
        log.record_consumption(0.0, "boxmac", 1.0).unwrap();
        log.record_consumption(10.0, "sugar", 25.0).unwrap();
        let stats = log.finish(DAY).total_stats();

        // carbs 72g*4=288, fat 3g*9=27, protein 9g*4=36 -> 351 macro kcal
        assert!(close(stats.kcal, 350.0));
        assert!(close(stats.carbs_pct, 100.0 * 288.0 / 351.0));
        assert!(close(stats.fat_pct, 100.0 * 27.0 / 351.0));
        assert!(close(stats.protein_pct, 100.0 * 36.0 / 351.0));
        assert!(close(stats.carbs_pct + stats.fat_pct + stats.protein_pct, 100.0));
    }

    #[test]
    fn test_total_stats_zero_macros() {
        let mut log = kitchen();
        log.record_consumption(0.0, "water", 3.0).unwrap();
        let db = log.finish(DAY);

        let stats = db.total_stats();
        assert_eq!(stats, Stats::default());
        assert!(matches!(
            db.checked_total_stats(),
            Err(FoodError::DegenerateStats(_))
        ));

        let empty = db.filtered_range(5.0, 6.0);
        assert_eq!(empty.total_stats(), Stats::default());
    }

    #[test]
    fn test_mean_daily_stats_clamps_to_one_day() {
        let mut log = kitchen();
        log.record_consumption(0.0, "boxmac", 2.0).unwrap();
        let db = log.finish(3600.0);
        let total = db.total_stats();
        let mean = db.mean_daily_stats();
        assert!(close(mean.kcal, total.kcal));
        assert!(close(mean.fat_pct, total.fat_pct));
    }

    #[test]
    fn test_mean_daily_stats_divides_by_days() {
        let mut log = kitchen();
        log.record_consumption(0.0, "boxmac", 2.0).unwrap();
        log.record_consumption(DAY, "boxmac", 2.0).unwrap();
        let db = log.finish(4.0 * DAY);
        assert!(close(db.window_days(), 4.0));
        assert!(close(db.mean_daily_stats().kcal, 250.0));
    }

    #[test]
    fn test_blame_meals_keys_by_meal_name() {
        let mut log = kitchen();
        log.record_consumption(0.0, "cheesy_mac", 1.0).unwrap();
        log.record_consumption(1.0, "boxmac", 1.0).unwrap();
        let blame = log.finish(DAY).blame_meals();

        let names: Vec<&str> = blame.kcal.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["cheesy_mac", "boxmac"]);
        assert!(close(blame.kcal[0].percent, 100.0 * 782.0 / 1032.0));
        assert!(close(blame.kcal[1].percent, 100.0 * 250.0 / 1032.0));
    }

    #[test]
    fn test_blame_ingredients_expands_to_leaves() {
        let mut log = kitchen();
        log.record_consumption(0.0, "cheesy_mac", 2.0).unwrap();
        let blame = log.finish(DAY).blame_ingredients().unwrap();

        let fat: Vec<(&str, f64)> = blame
            .fat
            .iter()
            .map(|c| (c.name.as_str(), c.percent))
            .collect();
        assert_eq!(fat[0].0, "butter");
        assert!(close(fat[0].1, 100.0 * 92.0 / 101.0));
        assert_eq!(fat[1].0, "boxmac");
        assert!(close(fat[1].1, 100.0 * 9.0 / 101.0));
        assert!(blame.kcal.iter().all(|c| c.name != "cheesy_mac"));
    }

    #[test]
    fn test_blame_ingredients_nested_sums_back() {
        let mut log = kitchen();
        log.record_consumption(0.0, "mac_pot", 3.0).unwrap();
        let db = log.finish(DAY);
        let meal = &db.meals()[0];

        let leaves: Vec<(&str, Nutrients)> = db
            .leaf_contributions(meal)
            .collect::<FoodResult<Vec<_>>>()
            .unwrap();
        let names: Vec<&str> = leaves.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["butter", "boxmac", "sugar"]);

        // 3 bowls of a 2-bowl pot: 6 mac servings and 15g sugar.
        let kcal: f64 = leaves.iter().map(|(_, n)| n.kcal).sum();
        assert!(close(kcal, meal.totals.kcal));
        assert!(close(leaves[0].1.kcal, 1628.0 * 0.25 * 6.0));
        assert!(close(leaves[2].1.carbs_g, 15.0));
    }

    #[test]
    fn test_blame_zero_component_is_zero_percent() {
        let mut log = kitchen();
        log.record_consumption(0.0, "water", 1.0).unwrap();
        log.record_consumption(1.0, "sugar", 10.0).unwrap();
        let blame = log.finish(DAY).blame(Granularity::Ingredient).unwrap();

        assert!(blame.fat.iter().all(|c| c.percent == 0.0));
        // Equal shares rank by name.
        let fat_names: Vec<&str> = blame.fat.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(fat_names, ["sugar", "water"]);
        assert_eq!(blame.carbs[0].name, "sugar");
        assert!(close(blame.carbs[0].percent, 100.0));
    }

    #[test]
    fn test_blame_empty_window() {
        let db = kitchen().finish(DAY);
        assert_eq!(db.blame_meals(), Blame::default());
        assert_eq!(db.blame_ingredients().unwrap(), Blame::default());
    }

    #[test]
    fn test_time_series_daily() {
        let mut log = kitchen();
        // Noon on three consecutive days, nothing on the fourth.
        for day in 0..3 {
            log.record_consumption(f64::from(day) * DAY + DAY / 2.0, "boxmac", f64::from(day + 1))
                .unwrap();
        }
        let db = log.finish(3.5 * DAY);
        let rows: Vec<TimeSeriesRow> = db.time_series(&Utc, 1.0, 1.0).unwrap().collect();

        assert_eq!(rows.len(), 4);
        assert!(close(rows[0].time, 0.0));
        assert!(close(rows[3].time, 3.0 * DAY));
        let kcal: Vec<f64> = rows.iter().map(|r| r.kcal).collect();
        assert_eq!(kcal, [250.0, 500.0, 750.0, 0.0]);
        assert!(close(rows[1].fat_pct, db.total_stats().fat_pct));
    }

    #[test]
    fn test_time_series_trailing_average() {
        let mut log = kitchen();
        for day in 0..4 {
            log.record_consumption(f64::from(day) * DAY + 60.0, "boxmac", 2.0)
                .unwrap();
        }
        let db = log.finish(4.0 * DAY);
        let mut series = db.time_series(&Utc, 1.0, 2.0).unwrap();
        let first: Vec<f64> = series.by_ref().map(|r| r.kcal).collect();
        // Day 0's trailing window reaches back before the first meal.
        assert_eq!(first, [250.0, 500.0, 500.0, 500.0]);

        series.restart();
        assert_eq!(series.count(), 4);
    }

    #[test]
    fn test_time_series_starts_at_midnight() {
        let mut log = kitchen();
        log.record_consumption(10.0 * DAY + 5000.0, "boxmac", 1.0).unwrap();
        let db = log.finish(11.0 * DAY);
        let rows: Vec<TimeSeriesRow> = db.time_series(&Utc, 1.0, 1.0).unwrap().collect();
        assert_eq!(rows.len(), 1);
        assert!(close(rows[0].time, 10.0 * DAY));
        assert!(close(rows[0].kcal, 250.0));
    }

    #[test]
    fn test_time_series_rejects_bad_step() {
        let db = kitchen().finish(DAY);
        assert!(matches!(
            db.time_series(&Utc, 0.0, 1.0),
            Err(FoodError::InvalidQuantity(_))
        ));
        assert!(db.time_series(&Utc, 1.0, -1.0).is_err());
    }

    #[test]
    fn test_time_series_rejects_unbounded_window() {
        let db = kitchen().finish(DAY);
        for (begin, end) in [
            (0.0, f64::INFINITY),
            (f64::NAN, 100.0),
            (f64::NEG_INFINITY, DAY),
            (0.0, f64::NAN),
        ] {
            let view = db.filtered_range(begin, end);
            assert!(matches!(
                view.time_series(&Utc, 1.0, 1.0),
                Err(FoodError::InvalidQuantity(_))
            ));
        }
        assert_eq!(db.time_series(&Utc, 1.0, 1.0).unwrap().count(), 1);
    }
}
