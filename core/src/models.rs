use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Energy density of carbohydrate, kcal per gram.
pub const KCAL_PER_G_CARBS: f64 = 4.0;
/// Energy density of fat, kcal per gram.
pub const KCAL_PER_G_FAT: f64 = 9.0;
/// Energy density of protein, kcal per gram.
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// The four tracked quantities: energy plus the three macros in grams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    pub kcal: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub protein_g: f64,
}

impl Nutrients {
    #[must_use]
    pub fn new(kcal: f64, carbs_g: f64, fat_g: f64, protein_g: f64) -> Self {
        Self {
            kcal,
            carbs_g,
            fat_g,
            protein_g,
        }
    }

    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        Self {
            kcal: self.kcal * factor,
            carbs_g: self.carbs_g * factor,
            fat_g: self.fat_g * factor,
            protein_g: self.protein_g * factor,
        }
    }

    #[must_use]
    pub fn as_array(self) -> [f64; 4] {
        [self.kcal, self.carbs_g, self.fat_g, self.protein_g]
    }
}

impl std::ops::AddAssign for Nutrients {
    fn add_assign(&mut self, rhs: Self) {
        self.kcal += rhs.kcal;
        self.carbs_g += rhs.carbs_g;
        self.fat_g += rhs.fat_g;
        self.protein_g += rhs.protein_g;
    }
}

impl std::iter::Sum for Nutrients {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, n| {
            acc += n;
            acc
        })
    }
}

/// One `(child, amount)` edge of a composite ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub amount: f64,
}

impl Component {
    #[must_use]
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// A named food with nutrition expressed per one `unit`.
///
/// An empty `contents` makes it a primitive (leaf); otherwise it is a
/// composite whose children were all defined before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub unit: String,
    pub contents: Vec<Component>,
    pub per_unit: Nutrients,
}

impl Ingredient {
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.contents.is_empty()
    }

    /// Multiply every nutrition field and every child amount by `factor`.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            name: self.name.clone(),
            unit: self.unit.clone(),
            contents: self
                .contents
                .iter()
                .map(|c| Component::new(c.name.clone(), c.amount * factor))
                .collect(),
            per_unit: self.per_unit.scale(factor),
        }
    }

    /// Single-line rendering used by the dump report.
    #[must_use]
    pub fn dump_line(&self) -> String {
        let n = &self.per_unit;
        let contents = if self.contents.is_empty() {
            String::new()
        } else {
            let parts: Vec<String> = self
                .contents
                .iter()
                .map(|c| format!("{} {}", c.name, c.amount))
                .collect();
            format!(" = {}", parts.join(" + "))
        };
        format!(
            "{} [{}]{contents} kcal={:.1} carbs={:.2} fat={:.2} protein={:.2}",
            self.name, self.unit, n.kcal, n.carbs_g, n.fat_g, n.protein_g
        )
    }
}

/// A consumption event. `totals` is snapshotted when the event is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    /// Seconds since the Unix epoch.
    pub time: f64,
    pub ingredient: String,
    pub amount: f64,
    pub totals: Nutrients,
}

impl Meal {
    #[must_use]
    pub fn dump_line<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let when = to_datetime(self.time, tz).map_or_else(
            || format!("@{}", self.time),
            |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        let t = &self.totals;
        format!(
            "{when} {} x{} kcal={:.0} carbs={:.1} fat={:.1} protein={:.1}",
            self.ingredient, self.amount, t.kcal, t.carbs_g, t.fat_g, t.protein_g
        )
    }
}

/// Energy total and macro split for a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Stats {
    pub kcal: f64,
    pub carbs_pct: f64,
    pub fat_pct: f64,
    pub protein_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Culprit {
    pub name: String,
    pub percent: f64,
}

/// Four independently sorted leaderboards, highest share first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Blame {
    pub kcal: Vec<Culprit>,
    pub carbs: Vec<Culprit>,
    pub fat: Vec<Culprit>,
    pub protein: Vec<Culprit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Meal,
    Ingredient,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeSeriesRow {
    pub time: f64,
    pub kcal: f64,
    pub carbs_pct: f64,
    pub fat_pct: f64,
    pub protein_pct: f64,
}

/// Convert fractional epoch seconds into a zoned date-time.
pub fn to_datetime<Tz: TimeZone>(secs: f64, tz: &Tz) -> Option<DateTime<Tz>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    #[allow(clippy::cast_sign_loss)]
    let nanos = ((secs - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999)).map(|dt| dt.with_timezone(tz))
}

/// Epoch seconds of local midnight on the calendar day containing `secs`.
pub fn start_of_day<Tz: TimeZone>(secs: f64, tz: &Tz) -> Option<f64> {
    let dt = to_datetime(secs, tz)?;
    let midnight = dt.date_naive().and_hms_opt(0, 0, 0)?;
    let start = tz.from_local_datetime(&midnight).earliest()?;
    #[allow(clippy::cast_precision_loss)]
    Some(start.timestamp() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cheesy() -> Ingredient {
        Ingredient {
            name: "cheesy_mac".to_string(),
            unit: "serving".to_string(),
            contents: vec![Component::new("butter", 0.25), Component::new("boxmac", 1.5)],
            per_unit: Nutrients::new(782.0, 70.525, 50.5, 13.975),
        }
    }

    #[test]
    fn test_scale_ingredient() {
        let doubled = cheesy().scale(2.0);
        assert!((doubled.per_unit.kcal - 1564.0).abs() < f64::EPSILON);
        assert!((doubled.contents[0].amount - 0.5).abs() < f64::EPSILON);
        assert!((doubled.contents[1].amount - 3.0).abs() < f64::EPSILON);
        assert_eq!(doubled.name, "cheesy_mac");
        assert_eq!(doubled.unit, "serving");
    }

    #[test]
    fn test_scale_negative() {
        let neg = cheesy().scale(-1.0);
        assert!((neg.per_unit.fat_g + 50.5).abs() < f64::EPSILON);
        assert!((neg.contents[0].amount + 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_nutrients_sum() {
        let total: Nutrients = [Nutrients::new(1.0, 2.0, 3.0, 4.0); 3].into_iter().sum();
        assert_eq!(total.as_array(), [3.0, 6.0, 9.0, 12.0]);
    }

    #[test]
    fn test_ingredient_dump_line() {
        let mut mac = cheesy();
        mac.per_unit = Nutrients::new(782.0, 70.5, 50.5, 13.25);
        assert_eq!(
            mac.dump_line(),
            "cheesy_mac [serving] = butter 0.25 + boxmac 1.5 kcal=782.0 carbs=70.50 fat=50.50 protein=13.25"
        );

        let butter = Ingredient {
            name: "butter".to_string(),
            unit: "cup".to_string(),
            contents: Vec::new(),
            per_unit: Nutrients::new(1628.0, 0.1, 184.0, 1.9),
        };
        assert_eq!(
            butter.dump_line(),
            "butter [cup] kcal=1628.0 carbs=0.10 fat=184.00 protein=1.90"
        );
    }

    #[test]
    fn test_meal_dump_line() {
        let meal = Meal {
            time: 1_463_977_331.0,
            ingredient: "cheesy_mac".to_string(),
            amount: 2.0,
            totals: Nutrients::new(1564.2, 141.04, 101.0, 27.96),
        };
        assert_eq!(
            meal.dump_line(&Utc),
            "2016-05-23 04:22:11 cheesy_mac x2 kcal=1564 carbs=141.0 fat=101.0 protein=28.0"
        );
    }

    #[test]
    fn test_start_of_day_utc() {
        let start = start_of_day(1_463_977_331.5, &Utc).unwrap();
        assert!((start - 1_463_961_600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_to_datetime_fraction() {
        let dt = to_datetime(10.5, &Utc).unwrap();
        assert_eq!(dt.timestamp(), 10);
        assert_eq!(dt.timestamp_subsec_millis(), 500);
        assert!(to_datetime(f64::NAN, &Utc).is_none());
    }
}
