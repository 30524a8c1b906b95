//! Observation frequency.

use std::fmt;
use std::str::FromStr;

use super::error::ScheduleError;

/// Observation frequency for autocallable schedules.
///
/// # Examples
///
/// ```
/// use pricer_models::schedules::Frequency;
///
/// assert_eq!(Frequency::SemiAnnual.months(), 6);
/// assert_eq!("quarterly".parse::<Frequency>().unwrap(), Frequency::Quarterly);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Frequency {
    /// Once per year.
    Annual,
    /// Twice per year.
    SemiAnnual,
    /// Four times per year.
    Quarterly,
    /// Twelve times per year.
    Monthly,
}

impl Frequency {
    /// Calendar months between observations.
    pub fn months(&self) -> u32 {
        match self {
            Frequency::Annual => 12,
            Frequency::SemiAnnual => 6,
            Frequency::Quarterly => 3,
            Frequency::Monthly => 1,
        }
    }

    /// Observations per year.
    pub fn per_year(&self) -> u32 {
        12 / self.months()
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Frequency::Annual => "Annual",
            Frequency::SemiAnnual => "Semi-Annual",
            Frequency::Quarterly => "Quarterly",
            Frequency::Monthly => "Monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Frequency {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "annual" | "yearly" | "12m" | "1y" => Ok(Frequency::Annual),
            "semiannual" | "6m" => Ok(Frequency::SemiAnnual),
            "quarterly" | "3m" => Ok(Frequency::Quarterly),
            "monthly" | "1m" => Ok(Frequency::Monthly),
            _ => Err(ScheduleError::UnknownFrequency(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_year() {
        assert_eq!(Frequency::Annual.per_year(), 1);
        assert_eq!(Frequency::SemiAnnual.per_year(), 2);
        assert_eq!(Frequency::Quarterly.per_year(), 4);
        assert_eq!(Frequency::Monthly.per_year(), 12);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("Semi-Annual".parse::<Frequency>().unwrap(), Frequency::SemiAnnual);
        assert_eq!("6M".parse::<Frequency>().unwrap(), Frequency::SemiAnnual);
        assert!("fortnightly".parse::<Frequency>().is_err());
    }
}
