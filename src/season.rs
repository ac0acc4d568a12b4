use std::fmt;
use std::iter;

use chrono::{Datelike, NaiveDate};

/// Quarterly premiere window used by the catalog to group titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub(crate) fn from_month(month: u32) -> Self {
        match month {
            1..=3 => Season::Winter,
            4..=6 => Season::Spring,
            7..=9 => Season::Summer,
            _ => Season::Fall,
        }
    }

    /// Lowercase name, as used in catalog URLs.
    pub(crate) fn slug(self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A (year, season) pair. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct SeasonId {
    pub(crate) year: i32,
    pub(crate) season: Season,
}

impl SeasonId {
    pub(crate) fn new(year: i32, season: Season) -> Self {
        Self { year, season }
    }

    /// Season enclosing `date`; boundaries follow calendar quarters.
    pub(crate) fn containing(date: NaiveDate) -> Self {
        Self::new(date.year(), Season::from_month(date.month()))
    }

    pub(crate) fn previous(self) -> Self {
        match self.season {
            Season::Winter => Self::new(self.year - 1, Season::Fall),
            Season::Spring => Self::new(self.year, Season::Winter),
            Season::Summer => Self::new(self.year, Season::Spring),
            Season::Fall => Self::new(self.year, Season::Summer),
        }
    }

    /// `count` seasons starting at `self` and walking back in time.
    pub(crate) fn walk_back(self, count: usize) -> impl Iterator<Item = SeasonId> {
        iter::successors(Some(self), |season| Some(season.previous())).take(count)
    }
}

impl fmt::Display for SeasonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.season, self.year)
    }
}
