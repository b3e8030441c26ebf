//! Jurisdiction holiday calendars
//!
//! Expands recurring holiday definitions into concrete observed dates per
//! (jurisdiction, year). A jurisdiction's calendar stacks the holidays of
//! every ancestor on top of its own, so a county court observes the state
//! and federal holidays above it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{Datelike, NaiveDate, Weekday};
use shared_types::{
    EngineError, Holiday, HolidayRule, HolidayScope, JurisdictionType, ObservedHoliday,
    ReferenceData,
};

use super::jurisdiction_graph::JurisdictionGraph;

/// Observed holidays of one jurisdiction for one calendar year.
#[derive(Debug, Clone, Default)]
pub struct HolidaySet {
    year: i32,
    days: HashMap<NaiveDate, String>,
}

impl HolidaySet {
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            days: HashMap::new(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    pub fn name_of(&self, date: NaiveDate) -> Option<&str> {
        self.days.get(&date).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Holidays sorted by date.
    pub fn to_sorted_vec(&self) -> Vec<ObservedHoliday> {
        let mut out: Vec<ObservedHoliday> = self
            .days
            .iter()
            .map(|(date, name)| ObservedHoliday {
                date: *date,
                name: name.clone(),
            })
            .collect();
        out.sort_by_key(|h| h.date);
        out
    }
}

/// Holiday lookup for every jurisdiction in a reference snapshot.
///
/// Per-year sets are memoized. The cache is derived data: callers that swap
/// reference data build a new calendar or call [`HolidayCalendar::clear_cache`].
#[derive(Debug)]
pub struct HolidayCalendar {
    by_jurisdiction: HashMap<String, Vec<Holiday>>,
    by_type: HashMap<JurisdictionType, Vec<Holiday>>,
    /// For each jurisdiction, itself followed by its ancestors.
    lineage: HashMap<String, Vec<(String, JurisdictionType)>>,
    memoize: bool,
    cache: RwLock<HashMap<(String, i32), Arc<HolidaySet>>>,
}

impl HolidayCalendar {
    /// Validate every holiday rule and index them by scope.
    pub fn new(
        reference: &ReferenceData,
        graph: &JurisdictionGraph,
        memoize: bool,
    ) -> Result<Self, EngineError> {
        let mut by_jurisdiction: HashMap<String, Vec<Holiday>> = HashMap::new();
        let mut by_type: HashMap<JurisdictionType, Vec<Holiday>> = HashMap::new();

        for holiday in &reference.holidays {
            validate_rule(holiday)?;
            match &holiday.scope {
                HolidayScope::Jurisdiction { code } => {
                    if graph.jurisdiction(code).is_none() {
                        tracing::debug!(holiday = %holiday.name, code = %code, "holiday scoped to unknown jurisdiction");
                    }
                    by_jurisdiction
                        .entry(code.clone())
                        .or_default()
                        .push(holiday.clone());
                }
                HolidayScope::JurisdictionType { jurisdiction_type } => {
                    by_type
                        .entry(*jurisdiction_type)
                        .or_default()
                        .push(holiday.clone());
                }
            }
        }

        let lineage = graph
            .jurisdiction_codes()
            .map(|code| {
                let chain = graph
                    .lineage(code)
                    .into_iter()
                    .map(|j| (j.code.clone(), j.jurisdiction_type))
                    .collect();
                (code.to_string(), chain)
            })
            .collect();

        Ok(Self {
            by_jurisdiction,
            by_type,
            lineage,
            memoize,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Observed holidays for a jurisdiction and year, including inherited ones.
    ///
    /// An unknown jurisdiction yields an empty set.
    pub fn holidays_for(&self, jurisdiction_code: &str, year: i32) -> Arc<HolidaySet> {
        let key = (jurisdiction_code.to_string(), year);
        if self.memoize {
            if let Ok(cache) = self.cache.read() {
                if let Some(set) = cache.get(&key) {
                    return Arc::clone(set);
                }
            }
        }

        let set = Arc::new(self.build_year(jurisdiction_code, year));

        if self.memoize {
            if let Ok(mut cache) = self.cache.write() {
                cache.insert(key, Arc::clone(&set));
            }
        }
        set
    }

    pub fn is_holiday(&self, jurisdiction_code: &str, date: NaiveDate) -> bool {
        self.holidays_for(jurisdiction_code, date.year())
            .contains(date)
    }

    pub fn holiday_name(&self, jurisdiction_code: &str, date: NaiveDate) -> Option<String> {
        self.holidays_for(jurisdiction_code, date.year())
            .name_of(date)
            .map(|s| s.to_string())
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    fn build_year(&self, jurisdiction_code: &str, year: i32) -> HolidaySet {
        let Some(chain) = self.lineage.get(jurisdiction_code) else {
            tracing::debug!(jurisdiction = jurisdiction_code, year, "no calendar for unknown jurisdiction");
            return HolidaySet::empty(year);
        };

        let mut set = HolidaySet::empty(year);
        for (code, jurisdiction_type) in chain {
            let scoped = self.by_jurisdiction.get(code).into_iter().flatten();
            let typed = self.by_type.get(jurisdiction_type).into_iter().flatten();
            for holiday in scoped.chain(typed) {
                // Observance can pull a neighbouring year's holiday across
                // the boundary (Jan 1 on a Saturday is observed Dec 31).
                for source_year in [year - 1, year, year + 1] {
                    if let Some(date) = occurrence(holiday, source_year) {
                        if date.year() == year {
                            set.days.entry(date).or_insert_with(|| holiday.name.clone());
                        }
                    }
                }
            }
        }
        set
    }
}

/// Reject recurrence rules that can never produce a date.
fn validate_rule(holiday: &Holiday) -> Result<(), EngineError> {
    let bad = |reason: String| {
        Err(EngineError::invalid_holiday(
            format!("Holiday '{}' has a malformed rule: {}", holiday.name, reason),
            holiday.name.clone(),
        ))
    };
    match &holiday.rule {
        HolidayRule::Fixed { month, day } => {
            if !(1..=12).contains(month) {
                return bad(format!("month {} out of range", month));
            }
            // Leap year so that Feb 29 is accepted.
            if NaiveDate::from_ymd_opt(2000, *month, *day).is_none() {
                return bad(format!("day {} does not exist in month {}", day, month));
            }
        }
        HolidayRule::NthWeekday { month, n, .. } => {
            if !(1..=12).contains(month) {
                return bad(format!("month {} out of range", month));
            }
            if !(1..=5).contains(n) {
                return bad(format!("occurrence {} must be between 1 and 5", n));
            }
        }
        HolidayRule::LastWeekday { month, .. } => {
            if !(1..=12).contains(month) {
                return bad(format!("month {} out of range", month));
            }
        }
        HolidayRule::Date { .. } => {}
    }
    Ok(())
}

/// The observed date of a holiday's occurrence in `year`, if it has one.
fn occurrence(holiday: &Holiday, year: i32) -> Option<NaiveDate> {
    match &holiday.rule {
        HolidayRule::Fixed { month, day } => {
            let actual = NaiveDate::from_ymd_opt(year, *month, *day)?;
            Some(if holiday.observe_weekend {
                observed_date(actual)
            } else {
                actual
            })
        }
        HolidayRule::NthWeekday { month, weekday, n } => {
            nth_weekday_of_month(year, *month, *weekday, *n)
        }
        HolidayRule::LastWeekday { month, weekday } => last_weekday_of_month(year, *month, *weekday),
        HolidayRule::Date { date } if holiday.recurring => {
            let actual = NaiveDate::from_ymd_opt(year, date.month(), date.day())?;
            Some(if holiday.observe_weekend {
                observed_date(actual)
            } else {
                actual
            })
        }
        HolidayRule::Date { date } => (date.year() == year).then_some(*date),
    }
}

/// Compute the nth occurrence of a given weekday in a month.
/// `None` when the month has fewer than `n` such weekdays.
pub fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
    if n == 0 {
        return None;
    }
    let first_of_month = NaiveDate::from_ymd_opt(year, month, 1)?;
    let days_ahead = (weekday.num_days_from_monday() as i32
        - first_of_month.weekday().num_days_from_monday() as i32
        + 7)
        % 7;
    let day = 1 + days_ahead as u32 + (n - 1) * 7;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Compute the last occurrence of a given weekday in a month.
pub fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last_of_month = next_month.pred_opt()?;
    let days_back = (last_of_month.weekday().num_days_from_monday() as i32
        - weekday.num_days_from_monday() as i32
        + 7)
        % 7;
    NaiveDate::from_ymd_opt(year, month, last_of_month.day() - days_back as u32)
}

/// Weekend observance: Saturday -> preceding Friday, Sunday -> following Monday.
pub fn observed_date(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date.pred_opt().unwrap_or(date),
        Weekday::Sun => date.succ_opt().unwrap_or(date),
        _ => date,
    }
}

/// The eleven U.S. federal holidays (5 U.S.C. 6103), scoped to federal
/// jurisdictions.
pub fn federal_holidays() -> Vec<Holiday> {
    let scope = || HolidayScope::JurisdictionType {
        jurisdiction_type: JurisdictionType::Federal,
    };
    vec![
        Holiday::fixed("New Year's Day", 1, 1, scope()),
        Holiday::nth_weekday("Martin Luther King Jr. Day", 1, Weekday::Mon, 3, scope()),
        Holiday::nth_weekday("Presidents' Day", 2, Weekday::Mon, 3, scope()),
        Holiday::last_weekday("Memorial Day", 5, Weekday::Mon, scope()),
        Holiday::fixed("Juneteenth", 6, 19, scope()),
        Holiday::fixed("Independence Day", 7, 4, scope()),
        Holiday::nth_weekday("Labor Day", 9, Weekday::Mon, 1, scope()),
        Holiday::nth_weekday("Columbus Day", 10, Weekday::Mon, 2, scope()),
        Holiday::fixed("Veterans Day", 11, 11, scope()),
        Holiday::nth_weekday("Thanksgiving Day", 11, Weekday::Thu, 4, scope()),
        Holiday::fixed("Christmas Day", 12, 25, scope()),
    ]
}
