//! Deadline date arithmetic
//!
//! Computes a deadline date from a trigger date following FRCP 6(a):
//! the trigger day is excluded, the period is counted in calendar, business
//! or court days, and a landing day on a weekend or holiday continues to the
//! next day that is neither. Periods measured before an event (negative
//! offsets) count backward; their landing day still rolls forward unless that
//! would reach the trigger, in which case it rolls backward instead.
//! Service-method extensions (FRCP 6(d) and state analogues) are added to the
//! period before counting.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use shared_types::{
    AuditEntry, AuditStep, CalculationInput, CalculationResult, CountingMethod, EngineConfig,
    EngineError, ServiceMethod, ServiceMethodRule, ZeroDayPolicy,
};

use super::holiday_calendar::HolidayCalendar;
use super::jurisdiction_graph::JurisdictionGraph;

const SHORT_PERIOD_THRESHOLD: i32 = 14;

/// Check if a date is a weekend.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

// ─── Service extensions ────────────────────────────────────────

/// Extension days per (jurisdiction, service method).
#[derive(Debug, Default)]
pub struct ServiceExtensions {
    days: HashMap<(String, ServiceMethod), i32>,
}

impl ServiceExtensions {
    pub fn new(rules: &[ServiceMethodRule]) -> Result<Self, EngineError> {
        let mut days = HashMap::new();
        for rule in rules {
            if rule.additional_days < 0 {
                return Err(EngineError::invalid_reference(
                    format!(
                        "Service rule for {:?} in '{}' has negative extension {}",
                        rule.method, rule.jurisdiction_code, rule.additional_days
                    ),
                    vec![rule.jurisdiction_code.clone()],
                ));
            }
            let key = (rule.jurisdiction_code.clone(), rule.method);
            if days.insert(key, rule.additional_days).is_some() {
                return Err(EngineError::invalid_reference(
                    format!(
                        "Service rule for {:?} in '{}' is defined more than once",
                        rule.method, rule.jurisdiction_code
                    ),
                    vec![rule.jurisdiction_code.clone()],
                ));
            }
        }
        Ok(Self { days })
    }

    /// Extension days for a method in a jurisdiction. The nearest
    /// jurisdiction in the lineage that defines the method wins; no rule
    /// anywhere means no extension.
    pub fn additional_days(
        &self,
        graph: &JurisdictionGraph,
        jurisdiction_code: &str,
        method: ServiceMethod,
    ) -> i32 {
        graph
            .lineage(jurisdiction_code)
            .into_iter()
            .find_map(|j| self.days.get(&(j.code.clone(), method)).copied())
            .unwrap_or(0)
    }
}

// ─── Calculator ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn word(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}

/// Mutable bookkeeping for one calculation.
struct Trail {
    log: Vec<AuditEntry>,
    weekend_days: u32,
    holidays: u32,
    iterations: u32,
    max_iterations: u32,
}

impl Trail {
    fn push(&mut self, step: AuditStep, date: NaiveDate, detail: String) {
        self.log.push(AuditEntry { step, date, detail });
    }

    fn tick(&mut self) -> Result<(), EngineError> {
        self.iterations += 1;
        if self.iterations > self.max_iterations {
            return Err(EngineError::date_out_of_range(format!(
                "Calculation exceeded {} day steps",
                self.max_iterations
            )));
        }
        Ok(())
    }
}

/// Holiday-aware deadline calculator for one reference snapshot.
pub struct DateCalculator<'a> {
    graph: &'a JurisdictionGraph,
    calendar: &'a HolidayCalendar,
    service: &'a ServiceExtensions,
    config: &'a EngineConfig,
}

impl<'a> DateCalculator<'a> {
    pub fn new(
        graph: &'a JurisdictionGraph,
        calendar: &'a HolidayCalendar,
        service: &'a ServiceExtensions,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            graph,
            calendar,
            service,
            config,
        }
    }

    /// Compute a deadline date and its audit trail.
    #[tracing::instrument(skip(self), fields(jurisdiction = %input.jurisdiction_code))]
    pub fn calculate(&self, input: &CalculationInput) -> Result<CalculationResult, EngineError> {
        let code = input.jurisdiction_code.as_str();
        if self.graph.jurisdiction(code).is_none() {
            return Err(EngineError::unknown_jurisdiction(code));
        }

        let mut trail = Trail {
            log: Vec::new(),
            weekend_days: 0,
            holidays: 0,
            iterations: 0,
            max_iterations: self.config.max_iterations,
        };
        trail.push(
            AuditStep::Start,
            input.trigger_date,
            format!(
                "Trigger date {} ({}); {} {} in {}",
                input.trigger_date,
                input.trigger_date.weekday(),
                input.day_count,
                input.counting_method.as_str(),
                code
            ),
        );

        // Step 1: service-method extension, added before counting
        let service_days = match input.service_method {
            Some(method) => self.service.additional_days(self.graph, code, method),
            None => 0,
        };
        if let Some(method) = input.service_method {
            if service_days > 0 {
                trail.push(
                    AuditStep::ApplyServiceDays,
                    input.trigger_date,
                    format!(
                        "Service by {:?}: +{} days added to base period of {} days",
                        method, service_days, input.day_count
                    ),
                );
            }
        }
        let total = input.day_count.checked_add(service_days).ok_or_else(|| {
            EngineError::date_out_of_range(format!(
                "Period of {} days plus {} service days overflows",
                input.day_count, service_days
            ))
        })?;

        // Step 2: count the period
        let raw_date = match input.counting_method {
            CountingMethod::CalendarDays => add_days(input.trigger_date, total)?,
            CountingMethod::BusinessDays => {
                self.step_days(code, input.trigger_date, total, false, &mut trail)?
            }
            CountingMethod::CourtDays => {
                self.step_days(code, input.trigger_date, total, true, &mut trail)?
            }
        };

        // Step 3: roll off weekends and holidays
        let direction = self.rollover_direction(code, input.trigger_date, raw_date, total)?;
        let deadline_date = if total == 0 && self.config.zero_day_policy == ZeroDayPolicy::AsIs {
            raw_date
        } else {
            self.roll(code, raw_date, direction, &mut trail)?
        };

        trail.push(
            AuditStep::Final,
            deadline_date,
            if deadline_date != raw_date {
                format!(
                    "Landing day {} was not a business day; deadline rolled {} to {} ({})",
                    raw_date,
                    direction.word(),
                    deadline_date,
                    deadline_date.weekday()
                )
            } else {
                format!("Deadline {} ({})", deadline_date, deadline_date.weekday())
            },
        );

        tracing::debug!(
            total,
            %raw_date,
            %deadline_date,
            weekend_days = trail.weekend_days,
            holidays = trail.holidays,
            "deadline calculated"
        );

        Ok(CalculationResult {
            trigger_date: input.trigger_date,
            raw_date,
            deadline_date,
            day_count: input.day_count,
            service_days_added: service_days,
            total_days: total,
            counting_method: input.counting_method,
            weekend_days_skipped: trail.weekend_days,
            holidays_skipped: trail.holidays,
            is_short_period: total.abs() <= SHORT_PERIOD_THRESHOLD,
            audit_log: trail.log,
        })
    }

    /// Whether a date is a weekend or a holiday in the jurisdiction.
    pub fn is_non_business_day(&self, jurisdiction_code: &str, date: NaiveDate) -> bool {
        is_weekend(date) || self.calendar.is_holiday(jurisdiction_code, date)
    }

    /// The date itself if it is a business day, else the next one.
    pub fn next_business_day(
        &self,
        jurisdiction_code: &str,
        date: NaiveDate,
    ) -> Result<NaiveDate, EngineError> {
        self.scan(jurisdiction_code, date, 1)
    }

    /// The date itself if it is a business day, else the previous one.
    pub fn previous_business_day(
        &self,
        jurisdiction_code: &str,
        date: NaiveDate,
    ) -> Result<NaiveDate, EngineError> {
        self.scan(jurisdiction_code, date, -1)
    }

    fn scan(&self, code: &str, date: NaiveDate, step: i64) -> Result<NaiveDate, EngineError> {
        let mut current = date;
        let mut iterations = 0;
        while self.is_non_business_day(code, current) {
            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err(EngineError::date_out_of_range(format!(
                    "No business day within {} days of {}",
                    self.config.max_iterations, date
                )));
            }
            current = add_days(current, step as i32)?;
        }
        Ok(current)
    }

    /// Count `total` business days from `start`, skipping weekends (and
    /// holidays when `skip_holidays`). Negative totals count backward.
    fn step_days(
        &self,
        code: &str,
        start: NaiveDate,
        total: i32,
        skip_holidays: bool,
        trail: &mut Trail,
    ) -> Result<NaiveDate, EngineError> {
        let step = if total < 0 { -1 } else { 1 };
        let mut remaining = total.unsigned_abs();
        let mut current = start;
        while remaining > 0 {
            trail.tick()?;
            current = add_days(current, step)?;
            if is_weekend(current) {
                trail.weekend_days += 1;
                trail.push(
                    AuditStep::SkipWeekend,
                    current,
                    format!("{} ({}) not counted", current, current.weekday()),
                );
                continue;
            }
            if skip_holidays {
                if let Some(name) = self.calendar.holiday_name(code, current) {
                    trail.holidays += 1;
                    trail.push(
                        AuditStep::SkipHoliday,
                        current,
                        format!("{} ({}) not counted", current, name),
                    );
                    continue;
                }
            }
            remaining -= 1;
        }
        Ok(current)
    }

    /// Rollover goes forward. A retrograde deadline must stay strictly before
    /// its trigger, so when the forward roll would reach the trigger it goes
    /// backward instead.
    fn rollover_direction(
        &self,
        code: &str,
        trigger: NaiveDate,
        raw_date: NaiveDate,
        total: i32,
    ) -> Result<Direction, EngineError> {
        if total >= 0 {
            return Ok(Direction::Forward);
        }
        if self.next_business_day(code, raw_date)? >= trigger {
            tracing::debug!(%raw_date, %trigger, "forward roll reaches trigger, rolling backward");
            Ok(Direction::Backward)
        } else {
            Ok(Direction::Forward)
        }
    }

    /// Move off weekends and holidays until a business day is reached.
    /// A rolled-to date may itself be a holiday, so this iterates.
    fn roll(
        &self,
        code: &str,
        date: NaiveDate,
        direction: Direction,
        trail: &mut Trail,
    ) -> Result<NaiveDate, EngineError> {
        let step = match direction {
            Direction::Forward => 1,
            Direction::Backward => -1,
        };
        let mut current = date;
        loop {
            if is_weekend(current) {
                trail.weekend_days += 1;
                trail.push(
                    AuditStep::SkipWeekend,
                    current,
                    format!(
                        "Landing day {} falls on {}; continuing {}",
                        current,
                        current.weekday(),
                        direction.word()
                    ),
                );
            } else if let Some(name) = self.calendar.holiday_name(code, current) {
                trail.holidays += 1;
                trail.push(
                    AuditStep::SkipHoliday,
                    current,
                    format!(
                        "Landing day {} is {}; continuing {}",
                        current,
                        name,
                        direction.word()
                    ),
                );
            } else {
                return Ok(current);
            }
            trail.tick()?;
            current = add_days(current, step)?;
        }
    }
}

fn add_days(date: NaiveDate, days: i32) -> Result<NaiveDate, EngineError> {
    date.checked_add_signed(Duration::days(days as i64))
        .ok_or_else(|| {
            EngineError::date_out_of_range(format!("Adding {} days to {} overflows", days, date))
        })
}
