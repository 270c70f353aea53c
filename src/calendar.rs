/*
 * EpiRust
 * Copyright (c) 2020  ThoughtWorks, Inc.
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 *
 */

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use serde::Deserialize;

use crate::error::Result;

/// The day-index + Gregorian date, plus holiday/school-holiday predicates.
#[derive(Debug, Clone)]
pub struct Calendar {
    day: u32,
    date: NaiveDate,
    holidays: HashSet<NaiveDate>,
    school_holidays: HashSet<NaiveDate>,
}

impl Calendar {
    pub fn new(start_date: NaiveDate, holidays: HashSet<NaiveDate>, school_holidays: HashSet<NaiveDate>) -> Calendar {
        Calendar { day: 0, date: start_date, holidays, school_holidays }
    }

    /// Builds a calendar with no holidays at all, for tests and the `None`/`All` policies.
    pub fn without_holidays(start_date: NaiveDate) -> Calendar {
        Calendar::new(start_date, HashSet::new(), HashSet::new())
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn is_weekend(&self) -> bool {
        use chrono::Datelike;
        matches!(self.date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
    }

    pub fn is_holiday(&self) -> bool {
        self.holidays.contains(&self.date)
    }

    pub fn is_school_holiday(&self) -> bool {
        self.school_holidays.contains(&self.date)
    }

    pub fn advance_day(&mut self) {
        self.day += 1;
        self.date += Duration::days(1);
    }
}

/// Parsed form of the Holiday JSON described in spec §6:
/// `year`; `general.<month>` and `school.<month>` lists of day-of-month numbers.
#[derive(Debug, Deserialize)]
pub struct HolidayFile {
    pub year: i32,
    pub general: std::collections::BTreeMap<String, Vec<u32>>,
    pub school: std::collections::BTreeMap<String, Vec<u32>>,
}

impl HolidayFile {
    pub fn from_json(json: &str) -> Result<HolidayFile> {
        Ok(serde_json::from_str(json)?)
    }

    /// Assembles the `general`/`school` day lists into concrete dates for this file's year.
    pub fn into_dates(self) -> (HashSet<NaiveDate>, HashSet<NaiveDate>) {
        let general = Self::assemble(self.year, &self.general);
        let school = Self::assemble(self.year, &self.school);
        (general, school)
    }

    fn assemble(year: i32, by_month: &std::collections::BTreeMap<String, Vec<u32>>) -> HashSet<NaiveDate> {
        let mut dates = HashSet::new();
        for month in 1..=12u32 {
            if let Some(days) = by_month.get(&month.to_string()) {
                for &day in days {
                    if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                        dates.insert(date);
                    }
                }
            }
        }
        dates
    }
}

/// One of the four presence policies named in spec §4.J point 2, grounded on
/// the original engine's `DaysOffStandard`/`DaysOffAll`/`DaysOffNone`/`DaysOffSchool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DaysOffPolicy {
    Standard,
    All,
    None,
    School,
}

impl DaysOffPolicy {
    pub fn is_work_off(&self, calendar: &Calendar) -> bool {
        match self {
            DaysOffPolicy::Standard => calendar.is_weekend() || calendar.is_holiday(),
            DaysOffPolicy::All => true,
            DaysOffPolicy::None => false,
            DaysOffPolicy::School => calendar.is_weekend() || calendar.is_holiday(),
        }
    }

    pub fn is_school_off(&self, calendar: &Calendar) -> bool {
        match self {
            DaysOffPolicy::Standard => self.is_work_off(calendar) || calendar.is_school_holiday(),
            DaysOffPolicy::All => true,
            DaysOffPolicy::None => false,
            DaysOffPolicy::School => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn advance_day_increments_counter_and_date() {
        let mut cal = Calendar::without_holidays(date(2016, 1, 1));
        cal.advance_day();
        assert_eq!(cal.day(), 1);
        assert_eq!(cal.date(), date(2016, 1, 2));
    }

    #[test]
    fn weekend_detection() {
        let cal = Calendar::without_holidays(date(2016, 1, 2)); // a Saturday
        assert!(cal.is_weekend());
        let cal = Calendar::without_holidays(date(2016, 1, 4)); // a Monday
        assert!(!cal.is_weekend());
    }

    #[test]
    fn holiday_file_assembles_dates() {
        let json = r#"{
            "year": 2016,
            "general": {"1": [1, 6], "12": [25]},
            "school": {"7": [1, 2, 3]}
        }"#;
        let file = HolidayFile::from_json(json).unwrap();
        let (general, school) = file.into_dates();
        assert!(general.contains(&date(2016, 1, 1)));
        assert!(general.contains(&date(2016, 12, 25)));
        assert!(school.contains(&date(2016, 7, 2)));
        assert!(!general.contains(&date(2016, 7, 2)));
    }

    #[test]
    fn standard_policy_matches_weekend_and_holiday() {
        let cal = Calendar::without_holidays(date(2016, 1, 2));
        assert!(DaysOffPolicy::Standard.is_work_off(&cal));
        assert!(DaysOffPolicy::Standard.is_school_off(&cal));
    }

    #[test]
    fn all_policy_is_always_off() {
        let cal = Calendar::without_holidays(date(2016, 1, 4));
        assert!(DaysOffPolicy::All.is_work_off(&cal));
        assert!(DaysOffPolicy::All.is_school_off(&cal));
    }

    #[test]
    fn none_policy_is_never_off() {
        let cal = Calendar::without_holidays(date(2016, 1, 2));
        assert!(!DaysOffPolicy::None.is_work_off(&cal));
        assert!(!DaysOffPolicy::None.is_school_off(&cal));
    }

    #[test]
    fn school_policy_is_always_school_off_but_work_follows_standard() {
        let cal = Calendar::without_holidays(date(2016, 1, 4)); // a Monday, no holiday
        assert!(!DaysOffPolicy::School.is_work_off(&cal));
        assert!(DaysOffPolicy::School.is_school_off(&cal));
    }
}
