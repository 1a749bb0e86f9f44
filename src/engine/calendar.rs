//! Calendar timeline - working days mapped to dates, plus weather days

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::engine::scheduler::Schedule;

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    Work,
    Weather,
}

/// One day on the job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    /// 1-based working day number
    pub day: u32,
    pub date: NaiveDate,
    pub kind: DayKind,
    /// Activities working that day
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<String>,
}

/// Day-by-day timeline for an estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub work_days: u32,
    pub weather_days: u32,
    /// Elapsed calendar days including skipped weekends
    pub calendar_days: u32,
    pub days: Vec<CalendarDay>,
}

impl Timeline {
    /// A timeline with no days
    pub fn empty(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date: start_date,
            work_days: 0,
            weather_days: 0,
            calendar_days: 0,
            days: Vec::new(),
        }
    }
}

fn is_workday(date: NaiveDate, work_weekends: bool) -> bool {
    work_weekends || !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn next_workday(mut date: NaiveDate, work_weekends: bool) -> NaiveDate {
    while !is_workday(date, work_weekends) {
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    date
}

/// Lay the schedule onto working dates starting at `start`
pub fn build_timeline(
    schedule: &Schedule,
    start: NaiveDate,
    weather_days: u32,
    work_weekends: bool,
) -> Timeline {
    let work_days = schedule.work_days();
    let start_date = next_workday(start, work_weekends);

    let mut days = Vec::with_capacity((work_days + weather_days) as usize);
    let mut date = start_date;
    for i in 0..work_days + weather_days {
        if i > 0 {
            date = match date.succ_opt() {
                Some(next) => next_workday(next, work_weekends),
                None => break,
            };
        }

        let (kind, activities) = if i < work_days {
            let lo = i as f64;
            let hi = lo + 1.0;
            let active = schedule
                .entries
                .iter()
                .filter(|e| e.duration > 0.0 && e.early_start < hi - EPS && e.early_finish > lo + EPS)
                .map(|e| e.id.clone())
                .collect();
            (DayKind::Work, active)
        } else {
            (DayKind::Weather, Vec::new())
        };

        days.push(CalendarDay {
            day: i + 1,
            date,
            kind,
            activities,
        });
    }

    let end_date = days.last().map(|d| d.date).unwrap_or(start_date);
    let calendar_days = if days.is_empty() {
        0
    } else {
        (end_date - start_date).num_days() as u32 + 1
    };

    Timeline {
        start_date,
        end_date,
        work_days,
        weather_days,
        calendar_days,
        days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scheduler::{schedule, Task};
    use crate::entities::activity::Precedence;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 6).unwrap()
    }

    fn sample() -> Schedule {
        schedule(&[
            Task::new("A", 2.0),
            Task::new("B", 1.5).with_dependency("A", Precedence::FinishStart, 0.0),
        ])
    }

    #[test]
    fn test_days_and_activities() {
        let t = build_timeline(&sample(), monday(), 0, false);
        // 3.5 days -> 4 work days
        assert_eq!(t.work_days, 4);
        assert_eq!(t.days.len(), 4);
        assert_eq!(t.days[0].activities, vec!["A"]);
        assert_eq!(t.days[2].activities, vec!["B"]);
        assert_eq!(t.days[3].activities, vec!["B"]);
        assert_eq!(t.end_date, NaiveDate::from_ymd_opt(2026, 4, 9).unwrap());
    }

    #[test]
    fn test_weekends_are_skipped() {
        let friday = NaiveDate::from_ymd_opt(2026, 4, 10).unwrap();
        let t = build_timeline(&sample(), friday, 1, false);
        assert_eq!(t.days.len(), 5);
        assert_eq!(t.days[1].date, NaiveDate::from_ymd_opt(2026, 4, 13).unwrap());
        assert_eq!(t.days[4].kind, DayKind::Weather);
        // Fri..Thu
        assert_eq!(t.calendar_days, 7);
    }

    #[test]
    fn test_weekend_start_moves_to_monday() {
        let saturday = NaiveDate::from_ymd_opt(2026, 4, 11).unwrap();
        let t = build_timeline(&sample(), saturday, 0, false);
        assert_eq!(t.start_date, NaiveDate::from_ymd_opt(2026, 4, 13).unwrap());

        let t = build_timeline(&sample(), saturday, 0, true);
        assert_eq!(t.start_date, saturday);
        assert_eq!(t.calendar_days, 4);
    }

    #[test]
    fn test_empty_schedule() {
        let t = build_timeline(&Schedule::default(), monday(), 0, false);
        assert!(t.days.is_empty());
        assert_eq!(t.calendar_days, 0);

        let t = build_timeline(&Schedule::default(), monday(), 2, false);
        assert_eq!(t.days.len(), 2);
        assert!(t.days.iter().all(|d| d.kind == DayKind::Weather));
    }
}
