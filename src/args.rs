use std::path::PathBuf;

use chrono::naive::NaiveDate;
use clap::Parser;

use super::error::{Result,Error};
use super::grid::CalendarGrid;
use super::ontario::DateField;
use super::rate::WindowPolicy;


#[derive(Parser,Debug)]
#[clap(author, version, about = "Rolling COVID-19 case rates by Ontario public health unit",
       long_about = None)]
pub struct Args {
    /// First date of the calendar grid.
    #[clap(long, default_value = "2019-12-18")]
    pub start_date: NaiveDate,

    /// Last date of the calendar grid (default: today).
    #[clap(long)]
    pub end_date: Option<NaiveDate>,

    /// Number of days in a window.
    #[clap(long, default_value_t = 14)]
    pub window_days: usize,

    /// Which end of the grid loses the dates without a complete window.
    #[clap(long, value_enum, default_value_t = WindowPolicy::TrimLeading)]
    pub policy: WindowPolicy,

    /// Start the grid window_days - 1 days before start-date (trim-leading only).
    #[clap(long)]
    pub lead_in: bool,

    /// Line list column used as the event date.
    #[clap(long, value_enum, default_value_t = DateField::Episode)]
    pub date_field: DateField,

    /// Read the line list from this file instead of downloading it.
    #[clap(long)]
    pub input: Option<PathBuf>,

    /// CSV file (region,population) replacing the built-in populations.
    #[clap(long)]
    pub populations: Option<PathBuf>,

    #[clap(long, default_value = "graphs")]
    pub graph_path: PathBuf,

    #[clap(long, default_value = "cache")]
    pub cache_path: PathBuf,

    /// Region hidden when the graph opens. May be repeated.
    #[clap(long)]
    pub hidden: Vec<String>,
}

impl Args {
    pub fn rate_config(&self) -> RateConfig {
	RateConfig {
	    start_date: self.start_date,
	    end_date: self.end_date,
	    window_days: self.window_days,
	    policy: self.policy,
	    lead_in: self.lead_in,
	}
    }
}


/// Parameters of one rate computation.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct RateConfig {
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub window_days: usize,
    pub policy: WindowPolicy,
    pub lead_in: bool,
}

impl RateConfig {

    /// Builds the grid; without an explicit end date it runs up to today.
    /// The lead-in moves the first emitted date of a TrimLeading series onto
    /// the start date. Under TrimTrailing it would emit dates before the
    /// start date instead, so that combination is rejected.
    pub fn grid(&self) -> Result<CalendarGrid> {
	let grid = match self.end_date {
	    Some(end) => CalendarGrid::new(self.start_date, end),
	    None => CalendarGrid::until_today(self.start_date),
	};
	match (self.lead_in, self.policy) {
	    (false, _) => Ok(grid),
	    (true, WindowPolicy::TrimLeading) =>
		Ok(grid.extended_back(self.window_days.saturating_sub(1))),
	    (true, policy) => Err(Error::LeadInPolicy(policy)),
	}
    }

}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::ontario::CaseRecord;
    use super::super::rate::compute_rate_series;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
	NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults() {
	let args = Args::parse_from(&["ontario-phu-rates"]);
	assert_eq!(args.start_date, ymd(2019, 12, 18));
	assert_eq!(args.end_date, None);
	assert_eq!(args.window_days, 14);
	assert_eq!(args.policy, WindowPolicy::TrimLeading);
	assert_eq!(args.date_field, DateField::Episode);
	assert!(!args.lead_in);
	assert!(args.hidden.is_empty());
    }

    #[test]
    fn parse_options() {
	let args = Args::parse_from(&[
	    "ontario-phu-rates", "--start-date", "2020-01-01", "--end-date", "2020-06-30",
	    "--window-days", "7", "--policy", "trim-trailing",
	    "--date-field", "test-reported", "--hidden", "Peel Public Health",
	    "--hidden", "Toronto Public Health",
	]);
	let config = args.rate_config();
	assert_eq!(config.end_date, Some(ymd(2020, 6, 30)));
	assert_eq!(config.window_days, 7);
	assert_eq!(config.policy, WindowPolicy::TrimTrailing);
	assert!(!config.lead_in);
	assert_eq!(args.date_field, DateField::TestReported);
	assert_eq!(args.hidden.len(), 2);
    }

    #[test]
    fn lead_in_starts_output_at_start_date() {
	let config = RateConfig {
	    start_date: ymd(2020, 1, 1),
	    end_date: Some(ymd(2020, 2, 1)),
	    window_days: 14,
	    policy: WindowPolicy::TrimLeading,
	    lead_in: true,
	};
	let grid = config.grid().unwrap();
	assert_eq!(grid.start(), ymd(2019, 12, 19));
	let cases = vec![CaseRecord::new("A", ymd(2019, 12, 20))];
	let series = compute_rate_series(&grid, &cases, "A", 10000, 14, config.policy).unwrap();
	assert_eq!(series.first().map(|(d,_)| *d), Some(ymd(2020, 1, 1)));
	assert_eq!(series.len(), 32);
	assert_eq!(series[0].1, 1.0);
    }

    #[test]
    fn without_lead_in_grid_is_as_configured() {
	let config = RateConfig {
	    start_date: ymd(2020, 1, 1),
	    end_date: Some(ymd(2020, 2, 1)),
	    window_days: 14,
	    policy: WindowPolicy::TrimTrailing,
	    lead_in: false,
	};
	assert_eq!(config.grid().unwrap(), CalendarGrid::new(ymd(2020, 1, 1), ymd(2020, 2, 1)));
    }

    #[test]
    fn lead_in_rejected_for_trailing_windows() {
	let config = RateConfig {
	    start_date: ymd(2020, 1, 1),
	    end_date: Some(ymd(2020, 2, 1)),
	    window_days: 14,
	    policy: WindowPolicy::TrimTrailing,
	    lead_in: true,
	};
	assert!(matches!(config.grid(), Err(Error::LeadInPolicy(WindowPolicy::TrimTrailing))));
	let args = Args::parse_from(&[
	    "ontario-phu-rates", "--start-date", "2020-01-01", "--end-date", "2020-02-01",
	    "--policy", "trim-trailing", "--lead-in",
	]);
	assert!(args.rate_config().grid().is_err());
    }

}
