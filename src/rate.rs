use std::collections::BTreeMap;

use chrono::naive::NaiveDate;
use log::debug;

use super::error::{Result,Error};
use super::grid::CalendarGrid;
use super::ontario::CaseRecord;
use super::population::Populations;


pub type Series = Vec<(NaiveDate,f64)>;

/// Rates are expressed as cases per this many inhabitants.
pub const RATE_PER: f64 = 10000.0;


/// Where the window sits relative to the date a rate is reported for, and
/// hence which end of the grid loses `window_days - 1` dates.
#[derive(Clone,Copy,Debug,PartialEq,Eq,clap::ValueEnum)]
pub enum WindowPolicy {
    /// Window `[d - window_days + 1, d]`; the earliest dates are dropped.
    TrimLeading,
    /// Window `[d, d + window_days - 1]`; the most recent dates are dropped.
    TrimTrailing,
}

impl WindowPolicy {
    fn offset(&self, window_days: usize) -> usize {
	match self {
	    Self::TrimLeading => window_days - 1,
	    Self::TrimTrailing => 0,
	}
    }
}


/// Case records grouped by region, borrowed from the dataset.
#[derive(Clone,Debug,Default)]
pub struct CaseIndex<'a>(BTreeMap<&'a str,Vec<&'a CaseRecord>>);

impl<'a> CaseIndex<'a> {

    /// Records without an event date are kept so that their region is
    /// still registered; they are never counted.
    pub fn build(cases: &'a [CaseRecord]) -> Self {
	let mut index = BTreeMap::new();
	for case in cases {
	    index.entry(case.region.as_str()).or_insert_with(Vec::new).push(case);
	}
	Self(index)
    }

    pub fn regions(&self) -> impl Iterator<Item = &'a str> + '_ {
	self.0.keys().copied()
    }

    pub fn cases(&self, region: &str) -> &[&'a CaseRecord] {
	self.0.get(region).map(Vec::as_slice).unwrap_or(&[])
    }

}


/// Rate series for all regions plus the largest rate emitted.
#[derive(Clone,Debug,Default,PartialEq)]
pub struct RateTable {
    series: BTreeMap<String,Series>,
    max_rate: f64,
}

impl RateTable {

    pub fn new(series: BTreeMap<String,Series>) -> Self {
	let max_rate = series.values().flat_map(|s| s.iter().map(|(_,r)| *r))
	    .fold(0.0, f64::max);
	Self { series, max_rate }
    }

    pub fn max_rate_observed(&self) -> f64 {
	self.max_rate
    }

    #[cfg(test)]
    pub fn get(&self, region: &str) -> Option<&Series> {
	self.series.get(region)
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
	self.series.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str,&Series)> {
	self.series.iter().map(|(k,v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
	self.series.len()
    }

    /// True when no region has a single rate point.
    pub fn is_empty(&self) -> bool {
	self.series.values().all(|s| s.is_empty())
    }

    /// Every date for which at least one region has a rate, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
	let mut dates: Vec<_> = self.series.values()
	    .flat_map(|s| s.iter().map(|(d,_)| *d)).collect();
	dates.sort_unstable();
	dates.dedup();
	dates
    }

}


/// Number of points a series over `grid` has, under either policy.
pub fn emitted_len(grid: &CalendarGrid, window_days: usize) -> usize {
    (grid.len() + 1).saturating_sub(window_days)
}


/// Rates for one region. Records of other regions and records without
/// an event date are skipped.
pub fn compute_rate_series<'a,C>(grid: &CalendarGrid, cases: C, region: &str,
				 population: u64, window_days: usize,
				 policy: WindowPolicy) -> Result<Series>
where C: IntoIterator<Item = &'a CaseRecord> {
    check_window(window_days)?;
    check_population(region, population)?;
    let dates = cases.into_iter().filter(|case| case.region == region)
	.filter_map(|case| case.event_date);
    let prefix = daily_prefix(grid, dates);
    debug!("{}: {} cases in grid, population {}", region,
	   prefix.last().copied().unwrap_or(0), population);
    Ok(rates(grid, &prefix, population, window_days, policy))
}


pub fn compute_all(grid: &CalendarGrid, cases: &[CaseRecord], populations: &Populations,
		   window_days: usize, policy: WindowPolicy) -> Result<RateTable> {

    check_window(window_days)?;
    let index = CaseIndex::build(cases);

    let series = index.regions().map(|region| -> Result<(String,Series)> {
	let population = populations.get(region)?;
	let series = compute_rate_series(grid, index.cases(region).iter().copied(), region,
					 population, window_days, policy)?;
	Ok((region.to_string(), series))
    }).collect::<Result<_>>()?;

    Ok(RateTable::new(series))

}


fn check_window(window_days: usize) -> Result<()> {
    match window_days {
	0 => Err(Error::InvalidWindow(window_days)),
	_ => Ok(()),
    }
}

fn check_population(region: &str, population: u64) -> Result<()> {
    match population {
	0 => Err(Error::InvalidPopulation(region.to_string(), 0)),
	_ => Ok(()),
    }
}


/// `prefix[i]` is the number of events on the first `i` grid dates.
/// Events outside the grid are not counted.
fn daily_prefix<I>(grid: &CalendarGrid, dates: I) -> Vec<u64>
where I: Iterator<Item = NaiveDate> {
    let mut prefix = vec![0; grid.len() + 1];
    for date in dates {
	if let Some(i) = grid.index_of(date) {
	    prefix[i + 1] += 1;
	}
    }
    for i in 1..prefix.len() {
	prefix[i] += prefix[i - 1];
    }
    prefix
}


fn rates(grid: &CalendarGrid, prefix: &[u64], population: u64,
	 window_days: usize, policy: WindowPolicy) -> Series {
    grid.dates().skip(policy.offset(window_days))
	.take(emitted_len(grid, window_days))
	.enumerate().map(|(k,date)| {
	    let count = prefix[k + window_days] - prefix[k];
	    (date, count as f64 * RATE_PER / population as f64)
	}).collect()
}
