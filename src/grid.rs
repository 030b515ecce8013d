use chrono::{Duration,Local};
use chrono::naive::NaiveDate;
use log::warn;


/// Calendar x-axis shared by every region: one entry per day from
/// `start` to `end`, both inclusive. Empty when `end < start`.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct CalendarGrid {
    start: NaiveDate,
    end: NaiveDate,
}

impl CalendarGrid {

    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
	let grid = Self { start, end };
	if grid.is_empty() {
	    warn!("Calendar grid {} .. {} is empty; no data available",
		  start.format("%Y-%m-%d"), end.format("%Y-%m-%d"));
	}
	grid
    }

    /// Grid ending at the local current date, evaluated at call time.
    pub fn until_today(start: NaiveDate) -> Self {
	Self::new(start, Local::now().date_naive())
    }

    pub fn start(&self) -> NaiveDate {
	self.start
    }

    pub fn end(&self) -> NaiveDate {
	self.end
    }

    pub fn len(&self) -> usize {
	match self.is_empty() {
	    true => 0,
	    false => (self.end - self.start).num_days() as usize + 1,
	}
    }

    pub fn is_empty(&self) -> bool {
	self.end < self.start
    }

    pub fn dates(&self) -> NaiveDateRange {
	NaiveDateRange(self.start, Some(self.end))
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
	match date < self.start || date > self.end {
	    true => None,
	    false => Some((date - self.start).num_days() as usize),
	}
    }

    /// Same end date, start moved `days` earlier.
    pub fn extended_back(&self, days: usize) -> Self {
	let start = self.start.checked_sub_signed(Duration::days(days as i64))
	    .unwrap_or(NaiveDate::MIN);
	Self::new(start, self.end)
    }

}


#[derive(Clone,Debug)]
pub struct NaiveDateRange(pub NaiveDate,pub Option<NaiveDate>);

impl Iterator for NaiveDateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<NaiveDate> {
	match self.1.map_or(true, |end| self.0 <= end) {
	    false => None,
	    true => {
		let current = self.0;
		match current.succ_opt() {
		    Some(next) => self.0 = next,
		    None => self.1 = current.pred_opt(),
		}
		Some(current)
	    }
	}
    }
}
