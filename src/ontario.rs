use std::{fs,io};
use std::path::Path;
use std::time::Duration;

use chrono::naive::NaiveDate;
use log::{info,warn};
use serde::Deserialize;

use super::error::{Result,Error};


pub const CASES_URL: &str = "https://data.ontario.ca/dataset/f4112442-bdc8-45d2-be3c-12efae72fb27\
			     /resource/455fd63b-603d-4608-8216-7d8647f43350/download/conposcovidloc.csv";


/// One confirmed case, attributed to the public health unit that reported it.
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct CaseRecord {
    pub region: String,
    pub event_date: Option<NaiveDate>,
}

impl CaseRecord {
    pub fn new(region: &str, event_date: NaiveDate) -> Self {
	Self { region: region.to_string(), event_date: Some(event_date) }
    }
}


/// Which date column of the line list is taken as the event date.
#[derive(Clone,Copy,Debug,PartialEq,Eq,clap::ValueEnum)]
pub enum DateField {
    Episode,
    Reported,
    TestReported,
    Specimen,
}

impl DateField {
    pub fn column(&self) -> &'static str {
	match self {
	    Self::Episode => "Accurate_Episode_Date",
	    Self::Reported => "Case_Reported_Date",
	    Self::TestReported => "Test_Reported_Date",
	    Self::Specimen => "Specimen_Date",
	}
    }
}


#[derive(Deserialize,Debug)]
struct CaseRow {
    #[serde(rename = "Reporting_PHU")]
    reporting_phu: String,
    #[serde(rename = "Accurate_Episode_Date", default)]
    episode_date: Option<String>,
    #[serde(rename = "Case_Reported_Date", default)]
    reported_date: Option<String>,
    #[serde(rename = "Test_Reported_Date", default)]
    test_reported_date: Option<String>,
    #[serde(rename = "Specimen_Date", default)]
    specimen_date: Option<String>,
}

impl CaseRow {
    fn date(&self, field: DateField) -> Option<&str> {
	match field {
	    DateField::Episode => self.episode_date.as_deref(),
	    DateField::Reported => self.reported_date.as_deref(),
	    DateField::TestReported => self.test_reported_date.as_deref(),
	    DateField::Specimen => self.specimen_date.as_deref(),
	}
    }
}


pub fn cases(cache_path: &Path, field: DateField) -> Result<Vec<CaseRecord>> {

    let cache_path = cache_path.join("ontario");
    let cache_file = cache_path.join("conposcovidloc.csv");

    if cache_file.exists() && fs::metadata(&cache_file)?.modified()?.elapsed()? < Duration::new(1800,0) {
	info!("Using cached {}", cache_file.display());
	return cases_from_file(&cache_file, field);
    }

    let data = download_cases()?;
    fs::create_dir_all(&cache_path)?;
    fs::write(&cache_file, &data)?;
    parse_cases(data.as_bytes(), field)

}


pub fn cases_from_file(path: &Path, field: DateField) -> Result<Vec<CaseRecord>> {
    parse_cases(decode(&fs::read(path)?).as_bytes(), field)
}


/// Parses the line list, keeping only rows that carry the selected date.
pub fn parse_cases<R: io::Read>(reader: R, field: DateField) -> Result<Vec<CaseRecord>> {

    let mut records = Vec::new();
    let mut undated = 0;

    for row in csv::Reader::from_reader(reader).deserialize::<CaseRow>() {
	let row = row?;
	match parse_date(row.date(field))? {
	    Some(date) => records.push(CaseRecord::new(&row.reporting_phu, date)),
	    None => undated += 1,
	}
    }

    if undated > 0 {
	warn!("Skipped {} cases without {}", undated, field.column());
    }
    info!("Loaded {} cases", records.len());

    Ok(records)

}


fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).and_then(|v| v.split(|c: char| c == 'T' || c == ' ').next()) {
	None | Some("") => Ok(None),
	Some(date) => Ok(Some(NaiveDate::parse_from_str(date, "%Y-%m-%d")?)),
    }
}


fn decode(bytes: &[u8]) -> String {
    encoding_rs::UTF_8.decode_with_bom_removal(bytes).0.into_owned()
}


fn download_cases() -> Result<String> {

    info!("Downloading conposcovidloc.csv...");

    let res = reqwest::blocking::get(CASES_URL)?;

    match res.status().as_u16() {
	200 => Ok(decode(&res.bytes()?)),
	_ => Err(Error::HttpError(res.status())),
    }

}


#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}Row_ID,Accurate_Episode_Date,Case_Reported_Date,\
			  Test_Reported_Date,Specimen_Date,Age_Group,Client_Gender,Reporting_PHU\n\
			  1,2020-03-01,2020-03-04,2020-03-03,2020-03-02,20s,FEMALE,Toronto Public Health\n\
			  2,,2020-03-05,,,30s,MALE,Toronto Public Health\n\
			  3,2020-03-10T00:00:00,2020-03-12,,2020-03-11,40s,MALE,Peel Public Health\n";

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
	NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn undated_rows_are_skipped() {
	let cases = parse_cases(decode(SAMPLE.as_bytes()).as_bytes(), DateField::Episode).unwrap();
	assert_eq!(cases, vec![
	    CaseRecord::new("Toronto Public Health", ymd(2020, 3, 1)),
	    CaseRecord::new("Peel Public Health", ymd(2020, 3, 10)),
	]);
    }

    #[test]
    fn alternative_date_column() {
	let cases = parse_cases(decode(SAMPLE.as_bytes()).as_bytes(), DateField::Reported).unwrap();
	assert_eq!(cases.len(), 3);
	assert_eq!(cases[1], CaseRecord::new("Toronto Public Health", ymd(2020, 3, 5)));
	let cases = parse_cases(decode(SAMPLE.as_bytes()).as_bytes(), DateField::TestReported).unwrap();
	assert_eq!(cases.len(), 1);
    }

    #[test]
    fn absent_column_means_no_date() {
	let data = "Reporting_PHU,Accurate_Episode_Date\nLambton Public Health,2020-04-01\n";
	assert!(parse_cases(data.as_bytes(), DateField::Specimen).unwrap().is_empty());
	assert_eq!(parse_cases(data.as_bytes(), DateField::Episode).unwrap().len(), 1);
    }

    #[test]
    fn bad_date_is_an_error() {
	let data = "Reporting_PHU,Accurate_Episode_Date\nLambton Public Health,01/04/2020\n";
	assert!(matches!(parse_cases(data.as_bytes(), DateField::Episode),
			 Err(Error::ParseDate(_))));
    }

    #[test]
    fn bom_is_removed() {
	assert_eq!(decode("\u{feff}a,b".as_bytes()), "a,b");
    }

    #[test]
    fn read_from_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("cases.csv");
	fs::write(&path, SAMPLE).unwrap();
	assert_eq!(cases_from_file(&path, DateField::Episode).unwrap().len(), 2);
    }

}
