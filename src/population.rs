use std::io;
use std::fs::File;
use std::path::Path;
use std::collections::BTreeMap;

use lazy_static::lazy_static;
use serde::Deserialize;

use super::error::{Result,Error};


lazy_static! {
    /// Population of each Ontario public health unit, keyed by the name
    /// used in the `Reporting_PHU` column of the case line list.
    pub static ref PHU_POPULATIONS: BTreeMap<&'static str,u64> = vec![
	("Algoma Public Health Unit", 114434),
	("Brant County Health Unit", 155203),
	("Chatham-Kent Health Unit", 106317),
	("Durham Region Health Department", 712402),
	("Eastern Ontario Health Unit", 208711),
	("Grey Bruce Health Unit", 169884),
	("Haldimand-Norfolk Health Unit", 114081),
	("Haliburton, Kawartha, Pine Ridge District Health Unit", 188937),
	("Halton Region Health Department", 619087),
	("Hamilton Public Health Services", 592163),
	("Hastings and Prince Edward Counties Health Unit", 168493),
	("Huron Perth District Health Unit", 139757),
	("Kingston, Frontenac and Lennox & Addington Public Health", 212719),
	("Lambton Public Health", 130964),
	("Leeds, Grenville and Lanark District Health Unit", 173170),
	("Middlesex-London Health Unit", 507524),
	("Niagara Region Public Health Department", 472485),
	("North Bay Parry Sound District Health Unit", 129752),
	("Northwestern Health Unit", 87675),
	("Ottawa Public Health", 1054656),
	("Peel Public Health", 1605952),
	("Peterborough Public Health", 147977),
	("Porcupine Health Unit", 83441),
	("Region of Waterloo, Public Health", 584361),
	("Renfrew County and District Health Unit", 108631),
	("Simcoe Muskoka District Health Unit", 599589),
	("Southwestern Public Health", 211498),
	("Sudbury & District Health Unit", 199023),
	("Thunder Bay District Health Unit", 149960),
	("Timiskaming Health Unit", 32689),
	("Toronto Public Health", 3120358),
	("Wellington-Dufferin-Guelph Public Health", 311908),
	("Windsor-Essex County Health Unit", 424830),
	("York Region Public Health Services", 1225797),
    ].into_iter().collect();
}


#[derive(Deserialize)]
struct PopulationRow {
    region: String,
    population: i64,
}


/// Validated region to population mapping. Every population is strictly
/// positive; construction fails otherwise.
#[derive(Clone,Debug,PartialEq)]
pub struct Populations(BTreeMap<String,u64>);

impl Populations {

    pub fn ontario() -> Self {
	Self(PHU_POPULATIONS.iter().map(|(k,v)| (k.to_string(), *v)).collect())
    }

    pub fn from_pairs<I,S>(pairs: I) -> Result<Self>
    where I: IntoIterator<Item = (S,i64)>, S: Into<String> {
	pairs.into_iter().map(|(region,population)| {
	    let region = region.into();
	    match population > 0 {
		true => Ok((region, population as u64)),
		false => Err(Error::InvalidPopulation(region, population)),
	    }
	}).collect::<Result<_>>().map(Self)
    }

    /// Reads a `region,population` CSV with a header row.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
	let rows = csv::Reader::from_reader(reader).deserialize::<PopulationRow>()
	    .collect::<std::result::Result<Vec<_>,_>>()?;
	Self::from_pairs(rows.into_iter().map(|row| (row.region, row.population)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
	Self::from_reader(io::BufReader::new(File::open(path)?))
    }

    pub fn get(&self, region: &str) -> Result<u64> {
	self.0.get(region).copied()
	    .ok_or_else(|| Error::MissingPopulation(region.to_string()))
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
	self.0.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
	self.0.len()
    }

}
