use std::{io,fs};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::collections::BTreeMap;

use chrono::naive::NaiveDate;
use log::{info,warn};
use serde_json::{Value,json};
use unidecode::unidecode;

use super::error::Result;
use super::legend::{Legend,dispatch_table,click_bindings};
use super::rate::{RateTable,Series};


/// Band edges as multiples of the window length, from the bottom up.
pub const RISK_LEVELS: [f64; 4] = [0.05, 0.1, 0.25, 0.5];
pub const RISK_COLORS: [&str; 5] = ["blue", "green", "yellow", "darkorange", "red"];
const BAND_OPACITY: f64 = 0.1;
const HEADROOM: f64 = 2.0;


#[derive(Clone,Debug,PartialEq)]
pub struct RiskBand {
    pub lower: f64,
    pub upper: f64,
    pub color: &'static str,
}

/// Five background bands. The top one reaches the largest observed rate,
/// or collapses onto its lower edge when no rate gets that high.
pub fn risk_bands(window_days: usize, max_rate: f64) -> Vec<RiskBand> {
    let days = window_days as f64;
    let top = max_rate.max(RISK_LEVELS[3] * days);
    let edges: Vec<f64> = std::iter::once(0.0)
	.chain(RISK_LEVELS.iter().map(|l| l * days))
	.chain(std::iter::once(top))
	.collect();
    edges.windows(2).zip(RISK_COLORS.iter()).map(|(w,color)| RiskBand {
	lower: w[0], upper: w[1], color: *color
    }).collect()
}

pub fn y_domain(window_days: usize, max_rate: f64) -> (f64,f64) {
    (0.0, max_rate.max(RISK_LEVELS[3] * window_days as f64) + HEADROOM)
}


#[derive(Clone,Debug)]
pub struct GraphConfig {
    pub window_days: usize,
    pub title: String,
}

impl GraphConfig {
    pub fn new(window_days: usize) -> Self {
	Self {
	    window_days,
	    title: format!("Number of COVID-19 cases per 10,000 in the past {} days \
			    by public health unit", window_days),
	}
    }

    fn ytitle(&self) -> String {
	format!("# infected per 10,000 in past {} days", self.window_days)
    }
}


/// Vega-lite spec of the combined graph. A pure function of its
/// arguments: hidden series are filtered out by the `hidden` parameter
/// while the scales stay fixed, so a series shown again lands on exactly
/// the same place.
pub fn rate_spec(table: &RateTable, legend: &Legend, config: &GraphConfig) -> Value {

    let entries = legend.entries();
    let title = match table.is_empty() {
	true => format!("{} (no data available)", config.title),
	false => config.title.clone(),
    };

    json!({
	"$schema": "https://vega.github.io/schema/vega-lite/v5.json",
	"height": "container",
	"width": "container",
	"title": title,
	"params": [
	    {"name": "hidden", "value": legend.hidden().collect::<Vec<_>>()}
	],
	"layer": [
	    band_layer(config, table.max_rate_observed()),
	    {
		"data": {"values": points(table)},
		"transform": [
		    {"filter": "indexof(hidden, datum.Region) < 0"}
		],
		"mark": {"type": "line", "strokeWidth": 2},
		"encoding": {
		    "x": date_encoding(table),
		    "y": {
			"field": "Rate",
			"type": "quantitative"
		    },
		    "color": {
			"field": "Region",
			"type": "nominal",
			"scale": {
			    "domain": entries.iter().map(|e| e.region.as_str()).collect::<Vec<_>>(),
			    "range": entries.iter().map(|e| e.style.color).collect::<Vec<_>>()
			},
			"legend": legend_settings()
		    },
		    "strokeDash": {
			"field": "Region",
			"type": "nominal",
			"scale": {
			    "domain": entries.iter().map(|e| e.region.as_str()).collect::<Vec<_>>(),
			    "range": entries.iter().map(|e| e.style.line.dash()).collect::<Vec<_>>()
			},
			"legend": legend_settings()
		    },
		    "tooltip": [
			{"field": "Region", "type": "nominal"},
			{"field": "Date", "type": "temporal"},
			{"field": "Rate", "type": "quantitative", "format": ".3f"}
		    ]
		}
	    }
	]
    })

}


/// Color and dash share one legend; vega-lite merges them only when the
/// settings are identical.
fn legend_settings() -> Value {
    json!({
	"title": null,
	"columns": 2,
	"symbolType": "stroke",
	"labelLimit": 400,
	"labelExpr": "indexof(hidden, datum.label) < 0 ? datum.label : '(' + datum.label + ')'"
    })
}


/// Single-series spec for one region, drawn in black over the same bands.
pub fn region_spec(region: &str, series: &Series, max_rate: f64,
		   config: &GraphConfig) -> Value {
    let single = RateTable::new(vec![(region.to_string(), series.clone())]
				.into_iter().collect::<BTreeMap<_,_>>());
    json!({
	"$schema": "https://vega.github.io/schema/vega-lite/v5.json",
	"height": "container",
	"width": "container",
	"title": region,
	"layer": [
	    band_layer(config, max_rate),
	    {
		"data": {"values": points(&single)},
		"mark": {"type": "line", "color": "black", "strokeWidth": 4},
		"encoding": {
		    "x": date_encoding(&single),
		    "y": {"field": "Rate", "type": "quantitative"},
		    "tooltip": [
			{"field": "Date", "type": "temporal"},
			{"field": "Rate", "type": "quantitative", "format": ".3f"}
		    ]
		}
	    }
	]
    })
}


fn band_layer(config: &GraphConfig, max_rate: f64) -> Value {
    let (ymin,ymax) = y_domain(config.window_days, max_rate);
    json!({
	"data": {
	    "values": risk_bands(config.window_days, max_rate).iter().map(
		|band| json!({"Lower": band.lower, "Upper": band.upper, "Color": band.color})
	    ).collect::<Vec<_>>()
	},
	"mark": {"type": "rect", "opacity": BAND_OPACITY},
	"encoding": {
	    "y": {
		"field": "Lower",
		"type": "quantitative",
		"title": config.ytitle(),
		"scale": {"domain": [ymin, ymax], "nice": false}
	    },
	    "y2": {"field": "Upper"},
	    "color": {"field": "Color", "type": "nominal", "scale": null, "legend": null}
	}
    })
}


fn date_encoding(table: &RateTable) -> Value {
    let dates = table.dates();
    let mut encoding = json!({
	"field": "Date",
	"timeUnit": "utcyearmonthdate",
	"title": "Date",
	"type": "temporal"
    });
    if let (Some(first),Some(last)) = (dates.first(), dates.last()) {
	encoding["scale"] = json!({"domain": [format_date(first), format_date(last)]});
    }
    encoding
}


fn points(table: &RateTable) -> Vec<Value> {
    table.iter().flat_map(
	|(region,series)| series.iter().map(move |(date,rate)| json!({
	    "Date": format_date(date),
	    "Region": region,
	    "Rate": rate
	}))
    ).collect()
}


fn format_date(date: &NaiveDate) -> String {
    format!("{}", date.format("%Y-%m-%d"))
}


/// ASCII file name for a region.
pub fn slug(region: &str) -> String {
    let ascii = unidecode(region).to_lowercase();
    ascii.split(|c: char| !c.is_ascii_alphanumeric())
	.filter(|part| !part.is_empty())
	.collect::<Vec<_>>().join("-")
}


pub fn rate_graph(graph_path: &Path, table: &RateTable, legend: &Legend,
		  config: &GraphConfig) -> Result<()> {

    if table.is_empty() {
	warn!("No rates to plot; writing an empty graph");
    }

    let regions: Vec<_> = legend.entries().iter().map(|e| e.region.as_str()).collect();
    let empty: Vec<_> = legend.entries().iter().filter(|e| e.points == 0)
	.map(|e| e.region.as_str()).collect();

    page(graph_path, "rates.html", &config.title, &rate_spec(table, legend, config),
	 &interaction_script(&regions, &empty)?)

}


pub fn region_graphs(graph_path: &Path, table: &RateTable, config: &GraphConfig) -> Result<()> {
    let graph_path = graph_path.join("regions");
    for (region,series) in table.iter() {
	page(&graph_path, &format!("{}.html", slug(region)), region,
	     &region_spec(region, series, table.max_rate_observed(), config), "")?;
    }
    info!("Wrote {} region graphs", table.len());
    Ok(())
}


/// Browser side of the legend. Mouse buttons and the control buttons are
/// bound through the dispatch table of `legend.rs`.
fn interaction_script(regions: &[&str], empty: &[&str]) -> Result<String> {
    Ok(format!(
	"var regions = {};\
	 var empty = {};\
	 var actions = {};\
	 var clicks = {};\
	 function legend(view) {{\
	   var hidden = view.signal('hidden').slice();\
	   function apply(name, region) {{\
	     var action = actions.find(function(a) {{ return a.action === name; }});\
	     if (!action) return;\
	     var targets = regions;\
	     if (action.single) {{\
	       if (regions.indexOf(region) < 0 || empty.indexOf(region) >= 0) return;\
	       targets = [region];\
	     }}\
	     targets.forEach(function(r) {{\
	       var i = hidden.indexOf(r);\
	       var visible = i < 0;\
	       var next = action.transition === 'flip' ? !visible : action.transition === 'show';\
	       if (visible && !next) hidden.push(r);\
	       if (!visible && next) hidden.splice(i, 1);\
	     }});\
	     view.signal('hidden', hidden.slice()).runAsync();\
	   }}\
	   view.addEventListener('mousedown', function(event, item) {{\
	     var entry = item && item.datum && typeof item.datum.value === 'string' ? item.datum.value : null;\
	     var click = clicks.find(function(c) {{ return c.button === event.button; }});\
	     if (!click) return;\
	     var name = entry !== null ? click.on_entry : click.elsewhere;\
	     if (name) apply(name, entry);\
	   }});\
	   document.getElementById('vis').addEventListener('contextmenu', function(event) {{ event.preventDefault(); }});\
	   var controls = document.getElementById('controls');\
	   actions.filter(function(a) {{ return !a.single; }}).forEach(function(a) {{\
	     var button = document.createElement('button');\
	     button.textContent = a.label;\
	     button.addEventListener('click', function() {{ apply(a.action); }});\
	     controls.appendChild(button);\
	   }});\
	 }}",
	serde_json::to_string(regions)?, serde_json::to_string(empty)?,
	serde_json::to_string(&dispatch_table())?, serde_json::to_string(&click_bindings())?))
}


fn page(graph_path: &Path, path: &str, title: &str, spec: &Value, script: &str) -> Result<()> {

    fs::create_dir_all(graph_path)?;
    let mut out = io::BufWriter::new(File::create(graph_path.join(path))?);
    let interactive = !script.is_empty();

    write!(out, "<!DOCTYPE html><html><head>")?;
    write!(out, "<meta charset=\"UTF-8\">")?;
    write!(out, "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">")?;
    write!(out, "<title>{}</title>", escape(title))?;
    write!(out, "<script src=\"https://cdn.jsdelivr.net/npm/vega@5\"></script>")?;
    write!(out, "<script src=\"https://cdn.jsdelivr.net/npm/vega-lite@5\"></script>")?;
    write!(out, "<script src=\"https://cdn.jsdelivr.net/npm/vega-embed\"></script>")?;
    write!(out, "</head>")?;
    write!(out, "<body>")?;
    if interactive {
	write!(out, "<div style=\"position: absolute; top: 0; left: 0; right: 0; height: 2em;\">")?;
	write!(out, "<span id=\"controls\"></span> ")?;
	write!(out, "Left-click on a unit name to show/hide it | \
		     Right-click to hide all | Middle-click to show all")?;
	write!(out, "</div>")?;
    }
    write!(out, "<div id=\"vis\" style=\"overflow: hidden; position: absolute;top: {}; \
		 left: 0; right: 0; bottom: 0;\"></div>",
	   if interactive { "2em" } else { "0" })?;
    write!(out, "<script type=\"text/javascript\">")?;
    write!(out, "{}", script)?;
    write!(out, "var spec = ")?;

    serde_json::to_writer_pretty(out.by_ref(), spec)?;

    write!(out, ";vegaEmbed('#vis', spec,{{}}).then(function(result) {{")?;
    if interactive {
	write!(out, "legend(result.view);")?;
    }
    write!(out, "}}).catch(console.error);")?;
    write!(out, "</script>")?;
    write!(out, "</body></html>")?;

    Ok(())

}


fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}


/// Writes the rate table as CSV: a `Date` column, then one column per
/// region. Dates a region has no rate for are left blank.
pub fn write_rate_table(path: &Path, table: &RateTable) -> Result<()> {

    if let Some(dir) = path.parent() {
	fs::create_dir_all(dir)?;
    }
    let mut out = csv::Writer::from_path(path)?;

    out.write_record(std::iter::once("Date").chain(table.regions()))?;

    let lookup: Vec<BTreeMap<NaiveDate,f64>> = table.iter()
	.map(|(_,series)| series.iter().copied().collect()).collect();

    for date in table.dates() {
	out.write_record(std::iter::once(format_date(&date)).chain(lookup.iter().map(
	    |rates| rates.get(&date).map_or(String::new(), |r| r.to_string())
	)))?;
    }

    out.flush()?;
    Ok(())

}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::legend::LegendAction;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
	NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table() -> RateTable {
	let mut series = BTreeMap::new();
	series.insert("Peel Public Health".to_string(),
		      vec![(ymd(2020, 3, 1), 0.5), (ymd(2020, 3, 2), 1.25)]);
	series.insert("Toronto Public Health".to_string(),
		      vec![(ymd(2020, 3, 2), 9.0), (ymd(2020, 3, 3), 0.0)]);
	RateTable::new(series)
    }

    #[test]
    fn bands_follow_window_and_max() {
	let bands = risk_bands(14, 9.0);
	let edges: Vec<_> = bands.iter().map(|b| (b.lower, b.upper)).collect();
	assert_eq!(edges, vec![(0.0, 0.05 * 14.0), (0.05 * 14.0, 0.1 * 14.0),
			       (0.1 * 14.0, 3.5), (3.5, 7.0), (7.0, 9.0)]);
	assert_eq!(bands.iter().map(|b| b.color).collect::<Vec<_>>(), RISK_COLORS.to_vec());
    }

    #[test]
    fn top_band_collapses_below_threshold() {
	let bands = risk_bands(14, 1.0);
	assert_eq!(bands[4].lower, 7.0);
	assert_eq!(bands[4].upper, 7.0);
	assert_eq!(y_domain(14, 1.0), (0.0, 9.0));
	assert_eq!(y_domain(14, 30.0), (0.0, 32.0));
    }

    #[test]
    fn spec_reflects_hidden_series() {
	let table = table();
	let mut legend = Legend::new(&table);
	let config = GraphConfig::new(14);
	let initial = rate_spec(&table, &legend, &config);
	assert_eq!(initial["params"][0]["value"], json!([]));

	legend.apply(&LegendAction::Toggle("Peel Public Health".to_string())).unwrap();
	let hidden = rate_spec(&table, &legend, &config);
	assert_eq!(hidden["params"][0]["value"], json!(["Peel Public Health"]));
	assert_eq!(hidden["layer"], initial["layer"]);

	legend.apply(&LegendAction::Toggle("Peel Public Health".to_string())).unwrap();
	assert_eq!(rate_spec(&table, &legend, &config), initial);
    }

    #[test]
    fn spec_styles_and_data() {
	let table = table();
	let spec = rate_spec(&table, &Legend::new(&table), &GraphConfig::new(14));
	let lines = &spec["layer"][1];
	assert_eq!(lines["data"]["values"].as_array().unwrap().len(), 4);
	assert_eq!(lines["encoding"]["color"]["scale"]["range"], json!(["darkred", "darkred"]));
	assert_eq!(lines["encoding"]["strokeDash"]["scale"]["range"], json!([[], [8, 4]]));
	assert_eq!(lines["encoding"]["x"]["scale"]["domain"], json!(["2020-03-01", "2020-03-03"]));
	assert_eq!(spec["layer"][0]["encoding"]["y"]["scale"]["domain"], json!([0.0, 11.0]));
    }

    #[test]
    fn color_and_dash_share_a_legend() {
	let table = table();
	let spec = rate_spec(&table, &Legend::new(&table), &GraphConfig::new(14));
	let encoding = &spec["layer"][1]["encoding"];
	assert!(encoding["color"]["legend"].is_object());
	assert_eq!(encoding["strokeDash"]["legend"], encoding["color"]["legend"]);
	assert_eq!(encoding["strokeDash"]["scale"]["domain"], encoding["color"]["scale"]["domain"]);
    }

    #[test]
    fn script_dispatches_through_legend_table() {
	let script = interaction_script(&["Peel Public Health"], &[]).unwrap();
	assert!(script.contains(&format!("var actions = {};",
					 serde_json::to_string(&dispatch_table()).unwrap())));
	assert!(script.contains(&format!("var clicks = {};",
					 serde_json::to_string(&click_bindings()).unwrap())));
	for name in &["toggle", "hide-all", "show-all"] {
	    assert_eq!(script.matches(&format!("\"{}\"", name)).count(),
		       match *name { "toggle" => 2, _ => 3 }, "{}", name);
	    assert!(!script.contains(&format!("'{}'", name)));
	}
    }

    #[test]
    fn titles_are_escaped() {
	let region = "Kingston, Frontenac and Lennox & Addington Public Health";
	let table = RateTable::new(vec![(region.to_string(), vec![(ymd(2020, 3, 1), 1.0)])]
				   .into_iter().collect());
	let dir = tempfile::tempdir().unwrap();
	region_graphs(dir.path(), &table, &GraphConfig::new(14)).unwrap();
	let html = fs::read_to_string(dir.path().join(format!("regions/{}.html", slug(region))))
	    .unwrap();
	assert!(html.contains(
	    "<title>Kingston, Frontenac and Lennox &amp; Addington Public Health</title>"));
	assert_eq!(escape("<a & b>"), "&lt;a &amp; b&gt;");
    }

    #[test]
    fn empty_table_renders_no_data() {
	let table = RateTable::new(vec![("Peel Public Health".to_string(), vec![])]
				   .into_iter().collect());
	let spec = rate_spec(&table, &Legend::new(&table), &GraphConfig::new(14));
	assert!(spec["title"].as_str().unwrap().ends_with("(no data available)"));
	assert!(spec["layer"][1]["encoding"]["x"].get("scale").is_none());

	let dir = tempfile::tempdir().unwrap();
	rate_graph(dir.path(), &table, &Legend::new(&table), &GraphConfig::new(14)).unwrap();
	assert!(dir.path().join("rates.html").exists());
    }

    #[test]
    fn slugs_are_ascii() {
	assert_eq!(slug("Kingston, Frontenac and Lennox & Addington Public Health"),
		   "kingston-frontenac-and-lennox-addington-public-health");
	assert_eq!(slug("Région de Québec"), "region-de-quebec");
    }

    #[test]
    fn writes_pages() {
	let dir = tempfile::tempdir().unwrap();
	let table = table();
	let config = GraphConfig::new(14);
	rate_graph(dir.path(), &table, &Legend::new(&table), &config).unwrap();
	region_graphs(dir.path(), &table, &config).unwrap();
	let html = fs::read_to_string(dir.path().join("rates.html")).unwrap();
	assert!(html.contains("legend(result.view);"));
	assert!(html.contains("\"Toronto Public Health\""));
	let region = fs::read_to_string(dir.path().join("regions/peel-public-health.html")).unwrap();
	assert!(!region.contains("controls"));
	assert!(dir.path().join("regions/toronto-public-health.html").exists());
    }

    #[test]
    fn export_csv() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("rates.csv");
	write_rate_table(&path, &table()).unwrap();
	assert_eq!(fs::read_to_string(&path).unwrap(),
		   "Date,Peel Public Health,Toronto Public Health\n\
		    2020-03-01,0.5,\n\
		    2020-03-02,1.25,9\n\
		    2020-03-03,,0\n");
    }

    #[test]
    fn export_empty_csv() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("rates.csv");
	write_rate_table(&path, &RateTable::default()).unwrap();
	assert_eq!(fs::read_to_string(&path).unwrap(), "Date\n");
    }

}
