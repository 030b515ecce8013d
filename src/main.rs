mod args;
mod error;
mod graph;
mod grid;
mod legend;
mod ontario;
mod population;
mod rate;

use std::fs;

use clap::Parser;
use log::{debug,info,warn,error};

use args::Args;
use error::Result;
use graph::GraphConfig;
use legend::{Legend,LegendAction};
use population::Populations;


fn main() {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(err) = run(&args) {
	error!("{}", err);
	std::process::exit(1);
    }

}


fn run(args: &Args) -> Result<()> {

    let config = args.rate_config();

    let populations = match &args.populations {
	Some(path) => Populations::from_file(path)?,
	None => Populations::ontario(),
    };
    info!("Populations for {} regions", populations.len());

    let cases = match &args.input {
	Some(path) => ontario::cases_from_file(path, args.date_field)?,
	None => ontario::cases(&args.cache_path, args.date_field)?,
    };

    let grid = config.grid()?;
    info!("Computing {}-day rates over {} .. {} ({} days, {:?})",
	  config.window_days, grid.start(), grid.end(), grid.len(), config.policy);

    let table = rate::compute_all(&grid, &cases, &populations,
				  config.window_days, config.policy)?;
    info!("{} regions, highest rate {:.3}", table.len(), table.max_rate_observed());
    for region in populations.regions().filter(|r| !table.regions().any(|t| t == *r)) {
	debug!("No cases for {}", region);
    }

    let mut legend = Legend::new(&table);
    for region in &args.hidden {
	legend.apply(&LegendAction::Toggle(region.clone()))?;
	if legend.is_visible(region) {
	    warn!("{} remains visible", region);
	}
    }
    info!("{} of {} series visible", legend.visible().count(), legend.entries().len());

    let graph_config = GraphConfig::new(config.window_days);
    fs::create_dir_all(&args.graph_path)?;

    if let Err(err) = graph::rate_graph(&args.graph_path, &table, &legend, &graph_config) {
	error!("rate graph: {}", err);
    }

    if let Err(err) = graph::region_graphs(&args.graph_path, &table, &graph_config) {
	error!("region graphs: {}", err);
    }

    graph::write_rate_table(&args.graph_path.join("rates.csv"), &table)?;
    info!("Wrote {}", args.graph_path.join("rates.csv").display());

    Ok(())

}
