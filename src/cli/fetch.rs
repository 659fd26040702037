use clap::{Parser, Subcommand};

use crate::{
    cli::ninja::{NinjaArgs, PvArgs, WindArgs},
    prelude::*,
    tables::build_capacity_factor_table,
};

#[derive(Parser)]
pub struct FetchArgs {
    #[clap(flatten)]
    pub ninja: NinjaArgs,

    /// Print the whole series as JSON instead of a preview table.
    #[clap(long)]
    pub json: bool,

    /// Number of leading points to preview.
    #[clap(long, default_value = "24")]
    pub preview: usize,

    #[command(subcommand)]
    pub source: FetchSource,
}

#[derive(Subcommand)]
pub enum FetchSource {
    /// Photovoltaic output.
    Pv(PvArgs),

    /// Wind turbine output.
    Wind(WindArgs),
}

/// Download capacity factors from Renewables.ninja.
#[instrument(skip_all)]
pub fn fetch(args: &FetchArgs) -> Result {
    let api = args.ninja.new_client();
    let series = match &args.source {
        FetchSource::Pv(pv) => api.load_pv_data(&pv.query())?,
        FetchSource::Wind(wind) => api.load_wind_data(&wind.query())?,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&series)?);
    } else {
        println!("{}", build_capacity_factor_table(&series, args.preview));
    }
    Ok(())
}
