use clap::Parser;

use crate::api::renewables_ninja::{Api, BASE_URL, PvQuery, WindQuery};

#[derive(Parser)]
pub struct NinjaArgs {
    /// Renewables.ninja API token.
    #[clap(long = "renewables-ninja-token", env = "RENEWABLES_NINJA_TOKEN", hide_env_values = true)]
    pub token: String,

    #[clap(long = "renewables-ninja-base-url", default_value = BASE_URL, env = "RENEWABLES_NINJA_BASE_URL")]
    pub base_url: String,
}

impl NinjaArgs {
    pub fn new_client(&self) -> Api {
        Api::new(self.token.clone()).with_base_url(self.base_url.clone())
    }
}

#[derive(Parser)]
pub struct SiteArgs {
    /// Years to download, one request each.
    #[clap(long = "year", default_value = "2016", env = "YEARS", value_delimiter = ',', num_args = 1..)]
    pub years: Vec<i32>,

    #[clap(long, default_value = "45", env = "LATITUDE")]
    pub latitude: f64,

    #[clap(long, default_value = "22", env = "LONGITUDE")]
    pub longitude: f64,
}

#[derive(Parser)]
pub struct WindArgs {
    #[clap(flatten)]
    pub site: SiteArgs,

    /// Turbine hub height in metres.
    #[clap(long, default_value = "100", env = "HUB_HEIGHT")]
    pub hub_height: f64,

    #[clap(long, default_value = "Vestas V80 2000", env = "TURBINE")]
    pub turbine: String,
}

impl WindArgs {
    pub fn query(&self) -> WindQuery {
        WindQuery::builder()
            .years(self.site.years.clone())
            .latitude(self.site.latitude)
            .longitude(self.site.longitude)
            .height(self.hub_height)
            .turbine(self.turbine.clone())
            .build()
    }
}

#[derive(Parser)]
pub struct PvArgs {
    #[clap(flatten)]
    pub site: SiteArgs,

    /// Panel tilt in degrees.
    #[clap(long, default_value = "35", env = "PANEL_TILT")]
    pub tilt: f64,

    /// Panel azimuth in degrees.
    #[clap(long, default_value = "180", env = "PANEL_AZIMUTH")]
    pub azimuth: f64,

    /// Single-axis tracking.
    #[clap(long, env = "PANEL_TRACKING")]
    pub tracking: bool,

    /// System losses in percent.
    #[clap(long, default_value = "10", env = "SYSTEM_LOSS")]
    pub system_loss: f64,
}

impl PvArgs {
    pub fn query(&self) -> PvQuery {
        PvQuery::builder()
            .years(self.site.years.clone())
            .latitude(self.site.latitude)
            .longitude(self.site.longitude)
            .tilt(self.tilt)
            .azimuth(self.azimuth)
            .tracking(self.tracking)
            .system_loss(self.system_loss)
            .build()
    }
}
