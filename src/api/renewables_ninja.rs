//! [Renewables.ninja](https://www.renewables.ninja) simulated PV and wind output.

use std::{collections::BTreeMap, fmt::Display, time::Duration};

use bon::Builder;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use ureq::Agent;

use crate::{core::series::Series, prelude::*};

pub const BASE_URL: &str = "https://www.renewables.ninja/api";

/// Raw HTTP response.
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Plain GET with the token authorization.
///
/// Non-success statuses must be returned as [`Response`] rather than errors, the caller inspects
/// the body.
pub trait Transport {
    fn fetch(&self, url: &str, token: &str, query: &[(&'static str, String)]) -> Result<Response>;
}

impl Transport for Agent {
    fn fetch(&self, url: &str, token: &str, query: &[(&'static str, String)]) -> Result<Response> {
        let mut request = self.get(url).header("Authorization", format!("Token {token}"));
        for (key, value) in query {
            request = request.query(key, value);
        }
        let mut response = request.call().with_context(|| format!("failed to request `{url}`"))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .with_context(|| format!("failed to read the response from `{url}`"))?;
        Ok(Response { status, body })
    }
}

#[must_use]
#[derive(Clone, Debug, Builder)]
pub struct PvQuery {
    #[builder(default = vec![2016])]
    pub years: Vec<i32>,

    #[builder(default = 45.0)]
    pub latitude: f64,

    #[builder(default = 22.0)]
    pub longitude: f64,

    /// Panel tilt, degrees.
    #[builder(default = 35.0)]
    pub tilt: f64,

    /// Panel azimuth, degrees, 180 is facing the equator in the northern hemisphere.
    #[builder(default = 180.0)]
    pub azimuth: f64,

    /// Single-axis tracking.
    #[builder(default)]
    pub tracking: bool,

    /// System losses, percent.
    #[builder(default = 10.0)]
    pub system_loss: f64,
}

#[must_use]
#[derive(Clone, Debug, Builder)]
pub struct WindQuery {
    #[builder(default = vec![2016])]
    pub years: Vec<i32>,

    #[builder(default = 45.0)]
    pub latitude: f64,

    #[builder(default = 22.0)]
    pub longitude: f64,

    /// Hub height, metres.
    #[builder(default = 100.0)]
    pub height: f64,

    #[builder(default = String::from("Vestas V80 2000"))]
    pub turbine: String,
}

/// Capacity factor per timestamp: output of a 1 kW plant in kW. Gaps are [`None`].
pub type CapacityFactors = Series<DateTime<Utc>, Option<f64>>;

pub struct Api<T = Agent> {
    transport: T,
    base_url: String,
    token: String,
    sleep: Box<dyn Fn(Duration)>,
}

impl Api<Agent> {
    pub fn new(token: String) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(60)))
            .http_status_as_error(false)
            .build()
            .into();
        Self::with_transport(agent, BASE_URL.to_string(), token)
    }
}

impl<T: Transport> Api<T> {
    /// Pause between consecutive years to stay within the rate limit.
    const COURTESY_PAUSE: Duration = Duration::from_secs(1);

    pub fn with_transport(transport: T, base_url: String, token: String) -> Self {
        Self { transport, base_url, token, sleep: Box::new(std::thread::sleep) }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    #[instrument(skip_all, fields(years = ?query.years))]
    pub fn load_pv_data(&self, query: &PvQuery) -> Result<CapacityFactors> {
        let parameters = vec![
            ("lat", query.latitude.to_string()),
            ("lon", query.longitude.to_string()),
            ("dataset", "merra2".to_string()),
            ("capacity", "1.0".to_string()),
            ("system_loss", query.system_loss.to_string()),
            ("tracking", u8::from(query.tracking).to_string()),
            ("tilt", query.tilt.to_string()),
            ("azim", query.azimuth.to_string()),
        ];
        self.load("pv", &query.years, &parameters).context("failed to load the PV data")
    }

    #[instrument(skip_all, fields(years = ?query.years, turbine = %query.turbine))]
    pub fn load_wind_data(&self, query: &WindQuery) -> Result<CapacityFactors> {
        let parameters = vec![
            ("lat", query.latitude.to_string()),
            ("lon", query.longitude.to_string()),
            ("dataset", "merra2".to_string()),
            ("capacity", "1.0".to_string()),
            ("height", query.height.to_string()),
            ("turbine", query.turbine.clone()),
        ];
        self.load("wind", &query.years, &parameters).context("failed to load the wind data")
    }

    fn load(
        &self,
        kind: &str,
        years: &[i32],
        parameters: &[(&'static str, String)],
    ) -> Result<CapacityFactors> {
        let url = format!("{}/data/{kind}", self.base_url);
        let mut series = CapacityFactors::new();
        for (i, year) in years.iter().enumerate() {
            if i != 0 {
                (self.sleep)(Self::COURTESY_PAUSE);
            }
            info!(year, "downloading…");
            let mut query = parameters.to_vec();
            query.extend([
                ("date_from", format!("{year}-01-01")),
                ("date_to", format!("{year}-12-31")),
                ("format", "json".to_string()),
                ("metadata", "false".to_string()),
                ("raw", "false".to_string()),
            ]);
            let body = self.fetch_year(&url, &query).with_context(|| format!("failed to load {year}"))?;
            series.extend(parse_body(&body)?);
        }
        series.sort_by_key(|(timestamp, _)| *timestamp);
        info!(len = series.len(), "loaded");
        Ok(series)
    }

    /// Fetch the body, waiting out the burst limit once.
    fn fetch_year(&self, url: &str, query: &[(&'static str, String)]) -> Result<String> {
        let mut response = self.transport.fetch(url, &self.token, query)?;
        if let Some(wait) = burst_limit_wait(&response.body)? {
            warn!(?wait, "hit the burst limit, waiting…");
            (self.sleep)(wait);
            response = self.transport.fetch(url, &self.token, query)?;
            ensure!(
                burst_limit_wait(&response.body)?.is_none(),
                "still hitting the burst limit after waiting {wait:?}: {}",
                response.body,
            );
        }
        ensure!(
            response.is_success(),
            "the API responded with status {}: {}",
            response.status,
            response.body,
        );
        Ok(response.body)
    }
}

/// Extract the wait from a burst limit message, which ends like `…available in 51 seconds.`
fn burst_limit_wait(body: &str) -> Result<Option<Duration>> {
    if !body.contains("burst limit") {
        return Ok(None);
    }
    let seconds = body
        .split(' ')
        .rev()
        .nth(1)
        .context("no wait in the burst limit message")?
        .trim()
        .parse::<u64>()
        .with_context(|| format!("failed to parse the wait from `{body}`"))?;
    Ok(Some(Duration::from_secs(seconds)))
}

#[derive(Deserialize)]
struct Record {
    electricity: Option<f64>,
}

fn parse_body(body: &str) -> Result<CapacityFactors> {
    serde_json::from_str::<BTreeMap<String, Record>>(body)
        .with_context(|| format!("failed to deserialize the response: `{}`", Truncated(body)))?
        .into_iter()
        .map(|(key, record)| Ok((parse_timestamp(&key)?, record.electricity)))
        .collect()
}

/// Parse either Unix milliseconds or a naive UTC date and time.
fn parse_timestamp(key: &str) -> Result<DateTime<Utc>> {
    if let Ok(millis) = key.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis)
            .with_context(|| format!("timestamp `{millis}` is out of range"));
    }
    NaiveDateTime::parse_from_str(key, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(key, "%Y-%m-%d %H:%M"))
        .map(|timestamp| timestamp.and_utc())
        .with_context(|| format!("failed to parse timestamp `{key}`"))
}

/// Keep the error messages readable when the body is a whole year of data.
struct Truncated<'a>(&'a str);

impl Display for Truncated<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const MAX_CHARS: usize = 200;
        match self.0.char_indices().nth(MAX_CHARS) {
            Some((end, _)) => write!(f, "{}…", &self.0[..end]),
            None => write!(f, "{}", self.0),
        }
    }
}
