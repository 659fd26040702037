pub mod battery;
mod dispatch;
mod fetch;
mod hedge;
pub mod horizon;
mod ninja;
pub mod prices;
mod smooth;
pub mod solver;

use clap::{Parser, Subcommand};

pub use self::{
    dispatch::{balance, dispatch},
    fetch::fetch,
    hedge::hedge,
    smooth::smooth,
};
use crate::cli::{
    dispatch::{BalanceArgs, DispatchArgs},
    fetch::FetchArgs,
    hedge::HedgeArgs,
    smooth::SmoothArgs,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deterministic dispatch over a whole year, ending at the state of charge it started with.
    #[clap(name = "dispatch")]
    Dispatch(Box<DispatchArgs>),

    /// Deterministic dispatch shared by several initial states of charge.
    #[clap(name = "balance")]
    Balance(Box<BalanceArgs>),

    /// Stochastic dispatch with unrealized volumes and a risk penalty.
    #[clap(name = "hedge")]
    Hedge(Box<HedgeArgs>),

    /// Sweep battery sizes that smooth a wind farm's revenue.
    #[clap(name = "smooth")]
    Smooth(Box<SmoothArgs>),

    /// Download Renewables.ninja capacity factors.
    #[clap(name = "fetch")]
    Fetch(Box<FetchArgs>),
}
