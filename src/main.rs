#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod cli;
mod core;
mod prelude;
mod quantity;
mod tables;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command, balance, dispatch, fetch, hedge, smooth},
    prelude::*,
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Dispatch(args) => dispatch(&args)?,
        Command::Balance(args) => balance(&args)?,
        Command::Hedge(args) => hedge(&args)?,
        Command::Smooth(args) => smooth(&args)?,
        Command::Fetch(args) => fetch(&args)?,
    }

    info!("done!");
    Ok(())
}
