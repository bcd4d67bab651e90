// Crawlcheck is an open source robots.txt parser and matcher.
// Copyright (C) 2024 Crawlcheck ApS
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::prelude::*;

/// Parses robots.txt and matches the given agents against it to determine
/// whether any of them is allowed to visit the given URL.
///
/// Prints ALLOWED or DISALLOWED and exits 0 or 1 accordingly; read
/// failures exit 2 and invalid flags exit 3.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Candidate user-agent token. May be repeated.
    #[clap(short, long = "agent", required = true)]
    agents: Vec<String>,

    /// Absolute URL to check.
    #[clap(short, long)]
    url: String,

    /// Path to a robots.txt file. Bytes are read from stdin when omitted.
    #[clap(short, long)]
    file: Option<PathBuf>,
}

fn read_robotstxt(file: Option<&PathBuf>) -> anyhow::Result<Vec<u8>> {
    match file {
        Some(path) => {
            fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))
        }
        None => {
            let mut body = Vec::new();
            std::io::stdin()
                .read_to_end(&mut body)
                .context("failed to read robots.txt from stdin")?;
            Ok(body)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .finish()
        .init();

    // clap exits 2 on bad flags by default; the contract here is 3.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::from(3),
            };
        }
    };

    let body = match read_robotstxt(args.file.as_ref()) {
        Ok(body) => body,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            return ExitCode::from(2);
        }
    };

    let document = crawlcheck::parse(&body);
    let matcher = document.matcher();

    let mut allowed = false;
    for agent in &args.agents {
        match matcher.allowed_single(agent, &args.url) {
            Ok(true) => {
                allowed = true;
                break;
            }
            Ok(false) => {}
            Err(err) => {
                eprintln!("ERROR: {err}");
                return ExitCode::from(2);
            }
        }
    }

    if allowed {
        println!("ALLOWED");
        ExitCode::SUCCESS
    } else {
        println!("DISALLOWED");
        ExitCode::from(1)
    }
}
