// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use fleetlease_solver::solver::{Solver, SolverConfig};
use std::{path::PathBuf, process::ExitCode, time::Duration};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: fleetlease <instance> [time-limit-seconds]";

fn enable_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn parse_args() -> Result<(PathBuf, Option<Duration>), String> {
    let mut args = std::env::args().skip(1);
    let path = args.next().map(PathBuf::from).ok_or_else(|| USAGE.to_string())?;
    let time_limit = match args.next() {
        Some(secs) => {
            let secs: f64 = secs
                .parse()
                .map_err(|_| format!("invalid time limit '{}'\n{}", secs, USAGE))?;
            if !secs.is_finite() || secs < 0.0 {
                return Err(format!("invalid time limit '{}'\n{}", secs, USAGE));
            }
            Some(Duration::from_secs_f64(secs))
        }
        None => None,
    };
    Ok((path, time_limit))
}

fn main() -> ExitCode {
    enable_tracing();

    let (path, time_limit) = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::from(2);
        }
    };

    let mut config = SolverConfig::default().with_log_interval(Duration::from_secs(1));
    if let Some(limit) = time_limit {
        config = config.with_time_limit(limit);
    }
    let solver = Solver::new(config);

    let instance = match solver.load_instance(&path) {
        Ok(instance) => instance,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "cannot load instance");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        path = %path.display(),
        equipment = instance.num_equipment(),
        orders = instance.num_orders(),
        "instance loaded"
    );

    match solver.solve(&instance) {
        Ok(outcome) => {
            println!("{}", outcome);
            println!("{}", outcome.solution());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "search failed");
            ExitCode::FAILURE
        }
    }
}
