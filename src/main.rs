//! Load forecaster entry point: CLI wiring and config-driven registry construction.

use std::path::Path;
use std::process;
use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use tracing::{info, warn};

use load_forecast::Error;
use load_forecast::backtest::backtest;
use load_forecast::config::ForecastConfig;
use load_forecast::forecast::{Horizon, RecursiveForecaster, StateForecast};
use load_forecast::io::export::export_csv;
use load_forecast::logging::init_tracing;
use load_forecast::registry::StateModelRegistry;
use load_forecast::synthetic::SyntheticRegistry;

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    states: Vec<String>,
    all_states: bool,
    target: Option<NaiveDate>,
    days: Option<usize>,
    demo: bool,
    backtest_days: Option<usize>,
    list_states: bool,
    out: Option<String>,
    json_logs: bool,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
}

fn print_help() {
    eprintln!("load-forecast: recursive multi-day electricity load forecaster");
    eprintln!();
    eprintln!("Usage: load-forecast [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>          Load configuration from TOML file");
    eprintln!("  --state <name>           State to forecast (repeatable, short names allowed)");
    eprintln!("  --all-states             Forecast every state in the registry");
    eprintln!("  --target <YYYY-MM-DD>    Forecast up to and including this date");
    eprintln!("  --days <n>               Forecast n days past the last historical date");
    eprintln!("  --demo                   Use seeded synthetic data instead of files");
    eprintln!("  --backtest <days>        Hold out the last <days> records and score the forecast");
    eprintln!("  --list-states            Print the states the registry can resolve");
    eprintln!("  --out <path>             Export the forecast to CSV (single state only)");
    eprintln!("  --json-logs              Emit logs as JSON lines on stderr");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start REST API server");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("Without --target or --days, forecast.default_days from the config is used.");
}

/// Returns the value following the flag at `args[*i]`, advancing `i`.
fn take_value<'a>(args: &'a [String], i: &mut usize, flag: &str, what: &str) -> &'a str {
    *i += 1;
    match args.get(*i) {
        Some(value) => value.as_str(),
        None => {
            eprintln!("error: {flag} requires {what} argument");
            process::exit(1);
        }
    }
}

fn parse_or_exit<T: std::str::FromStr>(value: &str, flag: &str, what: &str) -> T {
    value.parse::<T>().unwrap_or_else(|_| {
        eprintln!("error: {flag} value \"{value}\" is not a valid {what}");
        process::exit(1);
    })
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        states: Vec::new(),
        all_states: false,
        target: None,
        days: None,
        demo: false,
        backtest_days: None,
        list_states: false,
        out: None,
        json_logs: false,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => {
                cli.config_path = Some(take_value(&args, &mut i, "--config", "a path").to_string());
            }
            "--state" => {
                cli.states
                    .push(take_value(&args, &mut i, "--state", "a name").to_string());
            }
            "--all-states" => cli.all_states = true,
            "--target" => {
                let value = take_value(&args, &mut i, "--target", "a date");
                match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                    Ok(date) => cli.target = Some(date),
                    Err(_) => {
                        eprintln!("error: --target value \"{value}\" is not a YYYY-MM-DD date");
                        process::exit(1);
                    }
                }
            }
            "--days" => {
                let value = take_value(&args, &mut i, "--days", "a count");
                cli.days = Some(parse_or_exit(value, "--days", "day count"));
            }
            "--demo" => cli.demo = true,
            "--backtest" => {
                let value = take_value(&args, &mut i, "--backtest", "a day count");
                cli.backtest_days = Some(parse_or_exit(value, "--backtest", "day count"));
            }
            "--list-states" => cli.list_states = true,
            "--out" => {
                cli.out = Some(take_value(&args, &mut i, "--out", "a path").to_string());
            }
            "--json-logs" => cli.json_logs = true,
            #[cfg(feature = "api")]
            "--serve" => cli.serve = true,
            #[cfg(feature = "api")]
            "--port" => {
                let value = take_value(&args, &mut i, "--port", "a u16");
                cli.port = parse_or_exit(value, "--port", "u16");
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    if cli.target.is_some() && cli.days.is_some() {
        eprintln!("error: give either --target or --days, not both");
        process::exit(1);
    }

    cli
}

fn load_config(cli: &CliArgs) -> ForecastConfig {
    let cfg = match cli.config_path {
        Some(ref path) => ForecastConfig::from_toml_file(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        }),
        None => ForecastConfig::default(),
    };

    let errors = cfg.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    cfg
}

/// Forecasts each state on its own thread, returning results in input order.
fn forecast_states(
    forecaster: &RecursiveForecaster,
    registry: &dyn StateModelRegistry,
    states: &[String],
    horizon: Horizon,
) -> Vec<(String, Result<StateForecast, Error>)> {
    thread::scope(|scope| {
        let handles: Vec<_> = states
            .iter()
            .map(|state| {
                scope.spawn(move || forecaster.forecast_state(registry, state, horizon))
            })
            .collect();
        states
            .iter()
            .zip(handles)
            .filter_map(|(state, handle)| match handle.join() {
                Ok(result) => Some((state.clone(), result)),
                Err(_) => {
                    eprintln!("error: forecast thread for \"{state}\" panicked");
                    None
                }
            })
            .collect()
    })
}

fn print_forecast(forecast: &StateForecast) {
    println!(
        "== {} ({} model, last actual {} = {:.2}) ==",
        forecast.state, forecast.model, forecast.last_date, forecast.last_load
    );
    for step in &forecast.steps {
        println!("{step}");
    }
}

/// Runs the backtest for each state. Returns `false` if any failed.
fn run_backtests(
    forecaster: &RecursiveForecaster,
    registry: &dyn StateModelRegistry,
    states: &[String],
    holdout_days: usize,
) -> bool {
    let mut ok = true;
    for state in states {
        let result = registry
            .resolve(state)
            .map_err(Error::from)
            .and_then(|(model, series)| {
                backtest(forecaster, &series, model.as_ref(), holdout_days).map_err(Error::from)
            });
        match result {
            Ok(report) => {
                println!("== {state} ({} model, {holdout_days}-day holdout) ==", report.model);
                for (step, actual) in report.steps.iter().zip(&report.actuals) {
                    println!(
                        "{} | predicted={:>10.2}  actual={:>10.2}",
                        step.date, step.predicted_load, actual
                    );
                }
                println!("\n{}\n", report.accuracy);
            }
            Err(e) => {
                eprintln!("error: {state}: {e}");
                ok = false;
            }
        }
    }
    ok
}

fn main() {
    let cli = parse_args();
    let cfg = load_config(&cli);

    if let Err(e) = init_tracing(cli.json_logs || cfg.logging.json, &cfg.logging.filter) {
        eprintln!("warning: logging not initialised: {e}");
    }

    let registry: Arc<dyn StateModelRegistry> = if cli.demo {
        info!(seed = cfg.data.demo_seed, "using synthetic demo registry");
        Arc::new(SyntheticRegistry::demo(cfg.data.demo_seed))
    } else {
        Arc::new(cfg.directory_registry())
    };
    let forecaster = cfg.forecaster();

    let states = if cli.all_states || cli.list_states {
        registry.states().unwrap_or_else(|e| {
            eprintln!("error: {e}");
            process::exit(1);
        })
    } else {
        cli.states.clone()
    };

    if cli.list_states {
        for state in &states {
            println!("{state}");
        }
    }

    let run_forecasts = !cli.list_states || cli.all_states || !cli.states.is_empty();
    let targets: &[String] = if cli.all_states { &states } else { &cli.states };
    let mut failed = false;

    if run_forecasts && !targets.is_empty() {
        if let Some(holdout_days) = cli.backtest_days {
            failed = !run_backtests(&forecaster, registry.as_ref(), targets, holdout_days);
        } else {
            let horizon = match (cli.target, cli.days) {
                (Some(date), _) => Horizon::Until(date),
                (None, Some(days)) => Horizon::Days(days),
                (None, None) => Horizon::Days(cfg.forecast.default_days),
            };
            let results = forecast_states(&forecaster, registry.as_ref(), targets, horizon);
            failed = results.len() != targets.len();

            for (state, result) in &results {
                match result {
                    Ok(forecast) => {
                        print_forecast(forecast);
                        println!();
                    }
                    Err(e) => {
                        eprintln!("error: {state}: {e}");
                        failed = true;
                    }
                }
            }

            if let Some(ref path) = cli.out {
                match results.as_slice() {
                    [(_, Ok(forecast))] => {
                        if let Err(e) = export_csv(&forecast.steps, Path::new(path)) {
                            eprintln!("error: failed to write CSV: {e}");
                            process::exit(1);
                        }
                        eprintln!("Forecast written to {path}");
                    }
                    [_] => {}
                    _ => {
                        eprintln!("error: --out needs exactly one state");
                        failed = true;
                    }
                }
            }
        }
    } else if !cli.list_states {
        #[cfg(feature = "api")]
        let idle = !cli.serve;
        #[cfg(not(feature = "api"))]
        let idle = true;
        if idle {
            warn!("no state given");
            eprintln!("error: give --state <name>, --all-states or --list-states");
            print_help();
            process::exit(1);
        }
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;

        let state = Arc::new(load_forecast::api::AppState {
            registry,
            forecaster,
            default_days: cfg.forecast.default_days,
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(load_forecast::api::serve(state, addr)) {
            eprintln!("error: server failed: {e}");
            process::exit(1);
        }
    }

    if failed {
        process::exit(1);
    }
}
