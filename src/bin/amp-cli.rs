use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use amp_client::common::option::{resolve, ClientConfigFile};
use amp_client::credential::ChainCredentialSource;
use amp_client::formatter::{format_metric_names, format_query_result};
use amp_client::load_generator::{default_metrics, CancelToken, LoadGenerator, DEFAULT_INTERVAL};
use amp_client::query::{RangeSpec, DEFAULT_STEP};
use amp_client::{
    AmpClient, AmpErr, Label, Labels, Result, CONFIG_ARG, ENDPOINT_ARG, REGION_ARG, TIMEOUT_ARG, WORKSPACE_ARG,
};

#[macro_use]
extern crate log;

const WRITE_CMD: &str = "write";
const QUERY_CMD: &str = "query";
const METRICS_CMD: &str = "metrics";
const SIMULATE_CMD: &str = "simulate";

///
/// Command line client for a managed prometheus workspace
/// subcommands:
/// write <name> <value> [-l k=v]..., push one sample
/// query <expr> [--range], instant or range query
/// metrics, list metric names
/// simulate, write random samples on an interval
///
fn main() {
    env_logger::init();

    let matches = App::new("amp-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("managed prometheus workspace client")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .args(&[
            Arg::with_name(WORKSPACE_ARG)
                .short("w")
                .long(WORKSPACE_ARG)
                .takes_value(true),
            Arg::with_name(REGION_ARG).short("r").long(REGION_ARG).takes_value(true),
            Arg::with_name(ENDPOINT_ARG).long(ENDPOINT_ARG).takes_value(true),
            Arg::with_name(CONFIG_ARG).short("c").long(CONFIG_ARG).takes_value(true),
            Arg::with_name(TIMEOUT_ARG).long(TIMEOUT_ARG).takes_value(true),
        ])
        .subcommand(
            SubCommand::with_name(WRITE_CMD)
                .about("write one sample stamped with the current time")
                .arg(Arg::with_name("name").required(true))
                .arg(Arg::with_name("value").required(true).allow_hyphen_values(true))
                .arg(
                    Arg::with_name("label")
                        .short("l")
                        .long("label")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1),
                ),
        )
        .subcommand(
            SubCommand::with_name(QUERY_CMD)
                .about("run a promql query")
                .arg(Arg::with_name("expr").required(true))
                .arg(Arg::with_name("range").long("range"))
                .arg(Arg::with_name("start").long("start").takes_value(true))
                .arg(Arg::with_name("end").long("end").takes_value(true))
                .arg(Arg::with_name("step").long("step").default_value(DEFAULT_STEP)),
        )
        .subcommand(SubCommand::with_name(METRICS_CMD).about("list available metric names"))
        .subcommand(
            SubCommand::with_name(SIMULATE_CMD)
                .about("write random samples every interval")
                .arg(Arg::with_name("interval").long("interval").takes_value(true))
                .arg(Arg::with_name("duration").long("duration").takes_value(true))
                .arg(Arg::with_name("ticks").long("ticks").takes_value(true)),
        )
        .get_matches();

    if let Err(e) = run(&matches) {
        error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let file = ClientConfigFile::from_matches(matches)?;
    let interval_secs = file.interval_secs;
    let file_metrics = file.metrics.clone();
    let opts = resolve(matches, file)?;
    info!("using workspace at {}", opts.base_url()?);
    let client = AmpClient::new(&opts, Arc::new(ChainCredentialSource::default_chain()))?;

    match matches.subcommand() {
        (WRITE_CMD, Some(sub)) => {
            let name = sub.value_of("name").unwrap_or_default();
            let value: f64 = sub.value_of("value").unwrap_or_default().parse()?;
            let labels = parse_labels(sub.values_of("label").map(|v| v.collect()).unwrap_or_default())?;
            client.write_metric(name, value, &labels)?;
            info!("wrote {}{}={}", name, labels, value);
        }
        (QUERY_CMD, Some(sub)) => {
            let expr = sub.value_of("expr").unwrap_or_default();
            let result = if sub.is_present("range") {
                let range = RangeSpec::new(
                    parse_time(sub.value_of("start"))?,
                    parse_time(sub.value_of("end"))?,
                    sub.value_of("step").unwrap_or(DEFAULT_STEP),
                );
                client.query_range(expr, &range)?
            } else {
                client.query(expr)?
            };
            print!("{}", format_query_result(&result));
        }
        (METRICS_CMD, Some(_)) => {
            print!("{}", format_metric_names(&client.list_metric_names()?));
        }
        (SIMULATE_CMD, Some(sub)) => {
            let interval = match sub.value_of("interval") {
                Some(raw) => Duration::from_secs(raw.parse()?),
                None => interval_secs.map(Duration::from_secs).unwrap_or(DEFAULT_INTERVAL),
            };
            let deadline = match sub.value_of("duration") {
                Some(raw) => Some(
                    Instant::now()
                        .checked_add(Duration::from_secs(raw.parse()?))
                        .ok_or_else(|| AmpErr::OptionErr(format!("duration {} is too large", raw)))?,
                ),
                None => None,
            };
            let mut generator = LoadGenerator::new(file_metrics.unwrap_or_else(default_metrics), interval);
            if let Some(raw) = sub.value_of("ticks") {
                generator = generator.max_ticks(raw.parse()?);
            }
            let report = generator.run(&client, &CancelToken::new(), deadline);
            println!(
                "ticks: {}, written: {}, failed: {}",
                report.ticks, report.written, report.failed
            );
        }
        _ => return Err(AmpErr::OptionErr("no command given".to_string())),
    }
    Ok(())
}

fn parse_labels(raw: Vec<&str>) -> Result<Labels> {
    let mut labels = Labels::new();
    for pair in raw {
        match pair.find('=') {
            Some(idx) if idx > 0 => labels.add(Label::from(&pair[..idx], &pair[idx + 1..])),
            _ => return Err(AmpErr::OptionErr(format!("label {:?} is not key=value", pair))),
        }
    }
    Ok(labels)
}

fn parse_time(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match raw {
        Some(s) => Ok(Some(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))),
        None => Ok(None),
    }
}
