//! Developer utility: run the survival pipeline headlessly and print one record's report.

use std::path::PathBuf;

use gridsurv::dataset::synthetic;
use gridsurv::logging;
use gridsurv::session::Session;
use gridsurv::settings::{self, AppSettings};
use gridsurv::views::{DerivedView, GroupedSurvival};

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    data: Option<PathBuf>,
    index: usize,
    group: Option<String>,
    synthetic: Option<usize>,
    seed: Option<u64>,
    json: bool,
}

fn main() {
    if let Err(err) = logging::init_with_console(logging::Console::Stderr) {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    let mut settings = settings::config_path()
        .and_then(|path| settings::load_settings_from(&path))
        .unwrap_or_else(|err| {
            eprintln!("Using default settings: {err}");
            AppSettings::default()
        });
    if let Some(data) = &options.data {
        settings.data.path = data.clone();
    }
    if options.seed.is_some() {
        settings.data.seed = options.seed;
    }

    let mut session = match options.synthetic {
        Some(size) => {
            let seed = settings.data.seed.unwrap_or_else(rand::random);
            let dataset = synthetic::synthesize_seeded(size, seed);
            Session::with_dataset(dataset, &settings).map_err(|err| err.to_string())?
        }
        None => {
            let startup = Session::start(&settings).map_err(|err| err.to_string())?;
            if let Some(notice) = &startup.notice {
                eprintln!("warning: {notice}");
            }
            startup.session
        }
    };
    if let Some(group) = &options.group {
        session
            .change_grouping(group)
            .map_err(|err| err.to_string())?;
    }
    let view = session.select(options.index).map_err(|err| err.to_string())?;

    if options.json {
        let json = serde_json::to_string_pretty(&view).map_err(|err| err.to_string())?;
        println!("{json}");
    } else {
        print_text(&session, &view);
    }
    Ok(())
}

fn print_text(session: &Session, view: &DerivedView) {
    let diagnostics = session.model().diagnostics();
    println!("Source: {}", session.dataset().origin().label());
    println!(
        "Records: {}  Failures: {}  Iterations: {}  LR statistic: {:.2}",
        diagnostics.observations,
        diagnostics.events,
        diagnostics.iterations,
        diagnostics.likelihood_ratio()
    );
    println!();
    println!("{}", view.summary);
    println!(
        "Risk: {} (partial hazard {:.3})  Load: {:.0} MW ({:.0}%)",
        view.risk.label(),
        view.partial_hazard,
        view.load_mw,
        view.load_percent
    );
    match view.median_survival {
        Some(time) => println!("Median survival time: {time:.0}"),
        None => println!("Median survival time: not reached"),
    }
    println!();
    println!("{}", view.report);
    match &view.grouped {
        GroupedSurvival::Curves { group_by, groups } => {
            println!("Kaplan-Meier groups by {}:", group_by.label());
            for group in groups {
                let median = group
                    .curve
                    .median_survival_time()
                    .map(|time| format!("{time:.0}"))
                    .unwrap_or_else(|| "not reached".to_string());
                println!(
                    "  {}: n={} median={median}",
                    group.label,
                    group.curve.observations()
                );
            }
        }
        GroupedSurvival::Unavailable(reason) => println!("{reason}"),
    }
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--data" => {
                let value = flag_value(&args, &mut idx, "--data")?;
                options.data = Some(PathBuf::from(value));
            }
            "--index" => {
                let value = flag_value(&args, &mut idx, "--index")?;
                options.index = parse_number(value, "--index")?;
            }
            "--group" => {
                options.group = Some(flag_value(&args, &mut idx, "--group")?.to_string());
            }
            "--synthetic" => {
                let value = flag_value(&args, &mut idx, "--synthetic")?;
                options.synthetic = Some(parse_number(value, "--synthetic")?);
            }
            "--seed" => {
                let value = flag_value(&args, &mut idx, "--seed")?;
                options.seed = Some(parse_number(value, "--seed")?);
            }
            "--json" => options.json = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    if options.data.is_some() && options.synthetic.is_some() {
        return Err("--data and --synthetic are mutually exclusive".to_string());
    }
    Ok(Some(options))
}

fn flag_value<'a>(args: &'a [String], idx: &mut usize, flag: &str) -> Result<&'a str, String> {
    *idx += 1;
    args.get(*idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{flag} expects a non-negative integer, got '{value}'"))
}

fn help_text() -> String {
    [
        "gridsurv-report",
        "",
        "Usage:",
        "  gridsurv-report [--data <file.csv> | --synthetic <n>] [--seed <u64>]",
        "                  [--index <n>] [--group <column>] [--json]",
        "",
        "Without --data or --synthetic the configured data file is used,",
        "falling back to generated records when it cannot be loaded.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parses_all_flags() {
        let options = parse_args(args(&[
            "--synthetic", "50", "--seed", "9", "--index", "3", "--group", "category", "--json",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(
            options,
            CliOptions {
                data: None,
                index: 3,
                group: Some("category".to_string()),
                synthetic: Some(50),
                seed: Some(9),
                json: true,
            }
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(args(&["--index"])).is_err());
        assert!(parse_args(args(&["--index", "-1"])).is_err());
        assert!(parse_args(args(&["--verbose"])).is_err());
        assert!(parse_args(args(&["--data", "a.csv", "--synthetic", "5"])).is_err());
    }
}
