mod assembler;
mod config;
mod error;
mod frequency;
mod layouts;
mod public_transport_mode;
mod records;
mod segmenter;
mod timetable;
mod utils;

#[cfg(test)]
mod test_fixtures;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use frequency::{Direction, DirectionalFrequencyRow, FrequencyQuery, FrequencyTable};
use records::{Day, Family, SecondsPastMidnight};
use timetable::{Timetable, TimetableOptions};
use utils::{file_stem, find_cif_files, write_csv_file, write_json_file};

#[derive(Parser)]
#[command(about = "Reconstruct journeys from CIF timetables and count stop frequencies")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct InputArgs {
    #[clap(long)]
    input_dir_path: PathBuf,
    #[clap(long)]
    output_directory: PathBuf,
    /// Detected from the first journey record when omitted
    #[clap(long)]
    family: Option<Family>,
}

#[derive(Subcommand)]
enum Command {
    /// Write one stop-level timetable per CIF file
    Convert {
        #[clap(flatten)]
        input: InputArgs,
        /// Drop journeys first operating on or after this date (YYYY-MM-DD)
        #[clap(long)]
        first_date_before: Option<NaiveDate>,
    },
    /// Count stop visits within a weekday time window
    Frequency {
        #[clap(flatten)]
        input: InputArgs,
        #[clap(long, default_value = "tuesday")]
        day: Day,
        #[clap(long, default_value = "08:00")]
        start: SecondsPastMidnight,
        #[clap(long, default_value = "09:00")]
        end: SecondsPastMidnight,
        #[clap(long)]
        group_by_route: bool,
        #[clap(long)]
        collect_routes: bool,
        #[clap(long)]
        direction: Option<Direction>,
        /// Total, inbound and outbound counts side by side (bus/coach only)
        #[clap(long)]
        directional: bool,
        /// TOML file of `[[query]]` tables, replacing the window flags above
        #[clap(long)]
        queries: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Convert {
            input,
            first_date_before,
        } => {
            let options = TimetableOptions { first_date_before };
            fs_err::create_dir_all(input.output_directory.join("duplicates"))?;
            for_each_file(&input, |path| convert_file(path, &input, &options))
        }
        Command::Frequency {
            input,
            day,
            start,
            end,
            group_by_route,
            collect_routes,
            direction,
            directional,
            queries,
        } => {
            let queries = match queries {
                Some(path) => config::read_queries(&path)?,
                None => {
                    let query = FrequencyQuery {
                        group_by_route,
                        collect_routes,
                        direction,
                        directional,
                        ..FrequencyQuery::new(day, start, end)
                    };
                    query.validate()?;
                    vec![query]
                }
            };
            fs_err::create_dir_all(&input.output_directory)?;
            for_each_file(&input, |path| frequency_file(path, &input, &queries))
        }
    }
}

/// Runs `process` on every CIF file in parallel. A failed file is logged and
/// leaves no output; the others still complete.
fn for_each_file<F>(input: &InputArgs, process: F) -> Result<()>
where
    F: Fn(&Path) -> Result<()> + Sync,
{
    let files = find_cif_files(&input.input_dir_path)?;
    info!(
        "Analysing {} .cif files in {}",
        files.len(),
        input.input_dir_path.display()
    );

    let failures = files
        .par_iter()
        .filter_map(|path| {
            process(path)
                .map_err(|err| error!("{}: {:#}", path.display(), err))
                .err()
        })
        .count();

    if failures > 0 {
        bail!("{} of {} files failed", failures, files.len());
    }
    info!("Finished successfully.");
    Ok(())
}

fn load_timetable(path: &Path, input: &InputArgs, options: &TimetableOptions) -> Result<Timetable> {
    let raw_cif_text = timetable::read_file(path)?;
    let family = match input.family {
        Some(family) => family,
        None => Family::detect(raw_cif_text.lines())
            .with_context(|| format!("no journey records to detect the family of {}", path.display()))?,
    };
    info!("Analysing {} as a {} timetable", path.display(), family);
    let timetable = timetable::build(&raw_cif_text, family, options)
        .with_context(|| format!("decoding {}", path.display()))?;
    info!(
        "{}: {} journeys, {} stop rows",
        path.display(),
        timetable.journey_count,
        timetable.rows.len()
    );
    Ok(timetable)
}

fn convert_file(path: &Path, input: &InputArgs, options: &TimetableOptions) -> Result<()> {
    let timetable = load_timetable(path, input, options)?;
    let stem = file_stem(path);
    let output = &input.output_directory;

    match timetable.family {
        Family::Bus => {
            for (vehicle_type, rows) in timetable.by_vehicle_type() {
                let (header, records) = timetable.records(rows);
                let file = output.join(format!("{stem}_{vehicle_type}_timetable.csv"));
                write_csv_file(&file, &header, &records)?;
            }
        }
        Family::Rail => {
            let (header, records) = timetable.records(&timetable.rows);
            write_csv_file(&output.join(format!("{stem}_timetable.csv")), &header, &records)?;
        }
    }

    if !timetable.duplicates.is_empty() {
        let (header, records) = timetable.records(&timetable.duplicates);
        let file = output
            .join("duplicates")
            .join(format!("{stem}_duplicates.csv"));
        write_csv_file(&file, &header, &records)?;
    }
    Ok(())
}

enum QueryResult {
    Totals(FrequencyTable),
    Directional(Vec<DirectionalFrequencyRow>),
}

/// Evaluates every query before writing, so a failing query leaves no
/// output for the file.
fn frequency_file(path: &Path, input: &InputArgs, queries: &[FrequencyQuery]) -> Result<()> {
    let timetable = load_timetable(path, input, &TimetableOptions::default())?;
    let stem = file_stem(path);
    let output = &input.output_directory;

    let results = queries
        .par_iter()
        .map(|query| -> Result<(&FrequencyQuery, QueryResult)> {
            info!(
                "{}: {} {}-{}, calculating frequency",
                stem, query.day, query.start, query.end
            );
            let result = if query.directional {
                QueryResult::Directional(frequency::aggregate_directional(
                    &timetable.rows,
                    timetable.family,
                    query,
                )?)
            } else {
                let table = frequency::aggregate(&timetable.rows, timetable.family, query)?;
                if table.is_empty() {
                    info!("{}: no stop visits within {}", stem, query.output_stem());
                }
                QueryResult::Totals(table)
            };
            Ok((query, result))
        })
        .collect::<Result<Vec<_>>>()?;

    for (query, result) in results {
        let name = format!("{stem}_{}", query.output_stem());
        let (header, records) = match &result {
            QueryResult::Totals(table) => {
                write_json_file(&name, output, table)?;
                table.records(query)
            }
            QueryResult::Directional(rows) => {
                write_json_file(&name, output, rows)?;
                frequency::directional_records(rows, query)
            }
        };
        write_csv_file(&output.join(format!("{name}.csv")), &header, &records)?;
    }
    Ok(())
}
