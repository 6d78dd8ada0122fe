use anyhow::{Context, Result};
use fs_err::File;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Creates a progress bar for monitoring function progress.
pub fn progress_bar_for_count(count: usize) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {human_pos}/{human_len} ({per_sec}, {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(count as u64).with_style(style)
}

/// All `.cif` files directly inside a directory, sorted by path.
pub fn find_cif_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs_err::read_dir(directory)? {
        let path = entry?.path();
        let is_cif = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("cif"));
        if path.is_file() && is_cif {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn write_json_file<T: Serialize>(file_name: &str, output_directory: &Path, data: T) -> Result<()> {
    let path = output_directory.join(format!("{file_name}.json"));
    info!("Writing to {}", path.display());
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &data)?;
    writer.flush()?;
    Ok(())
}

pub fn write_csv_file(path: &Path, header: &[&str], records: &[Vec<String>]) -> Result<()> {
    info!("Writing to {}", path.display());
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    writer.write_record(header)?;
    for record in records {
        writer
            .write_record(record)
            .with_context(|| format!("writing CSV row to {}", path.display()))?;
    }
    writer.flush()?;
    Ok(())
}
