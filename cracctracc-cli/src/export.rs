//! CSV export of an assembled track

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use cracctracc_core::{AssembledTrack, ClassifiedSample, ManoeuvreEvent};

/// Files written for one track
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPaths {
    pub metrics: PathBuf,
    pub manoeuvres: PathBuf,
}

pub fn write_rows<W: Write>(rows: &[ClassifiedSample], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_manoeuvres<W: Write>(events: &[ManoeuvreEvent], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for event in events {
        writer.serialize(event)?;
    }
    writer.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}

/// Write `<stem>-metrics.csv` and `<stem>-manoeuvres.csv` into `dir`
pub fn write_track(track: &AssembledTrack, dir: &Path, stem: &str) -> Result<ExportPaths> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let paths = ExportPaths {
        metrics: dir.join(format!("{}-metrics.csv", stem)),
        manoeuvres: dir.join(format!("{}-manoeuvres.csv", stem)),
    };
    write_rows(&track.rows, create(&paths.metrics)?)?;
    write_manoeuvres(&track.manoeuvres, create(&paths.manoeuvres)?)?;

    log::info!(
        "{}: wrote {} and {}",
        track.id,
        paths.metrics.display(),
        paths.manoeuvres.display()
    );
    Ok(paths)
}
