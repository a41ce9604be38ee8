//! Text, CSV and JSON writers for the tables handed to charting tools.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use tabwriter::TabWriter;

use crate::dashboard::ComparisonRow;
use crate::model::{Indicator, Observation, Target};

/// A row with a fixed set of columns.
pub trait TableRow {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

fn opt_num(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

impl TableRow for Observation {
    fn headers() -> &'static [&'static str] {
        &["year", "value", "location", "variant"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.year.to_string(),
            opt_num(self.value),
            self.location.clone(),
            self.variant.clone(),
        ]
    }
}

impl TableRow for ComparisonRow {
    fn headers() -> &'static [&'static str] {
        &[
            "year",
            "value",
            "location",
            "variant",
            "indicator",
            "normalized_value",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.year.to_string(),
            opt_num(self.value),
            self.location.clone(),
            self.variant.clone(),
            self.indicator.clone(),
            opt_num(self.normalized_value),
        ]
    }
}

impl TableRow for Indicator {
    fn headers() -> &'static [&'static str] {
        &["id", "name"]
    }

    fn cells(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone()]
    }
}

impl TableRow for Target {
    fn headers() -> &'static [&'static str] {
        &["id", "name"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.map(|id| id.to_string()).unwrap_or_default(),
            self.name.clone().unwrap_or_default(),
        ]
    }
}

/// Writes tab-aligned columns with a header line.
pub fn write_table<W: Write, R: TableRow>(out: W, rows: &[R]) -> Result<()> {
    let mut tw = TabWriter::new(out).padding(2);
    writeln!(tw, "{}", R::headers().join("\t"))?;
    for row in rows {
        writeln!(tw, "{}", row.cells().join("\t"))?;
    }
    tw.flush().context("failed to write table")?;
    Ok(())
}

pub fn write_csv<W: Write, R: TableRow>(out: W, rows: &[R]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(R::headers())?;
    for row in rows {
        wtr.write_record(row.cells())?;
    }
    wtr.flush().context("failed to write CSV")?;
    Ok(())
}

pub fn write_json<W: Write, R: Serialize>(mut out: W, rows: &[R]) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, rows).context("failed to write JSON")?;
    writeln!(out)?;
    Ok(())
}
