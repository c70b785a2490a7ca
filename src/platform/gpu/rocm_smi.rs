use std::time::Duration;

use crate::core::system_monitor::{parse_reading, GpuBackend, GpuDevice, GpuReading, GpuVendor};
use crate::error::{MonitorError, Result};
use crate::platform::command::run_tool;

const TOOL: &str = "rocm-smi";

/// AMD GPUs through the `rocm-smi` command-line tool (CSV mode)
pub struct RocmSmi {
    timeout: Duration,
}

impl RocmSmi {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl GpuBackend for RocmSmi {
    fn name(&self) -> &'static str {
        TOOL
    }

    fn vendor(&self) -> Option<GpuVendor> {
        Some(GpuVendor::Amd)
    }

    fn inventory(&self) -> Result<Vec<GpuDevice>> {
        let stdout = run_tool(TOOL, &["--showproductname", "--csv"], self.timeout)?;
        parse_inventory(&stdout)
    }

    fn readings(&self) -> Result<Vec<GpuReading>> {
        let stdout = run_tool(TOOL, &["--showuse", "--showtemp", "--csv"], self.timeout)?;
        parse_readings(&stdout)
    }
}

/// Header row and data rows of a rocm-smi CSV table.
///
/// rocm-smi may print warnings before the table, so everything up to the
/// `device,...` header is skipped.
fn csv_table(stdout: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut lines = stdout
        .lines()
        .map(str::trim)
        .skip_while(|line| !line.to_ascii_lowercase().starts_with("device,"));

    let header = lines
        .next()
        .map(split_csv_line)
        .ok_or_else(|| MonitorError::parse(format!("no CSV header in {} output", TOOL)))?;

    let rows = lines
        .filter(|line| !line.is_empty())
        .map(split_csv_line)
        .collect();

    Ok((header, rows))
}

fn column(header: &[String], matches: impl Fn(&str) -> bool) -> Option<usize> {
    header
        .iter()
        .position(|name| matches(&name.to_ascii_lowercase()))
}

/// Split one CSV line, honouring double-quoted fields
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Parse `--showproductname --csv` output
pub fn parse_inventory(stdout: &str) -> Result<Vec<GpuDevice>> {
    let (header, rows) = csv_table(stdout)?;

    let name_col = column(&header, |h| h == "card series")
        .or_else(|| column(&header, |h| h == "card model"))
        .or_else(|| column(&header, |h| h.contains("sku")))
        .ok_or_else(|| MonitorError::parse("no product name column"))?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            let id = row.first()?.clone();
            let name = row.get(name_col)?.clone();
            (!name.is_empty()).then(|| GpuDevice::new(name, GpuVendor::Amd).with_id(id))
        })
        .collect())
}

/// Parse `--showuse --showtemp --csv` output. The edge sensor is preferred.
pub fn parse_readings(stdout: &str) -> Result<Vec<GpuReading>> {
    let (header, rows) = csv_table(stdout)?;

    let use_col = column(&header, |h| h.contains("gpu use"));
    let temp_col = column(&header, |h| h.contains("temperature") && h.contains("edge"))
        .or_else(|| column(&header, |h| h.contains("temperature")));

    if use_col.is_none() && temp_col.is_none() {
        return Err(MonitorError::parse("no usage or temperature column"));
    }

    let field = |row: &Vec<String>, col: Option<usize>| {
        col.and_then(|c| row.get(c)).and_then(|v| parse_reading(v))
    };

    Ok(rows
        .iter()
        .map(|row| GpuReading {
            id: row.first().cloned(),
            usage_percent: field(row, use_col),
            temp_celsius: field(row, temp_col),
        })
        .collect())
}
