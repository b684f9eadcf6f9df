//! Convenience helpers shared across command handlers.

use anyhow::{Context, Result, anyhow};
use cardsheet::{PathSource, RecordStore, ingest};
use chrono::{DateTime, Local};

use crate::cli::common::SelectionArgs;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Ingest the given files into a fresh store, printing one warning per skipped file.
pub fn load_store(args: &SelectionArgs) -> Result<RecordStore> {
    let sources: Vec<PathSource> = args.files.iter().map(PathSource::new).collect();
    let mut store = RecordStore::new();
    let report = ingest(&mut store, &sources)?;
    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }
    if store.is_empty() {
        return Err(anyhow!("no usable CSV files were loaded"));
    }
    Ok(store)
}

/// Apply file and row selection flags to a loaded store.
pub fn apply_selection(store: &mut RecordStore, args: &SelectionArgs) -> Result<()> {
    let file_count = store.files().len();
    if args.file_indices.is_empty() {
        for idx in 0..file_count {
            store.set_file_selected(idx, true)?;
        }
    } else {
        for &pos in &args.file_indices {
            if pos == 0 || pos > file_count {
                return Err(anyhow!(
                    "file index {} out of range 1..{}",
                    pos,
                    file_count
                ));
            }
            store.set_file_selected(pos - 1, true)?;
        }
    }

    match args.rows.as_deref() {
        None => store.set_all_selected(true),
        Some(expr) => {
            let rows: Vec<(usize, usize)> =
                store.table_rows().map(|(f, r, _)| (f, r)).collect();
            let picked = parse_range_expression(expr, rows.len())
                .with_context(|| format!("invalid row selection '{}'", expr))?;
            for idx in picked {
                let (file, row) = rows[idx];
                store.set_record_selected(file, row, true)?;
            }
        }
    }
    Ok(())
}

/// Expand range expressions such as `1..10,25,40..$` into zero-based row indices.
pub fn parse_range_expression(expr: &str, len: usize) -> Result<Vec<usize>> {
    if expr.trim().is_empty() {
        return Err(anyhow!("range expression cannot be empty"));
    }
    let mut indices: Vec<usize> = Vec::new();
    for part in expr.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((start_raw, end_raw)) = part.split_once("..") {
            let start = parse_range_bound(start_raw.trim(), len)?;
            let end = parse_range_bound(end_raw.trim(), len)?;
            if start > end {
                return Err(anyhow!("range {}..{} is invalid", start, end));
            }
            indices.extend((start..=end).map(|value| value - 1));
        } else {
            indices.push(parse_range_bound(part, len)? - 1);
        }
    }
    if indices.is_empty() {
        return Err(anyhow!("no rows resolved from '{}'", expr));
    }
    let mut unique: Vec<usize> = Vec::new();
    for idx in indices {
        if idx >= len {
            return Err(anyhow!("row {} out of range 1..{}", idx + 1, len));
        }
        if !unique.contains(&idx) {
            unique.push(idx);
        }
    }
    Ok(unique)
}

fn parse_range_bound(token: &str, len: usize) -> Result<usize> {
    if token.is_empty() {
        return Err(anyhow!("range bound cannot be empty"));
    }
    if token == "$" {
        if len == 0 {
            return Err(anyhow!("table is empty; '$' is undefined"));
        }
        return Ok(len);
    }
    let value: usize = token
        .parse()
        .map_err(|_| anyhow!("range bound '{}' is not a number", token))?;
    if value == 0 {
        return Err(anyhow!("row numbers are 1-based"));
    }
    Ok(value)
}

/// Human-readable byte count: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0usize;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

/// Local date and time of an upload, e.g. `10/16/2026 09:05:00 AM`.
pub fn format_upload_date(at: &DateTime<Local>) -> String {
    at.format("%m/%d/%Y %I:%M:%S %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024 * 1024), "5120 GB");
    }

    #[test]
    fn upload_date_format() {
        let at = Local.with_ymd_and_hms(2026, 10, 16, 21, 5, 0).unwrap();
        assert_eq!(format_upload_date(&at), "10/16/2026 09:05:00 PM");
    }

    #[test]
    fn range_expressions() {
        assert_eq!(parse_range_expression("1..3,5", 6).unwrap(), vec![0, 1, 2, 4]);
        assert_eq!(parse_range_expression("4..$", 5).unwrap(), vec![3, 4]);
        assert_eq!(parse_range_expression("2,2,1", 3).unwrap(), vec![1, 0]);
        assert!(parse_range_expression("0", 3).is_err());
        assert!(parse_range_expression("3..1", 3).is_err());
        assert!(parse_range_expression("7", 3).is_err());
        assert!(parse_range_expression(" ", 3).is_err());
    }
}
