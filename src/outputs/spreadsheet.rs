//! Spreadsheet export of the stored PhD offers.
//!
//! Each export is a new `.xlsx` file named after the moment it was written:
//!
//! ```text
//! output_dir/
//! ├── inria_phd_positions_20250506_143000.xlsx
//! └── inria_phd_positions_20250507_143000.xlsx
//! ```
//!
//! The single worksheet mirrors the `jobs` table minus the `is_phd` flag, with
//! a styled header row and column widths sized for the expected content.

use crate::models::JobPosting;
use crate::store::JobStore;
use crate::utils::{display_timestamp, ensure_writable_dir, file_timestamp};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub const EXPORT_FILE_PREFIX: &str = "inria_phd_positions_";
pub const EXPORT_FILE_EXTENSION: &str = "xlsx";
pub const SHEET_NAME: &str = "INRIA PhD Positions";

/// Exported columns with their display widths, in table order.
pub const EXPORT_COLUMNS: [(&str, f64); 12] = [
    ("job_id", 12.0),
    ("title", 40.0),
    ("location", 15.0),
    ("team", 15.0),
    ("posted_date", 12.0),
    ("deadline", 12.0),
    ("summary", 60.0),
    ("link", 40.0),
    ("keywords", 30.0),
    ("supervisor", 25.0),
    ("funding", 25.0),
    ("last_updated", 17.0),
];

/// Write every stored PhD offer to a new timestamped spreadsheet.
///
/// # Returns
///
/// The path of the written file, or `None` when the store holds no PhD
/// offers. In that case nothing is written, not even the output directory.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn export_phd_postings(
    store: &JobStore,
    output_dir: &Path,
) -> Result<Option<PathBuf>, Box<dyn Error>> {
    let jobs = store.phd_postings()?;
    if jobs.is_empty() {
        warn!("No PhD positions found in database. Export aborted.");
        return Ok(None);
    }

    ensure_writable_dir(output_dir).await?;
    let path = export_path(output_dir, &file_timestamp());
    write_workbook(&path, &jobs)?;

    info!(path = %path.display(), rows = jobs.len(), "Exported data");
    Ok(Some(path))
}

/// First free `inria_phd_positions_<stamp>[_N].xlsx` path in `output_dir`.
fn export_path(output_dir: &Path, stamp: &str) -> PathBuf {
    let path = output_dir.join(format!("{EXPORT_FILE_PREFIX}{stamp}.{EXPORT_FILE_EXTENSION}"));
    if !path.exists() {
        return path;
    }
    warn!(path = %path.display(), "Export file already exists; writing alongside it");
    (1..)
        .map(|n| output_dir.join(format!("{EXPORT_FILE_PREFIX}{stamp}_{n}.{EXPORT_FILE_EXTENSION}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(path)
}

/// Cell values of one posting, in [`EXPORT_COLUMNS`] order.
pub fn export_row(job: &JobPosting) -> [String; 12] {
    [
        job.job_id.clone(),
        job.title.clone(),
        job.location.clone(),
        job.team.clone(),
        job.posted_date.clone(),
        job.deadline.clone(),
        job.summary.clone(),
        job.link.clone(),
        job.keywords.clone(),
        job.supervisor.clone(),
        job.funding.clone(),
        display_timestamp(&job.last_updated),
    ]
}

fn write_workbook(path: &Path, jobs: &[JobPosting]) -> Result<(), Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new()
        .set_bold()
        .set_text_wrap()
        .set_align(FormatAlign::Top)
        .set_background_color(Color::RGB(0xD7E4BC))
        .set_border(FormatBorder::Thin);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, (name, width)) in EXPORT_COLUMNS.iter().enumerate() {
        let col = u16::try_from(col)?;
        worksheet.write_string_with_format(0, col, *name, &header_format)?;
        worksheet.set_column_width(col, *width)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (index, job) in jobs.iter().enumerate() {
        let row = u32::try_from(index + 1)?;
        for (col, value) in export_row(job).iter().enumerate() {
            worksheet.write_string(row, u16::try_from(col)?, value)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Every row of the exported sheet, header included, as display strings.
#[cfg(test)]
pub(crate) fn read_exported_rows(path: &Path) -> Vec<Vec<String>> {
    use calamine::{Reader, Xlsx, open_workbook};

    let mut workbook: Xlsx<_> = open_workbook(path).expect("export opens as xlsx");
    let range = workbook
        .worksheet_range(SHEET_NAME)
        .expect("export has the named sheet");
    range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}
