pub mod json;
pub mod tsv;

use std::io::Write;

use crate::cli::OutputFormat;
use crate::error::FlowdeckError;
use crate::model::ConnectionGroup;

/// Write a grouped view of one snapshot in the specified format.
pub fn write_view(
    groups: &[ConnectionGroup],
    upload_total: u64,
    download_total: u64,
    format: OutputFormat,
    writer: &mut impl Write,
) -> Result<(), FlowdeckError> {
    match format {
        OutputFormat::Tsv => tsv::write_tsv(groups, upload_total, download_total, writer),
        OutputFormat::Json => json::write_json(groups, upload_total, download_total, writer),
    }
}
