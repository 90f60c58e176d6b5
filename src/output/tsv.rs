use std::io::Write;

use crate::error::FlowdeckError;
use crate::model::ConnectionGroup;

/// Write the grouped view as TSV: a totals comment line, a header row, then
/// one row per group sorted by total traffic descending.
pub fn write_tsv(
    groups: &[ConnectionGroup],
    upload_total: u64,
    download_total: u64,
    writer: &mut impl Write,
) -> Result<(), FlowdeckError> {
    let mut rows: Vec<&ConnectionGroup> = groups.iter().collect();
    rows.sort_by(|a, b| (b.upload + b.download).cmp(&(a.upload + a.download)));

    writeln!(writer, "# totals\tup={upload_total}\tdown={download_total}")
        .map_err(FlowdeckError::Serialization)?;
    writeln!(
        writer,
        "host\tsource\trule\tsessions\tupload\tdownload"
    )
    .map_err(FlowdeckError::Serialization)?;

    for group in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            escape_tsv(group.metadata.destination_label()),
            escape_tsv(&group.metadata.source_ip),
            escape_tsv(group.rule.as_deref().unwrap_or("-")),
            group.connection_count,
            group.upload,
            group.download,
        )
        .map_err(FlowdeckError::Serialization)?;
    }

    Ok(())
}

/// Escape tabs and newlines in a field for TSV output.
fn escape_tsv(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConnMetadata;

    fn group(host: &str, upload: u64, download: u64) -> ConnectionGroup {
        ConnectionGroup {
            id: host.to_string(),
            metadata: ConnMetadata {
                host: host.to_string(),
                source_ip: "10.0.0.1".to_string(),
                ..Default::default()
            },
            connection_count: 1,
            upload,
            download,
            ..Default::default()
        }
    }

    #[test]
    fn rows_sorted_by_traffic_descending() {
        let groups = vec![group("small", 1, 1), group("big", 100, 100)];
        let mut buf = Vec::new();
        write_tsv(&groups, 101, 101, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("# totals"));
        assert!(lines[1].starts_with("host\t"));
        assert!(lines[2].starts_with("big\t"));
        assert!(lines[3].starts_with("small\t"));
    }

    #[test]
    fn tabs_in_fields_are_escaped() {
        let groups = vec![group("a\tb", 1, 1)];
        let mut buf = Vec::new();
        write_tsv(&groups, 1, 1, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("a b\t"));
    }

    #[test]
    fn missing_rule_renders_dash() {
        let groups = vec![group("h", 1, 1)];
        let mut buf = Vec::new();
        write_tsv(&groups, 1, 1, &mut buf).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("\t-\t"));
    }
}
