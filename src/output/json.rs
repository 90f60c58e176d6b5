use std::io::Write;

use serde::Serialize;

use crate::error::FlowdeckError;
use crate::model::ConnectionGroup;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonView<'a> {
    upload_total: u64,
    download_total: u64,
    groups: &'a [ConnectionGroup],
}

/// Write the grouped view as pretty-printed JSON (wire field names).
pub fn write_json(
    groups: &[ConnectionGroup],
    upload_total: u64,
    download_total: u64,
    writer: &mut impl Write,
) -> Result<(), FlowdeckError> {
    let view = JsonView {
        upload_total,
        download_total,
        groups,
    };
    serde_json::to_writer_pretty(&mut *writer, &view)
        .map_err(|e| FlowdeckError::Serialization(e.into()))?;
    writeln!(writer).map_err(FlowdeckError::Serialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConnMetadata;

    #[test]
    fn output_parses_back_with_wire_names() {
        let groups = vec![ConnectionGroup {
            id: "g1".to_string(),
            metadata: ConnMetadata {
                source_ip: "10.0.0.1".to_string(),
                ..Default::default()
            },
            connection_count: 2,
            upload: 10,
            download: 20,
            ..Default::default()
        }];
        let mut buf = Vec::new();
        write_json(&groups, 10, 20, &mut buf).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["uploadTotal"], 10);
        assert_eq!(value["groups"][0]["connectionCount"], 2);
        assert_eq!(value["groups"][0]["metadata"]["sourceIP"], "10.0.0.1");
    }
}
