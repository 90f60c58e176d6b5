use std::time::Duration;

use crate::error::FlowdeckError;
use crate::model::normalize::normalize;
use crate::model::ConnectionSnapshot;

/// One-shot REST collaborators of the push stream: initial load,
/// post-action refresh, and the close-connections action.

fn one_shot_client() -> Result<reqwest::blocking::Client, FlowdeckError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(FlowdeckError::Transport)
}

fn with_key(mut url: String, access_key: Option<&str>) -> String {
    if let Some(key) = access_key {
        url.push_str("?access_key=");
        url.push_str(key);
    }
    url
}

/// Fetch one snapshot from `GET {base}/connections` (same schema as the
/// push stream). Used for the initial load and after a close action, which
/// triggers a re-fetch rather than a push.
pub fn fetch_snapshot(
    base: &str,
    access_key: Option<&str>,
) -> Result<ConnectionSnapshot, FlowdeckError> {
    let client = one_shot_client()?;
    let url = with_key(
        format!("{}/connections", base.trim_end_matches('/')),
        access_key,
    );
    let resp = client.get(&url).send().map_err(FlowdeckError::Transport)?;
    if !resp.status().is_success() {
        return Err(FlowdeckError::HttpStatus(resp.status().as_u16()));
    }
    let body = resp.text().map_err(FlowdeckError::Transport)?;
    normalize(&body).ok_or(FlowdeckError::MalformedPayload)
}

/// Close sessions by numeric id via `POST {base}/connections/close`.
///
/// A failure here is an ActionError: the caller logs it and leaves all
/// state unchanged so the user can retry.
pub fn close_connections(
    base: &str,
    access_key: Option<&str>,
    ids: &[u64],
) -> Result<(), FlowdeckError> {
    if ids.is_empty() {
        return Ok(());
    }
    let client = one_shot_client()?;
    let url = with_key(
        format!("{}/connections/close", base.trim_end_matches('/')),
        access_key,
    );
    let resp = client
        .post(&url)
        .json(&serde_json::json!({ "ids": ids }))
        .send()
        .map_err(FlowdeckError::Transport)?;
    if !resp.status().is_success() {
        return Err(FlowdeckError::Action(format!(
            "endpoint returned HTTP {}",
            resp.status().as_u16()
        )));
    }
    Ok(())
}

/// Extract the numeric wire ids of every session in the given groups.
/// Detail ids that are not plain integers are skipped.
pub fn numeric_ids<'a>(details: impl Iterator<Item = &'a str>) -> Vec<u64> {
    details.filter_map(|id| id.parse().ok()).collect()
}
