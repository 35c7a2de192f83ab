//! Postcode-to-coordinates resolution for the external query interface;
//! not yet wired to a binary entry point since that interface is
//! out of scope here.
#![allow(dead_code)]

use serde::Deserialize;
use tracing::{error, warn};

use crate::error::{AggregatorError, Result};

#[derive(Debug, Deserialize)]
struct PostcodesIoResponse {
    result: Option<PostcodeResult>,
}

#[derive(Debug, Deserialize)]
struct PostcodeResult {
    longitude: f64,
    latitude: f64,
}

/// Resolves a UK postcode to `(latitude, longitude)` via postcodes.io.
/// The collaborator requires an HTTP 200 plus a non-null `result` — any
/// other outcome (network failure, 404 for an unrecognised postcode, a
/// null `result`) is a `Geocoding` error, not a silently-empty result.
pub async fn geocode_postcode(
    client: &reqwest::Client,
    base_url: &str,
    postcode: &str,
) -> Result<(f64, f64)> {
    let url = format!(
        "{}/postcodes/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(postcode.trim())
    );

    let response = client.get(&url).send().await.map_err(|error| {
        error!(postcode = postcode, error = %error, "postcode geocoding request failed");
        AggregatorError::Geocoding(format!("request to postcodes.io failed: {error}"))
    })?;

    if response.status() != reqwest::StatusCode::OK {
        warn!(postcode = postcode, status = response.status().as_u16(), "postcode not found");
        return Err(AggregatorError::Geocoding(format!(
            "postcodes.io returned {} for {postcode}",
            response.status()
        )));
    }

    let body: PostcodesIoResponse = response
        .json()
        .await
        .map_err(|error| AggregatorError::Geocoding(format!("invalid postcodes.io response: {error}")))?;

    let result = body
        .result
        .ok_or_else(|| AggregatorError::Geocoding(format!("postcodes.io has no result for {postcode}")))?;

    Ok((result.latitude, result.longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_found_postcode() {
        let body: PostcodesIoResponse = serde_json::from_str(
            r#"{"status":200,"result":{"latitude":51.5,"longitude":-0.1}}"#,
        )
        .unwrap();
        assert_eq!(body.result.unwrap().latitude, 51.5);
    }

    #[test]
    fn deserializes_an_unrecognised_postcode_as_null_result() {
        let body: PostcodesIoResponse =
            serde_json::from_str(r#"{"status":404,"result":null,"error":"Postcode not found"}"#)
                .unwrap();
        assert!(body.result.is_none());
    }
}
