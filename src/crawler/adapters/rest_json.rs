use std::sync::Arc;

use tracing::warn;

use crate::crawler::adapters::{get_with_retry, PlaceholderLookup};
use crate::crawler::{RawResponse, RequestDetail, ResponseParserStrategy};
use crate::models::Slot;

/// Shared GET-request execution used by every REST Type A adapter
/// (`better`, `activelambeth`, `decathlon`): at most two attempts with a
/// fixed backoff on transport failure or a 5xx status, no retry on 4xx,
/// content-type validated as JSON before handing off to the parser. When
/// the parsed body carries no slots, falls back to `placeholders` so a
/// provider's "nothing bookable today" response doesn't erase what the
/// previous refresh knew about this venue's recurring time-slots.
pub async fn fetch_and_transform(
    client: &reqwest::Client,
    request: RequestDetail,
    parser: &dyn ResponseParserStrategy,
    placeholders: &Arc<dyn PlaceholderLookup>,
) -> Result<Vec<Slot>, String> {
    let response = get_with_retry(client, &request.url, &request.headers).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("non-success status: {status}"));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    let content = response
        .text()
        .await
        .map_err(|error| format!("failed reading response body: {error}"))?;

    if !content_type
        .as_deref()
        .is_some_and(|value| value.contains("application/json"))
    {
        return Err(format!(
            "unexpected content-type {content_type:?} for {}",
            request.url
        ));
    }

    let raw = RawResponse {
        content,
        status_code: status.as_u16(),
        content_type,
        metadata: request.metadata.clone(),
    };

    let slots = parser.parse(&raw).map_err(|message| {
        format!(
            "parse failure for venue {}: {message}",
            raw.metadata.venue.composite_key
        )
    })?;

    if slots.is_empty() {
        let placeholder_slots = placeholders
            .zero_space_slots(
                &raw.metadata.category,
                &raw.metadata.venue.composite_key,
                raw.metadata.date,
            )
            .await;
        if placeholder_slots.is_empty() {
            warn!(
                composite_key = raw.metadata.venue.composite_key.as_str(),
                "empty response and no placeholder slots on file"
            );
        }
        return Ok(placeholder_slots);
    }

    Ok(slots)
}
