//! Microsoft Graph delta feed queries
//!
//! Implements the delta query pattern for a drive: an initial call without
//! a cursor enumerates everything, subsequent calls with the saved cursor
//! return only changes. Pages chain through `@odata.nextLink`; the
//! terminal page carries `@odata.deltaLink`, which becomes the cursor for
//! the next pass.
//!
//! The raw payload is narrowed to the handful of fields reconciliation
//! consumes; everything else the provider sends is ignored.

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::debug;

use drivewatch_core::domain::newtypes::{DeltaCursor, DriveId, ExternalId};
use drivewatch_core::ports::{DeltaEntry, DeltaPage, GatewayError};

use crate::client::{fail_status, GraphClient};

// ============================================================================
// Wire types (JSON deserialization)
// ============================================================================

/// Raw response from the Graph delta endpoint
///
/// See: <https://learn.microsoft.com/en-us/graph/api/driveitem-delta>
#[derive(Debug, Deserialize)]
struct GraphDeltaResponse {
    #[serde(default)]
    value: Vec<GraphDriveItem>,

    /// URL of the next page (present when more pages exist)
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,

    /// URL carrying the cursor for the next sync (terminal page only)
    #[serde(rename = "@odata.deltaLink")]
    delta_link: Option<String>,
}

/// A drive item from the delta response, narrowed to consumed fields
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDriveItem {
    id: String,

    #[serde(default)]
    name: String,

    last_modified_date_time: Option<DateTime<Utc>>,

    parent_reference: Option<GraphParentReference>,

    /// Folder facet; presence alone marks the item as a folder
    folder: Option<serde_json::Value>,

    /// Deleted facet; presence alone marks the tombstone
    deleted: Option<serde_json::Value>,
}

/// Parent reference of a drive item
#[derive(Debug, Deserialize)]
struct GraphParentReference {
    id: Option<String>,
}

// ============================================================================
// Payload narrowing
// ============================================================================

/// Convert one wire item into a port-level [`DeltaEntry`]
///
/// An empty item id is a structural payload violation and fails the page;
/// a missing name is a soft issue left for the engine to skip.
fn parse_item(item: GraphDriveItem) -> Result<DeltaEntry, GatewayError> {
    let external_id = ExternalId::new(item.id)
        .map_err(|e| GatewayError::Fatal(format!("malformed delta entry: {e}")))?;

    let parent_external_id = item
        .parent_reference
        .and_then(|pr| pr.id)
        .filter(|id| !id.is_empty())
        .map(ExternalId::new)
        .transpose()
        .map_err(|e| GatewayError::Fatal(format!("malformed parent reference: {e}")))?;

    Ok(DeltaEntry {
        external_id,
        name: item.name,
        parent_external_id,
        is_folder: item.folder.is_some(),
        tombstone: item.deleted.is_some(),
        modified_at: item.last_modified_date_time,
    })
}

/// Convert a wire response into a port-level [`DeltaPage`]
fn parse_response(response: GraphDeltaResponse) -> Result<DeltaPage, GatewayError> {
    let entries = response
        .value
        .into_iter()
        .map(parse_item)
        .collect::<Result<Vec<_>, _>>()?;

    let next_cursor = response
        .next_link
        .map(DeltaCursor::new)
        .transpose()
        .map_err(|e| GatewayError::Fatal(format!("bad nextLink: {e}")))?;

    let final_cursor = response
        .delta_link
        .map(DeltaCursor::new)
        .transpose()
        .map_err(|e| GatewayError::Fatal(format!("bad deltaLink: {e}")))?;

    if next_cursor.is_some() && final_cursor.is_some() {
        return Err(GatewayError::Fatal(
            "delta page carried both nextLink and deltaLink".to_string(),
        ));
    }

    Ok(DeltaPage {
        entries,
        next_cursor,
        final_cursor,
    })
}

// ============================================================================
// Delta query
// ============================================================================

/// Fetch one page of the delta feed
///
/// Without a cursor this hits `/drives/{id}/root/delta` (full
/// enumeration); with a cursor it follows the stored link verbatim, since
/// both continuation and delta links are absolute URLs.
pub async fn fetch_delta_page(
    client: &GraphClient,
    drive_id: &DriveId,
    cursor: Option<&DeltaCursor>,
) -> Result<DeltaPage, GatewayError> {
    let target = match cursor {
        Some(c) => c.as_str().to_string(),
        None => format!("/drives/{}/root/delta", drive_id.as_str()),
    };

    debug!(drive_id = %drive_id, has_cursor = cursor.is_some(), "Fetching delta page");

    let response = client
        .execute_with_retry(Method::GET, &target, None)
        .await?;

    // A 410 means the stored cursor no longer replays; the pass cannot
    // proceed until an operator forces a full resync via bootstrap.
    if response.status() == StatusCode::GONE {
        return Err(GatewayError::Fatal(
            "delta cursor expired (410 Gone); a full resync is required".to_string(),
        ));
    }

    if !response.status().is_success() {
        return Err(fail_status(response.status()));
    }

    let raw: GraphDeltaResponse = response
        .json()
        .await
        .map_err(|e| GatewayError::Fatal(format!("failed to parse delta response: {e}")))?;

    parse_response(raw)
}
