// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Server-Sent Events rendering for the browser UI.

use axum::response::sse::Event;

use super::pump::PumpEvent;

/// Render a pump event as a named SSE event with a JSON payload.
pub fn sse_event(event: &PumpEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|e| {
        serde_json::json!({"type": "error", "message": e.to_string()}).to_string()
    });
    Event::default().event(event.kind()).data(data)
}
