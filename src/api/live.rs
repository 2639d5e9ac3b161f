use actix_web::{http::header, web, HttpResponse, ResponseError};
use std::convert::Infallible;
use std::future::Future;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::database::ChangeEvent;
use crate::state::AppState;
use crate::utils::{AppError, AppResult};

/// One server-sent event.
pub fn frame(event: &str, payload: &serde_json::Value) -> String {
    format!("event: {}\ndata: {}\n\n", event, payload)
}

fn error_frame(e: &AppError) -> String {
    let message = if e.status_code().is_server_error() {
        "Something went wrong, please try again"
    } else {
        e.message()
    };
    frame("error", &serde_json::json!({ "success": false, "error": message }))
}

struct Subscription<R, S> {
    label: String,
    state: web::Data<AppState>,
    events: broadcast::Receiver<ChangeEvent>,
    relevant: R,
    snapshot: S,
    stale: bool,
    closed: bool,
}

impl<R, S> Subscription<R, S>
where
    R: Fn(&ChangeEvent) -> bool,
{
    /// Waits for a relevant change. `false` once the feed is gone.
    async fn wait_for_change(&mut self) -> bool {
        loop {
            match self.events.recv().await {
                Ok(event) if (self.relevant)(&event) => return true,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("⏩ Stream {} lagged by {} event(s)", self.label, skipped);
                    return true;
                }
                Err(RecvError::Closed) => return false,
            }
        }
    }
}

/// Server-sent events response: a snapshot frame right away, then a fresh one
/// after every change accepted by `relevant`. An authorization failure while
/// snapshotting ends the stream after its error frame.
pub fn event_stream<R, S, F>(
    state: web::Data<AppState>,
    label: String,
    relevant: R,
    snapshot: S,
) -> HttpResponse
where
    R: Fn(&ChangeEvent) -> bool + 'static,
    S: Fn(web::Data<AppState>) -> F + 'static,
    F: Future<Output = AppResult<String>> + 'static,
{
    log::info!("📡 Live stream {} opened", label);

    let subscription = Subscription {
        events: state.feed.subscribe(),
        state,
        label,
        relevant,
        snapshot,
        stale: true,
        closed: false,
    };

    // o receiver é dropado junto com o stream quando o cliente desconecta
    let stream = futures::stream::unfold(subscription, |mut sub| async move {
        if sub.closed {
            return None;
        }
        if !sub.stale && !sub.wait_for_change().await {
            log::info!("📴 Live stream {} closed", sub.label);
            return None;
        }
        sub.stale = false;

        let frame = match (sub.snapshot)(sub.state.clone()).await {
            Ok(frame) => frame,
            Err(e) => {
                if matches!(e, AppError::Unauthorized(_) | AppError::Forbidden(_)) {
                    log::warn!("🔒 Live stream {} revoked: {}", sub.label, e);
                    sub.closed = true;
                } else {
                    log::error!("❌ Snapshot for {} failed: {}", sub.label, e);
                }
                error_frame(&e)
            }
        };
        Some((Ok::<_, Infallible>(web::Bytes::from(frame)), sub))
    });

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(stream)
}
