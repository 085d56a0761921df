//! Inbound SMS webhook
//!
//! Simbase pushes `{"event": "sms", "iccid": ..., "message": ..., "deviceName": ...}`.
//! Every recognised SMS is announced on the event bus, then written into the
//! fleet snapshot without a refetch. The HTTP caller always gets 200; see
//! `api::handlers::webhook`.

use chrono::Utc;
use thiserror::Error;

use crate::events::EventBus;
use crate::models::{SmsReceived, WebhookPayload};
use crate::simbase::context::SimbaseContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Fleet record updated and subscribers notified
    Patched,
    /// Event fired; ICCID not part of the monitored fleet
    UnknownSim,
    /// Event fired; no live context to patch
    NotLive,
    /// Not an SMS event, or required fields missing
    Ignored,
}

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Malformed webhook payload: {0}")]
    MalformedWebhookPayload(String),
}

pub fn parse(body: &[u8]) -> Result<WebhookPayload, WebhookError> {
    serde_json::from_slice(body).map_err(|e| WebhookError::MalformedWebhookPayload(e.to_string()))
}

/// Handle one webhook body against the current context (if any).
pub async fn process(
    body: &[u8],
    events: &EventBus,
    context: Option<&SimbaseContext>,
) -> Result<WebhookOutcome, WebhookError> {
    let payload = parse(body).map_err(|e| {
        tracing::error!("[Webhook] Invalid JSON received on Simbase webhook: {}", e);
        e
    })?;

    if payload.event.as_deref() != Some("sms") {
        tracing::debug!("[Webhook] Ignoring event {:?}", payload.event);
        return Ok(WebhookOutcome::Ignored);
    }

    let (iccid, message) = match (payload.iccid, payload.message) {
        (Some(iccid), Some(message)) => (iccid, message),
        _ => {
            tracing::warn!("[Webhook] SMS event without iccid or message, ignoring");
            return Ok(WebhookOutcome::Ignored);
        }
    };

    tracing::info!("[Webhook] SMS received for {}: {}", iccid, message);

    events.fire(SmsReceived {
        iccid: iccid.clone(),
        message: message.clone(),
        device_name: payload.device_name,
        received_at: Utc::now(),
    });

    let Some(ctx) = context.filter(|ctx| ctx.is_live()) else {
        return Ok(WebhookOutcome::NotLive);
    };

    if ctx.record_inbound_sms(&iccid, &message).await {
        Ok(WebhookOutcome::Patched)
    } else {
        tracing::debug!("[Webhook] ICCID {} not in fleet snapshot, skipping patch", iccid);
        Ok(WebhookOutcome::UnknownSim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimbaseConfig;
    use crate::simbase::testing::{sample_fleet, FakeApi};
    use std::sync::Arc;

    async fn context(events: &EventBus) -> Arc<SimbaseContext> {
        SimbaseContext::setup(
            &SimbaseConfig::new("key"),
            Arc::new(FakeApi::new(sample_fleet())),
            events.clone(),
        )
        .await
        .ok()
        .unwrap()
    }

    #[tokio::test]
    async fn test_sms_patches_known_sim() {
        let events = EventBus::new();
        let ctx = context(&events).await;
        let mut listener = events.subscribe();
        let mut updates = ctx.fleet.subscribe();

        let body = br#"{"event":"sms","iccid":"89001","message":"Hello","deviceName":"Van1"}"#;
        let outcome = process(body, &events, Some(ctx.as_ref())).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::Patched);
        assert!(updates.has_changed().unwrap());
        assert_eq!(
            ctx.fleet.current().await.get("89001").unwrap().last_sms_text.as_deref(),
            Some("Hello")
        );

        let event = listener.recv().await.unwrap();
        assert_eq!(event.iccid, "89001");
        assert_eq!(event.message, "Hello");
        assert_eq!(event.device_name.as_deref(), Some("Van1"));
        ctx.teardown();
    }

    #[tokio::test]
    async fn test_unknown_sim_fires_but_does_not_patch() {
        let events = EventBus::new();
        let ctx = context(&events).await;
        let mut listener = events.subscribe();

        let body = br#"{"event":"sms","iccid":"77777","message":"Hi"}"#;
        let outcome = process(body, &events, Some(ctx.as_ref())).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::UnknownSim);
        assert_eq!(ctx.fleet.current().await.len(), 2);
        assert_eq!(listener.recv().await.unwrap().iccid, "77777");
        ctx.teardown();
    }

    #[tokio::test]
    async fn test_malformed_json_changes_nothing() {
        let events = EventBus::new();
        let ctx = context(&events).await;
        let mut listener = events.subscribe();
        let before = ctx.fleet.current().await;

        let result = process(b"{not json", &events, Some(ctx.as_ref())).await;

        assert!(matches!(result, Err(WebhookError::MalformedWebhookPayload(_))));
        assert_eq!(*ctx.fleet.current().await, *before);
        assert!(listener.try_recv().is_err());
        ctx.teardown();
    }

    #[tokio::test]
    async fn test_other_events_ignored() {
        let events = EventBus::new();
        let mut listener = events.subscribe();

        let outcome = process(br#"{"event":"data_limit","iccid":"89001"}"#, &events, None)
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);

        let outcome = process(br#"{"event":"sms","iccid":"89001"}"#, &events, None)
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);
        assert!(listener.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_torn_down_context_not_patched() {
        let events = EventBus::new();
        let ctx = context(&events).await;
        ctx.teardown();

        let body = br#"{"event":"sms","iccid":"89001","message":"late"}"#;
        let outcome = process(body, &events, Some(ctx.as_ref())).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::NotLive);
        assert_eq!(ctx.fleet.current().await.get("89001").unwrap().last_sms_text, None);
    }
}
