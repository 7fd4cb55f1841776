//! Typed operations bound to a [`ConnectorClient`]'s pipeline.
//!
//! Activity payloads are passed through as JSON; only the small response
//! shapes in [`crate::wire`] are typed.

use bytes::Bytes;
use serde_json::Value as JsonValue;

use crate::{
    request::{encode_path, OutboundRequest},
    wire::{AttachmentInfo, ChannelAccount, ConversationResourceResponse, ResourceResponse},
    ConnectorClient, Result,
};

/// Conversation and activity operations under `/v3/conversations`.
#[derive(Clone, Debug)]
pub struct Conversations {
    client: ConnectorClient,
}

impl Conversations {
    pub(crate) fn new(client: ConnectorClient) -> Self {
        Self { client }
    }

    /// Activity writes are POSTs and are never retried; build the request
    /// with an idempotency key and use [`ConnectorClient::send`] to opt in.
    pub async fn create_conversation(
        &self,
        parameters: &JsonValue,
    ) -> Result<ConversationResourceResponse> {
        let path = encode_path(&["v3", "conversations"])?;
        let created = self
            .client
            .send(OutboundRequest::post(path).json(parameters)?)
            .await?;
        decode_or_default(created.body)
    }

    pub async fn send_to_conversation(
        &self,
        conversation_id: &str,
        activity: &JsonValue,
    ) -> Result<ResourceResponse> {
        let path = encode_path(&["v3", "conversations", conversation_id, "activities"])?;
        let sent = self
            .client
            .send(OutboundRequest::post(path).json(activity)?)
            .await?;
        decode_or_default(sent.body)
    }

    pub async fn reply_to_activity(
        &self,
        conversation_id: &str,
        activity_id: &str,
        activity: &JsonValue,
    ) -> Result<ResourceResponse> {
        let path = encode_path(&[
            "v3",
            "conversations",
            conversation_id,
            "activities",
            activity_id,
        ])?;
        let sent = self
            .client
            .send(OutboundRequest::post(path).json(activity)?)
            .await?;
        decode_or_default(sent.body)
    }

    pub async fn update_activity(
        &self,
        conversation_id: &str,
        activity_id: &str,
        activity: &JsonValue,
    ) -> Result<ResourceResponse> {
        let path = encode_path(&[
            "v3",
            "conversations",
            conversation_id,
            "activities",
            activity_id,
        ])?;
        let updated = self
            .client
            .send(OutboundRequest::put(path).json(activity)?)
            .await?;
        decode_or_default(updated.body)
    }

    pub async fn delete_activity(&self, conversation_id: &str, activity_id: &str) -> Result<()> {
        let path = encode_path(&[
            "v3",
            "conversations",
            conversation_id,
            "activities",
            activity_id,
        ])?;
        self.client.send(OutboundRequest::delete(path)).await?;
        Ok(())
    }

    pub async fn get_conversation_members(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ChannelAccount>> {
        let path = encode_path(&["v3", "conversations", conversation_id, "members"])?;
        self.client.send_json(OutboundRequest::get(path)).await
    }
}

/// Attachment download operations under `/v3/attachments`.
#[derive(Clone, Debug)]
pub struct Attachments {
    client: ConnectorClient,
}

impl Attachments {
    pub(crate) fn new(client: ConnectorClient) -> Self {
        Self { client }
    }

    pub async fn get_attachment_info(&self, attachment_id: &str) -> Result<AttachmentInfo> {
        let path = encode_path(&["v3", "attachments", attachment_id])?;
        self.client.send_json(OutboundRequest::get(path)).await
    }

    /// Raw bytes of one view of an attachment.
    pub async fn get_attachment(&self, attachment_id: &str, view_id: &str) -> Result<Bytes> {
        let path = encode_path(&["v3", "attachments", attachment_id, "views", view_id])?;
        let response = self.client.send(OutboundRequest::get(path)).await?;
        Ok(response.body)
    }
}

// Some channels answer activity writes with an empty 200/202.
fn decode_or_default<T>(body: Bytes) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&body).map_err(|err| {
        crate::ConnectorError::Decode(format!(
            "invalid response JSON: {err}; body: {}",
            String::from_utf8_lossy(&body)
        ))
    })
}
