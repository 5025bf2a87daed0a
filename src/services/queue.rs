use aws_config::BehaviorVersion;
use serde::Serialize;

use crate::core::config::Settings;

/// Payload handed to the extraction pipeline after each stored upload.
#[derive(Debug, Serialize)]
pub(crate) struct UploadNotification<'a> {
    pub(crate) document_id: i32,
    pub(crate) file_key: &'a str,
    pub(crate) document_type: &'a str,
    pub(crate) national_id: &'a str,
    pub(crate) subtype: Option<&'a str>,
}

/// Fire-and-forget producer for the document-processing queue. Send errors
/// are logged by callers and never block the upload path.
#[derive(Debug, Clone)]
pub(crate) struct QueueService {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl QueueService {
    pub(crate) async fn from_settings(settings: &Settings) -> Option<Self> {
        if settings.queue().queue_url.is_empty() {
            return None;
        }

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.queue().region.clone()))
            .load()
            .await;

        Some(Self {
            client: aws_sdk_sqs::Client::new(&config),
            queue_url: settings.queue().queue_url.clone(),
        })
    }

    pub(crate) async fn notify_upload(
        &self,
        notification: &UploadNotification<'_>,
    ) -> anyhow::Result<()> {
        let body = serde_json::to_string(notification)?;
        self.client.send_message().queue_url(&self.queue_url).message_body(body).send().await?;
        Ok(())
    }
}
