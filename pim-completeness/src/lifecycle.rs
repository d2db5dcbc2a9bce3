//! Score storage follows the channel and language lifecycle
//!
//! Channel creation adds the channel's score column, removal drops it.
//! Scoring itself never alters the schema.

use crate::error::Result;
use crate::repository::SchemaManager;
use crate::types::{Channel, Language};
use std::sync::Arc;
use tracing::info;

/// Reacts to channel and language configuration events
#[derive(Clone)]
pub struct ChannelFieldLifecycle {
    schema: Arc<dyn SchemaManager>,
}

impl ChannelFieldLifecycle {
    pub fn new(schema: Arc<dyn SchemaManager>) -> Self {
        Self { schema }
    }

    pub async fn on_channel_created(&self, channel: &Channel) -> Result<()> {
        self.schema.ensure_channel_field(channel).await?;
        info!(channel = %channel.code, "Channel score field ready");
        Ok(())
    }

    pub async fn on_channel_removed(&self, channel: &Channel) -> Result<()> {
        self.schema.drop_channel_field(channel).await?;
        info!(channel = %channel.code, "Channel score field removed");
        Ok(())
    }

    /// Provide storage for every configured language
    ///
    /// Language removal keeps existing columns; stale scores are simply no
    /// longer written.
    pub async fn on_languages_configured(&self, languages: &[Language]) -> Result<()> {
        for language in languages {
            self.schema.ensure_language_field(language).await?;
        }
        info!(count = languages.len(), "Language score fields ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSchema {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl SchemaManager for RecordingSchema {
        async fn ensure_channel_field(&self, channel: &Channel) -> Result<()> {
            self.calls.lock().unwrap().push(format!("+{}", channel.code));
            Ok(())
        }

        async fn drop_channel_field(&self, channel: &Channel) -> Result<()> {
            self.calls.lock().unwrap().push(format!("-{}", channel.code));
            Ok(())
        }

        async fn ensure_language_field(&self, language: &Language) -> Result<()> {
            self.calls.lock().unwrap().push(format!("lang:{}", language.code));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_events_map_to_schema_calls() {
        let schema = Arc::new(RecordingSchema::default());
        let lifecycle = ChannelFieldLifecycle::new(schema.clone());
        let web = Channel::new("ch-web", "web", "Web");

        lifecycle.on_channel_created(&web).await.unwrap();
        lifecycle
            .on_languages_configured(&[
                Language::new("en_US", "EnUs"),
                Language::new("de_DE", "DeDe"),
            ])
            .await
            .unwrap();
        lifecycle.on_channel_removed(&web).await.unwrap();

        assert_eq!(
            *schema.calls.lock().unwrap(),
            vec!["+web", "lang:EnUs", "lang:DeDe", "-web"]
        );
    }
}
