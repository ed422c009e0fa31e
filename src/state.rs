use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::registry::RecipientRegistry;
use crate::selector::ResponseSelector;
use crate::store::{ContentStore, TriggerStore};
use crate::traits::{ExternalFact, MessageChannel};

/// Everything the router and the broadcast loops share. Built once at startup.
pub(crate) struct State {
    pub(crate) config: Config,
    pub(crate) recipients: RecipientRegistry,
    pub(crate) selector: ResponseSelector,
    pub(crate) triggers: Arc<dyn TriggerStore>,
    pub(crate) content: Arc<dyn ContentStore>,
    pub(crate) channel: Box<dyn MessageChannel>,
    pub(crate) weather: Box<dyn ExternalFact>,
}

impl State {
    pub(crate) async fn send_message(&self, recipient: &str, message: &str) -> Result<(), AppError> {
        self.channel.send_msg(recipient, message).await
    }
}
