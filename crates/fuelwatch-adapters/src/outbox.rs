//! File-based mail outbox
//!
//! Each reminder becomes one RFC 5322 message in `<data_dir>/outbox`, to be
//! picked up by whatever mail transport is installed on the host. Messages
//! are written under a temporary name and renamed into place, so a pickup
//! agent never sees a partial file.

use async_trait::async_trait;
use fuelwatch_api::LowFuelStation;
use fuelwatch_gateway::{Notifier, NotifyError, NotifyResult, Recipient};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::{render_fuel_reminder, ReminderMessage};

/// Notifier writing `.eml` files into an outbox directory
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    dir: PathBuf,
    sender: String,
    public_url: Option<String>,
}

impl OutboxNotifier {
    pub fn new(
        dir: impl Into<PathBuf>,
        sender: impl Into<String>,
        public_url: Option<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            sender: sender.into(),
            public_url,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn compose(&self, recipient: &Recipient, message: &ReminderMessage, id: &Uuid) -> String {
        let date = fuelwatch_util::now().to_rfc2822();
        let host = self.sender.rsplit('@').next().unwrap_or("localhost");

        let mut out = String::new();
        out.push_str(&format!("From: {}\r\n", self.sender));
        out.push_str(&format!("To: {}\r\n", recipient.email));
        out.push_str(&format!("Subject: {}\r\n", message.subject));
        out.push_str(&format!("Date: {}\r\n", date));
        out.push_str(&format!("Message-ID: <{}@{}>\r\n", id, host));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        out.push_str("Content-Transfer-Encoding: 8bit\r\n");
        out.push_str("\r\n");
        for line in message.body.lines() {
            out.push_str(line);
            out.push_str("\r\n");
        }
        out
    }

    /// Write `content` to `<dir>/<name>` via a hidden staging file.
    ///
    /// The staging file is removed again if the write or the rename fails.
    async fn write_atomically(&self, name: &str, content: &str) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let staging = self.dir.join(format!(".{}.tmp", name));
        let target = self.dir.join(name);

        let result = match tokio::fs::write(&staging, content.as_bytes()).await {
            Ok(()) => tokio::fs::rename(&staging, &target).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                debug!(path = %staging.display(), error = %cleanup, "No staging file to remove");
            }
            return Err(e);
        }
        Ok(target)
    }
}

fn file_stem(username: &str) -> String {
    username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Header values may not carry line breaks
fn validate_address(email: &str) -> NotifyResult<()> {
    if email.is_empty() || !email.contains('@') || email.contains(['\r', '\n']) {
        return Err(NotifyError::Rejected(format!("invalid address {:?}", email)));
    }
    Ok(())
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send_fuel_reminder(
        &self,
        recipient: &Recipient,
        batch: &[LowFuelStation],
    ) -> NotifyResult<()> {
        validate_address(&recipient.email)?;

        let message = render_fuel_reminder(recipient, batch, self.public_url.as_deref());
        let id = Uuid::new_v4();
        let content = self.compose(recipient, &message, &id);

        let name = format!("{}-{}.eml", file_stem(&recipient.username), id);
        let target = self.write_atomically(&name, &content).await?;

        debug!(
            recipient = %recipient.username,
            path = %target.display(),
            stations = batch.len(),
            "Reminder queued in outbox"
        );
        Ok(())
    }
}
