//! Terminal and JSON output for feed events.

use anyhow::{Context, Result};
use chrono::DateTime;
use nostr_sdk::nips::nip04;
use nostr_sdk::{Event, Keys, Kind, PublicKey, ToBech32};
use feed_core::Render;
use std::io::Write;

pub struct TerminalRenderer<W: Write> {
    out: W,
    keys: Keys,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, keys: Keys) -> Self {
        Self { out, keys }
    }

    /// Plaintext of a kind 4 message we sent or received, if it decrypts.
    fn decrypt(&self, event: &Event) -> Option<String> {
        let own = self.keys.public_key();
        let counterparty = if event.pubkey == own {
            recipient(event)?
        } else {
            event.pubkey
        };
        match nip04::decrypt(self.keys.secret_key(), &counterparty, &event.content) {
            Ok(plain) => Some(plain),
            Err(e) => {
                tracing::debug!("Could not decrypt {}: {}", event.id, e);
                None
            }
        }
    }
}

impl<W: Write> Render for TerminalRenderer<W> {
    fn render(&mut self, event: &Event, alias: Option<&str>, verbose: bool, json: bool) -> Result<()> {
        if json {
            let line = serde_json::to_string(event).context("Failed to encode event")?;
            writeln!(self.out, "{}", line).context("Failed to write output")?;
            return self.out.flush().context("Failed to flush output");
        }

        let npub = short_npub(&event.pubkey);
        let author = match alias {
            Some(name) => format!("{} ({})", name, npub),
            None => npub,
        };
        writeln!(
            self.out,
            "{} · {} · {}",
            author,
            kind_label(event.kind),
            format_time(event.created_at.as_u64())
        )
        .context("Failed to write output")?;
        if verbose {
            writeln!(self.out, "  id: {}", event.id).context("Failed to write output")?;
        }

        let content = if event.kind == Kind::EncryptedDirectMessage {
            self.decrypt(event).unwrap_or_else(|| event.content.clone())
        } else {
            event.content.clone()
        };
        writeln!(self.out, "{}\n", content).context("Failed to write output")?;
        self.out.flush().context("Failed to flush output")
    }
}

fn recipient(event: &Event) -> Option<PublicKey> {
    event
        .tags
        .iter()
        .find(|tag| tag.as_slice().first().map(|s| s.as_str()) == Some("p"))
        .and_then(|tag| tag.as_slice().get(1))
        .and_then(|hex| PublicKey::from_hex(hex).ok())
}

fn kind_label(kind: Kind) -> String {
    match kind {
        Kind::Metadata => "Metadata".to_string(),
        Kind::TextNote => "Text note".to_string(),
        Kind::ContactList => "Contact list".to_string(),
        Kind::EncryptedDirectMessage => "Encrypted message".to_string(),
        Kind::Repost => "Repost".to_string(),
        Kind::Reaction => "Reaction".to_string(),
        other => format!("Kind {}", other.as_u16()),
    }
}

fn format_time(secs: u64) -> String {
    DateTime::from_timestamp(secs as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn short_npub(pubkey: &PublicKey) -> String {
    let npub = pubkey.to_bech32().unwrap_or_else(|_| pubkey.to_hex());
    format!("{}...{}", &npub[..10], &npub[npub.len() - 4..])
}
