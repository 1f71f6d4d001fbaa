//! One pass over a subscription: dedup, alias, post-filter, render.
//!
//! Everything here runs on a single task. Relay workers only ever touch the
//! merge channel, so the alias directory and the seen set need no locking.

use nostr_sdk::{Event, Filter};
use tracing::{debug, info};

use crate::alias::{AliasDirectory, Observation};
use crate::error::FeedError;
use crate::filter::build_filter;
use crate::options::QueryOptions;
use crate::post_filter;
use crate::stream::SubscriptionStream;
use crate::transport::Transport;

/// Output collaborator, called once per accepted event in stream order.
pub trait Render {
    fn render(
        &mut self,
        event: &Event,
        alias: Option<&str>,
        verbose: bool,
        json: bool,
    ) -> anyhow::Result<()>;
}

impl<R: Render + ?Sized> Render for &mut R {
    fn render(
        &mut self,
        event: &Event,
        alias: Option<&str>,
        verbose: bool,
        json: bool,
    ) -> anyhow::Result<()> {
        (**self).render(event, alias, verbose, json)
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Distinct events received.
    pub received: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub rendered: u64,
    pub aliases_learned: u64,
}

pub struct Pipeline {
    options: QueryOptions,
    filter: Filter,
    aliases: AliasDirectory,
}

impl Pipeline {
    pub fn new(options: QueryOptions) -> Self {
        let filter = build_filter(&options);
        let aliases = AliasDirectory::from_follows(&options.following);
        Self {
            options,
            filter,
            aliases,
        }
    }

    /// The filter this pipeline subscribes with.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Subscribe through `transport` and consume until the stream ends.
    pub async fn run<T, R>(&mut self, transport: &T, renderer: R) -> Result<Summary, FeedError>
    where
        T: Transport + ?Sized,
        R: Render,
    {
        debug!("Subscribing with filter {:?}", self.filter);
        let raw = transport.subscribe(self.filter.clone()).await?;
        self.consume(SubscriptionStream::new(raw), renderer).await
    }

    /// Drive an already-open stream to completion.
    pub async fn consume<R: Render>(
        &mut self,
        mut stream: SubscriptionStream,
        mut renderer: R,
    ) -> Result<Summary, FeedError> {
        let mut summary = Summary::default();

        while let Some(event) = stream.next().await {
            summary.received += 1;

            if let Observation::Learned(_) = self.aliases.observe(&event) {
                summary.aliases_learned += 1;
            }

            if !post_filter::accept(&event, &self.options) {
                summary.rejected += 1;
                continue;
            }

            let alias = self.aliases.resolve(&event.pubkey);
            if let Err(e) = renderer.render(&event, alias, self.options.verbose, self.options.json) {
                stream.cancel();
                return Err(FeedError::Render(e));
            }
            summary.rendered += 1;
        }

        summary.duplicates = stream.duplicates();
        info!(
            "Subscription ended: {} received, {} duplicates, {} filtered, {} shown",
            summary.received, summary.duplicates, summary.rejected, summary.rendered
        );
        Ok(summary)
    }
}
