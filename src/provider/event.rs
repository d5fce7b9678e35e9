use anyhow::Context as _;
use tokio::{
    fs::File,
    io::{self, AsyncBufRead, AsyncBufReadExt, BufReader},
};
use tracing::{info, warn};

use crate::{
    configuration::{AppState, State},
    error::Error,
    event_dispatch::{insert_block, Block_Outcome},
    model::Block,
    types::{Feed_Message, Raw_Event},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Feed_Summary {
    pub applied: usize,
    pub reapplied: usize,
    pub reverts: usize,
    pub unreadable: usize,
}

/// Consumes the ordered event feed. Consecutive lines with the same block
/// number and increasing log indices form one block. A block number that
/// goes back, or a log index that does not increase, starts a re-delivered
/// block. A `{"revertTo": n}` line rolls the store back explicitly.
pub struct Event {
    app_state: AppState<State>,
    pending: Option<(Block, Vec<Raw_Event>)>,
    summary: Feed_Summary,
}

impl Event {
    pub fn new(app_state: AppState<State>) -> Self {
        Self {
            app_state,
            pending: None,
            summary: Feed_Summary::default(),
        }
    }

    /// Reads `source`, a file path or `-` for stdin, to the end.
    pub async fn run(&mut self, source: &str) -> Result<Feed_Summary, Error> {
        info!("reading events from {}", source);

        if source == "-" {
            self.run_reader(BufReader::new(io::stdin())).await
        } else {
            let file = File::open(source)
                .await
                .with_context(|| format!("unable to open event feed {}", source))?;
            self.run_reader(BufReader::new(file)).await
        }
    }

    pub async fn run_reader<R>(&mut self, reader: R) -> Result<Feed_Summary, Error>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut line_number = 0;

        while let Some(line) = lines.next_line().await? {
            line_number += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Feed_Message>(line) {
                Ok(Feed_Message::Event(event)) => self.push(event).await?,
                Ok(Feed_Message::Revert(revert)) => {
                    self.flush().await?;
                    let restored =
                        self.app_state.store.revert_to(revert.revert_to).await?;
                    self.summary.reverts += 1;
                    info!(
                        "reverted to block {}, {} entity images restored",
                        revert.revert_to, restored
                    );
                },
                Err(e) => {
                    self.summary.unreadable += 1;
                    warn!("unreadable feed line {}: {}", line_number, e);
                },
            }
        }

        self.flush().await?;
        info!(
            "feed done: {} blocks applied, {} re-delivered, {} reverts, {} unreadable lines",
            self.summary.applied,
            self.summary.reapplied,
            self.summary.reverts,
            self.summary.unreadable
        );

        Ok(self.summary)
    }

    async fn push(&mut self, event: Raw_Event) -> Result<(), Error> {
        let same_block = matches!(
            &self.pending,
            Some((block, events)) if block.id == event.block_number
                && events.last().is_some_and(|last| last.log_index < event.log_index)
        );
        if !same_block {
            self.flush().await?;
        }

        match &mut self.pending {
            Some((_, events)) => events.push(event),
            None => {
                let block = Block {
                    id: event.block_number,
                    timestamp: event.block_timestamp,
                };
                self.pending = Some((block, vec![event]));
            },
        }

        Ok(())
    }

    async fn flush(&mut self) -> Result<(), Error> {
        if let Some((block, events)) = self.pending.take() {
            match insert_block(&self.app_state, block, events).await? {
                Block_Outcome::Applied => self.summary.applied += 1,
                Block_Outcome::Reapplied { .. } => self.summary.reapplied += 1,
            }
        }

        Ok(())
    }
}
