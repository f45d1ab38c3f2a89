//! Single-consumer writer for a repertoire.
//!
//! One task owns the [`Repertoire`]. Producers (analysis, statistics, any
//! other async source) hold a cheap [`WriterHandle`] and submit lines over a
//! bounded channel; each request is answered on its own oneshot. Because
//! only the consumer task touches the node table, creation-or-reuse of a node
//! is never raced.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{
    analysis_lines, statistics_lines, AnalysisProvider, ProviderError, StatisticsProvider,
};
use crate::graph::{IngestOutcome, LineRequest, Repertoire};
use crate::types::Position;

type ReadFn = Box<dyn FnOnce(&Repertoire) + Send>;

enum Command {
    Ingest {
        line: LineRequest,
        reply: oneshot::Sender<Result<IngestOutcome, ProviderError>>,
    },
    Read(ReadFn),
}

/// Owner of the consumer task.
pub struct RepertoireWriter {
    handle: WriterHandle,
    task: JoinHandle<Repertoire>,
}

impl RepertoireWriter {
    /// Move `repertoire` into a new consumer task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(repertoire: Repertoire, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let task = tokio::spawn(run(repertoire, rx));
        Self {
            handle: WriterHandle { tx },
            task,
        }
    }

    /// A handle for producers.
    pub fn handle(&self) -> WriterHandle {
        self.handle.clone()
    }

    /// Stop accepting requests and return the repertoire.
    ///
    /// Waits until every outstanding [`WriterHandle`] has been dropped.
    pub async fn finish(self) -> Result<Repertoire, ProviderError> {
        drop(self.handle);
        self.task.await.map_err(|_| ProviderError::WriterClosed)
    }
}

async fn run(mut repertoire: Repertoire, mut rx: mpsc::Receiver<Command>) -> Repertoire {
    let mut served: u64 = 0;
    while let Some(command) = rx.recv().await {
        match command {
            Command::Ingest { line, reply } => {
                let result = repertoire.ingest_request(&line).map_err(ProviderError::from);
                served += 1;
                // The producer may have given up waiting.
                let _ = reply.send(result);
            }
            Command::Read(read) => read(&repertoire),
        }
    }
    info!(lines = served, nodes = repertoire.num_nodes(), "repertoire writer stopped");
    repertoire
}

/// Producer-side handle to a [`RepertoireWriter`].
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<Command>,
}

impl WriterHandle {
    /// Ingest one line through the consumer task.
    pub async fn ingest(&self, line: LineRequest) -> Result<IngestOutcome, ProviderError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Ingest { line, reply })
            .await
            .map_err(|_| ProviderError::WriterClosed)?;
        response.await.map_err(|_| ProviderError::WriterClosed)?
    }

    /// Run `f` against the repertoire on the consumer task.
    pub async fn read<R, F>(&self, f: F) -> Result<R, ProviderError>
    where
        R: Send + 'static,
        F: FnOnce(&Repertoire) -> R + Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let read: ReadFn = Box::new(move |repertoire| {
            let _ = reply.send(f(repertoire));
        });
        self.tx
            .send(Command::Read(read))
            .await
            .map_err(|_| ProviderError::WriterClosed)?;
        response.await.map_err(|_| ProviderError::WriterClosed)
    }

    async fn position_after(&self, path: &[String]) -> Result<Position, ProviderError> {
        let owned = path.to_vec();
        self.read(move |repertoire| {
            repertoire
                .node_after(&owned)
                .map(|node| node.position().clone())
        })
        .await?
        .ok_or_else(|| ProviderError::UnknownPath(path.join(" ")))
    }

    /// Ask `provider` about the node after `path` and ingest up to `limit`
    /// of its candidates as `path + candidate` lines.
    pub async fn extend_from_analysis<P>(
        &self,
        provider: &P,
        path: &[String],
        limit: usize,
    ) -> Result<Vec<IngestOutcome>, ProviderError>
    where
        P: AnalysisProvider + ?Sized,
    {
        let position = self.position_after(path).await?;
        let candidates = provider.evaluate(&position).await?;
        debug!(%position, candidates = candidates.len(), "extending from analysis");
        self.ingest_all(analysis_lines(path, &candidates, limit)).await
    }

    /// Ask `provider` for the moves covering `coverage` of games at the node
    /// after `path` and ingest each as a `path + move` line.
    pub async fn extend_from_statistics<P>(
        &self,
        provider: &P,
        path: &[String],
        coverage: f64,
    ) -> Result<Vec<IngestOutcome>, ProviderError>
    where
        P: StatisticsProvider + ?Sized,
    {
        let position = self.position_after(path).await?;
        let observed = provider.top_moves(&position, coverage).await?;
        debug!(%position, moves = observed.len(), "extending from statistics");
        self.ingest_all(statistics_lines(path, &observed)).await
    }

    async fn ingest_all(&self, lines: Vec<LineRequest>) -> Result<Vec<IngestOutcome>, ProviderError> {
        let mut outcomes = Vec::with_capacity(lines.len());
        for line in lines {
            outcomes.push(self.ingest(line).await?);
        }
        Ok(outcomes)
    }
}
