//! Shard units: the handler seam and the thread that drives it

use std::io;
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;

use crate::filter::FilterEngine;
use crate::index::{ColumnIndex, ColumnsKey};
use crate::sort::{sort_offsets, CompiledComparator};
use crate::store::Row;

use super::protocol::{ProjectRequest, ShardReply, ShardRequest, ShardRequestKind, ShardResponse};

/// Logic behind one shard unit.
///
/// Returning `None` means the request was accepted but never answered;
/// the engine side sees that as a timeout.
pub trait ShardHandler: Send + 'static {
    fn handle(&mut self, request: ShardRequest) -> Option<ShardResponse>;
}

/// The standard shard unit: holds one slice and projects over it
#[derive(Debug)]
pub struct ShardWorker {
    rows: Arc<Vec<Row>>,
    offset: usize,
    index: ColumnIndex,
    loaded: bool,
}

impl Default for ShardWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardWorker {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Vec::new()),
            offset: 0,
            index: ColumnIndex::new(0, ColumnsKey::default(), 0),
            loaded: false,
        }
    }

    fn load(&mut self, rows: Arc<Vec<Row>>, offset: usize) -> usize {
        self.index = ColumnIndex::new(0, ColumnsKey::default(), rows.len());
        self.rows = rows;
        self.offset = offset;
        self.loaded = true;
        self.rows.len()
    }

    /// Filters, and sorts if asked, the held slice; returns global offsets
    pub fn project(&mut self, request: &ProjectRequest) -> Vec<usize> {
        let rows = self.rows.as_slice();
        let mut local = FilterEngine::scan_indexed(&mut self.index, rows, &request.keys, &request.criteria);

        if !request.sorts.is_empty() {
            // contiguous slice: local offset order is global offset order
            let comparator = CompiledComparator::compile(&mut self.index, rows, &request.sorts);
            sort_offsets(&mut local, &comparator);
        }

        local.into_iter().map(|i| i + self.offset).collect()
    }
}

impl ShardHandler for ShardWorker {
    fn handle(&mut self, request: ShardRequest) -> Option<ShardResponse> {
        let response = match request.kind {
            ShardRequestKind::LoadShard { rows, offset } => {
                let count = self.load(rows, offset);
                ShardResponse::ok(request.id, ShardReply::Loaded { rows: count })
            }
            ShardRequestKind::Project(_) if !self.loaded => {
                ShardResponse::error(request.id, "shard has no rows loaded")
            }
            ShardRequestKind::Project(project) => {
                ShardResponse::ok(request.id, ShardReply::Projected(self.project(&project)))
            }
        };
        Some(response)
    }
}

/// Engine-side endpoints of one running unit
#[derive(Debug)]
pub(crate) struct ShardUnit {
    pub(crate) shard: usize,
    pub(crate) requests: mpsc::UnboundedSender<ShardRequest>,
    pub(crate) responses: mpsc::UnboundedReceiver<ShardResponse>,
    pub(crate) next_id: u64,
}

impl ShardUnit {
    /// Starts a unit thread around `handler`.
    ///
    /// The thread exits once the request sender is dropped.
    pub(crate) fn spawn(shard: usize, mut handler: Box<dyn ShardHandler>) -> io::Result<Self> {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<ShardRequest>();
        let (response_tx, response_rx) = mpsc::unbounded_channel::<ShardResponse>();

        thread::Builder::new()
            .name(format!("rowview-shard-{}", shard))
            .spawn(move || {
                while let Some(request) = request_rx.blocking_recv() {
                    if let Some(response) = handler.handle(request) {
                        if response_tx.send(response).is_err() {
                            break;
                        }
                    }
                }
            })?;

        Ok(Self {
            shard,
            requests: request_tx,
            responses: response_rx,
            next_id: 1,
        })
    }
}
