//! Messages between the engine and shard units

use std::sync::Arc;

use crate::filter::FilterCriteria;
use crate::query::SortRule;
use crate::store::Row;

/// Correlates a reply with its request; unique per unit
pub type RequestId = u64;

/// One projection over a shard's slice
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectRequest {
    /// Active column keys, in column order
    pub keys: Vec<String>,
    pub criteria: FilterCriteria,
    /// Empty for a filter-only projection
    pub sorts: Vec<SortRule>,
}

#[derive(Debug, Clone)]
pub enum ShardRequestKind {
    /// Replace the unit's slice; `offset` is the slice's position in the store
    LoadShard { rows: Arc<Vec<Row>>, offset: usize },
    Project(Arc<ProjectRequest>),
}

impl ShardRequestKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShardRequestKind::LoadShard { .. } => "loadShard",
            ShardRequestKind::Project(_) => "project",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShardRequest {
    pub id: RequestId,
    pub kind: ShardRequestKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardReply {
    /// Slice stored; number of rows held
    Loaded { rows: usize },
    /// Passing global offsets, sorted when the request had sorts
    Projected(Vec<usize>),
}

/// Exactly one of result or error, per request
#[derive(Debug, Clone)]
pub struct ShardResponse {
    pub id: RequestId,
    pub result: Result<ShardReply, String>,
}

impl ShardResponse {
    pub fn ok(id: RequestId, reply: ShardReply) -> Self {
        Self { id, result: Ok(reply) }
    }

    pub fn error(id: RequestId, reason: impl Into<String>) -> Self {
        Self {
            id,
            result: Err(reason.into()),
        }
    }
}
