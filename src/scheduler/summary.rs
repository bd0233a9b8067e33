use super::args::{DataArgs, ModuleArgsSummary, RequestArgs};
use super::Status;
use crate::buffer::Pool;
use crate::component::ComponentSummary;
use serde::Serialize;
use std::fmt;

/// Statistics of one buffer pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BufferPoolSummary {
    pub buffer_cap: u32,
    pub max_buffer_number: u32,
    pub buffer_number: u32,
    pub total: u64,
}

impl BufferPoolSummary {
    pub fn of<T>(pool: &Pool<T>) -> Self {
        Self {
            buffer_cap: pool.buffer_cap(),
            max_buffer_number: pool.max_buffer_number(),
            buffer_number: pool.buffer_number(),
            total: pool.total(),
        }
    }
}

/// Snapshot of a scheduler: parameters, status, components and pools
///
/// Component lists are sorted by component ID. `Display` renders the
/// snapshot as pretty JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulerSummary {
    pub request_args: RequestArgs,
    pub data_args: DataArgs,
    pub module_args: ModuleArgsSummary,
    pub status: Status,
    pub downloaders: Vec<ComponentSummary>,
    pub analyzers: Vec<ComponentSummary>,
    pub pipelines: Vec<ComponentSummary>,
    pub request_buffer_pool: BufferPoolSummary,
    pub response_buffer_pool: BufferPoolSummary,
    pub item_buffer_pool: BufferPoolSummary,
    pub error_buffer_pool: BufferPoolSummary,
    pub url_number: u64,
}

impl SchedulerSummary {
    /// Compact single-line JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for SchedulerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
