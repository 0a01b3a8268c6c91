use serde::Deserialize;

pub const DEFAULT_HISTORY_HOURS: u32 = 24;
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const DEFAULT_ACTIVITY_LIMIT: usize = 20;
pub const DEFAULT_ANALYSIS_LIMIT: usize = 10;

/// Query for `GET /api/sensors/history`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    /// Look-back window ending now.
    pub hours: Option<u32>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

/// Query for `GET /api/alerts`.
#[derive(Debug, Default, Deserialize)]
pub struct AlertFilter {
    pub acknowledged: Option<bool>,
}
