use std::time::Duration;

/// Size limits for one collected context.
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub max_hops: u8,
    pub max_related_tables: usize,
    pub rows_per_table: usize,
    pub max_total_rows: usize,
    pub sample_timeout: Duration,
    /// Above this estimated row count, uniform samples use `TABLESAMPLE`.
    pub large_table_rows: i64,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            max_hops: 2,
            max_related_tables: 8,
            rows_per_table: 20,
            max_total_rows: 120,
            sample_timeout: Duration::from_secs(15),
            large_table_rows: 50_000,
        }
    }
}
