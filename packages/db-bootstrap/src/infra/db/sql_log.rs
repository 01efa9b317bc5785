use std::time::Duration;

use tracing::debug;

/// Per-datasource SQL log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlLogger {
    delegate: String,
    benchmark: bool,
}

impl SqlLogger {
    pub fn new(delegate: impl Into<String>, benchmark: bool) -> Self {
        Self {
            delegate: delegate.into(),
            benchmark,
        }
    }

    pub fn delegate(&self) -> &str {
        &self.delegate
    }

    /// Render a statement line: drops an `Executed (conn): ` prefix and, with
    /// benchmarking on, appends `(N ms)`.
    pub fn format(&self, sql: &str, elapsed: Option<Duration>) -> String {
        let sql = if sql.starts_with("Executed") {
            match sql.find("): ") {
                Some(idx) if idx + 3 < sql.len() => &sql[idx + 3..],
                _ => sql,
            }
        } else {
            sql
        };

        match elapsed.filter(|_| self.benchmark) {
            Some(elapsed) => format!("{} ({} ms)", sql, elapsed.as_millis()),
            None => sql.to_string(),
        }
    }

    pub fn log(&self, sql: &str, elapsed: Option<Duration>) {
        debug!(
            target: "db_bootstrap::sql",
            delegate = %self.delegate,
            "{}",
            self.format(sql, elapsed)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_executed_prefix_and_appends_timing() {
        let logger = SqlLogger::new("model", true);
        assert_eq!(
            logger.format("Executed (default): SELECT 1", Some(Duration::from_millis(12))),
            "SELECT 1 (12 ms)"
        );
        assert_eq!(logger.format("SELECT 1", None), "SELECT 1");
    }

    #[test]
    fn benchmark_off_hides_timing() {
        let logger = SqlLogger::new("model2", false);
        assert_eq!(
            logger.format("SELECT 1", Some(Duration::from_millis(3))),
            "SELECT 1"
        );
        assert_eq!(logger.delegate(), "model2");
    }
}
