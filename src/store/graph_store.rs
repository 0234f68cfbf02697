use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use tracing::debug;

use crate::Result;
use crate::VerifyError;

/// Executes one statement against the graph store and returns its rows.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn query(
        &self,
        statement: &str,
    ) -> Result<Vec<Value>>;
}

/// Per-row acceptance check applied to query results.
pub type RowValidator = dyn Fn(&Value) -> bool + Send + Sync;

/// Context values interpolated into query templates.
///
/// Templates reference values as `{key}`; keys are dotted by convention
/// (`node.hostname`, `coordinator.ip`, `service`). Unknown placeholders are
/// left untouched so a typo surfaces in the rendered query rather than
/// silently vanishing.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    values: Vec<(String, String)>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        mut self,
        key: &str,
        value: impl Into<String>,
    ) -> Self {
        self.values.push((key.to_string(), value.into()));
        self
    }

    pub fn render(
        &self,
        template: &str,
    ) -> String {
        let mut rendered = template.to_string();
        for (key, value) in &self.values {
            rendered = rendered.replace(&format!("{{{key}}}"), value);
        }
        rendered
    }
}

/// Renders `template` with `context`, runs it, and succeeds only when every
/// row passes `validator` (when given) and the row count lands inside
/// `[min_rows, max_rows]`. Returns the rows for callers that inspect them.
pub async fn check_rows(
    store: &dyn GraphStore,
    template: &str,
    context: &QueryContext,
    validator: Option<&RowValidator>,
    min_rows: usize,
    max_rows: usize,
) -> Result<Vec<Value>> {
    let statement = context.render(template);
    debug!(%statement, "graph-store check");
    let rows = store.query(&statement).await?;

    if rows.len() < min_rows || rows.len() > max_rows {
        return Err(VerifyError::RowCount {
            got: rows.len(),
            min: min_rows,
            max: max_rows,
        }
        .into());
    }
    if let Some(validator) = validator {
        for (index, row) in rows.iter().enumerate() {
            if !validator(row) {
                return Err(VerifyError::RowRejected { index }.into());
            }
        }
    }
    Ok(rows)
}
