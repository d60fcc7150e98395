//! Target list files: one account per line, `#` comments and blank lines ignored.
use anyhow::{Context, Result};
use std::path::Path;

/// Order and duplicates are kept; each duplicate gets its own scan.
pub fn parse_targets(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub async fn load(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read target list {}", path.display()))?;
    Ok(parse_targets(&content))
}
