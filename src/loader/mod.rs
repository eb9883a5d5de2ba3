//! Worklist loading.
//!
//! Accepts the grouped JSON produced by the link generator
//! (`{"<month page>": ["<box score url>", ...], ...}`), a flat JSON array,
//! or plain text with one url per line.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

pub fn load_worklist(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read worklist {:?}", path))?;
    let urls = parse_worklist(&text).with_context(|| format!("Malformed worklist {:?}", path))?;
    info!("Loaded {} boxscore links from {:?}", urls.len(), path);
    Ok(urls)
}

pub fn parse_worklist(text: &str) -> Result<Vec<String>> {
    let trimmed = text.trim_start();
    let urls = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        let json: Value = serde_json::from_str(trimmed)?;
        flatten_json(&json)?
    } else {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect()
    };
    Ok(dedupe(urls))
}

/// Groups are visited in file order (`preserve_order`).
fn flatten_json(json: &Value) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    match json {
        Value::Object(groups) => {
            for (group, links) in groups {
                let Value::Array(links) = links else {
                    bail!("group {:?} is not a list", group);
                };
                debug!("{}: {} links", group, links.len());
                urls.extend(string_items(links));
            }
        }
        Value::Array(links) => urls.extend(string_items(links)),
        _ => bail!("expected a JSON object or array"),
    }
    Ok(urls)
}

fn string_items(items: &[Value]) -> impl Iterator<Item = String> + '_ {
    items.iter().filter_map(|v| match v.as_str() {
        Some(s) => Some(s.trim().to_string()),
        None => {
            warn!("Skipping non-string worklist entry {}", v);
            None
        }
    })
}

fn dedupe(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|u| !u.is_empty() && seen.insert(u.clone()))
        .collect()
}
