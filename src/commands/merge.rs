//! `nodeshadow merge`: fold newly reported data into an existing document.

use std::path::Path;

use anyhow::{Context, Result};
use nodeshadow::{Document, Report};
use tracing::info;

use super::{print_json, read_document};

pub fn run(base: &Path, incoming: &Path) -> Result<()> {
    let mut document: Report = read_document(base)?;
    let update: Report = read_document(incoming)?;

    document
        .merge(update)
        .with_context(|| format!("merging {} into {}", incoming.display(), base.display()))?;
    info!(keys = document.len(), "merged documents");

    print_json(&document)
}
