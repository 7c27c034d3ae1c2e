//! `nodeshadow diff`: the merge patch that moves a reported document to the desired one.

use std::path::Path;

use anyhow::Result;
use nodeshadow::{Desire, Report};
use tracing::info;

use super::{print_json, read_document};

pub fn run(desired: &Path, reported: &Path, with_nil: bool) -> Result<()> {
    let desire: Desire = read_document(desired)?;
    let report: Report = read_document(reported)?;

    let delta = if with_nil {
        desire.diff_with_nil(&report)
    } else {
        desire.diff(&report)
    };
    info!(keys = delta.len(), with_nil, "computed delta");

    print_json(&delta)
}
