//! `nodeshadow patch`: apply a merge patch to a document.

use std::path::Path;

use anyhow::Result;
use nodeshadow::{Delta, Document, Report};

use super::{print_json, read_document};

pub fn run(document: &Path, delta: &Path) -> Result<()> {
    let document: Report = read_document(document)?;
    let delta: Delta = read_document(delta)?;
    print_json(&document.patch(&delta))
}
