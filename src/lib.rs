//! State reconciliation primitives for edge fleet nodes.
//!
//! Every node keeps a reported document (what the device last said) and a
//! desired document (what the control plane wants). This crate merges new
//! reports into existing ones, computes and applies RFC 7396 merge patches
//! between the two, and builds the operator-facing [`NodeView`].

pub mod config;
pub mod domain;
mod error;

pub use domain::document::{Delta, Desire, Document, Report};
pub use domain::node::Node;
pub use domain::node_view::{NodeView, ReportView};
pub use domain::quantity::Quantity;
pub use domain::types::{
    AppInfo, AppStats, CoreInfo, DeviceInfo, InstanceStats, NodeInfo, NodeStats, SyncMode,
};
pub use error::{Error, Result};
