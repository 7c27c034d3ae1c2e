pub mod document;
pub mod keys;
pub mod node;
pub mod node_view;
pub mod quantity;
pub mod reconcile;
pub mod types;
