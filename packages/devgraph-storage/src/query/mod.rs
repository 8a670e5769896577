//! Windowed subgraph queries and the commit timeline.

mod buckets;
mod cursor;
mod layout;
mod subgraph;
mod telemetry;

pub use buckets::{commits_buckets, Granularity};
pub use cursor::Cursor;
pub use layout::{layout_hint, node_size_for_labels};
pub use subgraph::SubgraphEngine;
pub use telemetry::QueryTelemetry;
