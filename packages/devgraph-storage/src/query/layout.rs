//! Deterministic layout hints for returned nodes.
//!
//! Clients get stable starting coordinates without a layout pass: an MD5
//! of the node id picks an angle and one of four rings.

use md5::{Digest, Md5};

/// `(x, y)` ring layout: angle from the hash modulo 3600, ring index
/// `(h / 3600) % 4`, radius `350 + 180·ring`.
pub fn layout_hint(node_id: &str) -> (f64, f64) {
    let digest = Md5::digest(node_id.as_bytes());
    let h = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as u64;

    let angle = (h % 3600) as f64 / 3600.0 * 2.0 * std::f64::consts::PI;
    let ring = (h / 3600) % 4;
    let radius = 350.0 + ring as f64 * 180.0;

    (radius * angle.cos(), radius * angle.sin())
}

/// Default display size by label.
pub fn node_size_for_labels(labels: &[String]) -> f64 {
    if labels.iter().any(|l| l == "Requirement") {
        2.0
    } else if labels.iter().any(|l| l == "File") {
        1.4
    } else if labels.iter().any(|l| l == "GitCommit") {
        1.2
    } else {
        1.0
    }
}
