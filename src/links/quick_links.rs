//! The static Quick Links category.
//!
//! Platform-level links that do not depend on discovery; only the cluster
//! info URL varies with the captain domain.

use crate::links::{CategoryId, Link, LinkCategory};

pub fn build(captain_domain: &str) -> LinkCategory {
    LinkCategory::ok(
        CategoryId::Quicklinks,
        vec![
            Link::new("Cluster Info", format!("https://cluster-info.{captain_domain}")),
            Link::new("Platform Docs", "https://docs.glueops.dev"),
            Link::new("Call Support", "tel:+18774583677"),
            Link::new("Email Support", "mailto:support@glueops.dev"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::CategoryStatus;

    #[test]
    fn quick_links_are_always_ok() {
        let category = build("nonprod.example.com");
        assert_eq!(category.status, CategoryStatus::Ok);
        assert_eq!(category.links.len(), 4);
        assert_eq!(
            category.links[0].url,
            "https://cluster-info.nonprod.example.com"
        );
    }
}
