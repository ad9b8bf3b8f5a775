//! The fixed catalog of downloadable resources.

/// A downloadable document offered on the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    /// Key the site's forms submit as `resource`.
    pub key: &'static str,
    /// Site-relative path of the file.
    pub path: &'static str,
    /// Human-readable title used in emails.
    pub display_name: &'static str,
}

impl Resource {
    /// Absolute URL of the file under the given site base.
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path)
    }
}

const RESOURCES: &[Resource] = &[
    Resource {
        key: "service-overview",
        path: "downloads/emiliateams-service-overview.pdf",
        display_name: "Service Overview",
    },
    Resource {
        key: "eor-vs-peo-guide",
        path: "downloads/eor-vs-peo-guide.pdf",
        display_name: "EOR vs. PEO Guide",
    },
    Resource {
        key: "china-team-guide",
        path: "downloads/building-your-china-team-guide.pdf",
        display_name: "Building Your China Team Guide",
    },
];

/// Look up a resource by key.
#[must_use]
pub fn lookup(key: &str) -> Option<&'static Resource> {
    RESOURCES.iter().find(|r| r.key == key)
}

/// Every resource in catalog order.
#[must_use]
pub fn all() -> &'static [Resource] {
    RESOURCES
}
