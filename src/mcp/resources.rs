//! MCP resource catalog.
//!
//! Static metadata records only; `resources/list` returns the concatenation
//! of concrete resources and URI templates. Read-only at runtime.

use serde::Serialize;

/// A concrete resource.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// A parameterized resource.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub uri_template: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// One entry of the `resources/list` result.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResourceEntry {
    Static(Resource),
    Template(ResourceTemplate),
}

/// Result of `resources/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ListResourcesResult {
    pub resources: Vec<ResourceEntry>,
}

/// The static resource catalog.
#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    resources: Vec<Resource>,
    templates: Vec<ResourceTemplate>,
}

impl Default for ResourceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCatalog {
    /// Catalog with the built-in entries.
    pub fn new() -> Self {
        Self {
            resources: vec![Resource {
                uri: "/files/config.json".to_string(),
                name: "Configuration File".to_string(),
                description: "Server-side configuration in JSON format".to_string(),
                mime_type: "application/json".to_string(),
            }],
            templates: vec![ResourceTemplate {
                uri_template: "/logs/{date}".to_string(),
                name: "Log File by Date".to_string(),
                description: "Retrieve logs for a specific date (YYYY-MM-DD)".to_string(),
                mime_type: "text/plain".to_string(),
            }],
        }
    }

    /// Catalog from explicit entries.
    pub fn with_entries(resources: Vec<Resource>, templates: Vec<ResourceTemplate>) -> Self {
        Self {
            resources,
            templates,
        }
    }

    /// All entries: static resources first, templates after.
    pub fn list(&self) -> Vec<ResourceEntry> {
        self.resources
            .iter()
            .cloned()
            .map(ResourceEntry::Static)
            .chain(self.templates.iter().cloned().map(ResourceEntry::Template))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_concatenates_resources_and_templates() {
        let catalog = ResourceCatalog::new();
        let entries = catalog.list();
        assert_eq!(entries.len(), 2);

        let json = serde_json::to_value(&entries).unwrap();
        assert_eq!(json[0]["uri"], "/files/config.json");
        assert_eq!(json[1]["uriTemplate"], "/logs/{date}");
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let catalog = ResourceCatalog::new();
        let json = serde_json::to_string(&ListResourcesResult {
            resources: catalog.list(),
        })
        .unwrap();

        assert!(json.contains("\"mimeType\""));
        assert!(!json.contains("mime_type"));
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = ResourceCatalog::with_entries(vec![], vec![]);
        assert!(catalog.list().is_empty());
    }
}
