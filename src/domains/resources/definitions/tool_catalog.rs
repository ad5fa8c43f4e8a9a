//! Tool catalog resource definition.

use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;

use super::ResourceDefinition;
use crate::core::config::Config;
use crate::domains::resources::error::ResourceError;
use crate::domains::tools::{ToolCategory, ToolRegistry};

/// Every registered tool, grouped by category.
pub struct ToolCatalogResource;

#[derive(Debug, Serialize)]
struct CatalogEntry {
    name: &'static str,
    description: Option<Cow<'static, str>>,
}

#[derive(Debug, Serialize)]
struct Catalog {
    total: usize,
    categories: BTreeMap<ToolCategory, Vec<CatalogEntry>>,
}

impl ResourceDefinition for ToolCatalogResource {
    const URI: &'static str = "tools://catalog";
    const NAME: &'static str = "Tool Catalog";
    const DESCRIPTION: &'static str = "All available tools grouped by category";
    const MIME_TYPE: &'static str = "application/json";

    fn render(_config: &Config) -> Result<String, ResourceError> {
        let tools = ToolRegistry::categorized_tools();
        let mut categories: BTreeMap<ToolCategory, Vec<CatalogEntry>> = BTreeMap::new();
        let total = tools.len();

        for (category, name, tool) in tools {
            categories.entry(category).or_default().push(CatalogEntry {
                name,
                description: tool.description,
            });
        }

        Ok(serde_json::to_string_pretty(&Catalog { total, categories })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_groups_tools() {
        let json: serde_json::Value =
            serde_json::from_str(&ToolCatalogResource::render(&Config::default()).unwrap())
                .unwrap();

        assert_eq!(json["total"], 11);
        assert_eq!(json["categories"]["image"].as_array().unwrap().len(), 1);
        assert_eq!(json["categories"]["audio"].as_array().unwrap().len(), 3);
        assert_eq!(json["categories"]["text"].as_array().unwrap().len(), 4);
        assert_eq!(json["categories"]["calculator"].as_array().unwrap().len(), 3);
        assert_eq!(
            json["categories"]["image"][0]["name"],
            "image_remove_background"
        );
    }
}
