//! Schema snapshot.
//!
//! Built once when the agent starts and never mutated afterwards; every
//! pipeline run borrows it.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::error::GraphResult;
use crate::graph::{relationship_key, GraphGateway, SchemaInfo};

/// Labels, relationship types, property names and sampled property values.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaCache {
    pub node_labels: Vec<String>,
    pub relationship_types: Vec<String>,
    pub node_properties: HashMap<String, Vec<String>>,
    pub relationship_properties: HashMap<String, Vec<String>>,
    /// Property name to sampled values, in first-sampled order.
    property_value_samples: Vec<(String, Vec<Value>)>,
}

impl SchemaCache {
    /// Snapshot the graph schema and sample values for every property.
    ///
    /// Owners are visited labels first, then relationship types. A property
    /// name already holding samples is skipped; a failed or empty lookup
    /// leaves the name open for the next owner that carries it.
    pub async fn build(graph: &dyn GraphGateway, sample_limit: usize) -> GraphResult<Self> {
        let info = graph.get_schema_info().await?;

        let owners = info
            .node_labels
            .iter()
            .flat_map(|label| {
                owned_properties(&info.node_properties, label)
                    .iter()
                    .map(move |property| (label.clone(), property))
            })
            .chain(info.relationship_types.iter().flat_map(|rel_type| {
                owned_properties(&info.relationship_properties, rel_type)
                    .iter()
                    .map(move |property| (relationship_key(rel_type), property))
            }));

        let mut samples: Vec<(String, Vec<Value>)> = Vec::new();
        for (key, property) in owners {
            if samples.iter().any(|(name, _)| name == property) {
                continue;
            }
            match graph.get_property_values(&key, property).await {
                Ok(values) if !values.is_empty() => {
                    let values = values.into_iter().take(sample_limit).collect();
                    samples.push((property.clone(), values));
                }
                Ok(_) => debug!(key = %key, property = %property, "No sample values"),
                Err(e) => debug!(
                    key = %key,
                    property = %property,
                    error = %e,
                    "Sample lookup failed, skipping"
                ),
            }
        }

        info!(
            labels = info.node_labels.len(),
            relationship_types = info.relationship_types.len(),
            sampled_properties = samples.len(),
            "Schema snapshot built"
        );

        let cache = Self::from_parts(info, samples);
        if cache.is_empty() {
            warn!("Graph reports no labels or relationship types");
        }
        Ok(cache)
    }

    /// Assemble a snapshot from already-collected parts.
    pub fn from_parts(info: SchemaInfo, samples: Vec<(String, Vec<Value>)>) -> Self {
        Self {
            node_labels: info.node_labels,
            relationship_types: info.relationship_types,
            node_properties: info.node_properties,
            relationship_properties: info.relationship_properties,
            property_value_samples: samples,
        }
    }

    /// Sampled values for one property, if any were collected.
    pub fn samples(&self, property: &str) -> Option<&[Value]> {
        self.property_value_samples
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, values)| values.as_slice())
    }

    /// All sampled properties in the order they were collected.
    pub fn property_samples(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.property_value_samples
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn has_samples(&self) -> bool {
        !self.property_value_samples.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.node_labels.is_empty() && self.relationship_types.is_empty()
    }

    /// Node properties ordered by label for stable rendering.
    pub fn sorted_node_properties(&self) -> BTreeMap<&str, &[String]> {
        self.node_properties
            .iter()
            .map(|(label, props)| (label.as_str(), props.as_slice()))
            .collect()
    }
}

fn owned_properties<'a>(map: &'a HashMap<String, Vec<String>>, owner: &str) -> &'a [String] {
    map.get(owner).map(Vec::as_slice).unwrap_or_default()
}
