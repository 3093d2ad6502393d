//! Approximate collection size from node info
//!
//! Every node reports the objects it holds for a set, replicas included.
//! The facade sums those counts over all nodes and divides by the
//! effective replication factor `min(replication-factor, node count)`.
//! The result is approximate while migrations or evictions are under way.

use crate::mapping::Entity;
use crate::observability::Event;
use crate::store::{Node, ResultCode, Store, StoreError};
use crate::translate::{AccessResult, DataAccessError};

use super::facade::AccessFacade;

impl<S: Store> AccessFacade<S> {
    /// Approximate number of records in `E`'s collection
    pub fn count<E: Entity>(&self) -> AccessResult<u64> {
        let collection = E::descriptor().collection();
        let nodes = self.translated(self.store.node_list())?;
        if nodes.is_empty() {
            return Err(self.translate(StoreError::new(
                ResultCode::NoNodes,
                "cluster reports no nodes",
            )));
        }

        let query = format!("sets/{}/{}", self.namespace(), collection);
        let mut objects: u64 = 0;
        for node in &nodes {
            let response = self.translated(self.store.info_request(node, &query))?;
            objects += set_objects(&response)?;
        }

        let replication = match self.config.replication_factor {
            Some(factor) => u64::from(factor),
            None => self.replication_factor(&nodes[0])?,
        };
        let effective = replication.min(nodes.len() as u64).max(1);
        let count = objects / effective;

        let objects_str = objects.to_string();
        let effective_str = effective.to_string();
        let nodes_str = nodes.len().to_string();
        let count_str = count.to_string();
        self.sink().event(
            Event::CountApproximate,
            &[
                ("collection", collection),
                ("objects", objects_str.as_str()),
                ("replication", effective_str.as_str()),
                ("nodes", nodes_str.as_str()),
                ("count", count_str.as_str()),
            ],
        );

        Ok(count)
    }

    fn replication_factor(&self, node: &Node) -> AccessResult<u64> {
        let query = format!("namespace/{}", self.namespace());
        let response = self.translated(self.store.info_request(node, &query))?;
        let raw = info_value(&response, "replication-factor").ok_or_else(|| {
            DataAccessError::unexpected_response(format!(
                "no replication-factor in '{}' response",
                query
            ))
        })?;
        raw.parse::<u64>().map_err(|_| {
            DataAccessError::unexpected_response(format!(
                "replication-factor '{}' is not a number",
                raw
            ))
        })
    }
}

/// Object count in a `sets/<ns>/<set>` response. An empty response means
/// the node holds no such set.
fn set_objects(response: &str) -> AccessResult<u64> {
    if response.trim().is_empty() {
        return Ok(0);
    }
    let raw = info_value(response, "objects").ok_or_else(|| {
        DataAccessError::unexpected_response(format!("no objects count in '{}'", response))
    })?;
    raw.parse::<u64>().map_err(|_| {
        DataAccessError::unexpected_response(format!("objects count '{}' is not a number", raw))
    })
}

/// Value of `key` in an info response of `k=v` pairs separated by `:` or `;`
fn info_value<'a>(response: &'a str, key: &str) -> Option<&'a str> {
    response
        .split(|c: char| c == ':' || c == ';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim())
}
