// CLASSIFICATION: COMMUNITY
// Filename: vertex.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Ordered list of wiring edges. Duplicates are legal and independent.

use heep_wire::Vertex;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VertexError {
    #[error("no matching vertex")]
    NotFound,
}

#[derive(Debug, Default, Clone)]
pub struct VertexGraph {
    edges: Vec<Vertex>,
}

impl VertexGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edge; returns its position.
    pub fn add(&mut self, vertex: Vertex) -> usize {
        self.edges.push(vertex);
        self.edges.len() - 1
    }

    /// Remove the first edge equal to `vertex` in every field.
    pub fn delete(&mut self, vertex: &Vertex) -> Result<usize, VertexError> {
        let index = self
            .edges
            .iter()
            .position(|edge| edge == vertex)
            .ok_or(VertexError::NotFound)?;
        self.edges.remove(index);
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<&Vertex> {
        self.edges.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vertex> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    /// Edges leaving the local control `tx_control`.
    pub fn outgoing(&self, tx_control: u8) -> impl Iterator<Item = &Vertex> {
        self.edges
            .iter()
            .filter(move |edge| edge.tx_control == tx_control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heep_wire::{DeviceId, IpAddress};

    fn edge(rx_control: u8) -> Vertex {
        Vertex {
            tx_id: DeviceId::new([1, 2, 3, 4]),
            rx_id: DeviceId::new([5, 6, 7, 8]),
            tx_control: 0,
            rx_control,
            rx_address: IpAddress::new(10, 0, 0, 2),
        }
    }

    #[test]
    fn duplicates_are_deleted_one_at_a_time() {
        let mut graph = VertexGraph::new();
        graph.add(edge(1));
        graph.add(edge(2));
        graph.add(edge(1));
        assert_eq!(graph.delete(&edge(1)), Ok(0));
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get(1), Some(&edge(1)));
        assert_eq!(graph.delete(&edge(3)), Err(VertexError::NotFound));
    }

    #[test]
    fn any_field_difference_prevents_delete() {
        let mut graph = VertexGraph::new();
        graph.add(edge(1));
        let mut other = edge(1);
        other.rx_address = IpAddress::new(2, 0, 0, 10);
        assert!(graph.delete(&other).is_err());
        assert_eq!(graph.outgoing(0).count(), 1);
        assert_eq!(graph.outgoing(4).count(), 0);
    }
}
