use crate::intersect::SplitResult;
use nalgebra::Point2;
use std::collections::VecDeque;

pub type VertexId = usize;
pub type EdgeId = usize;

/// Undirected graph of canonical vertices and atomic edges. Planarity is a
/// property of how the edges were produced, not something this type checks.
#[derive(Debug, Clone)]
pub struct PlanarGraph {
    vertices: Vec<Point2<f64>>,
    edges: Vec<[VertexId; 2]>,
    /// Per vertex, `(neighbor, edge)` sorted counter-clockwise by direction.
    rings: Vec<Vec<(VertexId, EdgeId)>>,
}

/// Result of walking every directed edge exactly once.
#[derive(Debug, Clone, Default)]
pub struct FaceTrace {
    /// Closed vertex loops.
    pub faces: Vec<Vec<VertexId>>,
    /// Walks that hit an already used edge before closing.
    pub open: Vec<Vec<VertexId>>,
}

impl PlanarGraph {
    pub fn new(vertices: Vec<Point2<f64>>, edges: Vec<[VertexId; 2]>) -> Self {
        let mut rings: Vec<Vec<(VertexId, EdgeId)>> = vec![Vec::new(); vertices.len()];
        for (e, &[a, b]) in edges.iter().enumerate() {
            rings[a].push((b, e));
            rings[b].push((a, e));
        }
        for (v, ring) in rings.iter_mut().enumerate() {
            let origin = vertices[v];
            ring.sort_by(|x, y| {
                let dx = vertices[x.0] - origin;
                let dy = vertices[y.0] - origin;
                dx.y.atan2(dx.x)
                    .total_cmp(&dy.y.atan2(dy.x))
                    .then(x.0.cmp(&y.0))
            });
        }
        Self {
            vertices,
            edges,
            rings,
        }
    }

    pub fn from_split(split: &SplitResult) -> Self {
        Self::new(split.vertices.clone(), split.edges.clone())
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertex(&self, v: VertexId) -> Point2<f64> {
        self.vertices[v]
    }

    pub fn edges(&self) -> &[[VertexId; 2]] {
        &self.edges
    }

    /// Having arrived at `at` from `from`, the neighbor of `at` that comes
    /// next clockwise after `from`. Returns `from` itself at a dead end.
    pub fn next_clockwise(&self, from: VertexId, at: VertexId) -> Option<VertexId> {
        let ring = &self.rings[at];
        let k = ring.iter().position(|&(n, _)| n == from)?;
        Some(ring[(k + ring.len() - 1) % ring.len()].0)
    }

    /// Copy of the graph with every dangling chain removed, together with the
    /// removed edges. Vertex ids are preserved.
    pub fn without_dangling(&self) -> (PlanarGraph, Vec<[VertexId; 2]>) {
        let mut degree: Vec<usize> = self.rings.iter().map(Vec::len).collect();
        let mut removed = vec![false; self.edges.len()];
        let mut queue: VecDeque<VertexId> = (0..self.vertices.len())
            .filter(|&v| degree[v] == 1)
            .collect();

        while let Some(v) = queue.pop_front() {
            if degree[v] != 1 {
                continue;
            }
            let Some(&(n, e)) = self.rings[v].iter().find(|&&(_, e)| !removed[e]) else {
                continue;
            };
            removed[e] = true;
            degree[v] -= 1;
            degree[n] -= 1;
            if degree[n] == 1 {
                queue.push_back(n);
            }
        }

        let mut kept = Vec::new();
        let mut dropped = Vec::new();
        for (e, edge) in self.edges.iter().enumerate() {
            if removed[e] {
                dropped.push(*edge);
            } else {
                kept.push(*edge);
            }
        }
        (PlanarGraph::new(self.vertices.clone(), kept), dropped)
    }

    /// Walks every directed edge once, always turning to the next edge
    /// clockwise from the one just arrived on. Bounded faces come out
    /// counter-clockwise, the outer boundary of each component clockwise.
    pub fn trace_faces(&self) -> FaceTrace {
        let half_count = self.edges.len() * 2;
        let mut used = vec![false; half_count];
        let mut trace = FaceTrace::default();

        for start in 0..half_count {
            if used[start] {
                continue;
            }
            let mut face = Vec::new();
            let mut current = start;
            let closed = loop {
                used[current] = true;
                let (from, at) = self.half_edge_ends(current);
                face.push(from);

                let Some(next_vertex) = self.next_clockwise(from, at) else {
                    break false;
                };
                let Some(next) = self.half_edge(at, next_vertex) else {
                    break false;
                };
                if next == start {
                    break true;
                }
                if used[next] || face.len() > half_count {
                    break false;
                }
                current = next;
            };

            if closed {
                trace.faces.push(face);
            } else {
                trace.open.push(face);
            }
        }

        trace
    }

    fn half_edge_ends(&self, h: usize) -> (VertexId, VertexId) {
        let [a, b] = self.edges[h / 2];
        if h % 2 == 0 {
            (a, b)
        } else {
            (b, a)
        }
    }

    fn half_edge(&self, from: VertexId, to: VertexId) -> Option<usize> {
        self.rings[from]
            .iter()
            .find(|&&(n, _)| n == to)
            .map(|&(_, e)| if self.edges[e][0] == from { e * 2 } else { e * 2 + 1 })
    }
}
