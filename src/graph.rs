use std::iter;

type Vertex = usize;

/// A directed graph over the vertices `0..capacity`, kept as an adjacency
/// list. Cycles and parallel edges are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectedGraph {
    adjacency: Vec<Vec<Vertex>>,
}

impl DirectedGraph {
    pub fn new(capacity: usize) -> DirectedGraph {
        DirectedGraph {
            adjacency: vec![Vec::new(); capacity],
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    pub fn add_edge(&mut self, from: Vertex, to: Vertex) {
        assert!(
            from < self.vertex_count() && to < self.vertex_count(),
            "edge {} -> {} outside of {} vertices",
            from,
            to,
            self.vertex_count()
        );
        self.adjacency[from].push(to);
    }

    pub fn successors(&self, vertex: Vertex) -> &[Vertex] {
        &self.adjacency[vertex]
    }

    pub fn edges(&self) -> impl Iterator<Item = (Vertex, Vertex)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(from, targets)| targets.iter().map(move |&to| (from, to)))
    }

    pub fn reachable_from(&self, vertex: Vertex) -> Vec<Vertex> {
        self.reachable_from_all(iter::once(vertex))
    }

    /// Depth-first search from every seed, merging what was visited. The
    /// result is in ascending vertex order and always contains the seeds.
    pub fn reachable_from_all<I>(&self, seeds: I) -> Vec<Vertex>
    where
        I: IntoIterator<Item = Vertex>,
    {
        let mut marked = vec![false; self.vertex_count()];
        let mut stack: Vec<Vertex> = Vec::new();
        for seed in seeds {
            if marked[seed] {
                continue;
            }
            marked[seed] = true;
            stack.push(seed);
            while let Some(vertex) = stack.pop() {
                for &next in &self.adjacency[vertex] {
                    if !marked[next] {
                        marked[next] = true;
                        stack.push(next);
                    }
                }
            }
        }
        marked
            .iter()
            .enumerate()
            .filter_map(|(vertex, &visited)| visited.then_some(vertex))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle() -> DirectedGraph {
        let mut graph = DirectedGraph::new(5);
        graph.add_edge(0, 1);
        graph.add_edge(1, 2);
        graph.add_edge(2, 0);
        graph.add_edge(3, 4);
        graph
    }

    #[test]
    fn test_reachable_from_single_vertex() {
        let graph = cycle();
        assert_eq!(graph.reachable_from(1), vec![0, 1, 2]);
        assert_eq!(graph.reachable_from(3), vec![3, 4]);
        assert_eq!(graph.reachable_from(4), vec![4]);
    }

    #[test]
    fn test_reachable_from_many_vertices() {
        let graph = cycle();
        assert_eq!(graph.reachable_from_all(vec![4, 2]), vec![0, 1, 2, 4]);
        assert_eq!(graph.reachable_from_all(vec![3, 3]), vec![3, 4]);
        assert_eq!(graph.reachable_from_all(Vec::new()), Vec::<usize>::new());
    }

    #[test]
    fn test_self_loops_and_parallel_edges() {
        let mut graph = DirectedGraph::new(3);
        graph.add_edge(0, 0);
        graph.add_edge(0, 2);
        graph.add_edge(0, 2);
        assert_eq!(graph.reachable_from(0), vec![0, 2]);
        assert_eq!(graph.successors(0), &[0, 2, 2]);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_edges_in_insertion_order() {
        let graph = cycle();
        let edges: Vec<(usize, usize)> = graph.edges().collect();
        assert_eq!(edges, vec![(0, 1), (1, 2), (2, 0), (3, 4)]);
    }

    #[test]
    #[should_panic]
    fn test_edge_outside_capacity() {
        let mut graph = DirectedGraph::new(2);
        graph.add_edge(0, 2);
    }
}
