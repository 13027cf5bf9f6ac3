//! Task graph construction and traversal
//!
//! The graph is built fresh for every run from the engine's registry. Node
//! indexes match the registry order, so index `i` is the `i`-th registered task.

use crate::error::{GraphError, GraphResult};
use crate::runner::task::{name_key, Task};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// A resolved dependency edge: the owning node depends on `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub to: usize,
    pub required: bool,
}

/// Directed graph of registered tasks, keyed by case-insensitive name
#[derive(Debug, Clone)]
pub struct TaskGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<Edge>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

impl TaskGraph {
    /// Build the graph, folding dependee declarations into the dependency
    /// edges of the referenced task.
    ///
    /// Two tasks whose names only differ in case fail with `DuplicateTask`.
    /// Unresolved required edges fail with `MissingDependency`; unresolved
    /// optional ones are dropped.
    #[instrument(skip_all, fields(tasks = tasks.len()))]
    pub fn build(tasks: &[Task]) -> GraphResult<Self> {
        let names: Vec<String> = tasks.iter().map(|t| t.name().to_string()).collect();
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name_key(name), i).is_some() {
                return Err(GraphError::DuplicateTask(name.clone()));
            }
        }

        let mut graph = TaskGraph {
            edges: vec![Vec::new(); names.len()],
            names,
            index,
        };

        for (from, task) in tasks.iter().enumerate() {
            for dep in task.dependencies() {
                match graph.find(&dep.name) {
                    Some(to) => graph.connect(from, to, dep.required),
                    None if dep.required => {
                        return Err(GraphError::MissingDependency {
                            task: task.name().to_string(),
                            dependency: dep.name.clone(),
                        })
                    }
                    None => debug!(
                        task = task.name(),
                        dependency = %dep.name,
                        "dropping optional dependency"
                    ),
                }
            }
        }

        for (to, task) in tasks.iter().enumerate() {
            for dependee in task.dependees() {
                match graph.find(&dependee.name) {
                    Some(from) => graph.connect(from, to, dependee.required),
                    None if dependee.required => {
                        return Err(GraphError::MissingDependency {
                            task: task.name().to_string(),
                            dependency: dependee.name.clone(),
                        })
                    }
                    None => debug!(
                        task = task.name(),
                        dependee = %dependee.name,
                        "dropping optional dependee"
                    ),
                }
            }
        }

        debug!(nodes = graph.len(), "task graph built");
        Ok(graph)
    }

    fn connect(&mut self, from: usize, to: usize, required: bool) {
        let edges = &mut self.edges[from];
        match edges.iter_mut().find(|e| e.to == to) {
            // Declared both ways (dependency and dependee); required wins
            Some(existing) => existing.required |= required,
            None => edges.push(Edge { to, required }),
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Look up a node by name, ignoring case
    pub fn find(&self, name: &str) -> Option<usize> {
        self.index.get(&name_key(name)).copied()
    }

    /// Check whether a task with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// The registered name of a node
    pub fn name(&self, node: usize) -> &str {
        &self.names[node]
    }

    /// Resolved edges of a node, in declaration order
    pub fn edges(&self, node: usize) -> &[Edge] {
        &self.edges[node]
    }

    /// Names of the resolved dependencies of a task, in declaration order
    pub fn dependencies(&self, name: &str) -> Option<Vec<&str>> {
        let node = self.find(name)?;
        Some(self.edges[node].iter().map(|e| self.name(e.to)).collect())
    }

    /// Compute the execution order for `target`: every task reachable from
    /// it, dependencies first, each exactly once.
    pub fn traverse(&self, target: &str) -> GraphResult<Vec<usize>> {
        let start = self
            .find(target)
            .ok_or_else(|| GraphError::TargetNotFound(target.to_string()))?;

        let mut marks = vec![Mark::Unvisited; self.len()];
        let mut order = Vec::new();
        self.visit(start, &mut marks, &mut order)?;
        Ok(order)
    }

    /// Like `traverse`, returning task names
    pub fn traverse_names(&self, target: &str) -> GraphResult<Vec<String>> {
        Ok(self
            .traverse(target)?
            .into_iter()
            .map(|node| self.names[node].clone())
            .collect())
    }

    fn visit(&self, node: usize, marks: &mut [Mark], order: &mut Vec<usize>) -> GraphResult<()> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::Visiting => return Err(GraphError::CyclicDependency(self.names[node].clone())),
            Mark::Unvisited => {}
        }

        marks[node] = Mark::Visiting;
        for edge in &self.edges[node] {
            self.visit(edge.to, marks, order)?;
        }
        marks[node] = Mark::Done;
        order.push(node);
        Ok(())
    }

    /// Nodes that must run for `target` to be reached: the target itself and
    /// everything reachable from it over required edges only.
    pub fn required_closure(&self, target: usize) -> Vec<bool> {
        let mut required = vec![false; self.len()];
        let mut stack = vec![target];
        while let Some(node) = stack.pop() {
            if required[node] {
                continue;
            }
            required[node] = true;
            stack.extend(
                self.edges[node]
                    .iter()
                    .filter(|e| e.required)
                    .map(|e| e.to),
            );
        }
        required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, deps: &[&str]) -> Task {
        let mut task = Task::new(name).unwrap();
        for dep in deps {
            task.add_dependency(*dep, true).unwrap();
        }
        task
    }

    #[test]
    fn test_chain_order() {
        let tasks = vec![task("A", &[]), task("B", &["A"]), task("C", &["B"])];
        let graph = TaskGraph::build(&tasks).unwrap();

        assert_eq!(graph.traverse_names("C").unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_shared_dependency_visited_once() {
        let tasks = vec![
            task("clean", &[]),
            task("restore", &["clean"]),
            task("build", &["clean", "restore"]),
            task("test", &["build", "restore"]),
        ];
        let graph = TaskGraph::build(&tasks).unwrap();

        assert_eq!(
            graph.traverse_names("test").unwrap(),
            vec!["clean", "restore", "build", "test"]
        );
    }

    #[test]
    fn test_declaration_order_preserved() {
        let tasks = vec![
            task("X", &[]),
            task("Y", &[]),
            task("Z", &[]),
            task("target", &["Z", "X", "Y"]),
        ];
        let graph = TaskGraph::build(&tasks).unwrap();

        assert_eq!(graph.dependencies("target").unwrap(), vec!["Z", "X", "Y"]);
        assert_eq!(
            graph.traverse_names("target").unwrap(),
            vec!["Z", "X", "Y", "target"]
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let tasks = vec![task("Build", &[]), task("test", &["BUILD"])];
        let graph = TaskGraph::build(&tasks).unwrap();

        assert!(graph.contains("build"));
        assert_eq!(graph.traverse_names("TEST").unwrap(), vec!["Build", "test"]);
    }

    #[test]
    fn test_non_ascii_lookup_is_case_insensitive() {
        let tasks = vec![task("Ärger", &[]), task("build", &["ÄRGER"])];
        let graph = TaskGraph::build(&tasks).unwrap();

        assert_eq!(graph.find("ärger"), Some(0));
        assert_eq!(graph.traverse_names("build").unwrap(), vec!["Ärger", "build"]);
    }

    #[test]
    fn test_names_differing_in_case_are_rejected() {
        let tasks = vec![task("Ärger", &[]), task("ärger", &[])];
        assert_eq!(
            TaskGraph::build(&tasks).unwrap_err(),
            GraphError::DuplicateTask("ärger".to_string())
        );
    }

    #[test]
    fn test_missing_required_dependency() {
        let tasks = vec![task("build", &["restore"])];
        let result = TaskGraph::build(&tasks);

        assert_eq!(
            result.unwrap_err(),
            GraphError::MissingDependency {
                task: "build".to_string(),
                dependency: "restore".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_optional_dependency_is_dropped() {
        let mut build = task("build", &[]);
        build.add_dependency("restore", false).unwrap();
        let graph = TaskGraph::build(&[build]).unwrap();

        assert!(graph.dependencies("build").unwrap().is_empty());
        assert_eq!(graph.traverse_names("build").unwrap(), vec!["build"]);
    }

    #[test]
    fn test_dependee_becomes_dependency() {
        let mut clean = task("clean", &[]);
        clean.add_dependee("build", true).unwrap();
        let tasks = vec![clean, task("build", &[])];
        let graph = TaskGraph::build(&tasks).unwrap();

        assert_eq!(graph.dependencies("build").unwrap(), vec!["clean"]);
        assert_eq!(graph.traverse_names("build").unwrap(), vec!["clean", "build"]);
    }

    #[test]
    fn test_missing_required_dependee() {
        let mut clean = task("clean", &[]);
        clean.add_dependee("package", true).unwrap();
        assert!(matches!(
            TaskGraph::build(&[clean]),
            Err(GraphError::MissingDependency { .. })
        ));
    }

    #[test]
    fn test_cycle_detected() {
        let tasks = vec![task("A", &["C"]), task("B", &["A"]), task("C", &["B"])];
        let graph = TaskGraph::build(&tasks).unwrap();

        assert_eq!(
            graph.traverse("C").unwrap_err(),
            GraphError::CyclicDependency("C".to_string())
        );
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let tasks = vec![task("A", &["a"])];
        let graph = TaskGraph::build(&tasks).unwrap();
        assert!(matches!(
            graph.traverse("A"),
            Err(GraphError::CyclicDependency(_))
        ));
    }

    #[test]
    fn test_target_not_found() {
        let graph = TaskGraph::build(&[task("A", &[])]).unwrap();
        assert_eq!(
            graph.traverse("deploy").unwrap_err(),
            GraphError::TargetNotFound("deploy".to_string())
        );
    }

    #[test]
    fn test_required_closure_skips_optional_edges() {
        let mut target = task("target", &["hard"]);
        target.add_dependency("soft", false).unwrap();
        let tasks = vec![task("base", &[]), task("hard", &["base"]), task("soft", &[]), target];
        let graph = TaskGraph::build(&tasks).unwrap();

        let required = graph.required_closure(graph.find("target").unwrap());
        assert_eq!(required, vec![true, true, false, true]);
    }
}
