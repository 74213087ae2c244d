//! Stage ordering.
//!
//! A stage depends on another when one of the other's outputs overlaps one
//! of its inputs (same path, or one containing the other), or when it names
//! the other in `after`. Ordering is Kahn's algorithm, breaking ties by
//! declaration order.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

use super::error::GraphError;
use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct StageGraph {
    /// Stage indices in execution order
    order: Vec<usize>,
    /// Direct upstream stages of each stage
    upstream: Vec<BTreeSet<usize>>,
}

impl StageGraph {
    pub fn build(stages: &[Stage]) -> Result<Self, GraphError> {
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        for (index, stage) in stages.iter().enumerate() {
            if by_name.insert(stage.name.as_str(), index).is_some() {
                return Err(GraphError::DuplicateStage(stage.name.clone()));
            }
        }

        let mut upstream: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); stages.len()];

        for (consumer, stage) in stages.iter().enumerate() {
            for name in &stage.after {
                let Some(&producer) = by_name.get(name.as_str()) else {
                    return Err(GraphError::UnknownDependency {
                        stage: stage.name.clone(),
                        after: name.clone(),
                    });
                };
                if producer != consumer {
                    upstream[consumer].insert(producer);
                }
            }

            for (producer, other) in stages.iter().enumerate() {
                if producer != consumer && feeds(other, stage) {
                    upstream[consumer].insert(producer);
                }
            }
        }

        let order = topological_order(&upstream).map_err(|remaining| {
            GraphError::Cycle(remaining.into_iter().map(|i| stages[i].name.clone()).collect())
        })?;

        Ok(Self { order, upstream })
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn upstream(&self, index: usize) -> &BTreeSet<usize> {
        &self.upstream[index]
    }

    /// `seeds` plus everything they transitively depend on.
    pub fn upstream_closure(&self, seeds: impl IntoIterator<Item = usize>) -> BTreeSet<usize> {
        let mut included: BTreeSet<usize> = BTreeSet::new();
        let mut stack: Vec<usize> = seeds.into_iter().collect();
        while let Some(current) = stack.pop() {
            if included.insert(current) {
                stack.extend(self.upstream[current].iter().copied());
            }
        }
        included
    }
}

/// Kahn's algorithm. On a cycle, returns the stages that could not be
/// ordered, in declaration order.
fn topological_order(upstream: &[BTreeSet<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let mut in_degree: Vec<usize> = upstream.iter().map(BTreeSet::len).collect();
    let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); upstream.len()];
    for (consumer, producers) in upstream.iter().enumerate() {
        for &producer in producers {
            downstream[producer].push(consumer);
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| index)
        .collect();

    let mut ordered = Vec::with_capacity(upstream.len());
    while let Some(next) = ready.pop_first() {
        ordered.push(next);
        for &consumer in &downstream[next] {
            in_degree[consumer] -= 1;
            if in_degree[consumer] == 0 {
                ready.insert(consumer);
            }
        }
    }

    if ordered.len() == upstream.len() {
        Ok(ordered)
    } else {
        let placed: BTreeSet<usize> = ordered.into_iter().collect();
        Err((0..upstream.len()).filter(|i| !placed.contains(i)).collect())
    }
}

fn feeds(producer: &Stage, consumer: &Stage) -> bool {
    producer.outputs.iter().any(|output| {
        consumer
            .inputs
            .iter()
            .any(|input| paths_overlap(output, input))
    })
}

/// True when the paths are equal or one lies inside the other.
pub fn paths_overlap(a: &Path, b: &Path) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    a.starts_with(&b) || b.starts_with(&a)
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
