//! CART classification trees grown on bootstrap samples.
//!
//! Nodes live in a flat arena; a split sends `x[feature] <= threshold` left.

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::index;
use std::cmp::Ordering;

/// Improvements smaller than this are treated as no improvement.
const IMPURITY_EPSILON: f64 = 1e-12;

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Leaf {
        class: usize,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Growth limits shared by every tree of a forest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Number of candidate features drawn at every node.
    pub max_features: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct Grower<'a> {
    x: ArrayView2<'a, f64>,
    y: &'a [usize],
    n_classes: usize,
    params: TreeParams,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grows a tree over the given (possibly repeated) row indices.
    ///
    /// `y` holds dense class indices below `n_classes` for every row of `x`.
    pub fn grow(
        x: ArrayView2<'_, f64>,
        y: &[usize],
        n_classes: usize,
        rows: Vec<usize>,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut grower = Grower {
            x: x.view(),
            y,
            n_classes,
            params,
            rng,
            nodes: Vec::new(),
        };
        grower.build(rows, 0);
        Self {
            nodes: grower.nodes,
        }
    }

    /// Class index for one feature row.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> usize {
        let mut current = 0;
        loop {
            match &self.nodes[current] {
                Node::Leaf { class, .. } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    current = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn depth_from(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + depth_from(nodes, *left).max(depth_from(nodes, *right))
                }
            }
        }
        depth_from(&self.nodes, 0)
    }
}

impl Grower<'_> {
    fn build(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let counts = self.class_counts(&rows);
        let node_index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            class: majority(&counts),
            n_samples: rows.len(),
        });

        let parent_impurity = gini(&counts, rows.len());
        let depth_exhausted = self.params.max_depth.is_some_and(|max| depth >= max);
        if parent_impurity <= IMPURITY_EPSILON
            || depth_exhausted
            || rows.len() < self.params.min_samples_split.max(2)
        {
            return node_index;
        }

        let Some(split) = self.best_split(&rows, &counts) else {
            return node_index;
        };
        if split.impurity >= parent_impurity - IMPURITY_EPSILON {
            return node_index;
        }

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&row| self.x[[row, split.feature]] <= split.threshold);

        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[node_index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_index
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &row in rows {
            counts[self.y[row]] += 1;
        }
        counts
    }

    /// Lowest weighted Gini impurity over a random subset of features.
    fn best_split(&mut self, rows: &[usize], totals: &[usize]) -> Option<SplitCandidate> {
        let n_features = self.x.ncols();
        let amount = self.params.max_features.min(n_features);
        let features = index::sample(&mut *self.rng, n_features, amount).into_vec();

        let n = rows.len();
        let mut best: Option<SplitCandidate> = None;
        let mut sorted = rows.to_vec();

        for feature in features {
            let column = self.x.column(feature);
            sorted.sort_by(|&a, &b| {
                column[a]
                    .partial_cmp(&column[b])
                    .unwrap_or(Ordering::Equal)
            });

            let mut left = vec![0usize; self.n_classes];
            let mut right = totals.to_vec();
            for i in 0..n - 1 {
                let class = self.y[sorted[i]];
                left[class] += 1;
                right[class] -= 1;

                let current = column[sorted[i]];
                let next = column[sorted[i + 1]];
                if current >= next {
                    continue;
                }

                let n_left = i + 1;
                let n_right = n - n_left;
                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;

                if best
                    .as_ref()
                    .is_none_or(|b| impurity < b.impurity - IMPURITY_EPSILON)
                {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: midpoint(current, next),
                        impurity,
                    });
                }
            }
        }

        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&count| {
            let p = count as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// Index of the largest count; ties go to the smaller index.
pub fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best
}

/// A threshold strictly below `upper` that keeps `lower` on the left.
fn midpoint(lower: f64, upper: f64) -> f64 {
    let mid = lower + (upper - lower) / 2.0;
    if mid >= upper { lower } else { mid }
}
