//! Decision-forest inference over an exported model artifact.
//!
//! The artifact is a JSON export of a scikit-learn random forest: per tree, the parallel node
//! arrays `children_left`, `children_right`, `feature`, `threshold` and `value`. A node is a leaf
//! when `children_left[i] == -1`. At a split the sample goes left when
//! `x[feature[i]] <= threshold[i]`. A leaf's `value[i]` holds per-class weights `[w0, w1]`, and
//! the forest probability is the mean of the trees' positive-class fractions.
//!
//! Every tree is checked when the artifact is loaded so that inference can walk nodes without
//! bounds or cycle checks.

use crate::predictor::RiskTiers;
use crate::schema::FEATURE_NAMES;
use crate::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Anything that maps a feature vector to a positive-class probability.
pub trait Classifier: Send + Sync {
    /// Number of input columns the classifier expects.
    fn n_features(&self) -> usize;

    /// Probability of the positive class.
    fn predict_proba(&self, features: &[f64]) -> RiskResult<f64>;
}

/// On-disk model format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub n_estimators: Option<u32>,
    #[serde(default)]
    pub max_depth: Option<u32>,
    #[serde(default)]
    pub risk_tiers: Option<RiskTiers>,
    pub trees: Vec<TreeArtifact>,
}

/// One exported tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArtifact {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl ModelArtifact {
    /// Parse an artifact, reporting the JSON path of any malformed element.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, String> {
        let mut de = serde_json::Deserializer::from_reader(reader);
        serde_path_to_error::deserialize(&mut de).map_err(|e| {
            let path = e.path().to_string();
            format!("{} (at {})", e.into_inner(), path)
        })
    }

    /// Read and parse the artifact at `path`.
    pub fn read(path: &Path) -> RiskResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| RiskError::model_load(path, e))?;
        Self::from_reader(std::io::BufReader::new(file)).map_err(|e| RiskError::model_load(path, e))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        proba: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Check and compile one exported tree.
    pub fn from_artifact(tree: &TreeArtifact, n_features: usize) -> Result<Self, String> {
        let n = tree.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        if tree.children_right.len() != n
            || tree.feature.len() != n
            || tree.threshold.len() != n
            || tree.value.len() != n
        {
            return Err(format!(
                "node arrays differ in length (children_left {}, children_right {}, feature {}, threshold {}, value {})",
                n,
                tree.children_right.len(),
                tree.feature.len(),
                tree.threshold.len(),
                tree.value.len()
            ));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (tree.children_left[i], tree.children_right[i]);
            if left == -1 && right == -1 {
                nodes.push(Node::Leaf {
                    proba: leaf_probability(&tree.value[i]).map_err(|e| format!("node {i}: {e}"))?,
                });
                continue;
            }

            // Children must come after their parent, which rules out cycles.
            let child = |c: i64| -> Result<usize, String> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > i && c < n)
                    .ok_or_else(|| format!("node {i}: child index {c} out of range"))
            };
            let feature = usize::try_from(tree.feature[i])
                .ok()
                .filter(|&f| f < n_features)
                .ok_or_else(|| {
                    format!(
                        "node {i}: feature index {} out of range for {} features",
                        tree.feature[i], n_features
                    )
                })?;
            let threshold = tree.threshold[i];
            if !threshold.is_finite() {
                return Err(format!("node {i}: split threshold must be finite"));
            }

            nodes.push(Node::Split {
                feature,
                threshold,
                left: child(left)?,
                right: child(right)?,
            });
        }

        Ok(Self { nodes })
    }

    /// Walk from the root to a leaf.
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        let mut i = 0;
        loop {
            match self.nodes[i] {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if features[feature] <= threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Longest root-to-leaf path, counted in edges.
    pub fn depth(&self) -> usize {
        // Children always follow their parent, so one forward pass suffices.
        let mut depth = vec![0usize; self.nodes.len()];
        let mut max = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = *node {
                depth[left] = depth[left].max(depth[i] + 1);
                depth[right] = depth[right].max(depth[i] + 1);
                max = max.max(depth[i] + 1);
            }
        }
        max
    }
}

fn leaf_probability(weights: &[f64]) -> Result<f64, String> {
    let [negative, positive] = weights else {
        return Err(format!(
            "leaf must hold 2 class weights, found {}",
            weights.len()
        ));
    };
    if !(negative.is_finite() && positive.is_finite()) || *negative < 0.0 || *positive < 0.0 {
        return Err("leaf class weights must be finite and non-negative".into());
    }
    let total = negative + positive;
    if total <= 0.0 {
        return Err("leaf class weights must not sum to zero".into());
    }
    Ok(positive / total)
}

/// A validated random forest.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl DecisionForest {
    /// Validate an artifact against the preprocessor's column order and compile its trees.
    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self, String> {
        if artifact.feature_names.len() != FEATURE_NAMES.len() {
            return Err(format!(
                "model expects {} features, preprocessor produces {}",
                artifact.feature_names.len(),
                FEATURE_NAMES.len()
            ));
        }
        if let Some((i, (got, want))) = artifact
            .feature_names
            .iter()
            .zip(FEATURE_NAMES)
            .enumerate()
            .find(|(_, (got, want))| got.as_str() != *want)
        {
            return Err(format!(
                "feature {i} is '{got}' in the model but '{want}' in the preprocessor"
            ));
        }
        if artifact.trees.is_empty() {
            return Err("model contains no trees".into());
        }

        let n_features = FEATURE_NAMES.len();
        let trees = artifact
            .trees
            .iter()
            .enumerate()
            .map(|(t, tree)| {
                DecisionTree::from_artifact(tree, n_features).map_err(|e| format!("tree {t}: {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { trees, n_features })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
    }
}

impl Classifier for DecisionForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> RiskResult<f64> {
        if features.len() != self.n_features {
            return Err(RiskError::Inference(format!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }
}
