//! DAG data model: plan, nodes, validation, topological sort, level
//! partitioning (spec §3, §4.B).

use crate::error::OrchestratorError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

/// A parameter value attached to a [`DAGNode`]: either a literal JSON value
/// or a reference to another node's result, resolved at dispatch time.
///
/// `${node_id}` as the *entire* string value of a param is a [`ParamExpr::Ref`];
/// any other string is a literal (occurrences of `${node_id}` inside a larger
/// string are substituted textually by the scheduler, not represented here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamExpr {
    Ref(String),
    Literal(serde_json::Value),
}

impl ParamExpr {
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Parse a raw JSON value into a `ParamExpr`, recognizing the exact
    /// `${node_id}` string form as a reference.
    pub fn from_value(value: serde_json::Value) -> Self {
        if let serde_json::Value::String(s) = &value {
            if let Some(id) = strip_ref(s) {
                return Self::Ref(id.to_string());
            }
        }
        Self::Literal(value)
    }
}

/// Returns `Some(node_id)` if `s` is exactly `${node_id}`.
pub fn strip_ref(s: &str) -> Option<&str> {
    s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}'))
}

/// Status of a DAG node (spec §3 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

crate::simple_display! {
    NodeStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Skipped => "skipped",
    }
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

/// A single tool invocation within a [`DAGPlan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DAGNode {
    pub id: String,
    pub name: String,
    pub tool: String,
    pub params: HashMap<String, ParamExpr>,
    pub dependencies: HashSet<String>,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<Duration>,
}

impl DAGNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tool: tool.into(),
            params: HashMap::new(),
            dependencies: HashSet::new(),
            status: NodeStatus::Pending,
            result: None,
            error: None,
            execution_time: None,
        }
    }

    crate::setters! {
        set { dependencies: HashSet<String> }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), ParamExpr::from_value(value));
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.insert(id.into());
        self
    }
}

/// An immutable, named, described collection of [`DAGNode`]s plus their
/// mutable per-node execution state (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DAGPlan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub nodes: Vec<DAGNode>,
}

impl DAGPlan {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), description: description.into(), nodes: Vec::new() }
    }

    pub fn with_node(mut self, node: DAGNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn get_node(&self, id: &str) -> Option<&DAGNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut DAGNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Validate the plan: duplicate ids, dangling dependencies, cycles.
    /// Returns the union of every error found (not just the first).
    pub fn validate(&self) -> Vec<OrchestratorError> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                errors.push(OrchestratorError::DuplicateNodeId(node.id.clone()));
            }
        }

        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        for node in &self.nodes {
            for dep in &node.dependencies {
                if !ids.contains(dep.as_str()) {
                    errors.push(OrchestratorError::DanglingReference {
                        node: node.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // Only run the cycle check if ids are well-formed; a dangling
        // reference would otherwise corrupt the in-degree count.
        if errors.is_empty() {
            if let Err(cyc) = self.topological_sort() {
                errors.push(cyc);
            }
        }

        errors
    }

    /// Kahn's algorithm, stable on insertion order at each tie.
    pub fn topological_sort(&self) -> Result<Vec<&DAGNode>, OrchestratorError> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for node in &self.nodes {
            in_degree.entry(node.id.as_str()).or_insert(0);
            for dep in &node.dependencies {
                *in_degree.entry(node.id.as_str()).or_insert(0) += 1;
                dependents.entry(dep.as_str()).or_default().push(node.id.as_str());
            }
        }

        // Insertion-order stable queue.
        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| in_degree.get(id).copied().unwrap_or(0) == 0)
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            if let Some(node) = self.get_node(id) {
                result.push(node);
            }
            if let Some(deps) = dependents.get(id) {
                for &next in deps {
                    let entry = in_degree.entry(next).or_insert(0);
                    *entry -= 1;
                    if *entry == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        if result.len() != self.nodes.len() {
            let stuck: Vec<String> = self
                .nodes
                .iter()
                .filter(|n| !result.iter().any(|r| r.id == n.id))
                .map(|n| n.id.clone())
                .collect();
            return Err(OrchestratorError::CyclicDependency(stuck));
        }

        Ok(result)
    }

    /// level(node) = 1 + max(level(dep)) over dependencies, or 0 if none.
    /// Returns node ids grouped by level; each level can run concurrently.
    pub fn levels(&self) -> Result<Vec<Vec<String>>, OrchestratorError> {
        let sorted = self.topological_sort()?;
        let mut node_level: HashMap<&str, usize> = HashMap::new();
        let mut levels: Vec<Vec<String>> = Vec::new();

        for node in sorted {
            let level = node
                .dependencies
                .iter()
                .filter_map(|d| node_level.get(d.as_str()).copied())
                .max()
                .map(|m| m + 1)
                .unwrap_or(0);
            node_level.insert(node.id.as_str(), level);
            if levels.len() <= level {
                levels.resize(level + 1, Vec::new());
            }
            levels[level].push(node.id.clone());
        }

        Ok(levels)
    }

    pub fn ready_nodes(&self) -> Vec<&DAGNode> {
        self.nodes
            .iter()
            .filter(|n| {
                n.status == NodeStatus::Pending
                    && n.dependencies.iter().all(|d| {
                        self.get_node(d).map(|dn| dn.status == NodeStatus::Completed).unwrap_or(false)
                    })
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(|n| n.status.is_terminal())
    }

    pub fn is_successful(&self) -> bool {
        self.nodes.iter().all(|n| n.status == NodeStatus::Completed)
    }

    /// Render as a Mermaid flowchart, for CLI/debug display.
    pub fn to_mermaid(&self) -> String {
        let mut lines = vec!["graph TD".to_string()];
        for node in &self.nodes {
            lines.push(format!("    {}[\"{}\\n({})\"]", node.id, node.name, node.tool));
        }
        for node in &self.nodes {
            for dep in &node.dependencies {
                lines.push(format!("    {dep} --> {}", node.id));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn plan_with(nodes: Vec<DAGNode>) -> DAGPlan {
        let mut plan = DAGPlan::new("p1", "test plan", "desc");
        plan.nodes = nodes;
        plan
    }

    #[test]
    fn topo_sort_orders_dependencies_first() {
        let a = DAGNode::new("a", "A", "list_tables");
        let b = DAGNode::new("b", "B", "describe_table").depends_on("a");
        let plan = plan_with(vec![a, b]);

        let sorted = plan.topological_sort().unwrap();
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].id, "a");
        assert_eq!(sorted[1].id, "b");
    }

    #[test]
    fn cycle_is_detected() {
        let a = DAGNode::new("a", "A", "t").depends_on("b");
        let b = DAGNode::new("b", "B", "t").depends_on("a");
        let plan = plan_with(vec![a, b]);

        let errors = plan.validate();
        assert!(errors.iter().any(|e| matches!(e, OrchestratorError::CyclicDependency(_))));
        assert!(plan.topological_sort().is_err());
    }

    #[test]
    fn dangling_dependency_is_detected() {
        let a = DAGNode::new("a", "A", "t").depends_on("missing");
        let plan = plan_with(vec![a]);
        let errors = plan.validate();
        assert!(errors.iter().any(|e| matches!(e, OrchestratorError::DanglingReference { .. })));
    }

    #[test]
    fn duplicate_id_is_detected() {
        let a1 = DAGNode::new("a", "A1", "t");
        let a2 = DAGNode::new("a", "A2", "t");
        let plan = plan_with(vec![a1, a2]);
        let errors = plan.validate();
        assert!(errors.iter().any(|e| matches!(e, OrchestratorError::DuplicateNodeId(_))));
    }

    #[test]
    fn levels_partition_parallel_fan_out() {
        let a = DAGNode::new("a", "A", "t");
        let b = DAGNode::new("b", "B", "t");
        let c = DAGNode::new("c", "C", "t");
        let d = DAGNode::new("d", "D", "t").depends_on("a").depends_on("b").depends_on("c");
        let plan = plan_with(vec![a, b, c, d]);

        let levels = plan.levels().unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].len(), 3);
        assert_eq!(levels[1], vec!["d".to_string()]);
    }

    #[test]
    fn chain_of_nodes_is_fully_sequential() {
        let mut nodes = vec![DAGNode::new("n0", "N0", "t")];
        for i in 1..100 {
            nodes.push(DAGNode::new(format!("n{i}"), format!("N{i}"), "t").depends_on(format!("n{}", i - 1)));
        }
        let plan = plan_with(nodes);
        let levels = plan.levels().unwrap();
        assert_eq!(levels.len(), 100);
        assert!(levels.iter().all(|l| l.len() == 1));
    }

    #[test]
    fn empty_dag_has_no_levels_and_no_errors() {
        let plan = plan_with(vec![]);
        assert!(plan.validate().is_empty());
        assert_eq!(plan.levels().unwrap().len(), 0);
        assert!(plan.is_complete());
        assert!(plan.is_successful());
    }

    #[test]
    fn round_trip_preserves_structure() {
        let a = DAGNode::new("a", "A", "list_tables");
        let mut b = DAGNode::new("b", "B", "describe_table").depends_on("a");
        b.status = NodeStatus::Completed;
        let plan = plan_with(vec![a, b]);

        let json = serde_json::to_string(&plan).unwrap();
        let back: DAGPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nodes.len(), 2);
        assert_eq!(back.get_node("b").unwrap().status, NodeStatus::Completed);
        assert_eq!(back.get_node("b").unwrap().dependencies, plan.get_node("b").unwrap().dependencies);
    }

    #[test]
    fn param_expr_recognizes_reference_form() {
        let v = serde_json::json!("${node_a}");
        assert_eq!(ParamExpr::from_value(v), ParamExpr::Ref("node_a".to_string()));

        let v = serde_json::json!("plain string");
        assert_eq!(ParamExpr::from_value(v.clone()), ParamExpr::Literal(v));
    }

    /// Generates an 8-node DAG where an edge can only run from a
    /// lower-numbered node to a higher-numbered one, so the result is
    /// always acyclic by construction.
    fn arb_dag() -> impl Strategy<Value = DAGPlan> {
        const N: usize = 8;
        proptest::collection::vec(any::<bool>(), N * (N - 1) / 2).prop_map(|edges| {
            let mut deps: Vec<HashSet<String>> = vec![HashSet::new(); N];
            let mut idx = 0;
            for i in 0..N {
                for j in (i + 1)..N {
                    if edges[idx] {
                        deps[j].insert(format!("n{i}"));
                    }
                    idx += 1;
                }
            }
            let mut plan = DAGPlan::new("p", "p", "p");
            for (i, dep_set) in deps.into_iter().enumerate() {
                let mut node = DAGNode::new(format!("n{i}"), format!("N{i}"), "t");
                node.dependencies = dep_set;
                plan = plan.with_node(node);
            }
            plan
        })
    }

    proptest! {
        #[test]
        fn topological_sort_respects_dependency_order(plan in arb_dag()) {
            let sorted = plan.topological_sort().unwrap();
            let position: HashMap<&str, usize> = sorted.iter().enumerate().map(|(i, n)| (n.id.as_str(), i)).collect();
            for node in &plan.nodes {
                for dep in &node.dependencies {
                    prop_assert!(position[dep.as_str()] < position[node.id.as_str()]);
                }
            }
        }

        #[test]
        fn levels_place_every_node_after_its_dependencies(plan in arb_dag()) {
            let levels = plan.levels().unwrap();
            let mut level_of: HashMap<&str, usize> = HashMap::new();
            for (lvl, ids) in levels.iter().enumerate() {
                for id in ids {
                    level_of.insert(id.as_str(), lvl);
                }
            }
            for node in &plan.nodes {
                for dep in &node.dependencies {
                    prop_assert!(level_of[dep.as_str()] < level_of[node.id.as_str()]);
                }
            }
        }
    }
}
