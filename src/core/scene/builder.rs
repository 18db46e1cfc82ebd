//! Builds owned scene trees from parsed containers and BVH documents.

use gltf::json;
use tracing::debug;

use super::{Matrix4d, MeshRef, Quaterniond, SceneNode, TrsMatrix, Vector3d};
use crate::core::cancel::CancelToken;
use crate::io::bvh::{BvhDocument, BvhJoint};
use crate::io::glb::Container;

/// Deepest node hierarchy accepted from a container or a BVH skeleton.
pub const MAX_NODE_DEPTH: usize = 256;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Err {
    #[error("Node index out of range: the index {0} is greater than the number of nodes {1}")]
    NodeIndexOutOfRange(usize, usize),
    #[error("Scene index out of range: the index {0} is greater than the number of scenes {1}")]
    SceneIndexOutOfRange(usize, usize),
    #[error("Node hierarchy contains a cycle at node {0}")]
    Cycle(usize),
    #[error("Node {0} is reachable through more than one parent")]
    SharedNode(usize),
    #[error("Node hierarchy is deeper than {0} levels")]
    TooDeep(usize),
    #[error("Scene build canceled")]
    Canceled,
}

/// Builds the scene tree of `container`'s default scene.
///
/// The returned root is a synthetic node named `name` whose children are the
/// scene's root nodes. Every node is instantiated at most once: a node
/// reached through a second parent, or listed twice as a root, is rejected.
pub fn build_from_container(container: &Container, name: &str, cancel: &CancelToken) -> Result<SceneNode, Err> {
    if cancel.is_canceled() {
        return Err(Err::Canceled);
    }
    let document = container.document();

    let builder = TreeBuilder { document, cancel };
    let mut root = SceneNode::new(name);
    let mut marks = NodeMarks {
        on_path: vec![false; document.nodes.len()],
        visited: vec![false; document.nodes.len()],
    };
    for index in builder.root_indices()? {
        root.add_child(builder.build_node(index, 1, &mut marks)?);
    }

    debug!(
        nodes = root.num_nodes() - 1,
        roots = root.num_children(),
        "built scene graph from container"
    );
    Ok(root)
}

struct NodeMarks {
    on_path: Vec<bool>,
    visited: Vec<bool>,
}

struct TreeBuilder<'a> {
    document: &'a json::Root,
    cancel: &'a CancelToken,
}

impl TreeBuilder<'_> {
    /// Root nodes of `scene`, else of scene 0, else every parentless node.
    fn root_indices(&self) -> Result<Vec<usize>, Err> {
        let doc = self.document;
        let scene = match doc.scene {
            Some(index) => Some(index.value()),
            None if !doc.scenes.is_empty() => Some(0),
            None => None,
        };

        if let Some(index) = scene {
            let scene = doc.scenes.get(index)
                .ok_or(Err::SceneIndexOutOfRange(index, doc.scenes.len()))?;
            return Ok(scene.nodes.iter().map(|node| node.value()).collect());
        }

        let mut is_child = vec![false; doc.nodes.len()];
        for node in &doc.nodes {
            for child in node.children.iter().flatten() {
                let child = child.value();
                if child >= is_child.len() {
                    return Err(Err::NodeIndexOutOfRange(child, doc.nodes.len()));
                }
                is_child[child] = true;
            }
        }
        Ok((0..doc.nodes.len()).filter(|&i| !is_child[i]).collect())
    }

    fn build_node(&self, index: usize, depth: usize, marks: &mut NodeMarks) -> Result<SceneNode, Err> {
        if self.cancel.is_canceled() {
            return Err(Err::Canceled);
        }
        let doc = self.document;
        let node = doc.nodes.get(index)
            .ok_or(Err::NodeIndexOutOfRange(index, doc.nodes.len()))?;
        if marks.on_path[index] {
            return Err(Err::Cycle(index));
        }
        if marks.visited[index] {
            return Err(Err::SharedNode(index));
        }
        if depth > MAX_NODE_DEPTH {
            return Err(Err::TooDeep(MAX_NODE_DEPTH));
        }
        marks.on_path[index] = true;
        marks.visited[index] = true;

        let mut scene_node = SceneNode::new(node.name.clone().unwrap_or_else(|| format!("node_{}", index)));
        scene_node.set_source_index(Some(index));
        scene_node.set_trs_matrix(node_transform(node));
        scene_node.set_skin_index(node.skin.map(|skin| skin.value()));
        scene_node.set_mesh(node.mesh.map(|mesh| {
            let mesh_index = mesh.value();
            let mesh = doc.meshes.get(mesh_index);
            MeshRef {
                index: mesh_index,
                name: mesh.and_then(|m| m.name.clone()),
                num_primitives: mesh.map_or(0, |m| m.primitives.len()),
            }
        }));

        for child in node.children.iter().flatten() {
            scene_node.add_child(self.build_node(child.value(), depth + 1, marks)?);
        }

        marks.on_path[index] = false;
        Ok(scene_node)
    }
}

fn node_transform(node: &json::Node) -> TrsMatrix {
    let mut trs = TrsMatrix::new();
    if let Some(matrix) = &node.matrix {
        trs.set_matrix(Matrix4d::from_column_major(matrix));
    }
    if let Some(translation) = node.translation {
        trs.set_translation(translation.into());
    }
    if let Some(rotation) = &node.rotation {
        trs.set_rotation(Quaterniond::from_xyzw(rotation.0));
    }
    if let Some(scale) = node.scale {
        trs.set_scale(scale.into());
    }
    trs
}

/// Builds the scene tree of a BVH skeleton. Every joint, end sites included,
/// becomes a node translated by its offset.
pub fn build_from_bvh(document: &BvhDocument, name: &str, cancel: &CancelToken) -> Result<SceneNode, Err> {
    let mut root = SceneNode::new(name);
    root.add_child(joint_node(&document.root, 1, cancel)?);
    debug!(joints = document.root.num_joints(), "built scene graph from BVH skeleton");
    Ok(root)
}

fn joint_node(joint: &BvhJoint, depth: usize, cancel: &CancelToken) -> Result<SceneNode, Err> {
    if cancel.is_canceled() {
        return Err(Err::Canceled);
    }
    if depth > MAX_NODE_DEPTH {
        return Err(Err::TooDeep(MAX_NODE_DEPTH));
    }
    let mut node = SceneNode::new(joint.name.clone());
    let mut trs = TrsMatrix::new();
    trs.set_translation(Vector3d::from(joint.offset));
    node.set_trs_matrix(trs);
    for child in &joint.children {
        node.add_child(joint_node(child, depth + 1, cancel)?);
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::bvh::{parse_bvh, tests::SIMPLE_BVH};
    use serde_json::{json, Value};

    fn container(mut value: Value) -> Container {
        value["asset"] = json!({ "version": "2.0" });
        Container::from_gltf_text(value.to_string().as_bytes(), None).unwrap()
    }

    fn build(value: Value) -> Result<SceneNode, Err> {
        build_from_container(&container(value), "model", &CancelToken::new())
    }

    #[test]
    fn builds_default_scene() {
        let root = build(json!({
            "scene": 1,
            "scenes": [{ "nodes": [2] }, { "nodes": [0] }],
            "nodes": [
                { "name": "Armature", "children": [1], "translation": [0.0, 1.0, 0.0] },
                { "name": "Body", "mesh": 0, "skin": 0 },
                { "name": "Unused" },
            ],
            "meshes": [{ "name": "BodyMesh", "primitives": [{ "attributes": {} }, { "attributes": {} }] }],
        })).unwrap();

        assert_eq!(root.get_name(), "model");
        assert_eq!(root.get_source_index(), None);
        assert_eq!(root.num_children(), 1);
        let armature = &root.children()[0];
        assert_eq!(armature.get_name(), "Armature");
        assert_eq!(armature.get_trs_matrix().translation(), Some(&Vector3d::new(0.0, 1.0, 0.0)));

        let body = root.find("Body").unwrap();
        assert_eq!(body.get_skin_index(), Some(0));
        let mesh = body.get_mesh().unwrap();
        assert_eq!(mesh.name.as_deref(), Some("BodyMesh"));
        assert_eq!(mesh.num_primitives, 2);
        assert!(root.find("Unused").is_none());
    }

    #[test]
    fn parentless_nodes_without_scenes() {
        let root = build(json!({
            "nodes": [{ "children": [2] }, { "name": "Light" }, { "name": "Leaf" }],
        })).unwrap();
        let names: Vec<_> = root.children().iter().map(|n| n.get_name().to_string()).collect();
        assert_eq!(names, ["node_0", "Light"]);
        assert_eq!(root.num_nodes(), 4);
    }

    #[test]
    fn shared_nodes_are_rejected() {
        let shared_child = build(json!({
            "scenes": [{ "nodes": [0, 1] }],
            "nodes": [{ "children": [2] }, { "children": [2] }, { "name": "Shared" }],
        }));
        assert!(matches!(shared_child, Err(Err::SharedNode(2))));

        let repeated_child = build(json!({
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "children": [1, 1] }, {}],
        }));
        assert!(matches!(repeated_child, Err(Err::SharedNode(1))));

        let repeated_root = build(json!({ "scenes": [{ "nodes": [0, 0] }], "nodes": [{}] }));
        assert!(matches!(repeated_root, Err(Err::SharedNode(0))));
    }

    #[test]
    fn diamond_chains_do_not_multiply() {
        // Each level points both children at the same next pair.
        let levels = 40;
        let mut nodes = Vec::new();
        for level in 0..levels {
            let next = if level + 1 < levels { json!([2 * level + 2, 2 * level + 3]) } else { json!([]) };
            nodes.push(json!({ "children": next }));
            nodes.push(json!({ "children": next }));
        }
        let result = build(json!({ "scenes": [{ "nodes": [0, 1] }], "nodes": nodes }));
        assert!(matches!(result, Err(Err::SharedNode(_))));
    }

    fn chain(length: usize) -> Value {
        let nodes: Vec<Value> = (0..length)
            .map(|i| if i + 1 < length { json!({ "children": [i + 1] }) } else { json!({ "name": "tip" }) })
            .collect();
        json!({ "scenes": [{ "nodes": [0] }], "nodes": nodes })
    }

    #[test]
    fn depth_is_bounded() {
        let root = build(chain(MAX_NODE_DEPTH)).unwrap();
        assert_eq!(root.num_nodes(), MAX_NODE_DEPTH + 1);
        assert!(root.find("tip").is_some());

        assert!(matches!(build(chain(MAX_NODE_DEPTH + 1)), Err(Err::TooDeep(MAX_NODE_DEPTH))));
        assert!(matches!(build(chain(200_000)), Err(Err::TooDeep(MAX_NODE_DEPTH))));
    }

    #[test]
    fn invalid_hierarchies_are_rejected() {
        let cycle = build(json!({
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "children": [1] }, { "children": [0] }],
        }));
        assert!(matches!(cycle, Err(Err::Cycle(0))));

        let dangling = build(json!({ "scenes": [{ "nodes": [5] }], "nodes": [{}] }));
        assert!(matches!(dangling, Err(Err::NodeIndexOutOfRange(5, 1))));

        let bad_scene = build(json!({ "scene": 3, "scenes": [{ "nodes": [] }] }));
        assert!(matches!(bad_scene, Err(Err::SceneIndexOutOfRange(3, 1))));
    }

    #[test]
    fn canceled_build_stops() {
        let token = CancelToken::new();
        token.cancel();
        let result = build_from_container(&container(json!({ "nodes": [{}] })), "model", &token);
        assert!(matches!(result, Err(Err::Canceled)));
    }

    #[test]
    fn builds_bvh_skeleton() {
        let document = parse_bvh(SIMPLE_BVH).unwrap();
        let root = build_from_bvh(&document, "rig", &CancelToken::new()).unwrap();
        assert_eq!(root.get_name(), "rig");
        assert_eq!(root.num_nodes(), 6);
        let leg = root.find("LeftLeg").unwrap();
        assert_eq!(leg.get_trs_matrix().translation(), Some(&Vector3d::new(0.1, -0.1, 0.0)));
        assert!(root.find("Spine_end").is_some());
    }
}
