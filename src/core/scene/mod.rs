pub mod builder;

type MeshIdx = usize;
type SkinIdx = usize;
type NodeIdx = usize;

/// Row-major 4x4 matrix; the translation lives in the last column.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix4d {
    pub data: [[f64; 4]; 4],
}

impl Matrix4d {
    /// Builds a matrix from the column-major layout used by glTF.
    pub fn from_column_major(m: &[f32; 16]) -> Self {
        let mut data = [[0.0; 4]; 4];
        for (col, chunk) in m.chunks_exact(4).enumerate() {
            for (row, value) in chunk.iter().enumerate() {
                data[row][col] = *value as f64;
            }
        }
        Self { data }
    }

    pub fn get_translation(&self) -> Vector3d {
        Vector3d::new(self.data[0][3], self.data[1][3], self.data[2][3])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3d {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 3]> for Vector3d {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0] as f64, v[1] as f64, v[2] as f64)
    }
}

impl From<[f64; 3]> for Vector3d {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaterniond {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaterniond {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// glTF stores quaternions as `[x, y, z, w]`.
    pub fn from_xyzw(q: [f32; 4]) -> Self {
        Self::new(q[3] as f64, q[0] as f64, q[1] as f64, q[2] as f64)
    }
}

// Stores one or more of a translation, rotation, scale or a full
// transformation matrix, as declared by the source node. Composing them is
// left to the renderer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrsMatrix {
    matrix: Option<Matrix4d>,
    translation: Option<Vector3d>,
    rotation: Option<Quaterniond>,
    scale: Option<Vector3d>,
}

impl TrsMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_matrix(&mut self, matrix: Matrix4d) -> &mut Self {
        self.matrix = Some(matrix);
        self
    }

    pub fn matrix(&self) -> Option<&Matrix4d> {
        self.matrix.as_ref()
    }

    pub fn set_translation(&mut self, translation: Vector3d) -> &mut Self {
        self.translation = Some(translation);
        self
    }

    pub fn translation(&self) -> Option<&Vector3d> {
        self.translation.as_ref()
    }

    pub fn set_rotation(&mut self, rotation: Quaterniond) -> &mut Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn rotation(&self) -> Option<&Quaterniond> {
        self.rotation.as_ref()
    }

    pub fn set_scale(&mut self, scale: Vector3d) -> &mut Self {
        self.scale = Some(scale);
        self
    }

    pub fn scale(&self) -> Option<&Vector3d> {
        self.scale.as_ref()
    }

    // Returns true if any of the transforms have been set.
    pub fn transform_set(&self) -> bool {
        self.matrix.is_some() || self.translation.is_some() || self.rotation.is_some() || self.scale.is_some()
    }
}

/// Mesh attached to a scene node. Geometry stays in the container; only the
/// reference is carried in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshRef {
    pub index: MeshIdx,
    pub name: Option<String>,
    pub num_primitives: usize,
}

/// A node of the owned scene tree handed to the renderer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneNode {
    name: String,
    trs_matrix: TrsMatrix,
    mesh: Option<MeshRef>,
    skin_index: Option<SkinIdx>,
    // Index of the node in the source document; `None` for synthetic nodes.
    source_index: Option<NodeIdx>,
    children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn set_trs_matrix(&mut self, trs_matrix: TrsMatrix) {
        self.trs_matrix = trs_matrix;
    }

    pub fn get_trs_matrix(&self) -> &TrsMatrix {
        &self.trs_matrix
    }

    pub fn set_mesh(&mut self, mesh: Option<MeshRef>) {
        self.mesh = mesh;
    }

    pub fn get_mesh(&self) -> Option<&MeshRef> {
        self.mesh.as_ref()
    }

    pub fn set_skin_index(&mut self, index: Option<SkinIdx>) {
        self.skin_index = index;
    }

    pub fn get_skin_index(&self) -> Option<SkinIdx> {
        self.skin_index
    }

    pub fn set_source_index(&mut self, index: Option<NodeIdx>) {
        self.source_index = index;
    }

    pub fn get_source_index(&self) -> Option<NodeIdx> {
        self.source_index
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Number of nodes in this subtree, this node included.
    pub fn num_nodes(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_, _| count += 1);
        count
    }

    /// Depth-first search by name.
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        self.find_where(|node| node.name == name)
    }

    /// Depth-first search by source node index.
    pub fn find_by_source(&self, index: NodeIdx) -> Option<&SceneNode> {
        self.find_where(|node| node.source_index == Some(index))
    }

    fn find_where<P: Fn(&SceneNode) -> bool>(&self, predicate: P) -> Option<&SceneNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if predicate(node) {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Visits every node depth-first in pre-order, passing its depth below
    /// this node.
    pub fn walk<F: FnMut(&SceneNode, usize)>(&self, f: &mut F) {
        let mut stack = vec![(self, 0)];
        while let Some((node, depth)) = stack.pop() {
            f(node, depth);
            stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
    }
}
