//! Error types for the scene exporter.

use thiserror::Error;

/// Result type alias using ExportError.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for scene export operations.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error while opening, writing or flushing an artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a JSON scene description.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A node referenced by name does not exist in the scene.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A scene description references an index that is out of range.
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// A text artifact could not be read back.
    #[error("Malformed {artifact} artifact at line {line}: {message}")]
    Parse {
        artifact: &'static str,
        line: usize,
        message: String,
    },

    /// Failed to export an artifact.
    #[error("Export error: {0}")]
    Export(String),
}

/// Non-fatal inconsistencies found while exporting.
///
/// Export continues after any of these; the output may not be structurally
/// consistent, so they are logged and returned to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityWarning {
    /// A skinned mesh has a different number of bone weights than vertices.
    #[error("Mesh '{mesh}' has {vertices} vertices but {weights} bone weights")]
    WeightCountMismatch {
        mesh: String,
        vertices: usize,
        weights: usize,
    },

    /// A per-vertex attribute array does not match the vertex count.
    #[error("Mesh '{mesh}' has {found} {attribute} for {expected} vertices")]
    AttributeCountMismatch {
        mesh: String,
        attribute: &'static str,
        expected: usize,
        found: usize,
    },

    /// A bone could not be found in the merged skeleton and was bound to bone 0.
    #[error("Mesh '{mesh}' references bone '{bone}' which is not in the merged skeleton")]
    UnresolvedBone { mesh: String, bone: String },

    /// Weights referenced local bone indices past the end of the mesh's bone list.
    #[error("Mesh '{mesh}' has {count} bone weight indices outside its {bones} bones")]
    BoneIndexOutOfRange {
        mesh: String,
        count: usize,
        bones: usize,
    },

    /// A submesh index count is not a multiple of three; the tail was dropped.
    #[error("Submesh '{submesh}' has {count} indices, not a whole number of triangles")]
    IncompleteTriangle { submesh: String, count: usize },

    /// The geometry writer emitted a different number of chunks than declared.
    #[error("Geometry declared {expected} chunks but wrote {written}")]
    ChunkCountMismatch { expected: usize, written: usize },
}
