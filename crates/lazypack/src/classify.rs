//! Artifact classification

use crate::types::{ArtifactKind, BuildArtifact};

/// Build outputs split into the three artifact classes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedArtifacts {
    pub entries: Vec<BuildArtifact>,
    pub chunks: Vec<BuildArtifact>,
    pub cores: Vec<BuildArtifact>,
}

/// Partition artifacts by kind, keeping input order within each class
pub fn classify_artifacts(
    artifacts: impl IntoIterator<Item = BuildArtifact>,
) -> ClassifiedArtifacts {
    let mut classified = ClassifiedArtifacts::default();
    for artifact in artifacts {
        match artifact.kind {
            ArtifactKind::ComponentEntry => classified.entries.push(artifact),
            ArtifactKind::Chunk => classified.chunks.push(artifact),
            ArtifactKind::CoreBundle => classified.cores.push(artifact),
        }
    }
    classified
}
