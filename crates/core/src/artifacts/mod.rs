//! Retrieval of converted documents.

mod gateway;

pub use gateway::{Artifact, ArtifactError, ArtifactGateway};
