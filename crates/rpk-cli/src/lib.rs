//! Scrambled flash commands
//!
//! Each command loads a file into a fresh in-memory tree and drives the
//! scrambled flash components through a [`Pipeline`].

#![warn(missing_docs)]

use anyhow::{ensure, Context, Result};
use rpk_codec::{AlgorithmRegistry, ScrambleConfig};
use rpk_component::scrambled_flash::{
    register_attributes, register_components, ScrambledFlashAttributes, SCRAMBLED_FLASH,
    SCRAMBLED_FLASH_LOGICAL_DATA,
};
use rpk_component::{
    ComponentRegistry, InMemoryStore, PassReport, Pipeline, PipelineConfig, ResourceStore,
};
use rpk_resource::{
    AttributeRegistry, AttributeValue, Change, ChangeSet, ChildSpec, DataDigest, ResourceId,
    TagSet,
};
use std::path::Path;
use std::sync::Arc;

/// Load the scramble config and, if given, a pipeline config
///
/// # Errors
/// Unreadable or malformed config files.
pub fn load_configs(
    scramble: &Path,
    pipeline: Option<&Path>,
) -> Result<(ScrambleConfig, PipelineConfig)> {
    let scramble_config = ScrambleConfig::load(scramble)
        .with_context(|| format!("loading scramble config {}", scramble.display()))?;
    let pipeline_config = match pipeline {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading pipeline config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    Ok((scramble_config, pipeline_config))
}

/// Outcome of `roundtrip`
#[derive(Debug, Clone)]
pub struct RoundTrip {
    /// Repacked bytes
    pub output: Vec<u8>,
    /// Digest of the input
    pub before: DataDigest,
    /// Digest of the repacked bytes
    pub after: DataDigest,
}

impl RoundTrip {
    /// Check if repacking reproduced the input exactly
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.before == self.after
    }
}

/// One tree plus the pipeline that works on it
pub struct Session {
    store: Arc<InMemoryStore>,
    pipeline: Pipeline,
    attributes: ScrambledFlashAttributes,
}

impl Session {
    /// Create a session with the default algorithms
    ///
    /// # Errors
    /// Unknown algorithms or malformed keys in `scramble`.
    pub fn new(scramble: &ScrambleConfig, config: PipelineConfig) -> Result<Self> {
        let attributes =
            ScrambledFlashAttributes::from_config(scramble, &AlgorithmRegistry::with_defaults())?;

        let mut kinds = AttributeRegistry::new();
        register_attributes(&mut kinds)?;
        let store = Arc::new(InMemoryStore::with_registry(Arc::new(kinds)));

        let mut components = ComponentRegistry::new();
        register_components(&mut components);
        let pipeline = Pipeline::new(store.clone(), Arc::new(components)).with_config(config);

        Ok(Self {
            store,
            pipeline,
            attributes,
        })
    }

    /// Decode a scrambled dump into its logical data
    ///
    /// # Errors
    /// Component failures, or no logical data produced.
    pub async fn descramble(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let root = self.flash_root(data).await?;
        let report = self.pipeline.unpack(root).await?;
        check_report(&report)?;

        let logical = self.logical_child(root).await?;
        Ok(self.store.get_data(logical).await?)
    }

    /// Encode logical data into a scrambled dump
    ///
    /// # Errors
    /// Component failures.
    pub async fn scramble(&self, logical: Vec<u8>) -> Result<Vec<u8>> {
        let root = self.flash_root(vec![0; logical.len()]).await?;

        let mut changes = ChangeSet::new([SCRAMBLED_FLASH_LOGICAL_DATA]);
        self.store
            .stage(
                &mut changes,
                Change::Child {
                    parent: root,
                    spec: ChildSpec::owned([SCRAMBLED_FLASH_LOGICAL_DATA], logical)
                        .with_attributes(AttributeValue::new(self.attributes.clone())),
                },
            )
            .await?;
        self.store.commit(changes).await?;

        let report = self.pipeline.pack_recursively(root).await?;
        check_report(&report)?;
        Ok(self.store.get_data(root).await?)
    }

    /// Unpack and repack a scrambled dump without modification
    ///
    /// # Errors
    /// Component failures during either pass.
    pub async fn roundtrip(&self, data: Vec<u8>) -> Result<RoundTrip> {
        let root = self.flash_root(data).await?;
        let before = self.store.digest(root).await?;

        check_report(&self.pipeline.unpack_recursively(root).await?)?;
        check_report(&self.pipeline.pack_recursively(root).await?)?;

        Ok(RoundTrip {
            output: self.store.get_data(root).await?,
            before,
            after: self.store.digest(root).await?,
        })
    }

    async fn flash_root(&self, data: Vec<u8>) -> Result<ResourceId> {
        Ok(self
            .store
            .instantiate_root(
                TagSet::from([SCRAMBLED_FLASH]),
                data,
                vec![AttributeValue::new(self.attributes.clone())],
            )
            .await?)
    }

    async fn logical_child(&self, root: ResourceId) -> Result<ResourceId> {
        self.store
            .children_with_tag(root, SCRAMBLED_FLASH_LOGICAL_DATA)
            .await?
            .last()
            .copied()
            .with_context(|| format!("no logical data was unpacked from {root}"))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pipeline", &self.pipeline)
            .field("pattern_steps", &self.attributes.pattern.len())
            .finish_non_exhaustive()
    }
}

fn check_report(report: &PassReport) -> Result<()> {
    for failure in &report.failures {
        tracing::warn!("{}: {}", failure.resource, failure.message);
    }
    ensure!(
        report.is_clean(),
        "{} component run(s) failed",
        report.failures.len()
    );
    Ok(())
}

/// Read a whole input file
///
/// # Errors
/// The file cannot be read.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

/// Write an output file, replacing any existing one
///
/// # Errors
/// The file cannot be written.
pub fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rpk_codec::scramble;
    use rpk_test_utils::sample_pattern;

    fn session() -> Session {
        let config = ScrambleConfig::from_patterns(&sample_pattern());
        Session::new(&config, PipelineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn session_descramble() {
        let logical = b"partition table and kernel".to_vec();
        let scrambled = scramble(&logical, &sample_pattern()).unwrap();

        let out = session().descramble(scrambled).await.unwrap();
        assert_eq!(out, logical);
    }

    #[tokio::test]
    async fn session_scramble() {
        let logical = b"partition table and kernel".to_vec();
        let out = session().scramble(logical.clone()).await.unwrap();
        assert_eq!(out, scramble(&logical, &sample_pattern()).unwrap());
    }

    #[tokio::test]
    async fn session_roundtrip_identical() {
        let scrambled = scramble(b"0123456789abcdef", &sample_pattern()).unwrap();
        let trip = session().roundtrip(scrambled.clone()).await.unwrap();
        assert!(trip.is_identical());
        assert_eq!(trip.output, scrambled);
    }

    #[test]
    fn session_rejects_unknown_algorithm() {
        let config = ScrambleConfig::from_toml_str(
            r#"
            [[patterns]]
            algorithm = "rot13"
            length = 4
            "#,
        )
        .unwrap();
        assert!(Session::new(&config, PipelineConfig::default()).is_err());
    }

    #[tokio::test]
    async fn files_and_configs() {
        let dir = tempfile::tempdir().unwrap();
        let scramble_path = dir.path().join("scramble.toml");
        let pipeline_path = dir.path().join("pipeline.toml");
        let input = dir.path().join("flash.bin");
        let output = dir.path().join("logical.bin");

        let config = ScrambleConfig::from_patterns(&sample_pattern());
        write_output(&scramble_path, config.to_toml_string().unwrap().as_bytes()).unwrap();
        write_output(&pipeline_path, b"max_depth = 4\nfail_fast = false\n").unwrap();
        write_output(&input, &scramble(b"bootrom", &sample_pattern()).unwrap()).unwrap();

        let (scramble_config, pipeline_config) =
            load_configs(&scramble_path, Some(&pipeline_path)).unwrap();
        assert_eq!(pipeline_config.max_depth, 4);
        assert!(!pipeline_config.fail_fast);

        let session = Session::new(&scramble_config, pipeline_config).unwrap();
        let logical = session.descramble(read_input(&input).unwrap()).await.unwrap();
        write_output(&output, &logical).unwrap();
        assert_eq!(read_input(&output).unwrap(), b"bootrom");
    }

    #[test]
    fn missing_input_names_path() {
        let err = read_input(Path::new("/nonexistent/flash.bin")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/flash.bin"));
    }
}
