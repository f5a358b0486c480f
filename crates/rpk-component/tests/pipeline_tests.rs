//! End-to-end pipeline passes over in-memory trees

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rpk_codec::scramble;
use rpk_component::scrambled_flash::{
    SCRAMBLED_FLASH_LOGICAL_DATA, SCRAMBLED_FLASH_PACKED_DATA,
};
use rpk_component::{
    ComponentContext, ComponentError, ComponentRegistry, InMemoryStore, Pipeline, PipelineConfig,
    ResourceStore, Unpacker,
};
use rpk_patch::{ByteRange, Patch};
use rpk_resource::{
    AttributeValue, Change, ChangeSet, ChildSpec, ResourceId, ResourceTag, TagSet, GENERIC_BINARY,
};
use rpk_test_utils::{
    instantiate_flash, sample_pattern, scrambled_flash_pipeline, EventLog, SpliceBackPacker,
    Placement, ViewUnpacker,
};
use std::sync::Arc;

const CONTAINER: ResourceTag = ResourceTag::new("Container", &[GENERIC_BINARY]);
const SECTION: ResourceTag = ResourceTag::new("Section", &[GENERIC_BINARY]);
const ENTRY: ResourceTag = ResourceTag::new("Entry", &[GENERIC_BINARY]);

/// Container -> section -> entry, each a view trimmed from its parent
fn layered(log: &EventLog) -> ComponentRegistry {
    ComponentRegistry::new()
        .with_unpacker(Arc::new(ViewUnpacker {
            id: "ContainerUnpacker",
            target: CONTAINER,
            child: SECTION,
            trim: 2,
            log: log.clone(),
        }))
        .with_unpacker(Arc::new(ViewUnpacker {
            id: "SectionUnpacker",
            target: SECTION,
            child: ENTRY,
            trim: 1,
            log: log.clone(),
        }))
        .with_packer(Arc::new(SpliceBackPacker {
            id: "EntryPacker",
            target: ENTRY,
            uppercase: true,
            log: log.clone(),
        }))
        .with_packer(Arc::new(SpliceBackPacker {
            id: "SectionPacker",
            target: SECTION,
            uppercase: false,
            log: log.clone(),
        }))
        .with_packer(Arc::new(SpliceBackPacker {
            id: "ContainerPacker",
            target: CONTAINER,
            uppercase: false,
            log: log.clone(),
        }))
}

async fn layered_scenario(config: PipelineConfig) {
    let log = EventLog::new();
    let store = Arc::new(InMemoryStore::new());
    let pipeline = Pipeline::new(store.clone(), Arc::new(layered(&log))).with_config(config);
    let root = store
        .instantiate_root(TagSet::from([CONTAINER]), b"<<abcdef>>".to_vec(), Vec::new())
        .await
        .unwrap();

    let unpacked = pipeline.unpack_recursively(root).await.unwrap();
    assert_eq!(unpacked.nodes_visited, 3);
    assert_eq!(unpacked.components_run, 2);
    assert_eq!(unpacked.children_created, 2);

    let packed = pipeline.pack_recursively(root).await.unwrap();
    assert!(packed.is_clean());
    assert_eq!(packed.components_run, 3);
    assert_eq!(packed.patches_resolved, 2);

    assert_eq!(
        log.components(),
        vec![
            "ContainerUnpacker",
            "SectionUnpacker",
            "EntryPacker",
            "SectionPacker",
            "ContainerPacker"
        ]
    );
    let observed: Vec<Vec<u8>> = log.events()[2..].iter().map(|e| e.observed.clone()).collect();
    assert_eq!(
        observed,
        vec![b"bcde".to_vec(), b"aBCDEf".to_vec(), b"<<aBCDEf>>".to_vec()]
    );
    assert_eq!(store.get_data(root).await.unwrap(), b"<<aBCDEf>>");
}

#[tokio::test]
async fn packers_see_children_resolved_sequential() {
    layered_scenario(PipelineConfig::new().with_concurrent_siblings(false)).await;
}

#[tokio::test]
async fn packers_see_children_resolved_concurrent() {
    layered_scenario(PipelineConfig::new().with_concurrent_siblings(true)).await;
}

#[tokio::test]
async fn depth_limit_aborts_even_without_fail_fast() {
    let log = EventLog::new();
    let store = Arc::new(InMemoryStore::new());
    let pipeline = Pipeline::new(store.clone(), Arc::new(layered(&log)))
        .with_config(PipelineConfig::new().with_max_depth(1).with_fail_fast(false));
    let root = store
        .instantiate_root(TagSet::from([CONTAINER]), b"<<abcdef>>".to_vec(), Vec::new())
        .await
        .unwrap();

    let err = pipeline.unpack_recursively(root).await.unwrap_err();
    assert!(matches!(err, ComponentError::DepthExceeded { max_depth: 1, .. }));
}

#[tokio::test]
async fn scrambled_flash_round_trip() {
    let (store, pipeline) = scrambled_flash_pipeline(PipelineConfig::default());
    let original = b"firmware v1.0 build 0042, checksum pending";
    let root = instantiate_flash(&store, original).await;

    let report = pipeline.unpack_recursively(root).await.unwrap();
    assert_eq!(report.components_run, 1);

    let logical = store
        .children_with_tag(root, SCRAMBLED_FLASH_LOGICAL_DATA)
        .await
        .unwrap();
    assert_eq!(logical.len(), 1);
    assert_eq!(store.get_data(logical[0]).await.unwrap(), original);

    let mut changes = ChangeSet::default();
    store
        .stage(
            &mut changes,
            Change::Patch {
                resource: logical[0],
                patch: Patch::new(ByteRange::new(9, 13).unwrap(), b"v2.1".to_vec()),
            },
        )
        .await
        .unwrap();
    store.commit(changes).await.unwrap();

    let report = pipeline.pack_recursively(root).await.unwrap();
    assert_eq!(report.components_run, 2);

    let mut modified = original.to_vec();
    modified[9..13].copy_from_slice(b"v2.1");
    assert_eq!(
        store.get_data(root).await.unwrap(),
        scramble(&modified, &sample_pattern()).unwrap()
    );
    assert_eq!(
        store
            .children_with_tag(root, SCRAMBLED_FLASH_PACKED_DATA)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn scrambled_flash_unmodified_round_trip_is_identity() {
    let (store, pipeline) = scrambled_flash_pipeline(PipelineConfig::default());
    let root = instantiate_flash(&store, b"bootloader stage two").await;
    let before = store.digest(root).await.unwrap();

    pipeline.unpack_recursively(root).await.unwrap();
    pipeline.pack_recursively(root).await.unwrap();

    assert_eq!(store.digest(root).await.unwrap(), before);
}

/// Stages a child, then fails
struct Flaky;

#[async_trait]
impl Unpacker for Flaky {
    fn id(&self) -> &'static str {
        "Flaky"
    }

    fn targets(&self) -> &[ResourceTag] {
        &[CONTAINER]
    }

    fn children(&self) -> &[ResourceTag] {
        &[SECTION]
    }

    async fn unpack(&self, ctx: &mut ComponentContext) -> Result<(), ComponentError> {
        ctx.create_child(ChildSpec::owned([SECTION], b"staged".to_vec()))
            .await?;
        Err(ComponentError::InvalidData {
            resource: ctx.resource_id(),
            reason: "bad magic".into(),
        })
    }
}

async fn flaky_setup(fail_fast: bool) -> (Arc<InMemoryStore>, Pipeline, ResourceId) {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(ComponentRegistry::new().with_unpacker(Arc::new(Flaky))),
    )
    .with_config(PipelineConfig::new().with_fail_fast(fail_fast));
    let root = store
        .instantiate_root(TagSet::from([CONTAINER]), b"payload".to_vec(), Vec::new())
        .await
        .unwrap();
    (store, pipeline, root)
}

#[tokio::test]
async fn failed_run_commits_nothing() {
    let (store, pipeline, root) = flaky_setup(true).await;

    let err = pipeline.unpack_recursively(root).await.unwrap_err();
    assert_eq!(err.component(), Some("Flaky"));
    assert_eq!(err.resource(), Some(root));
    assert!(matches!(err.root_cause(), ComponentError::InvalidData { .. }));

    assert_eq!(store.len(), 1);
    assert!(store.get_node(root).await.unwrap().children().is_empty());
}

#[tokio::test]
async fn failure_recorded_without_fail_fast() {
    let (store, pipeline, root) = flaky_setup(false).await;

    let report = pipeline.unpack_recursively(root).await.unwrap();
    assert!(!report.is_clean());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].component, Some("Flaky"));
    assert_eq!(report.failures[0].resource, root);
    assert_eq!(store.len(), 1);
}

/// Creates two entries over overlapping ranges of the node
struct OverlappingEntries;

#[async_trait]
impl Unpacker for OverlappingEntries {
    fn id(&self) -> &'static str {
        "OverlappingEntries"
    }

    fn targets(&self) -> &[ResourceTag] {
        &[CONTAINER]
    }

    fn children(&self) -> &[ResourceTag] {
        &[ENTRY]
    }

    async fn unpack(&self, ctx: &mut ComponentContext) -> Result<(), ComponentError> {
        for (start, end) in [(0, 4), (2, 6)] {
            let range = ByteRange::new(start, end).map_err(rpk_resource::ResourceError::from)?;
            ctx.create_child(
                ChildSpec::view([ENTRY], range)
                    .with_attributes(AttributeValue::new(Placement { range })),
            )
            .await?;
        }
        Ok(())
    }
}

async fn overlapping_splice(concurrent: bool) {
    let log = EventLog::new();
    let store = Arc::new(InMemoryStore::new());
    let registry = ComponentRegistry::new()
        .with_unpacker(Arc::new(OverlappingEntries))
        .with_packer(Arc::new(SpliceBackPacker {
            id: "EntryPacker",
            target: ENTRY,
            uppercase: true,
            log: log.clone(),
        }));
    let pipeline = Pipeline::new(store.clone(), Arc::new(registry)).with_config(
        PipelineConfig::new()
            .with_fail_fast(false)
            .with_concurrent_siblings(concurrent),
    );
    let root = store
        .instantiate_root(TagSet::from([CONTAINER]), b"abcdef".to_vec(), Vec::new())
        .await
        .unwrap();
    pipeline.unpack_recursively(root).await.unwrap();

    let err = pipeline.pack_recursively(root).await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.component(), Some("EntryPacker"));
    assert!(matches!(
        err.root_cause(),
        ComponentError::Resource(rpk_resource::ResourceError::Patch { resource, .. })
            if *resource == root
    ));
    assert_eq!(store.get_data(root).await.unwrap(), b"abcdef");
}

#[tokio::test]
async fn overlapping_sibling_patches_abort_without_fail_fast() {
    overlapping_splice(false).await;
}

#[tokio::test]
async fn overlapping_sibling_patches_abort_concurrent() {
    overlapping_splice(true).await;
}

proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

    #[test]
    fn prop_flash_patch_survives_repack(
        original in proptest::collection::vec(proptest::prelude::any::<u8>(), 1..256),
        offset in 0usize..256,
        replacement in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..16),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let (store, pipeline) = scrambled_flash_pipeline(PipelineConfig::default());
            let root = instantiate_flash(&store, &original).await;
            pipeline.unpack_recursively(root).await.unwrap();
            let logical = store
                .children_with_tag(root, SCRAMBLED_FLASH_LOGICAL_DATA)
                .await
                .unwrap()[0];

            let start = offset % original.len();
            let end = (start + replacement.len()).min(original.len());
            let mut changes = ChangeSet::default();
            store
                .stage(
                    &mut changes,
                    Change::Patch {
                        resource: logical,
                        patch: Patch::new(ByteRange::new(start, end).unwrap(), replacement.clone()),
                    },
                )
                .await
                .unwrap();
            store.commit(changes).await.unwrap();
            pipeline.pack_recursively(root).await.unwrap();

            let mut expected = original.clone();
            expected.splice(start..end, replacement.iter().copied());
            let repacked = store.get_data(root).await.unwrap();
            assert_eq!(
                rpk_codec::descramble(&repacked, &sample_pattern()).unwrap(),
                expected
            );
        });
    }
}
