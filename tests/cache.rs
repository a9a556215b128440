use std::sync::Mutex;

use camino::Utf8PathBuf;

use dge_scope::cache::StudyCache;
use dge_scope::dataset::StudyFile;
use dge_scope::domain::{StudyKind, StudyName};
use dge_scope::error::ScopeError;
use dge_scope::studies::{FileStudyClient, StudyClient};

struct CountingClient {
    calls: Mutex<usize>,
}

impl CountingClient {
    fn new() -> Self {
        Self {
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl StudyClient for CountingClient {
    fn fetch_study(&self, _name: &StudyName, _kind: StudyKind) -> Result<StudyFile, ScopeError> {
        *self.calls.lock().unwrap() += 1;
        Ok(StudyFile {
            gene: vec!["TP53".to_string()],
            pvalue: vec![0.001],
            log2_fold_change: vec![2.5],
            padj: vec![0.01],
            base_mean: vec![500.0],
        })
    }
}

#[test]
fn second_load_is_a_hit() {
    let client = CountingClient::new();
    let mut cache = StudyCache::new();
    let name: StudyName = "liver".parse().unwrap();

    cache.get_or_fetch(&client, &name, StudyKind::Study).unwrap();
    cache.get_or_fetch(&client, &name, StudyKind::Study).unwrap();

    assert_eq!(client.calls(), 1);
    let stats = cache.stats();
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn kinds_are_cached_separately() {
    let client = CountingClient::new();
    let mut cache = StudyCache::new();
    let name: StudyName = "liver".parse().unwrap();

    cache.get_or_fetch(&client, &name, StudyKind::Study).unwrap();
    cache
        .get_or_fetch(&client, &name, StudyKind::Processed)
        .unwrap();

    assert_eq!(client.calls(), 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn invalidation_forces_a_refetch() {
    let client = CountingClient::new();
    let mut cache = StudyCache::new();
    let name: StudyName = "liver".parse().unwrap();

    cache.get_or_fetch(&client, &name, StudyKind::Study).unwrap();
    cache.invalidate(&name, StudyKind::Study);
    cache.get_or_fetch(&client, &name, StudyKind::Study).unwrap();

    assert_eq!(client.calls(), 2);
}

#[test]
fn clear_empties_the_cache() {
    let client = CountingClient::new();
    let mut cache = StudyCache::new();
    let name: StudyName = "liver".parse().unwrap();

    cache.get_or_fetch(&client, &name, StudyKind::Study).unwrap();
    assert!(!cache.is_empty());
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn file_client_reads_the_static_layout() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    std::fs::create_dir_all(root.join("studies").as_std_path()).unwrap();
    std::fs::write(
        root.join("studies").join("liver.json").as_std_path(),
        r#"{
            "gene": ["TP53"],
            "pvalue": [0.001],
            "log2FoldChange": [2.5],
            "padj": [0.01],
            "baseMean": [500.0]
        }"#,
    )
    .unwrap();

    let client = FileStudyClient::new(root);
    let name: StudyName = "liver".parse().unwrap();
    let file = client.fetch_study(&name, StudyKind::Study).unwrap();
    assert_eq!(file.gene, vec!["TP53"]);
    assert_eq!(file.log2_fold_change, vec![2.5]);

    let missing: StudyName = "kidney".parse().unwrap();
    let err = client.fetch_study(&missing, StudyKind::Study).unwrap_err();
    assert!(matches!(err, ScopeError::StudyNotFound(_)));
}
