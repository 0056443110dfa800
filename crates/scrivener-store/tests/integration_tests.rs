//! Integration tests for scrivener-store
//!
//! These tests cover the load → build → persist → load cycle end to end.

use scrivener_domain::traits::EmbeddingModel;
use scrivener_domain::{DocumentRecord, FragmentId};
use scrivener_store::embedding::cosine_similarity;
use scrivener_store::{
    ChunkStrategy, DocumentIndex, DocumentLoader, HashingEmbeddingModel, IndexConfig, StoreError,
};
use std::fs;
use tempfile::TempDir;

fn write_corpus(dir: &std::path::Path) {
    fs::write(
        dir.join("01-will.txt"),
        "LAST WILL AND TESTAMENT\n\n\
         I, John Doe, age 54, residing at 12 Elm Street, being of sound mind.\n\n\
         I appoint my brother Richard Doe as executor of this will.",
    )
    .unwrap();
    fs::write(
        dir.join("02-statement.txt"),
        "Bank statement for account 0042.\n\nClosing balance 1,200.00.",
    )
    .unwrap();
    fs::write(dir.join("03-notes.txt"), "Date of death: 3 March 2021.").unwrap();
}

fn small_chunks() -> IndexConfig {
    IndexConfig {
        chunk_strategy: ChunkStrategy::ByParagraph,
        max_chunk_size: 80,
        ..IndexConfig::default()
    }
}

#[test]
fn test_load_counts_every_readable_file() {
    let docs_dir = TempDir::new().unwrap();
    write_corpus(docs_dir.path());

    let documents = DocumentLoader::default().load(docs_dir.path()).unwrap();
    assert_eq!(documents.len(), 3);
    assert!(documents[0].source_path.ends_with("01-will.txt"));
}

#[test]
fn test_persist_load_round_trip_preserves_ranking() {
    let docs_dir = TempDir::new().unwrap();
    let storage_dir = TempDir::new().unwrap();
    write_corpus(docs_dir.path());

    let documents = DocumentLoader::default().load(docs_dir.path()).unwrap();
    let embedder = HashingEmbeddingModel::new(256);
    let config = small_chunks();

    let built = DocumentIndex::build(&documents, &embedder, &config).unwrap();
    assert!(built.len() > documents.len(), "paragraph chunking should split the will");
    built.persist(storage_dir.path()).unwrap();

    let loaded = DocumentIndex::load(storage_dir.path(), &embedder, &config).unwrap();
    assert_eq!(loaded.len(), built.len());
    assert_eq!(loaded.fragments(), built.fragments());

    let query = embedder.embed("name age address of the deceased").unwrap();
    let before: Vec<_> = built.retrieve(&query, 3).unwrap().into_iter().map(|s| s.fragment.id).collect();
    let after: Vec<_> = loaded.retrieve(&query, 3).unwrap().into_iter().map(|s| s.fragment.id).collect();
    assert_eq!(before, after);
}

#[test]
fn test_load_with_different_embedder_is_rejected() {
    let docs_dir = TempDir::new().unwrap();
    let storage_dir = TempDir::new().unwrap();
    write_corpus(docs_dir.path());

    let documents = DocumentLoader::default().load(docs_dir.path()).unwrap();
    let index = DocumentIndex::build(&documents, &HashingEmbeddingModel::new(256), &small_chunks()).unwrap();
    index.persist(storage_dir.path()).unwrap();

    let result = DocumentIndex::load(storage_dir.path(), &HashingEmbeddingModel::new(128), &small_chunks());
    assert!(matches!(result, Err(StoreError::CorruptIndex(_))));
}

#[test]
fn test_load_without_snapshot_is_rejected() {
    let storage_dir = TempDir::new().unwrap();
    let result = DocumentIndex::load(storage_dir.path(), &HashingEmbeddingModel::new(64), &IndexConfig::default());
    assert!(matches!(result, Err(StoreError::CorruptIndex(_))));
}

/// Documents over a sliding window of words, so neighbours in the sequence
/// share all but one word and similarity falls off with distance.
fn sliding_corpus(count: usize, window: usize) -> Vec<DocumentRecord> {
    (0..count)
        .map(|i| {
            let words: Vec<String> = (i..i + window).map(|w| format!("w{}", w)).collect();
            DocumentRecord::new(words.join(" "), format!("doc-{:05}.txt", i))
        })
        .collect()
}

fn exact_top_k(index: &DocumentIndex, embedder: &HashingEmbeddingModel, query: &[f32], k: usize) -> Vec<FragmentId> {
    let mut scored: Vec<(usize, f32)> = index
        .fragments()
        .iter()
        .enumerate()
        .map(|(pos, fragment)| (pos, cosine_similarity(query, &embedder.embed(&fragment.text).unwrap())))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.into_iter().take(k).map(|(pos, _)| index.fragments()[pos].id).collect()
}

fn top_k_ids(index: &DocumentIndex, query: &[f32], k: usize) -> Vec<FragmentId> {
    index.retrieve(query, k).unwrap().into_iter().map(|s| s.fragment.id).collect()
}

#[test]
fn test_large_index_matches_exact_scan_across_restart() {
    let storage_dir = TempDir::new().unwrap();
    let embedder = HashingEmbeddingModel::new(256);
    let config = IndexConfig::default();
    let documents = sliding_corpus(2_300, 6);

    let built = DocumentIndex::build(&documents, &embedder, &config).unwrap();
    assert_eq!(built.len(), documents.len());
    assert!(built.len() > 2_048, "index must be large enough to use the graph search");

    let queries: Vec<(usize, Vec<f32>)> = (0..documents.len())
        .step_by(115)
        .map(|i| (i, embedder.embed(&documents[i].raw_text).unwrap()))
        .collect();

    for (i, query) in &queries {
        let approximate = top_k_ids(&built, query, 3);
        assert_eq!(approximate[0], built.fragments()[*i].id, "query {} should find its own document", i);
        assert_eq!(approximate, exact_top_k(&built, &embedder, query, 3), "query {}", i);
    }

    built.persist(storage_dir.path()).unwrap();
    let loaded = DocumentIndex::load(storage_dir.path(), &embedder, &config).unwrap();
    assert_eq!(loaded.len(), built.len());

    for (i, query) in &queries {
        assert_eq!(top_k_ids(&loaded, query, 3), top_k_ids(&built, query, 3), "query {}", i);
    }
}
