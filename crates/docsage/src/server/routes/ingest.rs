//! Document ingestion endpoint
//!
//! Uploads run the parse → chunk → embed → index → status-update sequence
//! per file. One bad file marks its own document `failed` and never aborts
//! the rest of the batch.

use axum::{
    extract::{Multipart, State},
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::index::PointRecord;
use crate::ingestion::{chunk_pages, parse_file};
use crate::server::state::AppState;
use crate::types::response::IngestError;
use crate::types::{Chunk, DocumentStatus, FileType, IngestResponse};

/// POST /ingest — upload and index files
pub async fn ingest(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let mut doc_ids = Vec::new();
    let mut errors = Vec::new();
    let mut chunks_indexed = 0usize;
    let mut files_processed = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(format!("failed to read multipart field: {}", e)))?
    {
        let filename = field
            .file_name()
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("upload-{}", Uuid::new_v4().simple()));

        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                errors.push(IngestError {
                    filename,
                    error: format!("failed to read file body: {}", e),
                });
                continue;
            }
        };

        files_processed += 1;
        tracing::info!("ingesting '{}' ({} bytes)", filename, data.len());

        match process_file(&state, &filename, &data).await {
            Ok(FileOutcome::Indexed { doc_id, chunks }) => {
                doc_ids.push(doc_id);
                chunks_indexed += chunks;
            }
            Ok(FileOutcome::Duplicate { doc_id }) => {
                tracing::info!("'{}' is a duplicate of an indexed document", filename);
                doc_ids.push(doc_id);
            }
            Err(e) => {
                tracing::warn!("failed to ingest '{}': {}", filename, e);
                errors.push(IngestError {
                    filename,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(Json(IngestResponse {
        doc_ids,
        chunks_indexed,
        files_processed,
        errors,
    }))
}

enum FileOutcome {
    Indexed { doc_id: Uuid, chunks: usize },
    Duplicate { doc_id: Uuid },
}

/// Run one file through the pipeline, recording its document status.
async fn process_file(state: &AppState, filename: &str, data: &[u8]) -> Result<FileOutcome> {
    let store = state.store();
    let hash = crate::ingestion::content_hash(data);

    // Byte-identical re-uploads are skipped, not double-indexed.
    if let Some(existing) = store.find_document_by_hash(&hash)? {
        return Ok(FileOutcome::Duplicate {
            doc_id: existing.id,
        });
    }

    let doc = store.create_document(
        filename,
        data.len() as u64,
        FileType::from_filename(filename),
        &hash,
    )?;

    match index_document(state, doc.id, filename, data).await {
        Ok(chunks) => {
            store.update_document_status(doc.id, DocumentStatus::Completed, Some(chunks as u32))?;
            tracing::info!("indexed '{}': {} chunks", filename, chunks);
            Ok(FileOutcome::Indexed {
                doc_id: doc.id,
                chunks,
            })
        }
        Err(e) => {
            // The failure belongs to this document alone; the batch goes on.
            if let Err(status_err) =
                store.update_document_status(doc.id, DocumentStatus::Failed, None)
            {
                tracing::error!("failed to mark document failed: {}", status_err);
            }
            Err(e)
        }
    }
}

/// Parse, chunk, embed, and upsert one document's content.
async fn index_document(
    state: &AppState,
    doc_id: Uuid,
    filename: &str,
    data: &[u8],
) -> Result<usize> {
    let config = state.config();
    let parsed = parse_file(filename, data)?;

    let drafts = chunk_pages(
        &parsed.pages,
        config.chunking.target_tokens,
        config.chunking.overlap_tokens,
    );
    if drafts.is_empty() {
        return Ok(0);
    }

    let chunks: Vec<Chunk> = drafts
        .into_iter()
        .map(|draft| {
            Chunk::new(
                doc_id,
                filename,
                draft.text,
                draft.page_start,
                draft.page_end,
                draft.position,
            )
        })
        .collect();

    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
    let vectors = state.embedder().embed_batch(&texts).await?;

    let points: Vec<PointRecord> = chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| PointRecord::new(chunk, vector))
        .collect();

    let count = points.len();
    state.index().upsert(state.collection(), points).await?;
    Ok(count)
}
