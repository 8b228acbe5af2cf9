use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::{ArrowError, SchemaRef};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType};
use tokio::runtime::Runtime;

use policyrag_core::traits::VectorStore;
use policyrag_core::types::{Chunk, ChunkMetadata, DocumentClass, Meta, MetadataFilter, SimilarityHit};
use policyrag_core::{Error, Result};

use crate::filter::filter_to_sql;
use crate::schema::{self, build_arrow_schema};

const INSERT_BATCH_ROWS: usize = 1000;

/// LanceDB-backed chunk store. `index` drops and recreates the whole
/// database directory; searches use cosine distance, reported as `1 - distance`.
pub struct LanceVectorStore {
    db_dir: PathBuf,
    table_name: String,
    dim: usize,
    rt: Runtime,
}

impl LanceVectorStore {
    pub fn new(db_dir: impl Into<PathBuf>, table_name: &str, dim: usize) -> Result<Self> {
        Ok(Self { db_dir: db_dir.into(), table_name: table_name.to_string(), dim, rt: Runtime::new()? })
    }

    pub fn db_dir(&self) -> &Path { &self.db_dir }

    async fn connect(&self) -> Result<Connection> {
        connect(self.db_dir.to_string_lossy().as_ref()).execute().await.map_err(Error::collaborator)
    }

    async fn write_all(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        let schema = build_arrow_schema(self.dim as i32);
        let batches = chunks
            .chunks(INSERT_BATCH_ROWS)
            .zip(embeddings.chunks(INSERT_BATCH_ROWS))
            .map(|(c, e)| to_record_batch(schema.clone(), self.dim as i32, c, e))
            .collect::<Vec<std::result::Result<RecordBatch, ArrowError>>>();
        let reader = Box::new(RecordBatchIterator::new(batches.into_iter(), schema));
        let db = self.connect().await?;
        db.create_table(&self.table_name, reader).execute().await.map_err(Error::collaborator)?;
        Ok(())
    }

    async fn search_async(&self, query_vec: &[f32], k: usize, filter: &MetadataFilter) -> Result<Vec<SimilarityHit>> {
        let db = self.connect().await?;
        let names = db.table_names().execute().await.map_err(Error::collaborator)?;
        if !names.contains(&self.table_name) {
            return Err(Error::IndexUnavailable(format!("table '{}' not found in {}", self.table_name, self.db_dir.display())));
        }
        let table = db.open_table(&self.table_name).execute().await.map_err(Error::collaborator)?;
        if table.count_rows(None).await.map_err(Error::collaborator)? == 0 { return Ok(vec![]); }

        let mut query = table
            .vector_search(query_vec.to_vec())
            .map_err(Error::collaborator)?
            .distance_type(DistanceType::Cosine)
            .limit(k);
        if let Some(sql) = filter_to_sql(filter) { query = query.only_if(sql); }
        let mut stream = query.execute().await.map_err(Error::collaborator)?;

        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::collaborator)? {
            hits.extend(batch_to_hits(&batch)?);
        }
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(k);
        Ok(hits)
    }
}

impl VectorStore for LanceVectorStore {
    fn index(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(Error::operation(format!("{} chunks but {} embeddings", chunks.len(), embeddings.len())));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dim) {
            return Err(Error::operation(format!("embedding has {} dims, store expects {}", bad.len(), self.dim)));
        }
        if self.db_dir.exists() { std::fs::remove_dir_all(&self.db_dir)?; }
        std::fs::create_dir_all(&self.db_dir)?;
        self.rt.block_on(self.write_all(chunks, embeddings))?;
        tracing::info!(table = %self.table_name, rows = chunks.len(), "vector index rebuilt");
        Ok(())
    }

    fn search(&self, query_vec: &[f32], k: usize, filter: &MetadataFilter) -> Result<Vec<SimilarityHit>> {
        if !self.db_dir.exists() {
            return Err(Error::IndexUnavailable(format!("no vector database at {}", self.db_dir.display())));
        }
        if k == 0 { return Ok(vec![]); }
        self.rt.block_on(self.search_async(query_vec, k, filter))
    }
}

fn to_record_batch(schema: SchemaRef, dim: i32, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> std::result::Result<RecordBatch, ArrowError> {
    let strings = |f: fn(&Chunk) -> String| StringArray::from(chunks.iter().map(f).collect::<Vec<_>>());
    let optional = |f: fn(&Chunk) -> Option<String>| StringArray::from(chunks.iter().map(f).collect::<Vec<_>>());
    let vectors = embeddings.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));

    RecordBatch::try_new(schema, vec![
        Arc::new(strings(|c| c.id.clone())),
        Arc::new(strings(|c| c.source.clone())),
        Arc::new(strings(|c| c.content.clone())),
        Arc::new(optional(|c| c.metadata.policy_type.clone())),
        Arc::new(optional(|c| c.metadata.policy_type.as_deref().map(str::to_lowercase))),
        Arc::new(optional(|c| c.metadata.policy_number.clone())),
        Arc::new(optional(|c| c.metadata.section.clone())),
        Arc::new(optional(|c| c.metadata.page.clone())),
        Arc::new(strings(|c| c.metadata.document_class.as_str().to_string())),
        Arc::new(optional(|c| (!c.metadata.extra.is_empty()).then(|| serde_json::to_string(&c.metadata.extra).unwrap_or_default()))),
        Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim)),
    ])
}

fn str_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::operation(format!("column '{name}' missing from search results")))
}

fn value_at(col: &StringArray, i: usize) -> Option<String> {
    (!col.is_null(i)).then(|| col.value(i).to_string())
}

fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<SimilarityHit>> {
    let ids = str_column(batch, schema::ID)?;
    let sources = str_column(batch, schema::SOURCE)?;
    let contents = str_column(batch, schema::CONTENT)?;
    let policy_types = str_column(batch, schema::POLICY_TYPE)?;
    let policy_numbers = str_column(batch, schema::POLICY_NUMBER)?;
    let sections = str_column(batch, schema::SECTION)?;
    let pages = str_column(batch, schema::PAGE)?;
    let classes = str_column(batch, schema::DOCUMENT_CLASS)?;
    let extras = str_column(batch, schema::EXTRA_JSON)?;
    let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut hits = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let extra: Meta = match value_at(extras, i) {
            Some(json) => serde_json::from_str(&json)?,
            None => Meta::new(),
        };
        let metadata = ChunkMetadata {
            policy_type: value_at(policy_types, i),
            policy_number: value_at(policy_numbers, i),
            section: value_at(sections, i),
            page: value_at(pages, i),
            document_class: DocumentClass::parse(classes.value(i)).unwrap_or_default(),
            relevance_score: None,
            extra,
        };
        let chunk = Chunk::new(ids.value(i), sources.value(i), contents.value(i), metadata);
        let similarity = distances.map_or(0.0, |d| 1.0 - d.value(i));
        hits.push(SimilarityHit { chunk, similarity });
    }
    Ok(hits)
}
