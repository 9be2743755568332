// src/vector_db/qdrant_client.rs

use super::{SearchFilter, VectorCollection, VectorHit, VectorRecord, VectorSearchStore};
use crate::config::Config;
use crate::errors::AppError;
use async_trait::async_trait;
use qdrant_client::qdrant::condition::ConditionOneOf;
use qdrant_client::qdrant::r#match::MatchValue;
use qdrant_client::qdrant::vectors_config::Config as QdrantVectorsConfig;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, Condition, CreateCollection, Distance, FieldCondition, Filter,
    GetPoints, Match, PointId, PointStruct, Range, SearchPoints, UpsertPoints, VectorParams,
    VectorsConfig,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Derives the Qdrant point UUID for a logical id. Deterministic, so the
/// same tour or chunk always maps to the same point and a re-upsert can
/// never create a duplicate.
pub fn point_uuid(logical_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, logical_id.as_bytes())
}

#[derive(Clone)]
pub struct QdrantVectorStore {
    client: Arc<Qdrant>,
    tours_collection: String,
    heritage_collection: String,
    embedding_dimension: u64,
}

impl QdrantVectorStore {
    #[instrument(skip(config), name = "qdrant_store_new")]
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let qdrant_url = config.qdrant_url.as_ref().ok_or_else(|| {
            error!("QDRANT_URL is not configured");
            AppError::ConfigError("QDRANT_URL is not configured".to_string())
        })?;

        info!("Connecting to Qdrant at URL: {}", qdrant_url);

        let client = Qdrant::from_url(qdrant_url).build().map_err(|e| {
            error!(error = %e, "Failed to build Qdrant client");
            AppError::VectorDbError(format!("Failed to build Qdrant client: {}", e))
        })?;

        Ok(Self {
            client: Arc::new(client),
            tours_collection: config.tours_collection_name.clone(),
            heritage_collection: config.heritage_collection_name.clone(),
            embedding_dimension: config.embedding_dimension,
        })
    }

    fn collection_name(&self, collection: VectorCollection) -> &str {
        match collection {
            VectorCollection::Tours => &self.tours_collection,
            VectorCollection::HeritageGuides => &self.heritage_collection,
        }
    }

    #[instrument(skip(self), fields(collection = %name))]
    async fn ensure_collection_exists(&self, name: &str) -> Result<(), AppError> {
        let collection_exists = self.client.collection_exists(name).await.map_err(|e| {
            error!(error = %e, collection = %name, "Failed to check if Qdrant collection exists");
            AppError::VectorDbError(format!("Failed to check Qdrant collection existence: {}", e))
        })?;

        if collection_exists {
            info!("Collection '{}' already exists.", name);
            return Ok(());
        }

        info!("Collection '{}' does not exist. Creating...", name);
        let create_result = self
            .client
            .create_collection(CreateCollection {
                collection_name: name.to_string(),
                vectors_config: Some(VectorsConfig {
                    config: Some(QdrantVectorsConfig::Params(VectorParams {
                        size: self.embedding_dimension,
                        distance: Distance::Cosine.into(),
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await;

        match create_result {
            Ok(_) => {
                info!("Successfully created collection '{}'", name);
                Ok(())
            }
            // Another instance may have created it between the check and
            // the create call.
            Err(e) if e.to_string().contains("already exists") => {
                warn!(collection = %name, "Collection appeared while creating it (ignoring).");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, collection = %name, "Failed to create Qdrant collection");
                Err(AppError::VectorDbError(format!(
                    "Failed to create Qdrant collection '{}': {}",
                    name, e
                )))
            }
        }
    }

    fn to_point(record: VectorRecord) -> Result<PointStruct, AppError> {
        if !record.payload.is_object() {
            error!("Vector payload must be a JSON object");
            return Err(AppError::SerializationError(
                "Vector payload must be a JSON object".to_string(),
            ));
        }
        let payload: HashMap<String, qdrant_client::qdrant::Value> =
            serde_json::from_value(record.payload).map_err(|e| {
                error!(error = %e, "Failed to deserialize JSON payload into Qdrant value map");
                AppError::SerializationError(format!(
                    "Failed to deserialize payload for Qdrant: {}",
                    e
                ))
            })?;

        Ok(PointStruct {
            id: Some(point_uuid(&record.id).to_string().into()),
            vectors: Some(record.vector.into()),
            payload,
        })
    }

    fn payload_to_json(
        payload: HashMap<String, qdrant_client::qdrant::Value>,
    ) -> Result<serde_json::Value, AppError> {
        serde_json::to_value(payload).map_err(|e| {
            AppError::SerializationError(format!("Failed to convert Qdrant payload: {}", e))
        })
    }

    fn build_filter(filter: &SearchFilter) -> Option<Filter> {
        let mut must = Vec::new();

        if let Some(doc_type) = &filter.doc_type {
            must.push(keyword_condition("type", doc_type));
        }
        if let Some(place) = &filter.place {
            must.push(keyword_condition("place", place));
        }
        if let Some(max_price) = filter.max_price {
            must.push(Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: "price".to_string(),
                    range: Some(Range {
                        lt: Some(max_price as f64),
                        ..Default::default()
                    }),
                    ..Default::default()
                })),
            });
        }

        if must.is_empty() {
            None
        } else {
            Some(Filter {
                must,
                ..Default::default()
            })
        }
    }
}

fn keyword_condition(key: &str, value: &str) -> Condition {
    Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: key.to_string(),
            r#match: Some(Match {
                match_value: Some(MatchValue::Keyword(value.to_string())),
            }),
            ..Default::default()
        })),
    }
}

#[async_trait]
impl VectorSearchStore for QdrantVectorStore {
    async fn ensure_collections(&self) -> Result<(), AppError> {
        let tours = self.tours_collection.clone();
        let heritage = self.heritage_collection.clone();
        self.ensure_collection_exists(&tours).await?;
        self.ensure_collection_exists(&heritage).await
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(
        &self,
        collection: VectorCollection,
        records: Vec<VectorRecord>,
    ) -> Result<(), AppError> {
        if records.is_empty() {
            return Ok(());
        }
        let collection_name = self.collection_name(collection).to_string();
        let points = records
            .into_iter()
            .map(Self::to_point)
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Upserting {} points into collection '{}'",
            points.len(),
            collection_name
        );
        self.client
            .upsert_points(UpsertPoints {
                collection_name: collection_name.clone(),
                wait: Some(true),
                points,
                ..Default::default()
            })
            .await
            .map_err(|e| {
                error!(error = %e, collection = %collection_name, "Failed to upsert points to Qdrant");
                AppError::VectorDbError(format!("Failed to upsert points: {}", e))
            })?;
        Ok(())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn fetch(
        &self,
        collection: VectorCollection,
        ids: &[String],
    ) -> Result<Vec<(String, serde_json::Value)>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let collection_name = self.collection_name(collection).to_string();

        // Point UUIDs are one-way digests of the logical ids, so remember
        // the mapping for the ids in this request.
        let requested: HashMap<String, String> = ids
            .iter()
            .map(|id| (point_uuid(id).to_string(), id.clone()))
            .collect();
        let point_ids: Vec<PointId> = requested.keys().map(|uuid| uuid.clone().into()).collect();

        let response = self
            .client
            .get_points(GetPoints {
                collection_name: collection_name.clone(),
                ids: point_ids,
                with_payload: Some(true.into()),
                with_vectors: Some(false.into()),
                ..Default::default()
            })
            .await
            .map_err(|e| {
                error!(error = %e, collection = %collection_name, "Failed to fetch points from Qdrant");
                AppError::VectorDbError(format!("Failed to fetch points: {}", e))
            })?;

        let mut found = Vec::new();
        for point in response.result {
            let Some(PointIdOptions::Uuid(uuid)) =
                point.id.and_then(|id| id.point_id_options)
            else {
                continue;
            };
            if let Some(logical_id) = requested.get(&uuid) {
                found.push((logical_id.clone(), Self::payload_to_json(point.payload)?));
            }
        }
        Ok(found)
    }

    #[instrument(skip(self, query_vector, filter), fields(limit, offset))]
    async fn search(
        &self,
        collection: VectorCollection,
        query_vector: Vec<f32>,
        filter: SearchFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<VectorHit>, AppError> {
        let collection_name = self.collection_name(collection).to_string();

        let search_result = self
            .client
            .search_points(SearchPoints {
                collection_name: collection_name.clone(),
                vector: query_vector,
                limit,
                offset: Some(offset),
                with_payload: Some(true.into()),
                filter: Self::build_filter(&filter),
                ..Default::default()
            })
            .await
            .map_err(|e| {
                error!(error = %e, collection = %collection_name, "Failed to search points in Qdrant");
                AppError::VectorDbError(format!("Failed to search points: {}", e))
            })?;

        info!(
            found_points = search_result.result.len(),
            "Qdrant search completed"
        );

        search_result
            .result
            .into_iter()
            .map(|scored| {
                Ok(VectorHit {
                    score: scored.score,
                    payload: Self::payload_to_json(scored.payload)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_uuid_is_deterministic() {
        let a = point_uuid("hue-001_heritageGuide_0");
        let b = point_uuid("hue-001_heritageGuide_0");
        let c = point_uuid("hue-001_heritageGuide_1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_build_filter_empty_is_none() {
        assert!(QdrantVectorStore::build_filter(&SearchFilter::default()).is_none());
    }

    #[test]
    fn test_build_filter_combines_conditions() {
        let filter = QdrantVectorStore::build_filter(&SearchFilter {
            doc_type: Some("tour_info".to_string()),
            place: Some("Hue".to_string()),
            max_price: Some(600_000),
        })
        .expect("filter should be present");
        assert_eq!(filter.must.len(), 3);
    }

    #[test]
    fn test_to_point_rejects_non_object_payload() {
        let record = VectorRecord {
            id: "t1".to_string(),
            vector: vec![0.1; 4],
            payload: serde_json::Value::String("not an object".to_string()),
        };
        assert!(QdrantVectorStore::to_point(record).is_err());
    }
}
