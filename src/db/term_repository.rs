use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::db::models::{Term, TermKind};
use crate::error::AppError;

/// Repository trait for categories and tags.
#[async_trait]
pub trait TermRepository: Send + Sync {
    async fn insert(&self, kind: TermKind, term: Term) -> Result<Term, AppError>;

    /// Terms of the given kind whose id is in `ids`, in the order of `ids`.
    /// Unknown ids are skipped.
    async fn find_by_ids(&self, kind: TermKind, ids: &[ObjectId]) -> Result<Vec<Term>, AppError>;

    /// All terms of the given kind sorted by name.
    async fn list(&self, kind: TermKind) -> Result<Vec<Term>, AppError>;
}

/// MongoDB implementation of the TermRepository.
pub struct MongoTermRepository {
    categories: mongodb::Collection<Term>,
    tags: mongodb::Collection<Term>,
}

impl MongoTermRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            categories: db.collection(TermKind::Category.collection_name()),
            tags: db.collection(TermKind::Tag.collection_name()),
        }
    }

    fn collection(&self, kind: TermKind) -> &mongodb::Collection<Term> {
        match kind {
            TermKind::Category => &self.categories,
            TermKind::Tag => &self.tags,
        }
    }

    async fn collect(
        &self,
        kind: TermKind,
        filter: bson::Document,
    ) -> Result<Vec<Term>, AppError> {
        use bson::doc;
        use futures::TryStreamExt;
        use mongodb::options::FindOptions;

        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();

        let mut cursor = self
            .collection(kind)
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut terms = Vec::new();
        while let Some(term) = cursor
            .try_next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            terms.push(term);
        }

        Ok(terms)
    }
}

#[async_trait]
impl TermRepository for MongoTermRepository {
    async fn insert(&self, kind: TermKind, mut term: Term) -> Result<Term, AppError> {
        let result = self
            .collection(kind)
            .insert_one(&term)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        term.id = result.inserted_id.as_object_id();
        Ok(term)
    }

    async fn find_by_ids(&self, kind: TermKind, ids: &[ObjectId]) -> Result<Vec<Term>, AppError> {
        use bson::doc;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found = self
            .collect(kind, doc! { "_id": { "$in": ids.to_vec() } })
            .await?;

        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|t| t.id.as_ref() == Some(id)).cloned())
            .collect())
    }

    async fn list(&self, kind: TermKind) -> Result<Vec<Term>, AppError> {
        use bson::doc;

        self.collect(kind, doc! {}).await
    }
}
