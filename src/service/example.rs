//! Business operations on examples.

use crate::error::ServiceError;
use crate::model::{Example, ExampleResponse, ExampleSortKey, ExampleStatus, NewExample, SortOrder};
use crate::repository::Repository;
use crate::service::pipeline::{ExceptionsConfig, LogConfig, OperationPipeline, TimingConfig};
use crate::session::Session;
use crate::sql::{Filter, QueryOptions};
use chrono::NaiveDate;
use futures::FutureExt;
use tracing::Level;
use uuid::Uuid;

/// Listing parameters after validation.
#[derive(Clone, Debug, PartialEq)]
pub struct ExampleQuery {
    /// Only examples on or after this date.
    pub example_date: Option<NaiveDate>,
    pub example_status: ExampleStatus,
    pub sort_order: SortOrder,
    pub sort_key: ExampleSortKey,
    pub skip: i64,
    pub limit: i64,
}

impl ExampleQuery {
    fn options(&self) -> QueryOptions {
        let mut options = QueryOptions::default();
        if let Some(date) = self.example_date {
            options = options.filter(Filter::gte("example_date", date));
        }
        options
            .filter(Filter::eq("example_status", self.example_status.as_str()))
            .order_by(self.sort_key.column(), self.sort_order)
    }
}

#[derive(Clone)]
pub struct ExampleService {
    repository: Repository<Example>,
    pipeline: OperationPipeline,
}

impl ExampleService {
    pub fn new(schema: impl Into<String>) -> Self {
        ExampleService {
            repository: Repository::new(schema),
            pipeline: OperationPipeline::new()
                .with_exceptions(ExceptionsConfig::enabled())
                .with_log(LogConfig::enabled(Level::DEBUG))
                .with_timing(TimingConfig::enabled(Level::DEBUG)),
        }
    }

    pub fn with_pipeline(mut self, pipeline: OperationPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn repository(&self) -> &Repository<Example> {
        &self.repository
    }

    pub async fn get_examples(
        &self,
        session: &mut Session,
        query: ExampleQuery,
    ) -> Result<Vec<ExampleResponse>, ServiceError> {
        let repository = self.repository.clone();
        self.pipeline
            .run("get_examples", session, move |session| {
                let repository = repository.clone();
                let query = query.clone();
                async move {
                    let rows = repository
                        .find_all(session, query.skip, query.limit, &query.options())
                        .await?;
                    Ok(rows.into_iter().map(ExampleResponse::from).collect())
                }
                .boxed()
            })
            .await
    }

    pub async fn get_example_by_id(&self, session: &mut Session, id: Uuid) -> Result<ExampleResponse, ServiceError> {
        let repository = self.repository.clone();
        self.pipeline
            .run("get_example_by_id", session, move |session| {
                let repository = repository.clone();
                async move {
                    let example = repository.find_one(session, id, &QueryOptions::default()).await?;
                    Ok(ExampleResponse::from(example))
                }
                .boxed()
            })
            .await
    }

    pub async fn create(&self, session: &mut Session, input: NewExample) -> Result<ExampleResponse, ServiceError> {
        let repository = self.repository.clone();
        self.pipeline
            .run("create", session, move |session| {
                let repository = repository.clone();
                let example = Example::new(input.clone());
                async move {
                    let saved = repository.save(session, &example).await?;
                    Ok(ExampleResponse::from(saved))
                }
                .boxed()
            })
            .await
    }

    /// Deletes zero or one row; a missing id is not an error.
    pub async fn delete(&self, session: &mut Session, id: Uuid) -> Result<(), ServiceError> {
        let repository = self.repository.clone();
        self.pipeline
            .run("delete", session, move |session| {
                let repository = repository.clone();
                async move {
                    let removed = repository.delete(session, id).await?;
                    tracing::debug!(%id, removed, "example delete");
                    Ok(())
                }
                .boxed()
            })
            .await
    }
}
