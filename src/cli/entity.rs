//! Users and posts command handlers.

use std::sync::Arc;

use clap::{Args, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;

use crate::config::Config;
use crate::graph::CypherExecutor;
use crate::models::{post_repository, user_repository};
use crate::repositories::GraphRepository;
use crate::schema::GraphEntity;
use crate::synth::SearchModel;

use super::print_json;

#[derive(Subcommand)]
pub enum EntityCommand {
    /// List one page of entities with their relationships
    List(ListArgs),

    /// Show a single entity by node id
    Get {
        /// Node identifier
        id: String,
    },

    /// Free-text search over searchable fields
    Search {
        /// Text to look for (case-insensitive)
        term: String,

        /// Maximum number of results
        #[arg(long, default_value = "20")]
        limit: u64,
    },

    /// Count live entities
    Count,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Page number, starting at 1
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Entities per page (0 for all); defaults to the configured size
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Case-insensitive text filter
    #[arg(long)]
    pub text: Option<String>,

    /// Include soft-deleted entities
    #[arg(long)]
    pub include_deleted: bool,
}

impl ListArgs {
    /// Search model built on the configured defaults.
    pub fn search_model(&self, config: &Config) -> SearchModel {
        let mut model = config
            .search
            .search_model()
            .with_page(self.page)
            .with_include_deleted(self.include_deleted);
        if let Some(page_size) = self.page_size {
            model = model.with_page_size(page_size);
        }
        if let Some(text) = &self.text {
            model = model.with_text(text.clone());
        }
        model
    }
}

impl EntityCommand {
    pub async fn run_users<E: CypherExecutor>(self, executor: Arc<E>, config: &Config) -> Result<()> {
        self.run(user_repository(executor), config).await
    }

    pub async fn run_posts<E: CypherExecutor>(self, executor: Arc<E>, config: &Config) -> Result<()> {
        self.run(post_repository(executor), config).await
    }

    async fn run<T, E>(self, repo: GraphRepository<T, E>, config: &Config) -> Result<()>
    where
        T: GraphEntity + serde::Serialize,
        E: CypherExecutor,
    {
        match self {
            EntityCommand::List(args) => {
                let model = args.search_model(config);
                let page = repo.get_all_with(&model).await?;
                tracing::info!(
                    label = T::LABEL,
                    page = model.page,
                    shown = page.total_count(),
                    total = page.total_results,
                    "Listed entities"
                );
                print_json(&page.results)
            }
            EntityCommand::Get { id } => {
                let entity = repo
                    .get_by_id(&id)
                    .await?
                    .ok_or_else(|| eyre!("No {} with id {}", T::LABEL, id))?;
                print_json(&entity)
            }
            EntityCommand::Search { term, limit } => {
                let found = repo.search(&term, None, Some(limit)).await?;
                print_json(&found)
            }
            EntityCommand::Count => {
                println!("{}", repo.count_all().await?);
                Ok(())
            }
        }
    }
}
