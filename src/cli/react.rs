//! React command handler.

use std::collections::BTreeSet;
use std::sync::Arc;

use clap::Args;
use color_eyre::eyre::eyre;
use color_eyre::Result;

use crate::cli::print_json;
use crate::graph::CypherExecutor;
use crate::models::{user_repository, DISLIKE, LIKE};
use crate::schema::Direction;

/// Replace the set of posts a user likes (or dislikes) with exactly the
/// given posts. Passing no posts clears them.
#[derive(Args, Debug)]
pub struct ReactCommand {
    /// User node id
    pub user_id: String,

    /// Set dislikes instead of likes
    #[arg(long)]
    pub dislike: bool,

    /// Print the edges that would be removed and added, without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Post node ids
    pub post_ids: Vec<String>,
}

impl ReactCommand {
    fn rel_type(&self) -> &'static str {
        if self.dislike {
            DISLIKE
        } else {
            LIKE
        }
    }

    pub async fn run<E: CypherExecutor>(self, executor: Arc<E>) -> Result<()> {
        let users = user_repository(executor);
        if users.get_by_id(&self.user_id).await?.is_none() {
            return Err(eyre!("No User with id {}", self.user_id));
        }

        if self.dry_run {
            let delta = users
                .plan_sync(
                    &self.user_id,
                    self.rel_type(),
                    &self.post_ids,
                    Direction::Outgoing,
                )
                .await?;
            return print_json(&delta);
        }

        let synced = users
            .sync_relationships(
                &self.user_id,
                self.rel_type(),
                &self.post_ids,
                Direction::Outgoing,
            )
            .await?;

        let requested = self.post_ids.iter().collect::<BTreeSet<_>>().len() as i64;
        let skipped = requested - synced;
        if skipped > 0 {
            tracing::warn!(skipped, "Some post ids did not resolve to a node");
        }
        println!("{} {} relationship(s) for user {}", synced, self.rel_type(), self.user_id);
        Ok(())
    }
}
