//! CLI module for graphmap.
//!
//! Subcommands:
//! - `users`: list, fetch and search users
//! - `posts`: list, fetch and search posts
//! - `react`: set the posts a user likes or dislikes

mod entity;
mod react;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use crate::config::Config;
use crate::graph::backends::neo4j::Neo4jClient;
use crate::graph::Graph;

pub use entity::{EntityCommand, ListArgs};
pub use react::ReactCommand;

/// graphmap - schema-driven entity mapping over Neo4j
#[derive(Parser)]
#[command(name = "graphmap")]
#[command(about = "Browse graph-mapped users and posts stored in Neo4j")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Query users
    Users {
        #[command(subcommand)]
        command: EntityCommand,
    },

    /// Query posts
    Posts {
        #[command(subcommand)]
        command: EntityCommand,
    },

    /// Replace the posts a user reacts to
    React(ReactCommand),
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> Result<()> {
        let config = Config::load().wrap_err("Failed to load configuration")?;
        let graph = connect(&config).await?;

        match self.command {
            Command::Users { command } => command.run_users(graph, &config).await,
            Command::Posts { command } => command.run_posts(graph, &config).await,
            Command::React(cmd) => cmd.run(graph).await,
        }
    }
}

/// Connects the pooled Neo4j client described by the configuration.
async fn connect(config: &Config) -> Result<Arc<Graph<Neo4jClient>>> {
    tracing::info!("Connecting to Neo4j at {}", config.neo4j.uri);
    let client = Neo4jClient::connect(&config.neo4j)
        .await
        .wrap_err("Failed to connect to Neo4j")?;
    tracing::info!("Connected to Neo4j");
    Ok(Arc::new(Graph::new(client)))
}

/// Prints a value as pretty JSON on stdout.
fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
