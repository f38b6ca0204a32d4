use anyhow::Result;
use clap::Args;
use posts_core::PostsClient;
use tracing::debug;

use super::describe;

#[derive(Debug, Args)]
pub struct List {}

impl List {
    pub async fn run(self, client: &PostsClient) -> Result<()> {
        let posts = client.list_posts().await.map_err(describe)?;
        debug!(n = posts.len(), "fetched posts");
        for post in posts {
            println!("#{} {}", post.id, post.title.to_uppercase());
            println!("    {}", post.body);
        }
        Ok(())
    }
}
