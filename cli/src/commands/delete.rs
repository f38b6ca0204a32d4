use anyhow::Result;
use clap::Args;
use posts_core::PostsClient;

use super::describe;

#[derive(Debug, Args)]
pub struct Delete {
    pub id: u64,
}

impl Delete {
    pub async fn run(self, client: &PostsClient) -> Result<()> {
        client.delete_post(self.id).await.map_err(describe)?;
        println!("deleted post {}", self.id);
        Ok(())
    }
}
