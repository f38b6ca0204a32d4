use anyhow::{Context, Result};
use clap::Args;
use posts_core::{Encoding, Form, FormControl, NewPost, PostsClient};
use tracing::debug;
use uuid::Uuid;

use super::describe;

#[derive(Debug, Args)]
pub struct Create {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub body: String,
    /// Author id. A pseudo-random id in 1..=10 is used when omitted.
    #[arg(long)]
    pub user_id: Option<u64>,
    /// Send multipart form data instead of JSON
    #[arg(long)]
    pub multipart: bool,
    /// Extra form field as `name=value`; implies --multipart
    #[arg(long = "field", value_parser = parse_pair)]
    pub fields: Vec<(String, String)>,
    /// File part as `name=path`; implies --multipart
    #[arg(long = "attach", value_parser = parse_pair)]
    pub attachments: Vec<(String, String)>,
}

impl Create {
    pub async fn run(self, client: &PostsClient) -> Result<()> {
        let user_id = self.user_id.unwrap_or_else(random_user_id);

        let result = if self.fields.is_empty() && self.attachments.is_empty() {
            let input = NewPost {
                title: self.title,
                body: self.body,
                user_id,
            };
            let encoding = if self.multipart {
                Encoding::Multipart
            } else {
                Encoding::Json
            };
            debug!(?encoding, user_id, "creating post");
            client.create_post(&input, encoding).await
        } else {
            let form = self.form()?;
            debug!(controls = form.controls.len(), user_id, "creating post from form");
            client.create_post_from_form(&form, Some(user_id)).await
        };
        let post = result.map_err(describe)?;

        println!("created post {}", post.id);
        Ok(())
    }

    fn form(&self) -> Result<Form> {
        let mut form = Form::new()
            .control(FormControl::text("title", self.title.as_str()))
            .control(FormControl::text("body", self.body.as_str()));
        for (name, value) in &self.fields {
            form = form.control(FormControl::text(name.as_str(), value.as_str()));
        }
        for (name, path) in &self.attachments {
            let data = std::fs::read(path).with_context(|| format!("failed to read {path}"))?;
            let filename = std::path::Path::new(path)
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.clone());
            form = form.control(FormControl::file(name.as_str(), filename, None, data));
        }
        Ok(form)
    }
}

fn random_user_id() -> u64 {
    (Uuid::new_v4().as_u128() % 10) as u64 + 1
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected `name=value`, got `{s}`"))?;
    if name.is_empty() {
        return Err(format!("missing name in `{s}`"));
    }
    Ok((name.to_string(), value.to_string()))
}
