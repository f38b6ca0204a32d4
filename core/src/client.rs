//! Typed client for the posts collection.
//!
//! # Design
//! `PostsClient` holds a `base_url` and a `Dispatcher` and nothing else.
//! Each operation is split into a `build_*` method that produces a
//! `RequestSpec` and a `parse_*` function that turns the decoded body into
//! typed records, so either half can be tested without a network. The async
//! methods simply chain the two through the dispatcher.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dispatcher::Dispatcher;
use crate::encode::{encode, EncodedBody, Encoding, Form, MultipartForm};
use crate::error::{DispatchError, DispatchResult, EncodeError};
use crate::http::RequestSpec;
use crate::types::{NewPost, Post};

/// Client for the `/posts` collection of one service.
#[derive(Debug, Clone)]
pub struct PostsClient {
    base_url: String,
    dispatcher: Dispatcher,
}

impl PostsClient {
    pub fn new(base_url: &str, dispatcher: Dispatcher) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            dispatcher,
        }
    }

    pub fn collection_url(&self) -> String {
        format!("{}/posts", self.base_url)
    }

    pub fn build_list_posts(&self) -> RequestSpec {
        RequestSpec::get(self.collection_url())
    }

    pub fn build_create_post(&self, input: &NewPost, encoding: Encoding) -> Result<RequestSpec, DispatchError> {
        let fields = match serde_json::to_value(input).map_err(|e| EncodeError(e.to_string()))? {
            Value::Object(fields) => fields,
            _ => return Err(EncodeError("post did not serialize to a field map".to_string()).into()),
        };
        let body = encode(encoding, &fields)?;
        Ok(RequestSpec::post(self.collection_url(), body))
    }

    /// Multipart create from a form's named controls. `user_id` is appended
    /// after derivation when the form does not carry one.
    pub fn build_create_post_from_form(&self, form: &Form, user_id: Option<u64>) -> RequestSpec {
        let mut multipart = MultipartForm::from_form(form);
        if let Some(user_id) = user_id {
            multipart = multipart.text("userId", user_id.to_string());
        }
        RequestSpec::post(self.collection_url(), EncodedBody::multipart(&multipart))
    }

    pub fn build_delete_post(&self, id: u64) -> RequestSpec {
        RequestSpec::delete(format!("{}/{id}", self.collection_url()))
    }

    pub async fn list_posts(&self) -> DispatchResult<Vec<Post>> {
        let value = self.dispatcher.dispatch(self.build_list_posts()).await?;
        parse_posts(value)
    }

    pub async fn create_post(&self, input: &NewPost, encoding: Encoding) -> DispatchResult<Post> {
        let spec = self.build_create_post(input, encoding)?;
        let value = self.dispatcher.dispatch(spec).await?;
        parse_post(value)
    }

    pub async fn create_post_from_form(&self, form: &Form, user_id: Option<u64>) -> DispatchResult<Post> {
        let value = self
            .dispatcher
            .dispatch(self.build_create_post_from_form(form, user_id))
            .await?;
        parse_post(value)
    }

    pub async fn delete_post(&self, id: u64) -> DispatchResult<()> {
        self.dispatcher.dispatch(self.build_delete_post(id)).await?;
        Ok(())
    }
}

pub fn parse_posts(value: Value) -> DispatchResult<Vec<Post>> {
    from_value(value)
}

pub fn parse_post(value: Value) -> DispatchResult<Post> {
    from_value(value)
}

fn from_value<T: DeserializeOwned>(value: Value) -> DispatchResult<T> {
    serde_json::from_value(value).map_err(|e| DispatchError::Parse(e.to_string()))
}
