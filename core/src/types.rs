//! Records of the posts collection.
//!
//! # Design
//! Defined independently of the mock-server crate; the integration tests
//! catch schema drift. `userId` is camelCase on the wire. Services are free
//! to echo back only part of a created record, so everything but `id` has a
//! default.

use serde::{Deserialize, Serialize};

/// A post as returned by the collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

/// Payload for creating a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    #[serde(rename = "userId")]
    pub user_id: u64,
}
