use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub film_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub author_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

/// Nest a flat comment list by `parent_id`, oldest first at every level.
///
/// Replies whose parent is absent (deleted) are promoted to the top level.
/// Comments caught in a parent cycle never reach a root and are dropped.
pub fn build_tree(mut comments: Vec<Comment>) -> Vec<CommentNode> {
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    let ids: HashSet<String> = comments.iter().map(|c| c.id.clone()).collect();
    let mut children: HashMap<String, Vec<Comment>> = HashMap::new();
    let mut roots = Vec::new();
    for c in comments {
        match c.parent_id.clone() {
            Some(parent) if parent != c.id && ids.contains(&parent) => children.entry(parent).or_default().push(c),
            _ => roots.push(c),
        }
    }
    roots.into_iter().map(|c| attach(c, &mut children)).collect()
}

fn attach(comment: Comment, children: &mut HashMap<String, Vec<Comment>>) -> CommentNode {
    let replies = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|c| attach(c, children))
        .collect();
    CommentNode { comment, replies }
}
