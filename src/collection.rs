//! Defines the [`Collection`], everything aggregated from the source tree
//! before any page is rendered.

use crate::config::Config;
use crate::parser::{parse_posts, parse_projects, Result};
use crate::post::Post;
use crate::project::Project;
use crate::tag::TagIndex;
use log::info;

pub struct Collection {
    /// Visible posts, most recent first. Index pages, tag pages and the feed
    /// all list posts in this order.
    pub posts: Vec<Post>,

    /// Projects in priority order.
    pub projects: Vec<Project>,

    /// Tags derived from `posts`.
    pub tags: TagIndex,
}

impl Collection {
    /// Loads posts and projects from the directories named by `config`.
    pub fn load(config: &Config) -> Result<Collection> {
        let posts = parse_posts(&config.posts_source_directory())?;
        let projects = parse_projects(&config.projects_source_directory())?;
        let tags = TagIndex::from_posts(&posts);
        info!(
            "loaded {} posts, {} projects, {} tags",
            posts.len(),
            projects.len(),
            tags.tags().len()
        );
        Ok(Collection {
            posts,
            projects,
            tags,
        })
    }
}
