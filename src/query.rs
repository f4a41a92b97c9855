//! Viewer-scoped link listings
//!
//! Each [`View`] is a fixed filter, sort order and optional limit. Results
//! are annotated with the viewer's own star state before they are returned.

use std::cmp::Reverse;

use crate::database::LinkStore;
use crate::error::AppResult;
use crate::model::{Link, LinkView, Owner, OwnerProfile};

/// Number of links returned by the trending view
pub const TRENDING_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Every public link, curated first, then by clicks, then newest
    Public,
    /// The viewer's own links regardless of visibility
    Mine,
    /// Every public link, newest first
    Community,
    /// Links the viewer starred
    Starred,
    /// The newest public links from other users.
    ///
    /// Ordered by recency rather than clicks.
    Trending,
}

impl View {
    pub fn matches(self, link: &Link, viewer: &str) -> bool {
        match self {
            View::Public | View::Community => link.is_public,
            View::Mine => link.user == viewer,
            View::Starred => {
                link.starred_by.iter().any(|id| id == viewer)
                    || (link.user == viewer && link.is_starred)
            }
            View::Trending => link.is_public && link.user != viewer,
        }
    }

    fn sort(self, links: &mut [Link]) {
        match self {
            View::Public => links.sort_by_key(|link| {
                (
                    Reverse(link.is_official),
                    Reverse(link.clicks),
                    Reverse(link.created_at),
                    Reverse(link.id.clone()),
                )
            }),
            _ => links.sort_by_key(|link| (Reverse(link.created_at), Reverse(link.id.clone()))),
        }
    }

    fn limit(self) -> Option<usize> {
        match self {
            View::Trending => Some(TRENDING_LIMIT),
            _ => None,
        }
    }

    /// Views whose owner field carries the username and avatar
    fn populates_owner(self) -> bool {
        matches!(self, View::Public | View::Community)
    }
}

/// Runs `view` for `viewer` against the store.
pub fn list(store: &LinkStore, view: View, viewer: &str) -> AppResult<Vec<LinkView>> {
    let mut links = match view {
        View::Mine => store.links_by_owner(viewer)?,
        _ => store.all_links()?,
    };
    links.retain(|link| view.matches(link, viewer));
    view.sort(&mut links);
    if let Some(limit) = view.limit() {
        links.truncate(limit);
    }

    if !view.populates_owner() {
        return Ok(links
            .into_iter()
            .map(|link| LinkView::for_viewer(link, viewer))
            .collect());
    }

    let owners = store.users(links.iter().map(|link| link.user.as_str()))?;
    Ok(links
        .into_iter()
        .map(|link| {
            let owner = match owners.get(&link.user) {
                Some(user) => Owner::Profile(OwnerProfile::from(user.clone())),
                None => Owner::Id(link.user.clone()),
            };
            LinkView::new(link, viewer, owner)
        })
        .collect())
}
