//! Star-neighbour aggregation and ranking

use std::collections::HashMap;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info};

use crate::config::MAX_CONCURRENT_FETCHES;
use crate::stars::cache::StarCache;
use crate::stars::error::FetchError;
use crate::stars::fetcher::StarFetcher;
use crate::stars::types::{NeighborRecord, StarKind};

/// Computes the star-neighbours of `owner/repo`.
///
/// Resolves the target's stargazers, then each stargazer's starred list,
/// everything through the cache. Per-user fetches run concurrently, bounded
/// by [`MAX_CONCURRENT_FETCHES`]; any fetch failure aborts the whole
/// aggregation rather than silently dropping that user's contribution.
///
/// Records are sorted by shared-stargazer count descending, ties broken by
/// repository name ascending, so the output order is total and stable.
pub async fn compute_neighbors(
    fetcher: &dyn StarFetcher,
    cache: &StarCache,
    owner: &str,
    repo: &str,
) -> Result<Vec<NeighborRecord>, FetchError> {
    let target = format!("{owner}/{repo}");

    let stargazers = cache
        .get_or_fetch(StarKind::RepoStargazers, &target, || {
            fetcher.fetch_stargazers(owner, repo)
        })
        .await?;
    info!("{} has {} stargazers", target, stargazers.len());

    if stargazers.is_empty() {
        return Ok(Vec::new());
    }

    let starred_lists: HashMap<String, Vec<String>> =
        stream::iter(stargazers.iter().cloned().map(|user| async move {
            let starred = cache
                .get_or_fetch(StarKind::UserStarred, &user, || fetcher.fetch_starred(&user))
                .await?;
            Ok::<_, FetchError>((user, starred))
        }))
        .buffer_unordered(MAX_CONCURRENT_FETCHES)
        .try_collect()
        .await?;

    // Iterate stargazers in fetched order so each record's stargazer list
    // is deterministic regardless of fan-out completion order.
    let mut neighbors: HashMap<String, Vec<String>> = HashMap::new();
    for user in &stargazers {
        let Some(starred) = starred_lists.get(user) else {
            continue;
        };
        for starred_repo in starred {
            if *starred_repo == target {
                continue;
            }
            neighbors
                .entry(starred_repo.clone())
                .or_default()
                .push(user.clone());
        }
    }

    let mut records: Vec<NeighborRecord> = neighbors
        .into_iter()
        .map(|(repo, stargazers)| NeighborRecord { repo, stargazers })
        .collect();
    records.sort_by(|a, b| {
        b.stargazers
            .len()
            .cmp(&a.stargazers.len())
            .then_with(|| a.repo.cmp(&b.repo))
    });

    debug!("Found {} neighbours for {}", records.len(), target);
    Ok(records)
}
