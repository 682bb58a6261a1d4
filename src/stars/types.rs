use serde::{Deserialize, Serialize};

/// Kind of star list held by the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StarKind {
    /// Users who starred a repository, keyed by "owner/repo"
    RepoStargazers,
    /// Repositories starred by a user, keyed by login
    UserStarred,
}

impl StarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StarKind::RepoStargazers => "repo_stargazers",
            StarKind::UserStarred => "user_starred",
        }
    }
}

/// A repository sharing at least one stargazer with the target repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborRecord {
    /// Full repository name, "owner/repo"
    pub repo: String,
    /// Stargazers shared with the target, in the target's stargazer order
    pub stargazers: Vec<String>,
}
