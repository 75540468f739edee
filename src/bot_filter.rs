/// Substrings that mark a user agent as a script or crawler.
pub const DENY_LIST: [&str; 6] = ["bot", "crawler", "spider", "scraper", "curl", "wget"];

/// Classify a declared user agent.
///
/// Matching is a case-insensitive substring search over [`DENY_LIST`]. An
/// empty user agent is treated as a human client.
pub fn is_automated(user_agent: &str) -> bool {
    if user_agent.is_empty() {
        return false;
    }

    let lowered = user_agent.to_lowercase();
    DENY_LIST.iter().any(|keyword| lowered.contains(keyword))
}
