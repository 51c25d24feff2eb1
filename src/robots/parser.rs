//! Robots.txt rule evaluation
//!
//! Allow/deny matching is delegated to the `robotstxt` crate (a port of
//! Google's matcher, longest-match semantics). Crawl-delay is not part of
//! that crate's surface, so it is extracted here with a small line scan.

use robotstxt::DefaultMatcher;

/// Decision surface parsed from one robots.txt document
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw document content; empty when permissive
    content: String,

    /// Explicit allow-all marker used for the unavailable-document fallback
    allow_all: bool,
}

impl ParsedRobots {
    /// Wraps raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// The permissive policy used when robots.txt is unreachable,
    /// unparseable, or answered with an error status
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    pub fn is_permissive(&self) -> bool {
        self.allow_all || self.content.is_empty()
    }

    /// Checks whether a URL is allowed for the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_permissive() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Extracts the crawl-delay hint for a user agent, preferring a
    /// group that names the agent over the wildcard group
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.is_permissive() {
            return None;
        }

        let agent = user_agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut group_has_directives = false;
        let mut wildcard_delay: Option<f64> = None;
        let mut agent_delay: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after directives starts a new group
                    if group_has_directives {
                        group_agents.clear();
                        group_has_directives = false;
                    }
                    group_agents.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    group_has_directives = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if group_agents.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        agent_delay = Some(delay);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        wildcard_delay = Some(delay);
                    }
                }
                _ => {
                    group_has_directives = true;
                }
            }
        }

        agent_delay.or(wildcard_delay)
    }
}
