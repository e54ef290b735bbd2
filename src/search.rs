use crate::{Node, NodeType};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Filter over node names and stringified property values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchOptions {
    pub query: String,
    /// Match the query as a subsequence rather than a substring
    pub fuzzy: bool,
    pub case_sensitive: bool,
    /// Treat the query as a regular expression
    pub regex: bool,
    /// Restrict to these types; empty means all
    pub node_types: Vec<NodeType>,
    /// Also match against property values
    pub search_properties: bool,
    /// Result cap; falls back to the store's configured default
    pub limit: Option<usize>,
}

impl SearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn fuzzy(mut self) -> Self {
        self.fuzzy = true;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    pub fn regex(mut self) -> Self {
        self.regex = true;
        self
    }

    pub fn of_type(mut self, node_type: NodeType) -> Self {
        self.node_types.push(node_type);
        self
    }

    pub fn names_only(mut self) -> Self {
        self.search_properties = false;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            query: String::new(),
            fuzzy: false,
            case_sensitive: false,
            regex: false,
            node_types: Vec::new(),
            search_properties: true,
            limit: None,
        }
    }
}

enum Matcher {
    Pattern(Regex),
    Text {
        needle: String,
        fuzzy: bool,
        case_sensitive: bool,
    },
}

impl Matcher {
    fn build(options: &SearchOptions) -> Option<Self> {
        let query = options.query.trim();
        if query.is_empty() {
            return None;
        }

        if options.regex {
            return match RegexBuilder::new(query)
                .case_insensitive(!options.case_sensitive)
                .build()
            {
                Ok(re) => Some(Matcher::Pattern(re)),
                Err(e) => {
                    tracing::debug!(query, error = %e, "invalid search pattern");
                    None
                }
            };
        }

        let needle = if options.case_sensitive {
            query.to_string()
        } else {
            query.to_lowercase()
        };
        Some(Matcher::Text {
            needle,
            fuzzy: options.fuzzy,
            case_sensitive: options.case_sensitive,
        })
    }

    fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(text),
            Matcher::Text {
                needle,
                fuzzy,
                case_sensitive,
            } => {
                let haystack = if *case_sensitive {
                    text.to_string()
                } else {
                    text.to_lowercase()
                };
                if *fuzzy {
                    is_subsequence(needle, &haystack)
                } else {
                    haystack.contains(needle.as_str())
                }
            }
        }
    }
}

/// Whether every char of `needle` appears in `haystack` in order
pub fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut remaining = haystack.chars();
    needle.chars().all(|c| remaining.any(|h| h == c))
}

/// Nodes matching `options`, sorted by id and capped at the option's limit
/// or `default_limit`. An empty query or an invalid pattern matches nothing.
pub fn search_nodes<'a>(
    nodes: impl IntoIterator<Item = &'a Node>,
    options: &SearchOptions,
    default_limit: usize,
) -> Vec<&'a Node> {
    let Some(matcher) = Matcher::build(options) else {
        return Vec::new();
    };

    let mut hits: Vec<&Node> = nodes
        .into_iter()
        .filter(|n| options.node_types.is_empty() || options.node_types.contains(&n.node_type))
        .filter(|n| {
            matcher.matches(&n.name)
                || (options.search_properties
                    && n.properties
                        .values()
                        .any(|v| matcher.matches(&v.to_search_text())))
        })
        .collect();

    hits.sort_by(|a, b| a.id.cmp(&b.id));
    hits.truncate(options.limit.unwrap_or(default_limit));
    hits
}
