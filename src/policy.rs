use std::collections::HashSet;

/// AccessPolicy
///
/// The identity allow-list and the path prefix it guards. Built once from configuration and
/// shared read-only by every request.
///
/// Comparison is exact and case-sensitive on both sides: `Ops@Example.com` and
/// `ops@example.com` are different identities. An empty policy denies every privileged path.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    privileged_prefix: String,
    allowed_emails: HashSet<String>,
    allowed_domains: HashSet<String>,
}

impl AccessPolicy {
    pub fn new(
        privileged_prefix: impl Into<String>,
        allowed_emails: HashSet<String>,
        allowed_domains: HashSet<String>,
    ) -> Self {
        Self {
            privileged_prefix: privileged_prefix.into(),
            allowed_emails,
            allowed_domains,
        }
    }

    pub fn privileged_prefix(&self) -> &str {
        &self.privileged_prefix
    }

    /// True when neither list has an entry, i.e. no identity can ever pass the privileged check.
    pub fn is_empty(&self) -> bool {
        self.allowed_emails.is_empty() && self.allowed_domains.is_empty()
    }

    /// is_privileged
    ///
    /// Plain prefix test on the request path, so `/administrator` is privileged under
    /// `/admin` as well. Over-matching only ever adds a check, it never removes one.
    pub fn is_privileged(&self, path: &str) -> bool {
        path.starts_with(&self.privileged_prefix)
    }

    /// is_allowed
    ///
    /// Allow-list check for a privileged path: an exact identity match, or a match of the
    /// identity's domain segment against the domain list.
    pub fn is_allowed(&self, identity: &str) -> bool {
        if self.allowed_emails.contains(identity) {
            return true;
        }
        domain_of(identity).is_some_and(|domain| self.allowed_domains.contains(domain))
    }

    /// authorize
    ///
    /// Binary decision for an authenticated identity on `path`. Non-privileged paths are open to
    /// any authenticated principal.
    pub fn authorize(&self, identity: &str, path: &str) -> bool {
        !self.is_privileged(path) || self.is_allowed(identity)
    }
}

/// domain_of
///
/// Returns everything after the first `@`. An identity without `@`, or with nothing after it,
/// has no domain and therefore never matches a domain entry.
pub fn domain_of(identity: &str) -> Option<&str> {
    identity
        .split_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
}
