use crate::model::Credentials;

/// Supplies the bearer token and username at call time.
///
/// Implementations may refresh tokens behind the scenes; the tracker reads
/// credentials fresh on every request and never caches or mutates them.
pub trait Identity: Send + Sync {
    fn credentials(&self) -> Option<Credentials>;
}

/// Fixed credentials, e.g. from CLI flags or environment.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    credentials: Credentials,
}

impl StaticIdentity {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            credentials: Credentials {
                token: token.into(),
                username: username.into(),
            },
        }
    }
}

impl Identity for StaticIdentity {
    fn credentials(&self) -> Option<Credentials> {
        if self.credentials.token.is_empty() {
            return None;
        }
        Some(self.credentials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_means_signed_out() {
        assert!(StaticIdentity::new("", "alice").credentials().is_none());
        let creds = StaticIdentity::new("t0k", "alice").credentials().unwrap();
        assert_eq!(creds.username, "alice");
    }
}
