pub const DEFAULT_USER_ID: &str = "u1";

/// The active user. `set` ignores blank input instead of failing.
#[derive(Clone, Debug)]
pub struct SessionIdentity {
    user_id: String,
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_string(),
        }
    }
}

impl SessionIdentity {
    pub fn new(user_id: &str) -> Self {
        let mut identity = Self::default();
        identity.set(user_id);
        identity
    }

    pub fn get(&self) -> &str {
        &self.user_id
    }

    pub fn set(&mut self, next: &str) {
        if next.trim().is_empty() {
            tracing::debug!("ignoring blank user id");
            return;
        }
        self.user_id = next.to_string();
    }
}
