use std::fmt;

/// An already-resolved execution identity.
///
/// The engine never discovers who it runs as: the caller resolves credentials
/// up front and passes the identity explicitly into every data-access and
/// metadata-mutation call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Identity {
    user: String,
    group: String,
}

impl Identity {
    /// Creates an identity for `user` belonging to `group`.
    #[must_use]
    pub fn new(user: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: group.into(),
        }
    }

    /// The privileged identity a store trusts for ownership changes.
    #[must_use]
    pub fn superuser() -> Self {
        Self::new("root", "root")
    }

    /// The user name.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The primary group name.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns true when this identity may bypass permission checks.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.user == "root"
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user, self.group)
    }
}
