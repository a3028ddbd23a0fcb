#[allow(clippy::derive_partial_eq_without_eq)]
pub mod tiller {
    use std::fmt;

    impl fmt::Display for Version {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            // Abbreviated commit, the way the controller prints its own
            // version banner.
            let commit = self.git_commit.get(..7).unwrap_or(&self.git_commit);
            if commit.is_empty() {
                write!(f, "{}", self.sem_ver)
            } else {
                write!(f, "{}+g{commit}", self.sem_ver)
            }
        }
    }

    include!("tiller.v1.rs");
}
