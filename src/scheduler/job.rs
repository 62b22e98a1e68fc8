use std::fmt;
use std::sync::Arc;

/// One prompt handed to a worker.
///
/// Identity is the content: two jobs with the same text are independent
/// entries in the pool. Cloning is cheap, the text is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Job(Arc<str>);

impl Job {
    pub fn new(prompt: impl Into<Arc<str>>) -> Self {
        Self(prompt.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Job {
    fn from(prompt: &str) -> Self {
        Self::new(prompt)
    }
}

impl From<String> for Job {
    fn from(prompt: String) -> Self {
        Self::new(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_equality_is_by_content() {
        let a = Job::from("write a haiku");
        let b = Job::from("write a haiku".to_string());
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "write a haiku");
        assert_eq!(a.to_string(), "write a haiku");
    }
}
