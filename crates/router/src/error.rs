use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("no route matches '{0}'")]
    NoMatch(String),

    #[error("too many redirects while navigating to '{0}'")]
    TooManyRedirects(String),
}
