use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("Unauthorized")]
    Unauthorized,
}
