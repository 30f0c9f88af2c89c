pub mod estimator;
pub mod notifications;
pub mod operator;
pub mod route;
pub mod verification;

#[cfg(test)]
pub(crate) mod fakes;
