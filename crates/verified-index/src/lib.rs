pub mod fetch;
pub mod generate;
pub mod reconcile;
pub mod workflows;
pub mod writer;

#[cfg(test)]
mod test_support;
